//! In-process reference providers: a `HashMap`-backed record store with
//! change fan-out, a scripted geolocation source, a silent speech backend,
//! a logging notifier, and a straight-line route planner.
//!
//! These back the integration tests and demos; a real deployment supplies
//! its own implementations of the same traits.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::join_all;
use realtime::{
    Change, Error, FixOptions, GeoPoint, Geolocator, ManeuverType, Notice, Notifier, RawFix,
    RecordKey, RecordStore, Result, Route, RoutePlanner, RouteStep, SpeechRequest,
    SpeechSynthesizer, Subscription, distance_m,
};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::info;

const FEED_CAPACITY: usize = 32;
const PLAN_SPEED_MPS: f64 = 8.0;

/// One provider implementing every collaborator trait in memory.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    records: Mutex<HashMap<RecordKey, Value>>,
    feeds: Mutex<HashMap<RecordKey, Vec<mpsc::Sender<Change>>>>,
    fixes: Mutex<VecDeque<RawFix>>,
    notices: Mutex<Vec<Notice>>,
}

impl MemoryProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a record without emitting a change notification.
    pub fn insert_record(&self, key: &RecordKey, value: Value) {
        self.records.lock().expect("should lock").insert(key.clone(), value);
    }

    /// Writes a record and notifies every open feed.
    pub async fn update_record(&self, key: &RecordKey, value: Value) {
        let old =
            self.records.lock().expect("should lock").insert(key.clone(), value.clone());
        self.emit(key, Change { old, new: Some(value) }).await;
    }

    /// Deletes a record and notifies every open feed.
    pub async fn delete_record(&self, key: &RecordKey) {
        let old = self.records.lock().expect("should lock").remove(key);
        self.emit(key, Change { old, new: None }).await;
    }

    /// Drops every feed for `key`, simulating a lost subscription.
    pub fn close_feeds(&self, key: &RecordKey) {
        self.feeds.lock().expect("should lock").remove(key);
    }

    /// Queues one fix for the geolocation source.
    pub fn push_fix(&self, fix: RawFix) {
        self.fixes.lock().expect("should lock").push_back(fix);
    }

    #[must_use]
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().expect("should lock").clone()
    }

    async fn emit(&self, key: &RecordKey, change: Change) {
        let senders: Vec<_> =
            self.feeds.lock().expect("should lock").get(key).cloned().unwrap_or_default();
        join_all(senders.iter().map(|sender| {
            let change = change.clone();
            async move {
                let _ = sender.send(change).await;
            }
        }))
        .await;
    }
}

impl Geolocator for MemoryProvider {
    async fn sample(&self, _options: &FixOptions) -> Result<RawFix> {
        self.fixes
            .lock()
            .expect("should lock")
            .pop_front()
            .ok_or_else(|| Error::Timeout("no fix queued".to_string()))
    }
}

impl RecordStore for MemoryProvider {
    async fn get(&self, key: &RecordKey) -> Result<Option<Value>> {
        Ok(self.records.lock().expect("should lock").get(key).cloned())
    }

    async fn subscribe(&self, key: &RecordKey) -> Result<Subscription> {
        let (tx, rx) = mpsc::channel(FEED_CAPACITY);
        self.feeds.lock().expect("should lock").entry(key.clone()).or_default().push(tx);
        Ok(Subscription { key: key.clone(), changes: rx })
    }
}

impl SpeechSynthesizer for MemoryProvider {
    async fn synthesize(&self, _request: &SpeechRequest) -> Result<Bytes> {
        // one frame of silence
        Ok(Bytes::from_static(&[0, 0]))
    }
}

#[async_trait]
impl Notifier for MemoryProvider {
    async fn notify(&self, notice: &Notice) {
        info!(kind = ?notice.kind, title = %notice.title, "notice");
        self.notices.lock().expect("should lock").push(notice.clone());
    }
}

impl RoutePlanner for MemoryProvider {
    async fn plan(&self, origin: GeoPoint, destination: GeoPoint) -> Result<Route> {
        let length = distance_m(origin, destination);
        if length < f64::EPSILON {
            return Err(Error::RouteUnavailable("origin equals destination".to_string()));
        }

        Ok(Route {
            points: vec![origin, destination],
            steps: vec![
                RouteStep { maneuver: ManeuverType::Depart, street_name: None, distance_m: length },
                RouteStep { maneuver: ManeuverType::Arrive, street_name: None, distance_m: 0.0 },
            ],
            distance_m: length,
            duration_s: length / PLAN_SPEED_MPS,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn records_round_trip() {
        let provider = MemoryProvider::new();
        let key = RecordKey::new("deliveries", "dlv-1");

        provider.insert_record(&key, json!({"id": "dlv-1"}));
        let value = provider.get(&key).await.expect("should read");
        assert_eq!(value, Some(json!({"id": "dlv-1"})));
    }

    #[tokio::test]
    async fn feeds_deliver_changes() {
        let provider = MemoryProvider::new();
        let key = RecordKey::new("deliveries", "dlv-1");

        let mut subscription = provider.subscribe(&key).await.expect("should subscribe");
        provider.update_record(&key, json!({"status": "picked_up"})).await;

        let change = subscription.changes.recv().await.expect("should deliver");
        assert_eq!(change.new, Some(json!({"status": "picked_up"})));

        provider.close_feeds(&key);
        assert!(subscription.changes.recv().await.is_none());
    }

    #[tokio::test]
    async fn planner_rejects_degenerate_routes() {
        let provider = MemoryProvider::new();
        let point = GeoPoint::new(-36.85, 174.76);

        let err = provider.plan(point, point).await.unwrap_err();
        assert_eq!(err.code(), "route_unavailable");
    }
}
