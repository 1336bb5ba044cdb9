//! # Provider
//!
//! Provider defines external data interfaces for the tracking core. The
//! embedding application supplies implementations; the core never talks to a
//! device API, store, or speech backend directly.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::geo::GeoPoint;
use crate::route::Route;

/// Options for a single position fix request.
#[derive(Clone, Debug)]
pub struct FixOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
}

impl Default for FixOptions {
    fn default() -> Self {
        Self { high_accuracy: false, timeout: Duration::from_secs(10) }
    }
}

/// One raw reading from the device location source.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy in meters.
    pub accuracy: f64,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub heading: Option<f64>,
    /// Unix epoch milliseconds, monotonic per source.
    pub timestamp: i64,
}

/// The `Geolocator` trait defines the behavior for sampling the device
/// location source.
pub trait Geolocator: Send + Sync {
    /// Request one position fix.
    ///
    /// Fails with `PermissionDenied`, `Timeout`, or `SourceUnavailable`.
    fn sample(&self, options: &FixOptions) -> impl Future<Output = Result<RawFix>> + Send;
}

/// Identifies one record in the backing store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    pub collection: String,
    pub id: String,
}

impl RecordKey {
    #[must_use]
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self { collection: collection.into(), id: id.into() }
    }
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.collection, self.id)
    }
}

/// One change notification: the record before and after the update. A `None`
/// in `new` means the record was deleted.
#[derive(Clone, Debug)]
pub struct Change {
    pub old: Option<Value>,
    pub new: Option<Value>,
}

/// A live change feed for one record. The feed is dropped when the sender
/// side closes; a closed receiver is how the store signals a lost
/// subscription.
#[derive(Debug)]
pub struct Subscription {
    pub key: RecordKey,
    pub changes: mpsc::Receiver<Change>,
}

/// The `RecordStore` trait defines the behavior for reading and watching
/// trip state held by the backend.
pub trait RecordStore: Send + Sync {
    /// Read one record by key, `None` when absent.
    fn get(&self, key: &RecordKey) -> impl Future<Output = Result<Option<Value>>> + Send;

    /// Open a change feed for one record.
    fn subscribe(&self, key: &RecordKey) -> impl Future<Output = Result<Subscription>> + Send;
}

/// A speech synthesis request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpeechRequest {
    pub text: String,
    #[serde(default)]
    pub voice: Option<String>,
}

/// The `SpeechSynthesizer` trait turns instruction text into audio bytes.
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize speech audio for `request`.
    ///
    /// Fails with `SynthesisFailed`; callers treat the failure as
    /// reportable, never fatal.
    fn synthesize(&self, request: &SpeechRequest) -> impl Future<Output = Result<Bytes>> + Send;
}

/// Category of a user-facing notice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    StatusChanged,
    TrackingStarted,
    TrackingStopped,
    Reconnecting,
}

/// A fire-and-forget user-facing notice.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
}

impl Notice {
    #[must_use]
    pub fn new(kind: NoticeKind, title: impl Into<String>) -> Self {
        Self { kind, title: title.into(), body: None }
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// The `Notifier` trait delivers notices to the toast layer. No return value
/// is consumed; implementations swallow their own failures.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notice: &Notice);
}

/// The `RoutePlanner` trait defines the behavior for requesting a navigable
/// route from the routing provider.
pub trait RoutePlanner: Send + Sync {
    /// Plan a route between two points.
    ///
    /// Fails with `RouteUnavailable` when no feasible route exists.
    fn plan(
        &self, origin: GeoPoint, destination: GeoPoint,
    ) -> impl Future<Output = Result<Route>> + Send;
}
