//! Full-pipeline test: a delivery is watched from the rider side while the
//! courier side samples positions and navigates to the dropoff, all against
//! the in-memory reference provider.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::time::timeout;
use tracking::memory::MemoryProvider;
use tracking::{
    Config, ConnectionStatus, GeoPoint, NavPhase, Navigator, NoticeKind, RawFix, RecordKey,
    SampleOptions, TrackingCore, TripKind, WatchOptions,
};

const PICKUP: GeoPoint = GeoPoint::new(-36.8485, 174.7633);
const DROPOFF: GeoPoint = GeoPoint::new(-36.8571, 174.7654);

fn delivery(status: &str) -> serde_json::Value {
    json!({
        "id": "dlv-1",
        "status": status,
        "courier": {"id": "courier-1", "name": "Mere T.", "vehicleType": "bike"},
        "pickupLat": PICKUP.latitude,
        "pickupLng": PICKUP.longitude,
        "pickupAddress": "1 Queen St",
        "dropoffLat": DROPOFF.latitude,
        "dropoffLng": DROPOFF.longitude,
        "dropoffAddress": "50 Symonds St",
        "deliveryFee": 8.5,
        "currency": "NZD",
        "createdAt": 1_700_000_000_000_i64,
        "estimatedDeliveryTime": 1_700_000_900_000_i64
    })
}

fn fix(point: GeoPoint, timestamp: i64) -> RawFix {
    RawFix {
        latitude: point.latitude,
        longitude: point.longitude,
        accuracy: 5.0,
        speed: Some(6.0),
        heading: None,
        timestamp,
    }
}

fn trip_key() -> RecordKey {
    RecordKey::new("deliveries", "dlv-1")
}

fn courier_key() -> RecordKey {
    RecordKey::new("courier_locations", "courier-1")
}

async fn wait_for_arrival(navigator: &mut Navigator) {
    timeout(Duration::from_secs(120), async {
        loop {
            let state = navigator.state_changed().await;
            if state.phase == NavPhase::Arrived {
                return;
            }
        }
    })
    .await
    .expect("courier should arrive");
}

#[tokio::test(start_paused = true)]
async fn delivery_tracked_end_to_end() {
    let provider = Arc::new(MemoryProvider::new());
    provider.insert_record(&trip_key(), delivery("picked_up"));

    // courier-side fixes: probe at pickup, midpoint, then the dropoff
    provider.push_fix(fix(PICKUP, 1_000));
    provider.push_fix(fix(GeoPoint::new(-36.8528, 174.76435), 2_000));
    provider.push_fix(fix(DROPOFF, 3_000));

    let core = TrackingCore::with_config(Arc::clone(&provider), Config::from_env());

    // rider side: watch the delivery
    let mut watch = core
        .watch_trip("dlv-1", TripKind::Delivery, WatchOptions::default())
        .await
        .expect("trip should be watchable");

    let data = watch.data();
    assert_eq!(data.status, "picked_up");
    assert_eq!(data.progress, 60);
    assert_eq!(data.counterparty.as_ref().map(|c| c.name.as_str()), Some("Mere T."));
    assert_eq!(watch.connection_status(), ConnectionStatus::Connected);

    // courier position feed updates the tracking model in place
    provider
        .update_record(
            &courier_key(),
            json!({"lat": -36.8520, "lng": 174.7640, "updatedAt": 2_000}),
        )
        .await;
    let data = timeout(Duration::from_secs(5), watch.changed())
        .await
        .expect("location should propagate");
    assert_eq!(data.counterparty_location.as_ref().map(|l| l.last_update), Some(2_000));

    // a stale location update must not regress the stored position
    provider
        .update_record(
            &courier_key(),
            json!({"lat": -36.8500, "lng": 174.7630, "updatedAt": 1_000}),
        )
        .await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(watch.data().counterparty_location.map(|l| l.last_update), Some(2_000));

    // status progression triggers a reload and renormalization
    provider.update_record(&trip_key(), delivery("in_transit")).await;
    let data = timeout(Duration::from_secs(5), watch.changed())
        .await
        .expect("status should propagate");
    assert_eq!(data.progress, 75);
    assert_eq!(data.status_label(), "On the way");
    assert!(data.is_active());

    // courier side: sample positions and navigate to the dropoff
    let source = core
        .start_tracking(SampleOptions::driver())
        .await
        .expect("sampling should start");
    let mut navigator = core
        .navigate(&source, PICKUP, DROPOFF)
        .await
        .expect("navigation should start");

    wait_for_arrival(&mut navigator).await;
    let state = navigator.state();
    assert!(!state.is_active);
    assert!(state.remaining_distance_m < 30.0);

    // delivery completes
    provider.update_record(&trip_key(), delivery("delivered")).await;
    let data = timeout(Duration::from_secs(5), watch.changed())
        .await
        .expect("completion should propagate");
    assert!(data.is_completed());
    assert!(!data.is_active());

    navigator.stop();
    source.stop();
    watch.unwatch();

    let notices = provider.notices();
    assert!(notices.iter().any(|notice| notice.kind == NoticeKind::TrackingStarted));
    assert!(notices.iter().any(|notice| notice.kind == NoticeKind::StatusChanged));
}

#[tokio::test]
async fn missing_trip_fails_fast() {
    let provider = Arc::new(MemoryProvider::new());
    let core = TrackingCore::with_config(provider, Config::from_env());

    let err = core
        .watch_trip("ghost", TripKind::Delivery, WatchOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "not_found");
}
