use std::env;
use std::time::Duration;

use realtime::RecordKey;

use crate::model::TripKind;

/// Trip synchronization knobs, env-overridable.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub delivery_collection: String,
    pub taxi_collection: String,
    pub marketplace_collection: String,
    pub location_collection: String,
    /// Remaining time under which the ETA label clamps to "imminent".
    pub eta_imminent: Duration,
}

impl SyncConfig {
    pub fn from_env() -> Self {
        Self {
            delivery_collection: env_string("SYNC_DELIVERY_COLLECTION", "deliveries"),
            taxi_collection: env_string("SYNC_TAXI_COLLECTION", "rides"),
            marketplace_collection: env_string("SYNC_MARKETPLACE_COLLECTION", "orders"),
            location_collection: env_string("SYNC_LOCATION_COLLECTION", "courier_locations"),
            eta_imminent: Duration::from_secs(env_u64("SYNC_ETA_IMMINENT_SECS", 60)),
        }
    }

    #[must_use]
    pub fn collection(&self, kind: TripKind) -> &str {
        match kind {
            TripKind::Delivery => &self.delivery_collection,
            TripKind::Taxi => &self.taxi_collection,
            TripKind::Marketplace => &self.marketplace_collection,
        }
    }

    #[must_use]
    pub fn trip_key(&self, kind: TripKind, trip_id: &str) -> RecordKey {
        RecordKey::new(self.collection(kind), trip_id)
    }

    #[must_use]
    pub fn location_key(&self, counterparty_id: &str) -> RecordKey {
        RecordKey::new(&self.location_collection, counterparty_id)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|value| value.parse::<u64>().ok()).unwrap_or(default)
}
