use std::fmt::{self, Display};
use std::time::Duration;

use chrono::DateTime;
use realtime::GeoPoint;
use serde::{Deserialize, Serialize};

use crate::normalize;

/// Which backend record kind a trip originates from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripKind {
    Delivery,
    Taxi,
    Marketplace,
}

impl Display for TripKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delivery => f.write_str("delivery"),
            Self::Taxi => f.write_str("taxi"),
            Self::Marketplace => f.write_str("marketplace"),
        }
    }
}

/// The other party in a trip, once assigned.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counterparty {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub vehicle: Option<String>,
}

/// A named location on the trip route.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub point: GeoPoint,
    pub address: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripRoute {
    pub pickup: Place,
    pub destination: Place,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pricing {
    pub amount: f64,
    pub currency: String,
    #[serde(default)]
    pub estimated: bool,
}

/// Unix epoch milliseconds throughout.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timing {
    pub created_at: i64,
    #[serde(default)]
    pub estimated_arrival: Option<i64>,
    #[serde(default)]
    pub completed_at: Option<i64>,
}

/// Last known counterparty position. Updates arrive at high frequency and
/// patch this field in place, guarded by `last_update`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterpartyLocation {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
    pub last_update: i64,
}

impl CounterpartyLocation {
    #[must_use]
    pub const fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// Unified, domain-agnostic projection of one trip record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingData {
    pub id: String,
    pub kind: TripKind,
    /// Raw backend status string.
    pub status: String,
    #[serde(default)]
    pub counterparty: Option<Counterparty>,
    pub route: TripRoute,
    pub pricing: Pricing,
    pub timing: Timing,
    /// 0–100, a pure function of `(kind, status)`, never of geography.
    pub progress: u8,
    #[serde(default)]
    pub counterparty_location: Option<CounterpartyLocation>,
}

impl TrackingData {
    /// Kind-aware human label for the current status.
    #[must_use]
    pub fn status_label(&self) -> &'static str {
        normalize::status_label(self.kind, &self.status)
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.progress == 100
    }

    /// True while the status is not in the kind's terminal set.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !normalize::is_terminal(self.kind, &self.status)
    }

    /// Human ETA relative to `now_ms`, clamped to "imminent" within the
    /// threshold. `None` when no arrival estimate exists or the trip is done.
    #[must_use]
    pub fn eta_label(&self, now_ms: i64, imminent_within: Duration) -> Option<String> {
        if self.is_completed() {
            return None;
        }
        let arrival = self.timing.estimated_arrival?;
        let remaining_ms = arrival - now_ms;
        let imminent_ms = i64::try_from(imminent_within.as_millis()).unwrap_or(i64::MAX);

        if remaining_ms <= imminent_ms {
            return Some("imminent".to_string());
        }

        let minutes = remaining_ms / 60_000;
        if minutes >= 60 {
            Some(format!("{} h {} min", minutes / 60, minutes % 60))
        } else {
            Some(format!("{minutes} min"))
        }
    }

    /// Estimated arrival as a UTC wall-clock label, e.g. `14:32`.
    #[must_use]
    pub fn eta_clock(&self) -> Option<String> {
        self.timing
            .estimated_arrival
            .and_then(DateTime::from_timestamp_millis)
            .map(|arrival| arrival.format("%H:%M").to_string())
    }
}

/// Health of the change-notification link backing a watch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Connected,
    Reconnecting,
    Disconnected,
}
