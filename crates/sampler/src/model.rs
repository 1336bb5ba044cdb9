use realtime::{GeoPoint, RawFix};
use serde::{Deserialize, Serialize};

/// Movement profile the sampler is tuned for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    #[default]
    Pedestrian,
    Driver,
}

/// Caller-supplied sampling options.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SampleOptions {
    pub profile: Profile,
    pub high_accuracy: bool,
    pub battery_optimized: bool,
    pub adaptive_interval: bool,
    pub caching_enabled: bool,
    pub compression_enabled: bool,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            profile: Profile::Pedestrian,
            high_accuracy: false,
            battery_optimized: true,
            adaptive_interval: true,
            caching_enabled: true,
            compression_enabled: true,
        }
    }
}

impl SampleOptions {
    #[must_use]
    pub fn driver() -> Self {
        Self { profile: Profile::Driver, high_accuracy: true, ..Self::default() }
    }
}

/// One normalized position reading. Immutable once created; ordered by
/// `timestamp` within the source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSample {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy in meters.
    pub accuracy: f64,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub heading: Option<f64>,
    /// Unix epoch milliseconds.
    pub timestamp: i64,
}

impl PositionSample {
    #[must_use]
    pub const fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

impl From<RawFix> for PositionSample {
    fn from(fix: RawFix) -> Self {
        Self {
            latitude: fix.latitude,
            longitude: fix.longitude,
            accuracy: fix.accuracy,
            speed: fix.speed,
            heading: fix.heading,
            timestamp: fix.timestamp,
        }
    }
}

/// Rolling sampler counters. Owned exclusively by the sampler task and reset
/// only on restart; consumers receive snapshots.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingStats {
    pub samples_accepted: u64,
    /// Estimated battery drain attributable to sampling, in percent.
    pub battery_cost_pct: f64,
    /// Kept-to-buffered ratio after compression; 1.0 when nothing was thinned.
    pub compression_ratio: f64,
    pub mean_accuracy_m: f64,
    pub uptime_s: u64,
    pub network_errors: u64,
}

/// Network reachability as seen by the sampler.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkStatus {
    #[default]
    Online,
    Offline,
}

/// Current sampler posture; recomputed on every sample and on every battery
/// or network signal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplerStatus {
    pub interval_ms: u64,
    /// Battery level in percent, 0–100.
    pub battery_level: f64,
    pub network_status: NetworkStatus,
    pub buffer_size: usize,
    pub cache_size: usize,
}

impl Default for SamplerStatus {
    fn default() -> Self {
        Self {
            interval_ms: 0,
            battery_level: 100.0,
            network_status: NetworkStatus::Online,
            buffer_size: 0,
            cache_size: 0,
        }
    }
}
