use std::time::Duration;

use crate::config::SamplerConfig;
use crate::model::{Profile, SampleOptions};

/// Computes the next sampling interval.
///
/// The base interval is fixed per profile. With `adaptive_interval` the
/// interval shortens linearly with speed down to the configured floor, and
/// with `battery_optimized` it lengthens by 100% under the low-battery
/// threshold and by 200% under the critical threshold.
#[must_use]
pub fn next_interval(
    options: &SampleOptions, config: &SamplerConfig, speed: Option<f64>, battery_pct: f64,
) -> Duration {
    let base = match options.profile {
        Profile::Pedestrian => config.pedestrian_interval,
        Profile::Driver => config.driver_interval,
    };

    if !options.adaptive_interval {
        return base.max(config.min_interval);
    }

    let base_ms = millis(base);
    let min_ms = millis(config.min_interval);

    // faster movement shortens the interval, bounded below
    let speed_ratio = (speed.unwrap_or(0.0).max(0.0) / config.full_speed_mps).clamp(0.0, 1.0);
    let mut interval_ms = base_ms - (base_ms - min_ms.min(base_ms)) * speed_ratio;

    // low battery lengthens it
    if options.battery_optimized {
        if battery_pct < config.battery_critical_pct {
            interval_ms *= 3.0;
        } else if battery_pct < config.battery_low_pct {
            interval_ms *= 2.0;
        }
    }

    Duration::from_millis(interval_ms.max(min_ms) as u64)
}

#[allow(clippy::cast_precision_loss)]
fn millis(duration: Duration) -> f64 {
    duration.as_millis() as f64
}
