use std::env;
use std::time::Duration;

/// Navigator tuning knobs, env-overridable.
#[derive(Debug, Clone)]
pub struct NavConfig {
    /// Cross-track tolerance, meters, before the traveler counts as off-route.
    pub corridor_tolerance_m: f64,
    /// Remaining distance, meters, under which the trip counts as arrived.
    pub arrival_threshold_m: f64,
    /// Distance to a maneuver, meters, at which it is announced.
    pub instruction_trigger_m: f64,
    /// Slack, meters, when judging a synthesized instruction stale.
    pub stale_instruction_slack_m: f64,
    pub recalc_max_retries: u32,
    pub recalc_backoff: Duration,
    /// Speed assumed for duration estimates when the fix carries none.
    pub fallback_speed_mps: f64,
    /// Voice requested from the speech backend.
    pub voice: Option<String>,
}

impl NavConfig {
    pub fn from_env() -> Self {
        Self {
            corridor_tolerance_m: env_f64("NAV_CORRIDOR_TOLERANCE_M", 50.0),
            arrival_threshold_m: env_f64("NAV_ARRIVAL_THRESHOLD_M", 30.0),
            instruction_trigger_m: env_f64("NAV_INSTRUCTION_TRIGGER_M", 200.0),
            stale_instruction_slack_m: env_f64("NAV_STALE_INSTRUCTION_SLACK_M", 15.0),
            recalc_max_retries: u32::try_from(env_u64("NAV_RECALC_MAX_RETRIES", 3)).unwrap_or(3),
            recalc_backoff: Duration::from_millis(env_u64("NAV_RECALC_BACKOFF_MS", 2_000)),
            fallback_speed_mps: env_f64("NAV_FALLBACK_SPEED_MPS", 8.0),
            voice: env::var("NAV_VOICE").ok(),
        }
    }
}

impl Default for NavConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|value| value.parse::<u64>().ok()).unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key).ok().and_then(|value| value.parse::<f64>().ok()).unwrap_or(default)
}
