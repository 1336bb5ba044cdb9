use std::env;
use std::time::Duration;

/// Sampler tuning knobs, env-overridable.
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    pub pedestrian_interval: Duration,
    pub driver_interval: Duration,
    pub min_interval: Duration,
    /// Battery percentage below which the interval doubles.
    pub battery_low_pct: f64,
    /// Battery percentage below which the interval triples.
    pub battery_critical_pct: f64,
    /// Speed, m/s, at which the interval reaches its floor.
    pub full_speed_mps: f64,
    pub buffer_cap: usize,
    pub cache_cap: usize,
    /// Consecutive source errors tolerated before degrading to offline.
    pub retry_budget: u32,
    /// Bound on the wait for the first fix during start.
    pub first_fix_wait: Duration,
    /// Minimum displacement, meters, kept by the compression pass.
    pub min_displacement_m: f64,
    /// Estimated battery cost per fix, percent.
    pub fix_cost_pct: f64,
    pub high_accuracy_fix_cost_pct: f64,
}

impl SamplerConfig {
    pub fn from_env() -> Self {
        Self {
            pedestrian_interval: Duration::from_millis(env_u64("SAMPLER_PEDESTRIAN_INTERVAL_MS", 5_000)),
            driver_interval: Duration::from_millis(env_u64("SAMPLER_DRIVER_INTERVAL_MS", 3_000)),
            min_interval: Duration::from_millis(env_u64("SAMPLER_MIN_INTERVAL_MS", 1_000)),
            battery_low_pct: env_f64("SAMPLER_BATTERY_LOW_PCT", 20.0),
            battery_critical_pct: env_f64("SAMPLER_BATTERY_CRITICAL_PCT", 10.0),
            full_speed_mps: env_f64("SAMPLER_FULL_SPEED_MPS", 25.0),
            buffer_cap: env_usize("SAMPLER_BUFFER_CAP", 500),
            cache_cap: env_usize("SAMPLER_CACHE_CAP", 50),
            retry_budget: u32::try_from(env_u64("SAMPLER_RETRY_BUDGET", 3)).unwrap_or(3),
            first_fix_wait: Duration::from_millis(env_u64("SAMPLER_FIRST_FIX_WAIT_MS", 10_000)),
            min_displacement_m: env_f64("SAMPLER_MIN_DISPLACEMENT_M", 10.0),
            fix_cost_pct: env_f64("SAMPLER_FIX_COST_PCT", 0.008),
            high_accuracy_fix_cost_pct: env_f64("SAMPLER_HIGH_ACCURACY_FIX_COST_PCT", 0.02),
        }
    }
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|value| value.parse::<u64>().ok()).unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key).ok().and_then(|value| value.parse::<usize>().ok()).unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key).ok().and_then(|value| value.parse::<f64>().ok()).unwrap_or(default)
}
