use navigator::NavConfig;
use sampler::SamplerConfig;
use trip_sync::SyncConfig;

/// Aggregated tuning for the tracking core, env-overridable per section.
#[derive(Debug, Clone)]
pub struct Config {
    pub sampler: SamplerConfig,
    pub sync: SyncConfig,
    pub nav: NavConfig,
}

impl Config {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            sampler: SamplerConfig::from_env(),
            sync: SyncConfig::from_env(),
            nav: NavConfig::from_env(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
