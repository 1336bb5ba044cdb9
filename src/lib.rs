//! # Tracking
//!
//! Realtime trip tracking features for the Velora platform: adaptive
//! location sampling, unified trip-state synchronization, and turn-by-turn
//! navigation, composed over one provider supplied by the embedding
//! application.
//!
//! The provider implements the collaborator traits from the `realtime`
//! crate; [`memory`] ships in-process reference implementations used by the
//! integration tests and demos.

mod config;
pub mod memory;

use std::sync::Arc;

pub use navigator::{NavConfig, NavPhase, NavigationState, Navigator, VoiceInstruction};
pub use realtime::{
    Change, Error, FixOptions, GeoPoint, Geolocator, ManeuverType, Notice, NoticeKind, Notifier,
    RawFix, RecordKey, RecordStore, Result, Route, RoutePlanner, RouteStep, SpeechRequest,
    SpeechSynthesizer, Subscription, bearing_deg, distance_m,
};
pub use sampler::{
    Disposer, NetworkStatus, OfflineBuffer, PositionSample, Profile, SampleOptions, Sampler,
    SamplerConfig, SamplerStatus, Subscriber, TrackingStats,
};
pub use trip_sync::{
    ConnectionStatus, Counterparty, CounterpartyLocation, Place, Pricing, ProgressTables,
    SyncConfig, Timing, TrackingData, TripKind, TripRoute, TripWatch, TripWatcher, WatchOptions,
};

pub use crate::config::Config;

/// Composition facade: wires one provider into the three tracking
/// components.
#[derive(Debug)]
pub struct TrackingCore<P> {
    provider: Arc<P>,
    config: Config,
    tables: ProgressTables,
}

impl<P> TrackingCore<P>
where
    P: Geolocator + RecordStore + Notifier + RoutePlanner + SpeechSynthesizer + 'static,
{
    #[must_use]
    pub fn new(provider: P) -> Self {
        Self::with_config(Arc::new(provider), Config::from_env())
    }

    #[must_use]
    pub fn with_config(provider: Arc<P>, config: Config) -> Self {
        Self { provider, config, tables: ProgressTables::default() }
    }

    /// Replaces the status→progress tables supplied to trip watches.
    #[must_use]
    pub fn with_tables(mut self, tables: ProgressTables) -> Self {
        self.tables = tables;
        self
    }

    #[must_use]
    pub fn provider(&self) -> Arc<P> {
        Arc::clone(&self.provider)
    }

    /// Starts the position sampler.
    ///
    /// # Errors
    ///
    /// Fails with `PermissionDenied` or `SourceUnavailable` per
    /// [`Sampler::start`].
    pub async fn start_tracking(&self, options: SampleOptions) -> Result<Sampler> {
        Sampler::start_with_config(self.provider(), options, self.config.sampler.clone()).await
    }

    /// Watches one trip, keeping its [`TrackingData`] synchronized.
    ///
    /// # Errors
    ///
    /// Fails with `NotFound` or `LoadError` per [`TripWatcher::watch`].
    pub async fn watch_trip(
        &self, trip_id: &str, kind: TripKind, options: WatchOptions,
    ) -> Result<TripWatch> {
        let watcher = TripWatcher::with_config(
            self.provider(),
            self.config.sync.clone(),
            self.tables.clone(),
        );
        watcher.watch(trip_id, kind, options).await
    }

    /// Starts turn-by-turn navigation fed by `source`.
    ///
    /// # Errors
    ///
    /// Fails with `RouteUnavailable` per [`Navigator::start`].
    pub async fn navigate(
        &self, source: &Sampler, origin: GeoPoint, destination: GeoPoint,
    ) -> Result<Navigator> {
        Navigator::start_with_config(
            self.provider(),
            source,
            origin,
            destination,
            self.config.nav.clone(),
        )
        .await
    }
}
