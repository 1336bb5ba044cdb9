use std::sync::Arc;

use realtime::{
    Change, Error, Notice, NoticeKind, Notifier, RecordKey, RecordStore, Result, Subscription,
};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::model::{ConnectionStatus, CounterpartyLocation, TrackingData, TripKind};
use crate::normalize::{self, ProgressTables};
use crate::records::LiveLocationRecord;

/// Caller-supplied watch options.
#[derive(Clone, Copy, Debug)]
pub struct WatchOptions {
    pub auto_refresh: bool,
    pub notify: bool,
    pub live_counterparty_location: bool,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self { auto_refresh: true, notify: true, live_counterparty_location: true }
    }
}

enum WatchCommand {
    Refresh,
    Unwatch,
}

/// Builds trip watches against one provider.
#[derive(Debug)]
pub struct TripWatcher<P> {
    provider: Arc<P>,
    config: SyncConfig,
    tables: Arc<ProgressTables>,
}

impl<P> TripWatcher<P>
where
    P: RecordStore + Notifier + 'static,
{
    #[must_use]
    pub fn new(provider: Arc<P>) -> Self {
        Self::with_config(provider, SyncConfig::from_env(), ProgressTables::default())
    }

    #[must_use]
    pub fn with_config(provider: Arc<P>, config: SyncConfig, tables: ProgressTables) -> Self {
        Self { provider, config, tables: Arc::new(tables) }
    }

    /// Loads the trip once and starts keeping it synchronized.
    ///
    /// # Errors
    ///
    /// Fails with `NotFound` when no record exists for `trip_id` and
    /// `LoadError` when the initial load or subscription setup fails.
    pub async fn watch(
        &self, trip_id: &str, kind: TripKind, options: WatchOptions,
    ) -> Result<TripWatch> {
        let key = self.config.trip_key(kind, trip_id);

        let value = self
            .provider
            .get(&key)
            .await
            .map_err(|err| Error::LoadError(format!("loading {key}: {err}")))?
            .ok_or_else(|| Error::NotFound(format!("no record for {key}")))?;

        let data = normalize::normalize(kind, &value, &self.tables)?;
        info!(trip_id, %kind, status = %data.status, "watching trip");

        let mut trip_sub = None;
        let mut loc_sub = None;
        let counterparty_id = data.counterparty.as_ref().map(|c| c.id.clone());

        if options.auto_refresh {
            trip_sub = Some(self.subscribe(&key).await?);

            if options.live_counterparty_location
                && let Some(id) = &counterparty_id
            {
                loc_sub = Some(self.subscribe(&self.config.location_key(id)).await?);
            }
        }

        if options.notify {
            self.provider
                .notify(&Notice::new(NoticeKind::TrackingStarted, data.status_label()))
                .await;
        }

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (data_tx, data_rx) = watch::channel(data);
        let (conn_tx, conn_rx) = watch::channel(ConnectionStatus::Connected);

        let task = WatchTask {
            provider: Arc::clone(&self.provider),
            config: self.config.clone(),
            tables: Arc::clone(&self.tables),
            key,
            kind,
            options,
            commands: commands_rx,
            data_tx,
            conn_tx,
            trip_sub,
            loc_sub,
            counterparty_id,
            trip_retry: true,
            loc_retry: true,
        };
        tokio::spawn(task.run());

        Ok(TripWatch { commands: commands_tx, data: data_rx, connection: conn_rx })
    }

    async fn subscribe(&self, key: &RecordKey) -> Result<Subscription> {
        self.provider
            .subscribe(key)
            .await
            .map_err(|err| Error::LoadError(format!("subscribing to {key}: {err}")))
    }
}

/// Handle to one watched trip. Consumers read [`TrackingData`] snapshots;
/// all mutation happens inside the owning task.
#[derive(Clone, Debug)]
pub struct TripWatch {
    commands: mpsc::UnboundedSender<WatchCommand>,
    data: watch::Receiver<TrackingData>,
    connection: watch::Receiver<ConnectionStatus>,
}

impl TripWatch {
    #[must_use]
    pub fn data(&self) -> TrackingData {
        self.data.borrow().clone()
    }

    #[must_use]
    pub fn connection_status(&self) -> ConnectionStatus {
        *self.connection.borrow()
    }

    /// Forces a one-shot reload, for use when `auto_refresh` is off or a
    /// missed notification is suspected.
    pub fn refresh(&self) {
        let _ = self.commands.send(WatchCommand::Refresh);
    }

    /// Stops watching and closes both change feeds. Safe to call repeatedly
    /// and from inside a change handler.
    pub fn unwatch(&self) {
        let _ = self.commands.send(WatchCommand::Unwatch);
    }

    /// Waits for the next data snapshot.
    pub async fn changed(&mut self) -> TrackingData {
        let _ = self.data.changed().await;
        self.data.borrow().clone()
    }

    /// Waits for the next connection-status change.
    pub async fn connection_changed(&mut self) -> ConnectionStatus {
        let _ = self.connection.changed().await;
        *self.connection.borrow()
    }
}

struct WatchTask<P> {
    provider: Arc<P>,
    config: SyncConfig,
    tables: Arc<ProgressTables>,
    key: RecordKey,
    kind: TripKind,
    options: WatchOptions,
    commands: mpsc::UnboundedReceiver<WatchCommand>,
    data_tx: watch::Sender<TrackingData>,
    conn_tx: watch::Sender<ConnectionStatus>,
    trip_sub: Option<Subscription>,
    loc_sub: Option<Subscription>,
    counterparty_id: Option<String>,
    /// One automatic reconnect per dropped subscription; restored only once
    /// the replacement feed proves healthy by delivering a change.
    trip_retry: bool,
    loc_retry: bool,
}

impl<P> WatchTask<P>
where
    P: RecordStore + Notifier + 'static,
{
    async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    None | Some(WatchCommand::Unwatch) => break,
                    Some(WatchCommand::Refresh) => {
                        if !self.reload().await {
                            break;
                        }
                    }
                },
                change = Self::next_change(&mut self.trip_sub) => match change {
                    Some(change) => {
                        self.trip_retry = true;
                        if !self.trip_changed(change).await {
                            break;
                        }
                    }
                    None => self.trip_dropped().await,
                },
                change = Self::next_change(&mut self.loc_sub) => match change {
                    Some(change) => {
                        self.loc_retry = true;
                        self.location_changed(&change);
                    }
                    None => self.location_dropped().await,
                },
            }
        }

        if self.options.notify {
            self.provider
                .notify(&Notice::new(NoticeKind::TrackingStopped, "Tracking stopped"))
                .await;
        }
        debug!(key = %self.key, "trip watch stopped");
    }

    async fn next_change(sub: &mut Option<Subscription>) -> Option<Change> {
        match sub {
            Some(subscription) => subscription.changes.recv().await,
            None => std::future::pending().await,
        }
    }

    /// Full reload-and-renormalize; simpler and safer than patching fields,
    /// since the backend shape varies by kind.
    async fn trip_changed(&mut self, change: Change) -> bool {
        if change.new.is_none() {
            warn!(key = %self.key, "trip record deleted, stopping watch");
            let _ = self.conn_tx.send_replace(ConnectionStatus::Disconnected);
            return false;
        }
        self.reload().await
    }

    async fn reload(&mut self) -> bool {
        let value = match self.provider.get(&self.key).await {
            Ok(Some(value)) => value,
            Ok(None) => {
                warn!(key = %self.key, "trip record gone on reload, stopping watch");
                let _ = self.conn_tx.send_replace(ConnectionStatus::Disconnected);
                return false;
            }
            Err(err) => {
                warn!(key = %self.key, error = %err, "trip reload failed");
                return true;
            }
        };

        let fresh = match normalize::normalize(self.kind, &value, &self.tables) {
            Ok(fresh) => fresh,
            Err(err) => {
                warn!(key = %self.key, error = %err, "trip record failed to normalize");
                return true;
            }
        };

        let previous = self.data_tx.borrow().clone();
        let mut next = fresh;
        // counterparty location is owned by the location stream; reloads
        // never regress it
        next.counterparty_location = previous.counterparty_location.clone();

        let status_changed = next.status != previous.status;
        let next_counterparty = next.counterparty.as_ref().map(|c| c.id.clone());
        let label = next.status_label();
        let _ = self.data_tx.send_replace(next);

        if status_changed {
            debug!(key = %self.key, status = label, "trip status changed");
            if self.options.notify {
                self.provider.notify(&Notice::new(NoticeKind::StatusChanged, label)).await;
            }
        }

        if next_counterparty != self.counterparty_id {
            self.reopen_location(next_counterparty).await;
        }

        true
    }

    /// The location stream is the one field allowed to mutate without a full
    /// reconciliation; it arrives at much higher frequency.
    fn location_changed(&mut self, change: &Change) {
        let Some(value) = &change.new else {
            return;
        };

        let record = match serde_json::from_value::<LiveLocationRecord>(value.clone()) {
            Ok(record) => record,
            Err(err) => {
                warn!(key = %self.key, error = %err, "malformed live location record");
                return;
            }
        };

        let incoming = CounterpartyLocation {
            latitude: record.lat,
            longitude: record.lng,
            heading: record.heading,
            speed: record.speed,
            last_update: record.updated_at,
        };

        let _ = self.data_tx.send_if_modified(|data| {
            if let Some(existing) = &data.counterparty_location
                && existing.last_update >= incoming.last_update
            {
                debug!(
                    key = %self.key,
                    last_update = incoming.last_update,
                    stored = existing.last_update,
                    "stale counterparty location ignored"
                );
                return false;
            }
            data.counterparty_location = Some(incoming.clone());
            true
        });
    }

    async fn reopen_location(&mut self, counterparty_id: Option<String>) {
        self.counterparty_id = counterparty_id;
        self.loc_sub = None;
        self.loc_retry = true;

        if !self.options.auto_refresh || !self.options.live_counterparty_location {
            return;
        }

        if let Some(id) = &self.counterparty_id {
            let key = self.config.location_key(id);
            match self.provider.subscribe(&key).await {
                Ok(sub) => {
                    debug!(key = %key, "following counterparty location");
                    self.loc_sub = Some(sub);
                }
                Err(err) => warn!(key = %key, error = %err, "location subscribe failed"),
            }
        }
    }

    async fn trip_dropped(&mut self) {
        if !self.trip_retry {
            self.trip_sub = None;
            let _ = self.conn_tx.send_replace(ConnectionStatus::Disconnected);
            warn!(key = %self.key, "trip feed lost, reconnect budget spent");
            return;
        }
        self.trip_retry = false;

        let _ = self.conn_tx.send_replace(ConnectionStatus::Reconnecting);
        if self.options.notify {
            self.provider
                .notify(&Notice::new(NoticeKind::Reconnecting, "Reconnecting to trip updates"))
                .await;
        }

        match self.provider.subscribe(&self.key).await {
            Ok(sub) => {
                self.trip_sub = Some(sub);
                let _ = self.conn_tx.send_replace(ConnectionStatus::Connected);
                // catch up on anything missed while the feed was down
                let _ = self.reload().await;
            }
            Err(err) => {
                warn!(key = %self.key, error = %err, "trip feed reconnect failed");
                self.trip_sub = None;
                let _ = self.conn_tx.send_replace(ConnectionStatus::Disconnected);
            }
        }
    }

    async fn location_dropped(&mut self) {
        if !self.loc_retry {
            self.loc_sub = None;
            warn!(key = %self.key, "location feed lost, reconnect budget spent");
            return;
        }
        self.loc_retry = false;
        self.loc_sub = None;

        if let Some(id) = self.counterparty_id.clone() {
            let key = self.config.location_key(&id);
            match self.provider.subscribe(&key).await {
                Ok(sub) => self.loc_sub = Some(sub),
                Err(err) => warn!(key = %key, error = %err, "location feed reconnect failed"),
            }
        }
    }
}
