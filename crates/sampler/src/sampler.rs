use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use realtime::{Error, FixOptions, Geolocator, RawFix, Result};
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::buffer::OfflineBuffer;
use crate::config::SamplerConfig;
use crate::interval::next_interval;
use crate::model::{NetworkStatus, PositionSample, SampleOptions, SamplerStatus, TrackingStats};

/// Callbacks registered by one consumer of the position stream. All three are
/// independent; any subset may be set.
#[derive(Default)]
pub struct Subscriber {
    on_sample: Option<Box<dyn Fn(&PositionSample) + Send>>,
    on_error: Option<Box<dyn Fn(&Error) + Send>>,
    on_stats: Option<Box<dyn Fn(&TrackingStats) + Send>>,
}

impl Subscriber {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on_sample(mut self, callback: impl Fn(&PositionSample) + Send + 'static) -> Self {
        self.on_sample = Some(Box::new(callback));
        self
    }

    #[must_use]
    pub fn on_error(mut self, callback: impl Fn(&Error) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }

    #[must_use]
    pub fn on_stats(mut self, callback: impl Fn(&TrackingStats) + Send + 'static) -> Self {
        self.on_stats = Some(Box::new(callback));
        self
    }
}

enum Command {
    Subscribe(Uuid, Subscriber),
    Unsubscribe(Uuid),
    Battery(f64),
    Network(bool),
    Stop,
}

/// Revokes one subscription. Disposal is idempotent and unsubscribing one
/// consumer never affects the others.
pub struct Disposer {
    id: Uuid,
    commands: mpsc::UnboundedSender<Command>,
    disposed: AtomicBool,
}

impl Disposer {
    pub fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::SeqCst) {
            let _ = self.commands.send(Command::Unsubscribe(self.id));
        }
    }
}

/// Handle to the running sampler task.
///
/// One physical location source, many logical subscribers: the task owns all
/// mutable state and every consumer works from snapshots or callbacks.
#[derive(Clone, Debug)]
pub struct Sampler {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<SamplerStatus>,
    stats: watch::Receiver<TrackingStats>,
}

impl Sampler {
    /// Starts continuous sampling with tuning taken from the environment.
    ///
    /// # Errors
    ///
    /// Fails with `PermissionDenied` when the location source refuses access
    /// and `SourceUnavailable` when no usable source exists. A slow first fix
    /// is not an error; sampling continues in the background.
    pub async fn start<G>(provider: Arc<G>, options: SampleOptions) -> Result<Self>
    where
        G: Geolocator + 'static,
    {
        Self::start_with_config(provider, options, SamplerConfig::from_env()).await
    }

    /// Starts continuous sampling with explicit tuning.
    ///
    /// # Errors
    ///
    /// Same contract as [`Sampler::start`].
    pub async fn start_with_config<G>(
        provider: Arc<G>, options: SampleOptions, config: SamplerConfig,
    ) -> Result<Self>
    where
        G: Geolocator + 'static,
    {
        let fix_options =
            FixOptions { high_accuracy: options.high_accuracy, timeout: config.first_fix_wait };

        // probe the source once so permission and availability problems fail
        // the start synchronously
        let first = match provider.sample(&fix_options).await {
            Ok(fix) => Some(fix),
            Err(err @ (Error::PermissionDenied(_) | Error::SourceUnavailable(_))) => {
                return Err(err);
            }
            Err(err) => {
                warn!(error = %err, "first fix not observed within bound, sampling continues");
                None
            }
        };

        let initial_stats = TrackingStats { compression_ratio: 1.0, ..TrackingStats::default() };
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(SamplerStatus::default());
        let (stats_tx, stats_rx) = watch::channel(initial_stats.clone());

        let mut task = Task {
            provider,
            buffer: OfflineBuffer::new(config.buffer_cap),
            options,
            config,
            commands: commands_rx,
            subscribers: Vec::new(),
            status_tx,
            stats_tx,
            stats: initial_stats,
            status: SamplerStatus::default(),
            cache: VecDeque::new(),
            accuracy_sum: 0.0,
            buffered_total: 0,
            kept_total: 0,
            last_timestamp: 0,
            last_speed: None,
            consecutive_errors: 0,
            host_online: true,
            degraded: false,
            started: Instant::now(),
        };

        if let Some(fix) = first {
            task.accept(fix);
        }

        tokio::spawn(task.run());

        Ok(Self { commands: commands_tx, status: status_rx, stats: stats_rx })
    }

    /// Registers callbacks; returns the subscription's disposer.
    pub fn subscribe(&self, subscriber: Subscriber) -> Disposer {
        let id = Uuid::new_v4();
        let _ = self.commands.send(Command::Subscribe(id, subscriber));
        Disposer { id, commands: self.commands.clone(), disposed: AtomicBool::new(false) }
    }

    /// Reports the device battery level, percent.
    pub fn report_battery(&self, level_pct: f64) {
        let _ = self.commands.send(Command::Battery(level_pct));
    }

    /// Reports network reachability.
    pub fn report_network(&self, online: bool) {
        let _ = self.commands.send(Command::Network(online));
    }

    /// Stops sampling and flushes buffers. Calling `stop` on a sampler that is
    /// not running is a no-op.
    pub fn stop(&self) {
        let _ = self.commands.send(Command::Stop);
    }

    #[must_use]
    pub fn status(&self) -> SamplerStatus {
        self.status.borrow().clone()
    }

    #[must_use]
    pub fn stats(&self) -> TrackingStats {
        self.stats.borrow().clone()
    }

    /// Waits until a status snapshot satisfies `predicate`. Test and
    /// diagnostics helper.
    pub async fn status_changed(&mut self) -> SamplerStatus {
        let _ = self.status.changed().await;
        self.status.borrow().clone()
    }
}

struct Task<G> {
    provider: Arc<G>,
    options: SampleOptions,
    config: SamplerConfig,
    commands: mpsc::UnboundedReceiver<Command>,
    subscribers: Vec<(Uuid, Subscriber)>,
    status_tx: watch::Sender<SamplerStatus>,
    stats_tx: watch::Sender<TrackingStats>,
    stats: TrackingStats,
    status: SamplerStatus,
    buffer: OfflineBuffer,
    cache: VecDeque<PositionSample>,
    accuracy_sum: f64,
    buffered_total: u64,
    kept_total: u64,
    last_timestamp: i64,
    last_speed: Option<f64>,
    consecutive_errors: u32,
    host_online: bool,
    degraded: bool,
    started: Instant,
}

impl<G: Geolocator> Task<G> {
    async fn run(mut self) {
        loop {
            let interval = next_interval(
                &self.options,
                &self.config,
                self.last_speed,
                self.status.battery_level,
            );
            self.status.interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);

            tokio::select! {
                command = self.commands.recv() => match command {
                    None | Some(Command::Stop) => break,
                    Some(command) => self.handle_command(command),
                },
                () = time::sleep(interval) => self.tick().await,
            }
        }

        self.flush();
        debug!("sampler stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Subscribe(id, subscriber) => self.subscribers.push((id, subscriber)),
            Command::Unsubscribe(id) => self.subscribers.retain(|(other, _)| *other != id),
            Command::Battery(level) => {
                self.status.battery_level = level.clamp(0.0, 100.0);
                self.push_status();
            }
            Command::Network(online) => {
                self.host_online = online;
                if online && !self.buffer.is_empty() {
                    self.drain_buffer();
                }
                self.push_status();
            }
            Command::Stop => unreachable!("handled by the run loop"),
        }
    }

    async fn tick(&mut self) {
        let fix_options = FixOptions {
            high_accuracy: self.options.high_accuracy,
            timeout: self.config.first_fix_wait,
        };

        match self.provider.sample(&fix_options).await {
            Ok(fix) => {
                self.consecutive_errors = 0;
                self.degraded = false;
                self.accept(fix);
            }
            Err(err) => self.source_error(&err),
        }
    }

    fn accept(&mut self, fix: RawFix) {
        // stale-reading invariant: a fix older than the last accepted one for
        // this source never mutates state
        if fix.timestamp <= self.last_timestamp {
            debug!(
                timestamp = fix.timestamp,
                last_timestamp = self.last_timestamp,
                "discarding stale fix"
            );
            return;
        }
        self.last_timestamp = fix.timestamp;

        let sample = PositionSample::from(fix);
        self.last_speed = sample.speed;

        self.stats.samples_accepted += 1;
        self.accuracy_sum += sample.accuracy;
        #[allow(clippy::cast_precision_loss)]
        {
            self.stats.mean_accuracy_m = self.accuracy_sum / self.stats.samples_accepted as f64;
        }
        self.stats.battery_cost_pct += if self.options.high_accuracy {
            self.config.high_accuracy_fix_cost_pct
        } else {
            self.config.fix_cost_pct
        };

        if self.host_online {
            self.publish(&sample);
        } else {
            self.buffered_total += 1;
            self.buffer.push(sample);
        }

        self.push_stats();
        self.push_status();
    }

    fn source_error(&mut self, err: &Error) {
        self.stats.network_errors += 1;
        self.consecutive_errors += 1;
        if self.consecutive_errors > self.config.retry_budget {
            self.degraded = true;
        }
        warn!(error = %err, consecutive = self.consecutive_errors, "location source error");

        for (_, subscriber) in &self.subscribers {
            if let Some(callback) = &subscriber.on_error {
                callback(err);
            }
        }

        self.push_stats();
        self.push_status();
    }

    fn drain_buffer(&mut self) {
        if self.options.compression_enabled {
            let removed = self.buffer.compress(self.config.min_displacement_m);
            if removed > 0 {
                debug!(removed, "compressed offline backlog");
            }
        }

        let drained = self.buffer.drain();
        self.kept_total += drained.len() as u64;
        if self.buffered_total > 0 {
            #[allow(clippy::cast_precision_loss)]
            {
                self.stats.compression_ratio =
                    self.kept_total as f64 / self.buffered_total as f64;
            }
        }

        for sample in drained {
            self.publish(&sample);
        }
        self.push_stats();
    }

    fn publish(&mut self, sample: &PositionSample) {
        for (_, subscriber) in &self.subscribers {
            if let Some(callback) = &subscriber.on_sample {
                callback(sample);
            }
        }

        if self.options.caching_enabled {
            self.cache.push_back(sample.clone());
            while self.cache.len() > self.config.cache_cap {
                self.cache.pop_front();
            }
        }
    }

    fn flush(&mut self) {
        let drained = self.buffer.drain();
        for sample in drained {
            self.publish(&sample);
        }
        self.push_stats();
        self.push_status();
    }

    fn push_stats(&mut self) {
        self.stats.uptime_s = self.started.elapsed().as_secs();
        let _ = self.stats_tx.send_replace(self.stats.clone());

        for (_, subscriber) in &self.subscribers {
            if let Some(callback) = &subscriber.on_stats {
                callback(&self.stats);
            }
        }
    }

    fn push_status(&mut self) {
        self.status.network_status = if self.host_online && !self.degraded {
            NetworkStatus::Online
        } else {
            NetworkStatus::Offline
        };
        self.status.buffer_size = self.buffer.len();
        self.status.cache_size = self.cache.len();
        let _ = self.status_tx.send_replace(self.status.clone());
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("on_sample", &self.on_sample.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_stats", &self.on_stats.is_some())
            .finish()
    }
}
