use std::sync::Arc;

use realtime::{Error, GeoPoint, ManeuverType, Result, Route, RoutePlanner, SpeechSynthesizer};
use sampler::{Disposer, PositionSample, Sampler, Subscriber};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::time;
use tracing::{debug, info, warn};

use crate::config::NavConfig;
use crate::route::project;
use crate::voice::{VoiceInstruction, VoiceQueue};

/// Navigation state machine phases.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavPhase {
    #[default]
    Idle,
    RouteCalculating,
    Navigating,
    OffRoute,
    Recalculating,
    Arrived,
    Stopped,
}

impl NavPhase {
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Navigating | Self::OffRoute | Self::Recalculating)
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Arrived | Self::Stopped)
    }
}

/// Snapshot of one navigation session. Owned by the navigator task;
/// consumers observe it over a watch channel.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationState {
    pub phase: NavPhase,
    pub is_active: bool,
    #[serde(default)]
    pub current_instruction: Option<VoiceInstruction>,
    #[serde(default)]
    pub next_instruction: Option<VoiceInstruction>,
    /// Percent of route distance covered, 0–100.
    pub progress: f64,
    pub remaining_distance_m: f64,
    pub remaining_duration_s: f64,
    /// Estimated arrival, unix epoch milliseconds.
    #[serde(default)]
    pub eta: Option<i64>,
    pub speed_mps: f64,
    pub is_off_route: bool,
    pub is_recalculating: bool,
}

enum NavCommand {
    Position(PositionSample),
    Recalculate,
    ToggleVoice,
    Stop,
}

/// Handle to one navigation session. Dropping the handle stops the session.
#[derive(Debug)]
pub struct Navigator {
    commands: mpsc::UnboundedSender<NavCommand>,
    state: watch::Receiver<NavigationState>,
}

impl Navigator {
    /// Plans a route and starts turn-by-turn guidance fed by the sampler's
    /// position stream.
    ///
    /// # Errors
    ///
    /// Fails with `RouteUnavailable` when the planner returns no feasible
    /// route.
    pub async fn start<P>(
        provider: Arc<P>, source: &Sampler, origin: GeoPoint, destination: GeoPoint,
    ) -> Result<Self>
    where
        P: RoutePlanner + SpeechSynthesizer + 'static,
    {
        Self::start_with_config(provider, source, origin, destination, NavConfig::from_env()).await
    }

    /// Same as [`Navigator::start`] with explicit tuning.
    ///
    /// # Errors
    ///
    /// Same contract as [`Navigator::start`].
    pub async fn start_with_config<P>(
        provider: Arc<P>, source: &Sampler, origin: GeoPoint, destination: GeoPoint,
        config: NavConfig,
    ) -> Result<Self>
    where
        P: RoutePlanner + SpeechSynthesizer + 'static,
    {
        debug!(?origin, ?destination, "calculating route");
        let route = provider.plan(origin, destination).await?;
        if route.is_empty() {
            return Err(Error::RouteUnavailable("planner returned a degenerate route".to_string()));
        }
        info!(distance_m = route.distance_m, steps = route.steps.len(), "route calculated");

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();

        let position_tx = commands_tx.clone();
        let disposer = source.subscribe(Subscriber::new().on_sample(move |sample| {
            let _ = position_tx.send(NavCommand::Position(sample.clone()));
        }));

        let (remaining_tx, remaining_rx) = watch::channel(route.distance_m);
        let voice = VoiceQueue::spawn(
            Arc::clone(&provider),
            remaining_rx,
            config.voice.clone(),
            config.stale_instruction_slack_m,
        );

        let initial = NavigationState {
            phase: NavPhase::Navigating,
            is_active: true,
            remaining_distance_m: route.distance_m,
            remaining_duration_s: route.duration_s,
            ..NavigationState::default()
        };
        let (state_tx, state_rx) = watch::channel(initial.clone());

        let task = NavTask {
            provider,
            config,
            destination,
            offsets: route.step_offsets(),
            route,
            commands: commands_rx,
            self_commands: commands_tx.clone(),
            state_tx,
            remaining_tx,
            voice,
            disposer: Some(disposer),
            state: initial,
            last_point: None,
            announced: None,
            recalc_attempts: 0,
        };
        tokio::spawn(task.run());

        Ok(Self { commands: commands_tx, state: state_rx })
    }

    /// Stops navigating and tears down the position subscription. Idempotent.
    pub fn stop(&self) {
        let _ = self.commands.send(NavCommand::Stop);
    }

    /// Mutes or unmutes voice guidance without touching the state machine.
    pub fn toggle_voice(&self) {
        let _ = self.commands.send(NavCommand::ToggleVoice);
    }

    #[must_use]
    pub fn state(&self) -> NavigationState {
        self.state.borrow().clone()
    }

    /// A receiver for observing state snapshots independently.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<NavigationState> {
        self.state.clone()
    }

    /// Waits for the next state snapshot.
    pub async fn state_changed(&mut self) -> NavigationState {
        let _ = self.state.changed().await;
        self.state.borrow().clone()
    }
}

impl Drop for Navigator {
    fn drop(&mut self) {
        let _ = self.commands.send(NavCommand::Stop);
    }
}

struct NavTask<P> {
    provider: Arc<P>,
    config: NavConfig,
    destination: GeoPoint,
    route: Route,
    offsets: Vec<f64>,
    commands: mpsc::UnboundedReceiver<NavCommand>,
    self_commands: mpsc::UnboundedSender<NavCommand>,
    state_tx: watch::Sender<NavigationState>,
    remaining_tx: watch::Sender<f64>,
    voice: VoiceQueue,
    disposer: Option<Disposer>,
    state: NavigationState,
    last_point: Option<GeoPoint>,
    /// Step index last announced on the current route.
    announced: Option<usize>,
    recalc_attempts: u32,
}

impl<P> NavTask<P>
where
    P: RoutePlanner + SpeechSynthesizer + 'static,
{
    async fn run(mut self) {
        loop {
            let Some(command) = self.commands.recv().await else {
                break;
            };
            match command {
                NavCommand::Position(sample) => self.position(&sample),
                NavCommand::Recalculate => self.recalculate().await,
                NavCommand::ToggleVoice => {
                    let muted = self.voice.toggle();
                    debug!(muted, "voice guidance toggled");
                }
                NavCommand::Stop => {
                    self.shutdown();
                    break;
                }
            }
        }
        debug!("navigator stopped");
    }

    fn position(&mut self, sample: &PositionSample) {
        if !self.state.phase.is_active() {
            return;
        }

        let point = sample.point();
        self.last_point = Some(point);
        let projection = project(&self.route, point);
        let remaining = (self.route.distance_m - projection.along_m).max(0.0);

        if projection.cross_track_m > self.config.corridor_tolerance_m {
            if self.state.phase == NavPhase::Navigating {
                warn!(
                    cross_track_m = projection.cross_track_m,
                    tolerance_m = self.config.corridor_tolerance_m,
                    "route deviation detected"
                );
                self.state.phase = NavPhase::OffRoute;
                self.recalc_attempts = 0;
                // recalculation is scheduled through the command channel,
                // never performed inline in the position handler
                let _ = self.self_commands.send(NavCommand::Recalculate);
            }
        } else {
            if self.state.phase == NavPhase::OffRoute {
                info!("rejoined route corridor");
                self.state.phase = NavPhase::Navigating;
            }

            if self.state.phase == NavPhase::Navigating
                && remaining <= self.config.arrival_threshold_m
            {
                self.arrive(remaining, sample);
                return;
            }
        }

        self.update_guidance(projection.along_m, remaining, sample);
    }

    fn update_guidance(&mut self, along_m: f64, remaining: f64, sample: &PositionSample) {
        let (current, next) = self.instructions(along_m);

        if self.state.phase == NavPhase::Navigating
            && let Some((index, instruction)) = &current
            && instruction.maneuver != ManeuverType::Arrive
            && instruction.distance_m <= self.config.instruction_trigger_m
            && self.announced.is_none_or(|last| last < *index)
        {
            self.voice.enqueue(instruction.clone());
            self.announced = Some(*index);
        }

        self.state.current_instruction = current.map(|(_, instruction)| instruction);
        self.state.next_instruction = next;

        if self.route.distance_m > 0.0 {
            self.state.progress = ((along_m / self.route.distance_m) * 100.0).clamp(0.0, 100.0);
        }
        self.state.remaining_distance_m = remaining;
        self.state.speed_mps = sample.speed.unwrap_or(0.0);

        let effective_speed =
            sample.speed.filter(|speed| *speed > 0.5).unwrap_or(self.config.fallback_speed_mps);
        self.state.remaining_duration_s = remaining / effective_speed;
        #[allow(clippy::cast_possible_truncation)]
        {
            self.state.eta =
                Some(sample.timestamp + (self.state.remaining_duration_s * 1_000.0) as i64);
        }

        let _ = self.remaining_tx.send_replace(remaining);
        self.push_state();
    }

    /// Current and next instruction for a position `along_m` into the route.
    fn instructions(
        &self, along_m: f64,
    ) -> (Option<(usize, VoiceInstruction)>, Option<VoiceInstruction>) {
        let mut found = None;
        for (index, end_offset) in self.offsets.iter().enumerate() {
            if along_m < *end_offset {
                found = Some(index);
                break;
            }
        }

        let Some(index) = found else {
            return (None, None);
        };

        let current = self.instruction_at(index, along_m);
        let next = self.offsets.get(index + 1).map(|_| index + 1).and_then(|next_index| {
            self.instruction_at(next_index, along_m).map(|(_, instruction)| instruction)
        });

        (current, next)
    }

    fn instruction_at(&self, index: usize, along_m: f64) -> Option<(usize, VoiceInstruction)> {
        let step = self.route.steps.get(index)?;
        let end_offset = *self.offsets.get(index)?;
        Some((
            index,
            VoiceInstruction {
                maneuver: step.maneuver,
                distance_m: (end_offset - along_m).max(0.0),
                street_name: step.street_name.clone(),
                maneuver_remaining_m: (self.route.distance_m - end_offset).max(0.0),
            },
        ))
    }

    fn arrive(&mut self, remaining: f64, sample: &PositionSample) {
        info!(remaining_m = remaining, "arrived at destination");
        self.state.phase = NavPhase::Arrived;

        // final voice instruction
        self.voice.enqueue(VoiceInstruction {
            maneuver: ManeuverType::Arrive,
            distance_m: remaining,
            street_name: None,
            maneuver_remaining_m: 0.0,
        });

        // terminal: the position subscription is torn down
        if let Some(disposer) = self.disposer.take() {
            disposer.dispose();
        }

        self.state.progress = 100.0;
        self.state.remaining_distance_m = remaining;
        self.state.remaining_duration_s = 0.0;
        self.state.speed_mps = sample.speed.unwrap_or(0.0);
        self.state.current_instruction = None;
        self.state.next_instruction = None;
        let _ = self.remaining_tx.send_replace(remaining);
        self.push_state();
    }

    async fn recalculate(&mut self) {
        // a scheduled recalculation may fire after the deviation resolved
        if self.state.phase != NavPhase::OffRoute {
            return;
        }

        self.state.phase = NavPhase::Recalculating;
        self.push_state();

        let from = self.last_point.unwrap_or_else(|| {
            self.route.points.first().copied().unwrap_or_default()
        });

        match self.provider.plan(from, self.destination).await {
            Ok(route) if !route.is_empty() => {
                info!(distance_m = route.distance_m, "route recalculated");
                self.offsets = route.step_offsets();
                let _ = self.remaining_tx.send_replace(route.distance_m);
                self.route = route;
                self.state.phase = NavPhase::Navigating;
                self.recalc_attempts = 0;
                self.announced = None;
                self.push_state();
            }
            Ok(_) => self.recalc_failed("planner returned a degenerate route"),
            Err(err) => self.recalc_failed(&err.to_string()),
        }
    }

    fn recalc_failed(&mut self, reason: &str) {
        self.recalc_attempts += 1;
        self.state.phase = NavPhase::OffRoute;
        self.push_state();

        if self.recalc_attempts <= self.config.recalc_max_retries {
            let delay = self.config.recalc_backoff * self.recalc_attempts;
            warn!(reason, attempt = self.recalc_attempts, ?delay, "recalculation failed, retrying");
            let retry = self.self_commands.clone();
            tokio::spawn(async move {
                time::sleep(delay).await;
                let _ = retry.send(NavCommand::Recalculate);
            });
        } else {
            warn!(reason, "recalculation retries exhausted; still off route");
        }
    }

    fn shutdown(&mut self) {
        if let Some(disposer) = self.disposer.take() {
            disposer.dispose();
        }
        self.state.phase = NavPhase::Stopped;
        self.state.current_instruction = None;
        self.state.next_instruction = None;
        self.push_state();
    }

    fn push_state(&mut self) {
        self.state.is_active = self.state.phase.is_active();
        self.state.is_off_route =
            matches!(self.state.phase, NavPhase::OffRoute | NavPhase::Recalculating);
        self.state.is_recalculating = self.state.phase == NavPhase::Recalculating;
        let _ = self.state_tx.send_replace(self.state.clone());
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::time::Duration;

    use bytes::Bytes;
    use pretty_assertions::assert_eq;
    use realtime::{
        FixOptions, Geolocator, ManeuverType, RawFix, RouteStep, SpeechRequest, distance_m,
    };
    use sampler::{SampleOptions, SamplerConfig};
    use tokio::time::timeout;

    use super::*;

    const START: GeoPoint = GeoPoint::new(-36.8600, 174.7600);
    const END: GeoPoint = GeoPoint::new(-36.8500, 174.7600);

    struct MockProvider {
        plans: AtomicU32,
        fail_plan: AtomicBool,
        fail_synth: bool,
    }

    impl MockProvider {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                plans: AtomicU32::new(0),
                fail_plan: AtomicBool::new(false),
                fail_synth: false,
            })
        }

        fn failing_synth() -> Arc<Self> {
            Arc::new(Self {
                plans: AtomicU32::new(0),
                fail_plan: AtomicBool::new(false),
                fail_synth: true,
            })
        }
    }

    impl RoutePlanner for MockProvider {
        async fn plan(&self, origin: GeoPoint, destination: GeoPoint) -> realtime::Result<Route> {
            self.plans.fetch_add(1, Ordering::SeqCst);
            if self.fail_plan.load(Ordering::SeqCst) {
                return Err(Error::RouteUnavailable("no route found".to_string()));
            }
            let length = distance_m(origin, destination);
            Ok(Route {
                points: vec![origin, destination],
                steps: vec![RouteStep {
                    maneuver: ManeuverType::Arrive,
                    street_name: None,
                    distance_m: length,
                }],
                distance_m: length,
                duration_s: length / 8.0,
            })
        }
    }

    impl SpeechSynthesizer for MockProvider {
        async fn synthesize(&self, _request: &SpeechRequest) -> realtime::Result<Bytes> {
            if self.fail_synth {
                return Err(Error::SynthesisFailed("backend down".to_string()));
            }
            Ok(Bytes::from_static(b"audio"))
        }
    }

    struct ScriptedGeolocator {
        fixes: Mutex<VecDeque<RawFix>>,
    }

    impl ScriptedGeolocator {
        fn new(fixes: Vec<RawFix>) -> Arc<Self> {
            Arc::new(Self { fixes: Mutex::new(fixes.into()) })
        }
    }

    impl Geolocator for ScriptedGeolocator {
        async fn sample(&self, _options: &FixOptions) -> realtime::Result<RawFix> {
            self.fixes
                .lock()
                .expect("should lock")
                .pop_front()
                .ok_or_else(|| Error::Timeout("no fix scheduled".to_string()))
        }
    }

    fn fix(point: GeoPoint, timestamp: i64) -> RawFix {
        RawFix {
            latitude: point.latitude,
            longitude: point.longitude,
            accuracy: 5.0,
            speed: Some(10.0),
            heading: None,
            timestamp,
        }
    }

    fn sampler_config() -> SamplerConfig {
        SamplerConfig {
            pedestrian_interval: Duration::from_millis(1_000),
            driver_interval: Duration::from_millis(1_000),
            min_interval: Duration::from_millis(1_000),
            ..SamplerConfig::from_env()
        }
    }

    async fn start_sampler(fixes: Vec<RawFix>) -> Sampler {
        let options = SampleOptions { adaptive_interval: false, ..SampleOptions::default() };
        Sampler::start_with_config(ScriptedGeolocator::new(fixes), options, sampler_config())
            .await
            .expect("sampler should start")
    }

    async fn wait_for_phase(navigator: &mut Navigator, phase: NavPhase) -> NavigationState {
        timeout(Duration::from_secs(30), async {
            loop {
                let state = navigator.state_changed().await;
                if state.phase == phase {
                    return state;
                }
            }
        })
        .await
        .unwrap_or_else(|_| panic!("never reached {phase:?}"))
    }

    #[tokio::test]
    async fn route_unavailable_fails_start() {
        let provider = MockProvider::new();
        provider.fail_plan.store(true, Ordering::SeqCst);
        let source = start_sampler(vec![fix(START, 1_000)]).await;

        let result = Navigator::start_with_config(
            provider,
            &source,
            START,
            END,
            NavConfig::from_env(),
        )
        .await;

        assert_eq!(result.unwrap_err().code(), "route_unavailable");
        source.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn deviation_surfaces_off_route_with_bounded_retries() {
        let provider = MockProvider::new();
        // probe, then one on-route fix, then a fix ~270 m east of the corridor
        let source = start_sampler(vec![
            fix(START, 1_000),
            fix(GeoPoint::new(-36.8550, 174.7600), 2_000),
            fix(GeoPoint::new(-36.8550, 174.7630), 3_000),
        ])
        .await;

        let mut navigator = Navigator::start_with_config(
            Arc::clone(&provider),
            &source,
            START,
            END,
            NavConfig::from_env(),
        )
        .await
        .expect("navigation should start");

        // with the planner down, the deviation settles in OffRoute and the
        // scheduled recalculation retries a bounded number of times
        provider.fail_plan.store(true, Ordering::SeqCst);
        let state = wait_for_phase(&mut navigator, NavPhase::OffRoute).await;
        assert!(state.is_off_route);

        // 1 initial plan + 1 scheduled recalculation + 3 backoff retries
        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(provider.plans.load(Ordering::SeqCst), 5);
        assert_eq!(navigator.state().phase, NavPhase::OffRoute);

        navigator.stop();
        source.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_recalculation_recovers() {
        let provider = MockProvider::new();
        let source = start_sampler(vec![
            fix(START, 1_000),
            fix(GeoPoint::new(-36.8550, 174.7630), 2_000),
            fix(GeoPoint::new(-36.8550, 174.7632), 3_000),
        ])
        .await;

        let mut navigator = Navigator::start_with_config(
            Arc::clone(&provider),
            &source,
            START,
            END,
            NavConfig::from_env(),
        )
        .await
        .expect("navigation should start");

        // the recalculated route starts at the deviated position, so the
        // session returns to Navigating with a second planner call
        let state = timeout(Duration::from_secs(30), async {
            loop {
                let state = navigator.state_changed().await;
                if state.phase == NavPhase::Navigating
                    && provider.plans.load(Ordering::SeqCst) >= 2
                {
                    return state;
                }
            }
        })
        .await
        .expect("should recover from the deviation");

        assert!(!state.is_off_route);
        assert!(!state.is_recalculating);

        navigator.stop();
        source.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn synthesis_failure_does_not_stall_updates() {
        let provider = MockProvider::failing_synth();
        let source = start_sampler(vec![
            fix(START, 1_000),
            fix(GeoPoint::new(-36.8570, 174.7600), 2_000),
            fix(GeoPoint::new(-36.8540, 174.7600), 3_000),
        ])
        .await;

        let mut navigator = Navigator::start_with_config(
            Arc::clone(&provider),
            &source,
            START,
            END,
            NavConfig::from_env(),
        )
        .await
        .expect("navigation should start");

        let first = timeout(Duration::from_secs(30), navigator.state_changed())
            .await
            .expect("should observe an update");
        let second = timeout(Duration::from_secs(30), navigator.state_changed())
            .await
            .expect("should observe an update");

        // remaining distance keeps updating on every tick despite the
        // failing speech backend
        assert!(second.remaining_distance_m < first.remaining_distance_m);
        assert_eq!(second.phase, NavPhase::Navigating);

        navigator.stop();
        source.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn arrival_is_terminal() {
        let provider = MockProvider::new();
        let source = start_sampler(vec![
            fix(START, 1_000),
            fix(GeoPoint::new(-36.85005, 174.7600), 2_000),
        ])
        .await;

        let mut navigator = Navigator::start_with_config(
            Arc::clone(&provider),
            &source,
            START,
            END,
            NavConfig::from_env(),
        )
        .await
        .expect("navigation should start");

        let state = wait_for_phase(&mut navigator, NavPhase::Arrived).await;
        assert!(!state.is_active);
        assert!((state.progress - 100.0).abs() < f64::EPSILON);

        navigator.stop();
        source.stop();
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let provider = MockProvider::new();
        let source = start_sampler(vec![fix(START, 1_000)]).await;

        let navigator = Navigator::start_with_config(
            provider,
            &source,
            START,
            END,
            NavConfig::from_env(),
        )
        .await
        .expect("navigation should start");

        navigator.stop();
        navigator.stop();
        navigator.toggle_voice();
        source.stop();
    }
}
