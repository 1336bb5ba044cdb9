//! Voice instruction queue: at most one instruction in flight, stale
//! instructions dropped, synthesis failures reported but never fatal.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use realtime::{ManeuverType, SpeechRequest, SpeechSynthesizer};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// One spoken instruction. Transient: consumed by the queue and discarded
/// after playback, on staleness, or on mute.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceInstruction {
    pub maneuver: ManeuverType,
    /// Distance from the position that triggered the announcement to the
    /// maneuver, meters.
    pub distance_m: f64,
    #[serde(default)]
    pub street_name: Option<String>,
    /// Route distance remaining at the maneuver point; the staleness check
    /// compares this against the live remaining distance.
    pub maneuver_remaining_m: f64,
}

impl VoiceInstruction {
    #[must_use]
    pub fn spoken_text(&self) -> String {
        match self.maneuver {
            ManeuverType::Arrive => "You have arrived at your destination".to_string(),
            ManeuverType::Depart => match &self.street_name {
                Some(street) => format!("Head out along {street}"),
                None => "Head out".to_string(),
            },
            maneuver => {
                let rounded = (self.distance_m / 10.0).round() * 10.0;
                let mut text = format!("In {rounded:.0} meters, {}", maneuver.phrase());
                if let Some(street) = &self.street_name {
                    text.push_str(&format!(" onto {street}"));
                }
                text
            }
        }
    }
}

pub(crate) struct VoiceQueue {
    queue: mpsc::UnboundedSender<VoiceInstruction>,
    muted: Arc<AtomicBool>,
    played: Arc<AtomicU64>,
}

impl VoiceQueue {
    /// Spawns the serial playback task. `remaining` is the live
    /// remaining-distance snapshot written by the navigator.
    pub(crate) fn spawn<S>(
        provider: Arc<S>, remaining: watch::Receiver<f64>, voice: Option<String>, slack_m: f64,
    ) -> Self
    where
        S: SpeechSynthesizer + 'static,
    {
        let (queue, mut rx) = mpsc::unbounded_channel::<VoiceInstruction>();
        let muted = Arc::new(AtomicBool::new(false));
        let played = Arc::new(AtomicU64::new(0));

        let task_muted = Arc::clone(&muted);
        let task_played = Arc::clone(&played);
        tokio::spawn(async move {
            while let Some(instruction) = rx.recv().await {
                if task_muted.load(Ordering::SeqCst) {
                    continue;
                }

                let request =
                    SpeechRequest { text: instruction.spoken_text(), voice: voice.clone() };
                match provider.synthesize(&request).await {
                    Ok(audio) => {
                        // stale-instruction invariant: never announce a turn
                        // that was already passed while synthesis ran
                        let current = *remaining.borrow();
                        if current + slack_m < instruction.maneuver_remaining_m {
                            debug!(
                                remaining = current,
                                maneuver_remaining = instruction.maneuver_remaining_m,
                                "dropping stale voice instruction"
                            );
                            continue;
                        }
                        if task_muted.load(Ordering::SeqCst) {
                            continue;
                        }
                        info!(bytes = audio.len(), text = %request.text, "voice instruction played");
                        task_played.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(err) => {
                        // reported, never fatal; navigation continues
                        warn!(error = %err, text = %request.text, "speech synthesis failed");
                    }
                }
            }
        });

        Self { queue, muted, played }
    }

    pub(crate) fn enqueue(&self, instruction: VoiceInstruction) {
        let _ = self.queue.send(instruction);
    }

    /// Flips mute; returns the new muted state.
    pub(crate) fn toggle(&self) -> bool {
        !self.muted.fetch_not(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub(crate) fn played(&self) -> u64 {
        self.played.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use bytes::Bytes;
    use realtime::{Error, Result};
    use tokio::time;

    use super::*;

    struct MockSynth {
        results: Mutex<VecDeque<Result<Bytes>>>,
        delay: Duration,
    }

    impl MockSynth {
        fn ok(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                results: Mutex::new(VecDeque::new()),
                delay,
            })
        }

        fn scripted(results: Vec<Result<Bytes>>, delay: Duration) -> Arc<Self> {
            Arc::new(Self { results: Mutex::new(results.into()), delay })
        }
    }

    impl SpeechSynthesizer for MockSynth {
        async fn synthesize(&self, _request: &SpeechRequest) -> Result<Bytes> {
            time::sleep(self.delay).await;
            self.results
                .lock()
                .expect("should lock")
                .pop_front()
                .unwrap_or_else(|| Ok(Bytes::from_static(b"audio")))
        }
    }

    fn turn(maneuver_remaining_m: f64) -> VoiceInstruction {
        VoiceInstruction {
            maneuver: ManeuverType::TurnLeft,
            distance_m: 120.0,
            street_name: Some("Queen St".to_string()),
            maneuver_remaining_m,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_instruction_plays() {
        let (_remaining_tx, remaining) = watch::channel(500.0);
        let queue = VoiceQueue::spawn(MockSynth::ok(Duration::from_secs(1)), remaining, None, 15.0);

        queue.enqueue(turn(400.0));
        time::sleep(Duration::from_secs(2)).await;

        assert_eq!(queue.played(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn passed_instruction_is_dropped() {
        let (remaining_tx, remaining) = watch::channel(500.0);
        let queue = VoiceQueue::spawn(MockSynth::ok(Duration::from_secs(1)), remaining, None, 15.0);

        queue.enqueue(turn(400.0));
        // the turn is passed while synthesis is still running
        let _ = remaining_tx.send(300.0);
        time::sleep(Duration::from_secs(2)).await;

        assert_eq!(queue.played(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn synthesis_failure_keeps_the_queue_alive() {
        let (_remaining_tx, remaining) = watch::channel(500.0);
        let synth = MockSynth::scripted(
            vec![Err(Error::SynthesisFailed("backend down".to_string()))],
            Duration::from_millis(10),
        );
        let queue = VoiceQueue::spawn(synth, remaining, None, 15.0);

        queue.enqueue(turn(400.0));
        queue.enqueue(turn(350.0));
        time::sleep(Duration::from_secs(1)).await;

        // first failed and was reported; second still played
        assert_eq!(queue.played(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn muted_queue_discards() {
        let (_remaining_tx, remaining) = watch::channel(500.0);
        let queue = VoiceQueue::spawn(MockSynth::ok(Duration::from_millis(10)), remaining, None, 15.0);

        assert!(queue.toggle());
        queue.enqueue(turn(400.0));
        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(queue.played(), 0);

        assert!(!queue.toggle());
        queue.enqueue(turn(350.0));
        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(queue.played(), 1);
    }

    #[test]
    fn spoken_text_formats() {
        assert_eq!(turn(400.0).spoken_text(), "In 120 meters, Turn left onto Queen St");

        let arrive = VoiceInstruction {
            maneuver: ManeuverType::Arrive,
            distance_m: 10.0,
            street_name: None,
            maneuver_remaining_m: 0.0,
        };
        assert_eq!(arrive.spoken_text(), "You have arrived at your destination");
    }
}
