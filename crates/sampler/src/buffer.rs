use std::collections::VecDeque;

use realtime::distance_m;
use tracing::warn;

use crate::model::PositionSample;

/// Bounded buffer holding samples observed while the network is unreachable.
///
/// Samples are kept in arrival (timestamp) order. Beyond the cap the oldest
/// sample is dropped and counted; loss is accounted for, never silent.
#[derive(Debug)]
pub struct OfflineBuffer {
    samples: VecDeque<PositionSample>,
    cap: usize,
    dropped: u64,
}

impl OfflineBuffer {
    #[must_use]
    pub fn new(cap: usize) -> Self {
        Self { samples: VecDeque::with_capacity(cap.min(64)), cap: cap.max(1), dropped: 0 }
    }

    pub fn push(&mut self, sample: PositionSample) {
        self.samples.push_back(sample);
        if self.samples.len() > self.cap {
            self.samples.pop_front();
            self.dropped += 1;
            warn!(cap = self.cap, dropped = self.dropped, "offline buffer full, dropped oldest sample");
        }
    }

    /// Thins the backlog with a minimum-displacement filter, keeping the first
    /// and most recent samples. Returns the number of samples removed.
    pub fn compress(&mut self, min_displacement_m: f64) -> usize {
        if self.samples.len() < 3 {
            return 0;
        }

        let before = self.samples.len();
        let mut kept: VecDeque<PositionSample> = VecDeque::with_capacity(before);
        let last_index = before - 1;

        for (index, sample) in self.samples.drain(..).enumerate() {
            let keep = match kept.back() {
                None => true,
                Some(previous) => {
                    index == last_index
                        || distance_m(previous.point(), sample.point()) >= min_displacement_m
                }
            };
            if keep {
                kept.push_back(sample);
            }
        }

        self.samples = kept;
        before - self.samples.len()
    }

    /// Removes and returns all buffered samples in timestamp order.
    pub fn drain(&mut self) -> Vec<PositionSample> {
        self.samples.drain(..).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Total samples dropped to the cap since construction.
    #[must_use]
    pub const fn dropped(&self) -> u64 {
        self.dropped
    }
}
