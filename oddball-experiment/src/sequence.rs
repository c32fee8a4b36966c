use rand::Rng;
use rand::seq::SliceRandom;
use std::time::Duration;

/// How an inner trial list is ordered after expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ordering {
    Sequential,
    /// Full shuffle of the expanded list; no spacing or no-repeat constraint.
    Random,
}

/// Repetitions of a base list needed for roughly `n_trials` trials,
/// rounding half to even.
pub fn repetitions_for(n_trials: usize, base_len: usize) -> usize {
    if base_len == 0 {
        return 0;
    }
    (n_trials as f64 / base_len as f64).round_ties_even() as usize
}

/// Repeats `base` `repetitions` times and orders the result.
pub fn expand<T: Clone, R: Rng + ?Sized>(
    base: &[T],
    repetitions: usize,
    ordering: Ordering,
    rng: &mut R,
) -> Vec<T> {
    let mut out: Vec<T> = Vec::with_capacity(base.len() * repetitions);
    for _ in 0..repetitions {
        out.extend_from_slice(base);
    }
    if ordering == Ordering::Random {
        out.shuffle(rng);
    }
    out
}

/// Jittered inter-stimulus interval: a uniform integer millisecond value
/// from an inclusive range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IsiSampler {
    min_ms: u64,
    max_ms: u64,
}

impl IsiSampler {
    pub fn new((min_ms, max_ms): (u64, u64)) -> Self {
        Self {
            min_ms: min_ms.min(max_ms),
            max_ms: max_ms.max(min_ms),
        }
    }

    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        Duration::from_millis(rng.random_range(self.min_ms..=self.max_ms))
    }
}

/// Whole refresh cycles covering `duration`; a non-zero duration gets at
/// least one frame.
pub fn frames_for(duration: Duration, frame_period: Duration) -> u64 {
    if frame_period.is_zero() || duration.is_zero() {
        return 0;
    }
    let frames = (duration.as_secs_f64() / frame_period.as_secs_f64()).round() as u64;
    frames.max(1)
}
