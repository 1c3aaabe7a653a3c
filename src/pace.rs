//! Cycle pacing.
//!
//! Sampling cycles take a variable amount of time (probe retries and
//! fill polling stretch them) but the overall loop should tick at a
//! steady configured period. The pacer keeps a bounded window of recent
//! cycle durations and predicts the next one with a trimmed mean, so a
//! single retry-heavy outlier cannot collapse the idle window.

use std::time::Duration;

use heapless::HistoryBuffer;

/// Cycle durations retained; the oldest is evicted on overflow.
pub const WINDOW: usize = 11;

/// Sorted samples kept by the trimmed mean.
const KEEP: usize = 5;

pub struct CyclePacer {
    history: HistoryBuffer<f64, WINDOW>,
    target_secs: f64,
}

impl CyclePacer {
    pub fn new(target_secs: f64) -> Self {
        Self {
            history: HistoryBuffer::new(),
            target_secs,
        }
    }

    /// Record the duration of a completed scheduled cycle.
    pub fn record(&mut self, elapsed: Duration) {
        self.history.write(elapsed.as_secs_f64());
    }

    /// Predicted duration of the next cycle, in seconds.
    pub fn estimate_secs(&self) -> f64 {
        let mut samples: Vec<f64> = self.history.oldest_ordered().copied().collect();
        trimmed_mean(&mut samples)
    }

    /// Idle time left in the current period, floored at zero.
    pub fn idle_budget(&self) -> Duration {
        Duration::from_secs_f64((self.target_secs - self.estimate_secs()).max(0.0))
    }
}

/// Mean of the middle [`KEEP`] values after sorting. With fewer than
/// `KEEP` samples the whole buffer is averaged; an empty buffer reads
/// as zero (full idle budget until the first cycle lands).
pub fn trimmed_mean(samples: &mut [f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.sort_by(f64::total_cmp);
    let keep = samples.len().min(KEEP);
    let lo = (samples.len() - keep) / 2;
    let kept = &samples[lo..lo + keep];
    kept.iter().sum::<f64>() / keep as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_window_yields_full_budget() {
        let pacer = CyclePacer::new(900.0);
        assert!((pacer.estimate_secs() - 0.0).abs() < 1e-9);
        assert_eq!(pacer.idle_budget(), Duration::from_secs_f64(900.0));
    }

    #[test]
    fn middle_five_of_eleven() {
        // Sorted: 1..=11 -> middle five are 4,5,6,7,8 -> mean 6.
        let mut samples: Vec<f64> = (1..=11).map(f64::from).collect();
        assert!((trimmed_mean(&mut samples) - 6.0).abs() < 1e-9);
    }

    #[test]
    fn outliers_are_discarded() {
        let mut pacer = CyclePacer::new(900.0);
        for _ in 0..10 {
            pacer.record(Duration::from_secs_f64(60.0));
        }
        // One retry-heavy cycle should not move the estimate.
        pacer.record(Duration::from_secs_f64(600.0));
        assert!((pacer.estimate_secs() - 60.0).abs() < 1e-9);
        assert_eq!(pacer.idle_budget(), Duration::from_secs_f64(840.0));
    }

    #[test]
    fn window_evicts_oldest() {
        let mut pacer = CyclePacer::new(900.0);
        for _ in 0..WINDOW {
            pacer.record(Duration::from_secs_f64(10.0));
        }
        for _ in 0..WINDOW {
            pacer.record(Duration::from_secs_f64(30.0));
        }
        assert!((pacer.estimate_secs() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn budget_floors_at_zero() {
        let mut pacer = CyclePacer::new(60.0);
        for _ in 0..WINDOW {
            pacer.record(Duration::from_secs_f64(120.0));
        }
        assert_eq!(pacer.idle_budget(), Duration::ZERO);
    }

    #[test]
    fn short_windows_average_what_exists() {
        let mut samples = vec![10.0, 20.0, 30.0];
        assert!((trimmed_mean(&mut samples) - 20.0).abs() < 1e-9);
    }
}
