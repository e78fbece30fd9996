//! Ring buffer of byte-rate samples with smoothing and outlier detection

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Intervals shorter than this never produce a sample, whatever the config says
pub(crate) const MIN_ELAPSED: Duration = Duration::from_micros(100);

/// Sample point for speed calculation
#[derive(Debug, Clone, Copy)]
pub(crate) struct SpeedSample {
    /// Instantaneous speed for this sample (bytes/second)
    pub speed: f64,
}

/// Fixed-capacity window of speed samples
///
/// Bytes reported before the minimum interval has elapsed are held in
/// `pending_bytes` and land in the next accepted sample.
#[derive(Debug, Clone)]
pub(crate) struct SpeedBuffer {
    samples: VecDeque<SpeedSample>,
    max_size: usize,
    /// Sum of speeds for quick average calculation
    speed_sum: f64,
    pending_bytes: u64,
    last_timestamp: Instant,
}

impl SpeedBuffer {
    pub fn new(max_size: usize, start: Instant) -> Self {
        let max_size = max_size.max(1);
        Self {
            samples: VecDeque::with_capacity(max_size),
            max_size,
            speed_sum: 0.0,
            pending_bytes: 0,
            last_timestamp: start,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Record a byte delta. Returns the instantaneous speed when a sample was
    /// taken, or `None` when the interval was too short and the bytes were
    /// folded into the pending total.
    pub fn add_delta(
        &mut self,
        delta_bytes: u64,
        now: Instant,
        min_interval: Duration,
    ) -> Option<f64> {
        self.pending_bytes = self.pending_bytes.saturating_add(delta_bytes);

        let elapsed = now.saturating_duration_since(self.last_timestamp);
        if elapsed < min_interval.max(MIN_ELAPSED) {
            return None;
        }

        let delta_bytes = std::mem::take(&mut self.pending_bytes);
        let speed = delta_bytes as f64 / elapsed.as_secs_f64();

        if self.samples.len() >= self.max_size {
            if let Some(old) = self.samples.pop_front() {
                self.speed_sum -= old.speed;
            }
        }

        self.samples.push_back(SpeedSample { speed });
        self.speed_sum += speed;
        self.last_timestamp = now;

        Some(speed)
    }

    /// Calculate smoothed speed with outlier detection
    pub fn calculate_smoothed_speed(&self, outlier_threshold: f64) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }

        if self.samples.len() == 1 {
            return Some(self.samples[0].speed);
        }

        let count = self.samples.len() as f64;
        let mean = self.speed_sum / count;
        let variance = self
            .samples
            .iter()
            .map(|s| (s.speed - mean).powi(2))
            .sum::<f64>()
            / count;
        let std_dev = variance.sqrt();

        // Reject samples more than threshold * std_dev from mean
        let valid: Vec<f64> = self
            .samples
            .iter()
            .map(|s| s.speed)
            .filter(|speed| (speed - mean).abs() <= outlier_threshold * std_dev)
            .collect();

        if valid.is_empty() {
            return Some(mean);
        }

        // Linear weighting: newer samples get higher weight
        let mut weighted_sum = 0.0;
        let mut weight_sum = 0.0;
        for (i, &speed) in valid.iter().enumerate() {
            let weight = 1.0 + i as f64 / valid.len() as f64;
            weighted_sum += speed * weight;
            weight_sum += weight;
        }

        Some(weighted_sum / weight_sum)
    }
}
