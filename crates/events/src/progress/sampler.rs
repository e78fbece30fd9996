//! Session-scoped throughput estimate

use super::config::SpeedConfig;
use super::speed::SpeedBuffer;
use apx_types::{FileProgress, SpeedProgress};
use std::time::Instant;

/// Converts the byte deltas of one download session into a smoothed speed
///
/// One sampler belongs to one orchestration call. Every call to
/// [`SpeedSampler::record`] yields a [`SpeedProgress`]; when the delta arrives
/// sooner than the minimum interval after the previous sample, its bytes are
/// carried into the next sample and the last reported speed is repeated.
///
/// The reported speed is an exponential moving average over the successive
/// window estimates (outlier-rejected, recency-weighted), seeded with the
/// first estimate.
#[derive(Debug, Clone)]
pub struct SpeedSampler {
    config: SpeedConfig,
    buffer: SpeedBuffer,
    current_speed: f64,
    sampled: bool,
}

impl SpeedSampler {
    /// Create a sampler whose first interval starts now
    #[must_use]
    pub fn new(config: SpeedConfig) -> Self {
        Self::starting_at(config, Instant::now())
    }

    /// Create a sampler whose first interval starts at `start`
    #[must_use]
    pub fn starting_at(config: SpeedConfig, start: Instant) -> Self {
        let buffer = SpeedBuffer::new(config.window_size, start);
        Self {
            config,
            buffer,
            current_speed: 0.0,
            sampled: false,
        }
    }

    /// Record `delta_bytes` against the session totals in `totals`
    pub fn record(&mut self, delta_bytes: u64, totals: FileProgress) -> SpeedProgress {
        self.record_at(delta_bytes, totals, Instant::now())
    }

    /// Same as [`SpeedSampler::record`] with an explicit clock reading
    pub fn record_at(
        &mut self,
        delta_bytes: u64,
        totals: FileProgress,
        now: Instant,
    ) -> SpeedProgress {
        if self
            .buffer
            .add_delta(delta_bytes, now, self.config.min_sample_interval)
            .is_some()
        {
            if let Some(smoothed) = self
                .buffer
                .calculate_smoothed_speed(self.config.outlier_threshold)
            {
                self.fold_into_average(smoothed.max(0.0));
            }
        }

        SpeedProgress {
            total_count: totals.total_count,
            current_count: totals.current_count,
            total_bytes: totals.total_bytes,
            current_bytes: totals.current_bytes,
            bytes_per_second: self.current_speed,
        }
    }

    /// Last reported speed in bytes per second (0 before the first sample)
    #[must_use]
    pub fn current_speed(&self) -> f64 {
        self.current_speed
    }

    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.buffer.len()
    }

    fn fold_into_average(&mut self, estimate: f64) {
        if self.sampled {
            let alpha = self.config.ema_alpha;
            self.current_speed = alpha * estimate + (1.0 - alpha) * self.current_speed;
        } else {
            self.current_speed = estimate;
            self.sampled = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn totals(current_bytes: u64) -> FileProgress {
        FileProgress {
            total_count: 1,
            current_count: 0,
            total_bytes: 10_000,
            current_bytes,
        }
    }

    #[test]
    fn first_burst_reports_zero() {
        let start = Instant::now();
        let mut sampler = SpeedSampler::starting_at(SpeedConfig::default(), start);

        let update = sampler.record_at(500, totals(500), start + Duration::from_millis(1));
        assert!(update.bytes_per_second.abs() < f64::EPSILON);
        assert_eq!(update.current_bytes, 500);
        assert_eq!(sampler.sample_count(), 0);
    }

    #[test]
    fn folded_bytes_count_toward_next_sample() {
        let start = Instant::now();
        let mut sampler = SpeedSampler::starting_at(SpeedConfig::default(), start);

        sampler.record_at(500, totals(500), start + Duration::from_millis(10));
        let update = sampler.record_at(500, totals(1_000), start + Duration::from_secs(1));

        assert!((update.bytes_per_second - 1_000.0).abs() < 1e-6);
        assert_eq!(sampler.sample_count(), 1);
    }

    #[test]
    fn short_interval_repeats_previous_speed() {
        let start = Instant::now();
        let mut sampler = SpeedSampler::starting_at(SpeedConfig::default(), start);

        let first = sampler.record_at(2_000, totals(2_000), start + Duration::from_secs(1));
        let second = sampler.record_at(
            50,
            totals(2_050),
            start + Duration::from_secs(1) + Duration::from_millis(5),
        );

        assert!((first.bytes_per_second - second.bytes_per_second).abs() < f64::EPSILON);
        assert_eq!(second.current_bytes, 2_050);
    }

    #[test]
    fn steady_rate_converges() {
        let start = Instant::now();
        let mut sampler = SpeedSampler::starting_at(SpeedConfig::default(), start);

        let mut last = 0.0;
        for i in 1..=20u64 {
            let at = start + Duration::from_millis(100 * i);
            last = sampler
                .record_at(100, totals(100 * i), at)
                .bytes_per_second;
        }

        assert!((last - 1_000.0).abs() < 1e-6);
        assert!((sampler.current_speed() - last).abs() < f64::EPSILON);
    }

    #[test]
    fn speed_change_is_eased_in() {
        let start = Instant::now();
        let config = SpeedConfig {
            window_size: 1,
            ema_alpha: 0.5,
            ..SpeedConfig::default()
        };
        let mut sampler = SpeedSampler::starting_at(config, start);

        let first = sampler.record_at(1_000, totals(1_000), start + Duration::from_secs(1));
        let second = sampler.record_at(3_000, totals(4_000), start + Duration::from_secs(2));

        assert!((first.bytes_per_second - 1_000.0).abs() < 1e-6);
        // halfway between the previous report and the new 3000 B/s estimate
        assert!((second.bytes_per_second - 2_000.0).abs() < 1e-6);
    }
}
