//! Configuration and core types for speed sampling

use std::time::Duration;

/// Tuning for the speed sampler
#[derive(Debug, Clone)]
pub struct SpeedConfig {
    /// Number of samples for the moving window (default: 10)
    pub window_size: usize,
    /// Samples closer together than this are folded into the next one (default: 50ms)
    pub min_sample_interval: Duration,
    /// Outlier rejection multiplier (default: 2.0)
    pub outlier_threshold: f64,
    /// Weight of the newest window estimate in the reported speed (default: 0.3)
    pub ema_alpha: f64,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            min_sample_interval: Duration::from_millis(50),
            outlier_threshold: 2.0,
            ema_alpha: 0.3,
        }
    }
}

impl From<&apx_config::ProgressConfig> for SpeedConfig {
    fn from(config: &apx_config::ProgressConfig) -> Self {
        Self {
            window_size: config.speed_window.max(1),
            min_sample_interval: config.min_sample_interval(),
            outlier_threshold: config.outlier_threshold,
            ema_alpha: config.ema_alpha.clamp(0.0, 1.0),
        }
    }
}
