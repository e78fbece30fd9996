#![allow(
    clippy::cast_precision_loss,        // Mathematical calculations require f64
    clippy::similar_names               // Mathematical variable naming is clear
)]

//! Throughput estimation for aggregated download progress
//!
//! - Ring buffer of recent samples with outlier rejection
//! - Recency-weighted smoothing, eased by an exponential moving average
//! - Samples closer than the configured minimum interval are folded into
//!   the next one, so no speed is ever derived from a near-zero interval

pub mod config;
pub mod sampler;
pub(crate) mod speed;

pub use config::SpeedConfig;
pub use sampler::SpeedSampler;
