use apx_types::SpeedProgress;
use serde::{Deserialize, Serialize};

/// Aggregated progress events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProgressEvent {
    /// Session-wide counters and smoothed speed
    Updated {
        session_id: String,
        progress: SpeedProgress,
    },
}

impl ProgressEvent {
    /// Session this update belongs to
    #[must_use]
    pub fn session_id(&self) -> &str {
        match self {
            Self::Updated { session_id, .. } => session_id,
        }
    }
}
