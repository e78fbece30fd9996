//! Version encoding error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum VersionError {
    #[error("invalid encode length {length}: must be between 1 and {max}")]
    InvalidLength { length: usize, max: usize },
}

impl UserFacingError for VersionError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::InvalidLength { .. } => Some("Pick a display length such as 6 or 8."),
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        match self {
            Self::InvalidLength { .. } => Some("version.invalid_length"),
        }
    }
}
