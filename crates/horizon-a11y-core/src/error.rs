//! Error types for the core primitives.

use std::fmt;

/// Errors raised by the core primitives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The timer ID is invalid or the timer has already fired or been stopped.
    InvalidTimerId,
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTimerId => write!(f, "Invalid or expired timer ID"),
        }
    }
}

impl std::error::Error for CoreError {}

/// A specialized Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
