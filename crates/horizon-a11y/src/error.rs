//! Error types for the accessibility bridge.
//!
//! None of these are fatal. Public entry points such as
//! [`AccessibilityController::register`](crate::AccessibilityController::register)
//! log them and carry on; the `try_` variants hand them to callers that want
//! to react.

use std::path::PathBuf;

use crate::item::ItemId;

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the accessibility bridge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The item is already in the registry.
    #[error("Item {0} is already registered")]
    AlreadyRegistered(ItemId),

    /// The item is not in the registry.
    #[error("Item {0} is not registered")]
    NotRegistered(ItemId),

    /// The item is registered but ignored, or its object is gone.
    #[error("Item {0} cannot receive focus")]
    Unusable(ItemId),

    /// Accessibility is globally disabled.
    #[error("Accessibility is disabled")]
    Disabled,

    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors raised while loading or saving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File I/O error.
    #[error("Failed to access config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML could not be parsed into a configuration.
    #[error("Invalid accessibility config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration could not be serialized.
    #[error("Failed to serialize accessibility config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl ConfigError {
    /// Create an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
