//! Bridge configuration.
//!
//! [`AccessibilityConfig`] is plain serde data, usually loaded from a TOML
//! file. Missing keys take their defaults, so a partial file is valid:
//!
//! ```toml
//! application_name = "Score Editor"
//! pretend_focus_delay_ms = 120
//!
//! [repeat_hotkey]
//! key = "F9"
//! ```

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::focus::DEFAULT_PRETEND_FOCUS_DELAY;
use crate::hotkey::RepeatHotkeyConfig;
use crate::role::Platform;

/// Settings for an [`AccessibilityController`](crate::AccessibilityController).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessibilityConfig {
    /// Initial value of the global enable switch.
    pub enabled: bool,
    /// Name of the application root item.
    pub application_name: String,
    /// Pretend-focus debounce window in milliseconds.
    pub pretend_focus_delay_ms: u64,
    /// Prefix the focused item's name with its panel when the panel changes.
    pub voice_panel_info: bool,
    /// Platform whose conventions the mapping tables follow. Defaults to the
    /// compile target.
    pub platform: Option<Platform>,
    /// Repeat hotkey settings.
    pub repeat_hotkey: RepeatHotkeyConfig,
}

impl Default for AccessibilityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            application_name: "Application".to_string(),
            pretend_focus_delay_ms: DEFAULT_PRETEND_FOCUS_DELAY.as_millis() as u64,
            voice_panel_info: true,
            platform: None,
            repeat_hotkey: RepeatHotkeyConfig::default(),
        }
    }
}

impl AccessibilityConfig {
    /// The platform in effect.
    pub fn platform(&self) -> Platform {
        self.platform.unwrap_or_else(Platform::current)
    }

    /// The pretend-focus debounce window.
    pub fn pretend_focus_delay(&self) -> Duration {
        Duration::from_millis(self.pretend_focus_delay_ms)
    }

    /// Parse a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Serialize to a TOML document.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load from a TOML file.
    pub fn load_toml(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        Self::from_toml_str(&content)
    }

    /// Save to a TOML file.
    ///
    /// The file is written to a temporary sibling and renamed into place.
    pub fn save_toml(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = self.to_toml_string()?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut file = tempfile::NamedTempFile::new_in(dir).map_err(|e| ConfigError::io(path, e))?;
        file.write_all(content.as_bytes())
            .map_err(|e| ConfigError::io(path, e))?;
        file.persist(path).map_err(|e| ConfigError::io(path, e.error))?;
        Ok(())
    }
}
