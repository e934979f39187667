//! The "repeat current element" hotkey.

use serde::{Deserialize, Serialize};
use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, ModifiersState, PhysicalKey};

use horizon_a11y_core::logging::targets;

/// Hotkey settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepeatHotkeyConfig {
    /// Whether the hotkey is active.
    pub enabled: bool,
    /// The key that triggers a repeat.
    pub key: KeyCode,
    /// Whether a triggering press is hidden from other handlers.
    pub consume: bool,
}

impl Default for RepeatHotkeyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            key: KeyCode::F12,
            consume: false,
        }
    }
}

/// A keyboard event as seen by the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    /// Physical key code.
    pub key: KeyCode,
    /// Press or release.
    pub state: ElementState,
    /// Whether this is an auto-repeat.
    pub repeat: bool,
    /// Modifiers held at the time.
    pub modifiers: ModifiersState,
}

impl KeyInput {
    /// A single, unmodified key press.
    pub fn press(key: KeyCode) -> Self {
        Self {
            key,
            state: ElementState::Pressed,
            repeat: false,
            modifiers: ModifiersState::empty(),
        }
    }

    /// Build from a winit keyboard event. Keys without a known physical
    /// code yield `None`.
    pub fn from_winit(event: &KeyEvent, modifiers: ModifiersState) -> Option<Self> {
        match event.physical_key {
            PhysicalKey::Code(key) => Some(Self {
                key,
                state: event.state,
                repeat: event.repeat,
                modifiers,
            }),
            PhysicalKey::Unidentified(_) => None,
        }
    }
}

/// Result of offering a key event to the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyOutcome {
    /// The event is not the hotkey.
    Ignored,
    /// The hotkey fired.
    Triggered {
        /// Whether other handlers should not see the event.
        consumed: bool,
    },
}

impl HotkeyOutcome {
    /// Whether the event should be swallowed.
    pub fn is_consumed(self) -> bool {
        matches!(self, HotkeyOutcome::Triggered { consumed: true })
    }
}

/// Key event tap for the repeat hotkey.
#[derive(Debug, Clone, Default)]
pub struct RepeatHotkeyFilter {
    config: RepeatHotkeyConfig,
}

impl RepeatHotkeyFilter {
    /// Create a filter.
    pub fn new(config: RepeatHotkeyConfig) -> Self {
        Self { config }
    }

    /// Current settings.
    pub fn config(&self) -> RepeatHotkeyConfig {
        self.config
    }

    /// Replace the settings.
    pub fn set_config(&mut self, config: RepeatHotkeyConfig) {
        self.config = config;
    }

    /// Enable or disable the hotkey.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }

    /// Whether `input` is a fresh, unmodified press of the configured key.
    pub fn matches(&self, input: &KeyInput) -> bool {
        self.config.enabled
            && input.key == self.config.key
            && input.state == ElementState::Pressed
            && !input.repeat
            && input.modifiers.is_empty()
    }

    /// Offer `input`; runs `on_trigger` when it is the hotkey.
    pub fn filter(&self, input: &KeyInput, on_trigger: impl FnOnce()) -> HotkeyOutcome {
        if !self.matches(input) {
            return HotkeyOutcome::Ignored;
        }
        tracing::debug!(target: targets::HOTKEY, key = ?input.key, "repeat hotkey pressed");
        on_trigger();
        HotkeyOutcome::Triggered {
            consumed: self.config.consume,
        }
    }
}
