//! Horizon A11y - an accessibility tree bridge for Rust UI toolkits.
//!
//! Content items implement [`AccessibleItem`] and register with an
//! [`AccessibilityController`]. The controller keeps the registry of live
//! items, tracks which one has focus (including debounced "pretend" focus for
//! items that cannot take real keyboard focus), translates item changes into
//! [`AccessEvent`]s, and owns the announcement, panel voicing and speech
//! repeat features. The [`adapter`] module turns all of that into AccessKit
//! tree updates for the platform.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use horizon_a11y::{AccessibilityController, AccessibleBase, AccessibleItem, ItemId, Role};
//!
//! struct PlayButton {
//!     base: AccessibleBase,
//!     parent: ItemId,
//! }
//!
//! impl AccessibleItem for PlayButton {
//!     fn accessible_base(&self) -> &AccessibleBase {
//!         &self.base
//!     }
//!
//!     fn accessible_parent(&self) -> Option<ItemId> {
//!         Some(self.parent)
//!     }
//!
//!     fn accessible_role(&self) -> Role {
//!         Role::Button
//!     }
//!
//!     fn accessible_name(&self) -> String {
//!         "Play".into()
//!     }
//! }
//!
//! let controller = AccessibilityController::default();
//! let button = Arc::new(PlayButton {
//!     base: AccessibleBase::new(),
//!     parent: controller.root_id(),
//! });
//! controller.register(button.clone());
//! controller.set_focus(button.accessible_id());
//! assert_eq!(controller.current_description(), "Play");
//!
//! controller.unregister(button.accessible_id());
//! ```

pub mod adapter;
mod announcer;
mod config;
mod controller;
mod debug;
mod error;
mod event;
mod focus;
mod hotkey;
mod item;
mod navigator;
mod registry;
mod role;
mod speech;

pub use announcer::{
    ActionTitles, AnnounceOutcome, Announcer, FocusSnapshot, NeverRevoice, RevoicingPolicy,
};
pub use config::AccessibilityConfig;
pub use controller::{AccessibilityController, AccessibilityControllerBuilder};
pub use debug::{AccessibleTreeDebug, TreeFormatOptions, TreeStyle};
pub use error::{ConfigError, Error, Result};
pub use event::{AccessEvent, EventBus, EventKind, PropertyEventTable};
pub use focus::{DEFAULT_PRETEND_FOCUS_DELAY, FocusChange, FocusTracker, Promotion};
pub use hotkey::{HotkeyOutcome, KeyInput, RepeatHotkeyConfig, RepeatHotkeyFilter};
pub use item::{
    AccessibleBase, AccessibleItem, ItemChannels, ItemId, ItemRect, PropertyKind, State,
    TextBoundary, TextRange, Value,
};
pub use navigator::TreeNavigator;
pub use registry::{ItemHandle, ItemRecord, ItemRegistry};
pub use role::{Platform, Role};
pub use speech::{
    NO_ELEMENT_FOCUSED, RepeatOutcome, SpeechRepeater, SpeechSink, SpeechState,
    UNKNOWN_ELEMENT, describe,
};

pub use horizon_a11y_core::{ConnectionId, Signal};
