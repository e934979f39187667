//! Platform adapter support.
//!
//! This module turns the bridge's tree into something a platform
//! accessibility layer can consume, through [AccessKit](https://accesskit.dev/):
//!
//! - [`ItemQuery`]: the per-item query surface (role, state set, text slots,
//!   value, text ranges) with the platform text-slot policy applied
//! - [`NativeState`]: the role-dependent native state set of an item
//! - Tree building: [`AccessibilityController::build_tree_update`] and
//!   [`AccessibilityController::update_for_events`] produce AccessKit
//!   [`TreeUpdate`](accesskit::TreeUpdate)s
//! - `AccessKitBridge` (feature `winit-adapter`): owns an
//!   `accesskit_winit::Adapter` for one window and feeds it the event stream
//!
//! [`AccessibilityController::build_tree_update`]: crate::AccessibilityController::build_tree_update
//! [`AccessibilityController::update_for_events`]: crate::AccessibilityController::update_for_events

#[cfg(feature = "winit-adapter")]
mod bridge;
mod query;
mod tree;

#[cfg(feature = "winit-adapter")]
pub use bridge::{AccessKitBridge, ActionCallback};
pub use query::{ItemQuery, NativeState, TextKind};

use accesskit::NodeId;

use crate::item::ItemId;

/// Convert an item id to an AccessKit node id.
pub fn item_id_to_node_id(id: ItemId) -> NodeId {
    NodeId(id.as_raw())
}

/// Convert an AccessKit node id back to an item id.
pub fn node_id_to_item_id(id: NodeId) -> ItemId {
    ItemId::from_raw(id.0)
}
