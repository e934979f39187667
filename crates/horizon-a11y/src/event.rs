//! Tree events.
//!
//! The [`EventBus`] carries one ordered stream of [`AccessEvent`]s to every
//! subscriber: platform adapters, the tree debugger and any host code that
//! wants to observe the tree. It does not filter or reorder; events go out
//! in the order they are sent.
//!
//! Which event a property change becomes is decided by a
//! [`PropertyEventTable`], resolved once per platform.

use horizon_a11y_core::logging::targets;
use horizon_a11y_core::{ConnectionId, Signal};

use crate::item::{PropertyKind, State, Value};
use crate::registry::ItemHandle;
use crate::role::Platform;

/// Kind of a tree event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// The item was registered.
    Created,
    /// The item is being unregistered. Its handle is still valid during
    /// delivery.
    Destroyed,
    /// The name changed.
    NameChanged,
    /// The description changed.
    DescriptionChanged,
    /// The value changed.
    ValueChanged,
    /// The text cursor moved to the given offset.
    TextCursorMoved(usize),
    /// Text was inserted.
    TextInserted {
        /// Offset of the insertion.
        at: usize,
        /// The inserted text.
        text: String,
    },
    /// Text was removed.
    TextRemoved {
        /// Offset of the removal.
        at: usize,
        /// The removed text.
        text: String,
    },
    /// The item moved to another parent.
    ParentChanged,
    /// The accelerator (keyboard shortcut) text changed.
    AcceleratorChanged,
    /// A boolean state changed.
    StateChanged {
        /// The state.
        state: State,
        /// Its new value.
        value: bool,
    },
    /// The whole element should be read again.
    Revoiced,
}

impl EventKind {
    /// Whether the event changes the shape of the tree.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            EventKind::Created | EventKind::Destroyed | EventKind::ParentChanged
        )
    }
}

/// A tree event: what happened, and to which item.
#[derive(Debug, Clone)]
pub struct AccessEvent {
    /// The item the event is about.
    pub target: ItemHandle,
    /// What happened.
    pub kind: EventKind,
}

impl AccessEvent {
    /// Create an event.
    pub fn new(target: ItemHandle, kind: EventKind) -> Self {
        Self { target, kind }
    }
}

/// Maps item property changes to event kinds.
///
/// Only the description row varies per platform: macOS screen readers pick
/// descriptions up through the name, Windows through the accelerator slot.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyEventTable {
    description: EventKind,
}

impl PropertyEventTable {
    /// The table for `platform`.
    pub fn for_platform(platform: Platform) -> Self {
        let description = match platform {
            Platform::MacOs => EventKind::NameChanged,
            Platform::Windows => EventKind::AcceleratorChanged,
            Platform::Linux | Platform::Other => EventKind::DescriptionChanged,
        };
        Self { description }
    }

    /// Event for a property change, or `None` if the payload does not fit
    /// the property.
    pub fn event_for(&self, kind: PropertyKind, value: &Value) -> Option<EventKind> {
        let event = match kind {
            PropertyKind::Name => EventKind::NameChanged,
            PropertyKind::Description => self.description.clone(),
            PropertyKind::Value => EventKind::ValueChanged,
            PropertyKind::Parent => EventKind::ParentChanged,
            PropertyKind::TextCursor => match value {
                Value::Int(pos) => EventKind::TextCursorMoved(usize::try_from(*pos).unwrap_or(0)),
                _ => return None,
            },
            PropertyKind::TextInsert => match value {
                Value::TextEdit { position, text } => EventKind::TextInserted {
                    at: *position,
                    text: text.clone(),
                },
                _ => return None,
            },
            PropertyKind::TextRemove => match value {
                Value::TextEdit { position, text } => EventKind::TextRemoved {
                    at: *position,
                    text: text.clone(),
                },
                _ => return None,
            },
        };
        Some(event)
    }
}

impl Default for PropertyEventTable {
    fn default() -> Self {
        Self::for_platform(Platform::current())
    }
}

/// Ordered event stream.
pub struct EventBus {
    sent: Signal<AccessEvent>,
}

impl EventBus {
    /// Create a bus with no subscribers.
    pub fn new() -> Self {
        Self {
            sent: Signal::new(),
        }
    }

    /// Deliver an event to every subscriber, in subscription order.
    #[tracing::instrument(skip_all, target = "horizon_a11y::events", level = "trace")]
    pub fn send(&self, event: AccessEvent) {
        tracing::trace!(
            target: targets::EVENTS,
            item = %event.target.id(),
            kind = ?event.kind,
            "event sent"
        );
        self.sent.emit(event);
    }

    /// Subscribe to the stream.
    pub fn subscribe<F>(&self, f: F) -> ConnectionId
    where
        F: Fn(&AccessEvent) + Send + Sync + 'static,
    {
        self.sent.connect(f)
    }

    /// Remove a subscription.
    pub fn unsubscribe(&self, id: ConnectionId) -> bool {
        self.sent.disconnect(id)
    }

    /// The underlying signal.
    pub fn signal(&self) -> &Signal<AccessEvent> {
        &self.sent
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.sent.connection_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use parking_lot::Mutex;

    use crate::item::ItemId;

    #[test]
    fn test_description_row_per_platform() {
        let value = Value::from("hint");
        assert_eq!(
            PropertyEventTable::for_platform(Platform::MacOs)
                .event_for(PropertyKind::Description, &value),
            Some(EventKind::NameChanged)
        );
        assert_eq!(
            PropertyEventTable::for_platform(Platform::Windows)
                .event_for(PropertyKind::Description, &value),
            Some(EventKind::AcceleratorChanged)
        );
        assert_eq!(
            PropertyEventTable::for_platform(Platform::Linux)
                .event_for(PropertyKind::Description, &value),
            Some(EventKind::DescriptionChanged)
        );
    }

    #[test]
    fn test_text_payloads() {
        let table = PropertyEventTable::for_platform(Platform::Linux);
        let edit = Value::TextEdit {
            position: 3,
            text: "abc".into(),
        };

        assert_eq!(
            table.event_for(PropertyKind::TextInsert, &edit),
            Some(EventKind::TextInserted {
                at: 3,
                text: "abc".into()
            })
        );
        assert_eq!(
            table.event_for(PropertyKind::TextCursor, &Value::Int(7)),
            Some(EventKind::TextCursorMoved(7))
        );
        assert_eq!(table.event_for(PropertyKind::TextRemove, &Value::Int(1)), None);
    }

    #[test]
    fn test_bus_preserves_order() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        bus.subscribe(move |event| seen_clone.lock().push(event.kind.clone()));

        let handle = ItemHandle::new(ItemId::next());
        bus.send(AccessEvent::new(handle.clone(), EventKind::NameChanged));
        bus.send(AccessEvent::new(handle, EventKind::ValueChanged));

        assert_eq!(
            *seen.lock(),
            vec![EventKind::NameChanged, EventKind::ValueChanged]
        );
    }
}
