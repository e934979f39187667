//! The accessible item contract.
//!
//! Every node in the accessible tree implements [`AccessibleItem`]. The
//! trait mirrors what an assistive-technology layer asks of a node: where it
//! sits in the tree, what it is, what it says and which states it is in.
//! Relations (parent, children) are expressed as [`ItemId`]s, never as owning
//! references, so the tree can be torn down in any order.
//!
//! Implementors embed an [`AccessibleBase`], which supplies the identity, the
//! boolean state set and the lazily created change channels:
//!
//! ```
//! use horizon_a11y::{AccessibleBase, AccessibleItem, ItemId, Role};
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
//!         "Play".to_string()
//!     }
//! }
//! ```

use std::fmt;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

use horizon_a11y_core::{Property, Signal};

use crate::role::Role;

/// Stable identity of an accessible item.
///
/// Ids are process-unique and never reused, so a stale id held by a focus
/// back-reference or a platform handle resolves to "absent" rather than to a
/// different item.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(u64);

static NEXT_ITEM_ID: AtomicU64 = AtomicU64::new(1);

impl ItemId {
    /// Allocate a fresh, never-before-used id.
    pub fn next() -> Self {
        Self(NEXT_ITEM_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw numeric value, used as the platform node id.
    pub fn as_raw(self) -> u64 {
        self.0
    }

    /// Rebuild an id from its raw value.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemId({})", self.0)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Boolean states an item can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// The item can be interacted with.
    Enabled,
    /// The item (window, panel, list) is the active one.
    Active,
    /// The item has keyboard focus.
    Focused,
    /// The item is selected.
    Selected,
    /// The item is checked.
    Checked,
}

impl State {
    /// All states, in declaration order.
    pub const ALL: [State; 5] = [
        State::Enabled,
        State::Active,
        State::Focused,
        State::Selected,
        State::Checked,
    ];

    fn index(self) -> usize {
        match self {
            State::Enabled => 0,
            State::Active => 1,
            State::Focused => 2,
            State::Selected => 3,
            State::Checked => 4,
        }
    }
}

/// Properties whose changes an item reports through its property channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    /// The item moved to another parent.
    Parent,
    /// The accessible name changed.
    Name,
    /// The accessible description changed.
    Description,
    /// The current value changed.
    Value,
    /// The text cursor moved. Carries [`Value::Int`] with the new position.
    TextCursor,
    /// Text was inserted. Carries [`Value::TextEdit`].
    TextInsert,
    /// Text was removed. Carries [`Value::TextEdit`].
    TextRemove,
}

/// A loosely typed value, used for item values and change payloads.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// No value.
    #[default]
    None,
    /// A boolean.
    Bool(bool),
    /// An integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// A string.
    String(String),
    /// A text edit: `text` inserted at or removed from `position`.
    TextEdit {
        /// Character offset of the edit.
        position: usize,
        /// The inserted or removed text.
        text: String,
    },
}

impl Value {
    /// Whether this value carries nothing.
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// The value as a float, for numeric range roles.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            Value::String(s) => s.trim().parse().ok(),
            Value::None | Value::TextEdit { .. } => None,
        }
    }
}

impl fmt::Display for Value {
    /// Formats the value the way it is spoken; `None` formats as empty.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => Ok(()),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(s) => f.write_str(s),
            Value::TextEdit { text, .. } => f.write_str(text),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

/// Text boundaries for text-at-offset queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextBoundary {
    /// A single character.
    Char,
    /// A word.
    Word,
    /// A sentence.
    Sentence,
    /// A paragraph.
    Paragraph,
    /// A line.
    Line,
    /// The whole text.
    NoBoundary,
}

/// A text fragment with its character offsets.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextRange {
    /// Start offset (inclusive).
    pub start: usize,
    /// End offset (exclusive).
    pub end: usize,
    /// The text between `start` and `end`.
    pub text: String,
}

/// Item bounds in window coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ItemRect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

/// Per-item change channels, created on first use.
///
/// Items that nobody observes never allocate their signals.
#[derive(Default)]
pub struct ItemChannels {
    property_changed: OnceLock<Signal<(PropertyKind, Value)>>,
    state_changed: OnceLock<Signal<(State, bool)>>,
}

impl ItemChannels {
    /// The property change channel, creating it if needed.
    pub fn property_changed(&self) -> &Signal<(PropertyKind, Value)> {
        self.property_changed.get_or_init(Signal::new)
    }

    /// The state change channel, creating it if needed.
    pub fn state_changed(&self) -> &Signal<(State, bool)> {
        self.state_changed.get_or_init(Signal::new)
    }

    fn send_property(&self, kind: PropertyKind, value: Value) {
        if let Some(signal) = self.property_changed.get() {
            signal.emit((kind, value));
        }
    }

    fn send_state(&self, state: State, value: bool) {
        if let Some(signal) = self.state_changed.get() {
            signal.emit((state, value));
        }
    }
}

impl fmt::Debug for ItemChannels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemChannels")
            .field("property_changed", &self.property_changed.get().is_some())
            .field("state_changed", &self.state_changed.get().is_some())
            .finish()
    }
}

/// Shared bookkeeping every accessible item embeds.
#[derive(Debug)]
pub struct AccessibleBase {
    id: ItemId,
    states: [Property<bool>; 5],
    channels: ItemChannels,
}

impl AccessibleBase {
    /// Create a base with a fresh id. Items start enabled and in no other state.
    pub fn new() -> Self {
        Self::with_id(ItemId::next())
    }

    /// Create a base with a caller-chosen id.
    pub fn with_id(id: ItemId) -> Self {
        Self {
            id,
            states: [
                Property::new(true),
                Property::new(false),
                Property::new(false),
                Property::new(false),
                Property::new(false),
            ],
            channels: ItemChannels::default(),
        }
    }

    /// The item's identity.
    pub fn id(&self) -> ItemId {
        self.id
    }

    /// Current value of a state.
    pub fn state(&self, state: State) -> bool {
        self.states[state.index()].get()
    }

    /// Record a new state value, notifying subscribers only if it changed.
    ///
    /// Returns whether the state changed.
    pub fn set_state(&self, state: State, value: bool) -> bool {
        if self.states[state.index()].set(value) {
            self.channels.send_state(state, value);
            true
        } else {
            false
        }
    }

    /// Report a property change to subscribers.
    pub fn notify_property(&self, kind: PropertyKind, value: impl Into<Value>) {
        self.channels.send_property(kind, value.into());
    }

    /// The item's change channels.
    pub fn channels(&self) -> &ItemChannels {
        &self.channels
    }
}

impl Default for AccessibleBase {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait for objects that take part in the accessible tree.
///
/// Only [`accessible_base`](Self::accessible_base),
/// [`accessible_parent`](Self::accessible_parent),
/// [`accessible_role`](Self::accessible_role) and
/// [`accessible_name`](Self::accessible_name) are required; everything else
/// has a neutral default.
///
/// Implementations are called while the bridge answers platform queries, so
/// they must not block and should not mutate the tree.
pub trait AccessibleItem: Send + Sync {
    /// The embedded bookkeeping.
    fn accessible_base(&self) -> &AccessibleBase;

    /// Identity of this item.
    fn accessible_id(&self) -> ItemId {
        self.accessible_base().id()
    }

    /// The declared parent, or `None` for a detached item.
    fn accessible_parent(&self) -> Option<ItemId>;

    /// Number of children.
    fn accessible_child_count(&self) -> usize {
        0
    }

    /// Child at `index`, or `None` when out of range.
    fn accessible_child(&self, _index: usize) -> Option<ItemId> {
        None
    }

    /// The item's role.
    fn accessible_role(&self) -> Role;

    /// The accessible name.
    fn accessible_name(&self) -> String;

    /// The accessible description.
    fn accessible_description(&self) -> String {
        String::new()
    }

    /// Current value.
    fn accessible_value(&self) -> Value {
        Value::None
    }

    /// Minimum value for range-like roles.
    fn accessible_minimum_value(&self) -> Value {
        Value::None
    }

    /// Maximum value for range-like roles.
    fn accessible_maximum_value(&self) -> Value {
        Value::None
    }

    /// Step size for range-like roles.
    fn accessible_value_step(&self) -> Value {
        Value::None
    }

    /// Current value of a state.
    fn accessible_state(&self, state: State) -> bool {
        self.accessible_base().state(state)
    }

    /// Record a new state value. Subscribers are notified only on change.
    fn set_accessible_state(&self, state: State, value: bool) {
        self.accessible_base().set_state(state, value);
    }

    /// Ignored items stay in the tree but never receive focus.
    fn accessible_ignored(&self) -> bool {
        false
    }

    /// Bounds in window coordinates, if known.
    fn accessible_rect(&self) -> Option<ItemRect> {
        None
    }

    /// Primary spoken text for rich content elements.
    fn accessible_screen_reader_info(&self) -> String {
        String::new()
    }

    /// Secondary spoken text (attachments, annotations).
    fn accessible_extra_info(&self) -> String {
        String::new()
    }

    /// Text cursor position.
    fn accessible_cursor_position(&self) -> usize {
        0
    }

    /// Number of characters of text content.
    fn accessible_character_count(&self) -> usize {
        0
    }

    /// Text between two offsets.
    fn accessible_text(&self, _start: usize, _end: usize) -> String {
        String::new()
    }

    /// Text around `offset` bounded by `boundary`.
    fn accessible_text_at_offset(&self, _offset: usize, _boundary: TextBoundary) -> TextRange {
        TextRange::default()
    }

    /// Text before `offset` bounded by `boundary`.
    fn accessible_text_before_offset(&self, _offset: usize, _boundary: TextBoundary) -> TextRange {
        TextRange::default()
    }

    /// Text after `offset` bounded by `boundary`.
    fn accessible_text_after_offset(&self, _offset: usize, _boundary: TextBoundary) -> TextRange {
        TextRange::default()
    }

    /// Number of selected text ranges.
    fn accessible_selection_count(&self) -> usize {
        0
    }

    /// Selected text range at `index` as `(start, end)`.
    fn accessible_selection(&self, _index: usize) -> Option<(usize, usize)> {
        None
    }

    /// Row index for list and table items.
    fn accessible_row_index(&self) -> Option<usize> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    struct MinimalItem {
        base: AccessibleBase,
    }

    impl AccessibleItem for MinimalItem {
        fn accessible_base(&self) -> &AccessibleBase {
            &self.base
        }

        fn accessible_parent(&self) -> Option<ItemId> {
            None
        }

        fn accessible_role(&self) -> Role {
            Role::StaticText
        }

        fn accessible_name(&self) -> String {
            String::new()
        }
    }

    #[test]
    fn test_item_ids_are_unique() {
        let a = ItemId::next();
        let b = ItemId::next();
        assert_ne!(a, b);
        assert_eq!(ItemId::from_raw(a.as_raw()), a);
    }

    #[test]
    fn test_accessible_trait_defaults() {
        let item = MinimalItem {
            base: AccessibleBase::new(),
        };
        assert!(item.accessible_state(State::Enabled));
        assert!(!item.accessible_state(State::Focused));
        assert_eq!(item.accessible_child_count(), 0);
        assert!(item.accessible_child(0).is_none());
        assert!(item.accessible_value().is_none());
        assert!(item.accessible_screen_reader_info().is_empty());
        assert!(!item.accessible_ignored());
    }

    #[test]
    fn test_set_state_notifies_only_on_change() {
        let item = MinimalItem {
            base: AccessibleBase::new(),
        };
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        item.accessible_base()
            .channels()
            .state_changed()
            .connect(move |_| {
                count_clone.fetch_add(1, Ordering::SeqCst);
            });

        item.set_accessible_state(State::Focused, true);
        item.set_accessible_state(State::Focused, true);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        item.set_accessible_state(State::Focused, false);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_channels_are_lazy() {
        let base = AccessibleBase::new();
        // No subscriber and no channel: notifying is a silent no-op.
        base.notify_property(PropertyKind::Name, "x");
        assert!(format!("{:?}", base.channels()).contains("property_changed: false"));
        base.channels().property_changed();
        assert!(format!("{:?}", base.channels()).contains("property_changed: true"));
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::None.to_string(), "");
        assert_eq!(Value::Int(4).to_string(), "4");
        assert_eq!(Value::from("loud").to_string(), "loud");
        assert_eq!(Value::Float(0.5).as_f64(), Some(0.5));
        assert_eq!(Value::from("12").as_f64(), Some(12.0));
    }
}
