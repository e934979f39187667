//! The per-item query surface.

use std::sync::Arc;

use accesskit::Role as NativeRole;

use crate::controller::AccessibilityController;
use crate::item::{AccessibleItem, ItemId, ItemRect, State, TextBoundary, TextRange, Value};
use crate::registry::ItemHandle;
use crate::role::{Platform, Role};

/// Text slots an assistive technology can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextKind {
    /// The accessible name.
    Name,
    /// The description.
    Description,
    /// The accelerator (keyboard shortcut).
    Accelerator,
    /// The value as text.
    Value,
}

/// Native state set of an item, as reported to the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NativeState {
    /// The item is disabled.
    pub disabled: bool,
    /// The item is not shown.
    pub invisible: bool,
    /// The window, panel or list is active.
    pub active: bool,
    /// The item can take focus.
    pub focusable: bool,
    /// The item has focus.
    pub focused: bool,
    /// The item can be checked.
    pub checkable: bool,
    /// The item is checked.
    pub checked: bool,
    /// The item can be selected.
    pub selectable: bool,
    /// The item is selected.
    pub selected: bool,
}

impl NativeState {
    /// The state set of `item`, derived from its role and boolean states.
    ///
    /// Disabled items report only `disabled` and `invisible`.
    pub fn of(item: &dyn AccessibleItem) -> Self {
        let mut state = NativeState::default();
        if !item.accessible_state(State::Enabled) {
            state.disabled = true;
            state.invisible = true;
            return state;
        }

        let role = item.accessible_role();
        if role == Role::Application {
            state.active = true;
        } else if role.reports_active() {
            state.active = item.accessible_state(State::Active);
        }
        if role.is_focusable() {
            state.focusable = true;
            state.focused = item.accessible_state(State::Focused);
        }
        if role.is_checkable() {
            state.checkable = true;
            state.checked = item.accessible_state(State::Checked);
        }
        if role.is_selectable() {
            state.selectable = true;
            state.selected = item.accessible_state(State::Selected);
        }
        state
    }
}

/// A view of one registered item, answering platform queries.
///
/// Obtained from [`AccessibilityController::query`]. The view holds the item
/// alive only for its own duration.
pub struct ItemQuery<'a> {
    controller: &'a AccessibilityController,
    item: Arc<dyn AccessibleItem>,
}

impl AccessibilityController {
    /// The query view of `id`, if it is registered and alive.
    pub fn query(&self, id: ItemId) -> Option<ItemQuery<'_>> {
        let item = self
            .item(id)
            .or_else(|| (id == self.root_id()).then(|| self.root_item()))?;
        Some(ItemQuery {
            controller: self,
            item,
        })
    }
}

impl ItemQuery<'_> {
    /// The item's id.
    pub fn id(&self) -> ItemId {
        self.item.accessible_id()
    }

    /// The item's query handle.
    pub fn handle(&self) -> Option<ItemHandle> {
        self.controller.handle(self.id())
    }

    /// The underlying item.
    pub fn item(&self) -> &Arc<dyn AccessibleItem> {
        &self.item
    }

    /// The item's role.
    pub fn role(&self) -> Role {
        self.item.accessible_role()
    }

    /// The platform role.
    pub fn native_role(&self) -> NativeRole {
        self.role().to_accesskit_role(self.controller.platform())
    }

    /// The native state set.
    pub fn state(&self) -> NativeState {
        NativeState::of(self.item.as_ref())
    }

    /// The parent, if registered.
    pub fn parent(&self) -> Option<ItemId> {
        self.controller
            .navigator()
            .parent_of(self.id())
            .map(|handle| handle.id())
    }

    /// Registered children, in declared order.
    pub fn children(&self) -> Vec<ItemId> {
        let navigator = self.controller.navigator();
        (0..self.item.accessible_child_count())
            .filter_map(|i| navigator.child_of(self.id(), i))
            .map(|handle| handle.id())
            .collect()
    }

    /// Position of this item among its parent's children.
    pub fn index_in_parent(&self) -> Option<usize> {
        let parent = self.parent()?;
        let handle = self.handle()?;
        self.controller.navigator().index_of_child(parent, &handle)
    }

    /// Text for one slot, with the platform's slot policy applied.
    pub fn text(&self, kind: TextKind) -> String {
        let platform = self.controller.platform();
        match kind {
            TextKind::Name => self.name_text(platform),
            TextKind::Description | TextKind::Accelerator => {
                if self.description_slot(platform) != Some(kind) {
                    return String::new();
                }
                if self.controller.announcement_override_for(self.id()).is_some() {
                    return String::new();
                }
                self.filtered_description()
            }
            TextKind::Value => self.item.accessible_value().to_string(),
        }
    }

    fn name_text(&self, platform: Platform) -> String {
        if let Some(announcement) = self.controller.announcement_override_for(self.id()) {
            return announcement;
        }

        let mut name = self.item.accessible_name();
        if platform == Platform::MacOs {
            let description = self.filtered_description();
            if !description.is_empty() {
                name.push_str(", ");
                name.push_str(&description);
            }
        }

        if self.controller.last_focused() == Some(self.id())
            && self.controller.need_to_voice_panel_info()
        {
            let panel = self.controller.current_panel_accessible_name();
            if !panel.is_empty() {
                name = format!("{panel} panel, {name}");
            }
        }
        name
    }

    /// Which slot carries the description on `platform`.
    fn description_slot(&self, platform: Platform) -> Option<TextKind> {
        match platform {
            Platform::MacOs => None,
            Platform::Windows => Some(TextKind::Accelerator),
            Platform::Linux | Platform::Other => Some(TextKind::Description),
        }
    }

    /// The description, or empty if the name already says it.
    pub fn filtered_description(&self) -> String {
        let description = self.item.accessible_description();
        if description.is_empty() {
            return description;
        }
        let name = self.item.accessible_name().to_lowercase();
        if name.contains(&description.to_lowercase()) {
            String::new()
        } else {
            description
        }
    }

    /// Current value.
    pub fn value(&self) -> Value {
        self.item.accessible_value()
    }

    /// Minimum value.
    pub fn minimum_value(&self) -> Value {
        self.item.accessible_minimum_value()
    }

    /// Maximum value.
    pub fn maximum_value(&self) -> Value {
        self.item.accessible_maximum_value()
    }

    /// Value step.
    pub fn value_step(&self) -> Value {
        self.item.accessible_value_step()
    }

    /// Bounds in window coordinates.
    pub fn rect(&self) -> Option<ItemRect> {
        self.item.accessible_rect()
    }

    /// Text cursor position.
    pub fn cursor_position(&self) -> usize {
        self.item.accessible_cursor_position()
    }

    /// Number of characters.
    pub fn character_count(&self) -> usize {
        self.item.accessible_character_count()
    }

    /// Text between two offsets.
    pub fn text_range(&self, start: usize, end: usize) -> String {
        self.item.accessible_text(start, end)
    }

    /// Text around `offset`.
    pub fn text_at_offset(&self, offset: usize, boundary: TextBoundary) -> TextRange {
        self.item.accessible_text_at_offset(offset, boundary)
    }

    /// Text before `offset`.
    pub fn text_before_offset(&self, offset: usize, boundary: TextBoundary) -> TextRange {
        self.item.accessible_text_before_offset(offset, boundary)
    }

    /// Text after `offset`.
    pub fn text_after_offset(&self, offset: usize, boundary: TextBoundary) -> TextRange {
        self.item.accessible_text_after_offset(offset, boundary)
    }

    /// Number of selected ranges.
    pub fn selection_count(&self) -> usize {
        self.item.accessible_selection_count()
    }

    /// Selected range at `index`.
    pub fn selection(&self, index: usize) -> Option<(usize, usize)> {
        self.item.accessible_selection(index)
    }

    /// Row index for list and table items.
    pub fn row_index(&self) -> Option<usize> {
        self.item.accessible_row_index()
    }
}

impl std::fmt::Debug for ItemQuery<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemQuery")
            .field("id", &self.id())
            .field("role", &self.role())
            .finish()
    }
}
