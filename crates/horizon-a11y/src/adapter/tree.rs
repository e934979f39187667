//! AccessKit tree building.

use std::collections::HashSet;

use accesskit::{Action, Node, NodeId, Rect, Toggled, Tree, TreeUpdate};
use horizon_a11y_core::PerfSpan;
use horizon_a11y_core::logging::targets;

use super::item_id_to_node_id;
use super::query::{ItemQuery, TextKind};
use crate::controller::AccessibilityController;
use crate::event::{AccessEvent, EventKind};
use crate::item::ItemId;
use crate::role::Role;

impl ItemQuery<'_> {
    /// Build the AccessKit node for this item.
    pub fn build_node(&self) -> Node {
        let mut node = Node::new(self.native_role());
        let state = self.state();

        let name = self.text(TextKind::Name);
        if !name.is_empty() {
            node.set_label(name);
        }
        let description = match self.text(TextKind::Description) {
            d if d.is_empty() => self.text(TextKind::Accelerator),
            d => d,
        };
        if !description.is_empty() {
            node.set_description(description);
        }

        if let Some(rect) = self.rect() {
            node.set_bounds(Rect {
                x0: rect.x,
                y0: rect.y,
                x1: rect.x + rect.width,
                y1: rect.y + rect.height,
            });
        }

        let value = self.value();
        match self.role() {
            Role::Range | Role::SpinBox => {
                if let Some(v) = value.as_f64() {
                    node.set_numeric_value(v);
                }
                if let Some(min) = self.minimum_value().as_f64() {
                    node.set_min_numeric_value(min);
                }
                if let Some(max) = self.maximum_value().as_f64() {
                    node.set_max_numeric_value(max);
                }
                if let Some(step) = self.value_step().as_f64() {
                    node.set_numeric_value_step(step);
                }
            }
            _ if !value.is_none() => node.set_value(value.to_string()),
            _ => {}
        }

        if state.disabled {
            node.set_disabled();
            node.set_hidden();
        }
        if state.focusable {
            node.add_action(Action::Focus);
        }
        if state.checkable {
            node.set_toggled(if state.checked {
                Toggled::True
            } else {
                Toggled::False
            });
        }
        if state.selectable {
            node.set_selected(state.selected);
        }
        if let Some(row) = self.row_index() {
            node.set_row_index(row);
        }

        let children: Vec<NodeId> = self.children().into_iter().map(item_id_to_node_id).collect();
        if !children.is_empty() {
            node.set_children(children);
        }
        node
    }
}

impl AccessibilityController {
    /// A complete tree update, walking from the root.
    pub fn build_tree_update(&self) -> TreeUpdate {
        let _span = PerfSpan::new("build_tree_update");
        let root = self.root_id();
        let mut nodes = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![root];

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Some(query) = self.query(id) else {
                continue;
            };
            let children = query.children();
            nodes.push((item_id_to_node_id(id), query.build_node()));
            // Reverse so the first child is built first.
            stack.extend(children.into_iter().rev());
        }

        tracing::trace!(target: targets::ADAPTER, nodes = nodes.len(), "built full tree");
        TreeUpdate {
            nodes,
            tree: Some(Tree::new(item_id_to_node_id(root))),
            focus: self.focus_node(&visited),
        }
    }

    /// An incremental update covering `events`, or `None` if nothing in
    /// them is still in the tree.
    ///
    /// Structural events (creation, destruction, reparenting) produce a full
    /// tree; anything else refreshes the affected nodes.
    pub fn update_for_events(&self, events: &[AccessEvent]) -> Option<TreeUpdate> {
        if events.is_empty() {
            return None;
        }
        if events.iter().any(|event| event.kind.is_structural()) {
            return Some(self.build_tree_update());
        }

        let mut seen = HashSet::new();
        let mut nodes = Vec::new();
        for event in events {
            let id = event.target.id();
            if !event.target.is_valid() || !seen.insert(id) {
                continue;
            }
            if let Some(query) = self.query(id) {
                nodes.push((item_id_to_node_id(id), query.build_node()));
            }
        }

        let focus_changed = events.iter().any(|event| {
            matches!(
                event.kind,
                EventKind::StateChanged {
                    state: crate::item::State::Focused,
                    ..
                }
            )
        });
        if nodes.is_empty() && !focus_changed {
            return None;
        }

        Some(TreeUpdate {
            nodes,
            tree: None,
            focus: self.focus_node_registered(),
        })
    }

    /// [`update_for_events`](Self::update_for_events) for a single event.
    pub fn update_for_event(&self, event: &AccessEvent) -> Option<TreeUpdate> {
        self.update_for_events(std::slice::from_ref(event))
    }

    /// An update that only moves focus.
    pub fn build_focus_update(&self) -> TreeUpdate {
        TreeUpdate {
            nodes: Vec::new(),
            tree: None,
            focus: self.focus_node_registered(),
        }
    }

    fn focus_node(&self, in_tree: &HashSet<ItemId>) -> NodeId {
        let focus = self
            .last_focused()
            .filter(|id| in_tree.contains(id))
            .unwrap_or_else(|| self.root_id());
        item_id_to_node_id(focus)
    }

    fn focus_node_registered(&self) -> NodeId {
        let focus = self
            .last_focused()
            .filter(|&id| self.registry().is_valid(id))
            .unwrap_or_else(|| self.root_id());
        item_id_to_node_id(focus)
    }
}
