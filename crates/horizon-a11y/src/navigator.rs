//! Read-only tree queries.
//!
//! Navigation is computed from the live item graph on every call. The
//! registry only contributes the [`ItemHandle`] for an item and the answer to
//! "is it still there"; nothing is cached, so structural changes made by
//! content are visible to the very next query.

use std::collections::HashSet;

use horizon_a11y_core::logging::targets;

use crate::item::{ItemId, State};
use crate::registry::{ItemHandle, ItemRegistry};
use crate::role::Role;

/// Stateless queries over an [`ItemRegistry`].
#[derive(Debug, Clone, Copy)]
pub struct TreeNavigator<'a> {
    registry: &'a ItemRegistry,
}

impl<'a> TreeNavigator<'a> {
    /// Create a navigator over `registry`.
    pub fn new(registry: &'a ItemRegistry) -> Self {
        Self { registry }
    }

    /// Handle of the item's registered parent.
    pub fn parent_of(&self, id: ItemId) -> Option<ItemHandle> {
        let parent = self.registry.resolve(id)?.accessible_parent()?;
        self.registry.handle(parent)
    }

    /// Number of children the item declares.
    pub fn child_count_of(&self, id: ItemId) -> usize {
        self.registry
            .resolve(id)
            .map_or(0, |item| item.accessible_child_count())
    }

    /// Handle of the child at `index`.
    ///
    /// Out-of-range indices and unregistered children yield `None`.
    pub fn child_of(&self, id: ItemId, index: usize) -> Option<ItemHandle> {
        let item = self.registry.resolve(id)?;
        let count = item.accessible_child_count();
        if index >= count {
            tracing::debug!(target: targets::REGISTRY, %id, index, count, "child index out of range");
            return None;
        }
        let child = item.accessible_child(index)?;
        self.registry.handle(child)
    }

    /// Position of `child` among the item's children (linear scan).
    pub fn index_of_child(&self, id: ItemId, child: &ItemHandle) -> Option<usize> {
        let item = self.registry.resolve(id)?;
        (0..item.accessible_child_count()).find(|&i| {
            item.accessible_child(i)
                .and_then(|c| self.registry.handle(c))
                .is_some_and(|h| &h == child)
        })
    }

    /// The first child whose `Focused` state is set.
    pub fn focused_child_of(&self, id: ItemId) -> Option<ItemHandle> {
        let item = self.registry.resolve(id)?;
        (0..item.accessible_child_count())
            .filter_map(|i| item.accessible_child(i))
            .find(|&child| {
                self.registry
                    .resolve(child)
                    .is_some_and(|c| c.accessible_state(State::Focused))
            })
            .and_then(|child| self.registry.handle(child))
    }

    /// The nearest item with `role`, starting at the item itself and walking
    /// up through registered parents.
    pub fn nearest_ancestor_with_role(&self, id: ItemId, role: Role) -> Option<ItemHandle> {
        let mut visited = HashSet::new();
        let mut current = Some(id);
        while let Some(cur) = current {
            if !visited.insert(cur) {
                tracing::warn!(target: targets::REGISTRY, id = %cur, "parent cycle in accessible tree");
                return None;
            }
            let item = self.registry.resolve(cur)?;
            if item.accessible_role() == role {
                return self.registry.handle(cur);
            }
            current = item.accessible_parent();
        }
        None
    }

    /// Depth-first, pre-order walk from `root` following declared children.
    pub fn descendants(&self, root: ItemId) -> Vec<ItemId> {
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![root];

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Some(item) = self.registry.resolve(id) else {
                continue;
            };
            order.push(id);
            let children: Vec<ItemId> = (0..item.accessible_child_count())
                .filter_map(|i| item.accessible_child(i))
                .collect();
            // Reverse so the first child is visited first.
            stack.extend(children.into_iter().rev());
        }
        order
    }
}
