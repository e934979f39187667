//! The item registry.
//!
//! [`ItemRegistry`] is the single source of truth for "is this item currently
//! registered". It maps an [`ItemId`] to an [`ItemRecord`], which holds a weak
//! reference to the item, the query handle given out to platform adapters and
//! the ids of the registry's subscriptions on the item's channels.
//!
//! The registry never owns items. If an item is dropped without being
//! unregistered its record stays in the map but reports itself invalid, and
//! every lookup through it resolves to "absent".

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use horizon_a11y_core::ConnectionId;
use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::item::{AccessibleItem, ItemId};

/// Opaque handle for one registered item, given out with events and to
/// platform adapters.
///
/// Handles compare by identity. After the item is unregistered the handle is
/// invalidated; holders can keep it but can no longer resolve anything
/// through it.
#[derive(Clone)]
pub struct ItemHandle(Arc<HandleInner>);

struct HandleInner {
    id: ItemId,
    valid: AtomicBool,
}

impl ItemHandle {
    pub(crate) fn new(id: ItemId) -> Self {
        Self(Arc::new(HandleInner {
            id,
            valid: AtomicBool::new(true),
        }))
    }

    /// The item this handle stands for.
    pub fn id(&self) -> ItemId {
        self.0.id
    }

    /// Whether the item is still registered.
    pub fn is_valid(&self) -> bool {
        self.0.valid.load(Ordering::Acquire)
    }

    fn invalidate(&self) {
        self.0.valid.store(false, Ordering::Release);
    }
}

impl PartialEq for ItemHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ItemHandle {}

impl fmt::Debug for ItemHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemHandle")
            .field("id", &self.0.id)
            .field("valid", &self.is_valid())
            .finish()
    }
}

/// Ids of the registry's subscriptions on an item's channels.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Subscriptions {
    pub(crate) property: ConnectionId,
    pub(crate) state: ConnectionId,
}

/// Bookkeeping for one registered item.
pub struct ItemRecord {
    item: Weak<dyn AccessibleItem>,
    handle: ItemHandle,
    subscriptions: Option<Subscriptions>,
    removing: bool,
}

impl ItemRecord {
    pub(crate) fn new(item: &Arc<dyn AccessibleItem>) -> Self {
        Self {
            item: Arc::downgrade(item),
            handle: ItemHandle::new(item.accessible_id()),
            subscriptions: None,
            removing: false,
        }
    }

    /// The item's id.
    pub fn id(&self) -> ItemId {
        self.handle.id()
    }

    /// The query handle.
    pub fn handle(&self) -> &ItemHandle {
        &self.handle
    }

    /// The item, if it is still alive.
    pub fn item(&self) -> Option<Arc<dyn AccessibleItem>> {
        self.item.upgrade()
    }

    /// Whether both the item and its handle are present.
    pub fn is_valid(&self) -> bool {
        self.handle.is_valid() && self.item.strong_count() > 0
    }

    pub(crate) fn set_subscriptions(&mut self, subscriptions: Subscriptions) {
        self.subscriptions = Some(subscriptions);
    }

    /// Disconnect from the item's channels and invalidate the handle.
    ///
    /// Called once, after the `Destroyed` event went out.
    pub(crate) fn release(mut self) {
        if let (Some(subs), Some(item)) = (self.subscriptions.take(), self.item.upgrade()) {
            let channels = item.accessible_base().channels();
            channels.property_changed().disconnect(subs.property);
            channels.state_changed().disconnect(subs.state);
        }
        self.handle.invalidate();
    }
}

impl fmt::Debug for ItemRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemRecord")
            .field("handle", &self.handle)
            .field("alive", &(self.item.strong_count() > 0))
            .field("subscribed", &self.subscriptions.is_some())
            .field("removing", &self.removing)
            .finish()
    }
}

/// Mapping from item identity to its record.
///
/// Lookups take a short read lock and return owned values, so no caller ever
/// holds the lock while running item code or emitting events.
#[derive(Debug, Default)]
pub struct ItemRegistry {
    records: RwLock<HashMap<ItemId, ItemRecord>>,
}

impl ItemRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record. Fails if the id is already present.
    pub(crate) fn insert(&self, record: ItemRecord) -> Result<ItemHandle> {
        let mut records = self.records.write();
        let id = record.id();
        if records.contains_key(&id) {
            return Err(Error::AlreadyRegistered(id));
        }
        let handle = record.handle.clone();
        records.insert(id, record);
        Ok(handle)
    }

    /// Attach subscription ids to an existing record.
    pub(crate) fn set_subscriptions(&self, id: ItemId, subscriptions: Subscriptions) {
        if let Some(record) = self.records.write().get_mut(&id) {
            record.set_subscriptions(subscriptions);
        }
    }

    /// Mark the record for `id` as being removed and return its handle.
    ///
    /// The record keeps resolving until [`take`](Self::take), so subscribers
    /// of the `Destroyed` event can still query the item. Returns `None` if
    /// the id is absent or already being removed.
    pub(crate) fn begin_removal(&self, id: ItemId) -> Option<ItemHandle> {
        let mut records = self.records.write();
        let record = records.get_mut(&id).filter(|record| !record.removing)?;
        record.removing = true;
        Some(record.handle.clone())
    }

    /// Remove and return a record.
    pub(crate) fn take(&self, id: ItemId) -> Option<ItemRecord> {
        self.records.write().remove(&id)
    }

    /// Whether an item is registered.
    pub fn contains(&self, id: ItemId) -> bool {
        self.records.read().contains_key(&id)
    }

    /// Resolve an id to its live item.
    pub fn resolve(&self, id: ItemId) -> Option<Arc<dyn AccessibleItem>> {
        let records = self.records.read();
        let record = records.get(&id)?;
        if !record.handle.is_valid() {
            return None;
        }
        record.item()
    }

    /// The query handle for an id.
    pub fn handle(&self, id: ItemId) -> Option<ItemHandle> {
        self.records.read().get(&id).map(|r| r.handle.clone())
    }

    /// Whether the record for `id` is valid (registered and alive).
    pub fn is_valid(&self, id: ItemId) -> bool {
        self.records.read().get(&id).is_some_and(ItemRecord::is_valid)
    }

    /// Whether `id` is valid, not ignored and not being removed, i.e. may
    /// hold focus.
    pub fn is_usable(&self, id: ItemId) -> bool {
        let removing = self.records.read().get(&id).is_some_and(|r| r.removing);
        // Resolve first; item code runs without the lock held.
        !removing && self.resolve(id).is_some_and(|item| !item.accessible_ignored())
    }

    /// All registered ids, in no particular order.
    pub fn ids(&self) -> Vec<ItemId> {
        self.records.read().keys().copied().collect()
    }

    /// Number of registered items.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::AccessibleBase;
    use crate::role::Role;

    struct Leaf {
        base: AccessibleBase,
        ignored: bool,
    }

    impl AccessibleItem for Leaf {
        fn accessible_base(&self) -> &AccessibleBase {
            &self.base
        }

        fn accessible_parent(&self) -> Option<ItemId> {
            None
        }

        fn accessible_role(&self) -> Role {
            Role::Button
        }

        fn accessible_name(&self) -> String {
            "leaf".into()
        }

        fn accessible_ignored(&self) -> bool {
            self.ignored
        }
    }

    fn leaf(ignored: bool) -> Arc<dyn AccessibleItem> {
        Arc::new(Leaf {
            base: AccessibleBase::new(),
            ignored,
        })
    }

    #[test]
    fn test_insert_twice_is_rejected() {
        let registry = ItemRegistry::new();
        let item = leaf(false);

        registry.insert(ItemRecord::new(&item)).unwrap();
        let err = registry.insert(ItemRecord::new(&item)).unwrap_err();
        assert!(matches!(err, Error::AlreadyRegistered(id) if id == item.accessible_id()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_dropped_item_resolves_to_none() {
        let registry = ItemRegistry::new();
        let item = leaf(false);
        let id = item.accessible_id();
        registry.insert(ItemRecord::new(&item)).unwrap();
        assert!(registry.is_valid(id));

        drop(item);
        assert!(registry.contains(id));
        assert!(!registry.is_valid(id));
        assert!(registry.resolve(id).is_none());
    }

    #[test]
    fn test_ignored_item_is_valid_but_not_usable() {
        let registry = ItemRegistry::new();
        let item = leaf(true);
        let id = item.accessible_id();
        registry.insert(ItemRecord::new(&item)).unwrap();

        assert!(registry.is_valid(id));
        assert!(!registry.is_usable(id));
    }

    #[test]
    fn test_release_invalidates_handle() {
        let registry = ItemRegistry::new();
        let item = leaf(false);
        let id = item.accessible_id();
        let handle = registry.insert(ItemRecord::new(&item)).unwrap();

        let record = registry.take(id).unwrap();
        assert!(handle.is_valid());
        record.release();
        assert!(!handle.is_valid());
        assert!(registry.take(id).is_none());
    }

    #[test]
    fn test_record_resolves_while_being_removed() {
        let registry = ItemRegistry::new();
        let item = leaf(false);
        let id = item.accessible_id();
        let handle = registry.insert(ItemRecord::new(&item)).unwrap();

        assert_eq!(registry.begin_removal(id), Some(handle.clone()));
        assert!(registry.begin_removal(id).is_none());
        assert!(registry.resolve(id).is_some());
        assert!(!registry.is_usable(id));

        registry.take(id).unwrap().release();
        assert!(registry.begin_removal(id).is_none());
        assert!(!handle.is_valid());
    }
}
