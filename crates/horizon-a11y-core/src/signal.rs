//! Signal/slot system for Horizon A11y.
//!
//! Signals are the notification channel between accessible items and the
//! bridge: items emit property and state changes, the event bus emits tree
//! events, and any number of slots (closures) observe them.
//!
//! # Key Types
//!
//! - [`Signal<Args>`] - The main signal type for emitting notifications
//! - [`ConnectionId`] - Unique identifier returned when connecting a slot
//! - [`ConnectionGuard`] - RAII guard that disconnects when dropped
//!
//! # Re-entrancy
//!
//! Slots are invoked after the connection table lock has been released, on
//! the emitting thread, in connection order. A slot may therefore connect,
//! disconnect or emit on the same signal (or query state that itself emits)
//! without deadlocking. Connections added during an emission are not invoked
//! by that emission; connections removed during an emission are skipped if
//! they have not been reached yet.
//!
//! # Example
//!
//! ```
//! use horizon_a11y_core::Signal;
//!
//! let name_changed = Signal::<String>::new();
//!
//! let conn_id = name_changed.connect(|name| {
//!     println!("Name changed to: {}", name);
//! });
//!
//! name_changed.emit("Play".to_string());
//! name_changed.disconnect(conn_id);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::logging::targets;

new_key_type! {
    /// A unique identifier for a signal-slot connection.
    ///
    /// Use this ID to disconnect a specific connection via [`Signal::disconnect`].
    /// The ID remains valid until the connection is explicitly disconnected or
    /// the signal is dropped.
    pub struct ConnectionId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

/// Connected slots plus the order they were connected in.
///
/// `SlotMap` reuses freed slots, so its iteration order is not connection
/// order; `order` is.
struct Connections<Args> {
    slots: SlotMap<ConnectionId, Slot<Args>>,
    order: Vec<ConnectionId>,
}

impl<Args> Connections<Args> {
    fn new() -> Self {
        Self {
            slots: SlotMap::with_key(),
            order: Vec::new(),
        }
    }

    fn insert(&mut self, slot: Slot<Args>) -> ConnectionId {
        let id = self.slots.insert(slot);
        self.order.push(id);
        id
    }

    fn remove(&mut self, id: ConnectionId) -> bool {
        if self.slots.remove(id).is_none() {
            return false;
        }
        self.order.retain(|&other| other != id);
        true
    }

    fn clear(&mut self) {
        self.slots.clear();
        self.order.clear();
    }

    fn snapshot(&self) -> Vec<(ConnectionId, Slot<Args>)> {
        self.order
            .iter()
            .filter_map(|&id| self.slots.get(id).map(|slot| (id, slot.clone())))
            .collect()
    }
}

/// A type-safe signal that can have multiple connected slots.
///
/// # Type Parameter
///
/// - `Args`: The argument type passed to connected slots. Use `()` for signals
///   with no arguments, or a tuple like `(State, bool)` for multiple arguments.
///
/// # Thread Safety
///
/// `Signal<Args>` is `Send + Sync`. Slots are always invoked directly on the
/// emitting thread; the bridge is single-threaded by contract and hosts that
/// answer platform queries from another thread serialize through the
/// controller's locks.
pub struct Signal<Args> {
    /// All active connections.
    connections: Mutex<Connections<Args>>,
    /// Whether signal emission is temporarily blocked.
    blocked: AtomicBool,
}

impl<Args: Send + 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: Send + 'static> Signal<Args> {
    /// Create a new signal with no connections.
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(Connections::new()),
            blocked: AtomicBool::new(false),
        }
    }

    /// Connect a slot (closure) to this signal.
    ///
    /// Returns a `ConnectionId` that can be used to disconnect the slot later.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.connections.lock().insert(Arc::new(slot))
    }

    /// Connect a slot that is disconnected when the returned guard drops.
    pub fn connect_scoped<F>(&self, slot: F) -> ConnectionGuard<'_, Args>
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let id = self.connect(slot);
        ConnectionGuard { signal: self, id }
    }

    /// Disconnect a specific slot by its connection ID.
    ///
    /// Returns `true` if the connection was found and removed, `false` otherwise.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.connections.lock().remove(id)
    }

    /// Disconnect all slots from this signal.
    pub fn disconnect_all(&self) {
        self.connections.lock().clear();
    }

    /// Get the number of connected slots.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().slots.len()
    }

    /// Block signal emission temporarily.
    ///
    /// While blocked, calls to `emit()` do nothing.
    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    /// Check if signal emission is currently blocked.
    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    /// Emit the signal, invoking all connected slots in connection order.
    ///
    /// Returns the number of slots that were invoked.
    #[tracing::instrument(skip_all, target = "horizon_a11y_core::signal", level = "trace")]
    pub fn emit(&self, args: Args) -> usize {
        if self.is_blocked() {
            tracing::trace!(target: targets::SIGNAL, "signal blocked, skipping emit");
            return 0;
        }

        // Snapshot the slots so the lock is not held while user code runs.
        let snapshot = self.connections.lock().snapshot();
        tracing::trace!(target: targets::SIGNAL, connection_count = snapshot.len(), "emitting signal");

        let mut invoked = 0;
        for (id, slot) in snapshot {
            if !self.connections.lock().slots.contains_key(id) {
                continue;
            }
            slot(&args);
            invoked += 1;
        }
        invoked
    }
}

/// A connection guard that automatically disconnects when dropped.
///
/// Created via [`Signal::connect_scoped`].
pub struct ConnectionGuard<'a, Args: Send + 'static> {
    signal: &'a Signal<Args>,
    id: ConnectionId,
}

impl<Args: Send + 'static> ConnectionGuard<'_, Args> {
    /// Get the underlying connection ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl<Args: Send + 'static> Drop for ConnectionGuard<'_, Args> {
    fn drop(&mut self) {
        self.signal.disconnect(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicI32;

    #[test]
    fn test_signal_connect_emit() {
        let signal = Signal::<i32>::new();
        let received = Arc::new(AtomicI32::new(0));
        let received_clone = received.clone();

        signal.connect(move |value| {
            received_clone.store(*value, Ordering::SeqCst);
        });

        assert_eq!(signal.emit(42), 1);
        assert_eq!(received.load(Ordering::SeqCst), 42);
    }

    #[test]
    fn test_signal_disconnect() {
        let signal = Signal::<i32>::new();
        let counter = Arc::new(AtomicI32::new(0));
        let counter_clone = counter.clone();

        let id = signal.connect(move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        signal.emit(1);
        assert!(signal.disconnect(id));
        assert!(!signal.disconnect(id));
        signal.emit(2);

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_signal_blocked() {
        let signal = Signal::<()>::new();
        let counter = Arc::new(AtomicI32::new(0));
        let counter_clone = counter.clone();
        signal.connect(move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        signal.set_blocked(true);
        assert_eq!(signal.emit(()), 0);
        signal.set_blocked(false);
        signal.emit(());

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_emission_order_follows_connection_order() {
        let signal = Signal::<()>::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for n in 0..3 {
            let order = order.clone();
            signal.connect(move |_| order.lock().push(n));
        }
        signal.emit(());

        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn test_reused_slot_keeps_connection_order() {
        let signal = Signal::<()>::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let connect = |n: i32| {
            let order = order.clone();
            signal.connect(move |_| order.lock().push(n))
        };

        let first = connect(0);
        connect(1);
        connect(2);
        assert!(signal.disconnect(first));
        // Takes the freed slot of the first connection.
        connect(3);
        signal.emit(());

        assert_eq!(*order.lock(), vec![1, 2, 3]);
        assert_eq!(signal.connection_count(), 3);
    }

    #[test]
    fn test_connection_guard() {
        let signal = Signal::<i32>::new();
        {
            let _guard = signal.connect_scoped(|_| {});
            assert_eq!(signal.connection_count(), 1);
        }
        assert_eq!(signal.connection_count(), 0);
    }

    #[test]
    fn test_reentrant_connect_and_emit() {
        let signal = Arc::new(Signal::<i32>::new());
        let counter = Arc::new(AtomicI32::new(0));

        let inner_signal = signal.clone();
        let inner_counter = counter.clone();
        signal.connect(move |value| {
            inner_counter.fetch_add(1, Ordering::SeqCst);
            if *value == 0 {
                // Connecting and re-emitting from inside a slot must not deadlock.
                inner_signal.connect(|_| {});
                inner_signal.emit(1);
            }
        });

        signal.emit(0);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(signal.connection_count(), 2);
    }

    #[test]
    fn test_disconnect_during_emit_skips_pending_slot() {
        let signal = Arc::new(Signal::<()>::new());
        let hits = Arc::new(AtomicI32::new(0));
        let second_id = Arc::new(Mutex::new(None::<ConnectionId>));

        let disconnecting = signal.clone();
        let pending = second_id.clone();
        signal.connect(move |_| {
            if let Some(id) = *pending.lock() {
                disconnecting.disconnect(id);
            }
        });
        let hits_clone = hits.clone();
        let id = signal.connect(move |_| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });
        *second_id.lock() = Some(id);

        signal.emit(());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
