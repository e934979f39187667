//! AccessKit window adapter.

use std::sync::Arc;

use accesskit::{
    Action, ActionHandler, ActionRequest, ActivationHandler, DeactivationHandler, TreeUpdate,
};
use accesskit_winit::Adapter;
use horizon_a11y_core::ConnectionId;
use horizon_a11y_core::logging::targets;
use parking_lot::Mutex;
use winit::event::WindowEvent;
use winit::event_loop::ActiveEventLoop;
use winit::window::Window;

use super::node_id_to_item_id;
use crate::controller::AccessibilityController;
use crate::event::AccessEvent;
use crate::item::{ItemId, State};

/// Callback for accessibility actions other than focus.
pub type ActionCallback = Box<dyn Fn(ItemId, ActionRequest) + Send + Sync>;

/// Connects an [`AccessibilityController`] to one window's platform
/// accessibility API.
///
/// The bridge subscribes to the controller's event stream and queues every
/// event; [`flush`](Self::flush) turns the queue into one AccessKit update.
/// Call it once per event-loop iteration, after content had its turn.
///
/// # Important
///
/// The window must have been created with `visible(false)`. Create the
/// bridge, then show the window.
pub struct AccessKitBridge {
    adapter: Adapter,
    controller: AccessibilityController,
    pending: Arc<Mutex<Vec<AccessEvent>>>,
    events_connection: ConnectionId,
    focus_connection: ConnectionId,
    action_callback: Arc<Mutex<Option<ActionCallback>>>,
}

impl AccessKitBridge {
    /// Create a bridge for `window`.
    pub fn new(
        event_loop: &ActiveEventLoop,
        window: &Window,
        controller: AccessibilityController,
    ) -> Self {
        let action_callback: Arc<Mutex<Option<ActionCallback>>> = Arc::new(Mutex::new(None));

        let adapter = Adapter::with_direct_handlers(
            event_loop,
            window,
            ActivationHandlerImpl {
                controller: controller.clone(),
            },
            ActionHandlerImpl {
                controller: controller.clone(),
                action_callback: action_callback.clone(),
            },
            DeactivationHandlerImpl,
        );

        let pending: Arc<Mutex<Vec<AccessEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let queue = pending.clone();
        let events_connection = controller
            .event_sent()
            .connect(move |event| queue.lock().push(event.clone()));
        let queue = pending.clone();
        let focus_controller = controller.clone();
        let focus_connection = controller.focus_changed().connect(move |change| {
            // Promotions do not touch item state; queue the new focus so the
            // next flush moves it.
            if let Some(handle) = change.current.and_then(|id| focus_controller.handle(id)) {
                queue.lock().push(AccessEvent::new(
                    handle,
                    crate::event::EventKind::StateChanged {
                        state: State::Focused,
                        value: true,
                    },
                ));
            }
        });

        tracing::debug!(target: targets::ADAPTER, "accesskit bridge created");
        Self {
            adapter,
            controller,
            pending,
            events_connection,
            focus_connection,
            action_callback,
        }
    }

    /// Handle actions other than focus with `callback`.
    pub fn set_action_callback<F>(&self, callback: F)
    where
        F: Fn(ItemId, ActionRequest) + Send + Sync + 'static,
    {
        *self.action_callback.lock() = Some(Box::new(callback));
    }

    /// Remove the action callback.
    pub fn clear_action_callback(&self) {
        *self.action_callback.lock() = None;
    }

    /// Forward a window event to AccessKit.
    pub fn process_event(&mut self, window: &Window, event: &WindowEvent) {
        self.adapter.process_event(window, event);
    }

    /// Number of queued events.
    pub fn pending_events(&self) -> usize {
        self.pending.lock().len()
    }

    /// Send the queued events as one update, if assistive technology is
    /// connected. The queue is emptied either way.
    pub fn flush(&mut self) {
        let events = std::mem::take(&mut *self.pending.lock());
        if events.is_empty() {
            return;
        }
        tracing::trace!(target: targets::ADAPTER, count = events.len(), "flushing events");
        let controller = &self.controller;
        self.adapter.update_if_active(|| {
            controller
                .update_for_events(&events)
                .unwrap_or_else(|| controller.build_focus_update())
        });
    }

    /// Send a complete tree, if assistive technology is connected.
    pub fn rebuild(&mut self) {
        self.pending.lock().clear();
        let controller = &self.controller;
        self.adapter
            .update_if_active(|| controller.build_tree_update());
    }

    /// The underlying AccessKit adapter.
    pub fn adapter_mut(&mut self) -> &mut Adapter {
        &mut self.adapter
    }
}

impl Drop for AccessKitBridge {
    fn drop(&mut self) {
        self.controller.event_sent().disconnect(self.events_connection);
        self.controller.focus_changed().disconnect(self.focus_connection);
    }
}

struct ActivationHandlerImpl {
    controller: AccessibilityController,
}

impl ActivationHandler for ActivationHandlerImpl {
    fn request_initial_tree(&mut self) -> Option<TreeUpdate> {
        tracing::debug!(target: targets::ADAPTER, "assistive technology connected");
        Some(self.controller.build_tree_update())
    }
}

struct ActionHandlerImpl {
    controller: AccessibilityController,
    action_callback: Arc<Mutex<Option<ActionCallback>>>,
}

impl ActionHandler for ActionHandlerImpl {
    fn do_action(&mut self, request: ActionRequest) {
        let id = node_id_to_item_id(request.target);
        if request.action == Action::Focus {
            match self.controller.item(id) {
                Some(item) => item.set_accessible_state(State::Focused, true),
                None => {
                    tracing::debug!(target: targets::ADAPTER, %id, "focus requested for unknown item")
                }
            }
            return;
        }
        if let Some(ref callback) = *self.action_callback.lock() {
            callback(id, request);
        }
    }
}

struct DeactivationHandlerImpl;

impl DeactivationHandler for DeactivationHandlerImpl {
    fn deactivate_accessibility(&mut self) {
        tracing::debug!(target: targets::ADAPTER, "assistive technology disconnected");
    }
}
