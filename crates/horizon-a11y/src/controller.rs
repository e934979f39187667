//! The accessibility controller.
//!
//! [`AccessibilityController`] is the composition root of the bridge and the
//! only thing content code talks to. It owns the registry, focus tracker,
//! event bus, announcer and speech repeater, and it is itself the root of the
//! accessible tree (an [`Role::Application`] item).
//!
//! # Lifecycle
//!
//! The controller is constructed once at startup. The root item exists from
//! construction so content can name it as a parent, but it is only
//! registered (and its `Created` event sent) on the first `register` call
//! made while accessibility is enabled. [`AccessibilityController::shutdown`]
//! unregisters everything, root last.
//!
//! # Re-entrancy
//!
//! No internal lock is held while events are delivered or item code runs, so
//! subscribers and items may query the controller from inside any callback.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use horizon_a11y::{AccessibilityController, AccessibleBase, AccessibleItem, ItemId, Role, State};
//!
//! struct Button {
//!     base: AccessibleBase,
//!     parent: ItemId,
//! }
//!
//! impl AccessibleItem for Button {
//!     fn accessible_base(&self) -> &AccessibleBase { &self.base }
//!     fn accessible_parent(&self) -> Option<ItemId> { Some(self.parent) }
//!     fn accessible_role(&self) -> Role { Role::Button }
//!     fn accessible_name(&self) -> String { "Play".into() }
//! }
//!
//! let controller = AccessibilityController::new(Default::default());
//! let play = Arc::new(Button { base: AccessibleBase::new(), parent: controller.root_id() });
//! controller.register(play.clone());
//!
//! play.set_accessible_state(State::Focused, true);
//! assert_eq!(controller.last_focused(), Some(play.accessible_id()));
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use horizon_a11y_core::logging::targets;
use horizon_a11y_core::Signal;
use parking_lot::{Mutex, RwLock};

use crate::announcer::{
    ActionTitles, AnnounceOutcome, Announcer, FocusSnapshot, NeverRevoice, RevoicingPolicy,
};
use crate::config::AccessibilityConfig;
use crate::error::{Error, Result};
use crate::event::{AccessEvent, EventBus, EventKind, PropertyEventTable};
use crate::focus::{FocusChange, FocusTracker, Promotion};
use crate::hotkey::{KeyInput, RepeatHotkeyConfig, RepeatHotkeyFilter};
use crate::item::{AccessibleBase, AccessibleItem, ItemId, PropertyKind, State, Value};
use crate::navigator::TreeNavigator;
use crate::registry::{ItemHandle, ItemRecord, ItemRegistry, Subscriptions};
use crate::role::{Platform, Role};
use crate::speech::{self, RepeatOutcome, SpeechRepeater, SpeechSink};

/// The application root of the accessible tree.
struct RootItem {
    base: AccessibleBase,
    name: String,
    children: RwLock<Vec<ItemId>>,
}

impl RootItem {
    fn new(name: String, enabled: bool) -> Self {
        let base = AccessibleBase::new();
        base.set_state(State::Enabled, enabled);
        base.set_state(State::Active, true);
        Self {
            base,
            name,
            children: RwLock::new(Vec::new()),
        }
    }
}

impl AccessibleItem for RootItem {
    fn accessible_base(&self) -> &AccessibleBase {
        &self.base
    }

    fn accessible_parent(&self) -> Option<ItemId> {
        None
    }

    fn accessible_child_count(&self) -> usize {
        self.children.read().len()
    }

    fn accessible_child(&self, index: usize) -> Option<ItemId> {
        self.children.read().get(index).copied()
    }

    fn accessible_role(&self) -> Role {
        Role::Application
    }

    fn accessible_name(&self) -> String {
        self.name.clone()
    }
}

#[derive(Debug, Default)]
struct PanelState {
    current: Option<ItemId>,
    need_to_voice: bool,
}

struct Inner {
    config: AccessibilityConfig,
    platform: Platform,
    event_table: PropertyEventTable,
    enabled: AtomicBool,
    initialized: AtomicBool,
    root: Arc<RootItem>,
    registry: ItemRegistry,
    focus: FocusTracker,
    bus: EventBus,
    announcer: Mutex<Announcer>,
    panel: Mutex<PanelState>,
    speech: Mutex<SpeechRepeater>,
    hotkey: RwLock<RepeatHotkeyFilter>,
    action_titles: RwLock<Option<Arc<dyn ActionTitles>>>,
    revoicing: RwLock<Arc<dyn RevoicingPolicy>>,
}

/// Builder for [`AccessibilityController`].
pub struct AccessibilityControllerBuilder {
    config: AccessibilityConfig,
    speech_sink: Option<Box<dyn SpeechSink>>,
    action_titles: Option<Arc<dyn ActionTitles>>,
    revoicing: Option<Arc<dyn RevoicingPolicy>>,
}

impl AccessibilityControllerBuilder {
    /// Use `config`.
    pub fn config(mut self, config: AccessibilityConfig) -> Self {
        self.config = config;
        self
    }

    /// Speak "repeat" requests through `sink`.
    pub fn speech_sink(mut self, sink: impl SpeechSink + 'static) -> Self {
        self.speech_sink = Some(Box::new(sink));
        self
    }

    /// Look up action titles for auto-announcement in `titles`.
    pub fn action_titles(mut self, titles: impl ActionTitles + 'static) -> Self {
        self.action_titles = Some(Arc::new(titles));
        self
    }

    /// Decide revoicing with `policy`.
    pub fn revoicing_policy(mut self, policy: impl RevoicingPolicy + 'static) -> Self {
        self.revoicing = Some(Arc::new(policy));
        self
    }

    /// Build the controller.
    pub fn build(self) -> AccessibilityController {
        let config = self.config;
        let platform = config.platform();
        let enabled = config.enabled;

        let inner = Arc::new(Inner {
            platform,
            event_table: PropertyEventTable::for_platform(platform),
            enabled: AtomicBool::new(enabled),
            initialized: AtomicBool::new(false),
            root: Arc::new(RootItem::new(config.application_name.clone(), enabled)),
            registry: ItemRegistry::new(),
            focus: FocusTracker::new(config.pretend_focus_delay()),
            bus: EventBus::new(),
            announcer: Mutex::new(Announcer::new()),
            panel: Mutex::new(PanelState::default()),
            speech: Mutex::new(match self.speech_sink {
                Some(sink) => SpeechRepeater::with_sink(sink),
                None => SpeechRepeater::new(),
            }),
            hotkey: RwLock::new(RepeatHotkeyFilter::new(config.repeat_hotkey)),
            action_titles: RwLock::new(self.action_titles),
            revoicing: RwLock::new(self.revoicing.unwrap_or_else(|| Arc::new(NeverRevoice))),
            config,
        });

        let weak = Arc::downgrade(&inner);
        inner.focus.focus_changed().connect(move |change| {
            if let Some(inner) = weak.upgrade() {
                inner.on_focus_changed(*change);
            }
        });

        tracing::debug!(
            target: targets::CONTROLLER,
            ?platform,
            enabled,
            root = %inner.root.base.id(),
            "accessibility controller created"
        );
        AccessibilityController { inner }
    }
}

/// Entry point of the accessibility bridge.
///
/// Cloning is cheap; clones share the same tree.
#[derive(Clone)]
pub struct AccessibilityController {
    inner: Arc<Inner>,
}

impl AccessibilityController {
    /// Create a controller from `config`.
    pub fn new(config: AccessibilityConfig) -> Self {
        Self::builder().config(config).build()
    }

    /// Start building a controller.
    pub fn builder() -> AccessibilityControllerBuilder {
        AccessibilityControllerBuilder {
            config: AccessibilityConfig::default(),
            speech_sink: None,
            action_titles: None,
            revoicing: None,
        }
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// The configuration the controller was built with.
    pub fn config(&self) -> &AccessibilityConfig {
        &self.inner.config
    }

    /// The platform whose conventions the mapping tables follow.
    pub fn platform(&self) -> Platform {
        self.inner.platform
    }

    /// The property-to-event table in use.
    pub fn event_table(&self) -> &PropertyEventTable {
        &self.inner.event_table
    }

    /// Whether accessibility is enabled.
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::Acquire)
    }

    /// Turn the bridge on or off.
    ///
    /// While disabled, `register` does nothing. Items registered earlier stay
    /// registered.
    pub fn set_enabled(&self, enabled: bool) {
        if self.inner.enabled.swap(enabled, Ordering::AcqRel) != enabled {
            tracing::info!(target: targets::CONTROLLER, enabled, "accessibility switched");
            self.inner.root.base.set_state(State::Enabled, enabled);
        }
    }

    /// Replace the speech sink.
    pub fn set_speech_sink(&self, sink: Option<Box<dyn SpeechSink>>) {
        self.inner.speech.lock().set_sink(sink);
    }

    /// Replace the action title lookup.
    pub fn set_action_titles(&self, titles: Option<Arc<dyn ActionTitles>>) {
        *self.inner.action_titles.write() = titles;
    }

    /// Replace the revoicing policy.
    pub fn set_revoicing_policy(&self, policy: Arc<dyn RevoicingPolicy>) {
        *self.inner.revoicing.write() = policy;
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Id of the application root item.
    pub fn root_id(&self) -> ItemId {
        self.inner.root.base.id()
    }

    /// Register `item`. Problems are logged, never returned.
    pub fn register(&self, item: Arc<dyn AccessibleItem>) {
        if let Err(err) = self.try_register(item) {
            match err {
                Error::AlreadyRegistered(_) | Error::Disabled => {
                    tracing::warn!(target: targets::REGISTRY, %err, "register ignored")
                }
                _ => tracing::debug!(target: targets::REGISTRY, %err, "register ignored"),
            }
        }
    }

    /// Register `item`, reporting why it was not registered.
    ///
    /// The controller keeps only a weak reference; the caller must
    /// unregister the item before dropping it.
    pub fn try_register(&self, item: Arc<dyn AccessibleItem>) -> Result<ItemHandle> {
        if !self.is_enabled() {
            return Err(Error::Disabled);
        }
        self.inner.ensure_initialized();
        self.inner.insert(item)
    }

    /// Unregister the item with `id`. Unknown ids are ignored.
    pub fn unregister(&self, id: ItemId) {
        if let Err(err) = self.try_unregister(id) {
            tracing::debug!(target: targets::REGISTRY, %err, "unregister ignored");
        }
    }

    /// Unregister the item with `id`, reporting whether it was registered.
    ///
    /// The root item is only removed by [`shutdown`](Self::shutdown).
    pub fn try_unregister(&self, id: ItemId) -> Result<()> {
        if id == self.root_id() {
            tracing::warn!(target: targets::REGISTRY, "the root item is removed by shutdown only");
            return Ok(());
        }
        self.inner.remove(id)
    }

    pub(crate) fn root_item(&self) -> Arc<dyn AccessibleItem> {
        self.inner.root.clone()
    }

    /// Whether `id` is registered.
    pub fn is_registered(&self, id: ItemId) -> bool {
        self.inner.registry.contains(id)
    }

    /// The live item registered under `id`.
    pub fn item(&self, id: ItemId) -> Option<Arc<dyn AccessibleItem>> {
        self.inner.registry.resolve(id)
    }

    /// The query handle of `id`.
    pub fn handle(&self, id: ItemId) -> Option<ItemHandle> {
        self.inner.registry.handle(id)
    }

    /// The registry.
    pub fn registry(&self) -> &ItemRegistry {
        &self.inner.registry
    }

    /// Tree queries over the registry.
    pub fn navigator(&self) -> TreeNavigator<'_> {
        TreeNavigator::new(&self.inner.registry)
    }

    /// Unregister every item, root last, and disable the bridge.
    pub fn shutdown(&self) {
        tracing::debug!(target: targets::CONTROLLER, "shutting down");
        self.inner.focus.cancel_pretend_focus();
        self.inner.speech.lock().stop();

        let root = self.root_id();
        let mut ids = self.inner.registry.ids();
        // Newest first.
        ids.sort_unstable_by(|a, b| b.cmp(a));
        for id in ids.into_iter().filter(|&id| id != root) {
            let _ = self.inner.remove(id);
        }
        if self.inner.initialized.swap(false, Ordering::AcqRel) {
            let _ = self.inner.remove(root);
        }
        self.inner.enabled.store(false, Ordering::Release);
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// The event stream sent to platform adapters and other subscribers.
    pub fn event_sent(&self) -> &Signal<AccessEvent> {
        self.inner.bus.signal()
    }

    /// The event bus.
    pub fn event_bus(&self) -> &EventBus {
        &self.inner.bus
    }

    /// Emitted after the last focused item changed.
    pub fn focus_changed(&self) -> &Signal<FocusChange> {
        self.inner.focus.focus_changed()
    }

    // =========================================================================
    // Focus
    // =========================================================================

    /// The last focused item.
    pub fn last_focused(&self) -> Option<ItemId> {
        self.inner.focus.last_focused()
    }

    /// Move focus to `id`. Unusable items are ignored.
    pub fn set_focus(&self, id: ItemId) {
        if let Err(err) = self.try_set_focus(id) {
            tracing::debug!(target: targets::FOCUS, %err, "focus ignored");
        }
    }

    /// Move focus to `id`, reporting whether it could take focus.
    pub fn try_set_focus(&self, id: ItemId) -> Result<()> {
        self.inner.focus.set_focus(&self.inner.registry, id).map(|_| ())
    }

    /// Provisionally focus `id`; it becomes real if no other request
    /// arrives within the debounce window.
    pub fn request_pretend_focus(&self, id: ItemId) {
        self.inner.focus.request_pretend_focus(id);
    }

    /// [`request_pretend_focus`](Self::request_pretend_focus) with an explicit clock.
    pub fn request_pretend_focus_at(&self, id: ItemId, now: Instant) {
        self.inner.focus.request_pretend_focus_at(id, now);
    }

    /// The pending provisional focus.
    pub fn pretend_focus(&self) -> Option<ItemId> {
        self.inner.focus.pretend_focus()
    }

    /// Run due timers. Call when [`time_until_next_timer`](Self::time_until_next_timer)
    /// elapses.
    pub fn process_timers(&self) -> Option<Promotion> {
        self.process_timers_at(Instant::now())
    }

    /// Run timers due at `now`.
    pub fn process_timers_at(&self, now: Instant) -> Option<Promotion> {
        self.inner.focus.process_timers_at(&self.inner.registry, now)
    }

    /// How long the host may sleep before timers need processing.
    pub fn time_until_next_timer(&self) -> Option<Duration> {
        self.inner.focus.time_until_next_timer_at(Instant::now())
    }

    /// Whether the focused item's name should carry its panel's name.
    pub fn need_to_voice_panel_info(&self) -> bool {
        self.inner.config.voice_panel_info && self.inner.panel.lock().need_to_voice
    }

    /// Name of the panel enclosing the focused item, empty if none.
    pub fn current_panel_accessible_name(&self) -> String {
        self.last_focused()
            .and_then(|id| self.navigator().nearest_ancestor_with_role(id, Role::Panel))
            .and_then(|panel| self.inner.registry.resolve(panel.id()))
            .map(|panel| panel.accessible_name())
            .unwrap_or_default()
    }

    // =========================================================================
    // Announcements
    // =========================================================================

    /// Announce `text` through the focused item.
    ///
    /// The text overrides the focused item's name until focus moves or an
    /// empty announcement clears it. Without a focused item it is only stored.
    pub fn announce(&self, text: &str) {
        let focused = self.last_focused();
        let outcome = self.inner.announcer.lock().announce(text, focused);
        if let AnnounceOutcome::Voice(id) = outcome {
            self.inner.send_for_focused(id, EventKind::NameChanged);
        }
    }

    /// The current announcement, empty when none.
    pub fn announcement(&self) -> String {
        self.inner.announcer.lock().announcement().to_string()
    }

    /// The announcement overriding the name of `id`, if any.
    pub fn announcement_override_for(&self, id: ItemId) -> Option<String> {
        let focused = self.last_focused();
        self.inner
            .announcer
            .lock()
            .override_for(id, focused)
            .map(str::to_string)
    }

    /// Run a user action, announcing its title afterwards if it changed
    /// neither focus nor the focused item's name and announced nothing.
    pub fn dispatch_action<R>(&self, action: &str, run: impl FnOnce() -> R) -> R {
        let before = self.inner.focus_snapshot();
        self.inner.announcer.lock().begin_dispatch(before);

        let mut guard = DispatchGuard {
            inner: &self.inner,
            armed: true,
        };
        let result = run();
        guard.armed = false;

        let after = self.inner.focus_snapshot();
        let announce_title = self.inner.announcer.lock().end_dispatch(&after);
        if announce_title {
            let titles = self.inner.action_titles.read().clone();
            match titles.and_then(|titles| titles.title(action)) {
                Some(title) if !title.is_empty() => self.announce(&title),
                _ => {
                    tracing::trace!(target: targets::ANNOUNCE, action, "no title to announce")
                }
            }
        }
        result
    }

    // =========================================================================
    // Speech repeat
    // =========================================================================

    /// The spoken description of the focused item.
    pub fn current_description(&self) -> String {
        let focused = self.last_focused().and_then(|id| self.inner.registry.resolve(id));
        speech::describe(focused.as_deref())
    }

    /// Speak the focused item's description, cutting off current speech.
    pub fn repeat_current_element_info(&self) -> RepeatOutcome {
        let text = self.current_description();
        self.inner.speech.lock().speak(&text)
    }

    /// Offer a key event to the repeat hotkey. Returns whether the event
    /// should be hidden from other handlers.
    pub fn handle_key_input(&self, input: &KeyInput) -> bool {
        let filter = self.inner.hotkey.read().clone();
        filter
            .filter(input, || {
                self.repeat_current_element_info();
            })
            .is_consumed()
    }

    /// Current hotkey settings.
    pub fn repeat_hotkey(&self) -> RepeatHotkeyConfig {
        self.inner.hotkey.read().config()
    }

    /// Replace the hotkey settings.
    pub fn set_repeat_hotkey(&self, config: RepeatHotkeyConfig) {
        self.inner.hotkey.write().set_config(config);
    }
}

/// Pops the pending dispatch if the action unwinds.
struct DispatchGuard<'a> {
    inner: &'a Inner,
    armed: bool,
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.inner.announcer.lock().abandon_dispatch();
        }
    }
}

impl Default for AccessibilityController {
    fn default() -> Self {
        Self::new(AccessibilityConfig::default())
    }
}

impl std::fmt::Debug for AccessibilityController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessibilityController")
            .field("root", &self.root_id())
            .field("enabled", &self.is_enabled())
            .field("platform", &self.inner.platform)
            .field("items", &self.inner.registry.len())
            .field("last_focused", &self.last_focused())
            .finish()
    }
}

impl Inner {
    fn ensure_initialized(self: &Arc<Self>) {
        if self.initialized.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::debug!(target: targets::CONTROLLER, "registering application root");
        let root: Arc<dyn AccessibleItem> = self.root.clone();
        if let Err(err) = self.insert(root) {
            tracing::error!(target: targets::CONTROLLER, %err, "failed to register root");
        }
    }

    #[tracing::instrument(skip_all, target = "horizon_a11y::registry", level = "trace")]
    fn insert(self: &Arc<Self>, item: Arc<dyn AccessibleItem>) -> Result<ItemHandle> {
        let id = item.accessible_id();
        let handle = self.registry.insert(ItemRecord::new(&item))?;
        tracing::debug!(target: targets::REGISTRY, %id, name = %item.accessible_name(), "item registered");

        let channels = item.accessible_base().channels();
        let weak = Arc::downgrade(self);
        let property = channels.property_changed().connect(move |args| {
            if let Some(inner) = weak.upgrade() {
                let (kind, value) = args;
                inner.on_property_changed(id, *kind, value);
            }
        });
        let weak: Weak<Self> = Arc::downgrade(self);
        let state = channels.state_changed().connect(move |&(state, value)| {
            if let Some(inner) = weak.upgrade() {
                inner.on_state_changed(id, state, value);
            }
        });
        self.registry
            .set_subscriptions(id, Subscriptions { property, state });

        if id != self.root.base.id() && item.accessible_parent() == Some(self.root.base.id()) {
            self.root.children.write().push(id);
        }

        self.bus.send(AccessEvent::new(handle.clone(), EventKind::Created));
        Ok(handle)
    }

    #[tracing::instrument(skip(self), target = "horizon_a11y::registry", level = "trace")]
    fn remove(&self, id: ItemId) -> Result<()> {
        let handle = self
            .registry
            .begin_removal(id)
            .ok_or(Error::NotRegistered(id))?;
        tracing::debug!(target: targets::REGISTRY, %id, "item unregistered");

        self.focus.forget(id);
        {
            let mut panel = self.panel.lock();
            if panel.current == Some(id) {
                *panel = PanelState::default();
            }
        }
        self.root.children.write().retain(|&child| child != id);

        // The record still resolves while subscribers see the event.
        self.bus.send(AccessEvent::new(handle, EventKind::Destroyed));
        if let Some(record) = self.registry.take(id) {
            record.release();
        }
        Ok(())
    }

    fn on_property_changed(&self, id: ItemId, kind: PropertyKind, value: &Value) {
        let Some(handle) = self.registry.handle(id).filter(ItemHandle::is_valid) else {
            return;
        };
        let Some(event) = self.event_table.event_for(kind, value) else {
            tracing::debug!(target: targets::EVENTS, %id, ?kind, ?value, "property payload does not match kind");
            return;
        };

        if kind == PropertyKind::Parent {
            self.sync_root_child(id);
        }

        if event == EventKind::NameChanged && self.focus.last_focused() == Some(id) {
            self.send_for_focused(id, event);
        } else {
            self.bus.send(AccessEvent::new(handle, event));
        }
    }

    fn on_state_changed(&self, id: ItemId, state: State, value: bool) {
        let Some(handle) = self.registry.handle(id).filter(ItemHandle::is_valid) else {
            return;
        };
        if state == State::Focused && value {
            if let Err(err) = self.focus.set_focus(&self.registry, id) {
                tracing::debug!(target: targets::FOCUS, %err, "focused state on unusable item");
            }
        }
        self.bus
            .send(AccessEvent::new(handle, EventKind::StateChanged { state, value }));
    }

    fn on_focus_changed(&self, change: FocusChange) {
        self.announcer.lock().clear();

        let navigator = TreeNavigator::new(&self.registry);
        let panel = change
            .current
            .and_then(|id| navigator.nearest_ancestor_with_role(id, Role::Panel))
            .map(|handle| handle.id());

        let mut state = self.panel.lock();
        state.need_to_voice = change.current.is_some() && panel != state.current;
        state.current = panel;
    }

    /// Send a name-class event for the focused item, substituting a full
    /// re-read when the revoicing policy asks for one.
    fn send_for_focused(&self, id: ItemId, event: EventKind) {
        let (Some(handle), Some(item)) = (self.registry.handle(id), self.registry.resolve(id)) else {
            return;
        };
        let policy = self.revoicing.read().clone();
        let event = if policy.needs_revoicing(item.as_ref(), &event) {
            tracing::trace!(target: targets::ANNOUNCE, %id, "revoicing");
            EventKind::Revoiced
        } else {
            event
        };
        self.bus.send(AccessEvent::new(handle, event));
    }

    fn sync_root_child(&self, id: ItemId) {
        let Some(item) = self.registry.resolve(id) else {
            return;
        };
        let root = self.root.base.id();
        let mut children = self.root.children.write();
        let listed = children.contains(&id);
        match (item.accessible_parent() == Some(root), listed) {
            (true, false) => children.push(id),
            (false, true) => children.retain(|&child| child != id),
            _ => {}
        }
    }

    fn focus_snapshot(&self) -> FocusSnapshot {
        let focus = self.focus.last_focused();
        let name = focus
            .and_then(|id| self.registry.resolve(id))
            .map(|item| item.accessible_name());
        FocusSnapshot { focus, name }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Leaf {
        base: AccessibleBase,
        parent: RwLock<Option<ItemId>>,
        children: RwLock<Vec<ItemId>>,
        role: Role,
        name: RwLock<String>,
    }

    impl Leaf {
        fn new(parent: Option<ItemId>, role: Role, name: &str) -> Arc<Self> {
            Arc::new(Self {
                base: AccessibleBase::new(),
                parent: RwLock::new(parent),
                children: RwLock::new(Vec::new()),
                role,
                name: RwLock::new(name.to_string()),
            })
        }

        fn reparent(&self, parent: ItemId) {
            *self.parent.write() = Some(parent);
            self.base.notify_property(PropertyKind::Parent, Value::None);
        }
    }

    impl AccessibleItem for Leaf {
        fn accessible_base(&self) -> &AccessibleBase {
            &self.base
        }

        fn accessible_parent(&self) -> Option<ItemId> {
            *self.parent.read()
        }

        fn accessible_child_count(&self) -> usize {
            self.children.read().len()
        }

        fn accessible_child(&self, index: usize) -> Option<ItemId> {
            self.children.read().get(index).copied()
        }

        fn accessible_role(&self) -> Role {
            self.role
        }

        fn accessible_name(&self) -> String {
            self.name.read().clone()
        }
    }

    fn collect(controller: &AccessibilityController) -> Arc<Mutex<Vec<(ItemId, EventKind)>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        controller
            .event_sent()
            .connect(move |event| sink.lock().push((event.target.id(), event.kind.clone())));
        events
    }

    #[test]
    fn test_lazy_root_registration() {
        let controller = AccessibilityController::default();
        let events = collect(&controller);
        assert!(!controller.is_registered(controller.root_id()));

        let leaf = Leaf::new(Some(controller.root_id()), Role::Button, "Play");
        controller.register(leaf.clone());

        assert!(controller.is_registered(controller.root_id()));
        assert_eq!(
            *events.lock(),
            vec![
                (controller.root_id(), EventKind::Created),
                (leaf.accessible_id(), EventKind::Created)
            ]
        );
        let root = controller.item(controller.root_id()).unwrap();
        assert_eq!(root.accessible_child_count(), 1);
        assert_eq!(root.accessible_role(), Role::Application);
        assert!(root.accessible_state(State::Active));
    }

    #[test]
    fn test_disabled_controller_registers_nothing() {
        let controller = AccessibilityController::new(AccessibilityConfig {
            enabled: false,
            ..Default::default()
        });
        let events = collect(&controller);
        let leaf = Leaf::new(Some(controller.root_id()), Role::Button, "Play");

        assert!(matches!(controller.try_register(leaf.clone()), Err(Error::Disabled)));
        assert!(controller.registry().is_empty());
        assert!(events.lock().is_empty());
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_register_while_disabled_warns() {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let controller = AccessibilityController::new(AccessibilityConfig {
                enabled: false,
                ..Default::default()
            });
            let leaf = Leaf::new(Some(controller.root_id()), Role::Button, "Play");
            controller.register(leaf.clone());
        });

        let logged = String::from_utf8_lossy(&buffer.0.lock()).into_owned();
        assert!(logged.contains("WARN"));
        assert!(logged.contains("register ignored"));
    }

    #[test]
    fn test_unregister_is_idempotent_and_keeps_root() {
        let controller = AccessibilityController::default();
        let leaf = Leaf::new(Some(controller.root_id()), Role::Button, "Play");
        controller.register(leaf.clone());

        controller.unregister(leaf.accessible_id());
        assert!(matches!(
            controller.try_unregister(leaf.accessible_id()),
            Err(Error::NotRegistered(_))
        ));
        controller.unregister(controller.root_id());
        assert!(controller.is_registered(controller.root_id()));
        assert_eq!(
            controller
                .item(controller.root_id())
                .unwrap()
                .accessible_child_count(),
            0
        );
    }

    #[test]
    fn test_item_resolves_during_destroyed_delivery() {
        let controller = AccessibilityController::default();
        let leaf = Leaf::new(Some(controller.root_id()), Role::Button, "Play");
        let id = leaf.accessible_id();
        controller.register(leaf.clone());
        controller.set_focus(id);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let observer = controller.clone();
        let connection = controller.event_sent().connect(move |event| {
            if event.kind == EventKind::Destroyed {
                sink.lock().push((
                    event.target.is_valid(),
                    observer.item(id).map(|item| item.accessible_name()),
                    observer.query(id).is_some(),
                    observer.last_focused(),
                ));
            }
        });

        controller.unregister(id);
        controller.event_sent().disconnect(connection);

        assert_eq!(*seen.lock(), vec![(true, Some("Play".to_string()), true, None)]);
        assert!(controller.item(id).is_none());
        assert!(!controller.is_registered(id));
    }

    #[test]
    fn test_unregister_from_destroyed_subscriber_is_ignored() {
        let controller = AccessibilityController::default();
        let leaf = Leaf::new(Some(controller.root_id()), Role::Button, "Play");
        let id = leaf.accessible_id();
        controller.register(leaf.clone());
        let events = collect(&controller);

        let observer = controller.clone();
        let connection = controller.event_sent().connect(move |event| {
            if event.kind == EventKind::Destroyed {
                observer.unregister(event.target.id());
                observer.set_focus(event.target.id());
            }
        });
        controller.unregister(id);
        controller.event_sent().disconnect(connection);

        assert_eq!(*events.lock(), vec![(id, EventKind::Destroyed)]);
        assert_eq!(controller.last_focused(), None);
    }

    #[test]
    fn test_reparenting_follows_declared_parent() {
        let controller = AccessibilityController::default();
        let root = controller.root_id();
        let panel = Leaf::new(Some(root), Role::Panel, "Mixer");
        let fader = Leaf::new(Some(panel.accessible_id()), Role::Range, "Fader");
        panel.children.write().push(fader.accessible_id());
        controller.register(panel.clone());
        controller.register(fader.clone());
        let events = collect(&controller);
        let root_children = || controller.query(root).unwrap().children();
        let node_children = |id: ItemId| {
            let update = controller.build_tree_update();
            update
                .nodes
                .iter()
                .find(|(node, _)| *node == crate::adapter::item_id_to_node_id(id))
                .map(|(_, node)| node.children().to_vec())
                .unwrap_or_default()
        };
        assert_eq!(root_children(), vec![panel.accessible_id()]);

        panel.children.write().clear();
        fader.reparent(root);
        assert_eq!(root_children(), vec![panel.accessible_id(), fader.accessible_id()]);
        assert_eq!(
            node_children(root),
            vec![
                crate::adapter::item_id_to_node_id(panel.accessible_id()),
                crate::adapter::item_id_to_node_id(fader.accessible_id())
            ]
        );
        assert!(node_children(panel.accessible_id()).is_empty());

        panel.children.write().push(fader.accessible_id());
        fader.reparent(panel.accessible_id());
        assert_eq!(root_children(), vec![panel.accessible_id()]);
        assert_eq!(
            node_children(panel.accessible_id()),
            vec![crate::adapter::item_id_to_node_id(fader.accessible_id())]
        );

        assert_eq!(
            *events.lock(),
            vec![
                (fader.accessible_id(), EventKind::ParentChanged),
                (fader.accessible_id(), EventKind::ParentChanged)
            ]
        );
    }

    #[test]
    fn test_property_change_is_forwarded() {
        let controller = AccessibilityController::new(AccessibilityConfig {
            platform: Some(Platform::Windows),
            ..Default::default()
        });
        let leaf = Leaf::new(Some(controller.root_id()), Role::Button, "Play");
        controller.register(leaf.clone());
        let events = collect(&controller);

        leaf.base.notify_property(PropertyKind::Description, "Starts playback");
        leaf.base.notify_property(PropertyKind::Value, 3_i64);

        assert_eq!(
            *events.lock(),
            vec![
                (leaf.accessible_id(), EventKind::AcceleratorChanged),
                (leaf.accessible_id(), EventKind::ValueChanged)
            ]
        );
    }

    #[test]
    fn test_focus_change_clears_announcement() {
        let controller = AccessibilityController::default();
        let a = Leaf::new(Some(controller.root_id()), Role::Button, "A");
        let b = Leaf::new(Some(controller.root_id()), Role::Button, "B");
        controller.register(a.clone());
        controller.register(b.clone());

        controller.set_focus(a.accessible_id());
        controller.announce("Saved");
        assert_eq!(
            controller.announcement_override_for(a.accessible_id()).as_deref(),
            Some("Saved")
        );

        controller.set_focus(b.accessible_id());
        assert_eq!(controller.announcement(), "");
        assert_eq!(controller.announcement_override_for(b.accessible_id()), None);
    }

    #[test]
    fn test_revoicing_policy_substitutes_event() {
        let controller = AccessibilityController::builder()
            .revoicing_policy(|_: &dyn AccessibleItem, _: &EventKind| true)
            .build();
        let leaf = Leaf::new(Some(controller.root_id()), Role::ElementOnScore, "C4");
        controller.register(leaf.clone());
        controller.set_focus(leaf.accessible_id());
        let events = collect(&controller);

        controller.announce("Tie added");
        *leaf.name.write() = "C4 tied".into();
        leaf.base.notify_property(PropertyKind::Name, "C4 tied");

        assert_eq!(
            *events.lock(),
            vec![
                (leaf.accessible_id(), EventKind::Revoiced),
                (leaf.accessible_id(), EventKind::Revoiced)
            ]
        );
    }

    #[test]
    fn test_dispatch_action_announces_title() {
        let titles: std::collections::HashMap<String, String> =
            [("toggle-metronome".to_string(), "Metronome".to_string())].into();
        let controller = AccessibilityController::builder()
            .action_titles(titles)
            .build();
        let leaf = Leaf::new(Some(controller.root_id()), Role::Button, "Play");
        controller.register(leaf.clone());
        controller.set_focus(leaf.accessible_id());

        let value = controller.dispatch_action("toggle-metronome", || 42);
        assert_eq!(value, 42);
        assert_eq!(controller.announcement(), "Metronome");

        controller.announce("");
        controller.dispatch_action("toggle-metronome", || {
            *leaf.name.write() = "Pause".into();
        });
        assert_eq!(controller.announcement(), "");
    }

    #[test]
    fn test_unwinding_action_leaves_no_pending_dispatch() {
        let titles: std::collections::HashMap<String, String> =
            [("add-tie".to_string(), "Tie".to_string())].into();
        let controller = AccessibilityController::builder()
            .action_titles(titles)
            .build();
        let leaf = Leaf::new(Some(controller.root_id()), Role::Button, "Note");
        controller.register(leaf.clone());
        controller.set_focus(leaf.accessible_id());

        controller.dispatch_action("add-tie", || {
            let nested: std::thread::Result<()> = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                controller.dispatch_action("add-slur", || panic!("action failed"))
            }));
            assert!(nested.is_err());
            assert_eq!(controller.inner.announcer.lock().dispatch_depth(), 1);
        });

        assert_eq!(controller.inner.announcer.lock().dispatch_depth(), 0);
        assert_eq!(controller.announcement(), "Tie");
    }

    #[test]
    fn test_panel_voicing() {
        let controller = AccessibilityController::default();
        let panel = Leaf::new(Some(controller.root_id()), Role::Panel, "Palettes");
        let first = Leaf::new(Some(panel.accessible_id()), Role::Button, "Clefs");
        let second = Leaf::new(Some(panel.accessible_id()), Role::Button, "Keys");
        for item in [&panel, &first, &second] {
            controller.register(item.clone());
        }

        controller.set_focus(first.accessible_id());
        assert!(controller.need_to_voice_panel_info());
        assert_eq!(controller.current_panel_accessible_name(), "Palettes");

        controller.set_focus(second.accessible_id());
        assert!(!controller.need_to_voice_panel_info());
    }

    #[test]
    fn test_shutdown_unregisters_everything() {
        let controller = AccessibilityController::default();
        let leaf = Leaf::new(Some(controller.root_id()), Role::Button, "Play");
        controller.register(leaf.clone());
        let events = collect(&controller);

        controller.shutdown();
        assert!(controller.registry().is_empty());
        assert_eq!(
            *events.lock(),
            vec![
                (leaf.accessible_id(), EventKind::Destroyed),
                (controller.root_id(), EventKind::Destroyed)
            ]
        );
        assert!(!controller.is_enabled());
    }
}
