//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use horizon_a11y::{
    AccessEvent, AccessibilityController, AccessibleBase, AccessibleItem, EventKind, ItemId,
    PropertyKind, Role, SpeechSink, SpeechState,
};
use parking_lot::{Mutex, RwLock};

/// Install a test subscriber so `RUST_LOG` works while debugging tests.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A configurable content item.
pub struct TestItem {
    base: AccessibleBase,
    parent: ItemId,
    role: Role,
    name: RwLock<String>,
    screen_reader_info: String,
    extra_info: String,
    children: RwLock<Vec<ItemId>>,
}

impl TestItem {
    pub fn new(parent: ItemId, role: Role, name: &str) -> Arc<Self> {
        Self::with_info(parent, role, name, "", "")
    }

    pub fn with_info(parent: ItemId, role: Role, name: &str, info: &str, extra: &str) -> Arc<Self> {
        Arc::new(Self {
            base: AccessibleBase::new(),
            parent,
            role,
            name: RwLock::new(name.to_string()),
            screen_reader_info: info.to_string(),
            extra_info: extra.to_string(),
            children: RwLock::new(Vec::new()),
        })
    }

    pub fn add_child(&self, child: ItemId) {
        self.children.write().push(child);
    }

    pub fn rename(&self, name: &str) {
        *self.name.write() = name.to_string();
        self.base.notify_property(PropertyKind::Name, name);
    }
}

impl AccessibleItem for TestItem {
    fn accessible_base(&self) -> &AccessibleBase {
        &self.base
    }

    fn accessible_parent(&self) -> Option<ItemId> {
        Some(self.parent)
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

    fn accessible_screen_reader_info(&self) -> String {
        self.screen_reader_info.clone()
    }

    fn accessible_extra_info(&self) -> String {
        self.extra_info.clone()
    }
}

/// Calls made on a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    Stop,
    Say(String),
}

/// A speech sink that records what it was asked to do.
#[derive(Clone)]
pub struct RecordingSink {
    pub calls: Arc<Mutex<Vec<SinkCall>>>,
    pub state: Arc<Mutex<SpeechState>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            state: Arc::new(Mutex::new(SpeechState::Ready)),
        }
    }

    pub fn spoken(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                SinkCall::Say(text) => Some(text.clone()),
                SinkCall::Stop => None,
            })
            .collect()
    }
}

impl SpeechSink for RecordingSink {
    fn state(&self) -> SpeechState {
        *self.state.lock()
    }

    fn stop(&mut self) {
        self.calls.lock().push(SinkCall::Stop);
        *self.state.lock() = SpeechState::Ready;
    }

    fn say(&mut self, text: &str) {
        self.calls.lock().push(SinkCall::Say(text.to_string()));
        *self.state.lock() = SpeechState::Speaking;
    }
}

/// Collects every event the controller sends.
pub struct EventLog {
    events: Arc<Mutex<Vec<AccessEvent>>>,
}

impl EventLog {
    pub fn attach(controller: &AccessibilityController) -> Self {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        controller
            .event_sent()
            .connect(move |event| sink.lock().push(event.clone()));
        Self { events }
    }

    pub fn events(&self) -> Vec<AccessEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self, id: ItemId, kind: &EventKind) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| event.target.id() == id && &event.kind == kind)
            .count()
    }

    pub fn count_kind(&self, kind: &EventKind) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| &event.kind == kind)
            .count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}
