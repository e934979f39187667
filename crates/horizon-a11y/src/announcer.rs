//! Announcement decisions.
//!
//! The [`Announcer`] owns the current announcement text and the snapshots
//! taken around action dispatch. It only decides; the controller turns its
//! answers into events.
//!
//! An announcement overrides the focused item's Name text until focus moves
//! or an empty announcement clears it. Around each user action the controller
//! snapshots the focused item and its name. If after the action focus and
//! name are unchanged and nothing was announced meanwhile, the action's title
//! is announced instead, so toggles that move nothing still get spoken
//! confirmation.

use std::collections::HashMap;

use horizon_a11y_core::logging::targets;

use crate::event::EventKind;
use crate::item::{AccessibleItem, ItemId};

/// Decides whether a change to the focused item should re-read the whole
/// element rather than the changed property.
pub trait RevoicingPolicy: Send + Sync {
    /// Whether `event` on `item` needs a full re-read.
    fn needs_revoicing(&self, item: &dyn AccessibleItem, event: &EventKind) -> bool {
        let _ = (item, event);
        false
    }
}

/// The default policy: never revoice.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverRevoice;

impl RevoicingPolicy for NeverRevoice {}

impl<F> RevoicingPolicy for F
where
    F: Fn(&dyn AccessibleItem, &EventKind) -> bool + Send + Sync,
{
    fn needs_revoicing(&self, item: &dyn AccessibleItem, event: &EventKind) -> bool {
        self(item, event)
    }
}

/// Display titles of user actions.
pub trait ActionTitles: Send + Sync {
    /// The title of `action`, if it has one.
    fn title(&self, action: &str) -> Option<String>;
}

impl ActionTitles for HashMap<String, String> {
    fn title(&self, action: &str) -> Option<String> {
        self.get(action).cloned()
    }
}

/// What the controller should do after [`Announcer::announce`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnounceOutcome {
    /// The announcement was empty; state is cleared and nothing is voiced.
    Cleared,
    /// Nothing is focused; the text is stored but nothing is voiced.
    Stored,
    /// The focused item should be voiced again.
    Voice(ItemId),
}

/// Focus and name of the focused item at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FocusSnapshot {
    /// The focused item.
    pub focus: Option<ItemId>,
    /// Its name at the time.
    pub name: Option<String>,
}

#[derive(Debug)]
struct PendingDispatch {
    before: FocusSnapshot,
    announcements: u64,
}

/// Announcement state.
#[derive(Debug, Default)]
pub struct Announcer {
    text: String,
    /// Count of non-empty announcements made so far.
    announcements: u64,
    dispatches: Vec<PendingDispatch>,
}

impl Announcer {
    /// Create an idle announcer.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current announcement, empty when idle.
    pub fn announcement(&self) -> &str {
        &self.text
    }

    /// Set the announcement.
    pub fn announce(&mut self, text: &str, focused: Option<ItemId>) -> AnnounceOutcome {
        self.text = text.to_string();
        if text.is_empty() {
            tracing::trace!(target: targets::ANNOUNCE, "announcement cleared");
            return AnnounceOutcome::Cleared;
        }
        self.announcements += 1;

        match focused {
            Some(id) => {
                tracing::debug!(target: targets::ANNOUNCE, %id, text, "announcing");
                AnnounceOutcome::Voice(id)
            }
            None => {
                tracing::debug!(target: targets::ANNOUNCE, text, "nothing focused, announcement stored");
                AnnounceOutcome::Stored
            }
        }
    }

    /// Drop the announcement without counting as one.
    pub fn clear(&mut self) {
        if !self.text.is_empty() {
            tracing::trace!(target: targets::ANNOUNCE, "announcement cleared by focus change");
            self.text.clear();
        }
    }

    /// The text overriding the Name of `id`, if any.
    ///
    /// Only the focused item is overridden.
    pub fn override_for(&self, id: ItemId, focused: Option<ItemId>) -> Option<&str> {
        (focused == Some(id) && !self.text.is_empty()).then_some(self.text.as_str())
    }

    /// Whether an override is active for `id`.
    pub fn overrides(&self, id: ItemId, focused: Option<ItemId>) -> bool {
        self.override_for(id, focused).is_some()
    }

    /// Record the state before an action runs. Dispatches may nest.
    pub fn begin_dispatch(&mut self, before: FocusSnapshot) {
        self.dispatches.push(PendingDispatch {
            before,
            announcements: self.announcements,
        });
    }

    /// Finish the innermost dispatch.
    ///
    /// Returns whether the action's title should be announced.
    pub fn end_dispatch(&mut self, after: &FocusSnapshot) -> bool {
        let Some(pending) = self.dispatches.pop() else {
            tracing::warn!(target: targets::ANNOUNCE, "end_dispatch without begin_dispatch");
            return false;
        };
        pending.before.focus.is_some()
            && pending.before == *after
            && pending.announcements == self.announcements
    }

    /// Drop the innermost dispatch without evaluating it, for an action
    /// that did not complete.
    pub fn abandon_dispatch(&mut self) {
        if self.dispatches.pop().is_some() {
            tracing::debug!(target: targets::ANNOUNCE, "dispatch abandoned");
        }
    }

    /// Number of dispatches in progress.
    pub fn dispatch_depth(&self) -> usize {
        self.dispatches.len()
    }
}
