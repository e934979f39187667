//! Focus tracking.
//!
//! [`FocusTracker`] holds the last focused item and at most one pending
//! "pretend" focus. A pretend focus is a provisional target that only becomes
//! real after a short debounce window passes without another request, which
//! keeps transient focus bounces during UI churn from reaching assistive
//! technology.
//!
//! Both references are plain [`ItemId`]s resolved through the registry, so
//! they never keep an item alive. [`FocusTracker::forget`] drops them when
//! the item is unregistered.

use std::time::{Duration, Instant};

use horizon_a11y_core::logging::targets;
use horizon_a11y_core::{Signal, TimerId, TimerManager};
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::item::ItemId;
use crate::registry::ItemRegistry;

/// Default debounce window for pretend focus.
pub const DEFAULT_PRETEND_FOCUS_DELAY: Duration = Duration::from_millis(80);

/// A change of the last focused item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusChange {
    /// The item that held focus before.
    pub previous: Option<ItemId>,
    /// The item holding focus now.
    pub current: Option<ItemId>,
}

/// What happened to a pending pretend focus when its timer expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Promotion {
    /// The item became the real focus.
    Promoted(ItemId),
    /// The item was gone or ignored and was dropped.
    Dropped(ItemId),
}

impl Promotion {
    /// The item the promotion was attempted for.
    pub fn target(self) -> ItemId {
        match self {
            Promotion::Promoted(id) | Promotion::Dropped(id) => id,
        }
    }
}

#[derive(Debug)]
struct PendingFocus {
    id: ItemId,
    timer: TimerId,
}

#[derive(Debug)]
struct FocusState {
    last_focused: Option<ItemId>,
    pending: Option<PendingFocus>,
    timers: TimerManager,
    delay: Duration,
}

/// The single writer of focus state.
pub struct FocusTracker {
    state: Mutex<FocusState>,
    focus_changed: Signal<FocusChange>,
}

impl FocusTracker {
    /// Create a tracker with the given pretend-focus debounce window.
    pub fn new(delay: Duration) -> Self {
        Self {
            state: Mutex::new(FocusState {
                last_focused: None,
                pending: None,
                timers: TimerManager::new(),
                delay,
            }),
            focus_changed: Signal::new(),
        }
    }

    /// Emitted after the last focused item changed.
    pub fn focus_changed(&self) -> &Signal<FocusChange> {
        &self.focus_changed
    }

    /// The last focused item.
    pub fn last_focused(&self) -> Option<ItemId> {
        self.state.lock().last_focused
    }

    /// The pending pretend focus, if any.
    pub fn pretend_focus(&self) -> Option<ItemId> {
        self.state.lock().pending.as_ref().map(|p| p.id)
    }

    /// The debounce window.
    pub fn delay(&self) -> Duration {
        self.state.lock().delay
    }

    /// Change the debounce window for subsequent requests.
    pub fn set_delay(&self, delay: Duration) {
        self.state.lock().delay = delay;
    }

    /// Make `id` the last focused item.
    ///
    /// Fails with [`Error::Unusable`] if the item is not a valid, non-ignored
    /// registered item. Returns the change, or `None` if `id` already held
    /// focus.
    pub fn set_focus(&self, registry: &ItemRegistry, id: ItemId) -> Result<Option<FocusChange>> {
        if !registry.is_usable(id) {
            tracing::debug!(target: targets::FOCUS, %id, "focus rejected, item unusable");
            return Err(Error::Unusable(id));
        }

        let change = {
            let mut state = self.state.lock();
            if state.last_focused == Some(id) {
                return Ok(None);
            }
            let previous = state.last_focused.replace(id);
            FocusChange {
                previous,
                current: Some(id),
            }
        };

        tracing::debug!(target: targets::FOCUS, previous = ?change.previous, current = %id, "focus changed");
        self.focus_changed.emit(change);
        Ok(Some(change))
    }

    /// Request a provisional focus on `id`, debounced from now.
    pub fn request_pretend_focus(&self, id: ItemId) {
        self.request_pretend_focus_at(id, Instant::now());
    }

    /// Request a provisional focus on `id`, debounced from `now`.
    ///
    /// A pending request is replaced and its timer restarted.
    pub fn request_pretend_focus_at(&self, id: ItemId, now: Instant) {
        let mut state = self.state.lock();
        if let Some(previous) = state.pending.take() {
            // The old timer may have expired without being processed.
            let _ = state.timers.stop(previous.timer);
            tracing::trace!(target: targets::FOCUS, replaced = %previous.id, "pretend focus replaced");
        }
        let delay = state.delay;
        let timer = state.timers.start_one_shot_at(now, delay);
        state.pending = Some(PendingFocus { id, timer });
        tracing::trace!(target: targets::FOCUS, %id, ?delay, "pretend focus requested");
    }

    /// Cancel a pending pretend focus. Returns whether one was pending.
    pub fn cancel_pretend_focus(&self) -> bool {
        let mut state = self.state.lock();
        match state.pending.take() {
            Some(pending) => {
                let _ = state.timers.stop(pending.timer);
                true
            }
            None => false,
        }
    }

    /// How long the host may sleep before [`process_timers_at`](Self::process_timers_at)
    /// has work to do.
    pub fn time_until_next_timer_at(&self, now: Instant) -> Option<Duration> {
        self.state.lock().timers.time_until_next_at(now)
    }

    /// Process an expired pretend-focus timer.
    ///
    /// Returns the promotion attempt, or `None` if nothing was due.
    pub fn process_timers_at(&self, registry: &ItemRegistry, now: Instant) -> Option<Promotion> {
        let due = {
            let mut state = self.state.lock();
            let fired = state.timers.process_expired_at(now);
            match state.pending.as_ref() {
                Some(pending) if fired.contains(&pending.timer) => {
                    state.pending.take().map(|p| p.id)
                }
                _ => None,
            }
        }?;

        match self.set_focus(registry, due) {
            Ok(_) => Some(Promotion::Promoted(due)),
            Err(_) => {
                tracing::debug!(target: targets::FOCUS, id = %due, "pretend focus dropped");
                Some(Promotion::Dropped(due))
            }
        }
    }

    /// Drop every reference to `id`.
    ///
    /// Clears the last focus (emitting a change) and cancels a pending pretend
    /// focus on it. Returns whether the item held the real focus.
    pub fn forget(&self, id: ItemId) -> bool {
        let change = {
            let mut state = self.state.lock();
            if state.pending.as_ref().is_some_and(|p| p.id == id)
                && let Some(pending) = state.pending.take()
            {
                let _ = state.timers.stop(pending.timer);
            }
            if state.last_focused == Some(id) {
                state.last_focused = None;
                Some(FocusChange {
                    previous: Some(id),
                    current: None,
                })
            } else {
                None
            }
        };

        match change {
            Some(change) => {
                self.focus_changed.emit(change);
                true
            }
            None => false,
        }
    }
}

impl Default for FocusTracker {
    fn default() -> Self {
        Self::new(DEFAULT_PRETEND_FOCUS_DELAY)
    }
}

impl std::fmt::Debug for FocusTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("FocusTracker")
            .field("last_focused", &state.last_focused)
            .field("pretend_focus", &state.pending.as_ref().map(|p| p.id))
            .field("delay", &state.delay)
            .finish()
    }
}
