//! Core primitives for Horizon A11y.
//!
//! This crate provides the building blocks the accessibility bridge is made
//! of, none of which know anything about accessibility themselves:
//!
//! - **Signal/Slot System**: Type-safe, re-entrancy safe notification
//! - **Property System**: Values that report whether a write changed them
//! - **Timers**: Cooperative one-shot and repeating timers driven by the host
//! - **Logging**: `tracing` targets shared by every subsystem
//!
//! # Example
//!
//! ```
//! use horizon_a11y_core::{Property, Signal};
//!
//! let focused = Property::new(false);
//! let focus_changed = Signal::<bool>::new();
//! focus_changed.connect(|focused| println!("focused: {focused}"));
//!
//! if focused.set(true) {
//!     focus_changed.emit(true);
//! }
//! // A second identical write is silent.
//! assert!(!focused.set(true));
//! ```

mod error;
pub mod logging;
pub mod property;
pub mod signal;
pub mod timer;

pub use error::{CoreError, Result};
pub use logging::PerfSpan;
pub use property::Property;
pub use signal::{ConnectionGuard, ConnectionId, Signal};
pub use timer::{TimerId, TimerKind, TimerManager};
