//! Speech output for "repeat current element".
//!
//! The speech engine is a black box behind [`SpeechSink`]. The
//! [`SpeechRepeater`] composes the spoken description of the focused item
//! with [`describe`] and hands it to the sink, cancelling anything still
//! being spoken first. Utterances are never queued.

use horizon_a11y_core::logging::targets;

use crate::item::AccessibleItem;
use crate::role::Role;

/// Spoken when nothing is focused.
pub const NO_ELEMENT_FOCUSED: &str = "No element focused";
/// Spoken when the focused item has nothing to say.
pub const UNKNOWN_ELEMENT: &str = "Unknown element";

const RICH_SEPARATOR: &str = "; ";
const GENERIC_SEPARATOR: &str = ", ";
const VALUE_LABEL: &str = "value: ";

/// State of a speech engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechState {
    /// Idle and able to speak.
    Ready,
    /// Currently speaking.
    Speaking,
    /// Paused mid-utterance.
    Paused,
    /// The engine failed and cannot speak.
    Error,
}

/// A text-to-speech engine.
pub trait SpeechSink: Send {
    /// Current engine state.
    fn state(&self) -> SpeechState;

    /// Stop the current utterance.
    fn stop(&mut self);

    /// Start speaking `text`.
    fn say(&mut self, text: &str);
}

/// The spoken description of `item`.
///
/// Rich content elements speak their screen-reader info and extra info.
/// Anything else, or a rich element with neither, speaks its name,
/// description and value.
pub fn describe(item: Option<&dyn AccessibleItem>) -> String {
    let Some(item) = item else {
        return NO_ELEMENT_FOCUSED.to_string();
    };

    if item.accessible_role() == Role::ElementOnScore {
        let rich = join_non_empty(
            [
                item.accessible_screen_reader_info(),
                item.accessible_extra_info(),
            ],
            RICH_SEPARATOR,
        );
        if !rich.is_empty() {
            return rich;
        }
    }

    let value = item.accessible_value().to_string();
    let value = if value.is_empty() {
        value
    } else {
        format!("{VALUE_LABEL}{value}")
    };
    let generic = join_non_empty(
        [
            item.accessible_name(),
            item.accessible_description(),
            value,
        ],
        GENERIC_SEPARATOR,
    );

    if generic.is_empty() {
        UNKNOWN_ELEMENT.to_string()
    } else {
        generic
    }
}

fn join_non_empty<const N: usize>(parts: [String; N], separator: &str) -> String {
    parts
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Outcome of a repeat request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepeatOutcome {
    /// The text was handed to the sink.
    Spoken(String),
    /// No sink is installed.
    NoSink,
    /// The sink is in its error state.
    SinkError,
}

/// Cancel-then-speak front end for an optional [`SpeechSink`].
#[derive(Default)]
pub struct SpeechRepeater {
    sink: Option<Box<dyn SpeechSink>>,
}

impl SpeechRepeater {
    /// Create a repeater without a sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repeater speaking through `sink`.
    pub fn with_sink(sink: Box<dyn SpeechSink>) -> Self {
        Self { sink: Some(sink) }
    }

    /// Install or remove the sink.
    pub fn set_sink(&mut self, sink: Option<Box<dyn SpeechSink>>) {
        self.sink = sink;
    }

    /// Whether a sink is installed.
    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    /// Speak `text`, stopping any utterance in progress.
    pub fn speak(&mut self, text: &str) -> RepeatOutcome {
        let Some(sink) = self.sink.as_mut() else {
            tracing::debug!(target: targets::SPEECH, "no speech sink installed");
            return RepeatOutcome::NoSink;
        };

        match sink.state() {
            SpeechState::Error => {
                tracing::error!(target: targets::SPEECH, "speech sink is in error state");
                return RepeatOutcome::SinkError;
            }
            SpeechState::Speaking => sink.stop(),
            SpeechState::Ready | SpeechState::Paused => {}
        }

        sink.say(text);
        tracing::debug!(target: targets::SPEECH, text, "repeating");
        RepeatOutcome::Spoken(text.to_string())
    }

    /// Stop speaking.
    pub fn stop(&mut self) {
        if let Some(sink) = self.sink.as_mut()
            && sink.state() == SpeechState::Speaking
        {
            sink.stop();
        }
    }
}

impl std::fmt::Debug for SpeechRepeater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechRepeater")
            .field("has_sink", &self.has_sink())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use parking_lot::Mutex;

    use crate::item::{AccessibleBase, ItemId, Value};

    #[derive(Default)]
    struct Described {
        base: AccessibleBase,
        role: Role,
        name: String,
        description: String,
        value: Value,
        info: String,
        extra: String,
    }

    impl AccessibleItem for Described {
        fn accessible_base(&self) -> &AccessibleBase {
            &self.base
        }

        fn accessible_parent(&self) -> Option<ItemId> {
            None
        }

        fn accessible_role(&self) -> Role {
            self.role
        }

        fn accessible_name(&self) -> String {
            self.name.clone()
        }

        fn accessible_description(&self) -> String {
            self.description.clone()
        }

        fn accessible_value(&self) -> Value {
            self.value.clone()
        }

        fn accessible_screen_reader_info(&self) -> String {
            self.info.clone()
        }

        fn accessible_extra_info(&self) -> String {
            self.extra.clone()
        }
    }

    #[derive(Default)]
    struct Log {
        calls: Vec<String>,
        state: Option<SpeechState>,
    }

    struct TestSink(Arc<Mutex<Log>>);

    impl SpeechSink for TestSink {
        fn state(&self) -> SpeechState {
            self.0.lock().state.unwrap_or(SpeechState::Ready)
        }

        fn stop(&mut self) {
            let mut log = self.0.lock();
            log.calls.push("stop".into());
            log.state = Some(SpeechState::Ready);
        }

        fn say(&mut self, text: &str) {
            let mut log = self.0.lock();
            log.calls.push(format!("say:{text}"));
            log.state = Some(SpeechState::Speaking);
        }
    }

    #[test]
    fn test_rich_description() {
        let item = Described {
            role: Role::ElementOnScore,
            info: "A".into(),
            extra: "B".into(),
            ..Default::default()
        };
        assert_eq!(describe(Some(&item)), "A; B");

        let only_extra = Described {
            role: Role::ElementOnScore,
            extra: "Slur".into(),
            ..Default::default()
        };
        assert_eq!(describe(Some(&only_extra)), "Slur");
    }

    #[test]
    fn test_rich_role_falls_back_to_generic() {
        let item = Described {
            role: Role::ElementOnScore,
            name: "Note".into(),
            value: Value::Int(3),
            ..Default::default()
        };
        assert_eq!(describe(Some(&item)), "Note, value: 3");
    }

    #[test]
    fn test_generic_description() {
        let item = Described {
            role: Role::SpinBox,
            name: "Tempo".into(),
            description: "Beats per minute".into(),
            value: Value::Int(120),
            ..Default::default()
        };
        assert_eq!(describe(Some(&item)), "Tempo, Beats per minute, value: 120");
        assert_eq!(describe(Some(&Described::default())), UNKNOWN_ELEMENT);
        assert_eq!(describe(None), NO_ELEMENT_FOCUSED);
    }

    #[test]
    fn test_cancel_then_speak() {
        let log = Arc::new(Mutex::new(Log::default()));
        let mut repeater = SpeechRepeater::with_sink(Box::new(TestSink(log.clone())));

        repeater.speak("one");
        repeater.speak("two");
        assert_eq!(log.lock().calls, vec!["say:one", "stop", "say:two"]);
    }

    #[test]
    fn test_error_state_does_not_speak() {
        let log = Arc::new(Mutex::new(Log {
            state: Some(SpeechState::Error),
            ..Default::default()
        }));
        let mut repeater = SpeechRepeater::with_sink(Box::new(TestSink(log.clone())));

        assert_eq!(repeater.speak("one"), RepeatOutcome::SinkError);
        assert!(log.lock().calls.is_empty());
        assert_eq!(SpeechRepeater::new().speak("one"), RepeatOutcome::NoSink);
    }
}
