//! Input events feeding the composition pipeline.
//!
//! Every key press becomes an `Event`. Combiners may consume events, replace
//! them, or chain several of them together; the rest of the pipeline only
//! ever sees processed events.

/// Coordinate value for events that did not come from a touch point.
pub const NOT_A_COORDINATE: i32 = -1;
/// Coordinate value for events originating on the suggestion strip.
pub const SUGGESTION_STRIP_COORDINATE: i32 = -2;

/// Keys that have an effect on the input logic but do not input a code point
/// by themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionalKey {
    Delete,
    Shift,
    CapsLock,
    SymbolSwitch,
    LanguageSwitch,
    Emoji,
    ActionNext,
    ActionPrevious,
    ShiftEnter,
    /// A key that outputs a whole string, like a ".com" key.
    OutputText,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// A key that inputs a single code point.
    CodePoint(char),
    /// A key with keyboard-level behavior.
    Functional(FunctionalKey),
    /// An event swallowed by a combiner. It must not alter the editor, but
    /// it may still carry text emitted by the combiner.
    Consumed,
}

/// A single processed or unprocessed input event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub x: i32,
    pub y: i32,
    pub is_key_repeat: bool,
    /// Dead keys compose with the next keystroke instead of inputting text.
    pub is_dead: bool,
    /// Literal text this event inputs, for keys producing more than one code
    /// point or for combiner output.
    pub text: Option<String>,
    /// The event this one was created from, kept as provenance for the
    /// event log. Replaying a word replays heads only, never this chain.
    pub next: Option<Box<Event>>,
}

impl Event {
    fn base(kind: EventKind) -> Self {
        Self {
            kind,
            x: NOT_A_COORDINATE,
            y: NOT_A_COORDINATE,
            is_key_repeat: false,
            is_dead: false,
            text: None,
            next: None,
        }
    }

    /// A software keypress inputting one code point.
    pub fn key_press(code_point: char, x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            ..Self::base(EventKind::CodePoint(code_point))
        }
    }

    /// A repeated software keypress, from holding the key down.
    pub fn repeated_key_press(code_point: char, x: i32, y: i32) -> Self {
        Self {
            is_key_repeat: true,
            ..Self::key_press(code_point, x, y)
        }
    }

    /// A dead key press carrying a combining code point.
    pub fn dead_key(code_point: char) -> Self {
        Self {
            is_dead: true,
            ..Self::base(EventKind::CodePoint(code_point))
        }
    }

    /// A functional key press.
    pub fn functional_key(key: FunctionalKey) -> Self {
        Self::base(EventKind::Functional(key))
    }

    /// A repeated functional key press (key-repeat delete, typically).
    pub fn repeated_functional_key(key: FunctionalKey) -> Self {
        Self {
            is_key_repeat: true,
            ..Self::base(EventKind::Functional(key))
        }
    }

    /// An event that a combiner swallowed. The original event is kept on the
    /// chain for the event log.
    pub fn consumed(original: Event) -> Self {
        Self {
            next: Some(Box::new(original)),
            ..Self::base(EventKind::Consumed)
        }
    }

    /// The result of a dead-key combination: a replacement code point
    /// chained to the keystroke that triggered it.
    pub fn dead_result(code_point: char, original: Event) -> Self {
        Self {
            next: Some(Box::new(original)),
            ..Self::base(EventKind::CodePoint(code_point))
        }
    }

    /// A consumed event that emits literal text, for failed combinations
    /// that flush their pending sequence.
    pub fn text_emission(text: String, original: Event) -> Self {
        Self {
            text: Some(text),
            next: Some(Box::new(original)),
            ..Self::base(EventKind::Consumed)
        }
    }

    /// A word picked from the suggestion strip.
    pub fn suggestion_picked(word: &str) -> Self {
        Self {
            x: SUGGESTION_STRIP_COORDINATE,
            y: SUGGESTION_STRIP_COORDINATE,
            text: Some(word.to_string()),
            ..Self::base(EventKind::Consumed)
        }
    }

    /// A single-code-point punctuation key picked from the suggestion strip.
    pub fn punctuation_picked(code_point: char) -> Self {
        Self {
            x: SUGGESTION_STRIP_COORDINATE,
            y: SUGGESTION_STRIP_COORDINATE,
            ..Self::base(EventKind::CodePoint(code_point))
        }
    }

    /// An event recreated from already-committed text, when resuming
    /// composition on a word in the editor.
    pub fn resumed_key_press(code_point: char, x: i32, y: i32) -> Self {
        Self::key_press(code_point, x, y)
    }

    pub fn is_consumed(&self) -> bool {
        matches!(self.kind, EventKind::Consumed)
    }

    pub fn is_functional_key_event(&self) -> bool {
        matches!(self.kind, EventKind::Functional(_))
    }

    pub fn code_point(&self) -> Option<char> {
        match self.kind {
            EventKind::CodePoint(cp) => Some(cp),
            _ => None,
        }
    }

    pub fn key(&self) -> Option<FunctionalKey> {
        match self.kind {
            EventKind::Functional(key) => Some(key),
            _ => None,
        }
    }

    pub fn is_suggestion_strip_press(&self) -> bool {
        self.x == SUGGESTION_STRIP_COORDINATE && self.y == SUGGESTION_STRIP_COORDINATE
    }

    /// The text this single event contributes to the editor or the composing
    /// region. Consumed events contribute their emission text only.
    pub fn text_to_commit(&self) -> String {
        if let Some(text) = &self.text {
            return text.clone();
        }
        match self.kind {
            EventKind::CodePoint(cp) => cp.to_string(),
            _ => String::new(),
        }
    }
}
