//! The record of the last committed word, kept for a possible revert.

use crate::event::Event;
use crate::ngram::NgramContext;
use crate::word_composer::{CapsMode, InputPointers};

/// Separator value for commits not caused by a separator keystroke.
pub const NOT_A_SEPARATOR: &str = "";

/// How a word came to be committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitKind {
    /// Committed exactly as typed, without correction.
    UserTyped,
    /// The engine decided the word, typically an auto-correction.
    DecidedWord,
    /// Picked manually from the suggestion strip.
    ManualPick,
    /// Commit caused by cancelling a previous auto-correction.
    CancelAutoCorrect,
}

/// Everything needed to revert the last commit and resume composing.
///
/// The record is single-use: it starts active and is deactivated as soon as
/// it is used for a revert, or when any event other than a lone backspace
/// follows the commit.
#[derive(Debug, Clone)]
pub struct LastComposedWord {
    pub events: Vec<Event>,
    pub pointers: InputPointers,
    pub typed_word: String,
    pub committed_word: String,
    pub separator: String,
    pub ngram_context: NgramContext,
    pub caps_mode: CapsMode,
    active: bool,
}

impl LastComposedWord {
    pub fn new(
        events: Vec<Event>,
        pointers: InputPointers,
        typed_word: String,
        committed_word: String,
        separator: String,
        ngram_context: NgramContext,
        caps_mode: CapsMode,
    ) -> Self {
        Self {
            events,
            pointers,
            typed_word,
            committed_word,
            separator,
            ngram_context,
            caps_mode,
            active: true,
        }
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn can_revert_commit(&self) -> bool {
        self.active && !self.committed_word.is_empty()
    }

    pub fn did_commit_typed_word(&self) -> bool {
        self.typed_word == self.committed_word
    }
}
