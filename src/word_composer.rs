//! The word being composed, one keystroke at a time.

use crate::combiner::CombinerChain;
use crate::event::Event;
use crate::last_composed_word::{CommitKind, LastComposedWord};
use crate::ngram::NgramContext;
use crate::suggested_words::SuggestedWordInfo;
use crate::utils;

/// Words longer than this stop accumulating code points.
pub const MAX_WORD_LENGTH: usize = 48;

/// Capitalization state the keyboard was in while the word was composed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapsMode {
    Off,
    ManualShifted,
    ManualShiftLocked,
    AutoShifted,
    AutoShiftLocked,
}

impl CapsMode {
    pub fn is_auto(self) -> bool {
        matches!(self, CapsMode::AutoShifted | CapsMode::AutoShiftLocked)
    }

    pub fn is_locked(self) -> bool {
        matches!(self, CapsMode::ManualShiftLocked | CapsMode::AutoShiftLocked)
    }

    pub fn is_shifted(self) -> bool {
        !matches!(self, CapsMode::Off)
    }
}

/// Touch points recorded alongside keystrokes, also used for gesture trails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputPointers {
    xs: Vec<i32>,
    ys: Vec<i32>,
    times: Vec<i32>,
    pointer_ids: Vec<i32>,
}

impl InputPointers {
    pub fn push(&mut self, x: i32, y: i32, time: i32, pointer_id: i32) {
        self.xs.push(x);
        self.ys.push(y);
        self.times.push(time);
        self.pointer_ids.push(pointer_id);
    }

    pub fn set(&mut self, other: &InputPointers) {
        self.xs = other.xs.clone();
        self.ys = other.ys.clone();
        self.times = other.times.clone();
        self.pointer_ids = other.pointer_ids.clone();
    }

    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    pub fn clear(&mut self) {
        self.xs.clear();
        self.ys.clear();
        self.times.clear();
        self.pointer_ids.clear();
    }

    pub fn xs(&self) -> &[i32] {
        &self.xs
    }

    pub fn ys(&self) -> &[i32] {
        &self.ys
    }
}

/// Immutable snapshot of the composing state, safe to hand to the
/// suggestion worker.
#[derive(Debug, Clone)]
pub struct ComposedData {
    pub typed_word: String,
    pub pointers: InputPointers,
    pub is_batch_mode: bool,
    pub is_all_upper_case: bool,
    pub is_only_first_char_capitalized: bool,
}

/// Accumulates processed events into the in-progress word.
///
/// Also tracks the cursor position within the word (in UTF-16 units, the
/// unit editors count in), capitalization bookkeeping, and the batch-input
/// state for gestures.
pub struct WordComposer {
    combiner_chain: CombinerChain,
    combining_spec: Option<String>,
    events: Vec<Event>,
    input_pointers: InputPointers,
    typed_word_cache: String,
    cursor_utf16: usize,
    caps_count: usize,
    digits_count: usize,
    is_only_first_char_capitalized: bool,
    capitalized_mode: CapsMode,
    is_batch_mode: bool,
    is_resumed: bool,
    auto_correction: Option<SuggestedWordInfo>,
    rejected_batch_mode_suggestion: Option<String>,
}

impl WordComposer {
    pub fn new() -> Self {
        Self::with_spec(None)
    }

    pub fn with_spec(combining_spec: Option<&str>) -> Self {
        Self {
            combiner_chain: CombinerChain::from_spec(combining_spec, ""),
            combining_spec: combining_spec.map(str::to_string),
            events: Vec::new(),
            input_pointers: InputPointers::default(),
            typed_word_cache: String::new(),
            cursor_utf16: 0,
            caps_count: 0,
            digits_count: 0,
            is_only_first_char_capitalized: false,
            capitalized_mode: CapsMode::Off,
            is_batch_mode: false,
            is_resumed: false,
            auto_correction: None,
            rejected_batch_mode_suggestion: None,
        }
    }

    /// Swap the combining chain if the spec changed, re-seeding the new
    /// chain with the word composed so far.
    pub fn restart_combining(&mut self, combining_spec: Option<&str>) {
        if self.combining_spec.as_deref() == combining_spec {
            return;
        }
        self.combiner_chain = CombinerChain::from_spec(combining_spec, &self.typed_word_cache);
        self.combining_spec = combining_spec.map(str::to_string);
        self.refresh_typed_word_cache();
    }

    pub fn process_event(&mut self, event: Event) -> Event {
        self.combiner_chain.process_event(&self.events, event)
    }

    /// Fold a processed event into the word.
    pub fn apply_processed_event(&mut self, event: &Event) {
        if event.code_point().is_some()
            && self.typed_word_cache.chars().count() >= MAX_WORD_LENGTH
        {
            return;
        }
        self.combiner_chain.apply_processed_event(event);
        self.refresh_typed_word_cache();
        self.cursor_utf16 = utils::utf16_len(&self.typed_word_cache);
        if let Some(cp) = event.code_point() {
            if self.typed_word_cache.chars().count() == 1 {
                self.is_only_first_char_capitalized = cp.is_uppercase();
            } else {
                self.is_only_first_char_capitalized =
                    self.is_only_first_char_capitalized && !cp.is_uppercase();
            }
            if cp.is_uppercase() {
                self.caps_count += 1;
            }
            if cp.is_ascii_digit() {
                self.digits_count += 1;
            }
            if !self.is_batch_mode {
                self.input_pointers.push(event.x, event.y, 0, 0);
            }
        }
        self.events.push(event.clone());
    }

    pub fn is_composing(&self) -> bool {
        !self.typed_word_cache.is_empty()
    }

    pub fn typed_word(&self) -> &str {
        &self.typed_word_cache
    }

    pub fn is_single_letter(&self) -> bool {
        self.typed_word_cache.chars().count() == 1
    }

    /// Cursor position within the word, in UTF-16 units.
    pub fn cursor_position_within_word(&self) -> usize {
        self.cursor_utf16
    }

    pub fn set_cursor_position_within_word(&mut self, utf16_units: usize) {
        self.cursor_utf16 = utf16_units.min(utils::utf16_len(&self.typed_word_cache));
    }

    pub fn is_cursor_front_or_middle_of_composing_word(&self) -> bool {
        self.is_composing() && self.cursor_utf16 < utils::utf16_len(&self.typed_word_cache)
    }

    /// Move the cursor by a UTF-16 amount, walking whole code points.
    /// Returns false and leaves the cursor untouched if the move would
    /// cross a word boundary or split a surrogate pair.
    pub fn move_cursor_by(&mut self, utf16_amount: i32) -> bool {
        let word = &self.typed_word_cache;
        let mut moved: i32 = 0;
        if utf16_amount >= 0 {
            let Some(start) = utils::byte_offset_for_utf16(word, self.cursor_utf16) else {
                return false;
            };
            for ch in word[start..].chars() {
                if moved >= utf16_amount {
                    break;
                }
                moved += ch.len_utf16() as i32;
            }
        } else {
            let Some(end) = utils::byte_offset_for_utf16(word, self.cursor_utf16) else {
                return false;
            };
            for ch in word[..end].chars().rev() {
                if moved <= utf16_amount {
                    break;
                }
                moved -= ch.len_utf16() as i32;
            }
        }
        if moved != utf16_amount {
            return false;
        }
        self.cursor_utf16 = (self.cursor_utf16 as i64 + utf16_amount as i64) as usize;
        true
    }

    pub fn composed_data(&self) -> ComposedData {
        ComposedData {
            typed_word: self.typed_word_cache.clone(),
            pointers: self.input_pointers.clone(),
            is_batch_mode: self.is_batch_mode,
            is_all_upper_case: self.is_all_upper_case(),
            is_only_first_char_capitalized: self.is_or_will_be_only_first_char_capitalized(),
        }
    }

    pub fn is_batch_mode(&self) -> bool {
        self.is_batch_mode
    }

    pub fn set_batch_input_pointers(&mut self, pointers: &InputPointers) {
        self.input_pointers.set(pointers);
        self.is_batch_mode = true;
    }

    /// Install the word recognized from a finished gesture.
    pub fn set_batch_input_word(&mut self, word: &str) {
        self.reset();
        self.is_batch_mode = true;
        for cp in word.chars() {
            let event = Event::key_press(cp, crate::event::NOT_A_COORDINATE, crate::event::NOT_A_COORDINATE);
            let processed = self.process_event(event);
            self.apply_processed_event(&processed);
        }
    }

    /// Start composing from text already present in the editor.
    pub fn set_composing_word(&mut self, word: &str, coordinates: &[(i32, i32)]) {
        self.reset();
        for (i, cp) in word.chars().enumerate() {
            let (x, y) = coordinates.get(i).copied().unwrap_or((
                crate::event::NOT_A_COORDINATE,
                crate::event::NOT_A_COORDINATE,
            ));
            let event = Event::resumed_key_press(cp, x, y);
            let processed = self.process_event(event);
            self.apply_processed_event(&processed);
        }
        self.is_resumed = true;
    }

    pub fn is_resumed(&self) -> bool {
        self.is_resumed
    }

    /// Record the caps mode in effect when composition started.
    pub fn set_caps_mode_at_start(&mut self, mode: CapsMode) {
        self.capitalized_mode = mode;
    }

    /// Caps advice taken only when not composing; mid-word shift changes
    /// must not rewrite the mode the word started with.
    pub fn advise_caps_mode_before_fetching_suggestions(&mut self, mode: CapsMode) {
        if !self.is_composing() {
            self.capitalized_mode = mode;
        }
    }

    pub fn was_auto_capitalized(&self) -> bool {
        self.capitalized_mode.is_auto()
    }

    pub fn is_mostly_caps(&self) -> bool {
        self.caps_count > 1
    }

    pub fn is_all_upper_case(&self) -> bool {
        self.capitalized_mode.is_locked()
    }

    pub fn is_or_will_be_only_first_char_capitalized(&self) -> bool {
        if self.is_composing() {
            self.is_only_first_char_capitalized
        } else {
            matches!(
                self.capitalized_mode,
                CapsMode::AutoShifted | CapsMode::ManualShifted
            )
        }
    }

    pub fn auto_correction(&self) -> Option<&SuggestedWordInfo> {
        self.auto_correction.as_ref()
    }

    pub fn set_auto_correction(&mut self, info: Option<SuggestedWordInfo>) {
        self.auto_correction = info;
    }

    pub fn rejected_batch_mode_suggestion(&self) -> Option<&str> {
        self.rejected_batch_mode_suggestion.as_deref()
    }

    pub fn set_rejected_batch_mode_suggestion(&mut self, word: Option<String>) {
        self.rejected_batch_mode_suggestion = word;
    }

    /// Commit the composing word and return the single-use revert record.
    /// The record is deactivated right away for commit kinds that must not
    /// be revertible by a lone backspace.
    pub fn commit_word(
        &mut self,
        kind: CommitKind,
        committed_word: &str,
        separator: &str,
        ngram_context: NgramContext,
    ) -> LastComposedWord {
        let mut last = LastComposedWord::new(
            std::mem::take(&mut self.events),
            self.input_pointers.clone(),
            self.typed_word_cache.clone(),
            committed_word.to_string(),
            separator.to_string(),
            ngram_context,
            self.capitalized_mode,
        );
        if !matches!(kind, CommitKind::DecidedWord | CommitKind::ManualPick) {
            last.deactivate();
        }
        self.reset();
        last
    }

    /// Rebuild the composing state from a revert record.
    pub fn resume_suggestion_on_last_composed_word(&mut self, last: &LastComposedWord) {
        self.reset();
        for event in &last.events {
            self.apply_processed_event(&event.clone());
        }
        self.input_pointers.set(&last.pointers);
        self.capitalized_mode = last.caps_mode;
        self.is_resumed = true;
    }

    pub fn reset(&mut self) {
        self.combiner_chain = CombinerChain::from_spec(self.combining_spec.as_deref(), "");
        self.events.clear();
        self.input_pointers.clear();
        self.typed_word_cache.clear();
        self.cursor_utf16 = 0;
        self.caps_count = 0;
        self.digits_count = 0;
        self.is_only_first_char_capitalized = false;
        self.capitalized_mode = CapsMode::Off;
        self.is_batch_mode = false;
        self.is_resumed = false;
        self.auto_correction = None;
        self.rejected_batch_mode_suggestion = None;
    }

    fn refresh_typed_word_cache(&mut self) {
        self.typed_word_cache = self.combiner_chain.composing_word();
    }
}

impl Default for WordComposer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_word(composer: &mut WordComposer, word: &str) {
        for cp in word.chars() {
            let processed = composer.process_event(Event::key_press(cp, 0, 0));
            composer.apply_processed_event(&processed);
        }
    }

    #[test]
    fn test_typing_builds_word() {
        let mut composer = WordComposer::new();
        type_word(&mut composer, "hello");
        assert!(composer.is_composing());
        assert_eq!(composer.typed_word(), "hello");
        assert_eq!(composer.cursor_position_within_word(), 5);
    }

    #[test]
    fn test_delete_removes_last_code_point() {
        let mut composer = WordComposer::new();
        type_word(&mut composer, "hé");
        let delete = Event::functional_key(crate::event::FunctionalKey::Delete);
        let processed = composer.process_event(delete);
        composer.apply_processed_event(&processed);
        assert_eq!(composer.typed_word(), "h");
    }

    #[test]
    fn test_only_first_char_capitalized() {
        let mut composer = WordComposer::new();
        type_word(&mut composer, "Hello");
        assert!(composer.is_or_will_be_only_first_char_capitalized());
        assert!(!composer.is_mostly_caps());

        let mut composer = WordComposer::new();
        type_word(&mut composer, "HEllo");
        assert!(!composer.is_or_will_be_only_first_char_capitalized());
        assert!(composer.is_mostly_caps());
    }

    #[test]
    fn test_move_cursor_within_word() {
        let mut composer = WordComposer::new();
        type_word(&mut composer, "word");
        assert!(composer.move_cursor_by(-2));
        assert_eq!(composer.cursor_position_within_word(), 2);
        assert!(composer.is_cursor_front_or_middle_of_composing_word());
        assert!(composer.move_cursor_by(2));
        assert!(!composer.is_cursor_front_or_middle_of_composing_word());
    }

    #[test]
    fn test_move_cursor_rejects_boundary_crossing() {
        let mut composer = WordComposer::new();
        type_word(&mut composer, "ab");
        assert!(!composer.move_cursor_by(1));
        assert_eq!(composer.cursor_position_within_word(), 2);
        assert!(!composer.move_cursor_by(-3));
        assert_eq!(composer.cursor_position_within_word(), 2);
    }

    #[test]
    fn test_move_cursor_counts_utf16_units() {
        let mut composer = WordComposer::new();
        // U+1F600 is two UTF-16 units.
        type_word(&mut composer, "a\u{1F600}b");
        assert_eq!(composer.cursor_position_within_word(), 4);
        assert!(composer.move_cursor_by(-3));
        assert_eq!(composer.cursor_position_within_word(), 1);
        // +1 would land in the middle of the surrogate pair.
        assert!(!composer.move_cursor_by(1));
        assert!(composer.move_cursor_by(2));
        assert_eq!(composer.cursor_position_within_word(), 3);
    }

    #[test]
    fn test_commit_word_deactivates_user_typed() {
        let mut composer = WordComposer::new();
        type_word(&mut composer, "hi");
        let last = composer.commit_word(
            CommitKind::UserTyped,
            "hi",
            " ",
            NgramContext::empty(),
        );
        assert!(!last.can_revert_commit());
        assert!(!composer.is_composing());
    }

    #[test]
    fn test_commit_word_keeps_decided_word_revertible() {
        let mut composer = WordComposer::new();
        type_word(&mut composer, "teh");
        let last = composer.commit_word(
            CommitKind::DecidedWord,
            "the",
            " ",
            NgramContext::empty(),
        );
        assert!(last.can_revert_commit());
        assert_eq!(last.typed_word, "teh");
        assert_eq!(last.committed_word, "the");
    }

    #[test]
    fn test_resume_from_last_composed_word() {
        let mut composer = WordComposer::new();
        type_word(&mut composer, "teh");
        let last = composer.commit_word(
            CommitKind::DecidedWord,
            "the",
            " ",
            NgramContext::empty(),
        );
        composer.resume_suggestion_on_last_composed_word(&last);
        assert_eq!(composer.typed_word(), "teh");
        assert!(composer.is_resumed());
    }

    #[test]
    fn test_batch_input_word() {
        let mut composer = WordComposer::new();
        composer.set_batch_input_word("swipe");
        assert!(composer.is_batch_mode());
        assert_eq!(composer.typed_word(), "swipe");
    }

    #[test]
    fn test_caps_mode_survives_until_reset() {
        let mut composer = WordComposer::new();
        composer.set_caps_mode_at_start(CapsMode::AutoShifted);
        assert!(composer.was_auto_capitalized());
        type_word(&mut composer, "Hi");
        // Mid-word advice must not change the recorded mode.
        composer.advise_caps_mode_before_fetching_suggestions(CapsMode::Off);
        assert!(composer.was_auto_capitalized());
        composer.reset();
        assert!(!composer.was_auto_capitalized());
    }

    #[test]
    fn test_word_length_cap() {
        let mut composer = WordComposer::new();
        let long: String = std::iter::repeat('a').take(MAX_WORD_LENGTH + 5).collect();
        type_word(&mut composer, &long);
        assert_eq!(composer.typed_word().chars().count(), MAX_WORD_LENGTH);
    }
}
