//! Connection to the host editor.
//!
//! All positions and lengths cross this boundary in UTF-16 units, because
//! that is the unit editors count in. Queries return `Option`: a `None`
//! means the editor cannot answer right now, and callers degrade
//! gracefully instead of guessing.

use crate::ngram::{ngram_context_from_text, NgramContext};
use crate::utils;
use crate::Config;

/// How many UTF-16 units of context we pull for word and n-gram lookups.
const LOOKBACK_UNITS: usize = 48;
const NGRAM_LOOKBACK_UNITS: usize = 80;

/// Action the enter key should trigger instead of inputting a newline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorAction {
    Next,
    Previous,
    Go,
    Search,
    Send,
    Done,
}

/// A word under the cursor and how the cursor splits it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordRange {
    pub word: String,
    pub units_before_cursor: usize,
    pub units_after_cursor: usize,
}

pub trait EditorConnection {
    fn begin_batch_edit(&mut self) {}
    fn end_batch_edit(&mut self) {}

    fn commit_text(&mut self, text: &str);
    fn set_composing_text(&mut self, text: &str);
    fn set_composing_region(&mut self, start: usize, end: usize);
    fn finish_composing_text(&mut self);
    fn delete_text_before_cursor(&mut self, utf16_units: usize);
    fn set_selection(&mut self, start: usize, end: usize);

    fn text_before_cursor(&self, utf16_units: usize) -> Option<String>;
    fn text_after_cursor(&self, utf16_units: usize) -> Option<String>;
    fn selection_start(&self) -> Option<usize>;
    fn selection_end(&self) -> Option<usize>;
    fn selected_text(&self) -> Option<String>;

    /// Re-sync any caches after a cursor move the engine did not cause.
    /// Returns false when the editor could not be reached; callers retry.
    fn reset_caches_on_cursor_move(
        &mut self,
        sel_start: usize,
        sel_end: usize,
        finish_composition: bool,
    ) -> bool;

    /// The action attached to the enter key, if the editor declares one.
    fn editor_action(&self) -> Option<EditorAction> {
        None
    }

    fn perform_editor_action(&mut self, _action: EditorAction) {}

    /// Slow connections make round trips expensive; learning and
    /// resumption are skipped on them.
    fn is_slow(&self) -> bool {
        false
    }

    fn has_selection(&self) -> bool {
        match (self.selection_start(), self.selection_end()) {
            (Some(start), Some(end)) => start != end,
            _ => false,
        }
    }

    fn code_point_before_cursor(&self) -> Option<char> {
        self.text_before_cursor(2)?.chars().last()
    }

    fn code_point_after_cursor(&self) -> Option<char> {
        self.text_after_cursor(2)?.chars().next()
    }

    fn is_cursor_followed_by_word_char(&self, config: &Config) -> bool {
        self.code_point_after_cursor()
            .is_some_and(|cp| config.is_word_code_point(cp))
    }

    /// Whether the cursor is inside or adjacent to a word. The text-after
    /// check can be skipped on slow connections.
    fn is_cursor_touching_word(&self, config: &Config, check_text_after: bool) -> bool {
        if self
            .code_point_before_cursor()
            .is_some_and(|cp| config.is_word_code_point(cp))
        {
            return true;
        }
        check_text_after && self.is_cursor_followed_by_word_char(config)
    }

    /// The word the cursor touches, split at the cursor position.
    fn word_range_at_cursor(&self, config: &Config) -> Option<WordRange> {
        let before = self.text_before_cursor(LOOKBACK_UNITS)?;
        let after = self.text_after_cursor(LOOKBACK_UNITS)?;
        let head: String = before
            .chars()
            .rev()
            .take_while(|&cp| config.is_word_code_point(cp))
            .collect::<Vec<char>>()
            .into_iter()
            .rev()
            .collect();
        let tail: String = after
            .chars()
            .take_while(|&cp| config.is_word_code_point(cp))
            .collect();
        if head.is_empty() && tail.is_empty() {
            return None;
        }
        Some(WordRange {
            word: format!("{head}{tail}"),
            units_before_cursor: utils::utf16_len(&head),
            units_after_cursor: utils::utf16_len(&tail),
        })
    }

    fn ngram_context_from_nth_previous_word(
        &self,
        config: &Config,
        nth_previous_word: usize,
    ) -> NgramContext {
        match self.text_before_cursor(NGRAM_LOOKBACK_UNITS) {
            Some(before) => ngram_context_from_text(&before, config, nth_previous_word),
            None => NgramContext::empty(),
        }
    }

    fn same_as_text_before_cursor(&self, text: &str) -> bool {
        self.text_before_cursor(utils::utf16_len(text))
            .is_some_and(|before| before == text)
    }

    /// Heuristic used to suppress automatic spaces inside URLs.
    fn text_before_cursor_looks_like_url(&self) -> bool {
        let Some(before) = self.text_before_cursor(LOOKBACK_UNITS) else {
            return false;
        };
        let last_token = before
            .rsplit(char::is_whitespace)
            .next()
            .unwrap_or_default();
        last_token.contains("://")
            || last_token.starts_with("www.")
            || (last_token.contains('.') && last_token.contains('/'))
    }

    fn remove_trailing_space(&mut self) {
        if self.code_point_before_cursor() == Some(' ') {
            self.delete_text_before_cursor(1);
        }
    }
}

/// An in-memory editor, for embedders without a host text field and for
/// tests. Implements the composing-region semantics the trait assumes:
/// commit and set-composing-text replace the current composing region when
/// one exists, the selection otherwise.
#[derive(Debug, Default)]
pub struct BufferEditor {
    text: String,
    sel_start: usize,
    sel_end: usize,
    composing: Option<(usize, usize)>,
    slow: bool,
    action: Option<EditorAction>,
}

impl BufferEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: &str) -> Self {
        let len = utils::utf16_len(text);
        Self {
            text: text.to_string(),
            sel_start: len,
            sel_end: len,
            composing: None,
            slow: false,
            action: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.sel_start
    }

    pub fn set_slow(&mut self, slow: bool) {
        self.slow = slow;
    }

    pub fn set_action(&mut self, action: Option<EditorAction>) {
        self.action = action;
    }

    pub fn composing_region(&self) -> Option<(usize, usize)> {
        self.composing
    }

    fn byte_at(&self, utf16_index: usize) -> usize {
        utils::byte_offset_for_utf16_clamped(&self.text, utf16_index)
    }

    fn replace_units(&mut self, start: usize, end: usize, insert: &str) {
        let b0 = self.byte_at(start);
        let b1 = self.byte_at(end);
        self.text.replace_range(b0..b1, insert);
    }

    /// The range the next commit or composing-text call replaces.
    fn target_range(&self) -> (usize, usize) {
        if let Some(region) = self.composing {
            region
        } else {
            (self.sel_start, self.sel_end)
        }
    }
}

impl EditorConnection for BufferEditor {
    fn commit_text(&mut self, text: &str) {
        let (start, end) = self.target_range();
        self.replace_units(start, end, text);
        let cursor = start + utils::utf16_len(text);
        self.sel_start = cursor;
        self.sel_end = cursor;
        self.composing = None;
    }

    fn set_composing_text(&mut self, text: &str) {
        let (start, end) = self.target_range();
        self.replace_units(start, end, text);
        let new_end = start + utils::utf16_len(text);
        self.composing = if text.is_empty() {
            None
        } else {
            Some((start, new_end))
        };
        self.sel_start = new_end;
        self.sel_end = new_end;
    }

    fn set_composing_region(&mut self, start: usize, end: usize) {
        let len = utils::utf16_len(&self.text);
        let start = start.min(len);
        let end = end.min(len);
        self.composing = if start == end {
            None
        } else {
            Some((start.min(end), start.max(end)))
        };
    }

    fn finish_composing_text(&mut self) {
        self.composing = None;
    }

    fn delete_text_before_cursor(&mut self, utf16_units: usize) {
        let delete = utf16_units.min(self.sel_start);
        let start = self.sel_start - delete;
        self.replace_units(start, self.sel_start, "");
        self.sel_start = start;
        self.sel_end = self.sel_end.saturating_sub(delete);
        if let Some((cs, ce)) = self.composing {
            // Deleting into the composing region invalidates it.
            if cs >= start || ce > start {
                self.composing = None;
            }
        }
    }

    fn set_selection(&mut self, start: usize, end: usize) {
        let len = utils::utf16_len(&self.text);
        self.sel_start = start.min(len);
        self.sel_end = end.min(len);
    }

    fn text_before_cursor(&self, utf16_units: usize) -> Option<String> {
        let start = self.sel_start.saturating_sub(utf16_units);
        let b0 = self.byte_at(start);
        let b1 = self.byte_at(self.sel_start);
        Some(self.text[b0..b1].to_string())
    }

    fn text_after_cursor(&self, utf16_units: usize) -> Option<String> {
        let end = (self.sel_end + utf16_units).min(utils::utf16_len(&self.text));
        let b0 = self.byte_at(self.sel_end);
        let b1 = self.byte_at(end);
        Some(self.text[b0..b1].to_string())
    }

    fn selection_start(&self) -> Option<usize> {
        Some(self.sel_start)
    }

    fn selection_end(&self) -> Option<usize> {
        Some(self.sel_end)
    }

    fn selected_text(&self) -> Option<String> {
        let b0 = self.byte_at(self.sel_start.min(self.sel_end));
        let b1 = self.byte_at(self.sel_start.max(self.sel_end));
        Some(self.text[b0..b1].to_string())
    }

    fn reset_caches_on_cursor_move(
        &mut self,
        sel_start: usize,
        sel_end: usize,
        finish_composition: bool,
    ) -> bool {
        self.set_selection(sel_start, sel_end);
        if finish_composition {
            self.composing = None;
        }
        true
    }

    fn editor_action(&self) -> Option<EditorAction> {
        self.action
    }

    fn is_slow(&self) -> bool {
        self.slow
    }
}
