//! The dictionary collaborator queried for suggestions and taught words.

use anyhow::Result;

use crate::ngram::NgramContext;
use crate::suggested_words::SuggestedWordInfo;
use crate::word_composer::ComposedData;

/// Per-query settings the dictionary needs.
#[derive(Debug, Clone, Copy)]
pub struct SuggestionSettings {
    pub block_possibly_offensive: bool,
    pub auto_correction_enabled: bool,
}

/// Raw results of one dictionary query, before the pipeline merges in the
/// typed word and dedups.
#[derive(Debug, Default)]
pub struct SuggestionResults {
    pub suggestions: Vec<SuggestedWordInfo>,
    pub raw_suggestions: Option<Vec<SuggestedWordInfo>>,
}

/// Why a word is being unlearned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlearnKind {
    /// The user deleted their way back into or past the word.
    Backspace,
    /// A batch-input word was backspaced wholesale.
    Rejection,
    /// An auto-correction was reverted.
    Revert,
}

/// Dictionary lookups and user-history learning.
///
/// Implementations are shared with the suggestion worker thread, so they
/// must be safe to call from both contexts. Learning failures are reported
/// through `Result`; the input logic logs and swallows them since a failed
/// write must never break typing.
pub trait Dictionary: Send + Sync {
    /// Query suggestions for the composing snapshot. For batch-mode
    /// snapshots the gesture pointers carry the input and the typed word
    /// is empty.
    fn suggestions(
        &self,
        composed: &ComposedData,
        ngram_context: &NgramContext,
        settings: &SuggestionSettings,
    ) -> SuggestionResults;

    fn is_valid_word(&self, word: &str) -> bool;

    /// Record a committed word in the user history.
    fn learn(
        &self,
        word: &str,
        ngram_context: &NgramContext,
        timestamp_ms: u64,
        block_possibly_offensive: bool,
    ) -> Result<()>;

    /// Remove or demote a word the user has rejected.
    fn unlearn(&self, word: &str, ngram_context: &NgramContext, kind: UnlearnKind) -> Result<()>;
}
