//! Suggestion lists produced by the pipeline and shown on the strip.

use ahash::AHashSet;
use once_cell::sync::Lazy;

/// Hard cap on how many suggestions one list carries.
pub const MAX_SUGGESTIONS: usize = 18;

/// Sequence value for requests outside the batch staleness protocol.
pub const NOT_A_SEQUENCE_NUMBER: i32 = -1;

pub const INDEX_OF_TYPED_WORD: usize = 0;
pub const INDEX_OF_AUTO_CORRECTION: usize = 1;

/// Where a suggestion came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionKind {
    /// The word exactly as typed.
    Typed,
    Correction,
    Completion,
    Whitelist,
    Blacklist,
    Hardcoded,
    AppDefined,
    Shortcut,
    Prediction,
    /// Recovered from the editor when resuming a word.
    Resumed,
    OutOfVocabularyCorrection,
}

/// Qualities of a suggestion, orthogonal to its kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SuggestionFlags {
    pub possibly_offensive: bool,
    pub exact_match: bool,
    pub exact_match_with_intentional_omission: bool,
    pub appropriate_for_auto_correction: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SuggestedWordInfo {
    pub word: String,
    /// Flat previous-words context the dictionary used for this entry.
    pub prev_words_context: String,
    pub score: i32,
    pub kind: SuggestionKind,
    pub flags: SuggestionFlags,
    /// For two-word suggestions, where the second word starts.
    pub index_of_touch_point_of_second_word: Option<usize>,
    pub auto_commit_first_word_confidence: i32,
}

impl SuggestedWordInfo {
    pub const MAX_SCORE: i32 = i32::MAX;

    pub fn new(word: &str, prev_words_context: &str, score: i32, kind: SuggestionKind) -> Self {
        Self {
            word: word.to_string(),
            prev_words_context: prev_words_context.to_string(),
            score,
            kind,
            flags: SuggestionFlags::default(),
            index_of_touch_point_of_second_word: None,
            auto_commit_first_word_confidence: 0,
        }
    }

    pub fn typed(word: &str) -> Self {
        Self::new(word, "", Self::MAX_SCORE, SuggestionKind::Typed)
    }

    pub fn with_flags(mut self, flags: SuggestionFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn is_kind_of(&self, kind: SuggestionKind) -> bool {
        self.kind == kind
    }

    pub fn is_eligible_for_auto_commit(&self) -> bool {
        self.kind == SuggestionKind::Correction
            && self.index_of_touch_point_of_second_word.is_some()
    }
}

/// How the input that produced a suggestion list was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputStyle {
    None,
    Typing,
    UpdateBatch,
    TailBatch,
    ApplicationSpecified,
    Recorrection,
    Prediction,
    BeginningOfSentencePrediction,
}

impl InputStyle {
    pub fn is_prediction(self) -> bool {
        matches!(
            self,
            InputStyle::Prediction | InputStyle::BeginningOfSentencePrediction
        )
    }

    pub fn is_batch(self) -> bool {
        matches!(self, InputStyle::UpdateBatch | InputStyle::TailBatch)
    }
}

/// An ordered suggestion list plus the verdicts reached about it.
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestedWords {
    pub suggestions: Vec<SuggestedWordInfo>,
    /// Pre-dedup results kept for debug surfaces.
    pub raw_suggestions: Option<Vec<SuggestedWordInfo>>,
    pub typed_word_info: Option<SuggestedWordInfo>,
    pub typed_word_valid: bool,
    pub will_auto_correct: bool,
    /// True for spliced lists shown only to avoid strip flicker.
    pub is_obsolete: bool,
    pub input_style: InputStyle,
    pub sequence_number: i32,
}

static EMPTY: Lazy<SuggestedWords> = Lazy::new(|| SuggestedWords {
    suggestions: Vec::new(),
    raw_suggestions: None,
    typed_word_info: None,
    typed_word_valid: false,
    will_auto_correct: false,
    is_obsolete: false,
    input_style: InputStyle::None,
    sequence_number: NOT_A_SEQUENCE_NUMBER,
});

impl SuggestedWords {
    /// The shared empty list.
    pub fn empty() -> SuggestedWords {
        EMPTY.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.suggestions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.suggestions.len()
    }

    pub fn info_at(&self, index: usize) -> Option<&SuggestedWordInfo> {
        self.suggestions.get(index)
    }

    pub fn word_at(&self, index: usize) -> Option<&str> {
        self.suggestions.get(index).map(|info| info.word.as_str())
    }

    pub fn is_prediction(&self) -> bool {
        self.input_style.is_prediction()
    }

    /// The entry the engine would commit: the auto-correction when there
    /// will be one, the typed word otherwise.
    pub fn auto_correction_or_typed(&self) -> Option<&SuggestedWordInfo> {
        if self.will_auto_correct {
            self.info_at(INDEX_OF_AUTO_CORRECTION)
        } else {
            self.typed_word_info.as_ref()
        }
    }

    /// Drop duplicate words in a single pass, keeping the first occurrence.
    /// Entries equal to the typed word are dropped too; the typed word owns
    /// index 0 and is added separately.
    pub fn remove_dups(typed_word: Option<&str>, candidates: &mut Vec<SuggestedWordInfo>) {
        let mut seen: AHashSet<String> = AHashSet::new();
        if let Some(typed) = typed_word {
            seen.insert(typed.to_string());
        }
        candidates.retain(|info| seen.insert(info.word.clone()));
    }

    /// The fresh typed word followed by the previous list's suggestions,
    /// used to splice a stale list under a new keystroke.
    pub fn typed_word_and_previous_suggestions(
        typed_word_info: &SuggestedWordInfo,
        previous: &SuggestedWords,
    ) -> Vec<SuggestedWordInfo> {
        let mut merged = vec![typed_word_info.clone()];
        for info in &previous.suggestions {
            if info.word == typed_word_info.word
                || info.is_kind_of(SuggestionKind::Typed)
                || info.is_kind_of(SuggestionKind::Prediction)
            {
                continue;
            }
            merged.push(info.clone());
            if merged.len() >= MAX_SUGGESTIONS {
                break;
            }
        }
        merged
    }

    /// Build the obsolete spliced list shown while fresh results are too
    /// thin to replace the strip.
    pub fn retrieve_older_suggestions(
        typed_word_info: &SuggestedWordInfo,
        previous: &SuggestedWords,
    ) -> SuggestedWords {
        let suggestions = Self::typed_word_and_previous_suggestions(typed_word_info, previous);
        SuggestedWords {
            suggestions,
            raw_suggestions: None,
            typed_word_info: Some(typed_word_info.clone()),
            typed_word_valid: false,
            will_auto_correct: false,
            is_obsolete: true,
            input_style: previous.input_style,
            sequence_number: NOT_A_SEQUENCE_NUMBER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(word: &str, score: i32) -> SuggestedWordInfo {
        SuggestedWordInfo::new(word, "", score, SuggestionKind::Correction)
    }

    #[test]
    fn test_empty_is_shared_and_empty() {
        let empty = SuggestedWords::empty();
        assert!(empty.is_empty());
        assert!(!empty.will_auto_correct);
        assert_eq!(empty.sequence_number, NOT_A_SEQUENCE_NUMBER);
    }

    #[test]
    fn test_remove_dups_keeps_first_occurrence() {
        let mut candidates = vec![
            info("hello", 100),
            info("world", 90),
            info("hello", 80),
            info("word", 70),
            info("world", 60),
        ];
        SuggestedWords::remove_dups(None, &mut candidates);
        let words: Vec<&str> = candidates.iter().map(|i| i.word.as_str()).collect();
        assert_eq!(words, vec!["hello", "world", "word"]);
        assert_eq!(candidates[0].score, 100);
    }

    #[test]
    fn test_remove_dups_drops_typed_word() {
        let mut candidates = vec![info("teh", 100), info("the", 90)];
        SuggestedWords::remove_dups(Some("teh"), &mut candidates);
        let words: Vec<&str> = candidates.iter().map(|i| i.word.as_str()).collect();
        assert_eq!(words, vec!["the"]);
    }

    #[test]
    fn test_retrieve_older_suggestions_is_obsolete() {
        let previous = SuggestedWords {
            suggestions: vec![
                SuggestedWordInfo::typed("worl"),
                info("world", 90),
                info("word", 80),
            ],
            raw_suggestions: None,
            typed_word_info: Some(SuggestedWordInfo::typed("worl")),
            typed_word_valid: false,
            will_auto_correct: true,
            is_obsolete: false,
            input_style: InputStyle::Typing,
            sequence_number: NOT_A_SEQUENCE_NUMBER,
        };
        let typed = SuggestedWordInfo::typed("world");
        let spliced = SuggestedWords::retrieve_older_suggestions(&typed, &previous);
        assert!(spliced.is_obsolete);
        assert!(!spliced.will_auto_correct);
        assert_eq!(spliced.word_at(0), Some("world"));
        // The previous "world" entry is dropped as a dup of the typed word,
        // the old typed entry is dropped by kind.
        let words: Vec<&str> = spliced.suggestions.iter().map(|i| i.word.as_str()).collect();
        assert_eq!(words, vec!["world", "word"]);
    }

    #[test]
    fn test_auto_correction_or_typed() {
        let words = SuggestedWords {
            suggestions: vec![SuggestedWordInfo::typed("teh"), info("the", 90)],
            raw_suggestions: None,
            typed_word_info: Some(SuggestedWordInfo::typed("teh")),
            typed_word_valid: false,
            will_auto_correct: true,
            is_obsolete: false,
            input_style: InputStyle::Typing,
            sequence_number: NOT_A_SEQUENCE_NUMBER,
        };
        assert_eq!(
            words.auto_correction_or_typed().map(|i| i.word.as_str()),
            Some("the")
        );
    }
}
