//! The suggestion pipeline: dictionary results in, a ranked and vetted
//! suggestion list out.
//!
//! The pipeline owns the auto-correction decision. A raw dictionary score
//! means little on its own; it is weighted by the edit distance between the
//! typed word and the candidate before being compared to the threshold.

use std::sync::Arc;

use crate::dictionary::{Dictionary, SuggestionSettings};
use crate::ngram::NgramContext;
use crate::suggested_words::{
    InputStyle, SuggestedWordInfo, SuggestedWords, SuggestionKind, MAX_SUGGESTIONS,
};
use crate::word_composer::ComposedData;

/// Scores from the dictionary live in this range.
pub const MAX_DICTIONARY_SCORE: i32 = 1_000_000;

pub struct Suggest {
    dictionary: Arc<dyn Dictionary>,
    auto_correction_threshold: f32,
    plausibility_threshold: f32,
}

impl Suggest {
    pub fn new(
        dictionary: Arc<dyn Dictionary>,
        auto_correction_threshold: f32,
        plausibility_threshold: f32,
    ) -> Self {
        Self {
            dictionary,
            auto_correction_threshold,
            plausibility_threshold,
        }
    }

    pub fn dictionary(&self) -> &Arc<dyn Dictionary> {
        &self.dictionary
    }

    /// Build the suggestion list for one composing snapshot.
    pub fn suggested_words(
        &self,
        composed: &ComposedData,
        ngram_context: &NgramContext,
        settings: &SuggestionSettings,
        is_correction_enabled: bool,
        input_style: InputStyle,
        sequence_number: i32,
    ) -> SuggestedWords {
        if composed.is_batch_mode {
            self.suggested_words_for_batch_input(
                composed,
                ngram_context,
                settings,
                input_style,
                sequence_number,
            )
        } else {
            self.suggested_words_for_typing(
                composed,
                ngram_context,
                settings,
                is_correction_enabled,
                input_style,
                sequence_number,
            )
        }
    }

    fn suggested_words_for_typing(
        &self,
        composed: &ComposedData,
        ngram_context: &NgramContext,
        settings: &SuggestionSettings,
        is_correction_enabled: bool,
        input_style: InputStyle,
        sequence_number: i32,
    ) -> SuggestedWords {
        let typed = composed.typed_word.as_str();
        let results = self.dictionary.suggestions(composed, ngram_context, settings);
        let raw_suggestions = results.raw_suggestions;
        let mut candidates = results.suggestions;
        candidates.sort_by(|a, b| b.score.cmp(&a.score));
        recapitalize_candidates(composed, &mut candidates);
        SuggestedWords::remove_dups(Some(typed), &mut candidates);

        let typed_word_valid = !typed.is_empty()
            && (self.dictionary.is_valid_word(typed)
                || candidates
                    .iter()
                    .any(|info| info.word == typed && info.flags.exact_match));

        let will_auto_correct = is_correction_enabled
            && settings.auto_correction_enabled
            && !typed_word_valid
            && self.has_auto_correction(typed, candidates.first());

        let typed_word_info = SuggestedWordInfo::typed(typed);
        let mut suggestions = Vec::with_capacity(candidates.len() + 1);
        suggestions.push(typed_word_info.clone());
        suggestions.extend(candidates);
        suggestions.truncate(MAX_SUGGESTIONS);

        SuggestedWords {
            suggestions,
            raw_suggestions,
            typed_word_info: Some(typed_word_info),
            typed_word_valid,
            will_auto_correct,
            is_obsolete: false,
            input_style,
            sequence_number,
        }
    }

    /// Batch input has no typed word and never auto-corrects; the top
    /// dictionary result is the word.
    fn suggested_words_for_batch_input(
        &self,
        composed: &ComposedData,
        ngram_context: &NgramContext,
        settings: &SuggestionSettings,
        input_style: InputStyle,
        sequence_number: i32,
    ) -> SuggestedWords {
        let results = self.dictionary.suggestions(composed, ngram_context, settings);
        let raw_suggestions = results.raw_suggestions;
        let mut suggestions = results.suggestions;
        suggestions.sort_by(|a, b| b.score.cmp(&a.score));
        recapitalize_candidates(composed, &mut suggestions);
        SuggestedWords::remove_dups(None, &mut suggestions);
        suggestions.truncate(MAX_SUGGESTIONS);

        SuggestedWords {
            suggestions,
            raw_suggestions,
            typed_word_info: None,
            typed_word_valid: false,
            will_auto_correct: false,
            is_obsolete: false,
            input_style,
            sequence_number,
        }
    }

    fn has_auto_correction(&self, typed: &str, top: Option<&SuggestedWordInfo>) -> bool {
        let Some(top) = top else { return false };
        if !top.flags.appropriate_for_auto_correction {
            return false;
        }
        if top.is_kind_of(SuggestionKind::Whitelist) {
            return true;
        }
        normalized_score(typed, &top.word, top.score) >= self.auto_correction_threshold
    }

    /// Advisory check used when deciding whether a resumed or recovered
    /// word is worth keeping as a suggestion at all.
    pub fn is_plausible_suggestion(&self, typed: &str, info: &SuggestedWordInfo) -> bool {
        info.flags.exact_match
            || normalized_score(typed, &info.word, info.score) >= self.plausibility_threshold
    }
}

/// Re-apply the case the user typed with to dictionary candidates, which
/// come back lowercased.
fn recapitalize_candidates(composed: &ComposedData, candidates: &mut [SuggestedWordInfo]) {
    if composed.is_all_upper_case {
        for info in candidates.iter_mut() {
            info.word = info.word.to_uppercase();
        }
    } else if composed.is_only_first_char_capitalized {
        for info in candidates.iter_mut() {
            info.word = capitalize_first(&info.word);
        }
    }
}

fn capitalize_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Weight a raw dictionary score by how far the candidate strays from what
/// was typed. Returns a value in 0.0..=1.0.
pub fn normalized_score(typed: &str, suggested: &str, score: i32) -> f32 {
    if score <= 0 || typed.is_empty() || suggested.is_empty() {
        return 0.0;
    }
    let distance = edit_distance(typed, suggested);
    let suggested_len = suggested.chars().count();
    if distance >= suggested_len {
        return 0.0;
    }
    let distance_weight = 1.0 - distance as f32 / suggested_len as f32;
    distance_weight * (score.min(MAX_DICTIONARY_SCORE) as f32 / MAX_DICTIONARY_SCORE as f32)
}

/// Edit distance counting an adjacent transposition as a single edit, so
/// the common swap typo ("teh" for "the") stays within correction reach.
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }
    let mut two_rows_up: Vec<usize> = vec![0; b.len() + 1];
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current: Vec<usize> = vec![0; b.len() + 1];
    for i in 1..=a.len() {
        current[0] = i;
        for j in 1..=b.len() {
            let substitution = previous[j - 1] + usize::from(a[i - 1] != b[j - 1]);
            current[j] = substitution.min(previous[j] + 1).min(current[j - 1] + 1);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                current[j] = current[j].min(two_rows_up[j - 2] + 1);
            }
        }
        std::mem::swap(&mut two_rows_up, &mut previous);
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}
