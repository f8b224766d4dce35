//! Shared test fixtures: a scriptable dictionary that records what the
//! engine learns and unlearns.

// Each test binary uses its own subset of the fixture.
#![allow(dead_code)]

use std::sync::Mutex;

use anyhow::Result;
use liblatin::dictionary::{SuggestionResults, SuggestionSettings};
use liblatin::suggested_words::SuggestionFlags;
use liblatin::{
    ComposedData, Dictionary, NgramContext, SuggestedWordInfo, SuggestionKind, UnlearnKind,
};

#[derive(Default)]
pub struct FakeDictionary {
    corrections: Vec<(String, String, i32)>,
    gesture_results: Vec<(String, i32)>,
    valid: Vec<String>,
    pub learned: Mutex<Vec<String>>,
    pub unlearned: Mutex<Vec<(String, UnlearnKind)>>,
}

impl FakeDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `word` as a correction candidate whenever `typed` is composed.
    pub fn correction(mut self, typed: &str, word: &str, score: i32) -> Self {
        self.corrections
            .push((typed.to_string(), word.to_string(), score));
        self
    }

    /// Serve `word` for gesture (batch) queries.
    pub fn gesture(mut self, word: &str, score: i32) -> Self {
        self.gesture_results.push((word.to_string(), score));
        self
    }

    pub fn valid_word(mut self, word: &str) -> Self {
        self.valid.push(word.to_string());
        self
    }
}

fn correction_info(word: &str, score: i32) -> SuggestedWordInfo {
    SuggestedWordInfo::new(word, "", score, SuggestionKind::Correction).with_flags(
        SuggestionFlags {
            appropriate_for_auto_correction: true,
            ..SuggestionFlags::default()
        },
    )
}

impl Dictionary for FakeDictionary {
    fn suggestions(
        &self,
        composed: &ComposedData,
        _ngram_context: &NgramContext,
        _settings: &SuggestionSettings,
    ) -> SuggestionResults {
        let suggestions = if composed.is_batch_mode {
            self.gesture_results
                .iter()
                .map(|(word, score)| correction_info(word, *score))
                .collect()
        } else {
            let typed = composed.typed_word.to_lowercase();
            self.corrections
                .iter()
                .filter(|(from, _, _)| *from == typed)
                .map(|(_, word, score)| correction_info(word, *score))
                .collect()
        };
        SuggestionResults {
            suggestions,
            raw_suggestions: None,
        }
    }

    fn is_valid_word(&self, word: &str) -> bool {
        self.valid.iter().any(|w| w == word)
    }

    fn learn(&self, word: &str, _: &NgramContext, _: u64, _: bool) -> Result<()> {
        self.learned.lock().unwrap().push(word.to_string());
        Ok(())
    }

    fn unlearn(&self, word: &str, _: &NgramContext, kind: UnlearnKind) -> Result<()> {
        self.unlearned.lock().unwrap().push((word.to_string(), kind));
        Ok(())
    }
}
