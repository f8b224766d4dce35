//! liblatin
//!
//! Composition and suggestion engine for Latin-script software keyboards:
//! keystroke events in, committed text and ranked suggestions out.
//!
//! The engine composes a word from a stream of events (taps, dead keys,
//! gestures), queries a pluggable dictionary on a worker thread, and
//! manages the commit protocol around it: automatic spaces, auto
//! correction, double-space-to-period, and single-step reverts of all of
//! the above.
//!
//! Public API:
//! - `InputLogic` - The per-keystroke state machine driving an editor
//! - `WordComposer` - The word under composition
//! - `Suggest` - Dictionary results ranked and vetted
//! - `Dictionary` / `EditorConnection` - The two embedder-provided seams
//! - `Config` - Configuration and feature flags
use serde::{Deserialize, Serialize};

pub mod event;
pub use event::{Event, EventKind, FunctionalKey};

pub mod combiner;
pub use combiner::{Combiner, CombinerChain, DeadKeyCombiner, TransformCombiner};

pub mod ngram;
pub use ngram::{ngram_context_from_text, NgramContext, WordInfo};

pub mod word_composer;
pub use word_composer::{CapsMode, ComposedData, InputPointers, WordComposer};

pub mod last_composed_word;
pub use last_composed_word::{CommitKind, LastComposedWord};

pub mod suggested_words;
pub use suggested_words::{InputStyle, SuggestedWordInfo, SuggestedWords, SuggestionKind};

pub mod dictionary;
pub use dictionary::{Dictionary, SuggestionSettings, UnlearnKind};

pub mod editor;
pub use editor::{BufferEditor, EditorAction, EditorConnection, WordRange};

pub mod suggest;
pub use suggest::Suggest;

pub mod transaction;
pub use transaction::{InputTransaction, ShiftUpdate, SpaceState};

pub mod handler;
pub use handler::{InputLogicHandler, SuggestionRequest, SuggestionResponse};

pub mod input_logic;
pub use input_logic::InputLogic;

/// Engine configuration and feature flags.
///
/// Designed to be deserialized from TOML (via `serde`). The character-class
/// fields describe the active layout's language; the defaults suit English
/// on a QWERTY layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Whether auto correction may replace the typed word on commit.
    pub auto_correction_enabled: bool,
    /// Normalized-score floor a candidate must clear to auto-correct.
    pub auto_correction_threshold: f32,
    /// Normalized-score floor for keeping marginal suggestions around.
    pub plausibility_threshold: f32,
    /// Whether suggestions are computed and shown at all.
    pub suggestions_enabled: bool,
    /// Drop possibly-offensive words from suggestions and learning.
    pub block_offensive: bool,
    /// Whether two quick spaces become a period plus a space.
    pub double_space_period_enabled: bool,
    /// How close together the two spaces must land, in milliseconds.
    pub double_space_period_timeout_ms: u64,
    /// False for languages written without inter-word spaces.
    pub current_language_has_spaces: bool,
    /// Whether the engine inserts phantom spaces around commits.
    pub insert_spaces_automatically: bool,
    /// Code points that end a word when typed.
    pub word_separators: String,
    /// Code points that join word parts without ending the word.
    pub word_connectors: String,
    /// Separators normally written with a space after them.
    pub separators_followed_by_space: String,
    /// Separators normally written with a space before them.
    pub separators_preceded_by_space: String,
    /// Separators that may swap with a just-typed space.
    pub space_swappers: String,
    /// The sentence-ending punctuation double-space produces.
    pub sentence_separator: char,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auto_correction_enabled: true,
            auto_correction_threshold: 0.185,
            plausibility_threshold: 0.065,
            suggestions_enabled: true,
            block_offensive: true,
            double_space_period_enabled: true,
            double_space_period_timeout_ms: 1100,
            current_language_has_spaces: true,
            insert_spaces_automatically: true,
            word_separators: " .,;:!?\"()[]{}<>\n\t".to_string(),
            word_connectors: "'-".to_string(),
            separators_followed_by_space: " .,;:!?)]}".to_string(),
            separators_preceded_by_space: "([{".to_string(),
            space_swappers: ".,;:!?".to_string(),
            sentence_separator: '.',
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<std::path::Path>>(
        path: P,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    pub fn is_word_separator(&self, cp: char) -> bool {
        self.word_separators.contains(cp)
    }

    pub fn is_word_connector(&self, cp: char) -> bool {
        self.word_connectors.contains(cp)
    }

    /// Whether a code point can be part of a word in the active language.
    pub fn is_word_code_point(&self, cp: char) -> bool {
        cp.is_alphanumeric() || self.is_word_connector(cp)
    }

    pub fn is_usually_followed_by_space(&self, cp: char) -> bool {
        self.separators_followed_by_space.contains(cp)
    }

    pub fn is_usually_preceded_by_space(&self, cp: char) -> bool {
        self.separators_preceded_by_space.contains(cp)
    }

    /// Whether a separator may swap with the weak space before it.
    pub fn is_space_swapper(&self, cp: char) -> bool {
        self.space_swappers.contains(cp)
    }

    pub fn needs_to_lookup_suggestions(&self) -> bool {
        self.suggestions_enabled || self.auto_correction_enabled
    }
}

/// UTF-16 index arithmetic over Rust strings.
///
/// Editors address text in UTF-16 units, so every length and offset that
/// crosses the editor seam goes through these.
pub mod utils {
    /// Length of `s` in UTF-16 units.
    pub fn utf16_len(s: &str) -> usize {
        s.chars().map(char::len_utf16).sum()
    }

    /// Byte offset of the UTF-16 index `units` into `s`. `None` when the
    /// index is past the end or would split a surrogate pair.
    pub fn byte_offset_for_utf16(s: &str, units: usize) -> Option<usize> {
        let mut seen = 0usize;
        for (byte_index, cp) in s.char_indices() {
            if seen == units {
                return Some(byte_index);
            }
            if seen > units {
                return None;
            }
            seen += cp.len_utf16();
        }
        (seen == units).then_some(s.len())
    }

    /// Like [`byte_offset_for_utf16`], but clamps past-the-end indexes to
    /// the end and rounds a surrogate split down to the pair's start.
    pub fn byte_offset_for_utf16_clamped(s: &str, units: usize) -> usize {
        let mut seen = 0usize;
        for (byte_index, cp) in s.char_indices() {
            if units < seen + cp.len_utf16() {
                return byte_index;
            }
            seen += cp.len_utf16();
        }
        s.len()
    }
}
