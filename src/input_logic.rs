//! The per-keystroke state machine tying everything together.
//!
//! `InputLogic` owns the word composer, the suggestion handler, the space
//! state and the revert record, and drives the editor connection. Events
//! arrive strictly in order on the caller's thread; suggestion results
//! come back through [`poll_suggestions`](InputLogic::poll_suggestions)
//! on that same thread, where staleness is decided.

use std::sync::Arc;

use tracing::warn;

use crate::dictionary::{Dictionary, SuggestionSettings, UnlearnKind};
use crate::editor::EditorConnection;
use crate::event::{Event, FunctionalKey};
use crate::handler::{InputLogicHandler, SuggestionRequest, SuggestionResponse};
use crate::last_composed_word::{CommitKind, LastComposedWord, NOT_A_SEPARATOR};
use crate::suggest::Suggest;
use crate::suggested_words::{
    InputStyle, SuggestedWords, INDEX_OF_AUTO_CORRECTION, NOT_A_SEQUENCE_NUMBER,
};
use crate::transaction::{InputTransaction, ShiftUpdate, SpaceState};
use crate::utils;
use crate::word_composer::{CapsMode, InputPointers, WordComposer, MAX_WORD_LENGTH};
use crate::Config;

/// After this many uninterrupted backspaces, deletion speeds up and the
/// words being chewed through are unlearned.
const DELETE_ACCELERATE_AT: u32 = 20;

pub struct InputLogic<E: EditorConnection> {
    connection: E,
    dictionary: Arc<dyn Dictionary>,
    suggest: Arc<Suggest>,
    handler: InputLogicHandler,
    word_composer: WordComposer,
    suggested_words: SuggestedWords,
    last_composed_word: Option<LastComposedWord>,
    space_state: SpaceState,
    delete_count: u32,
    double_space_start_ms: Option<u64>,
    /// Multi-character text committed whole, cancellable by one backspace.
    entered_text: Option<String>,
    /// Staleness tag for gesture suggestion results.
    batch_sequence_number: i32,
    pending_requests: usize,
}

impl<E: EditorConnection> InputLogic<E> {
    pub fn new(connection: E, dictionary: Arc<dyn Dictionary>, config: &Config) -> Self {
        let suggest = Arc::new(Suggest::new(
            dictionary.clone(),
            config.auto_correction_threshold,
            config.plausibility_threshold,
        ));
        let handler = InputLogicHandler::new(suggest.clone());
        Self {
            connection,
            dictionary,
            suggest,
            handler,
            word_composer: WordComposer::new(),
            suggested_words: SuggestedWords::empty(),
            last_composed_word: None,
            space_state: SpaceState::None,
            delete_count: 0,
            double_space_start_ms: None,
            entered_text: None,
            batch_sequence_number: 0,
            pending_requests: 0,
        }
    }

    /// Called when a new editor session begins. Clears every piece of
    /// state tied to the previous field.
    pub fn start_input(&mut self, combining_spec: Option<&str>) {
        self.entered_text = None;
        self.word_composer.restart_combining(combining_spec);
        self.reset_composing_state(true);
        self.set_suggested_words(SuggestedWords::empty());
        self.space_state = SpaceState::None;
        self.delete_count = 0;
        self.double_space_start_ms = None;
        self.handler.invalidate_typing();
    }

    pub fn connection(&self) -> &E {
        &self.connection
    }

    pub fn connection_mut(&mut self) -> &mut E {
        &mut self.connection
    }

    pub fn suggested_words(&self) -> &SuggestedWords {
        &self.suggested_words
    }

    pub fn is_composing(&self) -> bool {
        self.word_composer.is_composing()
    }

    pub fn composing_word(&self) -> &str {
        self.word_composer.typed_word()
    }

    pub fn space_state(&self) -> SpaceState {
        self.space_state
    }

    /// Consulted by the caps-state machine: a phantom space counts as a
    /// real space for auto-capitalization purposes.
    pub fn is_phantom_space_active(&self) -> bool {
        self.space_state == SpaceState::Phantom
    }

    /// Whether the cursor sits at a position that auto-capitalizes.
    pub fn current_auto_caps_state(&self, config: &Config) -> bool {
        if !config.current_language_has_spaces {
            return false;
        }
        let Some(before) = self.connection.text_before_cursor(8) else {
            return false;
        };
        let trimmed = before.trim_end();
        trimmed.is_empty() || trimmed.ends_with(config.sentence_separator)
    }

    /// Handle one key event. Combiners may expand the event into a chain;
    /// every link is classified and handled in order.
    pub fn on_code_input(
        &mut self,
        config: &Config,
        event: Event,
        caps: CapsMode,
        timestamp_ms: u64,
    ) -> InputTransaction {
        let mut tx = InputTransaction::new(timestamp_ms, self.space_state, caps);
        if event.key() != Some(FunctionalKey::Delete) {
            self.delete_count = 0;
            // Any key other than backspace ends the window in which a
            // multi-character input can be taken back whole.
            self.entered_text = None;
        }
        self.word_composer
            .advise_caps_mode_before_fetching_suggestions(caps);
        self.connection.begin_batch_edit();
        // The processed event's `next` is provenance for the event log,
        // not a second event to handle; only the head acts on the editor.
        let processed = self.word_composer.process_event(event);
        if processed.is_consumed() {
            self.handle_consumed_event(&processed, &mut tx);
        } else if processed.is_functional_key_event() {
            self.handle_functional_event(config, &processed, caps, timestamp_ms, &mut tx);
        } else {
            self.handle_non_functional_event(config, &processed, caps, timestamp_ms, &mut tx);
        }
        self.connection.end_batch_edit();
        if tx.requires_update_suggestions() {
            self.post_update_suggestions(config, InputStyle::Typing);
        }
        // Anything that can change the editor contents makes the revert
        // record unsafe to use. Mode keys leave both the text and the
        // record alone, so "auto-correct, shift, backspace" still reverts.
        let keeps_revert_record = matches!(
            processed.key(),
            Some(FunctionalKey::Shift | FunctionalKey::CapsLock | FunctionalKey::SymbolSwitch)
        );
        if !tx.did_auto_correct() && !keeps_revert_record {
            if let Some(last) = &mut self.last_composed_word {
                last.deactivate();
            }
        }
        tx
    }

    /// Commit a multi-character string, like a ".com" key or a clipboard
    /// paste routed through the keyboard.
    pub fn on_text_input(
        &mut self,
        config: &Config,
        text: &str,
        caps: CapsMode,
        timestamp_ms: u64,
    ) -> InputTransaction {
        let mut tx = InputTransaction::new(timestamp_ms, self.space_state, caps);
        self.connection.begin_batch_edit();
        self.text_input_inner(config, text, timestamp_ms, &mut tx);
        self.connection.end_batch_edit();
        if let Some(last) = &mut self.last_composed_word {
            last.deactivate();
        }
        tx
    }

    fn text_input_inner(
        &mut self,
        config: &Config,
        text: &str,
        timestamp_ms: u64,
        tx: &mut InputTransaction,
    ) {
        if self.word_composer.is_composing() {
            if config.auto_correction_enabled {
                self.commit_current_auto_correction(config, text, timestamp_ms);
            } else {
                self.commit_typed(config, text, timestamp_ms);
            }
        } else {
            self.reset_composing_state(true);
        }
        let processed = self.perform_tld_processing(text);
        if tx.space_state_at_start == SpaceState::Phantom {
            if let Some(first) = processed.chars().next() {
                if !config.is_word_separator(first) {
                    self.insert_automatic_space_if_allowed(config);
                }
            }
        }
        self.connection.commit_text(&processed);
        self.entered_text = Some(processed);
        self.space_state = SpaceState::None;
        self.double_space_start_ms = None;
        tx.set_did_affect_contents();
        tx.require_shift_update(ShiftUpdate::Now);
    }

    /// A period-leading string typed right after a period drops its own
    /// leading period, so ".com" after "www." gives "www.com".
    fn perform_tld_processing(&mut self, text: &str) -> String {
        let mut chars = text.chars();
        if chars.next() == Some('.')
            && chars.next().is_some_and(char::is_alphabetic)
            && self.connection.code_point_before_cursor() == Some('.')
        {
            return text[1..].to_string();
        }
        text.to_string()
    }

    /// A suggestion picked from the strip by hand.
    pub fn on_pick_suggestion_manually(
        &mut self,
        config: &Config,
        word: &str,
        caps: CapsMode,
        timestamp_ms: u64,
    ) -> InputTransaction {
        let mut single = word.chars();
        if let (Some(cp), None) = (single.next(), single.next()) {
            // Punctuation keys on the strip behave like ordinary key
            // presses, including space stripping and swapping.
            if config.is_word_separator(cp) {
                return self.on_code_input(config, Event::punctuation_picked(cp), caps, timestamp_ms);
            }
        }
        let mut tx = InputTransaction::new(timestamp_ms, self.space_state, caps);
        self.entered_text = None;
        self.connection.begin_batch_edit();
        if tx.space_state_at_start == SpaceState::Phantom {
            if let Some(first) = word.chars().next() {
                if !config.is_word_separator(first) || config.is_usually_preceded_by_space(first) {
                    self.insert_automatic_space_if_allowed(config);
                }
            }
        }
        self.commit_chosen_word(config, word, CommitKind::ManualPick, NOT_A_SEPARATOR, timestamp_ms);
        self.connection.end_batch_edit();
        self.suggested_words = SuggestedWords::empty();
        self.space_state = SpaceState::Phantom;
        tx.set_did_affect_contents();
        tx.require_shift_update(ShiftUpdate::Now);
        tx
    }

    /// The editor reported a cursor move the engine did not cause. Keeps
    /// composing when the cursor stayed inside the word, resets otherwise.
    pub fn on_update_selection(
        &mut self,
        config: &Config,
        old_sel_start: usize,
        new_sel_start: usize,
        new_sel_end: usize,
    ) {
        self.space_state = SpaceState::None;
        self.double_space_start_ms = None;
        if let Some(last) = &mut self.last_composed_word {
            last.deactivate();
        }
        let move_amount = new_sel_start as i64 - old_sel_start as i64;
        let still_inside = self.word_composer.is_composing()
            && new_sel_start == new_sel_end
            && i32::try_from(move_amount)
                .is_ok_and(|amount| self.word_composer.move_cursor_by(amount));
        if still_inside {
            self.connection
                .reset_caches_on_cursor_move(new_sel_start, new_sel_end, false);
        } else {
            self.reset_entire_input_state(config, new_sel_start, new_sel_end, false);
        }
    }

    /// Bounded retry for an editor that cannot answer yet. Returns false
    /// when the caller should re-post with one fewer remaining try.
    pub fn retry_reset_caches(
        &mut self,
        config: &Config,
        try_resume_suggestions: bool,
        remaining_tries: u32,
    ) -> bool {
        let start = self.connection.selection_start().unwrap_or(0);
        let end = self.connection.selection_end().unwrap_or(start);
        if !self.connection.reset_caches_on_cursor_move(start, end, false) {
            if remaining_tries > 0 {
                return false;
            }
            // Budget exhausted, carry on without cursor-dependent features.
            return true;
        }
        if try_resume_suggestions {
            self.restart_suggestions_on_word_touched_by_cursor(config);
        }
        true
    }

    // ----- gesture (batch) input -----

    pub fn on_start_batch_input(&mut self, config: &Config, caps: CapsMode, timestamp_ms: u64) {
        self.handler.invalidate_typing();
        self.entered_text = None;
        self.connection.begin_batch_edit();
        if self.word_composer.is_composing() {
            if self.word_composer.is_single_letter() && config.auto_correction_enabled {
                self.commit_current_auto_correction(config, NOT_A_SEPARATOR, timestamp_ms);
            } else {
                self.commit_typed(config, NOT_A_SEPARATOR, timestamp_ms);
            }
        }
        if self
            .connection
            .code_point_before_cursor()
            .is_some_and(char::is_alphanumeric)
        {
            self.space_state = SpaceState::Phantom;
        }
        self.connection.end_batch_edit();
        self.batch_sequence_number = self.batch_sequence_number.wrapping_add(1);
        self.word_composer.set_caps_mode_at_start(caps);
    }

    pub fn on_update_batch_input(&mut self, config: &Config, pointers: &InputPointers) {
        self.word_composer.set_batch_input_pointers(pointers);
        self.post_batch_request(config, InputStyle::UpdateBatch);
    }

    pub fn on_end_batch_input(&mut self, config: &Config, pointers: &InputPointers) {
        self.word_composer.set_batch_input_pointers(pointers);
        self.post_batch_request(config, InputStyle::TailBatch);
    }

    pub fn on_cancel_batch_input(&mut self) {
        // Bumping the sequence orphans every in-flight gesture result.
        self.batch_sequence_number = self.batch_sequence_number.wrapping_add(1);
        self.word_composer.reset();
        self.connection.set_composing_text("");
        self.set_suggested_words(SuggestedWords::empty());
    }

    // ----- asynchronous suggestion delivery -----

    /// Drain worker results and apply the ones that are still current.
    /// Stale gesture results (wrong sequence number) and superseded typing
    /// results (older generation) are dropped here, not in the worker.
    pub fn poll_suggestions(&mut self, config: &Config, timestamp_ms: u64) {
        let responses = self.handler.poll();
        self.pending_requests = self.pending_requests.saturating_sub(responses.len());
        self.apply_responses(config, responses, timestamp_ms);
    }

    /// Like [`poll_suggestions`](Self::poll_suggestions) but waits for
    /// every posted request to be answered first.
    pub fn await_suggestions(&mut self, config: &Config, timestamp_ms: u64) {
        let responses = self.handler.poll_blocking(self.pending_requests);
        self.pending_requests = 0;
        self.apply_responses(config, responses, timestamp_ms);
    }

    fn apply_responses(
        &mut self,
        config: &Config,
        responses: Vec<SuggestionResponse>,
        timestamp_ms: u64,
    ) {
        let current_generation = self.handler.typing_generation();
        for response in responses {
            let words = response.words;
            if words.input_style.is_batch() {
                if words.sequence_number != self.batch_sequence_number {
                    continue;
                }
                if words.input_style == InputStyle::TailBatch {
                    self.apply_tail_batch(config, words, timestamp_ms);
                } else {
                    self.set_suggested_words(words);
                }
            } else {
                if response.typing_generation != current_generation {
                    continue;
                }
                self.apply_typing_suggestions(words);
            }
        }
    }

    fn apply_typing_suggestions(&mut self, words: SuggestedWords) {
        // A near-empty fresh list under a still-long typed word would make
        // the strip flicker; splice the old entries under the new typed
        // word instead.
        let words = if words.suggestions.len() <= 1
            && self.word_composer.typed_word().chars().count() > 1
            && !self.suggested_words.is_obsolete
        {
            match &words.typed_word_info {
                Some(typed) => SuggestedWords::retrieve_older_suggestions(typed, &self.suggested_words),
                None => words,
            }
        } else {
            words
        };
        self.set_suggested_words(words);
    }

    fn apply_tail_batch(&mut self, config: &Config, words: SuggestedWords, _timestamp_ms: u64) {
        let Some(word) = words.word_at(0).map(str::to_string) else {
            self.word_composer.reset();
            self.connection.set_composing_text("");
            return;
        };
        if self.word_composer.rejected_batch_mode_suggestion() == Some(word.as_str()) {
            return;
        }
        self.connection.begin_batch_edit();
        if self.space_state == SpaceState::Phantom {
            self.insert_automatic_space_if_allowed(config);
        }
        self.word_composer.set_batch_input_word(&word);
        self.connection.set_composing_text(&word);
        self.connection.end_batch_edit();
        self.space_state = SpaceState::Phantom;
        self.set_suggested_words(words);
    }

    fn set_suggested_words(&mut self, words: SuggestedWords) {
        if !words.is_empty() {
            let auto_correction = if words.will_auto_correct {
                words.info_at(INDEX_OF_AUTO_CORRECTION).cloned()
            } else {
                words.typed_word_info.clone()
            };
            self.word_composer.set_auto_correction(auto_correction);
        }
        self.suggested_words = words;
    }

    fn post_update_suggestions(&mut self, config: &Config, input_style: InputStyle) {
        if !config.needs_to_lookup_suggestions() {
            self.set_suggested_words(SuggestedWords::empty());
            return;
        }
        let request = self.build_request(config, input_style, NOT_A_SEQUENCE_NUMBER);
        self.handler.post_update_suggestions(request);
        self.pending_requests += 1;
    }

    fn post_batch_request(&mut self, config: &Config, input_style: InputStyle) {
        if !config.needs_to_lookup_suggestions() {
            return;
        }
        let request = self.build_request(config, input_style, self.batch_sequence_number);
        self.handler.post_batch_suggestions(request);
        self.pending_requests += 1;
    }

    fn build_request(
        &mut self,
        config: &Config,
        input_style: InputStyle,
        sequence_number: i32,
    ) -> SuggestionRequest {
        SuggestionRequest {
            composed: self.word_composer.composed_data(),
            ngram_context: self.connection.ngram_context_from_nth_previous_word(
                config,
                if self.word_composer.is_composing() { 2 } else { 1 },
            ),
            settings: SuggestionSettings {
                block_possibly_offensive: config.block_offensive,
                auto_correction_enabled: config.auto_correction_enabled,
            },
            is_correction_enabled: config.auto_correction_enabled,
            input_style,
            sequence_number,
            typing_generation: 0,
        }
    }

    /// Compute suggestions on the calling thread, for commits that need a
    /// fresh auto-correction right now.
    fn update_suggestions_sync(&mut self, config: &Config) {
        if !config.needs_to_lookup_suggestions() {
            return;
        }
        self.handler.invalidate_typing();
        let request = self.build_request(config, InputStyle::Typing, NOT_A_SEQUENCE_NUMBER);
        let words = self.suggest.suggested_words(
            &request.composed,
            &request.ngram_context,
            &request.settings,
            request.is_correction_enabled,
            request.input_style,
            request.sequence_number,
        );
        self.apply_typing_suggestions(words);
    }

    // ----- event classification handlers -----

    fn handle_consumed_event(&mut self, event: &Event, tx: &mut InputTransaction) {
        self.word_composer.apply_processed_event(event);
        self.connection
            .set_composing_text(self.word_composer.typed_word());
        tx.set_did_affect_contents();
        tx.set_requires_update_suggestions();
    }

    fn handle_functional_event(
        &mut self,
        config: &Config,
        event: &Event,
        _caps: CapsMode,
        timestamp_ms: u64,
        tx: &mut InputTransaction,
    ) {
        let Some(key) = event.key() else { return };
        match key {
            FunctionalKey::Delete => self.handle_backspace_event(config, event, timestamp_ms, tx),
            FunctionalKey::Shift | FunctionalKey::CapsLock => {
                tx.require_shift_update(ShiftUpdate::Now);
            }
            FunctionalKey::SymbolSwitch
            | FunctionalKey::LanguageSwitch
            | FunctionalKey::Emoji => {
                self.commit_typed(config, NOT_A_SEPARATOR, timestamp_ms);
            }
            FunctionalKey::ActionNext => {
                self.commit_typed(config, NOT_A_SEPARATOR, timestamp_ms);
                if let Some(action) = self.connection.editor_action() {
                    self.connection.perform_editor_action(action);
                } else {
                    self.connection
                        .perform_editor_action(crate::editor::EditorAction::Next);
                }
            }
            FunctionalKey::ActionPrevious => {
                self.commit_typed(config, NOT_A_SEPARATOR, timestamp_ms);
                self.connection
                    .perform_editor_action(crate::editor::EditorAction::Previous);
            }
            FunctionalKey::ShiftEnter => {
                self.commit_typed(config, NOT_A_SEPARATOR, timestamp_ms);
                self.connection.commit_text("\n");
                self.space_state = SpaceState::None;
                tx.set_did_affect_contents();
                tx.require_shift_update(ShiftUpdate::Now);
            }
            FunctionalKey::OutputText => {
                if let Some(text) = event.text.clone() {
                    self.text_input_inner(config, &text, timestamp_ms, tx);
                }
            }
        }
    }

    fn handle_non_functional_event(
        &mut self,
        config: &Config,
        event: &Event,
        caps: CapsMode,
        timestamp_ms: u64,
        tx: &mut InputTransaction,
    ) {
        let Some(cp) = event.code_point() else { return };
        if config.is_word_separator(cp) {
            self.handle_separator_event(config, event, cp, timestamp_ms, tx);
        } else {
            self.handle_non_separator_event(config, event, cp, caps, tx);
        }
    }

    fn handle_non_separator_event(
        &mut self,
        config: &Config,
        event: &Event,
        cp: char,
        caps: CapsMode,
        tx: &mut InputTransaction,
    ) {
        if self.word_composer.is_cursor_front_or_middle_of_composing_word() {
            let start = self.connection.selection_start().unwrap_or(0);
            let end = self.connection.selection_end().unwrap_or(start);
            self.reset_entire_input_state(config, start, end, true);
        }
        let mut is_composing = self.word_composer.is_composing();
        if tx.space_state_at_start == SpaceState::Phantom
            && !is_composing
            && !config.is_word_connector(cp)
        {
            self.insert_automatic_space_if_allowed(config);
        }
        self.space_state = SpaceState::None;
        if !is_composing
            && config.is_word_code_point(cp)
            && config.needs_to_lookup_suggestions()
            && (!config.current_language_has_spaces
                || !self.connection.is_cursor_touching_word(config, true))
        {
            is_composing = true;
            self.word_composer.set_caps_mode_at_start(caps);
        }
        if is_composing {
            self.word_composer.apply_processed_event(event);
            self.connection
                .set_composing_text(self.word_composer.typed_word());
            tx.set_requires_update_suggestions();
        } else {
            self.connection.commit_text(&event.text_to_commit());
        }
        tx.set_did_affect_contents();
    }

    fn handle_separator_event(
        &mut self,
        config: &Config,
        event: &Event,
        cp: char,
        timestamp_ms: u64,
        tx: &mut InputTransaction,
    ) {
        if self.word_composer.is_cursor_front_or_middle_of_composing_word() {
            let start = self.connection.selection_start().unwrap_or(0);
            let end = self.connection.selection_end().unwrap_or(start);
            self.reset_entire_input_state(config, start, end, true);
        }
        let was_composing = self.word_composer.is_composing();
        if was_composing {
            if config.auto_correction_enabled {
                if self.commit_current_auto_correction(config, &cp.to_string(), timestamp_ms) {
                    tx.set_did_auto_correct();
                }
            } else {
                self.commit_typed(config, &cp.to_string(), timestamp_ms);
            }
        }
        let swap_weak_space = self.try_strip_space_and_return_whether_should_swap(config, event, tx);
        let needs_preceding_space = tx.space_state_at_start == SpaceState::Phantom
            && config.is_usually_preceded_by_space(cp);
        if needs_preceding_space {
            self.insert_automatic_space_if_allowed(config);
        }
        self.space_state = SpaceState::None;
        if self.try_perform_double_space_period(config, cp, timestamp_ms) {
            self.space_state = SpaceState::Double;
            tx.set_requires_update_suggestions();
        } else if swap_weak_space && self.try_swap_swapper_and_space(event) {
            self.space_state = SpaceState::SwapPunctuation;
        } else if cp == ' ' {
            self.double_space_start_ms = Some(timestamp_ms);
            self.space_state = SpaceState::Weak;
            self.connection.commit_text(" ");
            if was_composing || self.suggested_words.is_empty() {
                tx.set_requires_update_suggestions();
            }
        } else {
            if tx.space_state_at_start == SpaceState::Phantom
                && config.is_usually_followed_by_space(cp)
            {
                // The phantom survives the punctuation so the next word
                // still gets its space.
                self.space_state = SpaceState::Phantom;
            }
            self.connection.commit_text(&event.text_to_commit());
        }
        tx.set_did_affect_contents();
        tx.require_shift_update(ShiftUpdate::Now);
    }

    fn handle_backspace_event(
        &mut self,
        config: &Config,
        event: &Event,
        timestamp_ms: u64,
        tx: &mut InputTransaction,
    ) {
        self.delete_count += 1;
        tx.require_shift_update(if event.is_key_repeat {
            ShiftUpdate::Later
        } else {
            ShiftUpdate::Now
        });
        self.space_state = SpaceState::None;
        if self.word_composer.is_cursor_front_or_middle_of_composing_word() {
            let start = self.connection.selection_start().unwrap_or(0);
            let end = self.connection.selection_end().unwrap_or(start);
            self.reset_entire_input_state(config, start, end, true);
        }
        if self.word_composer.is_composing() {
            if self.word_composer.is_batch_mode() {
                // Backspace right after a gesture rejects the whole word.
                let rejected = self.word_composer.typed_word().to_string();
                self.word_composer.reset();
                self.word_composer
                    .set_rejected_batch_mode_suggestion(Some(rejected.clone()));
                if !rejected.is_empty() {
                    self.unlearn_word(config, &rejected, UnlearnKind::Rejection);
                }
                self.connection.set_composing_text("");
            } else {
                self.word_composer.apply_processed_event(event);
                self.connection
                    .set_composing_text(self.word_composer.typed_word());
            }
            tx.set_did_affect_contents();
            tx.set_requires_update_suggestions();
            return;
        }
        if self
            .last_composed_word
            .as_ref()
            .is_some_and(LastComposedWord::can_revert_commit)
        {
            self.revert_commit(config, tx);
            tx.set_did_affect_contents();
            return;
        }
        if let Some(entered) = self.entered_text.clone() {
            if self.connection.same_as_text_before_cursor(&entered) {
                self.connection
                    .delete_text_before_cursor(utils::utf16_len(&entered));
                self.entered_text = None;
                tx.set_did_affect_contents();
                return;
            }
            self.entered_text = None;
        }
        if tx.space_state_at_start == SpaceState::Double {
            self.double_space_start_ms = None;
            if self.revert_double_space_period(config) {
                self.space_state = SpaceState::Weak;
                tx.set_did_affect_contents();
                return;
            }
        }
        if tx.space_state_at_start == SpaceState::SwapPunctuation && self.revert_swap_punctuation()
        {
            tx.set_did_affect_contents();
            return;
        }
        if self.connection.has_selection() {
            if let Some(selected) = self.connection.selected_text() {
                let trimmed = selected.trim();
                if !trimmed.is_empty() && trimmed.chars().all(|c| config.is_word_code_point(c)) {
                    self.unlearn_word(config, trimmed, UnlearnKind::Backspace);
                }
            }
            // Hosts may report the selection ends in either order.
            let start = self.connection.selection_start().unwrap_or(0);
            let end = self.connection.selection_end().unwrap_or(start);
            let caret = start.max(end);
            self.connection.set_selection(caret, caret);
            self.connection.delete_text_before_cursor(start.abs_diff(end));
            tx.set_did_affect_contents();
        } else {
            if self.delete_count > DELETE_ACCELERATE_AT {
                self.unlearn_word_being_deleted(config);
            }
            let Some(before) = self.connection.code_point_before_cursor() else {
                return;
            };
            self.connection.delete_text_before_cursor(before.len_utf16());
            if self.delete_count > DELETE_ACCELERATE_AT {
                if let Some(extra) = self.connection.code_point_before_cursor() {
                    self.connection.delete_text_before_cursor(extra.len_utf16());
                }
            }
            tx.set_did_affect_contents();
        }
        tx.set_requires_update_suggestions();
        if config.suggestions_enabled
            && config.current_language_has_spaces
            && !self.connection.is_cursor_followed_by_word_char(config)
        {
            self.restart_suggestions_on_word_touched_by_cursor(config);
        }
    }

    // ----- space stripping, swapping, double-space period -----

    fn try_strip_space_and_return_whether_should_swap(
        &mut self,
        config: &Config,
        event: &Event,
        tx: &InputTransaction,
    ) -> bool {
        let Some(cp) = event.code_point() else { return false };
        if cp == '\n' && tx.space_state_at_start == SpaceState::SwapPunctuation {
            self.connection.remove_trailing_space();
            return false;
        }
        if matches!(
            tx.space_state_at_start,
            SpaceState::Weak | SpaceState::SwapPunctuation
        ) && event.is_suggestion_strip_press()
        {
            if config.is_usually_preceded_by_space(cp) {
                return false;
            }
            if config.is_space_swapper(cp) {
                return true;
            }
            self.connection.remove_trailing_space();
        }
        false
    }

    fn try_swap_swapper_and_space(&mut self, event: &Event) -> bool {
        if self.connection.code_point_before_cursor() != Some(' ') {
            return false;
        }
        self.connection.delete_text_before_cursor(1);
        self.connection
            .commit_text(&format!("{} ", event.text_to_commit()));
        true
    }

    fn try_perform_double_space_period(
        &mut self,
        config: &Config,
        cp: char,
        timestamp_ms: u64,
    ) -> bool {
        if !config.double_space_period_enabled || cp != ' ' {
            return false;
        }
        let active = self.double_space_start_ms.is_some_and(|start| {
            timestamp_ms.saturating_sub(start) < config.double_space_period_timeout_ms
        });
        if !active {
            return false;
        }
        self.double_space_start_ms = None;
        let Some(last_two) = self.connection.text_before_cursor(2) else {
            return false;
        };
        let mut chars = last_two.chars();
        let (Some(first), Some(second), None) = (chars.next(), chars.next(), chars.next()) else {
            return false;
        };
        if second != ' ' || !can_be_followed_by_double_space_period(first) {
            return false;
        }
        self.connection.delete_text_before_cursor(1);
        self.connection
            .commit_text(&format!("{} ", config.sentence_separator));
        true
    }

    fn revert_double_space_period(&mut self, config: &Config) -> bool {
        let expected = format!("{} ", config.sentence_separator);
        if self.connection.text_before_cursor(2).as_deref() != Some(expected.as_str()) {
            return false;
        }
        self.connection.delete_text_before_cursor(2);
        self.connection.commit_text("  ");
        true
    }

    fn revert_swap_punctuation(&mut self) -> bool {
        let Some(before) = self.connection.text_before_cursor(2) else {
            return false;
        };
        let mut chars = before.chars();
        let (Some(punctuation), Some(space), None) = (chars.next(), chars.next(), chars.next())
        else {
            return false;
        };
        if space != ' ' || punctuation == ' ' {
            return false;
        }
        self.connection.delete_text_before_cursor(2);
        self.connection.commit_text(&format!(" {punctuation}"));
        true
    }

    // ----- commit and revert -----

    fn commit_typed(&mut self, config: &Config, separator: &str, timestamp_ms: u64) {
        if !self.word_composer.is_composing() {
            return;
        }
        let typed = self.word_composer.typed_word().to_string();
        if !typed.is_empty() {
            self.commit_chosen_word(config, &typed, CommitKind::UserTyped, separator, timestamp_ms);
        }
    }

    /// Commit the pending auto-correction, or the typed word when there is
    /// none. Returns true when the committed text differs from the typed
    /// word.
    fn commit_current_auto_correction(
        &mut self,
        config: &Config,
        separator: &str,
        timestamp_ms: u64,
    ) -> bool {
        let typed = self.word_composer.typed_word().to_string();
        let stale = self
            .suggested_words
            .typed_word_info
            .as_ref()
            .map(|info| info.word.as_str())
            != Some(typed.as_str());
        if stale {
            self.update_suggestions_sync(config);
        }
        let chosen = self
            .word_composer
            .auto_correction()
            .map(|info| info.word.clone())
            .unwrap_or_else(|| typed.clone());
        if chosen.is_empty() {
            return false;
        }
        self.commit_chosen_word(
            config,
            &chosen,
            CommitKind::DecidedWord,
            separator,
            timestamp_ms,
        );
        chosen != typed
    }

    fn commit_chosen_word(
        &mut self,
        config: &Config,
        chosen: &str,
        kind: CommitKind,
        separator: &str,
        timestamp_ms: u64,
    ) {
        let ngram_context = self.connection.ngram_context_from_nth_previous_word(
            config,
            if self.word_composer.is_composing() { 2 } else { 1 },
        );
        self.connection.commit_text(chosen);
        self.perform_addition_to_user_history(config, chosen, &ngram_context, timestamp_ms);
        self.last_composed_word =
            Some(self.word_composer.commit_word(kind, chosen, separator, ngram_context));
        self.handler.invalidate_typing();
    }

    fn perform_addition_to_user_history(
        &mut self,
        config: &Config,
        word: &str,
        ngram_context: &crate::ngram::NgramContext,
        timestamp_ms: u64,
    ) {
        // Learning is best-effort and skipped entirely on slow editors.
        if !config.auto_correction_enabled || self.connection.is_slow() || word.is_empty() {
            return;
        }
        let word_to_learn =
            if self.word_composer.was_auto_capitalized() && !self.word_composer.is_mostly_caps() {
                word.to_lowercase()
            } else {
                word.to_string()
            };
        if let Err(err) = self.dictionary.learn(
            &word_to_learn,
            ngram_context,
            timestamp_ms,
            config.block_offensive,
        ) {
            warn!(%err, word = word_to_learn, "user history learning failed");
        }
    }

    /// Undo the last commit with a single backspace. Single use: the
    /// record is consumed whether or not the revert goes through.
    ///
    /// A space-separated revert resumes composition on the typed word
    /// without re-entering phantom space; the editor is back in the exact
    /// pre-commit state, cursor at the end of the composing word.
    fn revert_commit(&mut self, config: &Config, tx: &mut InputTransaction) {
        let Some(last) = self.last_composed_word.take() else { return };
        let expected = format!("{}{}", last.committed_word, last.separator);
        let cancel_length = utils::utf16_len(&expected);
        let before = self.connection.text_before_cursor(cancel_length);
        let matches_editor = before.as_deref() == Some(expected.as_str());
        debug_assert!(
            matches_editor,
            "revert target does not match the editor contents"
        );
        if !matches_editor {
            // Someone else edited the field; skip rather than corrupt it.
            return;
        }
        self.connection.begin_batch_edit();
        self.connection.delete_text_before_cursor(cancel_length);
        if !last.did_commit_typed_word() {
            if let Err(err) =
                self.dictionary
                    .unlearn(&last.committed_word, &last.ngram_context, UnlearnKind::Revert)
            {
                warn!(%err, word = %last.committed_word, "unlearn on revert failed");
            }
        }
        if last.separator == NOT_A_SEPARATOR || last.separator == " " {
            // The space is not reinserted; composing resumes on the
            // original typed word instead.
            self.word_composer.resume_suggestion_on_last_composed_word(&last);
            self.connection
                .set_composing_text(self.word_composer.typed_word());
            tx.set_requires_update_suggestions();
        } else {
            self.connection
                .commit_text(&format!("{}{}", last.typed_word, last.separator));
        }
        self.connection.end_batch_edit();
    }

    // ----- resuming suggestions on an already-committed word -----

    /// After a deletion or cursor move leaves the cursor on a word, pick
    /// that word back up as the composing word and refresh suggestions.
    fn restart_suggestions_on_word_touched_by_cursor(&mut self, config: &Config) {
        if !config.suggestions_enabled
            || !config.current_language_has_spaces
            || self.connection.is_slow()
        {
            return;
        }
        let Some(range) = self.connection.word_range_at_cursor(config) else {
            return;
        };
        if !is_resumable_word(config, &range.word) {
            return;
        }
        let Some(cursor) = self.connection.selection_start() else { return };
        self.word_composer.set_composing_word(&range.word, &[]);
        self.word_composer
            .set_cursor_position_within_word(range.units_before_cursor);
        self.connection.set_composing_region(
            cursor.saturating_sub(range.units_before_cursor),
            cursor + range.units_after_cursor,
        );
        self.post_update_suggestions(config, InputStyle::Recorrection);
    }

    // ----- small helpers -----

    fn insert_automatic_space_if_allowed(&mut self, config: &Config) {
        if config.insert_spaces_automatically
            && config.current_language_has_spaces
            && !self.connection.text_before_cursor_looks_like_url()
        {
            self.connection.commit_text(" ");
        }
    }

    fn unlearn_word_being_deleted(&mut self, config: &Config) {
        if let Some(range) = self.connection.word_range_at_cursor(config) {
            self.unlearn_word(config, &range.word, UnlearnKind::Backspace);
        }
    }

    fn unlearn_word(&mut self, config: &Config, word: &str, kind: UnlearnKind) {
        let ngram_context = self.connection.ngram_context_from_nth_previous_word(config, 2);
        if let Err(err) = self.dictionary.unlearn(word, &ngram_context, kind) {
            warn!(%err, word, "unlearn failed");
        }
    }

    fn reset_composing_state(&mut self, also_reset_last_composed_word: bool) {
        self.word_composer.reset();
        if also_reset_last_composed_word {
            self.last_composed_word = None;
        }
    }

    fn reset_entire_input_state(
        &mut self,
        _config: &Config,
        new_sel_start: usize,
        new_sel_end: usize,
        clear_suggestions: bool,
    ) {
        let should_finish_composition = self.word_composer.is_composing();
        self.reset_composing_state(true);
        if clear_suggestions {
            self.set_suggested_words(SuggestedWords::empty());
        }
        self.handler.invalidate_typing();
        self.connection.reset_caches_on_cursor_move(
            new_sel_start,
            new_sel_end,
            should_finish_composition,
        );
    }
}

/// The double-space-to-period whitelist: the character before the first
/// space must come from this closed set. Anything not listed, including
/// most punctuation, blocks the conversion.
fn can_be_followed_by_double_space_period(cp: char) -> bool {
    cp.is_alphanumeric() || "'\")]}>+%".contains(cp)
}

fn is_resumable_word(config: &Config, word: &str) -> bool {
    !word.is_empty()
        && word.chars().count() <= MAX_WORD_LENGTH
        && word.chars().all(|cp| config.is_word_code_point(cp))
        && !word.chars().any(|cp| cp.is_ascii_digit())
}
