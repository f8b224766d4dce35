//! End-to-end typing tests over an in-memory editor: composition, commits,
//! automatic spaces, double-space-to-period, and the revert protocol.

mod common;

use std::sync::Arc;

use common::FakeDictionary;
use liblatin::{
    BufferEditor, CapsMode, Config, EditorConnection, Event, FunctionalKey, InputLogic, SpaceState,
    UnlearnKind,
};

fn engine(dictionary: FakeDictionary) -> (InputLogic<BufferEditor>, Arc<FakeDictionary>, Config) {
    let config = Config::default();
    let dictionary = Arc::new(dictionary);
    let logic = InputLogic::new(BufferEditor::new(), dictionary.clone(), &config);
    (logic, dictionary, config)
}

fn type_str(logic: &mut InputLogic<BufferEditor>, config: &Config, text: &str, mut at: u64) -> u64 {
    for cp in text.chars() {
        logic.on_code_input(config, Event::key_press(cp, 0, 0), CapsMode::Off, at);
        at += 50;
    }
    at
}

fn backspace(logic: &mut InputLogic<BufferEditor>, config: &Config, at: u64) {
    logic.on_code_input(
        config,
        Event::functional_key(FunctionalKey::Delete),
        CapsMode::Off,
        at,
    );
}

#[test]
fn test_plain_word_commits_on_space() {
    let (mut logic, dictionary, config) = engine(FakeDictionary::new());
    let t = type_str(&mut logic, &config, "hello", 0);
    assert!(logic.is_composing());
    assert_eq!(logic.composing_word(), "hello");
    type_str(&mut logic, &config, " ", t);
    assert!(!logic.is_composing());
    assert_eq!(logic.connection().text(), "hello ");
    assert_eq!(logic.space_state(), SpaceState::Weak);
    assert_eq!(*dictionary.learned.lock().unwrap(), vec!["hello"]);
}

#[test]
fn test_auto_correction_applies_on_separator() {
    let (mut logic, dictionary, config) = engine(FakeDictionary::new().correction(
        "teh",
        "the",
        900_000,
    ));
    let t = type_str(&mut logic, &config, "teh", 0);
    type_str(&mut logic, &config, " ", t);
    assert_eq!(logic.connection().text(), "the ");
    assert_eq!(*dictionary.learned.lock().unwrap(), vec!["the"]);
}

#[test]
fn test_backspace_reverts_auto_correction_to_typed_word() {
    let (mut logic, dictionary, config) = engine(FakeDictionary::new().correction(
        "teh",
        "the",
        900_000,
    ));
    let t = type_str(&mut logic, &config, "teh ", 0);
    assert_eq!(logic.connection().text(), "the ");
    backspace(&mut logic, &config, t);
    // The commit and its separator are gone and the typed word is back
    // under composition, ready for further edits.
    assert_eq!(logic.connection().text(), "teh");
    assert!(logic.is_composing());
    assert_eq!(logic.composing_word(), "teh");
    assert!(dictionary
        .unlearned
        .lock()
        .unwrap()
        .contains(&("the".to_string(), UnlearnKind::Revert)));
    // The revert record is single use; the next backspace edits the word.
    backspace(&mut logic, &config, t + 50);
    assert_eq!(logic.composing_word(), "te");
    assert_eq!(logic.connection().text(), "te");
}

#[test]
fn test_valid_typed_word_is_never_auto_corrected() {
    let (mut logic, _dictionary, config) = engine(
        FakeDictionary::new()
            .correction("ths", "this", 900_000)
            .valid_word("ths"),
    );
    type_str(&mut logic, &config, "ths ", 0);
    assert_eq!(logic.connection().text(), "ths ");
}

#[test]
fn test_no_auto_correction_when_disabled() {
    let (mut logic, _dictionary, mut config) = engine(FakeDictionary::new().correction(
        "teh",
        "the",
        900_000,
    ));
    config.auto_correction_enabled = false;
    type_str(&mut logic, &config, "teh ", 0);
    assert_eq!(logic.connection().text(), "teh ");
}

#[test]
fn test_double_space_becomes_period() {
    let (mut logic, _dictionary, config) = engine(FakeDictionary::new());
    let t = type_str(&mut logic, &config, "hello ", 0);
    type_str(&mut logic, &config, " ", t + 300);
    assert_eq!(logic.connection().text(), "hello. ");
    assert_eq!(logic.space_state(), SpaceState::Double);
}

#[test]
fn test_double_space_needs_both_taps_within_the_timeout() {
    let (mut logic, _dictionary, config) = engine(FakeDictionary::new());
    let t = type_str(&mut logic, &config, "hello ", 0);
    type_str(&mut logic, &config, " ", t + config.double_space_period_timeout_ms + 1);
    assert_eq!(logic.connection().text(), "hello  ");
}

#[test]
fn test_double_space_blocked_after_punctuation() {
    let (mut logic, _dictionary, config) = engine(FakeDictionary::new());
    let t = type_str(&mut logic, &config, "hi! ", 0);
    type_str(&mut logic, &config, " ", t + 200);
    assert_eq!(logic.connection().text(), "hi!  ");
}

#[test]
fn test_backspace_reverts_double_space_period() {
    let (mut logic, _dictionary, config) = engine(FakeDictionary::new());
    let t = type_str(&mut logic, &config, "hello ", 0);
    type_str(&mut logic, &config, " ", t + 300);
    assert_eq!(logic.connection().text(), "hello. ");
    backspace(&mut logic, &config, t + 600);
    assert_eq!(logic.connection().text(), "hello  ");
    assert_eq!(logic.space_state(), SpaceState::Weak);
    // The restored spaces must not immediately re-trigger the period.
    type_str(&mut logic, &config, " ", t + 700);
    assert_eq!(logic.connection().text(), "hello   ");
}

#[test]
fn test_manual_pick_sets_phantom_space() {
    let (mut logic, _dictionary, config) = engine(FakeDictionary::new());
    logic.on_pick_suggestion_manually(&config, "hello", CapsMode::Off, 0);
    assert_eq!(logic.connection().text(), "hello");
    assert!(logic.is_phantom_space_active());
    // The phantom materializes in front of the next word.
    type_str(&mut logic, &config, "n", 100);
    assert_eq!(logic.connection().text(), "hello n");
    assert_eq!(logic.composing_word(), "n");
}

#[test]
fn test_phantom_space_survives_trailing_punctuation() {
    let (mut logic, _dictionary, config) = engine(FakeDictionary::new());
    logic.on_pick_suggestion_manually(&config, "word", CapsMode::Off, 0);
    type_str(&mut logic, &config, ".", 100);
    // The period attaches to the word, the phantom carries over.
    assert_eq!(logic.connection().text(), "word.");
    assert!(logic.is_phantom_space_active());
    type_str(&mut logic, &config, "n", 200);
    assert_eq!(logic.connection().text(), "word. n");
}

#[test]
fn test_phantom_space_lands_before_opening_bracket() {
    let (mut logic, _dictionary, config) = engine(FakeDictionary::new());
    logic.on_pick_suggestion_manually(&config, "hello", CapsMode::Off, 0);
    type_str(&mut logic, &config, "(", 100);
    assert_eq!(logic.connection().text(), "hello (");
}

#[test]
fn test_strip_picked_punctuation_swaps_with_weak_space() {
    let (mut logic, _dictionary, config) = engine(FakeDictionary::new());
    let t = type_str(&mut logic, &config, "hi ", 0);
    logic.on_pick_suggestion_manually(&config, "!", CapsMode::Off, t);
    assert_eq!(logic.connection().text(), "hi! ");
    assert_eq!(logic.space_state(), SpaceState::SwapPunctuation);
    backspace(&mut logic, &config, t + 100);
    assert_eq!(logic.connection().text(), "hi !");
}

#[test]
fn test_text_key_commit_and_whole_cancel() {
    let (mut logic, _dictionary, config) = engine(FakeDictionary::new());
    logic.on_text_input(&config, "hello!", CapsMode::Off, 0);
    assert_eq!(logic.connection().text(), "hello!");
    // One backspace takes back the whole entered string.
    backspace(&mut logic, &config, 100);
    assert_eq!(logic.connection().text(), "");
}

#[test]
fn test_text_input_cancel_window_closes_after_more_typing() {
    let (mut logic, _dictionary, config) = engine(FakeDictionary::new());
    logic.on_text_input(&config, "hello!", CapsMode::Off, 0);
    let t = type_str(&mut logic, &config, "x", 100);
    backspace(&mut logic, &config, t);
    assert_eq!(logic.connection().text(), "hello!");
    // The whole-string cancel only follows the entry directly; this
    // backspace must erase one code point, not the entire "hello!".
    backspace(&mut logic, &config, t + 50);
    assert_eq!(logic.connection().text(), "hello");
}

#[test]
fn test_tld_key_merges_with_preceding_period() {
    let (mut logic, _dictionary, config) = engine(FakeDictionary::new());
    logic.on_text_input(&config, "www.", CapsMode::Off, 0);
    logic.on_text_input(&config, ".com", CapsMode::Off, 100);
    assert_eq!(logic.connection().text(), "www.com");
}

#[test]
fn test_shift_keeps_the_revert_record_alive() {
    let (mut logic, _dictionary, config) = engine(FakeDictionary::new().correction(
        "teh",
        "the",
        900_000,
    ));
    let t = type_str(&mut logic, &config, "teh ", 0);
    assert_eq!(logic.connection().text(), "the ");
    // Tapping shift to capitalize the next word must not forfeit the
    // revert of the correction that just happened.
    logic.on_code_input(
        &config,
        Event::functional_key(FunctionalKey::Shift),
        CapsMode::ManualShifted,
        t,
    );
    backspace(&mut logic, &config, t + 50);
    assert_eq!(logic.connection().text(), "teh");
    assert_eq!(logic.composing_word(), "teh");
}

#[test]
fn test_backspace_deletes_an_inverted_selection() {
    let (mut logic, _dictionary, config) = engine(FakeDictionary::new());
    let t = type_str(&mut logic, &config, "hello ", 0);
    // Hosts may report the selection ends in either order.
    logic.connection_mut().set_selection(4, 1);
    backspace(&mut logic, &config, t);
    assert_eq!(logic.connection().text(), "ho ");
}

#[test]
fn test_auto_capitalized_word_is_learned_lowercase() {
    let (mut logic, dictionary, config) = engine(FakeDictionary::new());
    logic.on_code_input(&config, Event::key_press('H', 0, 0), CapsMode::AutoShifted, 0);
    let t = type_str(&mut logic, &config, "i", 50);
    type_str(&mut logic, &config, " ", t);
    assert_eq!(logic.connection().text(), "Hi ");
    assert_eq!(*dictionary.learned.lock().unwrap(), vec!["hi"]);
}

#[test]
fn test_manually_capitalized_word_is_learned_as_typed() {
    let (mut logic, dictionary, config) = engine(FakeDictionary::new());
    logic.on_code_input(
        &config,
        Event::key_press('H', 0, 0),
        CapsMode::ManualShifted,
        0,
    );
    let t = type_str(&mut logic, &config, "i", 50);
    type_str(&mut logic, &config, " ", t);
    assert_eq!(*dictionary.learned.lock().unwrap(), vec!["Hi"]);
}

#[test]
fn test_backspace_resumes_the_committed_word() {
    let (mut logic, _dictionary, config) = engine(FakeDictionary::new());
    let t = type_str(&mut logic, &config, "hi yo ", 0);
    assert_eq!(logic.connection().text(), "hi yo ");
    backspace(&mut logic, &config, t);
    // Deleting the separator puts the cursor back on the word and resumes
    // composition there.
    assert_eq!(logic.connection().text(), "hi yo");
    assert!(logic.is_composing());
    assert_eq!(logic.composing_word(), "yo");
}

#[test]
fn test_long_press_delete_unlearns_the_word_being_erased() {
    let (mut logic, dictionary, config) = engine(FakeDictionary::new());
    let mut t = type_str(&mut logic, &config, "alpha beta gamma delta epsilon ", 0);
    // A slow editor opts out of mid-delete composition resume, leaving the
    // plain held-delete path.
    logic.connection_mut().set_slow(true);
    for _ in 0..25 {
        logic.on_code_input(
            &config,
            Event::repeated_functional_key(FunctionalKey::Delete),
            CapsMode::Off,
            t,
        );
        t += 50;
    }
    assert!(dictionary
        .unlearned
        .lock()
        .unwrap()
        .iter()
        .any(|(_, kind)| *kind == UnlearnKind::Backspace));
}

#[test]
fn test_shift_enter_commits_and_breaks_the_line() {
    let (mut logic, _dictionary, config) = engine(FakeDictionary::new());
    type_str(&mut logic, &config, "hello", 0);
    logic.on_code_input(
        &config,
        Event::functional_key(FunctionalKey::ShiftEnter),
        CapsMode::Off,
        300,
    );
    assert_eq!(logic.connection().text(), "hello\n");
    assert!(!logic.is_composing());
}

#[test]
fn test_auto_caps_after_sentence_separator() {
    let (mut logic, _dictionary, config) = engine(FakeDictionary::new());
    assert!(logic.current_auto_caps_state(&config));
    let t = type_str(&mut logic, &config, "hello", 0);
    assert!(!logic.current_auto_caps_state(&config));
    type_str(&mut logic, &config, ". ", t);
    assert!(logic.current_auto_caps_state(&config));
}

#[test]
fn test_nothing_composes_when_suggestions_are_off() {
    let (mut logic, _dictionary, mut config) = engine(FakeDictionary::new());
    config.suggestions_enabled = false;
    config.auto_correction_enabled = false;
    type_str(&mut logic, &config, "hi", 0);
    assert!(!logic.is_composing());
    assert_eq!(logic.connection().text(), "hi");
    assert!(logic.suggested_words().is_empty());
}
