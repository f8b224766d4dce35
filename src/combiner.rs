//! Combiners turn raw keystrokes into composed text.
//!
//! A combiner may swallow an event (dead keys do this while they wait for
//! the base character), replace it with another one, or flush pending state
//! as literal text. Combiners are stacked in a [`CombinerChain`] which also
//! owns the text composed so far.

use ahash::AHashMap;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::warn;

use crate::event::{Event, FunctionalKey};

/// A single step in the combining chain.
pub trait Combiner {
    /// Process an event, possibly consuming it or replacing it.
    fn process_event(&mut self, previous: &[Event], event: Event) -> Event;
    /// Visual feedback for pending, not-yet-composed state.
    fn combining_state_feedback(&self) -> String;
    fn reset(&mut self);
}

enum Node {
    Leaf(char),
    Parent(AHashMap<char, Node>),
}

/// Composes dead keys with the characters that follow them.
///
/// Pending dead keys are kept in a sequence and matched against a trie.
/// An unknown combination flushes the pending sequence plus the base
/// character as literal text instead of losing keystrokes.
pub struct DeadKeyCombiner {
    root: AHashMap<char, Node>,
    pending: Vec<char>,
}

impl DeadKeyCombiner {
    pub fn new() -> Self {
        Self {
            root: default_dead_key_table(),
            pending: Vec::new(),
        }
    }

    fn with_table(root: AHashMap<char, Node>) -> Self {
        Self {
            root,
            pending: Vec::new(),
        }
    }

    fn add_mapping(&mut self, dead: char, base: char, composed: char) {
        add_mapping(&mut self.root, dead, base, composed)
    }

    /// Node reached by the pending sequence, if any. The sequence only ever
    /// contains validated prefixes, so a miss means an inconsistent table.
    fn pending_node(&self) -> Option<&AHashMap<char, Node>> {
        let mut map = &self.root;
        for &ch in &self.pending {
            match map.get(&ch) {
                Some(Node::Parent(children)) => map = children,
                _ => return None,
            }
        }
        Some(map)
    }

    fn flush_text(&mut self, base: char) -> String {
        let mut text: String = self.pending.drain(..).collect();
        text.push(base);
        text
    }
}

impl Default for DeadKeyCombiner {
    fn default() -> Self {
        Self::new()
    }
}

impl Combiner for DeadKeyCombiner {
    fn process_event(&mut self, _previous: &[Event], event: Event) -> Event {
        if self.pending.is_empty() {
            if event.is_dead {
                if let Some(cp) = event.code_point() {
                    if self.root.contains_key(&cp) {
                        self.pending.push(cp);
                        return Event::consumed(event);
                    }
                }
            }
            // No dead key tracked. The vast majority of events take this
            // path untouched.
            return event;
        }

        if event.is_functional_key_event() {
            if event.key() == Some(FunctionalKey::Delete) {
                self.pending.pop();
                return Event::consumed(event);
            }
            return event;
        }

        let Some(cp) = event.code_point() else {
            return event;
        };

        if event.is_dead {
            // Stack another dead key if the table knows the longer sequence,
            // otherwise flush everything as text.
            match self.pending_node().and_then(|map| map.get(&cp)) {
                Some(Node::Parent(_)) => {
                    self.pending.push(cp);
                    return Event::consumed(event);
                }
                Some(Node::Leaf(composed)) => {
                    let composed = *composed;
                    self.pending.clear();
                    return Event::dead_result(composed, event);
                }
                None => {
                    let text = self.flush_text(cp);
                    return Event::text_emission(text, event);
                }
            }
        }

        match self.pending_node().and_then(|map| map.get(&cp)) {
            Some(Node::Leaf(composed)) => {
                let composed = *composed;
                self.pending.clear();
                Event::dead_result(composed, event)
            }
            Some(Node::Parent(_)) => {
                self.pending.push(cp);
                Event::consumed(event)
            }
            None => {
                let text = self.flush_text(cp);
                Event::text_emission(text, event)
            }
        }
    }

    fn combining_state_feedback(&self) -> String {
        self.pending.iter().collect()
    }

    fn reset(&mut self) {
        self.pending.clear();
    }
}

/// Two-keystroke ligature transforms ("oe" to "œ" and the like), supplied
/// by the combining spec.
pub struct TransformCombiner {
    rules: AHashMap<(char, char), char>,
    prefixes: AHashMap<char, ()>,
    pending: Option<char>,
}

impl TransformCombiner {
    pub fn new(rules: AHashMap<(char, char), char>) -> Self {
        let mut prefixes = AHashMap::new();
        for &(first, _) in rules.keys() {
            prefixes.insert(first, ());
        }
        Self {
            rules,
            prefixes,
            pending: None,
        }
    }
}

impl Combiner for TransformCombiner {
    fn process_event(&mut self, _previous: &[Event], event: Event) -> Event {
        let Some(cp) = event.code_point() else {
            if self.pending.is_some()
                && event.key() == Some(FunctionalKey::Delete)
            {
                self.pending = None;
                return Event::consumed(event);
            }
            return event;
        };
        match self.pending.take() {
            None => {
                if self.prefixes.contains_key(&cp) && !event.is_dead {
                    self.pending = Some(cp);
                    Event::consumed(event)
                } else {
                    event
                }
            }
            Some(first) => {
                if let Some(&composed) = self.rules.get(&(first, cp)) {
                    Event::dead_result(composed, event)
                } else {
                    let mut text = String::new();
                    text.push(first);
                    text.push(cp);
                    Event::text_emission(text, event)
                }
            }
        }
    }

    fn combining_state_feedback(&self) -> String {
        self.pending.map(String::from).unwrap_or_default()
    }

    fn reset(&mut self) {
        self.pending = None;
    }
}

#[derive(Deserialize)]
struct CombiningSpec {
    #[serde(default)]
    dead_keys: HashMap<String, HashMap<String, String>>,
    #[serde(default)]
    transforms: Vec<TransformRule>,
}

#[derive(Deserialize)]
struct TransformRule {
    from: String,
    to: String,
}

/// The ordered stack of combiners plus the text composed so far.
pub struct CombinerChain {
    combiners: Vec<Box<dyn Combiner>>,
    combined_text: String,
    state_feedback: String,
}

impl CombinerChain {
    pub fn new(initial_text: &str, combiners: Vec<Box<dyn Combiner>>) -> Self {
        Self {
            combiners,
            combined_text: initial_text.to_string(),
            state_feedback: String::new(),
        }
    }

    /// Build a chain from a JSON combining spec, seeded with text already
    /// composed. `None` yields the default dead-key chain. A malformed spec
    /// logs a warning and falls back to a chain that passes every event
    /// through unchanged, so typing keeps working.
    pub fn from_spec(spec: Option<&str>, initial_text: &str) -> Self {
        let Some(spec) = spec else {
            return Self::new(initial_text, vec![Box::new(DeadKeyCombiner::new())]);
        };
        match serde_json::from_str::<CombiningSpec>(spec) {
            Ok(parsed) => Self::new(initial_text, build_combiners(parsed)),
            Err(err) => {
                warn!("malformed combining spec, falling back to identity: {err}");
                Self::new(initial_text, Vec::new())
            }
        }
    }

    /// Run the event through the chain. A combiner that consumes the event
    /// ends the walk; later combiners never see swallowed events.
    pub fn process_event(&mut self, previous: &[Event], event: Event) -> Event {
        let mut event = event;
        for combiner in &mut self.combiners {
            event = combiner.process_event(previous, event);
            if event.is_consumed() {
                break;
            }
        }
        self.refresh_state_feedback();
        event
    }

    /// Fold a processed event into the composed text.
    pub fn apply_processed_event(&mut self, event: &Event) {
        if event.key() == Some(FunctionalKey::Delete) {
            self.combined_text.pop();
        } else {
            self.combined_text.push_str(&event.text_to_commit());
        }
        self.refresh_state_feedback();
    }

    /// The word as the user sees it: composed text plus pending feedback.
    pub fn composing_word(&self) -> String {
        let mut word = self.combined_text.clone();
        word.push_str(&self.state_feedback);
        word
    }

    pub fn combined_text(&self) -> &str {
        &self.combined_text
    }

    pub fn reset(&mut self) {
        self.combined_text.clear();
        self.state_feedback.clear();
        for combiner in &mut self.combiners {
            combiner.reset();
        }
    }

    fn refresh_state_feedback(&mut self) {
        self.state_feedback.clear();
        for combiner in &self.combiners {
            self.state_feedback.push_str(&combiner.combining_state_feedback());
        }
    }
}

fn build_combiners(spec: CombiningSpec) -> Vec<Box<dyn Combiner>> {
    let mut dead = DeadKeyCombiner::new();
    for (dead_key, combos) in &spec.dead_keys {
        let Some(dead_cp) = dead_key.chars().next() else {
            warn!("combining spec: empty dead key entry, skipping");
            continue;
        };
        for (base, composed) in combos {
            match (base.chars().next(), composed.chars().next()) {
                (Some(base_cp), Some(composed_cp)) => {
                    dead.add_mapping(dead_cp, base_cp, composed_cp);
                }
                _ => warn!("combining spec: empty combination under {dead_key:?}, skipping"),
            }
        }
    }
    let mut combiners: Vec<Box<dyn Combiner>> = vec![Box::new(dead)];

    let mut rules = AHashMap::new();
    for rule in &spec.transforms {
        let mut from = rule.from.chars();
        match (from.next(), from.next(), rule.to.chars().next()) {
            (Some(first), Some(second), Some(to)) => {
                rules.insert((first, second), to);
            }
            _ => warn!(
                "combining spec: transform needs two input chars, got {:?}",
                rule.from
            ),
        }
    }
    if !rules.is_empty() {
        combiners.push(Box::new(TransformCombiner::new(rules)));
    }
    combiners
}

fn add_mapping(root: &mut AHashMap<char, Node>, dead: char, base: char, composed: char) {
    match root
        .entry(dead)
        .or_insert_with(|| Node::Parent(AHashMap::new()))
    {
        Node::Parent(children) => {
            children.insert(base, Node::Leaf(composed));
        }
        Node::Leaf(_) => {
            // A leaf at the top level would shadow the whole subtree;
            // replace it with a parent holding the new mapping.
            let mut children = AHashMap::new();
            children.insert(base, Node::Leaf(composed));
            root.insert(dead, Node::Parent(children));
        }
    }
}

fn default_dead_key_table() -> AHashMap<char, Node> {
    // Spacing and combining forms of the usual diacritics.
    const TABLES: &[(&[char], &[(char, char)])] = &[
        (
            &['\u{00B4}', '\u{0301}'],
            &[
                ('a', 'á'),
                ('e', 'é'),
                ('i', 'í'),
                ('o', 'ó'),
                ('u', 'ú'),
                ('y', 'ý'),
                ('A', 'Á'),
                ('E', 'É'),
                ('I', 'Í'),
                ('O', 'Ó'),
                ('U', 'Ú'),
                ('Y', 'Ý'),
                (' ', '\u{00B4}'),
            ],
        ),
        (
            &['`', '\u{0300}'],
            &[
                ('a', 'à'),
                ('e', 'è'),
                ('i', 'ì'),
                ('o', 'ò'),
                ('u', 'ù'),
                ('A', 'À'),
                ('E', 'È'),
                ('I', 'Ì'),
                ('O', 'Ò'),
                ('U', 'Ù'),
                (' ', '`'),
            ],
        ),
        (
            &['^', '\u{0302}'],
            &[
                ('a', 'â'),
                ('e', 'ê'),
                ('i', 'î'),
                ('o', 'ô'),
                ('u', 'û'),
                ('A', 'Â'),
                ('E', 'Ê'),
                ('I', 'Î'),
                ('O', 'Ô'),
                ('U', 'Û'),
                (' ', '^'),
            ],
        ),
        (
            &['\u{00A8}', '\u{0308}'],
            &[
                ('a', 'ä'),
                ('e', 'ë'),
                ('i', 'ï'),
                ('o', 'ö'),
                ('u', 'ü'),
                ('y', 'ÿ'),
                ('A', 'Ä'),
                ('E', 'Ë'),
                ('I', 'Ï'),
                ('O', 'Ö'),
                ('U', 'Ü'),
                (' ', '\u{00A8}'),
            ],
        ),
        (
            &['~', '\u{0303}'],
            &[
                ('a', 'ã'),
                ('n', 'ñ'),
                ('o', 'õ'),
                ('A', 'Ã'),
                ('N', 'Ñ'),
                ('O', 'Õ'),
                (' ', '~'),
            ],
        ),
    ];

    let mut root = AHashMap::new();
    for (dead_keys, combos) in TABLES {
        for &dead in *dead_keys {
            for &(base, composed) in *combos {
                add_mapping(&mut root, dead, base, composed);
            }
        }
    }
    root
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;

    fn process(chain: &mut CombinerChain, event: Event) -> Event {
        let processed = chain.process_event(&[], event);
        chain.apply_processed_event(&processed);
        processed
    }

    #[test]
    fn test_plain_typing_passes_through() {
        let mut chain = CombinerChain::from_spec(None, "");
        let processed = process(&mut chain, Event::key_press('h', 0, 0));
        assert_eq!(processed.code_point(), Some('h'));
        assert_eq!(chain.composing_word(), "h");
    }

    #[test]
    fn test_dead_key_composes_acute_e() {
        let mut chain = CombinerChain::from_spec(None, "");
        let consumed = process(&mut chain, Event::dead_key('\u{0301}'));
        assert!(consumed.is_consumed());
        assert_eq!(chain.composing_word(), "\u{0301}");

        let composed = process(&mut chain, Event::key_press('e', 0, 0));
        assert_eq!(composed.code_point(), Some('é'));
        assert_eq!(chain.composing_word(), "é");
    }

    #[test]
    fn test_unknown_combination_flushes_as_text() {
        let mut chain = CombinerChain::from_spec(None, "");
        process(&mut chain, Event::dead_key('~'));
        let flushed = process(&mut chain, Event::key_press('z', 0, 0));
        assert!(flushed.is_consumed());
        assert_eq!(flushed.text_to_commit(), "~z");
        assert_eq!(chain.composing_word(), "~z");
    }

    #[test]
    fn test_delete_drops_pending_dead_key() {
        let mut chain = CombinerChain::from_spec(None, "");
        process(&mut chain, Event::dead_key('^'));
        let consumed = chain.process_event(
            &[],
            Event::functional_key(crate::event::FunctionalKey::Delete),
        );
        assert!(consumed.is_consumed());
        assert_eq!(chain.composing_word(), "");

        let plain = process(&mut chain, Event::key_press('a', 0, 0));
        assert_eq!(plain.code_point(), Some('a'));
    }

    #[test]
    fn test_spec_adds_dead_key_mappings() {
        let spec = r#"{ "dead_keys": { "°": { "a": "å", "A": "Å" } } }"#;
        let mut chain = CombinerChain::from_spec(Some(spec), "");
        process(&mut chain, Event::dead_key('°'));
        let composed = process(&mut chain, Event::key_press('a', 0, 0));
        assert_eq!(composed.code_point(), Some('å'));
    }

    #[test]
    fn test_spec_transform_composes_ligature() {
        let spec = r#"{ "transforms": [ { "from": "oe", "to": "œ" } ] }"#;
        let mut chain = CombinerChain::from_spec(Some(spec), "");
        let consumed = process(&mut chain, Event::key_press('o', 0, 0));
        assert!(consumed.is_consumed());
        let composed = process(&mut chain, Event::key_press('e', 0, 0));
        assert_eq!(composed.code_point(), Some('œ'));
        assert_eq!(chain.composing_word(), "œ");
    }

    #[test]
    fn test_malformed_spec_falls_back_to_identity() {
        let mut chain = CombinerChain::from_spec(Some("{ not json"), "");
        let event = process(&mut chain, Event::dead_key('\u{0301}'));
        // Identity chain: even dead keys pass through untouched.
        assert_eq!(event.code_point(), Some('\u{0301}'));
        assert!(matches!(event.kind, EventKind::CodePoint(_)));
    }

    #[test]
    fn test_chain_seeds_initial_text() {
        let chain = CombinerChain::from_spec(None, "par");
        assert_eq!(chain.composing_word(), "par");
    }

    #[test]
    fn test_delete_removes_last_composed_char() {
        let mut chain = CombinerChain::from_spec(None, "ab");
        chain.apply_processed_event(&Event::functional_key(
            crate::event::FunctionalKey::Delete,
        ));
        assert_eq!(chain.composing_word(), "a");
    }
}
