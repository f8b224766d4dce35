//! Previous-word context handed to the dictionary with every query.

use crate::Config;

/// What we know about one previous word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordInfo {
    Word(String),
    /// The position right after a sentence boundary.
    BeginningOfSentence,
    /// Nothing usable, for example after a non-word symbol.
    Empty,
}

/// Context of up to [`NgramContext::MAX_PREV_WORDS`] words preceding the
/// position being completed, most recent first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NgramContext {
    prev_words: Vec<WordInfo>,
}

impl NgramContext {
    pub const MAX_PREV_WORDS: usize = 2;

    pub fn empty() -> Self {
        Self { prev_words: vec![] }
    }

    pub fn beginning_of_sentence() -> Self {
        Self {
            prev_words: vec![WordInfo::BeginningOfSentence],
        }
    }

    pub fn new(info: WordInfo) -> Self {
        Self {
            prev_words: vec![info],
        }
    }

    pub fn from_words(prev_words: Vec<WordInfo>) -> Self {
        let mut prev_words = prev_words;
        prev_words.truncate(Self::MAX_PREV_WORDS);
        Self { prev_words }
    }

    /// Context shifted one word forward, after `info` was committed.
    pub fn next_context(&self, info: WordInfo) -> Self {
        let mut prev_words = Vec::with_capacity(self.prev_words.len() + 1);
        prev_words.push(info);
        prev_words.extend(self.prev_words.iter().cloned());
        Self::from_words(prev_words)
    }

    pub fn previous_word(&self) -> Option<&str> {
        match self.prev_words.first() {
            Some(WordInfo::Word(word)) => Some(word),
            _ => None,
        }
    }

    pub fn is_beginning_of_sentence(&self) -> bool {
        matches!(self.prev_words.first(), Some(WordInfo::BeginningOfSentence))
    }

    pub fn is_valid(&self) -> bool {
        !self.prev_words.is_empty()
            && !matches!(self.prev_words.first(), Some(WordInfo::Empty))
    }

    pub fn prev_words(&self) -> &[WordInfo] {
        &self.prev_words
    }

    /// Previous words joined for dictionaries that key on a flat context
    /// string, oldest first.
    pub fn joined(&self) -> String {
        let mut words: Vec<&str> = Vec::new();
        for info in self.prev_words.iter().rev() {
            match info {
                WordInfo::Word(word) => words.push(word),
                WordInfo::BeginningOfSentence => words.push("<S>"),
                WordInfo::Empty => {}
            }
        }
        words.join(" ")
    }
}

/// Extract the n-gram context ending at the nth previous word from the text
/// before the cursor. `nth_previous_word` is 1-indexed: 1 skips nothing but
/// whitespace, 2 additionally skips the word adjacent to the cursor.
pub fn ngram_context_from_text(
    before_cursor: &str,
    config: &Config,
    nth_previous_word: usize,
) -> NgramContext {
    let mut tokens: Vec<&str> = Vec::new();
    let mut start = None;
    for (i, ch) in before_cursor.char_indices() {
        if ch.is_whitespace() {
            if let Some(s) = start.take() {
                tokens.push(&before_cursor[s..i]);
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        tokens.push(&before_cursor[s..]);
    }

    if tokens.len() < nth_previous_word {
        return if before_cursor.trim().is_empty() {
            NgramContext::beginning_of_sentence()
        } else {
            NgramContext::empty()
        };
    }

    let mut prev_words = Vec::new();
    let mut index = tokens.len() - nth_previous_word;
    loop {
        let token = tokens[index];
        let info = classify_token(token, config);
        let stop = matches!(info, WordInfo::BeginningOfSentence | WordInfo::Empty);
        prev_words.push(info);
        if stop || prev_words.len() == NgramContext::MAX_PREV_WORDS || index == 0 {
            break;
        }
        index -= 1;
    }
    if index == 0
        && prev_words.len() < NgramContext::MAX_PREV_WORDS
        && matches!(prev_words.last(), Some(WordInfo::Word(_)))
    {
        prev_words.push(WordInfo::BeginningOfSentence);
    }
    NgramContext::from_words(prev_words)
}

fn classify_token(token: &str, config: &Config) -> WordInfo {
    if token
        .chars()
        .last()
        .is_some_and(|ch| ch == config.sentence_separator)
    {
        return WordInfo::BeginningOfSentence;
    }
    let word: String = token
        .chars()
        .filter(|&ch| config.is_word_code_point(ch))
        .collect();
    if word.is_empty() {
        WordInfo::Empty
    } else {
        WordInfo::Word(word)
    }
}
