//! Word frequency dictionary.
//!
//! `FrequencyTable` maps words to occurrence counts and caches their sum.
//! Probabilities for the DAG search are `count / total`, so the table
//! must hold at least one positive count before it is used for scoring.

mod source;

pub use source::{parse_dictionary, parse_user_dictionary, UserWord};

use std::collections::HashMap;
use std::io;

use serde::Deserialize;

/// Error raised while loading a dictionary. Any error aborts the load;
/// no partially filled table is returned.
#[derive(Debug, thiserror::Error)]
pub enum DictError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed dictionary entry at line {line}: {content:?}")]
    MalformedEntry { line: usize, content: String },

    #[error("invalid frequency {value:?} at line {line}")]
    InvalidFrequency { line: usize, value: String },

    #[error("empty word")]
    EmptyWord,

    #[error("dictionary has no entry with a positive frequency")]
    Empty,
}

/// How a count for a word already present in the table is combined with
/// a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// The new count replaces the old one.
    Overwrite,
    /// The new count is added to the old one.
    #[default]
    Accumulate,
}

#[derive(Debug, Clone, Default)]
pub struct FrequencyTable {
    entries: HashMap<String, u64>,
    total: u64,
    /// Length in chars of the longest entry; bounds the DAG scan.
    max_word_chars: usize,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(
        entries: impl IntoIterator<Item = (String, u64)>,
        policy: DuplicatePolicy,
    ) -> Self {
        let mut table = Self::new();
        for (word, count) in entries {
            table.insert(&word, count, policy);
        }
        table
    }

    /// Count for `word`, 0 when absent.
    pub fn get(&self, word: &str) -> u64 {
        self.entries.get(word).copied().unwrap_or(0)
    }

    /// Whether `word` is present with a positive count.
    pub fn contains(&self, word: &str) -> bool {
        self.get(word) > 0
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Natural log of the total count. An empty table is treated as
    /// having a total of 1 so that scores stay finite.
    pub fn log_total(&self) -> f64 {
        (self.total.max(1) as f64).ln()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_word_chars(&self) -> usize {
        self.max_word_chars
    }

    /// Insert or update a word. Returns the word's resulting count.
    pub fn insert(&mut self, word: &str, count: u64, policy: DuplicatePolicy) -> u64 {
        let (old, new) = match self.entries.get_mut(word) {
            Some(slot) => {
                let old = *slot;
                *slot = match policy {
                    DuplicatePolicy::Overwrite => count,
                    DuplicatePolicy::Accumulate => old.saturating_add(count),
                };
                (old, *slot)
            }
            None => {
                self.max_word_chars = self.max_word_chars.max(word.chars().count());
                self.entries.insert(word.to_string(), count);
                (0, count)
            }
        };
        self.total = self.total.saturating_sub(old).saturating_add(new);
        new
    }

    /// Add one count per whitespace-separated token of already segmented
    /// text. Returns the number of tokens absorbed.
    pub fn absorb_segmented(&mut self, text: &str) -> usize {
        let mut absorbed = 0;
        for token in text.split_whitespace() {
            self.insert(token, 1, DuplicatePolicy::Accumulate);
            absorbed += 1;
        }
        absorbed
    }

    /// Iterate over all `(word, count)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(w, &c)| (w.as_str(), c))
    }
}
