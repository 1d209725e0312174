use tracing::{debug, debug_span};

use crate::dict::FrequencyTable;

/// A run of text indexed by char position.
#[derive(Debug, Clone)]
pub struct CharRun<'a> {
    text: &'a str,
    /// Byte offset of every char, plus `text.len()` at the end.
    offsets: Vec<usize>,
}

impl<'a> CharRun<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        offsets.push(text.len());
        Self { text, offsets }
    }

    /// Number of chars.
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Substring covering chars `start..end`.
    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.text[self.offsets[start]..self.offsets[end]]
    }

    pub fn as_str(&self) -> &'a str {
        self.text
    }
}

/// Candidate word boundaries: for each start position, the inclusive end
/// positions of dictionary words beginning there, in ascending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dag {
    ends: Vec<Vec<usize>>,
}

impl Dag {
    /// Inclusive end positions reachable from `start`; never empty.
    pub fn ends(&self, start: usize) -> &[usize] {
        &self.ends[start]
    }

    pub fn len(&self) -> usize {
        self.ends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ends.is_empty()
    }
}

/// Build the candidate graph of a run.
///
/// End `i` is a candidate for start `k` when `run[k..=i]` has a positive
/// count. A start with no candidate gets `k` itself, so every position has
/// a successor. The scan from `k` stops after the longest dictionary word.
pub fn build_dag(run: &CharRun<'_>, dict: &FrequencyTable) -> Dag {
    let char_count = run.len();
    let _span = debug_span!("build_dag", char_count).entered();
    let max_len = dict.max_word_chars();

    let mut ends = Vec::with_capacity(char_count);
    let mut candidate_count = 0;
    for k in 0..char_count {
        let limit = char_count.min(k + max_len);
        let mut list: Vec<usize> = (k..limit)
            .filter(|&i| dict.contains(run.slice(k, i + 1)))
            .collect();
        if list.is_empty() {
            list.push(k);
        }
        candidate_count += list.len();
        ends.push(list);
    }

    debug!(candidate_count);
    Dag { ends }
}
