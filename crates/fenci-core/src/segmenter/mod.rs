//! Text segmentation: script split, DAG search, and HMM fallback.
//!
//! [`cut`] returns a lazy [`Tokens`] iterator. Blocks of Han characters
//! (with attached ASCII letters, digits and connectors) are cut by
//! [`cut_block`]; everything else is split by whitespace runs and single
//! characters. Concatenating the tokens always reproduces the input.

mod dag;
mod route;

pub use dag::{build_dag, CharRun, Dag};
pub use route::{solve_route, Route, RouteStep};

use std::collections::VecDeque;
use std::iter::FusedIterator;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, debug_span};

use crate::dict::FrequencyTable;
use crate::hmm::{self, HmmModel};
use crate::settings::settings;
use crate::unicode::{split_blocks, split_han_runs, AlnumPieces, Block, Blocks, SkipTokens};

/// What to do with a buffer of single-character words that together spell
/// a dictionary word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum BufferPolicy {
    /// Emit every character on its own.
    #[default]
    #[serde(rename = "split")]
    SplitDictionaryWords,
    /// Emit the buffer as the single dictionary word it spells.
    #[serde(rename = "join")]
    EmitDictionaryWord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CutOptions {
    /// Send unknown multi-character buffers through the HMM.
    pub hmm: bool,
    pub buffer_policy: BufferPolicy,
}

impl Default for CutOptions {
    fn default() -> Self {
        let s = settings();
        Self {
            hmm: s.segment.hmm,
            buffer_policy: s.segment.dictionary_buffer,
        }
    }
}

/// Cut one segmentable block into words.
pub fn cut_block<'a>(
    block: &'a str,
    dict: &FrequencyTable,
    model: &HmmModel,
    options: &CutOptions,
) -> Vec<&'a str> {
    let run = CharRun::new(block);
    let _span = debug_span!("cut_block", char_count = run.len()).entered();
    let dag = build_dag(&run, dict);
    let route = solve_route(&run, &dag, dict);

    let mut words = Vec::new();
    let mut buffer_start: Option<usize> = None;
    for (start, end) in route.spans() {
        if end - start == 1 {
            buffer_start.get_or_insert(start);
            continue;
        }
        if let Some(b) = buffer_start.take() {
            flush_buffer(&run, b, start, dict, model, options, &mut words);
        }
        words.push(run.slice(start, end));
    }
    if let Some(b) = buffer_start.take() {
        flush_buffer(&run, b, run.len(), dict, model, options, &mut words);
    }

    debug!(word_count = words.len());
    words
}

/// Emit the pending single-character words `run[start..end]`.
fn flush_buffer<'a>(
    run: &CharRun<'a>,
    start: usize,
    end: usize,
    dict: &FrequencyTable,
    model: &HmmModel,
    options: &CutOptions,
    out: &mut Vec<&'a str>,
) {
    let buffer = run.slice(start, end);
    if end - start == 1 {
        out.push(buffer);
    } else if dict.contains(buffer) {
        match options.buffer_policy {
            BufferPolicy::SplitDictionaryWords => {
                out.extend((start..end).map(|i| run.slice(i, i + 1)));
            }
            BufferPolicy::EmitDictionaryWord => out.push(buffer),
        }
    } else if options.hmm {
        out.extend(hmm::cut_buffer(buffer, model));
    } else {
        for block in split_han_runs(buffer) {
            match block {
                Block::Han(han) => {
                    let chars = CharRun::new(han);
                    out.extend((0..chars.len()).map(|i| chars.slice(i, i + 1)));
                }
                Block::Other(rest) => out.extend(AlnumPieces::new(rest)),
            }
        }
    }
}

/// Lazy token stream over a text.
///
/// Single pass and forward only: once consumed it yields nothing more.
/// Calling [`cut`] again on the same text with the same table and model
/// yields the same tokens. The stream holds its own references to the
/// table and model, so later dictionary updates do not affect it.
pub struct Tokens<'t> {
    blocks: Blocks<'t>,
    pending: VecDeque<&'t str>,
    dict: Arc<FrequencyTable>,
    model: Arc<HmmModel>,
    options: CutOptions,
}

impl<'t> Iterator for Tokens<'t> {
    type Item = &'t str;

    fn next(&mut self) -> Option<&'t str> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Some(token);
            }
            match self.blocks.next()? {
                Block::Han(block) => self.pending.extend(cut_block(
                    block,
                    &self.dict,
                    &self.model,
                    &self.options,
                )),
                Block::Other(rest) => self.pending.extend(SkipTokens::new(rest)),
            }
        }
    }
}

impl FusedIterator for Tokens<'_> {}

/// Segment `text` into tokens.
pub fn cut(
    text: &str,
    dict: Arc<FrequencyTable>,
    model: Arc<HmmModel>,
    options: CutOptions,
) -> Tokens<'_> {
    Tokens {
        blocks: split_blocks(text),
        pending: VecDeque::new(),
        dict,
        model,
        options,
    }
}

/// Smallest count that makes `word` come out of the DAG search as a
/// single token, never lower than its current count.
pub fn suggest_frequency(dict: &FrequencyTable, word: &str) -> u64 {
    let run = CharRun::new(word);
    if run.is_empty() {
        return 0;
    }
    let total = dict.total().max(1) as f64;
    let dag = build_dag(&run, dict);
    let route = solve_route(&run, &dag, dict);
    let probability: f64 = route
        .spans()
        .map(|(start, end)| dict.get(run.slice(start, end)).max(1) as f64 / total)
        .product();
    let suggested = (probability * total) as u64 + 1;
    suggested.max(dict.get(word).max(1))
}
