use tracing::{debug, debug_span};

use super::{HmmModel, State};
use crate::unicode::{split_han_runs, AlnumPieces, Block};

/// Most probable state path for `obs`, one label per observation.
///
/// Only the transitions allowed by [`State::predecessors`] are scored, so
/// the returned labels never contain e.g. an `M` right after an `E`. The
/// path must end in `E` or `S`; ties prefer the later label.
pub fn decode(obs: &[char], model: &HmmModel) -> Vec<State> {
    let len = obs.len();
    let _span = debug_span!("viterbi", len).entered();
    if len == 0 {
        return Vec::new();
    }

    // score[t][s] and back[t][s] = best predecessor of s at t
    let mut score = vec![[0.0f64; 4]; len];
    let mut back = vec![[State::B; 4]; len];

    for s in State::ALL {
        score[0][s.index()] = model.start(s) + model.emit(s, obs[0]);
    }

    for t in 1..len {
        for s in State::ALL {
            let emit = model.emit(s, obs[t]);
            let mut best: Option<(f64, State)> = None;
            for p in s.predecessors() {
                let cand = score[t - 1][p.index()] + model.trans(p, s) + emit;
                if best.map_or(true, |(b, _)| cand >= b) {
                    best = Some((cand, p));
                }
            }
            if let Some((value, prev)) = best {
                score[t][s.index()] = value;
                back[t][s.index()] = prev;
            }
        }
    }

    let last = &score[len - 1];
    let mut state = if last[State::S.index()] >= last[State::E.index()] {
        State::S
    } else {
        State::E
    };
    debug!(best_score = last[state.index()]);

    let mut path = vec![state; len];
    for t in (1..len).rev() {
        state = back[t][state.index()];
        path[t - 1] = state;
    }
    path
}

/// Cut a Han run into words from its decoded labels.
///
/// `B` opens a word, `E` closes it, `S` is a word by itself and `M` extends
/// the open word. A word still open when the next one starts, or at the
/// end of the run, is emitted as is, so no character is ever dropped.
pub fn cut<'a>(run: &'a str, model: &HmmModel) -> Vec<&'a str> {
    let obs: Vec<char> = run.chars().collect();
    let labels = decode(&obs, model);
    words_from_labels(run, &labels)
}

pub(crate) fn words_from_labels<'a>(run: &'a str, labels: &[State]) -> Vec<&'a str> {
    let mut words = Vec::new();
    // Start of the first character not yet emitted.
    let mut next = 0;
    for ((offset, ch), label) in run.char_indices().zip(labels) {
        let end = offset + ch.len_utf8();
        match label {
            State::B => {
                if next < offset {
                    words.push(&run[next..offset]);
                }
                next = offset;
            }
            State::M => {}
            State::E => {
                words.push(&run[next..end]);
                next = end;
            }
            State::S => {
                if next < offset {
                    words.push(&run[next..offset]);
                }
                words.push(&run[offset..end]);
                next = end;
            }
        }
    }
    if next < run.len() {
        words.push(&run[next..]);
    }
    words
}

/// Cut a buffered run that may mix Han characters with ASCII: Han
/// stretches go through [`cut`], the rest is split into alphanumeric
/// pieces.
pub fn cut_buffer<'a>(buffer: &'a str, model: &HmmModel) -> Vec<&'a str> {
    let mut words = Vec::new();
    for block in split_han_runs(buffer) {
        match block {
            Block::Han(run) => words.extend(cut(run, model)),
            Block::Other(rest) => words.extend(AlnumPieces::new(rest)),
        }
    }
    words
}
