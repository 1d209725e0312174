//! Four-state character tagging model (B/M/E/S) for out-of-vocabulary runs.
//!
//! Probabilities are stored as natural logs. Pairs the model never saw
//! (missing transitions or emissions) score as [`MIN_LOG_PROB`], a very
//! negative stand-in for `ln(0)` that keeps the Viterbi sums finite.

mod viterbi;

pub use viterbi::{cut, cut_buffer, decode};

use std::collections::{BTreeMap, HashMap};
use std::io::Read;

use serde::{Deserialize, Serialize};

/// Floor score for unseen `(state, char)` and `(state, state)` pairs.
pub const MIN_LOG_PROB: f64 = -3.14e100;

/// Hidden state of a character: word Begin, Middle, End, or Single.
///
/// Variants are declared in label order; when two Viterbi candidates tie,
/// the later label wins.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum State {
    B,
    E,
    M,
    S,
}

impl State {
    pub const ALL: [State; 4] = [State::B, State::E, State::M, State::S];

    fn index(self) -> usize {
        self as usize
    }

    /// States allowed immediately before `self`, in label order.
    pub fn predecessors(self) -> [State; 2] {
        match self {
            State::B => [State::E, State::S],
            State::E => [State::B, State::M],
            State::M => [State::B, State::M],
            State::S => [State::E, State::S],
        }
    }
}

const DEFAULT_START: [f64; 4] = [
    -0.262_686_608_092_500_16, // B
    MIN_LOG_PROB,              // E
    MIN_LOG_PROB,              // M
    -1.465_263_339_853_767_8,  // S
];

const DEFAULT_TRANS: [[f64; 4]; 4] = [
    // from B: to B, E, M, S
    [MIN_LOG_PROB, -0.510_825_623_765_990, -0.916_290_731_874_155, MIN_LOG_PROB],
    // from E
    [-0.589_714_973_685_451_3, MIN_LOG_PROB, MIN_LOG_PROB, -0.808_525_047_466_993_7],
    // from M
    [MIN_LOG_PROB, -0.333_448_568_119_485_14, -1.260_362_382_026_822_6, MIN_LOG_PROB],
    // from S
    [-0.721_196_565_466_984_1, MIN_LOG_PROB, MIN_LOG_PROB, -0.665_863_144_879_821_2],
];

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing transition counts for state {0:?}")]
    MissingTransitions(State),

    #[error("transition counts for state {0:?} sum to zero")]
    EmptyRow(State),

    #[error("start log-probability for state {0:?} is not a finite number")]
    NonFiniteStart(State),
}

/// How new counts are combined with a model's existing counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelUpdate {
    /// Add the new counts to the retained ones.
    Merge,
    /// Discard the retained counts.
    Replace,
}

/// Raw observation counts a model is derived from.
///
/// JSON form: `{"trans": {"B": {"E": 10, ...}, ...}, "emit": {"B": {"中": 3,
/// ...}, ...}, "start": {"B": -0.26, ...}}` where `start` holds
/// log-probabilities and is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HmmCounts {
    #[serde(default)]
    pub start: Option<BTreeMap<State, f64>>,
    pub trans: BTreeMap<State, BTreeMap<State, u64>>,
    #[serde(default)]
    pub emit: BTreeMap<State, BTreeMap<char, u64>>,
}

impl HmmCounts {
    pub fn from_json<R: Read>(reader: R) -> Result<Self, ModelError> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Element-wise sum of two count tables, saturating at `u64::MAX`.
    /// Start probabilities come from `other` when it has them.
    pub fn merged(&self, other: &HmmCounts) -> HmmCounts {
        let mut out = self.clone();
        for (from, row) in &other.trans {
            let target = out.trans.entry(*from).or_default();
            for (to, n) in row {
                let slot = target.entry(*to).or_insert(0);
                *slot = slot.saturating_add(*n);
            }
        }
        for (state, row) in &other.emit {
            let target = out.emit.entry(*state).or_default();
            for (ch, n) in row {
                let slot = target.entry(*ch).or_insert(0);
                *slot = slot.saturating_add(*n);
            }
        }
        if other.start.is_some() {
            out.start = other.start.clone();
        }
        out
    }
}

fn row_total<K>(row: &BTreeMap<K, u64>) -> u64 {
    row.values().fold(0, |acc, &n| acc.saturating_add(n))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HmmModel {
    start: [f64; 4],
    /// `trans[from][to]`
    trans: [[f64; 4]; 4],
    emit: [HashMap<char, f64>; 4],
    floor: f64,
    /// Counts the model was derived from; `None` for the built-in model.
    counts: Option<HmmCounts>,
}

impl Default for HmmModel {
    fn default() -> Self {
        Self {
            start: DEFAULT_START,
            trans: DEFAULT_TRANS,
            emit: Default::default(),
            floor: MIN_LOG_PROB,
            counts: None,
        }
    }
}

impl HmmModel {
    /// Normalise each count row into log-probabilities.
    pub fn from_counts(counts: HmmCounts) -> Result<Self, ModelError> {
        let mut start = DEFAULT_START;
        if let Some(given) = &counts.start {
            for (state, &p) in given {
                if p.is_nan() || p == f64::INFINITY {
                    return Err(ModelError::NonFiniteStart(*state));
                }
                start[state.index()] = p;
            }
        }

        let mut trans = [[MIN_LOG_PROB; 4]; 4];
        for from in State::ALL {
            let row = counts
                .trans
                .get(&from)
                .ok_or(ModelError::MissingTransitions(from))?;
            let sum = row_total(row);
            if sum == 0 {
                return Err(ModelError::EmptyRow(from));
            }
            for (to, &n) in row {
                if n > 0 {
                    trans[from.index()][to.index()] = log_ratio(n, sum);
                }
            }
        }

        let mut emit: [HashMap<char, f64>; 4] = Default::default();
        for (state, row) in &counts.emit {
            let sum = row_total(row);
            if sum == 0 {
                continue;
            }
            let table = &mut emit[state.index()];
            table.reserve(row.len());
            for (&ch, &n) in row {
                if n > 0 {
                    table.insert(ch, log_ratio(n, sum));
                }
            }
        }

        Ok(Self {
            start,
            trans,
            emit,
            floor: MIN_LOG_PROB,
            counts: Some(counts),
        })
    }

    pub fn from_json<R: Read>(reader: R) -> Result<Self, ModelError> {
        Self::from_counts(HmmCounts::from_json(reader)?)
    }

    /// Derive a new model from this one and additional counts. The
    /// receiver is left untouched so callers can swap models atomically.
    pub fn updated(&self, counts: HmmCounts, mode: ModelUpdate) -> Result<Self, ModelError> {
        let combined = match (mode, &self.counts) {
            (ModelUpdate::Merge, Some(old)) => old.merged(&counts),
            _ => counts,
        };
        Self::from_counts(combined)
    }

    pub fn start(&self, state: State) -> f64 {
        self.start[state.index()]
    }

    pub fn trans(&self, from: State, to: State) -> f64 {
        self.trans[from.index()][to.index()]
    }

    /// Emission log-probability, the floor when the pair was never seen.
    pub fn emit(&self, state: State, ch: char) -> f64 {
        self.emit[state.index()]
            .get(&ch)
            .copied()
            .unwrap_or(self.floor)
    }

    pub fn floor(&self) -> f64 {
        self.floor
    }

    pub fn counts(&self) -> Option<&HmmCounts> {
        self.counts.as_ref()
    }

    /// Number of distinct characters with an emission for any state.
    pub fn vocabulary_size(&self) -> usize {
        let mut chars: Vec<char> = self.emit.iter().flat_map(|t| t.keys().copied()).collect();
        chars.sort_unstable();
        chars.dedup();
        chars.len()
    }
}

fn log_ratio(n: u64, sum: u64) -> f64 {
    (n as f64 / sum as f64).ln()
}
