use tracing::{debug, debug_span};

use super::dag::{CharRun, Dag};
use crate::dict::FrequencyTable;

/// Best continuation from one position of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteStep {
    /// Log-probability of the best segmentation of the suffix.
    pub score: f64,
    /// Inclusive end of the first word on that segmentation.
    pub best_end: usize,
}

/// Maximum-probability segmentation of a run, one step per position plus
/// the terminal step at `len`.
#[derive(Debug, Clone)]
pub struct Route {
    steps: Vec<RouteStep>,
}

impl Route {
    pub fn step(&self, idx: usize) -> RouteStep {
        self.steps[idx]
    }

    /// Char spans `[start, end)` of the chosen words, left to right.
    pub fn spans(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let len = self.steps.len() - 1;
        let mut x = 0;
        std::iter::from_fn(move || {
            if x >= len {
                return None;
            }
            let start = x;
            x = self.steps[x].best_end + 1;
            Some((start, x))
        })
    }
}

/// Solve the route backwards from the end of the run.
///
/// Each candidate word scores `ln(count) - ln(total)`, with a count of 1
/// for words missing from the table. Among equal scores the longer word
/// wins.
pub fn solve_route(run: &CharRun<'_>, dag: &Dag, dict: &FrequencyTable) -> Route {
    let len = run.len();
    let _span = debug_span!("solve_route", len).entered();
    let log_total = dict.log_total();

    let mut steps = vec![
        RouteStep {
            score: 0.0,
            best_end: len,
        };
        len + 1
    ];
    for idx in (0..len).rev() {
        let mut best: Option<RouteStep> = None;
        for &x in dag.ends(idx) {
            let count = dict.get(run.slice(idx, x + 1)).max(1);
            let score = (count as f64).ln() - log_total + steps[x + 1].score;
            let better = match best {
                None => true,
                Some(b) => score > b.score || (score == b.score && x > b.best_end),
            };
            if better {
                best = Some(RouteStep { score, best_end: x });
            }
        }
        if let Some(step) = best {
            steps[idx] = step;
        }
    }

    debug!(best_score = steps.first().map(|s| s.score));
    Route { steps }
}
