//! Dictionary-driven Chinese word segmentation with an HMM fallback.
//!
//! Han runs are cut by a maximum-probability path over a candidate DAG
//! built from a [`dict::FrequencyTable`]; stretches the dictionary cannot
//! explain are handed to a four-state [`hmm::HmmModel`] decoded with
//! Viterbi.

pub mod dict;
pub mod hmm;
pub mod segmenter;
pub mod settings;
pub mod unicode;
