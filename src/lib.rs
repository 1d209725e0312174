//! Chinese word segmentation.
//!
//! A [`Tokenizer`] loads a word frequency dictionary and an HMM (through an
//! on-disk snapshot cache when enabled) on first use, then cuts text into
//! words:
//!
//! ```no_run
//! use fenci::{DictionarySource, Tokenizer, TokenizerConfig};
//!
//! let tokenizer = Tokenizer::new(TokenizerConfig::new(DictionarySource::file("dict.txt")));
//! let words = tokenizer.lcut("我来到北京清华大学")?;
//! # Ok::<(), fenci::FenciError>(())
//! ```
//!
//! The algorithms live in `fenci_core`, re-exported here.

pub mod cache;
pub mod decode;
mod error;
pub mod registry;
pub mod source;
pub mod tokenizer;
pub mod trace_init;

pub use error::{FenciError, Result};
pub use fenci_core::{dict, hmm, segmenter, settings, unicode};
pub use source::{DictionarySource, ModelSource, ResourceKey};
pub use tokenizer::{Tokenizer, TokenizerConfig};

use std::path::Path;

/// Use the TOML file at `path` as the process settings. Must run before
/// anything reads the settings.
pub fn load_settings(path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)?;
    settings::init_custom(content)?;
    Ok(())
}
