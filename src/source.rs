//! Where dictionaries and models come from, and how they are identified.

use std::fs::{self, File};
use std::io::{BufReader, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use fenci_core::dict::{parse_dictionary, DuplicatePolicy, FrequencyTable};
use fenci_core::hmm::HmmModel;

use crate::error::Result;

/// A `word freq [tag]` text dictionary.
#[derive(Debug, Clone)]
pub enum DictionarySource {
    File(PathBuf),
    /// In-memory content; `name` only labels it in logs and identities.
    Inline { name: String, content: Arc<str> },
}

impl DictionarySource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    pub fn inline(name: impl Into<String>, content: impl Into<Arc<str>>) -> Self {
        Self::Inline {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Stable identity: the absolute path for files, the name plus a
    /// content checksum for inline sources.
    pub fn identity(&self) -> String {
        match self {
            Self::File(path) => format!("file:{}", absolute(path).display()),
            Self::Inline { name, content } => {
                format!("inline:{name}:{:08x}", crc32fast::hash(content.as_bytes()))
            }
        }
    }

    /// Modification time of a file source; `None` for inline content.
    pub fn modified(&self) -> Result<Option<SystemTime>> {
        match self {
            Self::File(path) => Ok(Some(fs::metadata(path)?.modified()?)),
            Self::Inline { .. } => Ok(None),
        }
    }

    pub fn load(&self, policy: DuplicatePolicy) -> Result<FrequencyTable> {
        let table = match self {
            Self::File(path) => parse_dictionary(BufReader::new(File::open(path)?), policy)?,
            Self::Inline { content, .. } => {
                parse_dictionary(Cursor::new(content.as_bytes()), policy)?
            }
        };
        Ok(table)
    }
}

/// HMM parameters, as JSON counts or the built-in default model.
#[derive(Debug, Clone, Default)]
pub enum ModelSource {
    #[default]
    Builtin,
    File(PathBuf),
    Inline { name: String, content: Arc<str> },
}

impl ModelSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    pub fn inline(name: impl Into<String>, content: impl Into<Arc<str>>) -> Self {
        Self::Inline {
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn identity(&self) -> String {
        match self {
            Self::Builtin => "builtin".to_string(),
            Self::File(path) => format!("file:{}", absolute(path).display()),
            Self::Inline { name, content } => {
                format!("inline:{name}:{:08x}", crc32fast::hash(content.as_bytes()))
            }
        }
    }

    pub fn modified(&self) -> Result<Option<SystemTime>> {
        match self {
            Self::File(path) => Ok(Some(fs::metadata(path)?.modified()?)),
            Self::Builtin | Self::Inline { .. } => Ok(None),
        }
    }

    pub fn load(&self) -> Result<HmmModel> {
        let model = match self {
            Self::Builtin => HmmModel::default(),
            Self::File(path) => HmmModel::from_json(BufReader::new(File::open(path)?))?,
            Self::Inline { content, .. } => HmmModel::from_json(Cursor::new(content.as_bytes()))?,
        };
        Ok(model)
    }
}

/// Everything that determines the loaded table and model. Two tokenizers
/// with equal keys share one loaded copy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    pub dictionary: String,
    pub model: String,
    pub duplicate_policy: DuplicatePolicy,
}

impl ResourceKey {
    pub fn new(dict: &DictionarySource, model: &ModelSource, policy: DuplicatePolicy) -> Self {
        Self {
            dictionary: dict.identity(),
            model: model.identity(),
            duplicate_policy: policy,
        }
    }

    /// Single-line form used for cache file naming and validation.
    pub fn fingerprint(&self) -> String {
        format!(
            "{}\n{}\n{:?}",
            self.dictionary, self.model, self.duplicate_policy
        )
    }
}

fn absolute(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
