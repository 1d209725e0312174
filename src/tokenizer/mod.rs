//! Public segmentation entry point.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::{Instant, SystemTime};

use fenci_core::dict::{
    parse_user_dictionary, DictError, DuplicatePolicy, FrequencyTable, UserWord,
};
use fenci_core::hmm::{HmmCounts, HmmModel, ModelUpdate};
use fenci_core::segmenter::{self, BufferPolicy, CutOptions, Tokens};
use fenci_core::settings::settings;
use tracing::{debug, info};

use crate::cache::CacheStore;
use crate::decode::decode_input;
use crate::error::Result;
use crate::registry::{Loaded, ResourceRegistry};
use crate::source::{DictionarySource, ModelSource, ResourceKey};

/// Per-tokenizer configuration. Unset fields default from
/// [`settings()`].
#[derive(Debug, Clone)]
pub struct TokenizerConfig {
    pub dictionary: DictionarySource,
    pub model: ModelSource,
    /// Snapshot directory; the system temp directory when `None`.
    pub cache_dir: Option<PathBuf>,
    pub cache_enabled: bool,
    pub options: CutOptions,
    /// Applied to repeated words inside the dictionary source.
    pub duplicate_policy: DuplicatePolicy,
    /// Applied by `add_word` when a frequency is given.
    pub user_word_policy: DuplicatePolicy,
}

impl TokenizerConfig {
    pub fn new(dictionary: DictionarySource) -> Self {
        let s = settings();
        Self {
            dictionary,
            model: ModelSource::Builtin,
            cache_dir: None,
            cache_enabled: s.cache.enabled,
            options: CutOptions::default(),
            duplicate_policy: s.dictionary.duplicate_policy,
            user_word_policy: s.dictionary.user_word_policy,
        }
    }

    pub fn model(mut self, model: ModelSource) -> Self {
        self.model = model;
        self
    }

    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn cache(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn hmm(mut self, enabled: bool) -> Self {
        self.options.hmm = enabled;
        self
    }

    pub fn buffer_policy(mut self, policy: BufferPolicy) -> Self {
        self.options.buffer_policy = policy;
        self
    }

    pub fn duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    pub fn user_word_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.user_word_policy = policy;
        self
    }

    pub fn resource_key(&self) -> ResourceKey {
        ResourceKey::new(&self.dictionary, &self.model, self.duplicate_policy)
    }

    pub fn cache_store(&self) -> CacheStore {
        let dir = self.cache_dir.clone().unwrap_or_else(std::env::temp_dir);
        CacheStore::new(dir, settings().cache.file_prefix.as_str())
    }
}

/// Chinese word segmenter.
///
/// Resources load on first use. Segmentation only reads the loaded table
/// and model, so one tokenizer can be shared across threads. Mutating
/// operations (`add_word`, `load_user_dict`, `learn_from_segmented`,
/// `update_model`) publish a new table or model; token streams already
/// in flight keep the one they started with.
pub struct Tokenizer {
    config: TokenizerConfig,
    registry: Arc<ResourceRegistry>,
    state: RwLock<Option<Loaded>>,
}

impl Tokenizer {
    pub fn new(config: TokenizerConfig) -> Self {
        Self::with_registry(config, Arc::new(ResourceRegistry::new()))
    }

    /// Tokenizers built on the same registry with the same resource key
    /// load their resources once.
    pub fn with_registry(config: TokenizerConfig, registry: Arc<ResourceRegistry>) -> Self {
        Self {
            config,
            registry,
            state: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &TokenizerConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.state.read().unwrap().is_some()
    }

    /// Load resources now instead of on first use.
    pub fn initialize(&self) -> Result<()> {
        self.loaded().map(|_| ())
    }

    fn loaded(&self) -> Result<Loaded> {
        if let Some(loaded) = self.state.read().unwrap().as_ref() {
            return Ok(loaded.clone());
        }
        let mut state = self.state.write().unwrap();
        if let Some(loaded) = state.as_ref() {
            return Ok(loaded.clone());
        }
        let key = self.config.resource_key();
        let loaded = self
            .registry
            .get_or_load(&key, || self.load_resources(&key))?;
        *state = Some(loaded.clone());
        Ok(loaded)
    }

    fn load_resources(&self, key: &ResourceKey) -> Result<(FrequencyTable, HmmModel)> {
        let build = || -> Result<(FrequencyTable, HmmModel)> {
            let started = Instant::now();
            let dict = self.config.dictionary.load(self.config.duplicate_policy)?;
            let model = self.config.model.load()?;
            info!(
                dictionary = %key.dictionary,
                entries = dict.len(),
                total = dict.total(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "built from source"
            );
            Ok((dict, model))
        };
        if !self.config.cache_enabled {
            return build();
        }
        let modified = latest(
            self.config.dictionary.modified()?,
            self.config.model.modified()?,
        );
        self.config
            .cache_store()
            .load_or_build(key, modified, build)
    }

    /// Run `f` on this tokenizer's resources under the write lock.
    fn update<R>(&self, f: impl FnOnce(&mut Loaded) -> Result<R>) -> Result<R> {
        let current = self.loaded()?;
        let mut state = self.state.write().unwrap();
        f(state.get_or_insert(current))
    }

    /// Segment `text` lazily with the configured options.
    pub fn cut<'t>(&self, text: &'t str) -> Result<Tokens<'t>> {
        self.cut_with(text, self.config.options)
    }

    pub fn cut_with<'t>(&self, text: &'t str, options: CutOptions) -> Result<Tokens<'t>> {
        let loaded = self.loaded()?;
        Ok(segmenter::cut(text, loaded.dict, loaded.model, options))
    }

    pub fn lcut<'t>(&self, text: &'t str) -> Result<Vec<&'t str>> {
        Ok(self.cut(text)?.collect())
    }

    /// Decode `bytes` (UTF-8, then GBK) and segment the result.
    pub fn cut_bytes(&self, bytes: &[u8]) -> Result<Vec<String>> {
        let text = decode_input(bytes)?;
        Ok(self.cut(&text)?.map(str::to_string).collect())
    }

    /// Add `word` to the dictionary, visible to every later `cut`.
    ///
    /// Without a frequency the word gets [`Tokenizer::suggest_frequency`];
    /// with one, the configured `user_word_policy` applies. Returns the
    /// word's resulting count.
    pub fn add_word(&self, word: &str, frequency: Option<u64>) -> Result<u64> {
        if word.is_empty() {
            return Err(DictError::EmptyWord.into());
        }
        let policy = self.config.user_word_policy;
        self.update(|loaded| {
            let dict = Arc::make_mut(&mut loaded.dict);
            Ok(add_to_table(dict, word, frequency, policy))
        })
    }

    /// Apply every line of a user dictionary file with `add_word`
    /// semantics. The file is parsed completely before anything is
    /// applied. Returns the number of words added.
    pub fn load_user_dict(&self, path: &Path) -> Result<usize> {
        let words = parse_user_dictionary(BufReader::new(File::open(path)?))?;
        self.add_user_words(&words)
    }

    pub fn add_user_words(&self, words: &[UserWord]) -> Result<usize> {
        let policy = self.config.user_word_policy;
        self.update(|loaded| {
            let dict = Arc::make_mut(&mut loaded.dict);
            for w in words {
                add_to_table(dict, &w.word, w.frequency, policy);
            }
            info!(words = words.len(), total = dict.total(), "user words added");
            Ok(words.len())
        })
    }

    /// Count every whitespace-separated token of segmented text once.
    pub fn learn_from_segmented(&self, text: &str) -> Result<usize> {
        self.update(|loaded| {
            let absorbed = Arc::make_mut(&mut loaded.dict).absorb_segmented(text);
            debug!(absorbed, "learned from segmented text");
            Ok(absorbed)
        })
    }

    /// Derive a new HMM from `counts` and swap it in.
    pub fn update_model(&self, counts: HmmCounts, mode: ModelUpdate) -> Result<()> {
        self.update(|loaded| {
            let model = loaded.model.updated(counts, mode)?;
            info!(
                vocabulary = model.vocabulary_size(),
                ?mode,
                "model updated"
            );
            loaded.model = Arc::new(model);
            Ok(())
        })
    }

    /// Smallest count that makes `word` cut as one token.
    pub fn suggest_frequency(&self, word: &str) -> Result<u64> {
        let loaded = self.loaded()?;
        Ok(segmenter::suggest_frequency(&loaded.dict, word))
    }

    pub fn dictionary(&self) -> Result<Arc<FrequencyTable>> {
        Ok(self.loaded()?.dict)
    }

    pub fn model(&self) -> Result<Arc<HmmModel>> {
        Ok(self.loaded()?.model)
    }
}

fn add_to_table(
    dict: &mut FrequencyTable,
    word: &str,
    frequency: Option<u64>,
    policy: DuplicatePolicy,
) -> u64 {
    let count = match frequency {
        Some(freq) => dict.insert(word, freq, policy),
        None => {
            let freq = segmenter::suggest_frequency(dict, word);
            dict.insert(word, freq, DuplicatePolicy::Overwrite)
        }
    };
    debug!(word, count, "word added");
    count
}

fn latest(a: Option<SystemTime>, b: Option<SystemTime>) -> Option<SystemTime> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

#[cfg(test)]
mod tests;
