//! Shared loaded resources, one lazily filled cell per [`ResourceKey`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use fenci_core::dict::FrequencyTable;
use fenci_core::hmm::HmmModel;
use tracing::debug;

use crate::error::Result;
use crate::source::ResourceKey;

/// A loaded table and model. Cloning shares both.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub dict: Arc<FrequencyTable>,
    pub model: Arc<HmmModel>,
}

type Cell = Arc<Mutex<Option<Loaded>>>;

/// Registry of loaded resources.
///
/// At most one loader runs per key; concurrent callers for the same key
/// block on that key's cell and then reuse its result, while loads for
/// other keys proceed in parallel. A failed load leaves the cell empty so
/// the next caller retries.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    cells: Mutex<HashMap<ResourceKey, Cell>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn cell(&self, key: &ResourceKey) -> Cell {
        let mut cells = self.cells.lock().unwrap();
        cells.entry(key.clone()).or_default().clone()
    }

    pub fn get_or_load<F>(&self, key: &ResourceKey, load: F) -> Result<Loaded>
    where
        F: FnOnce() -> Result<(FrequencyTable, HmmModel)>,
    {
        let cell = self.cell(key);
        let mut slot = cell.lock().unwrap();
        if let Some(loaded) = slot.as_ref() {
            debug!(dictionary = %key.dictionary, "reusing loaded resources");
            return Ok(loaded.clone());
        }
        let (dict, model) = load()?;
        let loaded = Loaded {
            dict: Arc::new(dict),
            model: Arc::new(model),
        };
        *slot = Some(loaded.clone());
        Ok(loaded)
    }

    /// Already loaded resources for `key`, without loading.
    pub fn get(&self, key: &ResourceKey) -> Option<Loaded> {
        let cell = self.cells.lock().unwrap().get(key).cloned()?;
        let slot = cell.lock().unwrap();
        slot.clone()
    }

    /// Drop the loaded resources for `key`; tokenizers holding them keep
    /// their copies. Returns whether anything was loaded.
    pub fn evict(&self, key: &ResourceKey) -> bool {
        let Some(cell) = self.cells.lock().unwrap().remove(key) else {
            return false;
        };
        let was_loaded = cell.lock().unwrap().is_some();
        was_loaded
    }
}
