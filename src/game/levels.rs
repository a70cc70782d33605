use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use tracing::{error, info};

use super::level::{Level, LevelDefinition};
use crate::error::GameError;
use crate::protocol::LevelId;

/// Where a level's definition comes from.
#[derive(Debug, Clone)]
pub enum LevelSource {
    /// JSON file, relative to the data directory.
    File(PathBuf),
    /// Definition held in memory (tests, embedded levels).
    Inline(LevelDefinition),
}

/// Level registry plus the process-lifetime cache of loaded levels.
pub struct LevelStore {
    data_dir: PathBuf,
    defined: HashMap<LevelId, LevelSource>,
    loaded: BTreeMap<LevelId, Level>,
}

impl LevelStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            defined: HashMap::new(),
            loaded: BTreeMap::new(),
        }
    }

    /// Read `world/defined_levels.json` under `data_dir`, a map of level
    /// id to level file path.
    pub fn load_registry(data_dir: &Path) -> Result<Self, GameError> {
        let path = data_dir.join("world").join("defined_levels.json");
        let contents = std::fs::read_to_string(&path).map_err(|e| GameError::Registry {
            path: path.clone(),
            details: e.to_string(),
        })?;
        let defined: HashMap<LevelId, PathBuf> =
            serde_json::from_str(&contents).map_err(|e| GameError::Registry {
                path: path.clone(),
                details: e.to_string(),
            })?;

        info!("Loaded {} ({} levels defined)", path.display(), defined.len());

        let mut store = Self::new(data_dir);
        for (id, file) in defined {
            store.define(id, LevelSource::File(file));
        }
        Ok(store)
    }

    pub fn define(&mut self, id: impl Into<LevelId>, source: LevelSource) {
        self.defined.insert(id.into(), source);
    }

    pub fn is_defined(&self, id: &str) -> bool {
        self.defined.contains_key(id)
    }

    /// Fetch and parse a level's definition. Does not touch the cache.
    pub fn definition(&self, id: &str) -> Result<LevelDefinition, GameError> {
        match self.defined.get(id) {
            Some(LevelSource::Inline(def)) => Ok(def.clone()),
            Some(LevelSource::File(rel)) => {
                let path = self.data_dir.join(rel);
                let contents =
                    std::fs::read_to_string(&path).map_err(|source| GameError::LevelFile {
                        path: path.clone(),
                        source,
                    })?;
                serde_json::from_str(&contents).map_err(|e| GameError::LevelParse {
                    level: id.to_string(),
                    details: e.to_string(),
                })
            }
            None => Err(GameError::UnknownLevel(id.to_string())),
        }
    }

    // ── Cache ───────────────────────────────────────────────────────

    pub fn is_loaded(&self, id: &str) -> bool {
        self.loaded.contains_key(id)
    }

    /// Publish a fully built level.
    pub fn insert(&mut self, level: Level) {
        self.loaded.insert(level.id.clone(), level);
    }

    pub fn get(&self, id: &str) -> Option<&Level> {
        let level = self.loaded.get(id);
        if level.is_none() {
            error!("Request for unloaded level {}", id);
        }
        level
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Level> {
        self.loaded.get_mut(id)
    }

    pub fn ids(&self) -> Vec<LevelId> {
        self.loaded.keys().cloned().collect()
    }
}
