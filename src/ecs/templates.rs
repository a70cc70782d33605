use std::collections::HashMap;
use std::path::Path;

use tracing::{info, warn};

use super::components::{ComponentSet, TemplateRef};
use crate::error::GameError;

/// Read-only archetype catalog: `namespace → key → default components`.
///
/// Each namespace lives in its own JSON file (`entities/monsters.json`
/// holds the `monsters` namespace). Loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    namespaces: HashMap<String, HashMap<String, ComponentSet>>,
}

impl TemplateCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.json` file in `dir` as a namespace named after the
    /// file stem. A missing directory yields an empty catalog; a malformed
    /// namespace file is an error.
    pub fn load_dir(dir: &Path) -> Result<Self, GameError> {
        let mut catalog = Self::new();

        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    "Template directory {} unavailable: {}. Using empty catalog.",
                    dir.display(),
                    e
                );
                return Ok(catalog);
            }
        };

        let mut paths: Vec<_> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().map_or(false, |ext| ext == "json"))
            .collect();
        paths.sort();

        for path in paths {
            let Some(namespace) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let namespace = namespace.to_string();
            let templates = std::fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|contents| {
                    serde_json::from_str::<HashMap<String, ComponentSet>>(&contents)
                        .map_err(|e| e.to_string())
                })
                .map_err(|details| GameError::Templates {
                    namespace: namespace.clone(),
                    path: path.clone(),
                    details,
                })?;

            info!(
                "Loaded {} templates for namespace '{}'",
                templates.len(),
                namespace
            );
            catalog.namespaces.insert(namespace, templates);
        }

        Ok(catalog)
    }

    pub fn insert(&mut self, template: &TemplateRef, components: ComponentSet) {
        self.namespaces
            .entry(template.namespace.clone())
            .or_default()
            .insert(template.key.clone(), components);
    }

    pub fn get(&self, template: &TemplateRef) -> Option<&ComponentSet> {
        self.namespaces
            .get(&template.namespace)
            .and_then(|ns| ns.get(&template.key))
    }

    pub fn len(&self) -> usize {
        self.namespaces.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
