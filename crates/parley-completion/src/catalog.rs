// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON-file model catalog.
//!
//! The catalog is what `/model <id>` is validated against. It is seeded from
//! configuration when the file does not exist yet and refreshed by discovery.
//! Writes go to a temporary sibling file that is then renamed over the
//! catalog, so readers never see a half-written file.

use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use parley_core::ParleyError;
use parley_core::types::ModelInfo;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

pub struct ModelCatalog {
    path: PathBuf,
    models: RwLock<Vec<ModelInfo>>,
}

impl ModelCatalog {
    /// Loads the catalog at `path`, creating it from `seeds` when absent.
    pub async fn load_or_seed(path: impl Into<PathBuf>, seeds: &[String]) -> Result<Self, ParleyError> {
        let path = path.into();
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                let file: CatalogFile = serde_json::from_str(&content).map_err(|e| {
                    ParleyError::Config(format!(
                        "model catalog {} is not valid JSON: {e}",
                        path.display()
                    ))
                })?;
                debug!(path = %path.display(), models = file.models.len(), "model catalog loaded");
                Ok(Self {
                    path,
                    models: RwLock::new(file.models),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let catalog = Self {
                    path,
                    models: RwLock::new(Vec::new()),
                };
                catalog.replace(seed_models(seeds)).await?;
                info!(path = %catalog.path.display(), "model catalog seeded");
                Ok(catalog)
            }
            Err(e) => Err(ParleyError::storage(e)),
        }
    }

    /// In-memory catalog that is persisted to `path` only on [`ModelCatalog::replace`].
    pub fn with_models(path: impl Into<PathBuf>, models: Vec<ModelInfo>) -> Self {
        Self {
            path: path.into(),
            models: RwLock::new(models),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn list(&self) -> Vec<ModelInfo> {
        self.read().clone()
    }

    pub fn find_by_id(&self, id: &str) -> Option<ModelInfo> {
        self.read().iter().find(|m| m.id == id).cloned()
    }

    /// Replaces the catalog contents and persists them.
    pub async fn replace(&self, models: Vec<ModelInfo>) -> Result<(), ParleyError> {
        let encoded = serde_json::to_string_pretty(&CatalogFile {
            models: models.clone(),
        })
        .map_err(ParleyError::storage)?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(ParleyError::storage)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, encoded)
            .await
            .map_err(ParleyError::storage)?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(ParleyError::storage)?;

        *self.write() = models;
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<ModelInfo>> {
        self.models.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<ModelInfo>> {
        self.models.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Deduplicated seed list in configuration order.
fn seed_models(seeds: &[String]) -> Vec<ModelInfo> {
    let mut models: Vec<ModelInfo> = Vec::with_capacity(seeds.len());
    for id in seeds.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        if !models.iter().any(|m| m.id == id) {
            models.push(ModelInfo::new(id));
        }
    }
    models
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeds() -> Vec<String> {
        vec!["gpt-a".into(), "gpt-b".into(), "gpt-a".into(), " ".into()]
    }

    #[tokio::test]
    async fn seeds_missing_catalog_and_persists_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog/models.json");

        let catalog = ModelCatalog::load_or_seed(&path, &seeds()).await.unwrap();
        let ids: Vec<_> = catalog.list().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["gpt-a", "gpt-b"]);
        assert!(path.exists());

        let reloaded = ModelCatalog::load_or_seed(&path, &[]).await.unwrap();
        assert_eq!(reloaded.list().len(), 2);
    }

    #[tokio::test]
    async fn find_by_id_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = ModelCatalog::load_or_seed(dir.path().join("m.json"), &seeds())
            .await
            .unwrap();
        assert!(catalog.find_by_id("gpt-a").is_some());
        assert!(catalog.find_by_id("gpt").is_none());
        assert!(catalog.find_by_id("GPT-A").is_none());
    }

    #[tokio::test]
    async fn replace_swaps_contents_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.json");
        let catalog = ModelCatalog::load_or_seed(&path, &seeds()).await.unwrap();

        catalog
            .replace(vec![ModelInfo {
                id: "gpt-z".into(),
                label: Some("Zed".into()),
                context_window: Some(128_000),
            }])
            .await
            .unwrap();

        assert!(catalog.find_by_id("gpt-a").is_none());
        assert!(!path.with_extension("json.tmp").exists());
        let reloaded = ModelCatalog::load_or_seed(&path, &[]).await.unwrap();
        let model = reloaded.find_by_id("gpt-z").unwrap();
        assert_eq!(model.context_window, Some(128_000));
    }

    #[tokio::test]
    async fn corrupt_catalog_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.json");
        std::fs::write(&path, "not json").unwrap();
        let err = ModelCatalog::load_or_seed(&path, &seeds()).await.err().unwrap();
        assert!(matches!(err, ParleyError::Config(_)));
    }
}
