use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use model_eval_core::{ModelRecord, ModelRegistry};

/// Model registry backed by the training pipeline's `registry.json`.
///
/// The file holds a JSON array of model records in publication order. A missing file is an
/// empty registry; a file that does not parse is an error.
#[derive(Debug, Clone)]
pub struct JsonModelRegistry {
    path: PathBuf,
}

impl JsonModelRegistry {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Looks up a single model by exact id.
    ///
    /// # Errors
    /// Returns an error if the registry file exists but cannot be read or parsed.
    pub async fn get_model(&self, model_id: &str) -> Result<Option<ModelRecord>> {
        Ok(self
            .read()
            .await?
            .into_iter()
            .find(|m| m.model_id == model_id))
    }

    async fn read(&self) -> Result<Vec<ModelRecord>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(
                    "Model registry {} not found, treating as empty",
                    self.path.display()
                );
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read model registry: {}", self.path.display())
                })
            }
        };

        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse model registry: {}", self.path.display()))
    }
}

#[async_trait]
impl ModelRegistry for JsonModelRegistry {
    async fn list_models(&self) -> Result<Vec<ModelRecord>> {
        self.read().await
    }
}
