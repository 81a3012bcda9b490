use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use model_eval_backtest::{RunStore, StoredRun, WalkForwardResponse, WalkForwardResult};

/// Stores each run as `{dir}/{run_id}.json`, where `run_id` is `{model_id}_{created_at}`.
#[derive(Debug, Clone)]
pub struct JsonRunStore {
    dir: PathBuf,
}

fn is_safe_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

impl JsonRunStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_prefix(model_id: &str) -> String {
        let safe: String = model_id
            .chars()
            .map(|c| if is_safe_char(c) { c } else { '_' })
            .collect();
        format!("{safe}_")
    }

    /// Path for `run_id`, or `None` if the id could escape the run directory.
    fn run_path(&self, run_id: &str) -> Option<PathBuf> {
        let valid =
            !run_id.is_empty() && !run_id.starts_with('.') && run_id.chars().all(is_safe_char);
        valid.then(|| self.dir.join(format!("{run_id}.json")))
    }

    /// Writes `result` and returns the file path.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created or the file cannot be written.
    pub async fn save_run(&self, result: &WalkForwardResult) -> Result<PathBuf> {
        let created_at = Utc::now();
        let run_id = format!(
            "{}{}",
            Self::file_prefix(&result.params.model_id),
            created_at.format("%Y%m%dT%H%M%S%.6fZ")
        );
        let path = self.dir.join(format!("{run_id}.json"));
        let stored = StoredRun {
            run_id,
            created_at,
            run: WalkForwardResponse::from(result),
        };

        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create run directory: {}", self.dir.display()))?;

        let json = serde_json::to_vec_pretty(&stored)?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("Failed to write run file: {}", path.display()))?;

        tracing::info!("Saved walk-forward run to {}", path.display());
        Ok(path)
    }

    /// Reads one stored run.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub async fn load(path: impl AsRef<Path>) -> Result<StoredRun> {
        let path = path.as_ref();
        let raw = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read run file: {}", path.display()))?;
        serde_json::from_slice(&raw)
            .with_context(|| format!("Failed to parse run file: {}", path.display()))
    }
}

#[async_trait]
impl RunStore for JsonRunStore {
    async fn save(&self, result: &WalkForwardResult) -> Result<()> {
        self.save_run(result).await.map(|_| ())
    }

    /// Unreadable files are skipped with a warning.
    async fn list(&self, model_id: Option<&str>, limit: usize) -> Result<Vec<StoredRun>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to list run directory: {}", self.dir.display())
                })
            }
        };

        let prefix = model_id.map(Self::file_prefix).unwrap_or_default();
        let mut runs = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !name.starts_with(&prefix) || !name.ends_with(".json") {
                continue;
            }
            match Self::load(entry.path()).await {
                Ok(run) if model_id.map_or(true, |id| run.run.params.model_id == id) => {
                    runs.push(run);
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Skipping run file {}: {:#}", name, e),
            }
        }

        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        runs.truncate(limit);
        Ok(runs)
    }

    async fn get(&self, run_id: &str) -> Result<Option<StoredRun>> {
        let Some(path) = self.run_path(run_id) else {
            return Ok(None);
        };
        match tokio::fs::metadata(&path).await {
            Ok(_) => Self::load(&path).await.map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to read run file: {}", path.display()))
            }
        }
    }
}
