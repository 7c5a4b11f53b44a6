use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::engine::types::ExecutionState;
use crate::storage::StateBackend;

/// State area below the project root.
pub const STATE_DIR: &str = ".guideflow/state";

/// File-based JSON state backend. Each workflow's run is stored as a separate JSON file.
pub struct JsonStateBackend {
    state_dir: PathBuf,
    lock: RwLock<()>,
}

impl JsonStateBackend {
    /// Store documents in the state area of a project root.
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self::with_state_dir(project_root.as_ref().join(STATE_DIR))
    }

    /// Store documents directly in `state_dir`.
    pub fn with_state_dir(state_dir: impl AsRef<Path>) -> Self {
        Self {
            state_dir: state_dir.as_ref().to_path_buf(),
            lock: RwLock::new(()),
        }
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    fn state_path(&self, workflow: &str) -> PathBuf {
        self.state_dir.join(format!("{}.json", workflow))
    }
}

#[async_trait]
impl StateBackend for JsonStateBackend {
    async fn read(&self, workflow: &str) -> Result<Option<ExecutionState>> {
        let _lock = self.lock.read().await;
        let path = self.state_path(workflow);

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(None);
        }

        let data = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;
        let state: ExecutionState = serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse state for workflow: {}", workflow))?;

        Ok(Some(state))
    }

    async fn write(&self, workflow: &str, state: &ExecutionState) -> Result<()> {
        let _lock = self.lock.write().await;

        tokio::fs::create_dir_all(&self.state_dir)
            .await
            .with_context(|| {
                format!("Failed to create state directory: {}", self.state_dir.display())
            })?;

        let path = self.state_path(workflow);
        let tmp_path = path.with_extension("json.tmp");

        let data = serde_json::to_string_pretty(state)?;
        tokio::fs::write(&tmp_path, &data).await?;
        tokio::fs::rename(&tmp_path, &path).await?;

        Ok(())
    }

    async fn remove(&self, workflow: &str) -> Result<()> {
        let _lock = self.lock.write().await;
        let path = self.state_path(workflow);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tokio::fs::remove_file(&path)
                .await
                .with_context(|| format!("Failed to delete state file: {}", path.display()))?;
        }
        Ok(())
    }

    async fn contains(&self, workflow: &str) -> bool {
        let _lock = self.lock.read().await;
        tokio::fs::try_exists(self.state_path(workflow))
            .await
            .unwrap_or(false)
    }

    fn location(&self, workflow: &str) -> String {
        self.state_path(workflow).display().to_string()
    }
}
