use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Result, bail};
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::engine::types::ExecutionState;
use crate::storage::StateBackend;

/// In-memory state backend. Holds state only for the lifetime of the instance.
pub struct MemoryStateBackend {
    states: Mutex<HashMap<String, ExecutionState>>,
    read_only: AtomicBool,
}

impl MemoryStateBackend {
    pub fn new() -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
            read_only: AtomicBool::new(false),
        }
    }

    /// Reject every write and removal, as a full or read-only disk would.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<()> {
        if self.read_only.load(Ordering::SeqCst) {
            bail!("State backend is read-only");
        }
        Ok(())
    }
}

impl Default for MemoryStateBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateBackend for MemoryStateBackend {
    async fn read(&self, workflow: &str) -> Result<Option<ExecutionState>> {
        Ok(self.states.lock().await.get(workflow).cloned())
    }

    async fn write(&self, workflow: &str, state: &ExecutionState) -> Result<()> {
        self.check_writable()?;
        self.states
            .lock()
            .await
            .insert(workflow.to_string(), state.clone());
        Ok(())
    }

    async fn remove(&self, workflow: &str) -> Result<()> {
        self.check_writable()?;
        self.states.lock().await.remove(workflow);
        Ok(())
    }

    async fn contains(&self, workflow: &str) -> bool {
        self.states.lock().await.contains_key(workflow)
    }

    fn location(&self, workflow: &str) -> String {
        format!("memory://{}", workflow)
    }
}
