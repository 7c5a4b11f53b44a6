pub mod json_store;
pub mod memory_store;
pub mod state_store;

use anyhow::Result;
use async_trait::async_trait;

use crate::engine::types::ExecutionState;

pub use state_store::ExecutionStateStore;

/// Trait for execution-state persistence. One document per workflow name;
/// the root location is fixed when the backend is constructed.
#[async_trait]
pub trait StateBackend: Send + Sync {
    /// Read the stored state. `Ok(None)` when nothing is stored; `Err` when the
    /// document exists but cannot be read or parsed.
    async fn read(&self, workflow: &str) -> Result<Option<ExecutionState>>;

    /// Replace the stored state.
    async fn write(&self, workflow: &str, state: &ExecutionState) -> Result<()>;

    /// Delete the stored state. Succeeds when nothing is stored.
    async fn remove(&self, workflow: &str) -> Result<()>;

    /// Whether a document is stored, regardless of its contents.
    async fn contains(&self, workflow: &str) -> bool;

    /// Human-readable location of the document, for messages.
    fn location(&self, workflow: &str) -> String;
}
