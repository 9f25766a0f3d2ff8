//! Storage backends for todo items.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::StorageConfig;
use crate::models::{ConcurrencyToken, TodoItem};

pub mod memory;
pub mod spanner;

pub use memory::InMemoryTodoStore;
pub use spanner::SpannerTodoStore;

/// Errors raised by a storage backend
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The row changed or vanished since its concurrency token was read
    #[error("Concurrency conflict on row {row_key}: token {token} is stale")]
    Conflict { row_key: String, token: String },

    #[error("Row already exists: {row_key}")]
    AlreadyExists { row_key: String },

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// A partitioned key-value table of todo items.
///
/// Every operation touches at most one row, except `scan_all`. Writes that
/// take a token only succeed while the stored row still carries it. The
/// wildcard token matches whatever version the row has at write time, but the
/// row must still exist.
#[async_trait]
pub trait TodoStore: Send + Sync + 'static {
    /// Insert a new row, returning the token assigned to it.
    async fn insert(&self, item: &TodoItem) -> Result<ConcurrencyToken>;

    async fn retrieve(&self, partition_key: &str, row_key: &str) -> Result<Option<TodoItem>>;

    /// Overwrite a row, returning its new token.
    async fn replace(&self, item: &TodoItem, token: &ConcurrencyToken) -> Result<ConcurrencyToken>;

    async fn delete(&self, item: &TodoItem, token: &ConcurrencyToken) -> Result<()>;

    /// Every row in `partition_key`, or in the whole table when `None`.
    async fn scan_all(
        &self,
        partition_key: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<TodoItem>>;

    async fn health_check(&self) -> Result<()>;
}

/// Open the configured storage backend.
pub async fn connect(config: &StorageConfig) -> anyhow::Result<Arc<dyn TodoStore>> {
    match config {
        StorageConfig::Memory => {
            tracing::warn!("Using in-memory storage; todos are lost on restart");
            Ok(Arc::new(InMemoryTodoStore::new()))
        }
        StorageConfig::Spanner(spanner) => {
            Ok(Arc::new(SpannerTodoStore::from_config(spanner).await?))
        }
    }
}
