//! In-memory todo store, for local runs and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Result, StoreError, TodoStore};
use crate::models::{ConcurrencyToken, TodoItem};

/// Key type: (partition_key, row_key).
type RowKey = (String, String);

struct StoredRow {
    item: TodoItem,
    version: i64,
}

/// Todo store that keeps rows in a map behind a lock
#[derive(Default)]
pub struct InMemoryTodoStore {
    rows: RwLock<HashMap<RowKey, StoredRow>>,
    fail_on_write: RwLock<bool>,
    fail_on_read: RwLock<bool>,
}

impl InMemoryTodoStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn set_fail_on_write(&self, fail: bool) {
        *self.fail_on_write.write().await = fail;
    }

    #[cfg(test)]
    pub async fn set_fail_on_read(&self, fail: bool) {
        *self.fail_on_read.write().await = fail;
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    async fn check_write(&self) -> Result<()> {
        if *self.fail_on_write.read().await {
            return Err(anyhow::anyhow!("Simulated storage write failure").into());
        }
        Ok(())
    }

    async fn check_read(&self) -> Result<()> {
        if *self.fail_on_read.read().await {
            return Err(anyhow::anyhow!("Simulated storage read failure").into());
        }
        Ok(())
    }
}

fn key_of(item: &TodoItem) -> RowKey {
    (item.partition_key.clone(), item.row_key.clone())
}

fn conflict(row_key: &str, token: &ConcurrencyToken) -> StoreError {
    StoreError::Conflict {
        row_key: row_key.to_string(),
        token: token.to_string(),
    }
}

/// The stored row, provided `token` is the wildcard or names its version.
fn guarded<'a>(
    rows: &'a mut HashMap<RowKey, StoredRow>,
    item: &TodoItem,
    token: &ConcurrencyToken,
) -> Result<&'a mut StoredRow> {
    match rows.get_mut(&key_of(item)) {
        Some(row) if token.is_wildcard() || token.version() == Some(row.version) => Ok(row),
        _ => Err(conflict(&item.row_key, token)),
    }
}

fn snapshot(row: &StoredRow) -> TodoItem {
    let mut item = row.item.clone();
    item.etag = ConcurrencyToken::from_version(row.version);
    item
}

#[async_trait]
impl TodoStore for InMemoryTodoStore {
    async fn insert(&self, item: &TodoItem) -> Result<ConcurrencyToken> {
        self.check_write().await?;
        let mut rows = self.rows.write().await;
        let key = key_of(item);
        if rows.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                row_key: item.row_key.clone(),
            });
        }
        rows.insert(
            key,
            StoredRow {
                item: item.clone(),
                version: 1,
            },
        );
        Ok(ConcurrencyToken::from_version(1))
    }

    async fn retrieve(&self, partition_key: &str, row_key: &str) -> Result<Option<TodoItem>> {
        self.check_read().await?;
        let rows = self.rows.read().await;
        Ok(rows
            .get(&(partition_key.to_string(), row_key.to_string()))
            .map(snapshot))
    }

    async fn replace(&self, item: &TodoItem, token: &ConcurrencyToken) -> Result<ConcurrencyToken> {
        self.check_write().await?;
        let mut rows = self.rows.write().await;
        let row = guarded(&mut rows, item, token)?;
        row.item = item.clone();
        row.version += 1;
        Ok(ConcurrencyToken::from_version(row.version))
    }

    async fn delete(&self, item: &TodoItem, token: &ConcurrencyToken) -> Result<()> {
        self.check_write().await?;
        let mut rows = self.rows.write().await;
        guarded(&mut rows, item, token)?;
        rows.remove(&key_of(item));
        Ok(())
    }

    async fn scan_all(
        &self,
        partition_key: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<TodoItem>> {
        self.check_read().await?;
        let rows = self.rows.read().await;
        let mut items: Vec<TodoItem> = rows
            .iter()
            .filter(|((partition, _), _)| partition_key.is_none_or(|p| p == partition.as_str()))
            .map(|(_, row)| snapshot(row))
            .collect();
        // Primary key order, as a table scan would return.
        items.sort_by(|a, b| {
            (&a.partition_key, &a.row_key).cmp(&(&b.partition_key, &b.row_key))
        });
        if let Some(limit) = limit {
            items.truncate(limit);
        }
        Ok(items)
    }

    async fn health_check(&self) -> Result<()> {
        self.check_read().await
    }
}
