//! The five todo operations, independent of HTTP.

use std::sync::Arc;

use axum::body::Bytes;
use chrono::{SubsecRound, Utc};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{ConcurrencyToken, TodoItem, TodoRequest};
use crate::store::{self, TodoStore};

pub const MISSING_DESCRIPTION_MESSAGE: &str = "The request must have a taskDescription.";

/// Stateless todo operations over a single partition of a [`TodoStore`].
#[derive(Clone)]
pub struct TodoService {
    store: Arc<dyn TodoStore>,
    partition_key: Arc<str>,
    list_limit: Option<usize>,
}

impl TodoService {
    pub fn new(store: Arc<dyn TodoStore>, partition_key: impl Into<Arc<str>>) -> Self {
        Self {
            store,
            partition_key: partition_key.into(),
            list_limit: None,
        }
    }

    /// Cap the number of items `get_all` returns.
    pub fn with_list_limit(mut self, limit: Option<usize>) -> Self {
        self.list_limit = limit;
        self
    }

    pub fn partition_key(&self) -> &str {
        &self.partition_key
    }

    pub async fn create(&self, request: TodoRequest) -> Result<TodoItem, ApiError> {
        let description = match request.task_description {
            Some(description) if !description.is_empty() => description,
            _ => return Err(ApiError::Validation(MISSING_DESCRIPTION_MESSAGE.to_string())),
        };

        let mut item = TodoItem {
            partition_key: self.partition_key.to_string(),
            row_key: Uuid::new_v4().to_string(),
            // Storage keeps microseconds; truncate so reads match the response.
            created_time: Utc::now().trunc_subsecs(6),
            task_description: description,
            is_completed: false,
            etag: ConcurrencyToken::wildcard(),
        };

        item.etag = self.store.insert(&item).await?;
        Ok(item)
    }

    pub async fn update(&self, id: &str, request: TodoRequest) -> Result<TodoItem, ApiError> {
        let mut item = self.find(id).await?;

        // An omitted flag means false, so any update without it reopens the todo.
        item.is_completed = request.is_completed.unwrap_or(false);
        if let Some(description) = request.task_description.filter(|d| !d.is_empty()) {
            item.task_description = description;
        }

        let token = item.etag.clone();
        item.etag = self.store.replace(&item, &token).await?;
        Ok(item)
    }

    pub async fn get_all(&self) -> Result<Vec<TodoItem>, ApiError> {
        Ok(self
            .store
            .scan_all(Some(&*self.partition_key), self.list_limit)
            .await?)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<TodoItem, ApiError> {
        self.find(id).await
    }

    /// Delete the todo, returning its last-known state.
    pub async fn delete(&self, id: &str) -> Result<TodoItem, ApiError> {
        let item = self.find(id).await?;
        self.store.delete(&item, &item.etag).await?;
        Ok(item)
    }

    pub async fn health_check(&self) -> store::Result<()> {
        self.store.health_check().await
    }

    async fn find(&self, id: &str) -> Result<TodoItem, ApiError> {
        self.store
            .retrieve(&self.partition_key, id)
            .await?
            .ok_or_else(|| ApiError::TodoNotFound(id.to_string()))
    }
}

/// Decode a todo request body. An empty body or a JSON `null` is a request
/// with no fields set.
pub fn parse_request(body: &Bytes) -> Result<TodoRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(TodoRequest::default());
    }
    let request: Option<TodoRequest> = serde_json::from_slice(body)?;
    Ok(request.unwrap_or_default())
}
