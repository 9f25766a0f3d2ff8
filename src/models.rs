use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque version marker used for conditional replace and delete (an ETag).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(transparent)]
pub struct ConcurrencyToken(String);

impl ConcurrencyToken {
    /// Token meaning "no concurrency check".
    pub const WILDCARD: &'static str = "*";

    pub fn wildcard() -> Self {
        Self(Self::WILDCARD.to_string())
    }

    /// Token for a numeric row version, as assigned by the stores.
    pub fn from_version(version: i64) -> Self {
        Self(version.to_string())
    }

    pub fn is_wildcard(&self) -> bool {
        self.0 == Self::WILDCARD
    }

    /// The row version this token names, or `None` for the wildcard or a token
    /// no store could have issued.
    pub fn version(&self) -> Option<i64> {
        if self.is_wildcard() {
            None
        } else {
            self.0.parse().ok()
        }
    }
}

impl fmt::Display for ConcurrencyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A persisted todo item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    pub partition_key: String,
    /// Server-generated identifier, used as the item's external id
    pub row_key: String,
    pub created_time: DateTime<Utc>,
    pub task_description: String,
    pub is_completed: bool,
    #[serde(rename = "eTag")]
    pub etag: ConcurrencyToken,
}

/// Request body for create and update operations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TodoRequest {
    #[serde(alias = "TaskDescription")]
    pub task_description: Option<String>,
    #[serde(alias = "IsCompleted")]
    pub is_completed: Option<bool>,
}

/// Payload carried in the `result` field of a response envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(untagged)]
pub enum TodoResult {
    Item(TodoItem),
    Items(Vec<TodoItem>),
}

/// Uniform wrapper returned by every todo endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ResponseEnvelope {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TodoResult>,
}

impl ResponseEnvelope {
    pub fn item(message: impl Into<String>, item: TodoItem) -> Self {
        Self {
            success: true,
            message: message.into(),
            result: Some(TodoResult::Item(item)),
        }
    }

    pub fn items(message: impl Into<String>, items: Vec<TodoItem>) -> Self {
        Self {
            success: true,
            message: message.into(),
            result: Some(TodoResult::Items(items)),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            result: None,
        }
    }

    /// The single item in `result`, if that is what this envelope carries.
    #[cfg(test)]
    pub fn into_item(self) -> Option<TodoItem> {
        match self.result {
            Some(TodoResult::Item(item)) => Some(item),
            _ => None,
        }
    }

    /// The item list in `result`, if that is what this envelope carries.
    #[cfg(test)]
    pub fn into_items(self) -> Option<Vec<TodoItem>> {
        match self.result {
            Some(TodoResult::Items(items)) => Some(items),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_item() -> TodoItem {
        TodoItem {
            partition_key: "TODO".to_string(),
            row_key: "550e8400-e29b-41d4-a716-446655440000".to_string(),
            created_time: DateTime::parse_from_rfc3339("2024-05-01T10:00:00.123456Z")
                .unwrap()
                .with_timezone(&Utc),
            task_description: "Buy milk".to_string(),
            is_completed: false,
            etag: ConcurrencyToken::from_version(1),
        }
    }

    #[test]
    fn test_item_uses_camel_case_fields() {
        let value = serde_json::to_value(sample_item()).unwrap();

        assert_eq!(value["partitionKey"], "TODO");
        assert_eq!(value["rowKey"], "550e8400-e29b-41d4-a716-446655440000");
        assert_eq!(value["taskDescription"], "Buy milk");
        assert_eq!(value["isCompleted"], false);
        assert_eq!(value["eTag"], "1");
        assert!(value["createdTime"].as_str().unwrap().starts_with("2024-05-01T10:00:00.123456"));
    }

    #[test]
    fn test_request_fields_are_optional() {
        let request: TodoRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(request, TodoRequest::default());

        let request: TodoRequest =
            serde_json::from_value(json!({"taskDescription": "New", "isCompleted": true})).unwrap();
        assert_eq!(request.task_description.as_deref(), Some("New"));
        assert_eq!(request.is_completed, Some(true));
    }

    #[test]
    fn test_request_accepts_pascal_case_fields() {
        let request: TodoRequest =
            serde_json::from_value(json!({"TaskDescription": "x", "IsCompleted": true})).unwrap();
        assert_eq!(request.task_description.as_deref(), Some("x"));
        assert_eq!(request.is_completed, Some(true));

        let serialized = serde_json::to_value(&request).unwrap();
        assert_eq!(serialized, json!({"taskDescription": "x", "isCompleted": true}));
    }

    #[test]
    fn test_failure_envelope_omits_result() {
        let value = serde_json::to_value(ResponseEnvelope::failure("Todo not found.")).unwrap();

        assert_eq!(value, json!({"success": false, "message": "Todo not found."}));
    }

    #[test]
    fn test_envelope_result_shapes() {
        let single = serde_json::to_value(ResponseEnvelope::item("ok", sample_item())).unwrap();
        assert!(single["result"].is_object());

        let many = serde_json::to_value(ResponseEnvelope::items("ok", vec![sample_item()])).unwrap();
        assert!(many["result"].is_array());

        let decoded: ResponseEnvelope = serde_json::from_value(many).unwrap();
        assert_eq!(decoded.into_items().unwrap().len(), 1);
    }

    #[test]
    fn test_token_versions() {
        assert!(ConcurrencyToken::wildcard().is_wildcard());
        assert_eq!(ConcurrencyToken::wildcard().version(), None);
        assert_eq!(ConcurrencyToken::from_version(7).version(), Some(7));
        assert_eq!(ConcurrencyToken("W/\"garbage\"".to_string()).version(), None);
    }
}
