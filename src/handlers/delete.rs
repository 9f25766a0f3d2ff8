use crate::error::ApiError;
use crate::models::ResponseEnvelope;
use crate::routes;
use crate::state::AppState;
use axum::{Json, extract::Path, extract::State, http::StatusCode};

/// DELETE /todo/{id} handler - Delete a todo, returning its last-known state
#[utoipa::path(
    delete,
    path = routes::TODO_ITEM,
    params(
        ("id" = String, Path, description = "Row key of the todo")
    ),
    responses(
        (status = 200, description = "Todo deleted", body = ResponseEnvelope),
        (status = 400, description = "Todo not found", body = ResponseEnvelope),
        (status = 500, description = "Storage error or concurrent modification", body = ResponseEnvelope)
    ),
    tag = "todo"
)]
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<ResponseEnvelope>), ApiError> {
    tracing::info!("Delete todo: {}, received.", id);

    let item = state.todos.delete(&id).await?;

    let message = format!("Todo: {}, deleted.", item.row_key);
    tracing::info!("{}", message);
    Ok((StatusCode::OK, Json(ResponseEnvelope::item(message, item))))
}

#[cfg(test)]
mod tests {
    use crate::error::NOT_FOUND_MESSAGE;
    use crate::test_utils::{create_todo, read_envelope, send, setup_test_app};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_delete_endpoint_success() {
        let (app, store) = setup_test_app();
        let created = create_todo(&app, "Buy milk").await;
        let uri = format!("/todo/{}", created.row_key);

        let response = send(&app, "DELETE", &uri, None).await;
        let (status, envelope) = read_envelope(response).await;

        assert_eq!(status, StatusCode::OK);
        assert!(envelope.success);
        assert_eq!(envelope.into_item().unwrap(), created);
        assert_eq!(store.len().await, 0);

        let response = send(&app, "GET", &uri, None).await;
        let (status, envelope) = read_envelope(response).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(envelope.message, NOT_FOUND_MESSAGE);
    }

    #[tokio::test]
    async fn test_delete_endpoint_not_found() {
        let (app, _) = setup_test_app();

        let response = send(&app, "DELETE", "/todo/does-not-exist", None).await;
        let (status, envelope) = read_envelope(response).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!envelope.success);
        assert_eq!(envelope.message, NOT_FOUND_MESSAGE);
    }

    #[tokio::test]
    async fn test_delete_endpoint_storage_failure() {
        let (app, store) = setup_test_app();
        let created = create_todo(&app, "Buy milk").await;
        store.set_fail_on_write(true).await;

        let uri = format!("/todo/{}", created.row_key);
        let response = send(&app, "DELETE", &uri, None).await;
        let (status, _) = read_envelope(response).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(store.len().await, 1);
    }
}
