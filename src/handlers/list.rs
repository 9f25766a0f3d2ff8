use crate::error::ApiError;
use crate::models::ResponseEnvelope;
use crate::routes;
use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};

/// GET /todo handler - List every todo in the partition
///
/// Order is whatever the store returns. No filtering or paging; the only
/// bound is the optional TODO_LIST_LIMIT ceiling.
#[utoipa::path(
    get,
    path = routes::TODO_LIST,
    responses(
        (status = 200, description = "All todos", body = ResponseEnvelope),
        (status = 500, description = "Storage error", body = ResponseEnvelope)
    ),
    tag = "todo"
)]
pub async fn list_handler(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<ResponseEnvelope>), ApiError> {
    tracing::info!("Get all todos received.");

    let items = state.todos.get_all().await?;

    let message = "Retrieved all todos.";
    tracing::info!(
        "{} ({} items, partition: {})",
        message,
        items.len(),
        state.todos.partition_key()
    );
    Ok((StatusCode::OK, Json(ResponseEnvelope::items(message, items))))
}
