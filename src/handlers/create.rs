use crate::error::ApiError;
use crate::models::{ResponseEnvelope, TodoRequest};
use crate::routes;
use crate::service::parse_request;
use crate::state::AppState;
use axum::{Json, body::Bytes, extract::State, http::StatusCode};

/// POST /todo handler - Create a todo
#[utoipa::path(
    post,
    path = routes::TODO_LIST,
    request_body = TodoRequest,
    responses(
        (status = 200, description = "Todo created", body = ResponseEnvelope),
        (status = 400, description = "Missing taskDescription or invalid JSON", body = ResponseEnvelope),
        (status = 500, description = "Storage error", body = ResponseEnvelope)
    ),
    tag = "todo"
)]
pub async fn create_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<ResponseEnvelope>), ApiError> {
    tracing::info!("Received a new todo.");

    let request = parse_request(&body)?;
    let item = state.todos.create(request).await?;

    let message = "New todo stored in table";
    tracing::info!("{} (id: {})", message, item.row_key);
    Ok((StatusCode::OK, Json(ResponseEnvelope::item(message, item))))
}
