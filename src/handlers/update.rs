use crate::error::ApiError;
use crate::models::{ResponseEnvelope, TodoRequest};
use crate::routes;
use crate::service::parse_request;
use crate::state::AppState;
use axum::{Json, body::Bytes, extract::Path, extract::State, http::StatusCode};

/// PUT /todo/{id} handler - Update a todo
///
/// `isCompleted` is always overwritten (omitted means false);
/// `taskDescription` only when a non-empty value is supplied.
#[utoipa::path(
    put,
    path = routes::TODO_ITEM,
    params(
        ("id" = String, Path, description = "Row key of the todo")
    ),
    request_body = TodoRequest,
    responses(
        (status = 200, description = "Todo updated", body = ResponseEnvelope),
        (status = 400, description = "Todo not found or invalid JSON", body = ResponseEnvelope),
        (status = 500, description = "Storage error or concurrent modification", body = ResponseEnvelope)
    ),
    tag = "todo"
)]
pub async fn update_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<ResponseEnvelope>), ApiError> {
    tracing::info!("Update for todo: {}, received.", id);

    let request = parse_request(&body)?;
    let item = state.todos.update(&id, request).await?;

    let message = format!("Todo: {}, updated in table.", id);
    tracing::info!("{}", message);
    Ok((StatusCode::OK, Json(ResponseEnvelope::item(message, item))))
}
