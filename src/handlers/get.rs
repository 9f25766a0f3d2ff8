use crate::error::ApiError;
use crate::models::ResponseEnvelope;
use crate::routes;
use crate::state::AppState;
use axum::{Json, extract::Path, extract::State, http::StatusCode};

/// GET /todo/{id} handler - Retrieve a single todo
#[utoipa::path(
    get,
    path = routes::TODO_ITEM,
    params(
        ("id" = String, Path, description = "Row key of the todo")
    ),
    responses(
        (status = 200, description = "Todo found", body = ResponseEnvelope),
        (status = 400, description = "Todo not found", body = ResponseEnvelope),
        (status = 500, description = "Storage error", body = ResponseEnvelope)
    ),
    tag = "todo"
)]
pub async fn get_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<ResponseEnvelope>), ApiError> {
    tracing::info!("Get todo by id: {}, received.", id);

    let item = state.todos.get_by_id(&id).await?;

    let message = format!("Todo: {}, retrieved.", item.row_key);
    tracing::info!("{}", message);
    Ok((StatusCode::OK, Json(ResponseEnvelope::item(message, item))))
}
