use utoipa::OpenApi;

use crate::error::{HealthResponse, UnhealthyResponse};
use crate::handlers;
use crate::models::{ConcurrencyToken, ResponseEnvelope, TodoItem, TodoRequest, TodoResult};

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "rust-spanner-todo API",
        version = "1.0.0",
        description = "A todo list service backed by Google Cloud Spanner"
    ),
    paths(
        handlers::health::health_handler,
        handlers::create::create_handler,
        handlers::update::update_handler,
        handlers::list::list_handler,
        handlers::get::get_handler,
        handlers::delete::delete_handler
    ),
    components(
        schemas(
            TodoItem,
            TodoRequest,
            TodoResult,
            ResponseEnvelope,
            ConcurrencyToken,
            HealthResponse,
            UnhealthyResponse
        )
    ),
    tags(
        (name = "health", description = "Health check operations"),
        (name = "todo", description = "Todo item operations")
    )
)]
pub struct ApiDoc;
