// Route path constants - single source of truth for all API paths

pub const HEALTH: &str = "/health";
pub const TODO_LIST: &str = "/todo";
pub const TODO_ITEM: &str = "/todo/{id}";
pub const SWAGGER_UI: &str = "/swagger-ui";
pub const OPENAPI_JSON: &str = "/api-docs/openapi.json";
