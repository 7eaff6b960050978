use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};

use crate::api::handlers::{self, AppState};

/// All routes. `/health` is static and wins over the `:database` capture;
/// everything else is the database/table/id hierarchy.
pub fn create_router() -> Router<AppState> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Database discovery
        .route("/", get(handlers::list_databases))
        .route("/:database", get(handlers::list_tables))
        // Row access
        .route("/:database/:table", get(handlers::get_rows))
        .route("/:database/:table/:id", get(handlers::get_rows_by_id))
        .layer(cors)
}
