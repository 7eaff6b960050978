pub mod api;
pub mod config;
pub mod db;
pub mod model;

// Export API types
pub use api::handlers;
pub use api::routes;
pub use api::{ApiError, ApiResult, RowQuery, ServerState};

// Export all model types
pub use model::*;

// Export database access types
pub use db::{
    ColumnInfo, DatabaseClient, DatabaseRegistry, EngineKind, SelectQuery, TableResolver,
};

// Function for integration testing
pub async fn run_server() -> anyhow::Result<()> {
    use axum::serve;
    use std::sync::Arc;
    use tokio::net::TcpListener;

    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    // Initialize logging with INFO level only (suppress DEBUG logs)
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    // Load configuration
    let config = crate::config::AppConfig::load()?;

    // Connect every configured database
    let registry = crate::db::DatabaseRegistry::connect(&config.databases).await?;

    let state = Arc::new(crate::api::ServerState::new(registry));

    // Create router with state
    let app = crate::api::routes::create_router().with_state(state);

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;

    serve(listener, app).await?;

    Ok(())
}
