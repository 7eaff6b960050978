use axum::serve;
use restable::api::routes::create_router;
use restable::api::ServerState;
use restable::config::AppConfig;
use restable::db::DatabaseRegistry;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    // Initialize logging with explicit filter to suppress sqlx debug logs
    use env_logger::Builder;
    use log::LevelFilter;

    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module("sqlx", LevelFilter::Warn)
        .init();

    println!("Restable: REST gateway for relational databases");

    // Load configuration
    let config = AppConfig::load()?;
    println!(
        "Configuration loaded: server={}:{}, {} database(s)",
        config.server.host,
        config.server.port,
        config.databases.len()
    );
    if config.databases.is_empty() {
        log::warn!("no databases configured, only the root listing will respond");
    }

    println!("Connecting configured databases...");
    let registry = DatabaseRegistry::connect(&config.databases).await?;
    println!("All databases connected");

    let state = Arc::new(ServerState::new(registry));

    run_server(create_router().with_state(state), &config).await?;

    Ok(())
}

async fn run_server(app: axum::Router, config: &AppConfig) -> anyhow::Result<()> {
    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    println!("Restable server running on http://{}", bind_address);

    serve(listener, app).await?;

    Ok(())
}
