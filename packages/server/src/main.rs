use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use server::config::AppConfig;
use server::database::init_db;
use server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;

    let db = init_db(&config.database.url)
        .await
        .context("failed to initialize database")?;
    info!("Database ready");

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, db)
        .await
        .context("failed to initialize object storage")?;
    let app = server::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server running at http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
