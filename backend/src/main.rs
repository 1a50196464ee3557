use anyhow::Context;

use nodebird_backend::api::{self, AppState};
use nodebird_backend::config::Config;
use nodebird_backend::session::RedisSessionStore;
use nodebird_backend::templates::Templates;
use nodebird_backend::{db, logging, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Failed to load configuration")?;
    let _log_guards = logging::init(&config)?;
    tracing::info!(environment = ?config.environment, port = config.port, "Starting NodeBird");

    let store = RedisSessionStore::connect(&config.redis_url())
        .await
        .context("Failed to connect to Redis")?;

    let templates = Templates::new(&config.views_dir, !config.environment.is_production());

    let pool = db::connect_lazy(&config)?;
    match db::sync(&pool).await {
        Ok(()) => tracing::info!("Database connection established"),
        Err(e) => tracing::error!(error = %e, "Database sync failed"),
    }

    tokio::fs::create_dir_all(&config.uploads_dir)
        .await
        .with_context(|| format!("Failed to create {}", config.uploads_dir.display()))?;

    let addr = config.bind_addr();
    let state = AppState::new(config, pool, templates);
    let app = api::build_router(state, store);

    server::serve(app, addr).await?;
    Ok(())
}
