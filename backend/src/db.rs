//! Database pool and schema synchronisation.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::Config;
use crate::error::Result;

/// Build the connection pool without connecting. Connections are opened on
/// first use, so an unreachable database does not prevent startup.
pub fn connect_lazy(config: &Config) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect_lazy(&config.database_url)?;
    Ok(pool)
}

/// Apply pending migrations. Existing tables and rows are never dropped.
pub async fn sync(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
