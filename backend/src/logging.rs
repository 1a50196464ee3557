//! Tracing subscriber setup.
//!
//! Development logs human-readable lines to stdout. Production logs JSON to
//! stdout and to daily-rolling files: `combined.log` receives everything,
//! `error.log` only errors.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

use crate::config::{Config, Environment};
use crate::error::{AppError, Result};

fn default_directives(environment: Environment) -> &'static str {
    match environment {
        Environment::Development => "nodebird_backend=debug,nodebird=debug,info",
        Environment::Production => "info",
    }
}

/// Install the global subscriber. The returned guards flush the file writers
/// and must be held until shutdown.
pub fn init(config: &Config) -> Result<Vec<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(config.environment)));

    match config.environment {
        Environment::Development => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_target(false))
                .try_init()
                .map_err(|e| AppError::Config(format!("Failed to init logging: {}", e)))?;
            Ok(Vec::new())
        }
        Environment::Production => {
            std::fs::create_dir_all(&config.log_dir)?;

            let (combined, combined_guard) = tracing_appender::non_blocking(
                tracing_appender::rolling::daily(&config.log_dir, "combined.log"),
            );
            let (errors, error_guard) = tracing_appender::non_blocking(
                tracing_appender::rolling::daily(&config.log_dir, "error.log"),
            );

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json())
                .with(fmt::layer().json().with_ansi(false).with_writer(combined))
                .with(
                    fmt::layer()
                        .json()
                        .with_ansi(false)
                        .with_writer(errors)
                        .with_filter(LevelFilter::ERROR),
                )
                .try_init()
                .map_err(|e| AppError::Config(format!("Failed to init logging: {}", e)))?;

            Ok(vec![combined_guard, error_guard])
        }
    }
}
