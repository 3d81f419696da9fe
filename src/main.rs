mod app;
mod auth;
mod config;
mod error;
mod routes;
mod state;

use crate::config::{AppConfig, LogFormat};

/// Service tag attached to every request span.
pub const SERVICE_NAME: &str = "authgate";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;

    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(config.log_filter.as_str())
            .with_target(false)
            .json()
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(config.log_filter.as_str())
            .init(),
    }

    if config.jwt.insecure_default {
        tracing::warn!(
            environment = %config.environment,
            "JWT_SECRET is unset; signing with the insecure development secret"
        );
    }

    let host = config.host.clone();
    let port = config.port;
    let (app_state, db) = state::AppState::init(config).await?;

    // Run migrations if present
    if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
        tracing::warn!(error = %e, "migration failed; continuing");
    }

    let app = app::build_app(app_state);
    app::serve(app, &host, port).await
}
