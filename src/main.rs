mod admin;
mod app;
mod auth;
mod config;
mod db;
mod error;
mod memory;
mod recipes;
mod state;
mod users;

#[cfg(test)]
mod testing;

use crate::{config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "recipe_api=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env()?;
    let state = AppState::init(&config).await?;

    if let Some(admin) = &config.admin {
        users::services::ensure_superuser(state.users.as_ref(), admin)
            .await
            .map_err(|e| anyhow::anyhow!("bootstrap superuser: {e}"))?;
    }

    let app = app::build_app(state);
    app::serve(app, &config.host, config.port).await
}
