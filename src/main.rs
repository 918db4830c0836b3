//! Entry point: load config, wire dependencies, and run the server.

use amankan::auth::JwtSecret;
use amankan::config::Config;
use amankan::db::{self, InMemoryUserStore, PgUserStore, UserStore};
use amankan::{create_app, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("config: {}", e))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let users: Arc<dyn UserStore> = if config.uses_memory_store() {
        tracing::warn!("using in-memory user store; accounts are lost on restart");
        Arc::new(InMemoryUserStore::new())
    } else {
        let pool = db::create_pool(&config.database_url).await?;
        db::run_migrations(&pool).await?;
        Arc::new(PgUserStore::new(pool))
    };

    let jwt_secret = JwtSecret::new(
        config.jwt_secret.clone(),
        config.access_ttl_secs,
        config.refresh_ttl_secs,
    );
    let state = AppState::new(users, jwt_secret, config.update_last_login);
    let app = create_app(state);

    tracing::info!(addr = %config.server_addr, "listening");
    let listener = tokio::net::TcpListener::bind(config.server_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
