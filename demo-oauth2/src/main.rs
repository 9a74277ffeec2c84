use axum::{Router, routing::get};
use dotenvy::dotenv;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use oauth2_identity::{
    CacheStateStore, DataStore, FlowConfig, IdentityStore, JwtSessionIssuer, OAuthFlowController,
    SessionConfig, SqlIdentityStore, SqlUserStore, StateSweeper, StaticProviderRegistry,
    UserStore, connect_cache_store, connect_data_store,
};
use oauth2_identity_axum::oauth2_identity_router;

mod handlers;
mod server;

use crate::{
    handlers::{index, login, protected, settings},
    server::serve_until_shutdown,
};

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}=debug,oauth2_identity=debug,tower_http=info", env!("CARGO_CRATE_NAME"))
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cache = connect_cache_store(
        &env_or("GENERIC_CACHE_STORE_TYPE", "memory"),
        &env_or("GENERIC_CACHE_STORE_URL", ""),
    )
    .await?;
    let data: Arc<dyn DataStore> = connect_data_store(
        &env_or("GENERIC_DATA_STORE_TYPE", "sqlite"),
        &env_or("GENERIC_DATA_STORE_URL", "sqlite::memory:"),
        std::env::var("DB_TABLE_PREFIX").ok().as_deref(),
    )
    .await?;

    let users = Arc::new(SqlUserStore::new(data.clone()));
    users.init().await?;
    let identities = Arc::new(SqlIdentityStore::new(data));
    identities.init().await?;

    let config = FlowConfig::from_env();
    let states = Arc::new(CacheStateStore::new(cache));
    let sweeper = StateSweeper::spawn(states.clone(), config.state_sweep_interval);

    let controller = Arc::new(OAuthFlowController::new(
        config,
        Arc::new(StaticProviderRegistry::from_env()?),
        states,
        identities,
        users,
        Arc::new(JwtSessionIssuer::new(SessionConfig::from_env()?)),
    ));

    let prefix = controller.config().route_prefix.clone();
    let app = Router::new()
        .route("/", get(index))
        .route("/login", get(login))
        .route("/settings", get(settings))
        .route("/protected", get(protected))
        .with_state(controller.clone())
        .nest(&prefix, oauth2_identity_router(controller));

    let port = env_or("PORT", "3001").parse()?;
    serve_until_shutdown(port, app).await?;

    sweeper.shutdown().await;
    Ok(())
}
