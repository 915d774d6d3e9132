//! Axum HTTP gateway: request-level orchestration over the reconciler, with
//! body limits and request timeouts.

mod handlers;

use crate::agent::CountriesAgent;
use crate::auth::UserStore;
use crate::config::Config;
use crate::countries::CountryData;
use crate::db;
use crate::runtime::{AgentRuntime, InMemoryRuntime};
use crate::session::{SessionReconciler, SessionStore, SqliteSessionStore};
use anyhow::Result;
use axum::{
    Router,
    routing::{get, post},
};
use handlers::{handle_agent_turn, handle_health, handle_login, handle_logout};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Maximum request body size (64KB)
pub const MAX_BODY_SIZE: usize = 65_536;
/// Request timeout (30s)
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Shared state for all axum handlers
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserStore>,
    pub reconciler: Arc<SessionReconciler>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/api/agent", post(handle_agent_turn))
        .route("/api/login", post(handle_login))
        .route("/api/logout", post(handle_logout))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .with_state(state)
}

/// Run the HTTP gateway.
pub async fn run_gateway(config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    run_gateway_with_listener(listener, config).await
}

/// Run the HTTP gateway from a pre-bound listener. Split out so tests can
/// bind an ephemeral port first.
pub async fn run_gateway_with_listener(
    listener: tokio::net::TcpListener,
    config: Config,
) -> Result<()> {
    let pool = db::connect(&config.database_url).await?;
    let users = Arc::new(UserStore::new(pool.clone()).await?);
    let store: Arc<dyn SessionStore> = Arc::new(SqliteSessionStore::new(pool).await?);

    let data = Arc::new(CountryData::new(&config.data_dir));
    let agent = Arc::new(CountriesAgent::new(data));
    let runtime: Arc<dyn AgentRuntime> =
        Arc::new(InMemoryRuntime::new(config.app_name.as_str(), agent));
    let reconciler = Arc::new(SessionReconciler::new(
        config.app_name.as_str(),
        store,
        runtime,
    ));

    let state = AppState { users, reconciler };
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "countries-agent gateway listening");

    axum::serve(listener, router(state)).await?;
    Ok(())
}
