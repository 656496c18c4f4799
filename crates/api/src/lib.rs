use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use tabrelay_registration::Orchestrator;
use tabrelay_storage::UsageLedger;

pub mod auth;
pub mod error;
pub mod handlers;

pub use auth::{AuthenticatedUser, Claims, JwtVerifier};
pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub usage: Arc<dyn UsageLedger>,
    pub verifier: Arc<JwtVerifier>,
    /// Fires on server shutdown; every in-flight automation runs under a child of it.
    pub shutdown: CancellationToken,
}

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/v1/automation", post(handlers::automate))
        .route("/v1/usage/check", post(handlers::usage_check))
        .route("/v1/manual-form", post(handlers::manual_form))
        .route("/v1/credentials", get(handlers::list_credentials))
        .route("/v1/credentials/{id}/reveal", post(handlers::reveal_credential))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::auth_middleware));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(bind: &str, state: AppState) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    info!(addr = %listener.local_addr()?, "api listening");

    let shutdown = state.shutdown.clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("api stopped");
    Ok(())
}
