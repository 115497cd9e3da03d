use std::sync::Arc;

use anyhow::{Error, Result};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::routes;
use crate::api::state::AppState;
use crate::core::{AppConfig, db::migrated_db, init_tracing};
use crate::schedule::ScheduleService;

pub fn app(shared_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .merge(routes::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(shared_state)
}

// Run the server
pub async fn serve(host: String, port: String, config: AppConfig) -> Result<(), Error> {
    init_tracing();

    let db = migrated_db(&config.db_path).await?;
    let schedule = ScheduleService::from_config(&config)?;
    if !config.enforce_policy {
        tracing::warn!("Scheduling policy is not enforced, relying on the LLM alone");
    }

    let shared_state = Arc::new(AppState::new(db, config, schedule));
    let app = app(shared_state);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;

    tracing::debug!("Server started. Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
