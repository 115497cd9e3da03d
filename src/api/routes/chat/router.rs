//! Router for the chat API

use std::sync::Arc;

use axum::{Router, extract::State, response::Json, routing::post};

use super::public;
use crate::ai::agents::scheduling_response;
use crate::api::state::AppState;

type SharedState = Arc<AppState>;

/// Run one turn of the scheduling assistant for the client and
/// requester in the payload
async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<public::ChatRequest>,
) -> Result<Json<public::ChatResponse>, crate::api::public::ApiError> {
    let content = scheduling_response(
        &state.config,
        state.schedule.clone(),
        &state.memory,
        &payload.to_client,
        &payload.from_requester,
        &payload.message,
        chrono::Utc::now(),
    )
    .await?;

    Ok(Json(public::ChatResponse {
        to_client: payload.to_client,
        from_requester: payload.from_requester,
        content,
    }))
}

pub fn router() -> Router<SharedState> {
    Router::new().route("/chat", post(chat_handler))
}
