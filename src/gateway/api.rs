//! HTTP handlers for the relay gateway.

use super::identity::resolve_identity;
use super::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use axum_extra::extract::SignedCookieJar;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct ChatBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub character: String,
}

/// GET / — fixed greeting.
pub async fn handle_index() -> &'static str {
    "Hello, World!"
}

/// GET /health — liveness probe.
pub async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "characters": state.relay.characters().len(),
    }))
}

/// POST /chat — relay one message for the cookie-resolved session identity.
pub async fn handle_chat(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Json(body): Json<ChatBody>,
) -> impl IntoResponse {
    let (jar, identity) = resolve_identity(jar);
    info!(%identity, character = %body.character, "chat request");

    let (status, message) = match state
        .relay
        .handle(&identity, &body.character, &body.message)
        .await
    {
        Ok(outcome) if outcome.is_error() => {
            (StatusCode::INTERNAL_SERVER_ERROR, outcome.message())
        }
        Ok(outcome) => (StatusCode::OK, outcome.message()),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Something went wrong: {err}"),
        ),
    };

    (status, jar, Json(json!({ "message": message })))
}
