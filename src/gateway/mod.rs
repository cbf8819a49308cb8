//! HTTP gateway: router construction and server startup.

pub mod api;
pub mod identity;

use crate::characters::CharacterBook;
use crate::config::Config;
use crate::providers;
use crate::relay::ConversationRelay;
use crate::transcripts;
use anyhow::{Context, Result};
use axum::{
    extract::FromRef,
    routing::{get, post},
    Router,
};
use axum_extra::extract::cookie::Key;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Shared state for gateway handlers.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<ConversationRelay>,
    cookie_key: Key,
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Key {
        state.cookie_key.clone()
    }
}

/// Build the application router.
pub fn app(relay: Arc<ConversationRelay>, cookie_key: Key) -> Router {
    let state = AppState { relay, cookie_key };
    Router::new()
        .route("/", get(api::handle_index))
        .route("/health", get(api::handle_health))
        .route("/chat", post(api::handle_chat))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Wire up the relay from config and serve until the process is stopped.
/// Fails before binding when the upstream API key is missing.
pub async fn run_gateway(host: &str, port: u16, config: &Config) -> Result<()> {
    let api_key = config.require_api_key()?;

    let provider = providers::create_provider(&config.upstream.base_url, api_key);
    let store = transcripts::create_transcript_store(config.relay.max_transcript_entries);
    let characters = match &config.characters {
        Some(table) => CharacterBook::from_table(table.clone()),
        None => CharacterBook::builtin(),
    };
    info!(
        characters = characters.len(),
        model = %config.upstream.model,
        store = store.name(),
        "gateway starting"
    );

    let relay = Arc::new(ConversationRelay::new(
        provider,
        store,
        characters,
        config.upstream.model.clone(),
    ));
    let cookie_key = identity::signing_key(config.session.cookie_secret.as_deref());

    let listener = tokio::net::TcpListener::bind(format!("{host}:{port}"))
        .await
        .with_context(|| format!("failed to bind {host}:{port}"))?;
    let addr = listener.local_addr()?;
    info!(%addr, "gateway listening");

    axum::serve(listener, app(relay, cookie_key))
        .await
        .context("gateway server error")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{Provider, ProviderError};
    use crate::relay::{EMPTY_MESSAGE_REPLY, UPSTREAM_FAILED_REPLY};
    use crate::transcripts::{create_transcript_store, TranscriptEntry, TranscriptKey, TranscriptStore};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use tower::util::ServiceExt;

    struct ScriptedProvider {
        script: Mutex<VecDeque<Result<String, ProviderError>>>,
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        async fn chat(
            &self,
            _messages: &[TranscriptEntry],
            _model: &str,
            _temperature: f64,
        ) -> Result<String, ProviderError> {
            self.script
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok("unscripted".to_string()))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn test_app(
        script: Vec<Result<String, ProviderError>>,
    ) -> (Router, Arc<dyn TranscriptStore>) {
        let store = create_transcript_store(None);
        let relay = Arc::new(ConversationRelay::new(
            Arc::new(ScriptedProvider {
                script: Mutex::new(script.into()),
            }),
            store.clone(),
            CharacterBook::builtin(),
            "test-model",
        ));
        (app(relay, identity::signing_key(Some("test-secret"))), store)
    }

    fn chat_request(body: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/chat")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_message(response: axum::response::Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        value["message"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn index_returns_greeting() {
        let (app, _) = test_app(vec![]);
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"Hello, World!");
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (app, _) = test_app(vec![]);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["status"], "ok");
    }

    #[tokio::test]
    async fn chat_mints_cookie_and_relays_reply() {
        let (app, _) = test_app(vec![Ok("Hello".to_string())]);

        let response = app
            .oneshot(chat_request(
                r#"{"message":"hi","character":"oracle"}"#,
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("first contact should mint a session cookie")
            .to_str()
            .unwrap()
            .to_string();
        assert!(set_cookie.starts_with("charrelay_session="));
        assert_eq!(body_message(response).await, "Hello");
    }

    #[tokio::test]
    async fn chat_reuses_cookie_and_accumulates_transcript() {
        let (app, _) = test_app(vec![Ok("first".to_string()), Ok("second".to_string())]);

        let response = app
            .clone()
            .oneshot(chat_request(
                r#"{"message":"one","character":"oracle"}"#,
                None,
            ))
            .await
            .unwrap();
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        let cookie_pair = set_cookie.split(';').next().unwrap().to_string();

        let response = app
            .oneshot(chat_request(
                r#"{"message":"two","character":"oracle"}"#,
                Some(&cookie_pair),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        // Identity already resolved; no new cookie is set.
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        assert_eq!(body_message(response).await, "second");
    }

    #[tokio::test]
    async fn empty_message_returns_fixed_reply() {
        let (app, _) = test_app(vec![]);
        let response = app
            .oneshot(chat_request(
                r#"{"message":"   ","character":"oracle"}"#,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_message(response).await, EMPTY_MESSAGE_REPLY);
    }

    #[tokio::test]
    async fn missing_fields_default_to_empty_strings() {
        let (app, _) = test_app(vec![]);
        let response = app.oneshot(chat_request("{}", None)).await.unwrap();
        // Empty message short-circuit applies; unknown empty character is fine.
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_message(response).await, EMPTY_MESSAGE_REPLY);
    }

    #[tokio::test]
    async fn upstream_failure_maps_to_500() {
        let (app, _) = test_app(vec![Err(ProviderError::Status {
            status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
            body: "overloaded".to_string(),
        })]);
        let response = app
            .oneshot(chat_request(
                r#"{"message":"hi","character":"oracle"}"#,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_message(response).await, UPSTREAM_FAILED_REPLY);
    }

    #[tokio::test]
    async fn relay_error_embeds_error_text() {
        let (app, _) = test_app(vec![Err(ProviderError::Malformed(
            "no choices in upstream response".to_string(),
        ))]);
        let response = app
            .oneshot(chat_request(
                r#"{"message":"hi","character":"oracle"}"#,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let message = body_message(response).await;
        assert!(message.contains("Something went wrong"));
        assert!(message.contains("no choices"));
    }

    #[tokio::test]
    async fn transcript_survives_across_requests_in_one_process() {
        let (app, store) = test_app(vec![Ok("a".to_string()), Ok("b".to_string())]);

        let response = app
            .clone()
            .oneshot(chat_request(
                r#"{"message":"one","character":"granny-witch"}"#,
                None,
            ))
            .await
            .unwrap();
        let cookie_pair = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string();

        app.oneshot(chat_request(
            r#"{"message":"two","character":"granny-witch"}"#,
            Some(&cookie_pair),
        ))
        .await
        .unwrap();

        // One identity, one character: a single transcript with
        // system + (user, assistant) x 2 entries.
        let jar = axum_extra::extract::SignedCookieJar::from_headers(
            &{
                let mut headers = axum::http::HeaderMap::new();
                headers.insert(header::COOKIE, cookie_pair.parse().unwrap());
                headers
            },
            identity::signing_key(Some("test-secret")),
        );
        let identity = jar.get(identity::SESSION_COOKIE).unwrap().value().to_string();
        let key = TranscriptKey::new(identity, "granny-witch");
        assert_eq!(store.len(&key).await.unwrap(), 5);
    }
}
