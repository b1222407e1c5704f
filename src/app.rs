use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::polls;
use crate::db::repository::PollRepository;

/// Shared state handed to every handler.
///
/// Holds no poll data; all state lives in the store behind `poll_repo`.
#[derive(Clone)]
pub struct AppState {
    pub poll_repo: Arc<dyn PollRepository>,
}

impl AppState {
    pub fn new(poll_repo: Arc<dyn PollRepository>) -> Self {
        Self { poll_repo }
    }
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/polls",
            get(polls::list_polls_handler).post(polls::create_poll_handler),
        )
        .route(
            "/polls/create",
            axum::routing::post(polls::create_poll_handler),
        )
        .route(
            "/polls/{id}",
            get(polls::get_poll_handler).put(polls::vote_handler),
        )
        .route("/polls/{id}/results", get(polls::poll_results_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Wrap a router with CORS for the given origins. An empty list allows any origin.
pub fn with_cors(router: Router, allowed_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{origin}'");
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins)
    };

    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    router.layer(cors)
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
