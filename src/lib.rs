pub mod config;
pub mod db;
pub mod relay;
pub mod rooms;
pub mod session;

use axum::{
    Json, Router,
    extract::FromRef,
    http::{Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use sqlx::SqlitePool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, cookie::SameSite};

pub use config::Config;
pub use relay::Relay;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub relay: Relay,
}

/// Builds the full HTTP surface: the relay socket at `/ws` and the room store
/// under `/api/rooms`.
pub fn app(state: AppState, config: &Config) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(config.session_idle_minutes)));

    let mut cors = CorsLayer::new();
    if let Some(origin) = &config.cors_origin {
        cors = cors
            .allow_origin(origin.clone())
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE])
            .allow_credentials(true);
    }

    Router::new()
        .route("/ws", get(relay::ws::relay_ws))
        .nest("/api/rooms", rooms::router())
        .with_state(state)
        .layer(session_layer)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub type AppResult<T> = Result<T, AppError>;

/// HTTP error rendered as `{"error": "..."}`. Anything convertible into
/// `anyhow::Error` becomes a 500 through `?` and is shown to the caller only
/// as "Internal server error".
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
    // message was written for the caller
    public: bool,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            error: anyhow::Error::msg(message.into()),
            public: true,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.error, f)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = ?self.error, "request failed");
        }

        let message = if self.public {
            self.error.to_string()
        } else {
            "Internal server error".to_owned()
        };

        (self.status, Json(json!({ "error": message }))).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: err.into(),
            public: false,
        }
    }
}
