//! HTTP handler definitions and shared application state.

pub mod articles;
pub mod health;
pub mod views;

pub use articles::{
    create_article, delete_article, get_article, list_articles, update_article,
};
pub use health::{health_handler, liveness_handler, readiness_handler};
pub use views::{get_views, record_view};

use std::sync::Arc;
use std::time::Instant;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use crate::bus::CorrelationRegistry;
use crate::network::ShutdownController;
use crate::service::{ArticlesError, ArticlesService, ViewsService};

/// Shared state carried through axum's `State` extractor.
///
/// All fields are `Arc`s, so cloning per request is cheap.
#[derive(Clone)]
pub struct AppState {
    /// CRUD plus the two aggregate read operations.
    pub articles: Arc<ArticlesService>,
    /// View-counter operations.
    pub views: Arc<ViewsService>,
    /// Exposed so health reporting can count outstanding bus calls.
    pub registry: Arc<CorrelationRegistry>,
    /// Health state and in-flight tracking.
    pub shutdown: Arc<ShutdownController>,
    /// Process start, for uptime reporting.
    pub start_time: Instant,
}

/// JSON error body returned by every failing endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Maps service errors onto HTTP responses.
///
/// `NotFound` is the only client-visible service failure; backend faults
/// collapse to an opaque 500 with the cause logged server-side.
#[derive(Debug)]
pub struct ApiError(pub ArticlesError);

impl From<ArticlesError> for ApiError {
    fn from(error: ArticlesError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            ArticlesError::NotFound => (
                StatusCode::NOT_FOUND,
                Json(ErrorBody {
                    error: "article not found".to_string(),
                }),
            )
                .into_response(),
            ArticlesError::Storage(cause) => {
                error!(%cause, "storage failure serving request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody {
                        error: "internal error".to_string(),
                    }),
                )
                    .into_response()
            }
        }
    }
}
