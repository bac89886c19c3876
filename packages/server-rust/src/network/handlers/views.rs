//! View-counter endpoints.

use axum::extract::{Path, State};
use axum::Json;
use gazette_core::ArticleId;
use uuid::Uuid;

use super::{ApiError, AppState};

/// `POST /api/articles/{id}/views` -- records one view, returns the new
/// count; 404 when the article does not exist.
pub async fn record_view(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<u64>, ApiError> {
    let _guard = state.shutdown.in_flight_guard();
    Ok(Json(state.views.record(ArticleId(id)).await?))
}

/// `GET /api/articles/{id}/views` -- the current count, 404 on a miss.
pub async fn get_views(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<u64>, ApiError> {
    let _guard = state.shutdown.in_flight_guard();
    Ok(Json(state.views.get(ArticleId(id)).await?))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use gazette_core::{ArticleCreate, UserId};

    use super::super::testing::{test_state, StaticRemote};
    use super::*;

    #[tokio::test]
    async fn record_then_read_increments() {
        let (state, _store) = test_state(StaticRemote::default());
        let id = state
            .articles
            .create(ArticleCreate {
                title: "viewed".to_string(),
                description: None,
                introduction: None,
                content: "body".to_string(),
                banner_image_url: None,
                author_user_id: UserId::random(),
            })
            .await
            .unwrap();

        let count = record_view(State(state.clone()), Path(id.0)).await.unwrap();
        assert_eq!(count.0, 1);
        let count = get_views(State(state), Path(id.0)).await.unwrap();
        assert_eq!(count.0, 1);
    }

    #[tokio::test]
    async fn missing_article_is_404() {
        let (state, _store) = test_state(StaticRemote::default());
        let response = record_view(State(state), Path(Uuid::new_v4()))
            .await
            .map(IntoResponse::into_response)
            .unwrap_or_else(IntoResponse::into_response);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
