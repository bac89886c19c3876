//! Article CRUD and aggregate-read endpoints.
//!
//! Thin translation layer: extract, delegate to [`ArticlesService`], map
//! the outcome to a status code. Enrichment failures never show up here --
//! the service already degraded them into valid data.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use gazette_core::{
    ArticleCreate, ArticleDetail, ArticleId, ArticleSummary, ArticleUpdate, Page, PageParams,
};
use uuid::Uuid;

use super::{ApiError, AppState};

/// `GET /api/articles?skip=N&take=M` -- one page of summaries, newest
/// first, with comment counts.
pub async fn list_articles(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<ArticleSummary>>, ApiError> {
    let _guard = state.shutdown.in_flight_guard();
    Ok(Json(state.articles.list(params).await?))
}

/// `GET /api/articles/{id}` -- the full detail view, 404 on a miss.
pub async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ArticleDetail>, ApiError> {
    let _guard = state.shutdown.in_flight_guard();
    Ok(Json(state.articles.get_detail(ArticleId(id)).await?))
}

/// `POST /api/articles` -- 201 with a Location header and the new id.
pub async fn create_article(
    State(state): State<AppState>,
    Json(input): Json<ArticleCreate>,
) -> Result<impl IntoResponse, ApiError> {
    let _guard = state.shutdown.in_flight_guard();
    let id = state.articles.create(input).await?;
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/api/articles/{id}"))],
        Json(id),
    ))
}

/// `PUT /api/articles/{id}` -- 204 on success, 404 on a miss.
pub async fn update_article(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<ArticleUpdate>,
) -> Result<StatusCode, ApiError> {
    let _guard = state.shutdown.in_flight_guard();
    state.articles.update(ArticleId(id), input).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /api/articles/{id}` -- 204 on success, 404 on a miss.
pub async fn delete_article(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let _guard = state.shutdown.in_flight_guard();
    state.articles.delete(ArticleId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::response::IntoResponse;
    use gazette_core::UserId;

    use super::super::testing::{test_state, StaticRemote};
    use super::*;
    use crate::storage::ArticleStore as _;

    fn create_input(title: &str) -> ArticleCreate {
        ArticleCreate {
            title: title.to_string(),
            description: None,
            introduction: None,
            content: "body".to_string(),
            banner_image_url: None,
            author_user_id: UserId::random(),
        }
    }

    #[tokio::test]
    async fn create_returns_201_with_location() {
        let (state, _store) = test_state(StaticRemote::default());

        let response = create_article(State(state), Json(create_input("new")))
            .await
            .unwrap()
            .into_response();

        assert_eq!(response.status(), StatusCode::CREATED);
        let location = response.headers().get(header::LOCATION).unwrap();
        assert!(location.to_str().unwrap().starts_with("/api/articles/"));
    }

    #[tokio::test]
    async fn get_missing_article_is_404() {
        let (state, _store) = test_state(StaticRemote::default());

        let response = get_article(State(state), Path(Uuid::new_v4()))
            .await
            .map(IntoResponse::into_response)
            .unwrap_or_else(IntoResponse::into_response);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_and_delete_map_outcomes_to_status_codes() {
        let (state, store) = test_state(StaticRemote::default());
        let id = state
            .articles
            .create(create_input("target"))
            .await
            .unwrap();

        let update = ArticleUpdate {
            title: "renamed".to_string(),
            description: None,
            introduction: None,
            content: "body".to_string(),
            banner_image_url: None,
            published_at_ms: None,
            author_user_id: UserId::random(),
        };
        let status = update_article(State(state.clone()), Path(id.0), Json(update))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(
            store.get(id).await.unwrap().unwrap().title,
            "renamed"
        );

        let status = delete_article(State(state.clone()), Path(id.0)).await.unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let response = delete_article(State(state), Path(id.0))
            .await
            .map(|status| status.into_response())
            .unwrap_or_else(IntoResponse::into_response);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn list_returns_page_with_defaulted_counts() {
        let (state, _store) = test_state(StaticRemote::default());
        let id = state
            .articles
            .create(create_input("listed"))
            .await
            .unwrap();

        let page = list_articles(State(state), Query(PageParams::new(0, 10)))
            .await
            .unwrap()
            .0;
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, id);
        // StaticRemote's count map is empty, so the count degrades to 0.
        assert_eq!(page.items[0].comment_count, 0);
    }
}
