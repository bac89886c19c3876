//! HTTP-facing article view models.
//!
//! These are the shapes the aggregation layer produces: an article merged
//! with bus-sourced enrichment (comments, author names, counts). Fields
//! serialize in `camelCase` for the JSON surface.

use serde::{Deserialize, Serialize};

use crate::types::{ArticleId, CommentId, UserId};

/// Sentinel display name used when the profiles service cannot resolve a
/// user id (or the lookup itself failed). Degraded data, not an error.
pub const UNKNOWN_AUTHOR: &str = "unknown";

/// A comment enriched with its author's resolved display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: CommentId,
    pub author_id: UserId,
    pub author_name: String,
    pub content: String,
    pub created_at_ms: u64,
}

/// The full single-article view: one storage read plus bus enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleDetail {
    pub id: ArticleId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub introduction: Option<String>,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub banner_image_url: Option<String>,
    pub created_at_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub updated_at_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub published_at_ms: Option<u64>,
    pub author_id: UserId,
    pub author_name: String,
    pub comments: Vec<CommentView>,
    pub views: u64,
}

/// One row of the paged article list, enriched with its comment count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleSummary {
    pub id: ArticleId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub thumbnail_image_url: Option<String>,
    pub created_at_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub published_at_ms: Option<u64>,
    pub comment_count: u64,
}

/// Input model for `POST /api/articles`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleCreate {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub introduction: Option<String>,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub banner_image_url: Option<String>,
    pub author_user_id: UserId,
}

/// Input model for `PUT /api/articles/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleUpdate {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub introduction: Option<String>,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub banner_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub published_at_ms: Option<u64>,
    pub author_user_id: UserId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_omits_absent_optionals_in_json() {
        let detail = ArticleDetail {
            id: ArticleId::random(),
            title: "title".to_string(),
            description: None,
            introduction: None,
            content: "body".to_string(),
            banner_image_url: None,
            created_at_ms: 1_700_000_000_000,
            updated_at_ms: None,
            published_at_ms: None,
            author_id: UserId::random(),
            author_name: UNKNOWN_AUTHOR.to_string(),
            comments: Vec::new(),
            views: 0,
        };
        let json = serde_json::to_value(&detail).unwrap();
        assert!(json.get("description").is_none());
        assert!(json.get("publishedAtMs").is_none());
        assert_eq!(json["authorName"], "unknown");
    }

    #[test]
    fn create_model_accepts_minimal_json() {
        let json = format!(
            r#"{{"title":"t","content":"c","authorUserId":"{}"}}"#,
            uuid::Uuid::nil()
        );
        let model: ArticleCreate = serde_json::from_str(&json).unwrap();
        assert!(model.description.is_none());
        assert_eq!(model.author_user_id, UserId(uuid::Uuid::nil()));
    }
}
