//! Request/response bodies for the comments service.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{ArticleId, Comment};

/// Asks the comments service for every comment on one article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentsForArticleRequest {
    pub article_id: ArticleId,
}

/// Reply carrying the article's comments, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentsForArticleResponse {
    pub comments: Vec<Comment>,
}

/// Asks for comment counts of a whole page of articles in one call.
///
/// Batching is the contract: one request per page, never one per article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentCountsForArticlesRequest {
    pub article_ids: Vec<ArticleId>,
}

/// Reply mapping article id to comment count.
///
/// Ids the comments service could not resolve are simply absent from the
/// map; consumers default them to zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentCountsForArticlesResponse {
    pub counts: HashMap<ArticleId, u64>,
}
