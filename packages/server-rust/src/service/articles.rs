//! Article aggregation service.
//!
//! Combines one storage read with correlated bus calls to build the
//! externally visible article views. Enrichment is deliberately
//! best-effort: the article's own data is available locally, so a failed
//! comments/counts/names call degrades the result (empty list, zero
//! count, "unknown" author) instead of failing the read. Only the primary
//! storage miss surfaces as `NotFound` -- and then no remote call is made
//! at all.

use std::collections::HashMap;
use std::sync::Arc;

use gazette_core::articles::UNKNOWN_AUTHOR;
use gazette_core::{
    ArticleCreate, ArticleDetail, ArticleId, ArticleSummary, ArticleUpdate, CommentView, Page,
    PageParams, UserId,
};
use tracing::{debug, warn};

use super::remote::RemoteLookups;
use crate::storage::{unix_millis_now, ArticleStore, NewArticle, StorageError};

/// Error surface of the article services.
#[derive(Debug, thiserror::Error)]
pub enum ArticlesError {
    /// The addressed article does not exist. Local outcome; the bridge is
    /// never consulted for it.
    #[error("article not found")]
    NotFound,
    /// The storage backend failed.
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for ArticlesError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::NotFound => Self::NotFound,
            other => Self::Storage(other),
        }
    }
}

/// CRUD plus the two aggregate read operations.
pub struct ArticlesService {
    store: Arc<dyn ArticleStore>,
    remote: Arc<dyn RemoteLookups>,
}

impl ArticlesService {
    #[must_use]
    pub fn new(store: Arc<dyn ArticleStore>, remote: Arc<dyn RemoteLookups>) -> Self {
        Self { store, remote }
    }

    /// Creates an article, returning its id.
    ///
    /// # Errors
    ///
    /// Returns [`ArticlesError::Storage`] on backend failure.
    pub async fn create(&self, input: ArticleCreate) -> Result<ArticleId, ArticlesError> {
        let id = self
            .store
            .create(NewArticle {
                title: input.title,
                description: input.description,
                introduction: input.introduction,
                content: input.content,
                banner_image_url: input.banner_image_url,
                author_id: input.author_user_id,
            })
            .await?;
        debug!(%id, "article created");
        Ok(id)
    }

    /// Applies an update to an existing article, stamping `updated_at`.
    ///
    /// # Errors
    ///
    /// [`ArticlesError::NotFound`] when the article does not exist.
    pub async fn update(&self, id: ArticleId, input: ArticleUpdate) -> Result<(), ArticlesError> {
        let Some(mut article) = self.store.get(id).await? else {
            return Err(ArticlesError::NotFound);
        };

        article.title = input.title;
        article.description = input.description;
        article.introduction = input.introduction;
        article.content = input.content;
        article.banner_image_url = input.banner_image_url;
        article.published_at_ms = input.published_at_ms;
        article.author_id = input.author_user_id;
        article.updated_at_ms = Some(unix_millis_now());

        self.store.update(article).await?;
        Ok(())
    }

    /// Deletes an article.
    ///
    /// # Errors
    ///
    /// [`ArticlesError::NotFound`] when the article does not exist.
    pub async fn delete(&self, id: ArticleId) -> Result<(), ArticlesError> {
        self.store.delete(id).await?;
        debug!(%id, "article deleted");
        Ok(())
    }

    /// Builds the full single-article view.
    ///
    /// One storage read, then at most two bus calls: the article's
    /// comments, and one *batched* username lookup covering the article
    /// author plus every distinct commenter -- bounded by the number of
    /// distinct authors, never by the number of comments.
    ///
    /// # Errors
    ///
    /// [`ArticlesError::NotFound`] on a storage miss (no remote calls are
    /// issued), [`ArticlesError::Storage`] on backend failure. Bus
    /// failures never propagate; they degrade the view.
    pub async fn get_detail(&self, id: ArticleId) -> Result<ArticleDetail, ArticlesError> {
        let Some(article) = self.store.get(id).await? else {
            return Err(ArticlesError::NotFound);
        };

        let comments = match self.remote.comments_for_article(id).await {
            Ok(comments) => comments,
            Err(error) => {
                warn!(%id, %error, "comments lookup failed; serving article without comments");
                Vec::new()
            }
        };

        // Distinct author set: the article author plus every commenter.
        let mut author_ids: Vec<UserId> = Vec::with_capacity(comments.len() + 1);
        author_ids.push(article.author_id);
        for comment in &comments {
            if !author_ids.contains(&comment.author_id) {
                author_ids.push(comment.author_id);
            }
        }

        let names = match self.remote.user_names(&author_ids).await {
            Ok(names) => names,
            Err(error) => {
                warn!(%id, %error, "username lookup failed; using unknown authors");
                HashMap::new()
            }
        };
        let resolve = |user: UserId| {
            names
                .get(&user)
                .cloned()
                .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string())
        };

        // A racing delete can drop the counter between the two reads;
        // that degrades to zero like any other enrichment gap.
        let views = self.store.views(id).await.unwrap_or(0);

        Ok(ArticleDetail {
            id: article.id,
            title: article.title,
            description: article.description,
            introduction: article.introduction,
            content: article.content,
            banner_image_url: article.banner_image_url,
            created_at_ms: article.created_at_ms,
            updated_at_ms: article.updated_at_ms,
            published_at_ms: article.published_at_ms,
            author_id: article.author_id,
            author_name: resolve(article.author_id),
            comments: comments
                .into_iter()
                .map(|comment| CommentView {
                    id: comment.id,
                    author_name: resolve(comment.author_id),
                    author_id: comment.author_id,
                    content: comment.content,
                    created_at_ms: comment.created_at_ms,
                })
                .collect(),
            views,
        })
    }

    /// Builds one page of article summaries, newest first.
    ///
    /// Exactly one batched comment-count call covers the whole page (and
    /// none when the page is empty). Ids missing from the returned map --
    /// or a failed call -- default every affected count to zero; items and
    /// total always reflect storage.
    ///
    /// # Errors
    ///
    /// [`ArticlesError::Storage`] on backend failure.
    pub async fn list(&self, params: PageParams) -> Result<Page<ArticleSummary>, ArticlesError> {
        let (articles, total) = self.store.page(params).await?;

        let ids: Vec<ArticleId> = articles.iter().map(|article| article.id).collect();
        let counts = match self.remote.comment_counts(&ids).await {
            Ok(counts) => counts,
            Err(error) => {
                warn!(%error, "comment count lookup failed; defaulting counts to zero");
                HashMap::new()
            }
        };

        Ok(Page {
            items: articles
                .into_iter()
                .map(|article| ArticleSummary {
                    comment_count: counts.get(&article.id).copied().unwrap_or(0),
                    id: article.id,
                    title: article.title,
                    description: article.description,
                    thumbnail_image_url: article.banner_image_url,
                    created_at_ms: article.created_at_ms,
                    published_at_ms: article.published_at_ms,
                })
                .collect(),
            total,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
