//! The storage trait and row types for articles.

use async_trait::async_trait;
use gazette_core::{ArticleId, PageParams, UserId};

/// Error from a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The addressed row does not exist.
    #[error("article not found")]
    NotFound,
    /// The backend itself failed (connection, constraint, I/O).
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// A stored article row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub id: ArticleId,
    pub title: String,
    pub description: Option<String>,
    pub introduction: Option<String>,
    pub content: String,
    pub banner_image_url: Option<String>,
    pub author_id: UserId,
    pub created_at_ms: u64,
    pub updated_at_ms: Option<u64>,
    pub published_at_ms: Option<u64>,
}

/// Input for creating a row; the store assigns id and creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewArticle {
    pub title: String,
    pub description: Option<String>,
    pub introduction: Option<String>,
    pub content: String,
    pub banner_image_url: Option<String>,
    pub author_id: UserId,
}

/// Single-entity article persistence.
///
/// No multi-row invariants beyond single-row atomicity. `page` orders by
/// creation time descending (newest first); rows with identical creation
/// timestamps keep their insertion order -- the stable sort is the store's
/// responsibility, callers add no tie-break of their own.
///
/// Shared as `Arc<dyn ArticleStore>` across handler tasks.
#[async_trait]
pub trait ArticleStore: Send + Sync + 'static {
    /// Inserts a new row, returning its assigned id.
    async fn create(&self, article: NewArticle) -> Result<ArticleId, StorageError>;

    /// Fetches a row by id; `Ok(None)` is an ordinary miss.
    async fn get(&self, id: ArticleId) -> Result<Option<Article>, StorageError>;

    /// Replaces an existing row.
    ///
    /// # Errors
    ///
    /// [`StorageError::NotFound`] when no row has the article's id.
    async fn update(&self, article: Article) -> Result<(), StorageError>;

    /// Deletes a row and its view counter.
    ///
    /// # Errors
    ///
    /// [`StorageError::NotFound`] when no row has this id.
    async fn delete(&self, id: ArticleId) -> Result<(), StorageError>;

    /// Returns one page ordered by creation time descending, plus the
    /// total row count across all pages.
    async fn page(&self, params: PageParams) -> Result<(Vec<Article>, u64), StorageError>;

    /// Increments the article's view counter, returning the new value.
    ///
    /// # Errors
    ///
    /// [`StorageError::NotFound`] when the article does not exist.
    async fn record_view(&self, id: ArticleId) -> Result<u64, StorageError>;

    /// Reads the article's view counter (zero if never viewed).
    ///
    /// # Errors
    ///
    /// [`StorageError::NotFound`] when the article does not exist.
    async fn views(&self, id: ArticleId) -> Result<u64, StorageError>;
}
