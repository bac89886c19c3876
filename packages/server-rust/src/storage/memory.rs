//! In-memory [`ArticleStore`] backed by [`DashMap`].
//!
//! Suitable for tests and single-process runs. Rows carry an insertion
//! sequence number so pagination stays stable when creation timestamps
//! collide.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use gazette_core::{ArticleId, PageParams};

use super::store::{Article, ArticleStore, NewArticle, StorageError};
use super::unix_millis_now;

#[derive(Debug, Clone)]
struct StoredRow {
    article: Article,
    /// Insertion order, the tie-break for equal creation timestamps.
    seq: u64,
}

/// Concurrent in-memory article store.
#[derive(Debug, Default)]
pub struct MemoryArticleStore {
    rows: DashMap<ArticleId, StoredRow>,
    views: DashMap<ArticleId, u64>,
    next_seq: AtomicU64,
}

impl MemoryArticleStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArticleStore for MemoryArticleStore {
    async fn create(&self, article: NewArticle) -> Result<ArticleId, StorageError> {
        let id = ArticleId::random();
        let row = StoredRow {
            article: Article {
                id,
                title: article.title,
                description: article.description,
                introduction: article.introduction,
                content: article.content,
                banner_image_url: article.banner_image_url,
                author_id: article.author_id,
                created_at_ms: unix_millis_now(),
                updated_at_ms: None,
                published_at_ms: None,
            },
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
        };
        self.rows.insert(id, row);
        Ok(id)
    }

    async fn get(&self, id: ArticleId) -> Result<Option<Article>, StorageError> {
        Ok(self.rows.get(&id).map(|row| row.article.clone()))
    }

    async fn update(&self, article: Article) -> Result<(), StorageError> {
        match self.rows.get_mut(&article.id) {
            Some(mut row) => {
                row.article = article;
                Ok(())
            }
            None => Err(StorageError::NotFound),
        }
    }

    async fn delete(&self, id: ArticleId) -> Result<(), StorageError> {
        match self.rows.remove(&id) {
            Some(_) => {
                self.views.remove(&id);
                Ok(())
            }
            None => Err(StorageError::NotFound),
        }
    }

    async fn page(&self, params: PageParams) -> Result<(Vec<Article>, u64), StorageError> {
        let mut rows: Vec<StoredRow> = self.rows.iter().map(|row| row.value().clone()).collect();
        let total = rows.len() as u64;

        // Newest first; equal timestamps fall back to insertion order.
        rows.sort_by(|a, b| {
            b.article
                .created_at_ms
                .cmp(&a.article.created_at_ms)
                .then(a.seq.cmp(&b.seq))
        });

        let items = rows
            .into_iter()
            .skip(params.skip as usize)
            .take(params.effective_take() as usize)
            .map(|row| row.article)
            .collect();
        Ok((items, total))
    }

    async fn record_view(&self, id: ArticleId) -> Result<u64, StorageError> {
        if !self.rows.contains_key(&id) {
            return Err(StorageError::NotFound);
        }
        let mut count = self.views.entry(id).or_insert(0);
        *count += 1;
        Ok(*count)
    }

    async fn views(&self, id: ArticleId) -> Result<u64, StorageError> {
        if !self.rows.contains_key(&id) {
            return Err(StorageError::NotFound);
        }
        Ok(self.views.get(&id).map_or(0, |count| *count))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
