//! View-counter service.
//!
//! Thin wrapper over the store's counter operations; kept separate from
//! the aggregation service because it has its own HTTP surface and no bus
//! involvement.

use std::sync::Arc;

use gazette_core::ArticleId;
use tracing::debug;

use super::articles::ArticlesError;
use crate::storage::ArticleStore;

/// Records and reads per-article view counts.
pub struct ViewsService {
    store: Arc<dyn ArticleStore>,
}

impl ViewsService {
    #[must_use]
    pub fn new(store: Arc<dyn ArticleStore>) -> Self {
        Self { store }
    }

    /// Increments the article's view counter, returning the new value.
    ///
    /// # Errors
    ///
    /// [`ArticlesError::NotFound`] when the article does not exist.
    pub async fn record(&self, id: ArticleId) -> Result<u64, ArticlesError> {
        let count = self.store.record_view(id).await?;
        debug!(%id, count, "view recorded");
        Ok(count)
    }

    /// Reads the article's view counter.
    ///
    /// # Errors
    ///
    /// [`ArticlesError::NotFound`] when the article does not exist.
    pub async fn get(&self, id: ArticleId) -> Result<u64, ArticlesError> {
        Ok(self.store.views(id).await?)
    }
}
