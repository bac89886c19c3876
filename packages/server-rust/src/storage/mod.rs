//! Article persistence.
//!
//! The aggregation layer sees only the [`ArticleStore`] trait: single-row
//! CRUD, creation-time-ordered pagination, and the view counter. Two
//! implementations exist -- the always-available in-memory store and a
//! `PostgreSQL` store behind the `postgres` cargo feature.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod store;

pub use memory::MemoryArticleStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresArticleStore;
pub use store::{Article, ArticleStore, NewArticle, StorageError};

/// Milliseconds since the Unix epoch, the timestamp unit used across the
/// wire and the stores.
#[must_use]
pub fn unix_millis_now() -> u64 {
    u64::try_from(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis(),
    )
    .unwrap_or(u64::MAX)
}
