//! `PostgreSQL` [`ArticleStore`] via `sqlx` (enabled by the `postgres`
//! cargo feature).
//!
//! Rows carry a `seq` bigserial so pagination stays stable when creation
//! timestamps collide, mirroring the in-memory store's insertion order.

use anyhow::Context as _;
use async_trait::async_trait;
use gazette_core::{ArticleId, PageParams, UserId};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row as _;

use super::store::{Article, ArticleStore, NewArticle, StorageError};
use super::unix_millis_now;

/// Article store backed by a `PostgreSQL` connection pool.
pub struct PostgresArticleStore {
    pool: PgPool,
}

impl PostgresArticleStore {
    /// Connects a small pool to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Backend`] when the database is unreachable.
    pub async fn connect(url: &str) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(8)
            .connect(url)
            .await
            .context("connecting to postgres")?;
        Ok(Self { pool })
    }

    /// Creates the `articles` and `article_views` tables if absent.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Backend`] on DDL failure.
    pub async fn ensure_schema(&self) -> Result<(), StorageError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS articles (
                id UUID PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT,
                introduction TEXT,
                content TEXT NOT NULL,
                banner_image_url TEXT,
                author_id UUID NOT NULL,
                created_at_ms BIGINT NOT NULL,
                updated_at_ms BIGINT,
                published_at_ms BIGINT,
                seq BIGSERIAL
            )",
        )
        .execute(&self.pool)
        .await
        .context("creating articles table")?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS article_views (
                article_id UUID PRIMARY KEY REFERENCES articles (id) ON DELETE CASCADE,
                count BIGINT NOT NULL DEFAULT 0
            )",
        )
        .execute(&self.pool)
        .await
        .context("creating article_views table")?;
        Ok(())
    }

    async fn exists(&self, id: ArticleId) -> Result<bool, StorageError> {
        let row = sqlx::query("SELECT 1 FROM articles WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .context("checking article existence")?;
        Ok(row.is_some())
    }
}

fn to_db_ms(ms: u64) -> i64 {
    i64::try_from(ms).unwrap_or(i64::MAX)
}

fn from_db_ms(ms: i64) -> u64 {
    u64::try_from(ms).unwrap_or(0)
}

fn row_to_article(row: &PgRow) -> Article {
    Article {
        id: ArticleId(row.get("id")),
        title: row.get("title"),
        description: row.get("description"),
        introduction: row.get("introduction"),
        content: row.get("content"),
        banner_image_url: row.get("banner_image_url"),
        author_id: UserId(row.get("author_id")),
        created_at_ms: from_db_ms(row.get("created_at_ms")),
        updated_at_ms: row.get::<Option<i64>, _>("updated_at_ms").map(from_db_ms),
        published_at_ms: row.get::<Option<i64>, _>("published_at_ms").map(from_db_ms),
    }
}

#[async_trait]
impl ArticleStore for PostgresArticleStore {
    async fn create(&self, article: NewArticle) -> Result<ArticleId, StorageError> {
        let id = ArticleId::random();
        sqlx::query(
            "INSERT INTO articles
                (id, title, description, introduction, content, banner_image_url,
                 author_id, created_at_ms)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(id.0)
        .bind(&article.title)
        .bind(&article.description)
        .bind(&article.introduction)
        .bind(&article.content)
        .bind(&article.banner_image_url)
        .bind(article.author_id.0)
        .bind(to_db_ms(unix_millis_now()))
        .execute(&self.pool)
        .await
        .context("inserting article")?;
        Ok(id)
    }

    async fn get(&self, id: ArticleId) -> Result<Option<Article>, StorageError> {
        let row = sqlx::query("SELECT * FROM articles WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .context("selecting article")?;
        Ok(row.as_ref().map(row_to_article))
    }

    async fn update(&self, article: Article) -> Result<(), StorageError> {
        let result = sqlx::query(
            "UPDATE articles SET
                title = $2, description = $3, introduction = $4, content = $5,
                banner_image_url = $6, author_id = $7, created_at_ms = $8,
                updated_at_ms = $9, published_at_ms = $10
             WHERE id = $1",
        )
        .bind(article.id.0)
        .bind(&article.title)
        .bind(&article.description)
        .bind(&article.introduction)
        .bind(&article.content)
        .bind(&article.banner_image_url)
        .bind(article.author_id.0)
        .bind(to_db_ms(article.created_at_ms))
        .bind(article.updated_at_ms.map(to_db_ms))
        .bind(article.published_at_ms.map(to_db_ms))
        .execute(&self.pool)
        .await
        .context("updating article")?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: ArticleId) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .context("deleting article")?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn page(&self, params: PageParams) -> Result<(Vec<Article>, u64), StorageError> {
        let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM articles")
            .fetch_one(&self.pool)
            .await
            .context("counting articles")?
            .get("total");

        let rows = sqlx::query(
            "SELECT * FROM articles
             ORDER BY created_at_ms DESC, seq ASC
             OFFSET $1 LIMIT $2",
        )
        .bind(i64::from(params.skip))
        .bind(i64::from(params.effective_take()))
        .fetch_all(&self.pool)
        .await
        .context("selecting article page")?;

        let items = rows.iter().map(row_to_article).collect();
        Ok((items, u64::try_from(total).unwrap_or(0)))
    }

    async fn record_view(&self, id: ArticleId) -> Result<u64, StorageError> {
        if !self.exists(id).await? {
            return Err(StorageError::NotFound);
        }
        let count: i64 = sqlx::query(
            "INSERT INTO article_views (article_id, count) VALUES ($1, 1)
             ON CONFLICT (article_id)
             DO UPDATE SET count = article_views.count + 1
             RETURNING count",
        )
        .bind(id.0)
        .fetch_one(&self.pool)
        .await
        .context("incrementing view count")?
        .get("count");
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn views(&self, id: ArticleId) -> Result<u64, StorageError> {
        if !self.exists(id).await? {
            return Err(StorageError::NotFound);
        }
        let count: Option<i64> = sqlx::query("SELECT count FROM article_views WHERE article_id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .context("reading view count")?
            .map(|row| row.get("count"));
        Ok(count.map_or(0, |count| u64::try_from(count).unwrap_or(0)))
    }
}
