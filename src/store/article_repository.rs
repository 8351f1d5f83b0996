//! SQLite article repository.

use async_trait::async_trait;
use chrono::Utc;

use super::types::Article;
use super::ArticleStore;
use crate::db::{format_timestamp, parse_timestamp, DbPool};
use crate::Result;

const ARTICLE_COLUMNS: &str =
    "id, feed_id, title, description, content, url, author, published_at, created_at";

/// Row type for an article from the database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct ArticleRow {
    id: String,
    feed_id: String,
    title: String,
    description: String,
    content: String,
    url: String,
    author: String,
    published_at: String,
    created_at: String,
}

impl From<ArticleRow> for Article {
    fn from(row: ArticleRow) -> Self {
        let created_at = parse_timestamp(&row.created_at).unwrap_or_else(Utc::now);
        Article {
            id: row.id,
            feed_id: row.feed_id,
            title: row.title,
            description: row.description,
            content: row.content,
            url: row.url,
            author: row.author,
            published_at: parse_timestamp(&row.published_at).unwrap_or(created_at),
            created_at,
        }
    }
}

/// Repository for article operations.
#[derive(Clone)]
pub struct ArticleRepository {
    pool: DbPool,
}

impl ArticleRepository {
    /// Create a new repository over the given pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ArticleStore for ArticleRepository {
    async fn exists_by_url(&self, url: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM articles WHERE url = $1)")
            .bind(url)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    /// The UNIQUE(url) constraint turns a racing duplicate into a no-op.
    async fn create(&self, article: &Article) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO articles
                (id, feed_id, title, description, content, url, author, published_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT(url) DO NOTHING
            "#,
        )
        .bind(&article.id)
        .bind(&article.feed_id)
        .bind(&article.title)
        .bind(&article.description)
        .bind(&article.content)
        .bind(&article.url)
        .bind(&article.author)
        .bind(format_timestamp(&article.published_at))
        .bind(format_timestamp(&article.created_at))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_by_url(&self, url: &str) -> Result<Option<Article>> {
        let query = format!("SELECT {} FROM articles WHERE url = $1", ARTICLE_COLUMNS);
        let row = sqlx::query_as::<_, ArticleRow>(&query)
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Article::from))
    }

    async fn list_by_feed(&self, feed_id: &str, limit: i64) -> Result<Vec<Article>> {
        let query = format!(
            "SELECT {} FROM articles WHERE feed_id = $1 ORDER BY published_at DESC, rowid DESC LIMIT $2",
            ARTICLE_COLUMNS
        );
        let rows = sqlx::query_as::<_, ArticleRow>(&query)
            .bind(feed_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Article::from).collect())
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
