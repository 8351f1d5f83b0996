//! SQLite feed repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::types::{Feed, NewFeed};
use super::FeedStore;
use crate::db::{format_timestamp, parse_timestamp, DbPool};
use crate::{ReaderError, Result};

const FEED_COLUMNS: &str =
    "id, url, title, description, last_fetched_at, is_default, created_at";

/// Row type for a feed from the database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedRow {
    id: String,
    url: String,
    title: String,
    description: String,
    last_fetched_at: Option<String>,
    is_default: bool,
    created_at: String,
}

impl From<FeedRow> for Feed {
    fn from(row: FeedRow) -> Self {
        Feed {
            id: row.id,
            url: row.url,
            title: row.title,
            description: row.description,
            last_fetched: row.last_fetched_at.and_then(|s| parse_timestamp(&s)),
            is_default: row.is_default,
            created_at: parse_timestamp(&row.created_at).unwrap_or_else(Utc::now),
        }
    }
}

/// Repository for feed operations.
#[derive(Clone)]
pub struct FeedRepository {
    pool: DbPool,
}

impl FeedRepository {
    /// Create a new repository over the given pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn get_optional(&self, id: &str) -> Result<Option<Feed>> {
        let query = format!("SELECT {} FROM feeds WHERE id = $1", FEED_COLUMNS);
        let row = sqlx::query_as::<_, FeedRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Feed::from))
    }

    async fn ensure_exists(&self, id: &str) -> Result<()> {
        match self.get_optional(id).await? {
            Some(_) => Ok(()),
            None => Err(ReaderError::NotFound(format!("feed {}", id))),
        }
    }
}

#[async_trait]
impl FeedStore for FeedRepository {
    /// Feeds are listed in registration order.
    async fn list_all(&self) -> Result<Vec<Feed>> {
        let query = format!("SELECT {} FROM feeds ORDER BY rowid ASC", FEED_COLUMNS);
        let rows = sqlx::query_as::<_, FeedRow>(&query)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Feed::from).collect())
    }

    async fn get(&self, id: &str) -> Result<Feed> {
        self.get_optional(id)
            .await?
            .ok_or_else(|| ReaderError::NotFound(format!("feed {}", id)))
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<Feed>> {
        let query = format!(
            "SELECT {} FROM feeds WHERE title = $1 COLLATE NOCASE ORDER BY rowid ASC LIMIT 1",
            FEED_COLUMNS
        );
        let row = sqlx::query_as::<_, FeedRow>(&query)
            .bind(title)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Feed::from))
    }

    async fn create(&self, feed: &NewFeed) -> Result<Feed> {
        if feed.url.trim().is_empty() {
            return Err(ReaderError::Validation("feed URL is empty".to_string()));
        }

        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO feeds (id, url, title, description, is_default, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&id)
        .bind(feed.url.trim())
        .bind(&feed.title)
        .bind(&feed.description)
        .bind(feed.is_default)
        .bind(format_timestamp(&Utc::now()))
        .execute(&self.pool)
        .await?;

        self.get(&id).await
    }

    async fn update_last_fetched(&self, id: &str, fetched_at: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE feeds SET last_fetched_at = $1
            WHERE id = $2 AND (last_fetched_at IS NULL OR last_fetched_at <= $1)
            "#,
        )
        .bind(format_timestamp(&fetched_at))
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Either unknown or already newer
            self.ensure_exists(id).await?;
        }
        Ok(())
    }

    async fn record_fetch(
        &self,
        id: &str,
        title: &str,
        description: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE feeds
            SET title = $1,
                description = $2,
                last_fetched_at = CASE
                    WHEN last_fetched_at IS NULL OR last_fetched_at <= $3 THEN $3
                    ELSE last_fetched_at
                END
            WHERE id = $4
            "#,
        )
        .bind(title)
        .bind(description)
        .bind(format_timestamp(&fetched_at))
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ReaderError::NotFound(format!("feed {}", id)));
        }
        Ok(())
    }
}
