//! Feed and article stores.
//!
//! The ingestion pipeline only talks to the [`FeedStore`] and
//! [`ArticleStore`] traits. The SQLite repositories in this module are the
//! implementations the binary uses; any other backend can be plugged into
//! the coordinator as long as it keeps the URL-uniqueness guarantee of
//! [`ArticleStore::create`].

mod article_repository;
mod feed_repository;
pub mod types;

pub use article_repository::ArticleRepository;
pub use feed_repository::FeedRepository;
pub use types::{Article, Feed, NewFeed, MAX_DESCRIPTION_LENGTH};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::Result;

/// Storage of registered feeds.
#[async_trait]
pub trait FeedStore: Send + Sync {
    /// List all registered feeds.
    async fn list_all(&self) -> Result<Vec<Feed>>;

    /// Get a feed by ID. Returns `NotFound` if it does not exist.
    async fn get(&self, id: &str) -> Result<Feed>;

    /// Find a feed by display title, ignoring case.
    async fn find_by_title(&self, title: &str) -> Result<Option<Feed>>;

    /// Register a new feed.
    async fn create(&self, feed: &NewFeed) -> Result<Feed>;

    /// Advance the last-fetched timestamp.
    ///
    /// Never moves the timestamp backwards: an older value is ignored.
    async fn update_last_fetched(&self, id: &str, fetched_at: DateTime<Utc>) -> Result<()>;

    /// Record a successful fetch: title, description and last-fetched time.
    async fn record_fetch(
        &self,
        id: &str,
        title: &str,
        description: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<()>;
}

/// Storage of ingested articles, keyed by canonical URL.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Whether an article with this canonical URL exists.
    async fn exists_by_url(&self, url: &str) -> Result<bool>;

    /// Persist a new article.
    ///
    /// Returns `false` without error when an article with the same URL is
    /// already stored.
    async fn create(&self, article: &Article) -> Result<bool>;

    /// Get an article by canonical URL.
    async fn get_by_url(&self, url: &str) -> Result<Option<Article>>;

    /// List a feed's articles, newest first.
    async fn list_by_feed(&self, feed_id: &str, limit: i64) -> Result<Vec<Article>>;

    /// Count all articles.
    async fn count(&self) -> Result<i64>;
}
