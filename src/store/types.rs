//! Feed and article entities.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Descriptions longer than this are considered too long to display as-is.
pub const MAX_DESCRIPTION_LENGTH: usize = 1000;

/// Length of the prefix kept by [`Article::truncated_description`].
const TRUNCATED_DESCRIPTION_LENGTH: usize = 297;

/// A subscribable content source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feed {
    /// Feed ID.
    pub id: String,
    /// Feed URL.
    pub url: String,
    /// Display title.
    pub title: String,
    /// Feed description.
    pub description: String,
    /// Last successful fetch. `None` until the feed has been fetched once.
    pub last_fetched: Option<DateTime<Utc>>,
    /// Globally visible default source.
    pub is_default: bool,
    /// When the feed was registered.
    pub created_at: DateTime<Utc>,
}

/// New feed for registration.
#[derive(Debug, Clone)]
pub struct NewFeed {
    /// Feed URL.
    pub url: String,
    /// Display title.
    pub title: String,
    /// Feed description.
    pub description: String,
    /// Globally visible default source.
    pub is_default: bool,
}

impl NewFeed {
    /// Create a new feed registration for the given URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: String::new(),
            description: String::new(),
            is_default: false,
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Mark the feed as a default source.
    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }
}

/// One piece of ingested content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Article {
    /// Article ID, generated at creation.
    pub id: String,
    /// Owning feed ID.
    pub feed_id: String,
    /// Title.
    pub title: String,
    /// Summary or synthesized description.
    pub description: String,
    /// Content body (may contain HTML).
    pub content: String,
    /// Canonical source URL; unique across the store.
    pub url: String,
    /// Author name, empty when unknown.
    pub author: String,
    /// Published time used for recency ordering.
    pub published_at: DateTime<Utc>,
    /// When the article was created.
    pub created_at: DateTime<Utc>,
}

impl Article {
    /// Create an article with a fresh ID for `feed_id` and `url`.
    ///
    /// `published_at` defaults to `created_at`.
    pub fn new(feed_id: impl Into<String>, url: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            feed_id: feed_id.into(),
            title: String::new(),
            description: String::new(),
            content: String::new(),
            url: url.into(),
            author: String::new(),
            published_at: now,
            created_at: now,
        }
    }

    /// Whether the reader should show the description next to the content.
    pub fn should_show_description(&self) -> bool {
        if self.description.is_empty() || self.description == self.content {
            return false;
        }

        // Long HTML descriptions are usually the full article body
        !(self.description.len() > MAX_DESCRIPTION_LENGTH
            && self.description.contains('<')
            && self.description.contains('>'))
    }

    /// Description shortened for list views.
    pub fn truncated_description(&self) -> String {
        if self.description.len() <= MAX_DESCRIPTION_LENGTH {
            return self.description.clone();
        }
        let prefix: String = self
            .description
            .chars()
            .take(TRUNCATED_DESCRIPTION_LENGTH)
            .collect();
        format!("{}...", prefix.trim())
    }
}
