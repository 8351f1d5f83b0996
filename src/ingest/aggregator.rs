//! Aggregator (Hacker News) source adapter.
//!
//! The aggregator exposes a ranked list of story ids and one JSON document
//! per story. Stories are fetched one at a time in ranked order; a story
//! whose detail fetch fails is logged and skipped.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use super::fault;
use super::normalizer::{article_from_story, canonical_url};
use super::report::FeedOutcome;
use super::syndication::build_client;
use super::{save_if_absent, SaveResult};
use crate::config::{AggregatorConfig, FetchConfig};
use crate::store::{ArticleStore, Feed};
use crate::{ReaderError, Result};

/// One story as returned by the aggregator API.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Story {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    /// External link; empty for text-only posts.
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub score: i64,
    /// Submitter handle.
    #[serde(default)]
    pub by: String,
    /// Submission time as a Unix timestamp.
    #[serde(default)]
    pub time: i64,
    /// Comment count.
    #[serde(default)]
    pub descendants: i64,
    #[serde(default, rename = "type")]
    pub kind: String,
}

/// Read access to the aggregator API.
#[async_trait]
pub trait StoryApi: Send + Sync {
    /// Ranked list of top story ids.
    async fn list_top_story_ids(&self) -> Result<Vec<u64>>;

    /// Fetch a single story.
    async fn fetch_story(&self, id: u64) -> Result<Story>;
}

/// HTTP client for the Hacker News Firebase API.
pub struct HackerNewsClient {
    client: Client,
    base_url: String,
}

impl HackerNewsClient {
    pub fn new(aggregator: &AggregatorConfig, fetch: &FetchConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(fetch)?,
            base_url: aggregator.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ReaderError::Fetch(format!("failed to fetch {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(ReaderError::Fetch(format!(
                "HTTP error {} for {}",
                response.status(),
                url
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ReaderError::Fetch(format!("failed to read {}: {}", url, e)))?;

        serde_json::from_slice(&bytes)
            .map_err(|e| ReaderError::Parse(format!("invalid JSON from {}: {}", url, e)))
    }
}

#[async_trait]
impl StoryApi for HackerNewsClient {
    async fn list_top_story_ids(&self) -> Result<Vec<u64>> {
        self.get_json("beststories.json").await
    }

    async fn fetch_story(&self, id: u64) -> Result<Story> {
        self.get_json(&format!("item/{}.json", id)).await
    }
}

/// Turns aggregator stories into articles for the aggregator feed.
pub struct AggregatorAdapter {
    api: Arc<dyn StoryApi>,
    articles: Arc<dyn ArticleStore>,
    max_stories: Option<usize>,
}

impl AggregatorAdapter {
    pub fn new(api: Arc<dyn StoryApi>, articles: Arc<dyn ArticleStore>) -> Self {
        Self {
            api,
            articles,
            max_stories: None,
        }
    }

    /// Only consider the first `max` ranked ids.
    pub fn with_max_stories(mut self, max: Option<usize>) -> Self {
        self.max_stories = max;
        self
    }

    /// Fetch stories in ranked order.
    ///
    /// Fails only when the id list cannot be obtained.
    pub async fn fetch_stories(&self) -> Result<Vec<Story>> {
        let mut ids = self.api.list_top_story_ids().await?;
        if let Some(max) = self.max_stories {
            ids.truncate(max);
        }

        let mut stories = Vec::with_capacity(ids.len());
        for id in ids {
            let label = format!("story {}", id);
            match fault::guard(&label, self.api.fetch_story(id)).await {
                Ok(story) => stories.push(story),
                Err(e) => warn!("Skipping story {}: {}", id, e),
            }
        }
        Ok(stories)
    }

    /// Fetch stories and persist the new ones under `feed`.
    pub async fn fetch_and_save(&self, feed: &Feed) -> Result<FeedOutcome> {
        let stories = self.fetch_stories().await?;
        let now = Utc::now();
        let mut outcome = FeedOutcome::new(&feed.id, &feed.url);
        outcome.seen = stories.len();

        for story in &stories {
            let Some(url) = canonical_url(&story.url) else {
                debug!("Story {} has no usable URL", story.id);
                outcome.skipped += 1;
                continue;
            };

            let article = article_from_story(&feed.id, url, story, now);
            let label = format!("story {}", story.id);
            match fault::guard(&label, save_if_absent(self.articles.as_ref(), &article)).await {
                Ok(SaveResult::Created) => outcome.created += 1,
                Ok(SaveResult::Duplicate) => outcome.skipped += 1,
                Err(e) => {
                    warn!("Failed to save story {}: {}", story.id, e);
                    outcome.failed += 1;
                }
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_story_deserialize_full() {
        let json = r#"{
            "by": "dhouston",
            "descendants": 71,
            "id": 8863,
            "kids": [8952, 9224],
            "score": 111,
            "time": 1175714200,
            "title": "My YC app: Dropbox",
            "type": "story",
            "url": "http://www.getdropbox.com/u/2/screencast.html"
        }"#;

        let story: Story = serde_json::from_str(json).unwrap();
        assert_eq!(story.id, 8863);
        assert_eq!(story.by, "dhouston");
        assert_eq!(story.descendants, 71);
        assert_eq!(story.score, 111);
        assert_eq!(story.kind, "story");
        assert_eq!(story.url, "http://www.getdropbox.com/u/2/screencast.html");
    }

    #[test]
    fn test_story_deserialize_defaults() {
        let story: Story = serde_json::from_str(r#"{"id": 1, "title": "Ask HN"}"#).unwrap();
        assert_eq!(story.id, 1);
        assert_eq!(story.title, "Ask HN");
        assert!(story.url.is_empty());
        assert_eq!(story.score, 0);
        assert_eq!(story.descendants, 0);
    }

    #[test]
    fn test_story_requires_id() {
        assert!(serde_json::from_str::<Story>(r#"{"title": "x"}"#).is_err());
    }

    #[test]
    fn test_client_trims_base_url() {
        let config = AggregatorConfig {
            base_url: "https://hacker-news.firebaseio.com/v0/".to_string(),
            ..Default::default()
        };
        let client = HackerNewsClient::new(&config, &FetchConfig::default()).unwrap();
        assert_eq!(client.base_url, "https://hacker-news.firebaseio.com/v0");
    }
}
