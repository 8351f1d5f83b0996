//! Ingestion run coordinator.
//!
//! One cycle walks every registered feed in listing order, then runs the
//! aggregator once. Each feed and each item is processed inside its own
//! fault boundary, so a failure is recorded in the [`CycleReport`] and the
//! cycle moves on.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::aggregator::{AggregatorAdapter, HackerNewsClient};
use super::fault;
use super::normalizer::{article_from_item, canonical_url};
use super::report::{CycleReport, FeedOutcome};
use super::syndication::{HttpSyndicationSource, SyndicationSource};
use super::{save_if_absent, SaveResult};
use crate::config::Config;
use crate::db::Database;
use crate::store::{ArticleRepository, ArticleStore, Feed, FeedRepository, FeedStore};
use crate::Result;

/// Something that can run one ingestion cycle.
#[async_trait]
pub trait CycleRunner: Send + Sync {
    async fn run_cycle(&self) -> Result<CycleReport>;
}

struct AggregatorStep {
    adapter: AggregatorAdapter,
    feed_title: String,
}

/// Drives both source adapters across all feeds.
pub struct IngestCoordinator {
    feeds: Arc<dyn FeedStore>,
    articles: Arc<dyn ArticleStore>,
    source: Arc<dyn SyndicationSource>,
    aggregator: Option<AggregatorStep>,
}

impl IngestCoordinator {
    /// Create a coordinator without an aggregator step.
    pub fn new(
        feeds: Arc<dyn FeedStore>,
        articles: Arc<dyn ArticleStore>,
        source: Arc<dyn SyndicationSource>,
    ) -> Self {
        Self {
            feeds,
            articles,
            source,
            aggregator: None,
        }
    }

    /// Run `adapter` after the feed loop, against the feed titled `feed_title`.
    pub fn with_aggregator(mut self, adapter: AggregatorAdapter, feed_title: impl Into<String>) -> Self {
        self.aggregator = Some(AggregatorStep {
            adapter,
            feed_title: feed_title.into(),
        });
        self
    }

    /// Wire the SQLite stores and HTTP adapters described by `config`.
    pub fn from_config(config: &Config, db: &Database) -> Result<Self> {
        let feeds: Arc<dyn FeedStore> = Arc::new(FeedRepository::new(db.pool().clone()));
        let articles: Arc<dyn ArticleStore> = Arc::new(ArticleRepository::new(db.pool().clone()));
        let source = Arc::new(HttpSyndicationSource::new(&config.fetch)?);

        let coordinator = Self::new(feeds, articles.clone(), source);
        if !config.aggregator.enabled {
            return Ok(coordinator);
        }

        let api = Arc::new(HackerNewsClient::new(&config.aggregator, &config.fetch)?);
        let adapter =
            AggregatorAdapter::new(api, articles).with_max_stories(config.aggregator.max_stories);
        Ok(coordinator.with_aggregator(adapter, config.aggregator.feed_title.clone()))
    }

    /// Run one ingestion cycle.
    ///
    /// Fails only when the feed list cannot be read.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let mut report = CycleReport::begin(Utc::now());
        let feeds = self.feeds.list_all().await?;
        debug!("Starting ingestion cycle over {} feeds", feeds.len());

        for feed in &feeds {
            let mut outcome = FeedOutcome::new(&feed.id, &feed.url);
            let label = format!("feed {}", feed.url);
            if let Err(e) = fault::guard(&label, self.ingest_feed(feed, &mut outcome)).await {
                if e.is_transient() {
                    warn!("Failed to ingest feed {}: {}", feed.url, e);
                } else {
                    error!("Failed to ingest feed {}: {}", feed.url, e);
                }
                outcome.error = Some(e.to_string());
            }
            report.feeds.push(outcome);
        }

        if let Some(step) = &self.aggregator {
            report.aggregator = self.run_aggregator(step).await;
        }

        report.finished_at = Utc::now();
        report.log_summary();
        Ok(report)
    }

    async fn ingest_feed(&self, feed: &Feed, outcome: &mut FeedOutcome) -> Result<()> {
        let parsed = self.source.fetch(&feed.url).await?;
        let now = Utc::now();
        outcome.seen = parsed.items.len();

        if let Err(e) = self
            .feeds
            .record_fetch(&feed.id, &parsed.title, &parsed.description, now)
            .await
        {
            warn!("Failed to record fetch of {}: {}", feed.url, e);
            outcome.error = Some(e.to_string());
        }

        for item in &parsed.items {
            let Some(url) = item.link.as_deref().and_then(canonical_url) else {
                debug!("Skipping item without a usable link in {}", feed.url);
                outcome.skipped += 1;
                continue;
            };

            let article = article_from_item(&feed.id, url, item, now);
            let label = format!("item {}", article.url);
            match fault::guard(&label, save_if_absent(self.articles.as_ref(), &article)).await {
                Ok(SaveResult::Created) => {
                    debug!("Created article {}", article.url);
                    outcome.created += 1;
                }
                Ok(SaveResult::Duplicate) => outcome.skipped += 1,
                Err(e) => {
                    warn!("Failed to save item {}: {}", article.url, e);
                    outcome.failed += 1;
                }
            }
        }

        info!(
            "Fetched {}: {} items, {} new",
            feed.url, outcome.seen, outcome.created
        );
        Ok(())
    }

    /// Returns `None` only when no feed carries the aggregator title.
    async fn run_aggregator(&self, step: &AggregatorStep) -> Option<FeedOutcome> {
        let feed = match self.feeds.find_by_title(&step.feed_title).await {
            Ok(Some(feed)) => feed,
            Ok(None) => {
                warn!(
                    "No feed titled {:?}; skipping aggregator step",
                    step.feed_title
                );
                return None;
            }
            Err(e) => {
                warn!("Failed to look up aggregator feed: {}", e);
                return Some(FeedOutcome {
                    error: Some(format!(
                        "failed to look up feed titled {:?}: {}",
                        step.feed_title, e
                    )),
                    ..Default::default()
                });
            }
        };

        match fault::guard("aggregator", step.adapter.fetch_and_save(&feed)).await {
            Ok(outcome) => {
                info!(
                    "Fetched aggregator: {} stories, {} new",
                    outcome.seen, outcome.created
                );
                Some(outcome)
            }
            Err(e) => {
                warn!("Aggregator step failed: {}", e);
                let mut outcome = FeedOutcome::new(&feed.id, &feed.url);
                outcome.error = Some(e.to_string());
                Some(outcome)
            }
        }
    }
}

#[async_trait]
impl CycleRunner for IngestCoordinator {
    async fn run_cycle(&self) -> Result<CycleReport> {
        IngestCoordinator::run_cycle(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::aggregator::{Story, StoryApi};
    use crate::ingest::syndication::{ParsedFeed, ParsedItem};
    use chrono::DateTime;
    use crate::store::NewFeed;
    use crate::ReaderError;
    use std::collections::HashMap;

    struct StaticSource {
        feeds: HashMap<String, ParsedFeed>,
    }

    #[async_trait]
    impl SyndicationSource for StaticSource {
        async fn fetch(&self, url: &str) -> Result<ParsedFeed> {
            self.feeds
                .get(url)
                .cloned()
                .ok_or_else(|| ReaderError::Fetch(format!("unreachable: {}", url)))
        }
    }

    fn item(link: Option<&str>) -> ParsedItem {
        ParsedItem {
            title: "t".to_string(),
            link: link.map(String::from),
            ..Default::default()
        }
    }

    async fn setup(
        source: StaticSource,
    ) -> (Database, IngestCoordinator, Arc<FeedRepository>, Arc<ArticleRepository>) {
        let db = Database::open_in_memory().await.unwrap();
        let feeds = Arc::new(FeedRepository::new(db.pool().clone()));
        let articles = Arc::new(ArticleRepository::new(db.pool().clone()));
        let coordinator = IngestCoordinator::new(feeds.clone(), articles.clone(), Arc::new(source));
        (db, coordinator, feeds, articles)
    }

    #[tokio::test]
    async fn test_items_without_link_are_skipped() {
        let parsed = ParsedFeed {
            title: "Blog".to_string(),
            description: String::new(),
            items: vec![
                item(Some("https://blog.example/1")),
                item(None),
                item(Some("   ")),
            ],
        };
        let source = StaticSource {
            feeds: HashMap::from([("https://blog.example/rss".to_string(), parsed)]),
        };
        let (_db, coordinator, feeds, articles) = setup(source).await;
        feeds
            .create(&NewFeed::new("https://blog.example/rss"))
            .await
            .unwrap();

        let report = coordinator.run_cycle().await.unwrap();
        assert_eq!(report.feeds.len(), 1);
        let outcome = &report.feeds[0];
        assert_eq!(outcome.seen, 3);
        assert_eq!(outcome.created, 1);
        assert_eq!(outcome.skipped, 2);
        assert!(outcome.error.is_none());
        assert_eq!(articles.count().await.unwrap(), 1);
        assert!(report.aggregator.is_none());
    }

    #[tokio::test]
    async fn test_fetch_failure_records_error_and_leaves_feed_untouched() {
        let source = StaticSource {
            feeds: HashMap::new(),
        };
        let (_db, coordinator, feeds, _articles) = setup(source).await;
        let feed = feeds
            .create(&NewFeed::new("https://down.example/rss").with_title("Down"))
            .await
            .unwrap();

        let report = coordinator.run_cycle().await.unwrap();
        assert_eq!(report.failed_feeds(), 1);
        assert!(report.feeds[0]
            .error
            .as_deref()
            .unwrap()
            .contains("unreachable"));

        let stored = feeds.get(&feed.id).await.unwrap();
        assert!(stored.last_fetched.is_none());
        assert_eq!(stored.title, "Down");
    }

    #[tokio::test]
    async fn test_no_feeds_is_an_empty_cycle() {
        let source = StaticSource {
            feeds: HashMap::new(),
        };
        let (_db, coordinator, _feeds, _articles) = setup(source).await;

        let report = coordinator.run_cycle().await.unwrap();
        assert!(report.feeds.is_empty());
        assert_eq!(report.total_created(), 0);
        assert!(report.finished_at >= report.started_at);
    }

    struct TitleLookupFails(Arc<FeedRepository>);

    #[async_trait]
    impl FeedStore for TitleLookupFails {
        async fn list_all(&self) -> Result<Vec<Feed>> {
            self.0.list_all().await
        }

        async fn get(&self, id: &str) -> Result<Feed> {
            self.0.get(id).await
        }

        async fn find_by_title(&self, _title: &str) -> Result<Option<Feed>> {
            Err(ReaderError::Persistence("no such table: feeds".to_string()))
        }

        async fn create(&self, feed: &NewFeed) -> Result<Feed> {
            self.0.create(feed).await
        }

        async fn update_last_fetched(&self, id: &str, fetched_at: DateTime<Utc>) -> Result<()> {
            self.0.update_last_fetched(id, fetched_at).await
        }

        async fn record_fetch(
            &self,
            id: &str,
            title: &str,
            description: &str,
            fetched_at: DateTime<Utc>,
        ) -> Result<()> {
            self.0.record_fetch(id, title, description, fetched_at).await
        }
    }

    struct NoStories;

    #[async_trait]
    impl StoryApi for NoStories {
        async fn list_top_story_ids(&self) -> Result<Vec<u64>> {
            Ok(Vec::new())
        }

        async fn fetch_story(&self, id: u64) -> Result<Story> {
            Err(ReaderError::Fetch(format!("no story {}", id)))
        }
    }

    #[tokio::test]
    async fn test_aggregator_lookup_failure_is_reported() {
        let source = StaticSource {
            feeds: HashMap::new(),
        };
        let (_db, _coordinator, feeds, articles) = setup(source).await;
        let adapter = AggregatorAdapter::new(Arc::new(NoStories), articles.clone());
        let coordinator = IngestCoordinator::new(
            Arc::new(TitleLookupFails(feeds)),
            articles,
            Arc::new(StaticSource {
                feeds: HashMap::new(),
            }),
        )
        .with_aggregator(adapter, "Hacker News");

        let report = coordinator.run_cycle().await.unwrap();
        let aggregator = report.aggregator.as_ref().expect("lookup failure is reported");
        let error = aggregator.error.as_deref().unwrap();
        assert!(error.contains("failed to look up feed titled \"Hacker News\""));
        assert!(error.contains("no such table"));
        assert_eq!(aggregator.seen, 0);
        assert_eq!(report.total_created(), 0);
    }

    #[tokio::test]
    async fn test_from_config_without_aggregator() {
        let db = Database::open_in_memory().await.unwrap();
        let mut config = Config::default();
        config.aggregator.enabled = false;

        let coordinator = IngestCoordinator::from_config(&config, &db).unwrap();
        assert!(coordinator.aggregator.is_none());

        config.aggregator.enabled = true;
        let coordinator = IngestCoordinator::from_config(&config, &db).unwrap();
        assert!(coordinator.aggregator.is_some());
    }
}
