//! Scheduled ingestion pipeline.
//!
//! - [`scheduler`] owns the timer and runs one cycle per tick
//! - [`coordinator`] drives every feed plus the aggregator through a cycle
//! - [`syndication`] and [`aggregator`] fetch from the two source kinds
//! - [`normalizer`] maps source items to articles
//! - [`fault`] keeps a panic inside one step from escaping it

pub mod aggregator;
pub mod coordinator;
pub mod fault;
pub mod normalizer;
pub mod report;
pub mod scheduler;
pub mod syndication;

pub use aggregator::{AggregatorAdapter, HackerNewsClient, Story, StoryApi};
pub use coordinator::{CycleRunner, IngestCoordinator};
pub use report::{CycleReport, FeedOutcome};
pub use scheduler::{Scheduler, SchedulerState};
pub use syndication::{HttpSyndicationSource, ParsedFeed, ParsedItem, SyndicationSource};

use crate::store::{Article, ArticleStore};
use crate::Result;

/// What happened to a candidate article.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SaveResult {
    Created,
    Duplicate,
}

/// Persist `article` unless its URL is already stored.
pub(crate) async fn save_if_absent(
    articles: &dyn ArticleStore,
    article: &Article,
) -> Result<SaveResult> {
    if articles.exists_by_url(&article.url).await? {
        return Ok(SaveResult::Duplicate);
    }
    // A concurrent writer may have won between the check and the insert
    if articles.create(article).await? {
        Ok(SaveResult::Created)
    } else {
        Ok(SaveResult::Duplicate)
    }
}
