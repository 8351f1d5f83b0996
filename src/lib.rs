//! redreader - scheduled feed ingestion
//!
//! Polls RSS/Atom feeds and the Hacker News API on a timer, normalizes
//! their items into a single article model, and stores the ones not seen
//! before.

pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod store;

pub use config::Config;
pub use db::Database;
pub use error::{ReaderError, Result};
pub use ingest::{
    AggregatorAdapter, CycleReport, CycleRunner, FeedOutcome, HackerNewsClient,
    HttpSyndicationSource, IngestCoordinator, ParsedFeed, ParsedItem, Scheduler, SchedulerState,
    Story, StoryApi, SyndicationSource,
};
pub use store::{
    Article, ArticleRepository, ArticleStore, Feed, FeedRepository, FeedStore, NewFeed,
};
