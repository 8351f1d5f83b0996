//! Per-cycle ingestion report.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

/// Result of processing one feed during a cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeedOutcome {
    pub feed_id: String,
    pub url: String,
    /// Items returned by the source.
    pub seen: usize,
    /// New articles persisted.
    pub created: usize,
    /// Items skipped as duplicates or for lacking a usable link.
    pub skipped: usize,
    /// Items whose dedup check or write failed.
    pub failed: usize,
    /// Feed-level error: the fetch failed or its metadata could not be
    /// recorded.
    pub error: Option<String>,
}

impl FeedOutcome {
    /// Create an empty outcome for a feed.
    pub fn new(feed_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            feed_id: feed_id.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    /// Whether a feed-level error was recorded.
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// One ingestion run across every feed and the aggregator.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Outcomes in feed listing order.
    pub feeds: Vec<FeedOutcome>,
    /// Aggregator outcome, if the aggregator step ran.
    pub aggregator: Option<FeedOutcome>,
}

impl CycleReport {
    pub(crate) fn begin(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: started_at,
            feeds: Vec::new(),
            aggregator: None,
        }
    }

    fn outcomes(&self) -> impl Iterator<Item = &FeedOutcome> {
        self.feeds.iter().chain(self.aggregator.iter())
    }

    /// Total articles created in this cycle.
    pub fn total_created(&self) -> usize {
        self.outcomes().map(|o| o.created).sum()
    }

    /// Total items that failed individually.
    pub fn total_failed_items(&self) -> usize {
        self.outcomes().map(|o| o.failed).sum()
    }

    /// Number of feeds with a feed-level error.
    pub fn failed_feeds(&self) -> usize {
        self.outcomes().filter(|o| o.is_failed()).count()
    }

    /// Emit the summary line for this cycle.
    pub fn log_summary(&self) {
        let elapsed = self.finished_at - self.started_at;
        info!(
            feeds = self.feeds.len(),
            created = self.total_created(),
            failed_feeds = self.failed_feeds(),
            failed_items = self.total_failed_items(),
            aggregator = self.aggregator.is_some(),
            elapsed_ms = elapsed.num_milliseconds(),
            "Ingestion cycle finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_include_aggregator() {
        let mut report = CycleReport::begin(Utc::now());

        let mut a = FeedOutcome::new("a", "https://a.example/rss");
        a.seen = 3;
        a.created = 2;
        a.skipped = 1;
        report.feeds.push(a);

        let mut b = FeedOutcome::new("b", "https://b.example/rss");
        b.error = Some("fetch error: timeout".to_string());
        report.feeds.push(b);

        let mut hn = FeedOutcome::new("hn", "https://news.ycombinator.com");
        hn.created = 4;
        hn.failed = 1;
        report.aggregator = Some(hn);

        assert_eq!(report.total_created(), 6);
        assert_eq!(report.total_failed_items(), 1);
        assert_eq!(report.failed_feeds(), 1);
        assert!(report.feeds[1].is_failed());
        assert!(!report.feeds[0].is_failed());
    }

    #[test]
    fn test_empty_report() {
        let report = CycleReport::begin(Utc::now());
        assert_eq!(report.total_created(), 0);
        assert_eq!(report.failed_feeds(), 0);
        report.log_summary();
    }
}
