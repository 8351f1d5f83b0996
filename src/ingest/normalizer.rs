//! Mapping from source items to the canonical [`Article`].
//!
//! Pure functions only; the caller supplies the ingestion instant so that
//! every article created in one step shares the same fallback time.

use chrono::{DateTime, Utc};

use super::aggregator::Story;
use super::syndication::ParsedItem;
use crate::store::Article;

/// Compute the canonical form of a source URL.
///
/// Returns `None` for empty or unparseable links; such items are skipped.
pub fn canonical_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    url::Url::parse(trimmed).ok().map(|u| u.to_string())
}

/// Build an article from a syndication item.
///
/// The first author wins; a missing published time becomes `now`.
pub fn article_from_item(
    feed_id: &str,
    url: String,
    item: &ParsedItem,
    now: DateTime<Utc>,
) -> Article {
    let mut article = Article::new(feed_id, url, now);
    article.title = item.title.clone();
    article.description = item.description.clone();
    article.content = item.content.clone();
    article.author = item.authors.first().cloned().unwrap_or_default();
    article.published_at = item.published_at.unwrap_or(now);
    article
}

/// Build an article from an aggregator story.
///
/// The published time is always the ingestion instant, never the story's
/// own timestamp.
pub fn article_from_story(feed_id: &str, url: String, story: &Story, now: DateTime<Utc>) -> Article {
    let mut article = Article::new(feed_id, url, now);
    article.title = story.title.clone();
    article.description = story_description(story);
    article.author = story.by.clone();
    article
}

/// Synthesized description for an aggregator story.
pub fn story_description(story: &Story) -> String {
    format!("Points: {} | Comments: {}", story.score, story.descendants)
}
