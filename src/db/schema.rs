//! Database schema and migrations for redreader.
//!
//! Migrations are applied sequentially when the database is opened; the
//! schema_version table tracks which have been applied.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: feeds and articles
    r#"
CREATE TABLE feeds (
    id              TEXT PRIMARY KEY,
    url             TEXT NOT NULL,
    title           TEXT NOT NULL DEFAULT '',
    description     TEXT NOT NULL DEFAULT '',
    last_fetched_at TEXT,
    is_default      INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL
);

-- url is the deduplication key for ingested content
CREATE TABLE articles (
    id           TEXT PRIMARY KEY,
    feed_id      TEXT NOT NULL REFERENCES feeds(id) ON DELETE CASCADE,
    title        TEXT NOT NULL DEFAULT '',
    description  TEXT NOT NULL DEFAULT '',
    content      TEXT NOT NULL DEFAULT '',
    url          TEXT NOT NULL UNIQUE,
    author       TEXT NOT NULL DEFAULT '',
    published_at TEXT NOT NULL,
    created_at   TEXT NOT NULL
);

CREATE INDEX idx_articles_feed_published ON articles(feed_id, published_at);
"#,
    // v2: case-insensitive title lookup for the aggregator pseudo-feed
    r#"
CREATE INDEX idx_feeds_title_nocase ON feeds(title COLLATE NOCASE);
CREATE INDEX idx_articles_published ON articles(published_at);
"#,
];
