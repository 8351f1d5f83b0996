//! Syndication (RSS/Atom) source adapter.
//!
//! Fetches one feed over HTTP with SSRF protection, timeouts and a size
//! limit, and parses it with `feed-rs` into [`ParsedFeed`].

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feed_rs::parser;
use reqwest::Client;
use tracing::debug;

use crate::config::FetchConfig;
use crate::{ReaderError, Result};

/// A parsed syndication feed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFeed {
    /// Feed title, empty if the source has none.
    pub title: String,
    /// Feed description, empty if the source has none.
    pub description: String,
    /// Items in source order.
    pub items: Vec<ParsedItem>,
}

/// One item of a syndication feed, before normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedItem {
    pub title: String,
    pub description: String,
    pub content: String,
    /// Link to the original article.
    pub link: Option<String>,
    /// Author names in source order.
    pub authors: Vec<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Anything that can turn a feed URL into a [`ParsedFeed`].
#[async_trait]
pub trait SyndicationSource: Send + Sync {
    /// Fetch and parse the feed at `url`.
    ///
    /// Fails with `Fetch` on transport problems and `Parse` on malformed
    /// content.
    async fn fetch(&self, url: &str) -> Result<ParsedFeed>;
}

/// HTTP syndication source backed by reqwest and feed-rs.
pub struct HttpSyndicationSource {
    client: Client,
    max_feed_size: u64,
    allow_private_hosts: bool,
}

impl HttpSyndicationSource {
    /// Create a source using the given fetch settings.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            max_feed_size: config.max_feed_size_bytes,
            allow_private_hosts: config.allow_private_hosts,
        })
    }
}

/// Build the HTTP client shared by the source adapters.
pub(crate) fn build_client(config: &FetchConfig) -> Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .read_timeout(Duration::from_secs(config.read_timeout_secs))
        .timeout(Duration::from_secs(config.total_timeout_secs))
        .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
        .user_agent(config.user_agent.as_str())
        .build()
        .map_err(|e| ReaderError::Config(format!("failed to create HTTP client: {}", e)))
}

#[async_trait]
impl SyndicationSource for HttpSyndicationSource {
    async fn fetch(&self, url: &str) -> Result<ParsedFeed> {
        if !self.allow_private_hosts {
            validate_url(url)?;
        }

        debug!("Fetching feed {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ReaderError::Fetch(format!("failed to fetch feed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ReaderError::Fetch(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_feed_size {
                return Err(ReaderError::Fetch(format!(
                    "feed too large: {} bytes (max {} bytes)",
                    content_length, self.max_feed_size
                )));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ReaderError::Fetch(format!("failed to read response: {}", e)))?;

        // Content-Length may be absent or wrong
        if bytes.len() as u64 > self.max_feed_size {
            return Err(ReaderError::Fetch(format!(
                "feed too large: {} bytes (max {} bytes)",
                bytes.len(),
                self.max_feed_size
            )));
        }

        parse_feed(&bytes)
    }
}

/// Validate a feed URL for SSRF protection.
///
/// Only http and https are accepted, and the host must not be a
/// loopback, private, link-local or internal-only name.
pub fn validate_url(url: &str) -> Result<()> {
    let parsed =
        url::Url::parse(url).map_err(|e| ReaderError::Validation(format!("invalid URL: {}", e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(ReaderError::Validation(format!(
                "unsupported URL scheme: {}",
                scheme
            )));
        }
    }

    let host = parsed
        .host()
        .ok_or_else(|| ReaderError::Validation("URL has no host".to_string()))?;

    let ip = match host {
        url::Host::Domain(domain) => {
            if is_forbidden_hostname(domain) {
                return Err(ReaderError::Validation(format!(
                    "forbidden host: {}",
                    domain
                )));
            }
            return Ok(());
        }
        url::Host::Ipv4(ipv4) => IpAddr::V4(ipv4),
        url::Host::Ipv6(ipv6) => IpAddr::V6(ipv6),
    };

    if is_private_ip(&ip) {
        return Err(ReaderError::Validation(format!(
            "private IP address not allowed: {}",
            ip
        )));
    }
    Ok(())
}

fn is_forbidden_hostname(host: &str) -> bool {
    const FORBIDDEN_SUFFIXES: [&str; 7] = [
        ".local",
        ".localhost",
        ".internal",
        ".intranet",
        ".corp",
        ".home",
        ".lan",
    ];

    let host = host.trim_end_matches('.').to_lowercase();
    host == "localhost" || FORBIDDEN_SUFFIXES.iter().any(|s| host.ends_with(s))
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let o = v4.octets();
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // Documentation ranges
                || (o[0] == 192 && o[1] == 0 && o[2] == 2)
                || (o[0] == 198 && o[1] == 51 && o[2] == 100)
                || (o[0] == 203 && o[1] == 0 && o[2] == 113)
        }
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_private_ip(&IpAddr::V4(mapped));
            }
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xfe00) == 0xfc00 // unique local
                || (first & 0xffc0) == 0xfe80 // link-local
        }
    }
}

/// Parse feed bytes into a [`ParsedFeed`].
pub fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed> {
    let feed = parser::parse(bytes)
        .map_err(|e| ReaderError::Parse(format!("failed to parse feed: {}", e)))?;

    let items = feed
        .entries
        .into_iter()
        .map(|entry| ParsedItem {
            title: entry.title.map(|t| t.content).unwrap_or_default(),
            description: entry.summary.map(|t| t.content).unwrap_or_default(),
            content: entry.content.and_then(|c| c.body).unwrap_or_default(),
            link: entry
                .links
                .into_iter()
                .map(|l| l.href)
                .find(|href| !href.trim().is_empty()),
            authors: entry
                .authors
                .into_iter()
                .map(|a| a.name)
                .filter(|name| !name.trim().is_empty())
                .collect(),
            published_at: entry.published.or(entry.updated),
        })
        .collect();

    Ok(ParsedFeed {
        title: feed.title.map(|t| t.content).unwrap_or_default(),
        description: feed.description.map(|d| d.content).unwrap_or_default(),
        items,
    })
}
