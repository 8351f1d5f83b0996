//! Test helpers for integration tests.
//!
//! Provides a local HTTP fixture server, RSS builders and store wrappers.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::{header, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use redreader::config::{AggregatorConfig, FetchConfig};
use redreader::{
    Article, ArticleRepository, ArticleStore, Database, FeedRepository, ReaderError, Result,
};

#[derive(Clone)]
struct Fixture {
    status: StatusCode,
    content_type: &'static str,
    body: String,
}

#[derive(Default)]
struct Routes {
    fixtures: HashMap<String, Fixture>,
    hits: HashMap<String, usize>,
}

/// Local HTTP server serving canned responses by path.
///
/// Unknown paths answer 404.
pub struct FixtureServer {
    addr: SocketAddr,
    routes: Arc<Mutex<Routes>>,
    handle: JoinHandle<()>,
}

impl FixtureServer {
    /// Start a server on an ephemeral port.
    pub async fn start() -> Self {
        let routes = Arc::new(Mutex::new(Routes::default()));
        let shared = routes.clone();

        let router = Router::new().fallback(move |uri: Uri| {
            let routes = shared.clone();
            async move {
                let mut routes = routes.lock().unwrap();
                *routes.hits.entry(uri.path().to_string()).or_default() += 1;
                match routes.fixtures.get(uri.path()) {
                    Some(f) => (
                        f.status,
                        [(header::CONTENT_TYPE, f.content_type)],
                        f.body.clone(),
                    )
                        .into_response(),
                    None => StatusCode::NOT_FOUND.into_response(),
                }
            }
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            addr,
            routes,
            handle,
        }
    }

    /// Absolute URL for `path`.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    fn set(&self, path: &str, status: StatusCode, content_type: &'static str, body: String) {
        self.routes.lock().unwrap().fixtures.insert(
            path.to_string(),
            Fixture {
                status,
                content_type,
                body,
            },
        );
    }

    pub fn set_rss(&self, path: &str, body: String) {
        self.set(path, StatusCode::OK, "application/rss+xml", body);
    }

    pub fn set_json(&self, path: &str, value: serde_json::Value) {
        self.set(path, StatusCode::OK, "application/json", value.to_string());
    }

    pub fn set_status(&self, path: &str, status: StatusCode) {
        self.set(path, status, "text/plain", String::new());
    }

    /// Number of requests received for `path`.
    pub fn hits(&self, path: &str) -> usize {
        self.routes
            .lock()
            .unwrap()
            .hits
            .get(path)
            .copied()
            .unwrap_or(0)
    }
}

impl Drop for FixtureServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// One RSS item for [`rss_feed`].
pub struct RssItem<'a> {
    pub title: &'a str,
    pub link: Option<&'a str>,
    pub pub_date: Option<&'a str>,
}

impl<'a> RssItem<'a> {
    pub fn new(title: &'a str, link: &'a str) -> Self {
        Self {
            title,
            link: Some(link),
            pub_date: Some("Tue, 02 Jan 2024 10:00:00 GMT"),
        }
    }

    pub fn undated(mut self) -> Self {
        self.pub_date = None;
        self
    }
}

/// Build an RSS 2.0 document.
pub fn rss_feed(title: &str, description: &str, items: &[RssItem<'_>]) -> String {
    let mut xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss version=\"2.0\">\n<channel>\n\
         <title>{}</title>\n<link>https://example.com</link>\n<description>{}</description>\n",
        title, description
    );
    for item in items {
        xml.push_str("<item>\n");
        xml.push_str(&format!("<title>{}</title>\n", item.title));
        if let Some(link) = item.link {
            xml.push_str(&format!("<link>{}</link>\n", link));
        }
        xml.push_str(&format!("<description>About {}</description>\n", item.title));
        if let Some(date) = item.pub_date {
            xml.push_str(&format!("<pubDate>{}</pubDate>\n", date));
        }
        xml.push_str("</item>\n");
    }
    xml.push_str("</channel>\n</rss>\n");
    xml
}

/// Fetch settings that allow talking to the local fixture server.
pub fn fetch_config() -> FetchConfig {
    FetchConfig {
        allow_private_hosts: true,
        ..Default::default()
    }
}

/// Aggregator settings pointing at `base_url`.
pub fn aggregator_config(base_url: String) -> AggregatorConfig {
    AggregatorConfig {
        base_url,
        ..Default::default()
    }
}

/// In-memory database with both repositories.
pub async fn memory_stores() -> (Database, Arc<FeedRepository>, Arc<ArticleRepository>) {
    let db = Database::open_in_memory().await.unwrap();
    let feeds = Arc::new(FeedRepository::new(db.pool().clone()));
    let articles = Arc::new(ArticleRepository::new(db.pool().clone()));
    (db, feeds, articles)
}

/// How [`FlakyArticles`] misbehaves for a matching URL.
#[derive(Clone, Copy)]
pub enum Fault {
    /// `create` returns an error
    Error,
    /// `create` panics
    Panic,
    /// `exists_by_url` returns an error
    LookupError,
}

/// Article store that fails for URLs containing a marker.
pub struct FlakyArticles {
    inner: Arc<ArticleRepository>,
    marker: String,
    fault: Fault,
}

impl FlakyArticles {
    pub fn new(inner: Arc<ArticleRepository>, marker: &str, fault: Fault) -> Self {
        Self {
            inner,
            marker: marker.to_string(),
            fault,
        }
    }
}

#[async_trait]
impl ArticleStore for FlakyArticles {
    async fn exists_by_url(&self, url: &str) -> Result<bool> {
        if url.contains(&self.marker) && matches!(self.fault, Fault::LookupError) {
            return Err(ReaderError::Persistence("database is locked".to_string()));
        }
        self.inner.exists_by_url(url).await
    }

    async fn create(&self, article: &Article) -> Result<bool> {
        if article.url.contains(&self.marker) {
            match self.fault {
                Fault::Error => {
                    return Err(ReaderError::Persistence("disk I/O error".to_string()))
                }
                Fault::Panic => panic!("store crashed on {}", article.url),
                Fault::LookupError => {}
            }
        }
        self.inner.create(article).await
    }

    async fn get_by_url(&self, url: &str) -> Result<Option<Article>> {
        self.inner.get_by_url(url).await
    }

    async fn list_by_feed(&self, feed_id: &str, limit: i64) -> Result<Vec<Article>> {
        self.inner.list_by_feed(feed_id, limit).await
    }

    async fn count(&self) -> Result<i64> {
        self.inner.count().await
    }
}
