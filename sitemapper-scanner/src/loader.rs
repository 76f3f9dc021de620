use crate::error::{Result, ScanError};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

/// Source of outbound links for a page.
///
/// Implementations return absolute URLs in any order. Dropping the returned
/// future must abort the fetch, which is how the crawl engine cancels
/// in-flight work.
#[async_trait]
pub trait PageLoader: Send + Sync {
    async fn fetch_links(&self, url: &str) -> Result<Vec<String>>;
}

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub max_redirects: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: format!("Sitemapper/{}", env!("CARGO_PKG_VERSION")),
            max_redirects: 5,
        }
    }
}

impl LoaderConfig {
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Fetches pages over HTTP and extracts `<a href>` links from HTML bodies.
pub struct HttpLoader {
    client: Client,
}

impl HttpLoader {
    pub fn new(config: &LoaderConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(timeout)
            .connect_timeout(timeout / 2)
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self { client })
    }

    async fn fetch_body(&self, url: &str) -> Result<Option<String>> {
        debug!("Fetching {}", url);

        let start = Instant::now();
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("text/html") || ct.contains("application/xhtml+xml"))
            .unwrap_or(false);

        if !is_html {
            debug!("Skipping non-HTML response from {}", url);
            return Ok(None);
        }

        let body = response.text().await?;
        debug!("Fetched {} in {:?}", url, start.elapsed());
        Ok(Some(body))
    }
}

#[async_trait]
impl PageLoader for HttpLoader {
    async fn fetch_links(&self, url: &str) -> Result<Vec<String>> {
        match self.fetch_body(url).await? {
            Some(body) => extract_links(&body, url),
            None => Ok(Vec::new()),
        }
    }
}

/// Extract every `<a href>` on the page as an absolute http(s) URL.
///
/// Links resolve against the first `<base href>` when the page declares one
/// (itself resolved against the page URL), otherwise against the page URL.
/// Fragments are stripped and duplicates removed, keeping document order.
pub fn extract_links(html: &str, page_url: &str) -> Result<Vec<String>> {
    let page = Url::parse(page_url)
        .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", page_url, e)))?;

    let document = Html::parse_document(html);
    let link_selector = selector("a[href]")?;
    let base_selector = selector("base[href]")?;

    let bases: Vec<&str> = document
        .select(&base_selector)
        .filter_map(|el| el.value().attr("href"))
        .filter(|href| !href.is_empty())
        .collect();

    let base = match bases.first() {
        Some(href) => {
            if bases.len() > 1 {
                warn!(
                    "Page {} has {} <base> elements, applying {}",
                    page_url,
                    bases.len(),
                    href
                );
            }
            page.join(href)
                .map_err(|e| ScanError::InvalidUrl(format!("<base href=\"{}\">: {}", href, e)))?
        }
        None => page,
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&link_selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };

        if let Some(absolute) = resolve_link(&base, href)
            && seen.insert(absolute.clone())
        {
            links.push(absolute);
        }
    }

    Ok(links)
}

fn resolve_link(base: &Url, href: &str) -> Option<String> {
    let href = href.split('#').next().unwrap_or_default().trim();
    if href.is_empty() {
        return None;
    }

    let mut resolved = match base.join(href) {
        Ok(url) => url,
        Err(e) => {
            debug!("Dropping unresolvable link {} against {}: {}", href, base, e);
            return None;
        }
    };

    // mailto:, javascript:, tel: and friends
    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return None;
    }

    resolved.set_fragment(None);
    Some(resolved.to_string())
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ScanError::ParseError(format!("{}: {}", css, e)))
}
