use crate::error::{CrawlError, Result};
use url::Url;

pub const DEFAULT_WORKERS: usize = 5;
pub const DEFAULT_MAX_DEPTH: usize = 3;

/// Settings consumed by the crawl engine.
///
/// `max_depth` counts link hops from the root: `0` fetches the root page only
/// and never expands its links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlConfig {
    pub url: String,
    pub workers: usize,
    pub max_depth: usize,
}

/// A validated crawl root and the host every followed link must share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootUrl {
    pub url: String,
    pub host: String,
}

impl CrawlConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            workers: DEFAULT_WORKERS,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Check the settings before any worker starts.
    pub fn validate(&self) -> Result<RootUrl> {
        if self.workers == 0 {
            return Err(CrawlError::InvalidConfig(
                "at least one worker is required".to_string(),
            ));
        }

        let parsed = Url::parse(&self.url)
            .map_err(|e| CrawlError::InvalidUrl(format!("{}: {}", self.url, e)))?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(CrawlError::InvalidUrl(format!(
                "{}: unsupported scheme '{}'",
                self.url,
                parsed.scheme()
            )));
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| CrawlError::InvalidUrl(format!("{}: URL has no host", self.url)))?;

        // Seed with the serialized form so the root matches the links
        // loaders hand back, e.g. `http://host` becomes `http://host/`.
        Ok(RootUrl {
            url: parsed.to_string(),
            host: host.to_string(),
        })
    }
}
