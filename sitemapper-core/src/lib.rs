pub mod config;
pub mod crawl;
pub mod error;
pub mod queue;
pub mod report;
pub mod task;
pub mod tree;
pub mod worker;

pub use config::{CrawlConfig, RootUrl};
pub use crawl::{CrawlOutcome, CrawlStats, Crawler};
pub use error::CrawlError;
pub use queue::TaskQueue;
pub use report::{ReportFormat, Reporter, SitemapReporter};
pub use tree::{NodeId, PageNode, PageTree};
pub use worker::ProgressCallback;
