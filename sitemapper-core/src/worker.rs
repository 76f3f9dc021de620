use crate::error::Result;
use crate::queue::TaskQueue;
use crate::task::{CrawlResult, CrawlTask};
use sitemapper_scanner::PageLoader;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

/// Called with `(worker_id, url)` each time a worker starts fetching a page.
pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;

/// Keep the links on `root_host`, dropping anything that does not parse as an
/// http(s) URL.
pub fn same_host_links(links: Vec<String>, root_host: &str) -> Vec<String> {
    links
        .into_iter()
        .filter(|link| match Url::parse(link) {
            Ok(url) => {
                (url.scheme() == "http" || url.scheme() == "https")
                    && url.host_str() == Some(root_host)
            }
            Err(e) => {
                debug!("Loader returned a bad URL {}: {}", link, e);
                false
            }
        })
        .collect()
}

struct Worker {
    id: usize,
    loader: Arc<dyn PageLoader>,
    queue: Arc<TaskQueue<CrawlTask>>,
    results: mpsc::Sender<CrawlResult>,
    root_host: Arc<str>,
    cancel: CancellationToken,
    progress: Option<ProgressCallback>,
}

impl Worker {
    async fn run(self) {
        debug!("Worker {} started", self.id);

        loop {
            let task = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                task = self.queue.pop() => match task {
                    Some(task) => task,
                    None => break,
                },
            };

            if let Some(ref callback) = self.progress {
                callback(self.id, task.url.clone());
            }
            debug!("[Worker {}] Requesting {} (level {})", self.id, task.url, task.level);

            let fetched = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                fetched = self.loader.fetch_links(&task.url) => fetched,
            };

            let links = match fetched {
                Ok(links) => links,
                Err(e) if e.is_cancelled() => break,
                Err(e) => {
                    warn!("Failed to load {}: {}", task.url, e);
                    Vec::new()
                }
            };

            let result = task.resolve(same_host_links(links, &self.root_host));
            if self.results.send(result).await.is_err() {
                // Coordinator has stopped listening.
                break;
            }
        }

        debug!("Worker {} finished", self.id);
    }
}

/// Fixed set of workers draining one task queue into one result channel.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn spawn(
        workers: usize,
        loader: Arc<dyn PageLoader>,
        queue: Arc<TaskQueue<CrawlTask>>,
        results: mpsc::Sender<CrawlResult>,
        root_host: &str,
        cancel: CancellationToken,
        progress: Option<ProgressCallback>,
    ) -> Self {
        let root_host: Arc<str> = Arc::from(root_host);

        let handles = (0..workers)
            .map(|id| {
                let worker = Worker {
                    id,
                    loader: loader.clone(),
                    queue: queue.clone(),
                    results: results.clone(),
                    root_host: root_host.clone(),
                    cancel: cancel.clone(),
                    progress: progress.clone(),
                };
                tokio::spawn(worker.run())
            })
            .collect();

        Self { handles }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every worker to exit.
    pub async fn join(self) -> Result<()> {
        for outcome in futures::future::join_all(self.handles).await {
            outcome?;
        }
        Ok(())
    }
}
