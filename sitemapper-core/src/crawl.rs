use crate::config::CrawlConfig;
use crate::error::Result;
use crate::queue::TaskQueue;
use crate::report::Reporter;
use crate::task::{CrawlResult, CrawlTask};
use crate::tree::{NodeId, PageNode, PageTree};
use crate::worker::{ProgressCallback, WorkerPool};
use sitemapper_scanner::PageLoader;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Shallowest accepted level for a URL and the node currently holding it.
#[derive(Debug, Clone, Copy)]
struct VisitRecord {
    level: usize,
    node: NodeId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Tasks handed to workers, root included.
    pub tasks_enqueued: usize,
    /// Results that became (or replaced) a node.
    pub accepted: usize,
    /// Results that moved an existing page to a shallower parent.
    pub replaced: usize,
    /// Results dropped because an equal or shallower path already existed.
    pub duplicates: usize,
    /// Results whose parent had been pruned by the time they arrived.
    pub orphaned: usize,
    /// Tasks still queued or in flight when the crawl stopped early.
    pub abandoned: usize,
    pub cancelled: bool,
}

#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    /// `None` only when the crawl was cancelled before the root page resolved.
    pub tree: Option<PageNode>,
    pub stats: CrawlStats,
}

impl CrawlOutcome {
    pub fn pages(&self) -> usize {
        self.tree.as_ref().map(PageNode::len).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Progress {
    Running,
    Done,
}

/// Sole owner of the tree, the visit records and the outstanding count.
///
/// Results are applied one at a time, so none of this state needs a lock.
struct Coordinator {
    queue: Arc<TaskQueue<CrawlTask>>,
    max_depth: usize,
    tree: PageTree,
    visits: HashMap<String, VisitRecord>,
    outstanding: usize,
    stats: CrawlStats,
}

impl Coordinator {
    fn new(queue: Arc<TaskQueue<CrawlTask>>, max_depth: usize) -> Self {
        Self {
            queue,
            max_depth,
            tree: PageTree::new(),
            visits: HashMap::new(),
            outstanding: 0,
            stats: CrawlStats::default(),
        }
    }

    fn enqueue(&mut self, task: CrawlTask) {
        self.queue.push(task);
        self.outstanding += 1;
        self.stats.tasks_enqueued += 1;
    }

    fn handle(&mut self, result: CrawlResult) -> Progress {
        if let Some(node) = self.accept(&result)
            && result.level < self.max_depth
        {
            for link in result.links {
                self.enqueue(CrawlTask::child(link, result.level + 1, node));
            }
        }

        self.outstanding -= 1;
        if self.outstanding == 0 {
            Progress::Done
        } else {
            Progress::Running
        }
    }

    /// Place the result in the tree, returning the new node if it was kept.
    fn accept(&mut self, result: &CrawlResult) -> Option<NodeId> {
        if let Some(parent) = result.parent
            && !self.tree.is_attached(parent)
        {
            debug!("Dropping {}: parent page was re-parented", result.url);
            self.stats.orphaned += 1;
            return None;
        }

        if let Some(existing) = self.visits.get(&result.url).copied() {
            if existing.level <= result.level {
                self.stats.duplicates += 1;
                return None;
            }

            debug!(
                "Moving {} from level {} to level {}",
                result.url, existing.level, result.level
            );
            self.prune(existing.node);
            self.stats.replaced += 1;
        }

        let node = match result.parent {
            None => self.tree.set_root(result.url.clone()),
            Some(parent) => self.tree.add_child(parent, result.url.clone()),
        };
        self.visits.insert(
            result.url.clone(),
            VisitRecord {
                level: result.level,
                node,
            },
        );
        self.stats.accepted += 1;
        Some(node)
    }

    /// Detach `node` and forget every page recorded inside its subtree, so
    /// they can be accepted again under their new, shallower ancestors.
    fn prune(&mut self, node: NodeId) {
        for detached in self.tree.detach(node) {
            let url = self.tree.url(detached);
            if self.visits.get(url).is_some_and(|record| record.node == detached) {
                self.visits.remove(url);
            }
        }
    }

    fn finish(mut self, cancelled: bool) -> CrawlOutcome {
        self.stats.cancelled = cancelled;
        self.stats.abandoned = self.outstanding;
        CrawlOutcome {
            tree: self.tree.to_page_node(),
            stats: self.stats,
        }
    }
}

/// Breadth-first, same-host crawler.
///
/// A pool of workers fetches pages while a single coordinating loop builds
/// the page tree, keeping every URL at the shallowest depth it was found.
pub struct Crawler {
    config: CrawlConfig,
    loader: Arc<dyn PageLoader>,
    progress_callback: Option<ProgressCallback>,
}

impl Crawler {
    pub fn new(config: CrawlConfig, loader: Arc<dyn PageLoader>) -> Self {
        Self {
            config,
            loader,
            progress_callback: None,
        }
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Crawl until every reachable page within `max_depth` is resolved or
    /// `cancel` fires. Cancellation is not an error: the partial tree is
    /// returned with `stats.cancelled` set.
    pub async fn crawl(&self, cancel: CancellationToken) -> Result<CrawlOutcome> {
        let root = self.config.validate()?;
        info!(
            "Starting crawl of {} with {} workers (max depth {})",
            root.url, self.config.workers, self.config.max_depth
        );

        let queue = Arc::new(TaskQueue::new());
        // One slot keeps workers from running ahead of the coordinator.
        let (results_tx, mut results_rx) = mpsc::channel(1);

        let pool = WorkerPool::spawn(
            self.config.workers,
            self.loader.clone(),
            queue.clone(),
            results_tx,
            &root.host,
            cancel.clone(),
            self.progress_callback.clone(),
        );

        let mut coordinator = Coordinator::new(queue.clone(), self.config.max_depth);
        coordinator.enqueue(CrawlTask::root(root.url));

        let cancelled = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Crawl cancelled, keeping partial results");
                    break true;
                }
                received = results_rx.recv() => match received {
                    Some(result) => {
                        if coordinator.handle(result) == Progress::Done {
                            break false;
                        }
                    }
                    None => {
                        warn!("All workers exited before the crawl completed");
                        break false;
                    }
                },
            }
        };

        queue.close();
        drop(results_rx);
        pool.join().await?;

        let leftover = queue.drain().len();
        if leftover > 0 {
            debug!("Discarded {} queued tasks", leftover);
        }

        let outcome = coordinator.finish(cancelled);
        info!(
            "Crawl complete. {} pages in tree ({} replaced, {} duplicates)",
            outcome.pages(),
            outcome.stats.replaced,
            outcome.stats.duplicates
        );
        Ok(outcome)
    }

    /// Crawl, then hand the finished tree to `reporter`.
    pub async fn run(
        &self,
        reporter: &dyn Reporter,
        cancel: CancellationToken,
    ) -> Result<CrawlOutcome> {
        let outcome = self.crawl(cancel).await?;

        match outcome.tree {
            Some(ref tree) => reporter.save(tree)?,
            None => warn!("No pages were crawled, nothing to save"),
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinator(max_depth: usize) -> Coordinator {
        Coordinator::new(Arc::new(TaskQueue::new()), max_depth)
    }

    fn links(urls: &[&str]) -> Vec<String> {
        urls.iter().map(|u| u.to_string()).collect()
    }

    /// Pop the queued task for `url`, leaving the others in order.
    fn take_task(coordinator: &Coordinator, url: &str) -> CrawlTask {
        let mut tasks = coordinator.queue.drain();
        let index = tasks
            .iter()
            .position(|task| task.url == url)
            .unwrap_or_else(|| panic!("no task queued for {}", url));
        let task = tasks.remove(index);
        for other in tasks {
            coordinator.queue.push(other);
        }
        task
    }

    #[test]
    fn test_root_only_at_depth_zero() {
        let mut c = coordinator(0);
        c.enqueue(CrawlTask::root("a"));
        let root = take_task(&c, "a");

        assert_eq!(c.handle(root.resolve(links(&["b", "c"]))), Progress::Done);
        assert!(c.queue.is_empty());

        let outcome = c.finish(false);
        assert_eq!(outcome.tree, Some(PageNode::new("a")));
        assert_eq!(outcome.stats.tasks_enqueued, 1);
    }

    #[test]
    fn test_counter_tracks_outstanding_tasks() {
        let mut c = coordinator(2);
        c.enqueue(CrawlTask::root("a"));

        let root = take_task(&c, "a");
        assert_eq!(c.handle(root.resolve(links(&["b", "c"]))), Progress::Running);
        assert_eq!(c.outstanding, 2);
        assert_eq!(c.queue.len(), 2);

        let b = take_task(&c, "b");
        assert_eq!(c.handle(b.resolve(Vec::new())), Progress::Running);
        let cc = take_task(&c, "c");
        assert_eq!(c.handle(cc.resolve(Vec::new())), Progress::Done);
        assert_eq!(c.outstanding, 0);
    }

    #[test]
    fn test_equal_level_keeps_first_seen() {
        let mut c = coordinator(2);
        c.enqueue(CrawlTask::root("a"));
        let root = take_task(&c, "a");
        c.handle(root.resolve(links(&["b", "c"])));

        let b = take_task(&c, "b");
        c.handle(b.resolve(links(&["d"])));
        let cc = take_task(&c, "c");
        c.handle(cc.resolve(links(&["d"])));

        // Both tasks for d are at level 2; the one from c resolves first.
        let mut tasks = c.queue.drain();
        assert_eq!(tasks.len(), 2);
        let from_b = tasks.remove(0);
        let from_c = tasks.remove(0);
        c.handle(from_c.resolve(Vec::new()));
        assert_eq!(c.handle(from_b.resolve(Vec::new())), Progress::Done);

        let outcome = c.finish(false);
        let tree = outcome.tree.unwrap();
        assert_eq!(tree.find("c").unwrap().children, vec![PageNode::new("d")]);
        assert!(tree.find("b").unwrap().children.is_empty());
        assert_eq!(outcome.stats.duplicates, 1);
    }

    #[test]
    fn test_shallower_path_moves_page_and_prunes_subtree() {
        let mut c = coordinator(3);
        c.enqueue(CrawlTask::root("a"));
        let root = take_task(&c, "a");
        c.handle(root.resolve(links(&["b", "d"])));

        // d is slow at level 1; it is first reached through b at level 2.
        let d_shallow = take_task(&c, "d");
        let b = take_task(&c, "b");
        c.handle(b.resolve(links(&["d"])));
        let d_deep = take_task(&c, "d");
        assert_eq!(d_deep.level, 2);
        c.handle(d_deep.resolve(links(&["f"])));
        let f_deep = take_task(&c, "f");
        assert_eq!(f_deep.level, 3);
        c.handle(f_deep.resolve(Vec::new()));

        // Now the level-1 fetch of d lands.
        c.handle(d_shallow.resolve(links(&["f"])));
        assert_eq!(c.stats.replaced, 1);

        let f_shallow = take_task(&c, "f");
        assert_eq!(f_shallow.level, 2);
        assert_eq!(c.handle(f_shallow.resolve(Vec::new())), Progress::Done);

        let tree = c.finish(false).tree.unwrap();
        let expected = PageNode::new("a")
            .with_child(PageNode::new("b"))
            .with_child(PageNode::new("d").with_child(PageNode::new("f")));
        assert_eq!(tree, expected);
    }

    #[test]
    fn test_results_under_pruned_parent_are_dropped() {
        let mut c = coordinator(3);
        c.enqueue(CrawlTask::root("a"));
        let root = take_task(&c, "a");
        c.handle(root.resolve(links(&["b", "d"])));

        let d_shallow = take_task(&c, "d");
        let b = take_task(&c, "b");
        c.handle(b.resolve(links(&["d"])));
        let d_deep = take_task(&c, "d");
        c.handle(d_deep.resolve(links(&["f"])));
        // f's level-3 task is still in flight when d moves up.
        let f_stale = take_task(&c, "f");
        c.handle(d_shallow.resolve(links(&["f"])));

        assert_eq!(c.handle(f_stale.resolve(Vec::new())), Progress::Running);
        assert_eq!(c.stats.orphaned, 1);

        let f_fresh = take_task(&c, "f");
        assert_eq!(c.handle(f_fresh.resolve(Vec::new())), Progress::Done);

        let tree = c.finish(false).tree.unwrap();
        assert_eq!(tree.find("d").unwrap().children, vec![PageNode::new("f")]);
        assert_eq!(tree.urls().iter().filter(|&&u| u == "f").count(), 1);
    }

    #[test]
    fn test_cycle_back_to_root_rejected() {
        let mut c = coordinator(5);
        c.enqueue(CrawlTask::root("a"));
        let root = take_task(&c, "a");
        c.handle(root.resolve(links(&["b"])));
        let b = take_task(&c, "b");
        c.handle(b.resolve(links(&["a"])));
        let back = take_task(&c, "a");
        assert_eq!(back.level, 2);

        assert_eq!(c.handle(back.resolve(links(&["b"]))), Progress::Done);

        let outcome = c.finish(false);
        assert_eq!(
            outcome.tree,
            Some(PageNode::new("a").with_child(PageNode::new("b")))
        );
        assert_eq!(outcome.stats.duplicates, 1);
    }

    #[test]
    fn test_finish_reports_abandoned_tasks() {
        let mut c = coordinator(2);
        c.enqueue(CrawlTask::root("a"));
        let root = take_task(&c, "a");
        c.handle(root.resolve(links(&["b", "c"])));

        let outcome = c.finish(true);
        assert!(outcome.stats.cancelled);
        assert_eq!(outcome.stats.abandoned, 2);
        assert_eq!(outcome.pages(), 1);
    }
}
