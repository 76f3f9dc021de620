use crate::tree::NodeId;

/// Instruction for a worker to fetch one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    pub url: String,
    pub level: usize,
    /// Node the page will hang under if accepted; `None` for the root.
    pub parent: Option<NodeId>,
}

impl CrawlTask {
    pub fn root(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            level: 0,
            parent: None,
        }
    }

    pub fn child(url: impl Into<String>, level: usize, parent: NodeId) -> Self {
        Self {
            url: url.into(),
            level,
            parent: Some(parent),
        }
    }

    /// Package the links found on this task's page.
    pub fn resolve(self, links: Vec<String>) -> CrawlResult {
        CrawlResult {
            url: self.url,
            level: self.level,
            links,
            parent: self.parent,
        }
    }
}

/// What a worker found when it fetched a [`CrawlTask`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlResult {
    pub url: String,
    pub level: usize,
    /// Same-host links, in the order the loader returned them.
    pub links: Vec<String>,
    pub parent: Option<NodeId>,
}
