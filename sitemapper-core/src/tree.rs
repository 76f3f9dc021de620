use serde::{Deserialize, Serialize};

/// Handle to a node inside a [`PageTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug)]
struct Slot {
    url: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attached: bool,
}

/// Arena of pages discovered during a crawl.
///
/// Only the crawl coordinator mutates it. Detached nodes keep their slot so
/// stale `NodeId`s held by in-flight tasks stay valid, but they are no longer
/// reachable from the root.
#[derive(Debug, Default)]
pub struct PageTree {
    slots: Vec<Slot>,
    root: Option<NodeId>,
}

impl PageTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    fn slot(&self, id: NodeId) -> &Slot {
        &self.slots[id.0]
    }

    fn alloc(&mut self, url: String, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.slots.len());
        self.slots.push(Slot {
            url,
            parent,
            children: Vec::new(),
            attached: true,
        });
        id
    }

    /// Create the root node. Any previous root is detached.
    pub fn set_root(&mut self, url: impl Into<String>) -> NodeId {
        if let Some(old) = self.root {
            self.detach(old);
        }
        let id = self.alloc(url.into(), None);
        self.root = Some(id);
        id
    }

    /// Append a new node to the end of `parent`'s children.
    pub fn add_child(&mut self, parent: NodeId, url: impl Into<String>) -> NodeId {
        let id = self.alloc(url.into(), Some(parent));
        self.slots[parent.0].children.push(id);
        id
    }

    /// Unlink `id` from its parent and mark its whole subtree detached.
    ///
    /// Returns the detached nodes, `id` first.
    pub fn detach(&mut self, id: NodeId) -> Vec<NodeId> {
        if let Some(parent) = self.slot(id).parent {
            self.slots[parent.0].children.retain(|&child| child != id);
        }
        if self.root == Some(id) {
            self.root = None;
        }

        let mut detached = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let slot = &mut self.slots[next.0];
            if !slot.attached {
                continue;
            }
            slot.attached = false;
            stack.extend(slot.children.iter().copied());
            detached.push(next);
        }
        detached
    }

    /// Whether `id` is still reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.slot(id).attached
    }

    pub fn url(&self, id: NodeId) -> &str {
        &self.slot(id).url
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.slot(id).children
    }

    /// Number of nodes reachable from the root.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.attached).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy the attached tree out as owned [`PageNode`]s.
    pub fn to_page_node(&self) -> Option<PageNode> {
        self.root.and_then(|root| self.build(root))
    }

    // Each frame holds a node under construction and the index of the next
    // child to copy, so long chains of pages never deepen the call stack.
    fn build(&self, root: NodeId) -> Option<PageNode> {
        let mut stack = vec![(root, 0, PageNode::new(self.url(root)))];
        let mut finished = None;

        while let Some((id, next, node)) = stack.pop() {
            match self.children(id).get(next) {
                Some(&child) => {
                    stack.push((id, next + 1, node));
                    stack.push((child, 0, PageNode::new(self.url(child))));
                }
                None => match stack.last_mut() {
                    Some((_, _, parent)) => parent.children.push(node),
                    None => finished = Some(node),
                },
            }
        }

        finished
    }
}

/// A page in the finished sitemap tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageNode {
    pub url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<PageNode>,
}

impl PageNode {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: PageNode) -> Self {
        self.children.push(child);
        self
    }

    /// Visit every node depth-first, pre-order, with its depth from `self`.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a PageNode, usize)) {
        let mut stack = vec![(self, 0)];
        while let Some((node, depth)) = stack.pop() {
            visit(node, depth);
            stack.extend(node.children.iter().rev().map(|child| (child, depth + 1)));
        }
    }

    /// URLs in depth-first pre-order.
    pub fn urls(&self) -> Vec<&str> {
        let mut urls = Vec::new();
        self.walk(&mut |node, _| urls.push(node.url.as_str()));
        urls
    }

    pub fn len(&self) -> usize {
        let mut count = 0;
        self.walk(&mut |_, _| count += 1);
        count
    }

    /// A node always counts itself.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Depth of the deepest node; a lone root has depth 0.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        self.walk(&mut |_, depth| deepest = deepest.max(depth));
        deepest
    }

    pub fn find(&self, url: &str) -> Option<&PageNode> {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if node.url == url {
                return Some(node);
            }
            stack.extend(node.children.iter().rev());
        }
        None
    }

    /// Every root-to-node path, each rendered as `[url]:[url]:...`.
    pub fn paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        let mut stack = vec![(self, format!("[{}]", self.url))];
        while let Some((node, path)) = stack.pop() {
            for child in node.children.iter().rev() {
                stack.push((child, format!("{}:[{}]", path, child.url)));
            }
            paths.push(path);
        }
        paths
    }
}

// The derived drop would recurse once per level.
impl Drop for PageNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}
