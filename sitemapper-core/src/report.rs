// Sitemap output for a finished crawl

use crate::error::Result;
use crate::tree::PageNode;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

pub const SITEMAP_NAMESPACE: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Consumer of the finished page tree.
pub trait Reporter: Send + Sync {
    fn save(&self, root: &PageNode) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Xml,
    Json,
    Text,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "xml" => Some(ReportFormat::Xml),
            "json" => Some(ReportFormat::Json),
            "text" | "txt" => Some(ReportFormat::Text),
            _ => None,
        }
    }

    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_str)
    }

    pub fn render(&self, root: &PageNode) -> Result<String> {
        match self {
            ReportFormat::Xml => {
                let lastmod = chrono::Utc::now().format("%Y-%m-%d").to_string();
                Ok(render_xml(root, Some(&lastmod)))
            }
            ReportFormat::Json => render_json(root),
            ReportFormat::Text => Ok(render_text(root)),
        }
    }
}

/// Build a sitemaps.org `<urlset>` with one entry per unique URL.
pub fn render_xml(root: &PageNode, lastmod: Option<&str>) -> String {
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str(&format!("<urlset xmlns=\"{}\">\n", SITEMAP_NAMESPACE));

    let mut seen = HashSet::new();
    for url in root.urls() {
        if !seen.insert(url) {
            continue;
        }
        xml.push_str("  <url>\n");
        xml.push_str(&format!("    <loc>{}</loc>\n", html_escape::encode_safe(url)));
        if let Some(date) = lastmod {
            xml.push_str(&format!("    <lastmod>{}</lastmod>\n", date));
        }
        xml.push_str("  </url>\n");
    }

    xml.push_str("</urlset>\n");
    xml
}

pub fn render_json(root: &PageNode) -> Result<String> {
    Ok(serde_json::to_string_pretty(root)?)
}

/// Indented outline, two spaces per level.
pub fn render_text(root: &PageNode) -> String {
    let mut text = String::new();
    root.walk(&mut |node, depth| {
        text.push_str(&"  ".repeat(depth));
        text.push_str(&node.url);
        text.push('\n');
    });
    text
}

/// Writes the tree to a file in the chosen [`ReportFormat`].
pub struct SitemapReporter {
    path: PathBuf,
    format: ReportFormat,
}

impl SitemapReporter {
    pub fn new(path: impl Into<PathBuf>, format: ReportFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> ReportFormat {
        self.format
    }
}

impl Reporter for SitemapReporter {
    fn save(&self, root: &PageNode) -> Result<()> {
        let content = self.format.render(root)?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let mut file = File::create(&self.path)?;
        file.write_all(content.as_bytes())?;

        info!(
            "Saved {} pages to {} ({:?})",
            root.len(),
            self.path.display(),
            self.format
        );
        Ok(())
    }
}
