use clap::ArgMatches;
use sitemapper_core::config::{DEFAULT_MAX_DEPTH, DEFAULT_WORKERS};
use sitemapper_core::ReportFormat;
use sitemapper_scanner::DEFAULT_TIMEOUT_SECS;
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use url::Url;

pub const DEFAULT_OUTPUT_FILE: &str = "./sitemap.xml";

/// Everything the binary needs to run one crawl, pulled out of the parsed
/// command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlArgs {
    pub url: String,
    pub workers: usize,
    pub max_depth: usize,
    pub output: PathBuf,
    pub format: ReportFormat,
    pub timeout_secs: u64,
    pub user_agent: Option<String>,
    pub quiet: bool,
}

impl CrawlArgs {
    pub fn from_matches(matches: &ArgMatches) -> Result<Self, String> {
        let raw_url = matches
            .get_one::<String>("URL")
            .ok_or_else(|| "a URL to crawl is required".to_string())?;
        let url = parse_url_line(raw_url.trim())
            .ok_or_else(|| format!("'{}' is not a valid URL", raw_url))?;

        let output = expand_output_path(
            matches
                .get_one::<String>("output-file")
                .map(String::as_str)
                .unwrap_or(DEFAULT_OUTPUT_FILE),
        );
        let format = resolve_format(matches.get_one::<String>("format").map(String::as_str), &output)?;

        Ok(Self {
            url,
            workers: matches
                .get_one::<usize>("parallel")
                .copied()
                .unwrap_or(DEFAULT_WORKERS),
            max_depth: matches
                .get_one::<usize>("max-depth")
                .copied()
                .unwrap_or(DEFAULT_MAX_DEPTH),
            output,
            format,
            timeout_secs: matches
                .get_one::<u64>("timeout")
                .copied()
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
            user_agent: matches.get_one::<String>("user-agent").cloned(),
            quiet: matches.get_flag("quiet"),
        })
    }
}

/// Parse a single line as a URL, trying to add http:// if needed
pub fn parse_url_line(line: &str) -> Option<String> {
    if line.is_empty() {
        return None;
    }

    if let Ok(url) = Url::parse(line)
        && url.has_host()
    {
        return Some(line.to_string());
    }

    let with_scheme = format!("http://{}", line);
    match Url::parse(&with_scheme) {
        Ok(url) if url.has_host() => Some(with_scheme),
        _ => None,
    }
}

/// Expand `~` and environment variables in the output path.
pub fn expand_output_path(raw: &str) -> PathBuf {
    let expanded = shellexpand::full(raw)
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| shellexpand::tilde(raw).into_owned());
    PathBuf::from(expanded)
}

/// An explicit `--format` wins; otherwise use the file extension, falling
/// back to XML.
pub fn resolve_format(explicit: Option<&str>, output: &Path) -> Result<ReportFormat, String> {
    match explicit {
        Some(name) => {
            ReportFormat::from_str(name).ok_or_else(|| format!("Unknown output format '{}'", name))
        }
        None => Ok(ReportFormat::from_path(output).unwrap_or(ReportFormat::Xml)),
    }
}

/// Just the path part of a URL, for compact progress messages.
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

/// Cancel `cancel` on Ctrl-C or, on unix, SIGTERM, so a stopped crawl still
/// saves what it found. The handlers are installed before this returns.
pub fn cancel_on_shutdown(cancel: CancellationToken) -> std::io::Result<JoinHandle<()>> {
    #[cfg(unix)]
    let mut terminate =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    Ok(tokio::spawn(async move {
        let interrupted = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Unable to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminated = async {
            terminate.recv().await;
        };
        #[cfg(not(unix))]
        let terminated = std::future::pending::<()>();

        tokio::select! {
            _ = interrupted => warn!("Interrupted, saving the pages crawled so far"),
            _ = terminated => warn!("Terminated, saving the pages crawled so far"),
        }
        cancel.cancel();
    }))
}
