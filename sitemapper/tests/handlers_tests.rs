use sitemapper::handlers::*;
use sitemapper::command_argument_builder;
use sitemapper_core::config::{DEFAULT_MAX_DEPTH, DEFAULT_WORKERS};
use sitemapper_core::ReportFormat;
use sitemapper_scanner::DEFAULT_TIMEOUT_SECS;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn parse_args(argv: &[&str]) -> Result<CrawlArgs, String> {
    let mut full = vec!["sitemapper"];
    full.extend_from_slice(argv);
    let matches = command_argument_builder()
        .try_get_matches_from(full)
        .map_err(|e| e.to_string())?;
    CrawlArgs::from_matches(&matches)
}

#[test]
fn test_parse_url_line_with_scheme() {
    let result = parse_url_line("https://example.com");
    assert_eq!(result, Some("https://example.com".to_string()));
}

#[test]
fn test_parse_url_line_without_scheme() {
    assert_eq!(
        parse_url_line("example.com"),
        Some("http://example.com".to_string())
    );
    assert_eq!(
        parse_url_line("localhost:8080/docs"),
        Some("http://localhost:8080/docs".to_string())
    );
}

#[test]
fn test_parse_url_line_invalid() {
    assert_eq!(parse_url_line("not a valid url!!!"), None);
    assert_eq!(parse_url_line(""), None);
}

#[test]
fn test_extract_url_path() {
    assert_eq!(
        extract_url_path("https://example.com/api/users"),
        "/api/users"
    );
    assert_eq!(extract_url_path("https://example.com/"), "/");
    assert_eq!(extract_url_path("https://example.com"), "/");
    assert_eq!(extract_url_path("garbage"), "garbage");
}

#[test]
fn test_resolve_format_prefers_explicit() {
    assert_eq!(
        resolve_format(Some("json"), Path::new("out.xml")),
        Ok(ReportFormat::Json)
    );
    assert!(resolve_format(Some("yaml"), Path::new("out.xml")).is_err());
}

#[test]
fn test_resolve_format_from_extension() {
    assert_eq!(
        resolve_format(None, Path::new("site.txt")),
        Ok(ReportFormat::Text)
    );
    assert_eq!(
        resolve_format(None, Path::new("site.json")),
        Ok(ReportFormat::Json)
    );
    // Unknown extensions fall back to XML.
    assert_eq!(
        resolve_format(None, Path::new("site.out")),
        Ok(ReportFormat::Xml)
    );
}

#[test]
fn test_expand_output_path_tilde() {
    let expanded = expand_output_path("~/sitemap.xml");
    assert!(!expanded.to_string_lossy().starts_with('~'));
    assert!(expanded.ends_with("sitemap.xml"));

    assert_eq!(
        expand_output_path("./out/sitemap.xml"),
        PathBuf::from("./out/sitemap.xml")
    );
}

#[test]
fn test_crawl_args_defaults() {
    let args = parse_args(&["example.com"]).unwrap();

    assert_eq!(args.url, "http://example.com");
    assert_eq!(args.workers, DEFAULT_WORKERS);
    assert_eq!(args.max_depth, DEFAULT_MAX_DEPTH);
    assert_eq!(args.output, PathBuf::from(DEFAULT_OUTPUT_FILE));
    assert_eq!(args.format, ReportFormat::Xml);
    assert_eq!(args.timeout_secs, DEFAULT_TIMEOUT_SECS);
    assert_eq!(args.user_agent, None);
    assert!(!args.quiet);
}

#[test]
fn test_crawl_args_overrides() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("map.json");
    let output_str = output.to_string_lossy().to_string();

    let args = parse_args(&[
        "https://example.com/start",
        "-p",
        "12",
        "--max-depth",
        "0",
        "-o",
        &output_str,
        "--timeout",
        "3",
        "--user-agent",
        "sitemap-bot/2.0",
        "-q",
    ])
    .unwrap();

    assert_eq!(args.url, "https://example.com/start");
    assert_eq!(args.workers, 12);
    assert_eq!(args.max_depth, 0);
    assert_eq!(args.output, output);
    assert_eq!(args.format, ReportFormat::Json);
    assert_eq!(args.timeout_secs, 3);
    assert_eq!(args.user_agent.as_deref(), Some("sitemap-bot/2.0"));
    assert!(args.quiet);
}

#[test]
fn test_crawl_args_explicit_format() {
    let args = parse_args(&["example.com", "-o", "sitemap.xml", "-f", "text"]).unwrap();
    assert_eq!(args.format, ReportFormat::Text);
}

#[test]
fn test_help_shows_shared_defaults() {
    let help = command_argument_builder().render_long_help().to_string();
    assert!(help.contains(&format!("[default: {}]", DEFAULT_WORKERS)));
    assert!(help.contains(&format!("[default: {}]", DEFAULT_TIMEOUT_SECS)));
}

#[test]
fn test_crawl_args_rejects_bad_input() {
    assert!(parse_args(&[]).is_err());
    assert!(parse_args(&["example.com", "-p", "many"]).is_err());
    assert!(parse_args(&["example.com", "-f", "csv"]).is_err());
    assert!(parse_args(&["not a valid url!!!"]).is_err());
}
