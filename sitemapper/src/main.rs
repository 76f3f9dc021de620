use anyhow::Context;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use sitemapper::{cancel_on_shutdown, command_argument_builder, extract_url_path, CrawlArgs};
use sitemapper_core::{CrawlConfig, CrawlOutcome, Crawler, ProgressCallback, SitemapReporter};
use sitemapper_scanner::{HttpLoader, LoaderConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let matches = command_argument_builder().get_matches();

    let args = match CrawlArgs::from_matches(&matches) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(2);
        }
    };

    init_tracing(args.quiet);

    if let Err(e) = handle_crawl(&args).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn handle_crawl(args: &CrawlArgs) -> anyhow::Result<()> {
    if !args.quiet {
        println!("\n{} {}", "Crawling".bold(), args.url.cyan());
        println!("Workers: {}", args.workers);
        println!("Max depth: {}", args.max_depth);
        println!("Output: {} ({:?})\n", args.output.display(), args.format);
    }

    let mut loader_config = LoaderConfig::default().with_timeout(args.timeout_secs);
    if let Some(ref user_agent) = args.user_agent {
        loader_config = loader_config.with_user_agent(user_agent.clone());
    }
    let loader = HttpLoader::new(&loader_config).context("failed to build the HTTP client")?;

    let config = CrawlConfig::new(args.url.clone())
        .with_workers(args.workers)
        .with_max_depth(args.max_depth);

    let spinner = if args.quiet {
        ProgressBar::hidden()
    } else {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner().template("{spinner:.cyan} {pos} pages  {msg}")?,
        );
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    };

    let progress_callback: ProgressCallback = {
        let spinner = spinner.clone();
        Arc::new(move |worker_id: usize, url: String| {
            spinner.inc(1);
            spinner.set_message(format!("worker {}: {}", worker_id, extract_url_path(&url)));
        })
    };

    let crawler =
        Crawler::new(config, Arc::new(loader)).with_progress_callback(progress_callback);
    let reporter = SitemapReporter::new(&args.output, args.format);

    let cancel = CancellationToken::new();
    let shutdown = cancel_on_shutdown(cancel.clone()).context("failed to install signal handlers")?;

    let result = crawler.run(&reporter, cancel).await;
    shutdown.abort();
    spinner.finish_and_clear();

    let outcome = result.with_context(|| format!("crawl of {} failed", args.url))?;
    if !args.quiet {
        print_summary(&outcome, args);
    }
    Ok(())
}

fn print_summary(outcome: &CrawlOutcome, args: &CrawlArgs) {
    let stats = &outcome.stats;

    if stats.cancelled {
        println!("{} {}", "!".yellow().bold(), "Crawl interrupted".yellow());
    } else {
        println!("{} {}", "✓".green().bold(), "Crawl complete".green());
    }

    println!("  Pages in sitemap:   {}", outcome.pages());
    println!("  Pages fetched:      {}", stats.tasks_enqueued.saturating_sub(stats.abandoned));
    println!("  Duplicate links:    {}", stats.duplicates);
    println!("  Pages moved closer: {}", stats.replaced);
    if stats.abandoned > 0 {
        println!("  Never fetched:      {}", stats.abandoned);
    }

    match outcome.tree {
        Some(_) => println!("\nSitemap written to {}", args.output.display().to_string().bold()),
        None => println!("\n{}", "Nothing was crawled, no sitemap written".yellow()),
    }
}
