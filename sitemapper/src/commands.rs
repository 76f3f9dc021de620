use crate::CLAP_STYLING;
use crate::handlers::DEFAULT_OUTPUT_FILE;
use clap::arg;
use sitemapper_core::config::{DEFAULT_MAX_DEPTH, DEFAULT_WORKERS};
use sitemapper_scanner::DEFAULT_TIMEOUT_SECS;

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("sitemapper")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("sitemapper")
        .about("Crawl a website and write a sitemap of every same-host page it links to")
        .styles(CLAP_STYLING)
        .arg(
            arg!(<URL>)
                .required(true)
                .help("The root URL to crawl. http:// is assumed when no scheme is given"),
        )
        .arg(
            arg!(-p --"parallel" <N>)
                .required(false)
                .help(format!("Number of concurrent workers [default: {}]", DEFAULT_WORKERS))
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            arg!(-d --"max-depth" <N>)
                .required(false)
                .help(format!(
                    "Maximum link depth to follow from the root page [default: {}]",
                    DEFAULT_MAX_DEPTH
                ))
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            arg!(-o --"output-file" <PATH>)
                .required(false)
                .help("Where to write the sitemap")
                .default_value(DEFAULT_OUTPUT_FILE),
        )
        .arg(
            arg!(-f --"format" <FORMAT>)
                .required(false)
                .help("Output format. Inferred from the output file extension when omitted")
                .value_parser(["xml", "json", "text"]),
        )
        .arg(
            arg!(--"timeout" <SECS>)
                .required(false)
                .help(format!(
                    "Per-request timeout in seconds [default: {}]",
                    DEFAULT_TIMEOUT_SECS
                ))
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            arg!(--"user-agent" <AGENT>)
                .required(false)
                .help("User-Agent header sent with every request"),
        )
        .arg(arg!(-q --"quiet" "Only log warnings and hide the progress spinner").required(false))
}
