use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod detail;
mod error;
mod fetch;
mod links;
mod output;
mod pipeline;
mod posting;

use config::{
    Heuristics, ScrapeConfig, DEFAULT_BASE_URL, DEFAULT_DETAIL_TIMEOUT_SECS, DEFAULT_OUTPUT,
    DEFAULT_PAGE_TIMEOUT_SECS,
};
use fetch::HttpFetcher;

#[derive(Parser)]
#[command(name = "ibps-scraper")]
#[command(about = "Collect recruitment notices linked from the IBPS homepage into a CSV file")]
#[command(version)]
struct Cli {
    /// Page to scan for job links
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// CSV file to write (overwritten)
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Timeout in seconds for the base page
    #[arg(long, default_value_t = DEFAULT_PAGE_TIMEOUT_SECS)]
    timeout: u64,

    /// Timeout in seconds for each linked detail page
    #[arg(long, default_value_t = DEFAULT_DETAIL_TIMEOUT_SECS)]
    detail_timeout: u64,

    /// Validate TLS certificates for the base page as well
    #[arg(long)]
    strict_tls: bool,

    /// JSON file overriding keywords, patterns or the default title
    #[arg(long)]
    heuristics: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "ibps_scraper=info"
    } else {
        "ibps_scraper=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = ScrapeConfig::new(
        &cli.base_url,
        cli.output,
        cli.timeout,
        cli.detail_timeout,
        cli.strict_tls,
    )?;

    let heuristics = match &cli.heuristics {
        Some(path) => Heuristics::from_json_file(path)
            .with_context(|| format!("Failed to load heuristics from {}", path.display()))?,
        None => Heuristics::default(),
    };

    let fetcher = HttpFetcher::new(&config)?;
    let outcome = pipeline::run(&config, &heuristics, &fetcher)?;

    if outcome.report.fallback_used {
        info!("No keyword matches; rows came from news/latest containers");
    }
    if outcome.report.postings.is_empty() {
        println!("No job links found with the heuristics. You may need to update scraping heuristics.");
    }
    if outcome.report.detail_failures > 0 {
        println!(
            "{} detail pages could not be fetched; their date and location are blank.",
            outcome.report.detail_failures
        );
    }
    println!(
        "Saved {} rows to {}",
        outcome.rows_written,
        config.output.display()
    );

    Ok(())
}
