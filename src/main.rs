//! # gapmatch: match + notify
//!
//! Pairs pipeline candidates with open workshop leader slots in the same
//! region, posts one Slack message per candidate, emails a digest of the new
//! matches, rewrites the matches tab and records what was sent.
//!
//! Usage:
//!   gapmatch                      # live run
//!   gapmatch --dry-run            # print new matches, send and record nothing
//!   gapmatch --region "San Francisco"
//!   gapmatch --config ./ops.toml -v

use anyhow::Result;
use clap::Parser;
use gapmatch_runner::bootstrap;
use gapmatch_runner::{RunOptions, run_match_notify};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "gapmatch",
    version,
    about = "🔗 Interview gap matcher: pipeline candidates ↔ open workshop leader slots"
)]
struct Cli {
    /// Compute and print matches without notifying or recording anything
    #[arg(long)]
    dry_run: bool,

    /// Only match within one region (any known alias, e.g. "San Francisco")
    #[arg(long)]
    region: Option<String>,

    /// Config file (default: ~/.gapmatch/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    let filter = if cli.verbose {
        "gapmatch=debug,gapmatch_runner=debug,gapmatch_matcher=debug,gapmatch_sources=debug,gapmatch_channels=debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config = bootstrap::load_config(cli.config.as_deref())?;
    config.validate_sources()?;
    if !cli.dry_run {
        config.validate_sinks()?;
    }

    let normalizer = bootstrap::normalizer(&config);
    let region = cli
        .region
        .as_deref()
        .map(|raw| bootstrap::resolve_region(&normalizer, raw))
        .transpose()?;
    if let Some(region) = &region {
        tracing::info!("📍 Restricting run to region {region}");
    }

    let mut ledger = bootstrap::open_ledger(&config, cli.dry_run)?;
    let today = bootstrap::today();
    let sheets = bootstrap::connect_sheets(&config).await?;
    let sources = bootstrap::sources(&config, normalizer, sheets.clone(), today);
    let sinks = (!cli.dry_run).then(|| bootstrap::sinks(&config, sheets));

    let mut options = RunOptions::new(today, &config.email.subject_prefix);
    options.dry_run = cli.dry_run;
    options.region = region;

    let summary = run_match_notify(&sources, sinks.as_ref(), ledger.as_mut(), &options).await?;

    if cli.dry_run {
        if summary.preview.is_empty() {
            println!("No new matches.\n");
        }
        for message in &summary.preview {
            println!("{message}\n{}\n", "─".repeat(60));
        }
    }
    print!("{summary}");
    Ok(())
}
