//! # gapmatch-digest
//!
//! Emails the daily HTML digest of every open workshop gap and the candidates
//! that match it. `--dry-run` prints the HTML instead of sending it.

use anyhow::Result;
use clap::Parser;
use gapmatch_runner::bootstrap;
use gapmatch_runner::{RunOptions, run_digest};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gapmatch-digest", version, about = "📧 Daily gap match digest email")]
struct Cli {
    /// Print the HTML email to stdout without sending
    #[arg(long)]
    dry_run: bool,

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
        "gapmatch_digest=debug,gapmatch_runner=debug,gapmatch_matcher=debug,gapmatch_sources=debug,gapmatch_channels=debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = bootstrap::load_config(cli.config.as_deref())?;
    config.validate_sources()?;
    if !cli.dry_run {
        config.validate_email()?;
    }

    let normalizer = bootstrap::normalizer(&config);
    let today = bootstrap::today();
    let sheets = bootstrap::connect_sheets(&config).await?;
    let sources = bootstrap::sources(&config, normalizer, sheets, today);
    let email = bootstrap::email_sink(&config);

    let mut options = RunOptions::new(today, &config.email.subject_prefix);
    options.dry_run = cli.dry_run;

    let summary = run_digest(&sources, (!cli.dry_run).then_some(email.as_ref()), &options).await?;

    if cli.dry_run {
        for html in &summary.preview {
            println!("{html}");
        }
        eprint!("{summary}");
    } else {
        print!("{summary}");
    }
    Ok(())
}
