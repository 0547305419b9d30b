//! Wiring from config to live adapters.

use chrono::NaiveDate;
use gapmatch_channels::{GoogleSheetSink, SlackChatSink, SmtpEmailSink};
use gapmatch_core::GapMatchConfig;
use gapmatch_core::config::{LedgerBackend, expand_path};
use gapmatch_core::error::{GapMatchError, Result};
use gapmatch_core::traits::{EmailSink, LedgerStore};
use gapmatch_core::types::RegionCode;
use gapmatch_matcher::{AliasTable, JsonFileLedger, LocationNormalizer, Resolution, SqliteLedger};
use gapmatch_sources::{NotionCandidateSource, SheetGapSource, SheetsClient};
use std::sync::Arc;

use crate::pipeline::{Sinks, Sources};

/// Config file (explicit path or `~/.gapmatch/config.toml`) with env overrides applied.
pub fn load_config(path: Option<&str>) -> Result<GapMatchConfig> {
    let mut config = match path {
        Some(p) => GapMatchConfig::load_from(&expand_path(p))?,
        None => GapMatchConfig::load()?,
    };
    config.apply_env();
    Ok(config)
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub fn normalizer(config: &GapMatchConfig) -> Arc<LocationNormalizer> {
    let table = AliasTable::from_config(config);
    tracing::debug!(
        "🗺️  {} location alias(es) across {} region(s)",
        table.len(),
        table.regions().count()
    );
    Arc::new(LocationNormalizer::new(table))
}

/// `--region` goes through the same normalizer as every location.
pub fn resolve_region(normalizer: &LocationNormalizer, raw: &str) -> Result<RegionCode> {
    match normalizer.resolve(raw) {
        Resolution::Found(code) => Ok(code),
        Resolution::Ambiguous(codes) => Err(GapMatchError::Config(format!(
            "--region '{raw}' is ambiguous: {}",
            codes
                .iter()
                .map(RegionCode::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        ))),
        Resolution::NotFound => Err(GapMatchError::Config(format!(
            "--region '{raw}' is not a known region"
        ))),
    }
}

/// Dry runs open the store read-only so nothing is created on disk.
pub fn open_ledger(config: &GapMatchConfig, dry_run: bool) -> Result<Box<dyn LedgerStore>> {
    let path = config.ledger_path();
    tracing::debug!("📒 Ledger: {:?} at {}", config.ledger.backend, path.display());
    let ledger: Box<dyn LedgerStore> = match (config.ledger.backend, dry_run) {
        (LedgerBackend::Json, _) => Box::new(JsonFileLedger::new(&path)),
        (LedgerBackend::Sqlite, false) => Box::new(SqliteLedger::open(&path)?),
        (LedgerBackend::Sqlite, true) => Box::new(SqliteLedger::open_read_only(&path)?),
    };
    Ok(ledger)
}

pub async fn connect_sheets(config: &GapMatchConfig) -> Result<Arc<SheetsClient>> {
    let client = SheetsClient::connect(&config.credentials_path(), &config.sheet.sheet_id).await?;
    Ok(Arc::new(client))
}

pub fn sources(
    config: &GapMatchConfig,
    normalizer: Arc<LocationNormalizer>,
    sheets: Arc<SheetsClient>,
    today: NaiveDate,
) -> Sources {
    Sources {
        candidates: Box::new(NotionCandidateSource::new(
            config.notion.clone(),
            normalizer.clone(),
        )),
        gaps: Box::new(SheetGapSource::new(
            sheets,
            config.sheet.clone(),
            normalizer,
            today,
        )),
    }
}

pub fn email_sink(config: &GapMatchConfig) -> Box<dyn EmailSink> {
    Box::new(SmtpEmailSink::new(config.email.clone()))
}

pub fn sinks(config: &GapMatchConfig, sheets: Arc<SheetsClient>) -> Sinks {
    Sinks {
        chat: Box::new(SlackChatSink::new(config.slack.clone())),
        email: email_sink(config),
        sheet: Box::new(GoogleSheetSink::new(sheets, &config.sheet.matches_tab)),
    }
}
