//! gapmatch configuration system.
//!
//! A TOML file (`~/.gapmatch/config.toml` by default) provides column names,
//! channels and the alias table. Secrets and identifiers are usually supplied
//! through the environment (or a `.env` file) and override the file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{GapMatchError, Result};
use crate::types::PipelineStage;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapMatchConfig {
    #[serde(default)]
    pub notion: NotionConfig,
    #[serde(default)]
    pub sheet: SheetConfig,
    #[serde(default)]
    pub slack: SlackConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Location alias → region code.
    #[serde(default = "default_aliases")]
    pub aliases: BTreeMap<String, String>,
    /// Region codes that have no alias pointing at them but are still valid.
    #[serde(default)]
    pub regions: Vec<String>,
}

impl GapMatchConfig {
    /// Load config from the default path, falling back to defaults when absent.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| GapMatchError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| GapMatchError::Config(format!("Failed to parse config: {e}")))
    }

    /// Default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// The gapmatch home directory (`~/.gapmatch`).
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".gapmatch")
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup. Empty values are ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("NOTION_API_KEY") {
            self.notion.api_key = v;
        }
        if let Some(v) = get("NOTION_DATABASE_ID") {
            self.notion.database_id = v;
        }
        if let Some(v) = get("GOOGLE_CREDENTIALS_PATH") {
            self.sheet.credentials_path = v;
        }
        if let Some(v) = get("GOOGLE_SHEET_ID") {
            self.sheet.sheet_id = v;
        }
        if let Some(v) = get("SHEET_GID") {
            match v.parse() {
                Ok(gid) => self.sheet.gid = Some(gid),
                Err(_) => tracing::warn!("⚠️ Ignoring non-numeric SHEET_GID '{v}'"),
            }
        }
        if let Some(v) = get("SHEET_MATCHES_TAB_NAME") {
            self.sheet.matches_tab = v;
        }
        if let Some(v) = get("SLACK_BOT_TOKEN") {
            self.slack.bot_token = v;
        }
        if let Some(v) = get("SLACK_CHANNEL") {
            self.slack.channel = v;
        }
        if let Some(v) = get("SMTP_HOST") {
            self.email.smtp_host = v;
        }
        if let Some(v) = get("SMTP_PORT") {
            match v.parse() {
                Ok(port) => self.email.smtp_port = port,
                Err(_) => tracing::warn!("⚠️ Ignoring invalid SMTP_PORT '{v}'"),
            }
        }
        if let Some(v) = get("SMTP_USER") {
            self.email.username = v;
        }
        if let Some(v) = get("SMTP_PASSWORD") {
            self.email.password = v;
        }
        if let Some(v) = get("EMAIL_FROM") {
            self.email.from = v;
        }
        if let Some(v) = get("EMAIL_TO") {
            self.email.to = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(v) = get("GAPMATCH_LEDGER_PATH") {
            self.ledger.path = v;
        }
    }

    /// Everything needed to read candidates and gaps.
    pub fn validate_sources(&self) -> Result<()> {
        require(&self.notion.api_key, "NOTION_API_KEY")?;
        require(&self.notion.database_id, "NOTION_DATABASE_ID")?;
        require(&self.sheet.credentials_path, "GOOGLE_CREDENTIALS_PATH")?;
        require(&self.sheet.sheet_id, "GOOGLE_SHEET_ID")?;
        if self.sheet.leader_cols.is_empty() && self.sheet.status_col.is_none() {
            return Err(GapMatchError::Config(
                "sheet.leader_cols or sheet.status_col must be set".into(),
            ));
        }
        Ok(())
    }

    /// Chat credentials. Required for a live match run.
    pub fn validate_chat(&self) -> Result<()> {
        require(&self.slack.bot_token, "SLACK_BOT_TOKEN")?;
        require(&self.slack.channel, "SLACK_CHANNEL")
    }

    /// SMTP settings. Required wherever the digest is actually sent.
    pub fn validate_email(&self) -> Result<()> {
        require(&self.email.smtp_host, "SMTP_HOST")?;
        if self.email.sender().is_none() {
            return Err(GapMatchError::Config(
                "EMAIL_FROM is not set and there is no SMTP_USER to send as".into(),
            ));
        }
        if self.email.to.is_empty() {
            return Err(GapMatchError::Config("EMAIL_TO is not set".into()));
        }
        Ok(())
    }

    /// All sink settings for a live match run.
    pub fn validate_sinks(&self) -> Result<()> {
        self.validate_chat()?;
        self.validate_email()?;
        require(&self.sheet.matches_tab, "SHEET_MATCHES_TAB_NAME")
    }

    /// Ledger path with `~` expanded.
    pub fn ledger_path(&self) -> PathBuf {
        expand_path(&self.ledger.path)
    }

    pub fn credentials_path(&self) -> PathBuf {
        expand_path(&self.sheet.credentials_path)
    }
}

impl Default for GapMatchConfig {
    fn default() -> Self {
        Self {
            notion: NotionConfig::default(),
            sheet: SheetConfig::default(),
            slack: SlackConfig::default(),
            email: EmailConfig::default(),
            ledger: LedgerConfig::default(),
            aliases: default_aliases(),
            regions: Vec::new(),
        }
    }
}

fn require(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(GapMatchError::Config(format!("{name} is not set")))
    } else {
        Ok(())
    }
}

pub fn expand_path(p: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(p).to_string())
}

/// Notion pipeline database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotionConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub database_id: String,
    #[serde(default = "default_notion_version")]
    pub version: String,
    #[serde(default = "default_status_property")]
    pub status_property: String,
    #[serde(default)]
    pub stages: StageLabels,
    #[serde(default = "default_name_property")]
    pub name_property: String,
    #[serde(default = "default_location_property")]
    pub location_property: String,
    #[serde(default = "default_email_property")]
    pub email_property: String,
    #[serde(default = "default_district_property")]
    pub district_property: String,
    #[serde(default = "default_enrollment_property")]
    pub enrollment_property: String,
    #[serde(default = "default_grade_level_property")]
    pub grade_level_property: String,
}

fn default_notion_version() -> String { "2022-06-28".into() }
fn default_status_property() -> String { "Status".into() }
fn default_name_property() -> String { "Name".into() }
fn default_location_property() -> String { "Location".into() }
fn default_email_property() -> String { "Email".into() }
fn default_district_property() -> String { "District".into() }
fn default_enrollment_property() -> String { "Enrollment".into() }
fn default_grade_level_property() -> String { "Grade Level".into() }

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            database_id: String::new(),
            version: default_notion_version(),
            status_property: default_status_property(),
            stages: StageLabels::default(),
            name_property: default_name_property(),
            location_property: default_location_property(),
            email_property: default_email_property(),
            district_property: default_district_property(),
            enrollment_property: default_enrollment_property(),
            grade_level_property: default_grade_level_property(),
        }
    }
}

/// Select-option labels used for each matchable stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageLabels {
    #[serde(default = "default_team_screening")]
    pub team_screening: String,
    #[serde(default = "default_talent_screen")]
    pub talent_screen: String,
    #[serde(default = "default_teaching_demo")]
    pub teaching_demo: String,
}

fn default_team_screening() -> String { "\u{1f3b3} Team screening".into() }
fn default_talent_screen() -> String { "Talent Screen".into() }
fn default_teaching_demo() -> String { "Teaching Demo".into() }

impl Default for StageLabels {
    fn default() -> Self {
        Self {
            team_screening: default_team_screening(),
            talent_screen: default_talent_screen(),
            teaching_demo: default_teaching_demo(),
        }
    }
}

impl StageLabels {
    pub fn label(&self, stage: PipelineStage) -> &str {
        match stage {
            PipelineStage::TeamScreening => &self.team_screening,
            PipelineStage::TalentScreen => &self.talent_screen,
            PipelineStage::TeachingDemo => &self.teaching_demo,
        }
    }

    /// Case-insensitive reverse lookup of a select label.
    pub fn stage_for(&self, label: &str) -> Option<PipelineStage> {
        let label = label.trim();
        PipelineStage::ALL
            .into_iter()
            .find(|s| self.label(*s).trim().eq_ignore_ascii_case(label))
    }
}

/// Workshop Ops Hub sheet: where gaps are read and matches are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetConfig {
    #[serde(default)]
    pub credentials_path: String,
    #[serde(default)]
    pub sheet_id: String,
    /// Tab gid. First tab when unset.
    #[serde(default)]
    pub gid: Option<i64>,
    #[serde(default)]
    pub id_col: Option<String>,
    #[serde(default = "default_region_col")]
    pub region_col: String,
    #[serde(default = "default_site_col")]
    pub site_col: String,
    #[serde(default = "default_lesson_col")]
    pub lesson_col: String,
    #[serde(default = "default_day_col")]
    pub day_col: String,
    #[serde(default = "default_start_time_col")]
    pub start_time_col: String,
    #[serde(default = "default_end_time_col")]
    pub end_time_col: String,
    #[serde(default = "default_start_date_col")]
    pub start_date_col: String,
    #[serde(default = "default_end_date_col")]
    pub end_date_col: String,
    #[serde(default = "default_setup_col")]
    pub setup_col: String,
    #[serde(default = "default_leader_cols")]
    pub leader_cols: Vec<String>,
    /// Explicit slot status column; overrides colour detection when present.
    #[serde(default)]
    pub status_col: Option<String>,
    /// Host school columns. Ignored when the header does not have them.
    #[serde(default = "default_district_col")]
    pub district_col: String,
    #[serde(default = "default_enrollment_col")]
    pub enrollment_col: String,
    #[serde(default = "default_level_col")]
    pub level_col: String,
    #[serde(default = "default_matches_tab")]
    pub matches_tab: String,
}

fn default_region_col() -> String { "Region".into() }
fn default_site_col() -> String { "Site".into() }
fn default_lesson_col() -> String { "Lesson".into() }
fn default_day_col() -> String { "Day".into() }
fn default_start_time_col() -> String { "Start Time".into() }
fn default_end_time_col() -> String { "End Time".into() }
fn default_start_date_col() -> String { "Start Date".into() }
fn default_end_date_col() -> String { "End Date".into() }
fn default_setup_col() -> String { "Setup".into() }
fn default_leader_cols() -> Vec<String> {
    vec!["Leader 1".into(), "Leader 2".into(), "Leader 3".into()]
}
fn default_district_col() -> String { "District".into() }
fn default_enrollment_col() -> String { "Enrollment".into() }
fn default_level_col() -> String { "Level".into() }
fn default_matches_tab() -> String { "Gap Matches".into() }

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            credentials_path: String::new(),
            sheet_id: String::new(),
            gid: None,
            id_col: None,
            region_col: default_region_col(),
            site_col: default_site_col(),
            lesson_col: default_lesson_col(),
            day_col: default_day_col(),
            start_time_col: default_start_time_col(),
            end_time_col: default_end_time_col(),
            start_date_col: default_start_date_col(),
            end_date_col: default_end_date_col(),
            setup_col: default_setup_col(),
            leader_cols: default_leader_cols(),
            status_col: None,
            district_col: default_district_col(),
            enrollment_col: default_enrollment_col(),
            level_col: default_level_col(),
            matches_tab: default_matches_tab(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default = "default_slack_channel")]
    pub channel: String,
}

fn default_slack_channel() -> String { "ops-matching".into() }

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            channel: default_slack_channel(),
        }
    }
}

/// SMTP settings for the digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub from: String,
    #[serde(default = "default_email_to")]
    pub to: Vec<String>,
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,
}

fn default_smtp_host() -> String { "smtp.gmail.com".into() }
fn default_smtp_port() -> u16 { 587 }
fn default_email_to() -> Vec<String> { vec!["talent@kodely.io".into()] }
fn default_subject_prefix() -> String { "Kodely Gap Match Digest".into() }

impl EmailConfig {
    /// `from`, or the SMTP login when no explicit sender is configured.
    pub fn sender(&self) -> Option<&str> {
        [self.from.as_str(), self.username.as_str()]
            .into_iter()
            .map(str::trim)
            .find(|s| !s.is_empty())
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            username: String::new(),
            password: String::new(),
            from: String::new(),
            to: default_email_to(),
            subject_prefix: default_subject_prefix(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    Json,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_ledger_backend")]
    pub backend: LedgerBackend,
    #[serde(default = "default_ledger_path")]
    pub path: String,
}

fn default_ledger_backend() -> LedgerBackend { LedgerBackend::Json }
fn default_ledger_path() -> String { "~/.gapmatch/notified.json".into() }

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            backend: default_ledger_backend(),
            path: default_ledger_path(),
        }
    }
}

/// Built-in alias table: pipeline location spellings → sheet region codes.
pub fn default_aliases() -> BTreeMap<String, String> {
    [
        ("san francisco", "SF"),
        ("san francisco ca", "SF"),
        ("sf/oakland (califronia)", "SF"),
        ("sf/menlo park", "SF"),
        ("sf-bayview", "SF"),
        ("los angeles", "LA"),
        ("la/east la", "LA"),
        ("la/long beach", "LA"),
        ("la/oc", "LA"),
        ("la/westwood/brentwood", "LA"),
        ("la/inglewood/calabasas", "LA"),
        ("new york", "MANHATTAN"),
        ("new york city ny", "MANHATTAN"),
        ("new york ny", "MANHATTAN"),
        ("nyc", "MANHATTAN"),
        ("nyc area", "MANHATTAN"),
        ("minnesota/minneapolis", "MINNESOTA"),
        ("minneapolis", "MINNESOTA"),
        ("twin cities", "MINNESOTA"),
        ("san jose ca", "SAN JOSE"),
        ("san jose california", "SAN JOSE"),
        ("san deigo", "SAN DIEGO"),
        ("denver", "COLORADO"),
        ("denver co", "COLORADO"),
        ("denver colorado", "COLORADO"),
        ("metro area denver", "COLORADO"),
        ("evanston illinois", "CHICAGO"),
        ("rogers park chicago", "CHICAGO"),
        ("downtown chicago", "CHICAGO"),
        ("naperville", "CHICAGO"),
        ("marin", "MARIN COUNTY"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}
