//! Notion candidate source: queries the hiring pipeline database for
//! candidates in a match-ready stage.

use async_trait::async_trait;
use gapmatch_core::config::NotionConfig;
use gapmatch_core::error::{GapMatchError, Result};
use gapmatch_core::traits::CandidateSource;
use gapmatch_core::types::{Candidate, PipelineStage, RegionCode, SchoolContext};
use gapmatch_matcher::{LocationNormalizer, Resolution};
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

const NOTION_API: &str = "https://api.notion.com/v1";
const NOTION_TIMEOUT: Duration = Duration::from_secs(30);
const PAGE_SIZE: u32 = 100;

pub struct NotionCandidateSource {
    http: reqwest::Client,
    api_base: String,
    timeout: Duration,
    config: NotionConfig,
    normalizer: Arc<LocationNormalizer>,
}

impl NotionCandidateSource {
    pub fn new(config: NotionConfig, normalizer: Arc<LocationNormalizer>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: NOTION_API.into(),
            timeout: NOTION_TIMEOUT,
            config,
            normalizer,
        }
    }

    pub fn with_endpoint(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').into();
        self
    }

    /// Per-request timeout. Defaults to 30s.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn query_page(&self, cursor: Option<&str>) -> Result<Value> {
        let url = format!("{}/databases/{}/query", self.api_base, self.config.database_id);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .header("Notion-Version", &self.config.version)
            .json(&query_body(&self.config, cursor))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| GapMatchError::SourceUnavailable(format!("Notion: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GapMatchError::SourceUnavailable(format!(
                "Notion query {status}: {body}"
            )));
        }
        resp.json()
            .await
            .map_err(|e| GapMatchError::SourceUnavailable(format!("Notion response: {e}")))
    }
}

#[async_trait]
impl CandidateSource for NotionCandidateSource {
    fn name(&self) -> &str {
        "notion"
    }

    async fn fetch_candidates(&self) -> Result<Vec<Candidate>> {
        let mut candidates = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self.query_page(cursor.as_deref()).await?;
            let results = page["results"].as_array().ok_or_else(|| {
                GapMatchError::SourceUnavailable("Notion response has no results".into())
            })?;
            candidates.extend(
                results
                    .iter()
                    .filter_map(|p| parse_candidate_page(p, &self.config, &self.normalizer)),
            );

            match page["next_cursor"].as_str() {
                Some(next) if page["has_more"].as_bool() == Some(true) => {
                    cursor = Some(next.to_string());
                }
                _ => break,
            }
        }

        tracing::info!(
            "🧑‍🏫 {} candidate(s) in stages: {}",
            candidates.len(),
            PipelineStage::ALL
                .iter()
                .map(|s| self.config.stages.label(*s))
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(candidates)
    }
}

/// Database query body: `or` over the configured stage labels, paginated.
pub fn query_body(config: &NotionConfig, cursor: Option<&str>) -> Value {
    let filters: Vec<Value> = PipelineStage::ALL
        .iter()
        .map(|stage| {
            json!({
                "property": config.status_property,
                "select": {"equals": config.stages.label(*stage)},
            })
        })
        .collect();

    let mut body = json!({
        "filter": {"or": filters},
        "page_size": PAGE_SIZE,
    });
    if let Some(cursor) = cursor {
        body["start_cursor"] = json!(cursor);
    }
    body
}

/// One database page → candidate. `None` when the page has no id or its stage
/// is not one we match on.
pub fn parse_candidate_page(
    page: &Value,
    config: &NotionConfig,
    normalizer: &LocationNormalizer,
) -> Option<Candidate> {
    let id = page["id"].as_str()?.to_string();
    let props = &page["properties"];

    let stage_label = option_name(&props[&config.status_property])?;
    let stage = config.stages.stage_for(&stage_label)?;

    let locations = option_names(&props[&config.location_property]);
    let regions = resolve_locations(&locations, normalizer);
    let name = plain_text(&props[&config.name_property]).unwrap_or_default();
    if regions.is_empty() {
        tracing::debug!("Candidate {name} ({id}): no region for {locations:?}");
    }

    let school = SchoolContext {
        district: plain_text(&props[&config.district_property]),
        enrollment: props[&config.enrollment_property]["number"]
            .as_f64()
            .filter(|n| *n >= 0.0)
            .map(|n| n as u32),
        grade_level: plain_text(&props[&config.grade_level_property]),
    };

    Some(Candidate {
        id,
        name,
        email: props[&config.email_property]["email"]
            .as_str()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string),
        stage,
        location: locations.join(", "),
        regions,
        school: (!school.is_empty()).then_some(school),
    })
}

/// Each option resolves on its own. An option that is itself ambiguous
/// contributes nothing.
fn resolve_locations(locations: &[String], normalizer: &LocationNormalizer) -> Vec<RegionCode> {
    let found: BTreeSet<RegionCode> = locations
        .iter()
        .filter_map(|loc| match normalizer.resolve(loc) {
            Resolution::Found(code) => Some(code),
            Resolution::Ambiguous(codes) => {
                tracing::debug!("Location '{loc}' is ambiguous across {} regions", codes.len());
                None
            }
            Resolution::NotFound => None,
        })
        .collect();
    found.into_iter().collect()
}

/// Name of a `select` or `status` property.
fn option_name(prop: &Value) -> Option<String> {
    ["select", "status"]
        .iter()
        .find_map(|kind| prop[*kind]["name"].as_str())
        .map(str::to_string)
}

/// Option names of a `multi_select`, falling back to single select or text.
fn option_names(prop: &Value) -> Vec<String> {
    if let Some(options) = prop["multi_select"].as_array() {
        return options
            .iter()
            .filter_map(|o| o["name"].as_str())
            .map(str::to_string)
            .collect();
    }
    option_name(prop)
        .or_else(|| plain_text(prop))
        .into_iter()
        .collect()
}

/// Concatenated plain text of a `title`/`rich_text` property, or a select name.
fn plain_text(prop: &Value) -> Option<String> {
    let text = ["title", "rich_text"]
        .iter()
        .find_map(|kind| prop[*kind].as_array())
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p["plain_text"].as_str())
                .collect::<String>()
        })
        .or_else(|| option_name(prop))?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
