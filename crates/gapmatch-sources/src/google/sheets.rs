//! Minimal Google Sheets API v4 client: tab lookup, grid read, tab rewrite.

use gapmatch_core::error::{GapMatchError, Result};
use reqwest::Url;
use serde_json::{Value, json};
use std::path::Path;
use std::time::Duration;

use super::auth::{SHEETS_SCOPE, ServiceAccountKey};

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets/";
const SHEETS_TIMEOUT: Duration = Duration::from_secs(60);
const GRID_FIELDS: &str =
    "sheets.data.rowData.values(formattedValue,effectiveFormat.backgroundColor)";

/// A cell's displayed text plus its background colour, if one is set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridCell {
    pub value: String,
    pub background: Option<Rgb>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

impl Rgb {
    /// The pink/purple fill ops uses to mark an interview-only leader.
    pub fn is_tentative_pink(&self) -> bool {
        self.red > 0.9 && self.green < 0.7 && self.blue > 0.9
    }
}

impl GridCell {
    pub fn text(value: &str) -> Self {
        Self {
            value: value.into(),
            background: None,
        }
    }

    pub fn is_pink(&self) -> bool {
        self.background.is_some_and(|bg| bg.is_tentative_pink())
    }
}

/// Tab metadata returned by the spreadsheet properties query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabInfo {
    pub gid: i64,
    pub title: String,
}

/// Authenticated client bound to one spreadsheet.
pub struct SheetsClient {
    http: reqwest::Client,
    api_base: String,
    spreadsheet_id: String,
    token: String,
    timeout: Duration,
}

impl SheetsClient {
    /// Authenticate with a service-account key file.
    pub async fn connect(credentials: &Path, spreadsheet_id: &str) -> Result<Self> {
        let key = ServiceAccountKey::from_file(credentials)?;
        let http = reqwest::Client::new();
        let token = key.access_token(&http, &[SHEETS_SCOPE], SHEETS_TIMEOUT).await?;
        tracing::info!("📗 Connected to spreadsheet {spreadsheet_id}");
        Ok(Self::with_token(http, spreadsheet_id, &token))
    }

    pub fn with_token(http: reqwest::Client, spreadsheet_id: &str, token: &str) -> Self {
        Self {
            http,
            api_base: SHEETS_API.into(),
            spreadsheet_id: spreadsheet_id.into(),
            token: token.into(),
            timeout: SHEETS_TIMEOUT,
        }
    }

    /// Point the client at another API root (must end with `/`).
    pub fn with_endpoint(mut self, api_base: &str) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Per-request timeout. Defaults to 60s.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| GapMatchError::Config(format!("Sheets URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| GapMatchError::Config("Sheets URL cannot be a base".into()))?
            .pop_if_empty()
            .push(&self.spreadsheet_id)
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, req: reqwest::RequestBuilder, what: &str) -> Result<Value> {
        let resp = req
            .bearer_auth(&self.token)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| GapMatchError::SourceUnavailable(format!("Sheets {what}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GapMatchError::SourceUnavailable(format!(
                "Sheets {what} {status}: {body}"
            )));
        }
        resp.json()
            .await
            .map_err(|e| GapMatchError::SourceUnavailable(format!("Sheets {what}: {e}")))
    }

    pub async fn tabs(&self) -> Result<Vec<TabInfo>> {
        let req = self
            .http
            .get(self.url(&[])?)
            .query(&[("fields", "sheets.properties(sheetId,title)")]);
        let body = self.send(req, "tabs").await?;
        Ok(parse_tabs(&body))
    }

    /// Title of the tab with the given gid, or of the first tab.
    pub async fn tab_title(&self, gid: Option<i64>) -> Result<String> {
        let tabs = self.tabs().await?;
        let tab = match gid {
            Some(gid) => tabs.into_iter().find(|t| t.gid == gid),
            None => tabs.into_iter().next(),
        };
        tab.map(|t| t.title).ok_or_else(|| {
            GapMatchError::SourceUnavailable(match gid {
                Some(gid) => format!("No worksheet with gid={gid}"),
                None => "Spreadsheet has no worksheets".into(),
            })
        })
    }

    /// Every populated row of a tab with formatted values and backgrounds.
    pub async fn read_grid(&self, title: &str) -> Result<Vec<Vec<GridCell>>> {
        let req = self.http.get(self.url(&[])?).query(&[
            ("ranges", a1_tab(title).as_str()),
            ("includeGridData", "true"),
            ("fields", GRID_FIELDS),
        ]);
        let body = self.send(req, "grid read").await?;
        let grid = parse_grid(&body);
        tracing::debug!("📗 Read {} row(s) from '{title}'", grid.len());
        Ok(grid)
    }

    /// Create the tab unless a tab with that title already exists.
    pub async fn ensure_tab(&self, title: &str) -> Result<()> {
        if self.tabs().await?.iter().any(|t| t.title == title) {
            return Ok(());
        }
        let body = json!({
            "requests": [{"addSheet": {"properties": {"title": title}}}]
        });
        let req = self
            .http
            .post(self.url(&[])?.as_str().to_string() + ":batchUpdate")
            .json(&body);
        self.send(req, "add tab").await?;
        tracing::info!("📗 Created tab '{title}'");
        Ok(())
    }

    pub async fn clear(&self, title: &str) -> Result<()> {
        let range = format!("{}:clear", a1_tab(title));
        let req = self
            .http
            .post(self.url(&["values", &range])?)
            .json(&json!({}));
        self.send(req, "clear").await?;
        Ok(())
    }

    /// Write `rows` starting at A1 as raw strings.
    pub async fn write_rows(&self, title: &str, rows: &[Vec<String>]) -> Result<()> {
        let range = format!("{}!A1", a1_tab(title));
        let req = self
            .http
            .put(self.url(&["values", &range])?)
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({"range": range, "majorDimension": "ROWS", "values": rows}));
        self.send(req, "update").await?;
        Ok(())
    }
}

/// Quoted A1 tab reference; single quotes inside the title are doubled.
pub fn a1_tab(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

pub fn parse_tabs(body: &Value) -> Vec<TabInfo> {
    body["sheets"]
        .as_array()
        .map(|sheets| {
            sheets
                .iter()
                .filter_map(|s| {
                    let props = &s["properties"];
                    Some(TabInfo {
                        gid: props["sheetId"].as_i64().unwrap_or(0),
                        title: props["title"].as_str()?.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Rows of the first sheet's first data block. Absent colour components are 0,
/// as the API omits zero-valued fields.
pub fn parse_grid(body: &Value) -> Vec<Vec<GridCell>> {
    let Some(rows) = body["sheets"][0]["data"][0]["rowData"].as_array() else {
        return Vec::new();
    };
    rows.iter()
        .map(|row| {
            row["values"]
                .as_array()
                .map(|cells| cells.iter().map(parse_cell).collect())
                .unwrap_or_default()
        })
        .collect()
}

fn parse_cell(cell: &Value) -> GridCell {
    let value = match &cell["formattedValue"] {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    };
    let bg = &cell["effectiveFormat"]["backgroundColor"];
    let background = bg.is_object().then(|| Rgb {
        red: bg["red"].as_f64().unwrap_or(0.0),
        green: bg["green"].as_f64().unwrap_or(0.0),
        blue: bg["blue"].as_f64().unwrap_or(0.0),
    });
    GridCell { value, background }
}
