//! Workshop gap source: reads the program sheet and keeps rows that still
//! need a leader.

use async_trait::async_trait;
use chrono::NaiveDate;
use gapmatch_core::config::SheetConfig;
use gapmatch_core::error::{GapMatchError, Result};
use gapmatch_core::traits::GapSource;
use gapmatch_core::types::{SchoolContext, SlotStatus, WorkshopGap};
use gapmatch_matcher::LocationNormalizer;
use std::collections::HashMap;
use std::sync::Arc;

use crate::google::{GridCell, SheetsClient};

const UNNAMED_LESSON: &str = "(unnamed)";

pub struct SheetGapSource {
    client: Arc<SheetsClient>,
    config: SheetConfig,
    normalizer: Arc<LocationNormalizer>,
    today: NaiveDate,
}

impl SheetGapSource {
    pub fn new(
        client: Arc<SheetsClient>,
        config: SheetConfig,
        normalizer: Arc<LocationNormalizer>,
        today: NaiveDate,
    ) -> Self {
        Self {
            client,
            config,
            normalizer,
            today,
        }
    }
}

#[async_trait]
impl GapSource for SheetGapSource {
    fn name(&self) -> &str {
        "google-sheet"
    }

    async fn fetch_gaps(&self) -> Result<Vec<WorkshopGap>> {
        let title = self.client.tab_title(self.config.gid).await?;
        let grid = self.client.read_grid(&title).await?;
        let gaps = parse_gap_grid(&grid, &self.config, &self.normalizer, self.today)?;
        tracing::info!("📋 {} upcoming workshop(s) with open leader slots in '{title}'", gaps.len());
        Ok(gaps)
    }
}

/// Header name → column index. Blank headers are ignored, first occurrence wins.
struct Columns(HashMap<String, usize>);

impl Columns {
    fn from_header(header: &[GridCell]) -> Self {
        let mut map = HashMap::new();
        for (i, cell) in header.iter().enumerate() {
            let name = cell.value.trim();
            if !name.is_empty() {
                map.entry(name.to_string()).or_insert(i);
            }
        }
        Self(map)
    }

    fn has(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    fn cell<'a>(&self, row: &'a [GridCell], name: &str) -> Option<&'a GridCell> {
        self.0.get(name).and_then(|&i| row.get(i))
    }

    fn text(&self, row: &[GridCell], name: &str) -> String {
        self.cell(row, name)
            .map(|c| c.value.trim().to_string())
            .unwrap_or_default()
    }
}

/// Turn a sheet grid (header row first) into the workshops that still need a
/// leader as of `today`.
pub fn parse_gap_grid(
    grid: &[Vec<GridCell>],
    config: &SheetConfig,
    normalizer: &LocationNormalizer,
    today: NaiveDate,
) -> Result<Vec<WorkshopGap>> {
    let Some((header, rows)) = grid.split_first() else {
        return Ok(Vec::new());
    };
    let cols = Columns::from_header(header);
    for required in [&config.region_col, &config.site_col] {
        if !cols.has(required) {
            return Err(GapMatchError::SourceUnavailable(format!(
                "Gap sheet has no '{required}' column"
            )));
        }
    }

    let mut gaps = Vec::new();
    for row in rows {
        if cols.text(row, &config.setup_col).to_uppercase().contains("CANCEL") {
            continue;
        }

        let end_date = cols.text(row, &config.end_date_col);
        if parse_sheet_date(&end_date).is_some_and(|end| end < today) {
            continue;
        }

        let region_raw = cols.text(row, &config.region_col);
        let site = cols.text(row, &config.site_col);
        if region_raw.is_empty() && site.is_empty() {
            continue;
        }

        let (status, tentative_names) = slot_status(&cols, row, config);
        if !status.leader_needed() {
            continue;
        }

        let lesson = cols.text(row, &config.lesson_col);
        let day = cols.text(row, &config.day_col);
        let time = time_window(
            &cols.text(row, &config.start_time_col),
            &cols.text(row, &config.end_time_col),
        );
        let start_date = cols.text(row, &config.start_date_col);

        let id = config
            .id_col
            .as_deref()
            .map(|c| cols.text(row, c))
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("{region_raw}|{site}|{lesson}|{day}|{time}"));

        let region = normalizer.normalize(&region_raw);
        if region.is_none() {
            tracing::debug!("Gap {id}: region '{region_raw}' not recognized");
        }

        gaps.push(WorkshopGap {
            id,
            name: if lesson.is_empty() {
                UNNAMED_LESSON.into()
            } else {
                lesson
            },
            site,
            day,
            time,
            date: parse_sheet_date(&start_date),
            start_date,
            end_date,
            location: region_raw,
            region,
            status,
            tentative_names,
            school: school_context(&cols, row, config),
        });
    }
    Ok(gaps)
}

fn school_context(cols: &Columns, row: &[GridCell], config: &SheetConfig) -> Option<SchoolContext> {
    let non_empty = |s: String| (!s.is_empty()).then_some(s);
    let school = SchoolContext {
        district: non_empty(cols.text(row, &config.district_col)),
        enrollment: cols
            .text(row, &config.enrollment_col)
            .replace(',', "")
            .parse()
            .ok(),
        grade_level: non_empty(cols.text(row, &config.level_col)),
    };
    (!school.is_empty()).then_some(school)
}

/// Explicit status column first, then leader cells: all blank is open, any
/// pink-filled name is tentative, anything else is filled.
fn slot_status(cols: &Columns, row: &[GridCell], config: &SheetConfig) -> (SlotStatus, Vec<String>) {
    let leaders: Vec<(String, bool)> = config
        .leader_cols
        .iter()
        .map(|c| {
            let cell = cols.cell(row, c);
            (
                cell.map(|c| c.value.trim().to_string()).unwrap_or_default(),
                cell.is_some_and(GridCell::is_pink),
            )
        })
        .collect();
    let tentative_names: Vec<String> = leaders
        .iter()
        .filter(|(name, pink)| *pink && !name.is_empty())
        .map(|(name, _)| name.clone())
        .collect();

    if let Some(explicit) = config
        .status_col
        .as_deref()
        .and_then(|c| parse_status(&cols.text(row, c)))
    {
        return (explicit, tentative_names);
    }

    if leaders.iter().all(|(name, _)| name.is_empty()) {
        (SlotStatus::Empty, Vec::new())
    } else if !tentative_names.is_empty() {
        (SlotStatus::Tentative, tentative_names)
    } else {
        (SlotStatus::Filled, Vec::new())
    }
}

fn parse_status(raw: &str) -> Option<SlotStatus> {
    match raw.trim().to_lowercase().as_str() {
        "open" | "empty" => Some(SlotStatus::Empty),
        "tentative" => Some(SlotStatus::Tentative),
        "filled" => Some(SlotStatus::Filled),
        _ => None,
    }
}

fn time_window(start: &str, end: &str) -> String {
    match (start, end) {
        ("", e) => e.to_string(),
        (s, "") => s.to_string(),
        (s, e) => format!("{s}-{e}"),
    }
}

/// Dates as ops types them: `January 14, 2026`, `Jan 14, 2026`, `1/14/2026`,
/// `1/14/26`, or ISO.
pub fn parse_sheet_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let short_year = raw.rsplit('/').next().is_some_and(|y| y.len() == 2);
    let formats: &[&str] = if short_year {
        &["%m/%d/%y"]
    } else {
        &["%B %d, %Y", "%b %d, %Y", "%m/%d/%Y", "%Y-%m-%d"]
    };
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}
