//! Sheet snapshot sink: clears the matches tab and rewrites it from scratch.

use async_trait::async_trait;
use gapmatch_core::error::{GapMatchError, Result};
use gapmatch_core::traits::SheetSink;
use gapmatch_core::types::Match;
use gapmatch_sources::SheetsClient;
use std::sync::Arc;

pub const HEADERS: [&str; 12] = [
    "Candidate",
    "Workshop",
    "Date",
    "Region",
    "School Context",
    "Map Link",
    "Site",
    "Day",
    "Time",
    "Gap Type",
    "Email",
    "Stage",
];

pub struct GoogleSheetSink {
    client: Arc<SheetsClient>,
    tab: String,
}

impl GoogleSheetSink {
    pub fn new(client: Arc<SheetsClient>, tab: &str) -> Self {
        Self {
            client,
            tab: tab.into(),
        }
    }
}

#[async_trait]
impl SheetSink for GoogleSheetSink {
    fn name(&self) -> &str {
        "sheet"
    }

    async fn overwrite(&self, rows: &[Vec<String>]) -> Result<()> {
        let to_sink = |e: GapMatchError| GapMatchError::sink("sheet", e);
        self.client.ensure_tab(&self.tab).await.map_err(to_sink)?;
        self.client.clear(&self.tab).await.map_err(to_sink)?;
        self.client
            .write_rows(&self.tab, rows)
            .await
            .map_err(to_sink)?;
        tracing::info!(
            "📊 Wrote {} match row(s) to '{}'",
            rows.len().saturating_sub(1),
            self.tab
        );
        Ok(())
    }
}

/// Header row plus one row per match, in match order.
pub fn match_rows(matches: &[Match]) -> Vec<Vec<String>> {
    let mut rows = Vec::with_capacity(matches.len() + 1);
    rows.push(HEADERS.iter().map(|h| h.to_string()).collect());
    for m in matches {
        let (c, g) = (&m.candidate, &m.gap);
        rows.push(vec![
            c.name.clone(),
            g.name.clone(),
            g.date_range(),
            m.region.to_string(),
            c.school.as_ref().map(|s| s.summary()).unwrap_or_default(),
            m.map_link.clone(),
            g.site.clone(),
            g.day.clone(),
            g.time.clone(),
            g.status.label().to_string(),
            c.email.clone().unwrap_or_default(),
            c.stage.label().to_string(),
        ]);
    }
    rows
}
