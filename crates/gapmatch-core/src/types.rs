//! Domain types: candidates, workshop gaps, matches and ledger entries.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical short identifier for a geographic area (e.g. `SF`, `MANHATTAN`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionCode(String);

impl RegionCode {
    /// Region codes are stored trimmed and upper-cased.
    pub fn new(code: &str) -> Self {
        Self(code.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pipeline stages that make a candidate eligible for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineStage {
    TeamScreening,
    TalentScreen,
    TeachingDemo,
}

impl PipelineStage {
    pub const ALL: [PipelineStage; 3] = [
        PipelineStage::TeamScreening,
        PipelineStage::TalentScreen,
        PipelineStage::TeachingDemo,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::TeamScreening => "Team Screening",
            Self::TalentScreen => "Talent Screen",
            Self::TeachingDemo => "Teaching Demo",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Optional school context attached to a candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchoolContext {
    pub district: Option<String>,
    pub enrollment: Option<u32>,
    pub grade_level: Option<String>,
}

impl SchoolContext {
    pub fn is_empty(&self) -> bool {
        self.district.is_none() && self.enrollment.is_none() && self.grade_level.is_none()
    }

    /// One-line summary, e.g. `District: SFUSD; Enrollment: 420; Level: K-5`.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(d) = &self.district {
            parts.push(format!("District: {d}"));
        }
        if let Some(n) = self.enrollment {
            parts.push(format!("Enrollment: {n}"));
        }
        if let Some(l) = &self.grade_level {
            parts.push(format!("Level: {l}"));
        }
        parts.join("; ")
    }
}

/// A pipeline entry awaiting interview scheduling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub stage: PipelineStage,
    /// Location(s) exactly as entered in the pipeline.
    pub location: String,
    /// Every distinct region the location(s) resolved to, sorted. Empty when
    /// nothing could be normalized.
    pub regions: Vec<RegionCode>,
    pub school: Option<SchoolContext>,
}

impl Candidate {
    pub fn in_region(&self, region: &RegionCode) -> bool {
        self.regions.contains(region)
    }
}

/// Leadership slot status of a workshop row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotStatus {
    /// No leader assigned at all.
    Empty,
    /// Leader pencilled in, still interviewing.
    Tentative,
    /// Leader confirmed. Not a gap.
    Filled,
}

impl SlotStatus {
    pub fn leader_needed(&self) -> bool {
        matches!(self, Self::Empty | Self::Tentative)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Empty => "OPEN (no leaders)",
            Self::Tentative => "TENTATIVE (interview only)",
            Self::Filled => "FILLED",
        }
    }
}

/// A workshop occurrence read from the gap sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkshopGap {
    pub id: String,
    /// Lesson / program name.
    pub name: String,
    pub site: String,
    pub day: String,
    pub time: String,
    /// Parsed start date, used for ordering.
    pub date: Option<NaiveDate>,
    pub start_date: String,
    pub end_date: String,
    /// Region cell exactly as it appears in the sheet.
    pub location: String,
    pub region: Option<RegionCode>,
    pub status: SlotStatus,
    pub tentative_names: Vec<String>,
    /// District, enrollment and grade level of the host school, when the sheet has them.
    pub school: Option<SchoolContext>,
}

impl WorkshopGap {
    pub fn leader_needed(&self) -> bool {
        self.status.leader_needed()
    }

    /// `Nov 3, 2025 – Jan 14, 2026`, or whichever side is present.
    pub fn date_range(&self) -> String {
        match (self.start_date.is_empty(), self.end_date.is_empty()) {
            (false, false) => format!("{} \u{2013} {}", self.start_date, self.end_date),
            (false, true) => self.start_date.clone(),
            (true, false) => self.end_date.clone(),
            (true, true) => String::new(),
        }
    }
}

/// Dedup identity of a match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MatchKey {
    pub candidate_id: String,
    pub workshop_id: String,
}

impl MatchKey {
    pub const SEPARATOR: &'static str = "::";

    pub fn new(candidate_id: &str, workshop_id: &str) -> Self {
        Self {
            candidate_id: candidate_id.to_string(),
            workshop_id: workshop_id.to_string(),
        }
    }

    /// Parse `candidate::workshop`. Inside the candidate part `:` and `\` are
    /// backslash-escaped, so the first unescaped `::` splits the key.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut candidate_id = String::new();
        let mut chars = raw.char_indices();
        while let Some((i, ch)) = chars.next() {
            match ch {
                '\\' => candidate_id.push(chars.next()?.1),
                ':' if raw[i + 1..].starts_with(':') => {
                    let workshop_id = &raw[i + 2..];
                    if candidate_id.is_empty() || workshop_id.is_empty() {
                        return None;
                    }
                    return Some(Self {
                        candidate_id,
                        workshop_id: workshop_id.to_string(),
                    });
                }
                c => candidate_id.push(c),
            }
        }
        None
    }
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut candidate = String::with_capacity(self.candidate_id.len());
        for ch in self.candidate_id.chars() {
            if matches!(ch, '\\' | ':') {
                candidate.push('\\');
            }
            candidate.push(ch);
        }
        write!(f, "{candidate}{}{}", Self::SEPARATOR, self.workshop_id)
    }
}

/// A candidate paired with a workshop gap in the same region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub candidate: Candidate,
    pub gap: WorkshopGap,
    pub region: RegionCode,
    pub map_link: String,
}

impl Match {
    pub fn key(&self) -> MatchKey {
        MatchKey::new(&self.candidate.id, &self.gap.id)
    }
}

/// A persisted "already notified" record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub candidate_id: String,
    pub workshop_id: String,
    pub notified_at: DateTime<Utc>,
}
