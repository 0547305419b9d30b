//! Gap matcher: pairs every candidate with every leader-needed gap in the
//! same region. Not an assignment; humans pick among the suggestions.

use gapmatch_core::types::{Candidate, Match, RegionCode, WorkshopGap};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

const MAPS_SEARCH_URL: &str = "https://www.google.com/maps/search/?api=1&query=";

/// Stateless matcher with an optional single-region restriction.
#[derive(Debug, Clone, Default)]
pub struct GapMatcher {
    region: Option<RegionCode>,
}

impl GapMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict both inputs to one region before matching.
    pub fn for_region(region: RegionCode) -> Self {
        Self {
            region: Some(region),
        }
    }

    pub fn region(&self) -> Option<&RegionCode> {
        self.region.as_ref()
    }

    /// All `(candidate, gap)` pairs sharing a region, each identity exactly once.
    ///
    /// Output is ordered by region, workshop start date (undated last),
    /// candidate name, then ids.
    pub fn find_matches(&self, candidates: &[Candidate], gaps: &[WorkshopGap]) -> Vec<Match> {
        let mut by_region: BTreeMap<&RegionCode, Vec<&WorkshopGap>> = BTreeMap::new();
        for gap in gaps.iter().filter(|g| g.leader_needed()) {
            if let Some(region) = gap.region.as_ref().filter(|r| self.allows(r)) {
                by_region.entry(region).or_default().push(gap);
            }
        }

        let mut seen = HashSet::new();
        let mut matches = Vec::new();
        for candidate in candidates {
            for region in candidate.regions.iter().filter(|r| self.allows(r)) {
                let Some(region_gaps) = by_region.get(region) else {
                    continue;
                };
                for gap in region_gaps {
                    if !seen.insert((candidate.id.as_str(), gap.id.as_str())) {
                        continue;
                    }
                    matches.push(Match {
                        candidate: candidate.clone(),
                        gap: (*gap).clone(),
                        region: region.clone(),
                        map_link: map_link(gap),
                    });
                }
            }
        }

        matches.sort_by(compare_matches);
        tracing::info!(
            "🔗 {} match(es) across {} region(s)",
            matches.len(),
            by_region.len()
        );
        matches
    }

    fn allows(&self, region: &RegionCode) -> bool {
        self.region.as_ref().is_none_or(|only| only == region)
    }
}

fn compare_matches(a: &Match, b: &Match) -> Ordering {
    a.region
        .cmp(&b.region)
        .then_with(|| compare_dates(a, b))
        .then_with(|| {
            a.candidate
                .name
                .to_lowercase()
                .cmp(&b.candidate.name.to_lowercase())
        })
        .then_with(|| a.candidate.name.cmp(&b.candidate.name))
        .then_with(|| a.gap.id.cmp(&b.gap.id))
        .then_with(|| a.candidate.id.cmp(&b.candidate.id))
}

/// Dated workshops first, earliest first.
fn compare_dates(a: &Match, b: &Match) -> Ordering {
    match (a.gap.date, b.gap.date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Google Maps search link for the workshop site within its region.
pub fn map_link(gap: &WorkshopGap) -> String {
    let query = match (gap.site.trim(), gap.location.trim()) {
        ("", loc) => loc.to_string(),
        (site, "") => site.to_string(),
        (site, loc) => format!("{site}, {loc}"),
    };
    format!("{MAPS_SEARCH_URL}{}", urlencoding::encode(&query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use gapmatch_core::types::{PipelineStage, SlotStatus};

    fn candidate(id: &str, name: &str, region: Option<&str>) -> Candidate {
        Candidate {
            id: id.into(),
            name: name.into(),
            email: None,
            stage: PipelineStage::TalentScreen,
            location: region.unwrap_or("Nowhereville").into(),
            regions: region.map(RegionCode::new).into_iter().collect(),
            school: None,
        }
    }

    fn gap(id: &str, region: Option<&str>, date: Option<(i32, u32, u32)>, status: SlotStatus) -> WorkshopGap {
        WorkshopGap {
            id: id.into(),
            name: format!("Lesson {id}"),
            site: format!("Site {id}"),
            day: "Monday".into(),
            time: "3:00-4:00".into(),
            date: date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            start_date: String::new(),
            end_date: String::new(),
            location: region.unwrap_or("").into(),
            region: region.map(RegionCode::new),
            status,
            tentative_names: Vec::new(),
            school: None,
        }
    }

    fn keys(matches: &[Match]) -> Vec<(String, String)> {
        matches
            .iter()
            .map(|m| (m.candidate.id.clone(), m.gap.id.clone()))
            .collect()
    }

    #[test]
    fn test_full_pairing_within_region() {
        let candidates = vec![
            candidate("c1", "Ana", Some("SF")),
            candidate("c2", "Ben", Some("SF")),
            candidate("c3", "Cy", Some("LA")),
        ];
        let gaps = vec![
            gap("w1", Some("SF"), Some((2026, 1, 10)), SlotStatus::Empty),
            gap("w2", Some("SF"), Some((2026, 1, 5)), SlotStatus::Tentative),
            gap("w3", Some("LA"), None, SlotStatus::Empty),
        ];

        let matches = GapMatcher::new().find_matches(&candidates, &gaps);
        assert_eq!(
            keys(&matches),
            vec![
                ("c3".into(), "w3".into()),
                ("c1".into(), "w2".into()),
                ("c2".into(), "w2".into()),
                ("c1".into(), "w1".into()),
                ("c2".into(), "w1".into()),
            ]
        );
    }

    #[test]
    fn test_filled_gaps_are_skipped() {
        let candidates = vec![candidate("c1", "Ana", Some("SF"))];
        let gaps = vec![gap("w1", Some("SF"), None, SlotStatus::Filled)];
        assert!(GapMatcher::new().find_matches(&candidates, &gaps).is_empty());
    }

    #[test]
    fn test_unknown_region_never_matches() {
        let candidates = vec![candidate("b", "Bea", None)];
        let gaps = vec![
            gap("w1", None, None, SlotStatus::Empty),
            gap("w2", Some("SF"), None, SlotStatus::Empty),
        ];
        assert!(GapMatcher::new().find_matches(&candidates, &gaps).is_empty());
    }

    #[test]
    fn test_duplicate_inputs_yield_pair_once() {
        let candidates = vec![
            candidate("c1", "Ana", Some("SF")),
            candidate("c1", "Ana", Some("SF")),
        ];
        let gaps = vec![
            gap("w1", Some("SF"), None, SlotStatus::Empty),
            gap("w1", Some("SF"), None, SlotStatus::Empty),
        ];
        let matches = GapMatcher::new().find_matches(&candidates, &gaps);
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn test_deterministic_ordering() {
        let candidates = vec![
            candidate("c2", "zoe", Some("SF")),
            candidate("c1", "Adam", Some("SF")),
            candidate("c3", "maya", Some("LA")),
        ];
        let gaps = vec![
            gap("w2", Some("SF"), None, SlotStatus::Empty),
            gap("w1", Some("SF"), Some((2026, 2, 1)), SlotStatus::Empty),
            gap("w3", Some("LA"), Some((2026, 3, 1)), SlotStatus::Empty),
        ];
        let first = GapMatcher::new().find_matches(&candidates, &gaps);

        let mut reversed_c = candidates.clone();
        reversed_c.reverse();
        let mut reversed_g = gaps.clone();
        reversed_g.reverse();
        let second = GapMatcher::new().find_matches(&reversed_c, &reversed_g);

        assert_eq!(keys(&first), keys(&second));
        assert_eq!(first[0].region.as_str(), "LA");
        assert_eq!(first[1].candidate.name, "Adam");
        assert_eq!(first[1].gap.id, "w1");
    }

    #[test]
    fn test_region_filter() {
        let candidates = vec![
            candidate("c1", "Ana", Some("SF")),
            candidate("c2", "Ben", Some("LA")),
        ];
        let gaps = vec![
            gap("w1", Some("SF"), None, SlotStatus::Empty),
            gap("w2", Some("LA"), None, SlotStatus::Empty),
        ];
        let matches = GapMatcher::for_region(RegionCode::new("sf")).find_matches(&candidates, &gaps);
        assert_eq!(keys(&matches), vec![("c1".into(), "w1".into())]);
        assert!(matches.iter().all(|m| m.region.as_str() == "SF"));
    }

    #[test]
    fn test_candidate_in_several_regions_matches_each() {
        let mut both = candidate("c1", "Ana", Some("LA"));
        both.regions.push(RegionCode::new("SF"));
        let gaps = vec![
            gap("w1", Some("SF"), None, SlotStatus::Empty),
            gap("w2", Some("LA"), None, SlotStatus::Tentative),
            gap("w3", Some("NYC"), None, SlotStatus::Empty),
        ];

        let matches = GapMatcher::new().find_matches(&[both.clone()], &gaps);
        assert_eq!(
            keys(&matches),
            vec![("c1".into(), "w2".into()), ("c1".into(), "w1".into())]
        );
        assert_eq!(matches[0].region.as_str(), "LA");
        assert_eq!(matches[1].region.as_str(), "SF");

        let only_sf = GapMatcher::for_region(RegionCode::new("SF")).find_matches(&[both], &gaps);
        assert_eq!(keys(&only_sf), vec![("c1".into(), "w1".into())]);
    }

    #[test]
    fn test_map_link_encodes_site_and_region() {
        let g = gap("w1", Some("SF"), None, SlotStatus::Empty);
        assert_eq!(
            map_link(&g),
            "https://www.google.com/maps/search/?api=1&query=Site%20w1%2C%20SF"
        );
    }
}
