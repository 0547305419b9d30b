//! HTML digest: gap-centric tables per region, a candidate roster and the
//! per-gap action checklist.

use chrono::NaiveDate;
use gapmatch_core::types::{Candidate, Match, SlotStatus, WorkshopGap};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use crate::checklist::{render_checklist, season_label};

const TD: &str = r#"style="padding:8px;border:1px solid #ddd;vertical-align:top""#;
const TH: &str = r#"style="padding:8px;border:1px solid #ddd;text-align:left""#;
const UNMAPPED: &str = "UNMAPPED";

pub(crate) struct GapEntry<'a> {
    pub(crate) gap: &'a WorkshopGap,
    pub(crate) map_link: Option<&'a str>,
    pub(crate) candidates: Vec<&'a Candidate>,
}

/// Render the digest for `matches`. Gaps in `gaps` without any match are
/// listed too, so the digest shows every open slot.
pub fn render_digest_html(matches: &[Match], gaps: &[WorkshopGap], today: NaiveDate) -> String {
    let mut entries: BTreeMap<&str, GapEntry> = BTreeMap::new();
    for gap in gaps.iter().filter(|g| g.leader_needed()) {
        entries.entry(gap.id.as_str()).or_insert(GapEntry {
            gap,
            map_link: None,
            candidates: Vec::new(),
        });
    }
    for m in matches {
        let entry = entries.entry(m.gap.id.as_str()).or_insert(GapEntry {
            gap: &m.gap,
            map_link: None,
            candidates: Vec::new(),
        });
        entry.map_link = Some(m.map_link.as_str());
        if !entry.candidates.iter().any(|c| c.id == m.candidate.id) {
            entry.candidates.push(&m.candidate);
        }
    }

    let mut by_region: BTreeMap<String, Vec<GapEntry>> = BTreeMap::new();
    for entry in entries.into_values() {
        by_region.entry(region_label(entry.gap)).or_default().push(entry);
    }
    let mut regions: Vec<(String, Vec<GapEntry>)> = by_region.into_iter().collect();
    regions.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then_with(|| a.0.cmp(&b.0)));
    for (_, list) in regions.iter_mut() {
        list.sort_by(|a, b| urgency(a.gap, b.gap));
    }

    let total_gaps: usize = regions.iter().map(|(_, l)| l.len()).sum();
    let candidate_count = matches
        .iter()
        .map(|m| m.candidate.id.as_str())
        .collect::<HashSet<_>>()
        .len();

    let mut html = String::new();
    html.push_str(r#"<html><body style="font-family:Arial,sans-serif;color:#222">"#);
    html.push_str(&format!(
        "<h1 style=\"color:#4a90d9\">Gap Match Digest</h1>\
         <p style=\"color:#666\">{} &middot; {total_gaps} open gap{} &middot; {candidate_count} matched candidate{}</p>",
        today.format("%B %d, %Y"),
        plural(total_gaps),
        plural(candidate_count),
    ));

    let heat: Vec<String> = regions
        .iter()
        .map(|(r, l)| format!("{}: {} gap{}", escape(r), l.len(), plural(l.len())))
        .collect();
    if !heat.is_empty() {
        html.push_str(&format!("<p><b>{}</b></p>", heat.join(" &nbsp;|&nbsp; ")));
    }
    if matches.is_empty() {
        html.push_str(
            r#"<p style="color:#999;font-style:italic">No candidate matches found for current gaps.</p>"#,
        );
    }

    for (region, list) in &regions {
        html.push_str(&region_table(region, list));
    }

    html.push_str(r#"<h2 style="color:#333;margin-top:32px">Candidate Roster</h2>"#);
    for (region, list) in &regions {
        html.push_str(&roster_table(region, list));
    }

    html.push_str(&render_checklist(&regions, &season_label(today)));
    html.push_str("</body></html>");
    html
}

fn region_table(region: &str, list: &[GapEntry]) -> String {
    let mut rows = String::new();
    for entry in list {
        let gap = entry.gap;
        let map = entry
            .map_link
            .map(|link| {
                format!(
                    r#" <a href="{}" style="font-size:11px">&#x1f4cd; Map</a>"#,
                    escape(link)
                )
            })
            .unwrap_or_default();
        let color = match gap.status {
            SlotStatus::Empty => "#c0392b",
            _ => "#e67e22",
        };
        let mut status = format!(
            r#"<span style="color:{color};font-weight:bold">{}</span>"#,
            gap.status.label()
        );
        if !gap.tentative_names.is_empty() {
            status.push_str(&format!(
                r#"<br><span style="font-size:11px;color:#999">{}</span>"#,
                escape(&gap.tentative_names.join(", "))
            ));
        }
        let candidates = if entry.candidates.is_empty() {
            r#"<span style="color:#999">No matches</span>"#.to_string()
        } else {
            entry
                .candidates
                .iter()
                .map(|c| {
                    let email = c
                        .email
                        .as_deref()
                        .map(|e| format!(" &lt;{}&gt;", escape(e)))
                        .unwrap_or_default();
                    format!(
                        r#"{}{email} <span style="font-size:11px;color:#888">[{}]</span>"#,
                        escape(&c.name),
                        c.stage.label()
                    )
                })
                .collect::<Vec<_>>()
                .join("<br>")
        };

        rows.push_str(&format!(
            "<tr><td {TD}>{}{map}</td><td {TD}>{}<br>{}s {}<br>{}</td><td {TD}>{}</td><td {TD}>{status}</td><td {TD}>{candidates}</td></tr>",
            escape(&gap.site),
            escape(&gap.name),
            escape(&gap.day),
            escape(&gap.time),
            escape(&gap.date_range()),
            school_info(gap),
        ));
    }

    format!(
        "<h2 style=\"color:#333;border-bottom:2px solid #4a90d9;padding-bottom:4px\">{} \
         <span style=\"font-size:14px;color:#888\">({} gap{})</span></h2>\
         <table style=\"border-collapse:collapse;width:100%;margin-bottom:24px\">\
         <tr style=\"background:#4a90d9;color:#fff\"><th {TH}>Site</th><th {TH}>Workshop Details</th>\
         <th {TH}>School Info</th><th {TH}>Gap Type</th><th {TH}>Available Candidates</th></tr>{rows}</table>",
        escape(region),
        list.len(),
        plural(list.len()),
    )
}

/// Unique candidates matched anywhere in the region, by name.
fn roster_table(region: &str, list: &[GapEntry]) -> String {
    let mut seen = HashSet::new();
    let mut candidates: Vec<&Candidate> = list
        .iter()
        .flat_map(|e| e.candidates.iter().copied())
        .filter(|c| seen.insert(c.id.as_str()))
        .collect();
    if candidates.is_empty() {
        return String::new();
    }
    candidates.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.id.cmp(&b.id))
    });

    let rows: String = candidates
        .iter()
        .map(|c| {
            let school = c
                .school
                .as_ref()
                .map(|s| escape(&s.summary()))
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "&mdash;".into());
            format!(
                "<tr><td {TD}><b>{}</b></td><td {TD}>{}</td><td {TD}>{}</td><td {TD}>{school}</td></tr>",
                escape(&c.name),
                escape(c.email.as_deref().unwrap_or("(none)")),
                c.stage.label(),
            )
        })
        .collect();

    format!(
        "<h3 style=\"margin-top:16px\">{} &mdash; {} candidate{}</h3>\
         <table style=\"border-collapse:collapse;width:100%;margin-bottom:12px\">\
         <tr style=\"background:#607d8b;color:#fff\"><th {TH}>Name</th><th {TH}>Email</th>\
         <th {TH}>Stage</th><th {TH}>School</th></tr>{rows}</table>",
        escape(region),
        candidates.len(),
        plural(candidates.len()),
    )
}

/// Host school details, one per line.
fn school_info(gap: &WorkshopGap) -> String {
    let Some(school) = gap.school.as_ref() else {
        return "&mdash;".into();
    };
    let mut lines = Vec::new();
    if let Some(d) = &school.district {
        lines.push(format!("District: {}", escape(d)));
    }
    if let Some(n) = school.enrollment {
        lines.push(format!("Enrollment: {n}"));
    }
    if let Some(l) = &school.grade_level {
        lines.push(format!("Level: {}", escape(l)));
    }
    if lines.is_empty() {
        "&mdash;".into()
    } else {
        lines.join("<br>")
    }
}

fn region_label(gap: &WorkshopGap) -> String {
    match (&gap.region, gap.location.trim()) {
        (Some(code), _) => code.as_str().to_string(),
        (None, "") => UNMAPPED.to_string(),
        (None, raw) => raw.to_uppercase(),
    }
}

/// Open slots before tentative ones, then earliest start.
fn urgency(a: &WorkshopGap, b: &WorkshopGap) -> Ordering {
    let rank = |g: &WorkshopGap| match g.status {
        SlotStatus::Empty => 0,
        SlotStatus::Tentative => 1,
        SlotStatus::Filled => 2,
    };
    rank(a)
        .cmp(&rank(b))
        .then_with(|| match (a.date, b.date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.id.cmp(&b.id))
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
