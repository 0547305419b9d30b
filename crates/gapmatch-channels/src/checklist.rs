//! Per-gap action checklist for the digest: what to fill, who already
//! matched, and three ready-to-send outreach texts.

use chrono::{Datelike, NaiveDate};
use gapmatch_core::types::{SlotStatus, WorkshopGap};

use crate::digest::{GapEntry, escape};

pub const TALENT_INBOX: &str = "talent@kodely.io";

const STEPS: [&str; 5] = [
    "Email the matched pipeline candidates listed above",
    "Email existing leaders (template 1)",
    "Post the campaign (template 3) in the evening, follow up the next day",
    "Send the BCC mass email (template 2) to the broader list",
    "Check responses and confirm placements",
];

/// Hiring season a digest date falls in, e.g. `Winter/Spring 2026`.
pub fn season_label(today: NaiveDate) -> String {
    let season = match today.month() {
        1..=5 => "Winter/Spring",
        6..=8 => "Summer",
        _ => "Fall",
    };
    format!("{season} {}", today.year())
}

/// Every gap, region by region in digest order, numbered across the whole digest.
pub(crate) fn render_checklist(regions: &[(String, Vec<GapEntry>)], season: &str) -> String {
    if regions.is_empty() {
        return String::new();
    }

    let mut html = String::from(
        "<h1 style=\"color:#c0392b;margin-top:48px;border-bottom:3px solid #c0392b;padding-bottom:6px\">\
         Action Checklist &amp; Ready-to-Send Templates</h1>\
         <p style=\"color:#666\">For each gap: expand a template, copy it, send it. Work the steps in order.</p>",
    );

    let mut number = 0;
    for (region, list) in regions {
        html.push_str(&format!(
            "<h2 style=\"color:#333;border-bottom:2px solid #455a64;padding-bottom:4px;margin-top:32px\">\
             {} &mdash; Action Checklist ({} gap{})</h2>",
            escape(region),
            list.len(),
            if list.len() == 1 { "" } else { "s" },
        ));
        for entry in list {
            number += 1;
            html.push_str(&gap_card(number, region, entry, season));
        }
    }
    html
}

fn gap_card(number: usize, region: &str, entry: &GapEntry, season: &str) -> String {
    let gap = entry.gap;
    let border = match gap.status {
        SlotStatus::Empty => "#c0392b",
        _ => "#e67e22",
    };

    let matched = if entry.candidates.is_empty() {
        r#"<span style="color:#c0392b;font-weight:bold">0 candidates: recruiting needed</span>"#
            .to_string()
    } else {
        let names: String = entry
            .candidates
            .iter()
            .map(|c| {
                format!(
                    r#"<div style="padding:3px 0"><b>{}</b> &middot; {} <span style="color:#888;font-size:11px">[{}]</span></div>"#,
                    escape(&c.name),
                    escape(c.email.as_deref().unwrap_or("(none)")),
                    c.stage.label(),
                )
            })
            .collect();
        format!(
            r#"<span style="color:#2e7d32;font-weight:bold">{} candidate{} matched</span><div style="padding-left:8px">{names}</div>"#,
            entry.candidates.len(),
            if entry.candidates.len() == 1 { "" } else { "s" },
        )
    };

    let steps: String = STEPS
        .iter()
        .enumerate()
        .map(|(i, step)| format!("<b>Step {}:</b> {step}<br>", i + 1))
        .collect();

    format!(
        "<div style=\"border:2px solid {border};border-radius:8px;padding:16px;margin-bottom:20px\">\
         <div style=\"margin-bottom:10px\"><span style=\"font-size:16px;font-weight:bold\">Gap #{number}: {site}</span> \
         <span style=\"color:{border};font-weight:bold;font-size:13px\">{status}</span></div>\
         <div style=\"background:#f5f5f5;padding:10px;border-radius:4px;margin-bottom:12px;font-size:13px\">\
         <b>Location (copy-paste):</b> {location}<br>\
         <b>Program:</b> {program}<br>\
         <b>Day/Time:</b> {day}s, {time}<br>\
         <b>Dates:</b> {dates}</div>\
         <div style=\"margin-bottom:12px\"><b>Matched Candidates:</b> {matched}</div>\
         <h4 style=\"margin:12px 0 4px;color:#333\">STEP-BY-STEP CHECKLIST</h4>\
         <div style=\"background:#fff8e1;padding:10px;border-radius:4px;margin-bottom:12px;font-size:13px\">{steps}</div>\
         {leaders}{bcc}{campaign}</div>",
        site = escape(&gap.site),
        status = gap.status.label(),
        location = escape(&location_line(gap, region)),
        program = escape(&program(gap)),
        day = escape(&gap.day),
        time = escape(&gap.time),
        dates = escape(&gap.date_range()),
        leaders = template(
            "&#x2709; Template 1: Email to Existing Leaders",
            "#2e7d32",
            "#f1f8e9",
            &leader_email(gap, region, season),
        ),
        bcc = template(
            "&#x2709; Template 2: BCC Mass Email",
            "#1565c0",
            "#e3f2fd",
            &bcc_email(gap, region, season),
        ),
        campaign = template(
            "&#x1f4e2; Template 3: Campaign Post",
            "#e65100",
            "#fff3e0",
            &campaign_post(gap, region, season),
        ),
    )
}

fn template(title: &str, color: &str, background: &str, text: &str) -> String {
    format!(
        "<details style=\"margin-bottom:8px\"><summary style=\"color:{color};font-weight:bold;padding:6px 0\">{title}</summary>\
         <div style=\"background:{background};border:1px solid #ddd;border-radius:4px;padding:12px;margin-top:6px;\
         font-size:12px;line-height:1.6;white-space:pre-wrap;font-family:monospace\">{}</div></details>",
        escape(text)
    )
}

/// `Rooftop Elementary, SF (SFUSD)`
fn location_line(gap: &WorkshopGap, region: &str) -> String {
    let mut line = format!("{}, {region}", gap.site);
    if let Some(district) = gap.school.as_ref().and_then(|s| s.district.as_deref()) {
        line.push_str(&format!(" ({district})"));
    }
    line
}

fn program(gap: &WorkshopGap) -> String {
    match gap.school.as_ref().and_then(|s| s.grade_level.as_deref()) {
        Some(level) => format!("{} (Grades {level})", gap.name),
        None => gap.name.clone(),
    }
}

/// The role description shared by every template.
fn role_block(gap: &WorkshopGap) -> String {
    format!(
        "{} ({}s)\nProgram: {}\nTime: {}\nDates: {}",
        gap.site,
        gap.day,
        program(gap),
        gap.time,
        gap.date_range()
    )
}

fn leader_email(gap: &WorkshopGap, region: &str, season: &str) -> String {
    let district = gap
        .school
        .as_ref()
        .and_then(|s| s.district.as_deref())
        .map(|d| format!(", {d}"))
        .unwrap_or_default();
    format!(
        "Hello,\n\n\
         We're staffing an in-person after-school role in {region}{district} for {season} \
         and are reaching out to existing Kodely instructors first.\n\n\
         This is a commitment-based placement. Please only respond if you can attend every \
         session, arrive on time, and lead an elementary group independently.\n\n\
         Available Placement: {region}\n{}\n\n\
         Requirements\n\
         \u{2022} Prior experience teaching elementary-aged students\n\
         \u{2022} Strong classroom management\n\
         \u{2022} Reliable transportation and on-time arrival\n\
         \u{2022} Full-session commitment\n\n\
         Accepting a role and later dropping it removes you from future Kodely placements.\n\n\
         Reply to confirm you can commit to all dates and times, and we'll confirm the match.",
        role_block(gap)
    )
}

fn bcc_email(gap: &WorkshopGap, region: &str, season: &str) -> String {
    format!(
        "SUBJECT: {region} After-School Instructors Needed ({season})\n\n\
         We're Kodely, an enrichment partner delivering after-school programs in STEM, \
         entrepreneurship, and creative learning.\n\n\
         We're staffing in-person after-school teaching roles in {region} for {season}. \
         These roles are commitment-based and need instructors with experience teaching \
         elementary-aged students.\n\n\
         Open Role: {region}\n{}\n\n\
         What We're Looking For\n\
         \u{2022} Prior teaching experience with elementary-aged children\n\
         \u{2022} Strong classroom management and student engagement\n\
         \u{2022} Reliable transportation and on-time arrival\n\
         \u{2022} Ability to commit to the full session\n\n\
         If a role is accepted and later dropped, the instructor is removed from future placements.\n\n\
         Only reply if you can fully commit to the dates, times and location. \
         We'll follow up to schedule an interview.",
        role_block(gap)
    )
}

fn campaign_post(gap: &WorkshopGap, region: &str, season: &str) -> String {
    format!(
        "SUBJECT: KODELY {region} AFTER SCHOOL HIRING\n\n\
         We're Kodely, a hands-on enrichment partner running after-school programs in STEM, \
         entrepreneurship, and creative learning.\n\n\
         We're staffing in-person after-school teaching roles in {region} for {season}. \
         Do not apply if you cannot commit to all session dates and the exact times listed.\n\n\
         Open Role: {region}\n{}\n\n\
         Requirements\n\
         \u{2022} Prior teaching experience with elementary-aged children\n\
         \u{2022} Strong classroom management\n\
         \u{2022} Reliable transportation and on-time arrival\n\
         \u{2022} Full-session commitment\n\n\
         Interested? Email {TALENT_INBOX} with the subject line: {region} HIRING\n\
         Include the role(s) you are available for, confirmation that you can attend every \
         listed date and time, your resume, and whether you require CPT/OPT.",
        role_block(gap)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_season_label() {
        let d = |m| NaiveDate::from_ymd_opt(2026, m, 1).unwrap();
        assert_eq!(season_label(d(1)), "Winter/Spring 2026");
        assert_eq!(season_label(d(7)), "Summer 2026");
        assert_eq!(season_label(d(10)), "Fall 2026");
    }
}
