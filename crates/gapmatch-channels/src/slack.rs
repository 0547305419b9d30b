//! Slack chat sink. One `chat.postMessage` per candidate.

use async_trait::async_trait;
use gapmatch_core::config::SlackConfig;
use gapmatch_core::error::{GapMatchError, Result};
use gapmatch_core::traits::ChatSink;
use gapmatch_core::types::{Candidate, Match};
use serde_json::{Value, json};

const SLACK_POST_URL: &str = "https://slack.com/api/chat.postMessage";

pub struct SlackChatSink {
    http: reqwest::Client,
    config: SlackConfig,
}

impl SlackChatSink {
    pub fn new(config: SlackConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl ChatSink for SlackChatSink {
    fn name(&self) -> &str {
        "slack"
    }

    async fn post(&self, text: &str) -> Result<()> {
        let resp = self
            .http
            .post(SLACK_POST_URL)
            .bearer_auth(&self.config.bot_token)
            .json(&json!({
                "channel": self.config.channel,
                "text": text,
                "unfurl_links": false,
            }))
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| GapMatchError::sink("slack", e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GapMatchError::sink("slack", format!("{status}: {body}")));
        }

        // Slack reports API errors with HTTP 200 and `ok: false`.
        let body: Value = resp.json().await.map_err(|e| GapMatchError::sink("slack", e))?;
        if body["ok"].as_bool() != Some(true) {
            let reason = body["error"].as_str().unwrap_or("unknown error");
            return Err(GapMatchError::sink("slack", reason));
        }
        tracing::debug!("✅ Slack message posted to #{}", self.config.channel);
        Ok(())
    }
}

/// Matches grouped by candidate, in the order candidates first appear.
pub fn group_by_candidate(matches: &[Match]) -> Vec<(&Candidate, Vec<&Match>)> {
    let mut groups: Vec<(&Candidate, Vec<&Match>)> = Vec::new();
    for m in matches {
        match groups.iter_mut().find(|(c, _)| c.id == m.candidate.id) {
            Some((_, list)) => list.push(m),
            None => groups.push((&m.candidate, vec![m])),
        }
    }
    groups
}

/// Slack mrkdwn body for one candidate and their matched workshops.
pub fn format_match_message(candidate: &Candidate, matches: &[&Match]) -> String {
    let email = candidate.email.as_deref().unwrap_or("(no email on file)");
    let location = if candidate.location.is_empty() {
        "(none)"
    } else {
        candidate.location.as_str()
    };

    let mut out = String::from("*Gap Match Found*\n\n");
    out.push_str(&format!("*Candidate:* {}\n", escape(&candidate.name)));
    out.push_str(&format!("*Email:* {}\n", escape(email)));
    out.push_str(&format!("*Pipeline Status:* {}\n", candidate.stage.label()));
    out.push_str(&format!("*Location(s):* {}\n", escape(location)));
    let mut regions: Vec<&str> = matches.iter().map(|m| m.region.as_str()).collect();
    regions.sort_unstable();
    regions.dedup();
    if !regions.is_empty() {
        out.push_str(&format!("*Region:* {}\n", regions.join(", ")));
    }
    if let Some(school) = candidate.school.as_ref().filter(|s| !s.is_empty()) {
        out.push_str(&format!("*School:* {}\n", escape(&school.summary())));
    }

    out.push_str("\n*Open Workshop Gap(s):*\n");
    for m in matches {
        let gap = &m.gap;
        let dates = match gap.date_range() {
            range if range.is_empty() => String::new(),
            range => format!("  |  {range}"),
        };
        let tentative = if gap.tentative_names.is_empty() {
            String::new()
        } else {
            format!(" (tentative: {})", escape(&gap.tentative_names.join(", ")))
        };
        out.push_str(&format!(
            "  \u{2022} {} @ {} \u{2014} {}s {}{}  [{}]{}\n    <{}|\u{1f4cd} Map>\n",
            escape(&gap.name),
            escape(&gap.site),
            escape(&gap.day),
            escape(&gap.time),
            escape(&dates),
            gap.status.label(),
            tentative,
            m.map_link,
        ));
    }

    out.push_str("\n\u{27a1}\u{fe0f} *Draft Email:*\n```\n");
    out.push_str(&draft_email(candidate, matches));
    out.push_str("\n```");
    out
}

/// Ready-to-send outreach text for the recruiter.
fn draft_email(candidate: &Candidate, matches: &[&Match]) -> String {
    let first_name = candidate.name.split_whitespace().next().unwrap_or("there");
    let workshops: Vec<String> = matches
        .iter()
        .map(|m| {
            let g = &m.gap;
            format!(
                "  - {} at {} - {}s {} ({} to {})",
                g.name, g.site, g.day, g.time, g.start_date, g.end_date
            )
        })
        .collect();

    format!(
        "Subject: Workshop Opportunity at Kodely\n\n\
         Hi {first_name},\n\n\
         We have an opening for a workshop leader and think you'd be a great fit! \
         Here are the available workshops in your area:\n\n\
         {}\n\n\
         Would any of these work for your schedule? Let us know and we can get \
         the offer process started.\n\n\
         Best,\nKodely Ops Team",
        workshops.join("\n")
    )
}

/// Slack control characters.
fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
