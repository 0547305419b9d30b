//! End-of-run report: counts plus every non-fatal issue.

use gapmatch_core::error::GapMatchError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    MatchNotify,
    Digest,
}

impl RunMode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::MatchNotify => "match+notify",
            Self::Digest => "digest",
        }
    }
}

#[derive(Debug)]
pub struct RunSummary {
    pub run_id: String,
    pub mode: RunMode,
    pub dry_run: bool,
    pub candidates: usize,
    pub gaps: usize,
    pub matches: usize,
    pub new_matches: usize,
    pub messages_sent: usize,
    pub recorded: usize,
    pub email_sent: bool,
    pub sheet_rows: Option<usize>,
    /// Non-fatal problems: normalization misses and sink failures.
    pub issues: Vec<GapMatchError>,
    /// Rendered output that a dry run would have sent.
    pub preview: Vec<String>,
}

impl RunSummary {
    pub fn new(mode: RunMode, dry_run: bool) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            mode,
            dry_run,
            candidates: 0,
            gaps: 0,
            matches: 0,
            new_matches: 0,
            messages_sent: 0,
            recorded: 0,
            email_sent: false,
            sheet_rows: None,
            issues: Vec::new(),
            preview: Vec::new(),
        }
    }

    pub fn push_issue(&mut self, issue: GapMatchError) {
        debug_assert!(!issue.is_fatal());
        self.issues.push(issue);
    }

    pub fn misses(&self) -> usize {
        self.issues
            .iter()
            .filter(|e| matches!(e, GapMatchError::NormalizationMiss(_)))
            .count()
    }

    pub fn sink_failures(&self) -> usize {
        self.issues
            .iter()
            .filter(|e| matches!(e, GapMatchError::Sink { .. }))
            .count()
    }

    pub fn log(&self) {
        tracing::info!(
            "🏁 Run {} ({}) done: {} match(es), {} new, {} message(s), {} issue(s)",
            self.run_id,
            self.mode.label(),
            self.matches,
            self.new_matches,
            self.messages_sent,
            self.issues.len()
        );
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dry = if self.dry_run { " [dry run]" } else { "" };
        writeln!(f, "gapmatch {} run {}{dry}", self.mode.label(), self.run_id)?;
        writeln!(
            f,
            "  candidates: {}  gaps: {}  matches: {}  new: {}",
            self.candidates, self.gaps, self.matches, self.new_matches
        )?;
        if !self.dry_run {
            let sheet = self
                .sheet_rows
                .map(|n| n.to_string())
                .unwrap_or_else(|| "not written".into());
            writeln!(
                f,
                "  chat messages: {}  ledger records: {}  email: {}  sheet rows: {sheet}",
                self.messages_sent,
                self.recorded,
                if self.email_sent { "sent" } else { "not sent" },
            )?;
        }
        if !self.issues.is_empty() {
            writeln!(
                f,
                "  issues: {} ({} normalization miss(es), {} sink failure(s))",
                self.issues.len(),
                self.misses(),
                self.sink_failures()
            )?;
            for issue in &self.issues {
                writeln!(f, "    - {issue}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_counts_and_render() {
        let mut s = RunSummary::new(RunMode::MatchNotify, false);
        s.matches = 3;
        s.push_issue(GapMatchError::NormalizationMiss("candidate Bea (b): 'Nowhereville'".into()));
        s.push_issue(GapMatchError::sink("email", "SMTP send: timeout"));
        assert_eq!(s.misses(), 1);
        assert_eq!(s.sink_failures(), 1);

        let text = s.to_string();
        assert!(text.contains("matches: 3"));
        assert!(text.contains("sheet rows: not written"));
        assert!(text.contains("No region for candidate Bea (b): 'Nowhereville'"));
        assert!(text.contains("Sink 'email' failed: SMTP send: timeout"));
    }

    #[test]
    fn test_dry_run_render_omits_delivery_line() {
        let s = RunSummary::new(RunMode::Digest, true);
        let text = s.to_string();
        assert!(text.contains("[dry run]"));
        assert!(!text.contains("chat messages"));
        assert_eq!(s.run_id.len(), 36);
    }
}
