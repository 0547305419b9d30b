//! One batch pass: read, normalize, match, dedup, fan out, record.
//!
//! Ordering guarantees:
//! - the ledger is loaded before any source or sink is touched, so a corrupt
//!   ledger aborts with zero notifications
//! - source failures abort before matching; no partial match sets
//! - a pair is recorded only after the chat message carrying it was delivered
//! - email and sheet failures never block ledger updates

use chrono::{NaiveDate, Utc};
use gapmatch_channels::{
    digest_subject, format_match_message, group_by_candidate, match_rows, render_digest_html,
};
use gapmatch_core::error::{GapMatchError, Result};
use gapmatch_core::traits::{
    CandidateSource, ChatSink, EmailSink, GapSource, LedgerStore, SheetSink,
};
use gapmatch_core::types::{Candidate, Match, RegionCode, WorkshopGap};
use gapmatch_matcher::{GapMatcher, filter_new};

use crate::summary::{RunMode, RunSummary};

pub struct Sources {
    pub candidates: Box<dyn CandidateSource>,
    pub gaps: Box<dyn GapSource>,
}

pub struct Sinks {
    pub chat: Box<dyn ChatSink>,
    pub email: Box<dyn EmailSink>,
    pub sheet: Box<dyn SheetSink>,
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub dry_run: bool,
    pub region: Option<RegionCode>,
    pub today: NaiveDate,
    pub subject_prefix: String,
}

impl RunOptions {
    pub fn new(today: NaiveDate, subject_prefix: &str) -> Self {
        Self {
            dry_run: false,
            region: None,
            today,
            subject_prefix: subject_prefix.into(),
        }
    }
}

struct Snapshot {
    candidates: Vec<Candidate>,
    gaps: Vec<WorkshopGap>,
}

/// Both sources, sequentially. Any failure aborts the run.
async fn read_sources(sources: &Sources, summary: &mut RunSummary) -> Result<Snapshot> {
    let candidates = sources.candidates.fetch_candidates().await?;
    let gaps = sources.gaps.fetch_gaps().await?;
    summary.candidates = candidates.len();
    summary.gaps = gaps.len();

    for c in candidates.iter().filter(|c| c.regions.is_empty()) {
        let miss = GapMatchError::NormalizationMiss(format!(
            "candidate {} ({}): '{}'",
            c.name, c.id, c.location
        ));
        tracing::warn!("⚠️  {miss}");
        summary.push_issue(miss);
    }
    for g in gaps.iter().filter(|g| g.region.is_none() && g.leader_needed()) {
        let miss = GapMatchError::NormalizationMiss(format!("workshop {}: '{}'", g.id, g.location));
        tracing::warn!("⚠️  {miss}");
        summary.push_issue(miss);
    }

    Ok(Snapshot { candidates, gaps })
}

/// Sink errors are reported under the sink's name whatever their origin.
fn sink_failure(sink: &str, err: GapMatchError) -> GapMatchError {
    let err = match err {
        e @ GapMatchError::Sink { .. } => e,
        other => GapMatchError::sink(sink, other),
    };
    tracing::warn!("📭 {err}");
    err
}

/// Match candidates to gaps and notify about pairs never notified before.
///
/// Dry runs stop after computing the new matches and return their chat
/// messages as the preview; no sink is called and the ledger is not written.
pub async fn run_match_notify(
    sources: &Sources,
    sinks: Option<&Sinks>,
    ledger: &mut dyn LedgerStore,
    options: &RunOptions,
) -> Result<RunSummary> {
    let mut summary = RunSummary::new(RunMode::MatchNotify, options.dry_run);
    let sinks = match (options.dry_run, sinks) {
        (true, _) => None,
        (false, Some(sinks)) => Some(sinks),
        (false, None) => {
            return Err(GapMatchError::Config("live run without configured sinks".into()));
        }
    };

    ledger.load()?;
    let snapshot = read_sources(sources, &mut summary).await?;

    let matcher = options
        .region
        .clone()
        .map(GapMatcher::for_region)
        .unwrap_or_default();
    let all = matcher.find_matches(&snapshot.candidates, &snapshot.gaps);
    let new = filter_new(&all, ledger);
    summary.matches = all.len();
    summary.new_matches = new.len();
    tracing::info!("🆕 {} new match(es) out of {}", new.len(), all.len());

    let Some(sinks) = sinks else {
        summary.preview = group_by_candidate(&new)
            .into_iter()
            .map(|(candidate, group)| format_match_message(candidate, &group))
            .collect();
        return Ok(summary);
    };

    notify_chat(sinks.chat.as_ref(), &new, ledger, &mut summary).await;

    if new.is_empty() {
        tracing::info!("📧 No new matches, digest email skipped");
    } else {
        let html = render_digest_html(&new, &[], options.today);
        let subject = digest_subject(&options.subject_prefix, options.today);
        match sinks.email.send_html(&subject, &html).await {
            Ok(()) => summary.email_sent = true,
            Err(e) => summary.push_issue(sink_failure(sinks.email.name(), e)),
        }
    }

    match sinks.sheet.overwrite(&match_rows(&all)).await {
        Ok(()) => summary.sheet_rows = Some(all.len()),
        Err(e) => summary.push_issue(sink_failure(sinks.sheet.name(), e)),
    }

    ledger.flush()?;
    summary.log();
    Ok(summary)
}

/// One message per candidate; its pairs are recorded once that message lands.
async fn notify_chat(
    chat: &dyn ChatSink,
    new: &[Match],
    ledger: &mut dyn LedgerStore,
    summary: &mut RunSummary,
) {
    for (candidate, group) in group_by_candidate(new) {
        let text = format_match_message(candidate, &group);
        if let Err(e) = chat.post(&text).await {
            summary.push_issue(sink_failure(chat.name(), e));
            continue;
        }
        summary.messages_sent += 1;
        let now = Utc::now();
        for m in &group {
            if ledger.record(&m.candidate.id, &m.gap.id, now) {
                summary.recorded += 1;
            }
        }
        tracing::debug!("💬 Notified {} workshop(s) for {}", group.len(), candidate.name);
    }
}

/// Daily digest of every current match and open gap. Sent regardless of the
/// ledger; a dry run returns the HTML as the preview instead.
pub async fn run_digest(
    sources: &Sources,
    email: Option<&dyn EmailSink>,
    options: &RunOptions,
) -> Result<RunSummary> {
    let mut summary = RunSummary::new(RunMode::Digest, options.dry_run);
    let snapshot = read_sources(sources, &mut summary).await?;

    let matcher = options
        .region
        .clone()
        .map(GapMatcher::for_region)
        .unwrap_or_default();
    let all = matcher.find_matches(&snapshot.candidates, &snapshot.gaps);
    summary.matches = all.len();

    let open: Vec<WorkshopGap> = snapshot
        .gaps
        .into_iter()
        .filter(|g| {
            g.leader_needed()
                && options
                    .region
                    .as_ref()
                    .is_none_or(|only| g.region.as_ref() == Some(only))
        })
        .collect();
    let html = render_digest_html(&all, &open, options.today);

    if options.dry_run {
        summary.preview.push(html);
        return Ok(summary);
    }
    let email = email
        .ok_or_else(|| GapMatchError::Config("live digest without an email sink".into()))?;
    let subject = digest_subject(&options.subject_prefix, options.today);
    match email.send_html(&subject, &html).await {
        Ok(()) => summary.email_sent = true,
        Err(e) => summary.push_issue(sink_failure(email.name(), e)),
    }
    summary.log();
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gapmatch_core::GapMatchConfig;
    use gapmatch_core::types::{PipelineStage, SlotStatus};
    use gapmatch_matcher::{AliasTable, LocationNormalizer, MemoryLedger};
    use std::sync::{Arc, Mutex};

    fn normalizer() -> LocationNormalizer {
        LocationNormalizer::new(AliasTable::from_config(&GapMatchConfig::default()))
    }

    fn candidate(id: &str, name: &str, location: &str) -> Candidate {
        Candidate {
            id: id.into(),
            name: name.into(),
            email: Some(format!("{id}@example.com")),
            stage: PipelineStage::TalentScreen,
            location: location.into(),
            regions: normalizer().normalize(location).into_iter().collect(),
            school: None,
        }
    }

    fn gap(id: &str, region: &str) -> WorkshopGap {
        WorkshopGap {
            id: id.into(),
            name: "Robotics".into(),
            site: format!("Site {id}"),
            day: "Monday".into(),
            time: "3:00-4:00".into(),
            date: None,
            start_date: "January 5, 2026".into(),
            end_date: "March 20, 2026".into(),
            location: region.into(),
            region: normalizer().normalize(region),
            status: SlotStatus::Empty,
            tentative_names: Vec::new(),
            school: None,
        }
    }

    struct FixedCandidates(Vec<Candidate>);

    #[async_trait]
    impl CandidateSource for FixedCandidates {
        fn name(&self) -> &str {
            "fixed"
        }
        async fn fetch_candidates(&self) -> Result<Vec<Candidate>> {
            Ok(self.0.clone())
        }
    }

    struct FixedGaps(Option<Vec<WorkshopGap>>);

    #[async_trait]
    impl GapSource for FixedGaps {
        fn name(&self) -> &str {
            "fixed"
        }
        async fn fetch_gaps(&self) -> Result<Vec<WorkshopGap>> {
            self.0
                .clone()
                .ok_or_else(|| GapMatchError::SourceUnavailable("sheet 503".into()))
        }
    }

    #[derive(Default)]
    struct Calls {
        chat: Vec<String>,
        email: Vec<String>,
        sheet: Vec<Vec<Vec<String>>>,
    }

    impl Calls {
        fn total(&self) -> usize {
            self.chat.len() + self.email.len() + self.sheet.len()
        }
    }

    #[derive(Clone, Default)]
    struct Recorder {
        calls: Arc<Mutex<Calls>>,
        fail_chat_for: Option<String>,
        fail_email: bool,
        fail_sheet: bool,
    }

    #[async_trait]
    impl ChatSink for Recorder {
        fn name(&self) -> &str {
            "chat"
        }
        async fn post(&self, text: &str) -> Result<()> {
            if let Some(name) = &self.fail_chat_for {
                if text.contains(name.as_str()) {
                    return Err(GapMatchError::sink("chat", "channel_not_found"));
                }
            }
            self.calls.lock().unwrap().chat.push(text.to_string());
            Ok(())
        }
    }

    #[async_trait]
    impl EmailSink for Recorder {
        fn name(&self) -> &str {
            "email"
        }
        async fn send_html(&self, _subject: &str, html: &str) -> Result<()> {
            if self.fail_email {
                return Err(GapMatchError::SourceUnavailable("smtp down".into()));
            }
            self.calls.lock().unwrap().email.push(html.to_string());
            Ok(())
        }
    }

    #[async_trait]
    impl SheetSink for Recorder {
        fn name(&self) -> &str {
            "sheet"
        }
        async fn overwrite(&self, rows: &[Vec<String>]) -> Result<()> {
            if self.fail_sheet {
                return Err(GapMatchError::sink("sheet", "403"));
            }
            self.calls.lock().unwrap().sheet.push(rows.to_vec());
            Ok(())
        }
    }

    impl Recorder {
        fn sinks(&self) -> Sinks {
            Sinks {
                chat: Box::new(self.clone()),
                email: Box::new(self.clone()),
                sheet: Box::new(self.clone()),
            }
        }
    }

    struct CorruptLedger;

    impl LedgerStore for CorruptLedger {
        fn load(&mut self) -> Result<()> {
            Err(GapMatchError::LedgerCorrupt("parse: expected value".into()))
        }
        fn has(&self, _: &str, _: &str) -> bool {
            false
        }
        fn record(&mut self, _: &str, _: &str, _: chrono::DateTime<Utc>) -> bool {
            panic!("record on a corrupt ledger")
        }
        fn flush(&mut self) -> Result<()> {
            panic!("flush on a corrupt ledger")
        }
        fn len(&self) -> usize {
            0
        }
    }

    fn sources(candidates: Vec<Candidate>, gaps: Vec<WorkshopGap>) -> Sources {
        Sources {
            candidates: Box::new(FixedCandidates(candidates)),
            gaps: Box::new(FixedGaps(Some(gaps))),
        }
    }

    fn options() -> RunOptions {
        RunOptions::new(NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(), "Kodely Gap Match Digest")
    }

    #[tokio::test]
    async fn test_sf_scenario_then_rerun_is_idempotent() {
        let src = sources(vec![candidate("A", "Ana Lopez", "San Francisco, CA")], vec![gap("W", "SF")]);
        let rec = Recorder::default();
        let sinks = rec.sinks();
        let mut ledger = MemoryLedger::new();

        let first = run_match_notify(&src, Some(&sinks), &mut ledger, &options()).await.unwrap();
        assert_eq!(first.matches, 1);
        assert_eq!(first.new_matches, 1);
        assert_eq!(first.messages_sent, 1);
        assert!(first.email_sent);
        assert!(ledger.has("A", "W"));

        let second = run_match_notify(&src, Some(&sinks), &mut ledger, &options()).await.unwrap();
        assert_eq!(second.matches, 1);
        assert_eq!(second.new_matches, 0);
        assert_eq!(second.messages_sent, 0);
        assert!(!second.email_sent);
        assert_eq!(ledger.len(), 1);

        let calls = rec.calls.lock().unwrap();
        assert_eq!(calls.chat.len(), 1);
        assert_eq!(calls.email.len(), 1);
        assert_eq!(calls.sheet.len(), 2);
        assert_eq!(calls.sheet[0], calls.sheet[1]);
        assert_eq!(calls.sheet[0].len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_location_is_reported_not_matched() {
        let src = sources(
            vec![
                candidate("A", "Ana", "San Francisco"),
                candidate("B", "Bea", "Nowhereville"),
            ],
            vec![gap("W", "SF")],
        );
        let rec = Recorder::default();
        let mut ledger = MemoryLedger::new();
        let summary = run_match_notify(&src, Some(&rec.sinks()), &mut ledger, &options())
            .await
            .unwrap();

        assert_eq!(summary.matches, 1);
        assert_eq!(summary.misses(), 1);
        assert!(!ledger.has("B", "W"));
        assert!(rec.calls.lock().unwrap().chat.iter().all(|m| !m.contains("Bea")));
    }

    #[tokio::test]
    async fn test_region_filter_restricts_output() {
        let src = sources(
            vec![
                candidate("A", "Ana", "San Francisco"),
                candidate("C", "Cy", "Los Angeles"),
            ],
            vec![gap("W1", "SF"), gap("W2", "LA")],
        );
        let rec = Recorder::default();
        let mut ledger = MemoryLedger::new();
        let mut opts = options();
        opts.region = Some(RegionCode::new("SF"));

        let summary = run_match_notify(&src, Some(&rec.sinks()), &mut ledger, &opts).await.unwrap();
        assert_eq!(summary.matches, 1);
        assert!(ledger.has("A", "W1"));
        assert!(!ledger.has("C", "W2"));
        let calls = rec.calls.lock().unwrap();
        assert!(calls.sheet[0][1].contains(&"SF".to_string()));
        assert_eq!(calls.sheet[0].len(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_ledger_aborts_before_any_sink() {
        let src = sources(vec![candidate("A", "Ana", "SF")], vec![gap("W", "SF")]);
        let rec = Recorder::default();
        let err = run_match_notify(&src, Some(&rec.sinks()), &mut CorruptLedger, &options())
            .await
            .unwrap_err();
        assert!(matches!(err, GapMatchError::LedgerCorrupt(_)));
        assert_eq!(rec.calls.lock().unwrap().total(), 0);
    }

    #[tokio::test]
    async fn test_source_failure_aborts_without_partial_run() {
        let src = Sources {
            candidates: Box::new(FixedCandidates(vec![candidate("A", "Ana", "SF")])),
            gaps: Box::new(FixedGaps(None)),
        };
        let rec = Recorder::default();
        let mut ledger = MemoryLedger::new();
        let err = run_match_notify(&src, Some(&rec.sinks()), &mut ledger, &options())
            .await
            .unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(rec.calls.lock().unwrap().total(), 0);
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn test_failed_chat_message_leaves_its_pairs_unrecorded() {
        let src = sources(
            vec![candidate("A", "Ana", "SF"), candidate("B", "Ben", "SF")],
            vec![gap("W", "SF")],
        );
        let rec = Recorder {
            fail_chat_for: Some("Ana".into()),
            ..Recorder::default()
        };
        let mut ledger = MemoryLedger::new();
        let summary = run_match_notify(&src, Some(&rec.sinks()), &mut ledger, &options())
            .await
            .unwrap();

        assert!(!ledger.has("A", "W"));
        assert!(ledger.has("B", "W"));
        assert_eq!(summary.messages_sent, 1);
        assert_eq!(summary.sink_failures(), 1);
        let calls = rec.calls.lock().unwrap();
        assert_eq!(calls.email.len(), 1);
        assert_eq!(calls.sheet.len(), 1);
    }

    #[tokio::test]
    async fn test_email_and_sheet_failures_do_not_block_ledger() {
        let src = sources(vec![candidate("A", "Ana", "SF")], vec![gap("W", "SF")]);
        let rec = Recorder {
            fail_email: true,
            fail_sheet: true,
            ..Recorder::default()
        };
        let mut ledger = MemoryLedger::new();
        let summary = run_match_notify(&src, Some(&rec.sinks()), &mut ledger, &options())
            .await
            .unwrap();

        assert!(ledger.has("A", "W"));
        assert_eq!(summary.sink_failures(), 2);
        assert!(summary.issues.iter().all(|e| !e.is_fatal()));
        assert!(summary.issues.iter().any(|e| e.to_string().contains("Sink 'email'")));
        assert_eq!(summary.sheet_rows, None);
    }

    #[tokio::test]
    async fn test_dry_run_reads_ledger_but_never_mutates() {
        let src = sources(
            vec![candidate("A", "Ana", "SF"), candidate("B", "Ben", "SF")],
            vec![gap("W", "SF")],
        );
        let rec = Recorder::default();
        let mut ledger = MemoryLedger::new();
        ledger.record("A", "W", Utc::now());
        let mut opts = options();
        opts.dry_run = true;

        let summary = run_match_notify(&src, Some(&rec.sinks()), &mut ledger, &opts).await.unwrap();
        assert_eq!(summary.matches, 2);
        assert_eq!(summary.new_matches, 1);
        assert_eq!(summary.preview.len(), 1);
        assert!(summary.preview[0].contains("Ben"));
        assert_eq!(rec.calls.lock().unwrap().total(), 0);
        assert_eq!(ledger.len(), 1);
    }

    #[tokio::test]
    async fn test_dry_run_without_sinks() {
        let src = sources(vec![candidate("A", "Ana", "SF")], vec![gap("W", "SF")]);
        let mut ledger = MemoryLedger::new();
        let mut opts = options();
        opts.dry_run = true;
        let summary = run_match_notify(&src, None, &mut ledger, &opts).await.unwrap();
        assert_eq!(summary.new_matches, 1);

        opts.dry_run = false;
        let err = run_match_notify(&src, None, &mut ledger, &opts).await.unwrap_err();
        assert!(matches!(err, GapMatchError::Config(_)));
    }

    #[tokio::test]
    async fn test_digest_sends_all_matches_once() {
        let src = sources(
            vec![candidate("A", "Ana", "SF")],
            vec![gap("W1", "SF"), gap("W2", "LA")],
        );
        let rec = Recorder::default();
        let summary = run_digest(&src, Some(&rec as &dyn EmailSink), &options()).await.unwrap();
        assert!(summary.email_sent);
        assert_eq!(summary.matches, 1);

        let calls = rec.calls.lock().unwrap();
        assert_eq!(calls.email.len(), 1);
        assert!(calls.email[0].contains("Site W1"));
        assert!(calls.email[0].contains("Site W2"));
    }

    #[tokio::test]
    async fn test_digest_dry_run_previews_html() {
        let src = sources(vec![candidate("A", "Ana", "SF")], vec![gap("W1", "SF")]);
        let mut opts = options();
        opts.dry_run = true;
        let summary = run_digest(&src, None, &opts).await.unwrap();
        assert!(!summary.email_sent);
        assert!(summary.preview[0].contains("Gap Match Digest"));
    }
}
