use std::panic::{self, catch_unwind, resume_unwind, AssertUnwindSafe};

use chrono::{DateTime, Local};
use tracing::{debug, info, warn};

use crate::fetcher::Fetcher;
use crate::model::{Candidate, MissingReason, QualityTier, SelectedRecord, WordOutcome};
use crate::parser::{self, blocks, quality, select};

/// Where a word stopped in the per-word pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Queried,
    NoBlocks,
    BlocksFound(usize),
    NoCandidate,
    CandidateSelected(usize),
    Classified(QualityTier),
}

/// Blocks → candidates → best candidate for one document. Pure: the same
/// document and word always give the same answer.
pub fn resolve_document(word: &str, html: &str) -> Result<Candidate, MissingReason> {
    let mut stage = Stage::Queried;
    debug!("{}: {:?}", word, stage);

    let blocks = blocks::split_blocks(html);
    if blocks.is_empty() {
        stage = Stage::NoBlocks;
        debug!("{}: {:?}", word, stage);
        return Err(MissingReason::NoExamples);
    }
    stage = Stage::BlocksFound(blocks.len());
    debug!("{}: {:?}", word, stage);

    let candidates = parser::extract_candidates(&blocks, word);
    let total = candidates.len();
    let Some(best) = select::select_best(candidates) else {
        stage = Stage::NoCandidate;
        debug!("{}: {:?}", word, stage);
        return Err(MissingReason::NoValidCandidate);
    };

    stage = Stage::CandidateSelected(total);
    debug!("{}: {:?}, picked #{}", word, stage, best.ordinal);
    Ok(best)
}

pub fn build_record(
    word: &str,
    candidate: Candidate,
    source: &str,
    captured_at: DateTime<Local>,
) -> SelectedRecord {
    let quality = quality::classify(
        &candidate.sentence,
        candidate.transcription.as_deref(),
        candidate.translation.as_deref(),
    );
    debug!("{}: {:?}", word, Stage::Classified(quality));
    SelectedRecord {
        word: word.to_string(),
        sentence: candidate.sentence,
        transcription: candidate.transcription,
        translation: candidate.translation,
        source_lemma: candidate.source_lemma,
        quality,
        source: source.to_string(),
        captured_at,
    }
}

/// Full per-word pass. Never panics and never returns an error: every
/// failure becomes a `Missing` outcome for this word only.
pub fn process_word<F: Fetcher>(fetcher: &F, word: &str, source: &str) -> WordOutcome {
    let result = catch_unwind(AssertUnwindSafe(|| {
        let html = match fetcher.fetch(word) {
            Ok(html) => html,
            Err(e) => return WordOutcome::Missing(MissingReason::RetrievalFailed(e.to_string())),
        };
        match resolve_document(word, &html) {
            Ok(candidate) => WordOutcome::Success(build_record(word, candidate, source, Local::now())),
            Err(reason) => WordOutcome::Missing(reason),
        }
    }));

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(payload) => {
            let msg = if let Some(s) = payload.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = payload.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic".to_string()
            };
            WordOutcome::Missing(MissingReason::ProcessingError(msg))
        }
    };

    match &outcome {
        WordOutcome::Success(r) => info!("{}: {} ({})", word, truncate(&r.sentence, 30), r.quality),
        WordOutcome::Missing(reason) => warn!("{}: {}", word, reason),
    }
    outcome
}

/// Run `f` with the default panic hook replaced by a debug log, so panics
/// caught in `process_word` don't print over the progress bar. The previous
/// hook is restored afterwards, also when `f` itself panics.
pub fn with_quiet_panics<T>(f: impl FnOnce() -> T) -> T {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(|info| debug!("caught panic: {}", info)));
    let result = catch_unwind(AssertUnwindSafe(f));
    panic::set_hook(previous);
    match result {
        Ok(v) => v,
        Err(payload) => resume_unwind(payload),
    }
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}
