use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::model::{MissingEntry, QualityTier, SelectedRecord, WordOutcome};

/// Everything a run produced. Every input word lands in exactly one of the
/// two lists.
#[derive(Debug, Default, Clone, Serialize)]
pub struct BatchResult {
    pub records: Vec<SelectedRecord>,
    pub missing: Vec<MissingEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub successes: usize,
    pub missing: usize,
    /// successes / total, 0 for an empty batch
    pub success_rate: f64,
    /// Non-empty tiers, best first.
    pub quality: Vec<(QualityTier, usize)>,
    /// Grouped by exact reason text, in first-seen order.
    pub reasons: Vec<(String, usize)>,
}

impl BatchResult {
    /// Append one word's outcome. `position` is 1-based in the input list.
    pub fn record(&mut self, position: usize, word: &str, outcome: WordOutcome) {
        match outcome {
            WordOutcome::Success(record) => self.records.push(record),
            WordOutcome::Missing(reason) => self.missing.push(MissingEntry {
                word: word.to_string(),
                reason,
                position,
            }),
        }
    }

    pub fn total(&self) -> usize {
        self.records.len() + self.missing.len()
    }

    pub fn summary(&self) -> BatchSummary {
        let total = self.total();
        let successes = self.records.len();
        let success_rate = if total == 0 {
            0.0
        } else {
            successes as f64 / total as f64
        };

        let quality = QualityTier::all()
            .iter()
            .map(|&tier| (tier, self.records.iter().filter(|r| r.quality == tier).count()))
            .filter(|&(_, n)| n > 0)
            .collect();

        let mut reasons: Vec<(String, usize)> = Vec::new();
        for entry in &self.missing {
            let key = entry.reason.to_string();
            match reasons.iter_mut().find(|(r, _)| *r == key) {
                Some((_, n)) => *n += 1,
                None => reasons.push((key, 1)),
            }
        }

        BatchSummary {
            total,
            successes,
            missing: self.missing.len(),
            success_rate,
            quality,
            reasons,
        }
    }
}

impl BatchSummary {
    /// Percentage rounded to one decimal, e.g. 66.7.
    pub fn success_percent(&self) -> f64 {
        (self.success_rate * 1000.0).round() / 10.0
    }

    pub fn success_label(&self) -> String {
        format!("{:.1}%", self.success_percent())
    }

    pub fn quality_count(&self, tier: QualityTier) -> usize {
        self.quality
            .iter()
            .find(|(t, _)| *t == tier)
            .map_or(0, |(_, n)| *n)
    }

    pub fn print(&self) {
        println!(
            "Processed {} words: {} extracted, {} missing ({}).",
            self.total,
            self.successes,
            self.missing,
            self.success_label()
        );
        for (tier, n) in &self.quality {
            println!("  {:<10} {}", tier, n);
        }
        for (reason, n) in &self.reasons {
            println!("  missing: {} ({})", reason, n);
        }
    }
}

/// Fold the per-word pass over the list, in order, one word at a time.
/// `pacing` is slept between words, never after the last one.
pub fn run_batch<F>(words: &[String], pacing: Duration, mut process: F) -> BatchResult
where
    F: FnMut(&str) -> WordOutcome,
{
    let total = words.len();
    info!("Processing {} words", total);

    words
        .iter()
        .enumerate()
        .fold(BatchResult::default(), |mut acc, (i, word)| {
            let position = i + 1;
            acc.record(position, word, process(word));
            if pause_after(position, total) && !pacing.is_zero() {
                std::thread::sleep(pacing);
            }
            acc
        })
}

fn pause_after(position: usize, total: usize) -> bool {
    position < total
}

#[cfg(test)]
mod tests {
    use chrono::Local;

    use super::*;
    use crate::fetcher::{FetchError, Fetcher};
    use crate::model::MissingReason;
    use crate::pipeline::process_word;

    /// Canned pages keyed by word; anything unknown is a network failure.
    struct StubFetcher;

    impl Fetcher for StubFetcher {
        fn fetch(&self, word: &str) -> Result<String, FetchError> {
            match word {
                "米粉" => Ok(std::fs::read_to_string("tests/fixtures/sample.html")?),
                "車頭" => Ok(std::fs::read_to_string("tests/fixtures/no_examples.html")?),
                "學校" => panic!("bad markup"),
                _ => Err(FetchError::Status(500)),
            }
        }
    }

    fn success(word: &str, quality: QualityTier) -> WordOutcome {
        WordOutcome::Success(SelectedRecord {
            word: word.to_string(),
            sentence: "伊去學校讀冊。".into(),
            transcription: Some("I khì ha̍k-hāu tha̍k-tsheh".into()),
            translation: (quality == QualityTier::Complete).then(|| "他去學校讀書。".to_string()),
            source_lemma: word.to_string(),
            quality,
            source: "test".into(),
            captured_at: Local::now(),
        })
    }

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn two_of_three() {
        let list = words(&["學校", "讀冊", "米粉"]);
        let result = run_batch(&list, Duration::ZERO, |w| match w {
            "學校" => success(w, QualityTier::Complete),
            "讀冊" => success(w, QualityTier::Good),
            _ => WordOutcome::Missing(MissingReason::NoExamples),
        });

        let s = result.summary();
        assert_eq!(s.total, 3);
        assert_eq!(s.success_percent(), 66.7);
        assert_eq!(s.success_label(), "66.7%");
        assert_eq!(s.quality, vec![(QualityTier::Complete, 1), (QualityTier::Good, 1)]);
        assert_eq!(s.reasons, vec![("no examples found".to_string(), 1)]);
        assert_eq!(result.missing[0].position, 3);
        assert_eq!(result.missing[0].word, "米粉");
    }

    #[test]
    fn every_word_accounted_for() {
        let list = words(&["a", "b", "c", "d", "e"]);
        let result = run_batch(&list, Duration::ZERO, |w| {
            if w == "b" || w == "d" {
                success(w, QualityTier::Good)
            } else {
                WordOutcome::Missing(MissingReason::NoValidCandidate)
            }
        });
        assert_eq!(result.records.len() + result.missing.len(), list.len());
        let positions: Vec<usize> = result.missing.iter().map(|m| m.position).collect();
        assert_eq!(positions, vec![1, 3, 5]);
    }

    #[test]
    fn single_missing_word_is_zero_percent() {
        let result = run_batch(&words(&["X"]), Duration::ZERO, |_| {
            WordOutcome::Missing(MissingReason::NoExamples)
        });
        let s = result.summary();
        assert_eq!(s.success_rate, 0.0);
        assert_eq!(s.success_label(), "0.0%");
    }

    #[test]
    fn empty_batch() {
        let result = run_batch(&[], Duration::ZERO, |_| unreachable!());
        let s = result.summary();
        assert_eq!(s.total, 0);
        assert_eq!(s.success_rate, 0.0);
        assert!(s.quality.is_empty());
        assert!(s.reasons.is_empty());
    }

    #[test]
    fn reasons_grouped_in_first_seen_order() {
        let list = words(&["a", "b", "c", "d"]);
        let result = run_batch(&list, Duration::ZERO, |w| match w {
            "a" => WordOutcome::Missing(MissingReason::NoValidCandidate),
            "b" => WordOutcome::Missing(MissingReason::RetrievalFailed("unexpected status 500".into())),
            "c" => WordOutcome::Missing(MissingReason::NoValidCandidate),
            _ => WordOutcome::Missing(MissingReason::NoExamples),
        });
        assert_eq!(
            result.summary().reasons,
            vec![
                ("no valid candidate".to_string(), 2),
                ("retrieval failed: unexpected status 500".to_string(), 1),
                ("no examples found".to_string(), 1),
            ]
        );
    }

    #[test]
    fn words_processed_in_order() {
        let list = words(&["一", "二", "三"]);
        let mut seen = Vec::new();
        run_batch(&list, Duration::ZERO, |w| {
            seen.push(w.to_string());
            WordOutcome::Missing(MissingReason::NoExamples)
        });
        assert_eq!(seen, list);
    }

    #[test]
    fn pipeline_failures_stay_per_word() {
        let list = words(&["米粉", "學校", "車頭", "公車"]);
        let result = run_batch(&list, Duration::ZERO, |w| process_word(&StubFetcher, w, "test"));

        assert_eq!(result.total(), 4);
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].word, "米粉");
        assert_eq!(result.records[0].quality, QualityTier::Complete);

        let missing: Vec<(String, usize)> = result
            .missing
            .iter()
            .map(|m| (m.reason.to_string(), m.position))
            .collect();
        assert_eq!(
            missing,
            vec![
                ("processing error: bad markup".to_string(), 2),
                ("no examples found".to_string(), 3),
                ("retrieval failed: unexpected status 500".to_string(), 4),
            ]
        );
        assert_eq!(result.summary().success_label(), "25.0%");
    }

    #[test]
    fn empty_page_is_no_examples_and_zero_percent() {
        let list = words(&["車頭"]);
        let result = run_batch(&list, Duration::ZERO, |w| process_word(&StubFetcher, w, "test"));
        let s = result.summary();
        assert_eq!(s.total, 1);
        assert_eq!(s.success_rate, 0.0);
        assert_eq!(s.success_label(), "0.0%");
        assert_eq!(s.reasons, vec![("no examples found".to_string(), 1)]);
        assert_eq!(result.missing[0].word, "車頭");
    }

    #[test]
    fn no_pause_after_last_word() {
        assert!(pause_after(1, 3));
        assert!(pause_after(2, 3));
        assert!(!pause_after(3, 3));
    }

    #[test]
    fn quality_count_lookup() {
        let list = words(&["a", "b"]);
        let s = run_batch(&list, Duration::ZERO, |w| success(w, QualityTier::Complete)).summary();
        assert_eq!(s.quality_count(QualityTier::Complete), 2);
        assert_eq!(s.quality_count(QualityTier::Basic), 0);
    }
}
