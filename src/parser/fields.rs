use std::sync::LazyLock;

use regex::Regex;

use super::blocks::{strip_ordinal, RawBlock, MIN_SENTENCE_CHARS};
use super::scoring::{richness_score, transcription_line_score};
use crate::charclass::{char_len, count_han};
use crate::model::Candidate;

// Labels the dictionary renders next to every example. Removal stops at the
// end of the line so a label never swallows the romanization below it.
static PLAYBACK_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"播放用例[^。\n]*").unwrap());
static SOURCE_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"來源詞目[^。\n]*").unwrap());

static LEADING_PLAYBACK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^播放用例").unwrap());
static TRAILING_PLAYBACK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"播放.*$").unwrap());
static TRAILING_SOURCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"來源.*$").unwrap());
static EDGE_PUNCT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^[.,;:!?()'"]+|[.,;:!?()'"]+$"#).unwrap());
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static BRACKETED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[(（]([^)）]{5,})[)）]").unwrap());
static SOURCE_LEMMA_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"來源詞目[：:\s]*(\S+)").unwrap());

const MIN_TRANSCRIPTION_LINE_CHARS: usize = 10;
const TRANSLATION_NOISE: &[&str] = &["播放", "搜尋"];

/// Build a candidate from one block. A sentence alone is not enough: it
/// needs a transcription or a translation to be worth keeping.
pub fn extract_candidate(block: &RawBlock, word: &str) -> Option<Candidate> {
    let sentence = extract_sentence(&block.heading)?;
    let content = block.content();

    let transcription = extract_transcription(&content);
    let translation = extract_translation(&content);
    if transcription.is_none() && translation.is_none() {
        return None;
    }

    let source_lemma = extract_source_lemma(&content).unwrap_or_else(|| word.to_string());
    let richness = richness_score(&sentence, transcription.as_deref(), translation.as_deref());

    Some(Candidate {
        ordinal: block.ordinal,
        sentence,
        transcription,
        translation,
        source_lemma,
        richness,
    })
}

pub fn extract_sentence(heading: &str) -> Option<String> {
    let sentence = strip_ordinal(heading);
    if char_len(sentence) < MIN_SENTENCE_CHARS {
        return None;
    }
    Some(sentence.to_string())
}

/// Pick the line that best looks like romanization; earlier lines win ties.
pub fn extract_transcription(content: &str) -> Option<String> {
    let cleaned = PLAYBACK_LABEL_RE.replace_all(content, "");
    let cleaned = SOURCE_LABEL_RE.replace_all(&cleaned, "");

    let mut best: Option<&str> = None;
    let mut max_score = 0;
    for line in cleaned.lines().map(str::trim) {
        if char_len(line) < MIN_TRANSCRIPTION_LINE_CHARS {
            continue;
        }
        let score = transcription_line_score(line);
        if score > max_score {
            best = Some(line);
            max_score = score;
        }
    }

    best.map(clean_transcription).filter(|t| !t.is_empty())
}

fn clean_transcription(line: &str) -> String {
    let t = LEADING_PLAYBACK_RE.replace(line, "");
    let t = TRAILING_PLAYBACK_RE.replace(&t, "");
    let t = TRAILING_SOURCE_RE.replace(&t, "");
    let t = EDGE_PUNCT_RE.replace_all(t.trim(), "");
    WHITESPACE_RE.replace_all(&t, " ").trim().to_string()
}

/// First parenthesised span that reads as Han text.
pub fn extract_translation(content: &str) -> Option<String> {
    BRACKETED_RE
        .captures_iter(content)
        .map(|caps| caps.get(1).map_or("", |m| m.as_str()))
        .find(|span| {
            is_valid_translation(span) && !TRANSLATION_NOISE.iter().any(|kw| span.contains(kw))
        })
        .map(|span| span.trim().to_string())
}

/// More than half of the characters are Han. Keeps stray romanization or
/// Latin notes in parentheses from passing as a translation.
pub fn is_valid_translation(text: &str) -> bool {
    let total = char_len(text);
    total > 0 && count_han(text) as f64 / total as f64 > 0.5
}

pub fn extract_source_lemma(content: &str) -> Option<String> {
    let caps = SOURCE_LEMMA_RE.captures(content)?;
    let lemma = TRAILING_PLAYBACK_RE.replace(&caps[1], "");
    let lemma = lemma.trim();
    if lemma.is_empty() {
        None
    } else {
        Some(lemma.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(heading: &str, fragments: &[&str]) -> RawBlock {
        RawBlock {
            ordinal: 1,
            heading: heading.to_string(),
            fragments: fragments.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn sentence_strips_ordinal() {
        assert_eq!(extract_sentence("3. 伊去學校讀冊。").as_deref(), Some("伊去學校讀冊。"));
        assert_eq!(extract_sentence("3. 好天"), None);
    }

    #[test]
    fn transcription_prefers_tone_marked_line() {
        let content = "伊逐工攏去學校讀冊，真認真。\nsome plain words\nI khì ha̍k-hāu tha̍k-tsheh.";
        assert_eq!(
            extract_transcription(content).as_deref(),
            Some("I khì ha̍k-hāu tha̍k-tsheh")
        );
    }

    #[test]
    fn transcription_skips_short_lines() {
        assert_eq!(extract_transcription("Guá ài.\nhāu"), None);
    }

    #[test]
    fn transcription_absent_when_only_han() {
        // twelve Han characters outweigh the ratio bonus
        assert_eq!(extract_transcription("伊逐工攏去學校讀冊，真認真。\n(他去學校讀書。)"), None);
    }

    #[test]
    fn playback_label_removed_within_line() {
        let content = "播放用例\nA-pah tī tshù-lí tsia̍h-pn̄g.";
        assert_eq!(
            extract_transcription(content).as_deref(),
            Some("A-pah tī tshù-lí tsia̍h-pn̄g")
        );
    }

    #[test]
    fn transcription_trailing_labels_cleaned() {
        let content = "\"Guá tsin ài tsia̍h bí-hún\" 播放";
        // the trailing label costs 10 but the line still wins
        assert_eq!(extract_transcription(content).as_deref(), Some("Guá tsin ài tsia̍h bí-hún"));
    }

    #[test]
    fn first_line_wins_ties() {
        let content = "tsit ki pit ah\ntsit tiunn tsua";
        assert_eq!(extract_transcription(content).as_deref(), Some("tsit ki pit ah"));
    }

    #[test]
    fn translation_full_and_half_width() {
        assert_eq!(extract_translation("x（他去學校讀書。）y").as_deref(), Some("他去學校讀書。"));
        assert_eq!(extract_translation("x(他去學校讀書。)y").as_deref(), Some("他去學校讀書。"));
    }

    #[test]
    fn translation_rejects_latin_and_short_spans() {
        assert_eq!(extract_translation("(tha̍k-tsheh) (讀書)"), None);
        assert_eq!(
            extract_translation("(tha̍k-tsheh khì) (他去學校讀書)").as_deref(),
            Some("他去學校讀書")
        );
    }

    #[test]
    fn translation_rejects_chrome() {
        assert_eq!(extract_translation("(播放用例音檔)"), None);
        assert_eq!(extract_translation("(搜尋其他用例)"), None);
    }

    #[test]
    fn valid_translation_majority_rule() {
        assert!(is_valid_translation("他去學校讀書。"));
        assert!(!is_valid_translation("ab他c"));
        assert!(!is_valid_translation("他去ab"));
        assert!(!is_valid_translation(""));
    }

    #[test]
    fn source_lemma() {
        assert_eq!(extract_source_lemma("來源詞目：米粉 播放詞目").as_deref(), Some("米粉"));
        assert_eq!(extract_source_lemma("來源詞目: 學校播放").as_deref(), Some("學校"));
        assert_eq!(extract_source_lemma("沒有來源"), None);
    }

    #[test]
    fn candidate_requires_more_than_sentence() {
        let b = block("1. 伊去學校讀冊。", &["伊逐工攏去學校讀冊，真認真。"]);
        assert!(extract_candidate(&b, "學校").is_none());
    }

    #[test]
    fn candidate_rejects_short_heading() {
        let b = block("1. 讀冊", &["I khì ha̍k-hāu tha̍k-tsheh.", "(他去學校讀書。)"]);
        assert!(extract_candidate(&b, "讀冊").is_none());
    }

    #[test]
    fn candidate_with_all_fields() {
        let b = block(
            "2. 伊真愛食米粉。",
            &["播放用例", "I tsin ài tsia̍h bí-hún.", "(他很愛吃米粉。)", "來源詞目：米粉 播放詞目"],
        );
        let c = extract_candidate(&b, "食").unwrap();
        assert_eq!(c.ordinal, 1);
        assert_eq!(c.sentence, "伊真愛食米粉。");
        assert_eq!(c.transcription.as_deref(), Some("I tsin ài tsia̍h bí-hún"));
        assert_eq!(c.translation.as_deref(), Some("他很愛吃米粉。"));
        assert_eq!(c.source_lemma, "米粉");
        assert!(c.richness > 50.0);
    }

    #[test]
    fn label_removal_stops_at_line_end() {
        // no 。 until the translation, so a pattern crossing newlines would
        // take the romanization with it
        let content = "播放用例\nI tsin ài tsia̍h bí-hún.\n(他很愛吃米粉。)";
        let across_lines = Regex::new(r"播放用例[^。]*").unwrap();
        assert!(!across_lines.replace_all(content, "").contains("tsin"));

        assert_eq!(
            extract_transcription(content).as_deref(),
            Some("I tsin ài tsia̍h bí-hún")
        );
        assert_eq!(PLAYBACK_LABEL_RE.replace_all(content, ""), "\nI tsin ài tsia̍h bí-hún.\n(他很愛吃米粉。)");
    }

    #[test]
    fn source_label_stops_at_line_end() {
        let content = "來源詞目：米粉\nGuá ài tsia̍h bí-hún.\n(我愛吃米粉。)";
        assert_eq!(
            extract_transcription(content).as_deref(),
            Some("Guá ài tsia̍h bí-hún")
        );
        assert_eq!(extract_source_lemma(content).as_deref(), Some("米粉"));
    }

    #[test]
    fn source_lemma_defaults_to_word() {
        let b = block("1. 伊去學校讀冊。", &["(他去學校讀書。)"]);
        let c = extract_candidate(&b, "學校").unwrap();
        assert_eq!(c.source_lemma, "學校");
        assert!(c.transcription.is_none());
    }
}
