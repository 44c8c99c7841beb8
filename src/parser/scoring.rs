use crate::charclass::{char_len, count_han, count_tone_marked, TERMINAL_PUNCT};

/// Fragments that mark site chrome rather than romanization.
const NOISE_KEYWORDS: &[&str] = &["播放", "搜尋", "辭典", "來源", "http"];

/// How much a single line looks like a Tâi-lô transcription.
///
/// Only comparable between lines of the same block; there is no fixed floor
/// or ceiling.
pub fn transcription_line_score(line: &str) -> i32 {
    let mut score = count_tone_marked(line) as i32 * 3;

    let non_ws = line.chars().filter(|c| !c.is_whitespace()).count();
    if non_ws > 0 {
        let alpha = line.chars().filter(|c| c.is_alphabetic()).count();
        if alpha as f64 / non_ws as f64 > 0.6 {
            score += 10;
        }
    }

    match count_han(line) {
        0 => score += 5,
        han => score -= han as i32,
    }

    for kw in NOISE_KEYWORDS {
        if line.contains(kw) {
            score -= 10;
        }
    }

    score
}

/// Ranking weight for a whole candidate. Longer transcriptions and
/// properly terminated sentences win.
pub fn richness_score(
    sentence: &str,
    transcription: Option<&str>,
    translation: Option<&str>,
) -> f64 {
    let mut score = 0.0;

    if let Some(t) = transcription {
        score += 30.0 + char_len(t) as f64 * 0.5;
    }
    if translation.is_some() {
        score += 20.0;
    }

    score += char_len(sentence) as f64 * 0.3;
    if sentence.trim_end().ends_with(TERMINAL_PUNCT) {
        score += 10.0;
    }

    score
}
