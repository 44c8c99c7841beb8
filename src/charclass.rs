/// Tâi-lô vowels carrying a tone diacritic that show up in dictionary output.
const TONE_MARKED: &str = "âêîôûāēīōūǎěǐǒǔàèìòù";

/// Sentence-final punctuation in Han text.
pub const TERMINAL_PUNCT: &[char] = &['。', '！', '？'];

/// CJK Unified Ideographs block.
pub fn is_han(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

pub fn is_tone_marked_latin(c: char) -> bool {
    TONE_MARKED.contains(c)
}

pub fn count_han(s: &str) -> usize {
    s.chars().filter(|&c| is_han(c)).count()
}

pub fn count_tone_marked(s: &str) -> usize {
    s.chars().filter(|&c| is_tone_marked_latin(c)).count()
}

/// Length in characters, not bytes.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}
