pub mod blocks;
pub mod fields;
pub mod quality;
pub mod scoring;
pub mod select;

use crate::model::Candidate;

/// Run field extraction over every block. Blocks that fail the
/// minimum-content rule are dropped silently.
pub fn extract_candidates(blocks: &[blocks::RawBlock], word: &str) -> Vec<Candidate> {
    blocks
        .iter()
        .filter_map(|b| fields::extract_candidate(b, word))
        .collect()
}
