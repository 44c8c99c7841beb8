use tracing::debug;

use crate::model::Candidate;

/// Pick the richest candidate. A lone candidate is returned as-is; among
/// equals the one seen first in the document wins.
pub fn select_best(mut candidates: Vec<Candidate>) -> Option<Candidate> {
    if candidates.len() <= 1 {
        return candidates.pop();
    }

    // sort_by is stable, so document order breaks ties
    candidates.sort_by(|a, b| b.richness.total_cmp(&a.richness));
    debug!(
        "ranked {} candidates, best #{} ({:.1})",
        candidates.len(),
        candidates[0].ordinal,
        candidates[0].richness
    );
    candidates.into_iter().next()
}
