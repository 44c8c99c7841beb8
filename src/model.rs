use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::{Serialize, Serializer};
use thiserror::Error;

/// One numbered example parsed out of a dictionary page.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub ordinal: usize,
    pub sentence: String,
    pub transcription: Option<String>,
    pub translation: Option<String>,
    pub source_lemma: String,
    pub richness: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    Incomplete,
    Basic,
    Good,
    Complete,
}

impl QualityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Good => "good",
            Self::Basic => "basic",
            Self::Incomplete => "incomplete",
        }
    }

    /// Best first.
    pub fn all() -> &'static [QualityTier] {
        &[Self::Complete, Self::Good, Self::Basic, Self::Incomplete]
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown quality tier: {0}")]
pub struct UnknownTier(pub String);

impl FromStr for QualityTier {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "complete" => Ok(Self::Complete),
            "good" => Ok(Self::Good),
            "basic" => Ok(Self::Basic),
            "incomplete" => Ok(Self::Incomplete),
            _ => Err(UnknownTier(s.to_string())),
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedRecord {
    pub word: String,
    pub sentence: String,
    pub transcription: Option<String>,
    pub translation: Option<String>,
    pub source_lemma: String,
    pub quality: QualityTier,
    pub source: String,
    pub captured_at: DateTime<Local>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingReason {
    NoExamples,
    NoValidCandidate,
    RetrievalFailed(String),
    ProcessingError(String),
}

impl fmt::Display for MissingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoExamples => write!(f, "no examples found"),
            Self::NoValidCandidate => write!(f, "no valid candidate"),
            Self::RetrievalFailed(detail) => write!(f, "retrieval failed: {}", detail),
            Self::ProcessingError(detail) => write!(f, "processing error: {}", detail),
        }
    }
}

impl Serialize for MissingReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingEntry {
    pub word: String,
    pub reason: MissingReason,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WordOutcome {
    Success(SelectedRecord),
    Missing(MissingReason),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_labels_parse_back() {
        for &tier in QualityTier::all() {
            assert_eq!(tier.as_str().parse::<QualityTier>(), Ok(tier));
        }
        assert_eq!("完整".parse::<QualityTier>(), Err(UnknownTier("完整".into())));
    }
}
