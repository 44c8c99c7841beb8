use crate::model::QualityTier;

/// Coarse completeness tier from which fields are present.
pub fn classify(sentence: &str, transcription: Option<&str>, translation: Option<&str>) -> QualityTier {
    let has_sentence = !sentence.is_empty();
    let has_transcription = transcription.is_some_and(|t| !t.is_empty());
    let has_translation = translation.is_some_and(|t| !t.is_empty());

    match (has_sentence, has_transcription, has_translation) {
        (true, true, true) => QualityTier::Complete,
        (true, true, false) | (true, false, true) => QualityTier::Good,
        (true, false, false) => QualityTier::Basic,
        (false, _, _) => QualityTier::Incomplete,
    }
}
