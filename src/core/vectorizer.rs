use crate::models::{AnswerPayload, AnswerRecord, FeatureVector};

/// Build a feature vector from a user's answers
///
/// Answers are consumed in the order given; the answer store returns them
/// sorted by question id so that two users' vectors line up position by
/// position when they answered the same questions.
///
/// Per answer:
/// - single choice / scale: the selected value, or 0 when nothing is recorded
/// - multiple choice: every selected value (zero or more entries)
/// - short answer: character count of the trimmed text
/// - boolean: nothing
///
/// Returns `None` when the answers produce no entries at all.
pub fn build_feature_vector(answers: &[AnswerRecord]) -> Option<FeatureVector> {
    let mut values = Vec::with_capacity(answers.len());

    for answer in answers {
        match &answer.payload {
            AnswerPayload::SingleChoice(value) | AnswerPayload::Scale(value) => {
                values.push(value.map(f64::from).unwrap_or(0.0));
            }
            AnswerPayload::MultipleChoice(selected) => {
                values.extend(selected.iter().copied().map(f64::from));
            }
            AnswerPayload::ShortAnswer(text) => {
                values.push(text.trim().chars().count() as f64);
            }
            AnswerPayload::Boolean(_) => {}
        }
    }

    if values.is_empty() {
        None
    } else {
        Some(FeatureVector::new(values))
    }
}
