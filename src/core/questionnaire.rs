use thiserror::Error;

use crate::models::{Question, QuestionId, QuestionType, SubmitAnswerRequest};

/// Reasons an answer does not fit its question
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnswerValidationError {
    #[error("This question requires at least one choice selection")]
    ChoiceRequired,

    #[error("This question only allows one choice")]
    TooManyChoices,

    #[error("Invalid choice selection")]
    InvalidChoice,

    #[error("This question requires a text answer")]
    TextRequired,

    #[error("This question requires a value")]
    ValueRequired,

    #[error("Response must be a number between {min} and {max}")]
    OutOfRange { min: i32, max: i32 },
}

/// Answer checked against its question, holding only the fields its type uses
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedAnswer {
    pub question_id: QuestionId,
    pub choice_ids: Vec<i64>,
    pub text_answer: String,
    pub scale_value: Option<i32>,
    pub boolean_value: Option<bool>,
}

/// Validate a submitted answer against the question it answers
pub fn validate_answer(
    question: &Question,
    req: &SubmitAnswerRequest,
) -> Result<ValidatedAnswer, AnswerValidationError> {
    let mut answer = ValidatedAnswer {
        question_id: question.id,
        ..ValidatedAnswer::default()
    };

    match question.question_type {
        QuestionType::SingleChoice | QuestionType::MultipleChoice => {
            let mut ids = req.selected_choice_ids.clone();
            ids.sort_unstable();
            ids.dedup();

            if ids.is_empty() && question.required {
                return Err(AnswerValidationError::ChoiceRequired);
            }
            if question.question_type == QuestionType::SingleChoice && ids.len() > 1 {
                return Err(AnswerValidationError::TooManyChoices);
            }
            if !ids.iter().all(|id| question.has_choice(*id)) {
                return Err(AnswerValidationError::InvalidChoice);
            }
            answer.choice_ids = ids;
        }
        QuestionType::ShortAnswer => {
            let text = req.text_answer.clone().unwrap_or_default();
            if question.required && text.trim().is_empty() {
                return Err(AnswerValidationError::TextRequired);
            }
            answer.text_answer = text;
        }
        QuestionType::Scale => {
            match (req.scale_value, question.min_value, question.max_value) {
                (None, _, _) if question.required => {
                    return Err(AnswerValidationError::ValueRequired)
                }
                (Some(value), Some(min), Some(max)) if value < min || value > max => {
                    return Err(AnswerValidationError::OutOfRange { min, max })
                }
                _ => {}
            }
            answer.scale_value = req.scale_value;
        }
        QuestionType::Boolean => {
            if req.boolean_value.is_none() && question.required {
                return Err(AnswerValidationError::ValueRequired);
            }
            answer.boolean_value = req.boolean_value;
        }
    }

    Ok(answer)
}

/// Share of a category's questions the user answered, as a whole percentage
pub fn completion_percentage(question_count: usize, answered_count: usize) -> u32 {
    if question_count == 0 {
        return 0;
    }
    ((answered_count.min(question_count) * 100) / question_count) as u32
}

/// Mean scale value over all of a user's answers; answers without one count as 0
pub fn matching_score(scale_values: &[Option<i32>]) -> f64 {
    if scale_values.is_empty() {
        return 0.0;
    }
    let total: f64 = scale_values.iter().map(|v| v.map(f64::from).unwrap_or(0.0)).sum();
    total / scale_values.len() as f64
}
