// Core algorithm exports
pub mod matcher;
pub mod questionnaire;
pub mod similarity;
pub mod vectorizer;

pub use matcher::{MatchResult, Matcher, MatchingError};
pub use questionnaire::{
    completion_percentage, matching_score, validate_answer, AnswerValidationError,
    ValidatedAnswer,
};
pub use similarity::{cosine_similarity, is_match_worthy, SimilarityError, MATCH_THRESHOLD};
pub use vectorizer::build_feature_vector;
