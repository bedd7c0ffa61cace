//! Kelibe - questionnaire-driven matching backend for the Kelibe dating app
//!
//! Users answer questionnaire categories; their answers are turned into
//! numeric feature vectors and compared by cosine similarity. Every pair
//! scoring above the threshold becomes a pending match that the receiving
//! user can accept or reject.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use self::core::{build_feature_vector, cosine_similarity, Matcher, MatchResult, MATCH_THRESHOLD};
pub use models::{AnswerPayload, AnswerRecord, FeatureVector, Match, MatchStatus, UserId};
pub use services::{InMemoryStore, PostgresClient};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let vector = build_feature_vector(&[AnswerRecord::new(
            1,
            AnswerPayload::Scale(Some(4)),
        )])
        .unwrap();
        assert_eq!(vector.as_slice(), &[4.0]);
        assert!(cosine_similarity(&vector, &vector).unwrap() > MATCH_THRESHOLD);
    }
}
