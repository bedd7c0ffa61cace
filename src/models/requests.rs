use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::domain::{Gender, LookingFor, MatchStatus, QuestionId};

/// Request to register a new account
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Password fields didn't match."))]
    pub password2: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub profile: Option<ProfileUpdate>,
}

/// Email/password login
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Request carrying a refresh token, used by refresh and logout
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1))]
    pub refresh: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VerifyEmailRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, message = "Verification code is required"))]
    pub otp: String,
}

/// Google sign-in with an ID token obtained by the client
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GoogleAuthRequest {
    #[validate(length(min = 1))]
    pub token: String,
}

/// Partial profile; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_age_range", skip_on_field_errors = false))]
pub struct ProfileUpdate {
    #[validate(length(max = 15))]
    pub phone_number: Option<String>,
    pub bio: Option<String>,
    #[validate(length(max = 100))]
    pub location: Option<String>,
    pub avatar: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub looking_for: Option<LookingFor>,
    #[validate(range(min = 18, max = 120))]
    pub min_age_preference: Option<i32>,
    #[validate(range(min = 18, max = 120))]
    pub max_age_preference: Option<i32>,
}

fn validate_age_range(profile: &ProfileUpdate) -> Result<(), ValidationError> {
    if let (Some(min), Some(max)) = (profile.min_age_preference, profile.max_age_preference) {
        if min > max {
            let mut err = ValidationError::new("age_range");
            err.message = Some("min_age_preference cannot exceed max_age_preference".into());
            return Err(err);
        }
    }
    Ok(())
}

/// PATCH /profile body
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(max = 255))]
    pub first_name: Option<String>,
    #[validate(length(max = 255))]
    pub last_name: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub profile: Option<ProfileUpdate>,
}

/// Answer to a single question
///
/// Which fields matter depends on the question type: choice questions read
/// `selected_choice_ids`, short answers `text_answer`, scales `scale_value`
/// and booleans `boolean_value`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    #[serde(alias = "question")]
    pub question_id: QuestionId,
    #[serde(default)]
    pub selected_choice_ids: Vec<i64>,
    #[serde(default)]
    pub text_answer: Option<String>,
    #[serde(default)]
    pub scale_value: Option<i32>,
    #[serde(default)]
    pub boolean_value: Option<bool>,
}

/// Answers for several questions of one category, written atomically
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BulkAnswerRequest {
    pub category_id: i64,
    #[validate(length(min = 1, message = "Both category_id and responses are required"))]
    pub responses: Vec<SubmitAnswerRequest>,
}

/// Response of the receiving user to a pending match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespondMatchRequest {
    pub status: MatchStatus,
}
