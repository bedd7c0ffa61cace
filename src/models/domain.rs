use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type UserId = i64;
pub type MatchId = i64;
pub type QuestionId = i64;

/// Registered account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email_verified: bool,
    pub is_active: bool,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    #[serde(skip_serializing)]
    pub email_verification_token: String,
    pub matching_score: f64,
    pub last_score_update: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Gender of a profile owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// Who a profile owner wants to be matched with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookingFor {
    Male,
    Female,
    Both,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            other => Err(format!("unknown gender: {}", other)),
        }
    }
}

impl LookingFor {
    pub fn as_str(&self) -> &'static str {
        match self {
            LookingFor::Male => "male",
            LookingFor::Female => "female",
            LookingFor::Both => "both",
        }
    }
}

impl FromStr for LookingFor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(LookingFor::Male),
            "female" => Ok(LookingFor::Female),
            "both" => Ok(LookingFor::Both),
            other => Err(format!("unknown preference: {}", other)),
        }
    }
}

/// Personal profile, one per user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    pub phone_number: String,
    pub bio: String,
    pub location: String,
    pub avatar: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub looking_for: Option<LookingFor>,
    pub min_age_preference: Option<i32>,
    pub max_age_preference: Option<i32>,
}

impl Profile {
    /// Age in whole years at `today`, counting the birthday itself
    pub fn age_on(&self, today: NaiveDate) -> Option<i32> {
        let birth = self.birth_date?;
        let before_birthday = (today.month(), today.day()) < (birth.month(), birth.day());
        Some(today.year() - birth.year() - i32::from(before_birthday))
    }

    pub fn age(&self) -> Option<i32> {
        self.age_on(Utc::now().date_naive())
    }
}

/// Question kinds supported by the questionnaire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "question_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    SingleChoice,
    MultipleChoice,
    ShortAnswer,
    Scale,
    Boolean,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::SingleChoice => "single_choice",
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::ShortAnswer => "short_answer",
            QuestionType::Scale => "scale",
            QuestionType::Boolean => "boolean",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single_choice" => Ok(QuestionType::SingleChoice),
            "multiple_choice" => Ok(QuestionType::MultipleChoice),
            "short_answer" => Ok(QuestionType::ShortAnswer),
            "scale" => Ok(QuestionType::Scale),
            "boolean" => Ok(QuestionType::Boolean),
            other => Err(format!("unknown question type: {}", other)),
        }
    }
}

/// Grouping of questions, listed by (order, name)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionCategory {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub weight: f64,
    pub order: i32,
    #[serde(default)]
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub category_id: i64,
    pub text: String,
    pub question_type: QuestionType,
    pub required: bool,
    pub order: i32,
    pub min_value: Option<i32>,
    pub max_value: Option<i32>,
    #[serde(default)]
    pub choices: Vec<QuestionChoice>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Question {
    pub fn has_choice(&self, choice_id: i64) -> bool {
        self.choices.iter().any(|c| c.id == choice_id)
    }
}

/// Selectable option of a choice question; `value` feeds the feature vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionChoice {
    pub id: i64,
    pub text: String,
    pub value: i32,
    pub order: i32,
}

/// A stored answer as returned to its owner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub id: i64,
    pub question_id: QuestionId,
    pub selected_choices: Vec<QuestionChoice>,
    pub text_answer: String,
    pub scale_value: Option<i32>,
    pub boolean_value: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Answer content, shaped by the type of the question it answers
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerPayload {
    /// Numeric value of the selected choice, if any
    SingleChoice(Option<i32>),
    /// Numeric values of every selected choice, in retrieval order
    MultipleChoice(Vec<i32>),
    ShortAnswer(String),
    Scale(Option<i32>),
    Boolean(Option<bool>),
}

/// One entry of a user's answer set as consumed by the vectorizer
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerRecord {
    pub question_id: QuestionId,
    pub payload: AnswerPayload,
}

impl AnswerRecord {
    pub fn new(question_id: QuestionId, payload: AnswerPayload) -> Self {
        Self { question_id, payload }
    }
}

/// Numeric representation of a user's answers
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Lifecycle status of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "match_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Pending,
    Accepted,
    Rejected,
}

impl MatchStatus {
    /// Statuses a pending match may move to
    pub fn is_response(&self) -> bool {
        matches!(self, MatchStatus::Accepted | MatchStatus::Rejected)
    }
}

/// Proposed pairing of two users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub user1_id: UserId,
    pub user2_id: UserId,
    pub compatibility_score: f64,
    pub status: MatchStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Match {
    pub fn involves(&self, user_id: UserId) -> bool {
        self.user1_id == user_id || self.user2_id == user_id
    }

    /// The other side of the pair as seen from `user_id`
    pub fn counterpart(&self, user_id: UserId) -> UserId {
        if self.user1_id == user_id {
            self.user2_id
        } else {
            self.user1_id
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_age_counts_birthday() {
        let profile = Profile {
            birth_date: Some(date(1995, 6, 15)),
            ..Profile::default()
        };

        assert_eq!(profile.age_on(date(2025, 6, 14)), Some(29));
        assert_eq!(profile.age_on(date(2025, 6, 15)), Some(30));
        assert_eq!(Profile::default().age_on(date(2025, 1, 1)), None);
    }

    #[test]
    fn test_question_type_parsing() {
        assert_eq!("scale".parse::<QuestionType>(), Ok(QuestionType::Scale));
        assert_eq!(QuestionType::MultipleChoice.to_string(), "multiple_choice");
        assert!("essay".parse::<QuestionType>().is_err());
    }

    #[test]
    fn test_match_counterpart() {
        let now = Utc::now();
        let m = Match {
            id: 1,
            user1_id: 10,
            user2_id: 20,
            compatibility_score: 0.9,
            status: MatchStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        assert_eq!(m.counterpart(10), 20);
        assert_eq!(m.counterpart(20), 10);
        assert!(m.involves(20));
        assert!(!m.involves(30));
    }
}
