use serde::{Deserialize, Serialize};

use crate::models::domain::{
    Answer, Match, MatchId, MatchStatus, Profile, QuestionCategory, User, UserId,
};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

/// Profile as rendered to clients, with the derived age
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileView {
    #[serde(flatten)]
    pub profile: Profile,
    pub age: Option<i32>,
}

impl From<Profile> for ProfileView {
    fn from(profile: Profile) -> Self {
        let age = profile.age();
        Self { profile, age }
    }
}

/// User as rendered to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserView {
    pub id: UserId,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email_verified: bool,
    pub profile: ProfileView,
}

impl UserView {
    pub fn new(user: User, profile: Profile) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            email_verified: user.email_verified,
            profile: profile.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub email: String,
}

/// Token pair plus the authenticated user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access: String,
    pub refresh: String,
    pub user: UserView,
    pub email_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenResponse {
    pub access: String,
}

/// Category with the caller's progress and answers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryDetailResponse {
    #[serde(flatten)]
    pub category: QuestionCategory,
    pub completion_percentage: u32,
    pub user_answers: Vec<Answer>,
}

/// Match from the point of view of one participant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResponse {
    pub id: MatchId,
    pub matched_user_id: UserId,
    pub compatibility_score: f64,
    pub status: MatchStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl MatchResponse {
    pub fn for_viewer(m: &Match, viewer: UserId) -> Self {
        Self {
            id: m.id,
            matched_user_id: m.counterpart(viewer),
            compatibility_score: m.compatibility_score,
            status: m.status,
            created_at: m.created_at,
        }
    }
}

/// Response for the match listing and computation endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchListResponse {
    pub matches: Vec<MatchResponse>,
    pub total_results: usize,
}

impl MatchListResponse {
    pub fn for_viewer(matches: &[Match], viewer: UserId) -> Self {
        let matches: Vec<MatchResponse> = matches
            .iter()
            .map(|m| MatchResponse::for_viewer(m, viewer))
            .collect();
        let total_results = matches.len();
        Self {
            matches,
            total_results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_match_response_uses_counterpart() {
        let now = Utc::now();
        let m = Match {
            id: 7,
            user1_id: 1,
            user2_id: 2,
            compatibility_score: 0.8,
            status: MatchStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        let list = MatchListResponse::for_viewer(&[m], 2);
        assert_eq!(list.total_results, 1);
        assert_eq!(list.matches[0].matched_user_id, 1);
    }

    #[test]
    fn test_auth_response_omits_empty_message() {
        let user = User {
            id: 1,
            email: "ada@example.com".to_string(),
            first_name: None,
            last_name: None,
            email_verified: true,
            is_active: true,
            password_hash: Some("hash".to_string()),
            email_verification_token: String::new(),
            matching_score: 0.0,
            last_score_update: None,
            created_at: Utc::now(),
        };
        let response = AuthResponse {
            access: "a".to_string(),
            refresh: "r".to_string(),
            user: UserView::new(user, Profile::default()),
            email_verified: true,
            message: None,
        };

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("message").is_none());
        assert!(json["user"].get("password_hash").is_none());
        assert!(json["user"]["profile"].get("age").is_some());
    }
}
