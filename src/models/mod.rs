// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    Answer, AnswerPayload, AnswerRecord, FeatureVector, Gender, LookingFor, Match, MatchId,
    MatchStatus, Profile, Question, QuestionCategory, QuestionChoice, QuestionId, QuestionType,
    User, UserId,
};
pub use requests::{
    BulkAnswerRequest, GoogleAuthRequest, LoginRequest, ProfileUpdate, RefreshRequest,
    RegisterRequest, RespondMatchRequest, SubmitAnswerRequest, UpdateProfileRequest,
    VerifyEmailRequest,
};
pub use responses::{
    AccessTokenResponse, AuthResponse, CategoryDetailResponse, ErrorResponse, HealthResponse,
    MatchListResponse, MatchResponse, ProfileView, RegisterResponse, UserView,
};
