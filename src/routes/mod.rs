// Route exports
pub mod auth;
pub mod matches;
pub mod profile;
pub mod questionnaire;

use actix_web::{error, http::StatusCode, web, HttpRequest, HttpResponse};
use std::fmt;
use std::sync::Arc;
use validator::ValidationErrors;

use crate::core::{AnswerValidationError, Matcher, MatchingError};
use crate::models::{ErrorResponse, UserId};
use crate::services::{
    AuthError, AuthService, GoogleAuthError, GoogleVerifier, MailClient, MailError,
    PostgresClient, StoreError, TokenKind,
};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub postgres: Arc<PostgresClient>,
    pub matcher: Matcher,
    pub auth: AuthService,
    pub mailer: Arc<MailClient>,
    pub google: Arc<GoogleVerifier>,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(matches::configure)
            .configure(auth::configure)
            .configure(profile::configure)
            .configure(questionnaire::configure),
    );
}

/// Error returned by handlers, rendered as an `ErrorResponse` body
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, error: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            error: error.to_string(),
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Bad request", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized", message)
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Not found", "Not found.")
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for ApiError {}

impl error::ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.status
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status).json(ErrorResponse {
            error: self.error.clone(),
            message: self.message.clone(),
            status_code: self.status.as_u16(),
        })
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => ApiError::not_found(),
            StoreError::Conflict(msg) | StoreError::InvalidInput(msg) => ApiError::bad_request(msg),
            StoreError::DuplicatePair(..) => ApiError::bad_request(err.to_string()),
            other => {
                tracing::error!("Store failure: {}", other);
                ApiError::internal("Database error")
            }
        }
    }
}

impl From<MatchingError> for ApiError {
    fn from(err: MatchingError) -> Self {
        match err {
            MatchingError::TransitionNotAllowed => ApiError::not_found(),
            MatchingError::Store(e) => e.into(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::HashError(msg) => {
                tracing::error!("Password hashing failed: {}", msg);
                ApiError::internal("Could not process credentials")
            }
            other => ApiError::unauthorized(other.to_string()),
        }
    }
}

impl From<AnswerValidationError> for ApiError {
    fn from(err: AnswerValidationError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        tracing::info!("Validation failed: field_errors={:?}", errors.field_errors());
        ApiError::new(StatusCode::BAD_REQUEST, "Validation failed", errors.to_string())
    }
}

impl From<error::BlockingError> for ApiError {
    fn from(err: error::BlockingError) -> Self {
        tracing::error!("Blocking task failed: {}", err);
        ApiError::internal("Could not process credentials")
    }
}

impl From<MailError> for ApiError {
    fn from(err: MailError) -> Self {
        tracing::error!("Mail delivery failed: {}", err);
        ApiError::internal("Failed to send verification email")
    }
}

impl From<GoogleAuthError> for ApiError {
    fn from(err: GoogleAuthError) -> Self {
        match err {
            GoogleAuthError::RequestError(e) => {
                tracing::error!("Google tokeninfo request failed: {}", e);
                ApiError::internal("Could not reach Google")
            }
            other => ApiError::bad_request(format!("Invalid Google token: {}", other)),
        }
    }
}

/// Resolve the caller from the `Authorization: Bearer` access token
pub fn authenticate(req: &HttpRequest, state: &AppState) -> Result<UserId, ApiError> {
    let header = req
        .headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("Authentication credentials were not provided."))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::unauthorized("Authorization header must use the Bearer scheme"))?;

    let claims = state.auth.validate(token.trim(), TokenKind::Access)?;
    Ok(claims.sub)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use actix_web::ResponseError;

    #[actix_web::test]
    async fn test_transition_errors_render_as_not_found() {
        let err: ApiError = MatchingError::TransitionNotAllowed.into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let body = to_bytes(err.error_response().into_body()).await.unwrap();
        let parsed: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed.status_code, 404);
        assert_eq!(parsed.message, "Not found.");
    }

    #[test]
    fn test_store_errors_map_to_status() {
        let conflict: ApiError = StoreError::Conflict("taken".to_string()).into();
        assert_eq!(conflict.status, StatusCode::BAD_REQUEST);

        let missing: ApiError = StoreError::NotFound("user 1".to_string()).into();
        assert_eq!(missing.status, StatusCode::NOT_FOUND);

        let down: ApiError = StoreError::Unavailable("pool closed".to_string()).into();
        assert_eq!(down.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_answer_validation_is_bad_request() {
        let err: ApiError = AnswerValidationError::OutOfRange { min: 1, max: 5 }.into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Response must be a number between 1 and 5");
    }

    #[actix_web::test]
    async fn test_lost_blocking_pool_is_internal_error() {
        // `BlockingError` is `#[non_exhaustive]`; obtain one from a failed blocking task.
        let blocking_err = actix_web::web::block(|| -> () { panic!("blocking task lost") })
            .await
            .unwrap_err();
        let err: ApiError = blocking_err.into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Could not process credentials");
    }
}
