use actix_web::{web, HttpRequest, HttpResponse};
use validator::Validate;

use crate::models::{
    AccessTokenResponse, AuthResponse, GoogleAuthRequest, LoginRequest, Profile, ProfileUpdate,
    RefreshRequest, RegisterRequest, RegisterResponse, User, UserView, VerifyEmailRequest,
};
use crate::models::UserId;
use crate::routes::{authenticate, ApiError, AppState};
use crate::services::auth::{generate_otp, hash_password, normalize_email, verify_password};
use crate::services::{AuthError, Claims, GoogleIdentity, NewUser, TokenKind};

const INVALID_CREDENTIALS: &str = "No active account found with the given credentials";
const VERIFICATION_RESENT: &str = "Please verify your email. A new verification code has been sent.";

/// Configure authentication routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/register", web::post().to(register))
            .route("/token", web::post().to(login))
            .route("/token/refresh", web::post().to(refresh))
            .route("/verify-email", web::post().to(verify_email))
            .route("/google", web::post().to(google_sign_in))
            .route("/logout", web::post().to(logout)),
    );
}

/// Issue a token pair for `user` and wrap it in the login response shape
fn auth_response(
    state: &AppState,
    user: User,
    profile: Profile,
    message: Option<String>,
) -> Result<AuthResponse, ApiError> {
    let tokens = state.auth.issue_pair(user.id)?;
    let email_verified = user.email_verified;

    Ok(AuthResponse {
        access: tokens.access,
        refresh: tokens.refresh,
        user: UserView::new(user, profile),
        email_verified,
        message,
    })
}

/// Result of a successful password check
#[derive(Debug, PartialEq)]
enum LoginOutcome {
    Verified,
    /// Tokens are still issued, but a fresh code must be mailed
    NeedsVerification,
}

/// Check login credentials. Runs Argon2, so call it off the async worker.
fn check_credentials(user: Option<&User>, password: &str) -> Result<LoginOutcome, ApiError> {
    let user = user.ok_or_else(|| ApiError::unauthorized(INVALID_CREDENTIALS))?;

    let password_ok = user
        .password_hash
        .as_deref()
        .map(|hash| verify_password(password, hash))
        .unwrap_or(false);
    if !password_ok || !user.is_active {
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    }

    if user.email_verified {
        Ok(LoginOutcome::Verified)
    } else {
        Ok(LoginOutcome::NeedsVerification)
    }
}

/// Decide whether `otp` confirms the email of `user`
fn check_verification(user: Option<&User>, otp: &str) -> Result<UserId, ApiError> {
    let user = user.ok_or_else(|| ApiError::bad_request("No user found with this email"))?;

    if user.email_verified {
        return Err(ApiError::bad_request("Email already verified"));
    }
    if user.email_verification_token.is_empty() || user.email_verification_token != otp.trim() {
        return Err(ApiError::bad_request("Invalid verification code"));
    }
    Ok(user.id)
}

/// Subject of a refresh token, unless logout revoked it
fn refresh_subject(claims: &Claims, revoked: bool) -> Result<UserId, ApiError> {
    if revoked {
        return Err(AuthError::Revoked.into());
    }
    Ok(claims.sub)
}

/// Account a Google identity signs in to
#[derive(Debug)]
enum GoogleAccount {
    Existing(User, Profile),
    New(NewUser, ProfileUpdate),
}

fn resolve_google_account(
    existing: Option<(User, Profile)>,
    email: String,
    identity: &GoogleIdentity,
) -> Result<GoogleAccount, ApiError> {
    match existing {
        Some((user, _)) if !user.is_active => Err(ApiError::bad_request("Please verify your email first")),
        Some((user, profile)) => Ok(GoogleAccount::Existing(user, profile)),
        None => Ok(GoogleAccount::New(
            NewUser {
                email,
                password_hash: None,
                first_name: identity.given_name.clone(),
                last_name: identity.family_name.clone(),
                email_verified: identity.email_verified,
                verification_token: String::new(),
            },
            ProfileUpdate {
                avatar: identity.picture.clone(),
                ..ProfileUpdate::default()
            },
        )),
    }
}

/// Register a new account
///
/// POST /api/v1/auth/register
async fn register(
    state: web::Data<AppState>,
    req: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;

    let email = normalize_email(&req.email);
    let password = req.password.clone();
    let password_hash = web::block(move || hash_password(&password)).await??;

    let otp = generate_otp();
    let new_user = NewUser {
        email: email.clone(),
        password_hash: Some(password_hash),
        first_name: req.first_name.clone(),
        last_name: req.last_name.clone(),
        email_verified: false,
        verification_token: otp.clone(),
    };

    let (user, _) = state.postgres.create_user(&new_user, req.profile.as_ref()).await?;
    state.mailer.send_verification_code(&user.email, &otp).await?;

    tracing::info!("Registered user {}", user.id);

    Ok(HttpResponse::Created().json(RegisterResponse {
        message: "Registration successful. Please check your email for verification code."
            .to_string(),
        email,
    }))
}

/// Email/password login
///
/// POST /api/v1/auth/token
///
/// Unverified users still get tokens, plus a fresh verification code.
async fn login(
    state: web::Data<AppState>,
    req: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;

    let email = normalize_email(&req.email);
    let found = state.postgres.find_user_by_email(&email).await?;

    let candidate = found.as_ref().map(|(user, _)| user.clone());
    let password = req.password.clone();
    let outcome = web::block(move || check_credentials(candidate.as_ref(), &password))
        .await?
        .map_err(|err| {
            tracing::info!("Rejected login for {}", email);
            err
        })?;
    let (user, profile) = found.ok_or_else(|| ApiError::unauthorized(INVALID_CREDENTIALS))?;

    let mut message = None;
    if outcome == LoginOutcome::NeedsVerification {
        let otp = generate_otp();
        state.postgres.set_verification_token(user.id, &otp).await?;
        state.mailer.send_verification_code(&user.email, &otp).await?;
        message = Some(VERIFICATION_RESENT.to_string());
    }

    tracing::info!("User {} logged in", user.id);
    Ok(HttpResponse::Ok().json(auth_response(&state, user, profile, message)?))
}

/// Exchange a refresh token for a new access token
///
/// POST /api/v1/auth/token/refresh
async fn refresh(
    state: web::Data<AppState>,
    req: web::Json<RefreshRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;

    let claims = state.auth.validate(&req.refresh, TokenKind::Refresh)?;
    let revoked = state.postgres.is_token_revoked(claims.jti).await?;
    let user_id = refresh_subject(&claims, revoked)?;

    let access = state.auth.issue(user_id, TokenKind::Access)?;
    Ok(HttpResponse::Ok().json(AccessTokenResponse { access }))
}

/// Confirm an email address with the mailed code
///
/// POST /api/v1/auth/verify-email
async fn verify_email(
    state: web::Data<AppState>,
    req: web::Json<VerifyEmailRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;

    let email = normalize_email(&req.email);
    let found = state.postgres.find_user_by_email(&email).await?;
    let user_id = check_verification(found.as_ref().map(|(user, _)| user), &req.otp)?;

    let (user, profile) = state.postgres.mark_email_verified(user_id).await?;
    tracing::info!("User {} verified their email", user.id);

    Ok(HttpResponse::Ok().json(auth_response(
        &state,
        user,
        profile,
        Some("Email verified successfully".to_string()),
    )?))
}

/// Sign in (or sign up) with a Google ID token
///
/// POST /api/v1/auth/google
async fn google_sign_in(
    state: web::Data<AppState>,
    req: web::Json<GoogleAuthRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;

    let identity = state.google.verify(&req.token).await?;
    let email = normalize_email(&identity.email);

    let existing = state.postgres.find_user_by_email(&email).await?;

    let (user, profile) = match resolve_google_account(existing, email, &identity)? {
        GoogleAccount::Existing(user, profile) => (user, profile),
        GoogleAccount::New(new_user, profile) => {
            let created = state.postgres.create_user(&new_user, Some(&profile)).await?;
            tracing::info!("Created user {} from Google sign-in", created.0.id);
            created
        }
    };

    Ok(HttpResponse::Ok().json(auth_response(&state, user, profile, None)?))
}

/// Revoke the presented refresh token
///
/// POST /api/v1/auth/logout
async fn logout(
    state: web::Data<AppState>,
    http_req: HttpRequest,
    req: web::Json<RefreshRequest>,
) -> Result<HttpResponse, ApiError> {
    let user_id = authenticate(&http_req, &state)?;
    req.validate()?;

    let claims = state.auth.validate(&req.refresh, TokenKind::Refresh)?;
    if claims.sub != user_id {
        return Err(ApiError::bad_request("Refresh token belongs to another user"));
    }

    state.postgres.revoke_token(claims.jti, claims.expires_at()).await?;
    tracing::info!("User {} logged out", user_id);

    Ok(HttpResponse::NoContent().finish())
}
