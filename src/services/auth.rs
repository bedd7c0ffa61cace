use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::UserId;

/// Errors raised while issuing or checking credentials
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Token error: {0}")]
    TokenError(#[from] jsonwebtoken::errors::Error),

    #[error("Expected a {expected:?} token")]
    WrongTokenKind { expected: TokenKind },

    #[error("Token has been revoked")]
    Revoked,

    #[error("Password hashing failed: {0}")]
    HashError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims carried by both token kinds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub exp: i64,
    pub iat: i64,
    pub jti: Uuid,
    pub kind: TokenKind,
}

impl Claims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_else(Utc::now)
    }
}

/// Access/refresh pair handed out on login
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Issues and validates HS256 tokens
#[derive(Clone)]
pub struct AuthService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl AuthService {
    pub fn new(secret: &str, access_ttl_secs: i64, refresh_ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl: Duration::seconds(access_ttl_secs),
            refresh_ttl: Duration::seconds(refresh_ttl_secs),
        }
    }

    pub fn issue_pair(&self, user_id: UserId) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access: self.issue(user_id, TokenKind::Access)?,
            refresh: self.issue(user_id, TokenKind::Refresh)?,
        })
    }

    pub fn issue(&self, user_id: UserId, kind: TokenKind) -> Result<String, AuthError> {
        let now = Utc::now();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let claims = Claims {
            sub: user_id,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4(),
            kind,
        };

        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    /// Decode a token and check signature, expiry and kind
    pub fn validate(&self, token: &str, expected: TokenKind) -> Result<Claims, AuthError> {
        let claims = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))?
            .claims;

        if claims.kind != expected {
            return Err(AuthError::WrongTokenKind { expected });
        }
        Ok(claims)
    }
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut rand::rngs::OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::HashError(e.to_string()))
}

/// Check a password against a stored hash; malformed hashes never verify
pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Six-digit email verification code
pub fn generate_otp() -> String {
    let mut rng = rand::thread_rng();
    (0..6).map(|_| char::from(b'0' + rng.gen_range(0..10u8))).collect()
}

/// Trim the address and lowercase its domain part
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip_and_kind() {
        let auth = AuthService::new("test-secret", 300, 3600);
        let pair = auth.issue_pair(42).unwrap();

        let claims = auth.validate(&pair.access, TokenKind::Access).unwrap();
        assert_eq!(claims.sub, 42);

        let err = auth.validate(&pair.access, TokenKind::Refresh).unwrap_err();
        assert!(matches!(err, AuthError::WrongTokenKind { expected: TokenKind::Refresh }));
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let issuer = AuthService::new("secret-a", 300, 3600);
        let verifier = AuthService::new("secret-b", 300, 3600);

        let token = issuer.issue(1, TokenKind::Access).unwrap();
        assert!(verifier.validate(&token, TokenKind::Access).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let auth = AuthService::new("test-secret", -3600, -3600);
        let token = auth.issue(1, TokenKind::Access).unwrap();
        assert!(auth.validate(&token, TokenKind::Access).is_err());
    }

    #[test]
    fn test_password_hash_verifies() {
        let hash = hash_password("hunter2hunter2").unwrap();
        assert!(verify_password("hunter2hunter2", &hash));
        assert!(!verify_password("hunter3hunter3", &hash));
        assert!(!verify_password("hunter2hunter2", "not-a-hash"));
    }

    #[test]
    fn test_otp_shape() {
        let otp = generate_otp();
        assert_eq!(otp.len(), 6);
        assert!(otp.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email(" Ada@Example.COM "), "Ada@example.com");
        assert_eq!(normalize_email("no-at-sign"), "no-at-sign");
    }
}
