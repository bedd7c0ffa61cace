use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// Errors that can occur while verifying a Google ID token
#[derive(Debug, Error)]
pub enum GoogleAuthError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Invalid token")]
    InvalidToken,

    #[error("Wrong issuer: {0}")]
    WrongIssuer(String),

    #[error("Token was issued for another client")]
    WrongAudience,
}

/// Identity claims extracted from a verified token
#[derive(Debug, Clone, PartialEq)]
pub struct GoogleIdentity {
    pub email: String,
    pub email_verified: bool,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub picture: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    iss: String,
    aud: String,
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<Value>,
    given_name: Option<String>,
    family_name: Option<String>,
    picture: Option<String>,
}

/// Verifies Google ID tokens against the tokeninfo endpoint
pub struct GoogleVerifier {
    tokeninfo_url: String,
    client_id: String,
    client: Client,
}

impl GoogleVerifier {
    pub fn new(tokeninfo_url: String, client_id: String) -> Result<Self, GoogleAuthError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            tokeninfo_url,
            client_id,
            client,
        })
    }

    /// Check the token with Google and return the identity it vouches for
    pub async fn verify(&self, id_token: &str) -> Result<GoogleIdentity, GoogleAuthError> {
        let response = self
            .client
            .get(&self.tokeninfo_url)
            .query(&[("id_token", id_token)])
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::debug!("Google rejected ID token: {}", response.status());
            return Err(GoogleAuthError::InvalidToken);
        }

        let info: TokenInfo = response
            .json()
            .await
            .map_err(|_| GoogleAuthError::InvalidToken)?;

        if !GOOGLE_ISSUERS.contains(&info.iss.as_str()) {
            return Err(GoogleAuthError::WrongIssuer(info.iss));
        }
        if info.aud != self.client_id {
            return Err(GoogleAuthError::WrongAudience);
        }

        let email = info.email.ok_or(GoogleAuthError::InvalidToken)?;
        // tokeninfo reports booleans as strings
        let email_verified = match info.email_verified {
            Some(Value::Bool(b)) => b,
            Some(Value::String(s)) => s == "true",
            _ => false,
        };

        Ok(GoogleIdentity {
            email,
            email_verified,
            given_name: info.given_name,
            family_name: info.family_name,
            picture: info.picture,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    async fn verifier_with(
        body: serde_json::Value,
        status: usize,
    ) -> (mockito::ServerGuard, mockito::Mock, GoogleVerifier) {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/tokeninfo")
            .match_query(Matcher::UrlEncoded("id_token".into(), "tok".into()))
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;

        let verifier = GoogleVerifier::new(
            format!("{}/tokeninfo", server.url()),
            "client-123".to_string(),
        )
        .unwrap();
        (server, mock, verifier)
    }

    #[tokio::test]
    async fn test_valid_token() {
        let (_server, _mock, verifier) = verifier_with(
            serde_json::json!({
                "iss": "https://accounts.google.com",
                "aud": "client-123",
                "email": "ada@example.com",
                "email_verified": "true",
                "given_name": "Ada",
                "family_name": "Lovelace",
                "picture": "https://example.com/ada.png",
            }),
            200,
        )
        .await;

        let identity = verifier.verify("tok").await.unwrap();
        assert_eq!(identity.email, "ada@example.com");
        assert!(identity.email_verified);
        assert_eq!(identity.given_name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn test_wrong_issuer() {
        let (_server, _mock, verifier) = verifier_with(
            serde_json::json!({ "iss": "evil.example", "aud": "client-123", "email": "x@y.z" }),
            200,
        )
        .await;

        let err = verifier.verify("tok").await.unwrap_err();
        assert!(matches!(err, GoogleAuthError::WrongIssuer(_)));
    }

    #[tokio::test]
    async fn test_wrong_audience() {
        let (_server, _mock, verifier) = verifier_with(
            serde_json::json!({ "iss": "accounts.google.com", "aud": "other", "email": "x@y.z" }),
            200,
        )
        .await;

        let err = verifier.verify("tok").await.unwrap_err();
        assert!(matches!(err, GoogleAuthError::WrongAudience));
    }

    #[tokio::test]
    async fn test_rejected_token() {
        let (_server, _mock, verifier) =
            verifier_with(serde_json::json!({ "error": "invalid_token" }), 400).await;

        let err = verifier.verify("tok").await.unwrap_err();
        assert!(matches!(err, GoogleAuthError::InvalidToken));
    }
}
