use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when delivering mail
#[derive(Debug, Error)]
pub enum MailError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Mail API returned error: {0}")]
    ApiError(String),
}

/// Message body accepted by the transactional mail API
#[derive(Debug, Clone, Serialize)]
struct OutgoingMessage<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: String,
}

/// Client for an HTTP transactional mail API
///
/// Posts JSON messages to `{base_url}/send` with a bearer API key. With an
/// empty base URL nothing is sent and the message is only logged, which is
/// what local development runs use.
pub struct MailClient {
    base_url: String,
    api_key: String,
    from_address: String,
    client: Client,
}

impl MailClient {
    pub fn new(base_url: String, api_key: String, from_address: String) -> Result<Self, MailError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            base_url,
            api_key,
            from_address,
            client,
        })
    }

    pub fn is_enabled(&self) -> bool {
        !self.base_url.is_empty()
    }

    /// Send the six-digit email verification code
    pub async fn send_verification_code(&self, email: &str, code: &str) -> Result<(), MailError> {
        let message = OutgoingMessage {
            from: &self.from_address,
            to: [email],
            subject: "Verify your email",
            text: format!("Your verification code is: {}", code),
        };

        if !self.is_enabled() {
            tracing::warn!("Mail delivery disabled, verification code for {} not sent", email);
            return Ok(());
        }

        let url = format!("{}/send", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&message)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read body".to_string());
            tracing::error!("Failed to send mail to {}: {} - {}", email, status, body);
            return Err(MailError::ApiError(format!("Failed to send mail: {}", status)));
        }

        tracing::debug!("Sent verification code to {}", email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sends_verification_code() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/send")
            .match_header("authorization", "Bearer mail-key")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "to": ["ada@example.com"],
                "text": "Your verification code is: 123456",
            })))
            .with_status(202)
            .create_async()
            .await;

        let client = MailClient::new(
            server.url(),
            "mail-key".to_string(),
            "no-reply@kelibe.com".to_string(),
        )
        .unwrap();

        client
            .send_verification_code("ada@example.com", "123456")
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_failure_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/send")
            .with_status(500)
            .create_async()
            .await;

        let client =
            MailClient::new(server.url(), "k".to_string(), "no-reply@kelibe.com".to_string())
                .unwrap();

        let err = client
            .send_verification_code("ada@example.com", "123456")
            .await
            .unwrap_err();
        assert!(matches!(err, MailError::ApiError(_)));
    }

    #[tokio::test]
    async fn test_disabled_client_skips_delivery() {
        let client =
            MailClient::new(String::new(), String::new(), "no-reply@kelibe.com".to_string())
                .unwrap();
        assert!(!client.is_enabled());
        assert!(client.send_verification_code("ada@example.com", "1").await.is_ok());
    }
}
