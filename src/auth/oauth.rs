//! OAuth client-credentials exchange against the PrivX auth service.
//!
//! PrivX issues API tokens through a password grant: the API client ID and
//! secret are the username and password, and the OAuth client pair goes in a
//! Basic authorization header.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;
use tracing::{debug, error, instrument};

use crate::config::Config;
use crate::error::AuthError;
use crate::secret::SecretString;

/// OAuth client for the PrivX token endpoint.
pub struct OAuthClient {
    token_url: String,
    api_client_id: String,
    api_client_secret: SecretString,
    /// Precomputed `Basic` authorization header value.
    digest: SecretString,
    http_client: reqwest::Client,
}

impl OAuthClient {
    /// Create a new OAuth client from configuration, sharing `http_client`.
    pub fn new(config: &Config, http_client: reqwest::Client) -> Self {
        Self {
            token_url: config.token_url(),
            api_client_id: config.privx.api_client_id.clone(),
            api_client_secret: config.privx.api_client_secret.clone(),
            digest: basic_digest(
                &config.privx.oauth_client_id,
                config.privx.oauth_client_secret.expose(),
            ),
            http_client,
        }
    }

    /// Exchange the client credentials for an access token.
    #[instrument(skip(self), fields(token_url = %self.token_url))]
    pub async fn request_token(&self) -> Result<TokenResponse, AuthError> {
        let params = [
            ("grant_type", "password"),
            ("username", self.api_client_id.as_str()),
            ("password", self.api_client_secret.expose()),
        ];

        debug!("Requesting access token with client credentials");

        let response = self
            .http_client
            .post(&self.token_url)
            .header(reqwest::header::AUTHORIZATION, self.digest.expose())
            .form(&params)
            .send()
            .await
            .map_err(AuthError::TokenExchangeNetwork)?;

        if !response.status().is_success() {
            let status = response.status();
            // Body is logged for diagnosis but not surfaced in the error message
            let body = response.text().await.unwrap_or_default();
            error!("Token exchange failed: HTTP {} - {}", status, body);
            return Err(AuthError::TokenExchangeStatus {
                status: status.as_u16(),
                body,
            });
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::TokenResponseInvalid(e.to_string()))?;

        if token_response.access_token.is_empty() {
            return Err(AuthError::TokenResponseInvalid(
                "empty access_token".to_string(),
            ));
        }

        Ok(token_response)
    }
}

/// Token response from the PrivX auth service.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: SecretString,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: u64,
}

/// Build the `Basic base64(id:secret)` header value.
fn basic_digest(client_id: &str, client_secret: &str) -> SecretString {
    let encoded = STANDARD.encode(format!("{}:{}", client_id, client_secret));
    SecretString::new(format!("Basic {}", encoded))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_digest() {
        let digest = basic_digest("privx-external", "s3cret");
        assert_eq!(digest.expose(), "Basic cHJpdngtZXh0ZXJuYWw6czNjcmV0");
    }

    #[test]
    fn test_token_response_defaults() {
        let token: TokenResponse = serde_json::from_str(r#"{"access_token":"abc"}"#).unwrap();
        assert_eq!(token.access_token.expose(), "abc");
        assert_eq!(token.expires_in, 0);
        assert!(token.token_type.is_empty());
    }
}
