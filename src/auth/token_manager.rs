//! Access token lifecycle for a single client instance.

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use super::oauth::OAuthClient;
use crate::error::AuthError;
use crate::secret::SecretString;

/// Tokens are replaced this long before their reported expiry.
const REFRESH_MARGIN_SECONDS: i64 = 30;

/// Reported lifetimes are capped at one day.
const MAX_LIFETIME_SECONDS: u64 = 86_400;

/// An issued access token and when it stops being usable.
struct IssuedToken {
    token: SecretString,
    expires_at: DateTime<Utc>,
}

impl IssuedToken {
    fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(REFRESH_MARGIN_SECONDS) > now
    }
}

/// Hands out bearer tokens, requesting a new one from the auth service when
/// the current token is missing or about to expire.
pub struct TokenManager {
    oauth_client: OAuthClient,
    current: Mutex<Option<IssuedToken>>,
}

impl TokenManager {
    /// Create a new token manager.
    pub fn new(oauth_client: OAuthClient) -> Self {
        Self {
            oauth_client,
            current: Mutex::new(None),
        }
    }

    /// Return a usable access token, exchanging credentials if needed.
    pub async fn access_token(&self) -> Result<SecretString, AuthError> {
        let mut current = self.current.lock().await;

        if let Some(issued) = current.as_ref() {
            if issued.is_usable(Utc::now()) {
                return Ok(issued.token.clone());
            }
            debug!("Access token expired at {}, requesting a new one", issued.expires_at);
        }

        let issued = self.exchange().await?;
        let token = issued.token.clone();
        *current = Some(issued);
        Ok(token)
    }

    /// Exchange the client credentials unconditionally.
    ///
    /// Used as a credential/liveness check; never retried.
    pub async fn verify(&self) -> Result<(), AuthError> {
        debug!("Calling token endpoint with client credentials");

        let issued = self.exchange().await.inspect_err(|e| {
            error!(
                "Could not fetch an API access token with client credentials: {}",
                e
            );
        })?;

        *self.current.lock().await = Some(issued);
        Ok(())
    }

    async fn exchange(&self) -> Result<IssuedToken, AuthError> {
        let response = self.oauth_client.request_token().await?;
        let lifetime = response.expires_in.min(MAX_LIFETIME_SECONDS) as i64;
        let expires_at = Utc::now() + Duration::seconds(lifetime);

        info!("Access token issued, expires at {}", expires_at);

        Ok(IssuedToken {
            token: response.access_token,
            expires_at,
        })
    }
}
