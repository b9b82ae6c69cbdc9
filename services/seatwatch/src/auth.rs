//! Credential issuance and scheduled renewal against the token endpoint

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::credential::{ClientIdentity, Credential, CredentialWriter};
use crate::io::HttpClient;
use crate::SeatWatchError;

pub const TOKEN_SCOPE: &str = "PRODUCTION";

/// Successful token endpoint payload
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Client for the OAuth token endpoint
pub struct AuthClient {
    token_url: String,
    authorization: String,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for AuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthClient")
            .field("token_url", &self.token_url)
            .finish()
    }
}

impl AuthClient {
    pub fn new(token_url: &str, identity: &ClientIdentity, http: Arc<dyn HttpClient>) -> Self {
        Self {
            token_url: token_url.to_string(),
            authorization: format!("Basic {}", identity.renewal_key()),
            http,
        }
    }

    /// Obtain a fresh credential with the client-credentials grant
    pub async fn issue(&self) -> crate::Result<Credential> {
        let response = self
            .exchange(
                "issuance",
                &[("grant_type", "client_credentials"), ("scope", TOKEN_SCOPE)],
            )
            .await?;

        let renewal_secret = response
            .refresh_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                SeatWatchError::Auth("Token issuance response has no refresh_token".to_string())
            })?;

        Ok(Credential::new(response.access_token, renewal_secret))
    }

    /// Exchange `renewal_secret` for a new credential
    ///
    /// A server that does not rotate refresh tokens may omit `refresh_token`;
    /// the current secret is then carried over.
    pub async fn refresh(&self, renewal_secret: &str) -> crate::Result<Credential> {
        let response = self
            .exchange(
                "refresh",
                &[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", renewal_secret),
                    ("scope", TOKEN_SCOPE),
                ],
            )
            .await?;

        let renewal_secret = response
            .refresh_token
            .filter(|token| !token.is_empty())
            .unwrap_or_else(|| renewal_secret.to_string());

        Ok(Credential::new(response.access_token, renewal_secret))
    }

    async fn exchange(
        &self,
        grant: &str,
        params: &[(&str, &str)],
    ) -> crate::Result<TokenResponse> {
        let response = self
            .http
            .post_form(&self.token_url, &self.authorization, params)
            .await?;

        if response.status != 200 {
            return Err(SeatWatchError::Auth(format!(
                "Token {} returned status {}: {}",
                grant,
                response.status,
                response.body.trim()
            )));
        }

        let parsed: TokenResponse = serde_json::from_str(&response.body).map_err(|e| {
            SeatWatchError::Auth(format!("Malformed token {} response: {}", grant, e))
        })?;

        if parsed.access_token.is_empty() {
            return Err(SeatWatchError::Auth(format!(
                "Token {} response has an empty access_token",
                grant
            )));
        }

        tracing::debug!(
            "Token {} succeeded ({} byte response, expires_in={:?})",
            grant,
            response.body.len(),
            parsed.expires_in
        );
        Ok(parsed)
    }
}

/// Retry delay after consecutive refresh failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshBackoff {
    pub base: Duration,
    pub max: Duration,
}

impl RefreshBackoff {
    /// `base * 2^(n-1)` for `n` consecutive failures, capped at `max`
    pub fn delay(&self, consecutive_failures: u32) -> Duration {
        if consecutive_failures == 0 {
            return self.max;
        }
        let factor = 1u32
            .checked_shl(consecutive_failures - 1)
            .unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }
}

/// Owns the credential writer and keeps the credential renewed
#[derive(Debug)]
pub struct CredentialManager {
    auth: AuthClient,
    writer: CredentialWriter,
    period: Duration,
    backoff: RefreshBackoff,
}

impl CredentialManager {
    pub fn new(
        auth: AuthClient,
        writer: CredentialWriter,
        period: Duration,
        retry: Duration,
    ) -> Self {
        Self {
            auth,
            writer,
            period,
            backoff: RefreshBackoff {
                base: retry,
                max: period,
            },
        }
    }

    /// Refresh once, replacing the shared credential only on success
    pub async fn refresh_once(&self) -> crate::Result<()> {
        let current = self.writer.current();
        let renewed = self.auth.refresh(&current.renewal_secret).await?;
        self.writer.replace(renewed);
        tracing::info!("Access token refreshed");
        Ok(())
    }

    /// Refresh on a fixed schedule until cancelled
    ///
    /// A failed refresh keeps the existing credential and retries with
    /// backoff; the first success returns to the regular period.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(
            "Refreshing access token every {}",
            humantime::format_duration(self.period)
        );

        let mut failures: u32 = 0;
        let mut next = Instant::now() + self.period;

        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(next) => {}
                _ = cancel.cancelled() => {
                    tracing::debug!("Credential refresh loop cancelled");
                    break;
                }
            }

            match self.refresh_once().await {
                Ok(()) => {
                    failures = 0;
                    next += self.period;
                    let now = Instant::now();
                    if next <= now {
                        next = now + self.period;
                    }
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    let delay = self.backoff.delay(failures);
                    tracing::warn!(
                        "Token refresh failed ({} in a row), keeping current token, retrying in {}: {}",
                        failures,
                        humantime::format_duration(delay),
                        e
                    );
                    next = Instant::now() + delay;
                }
            }
        }
    }
}
