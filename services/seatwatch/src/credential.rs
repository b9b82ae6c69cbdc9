//! Bearer credential state shared between the refresh task and the poller
//!
//! The credential is published through a `watch` channel holding an
//! `Arc<Credential>`. A refresh replaces the whole record, so readers only
//! ever see a bearer token together with the renewal secret it was issued with.

use std::fmt;
use std::sync::Arc;

use base64::Engine;
use chrono::{DateTime, Utc};
use tokio::sync::watch;

/// A bearer token and the renewal secret issued with it
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub bearer_token: String,
    pub renewal_secret: String,
    pub issued_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(bearer_token: impl Into<String>, renewal_secret: impl Into<String>) -> Self {
        Self {
            bearer_token: bearer_token.into(),
            renewal_secret: renewal_secret.into(),
            issued_at: Utc::now(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("bearer_token", &redact(&self.bearer_token))
            .field("renewal_secret", &redact(&self.renewal_secret))
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

fn redact(secret: &str) -> String {
    format!("<{} chars>", secret.len())
}

/// API client identity used to obtain and renew credentials
#[derive(Clone)]
pub struct ClientIdentity {
    pub client_id: String,
    pub client_secret: String,
}

impl ClientIdentity {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Base64 of `client_id:client_secret`, sent as HTTP Basic authorization
    pub fn renewal_key(&self) -> String {
        base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", self.client_id, self.client_secret))
    }
}

impl fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

/// Create the shared credential holder seeded with an issued credential
pub fn channel(initial: Credential) -> (CredentialWriter, CredentialReader) {
    let (tx, rx) = watch::channel(Arc::new(initial));
    (CredentialWriter { tx }, CredentialReader { rx })
}

/// Exclusive write side of the credential holder
#[derive(Debug)]
pub struct CredentialWriter {
    tx: watch::Sender<Arc<Credential>>,
}

impl CredentialWriter {
    /// Replace the current credential as a single unit
    pub fn replace(&self, credential: Credential) {
        self.tx.send_replace(Arc::new(credential));
    }

    pub fn current(&self) -> Arc<Credential> {
        Arc::clone(&self.tx.borrow())
    }

    /// A new read-only accessor for the same credential
    pub fn reader(&self) -> CredentialReader {
        CredentialReader {
            rx: self.tx.subscribe(),
        }
    }
}

/// Read-only accessor to the current credential
#[derive(Debug, Clone)]
pub struct CredentialReader {
    rx: watch::Receiver<Arc<Credential>>,
}

impl CredentialReader {
    pub fn current(&self) -> Arc<Credential> {
        Arc::clone(&self.rx.borrow())
    }
}
