//! Seatwatch - course seat availability monitor
//!
//! Keeps an OAuth bearer token fresh while polling the class availability API
//! for a set of course sections, and alerts as soon as seats open up.

pub mod alert;
pub mod args;
pub mod auth;
pub mod catalog;
pub mod command;
pub mod config;
pub mod credential;
pub mod dispatch;
pub mod error;
pub mod io;
pub mod monitor;
pub mod poller;
pub mod pushover;
pub mod state;

pub use config::{load_config, Config};
pub use error::{Result, SeatWatchError};

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::alert::{AlertSink, BellSink};
use crate::auth::{AuthClient, CredentialManager};
use crate::catalog::CourseCatalogClient;
use crate::command::CommandSink;
use crate::config::AlertSinkConfig;
use crate::credential::ClientIdentity;
use crate::dispatch::AlertDispatcher;
use crate::io::{HttpClient, ReqwestHttpClient};
use crate::poller::Poller;
use crate::pushover::PushoverSink;

/// Build the configured alert sinks
pub fn build_sinks(
    configs: &[AlertSinkConfig],
    http: &Arc<dyn HttpClient>,
) -> Vec<Arc<dyn AlertSink>> {
    let mut sinks: Vec<Arc<dyn AlertSink>> = Vec::new();
    for sink_config in configs {
        match sink_config {
            AlertSinkConfig::Bell => sinks.push(Arc::new(BellSink)),
            AlertSinkConfig::Command { .. } => {
                if let Some(sink) = CommandSink::from_config(sink_config) {
                    sinks.push(Arc::new(sink));
                }
            }
            AlertSinkConfig::Pushover { .. } => {
                if let Some(sink) = PushoverSink::from_config(sink_config, Arc::clone(http)) {
                    sinks.push(Arc::new(sink));
                }
            }
        }
    }
    sinks
}

/// Run the seatwatch service with the given configuration
///
/// Returns an error without polling if the configuration is invalid or the
/// initial credential cannot be issued.
pub async fn run(config: Config) -> Result<()> {
    let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new(config.request_timeout)?);
    run_with_client(config, http).await
}

/// Run the service against the given HTTP client
pub async fn run_with_client(config: Config, http: Arc<dyn HttpClient>) -> Result<()> {
    config.validate()?;

    let cancel = CancellationToken::new();
    let targets = config.targets();

    // Issue the first credential before anything polls
    let identity = ClientIdentity::new(&config.client_id, &config.client_secret);
    let auth = AuthClient::new(&config.auth_url, &identity, Arc::clone(&http));
    let initial = auth.issue().await.map_err(|e| {
        SeatWatchError::Auth(format!(
            "Initial token issuance failed, check the client id/secret and that {} is reachable: {}",
            config.auth_url, e
        ))
    })?;
    tracing::info!("Access token issued");

    let (writer, reader) = credential::channel(initial);
    let manager = CredentialManager::new(
        auth,
        writer,
        config.refresh_period,
        config.refresh_retry,
    );

    // Shared state and alert delivery
    let state = state::new_state_handle(&targets, config.alert_history_size);
    let sinks = build_sinks(&config.alerts, &http);
    tracing::debug!(
        "Alert sinks: {:?}",
        sinks.iter().map(|s| s.type_name()).collect::<Vec<_>>()
    );
    let (dispatcher, dispatch_handle) = AlertDispatcher::spawn(
        sinks,
        config.alert_queue_size,
        Arc::clone(&state),
        cancel.clone(),
    );

    let source = Arc::new(CourseCatalogClient::new(
        &config.api_base_url,
        &config.seats_field,
        Arc::clone(&http),
    ));
    let poller = Poller::new(
        source,
        reader,
        targets,
        state,
        dispatcher,
        config.alert_reset,
        config.poll_period,
    );

    // Setup shutdown handler
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutdown signal received");
                cancel_for_signal.cancel();
            }
            Err(e) => tracing::error!("Failed to listen for ctrl-c: {}", e),
        }
    });

    let refresh_handle = tokio::spawn(manager.run(cancel.clone()));

    tracing::info!("Seatwatch started");

    // Poll until cancelled
    poller.run(cancel.clone()).await;

    join_task("credential refresh", refresh_handle).await;
    join_task("alert delivery", dispatch_handle).await;
    tracing::info!("Seatwatch stopped");

    Ok(())
}

/// Wait for a background task, reporting a panic or abort; true if it ended cleanly
async fn join_task(name: &str, handle: JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!("The {} task ended abnormally: {}", name, e);
            false
        }
    }
}
