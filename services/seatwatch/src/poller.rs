//! Poller: queries seat counts on a fixed rate and raises alerts on openings

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::alert::Alert;
use crate::config::AlertReset;
use crate::credential::CredentialReader;
use crate::dispatch::AlertDispatcher;
use crate::monitor::{MonitorTarget, SeatSnapshot, SeatSource};
use crate::state::{current_epoch_ms, StateHandle};

const ERROR_STREAK_WARNING: u32 = 5;

/// Polls every monitored target and hands rising edges to the dispatcher
#[derive(Debug)]
pub struct Poller {
    source: Arc<dyn SeatSource>,
    credentials: CredentialReader,
    targets: Vec<MonitorTarget>,
    state: StateHandle,
    alerts: AlertDispatcher,
    reset: AlertReset,
    period: Duration,
}

impl Poller {
    pub fn new(
        source: Arc<dyn SeatSource>,
        credentials: CredentialReader,
        targets: Vec<MonitorTarget>,
        state: StateHandle,
        alerts: AlertDispatcher,
        reset: AlertReset,
        period: Duration,
    ) -> Self {
        Self {
            source,
            credentials,
            targets,
            state,
            alerts,
            reset,
            period,
        }
    }

    /// Query every target once with the current credential
    ///
    /// Failed queries are logged and left out of the result; the remaining
    /// targets are still polled.
    pub async fn poll_once(&self) -> Vec<SeatSnapshot> {
        let credential = self.credentials.current();
        let mut snapshots = Vec::with_capacity(self.targets.len());

        for target in &self.targets {
            match self
                .source
                .query_seats(target, &credential.bearer_token)
                .await
            {
                Ok(open_seats) => snapshots.push(SeatSnapshot {
                    target: *target,
                    open_seats,
                    observed_at: Utc::now(),
                }),
                Err(e) => {
                    tracing::warn!("Polling class {} failed: {}", target, e);
                    let errors = self
                        .state
                        .write()
                        .await
                        .record_failure(target, current_epoch_ms());
                    warn_on_error_streak(target, errors);
                }
            }
        }

        snapshots
    }

    /// Feed snapshots through the per-target alert state, returning how many
    /// alerts were queued
    pub async fn evaluate(&self, snapshots: &[SeatSnapshot]) -> usize {
        let mut queued = 0;

        for snapshot in snapshots {
            let now_ms = u64::try_from(snapshot.observed_at.timestamp_millis()).unwrap_or(0);
            let (alert_due, errors) = {
                let mut state = self.state.write().await;
                let due = state.observe(&snapshot.target, snapshot.open_seats, now_ms, self.reset);
                (due, state.consecutive_errors(&snapshot.target))
            };

            if !snapshot.is_known() {
                tracing::warn!("Class {} returned an unrecognized response", snapshot.target);
                warn_on_error_streak(&snapshot.target, errors);
                continue;
            }

            tracing::debug!(
                "Class {}: {} open seats (alert={})",
                snapshot.target,
                snapshot.open_seats,
                alert_due
            );

            if alert_due {
                tracing::info!(
                    "Seats opened in class {}: {}",
                    snapshot.target,
                    snapshot.open_seats
                );
                if self
                    .alerts
                    .dispatch(Alert::seats_open(snapshot.target, snapshot.open_seats))
                {
                    queued += 1;
                }
            }
        }

        queued
    }

    /// One full poll cycle
    pub async fn run_cycle(&self) -> Vec<SeatSnapshot> {
        let snapshots = self.poll_once().await;
        self.evaluate(&snapshots).await;
        snapshots
    }

    /// Poll at a fixed rate until cancelled
    ///
    /// The first cycle runs immediately. Ticks missed while a cycle overran
    /// are skipped, never replayed back to back.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(
            "Polling {} class(es) every {}",
            self.targets.len(),
            humantime::format_duration(self.period)
        );

        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = cancel.cancelled() => {
                    tracing::debug!("Polling loop cancelled");
                    break;
                }
            }

            self.run_cycle().await;
        }
    }
}

fn warn_on_error_streak(target: &MonitorTarget, errors: u32) {
    if errors == ERROR_STREAK_WARNING {
        tracing::warn!("Class {} has failed {} polls in a row", target, errors);
    }
}
