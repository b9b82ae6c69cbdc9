//! Non-blocking hand-off of alerts to a dedicated delivery task

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::alert::{Alert, AlertRecord, AlertSink};
use crate::state::{current_epoch_ms, StateHandle};

/// Queues alerts for delivery without ever waiting on a sink
#[derive(Debug, Clone)]
pub struct AlertDispatcher {
    tx: mpsc::Sender<Alert>,
}

impl AlertDispatcher {
    /// Start the delivery task with a queue of `queue_size` pending alerts
    pub fn spawn(
        sinks: Vec<Arc<dyn AlertSink>>,
        queue_size: usize,
        state: StateHandle,
        cancel: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(queue_size.max(1));
        let handle = tokio::spawn(delivery_loop(rx, sinks, state, cancel));
        (Self { tx }, handle)
    }

    /// Queue an alert, returning false if it had to be dropped
    pub fn dispatch(&self, alert: Alert) -> bool {
        match self.tx.try_send(alert) {
            Ok(()) => true,
            Err(TrySendError::Full(alert)) => {
                tracing::warn!("Alert queue full, dropping alert for class {}", alert.target);
                false
            }
            Err(TrySendError::Closed(alert)) => {
                tracing::warn!(
                    "Alert delivery stopped, dropping alert for class {}",
                    alert.target
                );
                false
            }
        }
    }
}

async fn delivery_loop(
    mut rx: mpsc::Receiver<Alert>,
    sinks: Vec<Arc<dyn AlertSink>>,
    state: StateHandle,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            alert = rx.recv() => match alert {
                Some(alert) => deliver(&alert, &sinks, &state).await,
                None => break,
            },
            _ = cancel.cancelled() => {
                tracing::debug!("Alert delivery cancelled");
                break;
            }
        }
    }
}

/// Deliver an alert to every sink and record each attempt
pub async fn deliver(alert: &Alert, sinks: &[Arc<dyn AlertSink>], state: &StateHandle) {
    for sink in sinks {
        tracing::debug!(
            "Delivering to '{}' for class {}: {}",
            sink.type_name(),
            alert.target,
            alert.message
        );

        let result = sink.alert(alert).await;
        if let Err(e) = &result {
            tracing::warn!(
                "Alert via '{}' for class {} failed: {}",
                sink.type_name(),
                alert.target,
                e
            );
        }

        let record = AlertRecord {
            target: alert.target,
            sink_type: sink.type_name().to_string(),
            message: alert.message.clone(),
            success: result.is_ok(),
            error: result.as_ref().err().map(|e| e.to_string()),
            timestamp_epoch_ms: current_epoch_ms(),
        };
        state.write().await.add_alert(record);
    }
}
