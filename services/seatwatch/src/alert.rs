//! Alert sink trait and the built-in terminal bell sink

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::monitor::MonitorTarget;

/// An alert that seats opened up for a target
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub target: MonitorTarget,
    pub open_seats: i32,
    pub message: String,
}

impl Alert {
    pub fn seats_open(target: MonitorTarget, open_seats: i32) -> Self {
        Self {
            target,
            open_seats,
            message: format!(
                "Class {} (term {}) has {} open seat(s)",
                target.course_id, target.term, open_seats
            ),
        }
    }
}

/// Record of an attempted alert delivery
#[derive(Debug, Clone)]
pub struct AlertRecord {
    pub target: MonitorTarget,
    pub sink_type: String,
    pub message: String,
    pub success: bool,
    pub error: Option<String>,
    pub timestamp_epoch_ms: u64,
}

/// Trait for delivering alerts to the user
#[async_trait]
pub trait AlertSink: Send + Sync + std::fmt::Debug {
    /// Get the sink type name (e.g. "bell")
    fn type_name(&self) -> &str;

    /// Deliver an alert
    async fn alert(&self, alert: &Alert) -> crate::Result<()>;
}

/// Logs the alert and rings the terminal bell
#[derive(Debug, Default)]
pub struct BellSink;

#[async_trait]
impl AlertSink for BellSink {
    fn type_name(&self) -> &str {
        "bell"
    }

    async fn alert(&self, alert: &Alert) -> crate::Result<()> {
        tracing::warn!("{}", alert.message);
        let mut stderr = tokio::io::stderr();
        stderr.write_all(b"\x07").await?;
        stderr.flush().await?;
        Ok(())
    }
}
