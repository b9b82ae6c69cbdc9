//! Alert sink that runs an external program, e.g. a sound player

use async_trait::async_trait;
use tokio::process::Command;

use crate::alert::{Alert, AlertSink};
use crate::config::AlertSinkConfig;

/// Runs `program args...` for every alert
///
/// The alert is passed to the program through `SEATWATCH_TERM`,
/// `SEATWATCH_COURSE`, `SEATWATCH_OPEN_SEATS` and `SEATWATCH_MESSAGE`.
#[derive(Debug)]
pub struct CommandSink {
    program: String,
    args: Vec<String>,
}

impl CommandSink {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        let program = program.into();
        tracing::debug!("Created CommandSink running '{}'", program);
        Self { program, args }
    }

    /// Build from a `command` sink config entry
    pub fn from_config(config: &AlertSinkConfig) -> Option<Self> {
        match config {
            AlertSinkConfig::Command { program, args } => Some(Self::new(program, args.clone())),
            _ => None,
        }
    }
}

#[async_trait]
impl AlertSink for CommandSink {
    fn type_name(&self) -> &str {
        "command"
    }

    async fn alert(&self, alert: &Alert) -> crate::Result<()> {
        tracing::debug!("Running alert command '{}'", self.program);

        let status = Command::new(&self.program)
            .args(&self.args)
            .env("SEATWATCH_TERM", alert.target.term.to_string())
            .env("SEATWATCH_COURSE", alert.target.course_id.to_string())
            .env("SEATWATCH_OPEN_SEATS", alert.open_seats.to_string())
            .env("SEATWATCH_MESSAGE", &alert.message)
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| {
                crate::SeatWatchError::Alert(format!("Failed to run '{}': {}", self.program, e))
            })?;

        if !status.success() {
            return Err(crate::SeatWatchError::Alert(format!(
                "'{}' exited with {}",
                self.program, status
            )));
        }
        Ok(())
    }
}
