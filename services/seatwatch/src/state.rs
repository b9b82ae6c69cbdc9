//! Shared per-target alert state and alert history

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use tokio::sync::RwLock;

use crate::alert::AlertRecord;
use crate::config::AlertReset;
use crate::monitor::{MonitorTarget, TargetState, SEATS_UNKNOWN};

/// Status of a single monitored target
#[derive(Debug, Clone)]
pub struct TargetStatus {
    pub target: MonitorTarget,
    pub state: TargetState,
    pub last_open_seats: Option<i32>,
    pub last_poll_epoch_ms: u64,
    pub alerting_since_epoch_ms: Option<u64>,
    pub consecutive_errors: u32,
    pub alerts_raised: u32,
}

impl TargetStatus {
    fn new(target: MonitorTarget) -> Self {
        Self {
            target,
            state: TargetState::Unknown,
            last_open_seats: None,
            last_poll_epoch_ms: 0,
            alerting_since_epoch_ms: None,
            consecutive_errors: 0,
            alerts_raised: 0,
        }
    }

    /// Apply a seat count to the alert state machine, returning true on a
    /// rising edge that should alert
    fn apply(&mut self, open_seats: i32, now_ms: u64, reset: AlertReset) -> bool {
        let open = open_seats > 0;
        let fire = match (self.state, open) {
            (TargetState::Unknown, true) => {
                self.state = TargetState::Alerting;
                self.alerting_since_epoch_ms = Some(now_ms);
                true
            }
            (TargetState::Unknown, false) => false,
            (TargetState::Alerting, false) => {
                if reset != AlertReset::Never {
                    self.state = TargetState::Unknown;
                    self.alerting_since_epoch_ms = None;
                }
                false
            }
            (TargetState::Alerting, true) => match reset {
                AlertReset::Cooldown { after } => {
                    let since = self.alerting_since_epoch_ms.unwrap_or(now_ms);
                    let after_ms = u64::try_from(after.as_millis()).unwrap_or(u64::MAX);
                    if now_ms.saturating_sub(since) >= after_ms {
                        self.alerting_since_epoch_ms = Some(now_ms);
                        true
                    } else {
                        false
                    }
                }
                AlertReset::Never | AlertReset::WhenClosed => false,
            },
        };

        if fire {
            self.alerts_raised += 1;
        }
        fire
    }
}

/// Shared state accessible by the poller and the alert dispatcher
#[derive(Debug)]
pub struct SharedState {
    pub targets: Vec<TargetStatus>,
    pub history: VecDeque<AlertRecord>,
    pub history_max_size: usize,
    pub started_at: Instant,
}

impl SharedState {
    pub fn new(targets: &[MonitorTarget], history_max_size: usize) -> Self {
        Self {
            targets: targets.iter().copied().map(TargetStatus::new).collect(),
            history: VecDeque::with_capacity(history_max_size),
            history_max_size,
            started_at: Instant::now(),
        }
    }

    fn status_mut(&mut self, target: &MonitorTarget) -> Option<&mut TargetStatus> {
        self.targets.iter_mut().find(|s| s.target == *target)
    }

    /// Record a seat observation, returning true if an alert is due
    ///
    /// [`SEATS_UNKNOWN`] counts as an error and leaves the alert state as is.
    pub fn observe(
        &mut self,
        target: &MonitorTarget,
        open_seats: i32,
        now_ms: u64,
        reset: AlertReset,
    ) -> bool {
        let Some(status) = self.status_mut(target) else {
            return false;
        };

        status.last_poll_epoch_ms = now_ms;
        if open_seats == SEATS_UNKNOWN {
            status.consecutive_errors += 1;
            return false;
        }

        status.consecutive_errors = 0;
        status.last_open_seats = Some(open_seats);
        status.apply(open_seats, now_ms, reset)
    }

    /// Record a failed query, returning the consecutive error count
    pub fn record_failure(&mut self, target: &MonitorTarget, now_ms: u64) -> u32 {
        match self.status_mut(target) {
            Some(status) => {
                status.last_poll_epoch_ms = now_ms;
                status.consecutive_errors += 1;
                status.consecutive_errors
            }
            None => 0,
        }
    }

    pub fn target_state(&self, target: &MonitorTarget) -> Option<TargetState> {
        self.targets
            .iter()
            .find(|s| s.target == *target)
            .map(|s| s.state)
    }

    pub fn consecutive_errors(&self, target: &MonitorTarget) -> u32 {
        self.targets
            .iter()
            .find(|s| s.target == *target)
            .map(|s| s.consecutive_errors)
            .unwrap_or(0)
    }

    /// Add a delivery record to history
    pub fn add_alert(&mut self, record: AlertRecord) {
        if self.history.len() >= self.history_max_size {
            self.history.pop_front();
        }
        self.history.push_back(record);
    }
}

/// Thread-safe shared state handle
pub type StateHandle = Arc<RwLock<SharedState>>;

pub fn new_state_handle(targets: &[MonitorTarget], history_max_size: usize) -> StateHandle {
    Arc::new(RwLock::new(SharedState::new(targets, history_max_size)))
}

pub fn current_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
