//! Monitored targets, seat observations and the seat source trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;

/// Seat count reported when a response arrived but had no usable seat field
pub const SEATS_UNKNOWN: i32 = -1;

/// One course section under observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MonitorTarget {
    pub term: u32,
    pub course_id: u32,
}

impl fmt::Display for MonitorTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.term, self.course_id)
    }
}

/// Seat count observed for a target during one poll cycle
#[derive(Debug, Clone, PartialEq)]
pub struct SeatSnapshot {
    pub target: MonitorTarget,
    pub open_seats: i32,
    pub observed_at: DateTime<Utc>,
}

impl SeatSnapshot {
    /// Whether this observation carries a usable seat count
    pub fn is_known(&self) -> bool {
        self.open_seats != SEATS_UNKNOWN
    }
}

/// Alert state of a single target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    Unknown,
    Alerting,
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetState::Unknown => write!(f, "Unknown"),
            TargetState::Alerting => write!(f, "Alerting"),
        }
    }
}

/// Source of open seat counts for a course section
#[async_trait]
pub trait SeatSource: Send + Sync + std::fmt::Debug {
    /// Query the open seat count for `target` with the given bearer token
    ///
    /// Returns [`SEATS_UNKNOWN`] when the response arrived but did not have the
    /// expected shape. Transport, authorization and non-200 failures are errors.
    async fn query_seats(&self, target: &MonitorTarget, bearer_token: &str) -> crate::Result<i32>;
}
