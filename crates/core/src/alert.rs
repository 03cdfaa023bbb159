//! Alert lifecycle status and activation rules.

use crate::types::Timestamp;

/// Lifecycle status of an alert. Stored as text in the `alerts` table.
///
/// An alert is `scheduled` from creation until dispatch, `active` while the
/// emergency is live, and `resolved` once it has been closed out. The
/// scheduled → active transition happens at most once; resolved is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertStatus {
    Scheduled,
    Active,
    Resolved,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Scheduled => "scheduled",
            AlertStatus::Active => "active",
            AlertStatus::Resolved => "resolved",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "scheduled" => Some(AlertStatus::Scheduled),
            "active" => Some(AlertStatus::Active),
            "resolved" => Some(AlertStatus::Resolved),
            _ => None,
        }
    }
}

/// Pick the `start_time` to stamp when a response activates an alert early.
///
/// A scheduled alert keeps its originally scheduled instant so response
/// timing reports measure from when the alert was meant to go out, not from
/// whenever the first response happened to arrive.
pub fn activation_start_time(scheduled_time: Option<Timestamp>, now: Timestamp) -> Timestamp {
    scheduled_time.unwrap_or(now)
}
