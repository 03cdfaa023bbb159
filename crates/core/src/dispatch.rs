//! Dispatch queue retry policy.
//!
//! Pure functions and constants shared by the queue repository and the
//! worker runner. The contract: at-least-once delivery, a bounded number of
//! attempts, exponential backoff starting at one second, dead-letter after
//! exhaustion.

use std::time::Duration;

use crate::types::Timestamp;

/// Maximum delivery attempts before a job is dead-lettered.
pub const MAX_ATTEMPTS: i16 = 3;

/// Base delay for the exponential backoff schedule.
pub const BACKOFF_BASE: Duration = Duration::from_secs(1);

/// What the queue should do with a job after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDisposition {
    /// Reschedule the job after the given backoff.
    Retry(Duration),
    /// The attempt budget is spent; surface the job for operators.
    DeadLetter,
}

/// Backoff before the retry following failed attempt `attempt` (1-based):
/// 1 s, 2 s, 4 s, …
pub fn retry_delay(attempt: i16) -> Duration {
    let exponent = attempt.max(1) - 1;
    BACKOFF_BASE * 2u32.pow(exponent.min(16) as u32)
}

/// Decide between retry and dead-letter after failed attempt `attempt`.
pub fn disposition(attempt: i16, max_attempts: i16) -> RetryDisposition {
    if attempt >= max_attempts {
        RetryDisposition::DeadLetter
    } else {
        RetryDisposition::Retry(retry_delay(attempt))
    }
}

/// When a dispatch job may first be consumed.
///
/// "Send now" intents pass no schedule and get `now`. Scheduled intents are
/// delayed until their scheduled instant. A schedule that has already
/// elapsed is treated as immediate here; rejecting stale schedules at
/// creation time is the alert-creation flow's job.
pub fn dispatch_not_before(scheduled_time: Option<Timestamp>, now: Timestamp) -> Timestamp {
    match scheduled_time {
        Some(at) if at > now => at,
        _ => now,
    }
}
