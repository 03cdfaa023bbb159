//! Live per-alert response aggregation math.

use serde::Serialize;

use crate::response::EmployeeResponse;

/// Per-category response counts for one alert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResponseCounts {
    pub safe: i64,
    pub need_help: i64,
    pub emergency_help_needed: i64,
}

impl ResponseCounts {
    /// Total recipients that have responded with anything.
    pub fn responded(&self) -> i64 {
        self.safe + self.need_help + self.emergency_help_needed
    }

    /// Recipients with no response yet.
    ///
    /// Clamped at zero: concurrent response writes can momentarily push the
    /// category sum past the recipient total, and the dashboard must never
    /// show a negative count.
    pub fn not_responded(&self, total_recipients: i64) -> i64 {
        (total_recipients - self.responded()).max(0)
    }

    /// Add `count` observations of `response` to the tally.
    pub fn add(&mut self, response: EmployeeResponse, count: i64) {
        match response {
            EmployeeResponse::Safe => self.safe += count,
            EmployeeResponse::NeedHelp => self.need_help += count,
            EmployeeResponse::EmergencyHelpNeeded => self.emergency_help_needed += count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_responded_is_total_minus_responded() {
        let mut counts = ResponseCounts::default();
        counts.add(EmployeeResponse::Safe, 4);
        counts.add(EmployeeResponse::NeedHelp, 2);
        counts.add(EmployeeResponse::EmergencyHelpNeeded, 1);

        assert_eq!(counts.responded(), 7);
        assert_eq!(counts.not_responded(10), 3);
    }

    #[test]
    fn not_responded_clamps_at_zero() {
        let mut counts = ResponseCounts::default();
        counts.add(EmployeeResponse::Safe, 5);

        // A concurrent writer raced the total; never go negative.
        assert_eq!(counts.not_responded(3), 0);
        assert_eq!(counts.not_responded(0), 0);
    }

    #[test]
    fn empty_counts_mean_nobody_responded() {
        let counts = ResponseCounts::default();

        assert_eq!(counts.responded(), 0);
        assert_eq!(counts.not_responded(8), 8);
    }
}
