//! Employee response vocabulary and per-recipient delivery state.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// EmployeeResponse
// ---------------------------------------------------------------------------

/// An employee's self-reported status for an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeResponse {
    Safe,
    NeedHelp,
    EmergencyHelpNeeded,
}

impl EmployeeResponse {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmployeeResponse::Safe => "safe",
            EmployeeResponse::NeedHelp => "need_help",
            EmployeeResponse::EmergencyHelpNeeded => "emergency_help_needed",
        }
    }

    /// Strict parse. Unknown values are a validation error, never a default.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "safe" => Ok(EmployeeResponse::Safe),
            "need_help" => Ok(EmployeeResponse::NeedHelp),
            "emergency_help_needed" => Ok(EmployeeResponse::EmergencyHelpNeeded),
            other => Err(CoreError::Validation(format!(
                "Invalid response '{other}': expected safe, need_help, or emergency_help_needed"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// DeliveryStatus
// ---------------------------------------------------------------------------

/// Delivery progress for one recipient of one alert.
///
/// Transitions are monotonic: pending → sent → delivered. Once a record is
/// `delivered` it never reverts, no matter what the push provider reports
/// afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Delivered,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Delivered => "delivered",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(DeliveryStatus::Pending),
            "sent" => Some(DeliveryStatus::Sent),
            "delivered" => Some(DeliveryStatus::Delivered),
            _ => None,
        }
    }

    fn rank(self) -> u8 {
        match self {
            DeliveryStatus::Pending => 0,
            DeliveryStatus::Sent => 1,
            DeliveryStatus::Delivered => 2,
        }
    }

    /// Whether moving from `self` to `to` advances the record.
    /// Equal-or-backward moves are no-ops, not errors.
    pub fn can_advance_to(self, to: DeliveryStatus) -> bool {
        to.rank() > self.rank()
    }
}

// ---------------------------------------------------------------------------
// ResponseHistory
// ---------------------------------------------------------------------------

/// One recorded response with its timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEntry {
    pub response: EmployeeResponse,
    pub at: Timestamp,
}

/// Append-only log of every response a recipient has submitted.
///
/// The only mutating operation is [`push`](ResponseHistory::push); entries
/// can never be replaced or removed, so the audit-trail invariant is a
/// property of the type rather than a convention. Serializes transparently
/// as a JSON array for the JSONB column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseHistory(Vec<ResponseEntry>);

impl ResponseHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ResponseEntry) {
        self.0.push(entry);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn entries(&self) -> &[ResponseEntry] {
        &self.0
    }

    /// The most recently recorded response, if any.
    pub fn latest(&self) -> Option<&ResponseEntry> {
        self.0.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn response_parse_accepts_the_three_allowed_values() {
        assert_eq!(
            EmployeeResponse::parse("safe").unwrap(),
            EmployeeResponse::Safe
        );
        assert_eq!(
            EmployeeResponse::parse("need_help").unwrap(),
            EmployeeResponse::NeedHelp
        );
        assert_eq!(
            EmployeeResponse::parse("emergency_help_needed").unwrap(),
            EmployeeResponse::EmergencyHelpNeeded
        );
    }

    #[test]
    fn response_parse_rejects_everything_else() {
        for bad in ["", "SAFE", "ok", "not_safe", "evacuated"] {
            assert!(matches!(
                EmployeeResponse::parse(bad),
                Err(crate::error::CoreError::Validation(_))
            ));
        }
    }

    #[test]
    fn delivery_status_only_advances_forward() {
        use DeliveryStatus::*;

        assert!(Pending.can_advance_to(Sent));
        assert!(Pending.can_advance_to(Delivered));
        assert!(Sent.can_advance_to(Delivered));

        assert!(!Delivered.can_advance_to(Sent));
        assert!(!Delivered.can_advance_to(Pending));
        assert!(!Sent.can_advance_to(Pending));
        assert!(!Sent.can_advance_to(Sent));
    }

    #[test]
    fn history_preserves_insertion_order() {
        let mut history = ResponseHistory::new();
        history.push(ResponseEntry {
            response: EmployeeResponse::NeedHelp,
            at: Utc::now(),
        });
        history.push(ResponseEntry {
            response: EmployeeResponse::Safe,
            at: Utc::now(),
        });

        assert_eq!(history.len(), 2);
        assert_eq!(history.entries()[0].response, EmployeeResponse::NeedHelp);
        assert_eq!(history.entries()[1].response, EmployeeResponse::Safe);
        assert_eq!(history.latest().unwrap().response, EmployeeResponse::Safe);
    }

    #[test]
    fn history_serializes_as_a_plain_json_array() {
        let mut history = ResponseHistory::new();
        history.push(ResponseEntry {
            response: EmployeeResponse::Safe,
            at: Utc::now(),
        });

        let value = serde_json::to_value(&history).unwrap();
        assert!(value.is_array());
        assert_eq!(value[0]["response"], "safe");

        let back: ResponseHistory = serde_json::from_value(value).unwrap();
        assert_eq!(back, history);
    }
}
