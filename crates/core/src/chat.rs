//! Chat message status state machine.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Delivery status of a chat message: sent → delivered → read.
///
/// Transitions only ever move forward. A read receipt can arrive for a
/// message still marked `sent` (the delivered hop was skipped), but nothing
/// moves a message backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatMessageStatus {
    Sent,
    Delivered,
    Read,
}

impl ChatMessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatMessageStatus::Sent => "sent",
            ChatMessageStatus::Delivered => "delivered",
            ChatMessageStatus::Read => "read",
        }
    }

    /// Strict parse. Unknown values are a validation error.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "sent" => Ok(ChatMessageStatus::Sent),
            "delivered" => Ok(ChatMessageStatus::Delivered),
            "read" => Ok(ChatMessageStatus::Read),
            other => Err(CoreError::Validation(format!(
                "Invalid message status '{other}': expected sent, delivered, or read"
            ))),
        }
    }

    pub fn rank(self) -> i16 {
        match self {
            ChatMessageStatus::Sent => 0,
            ChatMessageStatus::Delivered => 1,
            ChatMessageStatus::Read => 2,
        }
    }

    /// Whether a message currently at `self` may move to `to`.
    pub fn can_transition_to(self, to: ChatMessageStatus) -> bool {
        to.rank() > self.rank()
    }
}
