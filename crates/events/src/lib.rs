//! Real-time delivery infrastructure for the alert platform.
//!
//! - [`MessageBus`]: per-user publish/subscribe fan-out backed by
//!   `tokio::sync::broadcast`, one channel per `(organization, user)`.
//! - [`ChannelEvent`]: the opaque JSON envelope routed over user channels.
//! - [`PresenceStore`] / [`InMemoryPresenceStore`]: last-write-wins
//!   heartbeat registry with TTL semantics.
//! - [`delivery`]: pluggable push and SMS sender seams with HTTP
//!   implementations.

pub mod bus;
pub mod delivery;
pub mod presence;

pub use bus::{ChannelEvent, ChannelEventKind, ChannelKey, MessageBus};
pub use delivery::push::{HttpPushSender, PushMessage, PushOutcome, PushResult, PushSender};
pub use delivery::sms::{HttpSmsSender, SmsMessage, SmsSender};
pub use presence::{InMemoryPresenceStore, PresenceEntry, PresenceStore};
