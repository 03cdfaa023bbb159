//! WebSocket surfaces for real-time communication.
//!
//! - [`chat_stream`]: duplex stream, presence heartbeats in and chat or
//!   alert envelopes out.
//! - [`alert_stream`]: server-streaming live alert aggregates for
//!   dashboards.

pub mod alert_stream;
pub mod chat_stream;

pub use alert_stream::alert_stream_handler;
pub use chat_stream::chat_stream_handler;
