//! Pure domain types and rules for the alert platform.
//!
//! This crate has zero internal dependencies so the data-access, delivery,
//! worker, and API crates can all depend on it freely.

pub mod aggregate;
pub mod alert;
pub mod chat;
pub mod dispatch;
pub mod error;
pub mod response;
pub mod types;
