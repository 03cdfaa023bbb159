//! Dispatch pipeline: consumes queued dispatch jobs and fans alerts out to
//! their recipients.
//!
//! Any number of worker processes may run against the same database; the
//! queue's `SKIP LOCKED` claim and the idempotent mutations in
//! [`fanout::FanoutWorker`] make duplicate delivery harmless.

pub mod fanout;
pub mod runner;

pub use fanout::{FanoutReport, FanoutWorker};
