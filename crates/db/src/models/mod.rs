//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - `Deserialize` DTOs for the operations that create or mutate it
//!
//! Status and response columns are stored as text; the vocabulary and
//! transition rules live in `muster_core` and the SQL guards bind those
//! enums' `as_str()` values.

pub mod aggregate;
pub mod alert;
pub mod chat_message;
pub mod delivery_record;
pub mod dispatch_job;
pub mod user;
pub mod user_location;
