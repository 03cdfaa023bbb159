//! User projections read by this core.
//!
//! User CRUD belongs to an external collaborator; these structs are the
//! narrow read shapes the delivery pipeline and chat need.

use muster_core::types::DbId;
use serde::Serialize;
use sqlx::FromRow;

/// A resolved alert recipient: everything the fan-out needs to reach them.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Recipient {
    pub id: DbId,
    pub push_token: Option<String>,
    pub phone_number: Option<String>,
}

/// A chat participant projection used for push fallback and contact display.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ChatPeer {
    pub id: DbId,
    pub first_name: String,
    pub last_name: String,
    pub push_token: Option<String>,
    pub e2ee_public_key: Option<String>,
}
