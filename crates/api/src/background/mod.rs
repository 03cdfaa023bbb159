//! Background tasks spawned by the API server.

pub mod presence_sweep;
