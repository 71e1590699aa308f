//! Transports that do not run on the axum listener

pub mod socket;
pub mod stdio;
