//! API endpoint handlers.
//!
//! Handlers stay thin: storage and pipeline work runs on the blocking pool
//! through `run_blocking`.

pub mod health;
pub mod patients;
pub mod reports;
