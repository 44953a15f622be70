//! Domain types shared by the job execution pipeline and its callers.
//!
//! Pure data and validation only; nothing in this crate spawns processes.

pub mod config;
pub mod error;
pub mod execution;
pub mod job;
pub mod layout;
pub mod types;
