//! # staylock-core
//!
//! The interval-lock arbitration kernel for property bookings.
//! Probes hold dates with expiring soft locks; confirmations turn them into
//! reservations under a per-property serialized overlap check.

pub mod arbitrator;
pub mod clock;
pub mod config;
pub mod confirmer;
pub mod conflict;
pub mod error;
pub mod infrastructure;
#[path = "infrastructure_in_memory.rs"]
pub mod infrastructure_in_memory;
#[cfg(feature = "sqlite")]
#[path = "infrastructure_sqlite.rs"]
pub mod infrastructure_sqlite;
pub mod types;
pub mod client;

pub use error::{Error, Result};

#[cfg(test)]
mod test_support;
#[cfg(test)]
mod client_test;
