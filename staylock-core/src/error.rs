//! Error types for staylock-core.
//!
//! Conflicts are not errors; they come back as `AcquireOutcome` /
//! `ConfirmOutcome` values. Everything here is either bad input or a store
//! failure.

use thiserror::Error;

use crate::infrastructure::StoreError;
use crate::types::IntervalError;

#[derive(Error, Debug)]
pub enum Error {
    /// A date string was not `YYYY-MM-DD`.
    #[error("invalid date '{input}': expected YYYY-MM-DD")]
    InvalidDate {
        input: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error(transparent)]
    InvalidInterval(#[from] IntervalError),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// Store transport or transaction failure, propagated unchanged.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Error {
    /// Malformed input the caller can fix
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Error::InvalidDate { .. } | Error::InvalidInterval(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
