//! Error types for the Burrow emulator
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! The taxonomy distinguishes:
//! - Request errors (bad input from the caller, never retried internally):
//!   `InvalidQuery`, `BadKey`, `InvalidConfiguration`, `IndexNotFound`,
//!   and transaction-handle misuse (`TransactionNotFound`,
//!   `TransactionNotActive`, `CrossGroupTransaction`)
//! - Contention (caller may retry): `TransactionConflict`
//!
//! Not-found on a get is `Ok(None)`, never an error. Internal invariant
//! violations (duplicate pseudo-kind registration) panic at startup rather
//! than surfacing here.

use crate::key::Key;
use thiserror::Error;

/// Result type alias for Burrow operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the Burrow emulator
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// Query is malformed or uses an unsupported filter/order
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Key is malformed (empty path, empty kind, non-canonical pseudo-kind key)
    #[error("bad key: {0}")]
    BadKey(String),

    /// Configuration value is out of range or unparseable
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Another transaction is already active against this entity group
    #[error("transaction conflict: entity group {root} already has an active transaction")]
    TransactionConflict {
        /// Root key of the contended entity group
        root: Key,
    },

    /// A transaction touched a second entity group
    #[error("cross-group transaction: bound to {bound}, attempted {attempted}")]
    CrossGroupTransaction {
        /// Entity group the transaction is bound to
        bound: Key,
        /// Entity group the offending operation targeted
        attempted: Key,
    },

    /// No transaction exists for this handle
    #[error("transaction {0} not found")]
    TransactionNotFound(u64),

    /// Transaction has already committed or rolled back
    #[error("transaction {0} is no longer active")]
    TransactionNotActive(u64),

    /// No composite index exists with this id
    #[error("index {0} not found")]
    IndexNotFound(u64),
}

impl Error {
    /// True for caller-input errors that should never be retried
    ///
    /// Every variant except contention is the caller's fault: malformed
    /// input, out-of-range configuration, a dead or cross-group
    /// transaction handle, or an unknown index id.
    pub fn is_request_error(&self) -> bool {
        !matches!(self, Error::TransactionConflict { .. })
    }

    /// True for contention failures the caller may retry
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::TransactionConflict { .. })
    }
}
