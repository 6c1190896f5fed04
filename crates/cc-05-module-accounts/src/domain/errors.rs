//! # Domain Errors

use thiserror::Error;

/// Module account configuration errors. All are fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountsError {
    #[error("Duplicate module account: {0}")]
    DuplicateAccount(String),

    #[error("Module account name must not be empty")]
    EmptyName,

    /// A flag was set on an account that was never added.
    #[error("Unknown module account: {0}")]
    UnknownAccount(String),
}
