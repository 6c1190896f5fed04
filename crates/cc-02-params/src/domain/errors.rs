//! # Domain Errors
//!
//! Error types for parameter subspaces.

use cc_01_store::StoreError;
use thiserror::Error;

/// Parameter subspace errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamsError {
    /// `with_key_table` was called on an already sealed subspace. Fatal.
    #[error("Subspace already sealed: {0}")]
    AlreadySealed(String),

    /// A key outside the subspace's key table was read or written.
    ///
    /// This is a wiring bug in the calling module, not bad user input.
    #[error("Parameter {key} not declared in subspace {subspace}")]
    UndeclaredKey {
        /// Subspace name
        subspace: String,
        /// Offending key
        key: String,
    },

    /// A key table declared the same key twice.
    #[error("Duplicate parameter key in key table: {0}")]
    DuplicateParamKey(String),

    /// Subspace names must be non-empty.
    #[error("Subspace name must not be empty")]
    EmptyName,

    /// Subspace names must not contain the key separator `/`.
    #[error("Subspace name must not contain '/': {0}")]
    InvalidSubspaceName(String),

    /// No subspace with this name exists.
    #[error("Unknown subspace: {0}")]
    UnknownSubspace(String),

    /// The validator rejected the value.
    #[error("Invalid value for {subspace}/{key}: {reason}")]
    InvalidValue {
        /// Subspace name
        subspace: String,
        /// Parameter key
        key: String,
        /// Validator message
        reason: String,
    },

    /// Underlying store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_sealed_error() {
        let err = ParamsError::AlreadySealed("gov".to_string());
        assert!(err.to_string().contains("already sealed"));
    }

    #[test]
    fn test_invalid_value_error() {
        let err = ParamsError::InvalidValue {
            subspace: "staking".to_string(),
            key: "MaxValidators".to_string(),
            reason: "expected unsigned integer".to_string(),
        };
        assert!(err.to_string().contains("staking/MaxValidators"));
    }
}
