//! # Domain Errors
//!
//! Error types for capability scoping.

use cc_01_store::StoreError;
use thiserror::Error;

/// Capability errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    /// A scope was requested after `initialize_and_seal`. Fatal.
    #[error("Scope sealed: cannot scope module {0} after initialization")]
    ScopeSealed(String),

    /// `initialize_and_seal` was called a second time. Fatal.
    #[error("Capability keeper already initialized and sealed")]
    AlreadySealed,

    /// A capability operation ran before `initialize_and_seal`.
    #[error("Capability keeper not initialized: call initialize_and_seal first")]
    NotInitialized,

    /// Module names used for scoping must be non-empty.
    #[error("Scoped module name must not be empty")]
    EmptyModuleName,

    /// Module names must not contain the key separator `/`.
    #[error("Scoped module name must not contain '/': {0}")]
    InvalidModuleName(String),

    /// Capability names must be non-empty.
    #[error("Capability name must not be empty")]
    EmptyName,

    /// The scope already owns a capability under this name.
    #[error("Capability name already taken in {module}: {name}")]
    NameTaken {
        /// Owning module
        module: String,
        /// Capability name
        name: String,
    },

    /// The token was not issued by this scope.
    #[error("Capability issued by scope {token_scope} used in scope {scope}")]
    WrongScope {
        /// Scope that issued the token
        token_scope: String,
        /// Scope it was presented to
        scope: String,
    },

    /// The underlying object has no owners.
    #[error("Capability {0} does not exist")]
    NotFound(u64),

    /// The module already owns this capability.
    #[error("Module {module} already owns capability {index}")]
    AlreadyOwned {
        /// Claiming module
        module: String,
        /// Capability index
        index: u64,
    },

    /// The module does not own this capability.
    #[error("Module {module} does not own capability {index}")]
    NotOwner {
        /// Releasing module
        module: String,
        /// Capability index
        index: u64,
    },

    /// Invalid genesis state.
    #[error("Invalid capability genesis: {0}")]
    InvalidGenesis(String),

    /// Underlying store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_sealed_error() {
        let err = CapabilityError::ScopeSealed("transfer2".to_string());
        assert!(err.to_string().contains("Scope sealed"));
        assert!(err.to_string().contains("transfer2"));
    }

    #[test]
    fn test_wrong_scope_error() {
        let err = CapabilityError::WrongScope {
            token_scope: "ibc".to_string(),
            scope: "transfer".to_string(),
        };
        assert!(err.to_string().contains("ibc"));
        assert!(err.to_string().contains("transfer"));
    }
}
