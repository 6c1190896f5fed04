//! # Domain Errors
//!
//! `RouteError` is raised while tables are assembled and is fatal.
//! `DispatchError` is raised while a message is processed and only rejects
//! that message.

use shared_types::ModuleError;
use thiserror::Error;

use super::entities::RouteDomain;

/// Fatal route registration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("Duplicate {domain} route: {key}")]
    DuplicateRoute {
        /// Table the route was added to
        domain: RouteDomain,
        /// Route key
        key: String,
    },

    #[error("Invalid {domain} route key: {key:?}")]
    InvalidKey {
        /// Table the route was added to
        domain: RouteDomain,
        /// Rejected key
        key: String,
    },

    /// Routes cannot be added once the table has been handed to its keeper.
    #[error("{0} router is sealed")]
    Sealed(RouteDomain),
}

/// Recoverable dispatch errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Unrecognized {domain} route: {key}")]
    Unrecognized {
        /// Table searched
        domain: RouteDomain,
        /// Key that matched nothing
        key: String,
    },

    /// The handler ran and rejected the message.
    #[error(transparent)]
    Handler(#[from] ModuleError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrecognized_display() {
        let err = DispatchError::Unrecognized {
            domain: RouteDomain::Governance,
            key: "bogus".to_string(),
        };
        assert_eq!(err.to_string(), "Unrecognized governance route: bogus");
    }
}
