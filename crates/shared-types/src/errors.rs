//! # Error Types
//!
//! Failure type returned by module hooks and handlers.

use thiserror::Error;

/// A domain failure reported by a module.
///
/// Recoverable: the phase or dispatch that produced it aborts, the process
/// keeps running and the execution pipeline decides what to do with it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{module}] {message}")]
pub struct ModuleError {
    /// Name of the module that failed.
    pub module: String,
    /// Human-readable message.
    pub message: String,
}

impl ModuleError {
    pub fn new(module: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_error_display() {
        let err = ModuleError::new("staking", "validator set empty");
        let display = err.to_string();
        assert!(display.contains("staking"));
        assert!(display.contains("validator set empty"));
    }
}
