//! # Parameter Entities

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::ParamsError;

/// Validates a candidate parameter value before it is written.
pub type ParamValidator = fn(&serde_json::Value) -> Result<(), String>;

/// Schema of the keys a subspace accepts.
#[derive(Clone, Default)]
pub struct KeyTable {
    keys: BTreeMap<String, ParamValidator>,
}

impl KeyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `key` with its validator.
    ///
    /// # Errors
    ///
    /// `DuplicateParamKey` if `key` is already declared.
    pub fn register(mut self, key: &str, validator: ParamValidator) -> Result<Self, ParamsError> {
        if self.keys.contains_key(key) {
            return Err(ParamsError::DuplicateParamKey(key.to_string()));
        }
        self.keys.insert(key.to_string(), validator);
        Ok(self)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains_key(key)
    }

    pub fn validator(&self, key: &str) -> Option<ParamValidator> {
        self.keys.get(key).copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl fmt::Debug for KeyTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.keys.keys()).finish()
    }
}

/// Validator accepting any value.
pub fn accept_any(_: &serde_json::Value) -> Result<(), String> {
    Ok(())
}

/// Validator accepting non-negative integers.
pub fn validate_u64(value: &serde_json::Value) -> Result<(), String> {
    value
        .as_u64()
        .map(|_| ())
        .ok_or_else(|| format!("expected unsigned integer, got {value}"))
}

/// Validator accepting strictly positive integers.
pub fn validate_positive_u64(value: &serde_json::Value) -> Result<(), String> {
    match value.as_u64() {
        Some(0) => Err("value must be positive".to_string()),
        Some(_) => Ok(()),
        None => Err(format!("expected unsigned integer, got {value}")),
    }
}

/// Validator accepting non-empty strings.
pub fn validate_non_empty_string(value: &serde_json::Value) -> Result<(), String> {
    match value.as_str() {
        Some("") => Err("value must not be empty".to_string()),
        Some(_) => Ok(()),
        None => Err(format!("expected string, got {value}")),
    }
}

/// One parameter update carried by a parameter change proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamChange {
    pub subspace: String,
    pub key: String,
    /// Raw JSON encoding of the new value.
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_table_rejects_duplicate() {
        let table = KeyTable::new().register("MaxValidators", validate_u64).unwrap();
        let result = table.register("MaxValidators", validate_u64);
        assert!(matches!(result, Err(ParamsError::DuplicateParamKey(_))));
    }

    #[test]
    fn test_validators() {
        assert!(validate_u64(&json!(3)).is_ok());
        assert!(validate_u64(&json!("3")).is_err());
        assert!(validate_positive_u64(&json!(0)).is_err());
        assert!(validate_non_empty_string(&json!("")).is_err());
        assert!(validate_non_empty_string(&json!("coco")).is_ok());
        assert!(accept_any(&json!(null)).is_ok());
    }
}
