//! Validated key/value metadata
//!
//! Replaces free-form maps at provider boundaries. Keys follow a small schema
//! (lowercase ascii, digits, `_`, `-`, `.`) and values are one of three
//! explicit shapes, so a typo'd key or a nested blob is rejected up front
//! instead of drifting silently between this core and the backend.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::errors::DomainError;

pub const MAX_METADATA_ENTRIES: usize = 32;
pub const MAX_METADATA_KEY_LEN: usize = 64;
pub const MAX_METADATA_TEXT_LEN: usize = 1024;

/// A single metadata value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Flag(bool),
    Integer(i64),
    Text(String),
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Flag(b) => write!(f, "{}", b),
            MetadataValue::Integer(n) => write!(f, "{}", n),
            MetadataValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Flag(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Integer(value)
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Text(value)
    }
}

/// Schema-checked metadata map
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, MetadataValue>", into = "BTreeMap<String, MetadataValue>")]
pub struct Metadata(BTreeMap<String, MetadataValue>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry, enforcing the key and value schema.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<MetadataValue>,
    ) -> Result<(), DomainError> {
        let key = key.into();
        let value = value.into();
        validate_key(&key)?;
        validate_value(&key, &value)?;
        if !self.0.contains_key(&key) && self.0.len() >= MAX_METADATA_ENTRIES {
            return Err(DomainError::InvalidMetadata(format!(
                "at most {} entries allowed",
                MAX_METADATA_ENTRIES
            )));
        }
        self.0.insert(key, value);
        Ok(())
    }

    pub fn with(
        mut self,
        key: impl Into<String>,
        value: impl Into<MetadataValue>,
    ) -> Result<Self, DomainError> {
        self.insert(key, value)?;
        Ok(self)
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<BTreeMap<String, MetadataValue>> for Metadata {
    type Error = DomainError;

    fn try_from(entries: BTreeMap<String, MetadataValue>) -> Result<Self, Self::Error> {
        let mut metadata = Metadata::new();
        for (key, value) in entries {
            metadata.insert(key, value)?;
        }
        Ok(metadata)
    }
}

impl From<Metadata> for BTreeMap<String, MetadataValue> {
    fn from(metadata: Metadata) -> Self {
        metadata.0
    }
}

fn validate_key(key: &str) -> Result<(), DomainError> {
    if key.is_empty() {
        return Err(DomainError::InvalidMetadata("key cannot be empty".to_string()));
    }
    if key.len() > MAX_METADATA_KEY_LEN {
        return Err(DomainError::InvalidMetadata(format!(
            "key '{}' exceeds {} characters",
            key, MAX_METADATA_KEY_LEN
        )));
    }
    let valid = key
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-' | '.'));
    if !valid {
        return Err(DomainError::InvalidMetadata(format!(
            "key '{}' may only contain lowercase letters, digits, '_', '-' or '.'",
            key
        )));
    }
    Ok(())
}

fn validate_value(key: &str, value: &MetadataValue) -> Result<(), DomainError> {
    if let MetadataValue::Text(text) = value {
        if text.len() > MAX_METADATA_TEXT_LEN {
            return Err(DomainError::InvalidMetadata(format!(
                "value for '{}' exceeds {} bytes",
                key, MAX_METADATA_TEXT_LEN
            )));
        }
    }
    Ok(())
}
