//! Registry data types
//!
//! Entry identity, statuses, edit proposals and metadata records.

use crate::error::{invalid_argument, AppError};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Addresses travel in URL paths, so they stay within a path-safe alphabet
static ADDRESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.:\-]{0,127}$").expect("address pattern is valid")
});

pub fn is_valid_address(address: &str) -> bool {
    ADDRESS_RE.is_match(address)
}

/// Identity of whoever calls into the registry (a wallet, a bot, a curator)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Caller(String);

impl Caller {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Caller {
    fn from(id: &str) -> Self {
        Caller::new(id)
    }
}

/// Entry identity: an opaque address, optionally scoped by a chain id.
///
/// `(Some(1), "0xabc")` and `(Some(10), "0xabc")` are different entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    pub address: String,
}

impl EntryKey {
    pub fn new(chain_id: Option<u64>, address: impl Into<String>) -> Self {
        Self {
            chain_id,
            address: address.into(),
        }
    }

    /// Shorthand for an unpartitioned key
    #[cfg(test)]
    pub fn address(address: impl Into<String>) -> Self {
        Self::new(None, address)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.address.trim().is_empty() {
            return Err(invalid_argument("Entry address must not be empty"));
        }
        if !is_valid_address(&self.address) {
            return Err(invalid_argument(format!(
                "Invalid address '{}': use 1-128 letters, digits, '_', '.', ':' or '-'",
                self.address
            )));
        }
        Ok(())
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.chain_id {
            Some(chain_id) => write!(f, "{}:{}", chain_id, self.address),
            None => f.write_str(&self.address),
        }
    }
}

/// Status partition an entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryStatus::Pending => write!(f, "pending"),
            EntryStatus::Approved => write!(f, "approved"),
            EntryStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for EntryStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(EntryStatus::Pending),
            "approved" => Ok(EntryStatus::Approved),
            "rejected" => Ok(EntryStatus::Rejected),
            other => Err(invalid_argument(format!("Unknown entry status '{}'", other))),
        }
    }
}

/// A registry record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub key: EntryKey,
    pub submitter: Caller,
    pub status: EntryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One field/value pair of an edit or a metadata write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldUpdate {
    pub field: String,
    pub value: String,
}

impl FieldUpdate {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// A pending, competing set of field changes against an approved entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditProposal {
    /// Per-entry sequence number, starting at 1 and never reissued
    pub id: u64,
    pub key: EntryKey,
    pub submitter: Caller,
    pub updates: Vec<FieldUpdate>,
    pub created_at: DateTime<Utc>,
}

/// A named metadata slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataField {
    pub name: String,
    pub is_active: bool,
    pub is_required: bool,
    pub created_at: DateTime<Utc>,
}

/// A stored metadata value, tagged with its field's current flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataValue {
    pub field: String,
    pub value: String,
    pub is_active: bool,
    pub is_required: bool,
}

/// Live sizes of the three status partitions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryCounts {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

/// A contiguous window of a status partition
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPage {
    pub entries: Vec<Entry>,
    pub total: usize,
}

/// A contiguous window of all active proposals across entries
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditPage {
    pub edits: Vec<EditProposal>,
    pub total: usize,
    pub has_more: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_key_partitions_are_distinct() {
        let mainnet = EntryKey::new(Some(1), "0xabc");
        let optimism = EntryKey::new(Some(10), "0xabc");
        assert_ne!(mainnet, optimism);
        assert_eq!(mainnet.to_string(), "1:0xabc");
        assert_eq!(EntryKey::address("0xabc").to_string(), "0xabc");
    }

    #[test]
    fn test_entry_key_rejects_blank_address() {
        assert!(EntryKey::address("  ").validate().is_err());
        assert!(EntryKey::address("0x1").validate().is_ok());
    }

    #[test]
    fn test_entry_key_rejects_path_unsafe_address() {
        assert!(EntryKey::new(Some(1), "token.v2:main").validate().is_ok());
        for address in ["a/b", "has space", "-leading", "?q"] {
            assert!(matches!(
                EntryKey::address(address).validate(),
                Err(AppError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("Approved".parse::<EntryStatus>().unwrap(), EntryStatus::Approved);
        assert!("merged".parse::<EntryStatus>().is_err());
    }
}
