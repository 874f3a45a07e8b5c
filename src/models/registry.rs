//! Entry, edit and metadata DTOs

use crate::batch::{AddItem, EditItem, RejectItem};
use crate::error::{invalid_argument, AppError};
use crate::registry::{is_valid_address, Caller, EntryKey, EntryStatus, FieldUpdate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::str::FromStr;
use validator::{Validate, ValidationError};

static FIELD_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]{0,63}$").expect("field name pattern is valid")
});

pub fn validate_address(address: &str) -> Result<(), ValidationError> {
    if !is_valid_address(address) {
        let mut err = ValidationError::new("invalid_address");
        err.message = Some(
            "Address must be 1-128 characters of letters, digits, '_', '.', ':' or '-'".into(),
        );
        return Err(err);
    }
    Ok(())
}

fn validate_field_name(name: &str) -> Result<(), ValidationError> {
    if !FIELD_NAME_RE.is_match(name) {
        let mut err = ValidationError::new("invalid_field_name");
        err.message = Some(
            "Field names start with a letter or underscore and use at most 64 characters".into(),
        );
        return Err(err);
    }
    Ok(())
}

/// Path address plus optional `?chainId=` into an [`EntryKey`]
pub fn entry_key(address: &str, query: &KeyQuery) -> Result<EntryKey, AppError> {
    validate_address(address)
        .map_err(|_| invalid_argument(format!("Invalid address '{}'", address)))?;
    Ok(EntryKey::new(query.chain_id, address))
}

/// `?chainId=` on entry-scoped routes
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyQuery {
    pub chain_id: Option<u64>,
}

/// `GET /api/entries`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEntriesQuery {
    pub status: Option<String>,
    #[serde(default)]
    pub offset: usize,
    pub limit: Option<usize>,
}

impl ListEntriesQuery {
    /// Defaults to the review queue
    pub fn status(&self) -> Result<EntryStatus, AppError> {
        match self.status.as_deref() {
            None => Ok(EntryStatus::Pending),
            Some(raw) => EntryStatus::from_str(raw),
        }
    }
}

/// Offset/limit for paginated reads
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    #[serde(default)]
    pub offset: usize,
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    #[serde(default)]
    pub after: u64,
    pub limit: Option<usize>,
}

/// Request to submit a new entry
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddEntryRequest {
    #[validate(custom(function = "validate_address"))]
    pub address: String,

    #[serde(default)]
    pub chain_id: Option<u64>,

    /// Submit on behalf of someone else (trusted delegates only)
    #[serde(default)]
    pub submitter: Option<String>,

    #[serde(default)]
    pub metadata: Vec<FieldUpdate>,
}

impl AddEntryRequest {
    pub fn into_parts(self) -> (EntryKey, Option<Caller>, Vec<FieldUpdate>) {
        (
            EntryKey::new(self.chain_id, self.address),
            self.submitter.map(Caller::new),
            self.metadata,
        )
    }
}

/// Reason attached to an entry or edit rejection
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RejectRequest {
    #[validate(length(max = 1024, message = "Reason must be at most 1024 characters"))]
    #[serde(default)]
    pub reason: String,
}

/// Body of `ProposeEdit` and `SetValues`
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MetadataUpdateRequest {
    #[validate(length(min = 1, message = "At least one update is required"))]
    pub updates: Vec<FieldUpdate>,
}

/// Body of a single-field metadata write
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetValueRequest {
    pub value: String,
}

/// Request to register a metadata field
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddFieldRequest {
    #[validate(custom(function = "validate_field_name"))]
    pub name: String,

    #[serde(default)]
    pub required: bool,
}

/// Request to toggle a field's flags
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFieldRequest {
    pub is_active: bool,
    pub is_required: bool,
}

#[derive(Debug, Deserialize)]
pub struct BatchAddRequest {
    pub items: Vec<AddItem>,
}

#[derive(Debug, Deserialize)]
pub struct BatchApproveRequest {
    pub keys: Vec<EntryKey>,
}

#[derive(Debug, Deserialize)]
pub struct BatchRejectRequest {
    pub items: Vec<RejectItem>,
}

#[derive(Debug, Deserialize)]
pub struct BatchEditsRequest {
    pub items: Vec<EditItem>,
}
