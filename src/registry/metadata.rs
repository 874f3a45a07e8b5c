//! Metadata Store
//!
//! Field schema registry plus per-entry key/value storage. Fields are never
//! deleted, only deactivated, and deactivation never erases stored values.

use crate::error::{conflict_error, invalid_argument, not_found_error, AppError};
use crate::registry::types::{EntryKey, FieldUpdate, MetadataField, MetadataValue};
use chrono::Utc;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct MetadataStore {
    /// Name -> field. Absence means "never registered".
    fields: HashMap<String, MetadataField>,
    /// Registration order, drives the shape of `get_all_values`
    field_order: Vec<String>,
    values: HashMap<EntryKey, HashMap<String, String>>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // FIELD REGISTRY
    // =========================================================================

    /// Register a new field. Names stay reserved forever, even once inactive.
    pub fn add_field(&mut self, name: &str, required: bool) -> Result<MetadataField, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(invalid_argument("Field name must not be empty"));
        }
        if self.fields.contains_key(name) {
            return Err(conflict_error(format!("Field '{}' is already registered", name)));
        }

        let field = MetadataField {
            name: name.to_string(),
            is_active: true,
            is_required: required,
            created_at: Utc::now(),
        };
        self.fields.insert(field.name.clone(), field.clone());
        self.field_order.push(field.name.clone());
        Ok(field)
    }

    pub fn update_field(
        &mut self,
        name: &str,
        active: bool,
        required: bool,
    ) -> Result<MetadataField, AppError> {
        let field = self
            .fields
            .get_mut(name)
            .ok_or_else(|| not_found_error(format!("Field '{}' is not registered", name)))?;
        field.is_active = active;
        field.is_required = required;
        Ok(field.clone())
    }

    pub fn field(&self, name: &str) -> Option<&MetadataField> {
        self.fields.get(name)
    }

    /// All registered fields in registration order
    pub fn fields(&self) -> impl Iterator<Item = &MetadataField> {
        self.field_order.iter().filter_map(|name| self.fields.get(name))
    }

    // =========================================================================
    // VALIDATION
    // =========================================================================

    /// Check a direct metadata write: unknown or inactive fields are `NotFound`,
    /// empty values on required fields are `InvalidArgument`.
    pub fn check_writes(&self, updates: &[FieldUpdate]) -> Result<(), AppError> {
        for update in updates {
            let field = self
                .fields
                .get(&update.field)
                .filter(|f| f.is_active)
                .ok_or_else(|| {
                    not_found_error(format!(
                        "Field '{}' is not registered or inactive",
                        update.field
                    ))
                })?;
            if field.is_required && update.value.is_empty() {
                return Err(invalid_argument(format!(
                    "Field '{}' is required and cannot be empty",
                    update.field
                )));
            }
        }
        Ok(())
    }

    /// Check an edit proposal's updates. Every problem is an `InvalidArgument`
    /// since the proposal itself is malformed, not a missing resource.
    pub fn check_proposal(&self, updates: &[FieldUpdate]) -> Result<(), AppError> {
        if updates.is_empty() {
            return Err(invalid_argument("An edit must contain at least one update"));
        }
        self.check_writes(updates).map_err(|e| match e {
            AppError::NotFound(msg) => AppError::InvalidArgument(msg),
            other => other,
        })
    }

    // =========================================================================
    // VALUES
    // =========================================================================

    #[cfg(test)]
    pub fn set_value(&mut self, key: &EntryKey, field: &str, value: &str) -> Result<(), AppError> {
        self.set_values(key, &[FieldUpdate::new(field, value)])
    }

    /// All-or-nothing: nothing is written unless every update is valid
    pub fn set_values(&mut self, key: &EntryKey, updates: &[FieldUpdate]) -> Result<(), AppError> {
        self.check_writes(updates)?;
        if updates.is_empty() {
            return Ok(());
        }
        let slots = self.values.entry(key.clone()).or_default();
        for update in updates {
            slots.insert(update.field.clone(), update.value.clone());
        }
        Ok(())
    }

    /// Read one value. Unset values read as the empty string.
    pub fn get_value(&self, key: &EntryKey, field: &str) -> Result<MetadataValue, AppError> {
        let field = self
            .fields
            .get(field)
            .ok_or_else(|| not_found_error(format!("Field '{}' is not registered", field)))?;
        Ok(self.value_for(key, field))
    }

    /// One record per registered field, active or not
    pub fn get_all_values(&self, key: &EntryKey) -> Vec<MetadataValue> {
        self.fields().map(|field| self.value_for(key, field)).collect()
    }

    fn value_for(&self, key: &EntryKey, field: &MetadataField) -> MetadataValue {
        let value = self
            .values
            .get(key)
            .and_then(|slots| slots.get(&field.name))
            .cloned()
            .unwrap_or_default();
        MetadataValue {
            field: field.name.clone(),
            value,
            is_active: field.is_active,
            is_required: field.is_required,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio_test::{assert_err, assert_ok};

    fn store_with_fields() -> MetadataStore {
        let mut store = MetadataStore::new();
        assert_ok!(store.add_field("logoURI", true));
        assert_ok!(store.add_field("website", false));
        store
    }

    #[test]
    fn test_add_field_rejects_empty_and_duplicate_names() {
        let mut store = store_with_fields();
        assert!(matches!(store.add_field("  ", false), Err(AppError::InvalidArgument(_))));
        assert!(matches!(store.add_field("logoURI", false), Err(AppError::Conflict(_))));
    }

    #[test]
    fn test_deactivated_name_stays_reserved() {
        let mut store = store_with_fields();
        assert_ok!(store.update_field("website", false, false));
        assert!(matches!(store.add_field("website", false), Err(AppError::Conflict(_))));
        assert!(store.field("website").is_some());
        assert!(store.field("never").is_none());
    }

    #[test]
    fn test_update_unknown_field_is_not_found() {
        let mut store = store_with_fields();
        assert!(matches!(store.update_field("nope", true, false), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_set_then_get_round_trip() {
        let mut store = store_with_fields();
        let key = EntryKey::address("0xabc");
        assert_ok!(store.set_value(&key, "logoURI", "ipfs://logo"));
        assert_eq!(store.get_value(&key, "logoURI").unwrap().value, "ipfs://logo");
        assert_eq!(store.get_value(&key, "website").unwrap().value, "");
    }

    #[test]
    fn test_write_rules() {
        let mut store = store_with_fields();
        let key = EntryKey::address("0xabc");
        assert!(matches!(store.set_value(&key, "logoURI", ""), Err(AppError::InvalidArgument(_))));
        assert!(matches!(store.set_value(&key, "ghost", "x"), Err(AppError::NotFound(_))));
        assert_ok!(store.set_value(&key, "website", ""));

        assert_ok!(store.update_field("website", false, false));
        assert!(matches!(store.set_value(&key, "website", "x"), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_set_values_is_all_or_nothing() {
        let mut store = store_with_fields();
        let key = EntryKey::address("0xabc");
        let updates = vec![
            FieldUpdate::new("website", "https://example.org"),
            FieldUpdate::new("logoURI", ""),
        ];
        assert_err!(store.set_values(&key, &updates));
        assert_eq!(store.get_value(&key, "website").unwrap().value, "");
    }

    #[test]
    fn test_deactivation_preserves_value() {
        let mut store = store_with_fields();
        let key = EntryKey::address("0xabc");
        assert_ok!(store.set_value(&key, "website", "https://example.org"));
        assert_ok!(store.update_field("website", false, false));

        let all = store.get_all_values(&key);
        assert_eq!(all.len(), 2);
        assert_eq!(
            all[1],
            MetadataValue {
                field: "website".to_string(),
                value: "https://example.org".to_string(),
                is_active: false,
                is_required: false,
            }
        );
    }

    #[test]
    fn test_proposal_checks_are_invalid_argument() {
        let mut store = store_with_fields();
        assert_ok!(store.update_field("website", false, false));
        assert!(matches!(store.check_proposal(&[]), Err(AppError::InvalidArgument(_))));
        assert!(matches!(
            store.check_proposal(&[FieldUpdate::new("website", "x")]),
            Err(AppError::InvalidArgument(_))
        ));
        assert!(matches!(
            store.check_proposal(&[FieldUpdate::new("ghost", "x")]),
            Err(AppError::InvalidArgument(_))
        ));
        assert_ok!(store.check_proposal(&[FieldUpdate::new("logoURI", "u2")]));
    }
}
