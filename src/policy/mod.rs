//! Policy Gateway
//!
//! Pluggable authorization oracle. Every mutating registry operation asks
//! the active gateway before touching state; a `false` aborts the operation
//! with `Unauthorized`.
//!
//! Gateways get a read-only [`RegistryView`] so they can base decisions on
//! registry state (e.g. "is this caller the submitter of this still-pending
//! entry?") without being able to mutate it.

mod curator;

pub use curator::CuratorPolicy;

use crate::error::AppError;
use crate::registry::{
    Caller, EditLedger, EditProposal, Entry, EntryKey, EntryRegistry, EntryStatus, FieldUpdate,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Roles a gateway may hand out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Reviews entries and edits
    Curator,
    /// Bulk caller authorized once, may act on behalf of submitters
    TrustedDelegate,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Curator => write!(f, "curator"),
            Role::TrustedDelegate => write!(f, "trusted_delegate"),
        }
    }
}

/// Role membership as reported by a gateway
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyMembers {
    pub curators: Vec<Caller>,
    pub trusted_delegates: Vec<Caller>,
}

/// Read-only window into registry state for policy decisions
#[derive(Clone, Copy)]
pub struct RegistryView<'a> {
    entries: &'a EntryRegistry,
    edits: &'a EditLedger,
}

impl<'a> RegistryView<'a> {
    pub fn new(entries: &'a EntryRegistry, edits: &'a EditLedger) -> Self {
        Self { entries, edits }
    }

    pub fn entry(&self, key: &EntryKey) -> Option<&'a Entry> {
        self.entries.get(key)
    }

    pub fn proposal(&self, key: &EntryKey, id: u64) -> Option<&'a EditProposal> {
        self.edits.get(key, id).ok()
    }

    /// True when `caller` submitted `key` and it is still awaiting review
    pub fn is_pending_submitter(&self, key: &EntryKey, caller: &Caller) -> bool {
        self.entry(key)
            .is_some_and(|e| e.status == EntryStatus::Pending && &e.submitter == caller)
    }
}

/// One decision predicate per mutating operation, plus governance hooks.
pub trait PolicyGateway: Send + Sync + fmt::Debug {
    /// Human-readable name, reported by the policy status endpoint
    fn name(&self) -> &str;

    /// The governance owner of this gateway
    fn governor(&self) -> &Caller;

    fn is_trusted_delegate(&self, caller: &Caller) -> bool;

    fn can_add_entry(
        &self,
        view: &RegistryView<'_>,
        caller: &Caller,
        submitter: &Caller,
        key: &EntryKey,
    ) -> bool;

    fn can_approve_entry(&self, view: &RegistryView<'_>, caller: &Caller, key: &EntryKey) -> bool;

    fn can_reject_entry(&self, view: &RegistryView<'_>, caller: &Caller, key: &EntryKey) -> bool;

    fn can_propose_edit(
        &self,
        view: &RegistryView<'_>,
        caller: &Caller,
        key: &EntryKey,
        updates: &[FieldUpdate],
    ) -> bool;

    fn can_accept_edit(
        &self,
        view: &RegistryView<'_>,
        caller: &Caller,
        key: &EntryKey,
        id: u64,
    ) -> bool;

    fn can_reject_edit(
        &self,
        view: &RegistryView<'_>,
        caller: &Caller,
        key: &EntryKey,
        id: u64,
    ) -> bool;

    fn can_add_field(&self, caller: &Caller, name: &str) -> bool;

    fn can_update_field(&self, caller: &Caller, name: &str) -> bool;

    fn can_set_metadata(
        &self,
        view: &RegistryView<'_>,
        caller: &Caller,
        key: &EntryKey,
        updates: &[FieldUpdate],
    ) -> bool;

    fn members(&self) -> PolicyMembers {
        PolicyMembers::default()
    }

    fn grant_role(&mut self, member: Caller, role: Role) -> Result<(), AppError> {
        Err(AppError::BadRequest(format!(
            "Policy '{}' does not manage roles (granting {} to {})",
            self.name(),
            role,
            member
        )))
    }

    fn revoke_role(&mut self, member: &Caller, role: Role) -> Result<(), AppError> {
        Err(AppError::BadRequest(format!(
            "Policy '{}' does not manage roles (revoking {} from {})",
            self.name(),
            role,
            member
        )))
    }
}
