//! Registry module - entries, edit proposals and metadata under one policy
//!
//! [`Registry`] is the facade every caller goes through. All state sits
//! behind a single async `RwLock`, so each operation runs to completion
//! before the next begins and its writes become visible all at once.
//!
//! Every mutation follows the same shape:
//! 1. ask the active policy gateway (deny => `Unauthorized`, nothing written)
//! 2. run every validation that can fail
//! 3. mutate, then append a notification

mod edits;
mod entries;
mod events;
mod metadata;
mod set;
mod types;

pub use edits::EditLedger;
pub use entries::EntryRegistry;
pub use events::{Notification, NotificationKind, NotificationLog};
pub use metadata::MetadataStore;
pub use types::*;

use crate::error::{invalid_argument, not_found_error, unauthorized, AppError};
use crate::policy::{PolicyGateway, PolicyMembers, RegistryView, Role};
use serde::Serialize;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Default clamp for paginated reads
pub const DEFAULT_MAX_PAGE_SIZE: usize = 100;

struct RegistryState {
    entries: EntryRegistry,
    edits: EditLedger,
    metadata: MetadataStore,
    notifications: NotificationLog,
    /// The gateway every operation consults
    policy: Box<dyn PolicyGateway>,
    /// Gateway waiting for its governor to complete the migration
    staged_policy: Option<Box<dyn PolicyGateway>>,
}

impl RegistryState {
    fn view(&self) -> RegistryView<'_> {
        RegistryView::new(&self.entries, &self.edits)
    }

    fn require_entry(&self, key: &EntryKey) -> Result<&Entry, AppError> {
        self.entries
            .get(key)
            .ok_or_else(|| not_found_error(format!("Entry {} not found", key)))
    }

    fn require_governor(&self, caller: &Caller, action: &str) -> Result<(), AppError> {
        authorize(self.policy.governor() == caller, caller, action)
    }
}

/// Turn a policy verdict into a result
fn authorize(allowed: bool, caller: &Caller, action: &str) -> Result<(), AppError> {
    if allowed {
        return Ok(());
    }
    warn!(caller = %caller, action, "policy denied operation");
    Err(unauthorized(format!("{} is not allowed to {}", caller, action)))
}

/// Public description of a gateway
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySummary {
    pub name: String,
    pub governor: Caller,
    pub members: PolicyMembers,
}

impl PolicySummary {
    fn of(policy: &dyn PolicyGateway) -> Self {
        Self {
            name: policy.name().to_string(),
            governor: policy.governor().clone(),
            members: policy.members(),
        }
    }
}

/// Active gateway plus any migration in flight
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyStatus {
    pub active: PolicySummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staged: Option<PolicySummary>,
}

/// The registry facade
pub struct Registry {
    state: RwLock<RegistryState>,
    max_page_size: usize,
}

impl Registry {
    pub fn new(policy: Box<dyn PolicyGateway>) -> Self {
        Self {
            state: RwLock::new(RegistryState {
                entries: EntryRegistry::new(),
                edits: EditLedger::new(),
                metadata: MetadataStore::new(),
                notifications: NotificationLog::new(),
                policy,
                staged_policy: None,
            }),
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }

    pub fn with_max_page_size(mut self, max_page_size: usize) -> Self {
        self.max_page_size = max_page_size.max(1);
        self
    }

    fn clamp(&self, limit: usize) -> usize {
        limit.min(self.max_page_size)
    }

    // =========================================================================
    // ENTRIES
    // =========================================================================

    /// Submit `key` for review. `submitter` defaults to the caller; submitting
    /// for someone else is a policy decision (trusted delegates).
    pub async fn add_entry(
        &self,
        caller: &Caller,
        key: EntryKey,
        submitter: Option<Caller>,
        metadata: Vec<FieldUpdate>,
    ) -> Result<Entry, AppError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let submitter = submitter.unwrap_or_else(|| caller.clone());

        authorize(
            state.policy.can_add_entry(&state.view(), caller, &submitter, &key),
            caller,
            "add entries",
        )?;
        key.validate()?;
        state.entries.check_submittable(&key)?;
        let resubmission = state.entries.status(&key) == Some(EntryStatus::Rejected);

        state.metadata.set_values(&key, &metadata)?;
        let entry = state.entries.insert_pending(key, submitter);

        state.notifications.record(
            NotificationKind::EntryAdded,
            Some(&entry.key),
            caller,
            json!({
                "submitter": entry.submitter,
                "metadata": metadata,
                "resubmission": resubmission,
            }),
        );
        info!(
            "Entry {} submitted by {} (resubmission: {})",
            entry.key, entry.submitter, resubmission
        );
        Ok(entry)
    }

    pub async fn approve_entry(&self, caller: &Caller, key: &EntryKey) -> Result<Entry, AppError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        authorize(
            state.policy.can_approve_entry(&state.view(), caller, key),
            caller,
            "approve entries",
        )?;
        let entry = state.entries.transition(key, EntryStatus::Approved, None)?;

        state.notifications.record(
            NotificationKind::EntryApproved,
            Some(key),
            caller,
            json!({ "submitter": entry.submitter }),
        );
        info!("Entry {} approved by {}", key, caller);
        Ok(entry)
    }

    pub async fn reject_entry(
        &self,
        caller: &Caller,
        key: &EntryKey,
        reason: String,
    ) -> Result<Entry, AppError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        authorize(
            state.policy.can_reject_entry(&state.view(), caller, key),
            caller,
            "reject entries",
        )?;
        let entry = state
            .entries
            .transition(key, EntryStatus::Rejected, Some(reason.clone()))?;

        state.notifications.record(
            NotificationKind::EntryRejected,
            Some(key),
            caller,
            json!({ "submitter": entry.submitter, "reason": reason }),
        );
        info!("Entry {} rejected by {}: {}", key, caller, reason);
        Ok(entry)
    }

    pub async fn get_entry(&self, key: &EntryKey) -> Result<Entry, AppError> {
        let state = self.state.read().await;
        state.require_entry(key).cloned()
    }

    pub async fn list_entries(
        &self,
        status: EntryStatus,
        offset: usize,
        limit: usize,
    ) -> EntryPage {
        let state = self.state.read().await;
        state.entries.list(status, offset, self.clamp(limit))
    }

    pub async fn counts(&self) -> EntryCounts {
        let state = self.state.read().await;
        state.entries.counts()
    }

    // =========================================================================
    // EDIT PROPOSALS
    // =========================================================================

    pub async fn propose_edit(
        &self,
        caller: &Caller,
        key: &EntryKey,
        updates: Vec<FieldUpdate>,
    ) -> Result<EditProposal, AppError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        authorize(
            state.policy.can_propose_edit(&state.view(), caller, key, &updates),
            caller,
            "propose edits",
        )?;
        state.metadata.check_proposal(&updates)?;
        if state.entries.status(key) != Some(EntryStatus::Approved) {
            return Err(not_found_error(format!("No approved entry {}", key)));
        }

        let proposal = state.edits.propose(key, caller.clone(), updates);

        state.notifications.record(
            NotificationKind::EditProposed,
            Some(key),
            caller,
            json!({ "id": proposal.id, "updates": proposal.updates }),
        );
        info!("Edit #{} proposed for {} by {}", proposal.id, key, caller);
        Ok(proposal)
    }

    /// Apply proposal `id` and discard every other active proposal for the
    /// entry. Siblings are dropped, never merged.
    pub async fn accept_edit(
        &self,
        caller: &Caller,
        key: &EntryKey,
        id: u64,
    ) -> Result<EditProposal, AppError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        authorize(
            state.policy.can_accept_edit(&state.view(), caller, key, id),
            caller,
            "accept edits",
        )?;
        let winner = state.edits.get(key, id)?.clone();

        // Fails without writing if a field was deactivated since proposal time
        state.metadata.set_values(key, &winner.updates)?;
        let cleared = state.edits.clear(key);
        let discarded: Vec<u64> = cleared.iter().map(|p| p.id).filter(|&p| p != id).collect();

        state.notifications.record(
            NotificationKind::EditAccepted,
            Some(key),
            caller,
            json!({
                "id": id,
                "submitter": winner.submitter,
                "updates": winner.updates,
                "discarded": discarded,
            }),
        );
        info!(
            "Edit #{} accepted for {} by {} ({} sibling(s) discarded)",
            id,
            key,
            caller,
            discarded.len()
        );
        Ok(winner)
    }

    pub async fn reject_edit(
        &self,
        caller: &Caller,
        key: &EntryKey,
        id: u64,
        reason: String,
    ) -> Result<EditProposal, AppError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        authorize(
            state.policy.can_reject_edit(&state.view(), caller, key, id),
            caller,
            "reject edits",
        )?;
        let removed = state.edits.remove(key, id)?;

        state.notifications.record(
            NotificationKind::EditRejected,
            Some(key),
            caller,
            json!({ "id": id, "submitter": removed.submitter, "reason": reason }),
        );
        info!("Edit #{} for {} rejected by {}: {}", id, key, caller, reason);
        Ok(removed)
    }

    pub async fn get_proposal(&self, key: &EntryKey, id: u64) -> Result<EditProposal, AppError> {
        let state = self.state.read().await;
        state.edits.get(key, id).cloned()
    }

    pub async fn list_edits(&self, key: &EntryKey) -> Vec<EditProposal> {
        let state = self.state.read().await;
        state.edits.list_for(key)
    }

    pub async fn active_proposal_count(&self, key: &EntryKey) -> usize {
        let state = self.state.read().await;
        state.edits.active_count(key)
    }

    pub async fn list_all_edits(&self, offset: usize, limit: usize) -> EditPage {
        let state = self.state.read().await;
        state.edits.list_all(offset, self.clamp(limit))
    }

    // =========================================================================
    // METADATA
    // =========================================================================

    pub async fn add_field(
        &self,
        caller: &Caller,
        name: &str,
        required: bool,
    ) -> Result<MetadataField, AppError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        authorize(state.policy.can_add_field(caller, name), caller, "add metadata fields")?;
        let field = state.metadata.add_field(name, required)?;

        state.notifications.record(
            NotificationKind::FieldAdded,
            None,
            caller,
            json!({ "name": field.name, "required": field.is_required }),
        );
        info!("Metadata field '{}' registered (required: {})", field.name, field.is_required);
        Ok(field)
    }

    pub async fn update_field(
        &self,
        caller: &Caller,
        name: &str,
        active: bool,
        required: bool,
    ) -> Result<MetadataField, AppError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        authorize(state.policy.can_update_field(caller, name), caller, "update metadata fields")?;
        let field = state.metadata.update_field(name, active, required)?;

        state.notifications.record(
            NotificationKind::FieldUpdated,
            None,
            caller,
            json!({ "name": field.name, "active": field.is_active, "required": field.is_required }),
        );
        info!(
            "Metadata field '{}' updated (active: {}, required: {})",
            field.name, field.is_active, field.is_required
        );
        Ok(field)
    }

    pub async fn get_field(&self, name: &str) -> Result<MetadataField, AppError> {
        let state = self.state.read().await;
        state
            .metadata
            .field(name)
            .cloned()
            .ok_or_else(|| not_found_error(format!("Field '{}' is not registered", name)))
    }

    pub async fn list_fields(&self) -> Vec<MetadataField> {
        let state = self.state.read().await;
        state.metadata.fields().cloned().collect()
    }

    /// Write several values at once; nothing is written unless all are valid
    pub async fn set_values(
        &self,
        caller: &Caller,
        key: &EntryKey,
        updates: Vec<FieldUpdate>,
    ) -> Result<(), AppError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        authorize(
            state.policy.can_set_metadata(&state.view(), caller, key, &updates),
            caller,
            "set metadata",
        )?;
        state.require_entry(key)?;
        if updates.is_empty() {
            return Err(invalid_argument("At least one metadata update is required"));
        }
        state.metadata.set_values(key, &updates)?;

        state.notifications.record(
            NotificationKind::MetadataUpdated,
            Some(key),
            caller,
            json!({ "updates": updates }),
        );
        debug!("{} metadata value(s) written for {} by {}", updates.len(), key, caller);
        Ok(())
    }

    pub async fn set_value(
        &self,
        caller: &Caller,
        key: &EntryKey,
        field: &str,
        value: &str,
    ) -> Result<(), AppError> {
        self.set_values(caller, key, vec![FieldUpdate::new(field, value)]).await
    }

    pub async fn get_value(&self, key: &EntryKey, field: &str) -> Result<MetadataValue, AppError> {
        let state = self.state.read().await;
        state.require_entry(key)?;
        state.metadata.get_value(key, field)
    }

    pub async fn get_all_values(&self, key: &EntryKey) -> Result<Vec<MetadataValue>, AppError> {
        let state = self.state.read().await;
        state.require_entry(key)?;
        Ok(state.metadata.get_all_values(key))
    }

    // =========================================================================
    // GOVERNANCE
    // =========================================================================

    pub async fn policy_status(&self) -> PolicyStatus {
        let state = self.state.read().await;
        PolicyStatus {
            active: PolicySummary::of(state.policy.as_ref()),
            staged: state.staged_policy.as_deref().map(|p| PolicySummary::of(p)),
        }
    }

    pub async fn grant_role(
        &self,
        caller: &Caller,
        member: Caller,
        role: Role,
    ) -> Result<(), AppError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        state.require_governor(caller, "manage roles")?;
        state.policy.grant_role(member.clone(), role)?;

        state.notifications.record(
            NotificationKind::RoleGranted,
            None,
            caller,
            json!({ "member": member, "role": role }),
        );
        info!("Role {} granted to {} by {}", role, member, caller);
        Ok(())
    }

    pub async fn revoke_role(
        &self,
        caller: &Caller,
        member: &Caller,
        role: Role,
    ) -> Result<(), AppError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        state.require_governor(caller, "manage roles")?;
        state.policy.revoke_role(member, role)?;

        state.notifications.record(
            NotificationKind::RoleRevoked,
            None,
            caller,
            json!({ "member": member, "role": role }),
        );
        info!("Role {} revoked from {} by {}", role, member, caller);
        Ok(())
    }

    /// Phase one of a gateway swap. The current gateway keeps deciding every
    /// operation until the new governor completes the migration.
    pub async fn stage_policy_migration(
        &self,
        caller: &Caller,
        next: Box<dyn PolicyGateway>,
    ) -> Result<PolicyStatus, AppError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        state.require_governor(caller, "stage a policy migration")?;
        if let Some(staged) = &state.staged_policy {
            return Err(AppError::Conflict(format!(
                "A migration to policy '{}' is already staged",
                staged.name()
            )));
        }

        let summary = PolicySummary::of(next.as_ref());
        state.staged_policy = Some(next);

        state.notifications.record(
            NotificationKind::PolicyMigrationStaged,
            None,
            caller,
            json!({ "policy": summary.name, "governor": summary.governor }),
        );
        info!("Policy migration to '{}' staged by {}", summary.name, caller);
        Ok(PolicyStatus {
            active: PolicySummary::of(state.policy.as_ref()),
            staged: Some(summary),
        })
    }

    /// Phase two: the staged gateway's governor takes over. Every component
    /// reads the gateway through this one slot, so the swap is one write.
    pub async fn complete_policy_migration(
        &self,
        caller: &Caller,
    ) -> Result<PolicyStatus, AppError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let staged = state
            .staged_policy
            .as_ref()
            .ok_or_else(|| not_found_error("No policy migration is staged"))?;
        authorize(staged.governor() == caller, caller, "complete the policy migration")?;

        let Some(next) = state.staged_policy.take() else {
            return Err(not_found_error("No policy migration is staged"));
        };
        let previous = std::mem::replace(&mut state.policy, next);
        let active = PolicySummary::of(state.policy.as_ref());

        state.notifications.record(
            NotificationKind::PolicyMigrated,
            None,
            caller,
            json!({
                "from": previous.name(),
                "fromGovernor": previous.governor(),
                "to": active.name,
                "toGovernor": active.governor,
            }),
        );
        info!("Policy migrated from '{}' to '{}'", previous.name(), active.name);
        Ok(PolicyStatus { active, staged: None })
    }

    pub async fn cancel_policy_migration(&self, caller: &Caller) -> Result<PolicyStatus, AppError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        state.require_governor(caller, "cancel a policy migration")?;
        let dropped = state
            .staged_policy
            .take()
            .ok_or_else(|| not_found_error("No policy migration is staged"))?;

        state.notifications.record(
            NotificationKind::PolicyMigrationCancelled,
            None,
            caller,
            json!({ "policy": dropped.name() }),
        );
        info!("Policy migration to '{}' cancelled by {}", dropped.name(), caller);
        Ok(PolicyStatus {
            active: PolicySummary::of(state.policy.as_ref()),
            staged: None,
        })
    }

    // =========================================================================
    // NOTIFICATIONS
    // =========================================================================

    pub async fn notifications(&self, after: u64, limit: usize) -> Vec<Notification> {
        let state = self.state.read().await;
        state.notifications.since(after, self.clamp(limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::testing::PermissivePolicy;
    use crate::policy::CuratorPolicy;
    use pretty_assertions::assert_eq;
    use tokio_test::assert_ok;

    fn caller(id: &str) -> Caller {
        Caller::from(id)
    }

    fn key(address: &str) -> EntryKey {
        EntryKey::address(address)
    }

    fn logo(value: &str) -> Vec<FieldUpdate> {
        vec![FieldUpdate::new("logoURI", value)]
    }

    async fn registry_with_fields() -> Registry {
        let policy = CuratorPolicy::new(caller("gov")).with_curators([caller("curator")]);
        let registry = Registry::new(Box::new(policy));
        assert_ok!(registry.add_field(&caller("gov"), "logoURI", true).await);
        assert_ok!(registry.add_field(&caller("gov"), "website", false).await);
        registry
    }

    async fn approved(registry: &Registry, address: &str) -> EntryKey {
        let k = key(address);
        assert_ok!(registry.add_entry(&caller("s1"), k.clone(), None, logo("u1")).await);
        assert_ok!(registry.approve_entry(&caller("curator"), &k).await);
        k
    }

    async fn assert_partition_invariants(registry: &Registry, keys: &[EntryKey]) {
        let state = registry.state.read().await;
        for k in keys {
            assert!(state.entries.membership_count(k) <= 1, "{} in several partitions", k);
        }
        let counts = state.entries.counts();
        let live = |status| state.entries.list(status, 0, usize::MAX).entries.len();
        assert_eq!(counts.pending, live(EntryStatus::Pending));
        assert_eq!(counts.approved, live(EntryStatus::Approved));
        assert_eq!(counts.rejected, live(EntryStatus::Rejected));
    }

    #[tokio::test]
    async fn test_add_then_approve() {
        let registry = registry_with_fields().await;
        let x = key("x");

        let entry = assert_ok!(
            registry
                .add_entry(&caller("s1"), x.clone(), None, logo("u1"))
                .await
        );
        assert_eq!(entry.status, EntryStatus::Pending);
        assert_eq!(entry.submitter, caller("s1"));

        let entry = assert_ok!(registry.approve_entry(&caller("curator"), &x).await);
        assert_eq!(entry.status, EntryStatus::Approved);
        assert_eq!(registry.get_value(&x, "logoURI").await.unwrap().value, "u1");
        assert_partition_invariants(&registry, &[x]).await;
    }

    #[tokio::test]
    async fn test_denied_operation_changes_nothing() {
        let registry = registry_with_fields().await;
        let x = key("x");
        assert_ok!(registry.add_entry(&caller("s1"), x.clone(), None, logo("u1")).await);
        let before = registry.notifications(0, 100).await.len();

        let err = registry.approve_entry(&caller("mallory"), &x).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        assert_eq!(registry.get_entry(&x).await.unwrap().status, EntryStatus::Pending);
        assert_eq!(registry.notifications(0, 100).await.len(), before);
    }

    #[tokio::test]
    async fn test_add_entry_conflicts_and_validation() {
        let registry = registry_with_fields().await;
        let x = approved(&registry, "x").await;

        let err = registry.add_entry(&caller("s2"), x.clone(), None, vec![]).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let err = registry.add_entry(&caller("s2"), key(" "), None, vec![]).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));

        // Bad initial metadata aborts the whole submission
        let err = registry.add_entry(&caller("s2"), key("y"), None, logo("")).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
        assert!(matches!(registry.get_entry(&key("y")).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_add_on_behalf_requires_delegate() {
        let policy = CuratorPolicy::new(caller("gov")).with_trusted_delegates([caller("bot")]);
        let registry = Registry::new(Box::new(policy));

        let err = registry
            .add_entry(&caller("alice"), key("x"), Some(caller("bob")), vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        let entry = assert_ok!(
            registry
                .add_entry(&caller("bot"), key("x"), Some(caller("bob")), vec![])
                .await
        );
        assert_eq!(entry.submitter, caller("bob"));
    }

    #[tokio::test]
    async fn test_resubmission_after_rejection() {
        let registry = registry_with_fields().await;
        let y = key("y");
        assert_ok!(registry.add_entry(&caller("s1"), y.clone(), None, vec![]).await);
        let rejected = assert_ok!(
            registry
                .reject_entry(&caller("curator"), &y, "bad".into())
                .await
        );
        assert_eq!(rejected.rejection_reason.as_deref(), Some("bad"));
        assert_eq!(registry.counts().await.rejected, 1);

        let entry = assert_ok!(registry.add_entry(&caller("s2"), y.clone(), None, vec![]).await);
        assert_eq!(entry.status, EntryStatus::Pending);
        assert_eq!(entry.submitter, caller("s2"));
        assert_eq!(
            registry.counts().await,
            EntryCounts {
                pending: 1,
                approved: 0,
                rejected: 0
            }
        );
        assert_partition_invariants(&registry, &[y]).await;
    }

    #[tokio::test]
    async fn test_terminal_status_errors() {
        let registry = registry_with_fields().await;
        let x = approved(&registry, "x").await;

        let err = registry.approve_entry(&caller("curator"), &x).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        let err = registry.reject_entry(&caller("curator"), &x, "late".into()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let err = registry.approve_entry(&caller("curator"), &key("ghost")).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_competing_edits_and_accept_clears_siblings() {
        let registry = registry_with_fields().await;
        let x = approved(&registry, "x").await;

        let first = assert_ok!(registry.propose_edit(&caller("s2"), &x, logo("u2")).await);
        let second = assert_ok!(registry.propose_edit(&caller("s3"), &x, logo("u3")).await);
        assert_eq!((first.id, second.id), (1, 2));
        assert_eq!(registry.active_proposal_count(&x).await, 2);

        assert_ok!(registry.accept_edit(&caller("curator"), &x, 1).await);
        assert_eq!(registry.get_value(&x, "logoURI").await.unwrap().value, "u2");
        assert_eq!(registry.active_proposal_count(&x).await, 0);
        assert!(matches!(registry.get_proposal(&x, 2).await, Err(AppError::NotFound(_))));
        assert_eq!(registry.list_all_edits(0, 10).await.total, 0);

        let next = assert_ok!(registry.propose_edit(&caller("s2"), &x, logo("u4")).await);
        assert_eq!(next.id, 3);
    }

    #[tokio::test]
    async fn test_reject_edit_keeps_siblings() {
        let registry = registry_with_fields().await;
        let x = approved(&registry, "x").await;
        assert_ok!(registry.propose_edit(&caller("s2"), &x, logo("u2")).await);
        assert_ok!(registry.propose_edit(&caller("s3"), &x, logo("u3")).await);

        assert_ok!(registry.reject_edit(&caller("curator"), &x, 1, "spam".into()).await);
        assert_eq!(registry.active_proposal_count(&x).await, 1);
        assert_eq!(registry.get_proposal(&x, 2).await.unwrap().updates, logo("u3"));
        assert_eq!(registry.get_value(&x, "logoURI").await.unwrap().value, "u1");
    }

    #[tokio::test]
    async fn test_propose_edit_validation() {
        let registry = registry_with_fields().await;
        let x = approved(&registry, "x").await;
        assert_ok!(registry.add_entry(&caller("s1"), key("pending"), None, vec![]).await);

        let err = registry.propose_edit(&caller("s2"), &x, vec![]).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
        let err = registry
            .propose_edit(&caller("s2"), &x, vec![FieldUpdate::new("ghost", "x")])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
        let err = registry
            .propose_edit(&caller("s2"), &key("pending"), logo("u2"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_accept_aborts_when_field_deactivated() {
        let registry = registry_with_fields().await;
        let x = approved(&registry, "x").await;
        assert_ok!(
            registry
                .propose_edit(&caller("s2"), &x, vec![FieldUpdate::new("website", "w")])
                .await
        );
        assert_ok!(registry.update_field(&caller("gov"), "website", false, false).await);

        let err = registry.accept_edit(&caller("curator"), &x, 1).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(registry.active_proposal_count(&x).await, 1);
    }

    #[tokio::test]
    async fn test_metadata_writes() {
        let registry = registry_with_fields().await;
        assert_ok!(registry.add_entry(&caller("s1"), key("x"), None, vec![]).await);
        let x = key("x");

        // Pending submitter may fill in their own entry
        assert_ok!(registry.set_value(&caller("s1"), &x, "website", "https://x.org").await);
        let err = registry.set_value(&caller("eve"), &x, "website", "evil").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        let err = registry.set_values(&caller("s1"), &x, vec![]).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
        let err = registry
            .set_value(&caller("curator"), &key("ghost"), "website", "x")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        assert_ok!(registry.update_field(&caller("gov"), "website", false, false).await);
        let values = assert_ok!(registry.get_all_values(&x).await);
        assert_eq!(values.len(), 2);
        assert_eq!(values[1].value, "https://x.org");
        assert!(!values[1].is_active);
    }

    #[tokio::test]
    async fn test_field_management_is_governor_only() {
        let registry = registry_with_fields().await;
        let err = registry.add_field(&caller("curator"), "twitter", false).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        let err = registry.add_field(&caller("gov"), "logoURI", false).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        let err = registry.update_field(&caller("gov"), "twitter", true, false).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let names: Vec<_> = registry.list_fields().await.into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["logoURI".to_string(), "website".to_string()]);
    }

    #[tokio::test]
    async fn test_policy_migration_two_phase() {
        let registry = registry_with_fields().await;
        let x = key("x");
        assert_ok!(registry.add_entry(&caller("s1"), x.clone(), None, logo("u1")).await);

        let next = CuratorPolicy::new(caller("council")).with_curators([caller("new-curator")]);
        let err = registry
            .stage_policy_migration(&caller("curator"), Box::new(next.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        let status = assert_ok!(
            registry
                .stage_policy_migration(&caller("gov"), Box::new(next))
                .await
        );
        assert_eq!(status.staged.map(|s| s.governor), Some(caller("council")));

        // Still decided by the old gateway while staged
        let err = registry.approve_entry(&caller("new-curator"), &x).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        let err = registry.complete_policy_migration(&caller("gov")).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        let status = assert_ok!(registry.complete_policy_migration(&caller("council")).await);
        assert_eq!(status.active.governor, caller("council"));
        assert!(status.staged.is_none());

        let err = registry.approve_entry(&caller("curator"), &x).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        assert_ok!(registry.approve_entry(&caller("new-curator"), &x).await);

        let kinds: Vec<_> = registry
            .notifications(0, 100)
            .await
            .into_iter()
            .map(|n| n.kind)
            .collect();
        assert!(kinds.contains(&NotificationKind::PolicyMigrated));
    }

    #[tokio::test]
    async fn test_notifications_carry_the_transition() {
        let registry = registry_with_fields().await;
        let x = approved(&registry, "x").await;

        let y = key("y");
        assert_ok!(registry.add_entry(&caller("s1"), y.clone(), None, logo("u1")).await);
        assert_ok!(registry.reject_entry(&caller("curator"), &y, "bad".to_string()).await);
        assert_ok!(registry.add_entry(&caller("s2"), y.clone(), None, logo("u4")).await);

        assert_ok!(registry.propose_edit(&caller("s2"), &x, logo("u2")).await);
        assert_ok!(registry.propose_edit(&caller("s3"), &x, logo("u3")).await);
        assert_ok!(registry.accept_edit(&caller("curator"), &x, 1).await);

        let records = registry.notifications(0, 100).await;
        let sequences: Vec<u64> = records.iter().map(|n| n.sequence).collect();
        assert_eq!(sequences, (1..=records.len() as u64).collect::<Vec<_>>());

        let added: Vec<_> = records
            .iter()
            .filter(|n| n.kind == NotificationKind::EntryAdded && n.entry.as_ref() == Some(&y))
            .collect();
        assert_eq!(added.len(), 2);
        assert_eq!(added[0].payload["resubmission"], json!(false));
        assert_eq!(added[1].payload["resubmission"], json!(true));
        assert_eq!(added[1].payload["submitter"], json!("s2"));
        assert_eq!(added[1].payload["metadata"], json!([{ "field": "logoURI", "value": "u4" }]));

        let rejected = assert_ok!(records
            .iter()
            .find(|n| n.kind == NotificationKind::EntryRejected)
            .ok_or("no rejection recorded"));
        assert_eq!(rejected.payload["reason"], json!("bad"));

        let accepted = assert_ok!(records
            .last()
            .filter(|n| n.kind == NotificationKind::EditAccepted)
            .ok_or("accept was not the last record"));
        assert_eq!(accepted.entry, Some(x));
        assert_eq!(accepted.actor, caller("curator"));
        assert_eq!(accepted.payload["id"], json!(1));
        assert_eq!(accepted.payload["submitter"], json!("s2"));
        assert_eq!(accepted.payload["updates"], json!([{ "field": "logoURI", "value": "u2" }]));
        assert_eq!(accepted.payload["discarded"], json!([2]));
    }

    #[tokio::test]
    async fn test_cancel_and_double_stage() {
        let registry = Registry::new(Box::new(PermissivePolicy::new("gov")));
        assert!(matches!(
            registry.cancel_policy_migration(&caller("gov")).await,
            Err(AppError::NotFound(_))
        ));
        assert_ok!(
            registry
                .stage_policy_migration(&caller("gov"), Box::new(PermissivePolicy::new("next")))
                .await
        );
        let err = registry
            .stage_policy_migration(&caller("gov"), Box::new(PermissivePolicy::new("other")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        assert_ok!(registry.cancel_policy_migration(&caller("gov")).await);
        assert!(registry.policy_status().await.staged.is_none());
        assert!(matches!(
            registry.complete_policy_migration(&caller("next")).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_role_grants_flow_through_gateway() {
        let registry = registry_with_fields().await;
        let x = key("x");
        assert_ok!(registry.add_entry(&caller("s1"), x.clone(), None, logo("u1")).await);

        let err = registry
            .grant_role(&caller("curator"), caller("carol"), Role::Curator)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        assert_ok!(registry.grant_role(&caller("gov"), caller("carol"), Role::Curator).await);
        assert_ok!(registry.approve_entry(&caller("carol"), &x).await);

        assert_ok!(registry.revoke_role(&caller("gov"), &caller("carol"), Role::Curator).await);
        let members = registry.policy_status().await.active.members;
        assert!(!members.curators.contains(&caller("carol")));
    }

    #[tokio::test]
    async fn test_pagination_is_clamped() {
        let registry = Registry::new(Box::new(PermissivePolicy::new("gov"))).with_max_page_size(2);
        for address in ["a", "b", "c"] {
            assert_ok!(registry.add_entry(&caller("s"), key(address), None, vec![]).await);
        }
        let page = registry.list_entries(EntryStatus::Pending, 0, 50).await;
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.total, 3);
    }
}
