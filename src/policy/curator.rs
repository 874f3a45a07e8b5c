//! Curator policy
//!
//! Default gateway: one governor, a curator roster, and a trusted delegate
//! allowlist.

use crate::error::{invalid_argument, AppError};
use crate::policy::{PolicyGateway, PolicyMembers, RegistryView, Role};
use crate::registry::{Caller, EntryKey, FieldUpdate};
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub struct CuratorPolicy {
    governor: Caller,
    curators: BTreeSet<Caller>,
    trusted_delegates: BTreeSet<Caller>,
    /// Anyone may submit entries and propose edits under their own name
    open_submissions: bool,
}

impl CuratorPolicy {
    pub fn new(governor: Caller) -> Self {
        Self {
            governor,
            curators: BTreeSet::new(),
            trusted_delegates: BTreeSet::new(),
            open_submissions: true,
        }
    }

    pub fn with_curators(mut self, curators: impl IntoIterator<Item = Caller>) -> Self {
        self.curators.extend(curators);
        self
    }

    pub fn with_trusted_delegates(mut self, delegates: impl IntoIterator<Item = Caller>) -> Self {
        self.trusted_delegates.extend(delegates);
        self
    }

    pub fn with_open_submissions(mut self, open: bool) -> Self {
        self.open_submissions = open;
        self
    }

    fn is_curator(&self, caller: &Caller) -> bool {
        caller == &self.governor || self.curators.contains(caller)
    }

    /// Curators, the governor, and trusted delegates may review
    fn can_review(&self, caller: &Caller) -> bool {
        self.is_curator(caller) || self.trusted_delegates.contains(caller)
    }

    fn can_submit(&self, caller: &Caller) -> bool {
        self.open_submissions || self.is_curator(caller)
    }

    fn roster_mut(&mut self, role: Role) -> &mut BTreeSet<Caller> {
        match role {
            Role::Curator => &mut self.curators,
            Role::TrustedDelegate => &mut self.trusted_delegates,
        }
    }
}

impl PolicyGateway for CuratorPolicy {
    fn name(&self) -> &str {
        "curator"
    }

    fn governor(&self) -> &Caller {
        &self.governor
    }

    fn is_trusted_delegate(&self, caller: &Caller) -> bool {
        self.trusted_delegates.contains(caller)
    }

    fn can_add_entry(
        &self,
        _view: &RegistryView<'_>,
        caller: &Caller,
        submitter: &Caller,
        _key: &EntryKey,
    ) -> bool {
        if caller != submitter {
            return self.is_trusted_delegate(caller);
        }
        self.can_submit(caller)
    }

    fn can_approve_entry(
        &self,
        _view: &RegistryView<'_>,
        caller: &Caller,
        _key: &EntryKey,
    ) -> bool {
        self.can_review(caller)
    }

    fn can_reject_entry(&self, _view: &RegistryView<'_>, caller: &Caller, _key: &EntryKey) -> bool {
        self.can_review(caller)
    }

    fn can_propose_edit(
        &self,
        _view: &RegistryView<'_>,
        caller: &Caller,
        _key: &EntryKey,
        _updates: &[FieldUpdate],
    ) -> bool {
        self.can_submit(caller)
    }

    fn can_accept_edit(
        &self,
        _view: &RegistryView<'_>,
        caller: &Caller,
        _key: &EntryKey,
        _id: u64,
    ) -> bool {
        self.can_review(caller)
    }

    fn can_reject_edit(
        &self,
        view: &RegistryView<'_>,
        caller: &Caller,
        key: &EntryKey,
        id: u64,
    ) -> bool {
        // Proposers may withdraw their own edit
        self.can_review(caller)
            || view
                .proposal(key, id)
                .is_some_and(|p| &p.submitter == caller)
    }

    fn can_add_field(&self, caller: &Caller, _name: &str) -> bool {
        caller == &self.governor
    }

    fn can_update_field(&self, caller: &Caller, _name: &str) -> bool {
        caller == &self.governor
    }

    fn can_set_metadata(
        &self,
        view: &RegistryView<'_>,
        caller: &Caller,
        key: &EntryKey,
        _updates: &[FieldUpdate],
    ) -> bool {
        self.is_curator(caller) || view.is_pending_submitter(key, caller)
    }

    fn members(&self) -> PolicyMembers {
        PolicyMembers {
            curators: self.curators.iter().cloned().collect(),
            trusted_delegates: self.trusted_delegates.iter().cloned().collect(),
        }
    }

    fn grant_role(&mut self, member: Caller, role: Role) -> Result<(), AppError> {
        if member.as_str().is_empty() {
            return Err(invalid_argument("Member id must not be empty"));
        }
        self.roster_mut(role).insert(member);
        Ok(())
    }

    fn revoke_role(&mut self, member: &Caller, role: Role) -> Result<(), AppError> {
        if !self.roster_mut(role).remove(member) {
            return Err(AppError::NotFound(format!("{} does not hold role {}", member, role)));
        }
        Ok(())
    }
}
