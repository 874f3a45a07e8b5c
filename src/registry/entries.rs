//! Entry Registry
//!
//! Entry records and the three status partitions. Every key lives in at
//! most one of pending/approved/rejected; counts are the live set sizes.

use crate::error::{conflict_error, not_found_error, AppError};
use crate::registry::set::EnumerableSet;
use crate::registry::types::{Caller, Entry, EntryCounts, EntryKey, EntryPage, EntryStatus};
use chrono::Utc;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct EntryRegistry {
    entries: HashMap<EntryKey, Entry>,
    pending: EnumerableSet<EntryKey>,
    approved: EnumerableSet<EntryKey>,
    rejected: EnumerableSet<EntryKey>,
}

impl EntryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn partition(&self, status: EntryStatus) -> &EnumerableSet<EntryKey> {
        match status {
            EntryStatus::Pending => &self.pending,
            EntryStatus::Approved => &self.approved,
            EntryStatus::Rejected => &self.rejected,
        }
    }

    fn partition_mut(&mut self, status: EntryStatus) -> &mut EnumerableSet<EntryKey> {
        match status {
            EntryStatus::Pending => &mut self.pending,
            EntryStatus::Approved => &mut self.approved,
            EntryStatus::Rejected => &mut self.rejected,
        }
    }

    pub fn get(&self, key: &EntryKey) -> Option<&Entry> {
        self.entries.get(key)
    }

    pub fn status(&self, key: &EntryKey) -> Option<EntryStatus> {
        self.entries.get(key).map(|e| e.status)
    }

    /// A key can be (re)submitted unless it is pending or approved
    pub fn check_submittable(&self, key: &EntryKey) -> Result<(), AppError> {
        match self.status(key) {
            Some(status @ (EntryStatus::Pending | EntryStatus::Approved)) => Err(conflict_error(
                format!("Entry {} already exists with status {}", key, status),
            )),
            _ => Ok(()),
        }
    }

    /// Insert (or resubmit) a key as pending. Callers must have run
    /// `check_submittable` first.
    pub fn insert_pending(&mut self, key: EntryKey, submitter: Caller) -> Entry {
        // Resubmission frees the rejected slot
        self.rejected.remove(&key);

        let now = Utc::now();
        let entry = Entry {
            key: key.clone(),
            submitter,
            status: EntryStatus::Pending,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        };
        self.pending.insert(key.clone());
        self.entries.insert(key, entry.clone());
        entry
    }

    /// Validate a pending -> `target` transition without applying it
    pub fn check_transition(&self, key: &EntryKey, target: EntryStatus) -> Result<(), AppError> {
        match self.status(key) {
            Some(EntryStatus::Pending) => Ok(()),
            Some(status) if status == target => Err(conflict_error(format!(
                "Entry {} is already {}",
                key, status
            ))),
            _ => Err(not_found_error(format!("No pending entry {}", key))),
        }
    }

    /// Move a pending entry into `target`
    pub fn transition(
        &mut self,
        key: &EntryKey,
        target: EntryStatus,
        reason: Option<String>,
    ) -> Result<Entry, AppError> {
        self.check_transition(key, target)?;
        let entry = self
            .entries
            .get_mut(key)
            .ok_or_else(|| not_found_error(format!("No pending entry {}", key)))?;

        entry.status = target;
        entry.rejection_reason = reason;
        entry.updated_at = Utc::now();
        let entry = entry.clone();

        self.pending.remove(key);
        self.partition_mut(target).insert(key.clone());
        Ok(entry)
    }

    /// Contiguous slice of one partition plus its total size
    pub fn list(&self, status: EntryStatus, offset: usize, limit: usize) -> EntryPage {
        let partition = self.partition(status);
        let entries = partition
            .window(offset, limit)
            .iter()
            .filter_map(|key| self.entries.get(key).cloned())
            .collect();
        EntryPage {
            entries,
            total: partition.len(),
        }
    }

    pub fn counts(&self) -> EntryCounts {
        EntryCounts {
            pending: self.pending.len(),
            approved: self.approved.len(),
            rejected: self.rejected.len(),
        }
    }

    /// Number of partitions containing `key`; anything above 1 is a bug
    #[cfg(test)]
    pub fn membership_count(&self, key: &EntryKey) -> usize {
        [&self.pending, &self.approved, &self.rejected]
            .iter()
            .filter(|set| set.contains(key))
            .count()
    }
}
