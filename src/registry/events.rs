//! Notification log
//!
//! Append-only record of every successful mutation, carrying enough payload
//! for an indexer to rebuild state transitions without replaying registry
//! logic.

use crate::registry::types::{Caller, EntryKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    // Entry actions
    EntryAdded,
    EntryApproved,
    EntryRejected,

    // Edit actions
    EditProposed,
    EditAccepted,
    EditRejected,

    // Metadata actions
    FieldAdded,
    FieldUpdated,
    MetadataUpdated,

    // Governance actions
    RoleGranted,
    RoleRevoked,
    PolicyMigrationStaged,
    PolicyMigrationCancelled,
    PolicyMigrated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// 1-based, gap-free
    pub sequence: u64,
    pub id: Uuid,
    pub kind: NotificationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<EntryKey>,
    pub actor: Caller,
    pub payload: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct NotificationLog {
    records: Vec<Notification>,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        kind: NotificationKind,
        entry: Option<&EntryKey>,
        actor: &Caller,
        payload: serde_json::Value,
    ) -> u64 {
        let sequence = self.records.len() as u64 + 1;
        let entry_label = entry.map_or_else(|| "-".to_string(), ToString::to_string);
        info!(
            sequence,
            kind = ?kind,
            entry = %entry_label,
            actor = %actor,
            "registry notification"
        );
        self.records.push(Notification {
            sequence,
            id: Uuid::new_v4(),
            kind,
            entry: entry.cloned(),
            actor: actor.clone(),
            payload,
            recorded_at: Utc::now(),
        });
        sequence
    }

    /// Records with `sequence > after`, oldest first
    pub fn since(&self, after: u64, limit: usize) -> Vec<Notification> {
        let start = usize::try_from(after).unwrap_or(usize::MAX).min(self.records.len());
        self.records[start..].iter().take(limit).cloned().collect()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.records.len()
    }
}
