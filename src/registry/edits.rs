//! Edit Proposal Ledger
//!
//! Per-entry sequences of competing edits. Accepting one edit discards all
//! of its siblings; rejecting one leaves the siblings alone.
//!
//! INVARIANT: an entry is in `with_proposals` exactly when its map in
//! `active` is non-empty. Empty maps are never left behind.

use crate::error::{not_found_error, AppError};
use crate::registry::set::EnumerableSet;
use crate::registry::types::{Caller, EditPage, EditProposal, EntryKey, FieldUpdate};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
pub struct EditLedger {
    active: HashMap<EntryKey, BTreeMap<u64, EditProposal>>,
    /// Last id issued per entry. Survives deletion so ids are never reissued.
    last_id: HashMap<EntryKey, u64>,
    with_proposals: EnumerableSet<EntryKey>,
    /// Active proposals across every entry
    active_total: usize,
}

impl EditLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a proposal and return it with its freshly assigned id
    pub fn propose(
        &mut self,
        key: &EntryKey,
        submitter: Caller,
        updates: Vec<FieldUpdate>,
    ) -> EditProposal {
        let counter = self.last_id.entry(key.clone()).or_insert(0);
        *counter += 1;

        let proposal = EditProposal {
            id: *counter,
            key: key.clone(),
            submitter,
            updates,
            created_at: Utc::now(),
        };

        self.active
            .entry(key.clone())
            .or_default()
            .insert(proposal.id, proposal.clone());
        self.with_proposals.insert(key.clone());
        self.active_total += 1;
        proposal
    }

    pub fn get(&self, key: &EntryKey, id: u64) -> Result<&EditProposal, AppError> {
        self.active
            .get(key)
            .and_then(|proposals| proposals.get(&id))
            .ok_or_else(|| not_found_error(format!("No active edit #{} for entry {}", id, key)))
    }

    /// Active proposals of one entry in ascending id order
    pub fn list_for(&self, key: &EntryKey) -> Vec<EditProposal> {
        self.active
            .get(key)
            .map(|proposals| proposals.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn active_count(&self, key: &EntryKey) -> usize {
        self.active.get(key).map_or(0, BTreeMap::len)
    }

    /// Number of entries with at least one active proposal
    #[cfg(test)]
    pub fn entries_with_proposals(&self) -> usize {
        self.with_proposals.len()
    }

    /// Drop every active proposal for `key`, returning them in id order
    pub fn clear(&mut self, key: &EntryKey) -> Vec<EditProposal> {
        self.with_proposals.remove(key);
        let cleared: Vec<EditProposal> = self
            .active
            .remove(key)
            .map(|proposals| proposals.into_values().collect())
            .unwrap_or_default();
        self.active_total -= cleared.len();
        cleared
    }

    /// Drop a single proposal; siblings are untouched
    pub fn remove(&mut self, key: &EntryKey, id: u64) -> Result<EditProposal, AppError> {
        let proposals = self
            .active
            .get_mut(key)
            .ok_or_else(|| not_found_error(format!("No active edit #{} for entry {}", id, key)))?;
        let removed = proposals
            .remove(&id)
            .ok_or_else(|| not_found_error(format!("No active edit #{} for entry {}", id, key)))?;
        self.active_total -= 1;

        if proposals.is_empty() {
            self.active.remove(key);
            self.with_proposals.remove(key);
        }
        Ok(removed)
    }

    /// Window over all active proposals: outer order is the enumeration of
    /// entries with proposals, inner order is ascending id.
    pub fn list_all(&self, offset: usize, limit: usize) -> EditPage {
        let total = self.active_total;
        let mut edits = Vec::with_capacity(limit.min(total));
        let mut skip = offset;

        for key in self.with_proposals.iter() {
            if edits.len() >= limit {
                break;
            }
            let Some(proposals) = self.active.get(key) else {
                continue;
            };
            // Outer cursor: skip whole entries that sit before the window
            if skip >= proposals.len() {
                skip -= proposals.len();
                continue;
            }
            // Inner cursor: step into the entry where the window starts
            let wanted = limit - edits.len();
            edits.extend(proposals.values().skip(skip).take(wanted).cloned());
            skip = 0;
        }

        let has_more = offset.saturating_add(edits.len()) < total;
        EditPage {
            edits,
            total,
            has_more,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio_test::assert_ok;

    fn key(address: &str) -> EntryKey {
        EntryKey::address(address)
    }

    fn logo(value: &str) -> Vec<FieldUpdate> {
        vec![FieldUpdate::new("logoURI", value)]
    }

    fn ids(page: &EditPage) -> Vec<(String, u64)> {
        page.edits
            .iter()
            .map(|e| (e.key.address.clone(), e.id))
            .collect()
    }

    #[test]
    fn test_running_total_tracks_every_mutation() {
        let mut ledger = EditLedger::new();
        let (a, b) = (key("a"), key("b"));
        for entry in [&a, &a, &a, &b] {
            ledger.propose(entry, Caller::from("s"), logo("u"));
        }
        assert_eq!(ledger.list_all(0, 10).total, 4);

        assert_ok!(ledger.remove(&a, 2));
        assert_eq!(ledger.list_all(0, 10).total, 3);
        assert!(ledger.remove(&a, 2).is_err());
        assert_eq!(ledger.list_all(0, 10).total, 3);

        assert_eq!(ledger.clear(&a).len(), 2);
        let page = ledger.list_all(0, 1);
        assert_eq!(page.total, 1);
        assert!(!page.has_more);

        assert!(ledger.clear(&a).is_empty());
        assert_eq!(ledger.list_all(0, 10).total, 1);
    }
    #[test]
    fn test_ids_are_sequential_per_entry() {
        let mut ledger = EditLedger::new();
        assert_eq!(ledger.propose(&key("x"), Caller::from("s2"), logo("u2")).id, 1);
        assert_eq!(ledger.propose(&key("x"), Caller::from("s3"), logo("u3")).id, 2);
        assert_eq!(ledger.propose(&key("y"), Caller::from("s3"), logo("u4")).id, 1);
        assert_eq!(ledger.active_count(&key("x")), 2);
        assert_eq!(ledger.entries_with_proposals(), 2);
    }

    #[test]
    fn test_ids_never_reissued_after_clear() {
        let mut ledger = EditLedger::new();
        ledger.propose(&key("x"), Caller::from("s"), logo("a"));
        ledger.propose(&key("x"), Caller::from("s"), logo("b"));
        assert_eq!(ledger.clear(&key("x")).len(), 2);

        assert_eq!(ledger.active_count(&key("x")), 0);
        assert_eq!(ledger.entries_with_proposals(), 0);
        assert_eq!(ledger.propose(&key("x"), Caller::from("s"), logo("c")).id, 3);
    }

    #[test]
    fn test_remove_leaves_siblings() {
        let mut ledger = EditLedger::new();
        ledger.propose(&key("x"), Caller::from("s2"), logo("u2"));
        ledger.propose(&key("x"), Caller::from("s3"), logo("u3"));

        assert_ok!(ledger.remove(&key("x"), 1));
        assert!(matches!(ledger.get(&key("x"), 1), Err(AppError::NotFound(_))));
        assert_eq!(ledger.get(&key("x"), 2).unwrap().updates, logo("u3"));
        assert_eq!(ledger.entries_with_proposals(), 1);

        assert_ok!(ledger.remove(&key("x"), 2));
        assert_eq!(ledger.entries_with_proposals(), 0);
        assert!(matches!(ledger.remove(&key("x"), 2), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_list_all_two_level_order() {
        let mut ledger = EditLedger::new();
        for (address, count) in [("a", 2), ("b", 1), ("c", 3)] {
            for i in 0..count {
                ledger.propose(&key(address), Caller::from("s"), logo(&i.to_string()));
            }
        }

        let all = ledger.list_all(0, 100);
        assert_eq!(all.total, 6);
        assert!(!all.has_more);
        assert_eq!(
            ids(&all),
            vec![
                ("a".to_string(), 1),
                ("a".to_string(), 2),
                ("b".to_string(), 1),
                ("c".to_string(), 1),
                ("c".to_string(), 2),
                ("c".to_string(), 3),
            ]
        );

        let window = ledger.list_all(1, 3);
        assert!(window.has_more);
        assert_eq!(
            ids(&window),
            vec![("a".to_string(), 2), ("b".to_string(), 1), ("c".to_string(), 1)]
        );

        let tail = ledger.list_all(4, 3);
        assert!(!tail.has_more);
        assert_eq!(ids(&tail), vec![("c".to_string(), 2), ("c".to_string(), 3)]);

        assert!(ledger.list_all(6, 3).edits.is_empty());
        assert!(ledger.list_all(0, 0).has_more);
    }

    #[test]
    fn test_list_all_skips_gaps_in_ids() {
        let mut ledger = EditLedger::new();
        for value in ["1", "2", "3"] {
            ledger.propose(&key("a"), Caller::from("s"), logo(value));
        }
        assert_ok!(ledger.remove(&key("a"), 2));

        let page = ledger.list_all(1, 5);
        assert_eq!(ids(&page), vec![("a".to_string(), 3)]);
        assert_eq!(page.total, 2);
    }
}
