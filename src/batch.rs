//! Batch Orchestrator
//!
//! Runs a single-entry registry operation once per item, in order, under the
//! batch caller's identity. Failures are caught per item and reported; items
//! that already succeeded stay applied. There is no batch-wide transaction.

use crate::error::{invalid_argument, AppError};
use crate::registry::{Caller, EntryKey, FieldUpdate, Registry};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::{debug, info};

/// Default upper bound on items per batch
pub const DEFAULT_MAX_BATCH_SIZE: usize = 200;

/// Outcome of one batch item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemResult {
    pub index: usize,
    pub key: EntryKey,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposal_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub results: Vec<BatchItemResult>,
    pub summary: BatchSummary,
}

impl BatchReport {
    fn push(&mut self, key: EntryKey, outcome: Result<Option<u64>, AppError>) {
        let index = self.results.len();
        self.summary.total += 1;
        let result = match outcome {
            Ok(proposal_id) => {
                self.summary.succeeded += 1;
                BatchItemResult {
                    index,
                    key,
                    success: true,
                    proposal_id,
                    error_code: None,
                    error_reason: None,
                }
            }
            Err(err) => {
                self.summary.failed += 1;
                debug!("Batch item {} ({}) failed: {}", index, key, err);
                BatchItemResult {
                    index,
                    key,
                    success: false,
                    proposal_id: None,
                    error_code: Some(err.code().to_string()),
                    error_reason: Some(err.to_string()),
                }
            }
        };
        self.results.push(result);
    }
}

/// One submission in a `batch_add`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItem {
    #[serde(flatten)]
    pub key: EntryKey,
    /// Defaults to the batch caller
    #[serde(default)]
    pub submitter: Option<Caller>,
    #[serde(default)]
    pub metadata: Vec<FieldUpdate>,
}

/// One entry rejection in a `batch_reject`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectItem {
    #[serde(flatten)]
    pub key: EntryKey,
    #[serde(default)]
    pub reason: String,
}

/// One edit decision in `batch_accept_edits` / `batch_reject_edits`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditItem {
    #[serde(flatten)]
    pub key: EntryKey,
    pub id: u64,
    #[serde(default)]
    pub reason: String,
}

pub struct BatchOrchestrator<'a> {
    registry: &'a Registry,
    max_batch_size: usize,
}

impl<'a> BatchOrchestrator<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }

    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size.max(1);
        self
    }

    fn check_size(&self, len: usize) -> Result<(), AppError> {
        if len == 0 {
            return Err(invalid_argument("Batch must contain at least one item"));
        }
        if len > self.max_batch_size {
            return Err(invalid_argument(format!(
                "Batch of {} items exceeds the limit of {}",
                len, self.max_batch_size
            )));
        }
        Ok(())
    }

    /// Sequential per-item loop shared by every batch operation. A key that
    /// fails validation is reported as that item's failure.
    async fn run<T, F, Fut>(
        &self,
        operation: &str,
        items: Vec<T>,
        key_of: fn(&T) -> EntryKey,
        mut call: F,
    ) -> Result<BatchReport, AppError>
    where
        F: FnMut(T) -> Fut,
        Fut: Future<Output = Result<Option<u64>, AppError>>,
    {
        self.check_size(items.len())?;
        let mut report = BatchReport::default();
        for item in items {
            let key = key_of(&item);
            let outcome = match key.validate() {
                Ok(()) => call(item).await,
                Err(err) => Err(err),
            };
            report.push(key, outcome);
        }
        info!(
            "Batch {} finished: {} total, {} succeeded, {} failed",
            operation, report.summary.total, report.summary.succeeded, report.summary.failed
        );
        Ok(report)
    }

    pub async fn batch_add(
        &self,
        caller: &Caller,
        items: Vec<AddItem>,
    ) -> Result<BatchReport, AppError> {
        let registry = self.registry;
        self.run("add", items, |item| item.key.clone(), |item| async move {
            registry
                .add_entry(caller, item.key, item.submitter, item.metadata)
                .await
                .map(|_| None)
        })
        .await
    }

    pub async fn batch_approve(
        &self,
        caller: &Caller,
        keys: Vec<EntryKey>,
    ) -> Result<BatchReport, AppError> {
        let registry = self.registry;
        self.run("approve", keys, |key| key.clone(), |key| async move {
            registry.approve_entry(caller, &key).await.map(|_| None)
        })
        .await
    }

    pub async fn batch_reject(
        &self,
        caller: &Caller,
        items: Vec<RejectItem>,
    ) -> Result<BatchReport, AppError> {
        let registry = self.registry;
        self.run("reject", items, |item| item.key.clone(), |item| async move {
            registry
                .reject_entry(caller, &item.key, item.reason)
                .await
                .map(|_| None)
        })
        .await
    }

    pub async fn batch_accept_edits(
        &self,
        caller: &Caller,
        items: Vec<EditItem>,
    ) -> Result<BatchReport, AppError> {
        let registry = self.registry;
        self.run("accept-edits", items, |item| item.key.clone(), |item| async move {
            registry
                .accept_edit(caller, &item.key, item.id)
                .await
                .map(|p| Some(p.id))
        })
        .await
    }

    pub async fn batch_reject_edits(
        &self,
        caller: &Caller,
        items: Vec<EditItem>,
    ) -> Result<BatchReport, AppError> {
        let registry = self.registry;
        self.run("reject-edits", items, |item| item.key.clone(), |item| async move {
            registry
                .reject_edit(caller, &item.key, item.id, item.reason)
                .await
                .map(|p| Some(p.id))
        })
        .await
    }
}
