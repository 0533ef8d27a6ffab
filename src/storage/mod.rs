mod json_file;
mod memory;

pub use json_file::JsonFileStorage;
pub use memory::MemoryStorage;

use anyhow::Result;

use crate::models::{Id, NewTransaction, Transaction, TransactionPatch};

/// Outcome of a conflict-ignoring bulk insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkInsertOutcome {
    /// Rows actually written.
    pub inserted: usize,
    /// Rows dropped because their external id already existed.
    pub skipped: usize,
}

/// Filters for listing transactions. `start`/`end` bound `created_at`.
#[derive(Debug, Clone, Default)]
pub struct TransactionQuery {
    pub offset: usize,
    pub limit: Option<usize>,
    pub start: Option<chrono::DateTime<chrono::Utc>>,
    pub end: Option<chrono::DateTime<chrono::Utc>>,
}

impl TransactionQuery {
    pub(crate) fn validate(&self) -> Result<()> {
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                anyhow::bail!("start must be <= end");
            }
        }
        Ok(())
    }
}

/// Storage trait for persisting transactions.
///
/// The sync pipeline only ever calls `insert_transactions_ignoring_conflicts`;
/// the remaining methods back the editing surface. `external_id` is uniquely
/// constrained: implementations are the final arbiter against duplicate
/// submissions, even from concurrent loaders.
#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    /// Insert a single transaction. Validates that the amount is positive.
    async fn insert_transaction(&self, new: NewTransaction) -> Result<Transaction>;

    /// Bulk insert, silently dropping records whose `external_id` already
    /// exists (in the store or earlier in the same batch). The batch is
    /// applied atomically: a failure leaves the store unchanged.
    async fn insert_transactions_ignoring_conflicts(
        &self,
        new: &[NewTransaction],
    ) -> Result<BulkInsertOutcome>;

    async fn list_transactions(&self, query: &TransactionQuery) -> Result<Vec<Transaction>>;

    async fn get_transaction(&self, id: &Id) -> Result<Option<Transaction>>;

    async fn get_transaction_by_external_id(
        &self,
        source: &str,
        external_id: &str,
    ) -> Result<Option<Transaction>>;

    /// Apply a patch to a transaction, bumping its updated timestamp.
    /// Returns `None` when the id is unknown.
    async fn update_transaction(
        &self,
        id: &Id,
        patch: &TransactionPatch,
    ) -> Result<Option<Transaction>>;

    /// Returns true if a transaction was deleted.
    async fn delete_transaction(&self, id: &Id) -> Result<bool>;
}

/// Order a listing result the way queries expect: oldest first, then apply
/// offset/limit. Shared by both storage implementations.
pub(crate) fn page_transactions(
    mut txns: Vec<Transaction>,
    query: &TransactionQuery,
) -> Vec<Transaction> {
    txns.sort_by_key(|t| t.created_at);
    txns.into_iter()
        .filter(|t| query.start.map_or(true, |s| t.created_at >= s))
        .filter(|t| query.end.map_or(true, |e| t.created_at <= e))
        .skip(query.offset)
        .take(query.limit.unwrap_or(usize::MAX))
        .collect()
}
