//! In-memory storage implementation for testing.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Mutex;

use crate::clock::{Clock, SystemClock};
use crate::models::{Id, NewTransaction, Transaction, TransactionPatch};

use super::{page_transactions, BulkInsertOutcome, Storage, TransactionQuery};

/// In-memory storage for testing purposes.
pub struct MemoryStorage {
    transactions: Mutex<HashMap<Id, Transaction>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            transactions: Mutex::new(HashMap::new()),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Storage for MemoryStorage {
    async fn insert_transaction(&self, new: NewTransaction) -> Result<Transaction> {
        new.validate()?;
        let tx = Transaction::from_new(new, self.clock.as_ref());
        let mut txns = self.transactions.lock().await;
        txns.insert(tx.item_id.clone(), tx.clone());
        Ok(tx)
    }

    async fn insert_transactions_ignoring_conflicts(
        &self,
        new: &[NewTransaction],
    ) -> Result<BulkInsertOutcome> {
        if new.is_empty() {
            return Ok(BulkInsertOutcome::default());
        }

        // Single critical section: the whole batch lands or none of it does.
        let mut txns = self.transactions.lock().await;
        let mut seen: HashSet<String> = txns
            .values()
            .filter_map(|t| t.data.external_id.clone())
            .collect();

        let mut outcome = BulkInsertOutcome::default();
        for record in new {
            if let Some(external_id) = &record.external_id {
                if !seen.insert(external_id.clone()) {
                    outcome.skipped += 1;
                    continue;
                }
            }
            let tx = Transaction::from_new(record.clone(), self.clock.as_ref());
            txns.insert(tx.item_id.clone(), tx);
            outcome.inserted += 1;
        }

        Ok(outcome)
    }

    async fn list_transactions(&self, query: &TransactionQuery) -> Result<Vec<Transaction>> {
        query.validate()?;
        let txns = self.transactions.lock().await;
        Ok(page_transactions(txns.values().cloned().collect(), query))
    }

    async fn get_transaction(&self, id: &Id) -> Result<Option<Transaction>> {
        let txns = self.transactions.lock().await;
        Ok(txns.get(id).cloned())
    }

    async fn get_transaction_by_external_id(
        &self,
        source: &str,
        external_id: &str,
    ) -> Result<Option<Transaction>> {
        let txns = self.transactions.lock().await;
        Ok(txns
            .values()
            .find(|t| {
                t.data.external_source.as_deref() == Some(source)
                    && t.data.external_id.as_deref() == Some(external_id)
            })
            .cloned())
    }

    async fn update_transaction(
        &self,
        id: &Id,
        patch: &TransactionPatch,
    ) -> Result<Option<Transaction>> {
        let mut txns = self.transactions.lock().await;
        match txns.get_mut(id) {
            Some(tx) => {
                patch.apply(tx, self.clock.as_ref())?;
                Ok(Some(tx.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_transaction(&self, id: &Id) -> Result<bool> {
        let mut txns = self.transactions.lock().await;
        Ok(txns.remove(id).is_some())
    }
}
