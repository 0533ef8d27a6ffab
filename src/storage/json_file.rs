//! JSONL-file-backed storage.
//!
//! Transactions live in a single `transactions.jsonl` under the data
//! directory, one JSON object per line. Writes replace the whole file through
//! a temp-file rename, so a batch is either fully visible or not at all.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::fs;
use tokio::sync::Mutex;

use crate::clock::{Clock, SystemClock};
use crate::models::{Id, NewTransaction, Transaction, TransactionPatch};

use super::{page_transactions, BulkInsertOutcome, Storage, TransactionQuery};

pub struct JsonFileStorage {
    base_path: PathBuf,
    clock: Arc<dyn Clock>,
    // Serializes writers within this process. Cross-process safety comes from
    // the rename being atomic, not from this lock.
    write_lock: Mutex<()>,
}

impl JsonFileStorage {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            clock: Arc::new(SystemClock),
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn transactions_file(&self) -> PathBuf {
        self.base_path.join("transactions.jsonl")
    }

    async fn load_all(&self) -> Result<Vec<Transaction>> {
        let path = self.transactions_file();
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).context("Failed to read transactions file"),
        };

        let mut txns = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Transaction>(line) {
                Ok(tx) => txns.push(tx),
                Err(err) => {
                    tracing::warn!(error = %err, "Skipping invalid transaction entry");
                }
            }
        }

        Ok(txns)
    }

    /// Replace the transactions file with the given rows. Written to a temp
    /// file first and renamed into place.
    async fn persist_all(&self, txns: &[Transaction]) -> Result<()> {
        let path = self.transactions_file();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create data directory")?;
        }

        let mut content = String::new();
        for tx in txns {
            content.push_str(&serde_json::to_string(tx).context("Failed to serialize transaction")?);
            content.push('\n');
        }

        let tmp_path = path.with_extension("jsonl.tmp");
        fs::write(&tmp_path, content)
            .await
            .context("Failed to write transactions file")?;
        fs::rename(&tmp_path, &path)
            .await
            .context("Failed to replace transactions file")?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl Storage for JsonFileStorage {
    async fn insert_transaction(&self, new: NewTransaction) -> Result<Transaction> {
        new.validate()?;

        let _guard = self.write_lock.lock().await;
        let mut txns = self.load_all().await?;
        let tx = Transaction::from_new(new, self.clock.as_ref());
        txns.push(tx.clone());
        self.persist_all(&txns).await?;

        Ok(tx)
    }

    async fn insert_transactions_ignoring_conflicts(
        &self,
        new: &[NewTransaction],
    ) -> Result<BulkInsertOutcome> {
        if new.is_empty() {
            return Ok(BulkInsertOutcome::default());
        }

        let _guard = self.write_lock.lock().await;
        let mut txns = self.load_all().await?;
        let mut seen: HashSet<String> = txns
            .iter()
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
            txns.push(Transaction::from_new(record.clone(), self.clock.as_ref()));
            outcome.inserted += 1;
        }

        if outcome.inserted > 0 {
            self.persist_all(&txns).await?;
        }

        Ok(outcome)
    }

    async fn list_transactions(&self, query: &TransactionQuery) -> Result<Vec<Transaction>> {
        query.validate()?;
        Ok(page_transactions(self.load_all().await?, query))
    }

    async fn get_transaction(&self, id: &Id) -> Result<Option<Transaction>> {
        let txns = self.load_all().await?;
        Ok(txns.into_iter().find(|t| &t.item_id == id))
    }

    async fn get_transaction_by_external_id(
        &self,
        source: &str,
        external_id: &str,
    ) -> Result<Option<Transaction>> {
        let txns = self.load_all().await?;
        Ok(txns.into_iter().find(|t| {
            t.data.external_source.as_deref() == Some(source)
                && t.data.external_id.as_deref() == Some(external_id)
        }))
    }

    async fn update_transaction(
        &self,
        id: &Id,
        patch: &TransactionPatch,
    ) -> Result<Option<Transaction>> {
        let _guard = self.write_lock.lock().await;
        let mut txns = self.load_all().await?;

        let Some(tx) = txns.iter_mut().find(|t| &t.item_id == id) else {
            return Ok(None);
        };
        patch.apply(tx, self.clock.as_ref())?;
        let updated = tx.clone();

        self.persist_all(&txns).await?;
        Ok(Some(updated))
    }

    async fn delete_transaction(&self, id: &Id) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut txns = self.load_all().await?;

        let before = txns.len();
        txns.retain(|t| &t.item_id != id);
        if txns.len() == before {
            return Ok(false);
        }

        self.persist_all(&txns).await?;
        Ok(true)
    }
}
