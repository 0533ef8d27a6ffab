//! Orchestrates the sync pipeline: list accounts, page payments, adapt, load.

use std::sync::Arc;

use anyhow::Result;

use crate::models::NewTransaction;
use crate::storage::Storage;

use super::bunq::BunqClient;
use super::{adapter, SyncStats};

pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Coordinates one stateless sync pass over all eligible accounts.
///
/// Rerunning against unchanged upstream data converges: everything fetched
/// is skipped by the loader and nothing is inserted.
pub struct SyncOrchestrator {
    client: BunqClient,
    storage: Arc<dyn Storage>,
    page_size: usize,
}

impl SyncOrchestrator {
    pub fn new(client: BunqClient, storage: Arc<dyn Storage>) -> Self {
        Self {
            client,
            storage,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Sync all payments from all matching accounts into the store.
    ///
    /// A fetch failure for one account is logged and contributes nothing;
    /// other accounts still sync. A store failure during the bulk load is
    /// fatal to the run and propagates.
    pub async fn sync_all(&self, status_filter: Option<&str>) -> Result<SyncStats> {
        tracing::info!(status_filter, "Starting bunq payment sync");

        let accounts = self.client.list_monetary_accounts(status_filter).await;

        let mut batch: Vec<NewTransaction> = Vec::new();
        for account in &accounts {
            let payments = match self
                .client
                .fetch_payments_for_account(account.id, self.page_size)
                .await
            {
                Ok(payments) => payments,
                Err(err) => {
                    tracing::error!(
                        account_id = account.id,
                        error = %err,
                        "Failed to fetch payments; treating account as empty"
                    );
                    continue;
                }
            };
            batch.extend(adapter::to_new_transactions(&payments));
        }

        if batch.is_empty() {
            tracing::warn!("No payments fetched from bunq");
            return Ok(SyncStats::default());
        }

        let fetched = batch.len();
        tracing::info!(fetched, "Fetched payments from bunq");

        let outcome = self
            .storage
            .insert_transactions_ignoring_conflicts(&batch)
            .await?;

        let stats = SyncStats {
            fetched,
            inserted: outcome.inserted,
            skipped: outcome.skipped,
        };
        tracing::info!(
            fetched = stats.fetched,
            inserted = stats.inserted,
            skipped = stats.skipped,
            "Sync complete"
        );

        Ok(stats)
    }
}
