pub mod adapter;
mod bunq;
mod orchestrator;

pub use adapter::EXTERNAL_SOURCE;
pub use bunq::{
    BunqAmount, BunqClient, BunqCounterpartyAlias, BunqLabelMonetaryAccount, BunqMonetaryAccount,
    BunqPayment,
};
pub use orchestrator::{SyncOrchestrator, DEFAULT_PAGE_SIZE};

/// Statistics for one sync run. `fetched == inserted + skipped` whenever all
/// records carry well-formed external ids.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Raw payments retrieved from the provider.
    pub fetched: usize,
    /// New rows persisted.
    pub inserted: usize,
    /// Records dropped as duplicates of an existing external id.
    pub skipped: usize,
}
