mod id;
mod transaction;

pub use id::Id;
pub use transaction::{
    NewTransaction, Transaction, TransactionDirection, TransactionError, TransactionPatch,
};
