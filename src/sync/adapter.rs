//! Maps raw bunq payments into store-ready transactions.
//!
//! The mapping is pure and total: a payment always adapts, with missing or
//! malformed fields degrading to their documented fallbacks. Records are
//! never dropped here.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::models::{NewTransaction, TransactionDirection};

use super::bunq::BunqPayment;

/// Source tag baked into every adapted record and its external id.
pub const EXTERNAL_SOURCE: &str = "bunq";

const FALLBACK_CURRENCY: &str = "EUR";

/// Timestamp format the provider uses, e.g. "2015-06-13 23:19:16.215235".
const BUNQ_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Convert one raw payment into an insertable transaction.
///
/// The external id `bunq_{id}` is deterministic across runs and is the sole
/// idempotency key for the loader.
pub fn to_new_transaction(payment: &BunqPayment) -> NewTransaction {
    let signed_value = payment
        .amount
        .as_ref()
        .and_then(|amount| amount.value.parse::<f64>().ok())
        .unwrap_or(0.0);

    let currency = payment
        .amount
        .as_ref()
        .map(|amount| amount.currency.clone())
        .unwrap_or_else(|| FALLBACK_CURRENCY.to_string());

    // Structured label wins over the alias's direct fields.
    let (counterparty_name, counterparty_iban) = match payment.counterparty_alias.as_ref() {
        Some(alias) => match alias.label_monetary_account.as_ref() {
            Some(label) => (label.display_name.clone(), label.iban.clone()),
            None => (alias.display_name.clone(), alias.iban.clone()),
        },
        None => (None, None),
    };

    NewTransaction {
        amount: signed_value.abs(),
        direction: TransactionDirection::from_signed(signed_value),
        currency,
        description: payment.description.clone(),
        transaction_type: payment.payment_type.clone(),
        counterparty_name,
        counterparty_iban,
        external_source: Some(EXTERNAL_SOURCE.to_string()),
        external_id: Some(format!("{}_{}", EXTERNAL_SOURCE, payment.id)),
        external_created_at: payment.created.as_deref().and_then(parse_bunq_timestamp),
        external_updated_at: payment.updated.as_deref().and_then(parse_bunq_timestamp),
        category: None,
        tags: None,
        notes: None,
    }
}

pub fn to_new_transactions(payments: &[BunqPayment]) -> Vec<NewTransaction> {
    payments.iter().map(to_new_transaction).collect()
}

fn parse_bunq_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, BUNQ_TIMESTAMP_FORMAT)
        .ok()
        .map(|dt| dt.and_utc())
}
