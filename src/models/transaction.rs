use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;

use super::Id;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TransactionError {
    #[error("amount must be greater than 0")]
    NonPositiveAmount,
}

/// Whether money left the account (debit) or entered it (credit).
///
/// Amounts are stored as non-negative magnitudes; the direction keeps the
/// sign information that would otherwise be lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionDirection {
    Credit,
    Debit,
}

impl TransactionDirection {
    /// Direction implied by a signed raw amount. Zero counts as a credit.
    pub fn from_signed(value: f64) -> Self {
        if value < 0.0 {
            TransactionDirection::Debit
        } else {
            TransactionDirection::Credit
        }
    }
}

/// A transaction ready for insertion. The store assigns `item_id` and the
/// created/updated timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    /// Non-negative magnitude of the transaction.
    pub amount: f64,
    pub direction: TransactionDirection,
    /// ISO 4217 currency code.
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterparty_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterparty_iban: Option<String>,
    /// Source system tag (e.g. "bunq").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_source: Option<String>,
    /// Globally unique `{source}_{id}` key; the sole deduplication key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_updated_at: Option<DateTime<Utc>>,
    /// User-editable metadata; always empty at ingestion time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl NewTransaction {
    pub fn new(amount: f64, direction: TransactionDirection, currency: impl Into<String>) -> Self {
        Self {
            amount,
            direction,
            currency: currency.into(),
            description: None,
            transaction_type: None,
            counterparty_name: None,
            counterparty_iban: None,
            external_source: None,
            external_id: None,
            external_created_at: None,
            external_updated_at: None,
            category: None,
            tags: None,
            notes: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_external(
        mut self,
        source: impl Into<String>,
        external_id: impl Into<String>,
    ) -> Self {
        self.external_source = Some(source.into());
        self.external_id = Some(external_id.into());
        self
    }

    /// Validation for the manual-create path. Bulk sync loads skip this
    /// because the adapter may legitimately produce a 0.0 fallback amount.
    pub fn validate(&self) -> Result<(), TransactionError> {
        if self.amount <= 0.0 {
            return Err(TransactionError::NonPositiveAmount);
        }
        Ok(())
    }
}

/// A persisted transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub item_id: Id,
    /// When the store first wrote this row.
    pub created_at: DateTime<Utc>,
    /// Bumped on every update through the editing surface.
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub data: NewTransaction,
}

impl Transaction {
    /// Materialize a new row, assigning an id and timestamps from the clock.
    pub fn from_new(data: NewTransaction, clock: &dyn Clock) -> Self {
        let now = clock.now();
        Self {
            item_id: Id::new(),
            created_at: now,
            updated_at: now,
            data,
        }
    }
}

/// Partial update for a transaction; only `Some` fields are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterparty_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterparty_iban: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl TransactionPatch {
    /// Apply the patch to a transaction, bumping `updated_at`.
    pub fn apply(&self, tx: &mut Transaction, clock: &dyn Clock) -> Result<(), TransactionError> {
        if let Some(amount) = self.amount {
            if amount <= 0.0 {
                return Err(TransactionError::NonPositiveAmount);
            }
            tx.data.amount = amount;
        }
        if let Some(currency) = &self.currency {
            tx.data.currency = currency.clone();
        }
        if let Some(description) = &self.description {
            tx.data.description = Some(description.clone());
        }
        if let Some(transaction_type) = &self.transaction_type {
            tx.data.transaction_type = Some(transaction_type.clone());
        }
        if let Some(counterparty_name) = &self.counterparty_name {
            tx.data.counterparty_name = Some(counterparty_name.clone());
        }
        if let Some(counterparty_iban) = &self.counterparty_iban {
            tx.data.counterparty_iban = Some(counterparty_iban.clone());
        }
        if let Some(category) = &self.category {
            tx.data.category = Some(category.clone());
        }
        if let Some(tags) = &self.tags {
            tx.data.tags = Some(tags.clone());
        }
        if let Some(notes) = &self.notes {
            tx.data.notes = Some(notes.clone());
        }
        tx.updated_at = clock.now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::TimeZone;

    fn fixed_clock() -> FixedClock {
        FixedClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap())
    }

    #[test]
    fn direction_from_signed_value() {
        assert_eq!(
            TransactionDirection::from_signed(-25.0),
            TransactionDirection::Debit
        );
        assert_eq!(
            TransactionDirection::from_signed(25.0),
            TransactionDirection::Credit
        );
        assert_eq!(
            TransactionDirection::from_signed(0.0),
            TransactionDirection::Credit
        );
    }

    #[test]
    fn validate_rejects_non_positive_amounts() {
        let tx = NewTransaction::new(0.0, TransactionDirection::Credit, "EUR");
        assert_eq!(tx.validate(), Err(TransactionError::NonPositiveAmount));

        let tx = NewTransaction::new(12.5, TransactionDirection::Debit, "EUR");
        assert!(tx.validate().is_ok());
    }

    #[test]
    fn from_new_assigns_id_and_timestamps() {
        let clock = fixed_clock();
        let tx = Transaction::from_new(
            NewTransaction::new(10.0, TransactionDirection::Credit, "EUR"),
            &clock,
        );
        assert!(!tx.item_id.as_str().is_empty());
        assert_eq!(tx.created_at, clock.now());
        assert_eq!(tx.updated_at, clock.now());
    }

    #[test]
    fn patch_applies_only_set_fields_and_bumps_updated_at() {
        let created = FixedClock::new(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        let mut tx = Transaction::from_new(
            NewTransaction::new(10.0, TransactionDirection::Debit, "EUR")
                .with_description("Groceries"),
            &created,
        );

        let patch = TransactionPatch {
            category: Some("food".to_string()),
            ..Default::default()
        };
        let clock = fixed_clock();
        patch.apply(&mut tx, &clock).unwrap();

        assert_eq!(tx.data.category.as_deref(), Some("food"));
        assert_eq!(tx.data.description.as_deref(), Some("Groceries"));
        assert_eq!(tx.data.amount, 10.0);
        assert_eq!(tx.updated_at, clock.now());
        assert_ne!(tx.created_at, tx.updated_at);
    }

    #[test]
    fn patch_rejects_non_positive_amount() {
        let clock = fixed_clock();
        let mut tx = Transaction::from_new(
            NewTransaction::new(10.0, TransactionDirection::Debit, "EUR"),
            &clock,
        );
        let patch = TransactionPatch {
            amount: Some(-5.0),
            ..Default::default()
        };
        assert_eq!(
            patch.apply(&mut tx, &clock),
            Err(TransactionError::NonPositiveAmount)
        );
    }

    #[test]
    fn transaction_round_trips_through_json() {
        let clock = fixed_clock();
        let tx = Transaction::from_new(
            NewTransaction::new(42.0, TransactionDirection::Debit, "EUR")
                .with_description("Rent")
                .with_external("bunq", "bunq_42"),
            &clock,
        );

        let json = serde_json::to_string(&tx).unwrap();
        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(back.item_id, tx.item_id);
        assert_eq!(back.data.external_id.as_deref(), Some("bunq_42"));
        assert_eq!(back.data.direction, TransactionDirection::Debit);
    }
}
