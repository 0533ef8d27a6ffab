//! bunq API client.
//!
//! Lists monetary accounts (bank + savings) and pages payments backward
//! through history via the `older_url` pagination cursor. The client holds an
//! already-provisioned session token; the installation/device handshake is
//! handled outside this crate.

use anyhow::{Context, Result};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::config::BunqConfig;

const BUNQ_API_BASE: &str = "https://api.bunq.com";

/// Upper bound on pages walked per account. A healthy account history should
/// never get near this; past it we assume a pagination loop and abort.
const MAX_PAYMENT_PAGES: usize = 1_000;

/// bunq API client, constructed once per sync invocation.
pub struct BunqClient {
    user_id: i64,
    session_token: SecretString,
    base_url: String,
    max_pages: usize,
    client: Client,
}

impl BunqClient {
    pub fn new(user_id: i64, session_token: SecretString) -> Self {
        Self {
            user_id,
            session_token,
            base_url: BUNQ_API_BASE.to_string(),
            max_pages: MAX_PAYMENT_PAGES,
            client: Client::new(),
        }
    }

    /// Override API base URL (useful for tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the per-account page bound (useful for tests).
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Build a client from config, resolving the session token from the
    /// inline value or the configured token file.
    pub fn from_config(config: &BunqConfig) -> Result<Self> {
        let user_id = config
            .user_id
            .context("bunq.user_id is not configured")?;
        let token = config.resolve_token()?;

        let mut client = Self::new(user_id, token);
        if let Some(api_base) = &config.api_base {
            client = client.with_base_url(api_base.clone());
        }
        Ok(client)
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .header(
                "X-Bunq-Client-Authentication",
                self.session_token.expose_secret(),
            )
            .send()
            .await
            .context("HTTP request failed")?;

        let status = response.status();
        let body = response.text().await.context("Failed to read response body")?;

        if !status.is_success() {
            anyhow::bail!("bunq API request failed ({}): {}", status, body);
        }

        serde_json::from_str(&body).context("Failed to parse JSON response")
    }

    /// List all monetary accounts (bank + savings), optionally filtered by
    /// exact status match.
    ///
    /// A failed listing for one account kind is logged and contributes
    /// nothing; the other kind's results are still returned. Idempotent
    /// loading makes a partial listing safe: missed accounts are picked up by
    /// a later run.
    pub async fn list_monetary_accounts(
        &self,
        status_filter: Option<&str>,
    ) -> Vec<BunqMonetaryAccount> {
        let mut accounts = Vec::new();

        for endpoint in ["monetary-account-bank", "monetary-account-savings"] {
            let path = format!("/v1/user/{}/{}", self.user_id, endpoint);
            match self.get::<Envelope<MonetaryAccountItem>>(&path).await {
                Ok(page) => accounts.extend(page.response.into_iter().map(|item| item.account)),
                Err(err) => {
                    tracing::warn!(endpoint, error = %err, "Failed to list monetary accounts");
                }
            }
        }

        if let Some(status) = status_filter {
            accounts.retain(|account| account.status.as_deref() == Some(status));
        }

        tracing::info!(count = accounts.len(), "Found monetary accounts");
        accounts
    }

    /// Fetch all payments for one account by walking backward from the most
    /// recent page until the provider reports no older page.
    ///
    /// Pages are strictly sequential: each request's cursor comes from the
    /// prior response. No retries happen here; a transient failure surfaces
    /// as an error for this account only.
    pub async fn fetch_payments_for_account(
        &self,
        account_id: i64,
        page_size: usize,
    ) -> Result<Vec<BunqPayment>> {
        let mut payments = Vec::new();
        let mut next_path = Some(format!(
            "/v1/user/{}/monetary-account/{}/payment?count={}",
            self.user_id, account_id, page_size
        ));

        let mut pages_fetched = 0usize;
        while let Some(path) = next_path.take() {
            if pages_fetched >= self.max_pages {
                anyhow::bail!(
                    "bunq payment listing for account {} returned too many pages (>{}); aborting",
                    account_id,
                    self.max_pages
                );
            }

            let page: Envelope<PaymentItem> = self.get(&path).await?;
            pages_fetched += 1;
            payments.extend(page.response.into_iter().map(|item| item.payment));
            next_path = page
                .pagination
                .and_then(|pagination| pagination.older_url);
        }

        tracing::info!(account_id, count = payments.len(), "Fetched payments for account");
        Ok(payments)
    }
}

/// Standard bunq response envelope: a list of wrapped items plus pagination
/// cursors.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Envelope<T> {
    #[serde(rename = "Response", default)]
    response: Vec<T>,
    #[serde(rename = "Pagination", default)]
    pagination: Option<BunqPagination>,
}

/// Pagination cursors as returned by the API. `older_url` present means an
/// earlier page remains.
#[derive(Debug, Deserialize, Default)]
struct BunqPagination {
    #[serde(default)]
    older_url: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    newer_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MonetaryAccountItem {
    #[serde(rename = "MonetaryAccountBank", alias = "MonetaryAccountSavings")]
    account: BunqMonetaryAccount,
}

#[derive(Debug, Deserialize)]
struct PaymentItem {
    #[serde(rename = "Payment")]
    payment: BunqPayment,
}

/// A monetary account descriptor. Transient: consumed by the orchestrator
/// within one sync run, never persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct BunqMonetaryAccount {
    pub id: i64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// A raw payment as the provider returns it. Everything except the id is
/// optional; the adapter degrades missing fields to fallbacks.
#[derive(Debug, Clone, Deserialize)]
pub struct BunqPayment {
    pub id: i64,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
    #[serde(default)]
    pub amount: Option<BunqAmount>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub payment_type: Option<String>,
    #[serde(default)]
    pub counterparty_alias: Option<BunqCounterpartyAlias>,
}

/// Signed amount with currency; the value arrives as a decimal string.
#[derive(Debug, Clone, Deserialize)]
pub struct BunqAmount {
    pub value: String,
    pub currency: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BunqCounterpartyAlias {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub iban: Option<String>,
    #[serde(default)]
    pub label_monetary_account: Option<BunqLabelMonetaryAccount>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BunqLabelMonetaryAccount {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub iban: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_envelope_parses_wire_format() {
        let body = r#"{
            "Response": [
                {
                    "Payment": {
                        "id": 42,
                        "created": "2026-02-01 10:15:00.000000",
                        "amount": { "value": "-12.50", "currency": "EUR" },
                        "description": "Coffee",
                        "type": "MASTERCARD",
                        "counterparty_alias": {
                            "display_name": "Cafe",
                            "iban": "NL01BANK0123456789"
                        }
                    }
                }
            ],
            "Pagination": {
                "older_url": "/v1/user/1/monetary-account/2/payment?count=50&older_id=41",
                "newer_url": null
            }
        }"#;

        let envelope: Envelope<PaymentItem> = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.response.len(), 1);
        let payment = &envelope.response[0].payment;
        assert_eq!(payment.id, 42);
        assert_eq!(payment.amount.as_ref().unwrap().value, "-12.50");
        assert!(envelope.pagination.unwrap().older_url.is_some());
    }

    #[test]
    fn payment_with_only_id_parses() {
        let body = r#"{"Response": [{"Payment": {"id": 7}}]}"#;
        let envelope: Envelope<PaymentItem> = serde_json::from_str(body).unwrap();
        let payment = &envelope.response[0].payment;
        assert!(payment.amount.is_none());
        assert!(payment.counterparty_alias.is_none());
    }

    #[test]
    fn account_item_parses_both_kinds() {
        let bank = r#"{"MonetaryAccountBank": {"id": 1, "status": "ACTIVE"}}"#;
        let savings = r#"{"MonetaryAccountSavings": {"id": 2, "status": "CANCELLED"}}"#;

        let bank: MonetaryAccountItem = serde_json::from_str(bank).unwrap();
        let savings: MonetaryAccountItem = serde_json::from_str(savings).unwrap();
        assert_eq!(bank.account.id, 1);
        assert_eq!(savings.account.status.as_deref(), Some("CANCELLED"));
    }
}
