use anyhow::Result;
use budgetbuddy::sync::BunqClient;
use secrecy::SecretString;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(server: &MockServer) -> BunqClient {
    BunqClient::new(7, SecretString::new("test-token".to_string().into()))
        .with_base_url(server.uri())
}

fn json_response(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "application/json")
}

#[tokio::test]
async fn pagination_walks_older_pages_until_none_remain() -> Result<()> {
    let server = MockServer::start().await;

    let page_1 = r#"{
        "Response": [
            {"Payment": {"id": 6, "amount": {"value": "-1.00", "currency": "EUR"}}},
            {"Payment": {"id": 5, "amount": {"value": "-2.00", "currency": "EUR"}}}
        ],
        "Pagination": {
            "older_url": "/v1/user/7/monetary-account/1/payment?count=2&older_id=5",
            "newer_url": null
        }
    }"#;
    Mock::given(method("GET"))
        .and(path("/v1/user/7/monetary-account/1/payment"))
        .and(query_param_is_missing("older_id"))
        .respond_with(json_response(page_1))
        .mount(&server)
        .await;

    let page_2 = r#"{
        "Response": [
            {"Payment": {"id": 4, "amount": {"value": "-3.00", "currency": "EUR"}}},
            {"Payment": {"id": 3, "amount": {"value": "-4.00", "currency": "EUR"}}}
        ],
        "Pagination": {
            "older_url": "/v1/user/7/monetary-account/1/payment?count=2&older_id=3",
            "newer_url": null
        }
    }"#;
    Mock::given(method("GET"))
        .and(path("/v1/user/7/monetary-account/1/payment"))
        .and(query_param("older_id", "5"))
        .respond_with(json_response(page_2))
        .mount(&server)
        .await;

    let page_3 = r#"{
        "Response": [
            {"Payment": {"id": 2, "amount": {"value": "-5.00", "currency": "EUR"}}},
            {"Payment": {"id": 1, "amount": {"value": "-6.00", "currency": "EUR"}}}
        ],
        "Pagination": {
            "older_url": null,
            "newer_url": "/v1/user/7/monetary-account/1/payment?count=2&newer_id=2"
        }
    }"#;
    Mock::given(method("GET"))
        .and(path("/v1/user/7/monetary-account/1/payment"))
        .and(query_param("older_id", "3"))
        .respond_with(json_response(page_3))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let payments = client.fetch_payments_for_account(1, 2).await?;

    let ids: Vec<i64> = payments.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![6, 5, 4, 3, 2, 1]);

    Ok(())
}

#[tokio::test]
async fn pagination_terminates_without_pagination_block() -> Result<()> {
    let server = MockServer::start().await;

    let body = r#"{"Response": [{"Payment": {"id": 1}}]}"#;
    Mock::given(method("GET"))
        .and(path("/v1/user/7/monetary-account/3/payment"))
        .respond_with(json_response(body))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let payments = client.fetch_payments_for_account(3, 50).await?;
    assert_eq!(payments.len(), 1);

    Ok(())
}

#[tokio::test]
async fn page_bound_allows_history_ending_exactly_at_the_bound() -> Result<()> {
    let server = MockServer::start().await;

    let page_1 = r#"{
        "Response": [{"Payment": {"id": 2}}],
        "Pagination": {
            "older_url": "/v1/user/7/monetary-account/4/payment?count=1&older_id=2",
            "newer_url": null
        }
    }"#;
    Mock::given(method("GET"))
        .and(path("/v1/user/7/monetary-account/4/payment"))
        .and(query_param_is_missing("older_id"))
        .respond_with(json_response(page_1))
        .mount(&server)
        .await;

    let page_2 = r#"{
        "Response": [{"Payment": {"id": 1}}],
        "Pagination": {"older_url": null, "newer_url": null}
    }"#;
    Mock::given(method("GET"))
        .and(path("/v1/user/7/monetary-account/4/payment"))
        .and(query_param("older_id", "2"))
        .respond_with(json_response(page_2))
        .mount(&server)
        .await;

    let client = test_client(&server).with_max_pages(2);
    let payments = client.fetch_payments_for_account(4, 1).await?;
    assert_eq!(payments.len(), 2);

    Ok(())
}

#[tokio::test]
async fn page_bound_aborts_a_pagination_loop() {
    let server = MockServer::start().await;

    // older_url points back at the first page, so pagination never ends.
    let body = r#"{
        "Response": [{"Payment": {"id": 1}}],
        "Pagination": {
            "older_url": "/v1/user/7/monetary-account/5/payment?count=1",
            "newer_url": null
        }
    }"#;
    Mock::given(method("GET"))
        .and(path("/v1/user/7/monetary-account/5/payment"))
        .respond_with(json_response(body))
        .expect(2)
        .mount(&server)
        .await;

    let client = test_client(&server).with_max_pages(2);
    let err = client.fetch_payments_for_account(5, 1).await.unwrap_err();
    assert!(err.to_string().contains("too many pages"));
}

#[tokio::test]
async fn failed_payment_fetch_propagates_as_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/user/7/monetary-account/9/payment"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let err = client.fetch_payments_for_account(9, 50).await.unwrap_err();
    assert!(err.to_string().contains("bunq API request failed"));
}

#[tokio::test]
async fn account_listing_concatenates_bank_and_savings() -> Result<()> {
    let server = MockServer::start().await;

    let bank = r#"{"Response": [
        {"MonetaryAccountBank": {"id": 1, "status": "ACTIVE", "currency": "EUR"}}
    ]}"#;
    Mock::given(method("GET"))
        .and(path("/v1/user/7/monetary-account-bank"))
        .respond_with(json_response(bank))
        .mount(&server)
        .await;

    let savings = r#"{"Response": [
        {"MonetaryAccountSavings": {"id": 2, "status": "ACTIVE", "currency": "EUR"}},
        {"MonetaryAccountSavings": {"id": 3, "status": "CANCELLED", "currency": "EUR"}}
    ]}"#;
    Mock::given(method("GET"))
        .and(path("/v1/user/7/monetary-account-savings"))
        .respond_with(json_response(savings))
        .mount(&server)
        .await;

    let client = test_client(&server);

    let all = client.list_monetary_accounts(None).await;
    assert_eq!(all.len(), 3);

    let active = client.list_monetary_accounts(Some("ACTIVE")).await;
    let ids: Vec<i64> = active.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![1, 2]);

    Ok(())
}

#[tokio::test]
async fn status_filter_is_case_sensitive() -> Result<()> {
    let server = MockServer::start().await;

    let bank = r#"{"Response": [
        {"MonetaryAccountBank": {"id": 1, "status": "ACTIVE"}}
    ]}"#;
    Mock::given(method("GET"))
        .and(path("/v1/user/7/monetary-account-bank"))
        .respond_with(json_response(bank))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/user/7/monetary-account-savings"))
        .respond_with(json_response(r#"{"Response": []}"#))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let accounts = client.list_monetary_accounts(Some("active")).await;
    assert!(accounts.is_empty());

    Ok(())
}

#[tokio::test]
async fn failed_savings_listing_keeps_bank_results() -> Result<()> {
    let server = MockServer::start().await;

    let bank = r#"{"Response": [
        {"MonetaryAccountBank": {"id": 1, "status": "ACTIVE"}}
    ]}"#;
    Mock::given(method("GET"))
        .and(path("/v1/user/7/monetary-account-bank"))
        .respond_with(json_response(bank))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/user/7/monetary-account-savings"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let accounts = client.list_monetary_accounts(Some("ACTIVE")).await;
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].id, 1);

    Ok(())
}
