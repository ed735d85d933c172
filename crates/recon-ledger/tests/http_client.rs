//! Integration tests for the HTTP ledger client using wiremock.
//!
//! These tests run the client against a mock ledger and cover the request
//! shape (path, filter, token header), found / not-found responses, and the
//! classification of every failure mode.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use recon_ledger::{
    HttpLedgerClient, LedgerClientConfig, LedgerErrorKind, LedgerSource, SearchOutcome,
};
use recon_types::{ColumnMap, LookupColumn, StoreId, StoreLedgerConfig};

// =============================================================================
// Test Helpers
// =============================================================================

const TABLE_PATH: &str = "/api/v1/db/data/v1/p_test/Factures";

fn store_config() -> StoreLedgerConfig {
    let columns =
        ColumnMap::new("NumFacture", Some("NumBL".into()), "MontantTTC", "Fournisseur").unwrap();
    StoreLedgerConfig::new(StoreId(7), "Factures", columns).unwrap()
}

fn client_for(server: &MockServer) -> HttpLedgerClient {
    let config = LedgerClientConfig::new(server.uri(), "p_test", "token-123").with_timeouts(1, 1);
    HttpLedgerClient::new(config).unwrap()
}

// =============================================================================
// Request shape
// =============================================================================

#[tokio::test]
async fn sends_equality_filter_with_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("where", "(NumFacture,eq,FAC2024-001)"))
        .and(header("xc-token", "token-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "list": [{"NumFacture": "FAC2024-001", "MontantTTC": 99.9, "Fournisseur": "ACME"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client_for(&server)
        .search(&store_config(), LookupColumn::InvoiceReference, "FAC2024-001")
        .await
        .unwrap();

    let SearchOutcome::Found(record) = outcome else {
        panic!("expected a match");
    };
    assert_eq!(record.amount("MontantTTC"), Some(99.9));
    assert_eq!(record.text("Fournisseur").as_deref(), Some("ACME"));
}

#[tokio::test]
async fn bl_lookup_uses_bl_column() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("where", "(NumBL,eq,BL123)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "list": [{"NumBL": "BL123"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client_for(&server)
        .search(&store_config(), LookupColumn::BlNumber, "BL123")
        .await
        .unwrap();
    assert!(outcome.is_found());
}

#[tokio::test]
async fn first_row_is_authoritative() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "list": [
                {"NumFacture": "FAC-1", "MontantTTC": 1.0},
                {"NumFacture": "FAC-1", "MontantTTC": 2.0}
            ]
        })))
        .mount(&server)
        .await;

    let outcome = client_for(&server)
        .search(&store_config(), LookupColumn::InvoiceReference, "FAC-1")
        .await
        .unwrap();
    let SearchOutcome::Found(record) = outcome else {
        panic!("expected a match");
    };
    assert_eq!(record.amount("MontantTTC"), Some(1.0));
}

#[tokio::test]
async fn empty_list_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"list": [], "pageInfo": {}})))
        .mount(&server)
        .await;

    let outcome = client_for(&server)
        .search(&store_config(), LookupColumn::InvoiceReference, "NOPE")
        .await
        .unwrap();
    assert_eq!(outcome, SearchOutcome::NotFound);
}

#[tokio::test]
async fn value_with_filter_syntax_is_never_sent() {
    let server = MockServer::start().await;

    // Would match every row if the value reached the filter verbatim.
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "list": [{"NumFacture": "UNRELATED-1", "MontantTTC": 5.0}]
        })))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = client_for(&server)
        .search(
            &store_config(),
            LookupColumn::InvoiceReference,
            "X)~or(NumFacture,isnot,null",
        )
        .await
        .unwrap();
    assert_eq!(outcome, SearchOutcome::NotFound);
}

// =============================================================================
// Failure classification
// =============================================================================

#[tokio::test]
async fn error_status_is_http_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid token"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .search(&store_config(), LookupColumn::InvoiceReference, "FAC-1")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), LedgerErrorKind::Http);
    assert!(err.to_string().contains("401"));
    assert!(err.to_string().contains("Invalid token"));
}

#[tokio::test]
async fn non_json_body_is_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .search(&store_config(), LookupColumn::InvoiceReference, "FAC-1")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), LedgerErrorKind::Parse);
}

#[tokio::test]
async fn missing_list_is_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rows": []})))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .search(&store_config(), LookupColumn::InvoiceReference, "FAC-1")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), LedgerErrorKind::Parse);
}

#[tokio::test]
async fn slow_ledger_is_network_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"list": []}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .search(&store_config(), LookupColumn::InvoiceReference, "FAC-1")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), LedgerErrorKind::Network);
}

#[tokio::test]
async fn unreachable_ledger_is_network_error() {
    let config = LedgerClientConfig::new("http://127.0.0.1:9", "p_test", "token").with_timeouts(1, 1);
    let client = HttpLedgerClient::new(config).unwrap();

    let err = client
        .search(&store_config(), LookupColumn::InvoiceReference, "FAC-1")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), LedgerErrorKind::Network);
}

#[tokio::test]
async fn unmapped_bl_column_makes_no_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"list": []})))
        .expect(0)
        .mount(&server)
        .await;

    let columns = ColumnMap::new("NumFacture", None, "MontantTTC", "Fournisseur").unwrap();
    let config = StoreLedgerConfig::new(StoreId(3), "Factures", columns).unwrap();
    let outcome = client_for(&server)
        .search(&config, LookupColumn::BlNumber, "BL1")
        .await
        .unwrap();
    assert_eq!(outcome, SearchOutcome::NotFound);
}
