//! Adapter Tests
//!
//! HTTP-level tests for the Kraken ticker and Sia daemon clients against
//! wiremock servers, plus a full pass through `AllowanceManager`.
//!
//! Run: cargo nextest run --test adapter_tests

use std::time::Duration;

use allowance_manager::currency::Currency;
use allowance_manager::{
    AllowanceManager, AllowanceUpdate, Config, Error, HostPublicKey, KrakenTicker, PriceOracle,
    SiaClient, StorageNetwork,
};
use rust_decimal_macros::dec;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{basic_auth, body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const COIN: &str = "000000000000000000000000";

fn coins(n: u64) -> String {
    format!("{}{}", n, COIN)
}

fn ticker_body(low_24h: &str) -> serde_json::Value {
    json!({
        "error": [],
        "result": {
            "SCEUR": {
                "a": ["0.0051", "100", "100.000"],
                "b": ["0.0049", "100", "100.000"],
                "c": ["0.0050", "10"],
                "v": ["100000", "200000"],
                "p": ["0.0050", "0.0050"],
                "t": [10, 20],
                "l": ["0.0049", low_24h],
                "h": ["0.0052", "0.0053"],
                "o": "0.0050"
            }
        }
    })
}

fn sia_client(server: &MockServer) -> SiaClient {
    SiaClient::new(server.uri(), SecretString::from("hunter2"), Duration::from_secs(5)).unwrap()
}

// =============================================================================
// Price ticker
// =============================================================================

mod ticker_tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_rate_uses_24h_low() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/0/public/Ticker"))
            .and(query_param("pair", "SCEUR"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ticker_body("0.0045")))
            .expect(1)
            .mount(&server)
            .await;

        let ticker = KrakenTicker::new(format!("{}/0/public/Ticker", server.uri()), "SCEUR").unwrap();
        let rate = ticker.fetch_rate().await.unwrap();
        assert!((rate.fiat_per_coin() - 0.0045).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_ticker_warning_still_yields_rate() {
        let server = MockServer::start().await;
        let mut body = ticker_body("0.0045");
        body["error"] = json!(["WGeneral:Data may be stale"]);
        body["result"]["SCEUR"]["t"] = json!([10.5, 20]);
        Mock::given(method("GET"))
            .and(path("/0/public/Ticker"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let ticker = KrakenTicker::new(format!("{}/0/public/Ticker", server.uri()), "SCEUR").unwrap();
        let rate = ticker.fetch_rate().await.unwrap();
        assert!((rate.fiat_per_coin() - 0.0045).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_error_status_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let ticker = KrakenTicker::new(format!("{}/0/public/Ticker", server.uri()), "SCEUR").unwrap();
        let err = ticker.fetch_rate().await.unwrap_err();
        assert_eq!(err.status_code(), Some(503));
        assert!(err.is_transport_error());
    }

    #[tokio::test]
    async fn test_malformed_json_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .mount(&server)
            .await;

        let ticker = KrakenTicker::new(format!("{}/0/public/Ticker", server.uri()), "SCEUR").unwrap();
        assert!(matches!(ticker.fetch_rate().await, Err(Error::Json(_))));
    }

    #[tokio::test]
    async fn test_zero_price_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ticker_body("0.0")))
            .mount(&server)
            .await;

        let ticker = KrakenTicker::new(format!("{}/0/public/Ticker", server.uri()), "SCEUR").unwrap();
        assert!(matches!(ticker.fetch_rate().await, Err(Error::InvalidPrice(_))));
    }
}

// =============================================================================
// Sia daemon client
// =============================================================================

mod sia_tests {
    use super::*;

    #[tokio::test]
    async fn test_hosts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/hostdb/all"))
            .and(header("user-agent", "Sia-Agent"))
            .and(basic_auth("", "hunter2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "hosts": [{
                    "publickeystring": "ed25519:aa",
                    "netaddress": "a.example:9982",
                    "acceptingcontracts": true,
                    "storageprice": "1000",
                    "uploadbandwidthprice": "2000",
                    "downloadbandwidthprice": "3000",
                    "collateral": "4000",
                    "contractprice": "5000"
                }]
            })))
            .mount(&server)
            .await;

        let hosts = sia_client(&server).hosts().await.unwrap();
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].public_key, HostPublicKey::new("ed25519:aa"));
        assert_eq!(hosts[0].download_price, Currency::from_hastings(3000));
    }

    #[tokio::test]
    async fn test_replace_whitelist_sends_full_list() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hostdb/filtermode"))
            .and(body_json(json!({"filtermode": "whitelist", "hosts": []})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        sia_client(&server).replace_whitelist(&[]).await.unwrap();
    }

    #[tokio::test]
    async fn test_api_error_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/renter"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"message": "API authentication failed."})),
            )
            .mount(&server)
            .await;

        match sia_client(&server).renter().await {
            Err(Error::Api { message, status }) => {
                assert_eq!(message, "API authentication failed.");
                assert_eq!(status, Some(401));
            }
            other => panic!("expected API error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_update_allowance_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/renter"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains(format!("funds={}", coins(1200))))
            .and(body_string_contains("hosts=50"))
            .and(body_string_contains("period=12960"))
            .and(body_string_contains("renewwindow=4320"))
            .and(body_string_contains("expectedredundancy=3"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let update = AllowanceUpdate {
            funds: Currency::from_coins(1200),
            expected_storage: 1_000_000,
            expected_upload: 10,
            expected_download: 20,
            expected_redundancy: dec!(3.00),
            hosts: 50,
            period: 12960,
            renew_window: 4320,
        };
        sia_client(&server).update_allowance(&update).await.unwrap();
    }
}

// =============================================================================
// Full pass
// =============================================================================

mod run_tests {
    use super::*;

    async fn node(server: &MockServer, unspent: u64) {
        Mock::given(method("GET"))
            .and(path("/hostdb/all"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "hosts": [
                    {
                        "publickeystring": "ed25519:cheap",
                        "storageprice": "1",
                        "uploadbandwidthprice": "1",
                        "downloadbandwidthprice": "1",
                        "collateral": "1",
                        "contractprice": "1"
                    },
                    {
                        "publickeystring": "ed25519:greedy",
                        "storageprice": coins(1),
                        "uploadbandwidthprice": "1",
                        "downloadbandwidthprice": "1",
                        "collateral": "1",
                        "contractprice": "1"
                    }
                ]
            })))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/renter"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "settings": {"allowance": {"funds": coins(1000), "period": 12960, "hosts": 50, "renewwindow": 4320}},
                "financialmetrics": {
                    "contractfees": "0",
                    "totalallocated": "0",
                    "uploadspending": "0",
                    "downloadspending": "0",
                    "storagespending": "0",
                    "unspent": coins(unspent)
                }
            })))
            .mount(server)
            .await;
    }

    async fn ticker(server: &MockServer) -> KrakenTicker {
        Mock::given(method("GET"))
            .and(path("/0/public/Ticker"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ticker_body("0.005")))
            .mount(server)
            .await;
        KrakenTicker::new(format!("{}/0/public/Ticker", server.uri()), "SCEUR").unwrap()
    }

    #[tokio::test]
    async fn test_decrease_pass() {
        let server = MockServer::start().await;
        node(&server, 600).await;
        Mock::given(method("POST"))
            .and(path("/hostdb/filtermode"))
            .and(body_json(json!({"filtermode": "whitelist", "hosts": ["ed25519:cheap"]})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/renter"))
            .and(body_string_contains(format!("funds={}", coins(800))))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let manager = AllowanceManager::new(Config::default(), ticker(&server).await, sia_client(&server));
        let report = manager.run().await.unwrap();
        assert_eq!(report.decision.label(), "decrease");
        assert_eq!(report.filter.rejected.len(), 1);
    }

    #[tokio::test]
    async fn test_hold_pass_skips_allowance_write() {
        let server = MockServer::start().await;
        node(&server, 300).await;
        Mock::given(method("POST"))
            .and(path("/hostdb/filtermode"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/renter"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let manager = AllowanceManager::new(Config::default(), ticker(&server).await, sia_client(&server));
        assert!(manager.run().await.unwrap().decision.is_hold());
    }

    #[tokio::test]
    async fn test_whitelist_failure_stops_run() {
        let server = MockServer::start().await;
        node(&server, 100).await;
        Mock::given(method("POST"))
            .and(path("/hostdb/filtermode"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "db locked"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/renter"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let manager = AllowanceManager::new(Config::default(), ticker(&server).await, sia_client(&server));
        let err = manager.run().await.unwrap_err();
        assert_eq!(err.status_code(), Some(500));
    }

    #[tokio::test]
    async fn test_run_once_rejects_invalid_config() {
        let config = Config {
            redundancy: dec!(0),
            ..Default::default()
        };
        let err = allowance_manager::run_once(config, true).await.unwrap_err();
        assert!(err.is_configuration_error());
    }
}
