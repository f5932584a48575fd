// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the OAuth flows using wiremock.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use homeconnect_lib::{ClientConfig, ConfigurationError, Error, HomeConnectClient};
use parking_lot::Mutex;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn appliance_list() -> serde_json::Value {
    serde_json::json!({
        "data": {
            "homeappliances": [
                {"haId": "X1", "name": "Oven", "brand": "B", "vib": "V",
                 "connected": true, "type": "Oven", "enumber": "E1"}
            ]
        }
    })
}

async fn mount_appliances(server: &MockServer, token: &str) {
    Mock::given(method("GET"))
        .and(path("/api/homeappliances"))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(appliance_list()))
        .mount(server)
        .await;
}

// ============================================================================
// Refresh token grant
// ============================================================================

mod refresh_grant {
    use super::*;

    #[tokio::test]
    async fn refresh_sends_credentials() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/security/oauth/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=refresh-1"))
            .and(body_string_contains("client_secret=secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "access-1"
            })))
            .expect(1)
            .mount(&server)
            .await;
        mount_appliances(&server, "access-1").await;

        let client = HomeConnectClient::new(
            ClientConfig::new("client", "secret", "refresh-1").with_base_url(server.uri()),
        )
        .unwrap();

        let appliances = client.get_home_appliances().await.unwrap().unwrap();
        assert_eq!(appliances[0].id, "X1");
    }

    #[tokio::test]
    async fn rotated_refresh_token_reaches_callback_once() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/security/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "access-1",
                "refresh_token": "refresh-2"
            })))
            .mount(&server)
            .await;
        mount_appliances(&server, "access-1").await;

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(String::new()));
        let client = HomeConnectClient::builder(
            ClientConfig::new("client", "secret", "refresh-1").with_base_url(server.uri()),
        )
        .on_refresh_token_rotated({
            let calls = Arc::clone(&calls);
            let seen = Arc::clone(&seen);
            move |token| {
                calls.fetch_add(1, Ordering::SeqCst);
                *seen.lock() = token.to_string();
            }
        })
        .build()
        .unwrap();

        client.get_home_appliances().await.unwrap();
        client.get_home_appliances().await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*seen.lock(), "refresh-2");
    }

    #[tokio::test]
    async fn rotated_token_is_used_for_the_next_refresh() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/security/oauth/token"))
            .and(body_string_contains("refresh_token=refresh-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "access-1",
                "refresh_token": "refresh-2"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/security/oauth/token"))
            .and(body_string_contains("refresh_token=refresh-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "access-2",
                "refresh_token": "refresh-3"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/homeappliances"))
            .and(header("authorization", "Bearer access-1"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        mount_appliances(&server, "access-2").await;

        let client = HomeConnectClient::builder(
            ClientConfig::new("client", "secret", "refresh-1").with_base_url(server.uri()),
        )
        .on_refresh_token_rotated(|_| {})
        .build()
        .unwrap();

        let appliances = client.get_home_appliances().await.unwrap().unwrap();
        assert_eq!(appliances.len(), 1);
    }

    #[tokio::test]
    async fn without_callback_rotation_is_ignored() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/security/oauth/token"))
            .and(body_string_contains("refresh_token=refresh-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "access-1",
                "refresh_token": "refresh-2"
            })))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/homeappliances"))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(&server)
            .await;

        let client = HomeConnectClient::new(
            ClientConfig::new("client", "secret", "refresh-1").with_base_url(server.uri()),
        )
        .unwrap();

        let err = client.get_home_appliances().await.unwrap_err();
        assert_eq!(err.status(), Some(401));
    }

    #[tokio::test]
    async fn missing_refresh_token_is_fatal() {
        let server = MockServer::start().await;

        let client = HomeConnectClient::new(
            ClientConfig::new("client", "secret", "").with_base_url(server.uri()),
        )
        .unwrap();

        let err = client.get_home_appliances().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Configuration(ConfigurationError::MissingRefreshToken)
        ));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unparseable_token_response_is_a_communication_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/security/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
            .mount(&server)
            .await;

        let client = HomeConnectClient::new(
            ClientConfig::new("client", "secret", "refresh-1").with_base_url(server.uri()),
        )
        .unwrap();

        let err = client.get_home_appliances().await.unwrap_err();
        let Error::Communication(err) = err else {
            panic!("expected a communication error, got {err:?}");
        };
        assert_eq!(err.status, Some(200));
        assert_eq!(err.body, "<html>login</html>");
    }

    #[tokio::test]
    async fn rejected_refresh_propagates() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/security/oauth/token"))
            .respond_with(
                ResponseTemplate::new(400).set_body_string("{\"error\":\"invalid_grant\"}"),
            )
            .expect(2)
            .mount(&server)
            .await;

        let client = HomeConnectClient::new(
            ClientConfig::new("client", "secret", "refresh-1").with_base_url(server.uri()),
        )
        .unwrap();

        let err = client.get_home_appliances().await.unwrap_err();
        assert_eq!(err.status(), Some(400));

        // Nothing was cached, so the next call tries again.
        let err = client.get_home_appliances().await.unwrap_err();
        assert_eq!(err.status(), Some(400));
    }
}

// ============================================================================
// Authorization code grant (simulator)
// ============================================================================

mod authorization_code_grant {
    use super::*;

    const REDIRECT_URI: &str = "https://apiclient.home-connect.com/o2c.html";

    fn simulator_client(server: &MockServer) -> HomeConnectClient {
        HomeConnectClient::new(
            ClientConfig::new("sim-client", "", "")
                .with_simulator(true)
                .with_base_url(server.uri()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn code_is_exchanged_for_a_token() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/security/oauth/authorize"))
            .and(query_param("client_id", "sim-client"))
            .and(query_param("response_type", "code"))
            .and(query_param("redirect_uri", REDIRECT_URI))
            .and(query_param("scope", "IdentifyAppliance Monitor Settings"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("location", format!("{REDIRECT_URI}?code=code-123").as_str()),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/security/oauth/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=code-123"))
            .and(body_string_contains("client_id=sim-client"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "sim-access"
            })))
            .expect(1)
            .mount(&server)
            .await;
        mount_appliances(&server, "sim-access").await;

        let client = simulator_client(&server);
        let appliances = client.get_home_appliances().await.unwrap().unwrap();
        assert_eq!(appliances[0].name, "Oven");

        // Token is cached for the next call.
        client.get_home_appliances().await.unwrap();
    }

    #[tokio::test]
    async fn authorize_without_redirect_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/security/oauth/authorize"))
            .respond_with(ResponseTemplate::new(200).set_body_string("login page"))
            .mount(&server)
            .await;

        let err = simulator_client(&server)
            .get_home_appliances()
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(200));
    }

    #[tokio::test]
    async fn redirect_without_code_is_a_parse_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/security/oauth/authorize"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("location", format!("{REDIRECT_URI}?error=access_denied").as_str()),
            )
            .mount(&server)
            .await;

        let err = simulator_client(&server)
            .get_home_appliances()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }
}
