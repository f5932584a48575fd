// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for event stream subscriptions using wiremock.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use homeconnect_lib::{ClientConfig, Error, Event, EventListener, HomeConnectClient};
use parking_lot::Mutex;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Recorder {
    ha_id: String,
    events: Mutex<Vec<Event>>,
    reconnects: AtomicU32,
}

impl Recorder {
    fn new(ha_id: &str) -> Arc<Self> {
        Arc::new(Self {
            ha_id: ha_id.to_string(),
            events: Mutex::new(Vec::new()),
            reconnects: AtomicU32::new(0),
        })
    }

    fn keys(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| event.key.clone())
            .collect()
    }
}

impl EventListener for Recorder {
    fn appliance_id(&self) -> &str {
        &self.ha_id
    }

    fn on_event(&self, event: &Event) {
        self.events.lock().push(event.clone());
    }

    fn on_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::SeqCst);
    }
}

async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..300 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}

async fn mount_token_endpoint(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/security/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "access-1"
        })))
        .mount(server)
        .await;
}

fn stream(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body)
}

fn status_message(key: &str, value: &str) -> String {
    format!(
        "event: STATUS\nid: X\ndata: {{\"items\":[{{\"key\":\"{key}\",\"value\":\"{value}\",\"timestamp\":1}}],\"haId\":\"X\"}}\n\n"
    )
}

fn client_for(server: &MockServer, retry_delay: Duration) -> HomeConnectClient {
    HomeConnectClient::new(
        ClientConfig::new("client", "secret", "refresh-1")
            .with_base_url(server.uri())
            .with_sse_retry_delay(retry_delay),
    )
    .unwrap()
}

const LONG: Duration = Duration::from_secs(60);

// ============================================================================
// Connection lifecycle
// ============================================================================

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn one_stream_per_appliance() {
        let server = MockServer::start().await;
        mount_token_endpoint(&server).await;

        Mock::given(method("GET"))
            .and(path("/api/homeappliances/X/events"))
            .and(header("authorization", "Bearer access-1"))
            .and(header("accept", "text/event-stream"))
            .respond_with(stream(": connected\n\n"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, LONG);
        let a = client.register_event_listener(Recorder::new("X")).await.unwrap();
        let b = client.register_event_listener(Recorder::new("X")).await.unwrap();
        let c = client.register_event_listener(Recorder::new("X")).await.unwrap();

        assert_eq!(client.connection_count().await, 1);
        assert_eq!(client.listener_count(), 3);

        assert!(client.unregister_event_listener(a).await);
        assert!(client.unregister_event_listener(b).await);
        assert!(client.has_connection("X").await);

        assert!(client.unregister_event_listener(c).await);
        assert!(!client.has_connection("X").await);
        assert_eq!(client.connection_count().await, 0);
        assert!(!client.unregister_event_listener(c).await);
    }

    #[tokio::test]
    async fn same_listener_registers_once() {
        let server = MockServer::start().await;
        mount_token_endpoint(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/homeappliances/X/events"))
            .respond_with(stream(""))
            .mount(&server)
            .await;

        let client = client_for(&server, LONG);
        let listener = Recorder::new("X");
        let first = client.register_event_listener(listener.clone()).await.unwrap();
        let second = client.register_event_listener(listener).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(client.listener_count(), 1);
    }

    #[tokio::test]
    async fn failed_registration_does_not_keep_the_listener() {
        let server = MockServer::start().await;
        let client = HomeConnectClient::new(
            ClientConfig::new("client", "secret", "").with_base_url(server.uri()),
        )
        .unwrap();

        let err = client
            .register_event_listener(Recorder::new("X"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Configuration(_)));
        assert_eq!(client.listener_count(), 0);
        assert_eq!(client.connection_count().await, 0);
    }

    #[tokio::test]
    async fn dispose_closes_everything() {
        let server = MockServer::start().await;
        mount_token_endpoint(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/homeappliances/X/events"))
            .respond_with(stream(""))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/homeappliances/Y/events"))
            .respond_with(stream(""))
            .mount(&server)
            .await;

        let client = client_for(&server, LONG);
        client.register_event_listener(Recorder::new("X")).await.unwrap();
        client.register_event_listener(Recorder::new("Y")).await.unwrap();
        assert_eq!(client.connection_count().await, 2);

        client.dispose().await;

        assert!(client.is_disposed().await);
        assert_eq!(client.connection_count().await, 0);
        assert_eq!(client.listener_count(), 0);
        assert!(matches!(
            client.register_event_listener(Recorder::new("X")).await,
            Err(Error::Disposed)
        ));
    }
}

// ============================================================================
// Event delivery
// ============================================================================

mod delivery {
    use super::*;

    #[tokio::test]
    async fn events_reach_only_matching_listeners() {
        let server = MockServer::start().await;
        mount_token_endpoint(&server).await;

        Mock::given(method("GET"))
            .and(path("/api/homeappliances/X/events"))
            .respond_with(stream(&status_message(
                "BSH.Common.Status.DoorState",
                "BSH.Common.EnumType.DoorState.Open",
            )))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/homeappliances/Y/events"))
            .respond_with(stream(&status_message(
                "BSH.Common.Status.OperationState",
                "BSH.Common.EnumType.OperationState.Run",
            )))
            .mount(&server)
            .await;

        let client = client_for(&server, LONG);
        let x1 = Recorder::new("X");
        let x2 = Recorder::new("X");
        let y = Recorder::new("Y");
        client.register_event_listener(x1.clone()).await.unwrap();
        client.register_event_listener(x2.clone()).await.unwrap();
        client.register_event_listener(y.clone()).await.unwrap();

        eventually(|| !x1.keys().is_empty() && !x2.keys().is_empty() && !y.keys().is_empty())
            .await;

        assert_eq!(x1.keys(), ["BSH.Common.Status.DoorState"]);
        assert_eq!(x2.keys(), ["BSH.Common.Status.DoorState"]);
        assert_eq!(y.keys(), ["BSH.Common.Status.OperationState"]);
        assert_eq!(
            x1.events.lock()[0].value.as_deref(),
            Some("BSH.Common.EnumType.DoorState.Open")
        );
    }

    #[tokio::test]
    async fn connection_state_and_keep_alive() {
        let server = MockServer::start().await;
        mount_token_endpoint(&server).await;

        let body = format!(
            "event: KEEP-ALIVE\ndata:\n\nevent: DISCONNECTED\ndata:\n\nevent: CONNECTED\ndata:\n\n{}",
            status_message("BSH.Common.Status.DoorState", "BSH.Common.EnumType.DoorState.Closed")
        );
        Mock::given(method("GET"))
            .and(path("/api/homeappliances/X/events"))
            .respond_with(stream(&body))
            .mount(&server)
            .await;

        let client = client_for(&server, LONG);
        let listener = Recorder::new("X");
        client.register_event_listener(listener.clone()).await.unwrap();

        eventually(|| listener.events.lock().len() >= 3).await;

        let events = listener.events.lock().clone();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], Event::connection("DISCONNECTED"));
        assert_eq!(events[1], Event::connection("CONNECTED"));
        assert!(events[0].is_connection_event());
        assert_eq!(events[2].key.as_deref(), Some("BSH.Common.Status.DoorState"));
    }

    #[tokio::test]
    async fn unregistered_listener_stops_receiving() {
        let server = MockServer::start().await;
        mount_token_endpoint(&server).await;

        Mock::given(method("GET"))
            .and(path("/api/homeappliances/X/events"))
            .respond_with(stream(&status_message("BSH.Common.Status.DoorState", "Open")))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_millis(50));
        let kept = Recorder::new("X");
        let removed = Recorder::new("X");
        client.register_event_listener(kept.clone()).await.unwrap();
        let id = client.register_event_listener(removed.clone()).await.unwrap();

        eventually(|| !removed.keys().is_empty()).await;
        client.unregister_event_listener(id).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        let delivered = removed.keys().len();

        // Every reconnect replays the same body.
        let before = kept.keys().len();
        eventually(|| kept.keys().len() > before).await;
        assert_eq!(removed.keys().len(), delivered);
    }
}

// ============================================================================
// Failures
// ============================================================================

mod failures {
    use super::*;

    #[tokio::test]
    async fn transient_failure_reconnects_and_notifies() {
        let server = MockServer::start().await;
        mount_token_endpoint(&server).await;

        Mock::given(method("GET"))
            .and(path("/api/homeappliances/X/events"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/homeappliances/X/events"))
            .respond_with(stream(&status_message("BSH.Common.Status.DoorState", "Open")))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_millis(20));
        let listener = Recorder::new("X");
        client.register_event_listener(listener.clone()).await.unwrap();

        eventually(|| !listener.keys().is_empty()).await;

        assert!(listener.reconnects.load(Ordering::SeqCst) >= 2);
        assert!(client.has_connection("X").await);
    }

    #[tokio::test]
    async fn silent_stream_reconnects_after_idle_timeout() {
        let server = MockServer::start().await;
        mount_token_endpoint(&server).await;

        Mock::given(method("GET"))
            .and(path("/api/homeappliances/X/events"))
            .respond_with(stream(": connected\n\n").set_delay(Duration::from_secs(5)))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/homeappliances/X/events"))
            .respond_with(stream(&status_message("BSH.Common.Status.DoorState", "Open")))
            .mount(&server)
            .await;

        let client = HomeConnectClient::new(
            ClientConfig::new("client", "secret", "refresh-1")
                .with_base_url(server.uri())
                .with_sse_idle_timeout(Duration::from_millis(150))
                .with_sse_retry_delay(Duration::from_millis(20)),
        )
        .unwrap();
        let listener = Recorder::new("X");
        client.register_event_listener(listener.clone()).await.unwrap();

        eventually(|| !listener.keys().is_empty()).await;

        assert!(listener.reconnects.load(Ordering::SeqCst) >= 2);
        assert!(client.has_connection("X").await);
        assert_eq!(client.listener_count(), 1);
    }

    #[tokio::test]
    async fn forbidden_stops_the_stream_until_registered_again() {
        let server = MockServer::start().await;
        mount_token_endpoint(&server).await;

        Mock::given(method("GET"))
            .and(path("/api/homeappliances/X/events"))
            .respond_with(ResponseTemplate::new(403))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/homeappliances/X/events"))
            .respond_with(stream(&status_message("BSH.Common.Status.DoorState", "Open")))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_millis(20));
        let listener = Recorder::new("X");
        client.register_event_listener(listener.clone()).await.unwrap();

        for _ in 0..300 {
            if !client.has_connection("X").await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!client.has_connection("X").await);
        assert_eq!(client.listener_count(), 1);

        // No automatic retry after a 403.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
        assert_eq!(listener.reconnects.load(Ordering::SeqCst), 0);

        // Registering again reopens the stream.
        client.register_event_listener(listener.clone()).await.unwrap();
        assert!(client.has_connection("X").await);
        eventually(|| !listener.keys().is_empty()).await;
    }

    #[tokio::test]
    async fn invalid_token_reopens_with_a_new_token() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/security/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "access-1"
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/security/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "access-2"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/homeappliances/X/events"))
            .and(header("authorization", "Bearer access-1"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/homeappliances/X/events"))
            .and(header("authorization", "Bearer access-2"))
            .respond_with(stream(&status_message("BSH.Common.Status.DoorState", "Open")))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, LONG);
        let listener = Recorder::new("X");
        let id = client.register_event_listener(listener.clone()).await.unwrap();

        eventually(|| !listener.keys().is_empty()).await;

        assert!(client.has_connection("X").await);
        assert_eq!(client.connection_count().await, 1);
        assert_eq!(client.listener_count(), 1);
        assert_eq!(listener.reconnects.load(Ordering::SeqCst), 0);

        // The id handed out at registration still works.
        assert!(client.unregister_event_listener(id).await);
        assert!(!client.has_connection("X").await);
    }
}
