// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests against a mocked Blynk API using wiremock.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use windmill_fan::protocol::{HttpTransport, Request as PinRequest, Transport};
use windmill_fan::{
    AuthToken, ClientConfig, DeviceClient, DeviceError, DeviceErrorKind, FanControl, Pin,
    PinValue, PollOutcome, RetryPolicy, SetupError, SpeedLevel, TransportError,
};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const TOKEN: &str = "valid-token-12345678";

fn config(server: &MockServer) -> ClientConfig {
    ClientConfig::new()
        .with_base_url(server.uri())
        .with_retry(RetryPolicy::no_retry())
}

fn token() -> AuthToken {
    AuthToken::new(TOKEN).unwrap()
}

/// Mounts a stateful fake fan answering reads and writes of V0 and V2.
async fn mount_fan(server: &MockServer, power: i64, speed: i64) -> Arc<Mutex<(i64, i64)>> {
    let pins = Arc::new(Mutex::new((power, speed)));
    let device = Arc::clone(&pins);

    Mock::given(method("GET"))
        .respond_with(move |req: &Request| {
            let query: Vec<(String, String)> = req
                .url
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();

            if !query.iter().any(|(k, v)| k == "token" && v == TOKEN) {
                return ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"error": {"message": "Invalid token."}}));
            }

            let mut pins = device.lock();
            let pin_args: Vec<&(String, String)> =
                query.iter().filter(|(k, _)| k != "token").collect();

            if req.url.path().ends_with("/update") {
                for (pin, value) in pin_args {
                    let Ok(value) = value.parse::<i64>() else {
                        return ResponseTemplate::new(400).set_body_string("Wrong value.");
                    };
                    match pin.as_str() {
                        "V0" => pins.0 = value,
                        "V2" => pins.1 = value,
                        _ => return ResponseTemplate::new(400).set_body_string("Wrong pin."),
                    }
                }
                return ResponseTemplate::new(200);
            }

            match pin_args.as_slice() {
                [(pin, _)] if pin == "V0" => {
                    ResponseTemplate::new(200).set_body_string(pins.0.to_string())
                }
                [(pin, _)] if pin == "V2" => {
                    ResponseTemplate::new(200).set_body_string(pins.1.to_string())
                }
                _ => ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"V0": pins.0, "V2": pins.1})),
            }
        })
        .mount(server)
        .await;

    pins
}

// ============================================================================
// HttpTransport Tests
// ============================================================================

mod http_transport {
    use super::*;

    #[tokio::test]
    async fn sends_token_and_flags() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/external/api/get"))
            .and(query_param("token", TOKEN))
            .and(query_param("V0", ""))
            .respond_with(ResponseTemplate::new(200).set_body_string("1"))
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&config(&server)).unwrap();
        let response = transport
            .request(&PinRequest::get("external/api/get").flag("V0"), &token())
            .await
            .unwrap();

        assert_eq!(response.body(), "1");
    }

    #[tokio::test]
    async fn post_sends_json_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/external/api/batch/update"))
            .and(query_param("token", TOKEN))
            .and(header("content-type", "application/json"))
            .and(body_json(serde_json::json!({"V0": 1, "V2": 4})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&config(&server)).unwrap();
        let request = PinRequest::post("external/api/batch/update")
            .json(serde_json::json!({"V0": 1, "V2": 4}));

        let response = transport.request(&request, &token()).await.unwrap();
        assert_eq!(response.body(), "");
    }

    #[tokio::test]
    async fn non_success_status_keeps_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&config(&server)).unwrap();
        let err = transport
            .request(&PinRequest::get("external/api/get").flag("V0"), &token())
            .await
            .unwrap_err();

        match err {
            TransportError::HttpStatus { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "Unauthorized");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("1")
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let config = config(&server).with_timeout(Duration::from_millis(200));
        let transport = HttpTransport::new(&config).unwrap();
        let err = transport
            .request(&PinRequest::get("external/api/get").flag("V0"), &token())
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Timeout(200)));
    }

    #[tokio::test]
    async fn error_messages_do_not_leak_token() {
        // Nothing listens on this port
        let config = ClientConfig::new().with_base_url("http://127.0.0.1:9");
        let transport = HttpTransport::new(&config).unwrap();

        let err = transport
            .request(&PinRequest::get("external/api/get").flag("V0"), &token())
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::ConnectionFailed(_)));
        assert!(!err.to_string().contains(TOKEN));
    }

    #[tokio::test]
    async fn misconfigured_base_url_is_not_retried() {
        let config = ClientConfig::new().with_base_url("dashboard.windmillair.com");
        let client = DeviceClient::http(token(), config).unwrap();

        let started = std::time::Instant::now();
        let err = client.fetch_status().await.unwrap_err();

        assert_eq!(err.kind(), DeviceErrorKind::Unknown);
        // The default policy would back off for at least 3 s
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}

// ============================================================================
// DeviceClient Tests
// ============================================================================

mod device_client {
    use super::*;

    #[tokio::test]
    async fn fetch_status_reads_both_pins() {
        let server = MockServer::start().await;
        mount_fan(&server, 1, 4).await;

        let client = DeviceClient::http(token(), config(&server)).unwrap();
        let status = client.fetch_status().await.unwrap();

        assert!(status.power);
        assert_eq!(status.speed, SpeedLevel::High);
    }

    #[tokio::test]
    async fn set_pin_value_updates_device() {
        let server = MockServer::start().await;
        let pins = mount_fan(&server, 0, 3).await;

        let client = DeviceClient::http(token(), config(&server)).unwrap();
        client
            .set_pin_value(Pin::FAN_SPEED, PinValue::Integer(5))
            .await
            .unwrap();

        assert_eq!(*pins.lock(), (0, 5));
        assert_eq!(
            client.get_pin_value(Pin::FAN_SPEED).await.unwrap(),
            PinValue::Integer(5)
        );
    }

    #[tokio::test]
    async fn invalid_token_is_auth_error() {
        let server = MockServer::start().await;
        mount_fan(&server, 1, 3).await;

        let client =
            DeviceClient::http(AuthToken::new("wrong-token-000").unwrap(), config(&server))
                .unwrap();
        let err = client.validate_token().await.unwrap_err();

        assert!(matches!(err, DeviceError::AuthInvalid));
    }

    #[tokio::test]
    async fn server_error_is_retried() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        mount_fan(&server, 1, 2).await;

        let retry = RetryPolicy::default()
            .with_initial_delay(Duration::from_millis(10))
            .with_jitter(0.0);
        let config = config(&server).with_retry(retry);
        let client = DeviceClient::http(token(), config).unwrap();

        let status = client.fetch_status().await.unwrap();
        assert_eq!(status.speed, SpeedLevel::Low);
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn missing_pin_is_protocol_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"V0": 1})))
            .mount(&server)
            .await;

        let client = DeviceClient::http(token(), config(&server)).unwrap();
        let err = client.fetch_status().await.unwrap_err();

        assert_eq!(err.kind(), DeviceErrorKind::Protocol);
    }
}

// ============================================================================
// End-to-end Tests
// ============================================================================

mod end_to_end {
    use super::*;

    #[tokio::test]
    async fn setup_and_control_fan() {
        let server = MockServer::start().await;
        let pins = mount_fan(&server, 0, 3).await;

        let fan = windmill_fan::DeviceHandle::with_transport(
            token(),
            config(&server),
            HttpTransport::new(&config(&server)).unwrap(),
        )
        .await
        .unwrap();

        let state = fan.current_state();
        assert!(!state.power());
        assert_eq!(state.speed(), Some(SpeedLevel::Medium));
        assert_eq!(fan.unique_id(), "windmillfan_12345678");

        fan.turn_on().await.unwrap();
        fan.set_percentage(40).await.unwrap();
        assert_eq!(*pins.lock(), (1, 2));

        let state = fan.current_state();
        assert!(state.power());
        assert_eq!(state.preset_mode(), Some(SpeedLevel::Low));
        assert_eq!(state.percentage(), 40);

        fan.set_percentage(100).await.unwrap();
        assert_eq!(fan.current_state().speed(), Some(SpeedLevel::Boost));

        fan.set_percentage(0).await.unwrap();
        assert_eq!(*pins.lock(), (0, 5));
        assert_eq!(fan.current_state().percentage(), 0);

        fan.shutdown();
    }

    #[tokio::test]
    async fn poll_failure_keeps_last_values() {
        let server = MockServer::start().await;
        mount_fan(&server, 1, 4).await;

        let fan = windmill_fan::DeviceHandle::with_transport(
            token(),
            config(&server),
            HttpTransport::new(&config(&server)).unwrap(),
        )
        .await
        .unwrap();

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;

        let outcome = fan.poll().await;
        assert_eq!(outcome, PollOutcome::Failed(DeviceErrorKind::DeviceUnreachable));

        let state = fan.current_state();
        assert!(!state.is_available());
        assert!(state.power());
        assert_eq!(state.speed(), Some(SpeedLevel::High));

        assert_eq!(fan.poll().await, PollOutcome::Updated);
        assert!(fan.current_state().is_available());
    }

    #[tokio::test]
    async fn setup_rejects_invalid_token() {
        let server = MockServer::start().await;
        mount_fan(&server, 1, 3).await;

        let err = windmill_fan::DeviceHandle::with_transport(
            AuthToken::new("another-token-99").unwrap(),
            config(&server),
            HttpTransport::new(&config(&server)).unwrap(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.device_kind(), Some(DeviceErrorKind::AuthInvalid));
        assert!(matches!(err, SetupError::Device(DeviceError::AuthInvalid)));
    }

    #[tokio::test]
    async fn setup_rejects_short_token() {
        let err = windmill_fan::setup("short", ClientConfig::default())
            .await
            .unwrap_err();

        assert!(matches!(err, SetupError::InvalidToken(_)));
    }
}
