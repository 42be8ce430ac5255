// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::time::Duration;

use rlaas_telemetry::{
	ClientConfig, FailureReason, StorageAdapter, TaskLabel, TaskResultEvent, TelemetryClient,
	TelemetryError, ValidateResponse,
};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn config(base_url: &str) -> ClientConfig {
	let mut config = ClientConfig::new(base_url, "sk-integration");
	config.max_retries = Some(1);
	config.backoff = Some(Duration::ZERO);
	config
}

fn task_result(interaction_id: &str) -> TaskResultEvent {
	TaskResultEvent::new("acme", interaction_id).with_label(TaskLabel {
		correct: Some(true),
		..Default::default()
	})
}

fn idempotency_key(request: &Request) -> String {
	request
		.headers
		.get("idempotency-key")
		.and_then(|v| v.to_str().ok())
		.unwrap_or_default()
		.to_string()
}

#[tokio::test]
async fn delivers_event_with_matching_idempotency_key() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path("/v1/task_result"))
		.and(header("authorization", "Bearer sk-integration"))
		.and(header("content-type", "application/json"))
		.respond_with(ResponseTemplate::new(202))
		.expect(1)
		.mount(&server)
		.await;

	let client = TelemetryClient::with_default_transport(config(&server.uri())).unwrap();
	client.log_task_result(task_result("i-1")).await.unwrap();

	let requests = server.received_requests().await.unwrap();
	let body: Value = requests[0].body_json().unwrap();
	let key = idempotency_key(&requests[0]);
	assert!(!key.is_empty());
	assert_eq!(body["idempotency_key"], json!(key));
	assert_eq!(body["label"], json!({ "correct": true }));
}

#[tokio::test]
async fn trailing_slash_in_base_url_is_ignored() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path("/v1/task_result"))
		.respond_with(ResponseTemplate::new(200))
		.expect(1)
		.mount(&server)
		.await;

	let client = TelemetryClient::with_default_transport(config(&format!("{}/", server.uri())))
		.unwrap();

	client.log_task_result(task_result("i-1")).await.unwrap();
}

#[tokio::test]
async fn unavailable_collector_buffers_and_flush_replays_same_key() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path("/v1/task_result"))
		.respond_with(ResponseTemplate::new(503))
		.up_to_n_times(2)
		.mount(&server)
		.await;
	Mock::given(method("POST"))
		.and(path("/v1/task_result"))
		.respond_with(ResponseTemplate::new(202))
		.mount(&server)
		.await;

	let client = TelemetryClient::with_default_transport(config(&server.uri())).unwrap();

	let err = client.log_task_result(task_result("i-1")).await.unwrap_err();
	assert_eq!(err.status(), Some(503));

	assert_eq!(client.flush_offline().await.unwrap(), 1);
	assert_eq!(client.flush_offline().await.unwrap(), 0);

	let requests = server.received_requests().await.unwrap();
	assert_eq!(requests.len(), 3);
	let keys: Vec<_> = requests.iter().map(idempotency_key).collect();
	assert!(keys.iter().all(|k| k == &keys[0]));
}

#[tokio::test]
async fn validate_round_trips_collector_response() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path("/v1/validate"))
		.respond_with(
			ResponseTemplate::new(200)
				.set_body_json(json!({ "event_type": "TaskResult", "valid": false })),
		)
		.expect(1)
		.mount(&server)
		.await;

	let client = TelemetryClient::with_default_transport(config(&server.uri())).unwrap();
	let response = client
		.validate(&json!({ "tenant_id": "acme" }))
		.await
		.unwrap();

	assert_eq!(
		response,
		ValidateResponse {
			event_type: "TaskResult".to_string(),
			valid: false,
		}
	);
}

#[tokio::test]
async fn unreachable_collector_is_a_transport_failure() {
	let server = MockServer::start().await;
	let uri = server.uri();
	drop(server);

	let client = TelemetryClient::with_default_transport(config(&uri)).unwrap();
	let err = client.log_task_result(task_result("i-1")).await.unwrap_err();

	assert!(matches!(
		err,
		TelemetryError::RequestFailed {
			reason: FailureReason::Transport(_),
			..
		}
	));
	assert_eq!(client.storage().drain().await.unwrap().len(), 1);
}

#[tokio::test]
async fn slow_collector_times_out() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.respond_with(ResponseTemplate::new(202).set_delay(Duration::from_millis(500)))
		.mount(&server)
		.await;

	let mut config = config(&server.uri());
	config.max_retries = Some(0);
	config.timeout = Some(Duration::from_millis(50));
	let client = TelemetryClient::with_default_transport(config).unwrap();

	let err = client.log_task_result(task_result("i-1")).await.unwrap_err();

	assert!(matches!(
		err,
		TelemetryError::RequestFailed {
			reason: FailureReason::Timeout(_),
			..
		}
	));
}
