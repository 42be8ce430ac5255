// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Delivery client for the telemetry collector.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use rlaas_common_http::{
	HttpTransport, HttpTransportOptions, SharedTransport, TransportRequest, TransportResponse,
};
use rlaas_telemetry_core::{
	FeedbackSubmitEvent, InteractionCreateEvent, InteractionOutputEvent, JsonMap, TaskResultEvent,
	TelemetryEvent, ValidateResponse, IDEMPOTENCY_KEY_FIELD, VALIDATE_PATH,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::{
	resolve_config, ApiKey, ClientConfig, IdempotencyKeyGenerator, ResolvedConfig,
};
use crate::error::{FailureReason, Result, TelemetryError};
use crate::storage::{MemoryStorageAdapter, QueueItem, SharedStorage};

/// Header carrying the idempotency key; always equal to the body's
/// `idempotency_key`.
pub const IDEMPOTENCY_KEY_HEADER: HeaderName = HeaderName::from_static("idempotency-key");

/// Per-call delivery behaviour.
#[derive(Debug, Clone, Copy)]
struct PostOptions {
	/// Enqueue the request when every attempt fails.
	buffer_on_failure: bool,
}

impl PostOptions {
	const DELIVER: Self = Self {
		buffer_on_failure: true,
	};
	const NO_BUFFER: Self = Self {
		buffer_on_failure: false,
	};
}

/// Builder for [`TelemetryClient`].
#[derive(Default)]
pub struct TelemetryClientBuilder {
	config: ClientConfig,
	ambient: Option<SharedTransport>,
}

impl TelemetryClientBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Collector root, e.g. `https://collector.example.com`.
	pub fn base_url(mut self, url: impl Into<String>) -> Self {
		self.config.base_url = url.into();
		self
	}

	pub fn api_key(mut self, key: impl Into<ApiKey>) -> Self {
		self.config.api_key = key.into();
		self
	}

	/// Retries after the first attempt.
	pub fn max_retries(mut self, retries: u32) -> Self {
		self.config.max_retries = Some(retries);
		self
	}

	/// Wait before the first retry, doubled per retry.
	pub fn backoff(mut self, backoff: Duration) -> Self {
		self.config.backoff = Some(backoff);
		self
	}

	/// Upper bound for a single attempt.
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.config.timeout = Some(timeout);
		self
	}

	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.config.headers.insert(name.into(), value.into());
		self
	}

	pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.config.user_agent = Some(user_agent.into());
		self
	}

	pub fn storage(mut self, storage: SharedStorage) -> Self {
		self.config.storage = Some(storage);
		self
	}

	pub fn auto_idempotency(mut self, enabled: bool) -> Self {
		self.config.auto_idempotency = Some(enabled);
		self
	}

	pub fn transport(mut self, transport: SharedTransport) -> Self {
		self.config.transport = Some(transport);
		self
	}

	/// Transport to fall back on when none is set with [`Self::transport`].
	pub fn ambient_transport(mut self, transport: SharedTransport) -> Self {
		self.ambient = Some(transport);
		self
	}

	pub fn key_generator<F>(mut self, generate: F) -> Self
	where
		F: Fn() -> String + Send + Sync + 'static,
	{
		let generate: IdempotencyKeyGenerator = Arc::new(generate);
		self.config.key_generator = Some(generate);
		self
	}

	pub fn build(self) -> Result<TelemetryClient> {
		TelemetryClient::from_resolved(resolve_config(self.config, self.ambient)?)
	}
}

struct TelemetryClientInner {
	config: ResolvedConfig,
	/// Fixed and caller headers, computed once.
	headers: HeaderMap,
	storage: SharedStorage,
}

/// Client for submitting telemetry events.
///
/// Each `log_*` call posts one event, retrying with exponential backoff. When
/// every attempt fails the request is kept in the offline queue (the
/// configured storage adapter, or an in-memory one) and the error is still
/// returned; [`TelemetryClient::flush_offline`] replays the queue later.
///
/// Cloning is cheap and clones share the queue.
///
/// # Example
///
/// ```ignore
/// use rlaas_telemetry::{TaskResultEvent, TelemetryClient};
///
/// let client = TelemetryClient::builder()
///     .base_url("https://collector.example.com")
///     .api_key("sk-...")
///     .ambient_transport(std::sync::Arc::new(rlaas_common_http::HttpTransport::with_defaults()?))
///     .build()?;
///
/// client.log_task_result(TaskResultEvent::new("acme", "interaction-1")).await?;
/// let replayed = client.flush_offline().await?;
/// ```
#[derive(Clone)]
pub struct TelemetryClient {
	inner: Arc<TelemetryClientInner>,
}

impl TelemetryClient {
	pub fn builder() -> TelemetryClientBuilder {
		TelemetryClientBuilder::new()
	}

	/// Creates a client using only the transport in `config`.
	///
	/// Fails with [`TelemetryError::TransportUnavailable`] when there is none.
	pub fn new(config: ClientConfig) -> Result<Self> {
		Self::from_resolved(resolve_config(config, None)?)
	}

	/// Creates a client that falls back to a default pooled [`HttpTransport`].
	pub fn with_default_transport(config: ClientConfig) -> Result<Self> {
		Self::with_http_transport(config, HttpTransportOptions::default())
	}

	/// Creates a client that falls back to an [`HttpTransport`] built from
	/// `options`. A transport set in `config` still wins.
	pub fn with_http_transport(config: ClientConfig, options: HttpTransportOptions) -> Result<Self> {
		let ambient: Option<SharedTransport> = match config.transport {
			Some(_) => None,
			None => {
				let transport = HttpTransport::new(options)
					.map_err(|e| TelemetryError::TransportUnavailable(e.to_string()))?;
				Some(Arc::new(transport))
			}
		};
		Self::from_resolved(resolve_config(config, ambient)?)
	}

	/// Creates a client from an already resolved configuration.
	pub fn from_resolved(config: ResolvedConfig) -> Result<Self> {
		let headers = config.request_headers()?;
		let storage: SharedStorage = match &config.storage {
			Some(storage) => Arc::clone(storage),
			None => Arc::new(MemoryStorageAdapter::new()),
		};

		info!(
			base_url = %config.base_url,
			max_retries = config.max_retries,
			auto_idempotency = config.auto_idempotency,
			"Telemetry client initialized"
		);

		Ok(Self {
			inner: Arc::new(TelemetryClientInner {
				config,
				headers,
				storage,
			}),
		})
	}

	pub fn config(&self) -> &ResolvedConfig {
		&self.inner.config
	}

	/// The offline queue, for inspecting pending requests.
	pub fn storage(&self) -> &SharedStorage {
		&self.inner.storage
	}

	pub async fn log_interaction(&self, event: InteractionCreateEvent) -> Result<()> {
		self.log_event(event).await
	}

	pub async fn log_output(&self, event: InteractionOutputEvent) -> Result<()> {
		self.log_event(event).await
	}

	pub async fn submit_feedback(&self, event: FeedbackSubmitEvent) -> Result<()> {
		self.log_event(event).await
	}

	pub async fn log_task_result(&self, event: TaskResultEvent) -> Result<()> {
		self.log_event(event).await
	}

	/// Posts any event kind to its endpoint, buffering it on failure.
	pub async fn log_event(&self, event: impl Into<TelemetryEvent>) -> Result<()> {
		let event = event.into();
		let payload = event.to_payload()?;
		self
			.post(event.kind().path(), payload, PostOptions::DELIVER)
			.await
			.map(|_| ())
	}

	/// Asks the collector whether `payload` is a valid event.
	///
	/// Failures are returned immediately and never buffered. A success
	/// response whose body is not a [`ValidateResponse`] is
	/// [`TelemetryError::UnexpectedResponseShape`].
	pub async fn validate<T: Serialize + ?Sized>(&self, payload: &T) -> Result<ValidateResponse> {
		let payload = to_payload(payload)?;
		let response = self.post(VALIDATE_PATH, payload, PostOptions::NO_BUFFER).await?;

		if response.body.is_empty() {
			return Err(TelemetryError::UnexpectedResponseShape(
				"validate response has no body".to_string(),
			));
		}
		response
			.json::<ValidateResponse>()
			.map_err(|e| TelemetryError::UnexpectedResponseShape(e.to_string()))
	}

	/// Replays the offline queue in order and returns how many items were sent.
	///
	/// Stops at the first item that still fails: that item and everything
	/// after it go back into the queue in their original order, and the
	/// failure is returned. Items sent before it are not requeued.
	///
	/// An item that can never be sent (for example one whose stored
	/// idempotency key is not a valid header value) is dropped with an
	/// error log and the flush moves on.
	pub async fn flush_offline(&self) -> Result<usize> {
		let items = self.inner.storage.drain().await?;
		if items.is_empty() {
			return Ok(0);
		}

		let mut pending = items.into_iter();
		let mut sent = 0;

		while let Some(mut item) = pending.next() {
			let key = self.stamp_idempotency_key(&mut item.payload);
			let result = self
				.deliver(&item.path, item.payload.clone(), key, PostOptions::NO_BUFFER)
				.await;

			if let Err(e) = result {
				if !e.is_retryable() {
					error!(
						path = %item.path,
						error = %e,
						"Dropping offline item that cannot be delivered"
					);
					continue;
				}
				let requeued = pending.len() + 1;
				self.requeue(std::iter::once(item).chain(pending)).await;
				warn!(
					sent,
					requeued,
					error = %e,
					"Offline flush stopped at first failure"
				);
				return Err(e);
			}
			sent += 1;
		}

		info!(count = sent, "Flushed offline queue");
		Ok(sent)
	}

	async fn post(
		&self,
		path: &str,
		mut payload: JsonMap,
		options: PostOptions,
	) -> Result<TransportResponse> {
		let key = self.stamp_idempotency_key(&mut payload);
		self.deliver(path, payload, key, options).await
	}

	/// Ensures `payload` carries the key its header will carry.
	///
	/// An existing string key is kept. A missing or null one is generated when
	/// auto-idempotency is on. Any other value is left alone and sent without
	/// a header.
	fn stamp_idempotency_key(&self, payload: &mut JsonMap) -> Option<String> {
		match payload.get(IDEMPOTENCY_KEY_FIELD) {
			Some(Value::String(key)) => Some(key.clone()),
			Some(Value::Null) | None if self.inner.config.auto_idempotency => {
				let key = (self.inner.config.key_generator)();
				payload.insert(IDEMPOTENCY_KEY_FIELD.to_string(), Value::String(key.clone()));
				Some(key)
			}
			_ => None,
		}
	}

	async fn deliver(
		&self,
		path: &str,
		payload: JsonMap,
		key: Option<String>,
		options: PostOptions,
	) -> Result<TransportResponse> {
		let config = &self.inner.config;
		let url = format!("{}{}", config.base_url, path);
		let body = Bytes::from(serde_json::to_vec(&payload)?);

		let mut headers = self.inner.headers.clone();
		if let Some(key) = &key {
			let value = HeaderValue::from_str(key).map_err(|e| TelemetryError::InvalidHeader {
				name: IDEMPOTENCY_KEY_HEADER.to_string(),
				message: e.to_string(),
			})?;
			headers.insert(IDEMPOTENCY_KEY_HEADER.clone(), value);
		}

		let policy = config.retry_policy();
		let mut attempt = 1;

		let reason = loop {
			debug!(url = %url, attempt, "Sending telemetry request");
			let request = TransportRequest::post(url.as_str(), headers.clone(), body.clone());

			match self.attempt(request).await {
				Ok(response) => {
					debug!(path, status = response.status.as_u16(), "Telemetry request delivered");
					return Ok(response);
				}
				Err(reason) if policy.should_retry(attempt) => {
					let delay = policy.delay(attempt);
					warn!(
						path,
						attempt,
						max_retries = policy.max_retries,
						delay_ms = delay.as_millis() as u64,
						error = %reason,
						"Telemetry request failed, retrying"
					);
					tokio::time::sleep(delay).await;
					attempt += 1;
				}
				Err(reason) => break reason,
			}
		};

		warn!(
			path,
			attempts = attempt,
			error = %reason,
			"Telemetry request failed after all retries"
		);

		if options.buffer_on_failure {
			self.buffer(QueueItem::new(path, payload)).await;
		}

		Err(TelemetryError::RequestFailed {
			path: path.to_string(),
			reason,
		})
	}

	/// One bounded attempt. Non-2xx statuses count as failures.
	async fn attempt(
		&self,
		request: TransportRequest,
	) -> std::result::Result<TransportResponse, FailureReason> {
		let config = &self.inner.config;
		let response = match tokio::time::timeout(config.timeout, config.transport.send(request)).await
		{
			Ok(result) => result?,
			Err(_) => return Err(FailureReason::Timeout(config.timeout)),
		};

		if response.is_success() {
			Ok(response)
		} else {
			Err(FailureReason::Status {
				status: response.status.as_u16(),
				message: response.text(),
			})
		}
	}

	async fn buffer(&self, item: QueueItem) {
		let path = item.path.clone();
		match self.inner.storage.enqueue(item).await {
			Ok(()) => info!(path = %path, "Buffered undelivered telemetry request"),
			Err(e) => error!(path = %path, error = %e, "Failed to buffer telemetry request"),
		}
	}

	async fn requeue(&self, items: impl Iterator<Item = QueueItem>) {
		for item in items {
			let path = item.path.clone();
			if let Err(e) = self.inner.storage.enqueue(item).await {
				error!(path = %path, error = %e, "Failed to requeue telemetry request");
			}
		}
	}
}

fn to_payload<T: Serialize + ?Sized>(value: &T) -> Result<JsonMap> {
	match serde_json::to_value(value)? {
		Value::Object(map) => Ok(map),
		_ => Err(TelemetryError::Serialization(serde::ser::Error::custom(
			"payload must serialize to a JSON object",
		))),
	}
}
