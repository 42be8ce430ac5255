// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! The network transport contract and its reqwest implementation.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use reqwest::{Client, Proxy};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::{Result, TransportError};

/// A request handed to a [`Transport`].
#[derive(Debug, Clone)]
pub struct TransportRequest {
	pub method: Method,
	pub url: String,
	pub headers: HeaderMap,
	pub body: Bytes,
}

impl TransportRequest {
	/// Builds a `POST` request with the given headers and body.
	pub fn post(url: impl Into<String>, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
		Self {
			method: Method::POST,
			url: url.into(),
			headers,
			body: body.into(),
		}
	}

	/// Returns a header value as a string, if present and visible ASCII.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).and_then(|v| v.to_str().ok())
	}

	/// Parses the request body as JSON.
	pub fn json_body<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
		serde_json::from_slice(&self.body)
	}
}

/// A fully-read response returned by a [`Transport`].
#[derive(Debug, Clone)]
pub struct TransportResponse {
	pub status: StatusCode,
	pub headers: HeaderMap,
	pub body: Bytes,
}

impl TransportResponse {
	/// Creates a response with no headers and no body.
	pub fn new(status: StatusCode) -> Self {
		Self {
			status,
			headers: HeaderMap::new(),
			body: Bytes::new(),
		}
	}

	/// Creates a response carrying `value` serialized as JSON.
	pub fn json_response<T: serde::Serialize>(
		status: StatusCode,
		value: &T,
	) -> serde_json::Result<Self> {
		let mut headers = HeaderMap::new();
		headers.insert(
			http::header::CONTENT_TYPE,
			http::HeaderValue::from_static("application/json"),
		);
		Ok(Self {
			status,
			headers,
			body: Bytes::from(serde_json::to_vec(value)?),
		})
	}

	pub fn is_success(&self) -> bool {
		self.status.is_success()
	}

	/// Parses the body as JSON.
	pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
		serde_json::from_slice(&self.body)
	}

	/// Returns the body as text, replacing invalid UTF-8.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}

/// Sends one request and returns the response.
///
/// Implementations must not retry or buffer. Dropping the returned future
/// cancels the in-flight request; callers use that to enforce timeouts.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
	async fn send(&self, request: TransportRequest) -> Result<TransportResponse>;
}

/// A transport shared between clients.
pub type SharedTransport = Arc<dyn Transport>;

/// Adapts an async function into a [`Transport`].
pub struct FnTransport<F> {
	f: F,
}

/// Wraps `f` so it can be used wherever a [`Transport`] is expected.
///
/// # Example
/// ```ignore
/// let transport = rlaas_common_http::transport_fn(|_request| async {
///     Ok(TransportResponse::new(StatusCode::ACCEPTED))
/// });
/// ```
pub fn transport_fn<F, Fut>(f: F) -> FnTransport<F>
where
	F: Fn(TransportRequest) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = Result<TransportResponse>> + Send + 'static,
{
	FnTransport { f }
}

#[async_trait::async_trait]
impl<F, Fut> Transport for FnTransport<F>
where
	F: Fn(TransportRequest) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = Result<TransportResponse>> + Send + 'static,
{
	async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
		(self.f)(request).await
	}
}

/// Connection settings for [`HttpTransport`].
///
/// reqwest does not cap concurrent connections; the pool only bounds how many
/// idle ones it keeps and for how long.
#[derive(Debug, Clone)]
pub struct HttpTransportOptions {
	/// Forward proxy for all traffic. The pool settings below still apply to
	/// the connections made to the proxy.
	pub proxy_url: Option<String>,
	/// How long an idle pooled connection is kept before it is closed.
	pub pool_idle_timeout: Duration,
	/// Interval between TCP keep-alive packets on open sockets.
	pub tcp_keepalive: Duration,
	/// Maximum idle connections kept per host. Busy connections are not
	/// counted.
	pub pool_max_idle_per_host: usize,
}

impl Default for HttpTransportOptions {
	fn default() -> Self {
		Self {
			proxy_url: None,
			pool_idle_timeout: Duration::from_secs(10),
			tcp_keepalive: Duration::from_secs(30),
			pool_max_idle_per_host: 128,
		}
	}
}

/// A pooled HTTP transport backed by reqwest.
///
/// No request timeout is configured here; the delivery client bounds each
/// attempt itself.
#[derive(Debug, Clone)]
pub struct HttpTransport {
	client: Client,
}

impl HttpTransport {
	/// Builds a transport with the given pooling and proxy settings.
	pub fn new(options: HttpTransportOptions) -> Result<Self> {
		let mut builder = crate::client::builder()
			.pool_idle_timeout(options.pool_idle_timeout)
			.pool_max_idle_per_host(options.pool_max_idle_per_host)
			.tcp_keepalive(options.tcp_keepalive);

		if let Some(url) = &options.proxy_url {
			let proxy = Proxy::all(url.as_str()).map_err(|source| TransportError::InvalidProxy {
				url: url.clone(),
				source,
			})?;
			builder = builder.proxy(proxy);
			info!(proxy_url = %url, "HTTP transport using forward proxy");
		}

		let client = builder.build().map_err(TransportError::Build)?;

		debug!(
			pool_max_idle_per_host = options.pool_max_idle_per_host,
			pool_idle_timeout_secs = options.pool_idle_timeout.as_secs(),
			tcp_keepalive_secs = options.tcp_keepalive.as_secs(),
			"HTTP transport initialized"
		);

		Ok(Self { client })
	}

	/// Builds a transport with default pooling and no proxy.
	pub fn with_defaults() -> Result<Self> {
		Self::new(HttpTransportOptions::default())
	}

	/// Wraps an existing reqwest client.
	pub fn from_client(client: Client) -> Self {
		Self { client }
	}
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
	async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
		let response = self
			.client
			.request(request.method, &request.url)
			.headers(request.headers)
			.body(request.body)
			.send()
			.await?;

		let status = response.status();
		let headers = response.headers().clone();
		let body = response.bytes().await?;

		Ok(TransportResponse {
			status,
			headers,
			body,
		})
	}
}
