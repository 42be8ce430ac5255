// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Client configuration and its resolution into a runtime config.
//!
//! [`ClientConfig`] is what callers fill in; most fields are optional.
//! [`resolve_config`] turns it into a [`ResolvedConfig`] with every default
//! applied and every header validated, or fails with a typed error. The
//! network transport is never looked up implicitly: whatever the host
//! environment offers is passed in as `ambient`.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use http::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use rlaas_common_http::SharedTransport;
use tracing::debug;
use uuid::Uuid;
use zeroize::Zeroize;

use crate::error::{Result, TelemetryError};
use crate::retry::RetryPolicy;
use crate::storage::SharedStorage;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(500);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

pub const ENV_BASE_URL: &str = "RLAAS_BASE_URL";
pub const ENV_API_KEY: &str = "RLAAS_API_KEY";
pub const ENV_MAX_RETRIES: &str = "RLAAS_MAX_RETRIES";
pub const ENV_BACKOFF_MS: &str = "RLAAS_BACKOFF_MS";
pub const ENV_TIMEOUT_MS: &str = "RLAAS_TIMEOUT_MS";
pub const ENV_USER_AGENT: &str = "RLAAS_USER_AGENT";
pub const ENV_AUTO_IDEMPOTENCY: &str = "RLAAS_AUTO_IDEMPOTENCY";

const REDACTED: &str = "[REDACTED]";

/// Produces a fresh, globally unique idempotency key per call.
pub type IdempotencyKeyGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// The default generator: random UUID v4 strings.
pub fn uuid_key_generator() -> IdempotencyKeyGenerator {
	Arc::new(|| Uuid::new_v4().to_string())
}

/// Collector API key.
///
/// `Debug` and `Display` print `[REDACTED]`; the value is zeroized on drop.
/// Call [`ApiKey::expose`] to read it.
#[derive(Clone, Default, PartialEq, Eq, Zeroize)]
#[zeroize(drop)]
pub struct ApiKey {
	inner: String,
}

impl ApiKey {
	pub fn new(key: impl Into<String>) -> Self {
		Self { inner: key.into() }
	}

	pub fn expose(&self) -> &str {
		&self.inner
	}

	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}
}

impl From<&str> for ApiKey {
	fn from(key: &str) -> Self {
		Self::new(key)
	}
}

impl From<String> for ApiKey {
	fn from(key: String) -> Self {
		Self::new(key)
	}
}

impl fmt::Debug for ApiKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("ApiKey").field(&REDACTED).finish()
	}
}

impl fmt::Display for ApiKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

/// Caller-supplied client options. Unset options take their defaults in
/// [`resolve_config`].
#[derive(Clone, Default)]
pub struct ClientConfig {
	pub base_url: String,
	pub api_key: ApiKey,
	pub max_retries: Option<u32>,
	pub backoff: Option<Duration>,
	pub timeout: Option<Duration>,
	/// Extra request headers. These may override the fixed ones except
	/// `Idempotency-Key`. Names are case-insensitive; two entries naming the
	/// same header are rejected at resolution.
	pub headers: HashMap<String, String>,
	pub user_agent: Option<String>,
	pub storage: Option<SharedStorage>,
	pub auto_idempotency: Option<bool>,
	/// Wins over any ambient transport.
	pub transport: Option<SharedTransport>,
	pub key_generator: Option<IdempotencyKeyGenerator>,
}

impl ClientConfig {
	pub fn new(base_url: impl Into<String>, api_key: impl Into<ApiKey>) -> Self {
		Self {
			base_url: base_url.into(),
			api_key: api_key.into(),
			..Self::default()
		}
	}

	/// Loads a config from the process environment.
	///
	/// See [`ClientConfig::from_env_with`] for the variables read.
	pub fn from_env() -> Result<Self> {
		Self::from_env_with(|name| std::env::var(name).ok())
	}

	/// Loads a config through `lookup`.
	///
	/// `RLAAS_BASE_URL` is required, as is one of `RLAAS_API_KEY_FILE` (read
	/// from disk, one trailing newline stripped) or `RLAAS_API_KEY`; the file
	/// variant takes precedence. `RLAAS_MAX_RETRIES`, `RLAAS_BACKOFF_MS`,
	/// `RLAAS_TIMEOUT_MS`, `RLAAS_USER_AGENT` and `RLAAS_AUTO_IDEMPOTENCY` are
	/// optional.
	pub fn from_env_with<F>(lookup: F) -> Result<Self>
	where
		F: Fn(&str) -> Option<String>,
	{
		let base_url = lookup(ENV_BASE_URL)
			.filter(|url| !url.is_empty())
			.ok_or(TelemetryError::InvalidBaseUrl)?;

		let mut config = Self::new(base_url, load_api_key(&lookup)?);
		config.max_retries = parse_var(&lookup, ENV_MAX_RETRIES)?;
		config.backoff = parse_var(&lookup, ENV_BACKOFF_MS)?.map(Duration::from_millis);
		config.timeout = parse_var(&lookup, ENV_TIMEOUT_MS)?.map(Duration::from_millis);
		config.user_agent = lookup(ENV_USER_AGENT).filter(|ua| !ua.is_empty());
		config.auto_idempotency = match lookup(ENV_AUTO_IDEMPOTENCY) {
			Some(raw) => Some(parse_bool(ENV_AUTO_IDEMPOTENCY, &raw)?),
			None => None,
		};

		debug!(base_url = %config.base_url, "Loaded client config from environment");
		Ok(config)
	}
}

impl fmt::Debug for ClientConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ClientConfig")
			.field("base_url", &self.base_url)
			.field("api_key", &self.api_key)
			.field("max_retries", &self.max_retries)
			.field("backoff", &self.backoff)
			.field("timeout", &self.timeout)
			.field("headers", &self.headers)
			.field("user_agent", &self.user_agent)
			.field("storage", &self.storage.is_some())
			.field("auto_idempotency", &self.auto_idempotency)
			.field("transport", &self.transport.is_some())
			.field("key_generator", &self.key_generator.is_some())
			.finish()
	}
}

fn load_api_key<F>(lookup: &F) -> Result<ApiKey>
where
	F: Fn(&str) -> Option<String>,
{
	let file_var = format!("{ENV_API_KEY}_FILE");

	if let Some(path) = lookup(&file_var) {
		if path.is_empty() {
			return Err(TelemetryError::InvalidConfig(format!(
				"{file_var} is set but empty"
			)));
		}
		let path = PathBuf::from(path);
		let content = std::fs::read_to_string(&path).map_err(|e| {
			TelemetryError::InvalidConfig(format!(
				"failed to read API key file {}: {e}",
				path.display()
			))
		})?;
		let key = content.strip_suffix('\n').unwrap_or(&content);
		return Ok(ApiKey::new(key));
	}

	lookup(ENV_API_KEY).map(ApiKey::new).ok_or_else(|| {
		TelemetryError::InvalidConfig(format!("set either {ENV_API_KEY} or {file_var}"))
	})
}

fn parse_var<F, T>(lookup: &F, name: &str) -> Result<Option<T>>
where
	F: Fn(&str) -> Option<String>,
	T: std::str::FromStr,
	T::Err: fmt::Display,
{
	match lookup(name) {
		Some(raw) => raw
			.trim()
			.parse()
			.map(Some)
			.map_err(|e| TelemetryError::InvalidConfig(format!("{name}={raw:?}: {e}"))),
		None => Ok(None),
	}
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
	match raw.trim().to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Ok(true),
		"0" | "false" | "no" | "off" => Ok(false),
		_ => Err(TelemetryError::InvalidConfig(format!(
			"{name}={raw:?}: expected a boolean"
		))),
	}
}

/// Fully populated, validated configuration. Immutable once the client holds it.
#[derive(Clone)]
pub struct ResolvedConfig {
	/// Never ends in the slash the caller may have supplied.
	pub base_url: String,
	pub api_key: ApiKey,
	pub max_retries: u32,
	pub backoff: Duration,
	/// Always non-zero.
	pub timeout: Duration,
	pub headers: HeaderMap,
	pub user_agent: String,
	pub storage: Option<SharedStorage>,
	pub auto_idempotency: bool,
	pub transport: SharedTransport,
	pub key_generator: IdempotencyKeyGenerator,
}

impl ResolvedConfig {
	pub fn retry_policy(&self) -> RetryPolicy {
		RetryPolicy::new(self.max_retries, self.backoff)
	}

	/// Headers sent with every request: bearer authorization, JSON content
	/// type and user agent, then the caller's headers on top.
	pub fn request_headers(&self) -> Result<HeaderMap> {
		let mut headers = HeaderMap::new();

		let mut auth = HeaderValue::from_str(&format!("Bearer {}", self.api_key.expose()))
			.map_err(|_| TelemetryError::InvalidHeader {
				name: AUTHORIZATION.to_string(),
				message: "API key contains characters not allowed in a header".to_string(),
			})?;
		auth.set_sensitive(true);
		headers.insert(AUTHORIZATION, auth);
		headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
		headers.insert(USER_AGENT, header_value(USER_AGENT.as_str(), &self.user_agent)?);

		for (name, value) in &self.headers {
			headers.insert(name.clone(), value.clone());
		}

		Ok(headers)
	}
}

impl fmt::Debug for ResolvedConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ResolvedConfig")
			.field("base_url", &self.base_url)
			.field("api_key", &self.api_key)
			.field("max_retries", &self.max_retries)
			.field("backoff", &self.backoff)
			.field("timeout", &self.timeout)
			.field("headers", &self.headers)
			.field("user_agent", &self.user_agent)
			.field("storage", &self.storage.is_some())
			.field("auto_idempotency", &self.auto_idempotency)
			.finish_non_exhaustive()
	}
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
	HeaderValue::from_str(value).map_err(|e| TelemetryError::InvalidHeader {
		name: name.to_string(),
		message: e.to_string(),
	})
}

/// Strips at most one trailing slash.
pub fn normalize_base_url(base_url: &str) -> &str {
	base_url.strip_suffix('/').unwrap_or(base_url)
}

/// Applies defaults and validates `config`.
///
/// The transport is `config.transport` if set, else `ambient`; with neither
/// this fails with [`TelemetryError::TransportUnavailable`].
pub fn resolve_config(
	config: ClientConfig,
	ambient: Option<SharedTransport>,
) -> Result<ResolvedConfig> {
	let transport = config.transport.clone().or(ambient).ok_or_else(|| {
		TelemetryError::TransportUnavailable(
			"no transport configured and none provided by the environment".to_string(),
		)
	})?;

	let base_url = normalize_base_url(&config.base_url).to_string();
	if base_url.is_empty() {
		return Err(TelemetryError::InvalidBaseUrl);
	}

	let timeout = config.timeout.unwrap_or(DEFAULT_TIMEOUT);
	if timeout.is_zero() {
		return Err(TelemetryError::InvalidConfig(
			"timeout must be greater than zero".to_string(),
		));
	}

	let mut headers = HeaderMap::with_capacity(config.headers.len());
	for (name, value) in &config.headers {
		let header_name =
			HeaderName::from_bytes(name.as_bytes()).map_err(|e| TelemetryError::InvalidHeader {
				name: name.clone(),
				message: e.to_string(),
			})?;
		if headers.contains_key(&header_name) {
			return Err(TelemetryError::InvalidHeader {
				name: header_name.to_string(),
				message: "header given more than once (names are case-insensitive)".to_string(),
			});
		}
		headers.insert(header_name, header_value(name, value)?);
	}

	let user_agent = config
		.user_agent
		.clone()
		.unwrap_or_else(rlaas_common_http::user_agent);

	let resolved = ResolvedConfig {
		base_url,
		api_key: config.api_key.clone(),
		max_retries: config.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
		backoff: config.backoff.unwrap_or(DEFAULT_BACKOFF),
		timeout,
		headers,
		user_agent,
		storage: config.storage.clone(),
		auto_idempotency: config.auto_idempotency.unwrap_or(true),
		transport,
		key_generator: config
			.key_generator
			.clone()
			.unwrap_or_else(uuid_key_generator),
	};

	// Surfaces a bad API key or user agent here rather than on first send.
	resolved.request_headers()?;

	Ok(resolved)
}

#[cfg(test)]
mod tests {
	use super::*;
	use http::StatusCode;
	use proptest::prelude::*;
	use rlaas_common_http::{transport_fn, TransportRequest, TransportResponse};
	use std::io::Write;

	fn status_transport(status: StatusCode) -> SharedTransport {
		Arc::new(transport_fn(move |_request| async move {
			Ok(TransportResponse::new(status))
		}))
	}

	fn config() -> ClientConfig {
		let mut config = ClientConfig::new("https://collector.example.com", "sk-test");
		config.transport = Some(status_transport(StatusCode::ACCEPTED));
		config
	}

	fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let vars: HashMap<String, String> = vars
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect();
		move |name| vars.get(name).cloned()
	}

	#[test]
	fn applies_defaults() {
		let resolved = resolve_config(config(), None).unwrap();

		assert_eq!(resolved.base_url, "https://collector.example.com");
		assert_eq!(resolved.max_retries, 3);
		assert_eq!(resolved.backoff, Duration::from_millis(500));
		assert_eq!(resolved.timeout, Duration::from_millis(5000));
		assert!(resolved.headers.is_empty());
		assert!(resolved.user_agent.starts_with("rlaas-sdk-rust/"));
		assert!(resolved.storage.is_none());
		assert!(resolved.auto_idempotency);
	}

	#[test]
	fn strips_exactly_one_trailing_slash() {
		let mut cfg = config();
		cfg.base_url = "https://collector.example.com/".to_string();
		assert_eq!(
			resolve_config(cfg, None).unwrap().base_url,
			"https://collector.example.com"
		);

		let mut cfg = config();
		cfg.base_url = "https://collector.example.com//".to_string();
		assert_eq!(
			resolve_config(cfg, None).unwrap().base_url,
			"https://collector.example.com/"
		);
	}

	#[test]
	fn missing_transport_is_unavailable() {
		let cfg = ClientConfig::new("https://collector.example.com", "sk-test");
		let err = resolve_config(cfg, None).unwrap_err();
		assert!(matches!(err, TelemetryError::TransportUnavailable(_)));
	}

	#[tokio::test]
	async fn ambient_transport_is_the_fallback() {
		let cfg = ClientConfig::new("https://collector.example.com", "sk-test");
		let resolved = resolve_config(cfg, Some(status_transport(StatusCode::OK))).unwrap();

		let response = resolved
			.transport
			.send(TransportRequest::post("http://unused", HeaderMap::new(), ""))
			.await
			.unwrap();
		assert_eq!(response.status, StatusCode::OK);
	}

	#[tokio::test]
	async fn configured_transport_wins_over_ambient() {
		let resolved = resolve_config(config(), Some(status_transport(StatusCode::OK))).unwrap();

		let response = resolved
			.transport
			.send(TransportRequest::post("http://unused", HeaderMap::new(), ""))
			.await
			.unwrap();
		assert_eq!(response.status, StatusCode::ACCEPTED);
	}

	#[test]
	fn rejects_empty_base_url() {
		let mut cfg = config();
		cfg.base_url = String::new();
		assert!(matches!(
			resolve_config(cfg, None),
			Err(TelemetryError::InvalidBaseUrl)
		));

		let mut cfg = config();
		cfg.base_url = "/".to_string();
		assert!(matches!(
			resolve_config(cfg, None),
			Err(TelemetryError::InvalidBaseUrl)
		));
	}

	#[test]
	fn rejects_zero_timeout() {
		let mut cfg = config();
		cfg.timeout = Some(Duration::ZERO);
		assert!(matches!(
			resolve_config(cfg, None),
			Err(TelemetryError::InvalidConfig(_))
		));
	}

	#[test]
	fn rejects_invalid_headers() {
		let mut cfg = config();
		cfg.headers.insert("bad header".to_string(), "x".to_string());
		assert!(matches!(
			resolve_config(cfg, None),
			Err(TelemetryError::InvalidHeader { name, .. }) if name == "bad header"
		));

		let mut cfg = config();
		cfg.headers.insert("x-trace".to_string(), "line\nbreak".to_string());
		assert!(matches!(
			resolve_config(cfg, None),
			Err(TelemetryError::InvalidHeader { .. })
		));

		let mut cfg = config();
		cfg.api_key = ApiKey::new("sk\n");
		assert!(matches!(
			resolve_config(cfg, None),
			Err(TelemetryError::InvalidHeader { name, .. }) if name == "authorization"
		));
	}

	#[test]
	fn rejects_headers_differing_only_in_case() {
		let mut cfg = config();
		cfg.headers.insert("X-Trace".to_string(), "upper".to_string());
		cfg.headers.insert("x-trace".to_string(), "lower".to_string());

		assert!(matches!(
			resolve_config(cfg, None),
			Err(TelemetryError::InvalidHeader { name, .. }) if name == "x-trace"
		));

		let mut cfg = config();
		cfg.headers.insert("X-Trace".to_string(), "upper".to_string());
		let resolved = resolve_config(cfg, None).unwrap();
		assert_eq!(resolved.headers.get("x-trace").unwrap(), "upper");
	}

	#[test]
	fn request_headers_layer_caller_headers_over_fixed_ones() {
		let mut cfg = config();
		cfg.headers.insert("X-Tenant".to_string(), "acme".to_string());
		cfg.headers.insert("User-Agent".to_string(), "custom/1.0".to_string());
		let resolved = resolve_config(cfg, None).unwrap();

		let headers = resolved.request_headers().unwrap();
		assert_eq!(headers[AUTHORIZATION], "Bearer sk-test");
		assert!(headers[AUTHORIZATION].is_sensitive());
		assert_eq!(headers[CONTENT_TYPE], "application/json");
		assert_eq!(headers[USER_AGENT], "custom/1.0");
		assert_eq!(headers["x-tenant"], "acme");
	}

	#[test]
	fn api_key_is_redacted() {
		let key = ApiKey::new("sk-very-secret");
		assert_eq!(format!("{key}"), "[REDACTED]");
		assert_eq!(format!("{key:?}"), "ApiKey(\"[REDACTED]\")");
		assert_eq!(key.expose(), "sk-very-secret");

		let resolved = resolve_config(config(), None).unwrap();
		assert!(!format!("{resolved:?}").contains("sk-test"));
		assert!(!format!("{:?}", config()).contains("sk-test"));
	}

	#[test]
	fn default_generator_yields_distinct_uuids() {
		let generate = uuid_key_generator();
		let a = generate();
		let b = generate();
		assert_ne!(a, b);
		assert!(Uuid::parse_str(&a).is_ok());
	}

	#[test]
	fn from_env_reads_all_variables() {
		let cfg = ClientConfig::from_env_with(env(&[
			(ENV_BASE_URL, "https://collector.example.com/"),
			(ENV_API_KEY, "sk-env"),
			(ENV_MAX_RETRIES, "5"),
			(ENV_BACKOFF_MS, "250"),
			(ENV_TIMEOUT_MS, "1000"),
			(ENV_USER_AGENT, "my-app/2.0"),
			(ENV_AUTO_IDEMPOTENCY, "false"),
		]))
		.unwrap();

		assert_eq!(cfg.base_url, "https://collector.example.com/");
		assert_eq!(cfg.api_key.expose(), "sk-env");
		assert_eq!(cfg.max_retries, Some(5));
		assert_eq!(cfg.backoff, Some(Duration::from_millis(250)));
		assert_eq!(cfg.timeout, Some(Duration::from_millis(1000)));
		assert_eq!(cfg.user_agent.as_deref(), Some("my-app/2.0"));
		assert_eq!(cfg.auto_idempotency, Some(false));
	}

	#[test]
	fn from_env_leaves_unset_options_empty() {
		let cfg = ClientConfig::from_env_with(env(&[
			(ENV_BASE_URL, "https://collector.example.com"),
			(ENV_API_KEY, "sk-env"),
		]))
		.unwrap();

		assert_eq!(cfg.max_retries, None);
		assert_eq!(cfg.backoff, None);
		assert_eq!(cfg.auto_idempotency, None);
		assert!(cfg.transport.is_none());
	}

	#[test]
	fn from_env_requires_base_url_and_key() {
		let err = ClientConfig::from_env_with(env(&[(ENV_API_KEY, "sk")])).unwrap_err();
		assert!(matches!(err, TelemetryError::InvalidBaseUrl));

		let err = ClientConfig::from_env_with(env(&[(ENV_BASE_URL, "https://x")])).unwrap_err();
		assert!(matches!(err, TelemetryError::InvalidConfig(_)));
	}

	#[test]
	fn from_env_rejects_unparsable_values() {
		let err = ClientConfig::from_env_with(env(&[
			(ENV_BASE_URL, "https://x"),
			(ENV_API_KEY, "sk"),
			(ENV_MAX_RETRIES, "many"),
		]))
		.unwrap_err();
		assert!(matches!(err, TelemetryError::InvalidConfig(msg) if msg.contains(ENV_MAX_RETRIES)));

		let err = ClientConfig::from_env_with(env(&[
			(ENV_BASE_URL, "https://x"),
			(ENV_API_KEY, "sk"),
			(ENV_AUTO_IDEMPOTENCY, "maybe"),
		]))
		.unwrap_err();
		assert!(matches!(err, TelemetryError::InvalidConfig(_)));
	}

	#[test]
	fn api_key_file_takes_precedence() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "sk-from-file").unwrap();
		let path = file.path().to_string_lossy().to_string();

		let cfg = ClientConfig::from_env_with(env(&[
			(ENV_BASE_URL, "https://x"),
			(ENV_API_KEY, "sk-from-env"),
			("RLAAS_API_KEY_FILE", path.as_str()),
		]))
		.unwrap();

		assert_eq!(cfg.api_key.expose(), "sk-from-file");
	}

	#[test]
	fn unreadable_api_key_file_is_invalid_config() {
		let err = ClientConfig::from_env_with(env(&[
			(ENV_BASE_URL, "https://x"),
			("RLAAS_API_KEY_FILE", "/nonexistent/rlaas/key"),
		]))
		.unwrap_err();
		assert!(matches!(err, TelemetryError::InvalidConfig(_)));
	}

	proptest! {
		#[test]
		fn normalized_url_loses_at_most_one_slash(url in "https://[a-z]{1,12}\\.example/[a-z/]{0,8}") {
			let normalized = normalize_base_url(&url);
			prop_assert!(url.len() - normalized.len() <= 1);
			prop_assert!(url.starts_with(normalized));
			if url.ends_with('/') {
				prop_assert_eq!(normalized.len() + 1, url.len());
			} else {
				prop_assert_eq!(normalized, url.as_str());
			}
		}
	}
}
