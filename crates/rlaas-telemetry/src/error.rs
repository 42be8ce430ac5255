// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the telemetry SDK.

use std::time::Duration;

use rlaas_common_http::TransportError;
use thiserror::Error;

/// Telemetry SDK errors.
#[derive(Debug, Error)]
pub enum TelemetryError {
	/// Neither the caller nor the environment supplied a network transport.
	#[error("no network transport available: {0}")]
	TransportUnavailable(String),

	/// The backing store required by a storage adapter is missing.
	#[error("storage unavailable: {0}")]
	StorageUnavailable(String),

	/// The request failed on every attempt.
	#[error("request to {path} failed: {reason}")]
	RequestFailed { path: String, reason: FailureReason },

	/// A JSON response was required but missing or unparsable.
	#[error("unexpected response shape: {0}")]
	UnexpectedResponseShape(String),

	/// Base URL is missing or empty.
	#[error("invalid base URL")]
	InvalidBaseUrl,

	/// A header name or value cannot be sent over HTTP.
	#[error("invalid header {name}: {message}")]
	InvalidHeader { name: String, message: String },

	/// A configuration value is out of range or unparsable.
	#[error("invalid configuration: {0}")]
	InvalidConfig(String),

	/// Serialization error.
	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	/// The storage backend failed while reading or writing the queue.
	#[error("storage backend error: {0}")]
	Storage(String),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}

/// Why a single delivery attempt failed.
#[derive(Debug, Error)]
pub enum FailureReason {
	/// The collector answered with a non-2xx status.
	#[error("server returned status {status}: {message}")]
	Status { status: u16, message: String },

	/// The attempt did not complete in time and was aborted.
	#[error("timed out after {0:?}")]
	Timeout(Duration),

	/// The transport itself failed (connection refused, DNS, TLS, ...).
	#[error(transparent)]
	Transport(#[from] TransportError),
}

impl TelemetryError {
	/// Only request failures are transient; everything else is fatal.
	pub fn is_retryable(&self) -> bool {
		matches!(self, TelemetryError::RequestFailed { .. })
	}

	/// Returns the HTTP status of the final attempt, if the server answered.
	pub fn status(&self) -> Option<u16> {
		match self {
			TelemetryError::RequestFailed {
				reason: FailureReason::Status { status, .. },
				..
			} => Some(*status),
			_ => None,
		}
	}
}

/// Result type alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn request_failures_are_retryable() {
		let err = TelemetryError::RequestFailed {
			path: "/v1/task_result".to_string(),
			reason: FailureReason::Timeout(Duration::from_secs(5)),
		};
		assert!(err.is_retryable());
		assert_eq!(err.status(), None);
	}

	#[test]
	fn construction_errors_are_not_retryable() {
		assert!(!TelemetryError::TransportUnavailable("none".to_string()).is_retryable());
		assert!(!TelemetryError::StorageUnavailable("none".to_string()).is_retryable());
		assert!(!TelemetryError::UnexpectedResponseShape("empty".to_string()).is_retryable());
	}

	#[test]
	fn status_is_exposed() {
		let err = TelemetryError::RequestFailed {
			path: "/v1/validate".to_string(),
			reason: FailureReason::Status {
				status: 503,
				message: String::new(),
			},
		};
		assert_eq!(err.status(), Some(503));
		assert_eq!(
			err.to_string(),
			"request to /v1/validate failed: server returned status 503: "
		);
	}
}
