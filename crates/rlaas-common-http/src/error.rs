// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Transport errors.

use thiserror::Error;

/// Errors raised while constructing or calling a transport.
#[derive(Debug, Error)]
pub enum TransportError {
	/// The underlying HTTP client could not be built.
	#[error("failed to build HTTP client: {0}")]
	Build(#[source] reqwest::Error),

	/// The proxy URL was rejected.
	#[error("invalid proxy URL {url}: {source}")]
	InvalidProxy {
		url: String,
		#[source]
		source: reqwest::Error,
	},

	/// The request could not be sent or its body could not be read.
	#[error("HTTP request failed: {0}")]
	Request(#[from] reqwest::Error),

	/// Failure reported by a caller-supplied transport.
	#[error("transport failed: {0}")]
	Other(String),
}

impl TransportError {
	/// Convenience constructor for custom transports.
	pub fn other(message: impl Into<String>) -> Self {
		TransportError::Other(message.into())
	}
}

/// Result type alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;
