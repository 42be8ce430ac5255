// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! reqwest client builders with the standard SDK User-Agent header.

use reqwest::{Client, ClientBuilder};

const SDK_NAME: &str = "rlaas-sdk-rust";

/// Creates a new HTTP client builder with the standard SDK User-Agent header.
///
/// # Example
/// ```ignore
/// let client = rlaas_common_http::builder()
///     .pool_max_idle_per_host(16)
///     .build()?;
/// ```
pub fn builder() -> ClientBuilder {
	Client::builder().user_agent(user_agent())
}

/// Creates a new HTTP client builder with a custom User-Agent header.
pub fn builder_with_user_agent(user_agent: impl Into<String>) -> ClientBuilder {
	Client::builder().user_agent(user_agent.into())
}

/// Returns the standard SDK User-Agent string.
///
/// Format: `rlaas-sdk-rust/{version}`
pub fn user_agent() -> String {
	format!("{SDK_NAME}/{}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn user_agent_has_correct_format() {
		let ua = user_agent();
		let parts: Vec<&str> = ua.split('/').collect();
		assert_eq!(parts.len(), 2);
		assert_eq!(parts[0], "rlaas-sdk-rust");
		assert_eq!(parts[1], env!("CARGO_PKG_VERSION"));
	}

	#[test]
	fn builder_with_custom_user_agent() {
		let client = builder_with_user_agent("my-custom-agent/1.0").build();
		assert!(client.is_ok());
	}
}
