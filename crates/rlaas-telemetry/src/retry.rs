// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Exponential backoff policy for delivery attempts.

use std::time::Duration;

/// How often and how patiently a single logical request is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
	/// Retries after the first attempt; a request is sent at most
	/// `max_retries + 1` times.
	pub max_retries: u32,
	/// Wait before the first retry; doubled for every retry after that.
	pub backoff: Duration,
}

impl RetryPolicy {
	pub fn new(max_retries: u32, backoff: Duration) -> Self {
		Self {
			max_retries,
			backoff,
		}
	}

	/// Whether another attempt follows failed attempt number `attempt` (1-based).
	pub fn should_retry(&self, attempt: u32) -> bool {
		attempt <= self.max_retries
	}

	/// Wait after failed attempt number `attempt` (1-based).
	pub fn delay(&self, attempt: u32) -> Duration {
		backoff_delay(self.backoff, attempt)
	}
}

/// `base * 2^(attempt - 1)`, saturating instead of overflowing.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
	let exponent = attempt.saturating_sub(1);
	let factor = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
	base.saturating_mul(factor)
}
