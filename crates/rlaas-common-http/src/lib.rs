// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP plumbing for RLaaS clients.
//!
//! This crate provides:
//! - The [`Transport`] contract the delivery client sends requests through
//! - [`HttpTransport`], a pooled reqwest transport with optional forward proxy
//! - A consistent User-Agent string for SDK traffic
//!
//! Transports carry no retry or buffering policy; that lives in the caller.

mod client;
mod error;
mod transport;

pub use client::{builder, builder_with_user_agent, user_agent};
pub use error::{Result, TransportError};
pub use transport::{
	transport_fn, FnTransport, HttpTransport, HttpTransportOptions, SharedTransport, Transport,
	TransportRequest, TransportResponse,
};
