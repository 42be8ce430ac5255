// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the RLaaS telemetry collector.
//!
//! This crate holds the wire shapes shared by every client of the collector:
//! the four event kinds, the validation response and the endpoint paths they
//! are posted to. It carries no I/O; the delivery pipeline lives in
//! `rlaas-telemetry`.
//!
//! Every event struct (and every nested sub-object) keeps unknown keys in a
//! flattened `extra` map, so payloads produced by newer schema versions
//! survive a round trip through these types.
//!
//! # Example
//!
//! ```
//! use rlaas_telemetry_core::{EventKind, TaskResultEvent, TelemetryEvent};
//!
//! let event = TaskResultEvent::new("acme", "interaction-1");
//! let event = TelemetryEvent::from(event);
//!
//! assert_eq!(event.kind(), EventKind::TaskResult);
//! assert_eq!(event.kind().path(), "/v1/task_result");
//! ```

pub mod endpoint;
pub mod event;

pub use endpoint::{EventKind, ValidateResponse, VALIDATE_PATH};
pub use event::{
	Citation, ExplicitFeedback, FeedbackSubmitEvent, ImplicitFeedback, InteractionContext,
	InteractionCosts, InteractionCreateEvent, InteractionInput, InteractionOutput,
	InteractionOutputEvent, InteractionTimings, InteractionVersion, RetrievalChunk, TaskLabel,
	TaskResultEvent, TelemetryEvent, ToolCall, IDEMPOTENCY_KEY_FIELD,
};

/// An open JSON object, used for extension points and free-form sub-objects.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;
