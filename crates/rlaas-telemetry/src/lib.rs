// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Telemetry SDK for the RLaaS collector.
//!
//! Submits interaction, output, feedback and task-result events, retrying
//! failed requests with exponential backoff and keeping the ones that never
//! got through in an offline queue for later replay.
//!
//! # Quick Start
//!
//! ```ignore
//! use rlaas_telemetry::{ClientConfig, InteractionCreateEvent, TelemetryClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = TelemetryClient::with_default_transport(ClientConfig::new(
//!         "https://collector.example.com",
//!         "sk-...",
//!     ))?;
//!
//!     let event = InteractionCreateEvent::new(
//!         "acme",
//!         "user-42",
//!         "support-answer",
//!         "How do I reset my password?",
//!     );
//!
//!     if let Err(e) = client.log_interaction(event).await {
//!         // Already queued; replay later.
//!         eprintln!("delivery failed: {e}");
//!     }
//!
//!     let replayed = client.flush_offline().await?;
//!     println!("replayed {replayed} queued events");
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - **Idempotency keys**: every request carries an `Idempotency-Key` header
//!   matching the body's `idempotency_key`, stable across retries and replay
//! - **Retry**: `max_retries` retries with `backoff * 2^(n-1)` between them and
//!   a per-attempt timeout
//! - **Offline queue**: pluggable [`StorageAdapter`] backends (memory, a
//!   synchronous key-value store, an asynchronous key-value store)
//! - **Transport**: any [`Transport`]; [`HttpTransport`] pools connections and
//!   supports a forward proxy

pub mod client;
pub mod config;
pub mod error;
pub mod retry;
pub mod storage;

pub use client::{TelemetryClient, TelemetryClientBuilder, IDEMPOTENCY_KEY_HEADER};
pub use config::{
	resolve_config, uuid_key_generator, ApiKey, ClientConfig, IdempotencyKeyGenerator,
	ResolvedConfig,
};
pub use error::{FailureReason, Result, TelemetryError};
pub use retry::RetryPolicy;
pub use storage::{
	AsyncKeyValueStore, ExtensionStorageAdapter, FileKeyValueStore, InMemoryExtensionStore,
	InMemoryKeyValueStore, KeyValueStore, LocalStorageAdapter, MemoryStorageAdapter, QueueItem,
	SharedStorage, StorageAdapter, DEFAULT_QUEUE_KEY,
};

pub use rlaas_common_http::{
	HttpTransport, HttpTransportOptions, SharedTransport, Transport, TransportRequest,
	TransportResponse,
};
pub use rlaas_telemetry_core::{
	Citation, EventKind, ExplicitFeedback, FeedbackSubmitEvent, ImplicitFeedback,
	InteractionContext, InteractionCosts, InteractionCreateEvent, InteractionInput,
	InteractionOutput, InteractionOutputEvent, InteractionTimings, InteractionVersion, JsonMap,
	RetrievalChunk, TaskLabel, TaskResultEvent, TelemetryEvent, ToolCall, ValidateResponse,
};
