// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Example: log an interaction and replay anything left in the offline queue.
//!
//! Run with:
//!   RLAAS_BASE_URL=http://localhost:8080 RLAAS_API_KEY=sk-test \
//!     cargo run --example log_interaction -p rlaas-telemetry

use std::sync::Arc;

use rlaas_telemetry::{
	ClientConfig, ExtensionStorageAdapter, FeedbackSubmitEvent, FileKeyValueStore,
	InteractionCreateEvent, InteractionTimings, TelemetryClient,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rlaas_telemetry=debug")),
		)
		.init();

	let mut config = ClientConfig::from_env()?;

	// Keep undelivered events on disk so they survive a restart.
	let queue_dir = std::env::temp_dir().join("rlaas-telemetry-example");
	let store = Arc::new(FileKeyValueStore::open(&queue_dir).await?);
	config.storage = Some(Arc::new(ExtensionStorageAdapter::new(store)));

	println!("Sending to {}", config.base_url);
	println!("  Offline queue: {}", queue_dir.display());

	let client = TelemetryClient::with_default_transport(config)?;

	let replayed = client.flush_offline().await?;
	if replayed > 0 {
		println!("Replayed {replayed} queued events");
	}

	let event = InteractionCreateEvent::new(
		"acme",
		"user-42",
		"support-answer",
		"How do I reset my password?",
	)
	.with_timings(InteractionTimings {
		ms_total: 412.0,
		..Default::default()
	});

	match client.log_interaction(event).await {
		Ok(()) => println!("Interaction delivered"),
		Err(e) => println!("Interaction queued for later: {e}"),
	}

	let feedback = FeedbackSubmitEvent::new("acme", "interaction-1")
		.with_thumb(1)
		.with_comment("Exactly what I needed");

	match client.submit_feedback(feedback).await {
		Ok(()) => println!("Feedback delivered"),
		Err(e) => println!("Feedback queued for later: {e}"),
	}

	Ok(())
}
