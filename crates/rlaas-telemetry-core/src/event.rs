// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Telemetry event shapes.
//!
//! There are four event kinds: an interaction is created, the model produces
//! output for it, a user leaves feedback on it, and a downstream task reports
//! an outcome. All of them are addressed by `tenant_id` and (except the
//! create event) `interaction_id`.

use serde::{Deserialize, Serialize};

use crate::endpoint::EventKind;
use crate::JsonMap;

/// Name of the body field carrying the idempotency key.
pub const IDEMPOTENCY_KEY_FIELD: &str = "idempotency_key";

/// User input that started an interaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionInput {
	pub text: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub attachments: Option<Vec<String>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub metadata: Option<JsonMap>,
	#[serde(flatten)]
	pub extra: JsonMap,
}

/// A retrieved chunk that was in context when the interaction ran.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalChunk {
	pub id: String,
	pub text: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub score: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub source: Option<String>,
	#[serde(flatten)]
	pub extra: JsonMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionContext {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub retrieval_chunks: Option<Vec<RetrievalChunk>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub customer_tier: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sla_mins: Option<f64>,
	#[serde(flatten)]
	pub extra: JsonMap,
}

/// Which policy and model produced an interaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionVersion {
	pub policy_id: String,
	pub base_model: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub adapter: Option<String>,
	#[serde(flatten)]
	pub extra: JsonMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionTimings {
	pub ms_total: f64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub ms_decode: Option<f64>,
	#[serde(flatten)]
	pub extra: JsonMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionCosts {
	pub tokens_in: u64,
	pub tokens_out: u64,
	#[serde(flatten)]
	pub extra: JsonMap,
}

/// Posted to `/v1/interaction.create` when an interaction starts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionCreateEvent {
	pub tenant_id: String,
	pub user_id: String,
	pub skill: String,
	pub input: InteractionInput,
	#[serde(default)]
	pub context: InteractionContext,
	pub version: InteractionVersion,
	pub timings: InteractionTimings,
	pub costs: InteractionCosts,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub idempotency_key: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub created_at: Option<String>,
	#[serde(flatten)]
	pub extra: JsonMap,
}

impl InteractionCreateEvent {
	/// Creates an event with the identifying fields set and empty sub-objects.
	pub fn new(
		tenant_id: impl Into<String>,
		user_id: impl Into<String>,
		skill: impl Into<String>,
		input_text: impl Into<String>,
	) -> Self {
		Self {
			tenant_id: tenant_id.into(),
			user_id: user_id.into(),
			skill: skill.into(),
			input: InteractionInput {
				text: input_text.into(),
				..Default::default()
			},
			..Default::default()
		}
	}

	pub fn with_version(mut self, version: InteractionVersion) -> Self {
		self.version = version;
		self
	}

	pub fn with_timings(mut self, timings: InteractionTimings) -> Self {
		self.timings = timings;
		self
	}

	pub fn with_costs(mut self, costs: InteractionCosts) -> Self {
		self.costs = costs;
		self
	}
}

/// A tool invocation made while producing output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
	pub tool_name: String,
	#[serde(default)]
	pub arguments: JsonMap,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub status: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub latency_ms: Option<f64>,
	#[serde(flatten)]
	pub extra: JsonMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Citation {
	pub chunk_id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub confidence: Option<f64>,
	#[serde(flatten)]
	pub extra: JsonMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionOutput {
	pub text: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tool_calls: Option<Vec<ToolCall>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub citations: Option<Vec<Citation>>,
	#[serde(flatten)]
	pub extra: JsonMap,
}

/// Posted to `/v1/interaction.output` once the model has answered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionOutputEvent {
	pub tenant_id: String,
	pub interaction_id: String,
	pub output: InteractionOutput,
	pub timings: InteractionTimings,
	pub costs: InteractionCosts,
	pub version: InteractionVersion,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub idempotency_key: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub created_at: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub trace_id: Option<String>,
	#[serde(flatten)]
	pub extra: JsonMap,
}

impl InteractionOutputEvent {
	pub fn new(
		tenant_id: impl Into<String>,
		interaction_id: impl Into<String>,
		output_text: impl Into<String>,
	) -> Self {
		Self {
			tenant_id: tenant_id.into(),
			interaction_id: interaction_id.into(),
			output: InteractionOutput {
				text: output_text.into(),
				..Default::default()
			},
			..Default::default()
		}
	}
}

/// Feedback the user gave on purpose (thumbs, ratings, comments).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExplicitFeedback {
	/// Either `-1` or `1`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub thumb: Option<i8>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub rating: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub comment: Option<String>,
	#[serde(flatten)]
	pub extra: JsonMap,
}

/// Feedback inferred from what the user did with the output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImplicitFeedback {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub edited_text: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sent: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub time_to_send_ms: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub escalated: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub follow_up_count: Option<u32>,
	#[serde(flatten)]
	pub extra: JsonMap,
}

/// Posted to `/v1/feedback.submit`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSubmitEvent {
	pub tenant_id: String,
	pub interaction_id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub explicit: Option<ExplicitFeedback>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub implicit: Option<ImplicitFeedback>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub labels: Option<JsonMap>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub idempotency_key: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub created_at: Option<String>,
	#[serde(flatten)]
	pub extra: JsonMap,
}

impl FeedbackSubmitEvent {
	pub fn new(tenant_id: impl Into<String>, interaction_id: impl Into<String>) -> Self {
		Self {
			tenant_id: tenant_id.into(),
			interaction_id: interaction_id.into(),
			..Default::default()
		}
	}

	pub fn with_thumb(mut self, thumb: i8) -> Self {
		self.explicit.get_or_insert_with(Default::default).thumb = Some(thumb);
		self
	}

	pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
		self.explicit.get_or_insert_with(Default::default).comment = Some(comment.into());
		self
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskLabel {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub correct: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub f1: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub resolved: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub kpi_delta: Option<f64>,
	#[serde(flatten)]
	pub extra: JsonMap,
}

/// Posted to `/v1/task_result` when a downstream outcome is known.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskResultEvent {
	pub tenant_id: String,
	pub interaction_id: String,
	pub label: TaskLabel,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub observed_at: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub note: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub idempotency_key: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub created_at: Option<String>,
	#[serde(flatten)]
	pub extra: JsonMap,
}

impl TaskResultEvent {
	pub fn new(tenant_id: impl Into<String>, interaction_id: impl Into<String>) -> Self {
		Self {
			tenant_id: tenant_id.into(),
			interaction_id: interaction_id.into(),
			..Default::default()
		}
	}

	pub fn with_label(mut self, label: TaskLabel) -> Self {
		self.label = label;
		self
	}
}

/// Any one of the four event kinds.
///
/// Serializes as the bare inner object; the kind travels in the request path,
/// not in the body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TelemetryEvent {
	InteractionCreate(InteractionCreateEvent),
	InteractionOutput(InteractionOutputEvent),
	FeedbackSubmit(FeedbackSubmitEvent),
	TaskResult(TaskResultEvent),
}

impl TelemetryEvent {
	pub fn kind(&self) -> EventKind {
		match self {
			TelemetryEvent::InteractionCreate(_) => EventKind::InteractionCreate,
			TelemetryEvent::InteractionOutput(_) => EventKind::InteractionOutput,
			TelemetryEvent::FeedbackSubmit(_) => EventKind::FeedbackSubmit,
			TelemetryEvent::TaskResult(_) => EventKind::TaskResult,
		}
	}

	pub fn tenant_id(&self) -> &str {
		match self {
			TelemetryEvent::InteractionCreate(e) => &e.tenant_id,
			TelemetryEvent::InteractionOutput(e) => &e.tenant_id,
			TelemetryEvent::FeedbackSubmit(e) => &e.tenant_id,
			TelemetryEvent::TaskResult(e) => &e.tenant_id,
		}
	}

	pub fn idempotency_key(&self) -> Option<&str> {
		match self {
			TelemetryEvent::InteractionCreate(e) => e.idempotency_key.as_deref(),
			TelemetryEvent::InteractionOutput(e) => e.idempotency_key.as_deref(),
			TelemetryEvent::FeedbackSubmit(e) => e.idempotency_key.as_deref(),
			TelemetryEvent::TaskResult(e) => e.idempotency_key.as_deref(),
		}
	}

	/// Serializes the event into the JSON object that goes on the wire.
	pub fn to_payload(&self) -> serde_json::Result<JsonMap> {
		match serde_json::to_value(self)? {
			serde_json::Value::Object(map) => Ok(map),
			_ => Err(serde::ser::Error::custom("event did not serialize to a JSON object")),
		}
	}
}

impl From<InteractionCreateEvent> for TelemetryEvent {
	fn from(event: InteractionCreateEvent) -> Self {
		TelemetryEvent::InteractionCreate(event)
	}
}

impl From<InteractionOutputEvent> for TelemetryEvent {
	fn from(event: InteractionOutputEvent) -> Self {
		TelemetryEvent::InteractionOutput(event)
	}
}

impl From<FeedbackSubmitEvent> for TelemetryEvent {
	fn from(event: FeedbackSubmitEvent) -> Self {
		TelemetryEvent::FeedbackSubmit(event)
	}
}

impl From<TaskResultEvent> for TelemetryEvent {
	fn from(event: TaskResultEvent) -> Self {
		TelemetryEvent::TaskResult(event)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn optional_fields_are_omitted() {
		let payload = TelemetryEvent::from(TaskResultEvent::new("acme", "1"))
			.to_payload()
			.unwrap();

		assert_eq!(payload.get("tenant_id"), Some(&json!("acme")));
		assert_eq!(payload.get("label"), Some(&json!({})));
		assert!(!payload.contains_key(IDEMPOTENCY_KEY_FIELD));
		assert!(!payload.contains_key("note"));
	}

	#[test]
	fn unknown_keys_survive_deserialization() {
		let raw = json!({
			"tenant_id": "acme",
			"interaction_id": "42",
			"explicit": { "thumb": 1, "emoji": "tada" },
			"source": "widget"
		});

		let event: FeedbackSubmitEvent = serde_json::from_value(raw.clone()).unwrap();
		assert_eq!(event.extra.get("source"), Some(&json!("widget")));
		let explicit = event.explicit.as_ref().unwrap();
		assert_eq!(explicit.thumb, Some(1));
		assert_eq!(explicit.extra.get("emoji"), Some(&json!("tada")));

		assert_eq!(serde_json::to_value(&event).unwrap(), raw);
	}

	#[test]
	fn create_event_accepts_missing_context() {
		let raw = json!({
			"tenant_id": "acme",
			"user_id": "user-123",
			"skill": "support",
			"input": { "text": "Hello" },
			"version": { "policy_id": "policy@v1", "base_model": "base" },
			"timings": { "ms_total": 10 },
			"costs": { "tokens_in": 1, "tokens_out": 2 }
		});

		let event: InteractionCreateEvent = serde_json::from_value(raw).unwrap();
		assert_eq!(event.input.text, "Hello");
		assert_eq!(event.context, InteractionContext::default());
		assert_eq!(event.costs.tokens_out, 2);
	}

	#[test]
	fn feedback_builders_fill_explicit_block() {
		let event = FeedbackSubmitEvent::new("acme", "42")
			.with_thumb(-1)
			.with_comment("wrong answer");

		let explicit = event.explicit.unwrap();
		assert_eq!(explicit.thumb, Some(-1));
		assert_eq!(explicit.comment.as_deref(), Some("wrong answer"));
	}

	#[test]
	fn idempotency_key_is_exposed_per_variant() {
		let mut event = InteractionOutputEvent::new("acme", "1", "hi");
		event.idempotency_key = Some("key-1".to_string());

		let event = TelemetryEvent::from(event);
		assert_eq!(event.idempotency_key(), Some("key-1"));
		assert_eq!(event.tenant_id(), "acme");
		assert_eq!(event.kind(), EventKind::InteractionOutput);
	}
}
