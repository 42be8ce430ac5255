// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Collector endpoints and the validation response.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Path of the schema validation endpoint.
pub const VALIDATE_PATH: &str = "/v1/validate";

/// The event kinds accepted by the collector, one endpoint each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
	InteractionCreate,
	InteractionOutput,
	FeedbackSubmit,
	TaskResult,
}

impl EventKind {
	pub const ALL: [EventKind; 4] = [
		EventKind::InteractionCreate,
		EventKind::InteractionOutput,
		EventKind::FeedbackSubmit,
		EventKind::TaskResult,
	];

	/// Request path relative to the collector base URL.
	pub fn path(self) -> &'static str {
		match self {
			EventKind::InteractionCreate => "/v1/interaction.create",
			EventKind::InteractionOutput => "/v1/interaction.output",
			EventKind::FeedbackSubmit => "/v1/feedback.submit",
			EventKind::TaskResult => "/v1/task_result",
		}
	}

	/// Looks up the kind served at `path`.
	pub fn from_path(path: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|kind| kind.path() == path)
	}
}

impl fmt::Display for EventKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			EventKind::InteractionCreate => "InteractionCreate",
			EventKind::InteractionOutput => "InteractionOutput",
			EventKind::FeedbackSubmit => "FeedbackSubmit",
			EventKind::TaskResult => "TaskResult",
		};
		f.write_str(name)
	}
}

/// Body returned by [`VALIDATE_PATH`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateResponse {
	pub event_type: String,
	pub valid: bool,
}
