// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Queue persisted in an asynchronous, structured key-value area.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::warn;

use super::{QueueItem, StorageAdapter, DEFAULT_QUEUE_KEY};
use crate::error::{Result, TelemetryError};

/// An asynchronous key-value area that stores JSON values as-is, in the
/// manner of browser extension storage.
#[async_trait::async_trait]
pub trait AsyncKeyValueStore: Send + Sync {
	async fn get(&self, key: &str) -> Result<Option<Value>>;

	async fn set(&self, key: &str, value: Value) -> Result<()>;

	/// Removing a missing key is not an error.
	async fn remove(&self, key: &str) -> Result<()>;
}

/// An [`AsyncKeyValueStore`] held in memory.
#[derive(Debug, Default)]
pub struct InMemoryExtensionStore {
	items: Mutex<HashMap<String, Value>>,
}

impl InMemoryExtensionStore {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait::async_trait]
impl AsyncKeyValueStore for InMemoryExtensionStore {
	async fn get(&self, key: &str) -> Result<Option<Value>> {
		Ok(self.items.lock().await.get(key).cloned())
	}

	async fn set(&self, key: &str, value: Value) -> Result<()> {
		self.items.lock().await.insert(key.to_string(), value);
		Ok(())
	}

	async fn remove(&self, key: &str) -> Result<()> {
		self.items.lock().await.remove(key);
		Ok(())
	}
}

#[derive(Default)]
pub struct ExtensionStorageAdapterBuilder {
	key: Option<String>,
	area: Option<Arc<dyn AsyncKeyValueStore>>,
}

impl ExtensionStorageAdapterBuilder {
	pub fn key(mut self, key: impl Into<String>) -> Self {
		self.key = Some(key.into());
		self
	}

	/// Sets the storage area. Required.
	pub fn area(mut self, area: Arc<dyn AsyncKeyValueStore>) -> Self {
		self.area = Some(area);
		self
	}

	/// Fails with `StorageUnavailable` when no area was supplied.
	pub fn build(self) -> Result<ExtensionStorageAdapter> {
		let area = self.area.ok_or_else(|| {
			TelemetryError::StorageUnavailable(
				"ExtensionStorageAdapter requires an extension storage area".to_string(),
			)
		})?;

		Ok(ExtensionStorageAdapter {
			key: self.key.unwrap_or_else(|| DEFAULT_QUEUE_KEY.to_string()),
			area,
		})
	}
}

/// Stores the queue as a JSON array value under a single key.
///
/// Same read-modify-write discipline as
/// [`LocalStorageAdapter`](super::LocalStorageAdapter), but every step awaits
/// the store.
pub struct ExtensionStorageAdapter {
	key: String,
	area: Arc<dyn AsyncKeyValueStore>,
}

impl ExtensionStorageAdapter {
	pub fn builder() -> ExtensionStorageAdapterBuilder {
		ExtensionStorageAdapterBuilder::default()
	}

	pub fn new(area: Arc<dyn AsyncKeyValueStore>) -> Self {
		Self {
			key: DEFAULT_QUEUE_KEY.to_string(),
			area,
		}
	}

	pub fn key(&self) -> &str {
		&self.key
	}

	async fn read(&self) -> Result<Vec<QueueItem>> {
		let value = match self.area.get(&self.key).await? {
			Some(Value::Null) | None => return Ok(Vec::new()),
			Some(value) => value,
		};

		match serde_json::from_value::<Vec<QueueItem>>(value) {
			Ok(queue) => Ok(queue),
			Err(e) => {
				warn!(key = %self.key, error = %e, "Discarding unreadable offline queue");
				self.area.remove(&self.key).await?;
				Ok(Vec::new())
			}
		}
	}
}

#[async_trait::async_trait]
impl StorageAdapter for ExtensionStorageAdapter {
	async fn enqueue(&self, item: QueueItem) -> Result<()> {
		let mut queue = self.read().await?;
		queue.push(item);
		self.area.set(&self.key, serde_json::to_value(&queue)?).await
	}

	async fn drain(&self) -> Result<Vec<QueueItem>> {
		let queue = self.read().await?;
		self.area.remove(&self.key).await?;
		Ok(queue)
	}
}
