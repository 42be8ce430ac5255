// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Queue persisted as a JSON string in a synchronous key-value store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::warn;

use super::{QueueItem, StorageAdapter, DEFAULT_QUEUE_KEY};
use crate::error::{Result, TelemetryError};

/// A synchronous string key-value store (page storage, a directory of files, ...).
pub trait KeyValueStore: Send + Sync {
	fn get_item(&self, key: &str) -> Result<Option<String>>;

	fn set_item(&self, key: &str, value: &str) -> Result<()>;

	/// Removing a missing key is not an error.
	fn remove_item(&self, key: &str) -> Result<()>;
}

/// A [`KeyValueStore`] held in memory.
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
	items: Mutex<HashMap<String, String>>,
}

impl InMemoryKeyValueStore {
	pub fn new() -> Self {
		Self::default()
	}

	fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
		self
			.items
			.lock()
			.map_err(|_| TelemetryError::Storage("key-value store lock poisoned".to_string()))
	}
}

impl KeyValueStore for InMemoryKeyValueStore {
	fn get_item(&self, key: &str) -> Result<Option<String>> {
		Ok(self.lock()?.get(key).cloned())
	}

	fn set_item(&self, key: &str, value: &str) -> Result<()> {
		self.lock()?.insert(key.to_string(), value.to_string());
		Ok(())
	}

	fn remove_item(&self, key: &str) -> Result<()> {
		self.lock()?.remove(key);
		Ok(())
	}
}

/// Builder for [`LocalStorageAdapter`].
#[derive(Default)]
pub struct LocalStorageAdapterBuilder {
	key: Option<String>,
	store: Option<Arc<dyn KeyValueStore>>,
}

impl LocalStorageAdapterBuilder {
	/// Overrides the key the queue is stored under.
	pub fn key(mut self, key: impl Into<String>) -> Self {
		self.key = Some(key.into());
		self
	}

	/// Sets the backing store. Required.
	pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
		self.store = Some(store);
		self
	}

	pub fn build(self) -> Result<LocalStorageAdapter> {
		let store = self.store.ok_or_else(|| {
			TelemetryError::StorageUnavailable(
				"LocalStorageAdapter requires a key-value store".to_string(),
			)
		})?;

		Ok(LocalStorageAdapter {
			key: self.key.unwrap_or_else(|| DEFAULT_QUEUE_KEY.to_string()),
			store,
		})
	}
}

/// Stores the queue as a JSON array under a single key.
///
/// Every `enqueue` reads, appends and writes back the whole array. A missing
/// or unparsable value reads as an empty queue; an unparsable value is also
/// removed from the store.
pub struct LocalStorageAdapter {
	key: String,
	store: Arc<dyn KeyValueStore>,
}

impl LocalStorageAdapter {
	pub fn builder() -> LocalStorageAdapterBuilder {
		LocalStorageAdapterBuilder::default()
	}

	/// Creates an adapter over `store` using the default key.
	pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
		Self {
			key: DEFAULT_QUEUE_KEY.to_string(),
			store,
		}
	}

	pub fn key(&self) -> &str {
		&self.key
	}

	fn read(&self) -> Result<Vec<QueueItem>> {
		let raw = match self.store.get_item(&self.key)? {
			Some(raw) if !raw.is_empty() => raw,
			_ => return Ok(Vec::new()),
		};

		match serde_json::from_str::<Vec<QueueItem>>(&raw) {
			Ok(queue) => Ok(queue),
			Err(e) => {
				warn!(key = %self.key, error = %e, "Discarding unreadable offline queue");
				self.store.remove_item(&self.key)?;
				Ok(Vec::new())
			}
		}
	}

	fn write(&self, queue: &[QueueItem]) -> Result<()> {
		let raw = serde_json::to_string(queue)?;
		self.store.set_item(&self.key, &raw)
	}
}

#[async_trait::async_trait]
impl StorageAdapter for LocalStorageAdapter {
	async fn enqueue(&self, item: QueueItem) -> Result<()> {
		let mut queue = self.read()?;
		queue.push(item);
		self.write(&queue)
	}

	async fn drain(&self) -> Result<Vec<QueueItem>> {
		let queue = self.read()?;
		self.store.remove_item(&self.key)?;
		Ok(queue)
	}
}
