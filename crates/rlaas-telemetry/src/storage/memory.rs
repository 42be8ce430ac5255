// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use tokio::sync::Mutex;

use super::{QueueItem, StorageAdapter};
use crate::error::Result;

/// Keeps the queue in process memory.
#[derive(Debug, Default)]
pub struct MemoryStorageAdapter {
	queue: Mutex<Vec<QueueItem>>,
}

impl MemoryStorageAdapter {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the number of items currently queued.
	pub async fn len(&self) -> usize {
		self.queue.lock().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.queue.lock().await.is_empty()
	}

	/// Returns a copy of the queue without draining it.
	pub async fn snapshot(&self) -> Vec<QueueItem> {
		self.queue.lock().await.clone()
	}
}

#[async_trait::async_trait]
impl StorageAdapter for MemoryStorageAdapter {
	async fn enqueue(&self, item: QueueItem) -> Result<()> {
		self.queue.lock().await.push(item);
		Ok(())
	}

	async fn drain(&self) -> Result<Vec<QueueItem>> {
		let mut queue = self.queue.lock().await;
		Ok(std::mem::take(&mut *queue))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn item(path: &str, value: i64) -> QueueItem {
		let payload = json!({ "value": value }).as_object().cloned().unwrap();
		QueueItem::new(path, payload)
	}

	#[tokio::test]
	async fn drains_in_insertion_order() {
		let adapter = MemoryStorageAdapter::new();
		adapter.enqueue(item("/a", 1)).await.unwrap();
		adapter.enqueue(item("/b", 2)).await.unwrap();
		adapter.enqueue(item("/c", 3)).await.unwrap();

		let drained = adapter.drain().await.unwrap();
		let paths: Vec<_> = drained.iter().map(|i| i.path.as_str()).collect();
		assert_eq!(paths, vec!["/a", "/b", "/c"]);
	}

	#[tokio::test]
	async fn drain_empties_the_queue() {
		let adapter = MemoryStorageAdapter::new();
		adapter.enqueue(item("/", 1)).await.unwrap();
		adapter.enqueue(item("/b", 2)).await.unwrap();

		assert_eq!(adapter.drain().await.unwrap().len(), 2);
		assert!(adapter.drain().await.unwrap().is_empty());
		assert!(adapter.is_empty().await);
	}

	#[tokio::test]
	async fn snapshot_leaves_queue_intact() {
		let adapter = MemoryStorageAdapter::new();
		adapter.enqueue(item("/a", 1)).await.unwrap();

		assert_eq!(adapter.snapshot().await.len(), 1);
		assert_eq!(adapter.len().await, 1);
	}
}
