// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Offline queue storage for requests that could not be delivered.
//!
//! Every backend implements [`StorageAdapter`]: `enqueue` appends to the tail
//! of an ordered queue and `drain` returns everything in insertion order while
//! emptying the backing store. Adapters do not coordinate concurrent callers;
//! an `enqueue` racing a `drain` may land on either side of it.
//!
//! Backends:
//! - [`MemoryStorageAdapter`]: process memory, lost on restart.
//! - [`LocalStorageAdapter`]: read-modify-write over a synchronous
//!   [`KeyValueStore`] that must not block, such as [`InMemoryKeyValueStore`].
//! - [`ExtensionStorageAdapter`]: read-modify-write over an
//!   [`AsyncKeyValueStore`] holding structured values, such as the on-disk
//!   [`FileKeyValueStore`].

mod extension;
mod file;
mod local;
mod memory;

use std::sync::Arc;

use rlaas_telemetry_core::JsonMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use extension::{
	AsyncKeyValueStore, ExtensionStorageAdapter, ExtensionStorageAdapterBuilder,
	InMemoryExtensionStore,
};
pub use file::FileKeyValueStore;
pub use local::{
	InMemoryKeyValueStore, KeyValueStore, LocalStorageAdapter, LocalStorageAdapterBuilder,
};
pub use memory::MemoryStorageAdapter;

/// Key the persistent backends store the queue under unless overridden.
pub const DEFAULT_QUEUE_KEY: &str = "rlaas-offline-queue";

/// A request waiting to be (re)sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
	pub path: String,
	pub payload: JsonMap,
}

impl QueueItem {
	pub fn new(path: impl Into<String>, payload: JsonMap) -> Self {
		Self {
			path: path.into(),
			payload,
		}
	}
}

/// An ordered queue of pending requests.
#[async_trait::async_trait]
pub trait StorageAdapter: Send + Sync {
	/// Appends `item` to the tail of the queue.
	async fn enqueue(&self, item: QueueItem) -> Result<()>;

	/// Removes and returns every queued item in insertion order.
	async fn drain(&self) -> Result<Vec<QueueItem>>;
}

/// A storage adapter shared between the client and its caller.
pub type SharedStorage = Arc<dyn StorageAdapter>;
