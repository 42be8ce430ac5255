// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! A directory-backed [`AsyncKeyValueStore`].

use std::fmt::Write as _;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use super::AsyncKeyValueStore;
use crate::error::{Result, TelemetryError};

/// Stores each key as one JSON file under a directory.
///
/// Writes go to a sibling temp file and are renamed into place, so a crash
/// mid-write leaves the previous value intact.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
	dir: PathBuf,
}

impl FileKeyValueStore {
	/// Opens (and creates if needed) the store directory.
	pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
		let dir = dir.into();
		tokio::fs::create_dir_all(&dir).await.map_err(|e| {
			TelemetryError::StorageUnavailable(format!(
				"cannot create queue directory {}: {e}",
				dir.display()
			))
		})?;
		debug!(dir = %dir.display(), "Opened file key-value store");
		Ok(Self { dir })
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}

	fn path_for(&self, key: &str) -> PathBuf {
		self.dir.join(format!("{}.json", encode_key(key)))
	}
}

/// Maps a key to a file stem. Bytes outside `[A-Za-z0-9_-]` become `%XX`, so
/// distinct keys never share a file and no key can name a path component.
fn encode_key(key: &str) -> String {
	let mut name = String::with_capacity(key.len());
	for byte in key.bytes() {
		if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_') {
			name.push(byte as char);
		} else {
			let _ = write!(name, "%{byte:02X}");
		}
	}
	name
}

#[async_trait::async_trait]
impl AsyncKeyValueStore for FileKeyValueStore {
	async fn get(&self, key: &str) -> Result<Option<Value>> {
		let path = self.path_for(key);
		let raw = match tokio::fs::read_to_string(&path).await {
			Ok(raw) => raw,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
			Err(e) => return Err(e.into()),
		};

		match serde_json::from_str(&raw) {
			Ok(value) => Ok(Some(value)),
			Err(e) => {
				// Hand back the raw text; the adapter discards values it cannot read.
				warn!(path = %path.display(), error = %e, "Queue file is not valid JSON");
				Ok(Some(Value::String(raw)))
			}
		}
	}

	async fn set(&self, key: &str, value: Value) -> Result<()> {
		let path = self.path_for(key);
		let tmp = self.dir.join(format!("{}.json.tmp", encode_key(key)));

		let json = serde_json::to_string(&value)?;

		tokio::fs::write(&tmp, &json).await?;
		tokio::fs::rename(&tmp, &path).await?;

		debug!(path = %path.display(), "Saved queue file");
		Ok(())
	}

	async fn remove(&self, key: &str) -> Result<()> {
		match tokio::fs::remove_file(self.path_for(key)).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
			Err(e) => Err(e.into()),
		}
	}
}
