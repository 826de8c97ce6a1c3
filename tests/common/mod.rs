//! Common test utilities for the motion-archiver library

#![allow(dead_code)]

use motion_archiver::{ArchiveLog, ArchiverConfig};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Temporary workspace with an incoming capture directory and a storage root
pub struct TestWorkspace {
	pub temp_dir: TempDir,
	pub incoming: PathBuf,
	pub storage_root: PathBuf,
}

impl TestWorkspace {
	pub fn new() -> Self {
		let temp_dir = TempDir::new().expect("Failed to create temp directory");
		let incoming = temp_dir.path().join("incoming");
		let storage_root = temp_dir.path().join("storage");
		std::fs::create_dir_all(&incoming).expect("Failed to create incoming directory");

		Self { temp_dir, incoming, storage_root }
	}

	pub fn config(&self) -> ArchiverConfig {
		ArchiverConfig::with_storage_root(self.storage_root.clone())
	}

	pub fn archive_log(&self) -> ArchiveLog {
		ArchiveLog::new(self.config()).expect("Failed to create archive log")
	}

	/// Write a capture into the incoming directory
	pub fn capture(&self, name: &str) -> PathBuf {
		let path = self.incoming.join(name);
		std::fs::write(&path, name.as_bytes()).expect("Failed to write capture");
		path
	}

	/// Write a file into the annotations directory
	pub fn annotation(&self, name: &str) -> PathBuf {
		let dir = self.storage_root.join("annotations");
		std::fs::create_dir_all(&dir).expect("Failed to create annotations directory");
		let path = dir.join(name);
		std::fs::write(&path, name.as_bytes()).expect("Failed to write annotation");
		path
	}

	pub fn archived(&self, relative: &str) -> PathBuf {
		self.storage_root.join(relative)
	}
}

/// Recursively search `root` for a file called `name`
pub fn find_file(root: &Path, name: &str) -> Option<PathBuf> {
	let entries = std::fs::read_dir(root).ok()?;
	for entry in entries.flatten() {
		let path = entry.path();
		if path.is_dir() {
			if let Some(found) = find_file(&path, name) {
				return Some(found);
			}
		} else if path.file_name().and_then(|n| n.to_str()) == Some(name) {
			return Some(path);
		}
	}
	None
}

/// Poll `condition` until it holds or `timeout` elapses
pub async fn wait_until<F: Fn() -> bool>(condition: F, timeout: Duration) -> bool {
	let start = std::time::Instant::now();
	while start.elapsed() < timeout {
		if condition() {
			return true;
		}
		tokio::time::sleep(Duration::from_millis(25)).await;
	}
	condition()
}
