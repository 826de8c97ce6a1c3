//! Test doubles shared by the unit tests

use crate::error::Result;
use crate::events::ArchiveFolder;
use crate::file_ops::FileStore;
use crate::identity::EventIdentity;
use crate::motion_event::EventActions;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// In-memory file store: a set of existing paths plus a log of operations
#[derive(Default)]
pub struct MemoryStore {
	pub files: Mutex<BTreeSet<PathBuf>>,
	pub failing: Mutex<BTreeSet<PathBuf>>,
	pub moved: Mutex<Vec<(PathBuf, PathBuf)>>,
	pub removed: Mutex<Vec<PathBuf>>,
}

impl MemoryStore {
	pub fn with_files(paths: &[&str]) -> Self {
		let store = Self::default();
		store.files.lock().unwrap().extend(paths.iter().map(PathBuf::from));
		store
	}
}

#[async_trait]
impl FileStore for MemoryStore {
	async fn move_file(&self, source: &Path, destination: &Path) -> bool {
		if self.failing.lock().unwrap().contains(source) {
			return false;
		}
		let mut files = self.files.lock().unwrap();
		if !files.remove(source) {
			return false;
		}
		files.insert(destination.to_path_buf());
		self.moved
			.lock()
			.unwrap()
			.push((source.to_path_buf(), destination.to_path_buf()));
		true
	}

	async fn remove_file(&self, path: &Path) -> bool {
		if self.failing.lock().unwrap().contains(path) {
			return false;
		}
		let removed = self.files.lock().unwrap().remove(path);
		if removed {
			self.removed.lock().unwrap().push(path.to_path_buf());
		}
		removed
	}

	async fn exists(&self, path: &Path) -> bool {
		self.files.lock().unwrap().contains(path)
	}

	async fn list_dir(&self, dir: &Path) -> Vec<PathBuf> {
		self.files
			.lock()
			.unwrap()
			.iter()
			.filter(|path| path.parent() == Some(dir))
			.cloned()
			.collect()
	}

	async fn ensure_dir(&self, _dir: &Path) -> Result<()> {
		Ok(())
	}
}

/// [`EventActions`] that records every call and fails for chosen paths
#[derive(Default)]
pub struct RecordingActions {
	pub companions: Vec<PathBuf>,
	pub failing: BTreeSet<PathBuf>,
	pub moved: Mutex<Vec<(PathBuf, Option<ArchiveFolder>)>>,
	pub removed: Mutex<Vec<PathBuf>>,
	pub calls: Mutex<Vec<PathBuf>>,
}

impl RecordingActions {
	/// How many times any action was attempted on `path`
	pub fn attempts(&self, path: &Path) -> usize {
		self.calls.lock().unwrap().iter().filter(|call| *call == path).count()
	}

	fn record(&self, path: &Path) -> bool {
		self.calls.lock().unwrap().push(path.to_path_buf());
		!self.failing.contains(path)
	}
}

#[async_trait]
impl EventActions for RecordingActions {
	async fn move_file(
		&self, path: &Path, _identity: &EventIdentity, folder: Option<ArchiveFolder>,
	) -> bool {
		let ok = self.record(path);
		if ok {
			self.moved.lock().unwrap().push((path.to_path_buf(), folder));
		}
		ok
	}

	async fn remove_file(&self, path: &Path) -> bool {
		let ok = self.record(path);
		if ok {
			self.removed.lock().unwrap().push(path.to_path_buf());
		}
		ok
	}

	async fn companions(&self, _identity: &EventIdentity) -> Vec<PathBuf> {
		self.companions.clone()
	}
}
