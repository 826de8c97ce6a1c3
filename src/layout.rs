use crate::config::ArchiverConfig;
use crate::events::ArchiveFolder;
use crate::identity::EventIdentity;
use std::path::{Path, PathBuf};

/// Where archived files land:
/// `<root>/<folder>/<YYYY>/<MM>/<DD>/<event_id>/<HHmmss>/[annotations/]<name>`
#[derive(Debug, Clone)]
pub struct ArchiveLayout {
	storage_root: PathBuf,
	annotations_dir: PathBuf,
}

impl ArchiveLayout {
	pub fn new(storage_root: PathBuf, annotations_dir: PathBuf) -> Self {
		Self { storage_root, annotations_dir }
	}

	pub fn from_config(config: &ArchiverConfig) -> Self {
		Self::new(config.storage_root.clone(), config.annotations_dir())
	}

	pub fn folder_root(&self, folder: ArchiveFolder) -> PathBuf {
		self.storage_root.join(folder.dir_name())
	}

	/// Directories that must exist before the first pass
	pub fn required_dirs(&self) -> Vec<PathBuf> {
		vec![
			self.folder_root(ArchiveFolder::Archive),
			self.folder_root(ArchiveFolder::MaybeMatched),
			self.annotations_dir.clone(),
		]
	}

	pub fn destination(
		&self, identity: &EventIdentity, folder: Option<ArchiveFolder>, source: &Path,
	) -> PathBuf {
		let captured = identity.captured_at;
		let mut destination = self
			.folder_root(folder.unwrap_or_default())
			.join(captured.format("%Y").to_string())
			.join(captured.format("%m").to_string())
			.join(captured.format("%d").to_string())
			.join(&identity.event_id)
			.join(captured.format("%H%M%S").to_string());

		if source.parent() == Some(self.annotations_dir.as_path()) {
			destination.push("annotations");
		}
		if let Some(name) = source.file_name() {
			destination.push(name);
		}
		destination
	}
}
