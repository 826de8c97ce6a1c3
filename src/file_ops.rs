//! Single-file primitives the archiver is built on
//!
//! `move_file` and `remove_file` report success as a plain `bool` and never
//! return errors: a failure is logged here and retried by the owning entry's
//! attempt counter.

use crate::error::{ArchiveError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[async_trait]
pub trait FileStore: Send + Sync {
	/// Copy `source` to `destination` (creating parents) then delete `source`
	async fn move_file(&self, source: &Path, destination: &Path) -> bool;

	/// Delete `path`
	async fn remove_file(&self, path: &Path) -> bool;

	async fn exists(&self, path: &Path) -> bool;

	/// Regular files directly inside `dir`; empty when it cannot be read
	async fn list_dir(&self, dir: &Path) -> Vec<PathBuf>;

	async fn ensure_dir(&self, dir: &Path) -> Result<()>;
}

/// [`FileStore`] over the local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileStore;

impl LocalFileStore {
	async fn try_move(source: &Path, destination: &Path) -> Result<()> {
		if let Some(parent) = destination.parent() {
			tokio::fs::create_dir_all(parent)
				.await
				.map_err(|err| ArchiveError::file_operation("create_dir", parent, err))?;
		}

		tokio::fs::copy(source, destination)
			.await
			.map_err(|err| ArchiveError::file_operation("copy", source, err))?;

		tokio::fs::remove_file(source)
			.await
			.map_err(|err| ArchiveError::file_operation("remove", source, err))
	}

	async fn try_list(dir: &Path) -> Result<Vec<PathBuf>> {
		let mut entries = tokio::fs::read_dir(dir)
			.await
			.map_err(|err| ArchiveError::file_operation("read_dir", dir, err))?;

		let mut files = Vec::new();
		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|err| ArchiveError::file_operation("read_dir", dir, err))?
		{
			if entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
				files.push(entry.path());
			}
		}
		Ok(files)
	}
}

#[async_trait]
impl FileStore for LocalFileStore {
	async fn move_file(&self, source: &Path, destination: &Path) -> bool {
		match Self::try_move(source, destination).await {
			Ok(()) => {
				debug!("Moved {} -> {}", source.display(), destination.display());
				true
			}
			Err(err) => {
				warn!("Failed to move {} [{}]: {}", source.display(), err.category(), err);
				false
			}
		}
	}

	async fn remove_file(&self, path: &Path) -> bool {
		match tokio::fs::remove_file(path).await {
			Ok(()) => {
				debug!("Removed {}", path.display());
				true
			}
			Err(io_err) => {
				let err = ArchiveError::file_operation("remove", path, io_err);
				warn!("Failed to remove {} [{}]: {}", path.display(), err.category(), err);
				false
			}
		}
	}

	async fn exists(&self, path: &Path) -> bool {
		tokio::fs::try_exists(path).await.unwrap_or(false)
	}

	async fn list_dir(&self, dir: &Path) -> Vec<PathBuf> {
		match Self::try_list(dir).await {
			Ok(files) => files,
			Err(err) => {
				debug!("Skipping unreadable directory {}: {}", dir.display(), err);
				Vec::new()
			}
		}
	}

	async fn ensure_dir(&self, dir: &Path) -> Result<()> {
		tokio::fs::create_dir_all(dir)
			.await
			.map_err(|err| ArchiveError::file_operation("create_dir", dir, err))
	}
}
