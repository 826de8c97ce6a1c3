use crate::archive_log::ArchiveLog;
use crate::config::TriggerConfig;
use crate::error::{ArchiveError, Result};
use crate::events::MatchOutcome;
use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc as tokio_mpsc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct WatcherConfig {
	/// Directory the capture pipeline writes into
	pub path: PathBuf,
	pub recursive: bool,
	/// Extensions of the captures that trigger registration
	pub extensions: Vec<String>,
	pub trigger: TriggerConfig,
	/// Outcome reported for every capture; `None` discards them
	pub outcome: Option<MatchOutcome>,
}

/// Feeds newly created captures into an [`ArchiveLog`]
pub struct FileSystemWatcher {
	config: WatcherConfig,
	archive_log: Arc<ArchiveLog>,
	event_sender: Option<tokio_mpsc::UnboundedSender<PathBuf>>,
	event_receiver: Option<tokio_mpsc::UnboundedReceiver<PathBuf>>,
}

impl FileSystemWatcher {
	pub fn new(config: WatcherConfig, archive_log: Arc<ArchiveLog>) -> Result<Self> {
		if !config.path.is_dir() {
			return Err(ArchiveError::InvalidPath {
				path: config.path.to_string_lossy().to_string(),
			});
		}

		let (tx, rx) = tokio_mpsc::unbounded_channel();
		Ok(Self {
			config,
			archive_log,
			event_sender: Some(tx),
			event_receiver: Some(rx),
		})
	}

	/// Watch until the notify channel closes
	pub async fn start_watching(&mut self) -> Result<()> {
		let path = self.config.path.clone();
		info!(
			"Starting to watch path: {:?} (recursive: {})",
			path, self.config.recursive
		);

		let (notify_tx, notify_rx) = mpsc::channel();
		let mut watcher = RecommendedWatcher::new(
			notify_tx,
			Config::default().with_poll_interval(Duration::from_millis(100)),
		)?;

		let mode = if self.config.recursive {
			RecursiveMode::Recursive
		} else {
			RecursiveMode::NonRecursive
		};
		watcher.watch(&path, mode)?;

		let event_tx = self
			.event_sender
			.take()
			.ok_or(ArchiveError::NotInitialized)?;
		tokio::spawn(async move {
			Self::forward_creates(notify_rx, event_tx).await;
		});

		self.process_captures().await
	}

	async fn forward_creates(
		notify_rx: mpsc::Receiver<notify::Result<Event>>,
		event_tx: tokio_mpsc::UnboundedSender<PathBuf>,
	) {
		// notify delivers on a std channel, so drain it on a blocking thread
		tokio::task::spawn_blocking(move || {
			for result in notify_rx {
				match result {
					Ok(event) => {
						let arrived = arrived_paths(&event);
						if arrived.is_empty() {
							debug!("Ignoring notify event: {:?}", event.kind);
						}
						for path in arrived {
							if event_tx.send(path).is_err() {
								return;
							}
						}
					}
					Err(e) => error!("Notify error: {}", e),
				}
			}
		})
		.await
		.unwrap_or_else(|e| {
			error!("Notify forwarding task panicked: {}", e);
		});
	}

	async fn process_captures(&mut self) -> Result<()> {
		let mut receiver = self
			.event_receiver
			.take()
			.ok_or(ArchiveError::NotInitialized)?;

		while let Some(path) = receiver.recv().await {
			if self.is_capture(&path) {
				self.handle_capture(&path).await;
			}
		}

		warn!("Capture processing loop ended");
		Ok(())
	}

	fn is_capture(&self, path: &Path) -> bool {
		let storage_root = &self.archive_log.config().storage_root;
		!path.starts_with(storage_root)
			&& path.is_file()
			&& path
				.extension()
				.and_then(|e| e.to_str())
				.is_some_and(|ext| self.config.extensions.iter().any(|want| want == ext))
	}

	async fn handle_capture(&self, path: &Path) {
		match self.config.outcome {
			Some(outcome) => {
				info!("Capture {} ({:?})", path.display(), outcome);
				self.archive_log
					.process_trigger(path, &self.config.trigger, outcome)
					.await;
			}
			None => {
				info!("Capture {} (discard)", path.display());
				self.archive_log
					.remove_file(path, &self.config.trigger)
					.await;
			}
		}
	}
}

/// Paths a notify event brings into the watched tree: created files and
/// rename targets. Pipelines often write a temp file and rename it into place.
fn arrived_paths(event: &Event) -> Vec<PathBuf> {
	match event.kind {
		EventKind::Create(_) => event.paths.clone(),
		EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event.paths.clone(),
		EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
			event.paths.last().cloned().into_iter().collect()
		}
		// Platforms that cannot tell the two sides apart; `is_capture`
		// filters out the source, which no longer exists.
		EventKind::Modify(ModifyKind::Name(RenameMode::Any)) => event.paths.clone(),
		_ => Vec::new(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::{ArchiveConfig, ArchiverConfig};
	use tempfile::TempDir;

	fn watcher_config(path: PathBuf) -> WatcherConfig {
		WatcherConfig {
			path,
			recursive: false,
			extensions: vec!["jpg".to_string()],
			trigger: TriggerConfig {
				name: "driveway".to_string(),
				archive: Some(ArchiveConfig::enabled_with_retention(0)),
			},
			outcome: Some(MatchOutcome::Matched),
		}
	}

	#[test]
	fn test_arrived_paths_include_rename_targets() {
		use notify::event::{CreateKind, RemoveKind};

		let tmp = PathBuf::from("/captures/.cam1_20230101120000.jpg.part");
		let capture = PathBuf::from("/captures/cam1_20230101120000.jpg");

		let created = Event::new(EventKind::Create(CreateKind::File)).add_path(capture.clone());
		assert_eq!(arrived_paths(&created), vec![capture.clone()]);

		let renamed_to = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::To)))
			.add_path(capture.clone());
		assert_eq!(arrived_paths(&renamed_to), vec![capture.clone()]);

		let renamed_both = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
			.add_path(tmp.clone())
			.add_path(capture.clone());
		assert_eq!(arrived_paths(&renamed_both), vec![capture.clone()]);

		let renamed_from = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::From)))
			.add_path(tmp);
		assert!(arrived_paths(&renamed_from).is_empty());

		let removed = Event::new(EventKind::Remove(RemoveKind::File)).add_path(capture);
		assert!(arrived_paths(&removed).is_empty());
	}

	#[test]
	fn test_rejects_missing_directory() {
		let temp_dir = TempDir::new().unwrap();
		let log = Arc::new(
			ArchiveLog::new(ArchiverConfig::with_storage_root(temp_dir.path().join("storage")))
				.unwrap(),
		);

		let result = FileSystemWatcher::new(watcher_config(temp_dir.path().join("missing")), log);
		match result {
			Err(ArchiveError::InvalidPath { path }) => assert!(path.contains("missing")),
			_ => panic!("Expected InvalidPath error"),
		}
	}

	#[tokio::test]
	async fn test_capture_filter() {
		let temp_dir = TempDir::new().unwrap();
		let storage_root = temp_dir.path().join("storage");
		std::fs::create_dir_all(&storage_root).unwrap();
		let log = Arc::new(
			ArchiveLog::new(ArchiverConfig::with_storage_root(storage_root.clone())).unwrap(),
		);
		let watcher =
			FileSystemWatcher::new(watcher_config(temp_dir.path().to_path_buf()), log.clone())
				.unwrap();

		let capture = temp_dir.path().join("cam1_20230101120000.jpg");
		let clip = temp_dir.path().join("cam1_20230101120000.mp4");
		let archived = storage_root.join("cam1_20230101120000.jpg");
		for file in [&capture, &clip, &archived] {
			std::fs::write(file, b"data").unwrap();
		}

		assert!(watcher.is_capture(&capture));
		assert!(!watcher.is_capture(&clip));
		assert!(!watcher.is_capture(&archived));

		watcher.handle_capture(&capture).await;
		let events = log.events().await;
		assert_eq!(events.len(), 1);
		assert!(events[0].intent().is_move());
	}
}
