//! Archive log: the registry of in-flight motion events and the periodic
//! pass that actions them.
//!
//! The registry sits behind a single async mutex that a pass holds from
//! start to finish, so registrations interleave with the background task at
//! whole-pass granularity only. Within a pass every event runs concurrently;
//! they touch disjoint files because a path is only ever claimed by one event.

use crate::config::{ArchiveConfig, ArchiverConfig, TriggerConfig};
use crate::discovery::CompanionDiscovery;
use crate::error::{ArchiveError, Result};
use crate::events::{ArchiveFolder, FileAction, MatchOutcome};
use crate::file_ops::{FileStore, LocalFileStore};
use crate::identity::{EventIdentity, IdentityResolver};
use crate::layout::ArchiveLayout;
use crate::motion_event::{EventActions, ExecuteOutcome, MotionEvent};
use async_trait::async_trait;
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Totals for one pass over the registry
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PassReport {
	pub actioned: usize,
	pub skipped: usize,
	pub evicted: usize,
	pub succeeded: usize,
	pub failed: usize,
}

/// Aggregate I/O backed by a [`FileStore`]
struct StoreActions {
	store: Arc<dyn FileStore>,
	layout: ArchiveLayout,
	discovery: CompanionDiscovery,
}

#[async_trait]
impl EventActions for StoreActions {
	async fn move_file(
		&self, path: &Path, identity: &EventIdentity, folder: Option<ArchiveFolder>,
	) -> bool {
		let destination = self.layout.destination(identity, folder, path);
		self.store.move_file(path, &destination).await
	}

	async fn remove_file(&self, path: &Path) -> bool {
		self.store.remove_file(path).await
	}

	async fn companions(&self, identity: &EventIdentity) -> Vec<PathBuf> {
		self.discovery.discover(identity, self.store.as_ref()).await
	}
}

struct Ticker {
	stop_tx: watch::Sender<bool>,
	task: JoinHandle<()>,
}

pub struct ArchiveLog {
	config: ArchiverConfig,
	resolver: IdentityResolver,
	actions: Arc<StoreActions>,
	registry: Arc<Mutex<Vec<MotionEvent>>>,
	ticker: Mutex<Option<Ticker>>,
}

impl ArchiveLog {
	/// Archive log over the local filesystem
	pub fn new(config: ArchiverConfig) -> Result<Self> {
		Self::with_store(config, Arc::new(LocalFileStore))
	}

	pub fn with_store(config: ArchiverConfig, store: Arc<dyn FileStore>) -> Result<Self> {
		config.validate()?;

		let actions = StoreActions {
			store,
			layout: ArchiveLayout::from_config(&config),
			discovery: CompanionDiscovery::from_config(&config),
		};

		Ok(Self {
			resolver: IdentityResolver::new(config.postfix_markers.clone(), config.lead_in_delta()),
			actions: Arc::new(actions),
			registry: Arc::new(Mutex::new(Vec::new())),
			ticker: Mutex::new(None),
			config,
		})
	}

	pub fn config(&self) -> &ArchiverConfig {
		&self.config
	}

	/// Create the destination folders, reset the registry and start the
	/// background pass. Calling it again restarts from an empty registry.
	pub async fn initialize(&self) -> Result<()> {
		self.stop_ticker().await?;

		for dir in self.actions.layout.required_dirs() {
			self.actions.store.ensure_dir(&dir).await?;
		}
		self.registry.lock().await.clear();

		let (stop_tx, stop_rx) = watch::channel(false);
		let task = tokio::spawn(tick_loop(
			self.registry.clone(),
			self.actions.clone(),
			self.config.tick_interval,
			stop_rx,
		));
		*self.ticker.lock().await = Some(Ticker { stop_tx, task });

		info!(
			"Archive log started at {} (pass every {:?})",
			self.config.storage_root.display(),
			self.config.tick_interval
		);
		Ok(())
	}

	/// Stop the background pass and flush everything still pending,
	/// ignoring retention. Best effort: failures are logged, not retried.
	pub async fn shutdown(&self) -> Result<PassReport> {
		self.stop_ticker().await?;

		let report = run_pass(&self.registry, self.actions.as_ref(), false).await;
		let remaining = self.registry.lock().await.len();
		if remaining > 0 {
			warn!("Archive log stopped with {} unresolved events", remaining);
		} else {
			info!("Archive log stopped, flushed {} files", report.succeeded);
		}
		Ok(report)
	}

	async fn stop_ticker(&self) -> Result<()> {
		let Some(ticker) = self.ticker.lock().await.take() else {
			return Ok(());
		};
		// The receiver only disappears if the task already ended.
		let _ = ticker.stop_tx.send(true);
		ticker
			.task
			.await
			.map_err(|err| ArchiveError::TaskJoin(err.to_string()))
	}

	/// Entry point for a trigger that fired on `path`. No-op unless the
	/// trigger has archiving enabled.
	pub async fn process_trigger(
		&self, path: &Path, trigger: &TriggerConfig, outcome: MatchOutcome,
	) {
		let Some(archive) = trigger.active_archive() else {
			debug!("Trigger {} does not archive, ignoring {}", trigger.name, path.display());
			return;
		};

		match outcome {
			MatchOutcome::Matched => {
				self.register_archival(path, archive, Some(ArchiveFolder::Archive)).await
			}
			MatchOutcome::SemiMatched if archive.semi_match_enabled => {
				self.register_archival(path, archive, Some(ArchiveFolder::MaybeMatched))
					.await
			}
			MatchOutcome::SemiMatched | MatchOutcome::Unmatched => {
				self.register_removal(path, archive).await
			}
		}
	}

	/// Entry point for a file the trigger layer wants discarded
	pub async fn remove_file(&self, path: &Path, trigger: &TriggerConfig) {
		if let Some(archive) = trigger.active_archive() {
			self.register_removal(path, archive).await;
		}
	}

	pub async fn register_removal(&self, path: &Path, config: &ArchiveConfig) {
		self.register(path, FileAction::Remove, config.retention()).await;
	}

	pub async fn register_archival(
		&self, path: &Path, config: &ArchiveConfig, folder: Option<ArchiveFolder>,
	) {
		self.register(path, FileAction::Move { folder }, config.retention()).await;
	}

	async fn register(&self, path: &Path, action: FileAction, retention: chrono::Duration) {
		let identity = match self.resolver.resolve(path) {
			Some(identity) => identity,
			None => {
				debug!("No capture timestamp in {}, tracking it on its own", path.display());
				EventIdentity::standalone(path, chrono::Local::now().naive_local())
			}
		};

		let mut candidate = MotionEvent::new(identity, self.config.max_attempts);
		candidate.add_entry(path, action, retention);

		let window = self.config.event_window();
		let mut events = self.registry.lock().await;
		let owner = events
			.iter()
			.position(|event| event.contains_path(path))
			.or_else(|| {
				events
					.iter()
					.position(|event| event.matches(&candidate, window).same_event)
			});

		match owner {
			Some(index) => {
				debug!(
					"{} joins event {} ({:?})",
					path.display(),
					events[index].id,
					action
				);
				events[index].merge(candidate);
			}
			None => {
				debug!(
					"{} opens event {} for {} ({:?})",
					path.display(),
					candidate.id,
					candidate.identity().event_id,
					action
				);
				events.push(candidate);
			}
		}
	}

	/// Run one retention-respecting pass now
	pub async fn tick(&self) -> PassReport {
		run_pass(&self.registry, self.actions.as_ref(), true).await
	}

	/// Snapshot of the events currently tracked
	pub async fn events(&self) -> Vec<MotionEvent> {
		self.registry.lock().await.clone()
	}
}

async fn tick_loop(
	registry: Arc<Mutex<Vec<MotionEvent>>>, actions: Arc<StoreActions>, interval: Duration,
	mut stop_rx: watch::Receiver<bool>,
) {
	loop {
		tokio::select! {
			changed = stop_rx.changed() => {
				if changed.is_err() || *stop_rx.borrow() {
					break;
				}
			}
			_ = tokio::time::sleep(interval) => {
				let report = run_pass(&registry, actions.as_ref(), true).await;
				if report != PassReport::default() {
					debug!("Archive pass: {:?}", report);
				}
			}
		}
	}
	debug!("Archive pass loop stopped");
}

async fn run_pass(
	registry: &Mutex<Vec<MotionEvent>>, actions: &dyn EventActions, enforce_eligibility: bool,
) -> PassReport {
	let mut events = registry.lock().await;
	let outcomes = join_all(
		events
			.iter_mut()
			.map(|event| event.execute(actions, enforce_eligibility)),
	)
	.await;

	let mut report = PassReport::default();
	for outcome in outcomes {
		match outcome {
			ExecuteOutcome::Skipped => report.skipped += 1,
			ExecuteOutcome::Actioned { succeeded, failed, .. } => {
				report.actioned += 1;
				report.succeeded += succeeded;
				report.failed += failed;
			}
		}
	}

	events.retain(|event| {
		if !event.is_resolved() {
			return true;
		}

		let exhausted = event.exhausted_entries();
		if exhausted.is_empty() {
			info!(
				"Event {} ({}) resolved as {:?}",
				event.id,
				event.identity().event_id,
				event.intent()
			);
		} else {
			let paths: Vec<String> = exhausted
				.iter()
				.map(|entry| entry.path.display().to_string())
				.collect();
			warn!(
				"Event {} ({}) dropped with unresolved files after {} attempts: {}",
				event.id,
				event.identity().event_id,
				exhausted[0].attempts,
				paths.join(", ")
			);
			if let Ok(json) = event.to_json() {
				debug!("Dropped event JSON: {}", json);
			}
		}
		report.evicted += 1;
		false
	});

	report
}
