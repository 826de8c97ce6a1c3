//! The aggregate for one logical motion event
//!
//! A [`MotionEvent`] owns every file explicitly registered for it. When it is
//! executed it settles on one event-wide intent (move if any entry asks for a
//! move, otherwise remove) and applies it to the registered files and to any
//! companions discovered on disk, so the files of one event always end up in
//! the same place.

use crate::events::{ArchiveFolder, FileAction};
use crate::identity::EventIdentity;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// I/O an aggregate needs in order to execute
#[async_trait]
pub trait EventActions: Send + Sync {
	async fn move_file(
		&self, path: &Path, identity: &EventIdentity, folder: Option<ArchiveFolder>,
	) -> bool;

	async fn remove_file(&self, path: &Path) -> bool;

	/// Files on disk that plausibly belong to the event
	async fn companions(&self, identity: &EventIdentity) -> Vec<PathBuf>;
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisteredEntry {
	pub path: PathBuf,
	pub action: FileAction,
	pub attempts: u32,
	pub succeeded: bool,
	pub added_at: DateTime<Utc>,
	pub eligible_at: DateTime<Utc>,
}

impl RegisteredEntry {
	pub fn new(
		path: PathBuf, action: FileAction, retention: chrono::Duration, now: DateTime<Utc>,
	) -> Self {
		Self {
			path,
			action,
			attempts: 0,
			succeeded: false,
			added_at: now,
			eligible_at: now.checked_add_signed(retention).unwrap_or(DateTime::<Utc>::MAX_UTC),
		}
	}

	pub fn is_eligible_at(&self, now: DateTime<Utc>) -> bool {
		self.eligible_at <= now
	}

	pub fn is_resolved(&self, max_attempts: u32) -> bool {
		self.succeeded || self.attempts > max_attempts
	}

	pub fn is_exhausted(&self, max_attempts: u32) -> bool {
		!self.succeeded && self.attempts > max_attempts
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventMatch {
	pub same_event: bool,
	/// The other observation starts before this one and should win on merge
	pub other_is_earlier: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecuteOutcome {
	/// Retention has not elapsed for every entry
	Skipped,
	Actioned {
		intent: FileAction,
		succeeded: usize,
		failed: usize,
		companions: usize,
	},
}

#[derive(Debug, Clone, Serialize)]
pub struct MotionEvent {
	pub id: Uuid,
	identity: EventIdentity,
	entries: Vec<RegisteredEntry>,
	max_attempts: u32,
}

impl MotionEvent {
	pub fn new(identity: EventIdentity, max_attempts: u32) -> Self {
		Self { id: Uuid::new_v4(), identity, entries: Vec::new(), max_attempts }
	}

	pub fn identity(&self) -> &EventIdentity {
		&self.identity
	}

	pub fn entries(&self) -> &[RegisteredEntry] {
		&self.entries
	}

	pub fn entry(&self, path: &Path) -> Option<&RegisteredEntry> {
		self.entries.iter().find(|entry| entry.path == path)
	}

	pub fn contains_path(&self, path: &Path) -> bool {
		self.entry(path).is_some()
	}

	/// Same event id with start times inside `window` of each other
	pub fn matches(&self, other: &MotionEvent, window: chrono::Duration) -> EventMatch {
		let ours = &self.identity;
		let theirs = &other.identity;
		let same_event = ours.correlated
			&& theirs.correlated
			&& ours.event_id == theirs.event_id
			&& (ours.start_time - theirs.start_time).abs() < window;

		EventMatch { same_event, other_is_earlier: theirs.start_time < ours.start_time }
	}

	/// Absorb an aggregate believed to be the same event. The earlier
	/// identity wins; entries are unioned under the registration rules.
	pub fn merge(&mut self, other: MotionEvent) {
		if other.identity.correlated && other.identity.start_time < self.identity.start_time {
			debug!(
				"Event {} adopts earlier start {} from {}",
				self.id, other.identity.start_time, other.id
			);
			self.identity = other.identity;
		}
		for entry in other.entries {
			self.absorb(entry);
		}
	}

	/// Register `path` for `action`. Returns false when nothing changed.
	pub fn add_entry(
		&mut self, path: &Path, action: FileAction, retention: chrono::Duration,
	) -> bool {
		self.add_entry_at(path, action, retention, Utc::now())
	}

	pub fn add_entry_at(
		&mut self, path: &Path, action: FileAction, retention: chrono::Duration,
		now: DateTime<Utc>,
	) -> bool {
		self.absorb(RegisteredEntry::new(path.to_path_buf(), action, retention, now))
	}

	// Only a remove may be replaced, and only by a move.
	fn absorb(&mut self, incoming: RegisteredEntry) -> bool {
		match self.entries.iter_mut().find(|entry| entry.path == incoming.path) {
			Some(existing)
				if existing.action == FileAction::Remove && incoming.action.is_move() =>
			{
				debug!("Upgrading {} from remove to move", incoming.path.display());
				*existing = incoming;
				true
			}
			Some(_) => false,
			None => {
				self.entries.push(incoming);
				true
			}
		}
	}

	pub fn is_eligible(&self) -> bool {
		self.is_eligible_at(Utc::now())
	}

	/// Every entry's retention has elapsed
	pub fn is_eligible_at(&self, now: DateTime<Utc>) -> bool {
		self.entries.iter().all(|entry| entry.is_eligible_at(now))
	}

	/// Every entry either succeeded or ran out of attempts
	pub fn is_resolved(&self) -> bool {
		self.entries.iter().all(|entry| entry.is_resolved(self.max_attempts))
	}

	pub fn exhausted_entries(&self) -> Vec<&RegisteredEntry> {
		self.entries
			.iter()
			.filter(|entry| entry.is_exhausted(self.max_attempts))
			.collect()
	}

	/// Move if anything asked for a move, otherwise remove. Move entries that
	/// disagree on the folder fall back to the default folder.
	pub fn intent(&self) -> FileAction {
		let mut folders = self.entries.iter().filter_map(|entry| match entry.action {
			FileAction::Move { folder } => Some(folder),
			FileAction::Remove => None,
		});

		let Some(first) = folders.next() else {
			return FileAction::Remove;
		};
		if folders.all(|folder| folder == first) {
			FileAction::Move { folder: first }
		} else {
			debug!("Event {} has conflicting folders, using default", self.id);
			FileAction::Move { folder: None }
		}
	}

	/// Apply the event-wide intent to pending entries and discovered
	/// companions. A no-op while retention is pending and
	/// `enforce_eligibility` is set. A companion that fails becomes an entry
	/// of its own, so it shares the retry budget and keeps the event open.
	pub async fn execute(
		&mut self, actions: &dyn EventActions, enforce_eligibility: bool,
	) -> ExecuteOutcome {
		if enforce_eligibility && !self.is_eligible() {
			return ExecuteOutcome::Skipped;
		}

		let intent = self.intent();
		let pending: Vec<(usize, PathBuf)> = self
			.entries
			.iter()
			.enumerate()
			.filter(|(_, entry)| !entry.is_resolved(self.max_attempts))
			.map(|(index, entry)| (index, entry.path.clone()))
			.collect();

		let companions: Vec<PathBuf> = actions
			.companions(&self.identity)
			.await
			.into_iter()
			.filter(|path| !self.contains_path(path))
			.collect();

		let identity = &self.identity;
		let (entry_results, companion_results) = futures::join!(
			join_all(pending.iter().map(|(_, path)| apply(actions, intent, identity, path))),
			join_all(companions.iter().map(|path| apply(actions, intent, identity, path))),
		);

		let mut succeeded = 0;
		let mut failed = 0;
		for ((index, _), ok) in pending.iter().zip(entry_results) {
			let entry = &mut self.entries[*index];
			entry.attempts += 1;
			entry.succeeded = ok;
			if ok {
				succeeded += 1;
			} else {
				failed += 1;
				debug!(
					"{} failed attempt {} of {}",
					entry.path.display(),
					entry.attempts,
					self.max_attempts
				);
			}
		}
		let discovered = companions.len();
		let now = Utc::now();
		for (path, ok) in companions.into_iter().zip(companion_results) {
			if ok {
				succeeded += 1;
				continue;
			}
			failed += 1;
			debug!("Companion {} failed, tracking it with event {}", path.display(), self.id);
			let mut entry = RegisteredEntry::new(path, intent, chrono::Duration::zero(), now);
			entry.attempts = 1;
			self.entries.push(entry);
		}

		ExecuteOutcome::Actioned { intent, succeeded, failed, companions: discovered }
	}

	pub fn to_json(&self) -> serde_json::Result<String> {
		serde_json::to_string_pretty(self)
	}
}

async fn apply(
	actions: &dyn EventActions, intent: FileAction, identity: &EventIdentity, path: &Path,
) -> bool {
	match intent {
		FileAction::Move { folder } => actions.move_file(path, identity, folder).await,
		FileAction::Remove => actions.remove_file(path).await,
	}
}
