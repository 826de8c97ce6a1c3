//! Archiver configuration
//!
//! [`ArchiveConfig`] and [`TriggerConfig`] arrive per trigger from the caller
//! and are read-only here. [`ArchiverConfig`] is the process-wide tuning for
//! correlation, discovery and the background pass.

use crate::error::{ArchiveError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound for the event window and the capture lead-in
pub const MAX_EVENT_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Per-trigger archive settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct ArchiveConfig {
	pub enabled: bool,
	/// Minimum time a file sits before it may be archived or removed
	pub retention_secs: u64,
	/// Send partial matches to the maybeMatched folder instead of removing them
	pub semi_match_enabled: bool,
}

impl ArchiveConfig {
	pub fn enabled_with_retention(retention_secs: u64) -> Self {
		Self { enabled: true, retention_secs, semi_match_enabled: false }
	}

	pub fn retention(&self) -> chrono::Duration {
		i64::try_from(self.retention_secs)
			.ok()
			.and_then(chrono::Duration::try_seconds)
			.unwrap_or(chrono::Duration::MAX)
	}
}

/// The slice of a trigger's configuration the archiver consumes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TriggerConfig {
	pub name: String,
	#[serde(default)]
	pub archive: Option<ArchiveConfig>,
}

impl TriggerConfig {
	/// Archive settings, only when present and enabled
	pub fn active_archive(&self) -> Option<&ArchiveConfig> {
		self.archive.as_ref().filter(|archive| archive.enabled)
	}
}

/// Process-wide archiver configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ArchiverConfig {
	/// Root under which `archive/` and `maybeMatched/` are created
	pub storage_root: PathBuf,

	/// Auxiliary directory holding annotated images (defaults to
	/// `<storage_root>/annotations`)
	pub annotations_dir: Option<PathBuf>,

	/// Delay between the end of one background pass and the start of the next
	#[serde(with = "duration_secs")]
	pub tick_interval: Duration,

	/// Attempts an entry gets before it is considered permanently failed
	pub max_attempts: u32,

	/// How far before the filename timestamp an event is assumed to start
	#[serde(with = "duration_secs")]
	pub lead_in: Duration,

	/// Longest time span a single motion event may cover
	#[serde(with = "duration_secs")]
	pub longest_event_duration: Duration,

	/// Markers appended to an event id by variant files (e.g. annotated copies)
	pub postfix_markers: Vec<String>,

	/// Extensions of companion media (video clips, stills)
	pub media_extensions: Vec<String>,
}

impl ArchiverConfig {
	/// Default configuration rooted at `storage_root`
	pub fn with_storage_root(storage_root: PathBuf) -> Self {
		Self { storage_root, ..Default::default() }
	}

	/// Load from a JSON file; missing keys take their defaults
	pub fn from_json_file(path: &Path) -> Result<Self> {
		let raw = std::fs::read_to_string(path)
			.map_err(|err| ArchiveError::file_operation("read_config", path, err))?;
		let config: Self = serde_json::from_str(&raw)?;
		config.validate()?;
		Ok(config)
	}

	pub fn annotations_dir(&self) -> PathBuf {
		self.annotations_dir
			.clone()
			.unwrap_or_else(|| self.storage_root.join("annotations"))
	}

	pub fn lead_in_delta(&self) -> chrono::Duration {
		chrono::Duration::from_std(self.lead_in).unwrap_or(chrono::Duration::MAX)
	}

	pub fn event_window(&self) -> chrono::Duration {
		chrono::Duration::from_std(self.longest_event_duration).unwrap_or(chrono::Duration::MAX)
	}

	/// Validate configuration parameters
	pub fn validate(&self) -> Result<()> {
		if self.tick_interval.is_zero() {
			return Err(ArchiveError::configuration_error(
				"tick_interval",
				"must be greater than 0",
				"> 0s",
				"0s",
			));
		}

		if self.max_attempts == 0 {
			return Err(ArchiveError::configuration_error(
				"max_attempts",
				"every entry needs at least one attempt",
				">= 1",
				"0",
			));
		}

		if self.longest_event_duration.as_secs() == 0 {
			return Err(ArchiveError::configuration_error(
				"longest_event_duration",
				"window must span at least one second",
				">= 1s",
				&format!("{:?}", self.longest_event_duration),
			));
		}

		if self.longest_event_duration > MAX_EVENT_WINDOW {
			return Err(ArchiveError::configuration_error(
				"longest_event_duration",
				"companion discovery scans every second of the window",
				&format!("<= {:?}", MAX_EVENT_WINDOW),
				&format!("{:?}", self.longest_event_duration),
			));
		}

		if self.lead_in >= self.longest_event_duration {
			return Err(ArchiveError::configuration_error(
				"lead_in",
				"must be shorter than the event window",
				&format!("< {:?}", self.longest_event_duration),
				&format!("{:?}", self.lead_in),
			));
		}

		if self.media_extensions.is_empty() {
			return Err(ArchiveError::configuration_error(
				"media_extensions",
				"companion discovery needs at least one extension",
				"non-empty list",
				"[]",
			));
		}

		Ok(())
	}
}

impl Default for ArchiverConfig {
	fn default() -> Self {
		Self {
			storage_root: std::env::temp_dir().join("motion_archiver"),
			annotations_dir: None,
			tick_interval: Duration::from_secs(6),
			max_attempts: 3,
			lead_in: Duration::from_secs(3),
			longest_event_duration: Duration::from_secs(13),
			postfix_markers: vec!["annotated_".to_string()],
			media_extensions: vec!["mp4".to_string(), "jpg".to_string()],
		}
	}
}

mod duration_secs {
	use serde::{Deserialize, Deserializer, Serializer};
	use std::time::Duration;

	pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_u64(value.as_secs())
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
		Ok(Duration::from_secs(u64::deserialize(deserializer)?))
	}
}
