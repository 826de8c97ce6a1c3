//! Motion-event identity derived from capture filenames
//!
//! Capture files are named `<prefix>_<YYYYMMDDHHmmss>.<ext>`. The prefix
//! (including its trailing underscore, minus any postfix marker) names the
//! event source, the timestamp dates the capture.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";
const TIMESTAMP_LEN: usize = 14;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventIdentity {
	pub event_id: String,
	/// Timestamp embedded in the filename
	pub captured_at: NaiveDateTime,
	/// `captured_at` minus the capture lead-in
	pub start_time: NaiveDateTime,
	pub base_dir: PathBuf,
	/// False for files whose name carried no timestamp; such identities
	/// never correlate with anything else
	pub correlated: bool,
}

impl EventIdentity {
	/// Identity for a file that could not be resolved from its name
	pub fn standalone(path: &Path, registered_at: NaiveDateTime) -> Self {
		let event_id = path
			.file_stem()
			.map(|stem| stem.to_string_lossy().into_owned())
			.unwrap_or_default();

		Self {
			event_id,
			captured_at: registered_at,
			start_time: registered_at,
			base_dir: parent_dir(path),
			correlated: false,
		}
	}
}

#[derive(Debug, Clone)]
pub struct IdentityResolver {
	postfix_markers: Vec<String>,
	lead_in: chrono::Duration,
}

impl IdentityResolver {
	pub fn new(postfix_markers: Vec<String>, lead_in: chrono::Duration) -> Self {
		Self { postfix_markers, lead_in }
	}

	/// Resolve the event a capture file belongs to. `None` when the name has
	/// no parseable timestamp before the extension, or the lead-in pushes the
	/// start time out of range.
	pub fn resolve(&self, path: &Path) -> Option<EventIdentity> {
		let stem = path.file_stem()?.to_str()?;
		let (prefix, stamp) = stem.rsplit_once('_')?;

		if stamp.len() != TIMESTAMP_LEN || !stamp.bytes().all(|b| b.is_ascii_digit()) {
			return None;
		}
		let captured_at = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()?;
		let start_time = captured_at.checked_sub_signed(self.lead_in)?;

		Some(EventIdentity {
			event_id: self.strip_markers(format!("{prefix}_")),
			captured_at,
			start_time,
			base_dir: parent_dir(path),
			correlated: true,
		})
	}

	fn strip_markers(&self, mut event_id: String) -> String {
		for marker in &self.postfix_markers {
			if !marker.is_empty() && event_id.len() > marker.len() && event_id.ends_with(marker) {
				event_id.truncate(event_id.len() - marker.len());
			}
		}
		event_id
	}
}

fn parent_dir(path: &Path) -> PathBuf {
	path.parent().map(Path::to_path_buf).unwrap_or_default()
}
