//! Companion file discovery
//!
//! Sweeps up files that belong to a motion event without having been
//! registered: the video clip recorded alongside a still, annotated variants,
//! and annotated images written to the auxiliary annotations directory.
//! The search is brute force over directories, postfixes, seconds of the
//! event window and media extensions; the space is a few dozen candidates.

use crate::config::ArchiverConfig;
use crate::file_ops::FileStore;
use crate::identity::{EventIdentity, TIMESTAMP_FORMAT};
use futures::future::join_all;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
	/// A fully known path, checked with a stat
	Exact(PathBuf),
	/// Any file in `dir` whose name starts with `prefix` and has `extension`
	Pattern { dir: PathBuf, prefix: String, extension: String },
}

impl Candidate {
	fn matches(&self, path: &Path) -> bool {
		match self {
			Candidate::Exact(candidate) => candidate == path,
			Candidate::Pattern { dir, prefix, extension } => {
				path.parent() == Some(dir.as_path())
					&& path.extension().and_then(|e| e.to_str()) == Some(extension.as_str())
					&& path
						.file_name()
						.and_then(|n| n.to_str())
						.is_some_and(|name| name.starts_with(prefix.as_str()))
			}
		}
	}
}

#[derive(Debug, Clone)]
pub struct CompanionDiscovery {
	annotations_dir: PathBuf,
	postfix_markers: Vec<String>,
	media_extensions: Vec<String>,
	window_secs: i64,
}

impl CompanionDiscovery {
	pub fn new(
		annotations_dir: PathBuf, postfix_markers: Vec<String>, media_extensions: Vec<String>,
		window_secs: i64,
	) -> Self {
		Self { annotations_dir, postfix_markers, media_extensions, window_secs }
	}

	pub fn from_config(config: &ArchiverConfig) -> Self {
		Self::new(
			config.annotations_dir(),
			config.postfix_markers.clone(),
			config.media_extensions.clone(),
			i64::try_from(config.longest_event_duration.as_secs()).unwrap_or(i64::MAX),
		)
	}

	/// Every path or pattern that could hold a file of this event
	pub fn candidates(&self, identity: &EventIdentity) -> Vec<Candidate> {
		if !identity.correlated {
			return Vec::new();
		}

		let postfixes: Vec<&str> = std::iter::once("")
			.chain(self.postfix_markers.iter().map(String::as_str))
			.collect();

		let mut candidates = Vec::new();
		for dir in [&identity.base_dir, &self.annotations_dir] {
			let exact = dir == &identity.base_dir;
			for postfix in &postfixes {
				for offset in 0..self.window_secs {
					let Some(time) = chrono::Duration::try_seconds(offset)
						.and_then(|delta| identity.start_time.checked_add_signed(delta))
					else {
						break;
					};
					let stamp = time.format(TIMESTAMP_FORMAT);
					let prefix = format!("{}{}{}", identity.event_id, postfix, stamp);
					for extension in &self.media_extensions {
						candidates.push(if exact {
							Candidate::Exact(dir.join(format!("{prefix}.{extension}")))
						} else {
							Candidate::Pattern {
								dir: dir.clone(),
								prefix: prefix.clone(),
								extension: extension.clone(),
							}
						});
					}
				}
			}
		}
		candidates
	}

	/// Existing files belonging to the event, de-duplicated and sorted
	pub async fn discover(&self, identity: &EventIdentity, store: &dyn FileStore) -> Vec<PathBuf> {
		let candidates = self.candidates(identity);
		let mut found = BTreeSet::new();

		let exact: Vec<&PathBuf> = candidates
			.iter()
			.filter_map(|candidate| match candidate {
				Candidate::Exact(path) => Some(path),
				Candidate::Pattern { .. } => None,
			})
			.collect();
		let checks = join_all(exact.iter().map(|path| store.exists(path))).await;
		for (path, exists) in exact.into_iter().zip(checks) {
			if exists {
				found.insert(path.clone());
			}
		}

		let mut listings: HashMap<PathBuf, Vec<PathBuf>> = HashMap::new();
		for candidate in &candidates {
			let Candidate::Pattern { dir, .. } = candidate else {
				continue;
			};
			if !listings.contains_key(dir) {
				let files = store.list_dir(dir).await;
				listings.insert(dir.clone(), files);
			}
			if let Some(files) = listings.get(dir) {
				found.extend(files.iter().filter(|file| candidate.matches(file)).cloned());
			}
		}

		found.into_iter().collect()
	}
}
