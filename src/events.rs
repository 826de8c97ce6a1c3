use serde::{Deserialize, Serialize};

/// Top-level destination folder under the storage root
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveFolder {
	/// Detections that fully matched their trigger
	#[default]
	Archive,
	/// Detections that only partially matched (masked, low confidence)
	MaybeMatched,
}

impl ArchiveFolder {
	pub fn dir_name(&self) -> &'static str {
		match self {
			ArchiveFolder::Archive => "archive",
			ArchiveFolder::MaybeMatched => "maybeMatched",
		}
	}
}

/// What should eventually happen to a registered file
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FileAction {
	/// Copy into the archive then delete the original. `None` means the
	/// default archive folder.
	Move { folder: Option<ArchiveFolder> },
	/// Delete the original
	Remove,
}

impl FileAction {
	pub fn is_move(&self) -> bool {
		matches!(self, FileAction::Move { .. })
	}
}

/// How a detection related to the trigger that fired for it
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
	Matched,
	SemiMatched,
	Unmatched,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_folder_names() {
		assert_eq!(ArchiveFolder::Archive.dir_name(), "archive");
		assert_eq!(ArchiveFolder::MaybeMatched.dir_name(), "maybeMatched");
		assert_eq!(ArchiveFolder::default(), ArchiveFolder::Archive);
	}

	#[test]
	fn test_action_helpers() {
		let archive = FileAction::Move { folder: Some(ArchiveFolder::MaybeMatched) };
		assert!(archive.is_move());
		assert!(!FileAction::Remove.is_move());
	}

	#[test]
	fn test_action_serialization() {
		let json = serde_json::to_string(&FileAction::Move { folder: None }).unwrap();
		assert!(json.contains("\"action\":\"move\""));

		let parsed: FileAction = serde_json::from_str(r#"{"action":"remove"}"#).unwrap();
		assert_eq!(parsed, FileAction::Remove);
	}
}
