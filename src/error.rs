use std::path::Path;
use thiserror::Error;

/// Core archiver error types
///
/// File primitives never surface these to callers of the scheduler; they are
/// logged and turned into a failed attempt. Everything else (startup,
/// configuration, shutdown) propagates with `?`.
#[derive(Error, Debug)]
pub enum ArchiveError {
	#[error("Notify error: {0}")]
	Notify(#[from] notify::Error),

	#[error("JSON serialization error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("Invalid path: {path}")]
	InvalidPath { path: String },

	#[error("File operation failed: {operation} on {path} - {cause}")]
	FileOperation {
		operation: String,
		path: String,
		cause: String,
		kind: Option<std::io::ErrorKind>,
	},

	#[error(
		"Configuration error: {parameter} - {reason} (expected: {expected}, actual: {actual})"
	)]
	ConfigurationError {
		parameter: String,
		reason: String,
		expected: String,
		actual: String,
	},

	#[error("Archive log not initialized")]
	NotInitialized,

	#[error("Background task failed: {0}")]
	TaskJoin(String),
}

impl ArchiveError {
	/// Get error category for logging
	pub fn category(&self) -> &'static str {
		match self {
			ArchiveError::Notify(_) => "notify",
			ArchiveError::Json(_) => "serialization",
			ArchiveError::InvalidPath { .. } => "configuration",
			ArchiveError::FileOperation { kind, .. } => match kind {
				Some(std::io::ErrorKind::NotFound) => "missing_file",
				Some(std::io::ErrorKind::PermissionDenied) => "permission",
				_ => "filesystem",
			},
			ArchiveError::ConfigurationError { .. } => "configuration",
			ArchiveError::NotInitialized => "initialization",
			ArchiveError::TaskJoin(_) => "shutdown",
		}
	}

	/// Wrap an I/O failure with the operation and path it happened on
	pub fn file_operation(operation: &str, path: &Path, err: std::io::Error) -> Self {
		ArchiveError::FileOperation {
			operation: operation.to_string(),
			path: path.display().to_string(),
			cause: err.to_string(),
			kind: Some(err.kind()),
		}
	}

	/// Create a configuration error
	pub fn configuration_error(
		parameter: &str, reason: &str, expected: &str, actual: &str,
	) -> Self {
		ArchiveError::ConfigurationError {
			parameter: parameter.to_string(),
			reason: reason.to_string(),
			expected: expected.to_string(),
			actual: actual.to_string(),
		}
	}
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
