mod archive_log;
mod config;
mod discovery;
mod error;
mod events;
mod file_ops;
mod identity;
mod layout;
mod motion_event;
#[cfg(test)]
mod test_helpers;
mod watcher;

pub use archive_log::{ArchiveLog, PassReport};
pub use config::{ArchiveConfig, ArchiverConfig, TriggerConfig};
pub use discovery::{Candidate, CompanionDiscovery};
pub use error::{ArchiveError, Result};
pub use events::{ArchiveFolder, FileAction, MatchOutcome};
pub use file_ops::{FileStore, LocalFileStore};
pub use identity::{EventIdentity, IdentityResolver, TIMESTAMP_FORMAT};
pub use layout::ArchiveLayout;
pub use motion_event::{EventActions, EventMatch, ExecuteOutcome, MotionEvent, RegisteredEntry};
pub use watcher::{FileSystemWatcher, WatcherConfig};
