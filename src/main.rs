use clap::{Parser, ValueEnum};
use motion_archiver::{
	ArchiveConfig, ArchiveLog, ArchiverConfig, FileSystemWatcher, MatchOutcome, TriggerConfig,
	WatcherConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Disposition {
	/// Archive every capture
	Archive,
	/// Treat every capture as a partial match
	SemiMatch,
	/// Remove every capture once retention elapses
	Discard,
}

#[derive(Parser)]
#[command(name = "archiver")]
#[command(
	about = "Archives or discards motion-camera captures together with their companion files"
)]
struct Cli {
	/// Directory the camera pipeline writes captures into
	#[arg(short, long)]
	path: PathBuf,

	/// Root for archive/ and maybeMatched/ (overrides the config file)
	#[arg(short, long)]
	storage_root: Option<PathBuf>,

	/// JSON archiver configuration
	#[arg(short, long)]
	config: Option<PathBuf>,

	/// Seconds a capture is kept in place before it is actioned
	#[arg(long, default_value_t = 60)]
	retention: u64,

	/// Archive partial matches into maybeMatched/
	#[arg(long)]
	semi_match: bool,

	#[arg(short, long, value_enum, default_value_t = Disposition::Archive)]
	disposition: Disposition,

	/// Watch subdirectories too
	#[arg(short, long)]
	recursive: bool,

	/// Enable verbose logging
	#[arg(short, long)]
	verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();

	let level = if cli.verbose {
		Level::DEBUG
	} else {
		Level::INFO
	};
	tracing_subscriber::fmt().with_max_level(level).init();

	let mut config = match &cli.config {
		Some(path) => ArchiverConfig::from_json_file(path)?,
		None => ArchiverConfig::default(),
	};
	if let Some(storage_root) = cli.storage_root {
		config.storage_root = storage_root;
	}

	let archive_log = Arc::new(ArchiveLog::new(config)?);
	archive_log.initialize().await?;

	let outcome = match cli.disposition {
		Disposition::Archive => Some(MatchOutcome::Matched),
		Disposition::SemiMatch => Some(MatchOutcome::SemiMatched),
		Disposition::Discard => None,
	};
	let watcher_config = WatcherConfig {
		path: cli.path,
		recursive: cli.recursive,
		extensions: vec!["jpg".to_string()],
		trigger: TriggerConfig {
			name: "watch".to_string(),
			archive: Some(ArchiveConfig {
				enabled: true,
				retention_secs: cli.retention,
				semi_match_enabled: cli.semi_match,
			}),
		},
		outcome,
	};

	info!("Starting archiver for path: {:?}", watcher_config.path);
	let mut watcher = FileSystemWatcher::new(watcher_config, archive_log.clone())?;

	tokio::select! {
		result = watcher.start_watching() => result?,
		_ = tokio::signal::ctrl_c() => info!("Shutting down archiver..."),
	}

	let report = archive_log.shutdown().await?;
	info!("Final pass: {:?}", report);

	Ok(())
}
