// Integration tests for the self-rescheduling background pass

use motion_archiver::{ArchiveConfig, ArchiveLog, ArchiverConfig};
use std::time::Duration;

mod common;

fn fast_config(workspace: &common::TestWorkspace) -> ArchiverConfig {
	ArchiverConfig { tick_interval: Duration::from_millis(50), ..workspace.config() }
}

#[tokio::test]
async fn test_background_pass_archives_without_manual_tick() {
	let workspace = common::TestWorkspace::new();
	let log = ArchiveLog::new(fast_config(&workspace)).unwrap();
	log.initialize().await.unwrap();

	let capture = workspace.capture("cam1_20230101120000.jpg");
	log.register_archival(&capture, &ArchiveConfig::enabled_with_retention(0), None)
		.await;

	let destination = workspace.archived("archive/2023/01/01/cam1_/120000/cam1_20230101120000.jpg");
	let archived = common::wait_until(|| destination.exists(), Duration::from_secs(5)).await;
	assert!(archived, "background pass never archived the capture");
	assert!(!capture.exists());

	let drained = log.events().await.is_empty();
	assert!(drained);

	log.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_background_pass_gives_up_on_missing_files() {
	let workspace = common::TestWorkspace::new();
	let log = ArchiveLog::new(fast_config(&workspace)).unwrap();
	log.initialize().await.unwrap();

	// Registered but never written, so every attempt fails
	let ghost = workspace.incoming.join("cam1_20230101120000.jpg");
	log.register_removal(&ghost, &ArchiveConfig::enabled_with_retention(0))
		.await;

	let mut evicted = false;
	for _ in 0..100 {
		if log.events().await.is_empty() {
			evicted = true;
			break;
		}
		tokio::time::sleep(Duration::from_millis(25)).await;
	}
	assert!(evicted, "exhausted event was never evicted");

	log.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_stops_background_pass() {
	let workspace = common::TestWorkspace::new();
	let log = ArchiveLog::new(fast_config(&workspace)).unwrap();
	log.initialize().await.unwrap();
	log.shutdown().await.unwrap();

	let capture = workspace.capture("cam1_20230101120000.jpg");
	log.register_archival(&capture, &ArchiveConfig::enabled_with_retention(0), None)
		.await;
	tokio::time::sleep(Duration::from_millis(300)).await;

	assert!(capture.exists());
	assert_eq!(log.events().await.len(), 1);
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
	let workspace = common::TestWorkspace::new();
	let config = ArchiverConfig { tick_interval: Duration::ZERO, ..workspace.config() };
	assert!(ArchiveLog::new(config).is_err());
}
