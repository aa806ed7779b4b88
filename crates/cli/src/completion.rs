//! End-of-batch marker consumed by the archival step.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use backup::{BatchReport, BatchSummary, CompletionSink};
use serde::Serialize;
use tracing::info;

/// Marker file name written into the download directory.
pub const MARKER_FILE: &str = ".backup-complete.json";

#[derive(Debug, Serialize)]
struct Marker<'a> {
	finished_at: u64,
	download_dir: &'a Path,
	#[serde(flatten)]
	summary: BatchSummary,
}

/// Writes [`MARKER_FILE`] once the browser has stopped producing downloads.
#[derive(Debug, Clone)]
pub struct MarkerFile {
	download_dir: PathBuf,
}

impl MarkerFile {
	pub fn new(download_dir: impl Into<PathBuf>) -> Self {
		Self {
			download_dir: download_dir.into(),
		}
	}

	pub fn path(&self) -> PathBuf {
		self.download_dir.join(MARKER_FILE)
	}
}

impl CompletionSink for MarkerFile {
	fn complete(&self, report: &BatchReport) -> backup::Result<()> {
		let marker = Marker {
			finished_at: now_ts(),
			download_dir: &self.download_dir,
			summary: report.summary(),
		};
		let path = self.path();
		std::fs::write(&path, serde_json::to_string_pretty(&marker)?)?;
		info!(target: "backup", path = %path.display(), "completion marker written");
		Ok(())
	}
}

fn now_ts() -> u64 {
	SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
	use backup::{ExtractionOutcome, ProjectLink};
	use tempfile::TempDir;

	use super::*;

	#[test]
	fn marker_records_counts_and_failures() {
		let temp = TempDir::new().unwrap();
		let sink = MarkerFile::new(temp.path());
		let report = BatchReport {
			entries: vec![
				(ProjectLink::new("https://example.com/p/1"), ExtractionOutcome::Success),
				(ProjectLink::new("https://example.com/p/2"), ExtractionOutcome::Failure("menu missing".into())),
			],
			enumeration_error: None,
		};

		sink.complete(&report).unwrap();

		let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(sink.path()).unwrap()).unwrap();
		assert_eq!(written["total"], 2);
		assert_eq!(written["succeeded"], 1);
		assert_eq!(written["failed"], 1);
		assert_eq!(written["failures"][0]["reason"], "menu missing");
		assert!(written["finished_at"].as_u64().unwrap() > 0);
	}

	#[test]
	fn missing_directory_is_reported() {
		let temp = TempDir::new().unwrap();
		let sink = MarkerFile::new(temp.path().join("gone"));
		assert!(sink.complete(&BatchReport::default()).is_err());
	}
}
