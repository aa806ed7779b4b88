//! Download directory preparation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::completion::MARKER_FILE;

/// Creates `dir` if needed and reports archives left from an earlier run.
///
/// Leftovers are only logged; the archival step owns them. A stale
/// completion marker is removed so it cannot be mistaken for this run's.
pub fn prepare(dir: &Path) -> Result<Vec<PathBuf>> {
	std::fs::create_dir_all(dir).with_context(|| format!("failed to create download directory {}", dir.display()))?;

	let marker = dir.join(MARKER_FILE);
	if marker.exists() {
		std::fs::remove_file(&marker).with_context(|| format!("failed to remove stale marker {}", marker.display()))?;
	}

	let leftovers = leftover_archives(dir)?;
	if leftovers.is_empty() {
		info!(target: "backup", dir = %dir.display(), "download directory ready");
	} else {
		info!(target: "backup", dir = %dir.display(), count = leftovers.len(), "archives from a previous run are still present");
	}
	Ok(leftovers)
}

fn leftover_archives(dir: &Path) -> Result<Vec<PathBuf>> {
	let mut archives = Vec::new();
	for entry in std::fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))? {
		let path = entry?.path();
		let is_zip = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
		if is_zip && path.is_file() {
			archives.push(path);
		}
	}
	archives.sort();
	Ok(archives)
}
