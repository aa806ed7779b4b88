//! Run configuration: JSON file, then command-line overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use backup::{Credentials, SiteConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cli::RunArgs;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "backup.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
	#[serde(flatten)]
	pub site: SiteConfig,
	pub session_file: PathBuf,
	pub download_dir: PathBuf,
	pub headless: bool,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			site: SiteConfig::default(),
			session_file: PathBuf::from("cookies.json"),
			download_dir: PathBuf::from("work"),
			headless: true,
		}
	}
}

impl Config {
	/// Loads `explicit`, or `backup.json` in the working directory, or defaults.
	///
	/// An explicitly named file must exist; the implicit one is optional.
	pub fn load(explicit: Option<&Path>) -> Result<Self> {
		match explicit {
			Some(path) => Self::from_file(path),
			None => {
				let implicit = Path::new(DEFAULT_CONFIG_FILE);
				if implicit.exists() {
					Self::from_file(implicit)
				} else {
					debug!(target: "backup", "no config file; using defaults");
					Ok(Self::default())
				}
			}
		}
	}

	pub fn from_file(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path).with_context(|| format!("failed to read config file {}", path.display()))?;
		let config = serde_json::from_str(&content).with_context(|| format!("invalid config file {}", path.display()))?;
		debug!(target: "backup", path = %path.display(), "config loaded");
		Ok(config)
	}

	pub fn with_session_file(mut self, session_file: Option<PathBuf>) -> Self {
		if let Some(path) = session_file {
			self.session_file = path;
		}
		self
	}

	/// Applies `run` flags on top of the file values.
	pub fn apply_run_args(mut self, args: &RunArgs) -> Self {
		if let Some(url) = &args.landing_url {
			self.site.landing_url = url.clone();
		}
		if let Some(dir) = &args.download_dir {
			self.download_dir = dir.clone();
		}
		if args.headed {
			self.headless = false;
		}
		if let Some(secs) = args.timeout_secs {
			self.site.wait = self.site.wait.with_timeout(Duration::from_secs(secs));
		}
		self
	}
}

/// Credentials from flags or the environment; both halves or nothing.
pub fn credentials(args: &RunArgs) -> Option<Credentials> {
	match (&args.email, &args.password) {
		(Some(identity), Some(secret)) if !identity.is_empty() && !secret.is_empty() => Some(Credentials::new(identity, secret)),
		_ => None,
	}
}
