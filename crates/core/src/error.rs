//! Error taxonomy for the backup core.
//!
//! Errors fall into three groups:
//!
//! - Fatal: login timeouts, missing credentials, rejected logins and session
//!   store writes. These abort the run before any extraction happens.
//! - Per-item: anything raised while extracting a single project. The
//!   extraction worker converts these into a failed outcome.
//! - Noise: an absent or unreadable session file. These are logged and
//!   never surface as errors.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackupError {
	#[error("timed out after {ms}ms waiting for {condition}")]
	Timeout { condition: String, ms: u64 },

	#[error("navigation to {url} failed: {message}")]
	Navigation { url: String, message: String },

	#[error("browser error: {0}")]
	Browser(String),

	#[error("credentials are required for interactive login but none were configured")]
	MissingCredentials,

	#[error("login failed: {0}")]
	Login(String),

	#[error("session store at {path} failed: {source}")]
	SessionStore {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("invalid url {url}: {source}")]
	Url {
		url: String,
		#[source]
		source: url::ParseError,
	},

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl BackupError {
	pub fn is_timeout(&self) -> bool {
		matches!(self, Self::Timeout { .. })
	}
}

pub type Result<T> = std::result::Result<T, BackupError>;
