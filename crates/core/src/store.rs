//! Session token persistence.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use backup_protocol::SessionToken;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{BackupError, Result};

/// Durable home of the session token between runs.
///
/// `load` returning `Ok(None)` is the normal first-run state, not an error.
/// `save` always replaces whatever was stored before.
pub trait SessionStore {
	fn load(&self) -> Result<Option<SessionToken>>;

	fn save(&self, token: &SessionToken) -> Result<()>;
}

/// JSON session file at a fixed path.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
	path: PathBuf,
}

impl FileSessionStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Removes the session file if present.
	pub fn clear(&self) -> Result<bool> {
		match fs::remove_file(&self.path) {
			Ok(()) => Ok(true),
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
			Err(err) => Err(self.store_error(err)),
		}
	}

	fn store_error(&self, source: std::io::Error) -> BackupError {
		BackupError::SessionStore {
			path: self.path.clone(),
			source,
		}
	}

	fn write_private(&self, bytes: &[u8]) -> std::io::Result<()> {
		if let Some(parent) = self.path.parent() {
			if !parent.as_os_str().is_empty() {
				fs::create_dir_all(parent)?;
			}
		}

		let mut tmp_name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
		tmp_name.push(".tmp");
		let tmp = self.path.with_file_name(tmp_name);

		let mut options = fs::OpenOptions::new();
		options.write(true).create(true).truncate(true);
		#[cfg(unix)]
		std::os::unix::fs::OpenOptionsExt::mode(&mut options, 0o600);

		let mut file = options.open(&tmp)?;
		file.write_all(bytes)?;
		file.sync_all()?;
		drop(file);

		fs::rename(&tmp, &self.path)
	}
}

impl SessionStore for FileSessionStore {
	fn load(&self) -> Result<Option<SessionToken>> {
		let content = match fs::read_to_string(&self.path) {
			Ok(content) => content,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
				info!(target: "backup.store", path = %self.path.display(), "no saved session");
				return Ok(None);
			}
			Err(err) => {
				warn!(target: "backup.store", path = %self.path.display(), error = %err, "saved session unreadable; ignoring");
				return Ok(None);
			}
		};

		match serde_json::from_str::<SessionToken>(&content) {
			Ok(token) => {
				debug!(target: "backup.store", path = %self.path.display(), cookies = token.len(), "loaded session");
				Ok(Some(token))
			}
			Err(err) => {
				warn!(target: "backup.store", path = %self.path.display(), error = %err, "saved session is corrupt; ignoring");
				Ok(None)
			}
		}
	}

	fn save(&self, token: &SessionToken) -> Result<()> {
		let json = serde_json::to_string_pretty(token)?;
		self.write_private(json.as_bytes()).map_err(|err| self.store_error(err))?;
		info!(target: "backup.store", path = %self.path.display(), cookies = token.len(), "session saved");
		Ok(())
	}
}

/// In-process store; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
	token: Mutex<Option<SessionToken>>,
	saves: Mutex<usize>,
}

impl MemorySessionStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_token(token: SessionToken) -> Self {
		Self {
			token: Mutex::new(Some(token)),
			saves: Mutex::new(0),
		}
	}

	/// Number of `save` calls observed.
	pub fn save_count(&self) -> usize {
		*self.saves.lock()
	}
}

impl SessionStore for MemorySessionStore {
	fn load(&self) -> Result<Option<SessionToken>> {
		Ok(self.token.lock().clone())
	}

	fn save(&self, token: &SessionToken) -> Result<()> {
		*self.token.lock() = Some(token.clone());
		*self.saves.lock() += 1;
		Ok(())
	}
}

impl<S: SessionStore + ?Sized> SessionStore for &S {
	fn load(&self) -> Result<Option<SessionToken>> {
		(**self).load()
	}

	fn save(&self, token: &SessionToken) -> Result<()> {
		(**self).save(token)
	}
}
