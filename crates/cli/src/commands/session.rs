//! Session file inspection.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use backup::{CookieRecord, FileSessionStore, SessionStore, SessionToken};
use serde::Serialize;

/// What `session show` reports about the saved session.
#[derive(Debug, Serialize)]
pub struct SessionOverview {
	pub path: PathBuf,
	pub saved: bool,
	pub expired: usize,
	pub cookies: Vec<CookieStatus>,
}

/// One cookie, without its value.
#[derive(Debug, PartialEq, Serialize)]
pub struct CookieStatus {
	pub name: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub domain: Option<String>,
	#[serde(flatten)]
	pub lifetime: Lifetime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "lifetime", rename_all = "snake_case")]
pub enum Lifetime {
	/// Dropped when the browser closes.
	Session,
	Expired,
	Remaining { seconds: u64 },
}

impl Lifetime {
	fn at(expires: Option<f64>, now: u64) -> Self {
		match expires {
			Some(ts) if ts >= 0.0 => {
				let ts = ts as u64;
				if ts <= now { Self::Expired } else { Self::Remaining { seconds: ts - now } }
			}
			_ => Self::Session,
		}
	}
}

impl fmt::Display for Lifetime {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let seconds = match self {
			Self::Session => return f.write_str("until browser exit"),
			Self::Expired => return f.write_str("expired"),
			Self::Remaining { seconds } => *seconds,
		};
		let (days, hours, minutes) = (seconds / 86_400, seconds % 86_400 / 3600, seconds % 3600 / 60);
		match (days, hours, minutes) {
			(0, 0, 0) => f.write_str("expires in <1m"),
			(0, 0, m) => write!(f, "expires in {m}m"),
			(0, h, m) => write!(f, "expires in {h}h {m}m"),
			(d, h, _) => write!(f, "expires in {d}d {h}h"),
		}
	}
}

impl SessionOverview {
	pub fn new(path: &Path, token: Option<&SessionToken>, now: u64) -> Self {
		let cookies: Vec<CookieStatus> = token
			.map(|t| t.cookies().iter().map(|c| CookieStatus::new(c, now)).collect())
			.unwrap_or_default();
		Self {
			path: path.to_path_buf(),
			saved: token.is_some(),
			expired: cookies.iter().filter(|c| c.lifetime == Lifetime::Expired).count(),
			cookies,
		}
	}
}

impl CookieStatus {
	fn new(cookie: &CookieRecord, now: u64) -> Self {
		Self {
			name: cookie.name.clone(),
			domain: cookie.domain.clone(),
			lifetime: Lifetime::at(cookie.expires, now),
		}
	}
}

impl fmt::Display for SessionOverview {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if !self.saved {
			return writeln!(f, "No saved session at {}", self.path.display());
		}
		writeln!(f, "{} cookie(s) in {} ({} expired)", self.cookies.len(), self.path.display(), self.expired)?;
		for cookie in &self.cookies {
			writeln!(f, "  {} @ {}: {}", cookie.name, cookie.domain.as_deref().unwrap_or("-"), cookie.lifetime)?;
		}
		Ok(())
	}
}

/// Prints what the session file holds, as text or JSON.
pub fn show(path: &Path, json: bool) -> Result<()> {
	let token = FileSessionStore::new(path).load()?;
	let overview = SessionOverview::new(path, token.as_ref(), now_ts());
	if json {
		println!("{}", serde_json::to_string_pretty(&overview)?);
	} else {
		print!("{overview}");
	}
	Ok(())
}

/// Deletes the session file so the next run logs in again.
pub fn clear(path: &Path) -> Result<()> {
	if FileSessionStore::new(path).clear()? {
		println!("Removed {}", path.display());
	} else {
		println!("No saved session at {}", path.display());
	}
	Ok(())
}

fn now_ts() -> u64 {
	SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}
