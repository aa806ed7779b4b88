//! Polling waits with a bounded timeout.
//!
//! Every "wait until X is on the page" in the workflow goes through
//! [`wait_until`]; fixed sleeps are reserved for the few places where no
//! observable condition exists (see [`Settle`]).

use std::future::Future;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::browser::Browser;
use crate::error::{BackupError, Result};

/// Default timeout for a single wait (10 seconds).
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default polling interval (250ms).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Timeout and polling interval shared by every wait in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitPolicy {
	#[serde(with = "millis")]
	pub timeout: Duration,
	#[serde(with = "millis")]
	pub poll_interval: Duration,
}

impl Default for WaitPolicy {
	fn default() -> Self {
		Self {
			timeout: DEFAULT_WAIT_TIMEOUT,
			poll_interval: DEFAULT_POLL_INTERVAL,
		}
	}
}

impl WaitPolicy {
	pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
		Self { timeout, poll_interval }
	}

	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}

	pub fn timeout_ms(&self) -> u64 {
		u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
	}
}

/// Fixed delays used where the page gives no observable signal.
///
/// `after_navigation` covers asynchronous rendering of project pages; it is
/// a known brittleness and must be revisited if the page's render timing
/// changes. `after_download` lets a triggered download start before the
/// page is navigated away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settle {
	#[serde(with = "millis")]
	pub after_navigation: Duration,
	#[serde(with = "millis")]
	pub after_download: Duration,
}

impl Default for Settle {
	fn default() -> Self {
		Self {
			after_navigation: Duration::from_secs(2),
			after_download: Duration::from_secs(1),
		}
	}
}

impl Settle {
	pub fn none() -> Self {
		Self {
			after_navigation: Duration::ZERO,
			after_download: Duration::ZERO,
		}
	}
}

pub(crate) async fn pause(duration: Duration) {
	if !duration.is_zero() {
		tokio::time::sleep(duration).await;
	}
}

/// Deadline bookkeeping for one polling wait.
///
/// Drive it by feeding each check result to [`Poller::observe`] until it
/// reports completion or returns the timeout error.
pub struct Poller<'a> {
	policy: WaitPolicy,
	condition: &'a str,
	start: Instant,
	last_error: Option<BackupError>,
}

impl<'a> Poller<'a> {
	pub fn new(policy: WaitPolicy, condition: &'a str) -> Self {
		Self {
			policy,
			condition,
			start: Instant::now(),
			last_error: None,
		}
	}

	/// Records one check result.
	///
	/// Returns `Ok(true)` when the condition holds, sleeps one poll interval
	/// and returns `Ok(false)` while time remains, and fails with
	/// [`BackupError::Timeout`] once the deadline has passed. Check errors
	/// count as "not yet"; the last one is appended to the timeout error.
	pub async fn observe(&mut self, check: Result<bool>) -> Result<bool> {
		match check {
			Ok(true) => return Ok(true),
			Ok(false) => {}
			Err(err) => {
				trace!(target: "backup", condition = %self.condition, error = %err, "check failed");
				self.last_error = Some(err);
			}
		}

		if self.start.elapsed() >= self.policy.timeout {
			let condition = match self.last_error.take() {
				Some(err) => format!("{} (last error: {err})", self.condition),
				None => self.condition.to_string(),
			};
			return Err(BackupError::Timeout {
				condition,
				ms: self.policy.timeout_ms(),
			});
		}

		tokio::time::sleep(self.policy.poll_interval).await;
		Ok(false)
	}
}

/// Polls `check` until it yields `true` or `policy.timeout` elapses.
pub async fn wait_until<F, Fut>(policy: WaitPolicy, condition: &str, mut check: F) -> Result<()>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<bool>>,
{
	let mut poll = Poller::new(policy, condition);
	while !poll.observe(check().await).await? {}
	Ok(())
}

/// Waits until at least one element matches `selector`.
pub async fn wait_for_present<B: Browser>(browser: &mut B, selector: &str, policy: WaitPolicy) -> Result<()> {
	let condition = format!("selector {selector}");
	let mut poll = Poller::new(policy, &condition);
	loop {
		let present = browser.count(selector).await.map(|n| n > 0);
		if poll.observe(present).await? {
			return Ok(());
		}
	}
}

/// Waits until the first element matching `selector` is visible and enabled.
pub async fn wait_for_actionable<B: Browser>(browser: &mut B, selector: &str, policy: WaitPolicy) -> Result<()> {
	let condition = format!("actionable {selector}");
	let mut poll = Poller::new(policy, &condition);
	loop {
		let actionable = browser.is_actionable(selector).await;
		if poll.observe(actionable).await? {
			return Ok(());
		}
	}
}

mod millis {
	use std::time::Duration;

	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
		u64::deserialize(deserializer).map(Duration::from_millis)
	}
}
