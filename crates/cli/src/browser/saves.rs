//! Bookkeeping for download saves still in flight.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::Notify;

/// Counts saves that have started but not finished.
///
/// Download handlers run detached from the page, so the browser must not be
/// closed until [`PendingSaves::drain`] reports every save finished.
#[derive(Debug, Clone, Default)]
pub(crate) struct PendingSaves {
	inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
	active: AtomicUsize,
	idle: Notify,
}

/// Marks one save as finished when dropped.
#[derive(Debug)]
pub(crate) struct SaveGuard {
	inner: Arc<Inner>,
}

impl Drop for SaveGuard {
	fn drop(&mut self) {
		if self.inner.active.fetch_sub(1, Ordering::AcqRel) == 1 {
			self.inner.idle.notify_waiters();
		}
	}
}

impl PendingSaves {
	pub(crate) fn begin(&self) -> SaveGuard {
		self.inner.active.fetch_add(1, Ordering::AcqRel);
		SaveGuard {
			inner: Arc::clone(&self.inner),
		}
	}

	pub(crate) fn active(&self) -> usize {
		self.inner.active.load(Ordering::Acquire)
	}

	/// Waits until no save is in flight, for at most `timeout`.
	///
	/// Returns the number of saves still running when the time ran out.
	pub(crate) async fn drain(&self, timeout: Duration) -> usize {
		let wait = async {
			loop {
				let notified = self.inner.idle.notified();
				if self.active() == 0 {
					return;
				}
				notified.await;
			}
		};
		match tokio::time::timeout(timeout, wait).await {
			Ok(()) => 0,
			Err(_) => self.active(),
		}
	}
}
