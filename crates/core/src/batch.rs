//! Batch run over every discovered project.
//!
//! One enumeration, then one extraction per link, strictly in sequence on
//! the single session page. A failed link is logged and the loop moves on;
//! nothing below this point reaches the caller as an error.

use serde::Serialize;
use tracing::{error, info, warn};

use crate::browser::{Browser, BrowserSession};
use crate::error::Result;
use crate::extract::{ExtractionOutcome, ExtractionWorker};
use crate::links::{LinkEnumerator, ProjectLink};

/// Per-link outcomes of one run, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
	pub entries: Vec<(ProjectLink, ExtractionOutcome)>,
	/// Set when the landing page could not be enumerated.
	pub enumeration_error: Option<String>,
}

impl BatchReport {
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn succeeded(&self) -> usize {
		self.entries.iter().filter(|(_, outcome)| outcome.is_success()).count()
	}

	pub fn failed(&self) -> usize {
		self.len() - self.succeeded()
	}

	pub fn failures(&self) -> impl Iterator<Item = (&ProjectLink, &str)> {
		self.entries
			.iter()
			.filter_map(|(link, outcome)| outcome.failure_reason().map(|reason| (link, reason)))
	}

	/// Serializable summary handed to the completion sink.
	pub fn summary(&self) -> BatchSummary {
		BatchSummary {
			total: self.len(),
			succeeded: self.succeeded(),
			failed: self.failed(),
			enumeration_error: self.enumeration_error.clone(),
			failures: self
				.failures()
				.map(|(link, reason)| FailedLink {
					link: link.to_string(),
					reason: reason.to_string(),
				})
				.collect(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
	pub total: usize,
	pub succeeded: usize,
	pub failed: usize,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub enumeration_error: Option<String>,
	pub failures: Vec<FailedLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedLink {
	pub link: String,
	pub reason: String,
}

/// Receives the end-of-batch signal once downloads have stopped.
///
/// The archival step keys off this; the core never invokes it directly.
pub trait CompletionSink {
	fn complete(&self, report: &BatchReport) -> Result<()>;
}

/// Sink that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCompletion;

impl CompletionSink for NoopCompletion {
	fn complete(&self, report: &BatchReport) -> Result<()> {
		info!(target: "backup.batch", total = report.len(), "batch complete");
		Ok(())
	}
}

#[derive(Debug, Clone)]
pub struct BatchOrchestrator {
	enumerator: LinkEnumerator,
	worker: ExtractionWorker,
}

impl BatchOrchestrator {
	pub fn new(enumerator: LinkEnumerator, worker: ExtractionWorker) -> Self {
		Self { enumerator, worker }
	}

	/// Runs the whole batch and consumes the session.
	///
	/// The browser is closed after the last link whatever the outcomes, and
	/// only then is `sink` signalled.
	pub async fn run<B: Browser, C: CompletionSink>(&self, mut session: BrowserSession<B>, landing_url: &str, sink: &C) -> BatchReport {
		let mut report = BatchReport::default();

		match self.enumerator.enumerate(&mut session, landing_url).await {
			Ok(links) => {
				let total = links.len();
				for (index, link) in links.into_iter().enumerate() {
					info!(target: "backup.batch", %link, position = index + 1, total, "processing link");
					let outcome = self.worker.extract(&mut session, &link).await;
					match &outcome {
						ExtractionOutcome::Success => info!(target: "backup.batch", %link, "link succeeded"),
						ExtractionOutcome::Failure(reason) => warn!(target: "backup.batch", %link, %reason, "link failed"),
					}
					report.entries.push((link, outcome));
				}
			}
			Err(err) => {
				error!(target: "backup.batch", url = %landing_url, error = %err, "could not enumerate project links");
				report.enumeration_error = Some(err.to_string());
			}
		}

		let (_, closed) = session.close().await;
		if let Err(err) = closed {
			warn!(target: "backup.batch", error = %err, "browser did not close cleanly");
		}

		info!(
			target: "backup.batch",
			total = report.len(),
			succeeded = report.succeeded(),
			failed = report.failed(),
			"task completed"
		);

		if let Err(err) = sink.complete(&report) {
			warn!(target: "backup.batch", error = %err, "completion signal failed");
		}

		report
	}
}
