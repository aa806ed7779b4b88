//! Per-project backup extraction.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::browser::{Browser, BrowserSession};
use crate::error::Result;
use crate::links::ProjectLink;
use crate::wait::{Settle, WaitPolicy, pause, wait_for_actionable, wait_for_present};

/// Controls driven on a project page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSelectors {
	/// Menu control that opens the export actions ("File").
	pub menu: String,
	/// Action that starts the backup download ("Backup project").
	pub backup: String,
}

impl Default for ExtractionSelectors {
	fn default() -> Self {
		Self {
			menu: "xpath=//button[text()='File']".into(),
			backup: "xpath=//span[text()='Backup project']/..".into(),
		}
	}
}

/// Result of one extraction attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
	Success,
	Failure(String),
}

impl ExtractionOutcome {
	pub fn is_success(&self) -> bool {
		matches!(self, Self::Success)
	}

	pub fn failure_reason(&self) -> Option<&str> {
		match self {
			Self::Success => None,
			Self::Failure(reason) => Some(reason),
		}
	}
}

#[derive(Debug, Clone)]
pub struct ExtractionWorker {
	selectors: ExtractionSelectors,
	wait: WaitPolicy,
	settle: Settle,
}

impl ExtractionWorker {
	pub fn new(selectors: ExtractionSelectors, wait: WaitPolicy, settle: Settle) -> Self {
		Self { selectors, wait, settle }
	}

	/// Triggers the backup download for one project.
	///
	/// Never fails: any error along the way becomes
	/// [`ExtractionOutcome::Failure`] carrying the error message.
	pub async fn extract<B: Browser>(&self, session: &mut BrowserSession<B>, link: &ProjectLink) -> ExtractionOutcome {
		match self.try_extract(session.browser(), link).await {
			Ok(title) => {
				info!(target: "backup.extract", %link, %title, "backup triggered");
				ExtractionOutcome::Success
			}
			Err(err) => {
				warn!(target: "backup.extract", %link, error = %err, "extraction failed");
				ExtractionOutcome::Failure(err.to_string())
			}
		}
	}

	async fn try_extract<B: Browser>(&self, browser: &mut B, link: &ProjectLink) -> Result<String> {
		debug!(target: "backup.extract", %link, "opening project");
		browser.goto(link.as_str()).await?;
		pause(self.settle.after_navigation).await;

		wait_for_present(browser, &self.selectors.menu, self.wait).await?;
		browser.click(&self.selectors.menu).await?;

		wait_for_actionable(browser, &self.selectors.backup, self.wait).await?;
		browser.click(&self.selectors.backup).await?;

		// Title is only used for the log line.
		let title = browser.title().await.unwrap_or_else(|_| link.to_string());
		pause(self.settle.after_download).await;
		Ok(title)
	}
}
