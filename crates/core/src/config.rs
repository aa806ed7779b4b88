//! Site description shared by every component of a run.

use serde::{Deserialize, Serialize};

use crate::auth::{AuthConfig, Authenticator, Credentials};
use crate::batch::BatchOrchestrator;
use crate::extract::{ExtractionSelectors, ExtractionWorker};
use crate::links::{DEFAULT_LINK_SELECTOR, LinkEnumerator};
use crate::wait::{Settle, WaitPolicy};

/// Everything the core needs to know about the target site.
///
/// Every field has a default, so a config file only needs the keys it
/// changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
	pub auth: AuthConfig,
	/// Authenticated page listing the projects to back up.
	pub landing_url: String,
	pub link_selector: String,
	pub extraction: ExtractionSelectors,
	pub wait: WaitPolicy,
	pub settle: Settle,
}

impl Default for SiteConfig {
	fn default() -> Self {
		Self {
			auth: AuthConfig::default(),
			landing_url: "https://typst.app/team/aKj7S1kHEc96JAgoh1C5Ri".into(),
			link_selector: DEFAULT_LINK_SELECTOR.into(),
			extraction: ExtractionSelectors::default(),
			wait: WaitPolicy::default(),
			settle: Settle::default(),
		}
	}
}

impl SiteConfig {
	pub fn authenticator(&self, credentials: Option<Credentials>) -> Authenticator {
		Authenticator::new(self.auth.clone(), credentials, self.wait)
	}

	pub fn orchestrator(&self) -> BatchOrchestrator {
		BatchOrchestrator::new(
			LinkEnumerator::new(self.link_selector.clone(), self.wait),
			ExtractionWorker::new(self.extraction.clone(), self.wait, self.settle),
		)
	}
}
