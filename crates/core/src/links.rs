//! Project link discovery on the landing page.
//!
//! The landing page is not under our control and carries no stable
//! identifiers for its project list, so links are selected structurally
//! (by default every anchor under the second child of `<main>`). All of
//! that knowledge lives here; markup changes on the target site should only
//! ever touch this module's selector.

use std::collections::HashSet;
use std::fmt;

use tracing::{debug, info};
use url::Url;

use crate::browser::{Browser, BrowserSession};
use crate::error::{BackupError, Result};
use crate::wait::{WaitPolicy, wait_for_present};

/// Default structural selector for project anchors.
pub const DEFAULT_LINK_SELECTOR: &str = "main > :nth-child(2) a";

/// One project page to extract, as an absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectLink(String);

impl ProjectLink {
	pub fn new(url: impl Into<String>) -> Self {
		Self(url.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for ProjectLink {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl AsRef<str> for ProjectLink {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

#[derive(Debug, Clone)]
pub struct LinkEnumerator {
	selector: String,
	wait: WaitPolicy,
}

impl LinkEnumerator {
	pub fn new(selector: impl Into<String>, wait: WaitPolicy) -> Self {
		Self {
			selector: selector.into(),
			wait,
		}
	}

	pub fn selector(&self) -> &str {
		&self.selector
	}

	/// Lists the project links on `landing_url` in DOM order.
	///
	/// Waits until at least one anchor matches, then reads every anchor's
	/// `href`. Relative targets are resolved against `landing_url`; empty
	/// targets are skipped and repeats keep their first position. Order is
	/// whatever the page rendered and may differ between runs.
	pub async fn enumerate<B: Browser>(&self, session: &mut BrowserSession<B>, landing_url: &str) -> Result<Vec<ProjectLink>> {
		let base = Url::parse(landing_url).map_err(|source| BackupError::Url {
			url: landing_url.to_string(),
			source,
		})?;

		let browser = session.browser();
		browser.goto(landing_url).await?;
		wait_for_present(browser, &self.selector, self.wait).await?;

		let hrefs = browser.attributes(&self.selector, "href").await?;
		let links = resolve_links(&base, hrefs);

		info!(target: "backup.links", url = %landing_url, count = links.len(), "project links found");
		Ok(links)
	}
}

fn resolve_links(base: &Url, hrefs: Vec<Option<String>>) -> Vec<ProjectLink> {
	let mut seen = HashSet::new();
	let mut links = Vec::new();

	for href in hrefs.into_iter().flatten() {
		let href = href.trim();
		if href.is_empty() {
			continue;
		}
		let resolved = match base.join(href) {
			Ok(url) => url.to_string(),
			Err(err) => {
				debug!(target: "backup.links", %href, error = %err, "skipping unparseable link");
				continue;
			}
		};
		if seen.insert(resolved.clone()) {
			links.push(ProjectLink(resolved));
		}
	}

	links
}
