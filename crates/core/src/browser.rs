//! Browser seam and the session handle threaded through every component.
//!
//! The core never talks to a concrete automation driver. Everything it needs
//! from a browser is expressed by [`Browser`], one page at a time; adapters
//! live outside this crate (the CLI ships a Playwright one) and tests use
//! [`crate::testing::FakeBrowser`].

use async_trait::async_trait;
use backup_protocol::SessionToken;
use tracing::debug;

use crate::error::Result;

/// A single live page in a browser context.
///
/// Selectors are opaque strings passed through from configuration; the
/// adapter decides which selector engines they may use. Implementations are
/// driven strictly sequentially and are not required to be `Sync`.
#[async_trait]
pub trait Browser: Send {
	/// Navigates the page to `url` and waits for the load event.
	async fn goto(&mut self, url: &str) -> Result<()>;

	/// Number of elements currently matching `selector`.
	async fn count(&mut self, selector: &str) -> Result<usize>;

	/// Attribute `name` of the first element matching `selector`.
	///
	/// Returns `Ok(None)` when the element exists without the attribute.
	async fn attribute(&mut self, selector: &str, name: &str) -> Result<Option<String>>;

	/// Attribute `name` of every element matching `selector`, in DOM order.
	async fn attributes(&mut self, selector: &str, name: &str) -> Result<Vec<Option<String>>>;

	/// Whether the first element matching `selector` is visible and enabled.
	async fn is_actionable(&mut self, selector: &str) -> Result<bool>;

	async fn fill(&mut self, selector: &str, value: &str) -> Result<()>;

	/// Presses a named key (for example `Enter`) while `selector` is focused.
	async fn press(&mut self, selector: &str, key: &str) -> Result<()>;

	/// Clicks the first element matching `selector` with real pointer input.
	async fn click(&mut self, selector: &str) -> Result<()>;

	async fn title(&mut self) -> Result<String>;

	/// Reads every cookie of the browser context.
	async fn cookies(&mut self) -> Result<SessionToken>;

	/// Adds every cookie of `token` to the browser context.
	async fn add_cookies(&mut self, token: &SessionToken) -> Result<()>;

	/// Shuts down the page, its context and the browser process.
	async fn close(&mut self) -> Result<()>;
}

/// The one authenticated actor of a run.
///
/// Created by [`crate::Authenticator`], owned by [`crate::BatchOrchestrator`]
/// and closed when the batch ends.
pub struct BrowserSession<B> {
	browser: B,
	authenticated: bool,
}

impl<B: Browser> BrowserSession<B> {
	pub fn new(browser: B) -> Self {
		Self {
			browser,
			authenticated: false,
		}
	}

	pub fn browser(&mut self) -> &mut B {
		&mut self.browser
	}

	pub fn is_authenticated(&self) -> bool {
		self.authenticated
	}

	pub(crate) fn mark_authenticated(&mut self) {
		self.authenticated = true;
	}

	/// Closes the underlying browser and returns it for inspection.
	pub async fn close(mut self) -> (B, Result<()>) {
		debug!(target: "backup", "closing browser session");
		let result = self.browser.close().await;
		(self.browser, result)
	}

	pub fn into_inner(self) -> B {
		self.browser
	}
}
