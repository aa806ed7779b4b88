//! Chromium through Playwright.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use backup::{BackupError, Browser, CookieRecord, Result, SameSite, SessionToken};
use playwright_rs::{
	Browser as PwBrowser, BrowserContext, BrowserContextOptions, Cookie, GotoOptions, LaunchOptions, Page, Playwright, WaitUntil,
};
use tracing::{debug, info, warn};

use super::saves::PendingSaves;

/// One browser, one context, one page, with downloads saved into a directory.
pub struct PlaywrightBrowser {
	_playwright: Playwright,
	browser: PwBrowser,
	context: BrowserContext,
	page: Page,
	saves: PendingSaves,
	save_timeout: Duration,
	closed: bool,
}

fn browser_err(action: &str, err: impl std::fmt::Display) -> BackupError {
	BackupError::Browser(format!("{action}: {err}"))
}

impl PlaywrightBrowser {
	/// Starts the driver and opens a Chromium page.
	///
	/// Every download the page starts is saved into `download_dir` under the
	/// name the site suggests. [`Browser::close`] waits up to `save_timeout`
	/// for saves still in flight.
	pub async fn launch(headless: bool, download_dir: &Path, save_timeout: Duration) -> Result<Self> {
		debug!(target: "backup", headless, "starting Playwright");
		let playwright = Playwright::launch().await.map_err(|e| browser_err("failed to start Playwright", e))?;

		let browser = playwright
			.chromium()
			.launch_with_options(LaunchOptions::default().headless(headless))
			.await
			.map_err(|e| browser_err("failed to launch Chromium", e))?;

		let options = BrowserContextOptions::builder().accept_downloads(true).build();
		let context = browser
			.new_context_with_options(options)
			.await
			.map_err(|e| browser_err("failed to create context", e))?;
		let page = context.new_page().await.map_err(|e| browser_err("failed to open page", e))?;

		let saves = PendingSaves::default();
		save_downloads(&page, download_dir.to_path_buf(), saves.clone())
			.await
			.map_err(|e| browser_err("failed to subscribe to downloads", e))?;

		Ok(Self {
			_playwright: playwright,
			browser,
			context,
			page,
			saves,
			save_timeout,
			closed: false,
		})
	}
}

async fn save_downloads(page: &Page, dir: PathBuf, saves: PendingSaves) -> playwright_rs::Result<()> {
	page.on_download(move |download| {
		let guard = saves.begin();
		let target = dir.join(download.suggested_filename());
		async move {
			match download.save_as(&target).await {
				Ok(()) => info!(target: "backup", path = %target.display(), "archive saved"),
				Err(err) => warn!(target: "backup", path = %target.display(), error = %err, "archive could not be saved"),
			}
			drop(guard);
			Ok(())
		}
	})
	.await
}

pub(crate) fn to_playwright(record: &CookieRecord) -> Cookie {
	let mut cookie = Cookie::new(record.name.clone(), record.value.clone())
		.expires(record.expires.unwrap_or(-1.0))
		.http_only(record.http_only)
		.secure(record.secure);
	if let Some(domain) = &record.domain {
		cookie = cookie.domain(domain.clone());
	}
	if let Some(path) = &record.path {
		cookie = cookie.path(path.clone());
	}
	if let Some(same_site) = record.same_site {
		cookie = cookie.same_site(match same_site {
			SameSite::Strict => "Strict",
			SameSite::Lax => "Lax",
			SameSite::None => "None",
		});
	}
	cookie
}

pub(crate) fn from_playwright(cookie: Cookie) -> CookieRecord {
	let non_empty = |s: String| if s.is_empty() { None } else { Some(s) };
	CookieRecord {
		name: cookie.name,
		value: cookie.value,
		domain: non_empty(cookie.domain),
		path: non_empty(cookie.path),
		expires: (cookie.expires >= 0.0).then_some(cookie.expires),
		http_only: cookie.http_only,
		secure: cookie.secure,
		same_site: cookie.same_site.as_deref().and_then(|s| match s {
			"Strict" => Some(SameSite::Strict),
			"Lax" => Some(SameSite::Lax),
			"None" => Some(SameSite::None),
			_ => None,
		}),
	}
}

#[async_trait]
impl Browser for PlaywrightBrowser {
	async fn goto(&mut self, url: &str) -> Result<()> {
		self.page
			.goto(url, GotoOptions::new().wait_until(WaitUntil::Load))
			.await
			.map(|_| ())
			.map_err(|e| BackupError::Navigation {
				url: url.to_string(),
				message: e.to_string(),
			})
	}

	async fn count(&mut self, selector: &str) -> Result<usize> {
		self.page
			.locator(selector)
			.count()
			.await
			.map_err(|e| browser_err(&format!("count {selector}"), e))
	}

	async fn attribute(&mut self, selector: &str, name: &str) -> Result<Option<String>> {
		self.page
			.locator(selector)
			.nth(0)
			.get_attribute(name)
			.await
			.map_err(|e| browser_err(&format!("read {name} of {selector}"), e))
	}

	async fn attributes(&mut self, selector: &str, name: &str) -> Result<Vec<Option<String>>> {
		let locator = self.page.locator(selector);
		let count = locator.count().await.map_err(|e| browser_err(&format!("count {selector}"), e))?;

		let mut values = Vec::with_capacity(count);
		for i in 0..count {
			let index = i32::try_from(i).map_err(|e| browser_err(&format!("index {i} of {selector}"), e))?;
			let value = locator
				.nth(index)
				.get_attribute(name)
				.await
				.map_err(|e| browser_err(&format!("read {name} of {selector}"), e))?;
			values.push(value);
		}
		Ok(values)
	}

	async fn is_actionable(&mut self, selector: &str) -> Result<bool> {
		let locator = self.page.locator(selector);
		if locator.count().await.map_err(|e| browser_err(&format!("count {selector}"), e))? == 0 {
			return Ok(false);
		}
		let first = locator.nth(0);
		let visible = first.is_visible().await.map_err(|e| browser_err(&format!("inspect {selector}"), e))?;
		let enabled = first.is_enabled().await.map_err(|e| browser_err(&format!("inspect {selector}"), e))?;
		Ok(visible && enabled)
	}

	async fn fill(&mut self, selector: &str, value: &str) -> Result<()> {
		self.page
			.locator(selector)
			.fill(value, None)
			.await
			.map_err(|e| browser_err(&format!("fill {selector}"), e))
	}

	async fn press(&mut self, selector: &str, key: &str) -> Result<()> {
		self.page
			.locator(selector)
			.press(key, None)
			.await
			.map_err(|e| browser_err(&format!("press {key} on {selector}"), e))
	}

	async fn click(&mut self, selector: &str) -> Result<()> {
		self.page
			.locator(selector)
			.click(None)
			.await
			.map_err(|e| browser_err(&format!("click {selector}"), e))
	}

	async fn title(&mut self) -> Result<String> {
		self.page.title().await.map_err(|e| browser_err("read title", e))
	}

	async fn cookies(&mut self) -> Result<SessionToken> {
		let cookies = self.context.cookies(None).await.map_err(|e| browser_err("read cookies", e))?;
		Ok(SessionToken::new(cookies.into_iter().map(from_playwright).collect()))
	}

	async fn add_cookies(&mut self, token: &SessionToken) -> Result<()> {
		let cookies: Vec<Cookie> = token.cookies().iter().map(to_playwright).collect();
		self.context
			.add_cookies(&cookies)
			.await
			.map_err(|e| browser_err("inject cookies", e))
	}

	/// Waits for running archive saves, then shuts the browser down.
	async fn close(&mut self) -> Result<()> {
		if self.closed {
			return Ok(());
		}
		self.closed = true;

		let running = self.saves.active();
		if running > 0 {
			info!(target: "backup", running, "waiting for archive saves to finish");
		}
		let unfinished = self.saves.drain(self.save_timeout).await;
		if unfinished > 0 {
			warn!(target: "backup", unfinished, timeout_ms = self.save_timeout.as_millis() as u64, "closing with archive saves still running");
		}

		self.browser.close().await.map_err(|e| browser_err("close browser", e))
	}
}
