//! Scripted in-memory browser for exercising the workflow without a driver.
//!
//! A [`FakeBrowser`] serves [`FakePage`]s keyed by URL. Elements are matched
//! by exact selector string and can be gated on login state or on a prior
//! click, which is enough to script sign-in forms, menus and download
//! buttons. Every call is recorded so tests can assert on what the workflow
//! did, not just on what it returned.
//!
//! # Example
//!
//! ```ignore
//! let browser = FakeBrowser::new()
//!     .with_page(FakePage::new("https://app.test/p/1").element(FakeElement::new("#file")));
//! let handle = browser.handle();
//! // ... move `browser` into a session and run the workflow ...
//! assert_eq!(handle.clicks(), vec!["#file".to_string()]);
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use backup_protocol::SessionToken;
use parking_lot::Mutex;

use crate::browser::Browser;
use crate::error::{BackupError, Result};

/// When an element is present on its page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
	Always,
	LoggedIn,
	LoggedOut,
	/// Present only after `selector` was clicked since the last navigation.
	AfterClick(String),
	Never,
}

#[derive(Debug, Clone)]
pub struct FakeElement {
	selector: String,
	attributes: HashMap<String, String>,
	presence: Presence,
	actionable: bool,
}

impl FakeElement {
	pub fn new(selector: impl Into<String>) -> Self {
		Self {
			selector: selector.into(),
			attributes: HashMap::new(),
			presence: Presence::Always,
			actionable: true,
		}
	}

	pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.attributes.insert(name.into(), value.into());
		self
	}

	pub fn presence(mut self, presence: Presence) -> Self {
		self.presence = presence;
		self
	}

	/// Element is present but never becomes visible and enabled.
	pub fn inert(mut self) -> Self {
		self.actionable = false;
		self
	}
}

#[derive(Debug, Clone)]
pub struct FakePage {
	url: String,
	title: String,
	elements: Vec<FakeElement>,
	fail_navigation: bool,
}

impl FakePage {
	pub fn new(url: impl Into<String>) -> Self {
		let url = url.into();
		Self {
			title: url.clone(),
			url,
			elements: Vec::new(),
			fail_navigation: false,
		}
	}

	pub fn title(mut self, title: impl Into<String>) -> Self {
		self.title = title.into();
		self
	}

	pub fn element(mut self, element: FakeElement) -> Self {
		self.elements.push(element);
		self
	}

	/// Navigating to this page fails outright.
	pub fn unreachable(mut self) -> Self {
		self.fail_navigation = true;
		self
	}
}

/// Sign-in form wiring: pressing Enter on `secret_selector` with matching
/// values logs the browser in and lands on `landing_url`.
#[derive(Debug, Clone)]
pub struct FakeLogin {
	pub identity_selector: String,
	pub secret_selector: String,
	pub identity: String,
	pub secret: String,
	pub landing_url: String,
}

/// One recorded interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
	Goto(String),
	Fill { selector: String, value: String },
	Press { selector: String, key: String },
	Click { url: String, selector: String },
	AddCookies(usize),
	ReadCookies,
	Close,
}

#[derive(Debug, Default)]
struct FakeState {
	pages: HashMap<String, FakePage>,
	current: Option<String>,
	clicked: HashSet<String>,
	filled: HashMap<String, String>,
	cookies: SessionToken,
	valid_session: Option<SessionToken>,
	login: Option<FakeLogin>,
	calls: Vec<Call>,
	downloads: Vec<String>,
	download_selector: Option<String>,
	closed: bool,
}

impl FakeState {
	fn logged_in(&self) -> bool {
		match &self.valid_session {
			Some(valid) => !valid.is_empty() && valid.cookies().iter().all(|c| self.cookies.cookies().contains(c)),
			None => false,
		}
	}

	fn page(&self) -> Result<&FakePage> {
		let url = self.current.as_deref().ok_or_else(|| BackupError::Browser("no page loaded".into()))?;
		self.pages
			.get(url)
			.ok_or_else(|| BackupError::Browser(format!("no fake page for {url}")))
	}

	fn matching(&self, selector: &str) -> Result<Vec<&FakeElement>> {
		let logged_in = self.logged_in();
		let page = self.page()?;
		Ok(page
			.elements
			.iter()
			.filter(|e| e.selector == selector)
			.filter(|e| match &e.presence {
				Presence::Always => true,
				Presence::LoggedIn => logged_in,
				Presence::LoggedOut => !logged_in,
				Presence::AfterClick(trigger) => self.clicked.contains(trigger),
				Presence::Never => false,
			})
			.collect())
	}

	fn first(&self, selector: &str) -> Result<&FakeElement> {
		self.matching(selector)?
			.into_iter()
			.next()
			.ok_or_else(|| BackupError::Browser(format!("no element matches {selector}")))
	}

	fn ensure_open(&self) -> Result<()> {
		if self.closed {
			return Err(BackupError::Browser("browser has been closed".into()));
		}
		Ok(())
	}

	fn navigate(&mut self, url: &str) -> Result<()> {
		self.clicked.clear();
		self.filled.clear();
		match self.pages.get(url) {
			Some(page) if page.fail_navigation => Err(BackupError::Navigation {
				url: url.to_string(),
				message: "net::ERR_CONNECTION_REFUSED".into(),
			}),
			Some(_) => {
				self.current = Some(url.to_string());
				Ok(())
			}
			None => Err(BackupError::Navigation {
				url: url.to_string(),
				message: "404 not found".into(),
			}),
		}
	}
}

/// Scripted [`Browser`] implementation.
#[derive(Debug, Clone, Default)]
pub struct FakeBrowser {
	state: Arc<Mutex<FakeState>>,
}

impl FakeBrowser {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_page(self, page: FakePage) -> Self {
		self.state.lock().pages.insert(page.url.clone(), page);
		self
	}

	/// Cookies that count as a logged-in session.
	pub fn with_valid_session(self, token: SessionToken) -> Self {
		self.state.lock().valid_session = Some(token);
		self
	}

	pub fn with_login(self, login: FakeLogin) -> Self {
		self.state.lock().login = Some(login);
		self
	}

	/// Clicking `selector` records a download of the current page.
	pub fn with_download_trigger(self, selector: impl Into<String>) -> Self {
		self.state.lock().download_selector = Some(selector.into());
		self
	}

	/// Shared view of the same state, usable after the browser was moved.
	pub fn handle(&self) -> FakeBrowser {
		self.clone()
	}

	pub fn calls(&self) -> Vec<Call> {
		self.state.lock().calls.clone()
	}

	pub fn visits(&self) -> Vec<String> {
		self.calls()
			.into_iter()
			.filter_map(|c| match c {
				Call::Goto(url) => Some(url),
				_ => None,
			})
			.collect()
	}

	pub fn clicks(&self) -> Vec<String> {
		self.calls()
			.into_iter()
			.filter_map(|c| match c {
				Call::Click { selector, .. } => Some(selector),
				_ => None,
			})
			.collect()
	}

	/// Number of key presses, i.e. form submissions.
	pub fn submissions(&self) -> usize {
		self.calls().iter().filter(|c| matches!(c, Call::Press { .. })).count()
	}

	/// URLs of pages whose download trigger was clicked, in order.
	pub fn downloads(&self) -> Vec<String> {
		self.state.lock().downloads.clone()
	}

	pub fn is_closed(&self) -> bool {
		self.state.lock().closed
	}

	pub fn is_logged_in(&self) -> bool {
		self.state.lock().logged_in()
	}
}

#[async_trait]
impl Browser for FakeBrowser {
	async fn goto(&mut self, url: &str) -> Result<()> {
		let mut state = self.state.lock();
		state.ensure_open()?;
		state.calls.push(Call::Goto(url.to_string()));
		state.navigate(url)
	}

	async fn count(&mut self, selector: &str) -> Result<usize> {
		let state = self.state.lock();
		state.ensure_open()?;
		Ok(state.matching(selector)?.len())
	}

	async fn attribute(&mut self, selector: &str, name: &str) -> Result<Option<String>> {
		let state = self.state.lock();
		state.ensure_open()?;
		Ok(state.first(selector)?.attributes.get(name).cloned())
	}

	async fn attributes(&mut self, selector: &str, name: &str) -> Result<Vec<Option<String>>> {
		let state = self.state.lock();
		state.ensure_open()?;
		Ok(state
			.matching(selector)?
			.into_iter()
			.map(|e| e.attributes.get(name).cloned())
			.collect())
	}

	async fn is_actionable(&mut self, selector: &str) -> Result<bool> {
		let state = self.state.lock();
		state.ensure_open()?;
		Ok(state.matching(selector)?.first().is_some_and(|e| e.actionable))
	}

	async fn fill(&mut self, selector: &str, value: &str) -> Result<()> {
		let mut state = self.state.lock();
		state.ensure_open()?;
		state.first(selector)?;
		state.calls.push(Call::Fill {
			selector: selector.to_string(),
			value: value.to_string(),
		});
		state.filled.insert(selector.to_string(), value.to_string());
		Ok(())
	}

	async fn press(&mut self, selector: &str, key: &str) -> Result<()> {
		let mut state = self.state.lock();
		state.ensure_open()?;
		state.first(selector)?;
		state.calls.push(Call::Press {
			selector: selector.to_string(),
			key: key.to_string(),
		});

		let Some(login) = state.login.clone() else {
			return Ok(());
		};
		let accepted = key == "Enter"
			&& selector == login.secret_selector
			&& state.filled.get(&login.identity_selector) == Some(&login.identity)
			&& state.filled.get(&login.secret_selector) == Some(&login.secret);
		if accepted {
			if let Some(valid) = state.valid_session.clone() {
				state.cookies = valid;
			}
			state.navigate(&login.landing_url)?;
		}
		Ok(())
	}

	async fn click(&mut self, selector: &str) -> Result<()> {
		let mut state = self.state.lock();
		state.ensure_open()?;
		let element = state.first(selector)?;
		if !element.actionable {
			return Err(BackupError::Browser(format!("element {selector} is not clickable")));
		}
		let url = state.current.clone().unwrap_or_default();
		state.calls.push(Call::Click {
			url: url.clone(),
			selector: selector.to_string(),
		});
		state.clicked.insert(selector.to_string());
		if state.download_selector.as_deref() == Some(selector) {
			state.downloads.push(url);
		}
		Ok(())
	}

	async fn title(&mut self) -> Result<String> {
		let state = self.state.lock();
		state.ensure_open()?;
		Ok(state.page()?.title.clone())
	}

	async fn cookies(&mut self) -> Result<SessionToken> {
		let mut state = self.state.lock();
		state.ensure_open()?;
		state.calls.push(Call::ReadCookies);
		Ok(state.cookies.clone())
	}

	async fn add_cookies(&mut self, token: &SessionToken) -> Result<()> {
		let mut state = self.state.lock();
		state.ensure_open()?;
		state.calls.push(Call::AddCookies(token.len()));
		let mut cookies = state.cookies.clone().into_cookies();
		cookies.extend(token.cookies().iter().cloned());
		state.cookies = SessionToken::new(cookies);
		Ok(())
	}

	async fn close(&mut self) -> Result<()> {
		let mut state = self.state.lock();
		state.ensure_open()?;
		state.calls.push(Call::Close);
		state.closed = true;
		Ok(())
	}
}
