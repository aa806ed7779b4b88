//! Session establishment: replay a stored token, fall back to the sign-in form.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::browser::{Browser, BrowserSession};
use crate::error::{BackupError, Result};
use crate::store::SessionStore;
use crate::wait::{WaitPolicy, wait_for_present};

/// Where the authenticated state of a session came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthSource {
	/// The session was already verified earlier in this process.
	AlreadyAuthenticated,
	/// A stored token was replayed and the login check confirmed it.
	RestoredToken,
	/// Credentials were submitted through the sign-in form.
	InteractiveLogin,
}

/// Site layout the authenticator drives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
	/// Any page on the target origin; cookies are injected while on it.
	pub site_url: String,
	/// Page carrying the login-state control.
	pub home_url: String,
	pub signin_url: String,
	/// Navigation control whose target reveals the login state.
	pub state_selector: String,
	pub state_attribute: String,
	/// Control target value that means "logged in".
	pub authenticated_target: String,
	pub identity_selector: String,
	pub secret_selector: String,
	/// Element that appears once the post-login page has rendered.
	pub post_login_marker: String,
}

impl Default for AuthConfig {
	fn default() -> Self {
		Self {
			site_url: "https://typst.app/".into(),
			home_url: "https://typst.app/home".into(),
			signin_url: "https://typst.app/signin/".into(),
			state_selector: "#header-btn".into(),
			state_attribute: "href".into(),
			authenticated_target: "https://typst.app/app/".into(),
			identity_selector: "#email".into(),
			secret_selector: "#password".into(),
			post_login_marker: "main".into(),
		}
	}
}

/// Identity and secret submitted on the sign-in form.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
	pub identity: String,
	pub secret: String,
}

impl Credentials {
	pub fn new(identity: impl Into<String>, secret: impl Into<String>) -> Self {
		Self {
			identity: identity.into(),
			secret: secret.into(),
		}
	}
}

impl fmt::Debug for Credentials {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Credentials")
			.field("identity", &self.identity)
			.field("secret", &"<redacted>")
			.finish()
	}
}

enum LoginState {
	LoggedIn,
	OtherTarget(Option<String>),
	ControlMissing,
}

/// Establishes and verifies the authenticated browser session.
#[derive(Debug, Clone)]
pub struct Authenticator {
	config: AuthConfig,
	credentials: Option<Credentials>,
	wait: WaitPolicy,
}

impl Authenticator {
	pub fn new(config: AuthConfig, credentials: Option<Credentials>, wait: WaitPolicy) -> Self {
		Self { config, credentials, wait }
	}

	pub fn config(&self) -> &AuthConfig {
		&self.config
	}

	/// Wraps `browser` in a session and authenticates it.
	pub async fn open<B: Browser, S: SessionStore>(&self, browser: B, store: &S) -> Result<(BrowserSession<B>, AuthSource)> {
		let mut session = BrowserSession::new(browser);
		let source = self.ensure_session(&mut session, store).await?;
		Ok((session, source))
	}

	/// Makes sure `session` is logged in.
	///
	/// A stored token is replayed first and verified by the login check.
	/// Without a token, or when the login check does not confirm it, credentials
	/// are submitted and the fresh token replaces the stored one. Calling this
	/// again on a verified session does nothing.
	///
	/// # Errors
	///
	/// Any error is fatal for the run: a wait timing out on the sign-in form
	/// or post-login page, missing credentials, or a failed store write.
	pub async fn ensure_session<B: Browser, S: SessionStore>(&self, session: &mut BrowserSession<B>, store: &S) -> Result<AuthSource> {
		if session.is_authenticated() {
			debug!(target: "backup.auth", "session already verified");
			return Ok(AuthSource::AlreadyAuthenticated);
		}

		let Some(token) = store.load()? else {
			info!(target: "backup.auth", "no stored session; logging in");
			return self.interactive(session, store).await;
		};

		session.browser().goto(&self.config.site_url).await?;
		session.browser().add_cookies(&token).await?;
		info!(target: "backup.auth", cookies = token.len(), "stored session injected");

		match self.login_state(session.browser()).await? {
			LoginState::LoggedIn => {
				info!(target: "backup.auth", "already logged in");
				session.mark_authenticated();
				return Ok(AuthSource::RestoredToken);
			}
			LoginState::OtherTarget(target) => {
				info!(target: "backup.auth", found = target.as_deref().unwrap_or("<none>"), "stored session rejected");
			}
			LoginState::ControlMissing => {
				warn!(target: "backup.auth", selector = %self.config.state_selector, "login-state control not found; assuming logged out");
			}
		}

		self.interactive(session, store).await
	}

	async fn interactive<B: Browser, S: SessionStore>(&self, session: &mut BrowserSession<B>, store: &S) -> Result<AuthSource> {
		self.login(session.browser()).await?;

		let token = session.browser().cookies().await?;
		store.save(&token)?;
		session.mark_authenticated();
		Ok(AuthSource::InteractiveLogin)
	}

	async fn login_state<B: Browser>(&self, browser: &mut B) -> Result<LoginState> {
		browser.goto(&self.config.home_url).await?;

		match wait_for_present(browser, &self.config.state_selector, self.wait).await {
			Ok(()) => {}
			Err(err) if err.is_timeout() => return Ok(LoginState::ControlMissing),
			Err(err) => return Err(err),
		}

		let target = browser
			.attribute(&self.config.state_selector, &self.config.state_attribute)
			.await?;
		if target.as_deref() == Some(self.config.authenticated_target.as_str()) {
			Ok(LoginState::LoggedIn)
		} else {
			Ok(LoginState::OtherTarget(target))
		}
	}

	async fn login<B: Browser>(&self, browser: &mut B) -> Result<()> {
		let credentials = self.credentials.as_ref().ok_or(BackupError::MissingCredentials)?;

		info!(target: "backup.auth", url = %self.config.signin_url, identity = %credentials.identity, "logging in");
		browser.goto(&self.config.signin_url).await?;
		wait_for_present(browser, &self.config.identity_selector, self.wait).await?;

		self.submit(browser, credentials)
			.await
			.map_err(|err| BackupError::Login(format!("credential submission failed: {err}")))?;

		wait_for_present(browser, &self.config.post_login_marker, self.wait).await?;

		info!(target: "backup.auth", "login successful");
		Ok(())
	}

	async fn submit<B: Browser>(&self, browser: &mut B, credentials: &Credentials) -> Result<()> {
		browser.fill(&self.config.identity_selector, &credentials.identity).await?;
		browser.fill(&self.config.secret_selector, &credentials.secret).await?;
		browser.press(&self.config.secret_selector, "Enter").await
	}
}
