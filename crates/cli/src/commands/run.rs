//! The `run` command: authenticate, back up every project, signal completion.

use anyhow::{Context, Result};
use backup::{AuthSource, BatchReport, Browser, BrowserSession, Credentials, FileSessionStore};
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::completion::MarkerFile;
use crate::config::Config;

#[cfg(feature = "playwright")]
pub async fn execute(config: Config, args: &RunArgs) -> Result<()> {
	use crate::browser::PlaywrightBrowser;
	use crate::config::credentials;
	use crate::downloads;

	downloads::prepare(&config.download_dir)?;
	let browser = PlaywrightBrowser::launch(config.headless, &config.download_dir, config.site.wait.timeout)
		.await
		.context("failed to start the browser")?;
	run_batch(browser, &config, credentials(args), args.fresh_login).await?;
	Ok(())
}

#[cfg(not(feature = "playwright"))]
pub async fn execute(_config: Config, _args: &RunArgs) -> Result<()> {
	anyhow::bail!("built without a browser backend; rebuild with `--features playwright`")
}

/// Runs the whole pipeline on an already launched browser.
///
/// The browser is closed on every path. Only authentication problems are
/// returned as errors; per-project failures end up in the report.
pub async fn run_batch<B: Browser>(browser: B, config: &Config, credentials: Option<Credentials>, fresh_login: bool) -> Result<BatchReport> {
	let store = FileSessionStore::new(&config.session_file);
	let mut session = BrowserSession::new(browser);

	if fresh_login {
		if let Err(err) = store.clear() {
			close_after_failure(session).await;
			return Err(err).context("failed to discard the saved session");
		}
		info!(target: "backup", path = %store.path().display(), "saved session discarded");
	}

	let authenticator = config.site.authenticator(credentials);
	let source = match authenticator.ensure_session(&mut session, &store).await {
		Ok(source) => source,
		Err(err) => {
			close_after_failure(session).await;
			return Err(err).context("authentication failed");
		}
	};
	match source {
		AuthSource::RestoredToken => info!(target: "backup", "reusing saved session"),
		AuthSource::InteractiveLogin => info!(target: "backup", path = %store.path().display(), "logged in; session saved"),
		AuthSource::AlreadyAuthenticated => {}
	}

	let sink = MarkerFile::new(&config.download_dir);
	Ok(config.site.orchestrator().run(session, &config.site.landing_url, &sink).await)
}

async fn close_after_failure<B: Browser>(session: BrowserSession<B>) {
	let (_, closed) = session.close().await;
	if let Err(err) = closed {
		warn!(target: "backup", error = %err, "browser did not close cleanly");
	}
}

#[cfg(test)]
mod tests {
	use std::path::Path;
	use std::time::Duration;

	use backup::testing::{FakeBrowser, FakeElement, FakeLogin, FakePage, Presence};
	use backup::{AuthConfig, CookieRecord, ExtractionSelectors, SessionStore, SessionToken, Settle, SiteConfig, WaitPolicy};
	use tempfile::TempDir;

	use super::*;
	use crate::completion::MARKER_FILE;
	use crate::downloads;

	const LANDING: &str = "https://app.test/team/abc";
	const LINKS: &str = "main > :nth-child(2) a";

	fn config(dir: &Path) -> Config {
		Config {
			site: SiteConfig {
				auth: AuthConfig {
					site_url: "https://app.test/".into(),
					home_url: "https://app.test/home".into(),
					signin_url: "https://app.test/signin".into(),
					authenticated_target: "https://app.test/app/".into(),
					..AuthConfig::default()
				},
				landing_url: LANDING.into(),
				link_selector: LINKS.into(),
				extraction: ExtractionSelectors {
					menu: "#file".into(),
					backup: "#backup".into(),
				},
				wait: WaitPolicy::new(Duration::from_millis(30), Duration::from_millis(5)),
				settle: Settle::none(),
			},
			session_file: dir.join("cookies.json"),
			download_dir: dir.join("work"),
			headless: true,
		}
	}

	fn valid_token() -> SessionToken {
		SessionToken::new(vec![CookieRecord::new("sid", "valid").with_domain("app.test").with_path("/")])
	}

	fn site() -> FakeBrowser {
		let project = |n: usize| {
			FakePage::new(format!("https://app.test/project/{n}"))
				.title(format!("Project {n}"))
				.element(FakeElement::new("#file"))
				.element(FakeElement::new("#backup").presence(Presence::AfterClick("#file".into())))
		};

		FakeBrowser::new()
			.with_valid_session(valid_token())
			.with_login(FakeLogin {
				identity_selector: "#email".into(),
				secret_selector: "#password".into(),
				identity: "me@app.test".into(),
				secret: "hunter2".into(),
				landing_url: "https://app.test/dashboard".into(),
			})
			.with_download_trigger("#backup")
			.with_page(FakePage::new("https://app.test/"))
			.with_page(
				FakePage::new("https://app.test/home")
					.element(
						FakeElement::new("#header-btn")
							.attr("href", "https://app.test/app/")
							.presence(Presence::LoggedIn),
					)
					.element(FakeElement::new("#header-btn").attr("href", "/signin").presence(Presence::LoggedOut)),
			)
			.with_page(
				FakePage::new("https://app.test/signin")
					.element(FakeElement::new("#email"))
					.element(FakeElement::new("#password")),
			)
			.with_page(FakePage::new("https://app.test/dashboard").element(FakeElement::new("main")))
			.with_page(
				FakePage::new(LANDING)
					.element(FakeElement::new(LINKS).attr("href", "/project/1"))
					.element(FakeElement::new(LINKS).attr("href", "/project/2")),
			)
			.with_page(project(1))
			.with_page(project(2))
	}

	fn creds() -> Option<Credentials> {
		Some(Credentials::new("me@app.test", "hunter2"))
	}

	#[tokio::test]
	async fn first_run_logs_in_and_writes_marker() {
		let temp = TempDir::new().unwrap();
		let config = config(temp.path());
		downloads::prepare(&config.download_dir).unwrap();
		let browser = site();
		let handle = browser.handle();

		let report = run_batch(browser, &config, creds(), false).await.unwrap();

		assert_eq!(report.succeeded(), 2);
		assert_eq!(handle.submissions(), 1);
		assert!(handle.is_closed());
		assert_eq!(FileSessionStore::new(&config.session_file).load().unwrap(), Some(valid_token()));

		let marker: serde_json::Value =
			serde_json::from_str(&std::fs::read_to_string(config.download_dir.join(MARKER_FILE)).unwrap()).unwrap();
		assert_eq!(marker["total"], 2);
		assert_eq!(marker["failed"], 0);
	}

	#[tokio::test]
	async fn saved_session_skips_the_form() {
		let temp = TempDir::new().unwrap();
		let config = config(temp.path());
		downloads::prepare(&config.download_dir).unwrap();
		FileSessionStore::new(&config.session_file).save(&valid_token()).unwrap();
		let browser = site();
		let handle = browser.handle();

		let report = run_batch(browser, &config, None, false).await.unwrap();

		assert_eq!(report.succeeded(), 2);
		assert_eq!(handle.submissions(), 0);
	}

	#[tokio::test]
	async fn fresh_login_ignores_saved_session() {
		let temp = TempDir::new().unwrap();
		let config = config(temp.path());
		downloads::prepare(&config.download_dir).unwrap();
		FileSessionStore::new(&config.session_file).save(&valid_token()).unwrap();
		let browser = site();
		let handle = browser.handle();

		run_batch(browser, &config, creds(), true).await.unwrap();

		assert_eq!(handle.submissions(), 1);
	}

	#[tokio::test]
	async fn failed_authentication_closes_browser_without_marker() {
		let temp = TempDir::new().unwrap();
		let config = config(temp.path());
		downloads::prepare(&config.download_dir).unwrap();
		let browser = site();
		let handle = browser.handle();

		let err = run_batch(browser, &config, None, false).await.unwrap_err();

		assert!(err.to_string().contains("authentication failed"));
		assert!(matches!(err.downcast_ref::<backup::BackupError>(), Some(backup::BackupError::MissingCredentials)));
		assert!(handle.is_closed());
		assert!(handle.downloads().is_empty());
		assert!(!config.download_dir.join(MARKER_FILE).exists());
		assert!(!config.session_file.exists());
	}
}
