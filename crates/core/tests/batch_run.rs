// End-to-end runs of the orchestration core against the scripted browser.
//
// Tests cover:
// - Batch completeness (one outcome per discovered link)
// - Failure isolation (a broken link does not change the others)
// - The three-project scenario with a never-actionable backup control
// - Authentication followed by a batch on the same session
// - Session file round-trip across two runs

use std::cell::RefCell;
use std::time::Duration;

use backup::testing::{FakeBrowser, FakeElement, FakeLogin, FakePage, Presence};
use backup::{
	AuthConfig, AuthSource, BatchOrchestrator, BatchReport, CompletionSink, CookieRecord, Credentials, ExtractionOutcome, ExtractionSelectors,
	ExtractionWorker, FileSessionStore, LinkEnumerator, NoopCompletion, ProjectLink, SessionStore, SessionToken, Settle, SiteConfig, WaitPolicy,
};
use tempfile::TempDir;

const LANDING: &str = "https://app.test/team/abc";
const LINKS: &str = "main > :nth-child(2) a";

fn quick() -> WaitPolicy {
	WaitPolicy::new(Duration::from_millis(30), Duration::from_millis(5))
}

fn orchestrator() -> BatchOrchestrator {
	BatchOrchestrator::new(
		LinkEnumerator::new(LINKS, quick()),
		ExtractionWorker::new(
			ExtractionSelectors {
				menu: "#file".into(),
				backup: "#backup".into(),
			},
			quick(),
			Settle::none(),
		),
	)
}

fn project_url(n: usize) -> String {
	format!("https://app.test/project/{n}")
}

fn healthy_project(n: usize) -> FakePage {
	FakePage::new(project_url(n))
		.title(format!("Project {n}"))
		.element(FakeElement::new("#file"))
		.element(FakeElement::new("#backup").presence(Presence::AfterClick("#file".into())))
}

fn stuck_project(n: usize) -> FakePage {
	FakePage::new(project_url(n))
		.element(FakeElement::new("#file"))
		.element(FakeElement::new("#backup").presence(Presence::AfterClick("#file".into())).inert())
}

/// Landing page with `count` projects; `broken` replaces the named ones.
fn site(count: usize, broken: &[usize]) -> FakeBrowser {
	let mut landing = FakePage::new(LANDING);
	for n in 1..=count {
		landing = landing.element(FakeElement::new(LINKS).attr("href", format!("/project/{n}")));
	}

	let mut browser = FakeBrowser::new().with_page(landing).with_download_trigger("#backup");
	for n in 1..=count {
		let page = if broken.contains(&n) { stuck_project(n) } else { healthy_project(n) };
		browser = browser.with_page(page);
	}
	browser
}

#[derive(Default)]
struct RecordingSink {
	reports: RefCell<Vec<BatchReport>>,
	closed_when_signalled: RefCell<Option<bool>>,
	browser: Option<FakeBrowser>,
}

impl CompletionSink for RecordingSink {
	fn complete(&self, report: &BatchReport) -> backup::Result<()> {
		self.reports.borrow_mut().push(report.clone());
		if let Some(browser) = &self.browser {
			*self.closed_when_signalled.borrow_mut() = Some(browser.is_closed());
		}
		Ok(())
	}
}

#[tokio::test]
async fn three_links_with_one_stuck_backup_control() {
	let browser = site(3, &[2]);
	let handle = browser.handle();
	let sink = RecordingSink {
		browser: Some(browser.handle()),
		..Default::default()
	};

	let report = orchestrator().run(backup::BrowserSession::new(browser), LANDING, &sink).await;

	assert_eq!(report.len(), 3);
	assert_eq!(report.succeeded(), 2);
	assert_eq!(report.failed(), 1);
	assert!(report.entries[0].1.is_success());
	assert!(report.entries[2].1.is_success());
	let reason = report.entries[1].1.failure_reason().unwrap();
	assert!(reason.contains("timed out"), "{reason}");

	assert_eq!(handle.downloads(), vec![project_url(1), project_url(3)]);
	assert!(handle.is_closed());
	assert_eq!(sink.reports.borrow().len(), 1);
	assert_eq!(*sink.closed_when_signalled.borrow(), Some(true));
}

#[tokio::test]
async fn every_link_gets_exactly_one_outcome() {
	let broken = [1, 4, 5];
	let browser = site(6, &broken);
	let handle = browser.handle();

	let report = orchestrator().run(backup::BrowserSession::new(browser), LANDING, &NoopCompletion).await;

	assert_eq!(report.len(), 6);
	assert_eq!(report.failed(), broken.len());
	let attempted: Vec<String> = handle
		.visits()
		.into_iter()
		.filter(|url| url.starts_with("https://app.test/project/"))
		.collect();
	assert_eq!(attempted, (1..=6).map(project_url).collect::<Vec<_>>());
}

#[tokio::test]
async fn injected_failure_does_not_change_other_outcomes() {
	let baseline = orchestrator()
		.run(backup::BrowserSession::new(site(4, &[])), LANDING, &NoopCompletion)
		.await;

	for k in 1..=4 {
		let report = orchestrator()
			.run(backup::BrowserSession::new(site(4, &[k])), LANDING, &NoopCompletion)
			.await;

		assert_eq!(report.len(), baseline.len());
		for (i, ((link, outcome), (base_link, base_outcome))) in report.entries.iter().zip(&baseline.entries).enumerate() {
			assert_eq!(link, base_link);
			if i + 1 == k {
				assert!(!outcome.is_success(), "link {k} should fail");
			} else {
				assert_eq!(outcome, base_outcome, "link {} changed when {k} failed", i + 1);
			}
		}
	}
}

#[tokio::test]
async fn unreachable_project_is_isolated() {
	let browser = site(3, &[]).with_page(FakePage::new(project_url(2)).unreachable());

	let report = orchestrator().run(backup::BrowserSession::new(browser), LANDING, &NoopCompletion).await;

	assert_eq!(
		report.entries.iter().map(|(_, o)| o.is_success()).collect::<Vec<_>>(),
		vec![true, false, true]
	);
}

#[tokio::test]
async fn failed_enumeration_still_closes_and_signals() {
	let browser = FakeBrowser::new().with_page(FakePage::new(LANDING));
	let handle = browser.handle();
	let sink = RecordingSink::default();

	let report = orchestrator().run(backup::BrowserSession::new(browser), LANDING, &sink).await;

	assert!(report.is_empty());
	assert!(report.enumeration_error.as_deref().unwrap().contains("timed out"));
	assert!(handle.is_closed());
	assert_eq!(sink.reports.borrow().len(), 1);
}

#[tokio::test]
async fn duplicate_anchors_are_extracted_once() {
	let landing = FakePage::new(LANDING)
		.element(FakeElement::new(LINKS).attr("href", "/project/1"))
		.element(FakeElement::new(LINKS).attr("href", "https://app.test/project/1"));
	let browser = FakeBrowser::new()
		.with_page(landing)
		.with_page(healthy_project(1))
		.with_download_trigger("#backup");

	let report = orchestrator().run(backup::BrowserSession::new(browser), LANDING, &NoopCompletion).await;

	assert_eq!(report.entries, vec![(ProjectLink::new(project_url(1)), ExtractionOutcome::Success)]);
}

fn site_config() -> SiteConfig {
	SiteConfig {
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
		wait: quick(),
		settle: Settle::none(),
	}
}

fn authenticated_site(valid: &SessionToken) -> FakeBrowser {
	site(2, &[])
		.with_valid_session(valid.clone())
		.with_login(FakeLogin {
			identity_selector: "#email".into(),
			secret_selector: "#password".into(),
			identity: "me@app.test".into(),
			secret: "hunter2".into(),
			landing_url: "https://app.test/dashboard".into(),
		})
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
}

#[tokio::test]
async fn second_run_reuses_the_saved_session_file() {
	let temp = TempDir::new().unwrap();
	let store = FileSessionStore::new(temp.path().join("session.json"));
	let valid = SessionToken::new(vec![
		CookieRecord::new("sid", "valid")
			.with_domain("app.test")
			.with_path("/")
			.with_flags(true, true),
	]);
	let config = site_config();
	let auth = config.authenticator(Some(Credentials::new("me@app.test", "hunter2")));

	let first_browser = authenticated_site(&valid);
	let first = first_browser.handle();
	let (session, source) = auth.open(first_browser, &store).await.unwrap();
	assert_eq!(source, AuthSource::InteractiveLogin);
	let report = config.orchestrator().run(session, &config.landing_url, &NoopCompletion).await;
	assert_eq!(report.succeeded(), 2);
	assert_eq!(first.submissions(), 1);
	assert_eq!(store.load().unwrap(), Some(valid.clone()));

	let second_browser = authenticated_site(&valid);
	let second = second_browser.handle();
	let (session, source) = auth.open(second_browser, &store).await.unwrap();
	assert_eq!(source, AuthSource::RestoredToken);
	assert_eq!(second.submissions(), 0);
	let report = config.orchestrator().run(session, &config.landing_url, &NoopCompletion).await;
	assert_eq!(report.succeeded(), 2);
}
