//! Orchestration core for browser-driven project backups.
//!
//! A run is a straight pipeline over one browser page:
//!
//! 1. [`Authenticator`] restores the stored [`SessionToken`] or signs in and
//!    stores a fresh one ([`SessionStore`]).
//! 2. [`BatchOrchestrator`] asks the [`LinkEnumerator`] for the project links
//!    on the landing page once.
//! 3. The [`ExtractionWorker`] triggers each project's backup download in
//!    turn; failures are recorded per link and never stop the batch.
//! 4. The browser is closed and the [`CompletionSink`] is signalled.
//!
//! The browser itself sits behind the [`Browser`] trait. Only authentication
//! errors are returned to the caller; the batch always yields a
//! [`BatchReport`].

pub mod auth;
pub mod batch;
pub mod browser;
pub mod config;
pub mod error;
pub mod extract;
pub mod links;
pub mod store;
pub mod testing;
pub mod wait;

pub use auth::{AuthConfig, AuthSource, Authenticator, Credentials};
pub use backup_protocol::{CookieRecord, SameSite, SessionToken};
pub use batch::{BatchOrchestrator, BatchReport, BatchSummary, CompletionSink, FailedLink, NoopCompletion};
pub use browser::{Browser, BrowserSession};
pub use config::SiteConfig;
pub use error::{BackupError, Result};
pub use extract::{ExtractionOutcome, ExtractionSelectors, ExtractionWorker};
pub use links::{DEFAULT_LINK_SELECTOR, LinkEnumerator, ProjectLink};
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};
pub use wait::{Settle, WaitPolicy, wait_until};
