//! Concrete [`backup::Browser`] backends.

#[cfg(feature = "playwright")]
mod playwright;
#[cfg(feature = "playwright")]
mod saves;

#[cfg(feature = "playwright")]
pub use playwright::PlaywrightBrowser;
