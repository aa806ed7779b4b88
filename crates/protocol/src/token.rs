//! The persisted session bundle.

use serde::{Deserialize, Serialize};

use crate::cookie::CookieRecord;

/// Opaque bundle of browser credential records.
///
/// Produced by reading a live browser context after login and replayed into
/// a fresh context on the next run. Serialized as `{ "cookies": [...] }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionToken {
    #[serde(default)]
    cookies: Vec<CookieRecord>,
}

impl SessionToken {
    pub fn new(cookies: Vec<CookieRecord>) -> Self {
        Self { cookies }
    }

    pub fn cookies(&self) -> &[CookieRecord] {
        &self.cookies
    }

    pub fn into_cookies(self) -> Vec<CookieRecord> {
        self.cookies
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

impl From<Vec<CookieRecord>> for SessionToken {
    fn from(cookies: Vec<CookieRecord>) -> Self {
        Self::new(cookies)
    }
}
