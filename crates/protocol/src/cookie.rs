//! Cookie records as they appear in the session file.

use serde::{Deserialize, Serialize};

/// Cookie `SameSite` policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

/// A single browser cookie.
///
/// `expires` is seconds since the Unix epoch; `-1` or `None` marks a
/// session cookie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieRecord {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<SameSite>,
}

impl CookieRecord {
    /// Creates a host-less session cookie; callers fill the remaining fields.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
            expires: None,
            http_only: false,
            secure: false,
            same_site: None,
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_expires(mut self, expires: f64) -> Self {
        self.expires = Some(expires);
        self
    }

    pub fn with_flags(mut self, secure: bool, http_only: bool) -> Self {
        self.secure = secure;
        self.http_only = http_only;
        self
    }

    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_playwright_cookie_shape() {
        let json = r#"{
            "name": "session",
            "value": "token",
            "domain": ".example.com",
            "path": "/",
            "expires": -1.0,
            "httpOnly": true,
            "secure": true,
            "sameSite": "Lax"
        }"#;

        let cookie: CookieRecord = serde_json::from_str(json).unwrap();
        assert_eq!(cookie.name, "session");
        assert_eq!(cookie.domain.as_deref(), Some(".example.com"));
        assert_eq!(cookie.expires, Some(-1.0));
        assert!(cookie.http_only);
        assert_eq!(cookie.same_site, Some(SameSite::Lax));
    }

    #[test]
    fn missing_flags_default_to_false() {
        let cookie: CookieRecord = serde_json::from_str(r#"{"name":"a","value":"b"}"#).unwrap();
        assert!(!cookie.secure);
        assert!(!cookie.http_only);
        assert_eq!(cookie.path, None);
    }

    #[test]
    fn serializes_camel_case_and_skips_absent_fields() {
        let cookie = CookieRecord::new("a", "b").with_flags(true, true);
        let value = serde_json::to_value(&cookie).unwrap();
        assert_eq!(value["httpOnly"], true);
        assert!(value.get("domain").is_none());
        assert!(value.get("sameSite").is_none());
    }
}
