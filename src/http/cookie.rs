//! Cookie header parsing and `set-cookie` serialization.
//!
//! Both directions are delegated to the `cookie` crate with percent-encoding.
//! Parsing is lenient: a malformed header produces no cookies at all rather
//! than an error.

use std::collections::HashMap;

use cookie::time::Duration;
use cookie::{Cookie, SameSite};

/// Attributes attached to an outgoing cookie.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieOptions {
    /// Cookie path; `/` when unset.
    pub path: Option<String>,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    /// Lifetime in seconds.
    pub max_age: Option<i64>,
    pub same_site: Option<SameSite>,
}

impl CookieOptions {
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// Serialize one `set-cookie` value.
pub fn serialize(name: &str, value: &str, options: &CookieOptions) -> String {
    let path = options.path.as_deref().unwrap_or("/");
    let mut builder = Cookie::build((name.to_string(), value.to_string()))
        .path(path.to_string())
        .secure(options.secure)
        .http_only(options.http_only);

    if let Some(domain) = &options.domain {
        builder = builder.domain(domain.clone());
    }
    if let Some(seconds) = options.max_age {
        builder = builder.max_age(Duration::seconds(seconds));
    }
    if let Some(same_site) = options.same_site {
        builder = builder.same_site(same_site);
    }

    builder.build().encoded().to_string()
}

/// Parse a `cookie` request header into a name → value map.
///
/// Returns `None` if any pair in the header is malformed.
pub fn parse(header: &str) -> Option<HashMap<String, String>> {
    let mut cookies = HashMap::new();
    for cookie in Cookie::split_parse_encoded(header) {
        let cookie = cookie.ok()?;
        cookies
            .entry(cookie.name().to_string())
            .or_insert_with(|| cookie.value().to_string());
    }
    Some(cookies)
}

/// Whether a serialized `set-cookie` value belongs to `name`.
///
/// Entries are compared by decoded name, since `serialize` percent-encodes it.
pub(crate) fn is_named(entry: &str, name: &str) -> bool {
    Cookie::parse_encoded(entry).is_ok_and(|cookie| cookie.name() == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_formed() {
        let cookies = parse("session=abc123; theme=dark; lang=en").unwrap();
        assert_eq!(cookies.len(), 3);
        assert_eq!(cookies["session"], "abc123");
        assert_eq!(cookies["theme"], "dark");
        assert_eq!(cookies["lang"], "en");
    }

    #[test]
    fn test_parse_decodes_values() {
        let cookies = parse("greeting=hello%20world").unwrap();
        assert_eq!(cookies["greeting"], "hello world");
    }

    #[test]
    fn test_parse_malformed() {
        assert!(parse("=orphan").is_none());
        assert!(parse("session=abc; novalue").is_none());
    }

    #[test]
    fn test_serialize_defaults_path() {
        let value = serialize("sid", "42", &CookieOptions::default());
        assert!(value.starts_with("sid=42"));
        assert!(value.contains("Path=/"));
        assert!(!value.contains("Secure"));
        assert!(!value.contains("HttpOnly"));
    }

    #[test]
    fn test_serialize_options() {
        let options = CookieOptions::default()
            .secure(true)
            .http_only(true)
            .max_age(3600)
            .path("/app");
        let value = serialize("sid", "a b", &options);

        assert!(value.starts_with("sid=a%20b"));
        assert!(value.contains("Path=/app"));
        assert!(value.contains("Secure"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("Max-Age=3600"));
    }

    #[test]
    fn test_is_named() {
        assert!(is_named("sid=1; Path=/", "sid"));
        assert!(!is_named("sid2=1; Path=/", "sid"));
        assert!(!is_named("si=1", "sid"));
    }

    #[test]
    fn test_is_named_matches_encoded_names() {
        for name in ["a|b", "x^y", "100%"] {
            let entry = serialize(name, "v", &CookieOptions::default());
            assert!(is_named(&entry, name), "{entry}");
        }
        let entry = serialize("a|b", "v", &CookieOptions::default());
        assert!(entry.starts_with("a%7Cb="), "{entry}");
        assert!(!is_named(&entry, "a"));
    }
}
