//! Cookie-based authentication
//!
//! Turns a cookie collection into the request decorations the API expects:
//! the `Cookie` header, the origin-bound time-keyed SAPISIDHASH
//! authorization header, and the derived identifiers (visitor id, session
//! id) used as token bindings.

use crate::error::RvrError;
use regex::Regex;
use serde::Deserialize;
use sha1::{Digest, Sha1};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// A single cookie as loaded from a file, an export, or a raw header
#[derive(Debug, Clone, Default)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    /// Unix expiry; `None` is a session cookie
    pub expires: Option<u64>,
}

/// An authenticated session: cookies plus the fields derived from them
#[derive(Debug, Clone, Default)]
pub struct AuthBundle {
    cookies: Vec<Cookie>,
    visitor_data: Option<String>,
    sapisid: Option<String>,
    data_sync_id: Option<String>,
    session_id: Option<String>,
}

impl AuthBundle {
    /// Build a bundle from an already-parsed cookie collection
    pub fn from_cookies(cookies: Vec<Cookie>) -> Self {
        let mut bundle = Self {
            cookies,
            ..Default::default()
        };
        bundle.derive_fields();
        bundle
    }

    /// Load a tab-separated Netscape cookie file
    pub fn from_netscape_file(path: impl AsRef<Path>) -> Result<Self, RvrError> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_cookies(parse_netscape_cookies(&content)))
    }

    /// Load a JSON cookie export (array of browser-extension objects)
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, RvrError> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_cookies(parse_json_cookies(&content)?))
    }

    /// Parse a raw `Cookie` header string
    pub fn from_header(header: &str) -> Self {
        Self::from_cookies(parse_header_cookies(header))
    }

    fn derive_fields(&mut self) {
        for cookie in &self.cookies {
            match cookie.name.as_str() {
                "VISITOR_INFO1_LIVE" => {
                    self.visitor_data = Some(cookie.value.clone());
                }
                "__Secure-3PAPISID" | "SAPISID" => {
                    self.sapisid = Some(cookie.value.clone());
                }
                _ => {}
            }
        }
    }

    /// The `Cookie` header value, `name=value; …` in insertion order
    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Logged-in iff a `SID` or `__Secure-3PSID` cookie is present
    pub fn is_logged_in(&self) -> bool {
        self.cookies
            .iter()
            .any(|c| c.name == "SID" || c.name == "__Secure-3PSID")
    }

    /// Visitor identifier from the `VISITOR_INFO1_LIVE` cookie
    pub fn visitor_data(&self) -> Option<&str> {
        self.visitor_data.as_deref()
    }

    /// Session-auth id from `__Secure-3PAPISID` or `SAPISID`
    pub fn sapisid(&self) -> Option<&str> {
        self.sapisid.as_deref()
    }

    /// dataSyncId captured from a later API response
    pub fn data_sync_id(&self) -> Option<&str> {
        self.data_sync_id.as_deref()
    }

    /// Session id: the substring of the dataSyncId preceding `||`
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Record the server-issued dataSyncId and derive the session id
    pub fn set_data_sync_id(&mut self, data_sync_id: &str) {
        if data_sync_id.is_empty() {
            return;
        }
        self.data_sync_id = Some(data_sync_id.to_string());
        if let Some(first) = data_sync_id.split("||").next() {
            if !first.is_empty() {
                self.session_id = Some(first.to_string());
            }
        }
    }

    /// The SAPISIDHASH authorization header for the given origin, keyed to
    /// the current unix time; `None` without a session-auth id
    pub fn sapisid_hash(&self, origin: &str) -> Option<String> {
        let sapisid = self.sapisid.as_deref()?;
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Some(sapisid_hash_at(now, sapisid, origin))
    }
}

/// SAPISIDHASH for a fixed timestamp:
/// `SAPISIDHASH <ts>_<sha1_hex("<ts> <sapisid> <origin>")>`
pub fn sapisid_hash_at(timestamp: u64, sapisid: &str, origin: &str) -> String {
    let input = format!("{} {} {}", timestamp, sapisid, origin);
    let digest = Sha1::digest(input.as_bytes());
    format!("SAPISIDHASH {}_{:x}", timestamp, digest)
}

/// Parse a tab-separated Netscape cookie file body.
///
/// Lines are `domain, host-only flag, path, secure, expiry, name, value`;
/// `#` comments and blanks are ignored, except `#HttpOnly_`-prefixed lines,
/// which are real cookies. Lines with fewer than 7 fields are skipped and
/// expiry `0` means no expiry.
pub fn parse_netscape_cookies(content: &str) -> Vec<Cookie> {
    let mut cookies = Vec::new();

    for line in content.lines() {
        let line = line.trim();

        let (line, http_only) = match line.strip_prefix("#HttpOnly_") {
            Some(stripped) => (stripped, true),
            None => (line, false),
        };

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = line.split('\t').collect();
        if parts.len() < 7 {
            continue;
        }

        let expires = match parts[4].parse::<u64>() {
            Ok(0) | Err(_) => None,
            Ok(v) => Some(v),
        };

        cookies.push(Cookie {
            name: parts[5].to_string(),
            value: parts[6].to_string(),
            domain: parts[0].to_string(),
            path: parts[2].to_string(),
            secure: parts[3] == "TRUE",
            http_only,
            expires,
        });
    }

    cookies
}

/// Parse a JSON cookie export
pub fn parse_json_cookies(content: &str) -> Result<Vec<Cookie>, RvrError> {
    #[derive(Deserialize)]
    struct JsonCookie {
        name: String,
        value: String,
        #[serde(default)]
        domain: String,
        #[serde(default)]
        path: String,
        #[serde(default)]
        secure: bool,
        #[serde(default, rename = "httpOnly")]
        http_only: bool,
        #[serde(default, rename = "expirationDate")]
        expiration_date: Option<f64>,
    }

    let parsed: Vec<JsonCookie> = serde_json::from_str(content)?;

    Ok(parsed
        .into_iter()
        .map(|jc| Cookie {
            name: jc.name,
            value: jc.value,
            domain: jc.domain,
            path: jc.path,
            secure: jc.secure,
            http_only: jc.http_only,
            expires: jc
                .expiration_date
                .filter(|e| *e > 0.0)
                .map(|e| e as u64),
        })
        .collect())
}

/// Parse a raw `Cookie` header: split on `;`, trim, split on the first `=`.
///
/// Cookies named with the `__Secure-` prefix are flagged secure.
pub fn parse_header_cookies(header: &str) -> Vec<Cookie> {
    let mut cookies = Vec::new();

    for pair in header.split(';') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }

        let Some((name, value)) = pair.split_once('=') else {
            continue;
        };
        let name = name.trim();
        let value = value.trim();
        if name.is_empty() {
            continue;
        }

        cookies.push(Cookie {
            name: name.to_string(),
            value: value.to_string(),
            domain: ".youtube.com".to_string(),
            path: "/".to_string(),
            secure: name.starts_with("__Secure-"),
            http_only: false,
            expires: None,
        });
    }

    cookies
}

/// Extract the visitor identifier from a page's HTML
pub fn extract_visitor_data_from_html(html: &str) -> Option<String> {
    let patterns = [
        r#""VISITOR_DATA"\s*:\s*"([^"]+)""#,
        r#"ytcfg\.set\s*\(\s*\{[^}]*"VISITOR_DATA"\s*:\s*"([^"]+)""#,
    ];

    for pattern in patterns {
        let Ok(re) = Regex::new(pattern) else {
            continue;
        };
        if let Some(captures) = re.captures(html) {
            if let Some(m) = captures.get(1) {
                return Some(m.as_str().to_string());
            }
        }
    }

    None
}

/// Extract the dataSyncId from a raw API response body
pub fn extract_data_sync_id_from_response(body: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(body);
    let re = Regex::new(r#""dataSyncId"\s*:\s*"([^"]+)""#).ok()?;
    let captures = re.captures(&text)?;
    Some(captures.get(1)?.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NETSCAPE_FIXTURE: &str = "\
# Netscape HTTP Cookie File
# This is a comment

.youtube.com\tTRUE\t/\tTRUE\t1999999999\tSAPISID\tabc123
.youtube.com\tTRUE\t/\tTRUE\t0\tSID\tsid-value
#HttpOnly_.youtube.com\tTRUE\t/\tTRUE\t1999999999\t__Secure-3PSID\tpsid-value
.youtube.com\tTRUE\t/\tFALSE\t1999999999\tVISITOR_INFO1_LIVE\tvisitor-abc
broken\tline
";

    #[test]
    fn test_parse_netscape_cookies() {
        let cookies = parse_netscape_cookies(NETSCAPE_FIXTURE);
        assert_eq!(cookies.len(), 4);

        assert_eq!(cookies[0].name, "SAPISID");
        assert_eq!(cookies[0].value, "abc123");
        assert!(cookies[0].secure);
        assert_eq!(cookies[0].expires, Some(1999999999));

        // Expiry 0 means no expiry
        assert_eq!(cookies[1].name, "SID");
        assert_eq!(cookies[1].expires, None);

        // #HttpOnly_ lines are cookies, not comments
        assert_eq!(cookies[2].name, "__Secure-3PSID");
        assert!(cookies[2].http_only);

        assert!(!cookies[3].secure);
    }

    #[test]
    fn test_parse_netscape_skips_short_lines() {
        let cookies = parse_netscape_cookies("a\tb\tc\n\n# comment\n");
        assert!(cookies.is_empty());
    }

    #[test]
    fn test_parse_json_cookies() {
        let json = r#"[
            {"name": "SAPISID", "value": "v1", "domain": ".youtube.com",
             "path": "/", "secure": true, "httpOnly": false,
             "expirationDate": 1999999999.5},
            {"name": "SID", "value": "v2", "domain": ".youtube.com",
             "path": "/", "secure": false, "httpOnly": true}
        ]"#;

        let cookies = parse_json_cookies(json).unwrap();
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies[0].name, "SAPISID");
        assert_eq!(cookies[0].expires, Some(1999999999));
        assert!(cookies[1].http_only);
        assert_eq!(cookies[1].expires, None);

        assert!(parse_json_cookies("not json").is_err());
    }

    #[test]
    fn test_parse_header_cookies() {
        let cookies = parse_header_cookies("SID=a; __Secure-3PAPISID=b ;VISITOR_INFO1_LIVE=c=d");
        assert_eq!(cookies.len(), 3);
        assert_eq!(cookies[0].name, "SID");
        assert!(!cookies[0].secure);
        assert_eq!(cookies[1].name, "__Secure-3PAPISID");
        assert!(cookies[1].secure);
        // Value keeps everything after the first '='
        assert_eq!(cookies[2].value, "c=d");
    }

    #[test]
    fn test_bundle_derived_fields() {
        let bundle = AuthBundle::from_header("SAPISID=abc; SID=x; VISITOR_INFO1_LIVE=vis");
        assert!(bundle.is_logged_in());
        assert_eq!(bundle.sapisid(), Some("abc"));
        assert_eq!(bundle.visitor_data(), Some("vis"));
    }

    #[test]
    fn test_sapisid_last_cookie_wins() {
        let bundle = AuthBundle::from_header("__Secure-3PAPISID=first; SAPISID=second");
        assert_eq!(bundle.sapisid(), Some("second"));

        let bundle = AuthBundle::from_header("SAPISID=second; __Secure-3PAPISID=first");
        assert_eq!(bundle.sapisid(), Some("first"));
    }

    #[test]
    fn test_logged_in_requires_sid() {
        let bundle = AuthBundle::from_header("SAPISID=abc; VISITOR_INFO1_LIVE=vis");
        assert!(!bundle.is_logged_in());

        let bundle = AuthBundle::from_header("__Secure-3PSID=x");
        assert!(bundle.is_logged_in());
    }

    #[test]
    fn test_cookie_header_insertion_order() {
        let bundle = AuthBundle::from_header("b=2; a=1; c=3");
        assert_eq!(bundle.cookie_header(), "b=2; a=1; c=3");
    }

    #[test]
    fn test_set_data_sync_id() {
        let mut bundle = AuthBundle::default();
        bundle.set_data_sync_id("SESSION123||tail||more");
        assert_eq!(bundle.data_sync_id(), Some("SESSION123||tail||more"));
        assert_eq!(bundle.session_id(), Some("SESSION123"));

        let mut bundle = AuthBundle::default();
        bundle.set_data_sync_id("");
        assert_eq!(bundle.data_sync_id(), None);
        assert_eq!(bundle.session_id(), None);
    }

    #[test]
    fn test_sapisid_hash_at_shape() {
        let input = "1700000000 abc https://www.youtube.com";
        let expected_digest = Sha1::digest(input.as_bytes());
        let expected = format!("SAPISIDHASH 1700000000_{:x}", expected_digest);

        assert_eq!(
            sapisid_hash_at(1_700_000_000, "abc", "https://www.youtube.com"),
            expected
        );

        // 40 hex digits after the underscore
        let hash = sapisid_hash_at(1_700_000_000, "abc", "https://www.youtube.com");
        let hex = hash.rsplit('_').next().unwrap();
        assert_eq!(hex.len(), 40);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_sapisid_hash_requires_sapisid() {
        let bundle = AuthBundle::from_header("SID=x");
        assert!(bundle.sapisid_hash("https://www.youtube.com").is_none());

        let bundle = AuthBundle::from_header("SAPISID=abc");
        let header = bundle.sapisid_hash("https://www.youtube.com").unwrap();
        assert!(header.starts_with("SAPISIDHASH "));
    }

    #[test]
    fn test_netscape_file_roundtrip() {
        let dir = std::env::temp_dir();
        let path = dir.join("rvr-test-cookies.txt");
        std::fs::write(&path, NETSCAPE_FIXTURE).unwrap();

        let bundle = AuthBundle::from_netscape_file(&path).unwrap();
        assert!(bundle.is_logged_in());
        assert_eq!(bundle.sapisid(), Some("abc123"));
        assert_eq!(bundle.visitor_data(), Some("visitor-abc"));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_extract_visitor_data_from_html() {
        let html = r#"ytcfg.set({"VISITOR_DATA":"CgtWaXNpdG9y","other":1});"#;
        assert_eq!(
            extract_visitor_data_from_html(html).as_deref(),
            Some("CgtWaXNpdG9y")
        );
        assert!(extract_visitor_data_from_html("no visitor here").is_none());
    }

    #[test]
    fn test_extract_data_sync_id_from_response() {
        let body = br#"{"responseContext":{"mainAppWebResponseContext":{"dataSyncId":"SESS||rest"}}}"#;
        assert_eq!(
            extract_data_sync_id_from_response(body).as_deref(),
            Some("SESS||rest")
        );
        assert!(extract_data_sync_id_from_response(b"{}").is_none());
    }
}
