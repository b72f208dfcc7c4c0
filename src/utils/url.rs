//! URL utilities: video ID extraction and query surgery

use crate::error::RvrError;
use regex::Regex;
use url::Url;

/// Extract the video ID from an ID or any supported watch URL shape.
///
/// Accepts a bare 11-character ID, `watch?v=`, `youtu.be/`, `embed/`, `v/`
/// and `shorts/` URLs.
pub fn extract_video_id(input: &str) -> Result<String, RvrError> {
    let input = input.trim();

    // Already an ID (11 URL-safe characters)
    if Regex::new(r"^[a-zA-Z0-9_-]{11}$")?.is_match(input) {
        return Ok(input.to_string());
    }

    let patterns = [
        r"(?:youtube\.com/watch\?(?:[^#]*&)?v=|youtu\.be/)([a-zA-Z0-9_-]{11})",
        r"youtube\.com/embed/([a-zA-Z0-9_-]{11})",
        r"youtube\.com/v/([a-zA-Z0-9_-]{11})",
        r"youtube\.com/shorts/([a-zA-Z0-9_-]{11})",
    ];

    for pattern in patterns {
        let re = Regex::new(pattern)?;
        if let Some(captures) = re.captures(input) {
            if let Some(id) = captures.get(1) {
                return Ok(id.as_str().to_string());
            }
        }
    }

    Err(RvrError::InvalidInput(input.to_string()))
}

/// Set (or replace) a query parameter on a URL, leaving other parameters in
/// place. Returns the input unchanged if it does not parse.
pub fn set_query_param(raw_url: &str, key: &str, value: &str) -> String {
    let mut parsed = match Url::parse(raw_url) {
        Ok(u) => u,
        Err(_) => return raw_url.to_string(),
    };

    let others: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k != key)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    {
        let mut q = parsed.query_pairs_mut();
        q.clear();
        for (k, v) in &others {
            q.append_pair(k, v);
        }
        q.append_pair(key, value);
    }

    parsed.to_string()
}

/// Get a query parameter value from a URL, if present.
pub fn get_query_param(raw_url: &str, key: &str) -> Option<String> {
    let parsed = Url::parse(raw_url).ok()?;
    parsed
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// Remove query parameters from a URL. Missing keys are ignored.
pub fn remove_query_params(raw_url: &str, keys: &[&str]) -> String {
    let mut parsed = match Url::parse(raw_url) {
        Ok(u) => u,
        Err(_) => return raw_url.to_string(),
    };

    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| !keys.contains(&k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        parsed.set_query(None);
    } else {
        let mut q = parsed.query_pairs_mut();
        q.clear();
        for (k, v) in &kept {
            q.append_pair(k, v);
        }
    }

    parsed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_video_id_bare() {
        assert_eq!(extract_video_id("dQw4w9WgXcQ").unwrap(), "dQw4w9WgXcQ");
        assert_eq!(extract_video_id("  dQw4w9WgXcQ  ").unwrap(), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_extract_video_id_urls() {
        let cases = [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtube.com/watch?v=dQw4w9WgXcQ&t=10s",
            "https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ?t=10",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/v/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
        ];
        for case in cases {
            assert_eq!(extract_video_id(case).unwrap(), "dQw4w9WgXcQ", "{}", case);
        }
    }

    #[test]
    fn test_extract_video_id_invalid() {
        assert!(matches!(
            extract_video_id("https://example.com/watch?v=dQw4w9WgXcQ"),
            Err(RvrError::InvalidInput(_))
        ));
        assert!(extract_video_id("tooshort").is_err());
        assert!(extract_video_id("").is_err());
        // 12 characters is not an ID
        assert!(extract_video_id("dQw4w9WgXcQ2").is_err());
    }

    #[test]
    fn test_set_query_param() {
        assert_eq!(
            set_query_param("https://h/seg?foo=1", "pot", "T"),
            "https://h/seg?foo=1&pot=T"
        );
        assert_eq!(set_query_param("https://h/seg", "pot", "T"), "https://h/seg?pot=T");
    }

    #[test]
    fn test_set_query_param_replaces() {
        let out = set_query_param("https://h/seg?pot=OLD&foo=1", "pot", "NEW");
        assert!(out.contains("pot=NEW"));
        assert!(!out.contains("pot=OLD"));
        assert_eq!(out.matches("pot=").count(), 1);
    }

    #[test]
    fn test_get_query_param() {
        assert_eq!(
            get_query_param("https://h/x?n=abc&s=1", "n").as_deref(),
            Some("abc")
        );
        assert_eq!(get_query_param("https://h/x?s=1", "n"), None);
    }

    #[test]
    fn test_remove_query_params() {
        let out = remove_query_params("https://h/x?s=SIG&sp=sig&n=abc", &["s", "sp"]);
        assert!(!out.contains("s=SIG"));
        assert!(!out.contains("sp=sig"));
        assert!(out.contains("n=abc"));

        let out = remove_query_params("https://h/x?s=SIG", &["s"]);
        assert_eq!(out, "https://h/x");
    }
}
