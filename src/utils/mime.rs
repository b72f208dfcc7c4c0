//! MIME type helpers

/// Map a MIME type (with optional codec parameter) to a file extension
pub fn ext_from_mime(mime_type: &str) -> &'static str {
    let base = mime_type
        .split(';')
        .next()
        .unwrap_or(mime_type)
        .trim()
        .to_ascii_lowercase();

    match base.as_str() {
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/3gpp" => "3gp",
        "audio/mp4" => "m4a",
        "audio/webm" => "webm",
        "audio/mpeg" => "mp3",
        _ if base.starts_with("video/") => "mp4",
        _ if base.starts_with("audio/") => "m4a",
        _ => "mp4",
    }
}

/// Extract the codec list from a MIME type's `codecs="…"` parameter
pub fn codecs_from_mime(mime_type: &str) -> Vec<String> {
    let marker = "codecs=\"";
    let Some(start) = mime_type.find(marker) else {
        return Vec::new();
    };
    let rest = &mime_type[start + marker.len()..];
    let Some(end) = rest.find('"') else {
        return Vec::new();
    };

    rest[..end]
        .split(',')
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}
