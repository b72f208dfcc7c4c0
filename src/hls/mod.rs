//! HLS manifest helpers
//!
//! Collaborator surface around the resolver: fetch and parse master and
//! media playlists and pull segment bytes, honoring the PO token attachment
//! rules (path-attached for manifests and playlists, query-attached for
//! segments).

use crate::error::RvrError;
use crate::platform::rewrite::{attach_token_to_manifest_url, attach_token_to_stream_url};
use bytes::Bytes;
use std::collections::HashMap;
use url::Url;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Options for HLS fetches
#[derive(Debug, Clone, Default)]
pub struct HlsOptions {
    pub user_agent: Option<String>,
    /// GVS token to attach to fetched URLs
    pub po_token: Option<String>,
}

/// A parsed master playlist
#[derive(Debug, Clone, Default)]
pub struct HlsMaster {
    pub base_url: String,
    pub variants: Vec<HlsVariant>,
    /// Audio renditions keyed by GROUP-ID
    pub audio_groups: HashMap<String, Vec<HlsAudioRendition>>,
}

/// One video variant in a master playlist
#[derive(Debug, Clone, Default)]
pub struct HlsVariant {
    pub uri: String,
    pub bandwidth: u64,
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    pub codecs: String,
    pub audio_group: Option<String>,
}

/// One audio rendition in a master playlist
#[derive(Debug, Clone, Default)]
pub struct HlsAudioRendition {
    pub uri: String,
    pub name: String,
    pub language: String,
    pub codecs: String,
    pub is_default: bool,
    pub autoselect: bool,
}

/// A parsed media playlist
#[derive(Debug, Clone, Default)]
pub struct HlsMediaPlaylist {
    pub segments: Vec<HlsSegment>,
    pub target_duration: u64,
    pub ended: bool,
}

/// One media segment
#[derive(Debug, Clone, Default)]
pub struct HlsSegment {
    pub uri: String,
    pub duration: f64,
}

/// Fetch and parse a master playlist
pub async fn get_hls_master(url: &str, options: &HlsOptions) -> Result<HlsMaster, RvrError> {
    let url = apply_manifest_token(url, options);
    let content = fetch_text(&url, options).await?;
    Ok(parse_master_playlist(&content, &url))
}

/// Fetch and parse a media playlist
pub async fn get_hls_playlist(
    url: &str,
    options: &HlsOptions,
) -> Result<HlsMediaPlaylist, RvrError> {
    let url = apply_manifest_token(url, options);
    let content = fetch_text(&url, options).await?;
    Ok(parse_media_playlist(&content, &url))
}

/// Fetch one segment's bytes
pub async fn get_hls_segment(url: &str, options: &HlsOptions) -> Result<Bytes, RvrError> {
    let url = match &options.po_token {
        Some(token) => attach_token_to_stream_url(url, token),
        None => url.to_string(),
    };

    let client = reqwest::Client::new();
    let response = client
        .get(&url)
        .header("User-Agent", user_agent(options))
        .header("Accept", "*/*")
        .header("Origin", "https://www.youtube.com")
        .header("Referer", "https://www.youtube.com/")
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(RvrError::ApiRejected {
            status: response.status().to_string(),
            reason: None,
        });
    }

    Ok(response.bytes().await?)
}

fn apply_manifest_token(url: &str, options: &HlsOptions) -> String {
    match &options.po_token {
        Some(token) => attach_token_to_manifest_url(url, token),
        None => url.to_string(),
    }
}

fn user_agent(options: &HlsOptions) -> String {
    options
        .user_agent
        .clone()
        .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string())
}

async fn fetch_text(url: &str, options: &HlsOptions) -> Result<String, RvrError> {
    let client = reqwest::Client::new();
    let response = client
        .get(url)
        .header("User-Agent", user_agent(options))
        .header("Accept", "*/*")
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(RvrError::ApiRejected {
            status: response.status().to_string(),
            reason: None,
        });
    }

    Ok(response.text().await?)
}

/// Parse a master playlist body.
///
/// A body that is actually a media playlist (segments, no variant tags)
/// parses as a single variant pointing at the playlist itself.
pub fn parse_master_playlist(content: &str, base_url: &str) -> HlsMaster {
    let mut master = HlsMaster {
        base_url: base_url.to_string(),
        ..Default::default()
    };

    if content.contains("#EXTINF:") && !content.contains("#EXT-X-STREAM-INF:") {
        master.variants.push(HlsVariant {
            uri: base_url.to_string(),
            ..Default::default()
        });
        return master;
    }

    let mut pending: Option<HlsVariant> = None;

    for line in content.lines() {
        let line = line.trim();

        if let Some(attrs_str) = line.strip_prefix("#EXT-X-MEDIA:") {
            let attrs = parse_attribute_list(attrs_str);
            if attrs.get("TYPE").map(String::as_str) != Some("AUDIO") {
                continue;
            }
            let (Some(group_id), Some(uri)) = (attrs.get("GROUP-ID"), attrs.get("URI")) else {
                continue;
            };

            master
                .audio_groups
                .entry(group_id.clone())
                .or_default()
                .push(HlsAudioRendition {
                    uri: resolve_url(base_url, uri),
                    name: attrs.get("NAME").cloned().unwrap_or_default(),
                    language: attrs.get("LANGUAGE").cloned().unwrap_or_default(),
                    codecs: attrs.get("CODECS").cloned().unwrap_or_default(),
                    is_default: attrs.get("DEFAULT").map(String::as_str) == Some("YES"),
                    autoselect: attrs.get("AUTOSELECT").map(String::as_str) == Some("YES"),
                });
        } else if let Some(attrs_str) = line.strip_prefix("#EXT-X-STREAM-INF:") {
            let attrs = parse_attribute_list(attrs_str);
            let mut variant = HlsVariant::default();

            if let Some(resolution) = attrs.get("RESOLUTION") {
                if let Some((w, h)) = resolution.split_once('x') {
                    variant.width = w.parse().unwrap_or(0);
                    variant.height = h.parse().unwrap_or(0);
                }
            }
            variant.bandwidth = attrs
                .get("BANDWIDTH")
                .and_then(|b| b.parse().ok())
                .unwrap_or(0);
            variant.frame_rate = attrs
                .get("FRAME-RATE")
                .and_then(|f| f.parse().ok())
                .unwrap_or(0.0);
            variant.codecs = attrs.get("CODECS").cloned().unwrap_or_default();
            variant.audio_group = attrs.get("AUDIO").cloned();

            pending = Some(variant);
        } else if !line.is_empty() && !line.starts_with('#') {
            if let Some(mut variant) = pending.take() {
                variant.uri = resolve_url(base_url, line);
                master.variants.push(variant);
            }
        }
    }

    master
}

/// Parse a media playlist body
pub fn parse_media_playlist(content: &str, base_url: &str) -> HlsMediaPlaylist {
    let mut playlist = HlsMediaPlaylist::default();
    let mut pending_duration: Option<f64> = None;

    for line in content.lines() {
        let line = line.trim();

        if let Some(value) = line.strip_prefix("#EXT-X-TARGETDURATION:") {
            playlist.target_duration = value.parse().unwrap_or(0);
        } else if let Some(value) = line.strip_prefix("#EXTINF:") {
            let duration = value.split(',').next().unwrap_or("0");
            pending_duration = duration.parse().ok();
        } else if line == "#EXT-X-ENDLIST" {
            playlist.ended = true;
        } else if !line.is_empty() && !line.starts_with('#') {
            if let Some(duration) = pending_duration.take() {
                playlist.segments.push(HlsSegment {
                    uri: resolve_url(base_url, line),
                    duration,
                });
            }
        }
    }

    playlist
}

/// Parse an HLS attribute list, honoring quoted values
fn parse_attribute_list(attrs: &str) -> HashMap<String, String> {
    let mut result = HashMap::new();
    let mut rest = attrs;

    while !rest.is_empty() {
        let Some(eq) = rest.find('=') else { break };
        let key = rest[..eq].trim().to_string();
        rest = &rest[eq + 1..];

        let value;
        if let Some(stripped) = rest.strip_prefix('"') {
            let end = stripped.find('"').unwrap_or(stripped.len());
            value = stripped[..end].to_string();
            rest = stripped.get(end + 1..).unwrap_or("");
            rest = rest.strip_prefix(',').unwrap_or(rest);
        } else {
            let end = rest.find(',').unwrap_or(rest.len());
            value = rest[..end].trim().to_string();
            rest = rest.get(end + 1..).unwrap_or("");
        }

        if !key.is_empty() {
            result.insert(key, value);
        }
    }

    result
}

/// Resolve a possibly-relative playlist URI against its base URL
fn resolve_url(base: &str, uri: &str) -> String {
    if uri.starts_with("http://") || uri.starts_with("https://") {
        return uri.to_string();
    }
    match Url::parse(base).and_then(|b| b.join(uri)) {
        Ok(resolved) => resolved.to_string(),
        Err(_) => uri.to_string(),
    }
}
