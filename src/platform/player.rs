//! Player script acquisition
//!
//! The origin rotates a large player script that embeds the signature
//! cipher, the n-parameter transform, and the signature timestamp. The
//! acquirer locates the current script by trying sources in order (the
//! embedder loader, a well-known watch page, the embed page), downloads it
//! over a cookie-free transport, and mines it into an immutable
//! [`PlayerSnapshot`] shared by every subsequent resolve.
//!
//! Authenticated requests can redirect to a login page and hide the player
//! URL, which is why the transport here never carries cookies.

use crate::auth;
use crate::error::RvrError;
use crate::platform::cipher::{
    extract_signature_ops, extract_signature_timestamp, run_signature_ops, SigOp,
};
use crate::platform::nsolver::NSolver;
use regex::Regex;
use tracing::debug;

const ORIGIN: &str = "https://www.youtube.com";

/// The embedder-loader resource that names the current player id
const LOADER_URL: &str = "https://www.youtube.com/iframe_api";

/// A well-known watch page used as the second acquisition source
const WATCH_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

/// The embed page used as the last acquisition source
const EMBED_URL: &str = "https://www.youtube.com/embed/dQw4w9WgXcQ";

/// Immutable per-player record: everything mined from one player script
pub struct PlayerSnapshot {
    pub player_id: String,
    pub player_url: String,
    /// 5-digit signature timestamp, or 0 when the script publishes none
    pub signature_timestamp: u32,
    /// Ordered signature token list; empty when no cipher is present
    pub sig_ops: Vec<SigOp>,
    /// N-parameter solver compiled from this script
    pub nsolver: NSolver,
}

impl PlayerSnapshot {
    /// Mine a downloaded player script into a snapshot
    pub fn from_script(player_url: &str, player_js: &str) -> Result<Self, RvrError> {
        let sig_ops = extract_signature_ops(player_js)?;

        Ok(Self {
            player_id: extract_player_id(player_url),
            player_url: player_url.to_string(),
            signature_timestamp: extract_signature_timestamp(player_js),
            sig_ops,
            nsolver: NSolver::from_player_js(player_js),
        })
    }

    /// Replay the signature cipher over a raw signature
    pub fn decipher_signature(&self, signature: &str) -> String {
        run_signature_ops(&self.sig_ops, signature)
    }

    /// Solve the n-parameter challenge for one input
    pub async fn solve_n(&self, n: &str) -> String {
        self.nsolver.solve(n).await
    }
}

/// A freshly acquired player plus anything captured along the way
pub(crate) struct AcquiredPlayer {
    pub snapshot: PlayerSnapshot,
    /// Visitor identifier seen on the watch page, if that source was visited
    pub visitor_data: Option<String>,
}

/// Downloads the current player script over a cookie-free transport
pub(crate) struct PlayerLoader {
    http: reqwest::Client,
    user_agent: String,
    accept_language: String,
}

impl PlayerLoader {
    pub fn new(user_agent: &str, accept_language: &str) -> Self {
        Self {
            // Cookie-free on purpose; see module docs
            http: reqwest::Client::new(),
            user_agent: user_agent.to_string(),
            accept_language: accept_language.to_string(),
        }
    }

    /// Locate, download, and mine the current player script.
    ///
    /// Sources are tried in order and the first hit wins; only after every
    /// source fails does this return [`RvrError::PlayerUnavailable`].
    pub async fn acquire(&self) -> Result<AcquiredPlayer, RvrError> {
        let mut visitor_data = None;

        let player_url = match self.try_loader().await {
            Some(url) => url,
            None => match self.try_watch_page(&mut visitor_data).await {
                Some(url) => url,
                None => self
                    .try_embed_page()
                    .await
                    .ok_or(RvrError::PlayerUnavailable)?,
            },
        };

        debug!("player URL: {}", player_url);

        let player_js = self.fetch_text(&player_url).await?;
        let snapshot = PlayerSnapshot::from_script(&player_url, &player_js)?;

        Ok(AcquiredPlayer {
            snapshot,
            visitor_data,
        })
    }

    async fn try_loader(&self) -> Option<String> {
        let content = self.fetch_text(LOADER_URL).await.ok()?;
        let url = find_player_url_in_loader(&content);
        if url.is_none() {
            debug!("embedder loader yielded no player id");
        }
        url
    }

    async fn try_watch_page(&self, visitor_data: &mut Option<String>) -> Option<String> {
        let content = self.fetch_text(WATCH_URL).await.ok()?;

        // Incidentally capture the visitor identifier while we have the page
        if visitor_data.is_none() {
            *visitor_data = auth::extract_visitor_data_from_html(&content);
        }

        let url = find_player_url_in_watch_page(&content);
        if url.is_none() {
            debug!("watch page yielded no player URL");
        }
        url
    }

    async fn try_embed_page(&self) -> Option<String> {
        let content = self.fetch_text(EMBED_URL).await.ok()?;
        let url = find_player_url_in_embed(&content);
        if url.is_none() {
            debug!("embed page yielded no player URL");
        }
        url
    }

    async fn fetch_text(&self, url: &str) -> Result<String, RvrError> {
        let resp = self
            .http
            .get(url)
            .header("User-Agent", &self.user_agent)
            .header("Accept-Language", &self.accept_language)
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .send()
            .await?;

        Ok(resp.text().await?)
    }
}

/// Canonical player script path for a bare 8-hex player id
fn canonical_player_url(player_id: &str) -> String {
    format!(
        "{}/s/player/{}/player_ias.vflset/en_US/base.js",
        ORIGIN, player_id
    )
}

fn absolutize(path: &str) -> String {
    if path.starts_with("http") {
        path.to_string()
    } else {
        format!("{}{}", ORIGIN, path)
    }
}

/// Find the player id in the embedder-loader body.
///
/// The loader embeds `/s/player/<8-hex>/`, sometimes with escaped slashes.
pub(crate) fn find_player_url_in_loader(content: &str) -> Option<String> {
    let re = Regex::new(r"\\?/s\\?/player\\?/([0-9a-fA-F]{8})\\?/").ok()?;
    let captures = re.captures(content)?;
    Some(canonical_player_url(captures.get(1)?.as_str()))
}

/// Find the player URL in a watch page, trying patterns in priority order
pub(crate) fn find_player_url_in_watch_page(content: &str) -> Option<String> {
    let patterns = [
        // jsUrl inside the embedded player config
        r#""jsUrl"\s*:\s*"(/s/player/[^"]+/player_(?:ias|es6)\.vflset/[^"]+/base\.js)""#,
        // PLAYER_JS_URL field
        r#""PLAYER_JS_URL"\s*:\s*"(/s/player/[^"]+base\.js)""#,
        // Script tag pointing at a player asset
        r#"<script[^>]+src="(/s/player/[^"]+/base\.js)""#,
        // Raw player path
        r"(/s/player/[a-zA-Z0-9_-]+/player_(?:ias|es6)\.vflset/[a-zA-Z_]+/base\.js)",
        // Bare 8-hex id
        r"/s/player/([a-fA-F0-9]{8})/",
    ];

    for (i, pattern) in patterns.iter().enumerate() {
        let Ok(re) = Regex::new(pattern) else {
            continue;
        };
        if let Some(captures) = re.captures(content) {
            let Some(m) = captures.get(1) else { continue };
            let path = m.as_str();

            // The last pattern captures a bare id and needs the canonical path
            if i == patterns.len() - 1 && !path.contains('/') {
                return Some(canonical_player_url(path));
            }
            return Some(absolutize(path));
        }
    }

    None
}

/// Find the player URL in the embed page with the reduced pattern set
pub(crate) fn find_player_url_in_embed(content: &str) -> Option<String> {
    let patterns = [
        r#""jsUrl"\s*:\s*"([^"]+base\.js)""#,
        r#""PLAYER_JS_URL"\s*:\s*"([^"]+)""#,
        r"/s/player/([a-fA-F0-9]{8})/",
    ];

    for (i, pattern) in patterns.iter().enumerate() {
        let Ok(re) = Regex::new(pattern) else {
            continue;
        };
        if let Some(captures) = re.captures(content) {
            let Some(m) = captures.get(1) else { continue };
            let path = m.as_str();

            if i == patterns.len() - 1 && !path.contains('/') {
                return Some(canonical_player_url(path));
            }
            return Some(absolutize(path));
        }
    }

    None
}

/// Extract the player id from a player URL
pub fn extract_player_id(player_url: &str) -> String {
    let patterns = [
        r"/s/player/([a-zA-Z0-9_-]{8,})/",
        r"/([a-zA-Z0-9_-]{8,})/player",
        r"\b(vfl[a-zA-Z0-9_-]+)\b",
    ];

    for pattern in patterns {
        let Ok(re) = Regex::new(pattern) else {
            continue;
        };
        if let Some(captures) = re.captures(player_url) {
            if let Some(id) = captures.get(1) {
                return id.as_str().to_string();
            }
        }
    }

    String::new()
}
