//! Stream resolver
//!
//! The [`Client`] drives the whole admission protocol for one video: ensure
//! a player snapshot, walk the innertube client order, build each request
//! with the signature timestamp and any player token, and rewrite every URL
//! in the first playable response. Clients are tried strictly in order; the
//! first `"OK"` response wins and the last failure is preserved when none
//! does.

use crate::auth::{self, AuthBundle};
use crate::core::video::{ByteRange, Format, Thumbnail, Video};
use crate::error::RvrError;
use crate::platform::clients::{self, ClientConfig};
use crate::platform::player::{PlayerLoader, PlayerSnapshot};
use crate::platform::pot::PotProvider;
use crate::platform::response::{PlayerResponse, RawFormat, RawRange};
use crate::platform::rewrite;
use crate::utils::url::extract_video_id;
use serde_json::json;
use std::sync::{Arc, RwLock};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

const ORIGIN: &str = "https://www.youtube.com";

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Configuration for a [`Client`]
#[derive(Default)]
pub struct ClientOptions {
    /// Token oracle URL; empty selects the default local endpoint
    pub pot_server_url: Option<String>,
    /// Global user agent for requests without a per-client override
    pub user_agent: Option<String>,
    pub accept_language: Option<String>,
    /// Ordered client list override; empty selects a default order by
    /// authentication state
    pub clients: Vec<&'static ClientConfig>,
    /// Log every intermediate client failure
    pub debug: bool,

    /// Pre-built authentication bundle
    pub auth: Option<AuthBundle>,
    /// Netscape cookie file to load
    pub cookie_file: Option<std::path::PathBuf>,
    /// JSON cookie export to load
    pub cookie_json_file: Option<std::path::PathBuf>,
    /// Raw `Cookie` header string
    pub cookie_header: Option<String>,
}

/// The stream-resolution client
pub struct Client {
    http: reqwest::Client,
    pot: PotProvider,
    auth: RwLock<Option<AuthBundle>>,
    clients: Vec<&'static ClientConfig>,
    player: OnceCell<Arc<PlayerSnapshot>>,
    visitor_data: RwLock<Option<String>>,
    user_agent: String,
    accept_language: String,
    debug: bool,
}

impl Client {
    /// Create a client with default options
    pub fn new() -> Self {
        Self::with_options(ClientOptions::default())
            .expect("default client options are infallible")
    }

    /// Create a client with custom options.
    ///
    /// Fails only when a configured cookie file cannot be loaded.
    pub fn with_options(options: ClientOptions) -> Result<Self, RvrError> {
        let mut bundle = options.auth;
        if bundle.is_none() {
            if let Some(path) = &options.cookie_file {
                bundle = Some(AuthBundle::from_netscape_file(path)?);
            }
        }
        if bundle.is_none() {
            if let Some(path) = &options.cookie_json_file {
                bundle = Some(AuthBundle::from_json_file(path)?);
            }
        }
        if bundle.is_none() {
            if let Some(header) = &options.cookie_header {
                bundle = Some(AuthBundle::from_header(header));
            }
        }

        let clients = if !options.clients.is_empty() {
            options.clients
        } else if bundle.as_ref().is_some_and(|b| b.is_logged_in()) {
            clients::authenticated_clients()
        } else {
            clients::anonymous_clients()
        };

        Ok(Self {
            // The main API request carries no hard timeout; callers cancel
            // by dropping the future
            http: reqwest::Client::new(),
            pot: PotProvider::new(options.pot_server_url.as_deref().unwrap_or("")),
            auth: RwLock::new(bundle),
            clients,
            player: OnceCell::new(),
            visitor_data: RwLock::new(None),
            user_agent: options
                .user_agent
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            accept_language: options
                .accept_language
                .unwrap_or_else(|| DEFAULT_ACCEPT_LANGUAGE.to_string()),
            debug: options.debug,
        })
    }

    /// Resolve a video from an ID or URL.
    ///
    /// Every format URL in the returned [`Video`] is fully rewritten: no
    /// signature cipher or raw n-parameter remains, and PO tokens are
    /// attached wherever the oracle answered.
    pub async fn get_video(&self, input: &str) -> Result<Video, RvrError> {
        let video_id = extract_video_id(input)?;

        let snapshot = self.ensure_player().await?;

        let mut last_error: Option<RvrError> = None;
        for config in &self.clients {
            debug!("trying client {} v{}", config.name, config.version);
            match self.fetch_with_client(&video_id, config, &snapshot).await {
                Ok(video) => return Ok(video),
                Err(e) => {
                    if self.debug {
                        warn!("client {} failed: {}", config.name, e);
                    } else {
                        debug!("client {} failed: {}", config.name, e);
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(RvrError::AllClientsFailed {
            last: Box::new(
                last_error
                    .unwrap_or_else(|| RvrError::InvalidInput("no clients configured".to_string())),
            ),
        })
    }

    /// Set the visitor identifier used in request contexts and headers
    pub fn set_visitor_data(&self, visitor_data: &str) {
        let mut guard = self.visitor_data.write().expect("visitor lock poisoned");
        *guard = Some(visitor_data.to_string());
    }

    /// Whether this client carries a logged-in cookie bundle
    pub fn is_authenticated(&self) -> bool {
        self.auth
            .read()
            .expect("auth lock poisoned")
            .as_ref()
            .is_some_and(|b| b.is_logged_in())
    }

    /// Rebuild the player snapshot on next use; the periodic self-refresh of
    /// a background loop is replaced by this caller-driven invalidation
    pub fn refresh_player(&mut self) {
        self.player = OnceCell::new();
    }

    /// Build (once) and share the player snapshot
    async fn ensure_player(&self) -> Result<Arc<PlayerSnapshot>, RvrError> {
        let snapshot = self
            .player
            .get_or_try_init(|| async {
                let loader = PlayerLoader::new(&self.user_agent, &self.accept_language);
                let acquired = loader.acquire().await?;

                if let Some(visitor) = acquired.visitor_data {
                    let mut guard = self.visitor_data.write().expect("visitor lock poisoned");
                    if guard.is_none() {
                        *guard = Some(visitor);
                    }
                }

                Ok::<_, RvrError>(Arc::new(acquired.snapshot))
            })
            .await?;

        Ok(snapshot.clone())
    }

    fn visitor(&self) -> Option<String> {
        if let Some(v) = self
            .visitor_data
            .read()
            .expect("visitor lock poisoned")
            .clone()
        {
            return Some(v);
        }
        self.auth
            .read()
            .expect("auth lock poisoned")
            .as_ref()
            .and_then(|b| b.visitor_data().map(|v| v.to_string()))
    }

    fn data_sync_id(&self) -> Option<String> {
        let guard = self.auth.read().expect("auth lock poisoned");
        let bundle = guard.as_ref()?;
        if !bundle.is_logged_in() {
            return None;
        }
        bundle.data_sync_id().map(|d| d.to_string())
    }

    /// Attempt one innertube client against the player API
    async fn fetch_with_client(
        &self,
        video_id: &str,
        config: &ClientConfig,
        snapshot: &PlayerSnapshot,
    ) -> Result<Video, RvrError> {
        // A missing player token is not fatal; the request may still succeed
        let player_token = if config.wants_po_token() && self.pot.is_available().await {
            match self.pot.get_token(video_id).await {
                Ok(token) => Some(token),
                Err(e) => {
                    debug!("player token mint failed: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let visitor = self.visitor();
        let body = build_player_request_body(
            config,
            video_id,
            visitor.as_deref(),
            snapshot.signature_timestamp,
            player_token.as_deref(),
        );

        let url = format!("https://{}/youtubei/v1/player?prettyPrint=false", config.host);
        let mut request = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .header("X-YouTube-Client-Name", config.context_id.to_string())
            .header("X-YouTube-Client-Version", config.version)
            .header("Origin", ORIGIN)
            .header("Referer", format!("{}/", ORIGIN))
            .header(
                "User-Agent",
                config.user_agent.unwrap_or(self.user_agent.as_str()),
            )
            .header("Accept-Language", &self.accept_language);

        if let Some(visitor) = &visitor {
            request = request.header("X-Goog-Visitor-Id", visitor);
        }

        {
            let guard = self.auth.read().expect("auth lock poisoned");
            if let Some(bundle) = guard.as_ref() {
                request = request.header("Cookie", bundle.cookie_header());
                if bundle.is_logged_in() {
                    if let Some(hash) = bundle.sapisid_hash(ORIGIN) {
                        request = request
                            .header("Authorization", hash)
                            .header("X-Origin", ORIGIN);
                    }
                }
            }
        }

        let response = request.json(&body).send().await?;
        let bytes = response.bytes().await?;

        // Logged-in responses carry the dataSyncId that GVS tokens bind to
        if self.is_authenticated() {
            if let Some(dsid) = auth::extract_data_sync_id_from_response(&bytes) {
                let mut guard = self.auth.write().expect("auth lock poisoned");
                if let Some(bundle) = guard.as_mut() {
                    bundle.set_data_sync_id(&dsid);
                }
            }
        }

        self.parse_player_response(&bytes, snapshot).await
    }

    /// Parse a player API response body into a fully rewritten [`Video`]
    async fn parse_player_response(
        &self,
        body: &[u8],
        snapshot: &PlayerSnapshot,
    ) -> Result<Video, RvrError> {
        let resp: PlayerResponse = serde_json::from_slice(body)?;

        let status = resp.playability_status.unwrap_or_default();
        if status.status != "OK" {
            return Err(RvrError::ApiRejected {
                status: status.status,
                reason: status.reason,
            });
        }

        // Capture the visitor identifier from the response if still unknown
        if let Some(visitor) = resp
            .response_context
            .and_then(|ctx| ctx.visitor_data)
        {
            let mut guard = self.visitor_data.write().expect("visitor lock poisoned");
            if guard.is_none() {
                *guard = Some(visitor);
            }
        }

        let details = resp.video_details.unwrap_or_default();
        let streaming = resp.streaming_data.unwrap_or_default();

        // GVS token binds to the session id when logged in, the visitor
        // identifier otherwise; missing tokens degrade, not fail
        let gvs_token = if self.pot.is_available().await {
            let visitor = self.visitor().unwrap_or_default();
            let data_sync_id = self.data_sync_id().unwrap_or_default();
            match self.pot.get_gvs_token(&visitor, &data_sync_id).await {
                Ok(token) => Some(token),
                Err(e) => {
                    debug!("GVS token mint failed: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let mut video = Video {
            id: details.video_id,
            title: details.title,
            description: details.short_description,
            author: details.author,
            channel_id: details.channel_id,
            duration: details.length_seconds.parse().unwrap_or(0),
            view_count: details.view_count.parse().unwrap_or(0),
            is_live: details.is_live_content,
            is_private: details.is_private,
            thumbnails: details
                .thumbnail
                .thumbnails
                .into_iter()
                .map(|t| Thumbnail {
                    url: t.url,
                    width: t.width,
                    height: t.height,
                })
                .collect(),
            visitor_data: self.visitor(),
            data_sync_id: self.data_sync_id(),
            ..Default::default()
        };

        // Formats then adaptiveFormats; a failed rewrite skips that one
        // format and never aborts the resolve
        for raw in streaming.formats.iter().chain(streaming.adaptive_formats.iter()) {
            let has_url = raw.url.as_deref().is_some_and(|u| !u.is_empty());
            let has_cipher = raw
                .signature_cipher
                .as_deref()
                .is_some_and(|c| !c.is_empty());
            if !has_url && !has_cipher {
                debug!("skipping itag {} with no URL source", raw.itag);
                continue;
            }

            match rewrite::rewrite_stream_url(
                snapshot,
                raw.url.as_deref(),
                raw.signature_cipher.as_deref(),
                gvs_token.as_deref(),
            )
            .await
            {
                Ok(url) => video.formats.push(format_from_raw(raw, url)),
                Err(e) => {
                    debug!("skipping itag {}: {}", raw.itag, e);
                }
            }
        }

        video.hls_manifest_url = streaming.hls_manifest_url.map(|u| match &gvs_token {
            Some(token) => rewrite::attach_token_to_manifest_url(&u, token),
            None => u,
        });
        video.dash_manifest_url = streaming.dash_manifest_url.map(|u| match &gvs_token {
            Some(token) => rewrite::attach_token_to_manifest_url(&u, token),
            None => u,
        });

        Ok(video)
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the player API request body for one client
fn build_player_request_body(
    config: &ClientConfig,
    video_id: &str,
    visitor_data: Option<&str>,
    signature_timestamp: u32,
    player_token: Option<&str>,
) -> serde_json::Value {
    let mut body = json!({
        "context": config.context(visitor_data),
        "videoId": video_id,
        "playbackContext": {
            "contentPlaybackContext": {
                "signatureTimestamp": signature_timestamp,
                "html5Preference": "HTML5_PREF_WANTS",
            }
        },
        "racyCheckOk": true,
        "contentCheckOk": true,
    });

    if let Some(token) = player_token {
        body["serviceIntegrityDimensions"] = json!({ "poToken": token });
    }

    body
}

fn format_from_raw(raw: &RawFormat, url: String) -> Format {
    Format {
        itag: raw.itag,
        url,
        mime_type: raw.mime_type.clone(),
        quality: raw.quality.clone().unwrap_or_default(),
        quality_label: raw.quality_label.clone().unwrap_or_default(),
        width: raw.width,
        height: raw.height,
        fps: raw.fps,
        bitrate: raw.bitrate.unwrap_or(0),
        average_bitrate: raw.average_bitrate.unwrap_or(0),
        content_length: raw
            .content_length
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0),
        audio_quality: raw.audio_quality.clone(),
        audio_channels: raw.audio_channels,
        audio_sample_rate: raw
            .audio_sample_rate
            .as_deref()
            .and_then(|s| s.parse().ok()),
        init_range: raw.init_range.as_ref().map(range_from_raw),
        index_range: raw.index_range.as_ref().map(range_from_raw),
    }
}

fn range_from_raw(raw: &RawRange) -> ByteRange {
    ByteRange {
        start: raw.start.parse().unwrap_or(0),
        end: raw.end.parse().unwrap_or(0),
    }
}
