//! Innertube client registry
//!
//! The player API accepts many impersonated client identities, each with its
//! own admission rules. Identifiers here (names, versions, context ids, user
//! agents, device fields) are copied verbatim from the origin's published
//! values; a request rejected for one client identity may succeed for
//! another, so the resolver walks these configs in a deliberate order.

use serde::Serialize;

/// Streaming protocol a GVS token policy applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Https,
    Dash,
    Hls,
}

/// When a PO token is required for one protocol or context
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenPolicy {
    pub required: bool,
    pub recommended: bool,
    pub not_required_for_premium: bool,
    pub not_required_with_player_token: bool,
}

const POLICY_NONE: TokenPolicy = TokenPolicy {
    required: false,
    recommended: false,
    not_required_for_premium: false,
    not_required_with_player_token: false,
};

const POLICY_RECOMMENDED: TokenPolicy = TokenPolicy {
    recommended: true,
    ..POLICY_NONE
};

const POLICY_WEB_REQUIRED: TokenPolicy = TokenPolicy {
    required: true,
    recommended: true,
    not_required_for_premium: true,
    not_required_with_player_token: false,
};

const POLICY_APP_REQUIRED: TokenPolicy = TokenPolicy {
    required: true,
    recommended: true,
    not_required_for_premium: false,
    not_required_with_player_token: true,
};

/// GVS token policies per streaming protocol
#[derive(Debug, Clone, Copy, Default)]
pub struct GvsPolicies {
    pub https: TokenPolicy,
    pub dash: TokenPolicy,
    pub hls: TokenPolicy,
}

const GVS_NONE: GvsPolicies = GvsPolicies {
    https: POLICY_NONE,
    dash: POLICY_NONE,
    hls: POLICY_NONE,
};

const GVS_WEB: GvsPolicies = GvsPolicies {
    https: POLICY_WEB_REQUIRED,
    dash: POLICY_WEB_REQUIRED,
    hls: TokenPolicy {
        required: false,
        recommended: true,
        not_required_for_premium: false,
        not_required_with_player_token: false,
    },
};

const GVS_APP: GvsPolicies = GvsPolicies {
    https: POLICY_APP_REQUIRED,
    dash: POLICY_APP_REQUIRED,
    hls: TokenPolicy {
        required: false,
        recommended: true,
        not_required_for_premium: false,
        not_required_with_player_token: true,
    },
};

impl GvsPolicies {
    /// Get the policy for one protocol
    pub fn for_protocol(&self, protocol: Protocol) -> TokenPolicy {
        match protocol {
            Protocol::Https => self.https,
            Protocol::Dash => self.dash,
            Protocol::Hls => self.hls,
        }
    }
}

/// An impersonated innertube client identity and its admission policies
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub name: &'static str,
    pub version: &'static str,
    pub host: &'static str,
    /// Numeric context id sent as `X-YouTube-Client-Name`
    pub context_id: u32,

    pub user_agent: Option<&'static str>,
    pub device_make: Option<&'static str>,
    pub device_model: Option<&'static str>,
    pub os_name: Option<&'static str>,
    pub os_version: Option<&'static str>,

    pub requires_js_player: bool,
    pub supports_cookies: bool,
    pub supports_ad_playback_context: bool,
    pub requires_auth: bool,

    pub gvs_token_policies: GvsPolicies,
    pub player_token_policy: TokenPolicy,
    pub subs_token_policy: TokenPolicy,
}

impl ClientConfig {
    /// True iff any per-protocol GVS policy marks the token required
    pub fn requires_gvs_token(&self) -> bool {
        self.gvs_token_policies.https.required
            || self.gvs_token_policies.dash.required
            || self.gvs_token_policies.hls.required
    }

    /// True iff the player-token policy marks the token required
    pub fn requires_player_token(&self) -> bool {
        self.player_token_policy.required
    }

    /// Whether the resolver should mint a player token for this client's API
    /// request: any required GVS policy or a required player policy
    pub fn wants_po_token(&self) -> bool {
        self.requires_gvs_token() || self.requires_player_token()
    }

    /// Build the innertube request context for this client
    pub fn context(&self, visitor_data: Option<&str>) -> InnertubeContext {
        InnertubeContext {
            client: ClientInfo {
                client_name: self.name,
                client_version: self.version,
                user_agent: self.user_agent,
                device_make: self.device_make,
                device_model: self.device_model,
                os_name: self.os_name,
                os_version: self.os_version,
                hl: "en",
                time_zone: "UTC",
                utc_offset_minutes: 0,
                visitor_data: visitor_data.map(|v| v.to_string()),
            },
        }
    }
}

/// Client context sent with every player API request
#[derive(Debug, Clone, Serialize)]
pub struct InnertubeContext {
    pub client: ClientInfo,
}

/// Client identification fields inside the request context
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    pub client_name: &'static str,
    pub client_version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_make: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_model: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_name: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_version: Option<&'static str>,
    pub hl: &'static str,
    pub time_zone: &'static str,
    pub utc_offset_minutes: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visitor_data: Option<String>,
}

const BASE: ClientConfig = ClientConfig {
    name: "",
    version: "",
    host: "www.youtube.com",
    context_id: 0,
    user_agent: None,
    device_make: None,
    device_model: None,
    os_name: None,
    os_version: None,
    requires_js_player: false,
    supports_cookies: false,
    supports_ad_playback_context: false,
    requires_auth: false,
    gvs_token_policies: GVS_NONE,
    player_token_policy: POLICY_NONE,
    subs_token_policy: POLICY_NONE,
};

/// Standard web browser client
pub static WEB: ClientConfig = ClientConfig {
    name: "WEB",
    version: "2.20250925.01.00",
    context_id: 1,
    requires_js_player: true,
    supports_cookies: true,
    supports_ad_playback_context: true,
    gvs_token_policies: GVS_WEB,
    ..BASE
};

/// Web client with a Safari user agent; returns HLS formats with pre-merged
/// video+audio
pub static WEB_SAFARI: ClientConfig = ClientConfig {
    name: "WEB",
    version: "2.20250925.01.00",
    context_id: 1,
    user_agent: Some(
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/15.5 Safari/605.1.15,gzip(gfe)",
    ),
    requires_js_player: true,
    supports_cookies: true,
    supports_ad_playback_context: true,
    gvs_token_policies: GVS_WEB,
    ..BASE
};

/// Embedded player context
pub static WEB_EMBEDDED: ClientConfig = ClientConfig {
    name: "WEB_EMBEDDED_PLAYER",
    version: "1.20250923.21.00",
    context_id: 56,
    requires_js_player: true,
    supports_cookies: true,
    ..BASE
};

/// Music web client
pub static WEB_MUSIC: ClientConfig = ClientConfig {
    name: "WEB_REMIX",
    version: "1.20250922.03.00",
    host: "music.youtube.com",
    context_id: 67,
    requires_js_player: true,
    supports_cookies: true,
    supports_ad_playback_context: true,
    gvs_token_policies: GVS_WEB,
    ..BASE
};

/// Creator-suite client; requires authentication
pub static WEB_CREATOR: ClientConfig = ClientConfig {
    name: "WEB_CREATOR",
    version: "1.20250922.03.00",
    context_id: 62,
    requires_js_player: true,
    requires_auth: true,
    supports_cookies: true,
    gvs_token_policies: GVS_WEB,
    ..BASE
};

/// Android app client
pub static ANDROID: ClientConfig = ClientConfig {
    name: "ANDROID",
    version: "20.10.38",
    context_id: 3,
    user_agent: Some("com.google.android.youtube/20.10.38 (Linux; U; Android 11) gzip"),
    os_name: Some("Android"),
    os_version: Some("11"),
    gvs_token_policies: GVS_APP,
    player_token_policy: POLICY_RECOMMENDED,
    ..BASE
};

/// Lean Android profile that carries no PO token requirement; the preferred
/// anonymous fallback
pub static ANDROID_SDKLESS: ClientConfig = ClientConfig {
    name: "ANDROID",
    version: "20.10.38",
    context_id: 3,
    user_agent: Some("com.google.android.youtube/20.10.38 (Linux; U; Android 11) gzip"),
    os_name: Some("Android"),
    os_version: Some("11"),
    ..BASE
};

/// Oculus Quest client
pub static ANDROID_VR: ClientConfig = ClientConfig {
    name: "ANDROID_VR",
    version: "1.65.10",
    context_id: 28,
    user_agent: Some(
        "com.google.android.apps.youtube.vr.oculus/1.65.10 (Linux; U; Android 12L; eureka-user Build/SQ3A.220605.009.A1) gzip",
    ),
    device_make: Some("Oculus"),
    device_model: Some("Quest 3"),
    os_name: Some("Android"),
    os_version: Some("12L"),
    ..BASE
};

/// iOS app client; provides HLS live streams
pub static IOS: ClientConfig = ClientConfig {
    name: "IOS",
    version: "20.10.4",
    context_id: 5,
    user_agent: Some(
        "com.google.ios.youtube/20.10.4 (iPhone16,2; U; CPU iOS 18_3_2 like Mac OS X;)",
    ),
    device_make: Some("Apple"),
    device_model: Some("iPhone16,2"),
    os_name: Some("iPhone"),
    os_version: Some("18.3.2.22D82"),
    gvs_token_policies: GvsPolicies {
        https: POLICY_APP_REQUIRED,
        dash: POLICY_NONE,
        hls: POLICY_APP_REQUIRED,
    },
    player_token_policy: POLICY_RECOMMENDED,
    ..BASE
};

/// Mobile web client; has ultralow formats
pub static MWEB: ClientConfig = ClientConfig {
    name: "MWEB",
    version: "2.20250925.01.00",
    context_id: 2,
    user_agent: Some(
        "Mozilla/5.0 (iPad; CPU OS 16_7_10 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.6 Mobile/15E148 Safari/604.1,gzip(gfe)",
    ),
    requires_js_player: true,
    supports_cookies: true,
    supports_ad_playback_context: true,
    gvs_token_policies: GVS_WEB,
    ..BASE
};

/// Living-room (smart TV) client
pub static TV: ClientConfig = ClientConfig {
    name: "TVHTML5",
    version: "7.20250923.13.00",
    context_id: 7,
    user_agent: Some("Mozilla/5.0 (ChromiumStylePlatform) Cobalt/Version"),
    requires_js_player: true,
    supports_cookies: true,
    ..BASE
};

/// Downgraded living-room client; works better for some videos and is the
/// preferred authenticated entry
pub static TV_DOWNGRADED: ClientConfig = ClientConfig {
    name: "TVHTML5",
    version: "5.20251105",
    context_id: 7,
    user_agent: Some("Mozilla/5.0 (ChromiumStylePlatform) Cobalt/Version"),
    requires_js_player: true,
    supports_cookies: true,
    ..BASE
};

/// Simplified living-room client
pub static TV_SIMPLY: ClientConfig = ClientConfig {
    name: "TVHTML5_SIMPLY",
    version: "1.0",
    context_id: 75,
    requires_js_player: true,
    gvs_token_policies: GvsPolicies {
        https: TokenPolicy {
            required: true,
            recommended: true,
            not_required_for_premium: false,
            not_required_with_player_token: false,
        },
        dash: TokenPolicy {
            required: true,
            recommended: true,
            not_required_for_premium: false,
            not_required_with_player_token: false,
        },
        hls: POLICY_RECOMMENDED,
    },
    ..BASE
};

/// Living-room embedded player; requires authentication
pub static TV_EMBEDDED: ClientConfig = ClientConfig {
    name: "TVHTML5_SIMPLY_EMBEDDED_PLAYER",
    version: "2.0",
    context_id: 85,
    requires_js_player: true,
    requires_auth: true,
    supports_cookies: true,
    ..BASE
};

/// Default client order for anonymous (logged-out) resolves: a client with
/// no PO token requirement first, then the web client, then the living-room
/// client.
pub fn anonymous_clients() -> Vec<&'static ClientConfig> {
    vec![&ANDROID_SDKLESS, &WEB, &TV]
}

/// Default client order for authenticated resolves
pub fn authenticated_clients() -> Vec<&'static ClientConfig> {
    vec![&TV_DOWNGRADED, &WEB_SAFARI, &WEB]
}

/// Default client order for premium subscribers
pub fn premium_clients() -> Vec<&'static ClientConfig> {
    vec![&TV_DOWNGRADED, &WEB_CREATOR, &WEB]
}

/// Look up a client config by registry name
pub fn client_by_name(name: &str) -> Option<&'static ClientConfig> {
    match name.to_ascii_lowercase().as_str() {
        "web" => Some(&WEB),
        "web_safari" => Some(&WEB_SAFARI),
        "web_embedded" => Some(&WEB_EMBEDDED),
        "web_music" => Some(&WEB_MUSIC),
        "web_creator" => Some(&WEB_CREATOR),
        "android" => Some(&ANDROID),
        "android_sdkless" => Some(&ANDROID_SDKLESS),
        "android_vr" => Some(&ANDROID_VR),
        "ios" => Some(&IOS),
        "mweb" => Some(&MWEB),
        "tv" => Some(&TV),
        "tv_downgraded" => Some(&TV_DOWNGRADED),
        "tv_simply" => Some(&TV_SIMPLY),
        "tv_embedded" => Some(&TV_EMBEDDED),
        _ => None,
    }
}
