//! Player API response types

use serde::Deserialize;

/// Top-level response from the player API
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerResponse {
    pub response_context: Option<ResponseContext>,
    pub playability_status: Option<PlayabilityStatus>,
    pub video_details: Option<VideoDetails>,
    pub streaming_data: Option<StreamingData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResponseContext {
    pub visitor_data: Option<String>,
}

/// Whether the video can be played, and why not
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayabilityStatus {
    pub status: String,
    pub reason: Option<String>,
    pub playable_in_embed: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoDetails {
    pub video_id: String,
    pub title: String,
    pub author: String,
    pub channel_id: String,
    pub length_seconds: String,
    pub view_count: String,
    pub short_description: String,
    pub keywords: Vec<String>,
    pub is_live_content: bool,
    pub is_private: bool,
    pub thumbnail: ThumbnailContainer,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ThumbnailContainer {
    pub thumbnails: Vec<ThumbnailData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ThumbnailData {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamingData {
    pub expires_in_seconds: Option<String>,
    pub formats: Vec<RawFormat>,
    pub adaptive_formats: Vec<RawFormat>,
    pub hls_manifest_url: Option<String>,
    pub dash_manifest_url: Option<String>,
}

/// One raw format entry before deciphering and rewriting
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawFormat {
    pub itag: u32,
    pub url: Option<String>,
    pub signature_cipher: Option<String>,
    pub mime_type: String,

    pub bitrate: Option<u64>,
    pub average_bitrate: Option<u64>,
    pub content_length: Option<String>,

    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<u32>,
    pub quality: Option<String>,
    pub quality_label: Option<String>,

    pub audio_quality: Option<String>,
    pub audio_channels: Option<u32>,
    pub audio_sample_rate: Option<String>,

    pub init_range: Option<RawRange>,
    pub index_range: Option<RawRange>,
}

/// Byte range encoded as strings on the wire
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawRange {
    pub start: String,
    pub end: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_playable_response() {
        let json = r#"{
            "playabilityStatus": {"status": "OK"},
            "videoDetails": {
                "videoId": "dQw4w9WgXcQ",
                "title": "Test",
                "author": "Channel",
                "channelId": "UC123",
                "lengthSeconds": "212",
                "viewCount": "1000000",
                "shortDescription": "desc",
                "isLiveContent": false,
                "isPrivate": false,
                "thumbnail": {"thumbnails": [{"url": "https://t/img", "width": 120, "height": 90}]}
            },
            "streamingData": {
                "expiresInSeconds": "21540",
                "formats": [{"itag": 18, "url": "https://v/1", "mimeType": "video/mp4"}],
                "adaptiveFormats": [{
                    "itag": 140,
                    "signatureCipher": "s=abc&sp=sig&url=https%3A%2F%2Fv%2F2",
                    "mimeType": "audio/mp4",
                    "contentLength": "123456",
                    "audioSampleRate": "44100",
                    "initRange": {"start": "0", "end": "631"}
                }],
                "hlsManifestUrl": "https://m/hls"
            }
        }"#;

        let resp: PlayerResponse = serde_json::from_str(json).unwrap();

        assert_eq!(resp.playability_status.unwrap().status, "OK");

        let details = resp.video_details.unwrap();
        assert_eq!(details.video_id, "dQw4w9WgXcQ");
        assert_eq!(details.length_seconds, "212");
        assert_eq!(details.thumbnail.thumbnails.len(), 1);

        let streaming = resp.streaming_data.unwrap();
        assert_eq!(streaming.formats.len(), 1);
        assert_eq!(streaming.adaptive_formats.len(), 1);
        assert_eq!(streaming.hls_manifest_url.as_deref(), Some("https://m/hls"));

        let adaptive = &streaming.adaptive_formats[0];
        assert_eq!(adaptive.itag, 140);
        assert!(adaptive.url.is_none());
        assert!(adaptive.signature_cipher.is_some());
        assert_eq!(adaptive.init_range.as_ref().unwrap().end, "631");
    }

    #[test]
    fn test_parse_error_response() {
        let json = r#"{
            "playabilityStatus": {"status": "ERROR", "reason": "Video unavailable"}
        }"#;

        let resp: PlayerResponse = serde_json::from_str(json).unwrap();
        let status = resp.playability_status.unwrap();
        assert_eq!(status.status, "ERROR");
        assert_eq!(status.reason.as_deref(), Some("Video unavailable"));
        assert!(resp.streaming_data.is_none());
        assert!(resp.video_details.is_none());
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let json = r#"{
            "playabilityStatus": {"status": "OK", "futureField": {"x": 1}},
            "trackingParams": "abc"
        }"#;
        let resp: PlayerResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.playability_status.unwrap().status, "OK");
    }

    #[test]
    fn test_visitor_data_from_response_context() {
        let json = r#"{"responseContext": {"visitorData": "CgtW"}}"#;
        let resp: PlayerResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            resp.response_context.unwrap().visitor_data.as_deref(),
            Some("CgtW")
        );
    }
}
