//! Video and format data model

use serde::{Deserialize, Serialize};

/// A resolved video with metadata and playable formats.
///
/// Every format URL in a returned `Video` is fully rewritten: signatures are
/// deciphered, n-parameters solved, and PO tokens attached where available.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Video {
    /// Video ID (11 URL-safe characters)
    pub id: String,
    /// Video title
    pub title: String,
    /// Video description
    pub description: String,
    /// Channel/author name
    pub author: String,
    /// Channel ID
    pub channel_id: String,
    /// Duration in seconds
    pub duration: u64,
    /// View count
    pub view_count: u64,
    /// Whether this is live content
    pub is_live: bool,
    /// Whether the video is private
    pub is_private: bool,
    /// Thumbnails, as published
    pub thumbnails: Vec<Thumbnail>,
    /// Resolved formats with ready-to-fetch URLs
    pub formats: Vec<Format>,
    /// HLS master manifest URL, token-attached when available
    pub hls_manifest_url: Option<String>,
    /// DASH manifest URL, token-attached when available
    pub dash_manifest_url: Option<String>,
    /// Visitor identifier captured from the page or API response
    pub visitor_data: Option<String>,
    /// dataSyncId captured from the API response (logged-in sessions)
    pub data_sync_id: Option<String>,
}

impl Video {
    /// Get the watch page URL for this video
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.id)
    }

    /// Get the highest resolution thumbnail
    pub fn best_thumbnail(&self) -> Option<&Thumbnail> {
        self.thumbnails.iter().max_by_key(|t| t.width)
    }

    /// Get formats matching a filter
    pub fn filter_formats(&self, filter: impl Fn(&Format) -> bool) -> Vec<&Format> {
        self.formats.iter().filter(|f| filter(f)).collect()
    }

    /// Get formats carrying video
    pub fn video_formats(&self) -> Vec<&Format> {
        self.filter_formats(Format::has_video)
    }

    /// Get formats carrying audio (including audio-only)
    pub fn audio_formats(&self) -> Vec<&Format> {
        self.filter_formats(Format::has_audio)
    }

    /// Get audio-only formats
    pub fn audio_only_formats(&self) -> Vec<&Format> {
        self.filter_formats(Format::is_audio_only)
    }

    /// Get video-only formats
    pub fn video_only_formats(&self) -> Vec<&Format> {
        self.filter_formats(Format::is_video_only)
    }

    /// Get formats that support HTTP range requests
    pub fn streamable_formats(&self) -> Vec<&Format> {
        self.filter_formats(Format::supports_range)
    }
}

/// A single playable format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Format {
    /// Integer format tag
    pub itag: u32,
    /// Fully rewritten stream URL
    pub url: String,
    /// MIME type with codec parameter, e.g. `video/mp4; codecs="avc1.64001F"`
    pub mime_type: String,
    /// Quality identifier, e.g. `hd720`
    pub quality: String,
    /// Human-readable quality label, e.g. `720p`
    pub quality_label: String,

    /// Video width in pixels
    pub width: Option<u32>,
    /// Video height in pixels
    pub height: Option<u32>,
    /// Frames per second
    pub fps: Option<u32>,

    /// Bitrate in bits per second
    pub bitrate: u64,
    /// Average bitrate in bits per second
    pub average_bitrate: u64,
    /// Content length in bytes; 0 when unknown
    pub content_length: u64,

    /// Audio quality identifier
    pub audio_quality: Option<String>,
    /// Audio channel count
    pub audio_channels: Option<u32>,
    /// Audio sample rate in Hz
    pub audio_sample_rate: Option<u64>,

    /// Initialization byte range for adaptive formats
    pub init_range: Option<ByteRange>,
    /// Index byte range for adaptive formats
    pub index_range: Option<ByteRange>,
}

impl Format {
    /// Check whether this format carries video
    pub fn has_video(&self) -> bool {
        self.width.unwrap_or(0) > 0 && self.height.unwrap_or(0) > 0
    }

    /// Check whether this format carries audio
    pub fn has_audio(&self) -> bool {
        self.audio_quality.is_some()
            || self.audio_channels.unwrap_or(0) > 0
            || self.audio_sample_rate.unwrap_or(0) > 0
    }

    /// Check whether this format is audio-only
    pub fn is_audio_only(&self) -> bool {
        self.has_audio() && !self.has_video()
    }

    /// Check whether this format is video-only
    pub fn is_video_only(&self) -> bool {
        self.has_video() && !self.has_audio()
    }

    /// Check whether this is an adaptive (separate audio/video) format
    pub fn is_adaptive(&self) -> bool {
        self.is_audio_only() || self.is_video_only()
    }

    /// Check whether this format supports HTTP range requests
    pub fn supports_range(&self) -> bool {
        self.content_length > 0
    }

    /// Get the file extension for this format
    pub fn extension(&self) -> &'static str {
        crate::utils::mime::ext_from_mime(&self.mime_type)
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "itag={}", self.itag)?;
        if self.has_video() {
            write!(
                f,
                " {}x{}",
                self.width.unwrap_or(0),
                self.height.unwrap_or(0)
            )?;
            if let Some(fps) = self.fps {
                write!(f, " {}fps", fps)?;
            }
        }
        if self.has_audio() {
            if let Some(rate) = self.audio_sample_rate {
                write!(f, " {}Hz", rate)?;
            }
            if let Some(ch) = self.audio_channels {
                write!(f, " {}ch", ch)?;
            }
        }
        if self.bitrate > 0 {
            write!(f, " {}kbps", self.bitrate / 1000)?;
        }
        if self.content_length > 0 {
            write!(f, " {:.1}MB", self.content_length as f64 / 1024.0 / 1024.0)?;
        }
        Ok(())
    }
}

/// A video thumbnail
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Thumbnail {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

/// A byte range, used for DASH initialization and index segments
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video_format() -> Format {
        Format {
            itag: 137,
            url: "https://example.com/video".to_string(),
            mime_type: "video/mp4; codecs=\"avc1.640028\"".to_string(),
            quality: "hd1080".to_string(),
            quality_label: "1080p".to_string(),
            width: Some(1920),
            height: Some(1080),
            fps: Some(30),
            bitrate: 4_000_000,
            content_length: 52_428_800,
            ..Default::default()
        }
    }

    fn audio_format() -> Format {
        Format {
            itag: 140,
            url: "https://example.com/audio".to_string(),
            mime_type: "audio/mp4; codecs=\"mp4a.40.2\"".to_string(),
            audio_quality: Some("AUDIO_QUALITY_MEDIUM".to_string()),
            audio_channels: Some(2),
            audio_sample_rate: Some(44100),
            bitrate: 128_000,
            content_length: 3_145_728,
            ..Default::default()
        }
    }

    #[test]
    fn test_format_classification() {
        let video = video_format();
        assert!(video.has_video());
        assert!(!video.has_audio());
        assert!(video.is_video_only());
        assert!(!video.is_audio_only());
        assert!(video.is_adaptive());

        let audio = audio_format();
        assert!(audio.has_audio());
        assert!(!audio.has_video());
        assert!(audio.is_audio_only());
        assert!(audio.is_adaptive());
    }

    #[test]
    fn test_progressive_format_is_not_adaptive() {
        let mut progressive = video_format();
        progressive.audio_quality = Some("AUDIO_QUALITY_LOW".to_string());
        assert!(progressive.has_video());
        assert!(progressive.has_audio());
        assert!(!progressive.is_adaptive());
    }

    #[test]
    fn test_supports_range() {
        assert!(video_format().supports_range());

        let mut unknown_len = video_format();
        unknown_len.content_length = 0;
        assert!(!unknown_len.supports_range());
    }

    #[test]
    fn test_format_extension() {
        assert_eq!(video_format().extension(), "mp4");
        assert_eq!(audio_format().extension(), "m4a");
    }

    #[test]
    fn test_format_display() {
        let s = format!("{}", video_format());
        assert!(s.contains("itag=137"));
        assert!(s.contains("1920x1080"));
        assert!(s.contains("30fps"));
        assert!(s.contains("4000kbps"));
        assert!(s.contains("50.0MB"));
    }

    #[test]
    fn test_video_helpers() {
        let video = Video {
            id: "dQw4w9WgXcQ".to_string(),
            thumbnails: vec![
                Thumbnail {
                    url: "small".to_string(),
                    width: 120,
                    height: 90,
                },
                Thumbnail {
                    url: "large".to_string(),
                    width: 1280,
                    height: 720,
                },
            ],
            formats: vec![video_format(), audio_format()],
            ..Default::default()
        };

        assert_eq!(
            video.watch_url(),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
        assert_eq!(video.best_thumbnail().unwrap().url, "large");
        assert_eq!(video.video_formats().len(), 1);
        assert_eq!(video.audio_only_formats().len(), 1);
        assert_eq!(video.video_only_formats().len(), 1);
        assert_eq!(video.streamable_formats().len(), 2);
    }

    #[test]
    fn test_best_thumbnail_empty() {
        let video = Video::default();
        assert!(video.best_thumbnail().is_none());
    }
}
