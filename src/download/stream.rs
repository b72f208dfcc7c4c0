//! Streaming downloads with range requests
//!
//! Formats with a known content length are fetched in 10 MiB chunks over
//! HTTP range requests; transport failures retry a chunk up to 3 times with
//! linear backoff (attempt × 1 s), while deterministic rejections fail
//! immediately. Formats without a known length fall back to a plain GET.
//! Streaming transfers impose no wall clock; cancellation is dropping the
//! future.

use crate::core::video::Format;
use crate::error::RvrError;
use futures_util::{StreamExt, TryStreamExt};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::io::StreamReader;
use tracing::debug;

const DEFAULT_CHUNK_SIZE: u64 = 10 * 1024 * 1024;
const DEFAULT_MAX_RETRIES: u32 = 3;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Download progress, reported after each chunk
#[derive(Debug, Clone, Copy, Default)]
pub struct Progress {
    /// Total bytes, 0 when unknown
    pub total: u64,
    /// Bytes written so far
    pub downloaded: u64,
    /// Average transfer speed in bytes per second
    pub speed_bps: f64,
}

/// Metadata about a stream, probed without downloading
#[derive(Debug, Clone, Default)]
pub struct StreamInfo {
    pub content_length: u64,
    pub content_type: String,
    pub accept_ranges: bool,
}

/// Downloads resolved formats to writers
pub struct StreamHandler {
    http: reqwest::Client,
    user_agent: String,
    chunk_size: u64,
    max_retries: u32,
}

impl StreamHandler {
    /// Create a handler with default settings
    pub fn new() -> Self {
        Self {
            // No timeout: transfers rely on chunk-level retries instead of
            // a wall clock
            http: reqwest::Client::new(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Set the chunk size for ranged downloads
    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Set the per-chunk retry limit
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Set the user agent for stream requests
    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    /// Download a format to a writer.
    ///
    /// Uses ranged chunks when the content length is known, a plain GET
    /// otherwise.
    pub async fn download<W>(&self, format: &Format, writer: &mut W) -> Result<(), RvrError>
    where
        W: AsyncWrite + Unpin,
    {
        if format.url.is_empty() {
            return Err(RvrError::InvalidInput("format has no URL".to_string()));
        }

        if format.content_length > 0 {
            self.download_chunks(&format.url, writer, 0, format.content_length, |_| {})
                .await
        } else {
            self.download_simple(&format.url, writer, |_| {}).await
        }
    }

    /// Download a byte range of a format to a writer
    pub async fn download_range<W>(
        &self,
        format: &Format,
        writer: &mut W,
        start: u64,
        end: u64,
    ) -> Result<(), RvrError>
    where
        W: AsyncWrite + Unpin,
    {
        if format.url.is_empty() {
            return Err(RvrError::InvalidInput("format has no URL".to_string()));
        }
        self.download_chunks(&format.url, writer, start, end, |_| {})
            .await
    }

    /// Download with a progress callback invoked after each chunk
    pub async fn download_with_progress<W, F>(
        &self,
        format: &Format,
        writer: &mut W,
        mut callback: F,
    ) -> Result<(), RvrError>
    where
        W: AsyncWrite + Unpin,
        F: FnMut(Progress),
    {
        if format.url.is_empty() {
            return Err(RvrError::InvalidInput("format has no URL".to_string()));
        }

        let mut total = format.content_length;
        if total == 0 {
            if let Ok(info) = self.stream_info(format).await {
                total = info.content_length;
            }
        }

        let started = Instant::now();
        let on_chunk = |downloaded: u64| {
            callback(progress_snapshot(total, downloaded, started.elapsed()));
        };

        if total > 0 {
            self.download_chunks(&format.url, writer, 0, total, on_chunk)
                .await
        } else {
            self.download_simple(&format.url, writer, on_chunk).await
        }
    }

    /// Open a reader over the format, optionally over a byte range.
    ///
    /// Returns the reader and the response's content length.
    pub async fn stream(
        &self,
        format: &Format,
        range: Option<(u64, u64)>,
    ) -> Result<(impl AsyncRead + Send + Unpin, u64), RvrError> {
        if format.url.is_empty() {
            return Err(RvrError::InvalidInput("format has no URL".to_string()));
        }

        let mut request = self.request(&format.url);
        if let Some((start, end)) = range {
            request = request.header("Range", format_range(start, end));
        }

        let response = request.send().await?;
        let status = response.status();
        if status != reqwest::StatusCode::OK && status != reqwest::StatusCode::PARTIAL_CONTENT {
            return Err(RvrError::ApiRejected {
                status: status.to_string(),
                reason: None,
            });
        }

        let content_length = response.content_length().unwrap_or(0);
        let reader = Box::pin(StreamReader::new(
            response
                .bytes_stream()
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e)),
        ));

        Ok((reader, content_length))
    }

    /// Probe stream metadata with a HEAD request
    pub async fn stream_info(&self, format: &Format) -> Result<StreamInfo, RvrError> {
        if format.url.is_empty() {
            return Err(RvrError::InvalidInput("format has no URL".to_string()));
        }

        let response = self
            .http
            .head(&format.url)
            .header("User-Agent", &self.user_agent)
            .header("Accept", "*/*")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RvrError::ApiRejected {
                status: response.status().to_string(),
                reason: None,
            });
        }

        Ok(StreamInfo {
            content_length: response.content_length().unwrap_or(0),
            content_type: response
                .headers()
                .get("Content-Type")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string(),
            accept_ranges: response
                .headers()
                .get("Accept-Ranges")
                .and_then(|v| v.to_str().ok())
                == Some("bytes"),
        })
    }

    async fn download_chunks<W, F>(
        &self,
        url: &str,
        writer: &mut W,
        start: u64,
        end: u64,
        mut on_chunk: F,
    ) -> Result<(), RvrError>
    where
        W: AsyncWrite + Unpin,
        F: FnMut(u64),
    {
        let mut downloaded = 0u64;

        for (chunk_start, chunk_end) in chunk_ranges(start, end, self.chunk_size) {
            self.download_chunk_with_retries(url, writer, chunk_start, chunk_end)
                .await?;
            downloaded += chunk_end - chunk_start + 1;
            on_chunk(downloaded);
        }

        writer.flush().await?;
        Ok(())
    }

    async fn download_chunk_with_retries<W>(
        &self,
        url: &str,
        writer: &mut W,
        start: u64,
        end: u64,
    ) -> Result<(), RvrError>
    where
        W: AsyncWrite + Unpin,
    {
        let mut last_error = None;

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                debug!("retrying chunk {}-{} (attempt {})", start, end, attempt + 1);
                tokio::time::sleep(retry_delay(attempt)).await;
            }

            match self.fetch_chunk(url, writer, start, end).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() => last_error = Some(e),
                // A deterministic rejection fails the same way every time
                Err(e) => return Err(e),
            }
        }

        Err(last_error
            .unwrap_or_else(|| RvrError::InvalidInput("retry limit is zero".to_string())))
    }

    async fn fetch_chunk<W>(
        &self,
        url: &str,
        writer: &mut W,
        start: u64,
        end: u64,
    ) -> Result<(), RvrError>
    where
        W: AsyncWrite + Unpin,
    {
        let response = self
            .request(url)
            .header("Range", format_range(start, end))
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK && status != reqwest::StatusCode::PARTIAL_CONTENT {
            return Err(RvrError::ApiRejected {
                status: status.to_string(),
                reason: None,
            });
        }

        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            writer.write_all(&chunk?).await?;
        }

        Ok(())
    }

    async fn download_simple<W, F>(
        &self,
        url: &str,
        writer: &mut W,
        mut on_chunk: F,
    ) -> Result<(), RvrError>
    where
        W: AsyncWrite + Unpin,
        F: FnMut(u64),
    {
        let response = self.request(url).send().await?;

        if !response.status().is_success() {
            return Err(RvrError::ApiRejected {
                status: response.status().to_string(),
                reason: None,
            });
        }

        let mut downloaded = 0u64;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            writer.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            on_chunk(downloaded);
        }

        writer.flush().await?;
        Ok(())
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        self.http
            .get(url)
            .header("User-Agent", &self.user_agent)
            .header("Accept", "*/*")
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("Origin", "https://www.youtube.com")
            .header("Referer", "https://www.youtube.com/")
    }
}

impl Default for StreamHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Inclusive byte ranges covering `[start, end)` in `chunk_size` steps
fn chunk_ranges(start: u64, end: u64, chunk_size: u64) -> Vec<(u64, u64)> {
    let mut ranges = Vec::new();
    let mut pos = start;
    while pos < end {
        let chunk_end = (pos + chunk_size - 1).min(end - 1);
        ranges.push((pos, chunk_end));
        pos = chunk_end + 1;
    }
    ranges
}

fn format_range(start: u64, end: u64) -> String {
    format!("bytes={}-{}", start, end)
}

/// Linear backoff: attempt × 1 s
fn retry_delay(attempt: u32) -> Duration {
    Duration::from_secs(attempt as u64)
}

fn progress_snapshot(total: u64, downloaded: u64, elapsed: Duration) -> Progress {
    let secs = elapsed.as_secs_f64();
    Progress {
        total,
        downloaded,
        speed_bps: if secs > 0.0 {
            downloaded as f64 / secs
        } else {
            0.0
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_ranges_exact_multiple() {
        assert_eq!(chunk_ranges(0, 30, 10), vec![(0, 9), (10, 19), (20, 29)]);
    }

    #[test]
    fn test_chunk_ranges_with_remainder() {
        assert_eq!(chunk_ranges(0, 25, 10), vec![(0, 9), (10, 19), (20, 24)]);
    }

    #[test]
    fn test_chunk_ranges_single_chunk() {
        assert_eq!(chunk_ranges(0, 5, 10), vec![(0, 4)]);
    }

    #[test]
    fn test_chunk_ranges_offset_start() {
        assert_eq!(chunk_ranges(100, 125, 10), vec![(100, 109), (110, 119), (120, 124)]);
    }

    #[test]
    fn test_chunk_ranges_empty() {
        assert!(chunk_ranges(10, 10, 10).is_empty());
        assert!(chunk_ranges(20, 10, 10).is_empty());
    }

    #[test]
    fn test_chunk_ranges_cover_everything_once() {
        let ranges = chunk_ranges(0, 52_428_800, DEFAULT_CHUNK_SIZE);
        assert_eq!(ranges.len(), 5);
        assert_eq!(ranges.first(), Some(&(0, DEFAULT_CHUNK_SIZE - 1)));
        assert_eq!(ranges.last().unwrap().1, 52_428_799);

        let covered: u64 = ranges.iter().map(|(s, e)| e - s + 1).sum();
        assert_eq!(covered, 52_428_800);
    }

    #[test]
    fn test_format_range() {
        assert_eq!(format_range(0, 9), "bytes=0-9");
        assert_eq!(format_range(100, 199), "bytes=100-199");
    }

    #[test]
    fn test_retry_delay_is_linear() {
        assert_eq!(retry_delay(1), Duration::from_secs(1));
        assert_eq!(retry_delay(2), Duration::from_secs(2));
        assert_eq!(retry_delay(3), Duration::from_secs(3));
    }

    #[test]
    fn test_progress_snapshot() {
        let p = progress_snapshot(100, 50, Duration::from_secs(2));
        assert_eq!(p.total, 100);
        assert_eq!(p.downloaded, 50);
        assert!((p.speed_bps - 25.0).abs() < f64::EPSILON);

        let p = progress_snapshot(0, 10, Duration::ZERO);
        assert_eq!(p.speed_bps, 0.0);
    }

    #[test]
    fn test_builder_settings() {
        let handler = StreamHandler::new()
            .with_chunk_size(1024)
            .with_max_retries(5)
            .with_user_agent("test-agent");
        assert_eq!(handler.chunk_size, 1024);
        assert_eq!(handler.max_retries, 5);
        assert_eq!(handler.user_agent, "test-agent");

        // Degenerate values are clamped
        let handler = StreamHandler::new().with_chunk_size(0).with_max_retries(0);
        assert_eq!(handler.chunk_size, 1);
        assert_eq!(handler.max_retries, 1);
    }

    #[tokio::test]
    async fn test_download_requires_url() {
        let handler = StreamHandler::new();
        let format = Format::default();
        let mut sink = Vec::new();

        let err = handler.download(&format, &mut sink).await.unwrap_err();
        assert!(matches!(err, RvrError::InvalidInput(_)));

        let err = handler
            .download_with_progress(&format, &mut sink, |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, RvrError::InvalidInput(_)));

        let err = handler.stream(&format, None).await.map(|_| ()).unwrap_err();
        assert!(matches!(err, RvrError::InvalidInput(_)));
    }
}
