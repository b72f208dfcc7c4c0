//! # rvr - Rust Video Stream Resolver
//!
//! Client library that resolves the playable media streams for a video on a
//! major video-sharing platform and returns URLs a downloader can actually
//! fetch. The hard part is not HTTP; it is reproducing, out-of-browser, the
//! admission protocol the origin enforces on its own clients:
//!
//! - mining the rotating player script for the signature cipher and the
//!   signature timestamp
//! - solving the obfuscated n-parameter throttling challenge in an embedded
//!   JavaScript evaluator
//! - walking an ordered matrix of impersonated innertube clients until one
//!   returns a playable response
//! - minting proof-of-origin tokens from an external oracle and attaching
//!   them to every stream and manifest URL
//!
//! ## Example
//!
//! ```rust,no_run
//! use rvr::{Client, StreamHandler};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new();
//!     let video = client.get_video("dQw4w9WgXcQ").await?;
//!     println!("{} ({} formats)", video.title, video.formats.len());
//!
//!     if let Some(audio) = video.audio_only_formats().first() {
//!         let mut out = tokio::fs::File::create("audio.m4a").await?;
//!         StreamHandler::new().download(audio, &mut out).await?;
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod core;
pub mod download;
pub mod error;
pub mod hls;
pub mod platform;
pub mod utils;

// Re-export main types
pub use crate::core::resolver::{Client, ClientOptions};
pub use crate::core::video::{ByteRange, Format, Thumbnail, Video};
pub use auth::AuthBundle;
pub use download::stream::{Progress, StreamHandler, StreamInfo};
pub use error::RvrError;
pub use platform::clients::ClientConfig;
pub use platform::pot::PotProvider;

/// Result type alias for rvr operations
pub type Result<T> = std::result::Result<T, RvrError>;
