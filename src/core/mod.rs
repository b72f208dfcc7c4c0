//! Core functionality: the stream resolver and the video data model

pub mod resolver;
pub mod video;

pub use resolver::{Client, ClientOptions};
pub use video::{ByteRange, Format, Thumbnail, Video};
