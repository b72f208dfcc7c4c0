//! Stream download surface

pub mod stream;

pub use stream::{Progress, StreamHandler, StreamInfo};
