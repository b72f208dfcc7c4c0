//! Utility functions for rvr

pub mod cache;
pub mod mime;
pub mod url;
