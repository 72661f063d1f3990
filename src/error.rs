//! Error types for the rendering pipeline.
//!
//! A region that yields no geometry is not an error: analysis returns
//! `Ok(None)` and the caller skips it. Everything here is an input fault.

/// Errors raised for malformed inputs or configuration.
#[derive(thiserror::Error, Debug)]
pub enum PolishError {
    #[error("image has zero width or height")]
    EmptyImage,
    #[error("unsupported channel count {channels} (expected 3 or 4)")]
    UnsupportedChannels { channels: usize },
    #[error("dimension mismatch: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },
    #[error("mask is not binary (found value {value})")]
    NonBinaryMask { value: u8 },
    #[error("invalid parameter `{name}` = {value}")]
    InvalidParameter { name: &'static str, value: f32 },
    #[error("invalid hex colour `{0}`")]
    InvalidHexColor(String),
    #[error(transparent)]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PolishError>;
