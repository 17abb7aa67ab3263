//! Error types shared across the crate.

use thiserror::Error;

/// Convenience alias for fallible retmatch operations.
pub type RetMatchResult<T> = std::result::Result<T, RetMatchError>;

/// Errors surfaced by image containers, the preprocessing pipeline and the
/// similarity engine.
#[derive(Debug, Error, PartialEq)]
pub enum RetMatchError {
    /// An image with a zero dimension was supplied.
    #[error("invalid image dimensions {width}x{height}")]
    InvalidImage { width: usize, height: usize },

    /// The backing buffer holds fewer elements than the geometry requires.
    #[error("buffer too small: need {needed} elements, got {got}")]
    BufferTooSmall { needed: usize, got: usize },

    /// The row stride is smaller than the image width.
    #[error("stride {stride} is smaller than width {width}")]
    InvalidStride { width: usize, stride: usize },

    /// An operation received an image with a channel count it cannot handle.
    #[error("{operation} cannot operate on {got} channel(s)")]
    UnsupportedChannelCount { operation: &'static str, got: u8 },

    /// A kernel, block or structuring element size failed validation.
    #[error("invalid kernel size {size}: {reason}")]
    InvalidKernelSize { size: usize, reason: &'static str },

    /// Neither image of a pair fits inside the other.
    #[error("incompatible image dimensions {width_a}x{height_a} vs {width_b}x{height_b}")]
    DimensionMismatch {
        width_a: usize,
        height_a: usize,
        width_b: usize,
        height_b: usize,
    },

    /// No file exists at the given path.
    #[cfg(feature = "image-io")]
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    /// The file exists but is not a decodable image.
    #[cfg(feature = "image-io")]
    #[error("failed to decode image: {reason}")]
    DecodeError { reason: String },

    /// Writing an image to disk failed.
    #[cfg(feature = "image-io")]
    #[error("failed to write image: {reason}")]
    WriteError { reason: String },
}
