//! Track preview images: JPEG decoding and single-slot GPU texture ownership.
//!
//! The pipeline is file read -> JPEG header -> BGRX pixel buffer -> texture upload.
//! Uploading goes through the [`TextureUploader`] seam so the cache can be driven
//! by wgpu in the overlay and by a counting fake in tests.

use std::path::PathBuf;
use thiserror::Error;

mod decode;
mod texture;
mod wgpu_integration;

pub use decode::{decode_jpeg, decode_jpeg_file, PixelBuffer};
pub use texture::{LoadedTexture, TextureCache, TextureUploader};
pub use wgpu_integration::{GpuTexture, WgpuTextureUploader, PREVIEW_TEXTURE_FORMAT};

/// Failure while turning a file on disk into a pixel buffer.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The image does not exist. Callers treat this as "use the default image".
    #[error("image not found: {0}")]
    FileNotFound(PathBuf),

    #[error("image file is empty: {0}")]
    EmptyFile(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("invalid JPEG header: {0}")]
    Header(String),

    #[error("corrupt JPEG data: {0}")]
    Corrupt(String),

    #[error("unsupported JPEG colour layout {0}")]
    UnsupportedColor(String),

    #[error("cannot allocate {bytes} bytes for a {width}x{height} image")]
    Allocation { width: u32, height: u32, bytes: u64 },
}

impl DecodeError {
    /// Soft failures mean "no image for this track", not a broken pipeline.
    pub fn is_soft(&self) -> bool {
        matches!(self, DecodeError::FileNotFound(_))
    }
}

/// Failure while creating or filling the GPU texture.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("image has no pixels")]
    EmptyImage,

    #[error("{width}x{height} exceeds the device texture limit of {limit}")]
    TooLarge { width: u32, height: u32, limit: u32 },

    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("texture creation failed: {0}")]
    Device(String),
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Upload(#[from] UploadError),
}

impl LoadError {
    pub fn is_soft(&self) -> bool {
        matches!(self, LoadError::Decode(e) if e.is_soft())
    }
}
