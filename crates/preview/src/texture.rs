use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::decode::{decode_jpeg_file, PixelBuffer};
use crate::{LoadError, UploadError};

/// Creates and destroys GPU textures for the preview cache.
pub trait TextureUploader {
    type Texture;

    /// Allocate a texture of the buffer's native size and copy every row into it.
    fn upload(&mut self, pixels: &PixelBuffer) -> Result<Self::Texture, UploadError>;

    /// Free a texture previously returned by [`upload`](Self::upload).
    fn release(&mut self, texture: Self::Texture);
}

#[derive(Debug)]
pub struct LoadedTexture<T> {
    pub texture: T,
    pub width: u32,
    pub height: u32,
    pub source: PathBuf,
}

impl<T> LoadedTexture<T> {
    pub fn size(&self) -> [f32; 2] { [self.width as f32, self.height as f32] }
}

/// Owns at most one preview texture.
///
/// Every load releases the current texture before anything else happens, so a
/// failed load leaves the cache empty rather than showing a stale image. The
/// texture is also released when the cache is dropped.
pub struct TextureCache<U: TextureUploader> {
    uploader: U,
    current: Option<LoadedTexture<U::Texture>>,
    fallback: Option<PathBuf>,
}

impl<U: TextureUploader> TextureCache<U> {
    pub fn new(uploader: U) -> Self {
        Self { uploader, current: None, fallback: None }
    }

    /// Image shown when a track's own image file does not exist.
    pub fn with_fallback(mut self, path: impl Into<PathBuf>) -> Self {
        self.fallback = Some(path.into());
        self
    }

    pub fn current(&self) -> Option<&LoadedTexture<U::Texture>> { self.current.as_ref() }

    pub fn is_empty(&self) -> bool { self.current.is_none() }

    pub fn uploader(&self) -> &U { &self.uploader }

    pub fn uploader_mut(&mut self) -> &mut U { &mut self.uploader }

    /// Release the owned texture, if any.
    pub fn release(&mut self) {
        if let Some(old) = self.current.take() {
            debug!("releasing preview texture for {}", old.source.display());
            self.uploader.release(old.texture);
        }
    }

    /// Drop GPU objects after the device was lost; call [`restore`](Self::restore) once it is back.
    pub fn invalidate(&mut self) { self.release(); }

    /// Recreate the texture for `path` after [`invalidate`](Self::invalidate).
    pub fn restore(&mut self, path: &Path) -> Result<&LoadedTexture<U::Texture>, LoadError> { self.load(path) }

    /// Upload already decoded pixels, replacing the current texture.
    pub fn replace(&mut self, pixels: &PixelBuffer, source: &Path) -> Result<&LoadedTexture<U::Texture>, UploadError> {
        self.release();
        let texture = self.uploader.upload(pixels)?;
        Ok(self.current.insert(LoadedTexture {
            texture,
            width: pixels.width,
            height: pixels.height,
            source: source.to_path_buf(),
        }))
    }

    /// Decode `path` and make it the current texture.
    ///
    /// A missing file falls back to the configured default image. On any error
    /// the cache is left empty.
    pub fn load(&mut self, path: &Path) -> Result<&LoadedTexture<U::Texture>, LoadError> {
        self.release();
        let (pixels, source) = match decode_jpeg_file(path) {
            Ok(pixels) => (pixels, path.to_path_buf()),
            Err(e) if e.is_soft() => match self.fallback.clone() {
                Some(fallback) => {
                    debug!("{} missing, using default image", path.display());
                    (decode_jpeg_file(&fallback)?, fallback)
                }
                None => {
                    debug!("{} missing and no default image", path.display());
                    return Err(e.into());
                }
            },
            Err(e) => {
                warn!("preview decode failed: {e}");
                return Err(e.into());
            }
        };
        self.replace(&pixels, &source).map_err(|e| {
            warn!("preview upload failed for {}: {e}", source.display());
            LoadError::from(e)
        })
    }
}

impl<U: TextureUploader> Drop for TextureCache<U> {
    fn drop(&mut self) { self.release(); }
}
