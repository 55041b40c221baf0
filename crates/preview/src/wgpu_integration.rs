//! WGPU upload path for preview textures.
//!
//! Decoded BGRX pixels map directly onto `Bgra8Unorm`; the X byte is always
//! 0xFF so the texture samples as opaque.

use std::sync::Arc;

use tracing::debug;
use wgpu::{Device, Queue};

use crate::decode::PixelBuffer;
use crate::texture::TextureUploader;
use crate::UploadError;

pub const PREVIEW_TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Bgra8Unorm;

/// A preview texture and the view used to sample it.
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

pub struct WgpuTextureUploader {
    device: Arc<Device>,
    queue: Arc<Queue>,
}

impl WgpuTextureUploader {
    pub fn new(device: Arc<Device>, queue: Arc<Queue>) -> Self {
        Self { device, queue }
    }

    fn check_size(&self, pixels: &PixelBuffer) -> Result<(), UploadError> {
        if pixels.width == 0 || pixels.height == 0 {
            return Err(UploadError::EmptyImage);
        }
        let limit = self.device.limits().max_texture_dimension_2d;
        if pixels.width > limit || pixels.height > limit {
            return Err(UploadError::TooLarge { width: pixels.width, height: pixels.height, limit });
        }
        let expected = pixels.bytes_per_row() * pixels.height as usize;
        if pixels.bgrx.len() != expected {
            return Err(UploadError::SizeMismatch { expected, actual: pixels.bgrx.len() });
        }
        Ok(())
    }
}

impl TextureUploader for WgpuTextureUploader {
    type Texture = GpuTexture;

    fn upload(&mut self, pixels: &PixelBuffer) -> Result<GpuTexture, UploadError> {
        self.check_size(pixels)?;
        let size = wgpu::Extent3d { width: pixels.width, height: pixels.height, depth_or_array_layers: 1 };

        // Allocation and copy errors surface through error scopes rather than panics.
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("track_preview"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: PREVIEW_TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &pixels.bgrx,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(pixels.bytes_per_row() as u32),
                rows_per_image: Some(pixels.height),
            },
            size,
        );
        let validation = pollster::block_on(self.device.pop_error_scope());
        let oom = pollster::block_on(self.device.pop_error_scope());
        if let Some(err) = validation.or(oom) {
            texture.destroy();
            return Err(UploadError::Device(err.to_string()));
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        debug!("uploaded {}x{} preview texture", pixels.width, pixels.height);
        Ok(GpuTexture { texture, view })
    }

    fn release(&mut self, texture: GpuTexture) {
        texture.texture.destroy();
    }
}
