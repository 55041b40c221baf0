use eframe::egui;
use eframe::egui_wgpu::RenderState;
use eframe::wgpu;
use preview::{GpuTexture, PixelBuffer, TextureUploader, UploadError, WgpuTextureUploader};

/// A preview texture registered with the egui renderer.
pub(crate) struct EguiTexture {
    gpu: GpuTexture,
    pub(crate) id: egui::TextureId,
}

/// Uploads through wgpu and registers the view so egui can paint it.
pub(crate) struct EguiTextureUploader {
    inner: WgpuTextureUploader,
    render_state: RenderState,
}

impl EguiTextureUploader {
    pub(crate) fn new(render_state: RenderState) -> Self {
        let inner = WgpuTextureUploader::new(render_state.device.clone(), render_state.queue.clone());
        Self { inner, render_state }
    }
}

impl TextureUploader for EguiTextureUploader {
    type Texture = EguiTexture;

    fn upload(&mut self, pixels: &PixelBuffer) -> Result<EguiTexture, UploadError> {
        let gpu = self.inner.upload(pixels)?;
        let id = self.render_state.renderer.write().register_native_texture(
            &self.render_state.device,
            &gpu.view,
            wgpu::FilterMode::Linear,
        );
        Ok(EguiTexture { gpu, id })
    }

    fn release(&mut self, texture: EguiTexture) {
        self.render_state.renderer.write().free_texture(&texture.id);
        self.inner.release(texture.gpu);
    }
}
