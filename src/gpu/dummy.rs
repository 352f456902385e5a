//! Dummy GPU device for testing and development.
//!
//! This device doesn't perform actual GPU operations but provides a valid
//! implementation for exercising the scheduler without GPU hardware. Every
//! call is appended to an operation journal that tests can inspect.

use std::sync::Arc;

use crate::scene::MeshInstanceRef;

use super::device::{
    DeviceCapabilities, GpuPassDescriptor, GpuResult, GraphicsDevice, TextureHandle,
};
use super::render_target::RenderTarget;
use super::types::{TextureDescriptor, TextureFormat};

/// One recorded device operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpuOp {
    CreateTexture(TextureHandle),
    DestroyTexture(TextureHandle),
    BeginPass {
        label: Option<String>,
        backbuffer: bool,
    },
    EndPass,
    Copy {
        dst: TextureHandle,
        color: bool,
        depth: bool,
    },
    GenerateMipmaps(TextureHandle),
    DrawDepthOnly(usize),
}

/// Dummy GPU device.
#[derive(Debug)]
pub struct DummyDevice {
    capabilities: DeviceCapabilities,
    backbuffer_size: (u32, u32),
    backbuffer_format: TextureFormat,
    next_texture: u64,
    alive_textures: Vec<TextureHandle>,
    journal: Vec<GpuOp>,
}

impl Default for DummyDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl DummyDevice {
    /// Create a new dummy device with default capabilities and a
    /// 1280x720 backbuffer.
    pub fn new() -> Self {
        Self {
            capabilities: DeviceCapabilities::default(),
            backbuffer_size: (1280, 720),
            backbuffer_format: TextureFormat::Bgra8Unorm,
            next_texture: 1,
            alive_textures: Vec::new(),
            journal: Vec::new(),
        }
    }

    /// Override the reported capabilities.
    pub fn with_capabilities(mut self, capabilities: DeviceCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Set the reported backbuffer size.
    pub fn set_backbuffer_size(&mut self, width: u32, height: u32) {
        self.backbuffer_size = (width, height);
    }

    /// Get the recorded operation journal.
    pub fn journal(&self) -> &[GpuOp] {
        &self.journal
    }

    /// Clear the recorded operation journal.
    pub fn clear_journal(&mut self) {
        self.journal.clear();
    }

    /// Number of textures created so far.
    pub fn created_texture_count(&self) -> usize {
        self.journal
            .iter()
            .filter(|op| matches!(op, GpuOp::CreateTexture(_)))
            .count()
    }

    /// Textures created but not yet destroyed.
    pub fn alive_textures(&self) -> &[TextureHandle] {
        &self.alive_textures
    }
}

impl GraphicsDevice for DummyDevice {
    fn capabilities(&self) -> DeviceCapabilities {
        self.capabilities
    }

    fn backbuffer_size(&self) -> (u32, u32) {
        self.backbuffer_size
    }

    fn backbuffer_format(&self) -> TextureFormat {
        self.backbuffer_format
    }

    fn create_texture(&mut self, descriptor: &TextureDescriptor) -> GpuResult<TextureHandle> {
        let handle = TextureHandle(self.next_texture);
        self.next_texture += 1;
        self.alive_textures.push(handle);
        self.journal.push(GpuOp::CreateTexture(handle));
        log::trace!(
            "DummyDevice: creating texture {:?} ({}x{}, {:?})",
            descriptor.label,
            descriptor.width,
            descriptor.height,
            descriptor.format
        );
        Ok(handle)
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        self.alive_textures.retain(|&t| t != texture);
        self.journal.push(GpuOp::DestroyTexture(texture));
        log::trace!("DummyDevice: destroying texture {:?}", texture);
    }

    fn begin_render_pass(&mut self, descriptor: &GpuPassDescriptor<'_>) {
        self.journal.push(GpuOp::BeginPass {
            label: descriptor.label.map(str::to_string),
            backbuffer: descriptor.target.is_none(),
        });
    }

    fn end_render_pass(&mut self) {
        self.journal.push(GpuOp::EndPass);
    }

    fn copy_render_target(
        &mut self,
        _src: Option<&Arc<RenderTarget>>,
        dst: TextureHandle,
        color: bool,
        depth: bool,
    ) -> GpuResult<()> {
        self.journal.push(GpuOp::Copy { dst, color, depth });
        Ok(())
    }

    fn generate_mipmaps(&mut self, texture: TextureHandle) {
        self.journal.push(GpuOp::GenerateMipmaps(texture));
    }

    fn draw_depth_only(&mut self, instances: &[MeshInstanceRef]) {
        self.journal.push(GpuOp::DrawDepthOnly(instances.len()));
    }
}
