//! GPU device interface.
//!
//! The scheduler does not talk to a GPU directly; it drives an abstraction
//! implemented by the surrounding engine. [`GraphicsDevice`] is that
//! boundary: texture allocation for grab passes, render pass scoping with
//! resolved load/store operations, target copies and mipmap generation.
//! Everything above this trait is backend-agnostic.

use std::sync::Arc;

use thiserror::Error;

use crate::scene::MeshInstanceRef;

use super::render_target::RenderTarget;
use super::types::{ClearFlags, TextureDescriptor, TextureFormat};

/// GPU error type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GpuError {
    #[error("Failed to create texture: {0}")]
    TextureCreationFailed(String),
    #[error("Failed to copy render target: {0}")]
    CopyFailed(String),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Out of GPU memory")]
    OutOfMemory,
    #[error("GPU device lost")]
    DeviceLost,
}

pub type GpuResult<T> = Result<T, GpuError>;

/// Handle to a GPU texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// Capabilities of a graphics device.
///
/// The scheduler consults these to pick between the direct copy path and
/// the re-render fallback of the depth grab pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceCapabilities {
    /// Maximum texture dimension.
    pub max_texture_dimension: u32,
    /// Whether the depth buffer can be copied into a sampleable texture.
    pub supports_depth_grab: bool,
    /// Whether multisampled targets can be copied directly.
    pub supports_multisampled_copy: bool,
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self {
            max_texture_dimension: 16384,
            supports_depth_grab: true,
            supports_multisampled_copy: true,
        }
    }
}

/// Resolved attachment operations for one render pass scope.
///
/// Built by the frame graph from a pass's attachment flags after
/// compilation; the device only ever sees the final decision.
#[derive(Debug, Clone)]
pub struct GpuPassDescriptor<'a> {
    /// Debug label for the pass.
    pub label: Option<&'a str>,
    /// Target to bind, `None` for the default backbuffer.
    pub target: Option<&'a Arc<RenderTarget>>,
    /// Which attachments to clear on load.
    pub clear_flags: ClearFlags,
    /// Clear color, when color is cleared.
    pub clear_color: [f32; 4],
    /// Clear depth value, when depth is cleared.
    pub clear_depth: f32,
    /// Clear stencil value, when stencil is cleared.
    pub clear_stencil: u32,
    /// Store the color attachment at the end of the pass.
    pub store_color: bool,
    /// Store the depth attachment at the end of the pass.
    pub store_depth: bool,
    /// Store the stencil attachment at the end of the pass.
    pub store_stencil: bool,
    /// Resolve the multisampled color attachment at the end of the pass.
    pub resolve_color: bool,
}

/// Main graphics device trait.
///
/// Implemented by the engine's GPU backend; [`DummyDevice`](super::DummyDevice)
/// provides a GPU-less implementation for tests.
pub trait GraphicsDevice {
    /// Get the device capabilities.
    fn capabilities(&self) -> DeviceCapabilities;

    /// Get the current backbuffer size in pixels.
    fn backbuffer_size(&self) -> (u32, u32);

    /// Get the backbuffer color format.
    fn backbuffer_format(&self) -> TextureFormat;

    /// Create a texture.
    fn create_texture(&mut self, descriptor: &TextureDescriptor) -> GpuResult<TextureHandle>;

    /// Destroy a texture.
    fn destroy_texture(&mut self, texture: TextureHandle);

    /// Begin a render pass with the given resolved operations.
    fn begin_render_pass(&mut self, descriptor: &GpuPassDescriptor<'_>);

    /// End the current render pass.
    fn end_render_pass(&mut self);

    /// Copy the live contents of a render target (or the backbuffer when
    /// `src` is `None`) into a texture, using the cheapest operation the
    /// backend has available.
    fn copy_render_target(
        &mut self,
        src: Option<&Arc<RenderTarget>>,
        dst: TextureHandle,
        color: bool,
        depth: bool,
    ) -> GpuResult<()>;

    /// Regenerate the mip chain of a texture.
    fn generate_mipmaps(&mut self, texture: TextureHandle);

    /// Issue depth-only draws for the given instances into the currently
    /// bound render pass. Used by the depth grab fallback path.
    fn draw_depth_only(&mut self, instances: &[MeshInstanceRef]);
}
