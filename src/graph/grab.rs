//! Grab passes: color and depth snapshots of the current target.
//!
//! A grab pass copies the live contents of a render target (or the
//! backbuffer) into a sampleable texture so later passes can read what
//! has been rendered so far. The backing texture is owned by the pass: it
//! is lazily (re)allocated whenever the requested width, height or pixel
//! format changes, and destroyed exactly once by [`ColorGrabPass::destroy`]
//! / [`DepthGrabPass::destroy`].
//!
//! The depth grab has two code paths. The primary path copies the depth
//! buffer directly. Devices that cannot copy depth (or cannot copy a
//! multisampled target) take the fallback: the depth-writing geometry is
//! re-rendered into a dedicated target, reusing the upstream opaque
//! layer's already-culled visible list instead of culling again.

use std::sync::Arc;

use crate::gpu::{
    GpuResult, GraphicsDevice, RenderTarget, TextureDescriptor, TextureFormat, TextureHandle,
    TextureUsage,
};
use crate::layer::Layer;
use crate::scene::{CameraRef, MeshInstanceRef};

use super::pass::{DepthStencilOps, PassDescriptor, RenderPass};

/// Lazily allocated backing texture of a grab pass.
#[derive(Debug, Default)]
struct GrabTexture {
    texture: Option<TextureHandle>,
    width: u32,
    height: u32,
    format: TextureFormat,
}

impl GrabTexture {
    /// Return the backing texture, reallocating only when the requested
    /// parameters differ from the current allocation.
    fn ensure(
        &mut self,
        device: &mut dyn GraphicsDevice,
        label: &str,
        width: u32,
        height: u32,
        format: TextureFormat,
        usage: TextureUsage,
        mipmaps: bool,
    ) -> GpuResult<TextureHandle> {
        if let Some(texture) = self.texture {
            if self.width == width && self.height == height && self.format == format {
                return Ok(texture);
            }
        }

        if let Some(old) = self.texture.take() {
            device.destroy_texture(old);
        }

        let mip_level_count = if mipmaps {
            TextureDescriptor::full_mip_chain(width, height)
        } else {
            1
        };
        let descriptor = TextureDescriptor::new_2d(width, height, format, usage)
            .with_label(label)
            .with_mip_levels(mip_level_count);
        let texture = device.create_texture(&descriptor)?;
        log::debug!(
            "{}: allocated {}x{} {:?} grab texture",
            label,
            width,
            height,
            format
        );

        self.texture = Some(texture);
        self.width = width;
        self.height = height;
        self.format = format;
        Ok(texture)
    }

    fn destroy(&mut self, device: &mut dyn GraphicsDevice) {
        if let Some(texture) = self.texture.take() {
            device.destroy_texture(texture);
        }
    }
}

/// Resolve the snapshot dimensions: the source target, or the device's
/// current backbuffer when grabbing from it.
fn source_size(source: Option<&Arc<RenderTarget>>, device: &dyn GraphicsDevice) -> (u32, u32) {
    match source {
        Some(rt) => (rt.width(), rt.height()),
        None => device.backbuffer_size(),
    }
}

// ============================================================================
// Color grab
// ============================================================================

/// Snapshot of the current color buffer into a sampleable texture.
pub struct ColorGrabPass {
    descriptor: PassDescriptor,
    source: Option<Arc<RenderTarget>>,
    grab: GrabTexture,
    needs_mipmaps: bool,
}

impl ColorGrabPass {
    /// Create a color grab of the default backbuffer.
    pub fn new() -> Self {
        Self {
            descriptor: PassDescriptor::new("color-grab"),
            source: None,
            grab: GrabTexture::default(),
            needs_mipmaps: false,
        }
    }

    /// Grab from an offscreen target instead of the backbuffer.
    pub fn with_source(mut self, source: Arc<RenderTarget>) -> Self {
        self.source = Some(source);
        self
    }

    /// Request mip regeneration; needed when the consumer samples the
    /// grab at non-zero LOD.
    pub fn with_mipmaps(mut self) -> Self {
        self.needs_mipmaps = true;
        self
    }

    /// Change the grab source between frames.
    pub fn set_source(&mut self, source: Option<Arc<RenderTarget>>) {
        self.source = source;
    }

    /// Reallocate the backing texture if the source size or format
    /// changed. Called once per frame before the graph renders.
    pub fn frame_update(&mut self, device: &mut dyn GraphicsDevice) -> GpuResult<()> {
        let (width, height) = source_size(self.source.as_ref(), device);
        let format = match &self.source {
            Some(rt) => rt.color_format(),
            None => device.backbuffer_format(),
        };
        self.grab.ensure(
            device,
            "color-grab",
            width,
            height,
            format,
            RenderTarget::grab_usage(),
            self.needs_mipmaps,
        )?;
        Ok(())
    }

    /// The snapshot texture consumers sample, once allocated.
    pub fn texture(&self) -> Option<TextureHandle> {
        self.grab.texture
    }

    /// Destroy the owned backing texture.
    pub fn destroy(&mut self, device: &mut dyn GraphicsDevice) {
        self.grab.destroy(device);
    }
}

impl Default for ColorGrabPass {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderPass for ColorGrabPass {
    fn descriptor(&self) -> &PassDescriptor {
        &self.descriptor
    }

    fn descriptor_mut(&mut self) -> &mut PassDescriptor {
        &mut self.descriptor
    }

    fn execute(&mut self, device: &mut dyn GraphicsDevice) {
        let Some(texture) = self.grab.texture else {
            return;
        };
        match device.copy_render_target(self.source.as_ref(), texture, true, false) {
            Ok(()) => {
                if self.needs_mipmaps {
                    device.generate_mipmaps(texture);
                }
            }
            Err(err) => log::warn!("color-grab: copy failed: {err}"),
        }
    }
}

// ============================================================================
// Depth grab
// ============================================================================

/// Snapshot of the current depth buffer into a sampleable texture.
pub struct DepthGrabPass {
    descriptor: PassDescriptor,
    source: Option<Arc<RenderTarget>>,
    grab: GrabTexture,
    needs_mipmaps: bool,
    use_fallback: bool,
    fallback_target: Option<Arc<RenderTarget>>,
    depth_instances: Vec<MeshInstanceRef>,
}

impl DepthGrabPass {
    /// Create a depth grab of the default backbuffer.
    pub fn new() -> Self {
        Self {
            descriptor: PassDescriptor::new("depth-grab"),
            source: None,
            grab: GrabTexture::default(),
            needs_mipmaps: false,
            use_fallback: false,
            fallback_target: None,
            depth_instances: Vec::new(),
        }
    }

    /// Grab from an offscreen target instead of the backbuffer.
    pub fn with_source(mut self, source: Arc<RenderTarget>) -> Self {
        self.source = Some(source);
        self
    }

    /// Request mip regeneration on the direct copy path.
    pub fn with_mipmaps(mut self) -> Self {
        self.needs_mipmaps = true;
        self
    }

    /// Whether the device can service this grab with a direct copy.
    fn direct_copy_supported(&self, device: &dyn GraphicsDevice) -> bool {
        let caps = device.capabilities();
        if !caps.supports_depth_grab {
            return false;
        }
        let multisampled = self
            .source
            .as_ref()
            .map(|rt| rt.sample_count() > 1)
            .unwrap_or(false);
        !multisampled || caps.supports_multisampled_copy
    }

    /// Reallocate the backing texture and pick the copy or re-render path
    /// for this frame. On the fallback path, re-derives the depth-writing
    /// instance list from the opaque layer's already-culled list for the
    /// given camera.
    pub fn frame_update(
        &mut self,
        device: &mut dyn GraphicsDevice,
        opaque_layer: &Layer,
        camera: &CameraRef,
    ) -> GpuResult<()> {
        let (width, height) = source_size(self.source.as_ref(), device);
        self.use_fallback = !self.direct_copy_supported(device);

        let usage = if self.use_fallback {
            TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING
        } else {
            RenderTarget::grab_usage()
        };
        let texture = self.grab.ensure(
            device,
            "depth-grab",
            width,
            height,
            TextureFormat::Depth32Float,
            usage,
            !self.use_fallback && self.needs_mipmaps,
        )?;

        if self.use_fallback {
            // Dedicated target around the owned texture; rebuilt only when
            // the texture itself was reallocated.
            let stale = self
                .fallback_target
                .as_ref()
                .map(|rt| rt.depth_texture() != Some(texture))
                .unwrap_or(true);
            if stale {
                self.fallback_target = Some(Arc::new(
                    RenderTarget::new(width, height)
                        .with_label("depth-grab-fallback")
                        .with_depth(texture),
                ));
            }
            self.descriptor.target = self.fallback_target.clone();
            self.descriptor.depth_stencil_ops = DepthStencilOps {
                clear_depth: true,
                store_depth: true,
                ..Default::default()
            };

            // Reuse the already-culled opaque list; only depth-writing
            // materials contribute.
            self.depth_instances.clear();
            if let Some(slot) = opaque_layer.camera_index(camera) {
                if let Some(visible) = opaque_layer.visible(false, slot) {
                    self.depth_instances.extend(
                        visible
                            .list
                            .iter()
                            .filter(|i| i.material().depth_write)
                            .cloned(),
                    );
                }
            }
        } else {
            self.descriptor.target = None;
            self.fallback_target = None;
            self.depth_instances.clear();
        }

        Ok(())
    }

    /// The snapshot texture consumers sample, once allocated.
    pub fn texture(&self) -> Option<TextureHandle> {
        self.grab.texture
    }

    /// Whether the re-render fallback is active this frame.
    pub fn uses_fallback(&self) -> bool {
        self.use_fallback
    }

    /// The depth-writing instances the fallback re-renders.
    pub fn depth_instances(&self) -> &[MeshInstanceRef] {
        &self.depth_instances
    }

    /// Destroy the owned backing texture.
    pub fn destroy(&mut self, device: &mut dyn GraphicsDevice) {
        self.grab.destroy(device);
        self.fallback_target = None;
    }
}

impl Default for DepthGrabPass {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderPass for DepthGrabPass {
    fn descriptor(&self) -> &PassDescriptor {
        &self.descriptor
    }

    fn descriptor_mut(&mut self) -> &mut PassDescriptor {
        &mut self.descriptor
    }

    fn execute(&mut self, device: &mut dyn GraphicsDevice) {
        let Some(texture) = self.grab.texture else {
            return;
        };

        if self.use_fallback {
            device.begin_render_pass(&self.descriptor.gpu_descriptor());
            device.draw_depth_only(&self.depth_instances);
            device.end_render_pass();
            return;
        }

        match device.copy_render_target(self.source.as_ref(), texture, false, true) {
            Ok(()) => {
                if self.needs_mipmaps {
                    device.generate_mipmaps(texture);
                }
            }
            Err(err) => log::warn!("depth-grab: copy failed: {err}"),
        }
    }
}
