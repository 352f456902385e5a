//! Render target description.
//!
//! A [`RenderTarget`] describes an offscreen surface a pass can render into.
//! The scheduler never owns the GPU memory behind a target it reads from a
//! camera or a layer; targets are shared as `Arc<RenderTarget>` and compared
//! by pointer identity, with `None` standing for the default backbuffer.

use std::sync::Arc;

use super::types::{TextureFormat, TextureUsage};
use super::TextureHandle;

/// Description of an offscreen render target.
#[derive(Debug, Clone)]
pub struct RenderTarget {
    label: Option<String>,
    color_texture: Option<TextureHandle>,
    color_format: TextureFormat,
    depth_texture: Option<TextureHandle>,
    depth: bool,
    stencil: bool,
    width: u32,
    height: u32,
    sample_count: u32,
    mipmaps: bool,
    cube: bool,
    face: u32,
}

impl RenderTarget {
    /// Create a new render target description.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            label: None,
            color_texture: None,
            color_format: TextureFormat::default(),
            depth_texture: None,
            depth: false,
            stencil: false,
            width,
            height,
            sample_count: 1,
            mipmaps: false,
            cube: false,
            face: 0,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Attach a color texture.
    pub fn with_color(mut self, texture: TextureHandle, format: TextureFormat) -> Self {
        self.color_texture = Some(texture);
        self.color_format = format;
        self
    }

    /// Attach a depth texture.
    pub fn with_depth(mut self, texture: TextureHandle) -> Self {
        self.depth_texture = Some(texture);
        self.depth = true;
        self
    }

    /// Enable a depth attachment without an explicit texture.
    pub fn with_depth_buffer(mut self) -> Self {
        self.depth = true;
        self
    }

    /// Enable a stencil attachment.
    pub fn with_stencil(mut self) -> Self {
        self.stencil = true;
        self
    }

    /// Set the multisample count.
    pub fn with_sample_count(mut self, count: u32) -> Self {
        self.sample_count = count;
        self
    }

    /// Mark the color texture as carrying a mip chain.
    pub fn with_mipmaps(mut self) -> Self {
        self.mipmaps = true;
        self
    }

    /// Target a cube map face of the color texture.
    pub fn with_cube_face(mut self, face: u32) -> Self {
        self.cube = true;
        self.face = face;
        self
    }

    /// Get the debug label, if set.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Get the color texture handle, if any.
    pub fn color_texture(&self) -> Option<TextureHandle> {
        self.color_texture
    }

    /// Get the color format.
    pub fn color_format(&self) -> TextureFormat {
        self.color_format
    }

    /// Get the depth texture handle, if any.
    pub fn depth_texture(&self) -> Option<TextureHandle> {
        self.depth_texture
    }

    /// Whether the target has a depth attachment.
    pub fn has_depth(&self) -> bool {
        self.depth || self.depth_texture.is_some()
    }

    /// Whether the target has a stencil attachment.
    pub fn has_stencil(&self) -> bool {
        self.stencil
    }

    /// Get the width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Get the height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Get the multisample count.
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Whether the color texture carries a mip chain.
    pub fn mipmaps(&self) -> bool {
        self.mipmaps
    }

    /// Whether the color attachment is a cube map face.
    pub fn is_cube_face(&self) -> bool {
        self.cube
    }

    /// Which cube map face is targeted.
    pub fn face(&self) -> u32 {
        self.face
    }

    /// Usage flags a grab texture sampling from this target needs.
    pub fn grab_usage() -> TextureUsage {
        TextureUsage::COPY_DST | TextureUsage::TEXTURE_BINDING
    }
}

/// Compare two optional targets for identity (`None` = default backbuffer).
pub fn same_target(a: Option<&Arc<RenderTarget>>, b: Option<&Arc<RenderTarget>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        _ => false,
    }
}

static_assertions::assert_impl_all!(RenderTarget: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_target_identity() {
        let a = Arc::new(RenderTarget::new(64, 64));
        let b = Arc::new(RenderTarget::new(64, 64));
        let a2 = Arc::clone(&a);

        assert!(same_target(None, None));
        assert!(same_target(Some(&a), Some(&a2)));
        assert!(!same_target(Some(&a), Some(&b)));
        assert!(!same_target(Some(&a), None));
    }

    #[test]
    fn test_builder() {
        let rt = RenderTarget::new(512, 256)
            .with_color(TextureHandle(7), TextureFormat::Rgba16Float)
            .with_depth_buffer()
            .with_sample_count(4)
            .with_cube_face(3)
            .with_mipmaps();

        assert_eq!(rt.color_texture(), Some(TextureHandle(7)));
        assert_eq!(rt.color_format(), TextureFormat::Rgba16Float);
        assert!(rt.has_depth());
        assert!(!rt.has_stencil());
        assert_eq!(rt.sample_count(), 4);
        assert!(rt.is_cube_face());
        assert_eq!(rt.face(), 3);
        assert!(rt.mipmaps());
    }
}
