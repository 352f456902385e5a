//! Camera interface.
//!
//! The scheduler does not own a camera representation; the surrounding
//! engine implements [`RenderCamera`] on whatever its camera component is.
//! Cameras are shared as `Arc<dyn RenderCamera>` and compared by pointer
//! identity, mirroring how they are attached to layers.

use std::sync::Arc;

use glam::Vec3;

use crate::gpu::{ClearFlags, Rect, RenderTarget};
use crate::layer::LayerId;

/// The camera contract consumed by the scheduler.
///
/// Default implementations cover the common case: full-target viewport, no
/// offscreen target, no configured clears, post effects enabled.
pub trait RenderCamera: Send + Sync {
    /// Ids of the layers this camera renders, in no particular order.
    fn layer_ids(&self) -> &[LayerId];

    /// Rendering priority; lower renders first, ties preserve discovery
    /// order.
    fn priority(&self) -> i32 {
        0
    }

    /// Normalized viewport rectangle.
    fn rect(&self) -> Rect {
        Rect::FULL
    }

    /// Normalized scissor rectangle.
    fn scissor_rect(&self) -> Rect {
        Rect::FULL
    }

    /// Offscreen target the camera renders into, if any.
    fn render_target(&self) -> Option<Arc<RenderTarget>> {
        None
    }

    /// Layer id at which post effects stop applying for this camera.
    fn disable_post_effects_layer(&self) -> Option<LayerId> {
        None
    }

    /// Whether post effects run for this camera at all.
    fn post_effects_enabled(&self) -> bool {
        true
    }

    /// Whether the camera requests a color clear on first use.
    fn clear_color_buffer(&self) -> bool {
        false
    }

    /// Whether the camera requests a depth clear on first use.
    fn clear_depth_buffer(&self) -> bool {
        false
    }

    /// Whether the camera requests a stencil clear on first use.
    fn clear_stencil_buffer(&self) -> bool {
        false
    }

    /// Escape hatch: the camera manages its own render pass list and the
    /// composition emits a single pass-through action for it.
    fn custom_render_passes(&self) -> bool {
        false
    }

    /// Camera world position, used by the distance sort modes.
    fn world_position(&self) -> Vec3 {
        Vec3::ZERO
    }

    /// Camera forward axis, used by the distance sort modes.
    fn forward(&self) -> Vec3 {
        -Vec3::Z
    }

    /// The camera-requested clear flags combined.
    fn clear_flags(&self) -> ClearFlags {
        let mut flags = ClearFlags::empty();
        flags.set(ClearFlags::COLOR, self.clear_color_buffer());
        flags.set(ClearFlags::DEPTH, self.clear_depth_buffer());
        flags.set(ClearFlags::STENCIL, self.clear_stencil_buffer());
        flags
    }
}

/// Shared reference to a camera.
pub type CameraRef = Arc<dyn RenderCamera>;

/// Compare two cameras for identity.
pub fn same_camera(a: &CameraRef, b: &CameraRef) -> bool {
    Arc::ptr_eq(a, b)
}
