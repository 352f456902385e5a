//! Render actions: the flat per-frame schedule.
//!
//! A render action is one (camera, sublayer) unit of work with everything
//! the renderer needs resolved up front: the target, the clear flags, and
//! the frame-lifecycle flags. Actions are ephemeral; the composition
//! rebuilds the cached list on every recompute and nothing persists them
//! beyond that.

use std::sync::Arc;

use crate::gpu::{ClearFlags, RenderTarget};
use crate::scene::CameraRef;

use super::LayerId;

/// One scheduled unit of rendering work.
#[derive(Clone)]
pub struct RenderAction {
    /// The camera rendering this action.
    pub camera: CameraRef,
    /// Index of the camera in the composition's priority-sorted list.
    pub camera_index: usize,
    /// Id of the layer being rendered; `None` for a pass-through action.
    pub layer_id: Option<LayerId>,
    /// Index of the sublayer record in the composition.
    pub sublayer_index: Option<usize>,
    /// Whether this renders the transparent bucket.
    pub transparent: bool,
    /// The camera's slot inside the layer's own camera list; indexes the
    /// layer's per-camera visible lists.
    pub layer_camera_slot: usize,
    /// Resolved target; `None` renders to the default backbuffer.
    pub render_target: Option<Arc<RenderTarget>>,
    /// Which attachments to clear before rendering.
    pub clear_flags: ClearFlags,
    /// First action of its camera this frame.
    pub first_camera_use: bool,
    /// Last action of its camera this frame.
    pub last_camera_use: bool,
    /// Post-processing runs right after this action.
    pub trigger_postprocess: bool,
    /// The camera manages its own render passes; this action is a
    /// pass-through marker and carries no layer.
    pub use_camera_passes: bool,
}

impl RenderAction {
    /// Create the single pass-through action for a camera that manages its
    /// own render pass list.
    pub(crate) fn pass_through(camera: CameraRef, camera_index: usize) -> Self {
        Self {
            camera,
            camera_index,
            layer_id: None,
            sublayer_index: None,
            transparent: false,
            layer_camera_slot: 0,
            render_target: None,
            clear_flags: ClearFlags::empty(),
            first_camera_use: true,
            last_camera_use: true,
            trigger_postprocess: false,
            use_camera_passes: true,
        }
    }

    /// Whether the color attachment is cleared.
    pub fn clear_color(&self) -> bool {
        self.clear_flags.contains(ClearFlags::COLOR)
    }

    /// Whether the depth attachment is cleared.
    pub fn clear_depth(&self) -> bool {
        self.clear_flags.contains(ClearFlags::DEPTH)
    }

    /// Whether the stencil attachment is cleared.
    pub fn clear_stencil(&self) -> bool {
        self.clear_flags.contains(ClearFlags::STENCIL)
    }
}

impl std::fmt::Debug for RenderAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderAction")
            .field("camera_index", &self.camera_index)
            .field("layer_id", &self.layer_id)
            .field("transparent", &self.transparent)
            .field("clear_flags", &self.clear_flags)
            .field("first_camera_use", &self.first_camera_use)
            .field("last_camera_use", &self.last_camera_use)
            .field("trigger_postprocess", &self.trigger_postprocess)
            .field("use_camera_passes", &self.use_camera_passes)
            .field("has_target", &self.render_target.is_some())
            .finish()
    }
}
