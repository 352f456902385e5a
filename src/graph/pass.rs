//! Render pass types.
//!
//! A pass owns its attachment operations (clear/store/resolve/mipmap) and
//! optional before/after sub-pass lists. The flags start from
//! conservative defaults derived from the target;
//! [`FrameGraph::compile`](crate::graph::FrameGraph::compile) then forces
//! store flags on and elides mipmap regeneration where adjacent passes
//! make that safe.

use std::sync::Arc;

use crate::gpu::{ClearFlags, GpuPassDescriptor, GraphicsDevice, RenderTarget};
use crate::layer::RenderAction;

/// Operations on a color attachment.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentOps {
    /// Clear the attachment at the start of the pass.
    pub clear: bool,
    /// Clear value used when clearing.
    pub clear_value: [f32; 4],
    /// Store the attachment at the end of the pass.
    pub store: bool,
    /// Resolve the multisampled attachment to single-sampled.
    pub resolve: bool,
    /// Regenerate the attachment's mip chain after the pass.
    pub mipmaps: bool,
}

impl Default for AttachmentOps {
    fn default() -> Self {
        Self {
            clear: false,
            clear_value: [0.0, 0.0, 0.0, 1.0],
            store: false,
            resolve: false,
            mipmaps: false,
        }
    }
}

impl AttachmentOps {
    /// Ops that clear to the given value.
    pub fn clear_to(value: [f32; 4]) -> Self {
        Self {
            clear: true,
            clear_value: value,
            ..Default::default()
        }
    }
}

/// Operations on a depth/stencil attachment.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthStencilOps {
    /// Clear depth at the start of the pass.
    pub clear_depth: bool,
    /// Depth clear value.
    pub clear_depth_value: f32,
    /// Store depth at the end of the pass.
    pub store_depth: bool,
    /// Clear stencil at the start of the pass.
    pub clear_stencil: bool,
    /// Stencil clear value.
    pub clear_stencil_value: u32,
    /// Store stencil at the end of the pass.
    pub store_stencil: bool,
}

impl Default for DepthStencilOps {
    fn default() -> Self {
        Self {
            clear_depth: false,
            clear_depth_value: 1.0,
            store_depth: false,
            clear_stencil: false,
            clear_stencil_value: 0,
            store_stencil: false,
        }
    }
}

impl DepthStencilOps {
    /// Ops that clear depth to the default value.
    pub fn clear_depth() -> Self {
        Self {
            clear_depth: true,
            ..Default::default()
        }
    }
}

/// State shared by every render pass: target, attachment operations,
/// enable flag and the before/after sub-pass lists.
pub struct PassDescriptor {
    /// Debug name of the pass.
    pub name: String,
    /// Target; `None` renders to the default backbuffer. Borrowed from
    /// its owner, never destroyed by the graph.
    pub target: Option<Arc<RenderTarget>>,
    /// Color attachment operations.
    pub color_ops: AttachmentOps,
    /// Depth/stencil attachment operations.
    pub depth_stencil_ops: DepthStencilOps,
    /// Disabled passes are skipped by `render()` and ignored by
    /// `compile()`.
    pub enabled: bool,
    /// The pass samples cube maps and needs them complete; suppresses
    /// cube-map mipmap elision across it.
    pub requires_cubemaps: bool,
    /// Sub-passes executed immediately before this pass.
    pub before_passes: Vec<Box<dyn RenderPass>>,
    /// Sub-passes executed immediately after this pass.
    pub after_passes: Vec<Box<dyn RenderPass>>,
}

impl PassDescriptor {
    /// Create a descriptor rendering to the default backbuffer.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: None,
            // The backbuffer always survives the pass.
            color_ops: AttachmentOps {
                store: true,
                ..Default::default()
            },
            depth_stencil_ops: DepthStencilOps::default(),
            enabled: true,
            requires_cubemaps: false,
            before_passes: Vec::new(),
            after_passes: Vec::new(),
        }
    }

    /// Create a descriptor with defaults derived from a target: offscreen
    /// passes start with store off (compile forces it on when a later
    /// pass needs the data), resolve on for multisampled targets and
    /// mipmap regeneration on for mipmapped ones.
    pub fn for_target(name: impl Into<String>, target: Option<Arc<RenderTarget>>) -> Self {
        let mut descriptor = Self::new(name);
        if let Some(rt) = &target {
            descriptor.color_ops.store = false;
            descriptor.color_ops.resolve = rt.sample_count() > 1;
            descriptor.color_ops.mipmaps = rt.mipmaps();
        }
        descriptor.target = target;
        descriptor
    }

    /// Resolve the attachment operations for the device.
    pub fn gpu_descriptor(&self) -> GpuPassDescriptor<'_> {
        let mut clear_flags = ClearFlags::empty();
        clear_flags.set(ClearFlags::COLOR, self.color_ops.clear);
        clear_flags.set(ClearFlags::DEPTH, self.depth_stencil_ops.clear_depth);
        clear_flags.set(ClearFlags::STENCIL, self.depth_stencil_ops.clear_stencil);

        GpuPassDescriptor {
            label: Some(&self.name),
            target: self.target.as_ref(),
            clear_flags,
            clear_color: self.color_ops.clear_value,
            clear_depth: self.depth_stencil_ops.clear_depth_value,
            clear_stencil: self.depth_stencil_ops.clear_stencil_value,
            store_color: self.color_ops.store,
            store_depth: self.depth_stencil_ops.store_depth,
            store_stencil: self.depth_stencil_ops.store_stencil,
            resolve_color: self.color_ops.resolve,
        }
    }
}

impl std::fmt::Debug for PassDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassDescriptor")
            .field("name", &self.name)
            .field("has_target", &self.target.is_some())
            .field("color_ops", &self.color_ops)
            .field("depth_stencil_ops", &self.depth_stencil_ops)
            .field("enabled", &self.enabled)
            .field("before", &self.before_passes.len())
            .field("after", &self.after_passes.len())
            .finish()
    }
}

/// Trait for render passes.
pub trait RenderPass {
    /// Get the shared pass state.
    fn descriptor(&self) -> &PassDescriptor;

    /// Get mutable shared pass state.
    fn descriptor_mut(&mut self) -> &mut PassDescriptor;

    /// Record this pass's work on the device.
    fn execute(&mut self, device: &mut dyn GraphicsDevice);

    /// Get the pass name.
    fn name(&self) -> &str {
        &self.descriptor().name
    }

    /// Whether the pass will execute this frame.
    fn is_enabled(&self) -> bool {
        self.descriptor().enabled
    }
}

/// Draw delegate invoked by [`RenderActionPass`] for each action; issuing
/// the actual draw calls belongs to the renderer, not the scheduler.
pub type DrawActionFn = Box<dyn FnMut(&mut dyn GraphicsDevice, &RenderAction)>;

/// A pass backed by a span of render actions sharing one target.
///
/// The pass scope (clear/store behavior) comes from the first action; the
/// draw delegate is called once per action inside the scope.
pub struct RenderActionPass {
    descriptor: PassDescriptor,
    actions: Vec<RenderAction>,
    draw: DrawActionFn,
}

impl RenderActionPass {
    /// Build a pass from a non-empty span of actions sharing one target.
    pub fn from_actions(name: impl Into<String>, actions: &[RenderAction], draw: DrawActionFn) -> Self {
        let target = actions.first().and_then(|a| a.render_target.clone());
        let mut descriptor = PassDescriptor::for_target(name, target);
        if let Some(first) = actions.first() {
            descriptor.color_ops.clear = first.clear_color();
            descriptor.depth_stencil_ops.clear_depth = first.clear_depth();
            descriptor.depth_stencil_ops.clear_stencil = first.clear_stencil();
        }
        Self {
            descriptor,
            actions: actions.to_vec(),
            draw,
        }
    }

    /// The actions this pass renders.
    pub fn actions(&self) -> &[RenderAction] {
        &self.actions
    }
}

impl RenderPass for RenderActionPass {
    fn descriptor(&self) -> &PassDescriptor {
        &self.descriptor
    }

    fn descriptor_mut(&mut self) -> &mut PassDescriptor {
        &mut self.descriptor
    }

    fn execute(&mut self, device: &mut dyn GraphicsDevice) {
        device.begin_render_pass(&self.descriptor.gpu_descriptor());
        for action in &self.actions {
            (self.draw)(device, action);
        }
        device.end_render_pass();
    }
}
