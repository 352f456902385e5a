//! Frame graph: the ordered pass list for one frame.
//!
//! The frame graph collects render passes in submission order and
//! optimizes them as a whole. [`FrameGraph::compile`] runs once per frame
//! after all passes are added:
//!
//! - When two sequential executing passes target the same render target,
//!   the earlier pass must store any attachment the later pass does not
//!   clear, because that data survives into the later pass.
//! - When two passes render into the same cube-map texture with no
//!   executing pass between them that samples cube maps, only the last
//!   one regenerates mipmaps.
//!
//! [`FrameGraph::render`] then executes the passes strictly in order,
//! recursively expanding each pass's before/after sub-pass lists.
//! Disabled passes are skipped; compile only ever considered passes that
//! will execute, so elision never relies on a pass that is skipped.

mod grab;
mod pass;

pub use grab::{ColorGrabPass, DepthGrabPass};
pub use pass::{
    AttachmentOps, DepthStencilOps, DrawActionFn, PassDescriptor, RenderActionPass, RenderPass,
};

use std::collections::HashMap;

use crate::gpu::{same_target, GraphicsDevice, TextureHandle};

/// The ordered list of render passes for one frame.
#[derive(Default)]
pub struct FrameGraph {
    passes: Vec<Box<dyn RenderPass>>,
}

impl FrameGraph {
    /// Create an empty frame graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a render pass. Passes execute in the order they are added.
    pub fn add_render_pass(&mut self, pass: Box<dyn RenderPass>) {
        self.passes.push(pass);
    }

    /// The passes in submission order.
    pub fn passes(&self) -> &[Box<dyn RenderPass>] {
        &self.passes
    }

    /// Mutable access to the passes.
    pub fn passes_mut(&mut self) -> &mut [Box<dyn RenderPass>] {
        &mut self.passes
    }

    /// Number of passes.
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// Remove all passes; the graph is rebuilt every frame.
    pub fn clear(&mut self) {
        self.passes.clear();
    }

    /// Optimize the pass list. Only passes that will execute participate.
    pub fn compile(&mut self) {
        let executing: Vec<usize> = (0..self.passes.len())
            .filter(|&i| self.passes[i].is_enabled())
            .collect();

        // Force store flags backward: an attachment the later pass does
        // not clear must survive the earlier pass.
        for pair in executing.windows(2).rev() {
            let (first, second) = (pair[0], pair[1]);
            let (head, tail) = self.passes.split_at_mut(second);
            let first_pass = &mut head[first];
            let second_pass = &tail[0];

            if !same_target(
                first_pass.descriptor().target.as_ref(),
                second_pass.descriptor().target.as_ref(),
            ) {
                continue;
            }

            let second_desc = second_pass.descriptor();
            let keep_color = !second_desc.color_ops.clear;
            let keep_depth = !second_desc.depth_stencil_ops.clear_depth;
            let keep_stencil = !second_desc.depth_stencil_ops.clear_stencil;

            let first_desc = first_pass.descriptor_mut();
            if keep_color {
                first_desc.color_ops.store = true;
            }
            if keep_depth {
                first_desc.depth_stencil_ops.store_depth = true;
            }
            if keep_stencil {
                first_desc.depth_stencil_ops.store_stencil = true;
            }
        }

        // Cube-map mipmap elision: only the last pass writing a cube-map
        // texture regenerates its mips, unless a pass in between samples
        // cube maps and needs them complete.
        let mut pending: HashMap<TextureHandle, usize> = HashMap::new();
        for &index in &executing {
            if self.passes[index].descriptor().requires_cubemaps {
                pending.clear();
            }
            let descriptor = self.passes[index].descriptor();
            let Some(target) = &descriptor.target else {
                continue;
            };
            if !target.is_cube_face() || !descriptor.color_ops.mipmaps {
                continue;
            }
            let Some(texture) = target.color_texture() else {
                continue;
            };
            if let Some(previous) = pending.insert(texture, index) {
                self.passes[previous].descriptor_mut().color_ops.mipmaps = false;
                log::trace!(
                    "FrameGraph: elided mipmap regeneration on pass '{}'",
                    self.passes[previous].name()
                );
            }
        }
    }

    /// Execute the passes strictly in order, expanding before/after
    /// sub-pass lists recursively. Disabled passes are skipped.
    pub fn render(&mut self, device: &mut dyn GraphicsDevice) {
        for pass in &mut self.passes {
            render_pass_recursive(pass.as_mut(), device);
        }
    }
}

fn render_pass_recursive(pass: &mut dyn RenderPass, device: &mut dyn GraphicsDevice) {
    if !pass.is_enabled() {
        return;
    }

    let mut before = std::mem::take(&mut pass.descriptor_mut().before_passes);
    for sub in &mut before {
        render_pass_recursive(sub.as_mut(), device);
    }
    pass.descriptor_mut().before_passes = before;

    pass.execute(device);

    let mut after = std::mem::take(&mut pass.descriptor_mut().after_passes);
    for sub in &mut after {
        render_pass_recursive(sub.as_mut(), device);
    }
    pass.descriptor_mut().after_passes = after;
}

impl std::fmt::Debug for FrameGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameGraph")
            .field("passes", &self.passes.len())
            .finish()
    }
}
