//! # render-scheduler
//!
//! Frame-scheduling core of a real-time 3D rendering engine: once per
//! displayed frame it turns a set of cameras and named draw-call buckets
//! ("layers") into an ordered sequence of GPU render passes, each bound
//! to a specific render target with specific clear/store semantics.
//!
//! This crate provides:
//! - [`Layer`] / [`LayerComposition`] - ordered sublayers deriving the
//!   per-frame [`RenderAction`] schedule, rebuilt only when something
//!   relevant changed
//! - [`FrameGraph`] / [`RenderPass`] - the ordered pass list with a
//!   compile step that elides redundant clear/store/mipmap work between
//!   passes sharing a target
//! - [`ColorGrabPass`] / [`DepthGrabPass`] - snapshot passes with lazily
//!   reallocated backing textures
//! - [`GraphicsDevice`] - the GPU interface boundary, with a
//!   [`DummyDevice`] for GPU-less testing
//!
//! ## Example
//!
//! ```ignore
//! use render_scheduler::{FrameGraph, Layer, LayerComposition};
//!
//! let mut composition = LayerComposition::new("main");
//! composition.push(Layer::new("world").into_ref());
//!
//! // Once per frame:
//! composition.update();
//! let mut graph = FrameGraph::new();
//! // ... build passes from composition.render_actions() ...
//! graph.compile();
//! graph.render(&mut device);
//! ```

pub mod gpu;
pub mod graph;
pub mod layer;
pub mod scene;

// Re-export main types for convenience
pub use gpu::{
    ClearFlags, DeviceCapabilities, DummyDevice, GpuError, GraphicsDevice, Rect, RenderTarget,
    TextureDescriptor, TextureFormat,
};
pub use graph::{
    AttachmentOps, ColorGrabPass, DepthGrabPass, DepthStencilOps, FrameGraph, PassDescriptor,
    RenderActionPass, RenderPass,
};
pub use layer::{
    CompositionEvent, CompositionEventKind, Layer, LayerComposition, LayerId, LayerRef,
    RenderAction, SortMode, LAYER_ID_DEPTH, LAYER_ID_UI, LAYER_ID_WORLD,
};
pub use scene::{
    BlendMode, CameraRef, Light, LightKind, Material, MeshInstance, MeshInstanceRef, RenderCamera,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the scheduler subsystem.
///
/// Optional; only emits the startup log line.
pub fn init() {
    log::info!("render-scheduler v{} initialized", VERSION);
}
