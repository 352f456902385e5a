//! Layers: named buckets of renderable instances and lights.
//!
//! A layer groups the mesh instances and lights that render together, the
//! sort mode of each bucket, and the cameras currently viewing it. Layers
//! are shared between the application and one or more
//! [`LayerComposition`](crate::layer::LayerComposition)s as
//! [`LayerRef`]s; the composition polls each layer's dirty flag once per
//! frame to decide whether the schedule must be rebuilt.
//!
//! # Per-camera visible lists
//!
//! Culling fills one visible-instance list per attached camera and bucket.
//! The lists are indexed by the camera's position in [`Layer::cameras`],
//! not by a global id, so removing a camera compacts the index: every
//! later camera shifts down by one. Getting this compaction wrong is not
//! self-correcting, which is why it is covered by dedicated tests here and
//! in the integration suite.

mod composition;
mod render_action;
mod sort;

pub use composition::{CompositionEvent, CompositionEventKind, LayerComposition, SubLayer};
pub use render_action::RenderAction;
pub use sort::{CustomSortFn, SortEntry, SortMode};

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use glam::Vec3;
use parking_lot::RwLock;

use crate::gpu::{ClearFlags, RenderTarget};
use crate::scene::{same_camera, CameraRef, LightHashes, LightRef, MeshInstanceRef};

/// Stable, unique identifier of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub u32);

/// The default world layer.
pub const LAYER_ID_WORLD: LayerId = LayerId(0);

/// The reserved depth-prepass layer. Render-target propagation walks past
/// it without ever assigning a final target to it.
pub const LAYER_ID_DEPTH: LayerId = LayerId(1);

/// The conventional overlay/UI layer, typically placed after the
/// post-effects boundary.
pub const LAYER_ID_UI: LayerId = LayerId(4);

/// User layer ids start here; lower values are reserved for the engine.
const USER_LAYER_ID_START: u32 = 1000;

static NEXT_LAYER_ID: AtomicU32 = AtomicU32::new(USER_LAYER_ID_START);

/// Shared reference to a layer.
pub type LayerRef = Arc<RwLock<Layer>>;

/// Visible instances of one bucket for one camera.
#[derive(Debug, Clone, Default)]
pub struct VisibleInstances {
    /// The culled, renderable instances.
    pub list: Vec<MeshInstanceRef>,
    /// Whether culling has run for this camera this frame.
    pub done: bool,
}

/// A named bucket of renderable instances and lights.
pub struct Layer {
    id: LayerId,
    name: String,

    /// Enable counter; the layer renders while it is above zero. Unrelated
    /// features can enable/disable the same layer without conflicting.
    enable_count: u32,

    /// Sort mode of the opaque bucket.
    pub opaque_sort_mode: SortMode,
    /// Sort mode of the transparent bucket.
    pub transparent_sort_mode: SortMode,
    /// Comparator used by [`SortMode::Custom`].
    pub custom_sort: Option<CustomSortFn>,

    opaque: Vec<MeshInstanceRef>,
    transparent: Vec<MeshInstanceRef>,
    shadow_casters: Vec<MeshInstanceRef>,

    lights: Vec<LightRef>,
    light_hashes: LightHashes,

    cameras: Vec<CameraRef>,
    visible_opaque: Vec<VisibleInstances>,
    visible_transparent: Vec<VisibleInstances>,

    clear_flags: ClearFlags,
    render_target: Option<Arc<RenderTarget>>,

    composition_dirty: bool,
}

impl Layer {
    /// Create a new layer with a fresh user id.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(name, LayerId(NEXT_LAYER_ID.fetch_add(1, Ordering::Relaxed)))
    }

    /// Create a layer with an explicit (typically reserved) id.
    pub fn with_id(name: impl Into<String>, id: LayerId) -> Self {
        Self {
            id,
            name: name.into(),
            enable_count: 1,
            opaque_sort_mode: SortMode::MaterialMesh,
            transparent_sort_mode: SortMode::BackToFront,
            custom_sort: None,
            opaque: Vec::new(),
            transparent: Vec::new(),
            shadow_casters: Vec::new(),
            lights: Vec::new(),
            light_hashes: LightHashes::default(),
            cameras: Vec::new(),
            visible_opaque: Vec::new(),
            visible_transparent: Vec::new(),
            clear_flags: ClearFlags::empty(),
            render_target: None,
            composition_dirty: true,
        }
    }

    /// Wrap the layer for sharing with compositions.
    pub fn into_ref(self) -> LayerRef {
        Arc::new(RwLock::new(self))
    }

    /// Get the layer id.
    pub fn id(&self) -> LayerId {
        self.id
    }

    /// Get the layer name.
    pub fn name(&self) -> &str {
        &self.name
    }

    // ========================================================================
    // Enable state
    // ========================================================================

    /// Whether the layer renders: true while the enable counter is above
    /// zero.
    pub fn is_enabled(&self) -> bool {
        self.enable_count > 0
    }

    /// Get the raw enable counter.
    pub fn enable_count(&self) -> u32 {
        self.enable_count
    }

    /// Increment (true) or decrement (false) the enable counter. Redundant
    /// disables saturate at zero instead of underflowing.
    pub fn set_enabled(&mut self, enabled: bool) {
        let was = self.is_enabled();
        if enabled {
            self.enable_count += 1;
        } else {
            self.enable_count = self.enable_count.saturating_sub(1);
        }
        if was != self.is_enabled() {
            self.composition_dirty = true;
        }
    }

    // ========================================================================
    // Clears and target
    // ========================================================================

    /// Which attachments the layer itself requests clearing.
    pub fn clear_flags(&self) -> ClearFlags {
        self.clear_flags
    }

    /// Set the layer-requested clear flags.
    pub fn set_clear_flags(&mut self, flags: ClearFlags) {
        if self.clear_flags != flags {
            self.clear_flags = flags;
            self.composition_dirty = true;
        }
    }

    /// The layer's own render target, if any. A camera target takes
    /// precedence when both are set.
    pub fn render_target(&self) -> Option<Arc<RenderTarget>> {
        self.render_target.clone()
    }

    /// Set the layer's own render target (borrowed, never owned).
    pub fn set_render_target(&mut self, target: Option<Arc<RenderTarget>>) {
        self.render_target = target;
        self.composition_dirty = true;
    }

    // ========================================================================
    // Mesh instances
    // ========================================================================

    /// Add mesh instances, routed to the opaque or transparent bucket by
    /// their material blend mode. Instances already present are left
    /// alone. Shadow casters are tracked too unless skipped.
    pub fn add_mesh_instances(&mut self, instances: &[MeshInstanceRef], skip_shadow_casters: bool) {
        for instance in instances {
            let bucket = if instance.material().is_transparent() {
                &mut self.transparent
            } else {
                &mut self.opaque
            };
            if !bucket.iter().any(|i| i.id() == instance.id()) {
                bucket.push(Arc::clone(instance));
            }

            if !skip_shadow_casters
                && instance.cast_shadow
                && !self.shadow_casters.iter().any(|i| i.id() == instance.id())
            {
                self.shadow_casters.push(Arc::clone(instance));
            }
        }
    }

    /// Remove mesh instances from both buckets, together with any
    /// static-source clones of theirs. Missing instances are no-ops.
    pub fn remove_mesh_instances(
        &mut self,
        instances: &[MeshInstanceRef],
        skip_shadow_casters: bool,
    ) {
        for instance in instances {
            let id = instance.id();
            let gone =
                |i: &MeshInstanceRef| i.id() == id || i.static_source == Some(id);

            self.opaque.retain(|i| !gone(i));
            self.transparent.retain(|i| !gone(i));
            if !skip_shadow_casters {
                self.shadow_casters.retain(|i| !gone(i));
            }
        }
    }

    /// Remove all mesh instances.
    pub fn clear_mesh_instances(&mut self, skip_shadow_casters: bool) {
        self.opaque.clear();
        self.transparent.clear();
        if !skip_shadow_casters {
            self.shadow_casters.clear();
        }
    }

    /// The opaque bucket.
    pub fn opaque_instances(&self) -> &[MeshInstanceRef] {
        &self.opaque
    }

    /// The transparent bucket.
    pub fn transparent_instances(&self) -> &[MeshInstanceRef] {
        &self.transparent
    }

    /// The shadow casters.
    pub fn shadow_casters(&self) -> &[MeshInstanceRef] {
        &self.shadow_casters
    }

    // ========================================================================
    // Lights
    // ========================================================================

    /// Add a light; duplicates are no-ops. Regenerates the light hashes.
    pub fn add_light(&mut self, light: &LightRef) {
        if !self.lights.iter().any(|l| l.id() == light.id()) {
            self.lights.push(Arc::clone(light));
            self.light_hashes = LightHashes::compute(&self.lights);
        }
    }

    /// Remove a light; missing lights are no-ops. Regenerates the light
    /// hashes.
    pub fn remove_light(&mut self, light: &LightRef) {
        let before = self.lights.len();
        self.lights.retain(|l| l.id() != light.id());
        if self.lights.len() != before {
            self.light_hashes = LightHashes::compute(&self.lights);
        }
    }

    /// Remove all lights.
    pub fn clear_lights(&mut self) {
        self.lights.clear();
        self.light_hashes = LightHashes::default();
    }

    /// The attached lights.
    pub fn lights(&self) -> &[LightRef] {
        &self.lights
    }

    /// Derived hashes of the light set; cameras compare these to decide
    /// when shader variants must be regenerated.
    pub fn light_hashes(&self) -> LightHashes {
        self.light_hashes
    }

    // ========================================================================
    // Cameras
    // ========================================================================

    /// Attach a camera. A camera appears at most once per layer; duplicate
    /// attaches are no-ops.
    pub fn add_camera(&mut self, camera: &CameraRef) {
        if self.camera_index(camera).is_some() {
            return;
        }
        self.cameras.push(Arc::clone(camera));
        self.visible_opaque.push(VisibleInstances::default());
        self.visible_transparent.push(VisibleInstances::default());
        self.composition_dirty = true;
    }

    /// Detach a camera, deleting exactly its slot from the per-camera
    /// visible lists; later cameras shift down by one. Missing cameras are
    /// no-ops.
    pub fn remove_camera(&mut self, camera: &CameraRef) {
        let Some(index) = self.camera_index(camera) else {
            return;
        };
        self.cameras.remove(index);
        self.visible_opaque.remove(index);
        self.visible_transparent.remove(index);
        self.composition_dirty = true;
        log::trace!(
            "Layer '{}': removed camera slot {}, {} remaining",
            self.name,
            index,
            self.cameras.len()
        );
    }

    /// Detach all cameras.
    pub fn clear_cameras(&mut self) {
        self.cameras.clear();
        self.visible_opaque.clear();
        self.visible_transparent.clear();
        self.composition_dirty = true;
    }

    /// The attached cameras, in attach order.
    pub fn cameras(&self) -> &[CameraRef] {
        &self.cameras
    }

    /// The slot of a camera within this layer, if attached.
    pub fn camera_index(&self, camera: &CameraRef) -> Option<usize> {
        self.cameras.iter().position(|c| same_camera(c, camera))
    }

    /// The visible list of one bucket for one camera slot.
    pub fn visible(&self, transparent: bool, camera_slot: usize) -> Option<&VisibleInstances> {
        let lists = if transparent {
            &self.visible_transparent
        } else {
            &self.visible_opaque
        };
        lists.get(camera_slot)
    }

    /// Mutable access for culling to fill a visible list.
    pub fn visible_mut(
        &mut self,
        transparent: bool,
        camera_slot: usize,
    ) -> Option<&mut VisibleInstances> {
        let lists = if transparent {
            &mut self.visible_transparent
        } else {
            &mut self.visible_opaque
        };
        lists.get_mut(camera_slot)
    }

    /// Sort one camera's visible list according to the bucket's sort mode.
    /// An out-of-range slot is a no-op.
    pub fn sort_visible(
        &mut self,
        transparent: bool,
        camera_slot: usize,
        camera_position: Vec3,
        camera_forward: Vec3,
    ) {
        let mode = if transparent {
            self.transparent_sort_mode
        } else {
            self.opaque_sort_mode
        };
        let custom = self.custom_sort.clone();
        let Some(visible) = self.visible_mut(transparent, camera_slot) else {
            return;
        };
        sort::sort_instances(
            &mut visible.list,
            mode,
            custom.as_ref(),
            camera_position,
            camera_forward,
        );
    }

    /// Consume the composition-relevant dirty flag.
    pub(crate) fn take_composition_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.composition_dirty, false)
    }
}

impl std::fmt::Debug for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Layer")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("enabled", &self.is_enabled())
            .field("opaque", &self.opaque.len())
            .field("transparent", &self.transparent.len())
            .field("cameras", &self.cameras.len())
            .finish()
    }
}
