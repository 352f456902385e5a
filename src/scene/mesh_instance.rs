//! Renderable instance data the scheduler sorts and filters.
//!
//! The scheduler never draws; it only needs the handful of per-instance
//! facts that routing and sorting depend on: which bucket the material
//! blend mode selects, the manual draw order, the packed material/mesh
//! sort key, the world-space center for distance sorts, and whether the
//! instance writes depth (for the depth grab fallback).

use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use glam::Vec3;

/// Stable, unique identifier of a mesh instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(pub u64);

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// Material blend mode, selecting the opaque or transparent bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// No blending; instance goes to the opaque bucket.
    #[default]
    Opaque,
    /// Standard alpha blending.
    Alpha,
    /// Additive blending.
    Additive,
}

/// Minimal material description consumed by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Material {
    /// Blend mode; anything but [`BlendMode::Opaque`] is transparent.
    pub blend: BlendMode,
    /// Whether the material writes depth.
    pub depth_write: bool,
    /// Shader variant identity, part of the material/mesh sort key.
    pub shader_variant: u32,
}

impl Material {
    /// Create an opaque, depth-writing material.
    pub fn opaque(shader_variant: u32) -> Self {
        Self {
            blend: BlendMode::Opaque,
            depth_write: true,
            shader_variant,
        }
    }

    /// Create an alpha-blended material that does not write depth.
    pub fn transparent(shader_variant: u32) -> Self {
        Self {
            blend: BlendMode::Alpha,
            depth_write: false,
            shader_variant,
        }
    }

    /// Disable or enable depth writes.
    pub fn with_depth_write(mut self, depth_write: bool) -> Self {
        self.depth_write = depth_write;
        self
    }

    /// Whether this material renders in the transparent bucket.
    pub fn is_transparent(&self) -> bool {
        self.blend != BlendMode::Opaque
    }
}

/// Custom per-instance sort distance callback.
///
/// Receives the instance, the camera position and the camera forward
/// vector; returns the scalar distance used by the distance sort modes.
pub type SortDistanceFn = Arc<dyn Fn(&MeshInstance, Vec3, Vec3) -> f32 + Send + Sync>;

static NEXT_MESH_ID: AtomicU32 = AtomicU32::new(1);

/// One renderable instance as seen by the scheduler.
pub struct MeshInstance {
    id: InstanceId,
    material: Arc<Material>,
    mesh_id: u32,
    /// Explicit ordering for the manual sort mode.
    pub draw_order: i32,
    /// World-space center of the instance bounds.
    pub center: Vec3,
    /// Whether the instance casts shadows.
    pub cast_shadow: bool,
    /// Clone of a static instance; removed together with its source.
    pub static_source: Option<InstanceId>,
    /// Optional custom distance callback for distance sort modes.
    pub calculate_sort_distance: Option<SortDistanceFn>,
}

impl MeshInstance {
    /// Create a new instance with a fresh mesh identity.
    pub fn new(material: Arc<Material>) -> Self {
        Self::with_mesh(material, NEXT_MESH_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Create a new instance sharing an existing mesh identity.
    pub fn with_mesh(material: Arc<Material>, mesh_id: u32) -> Self {
        Self {
            id: InstanceId(NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed)),
            material,
            mesh_id,
            draw_order: 0,
            center: Vec3::ZERO,
            cast_shadow: true,
            static_source: None,
            calculate_sort_distance: None,
        }
    }

    /// Set the world-space center.
    pub fn with_center(mut self, center: Vec3) -> Self {
        self.center = center;
        self
    }

    /// Set the manual draw order.
    pub fn with_draw_order(mut self, draw_order: i32) -> Self {
        self.draw_order = draw_order;
        self
    }

    /// Disable shadow casting.
    pub fn without_shadows(mut self) -> Self {
        self.cast_shadow = false;
        self
    }

    /// Mark this instance as a clone of a static source instance.
    pub fn with_static_source(mut self, source: InstanceId) -> Self {
        self.static_source = Some(source);
        self
    }

    /// Get the instance identity.
    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// Get the material.
    pub fn material(&self) -> &Arc<Material> {
        &self.material
    }

    /// Get the mesh identity.
    pub fn mesh_id(&self) -> u32 {
        self.mesh_id
    }

    /// Packed (shader variant, mesh) key for the material/mesh sort mode.
    pub fn sort_key(&self) -> u64 {
        ((self.material.shader_variant as u64) << 32) | self.mesh_id as u64
    }

    /// Scalar sort distance: the projection of the center-to-camera vector
    /// onto the camera forward axis, or the custom callback when set.
    pub fn sort_distance(&self, camera_position: Vec3, camera_forward: Vec3) -> f32 {
        if let Some(callback) = &self.calculate_sort_distance {
            callback(self, camera_position, camera_forward)
        } else {
            (self.center - camera_position).dot(camera_forward)
        }
    }
}

impl fmt::Debug for MeshInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeshInstance")
            .field("id", &self.id)
            .field("mesh_id", &self.mesh_id)
            .field("blend", &self.material.blend)
            .field("draw_order", &self.draw_order)
            .finish()
    }
}

/// Shared reference to a mesh instance.
pub type MeshInstanceRef = Arc<MeshInstance>;

static_assertions::assert_impl_all!(MeshInstance: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_ids() {
        let material = Arc::new(Material::opaque(1));
        let a = MeshInstance::new(Arc::clone(&material));
        let b = MeshInstance::new(material);
        assert_ne!(a.id(), b.id());
        assert_ne!(a.mesh_id(), b.mesh_id());
    }

    #[test]
    fn test_sort_key_packs_variant_over_mesh() {
        let a = MeshInstance::with_mesh(Arc::new(Material::opaque(2)), 10);
        let b = MeshInstance::with_mesh(Arc::new(Material::opaque(1)), 500);
        // Higher shader variant dominates regardless of mesh id.
        assert!(a.sort_key() > b.sort_key());
    }

    #[test]
    fn test_sort_distance_projection() {
        let inst = MeshInstance::new(Arc::new(Material::opaque(1)))
            .with_center(Vec3::new(0.0, 0.0, -10.0));
        let dist = inst.sort_distance(Vec3::ZERO, -Vec3::Z);
        assert_eq!(dist, 10.0);
    }

    #[test]
    fn test_custom_sort_distance() {
        let mut inst = MeshInstance::new(Arc::new(Material::opaque(1)));
        inst.calculate_sort_distance = Some(Arc::new(|_, _, _| 42.0));
        assert_eq!(inst.sort_distance(Vec3::ZERO, -Vec3::Z), 42.0);
    }
}
