//! Sort modes and comparators for visible instance lists.

use std::cmp::Ordering;
use std::sync::Arc;

use glam::Vec3;

use crate::scene::{MeshInstance, MeshInstanceRef};

/// How a layer orders the visible instances of one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortMode {
    /// Leave the order untouched.
    None,
    /// Sort by the explicit per-instance draw order.
    Manual,
    /// Sort by the packed (shader variant, mesh) key to minimize state
    /// changes; ties broken by descending mesh identity for determinism.
    MaterialMesh,
    /// Sort by camera distance, far to near.
    BackToFront,
    /// Sort by camera distance, near to far.
    FrontToBack,
    /// Delegate to the layer's custom comparator.
    Custom,
}

/// One entry handed to a custom sort comparator.
pub struct SortEntry<'a> {
    /// The instance being ordered.
    pub instance: &'a MeshInstance,
    /// The computed sort distance for this camera.
    pub distance: f32,
}

/// Custom comparator for [`SortMode::Custom`].
pub type CustomSortFn = Arc<dyn Fn(&SortEntry<'_>, &SortEntry<'_>) -> Ordering + Send + Sync>;

/// Sort a visible list in place according to the given mode.
pub(crate) fn sort_instances(
    list: &mut Vec<MeshInstanceRef>,
    mode: SortMode,
    custom: Option<&CustomSortFn>,
    camera_position: Vec3,
    camera_forward: Vec3,
) {
    match mode {
        SortMode::None => {}
        SortMode::Manual => list.sort_by_key(|i| i.draw_order),
        SortMode::MaterialMesh => list.sort_by(|a, b| {
            a.sort_key()
                .cmp(&b.sort_key())
                .then_with(|| b.mesh_id().cmp(&a.mesh_id()))
        }),
        SortMode::BackToFront => sort_by_distance(list, camera_position, camera_forward, true),
        SortMode::FrontToBack => sort_by_distance(list, camera_position, camera_forward, false),
        SortMode::Custom => {
            let Some(compare) = custom else {
                return;
            };
            let mut keyed = take_with_distances(list, camera_position, camera_forward);
            keyed.sort_by(|a, b| {
                compare(
                    &SortEntry {
                        instance: &a.1,
                        distance: a.0,
                    },
                    &SortEntry {
                        instance: &b.1,
                        distance: b.0,
                    },
                )
            });
            list.extend(keyed.into_iter().map(|(_, i)| i));
        }
    }
}

fn sort_by_distance(
    list: &mut Vec<MeshInstanceRef>,
    camera_position: Vec3,
    camera_forward: Vec3,
    back_to_front: bool,
) {
    let mut keyed = take_with_distances(list, camera_position, camera_forward);
    keyed.sort_by(|a, b| {
        if back_to_front {
            b.0.total_cmp(&a.0)
        } else {
            a.0.total_cmp(&b.0)
        }
    });
    list.extend(keyed.into_iter().map(|(_, i)| i));
}

fn take_with_distances(
    list: &mut Vec<MeshInstanceRef>,
    camera_position: Vec3,
    camera_forward: Vec3,
) -> Vec<(f32, MeshInstanceRef)> {
    list.drain(..)
        .map(|i| (i.sort_distance(camera_position, camera_forward), i))
        .collect()
}
