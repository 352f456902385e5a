//! Scene-facing data: mesh instances, lights and the camera contract.

mod camera;
mod light;
mod mesh_instance;

pub use camera::{same_camera, CameraRef, RenderCamera};
pub use light::{Light, LightHashes, LightId, LightKind, LightRef};
pub use mesh_instance::{
    BlendMode, InstanceId, Material, MeshInstance, MeshInstanceRef, SortDistanceFn,
};
