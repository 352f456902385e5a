//! Light membership data.
//!
//! Layers only need light identities: the derived hash tells cameras when
//! the light set changed enough that shader variants must be regenerated.
//! Static (baked) and dynamic lights are hashed separately so a purely
//! dynamic change does not invalidate baked variants.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Stable, unique identifier of a light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LightId(pub u64);

static NEXT_LIGHT_ID: AtomicU64 = AtomicU64::new(1);

/// Light type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightKind {
    Directional,
    Point,
    Spot,
}

/// One light as seen by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Light {
    id: LightId,
    kind: LightKind,
    is_static: bool,
}

impl Light {
    /// Create a new dynamic light.
    pub fn new(kind: LightKind) -> Self {
        Self {
            id: LightId(NEXT_LIGHT_ID.fetch_add(1, Ordering::Relaxed)),
            kind,
            is_static: false,
        }
    }

    /// Mark the light as static (baked).
    pub fn with_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Get the light identity.
    pub fn id(&self) -> LightId {
        self.id
    }

    /// Get the light type.
    pub fn kind(&self) -> LightKind {
        self.kind
    }

    /// Whether the light is static (baked).
    pub fn is_static(&self) -> bool {
        self.is_static
    }
}

/// Shared reference to a light.
pub type LightRef = Arc<Light>;

/// Derived hashes of a layer's light set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LightHashes {
    /// Hash over the static light set.
    pub static_lights: u64,
    /// Hash over the dynamic light set.
    pub dynamic_lights: u64,
}

impl LightHashes {
    /// Compute the hashes for a light set. Order-independent: identities
    /// are sorted before hashing.
    pub fn compute(lights: &[LightRef]) -> Self {
        Self {
            static_lights: hash_subset(lights, true),
            dynamic_lights: hash_subset(lights, false),
        }
    }
}

fn hash_subset(lights: &[LightRef], is_static: bool) -> u64 {
    let mut ids: Vec<LightId> = lights
        .iter()
        .filter(|l| l.is_static() == is_static)
        .map(|l| l.id())
        .collect();
    if ids.is_empty() {
        return 0;
    }
    ids.sort_unstable();

    let mut hasher = DefaultHasher::new();
    for id in ids {
        id.hash(&mut hasher);
    }
    hasher.finish()
}
