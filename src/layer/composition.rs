//! Layer composition: ordered sublayers and the frame schedule.
//!
//! A composition is an ordered list of sublayer records, each pairing a
//! layer with one of its buckets (opaque or transparent) and an
//! independent enable flag. From that order and the cameras attached to
//! the layers, [`LayerComposition::update`] derives the flat
//! [`RenderAction`] schedule the renderer consumes.
//!
//! # Rebuild policy
//!
//! `update()` is called once per frame and is idempotent: it rebuilds the
//! cached camera list and render actions only when a layer reported a
//! composition-relevant change since the last rebuild (polled dirty
//! flags) or the composition itself was edited. A camera matching zero
//! layers simply produces zero actions.
//!
//! # Camera stacking
//!
//! Cameras render in priority order (lower first, ties preserve discovery
//! order). When a camera owns an offscreen target, the target is
//! propagated backward across the immediately preceding actions that have
//! no target of their own and share the camera's viewport, so a stack of
//! cameras rendering into one texture needs no per-layer configuration.
//! The walk is a small state machine ([`Propagation`]) so each exit
//! condition stays independently testable.

use std::collections::HashMap;
use std::sync::Arc;

use crate::gpu::{same_target, ClearFlags};
use crate::scene::{same_camera, CameraRef};

use super::render_action::RenderAction;
use super::{LayerId, LayerRef, LAYER_ID_DEPTH};

/// One (layer, bucket) entry of a composition.
pub struct SubLayer {
    layer: LayerRef,
    id: LayerId,
    transparent: bool,
    enabled: bool,
}

impl SubLayer {
    /// The referenced layer.
    pub fn layer(&self) -> &LayerRef {
        &self.layer
    }

    /// Id of the referenced layer.
    pub fn layer_id(&self) -> LayerId {
        self.id
    }

    /// Whether this entry renders the transparent bucket.
    pub fn is_transparent(&self) -> bool {
        self.transparent
    }

    /// Whether this entry is enabled, independent of the layer's own
    /// enable counter.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl std::fmt::Debug for SubLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubLayer")
            .field("id", &self.id)
            .field("transparent", &self.transparent)
            .field("enabled", &self.enabled)
            .finish()
    }
}

/// Kinds of composition notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompositionEventKind {
    LayerAdded,
    LayerRemoved,
    SubLayerToggled,
}

/// A composition notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositionEvent {
    /// A layer gained its first sublayer entry.
    LayerAdded(LayerId),
    /// A layer lost its last sublayer entry.
    LayerRemoved(LayerId),
    /// A sublayer entry was enabled or disabled.
    SubLayerToggled {
        layer: LayerId,
        transparent: bool,
        enabled: bool,
    },
}

impl CompositionEvent {
    fn kind(&self) -> CompositionEventKind {
        match self {
            Self::LayerAdded(_) => CompositionEventKind::LayerAdded,
            Self::LayerRemoved(_) => CompositionEventKind::LayerRemoved,
            Self::SubLayerToggled { .. } => CompositionEventKind::SubLayerToggled,
        }
    }
}

type ObserverFn = Box<dyn FnMut(&CompositionEvent) + Send>;

/// An ordered composition of layers and the cached frame schedule.
pub struct LayerComposition {
    name: String,
    sublayers: Vec<SubLayer>,
    opaque_order: HashMap<LayerId, usize>,
    transparent_order: HashMap<LayerId, usize>,

    cameras: Vec<CameraRef>,
    render_actions: Vec<RenderAction>,
    dirty: bool,

    observers: Vec<(CompositionEventKind, ObserverFn)>,
}

impl LayerComposition {
    /// Create a new, empty composition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sublayers: Vec::new(),
            opaque_order: HashMap::new(),
            transparent_order: HashMap::new(),
            cameras: Vec::new(),
            render_actions: Vec::new(),
            dirty: true,
            observers: Vec::new(),
        }
    }

    /// Get the composition name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The sublayer records, in render order.
    pub fn sublayers(&self) -> &[SubLayer] {
        &self.sublayers
    }

    /// Subscribe to notifications of one event kind.
    pub fn subscribe<F>(&mut self, kind: CompositionEventKind, observer: F)
    where
        F: FnMut(&CompositionEvent) + Send + 'static,
    {
        self.observers.push((kind, Box::new(observer)));
    }

    // ========================================================================
    // Composition editing
    // ========================================================================

    /// Add both buckets of a layer (opaque, then transparent) at the end.
    /// A layer already present anywhere in the composition is a no-op.
    pub fn push(&mut self, layer: LayerRef) {
        let index = self.sublayers.len();
        self.insert(layer, index);
    }

    /// Insert both buckets of a layer at the given position. A layer
    /// already present anywhere in the composition is a no-op.
    pub fn insert(&mut self, layer: LayerRef, index: usize) {
        let id = layer.read().id();
        if self.contains_layer(id) {
            log::warn!(
                "LayerComposition '{}': layer {:?} is already added",
                self.name,
                id
            );
            return;
        }
        let index = index.min(self.sublayers.len());
        self.sublayers.insert(
            index,
            SubLayer {
                layer: Arc::clone(&layer),
                id,
                transparent: false,
                enabled: true,
            },
        );
        self.sublayers.insert(
            index + 1,
            SubLayer {
                layer,
                id,
                transparent: true,
                enabled: true,
            },
        );
        self.structure_changed();
        Self::notify(&mut self.observers, &CompositionEvent::LayerAdded(id));
    }

    /// Remove every sublayer entry of a layer. A layer not present is a
    /// no-op, so cleanup is idempotent.
    pub fn remove(&mut self, layer: &LayerRef) {
        let id = layer.read().id();
        let before = self.sublayers.len();
        self.sublayers.retain(|s| s.id != id);
        if self.sublayers.len() != before {
            self.structure_changed();
            Self::notify(&mut self.observers, &CompositionEvent::LayerRemoved(id));
        }
    }

    /// Add the opaque bucket of a layer at the end.
    pub fn push_opaque(&mut self, layer: LayerRef) {
        let index = self.sublayers.len();
        self.insert_sublayer(layer, false, index);
    }

    /// Insert the opaque bucket of a layer at the given position.
    pub fn insert_opaque(&mut self, layer: LayerRef, index: usize) {
        self.insert_sublayer(layer, false, index);
    }

    /// Remove the opaque bucket of a layer.
    pub fn remove_opaque(&mut self, layer: &LayerRef) {
        self.remove_sublayer(layer, false);
    }

    /// Add the transparent bucket of a layer at the end.
    pub fn push_transparent(&mut self, layer: LayerRef) {
        let index = self.sublayers.len();
        self.insert_sublayer(layer, true, index);
    }

    /// Insert the transparent bucket of a layer at the given position.
    pub fn insert_transparent(&mut self, layer: LayerRef, index: usize) {
        self.insert_sublayer(layer, true, index);
    }

    /// Remove the transparent bucket of a layer.
    pub fn remove_transparent(&mut self, layer: &LayerRef) {
        self.remove_sublayer(layer, true);
    }

    fn insert_sublayer(&mut self, layer: LayerRef, transparent: bool, index: usize) {
        let id = layer.read().id();
        if self.contains_sublayer(id, transparent) {
            log::warn!(
                "LayerComposition '{}': sublayer ({:?}, transparent: {}) is already added",
                self.name,
                id,
                transparent
            );
            return;
        }
        let was_present = self.contains_layer(id);
        let index = index.min(self.sublayers.len());
        self.sublayers.insert(
            index,
            SubLayer {
                layer,
                id,
                transparent,
                enabled: true,
            },
        );
        self.structure_changed();
        if !was_present {
            Self::notify(&mut self.observers, &CompositionEvent::LayerAdded(id));
        }
    }

    fn remove_sublayer(&mut self, layer: &LayerRef, transparent: bool) {
        let id = layer.read().id();
        let before = self.sublayers.len();
        self.sublayers
            .retain(|s| !(s.id == id && s.transparent == transparent));
        if self.sublayers.len() != before {
            self.structure_changed();
            if !self.contains_layer(id) {
                Self::notify(&mut self.observers, &CompositionEvent::LayerRemoved(id));
            }
        }
    }

    fn structure_changed(&mut self) {
        self.rebuild_order_maps();
        self.dirty = true;
    }

    fn rebuild_order_maps(&mut self) {
        self.opaque_order.clear();
        self.transparent_order.clear();
        for (index, sub) in self.sublayers.iter().enumerate() {
            let map = if sub.transparent {
                &mut self.transparent_order
            } else {
                &mut self.opaque_order
            };
            map.insert(sub.id, index);
        }
    }

    fn notify(observers: &mut [(CompositionEventKind, ObserverFn)], event: &CompositionEvent) {
        for (kind, observer) in observers.iter_mut() {
            if *kind == event.kind() {
                observer(event);
            }
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Whether any sublayer of the layer is present.
    pub fn contains_layer(&self, id: LayerId) -> bool {
        self.sublayers.iter().any(|s| s.id == id)
    }

    fn contains_sublayer(&self, id: LayerId, transparent: bool) -> bool {
        self.sublayers
            .iter()
            .any(|s| s.id == id && s.transparent == transparent)
    }

    /// Find a layer by id.
    pub fn layer_by_id(&self, id: LayerId) -> Option<LayerRef> {
        self.sublayers
            .iter()
            .find(|s| s.id == id)
            .map(|s| Arc::clone(&s.layer))
    }

    /// Find a layer by name.
    pub fn layer_by_name(&self, name: &str) -> Option<LayerRef> {
        self.sublayers
            .iter()
            .find(|s| s.layer.read().name() == name)
            .map(|s| Arc::clone(&s.layer))
    }

    /// Position of a layer's opaque sublayer in the composition.
    pub fn opaque_index(&self, id: LayerId) -> Option<usize> {
        self.opaque_order.get(&id).copied()
    }

    /// Position of a layer's transparent sublayer in the composition.
    pub fn transparent_index(&self, id: LayerId) -> Option<usize> {
        self.transparent_order.get(&id).copied()
    }

    /// Whether a sublayer entry is enabled. Missing entries report false.
    pub fn is_enabled(&self, id: LayerId, transparent: bool) -> bool {
        self.sublayers
            .iter()
            .any(|s| s.id == id && s.transparent == transparent && s.enabled)
    }

    /// Enable or disable a sublayer entry, independent of the layer's own
    /// enable counter.
    pub fn set_enabled(&mut self, id: LayerId, transparent: bool, enabled: bool) {
        let Some(sub) = self
            .sublayers
            .iter_mut()
            .find(|s| s.id == id && s.transparent == transparent)
        else {
            return;
        };
        if sub.enabled == enabled {
            return;
        }
        sub.enabled = enabled;
        self.dirty = true;
        Self::notify(
            &mut self.observers,
            &CompositionEvent::SubLayerToggled {
                layer: id,
                transparent,
                enabled,
            },
        );
    }

    /// The priority-sorted camera list derived by the last `update()`.
    pub fn cameras(&self) -> &[CameraRef] {
        &self.cameras
    }

    /// The render action schedule derived by the last `update()`.
    pub fn render_actions(&self) -> &[RenderAction] {
        &self.render_actions
    }

    // ========================================================================
    // Schedule rebuild
    // ========================================================================

    /// Rebuild the cached camera list and render actions if anything
    /// composition-relevant changed. Idempotent; called once per frame.
    pub fn update(&mut self) {
        let mut dirty = self.dirty;

        // Poll layer dirty flags exactly once per distinct layer; a full
        // push holds the same layer in two records.
        let mut polled: Vec<LayerId> = Vec::with_capacity(self.sublayers.len());
        for sub in &self.sublayers {
            if polled.contains(&sub.id) {
                continue;
            }
            polled.push(sub.id);
            if sub.layer.write().take_composition_dirty() {
                dirty = true;
            }
        }

        if !dirty {
            return;
        }
        self.dirty = false;

        self.rebuild_cameras();
        self.rebuild_render_actions();

        log::debug!(
            "LayerComposition '{}': rebuilt {} render actions for {} cameras",
            self.name,
            self.render_actions.len(),
            self.cameras.len()
        );
    }

    fn rebuild_cameras(&mut self) {
        self.cameras.clear();
        for sub in &self.sublayers {
            let layer = sub.layer.read();
            for camera in layer.cameras() {
                if !self.cameras.iter().any(|c| same_camera(c, camera)) {
                    self.cameras.push(Arc::clone(camera));
                }
            }
        }
        if self.cameras.len() > 1 {
            // Stable: equal priorities keep discovery order.
            self.cameras.sort_by_key(|c| c.priority());
        }
    }

    fn rebuild_render_actions(&mut self) {
        let mut actions: Vec<RenderAction> = Vec::with_capacity(self.render_actions.len().max(8));

        for (camera_index, camera) in self.cameras.iter().enumerate() {
            if camera.custom_render_passes() {
                actions.push(RenderAction::pass_through(Arc::clone(camera), camera_index));
                continue;
            }

            let first_action = actions.len();
            let mut post_process_marked = false;

            for (sublayer_index, sub) in self.sublayers.iter().enumerate() {
                if !sub.enabled {
                    continue;
                }
                let layer = sub.layer.read();
                if !layer.is_enabled() {
                    continue;
                }

                // Post-processing stops at this layer: flag the action just
                // before it, once, so overlays after it stay unprocessed.
                if !post_process_marked && camera.disable_post_effects_layer() == Some(sub.id) {
                    post_process_marked = true;
                    if actions.len() > first_action {
                        if let Some(last) = actions.last_mut() {
                            last.trigger_postprocess = true;
                        }
                    }
                }

                let Some(layer_camera_slot) = layer.camera_index(camera) else {
                    continue;
                };
                if !camera.layer_ids().contains(&sub.id) {
                    continue;
                }

                let camera_first = actions.len() == first_action;

                // The camera target takes precedence over the layer target,
                // except on the reserved depth-prepass layer.
                let mut target = layer.render_target();
                if let Some(camera_target) = camera.render_target() {
                    if sub.id != LAYER_ID_DEPTH {
                        target = Some(camera_target);
                    }
                }
                // Layers past the post-process boundary are composited on
                // top of the post-processed output.
                if post_process_marked && camera.post_effects_enabled() {
                    target = None;
                }

                // Camera clears apply on the first use of a
                // (camera, target) pair only; layer clears always apply.
                let target_used = actions[first_action..]
                    .iter()
                    .any(|a| same_target(a.render_target.as_ref(), target.as_ref()));
                let mut clear_flags = if camera_first || !target_used {
                    camera.clear_flags()
                } else {
                    ClearFlags::empty()
                };
                clear_flags |= layer.clear_flags();

                actions.push(RenderAction {
                    camera: Arc::clone(camera),
                    camera_index,
                    layer_id: Some(sub.id),
                    sublayer_index: Some(sublayer_index),
                    transparent: sub.transparent,
                    layer_camera_slot,
                    render_target: target,
                    clear_flags,
                    first_camera_use: camera_first,
                    last_camera_use: false,
                    trigger_postprocess: false,
                    use_camera_passes: false,
                });
            }

            if actions.len() > first_action {
                // Fallback: a boundary that was never reached flags the
                // camera's final action instead.
                if !post_process_marked {
                    actions.last_mut().unwrap().trigger_postprocess = true;
                }
                actions.last_mut().unwrap().last_camera_use = true;

                if camera.render_target().is_some() && first_action > 0 {
                    propagate_render_target(&mut actions[..first_action], camera);
                }
            }
        }

        self.render_actions = actions;
    }
}

impl std::fmt::Debug for LayerComposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerComposition")
            .field("name", &self.name)
            .field("sublayers", &self.sublayers)
            .field("cameras", &self.cameras.len())
            .field("render_actions", &self.render_actions.len())
            .finish()
    }
}

/// Outcome of one backward target-propagation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Propagation {
    /// The action inherits the camera's target; keep walking.
    Assign,
    /// Depth-prepass action: never receives a final target, but does not
    /// end the camera stack either.
    Skip,
    /// The camera stack ends here.
    Stop,
}

fn propagation_step(action: &RenderAction, from: &CameraRef) -> Propagation {
    if action.layer_id == Some(LAYER_ID_DEPTH) {
        return Propagation::Skip;
    }
    if action.use_camera_passes {
        return Propagation::Stop;
    }
    if action.render_target.is_some() {
        return Propagation::Stop;
    }
    if action.camera.rect() != from.rect() || action.camera.scissor_rect() != from.scissor_rect() {
        return Propagation::Stop;
    }
    Propagation::Assign
}

fn propagate_render_target(actions: &mut [RenderAction], from: &CameraRef) {
    let Some(target) = from.render_target() else {
        return;
    };
    for action in actions.iter_mut().rev() {
        match propagation_step(action, from) {
            Propagation::Assign => action.render_target = Some(Arc::clone(&target)),
            Propagation::Skip => {}
            Propagation::Stop => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{Rect, RenderTarget};
    use crate::layer::Layer;
    use crate::scene::RenderCamera;

    #[derive(Default)]
    struct TestCamera {
        layers: Vec<LayerId>,
        priority: i32,
        rect: Option<Rect>,
        target: Option<Arc<RenderTarget>>,
        boundary: Option<LayerId>,
        clear_color: bool,
        custom_passes: bool,
    }

    impl RenderCamera for TestCamera {
        fn layer_ids(&self) -> &[LayerId] {
            &self.layers
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn rect(&self) -> Rect {
            self.rect.unwrap_or(Rect::FULL)
        }

        fn render_target(&self) -> Option<Arc<RenderTarget>> {
            self.target.clone()
        }

        fn disable_post_effects_layer(&self) -> Option<LayerId> {
            self.boundary
        }

        fn clear_color_buffer(&self) -> bool {
            self.clear_color
        }

        fn custom_render_passes(&self) -> bool {
            self.custom_passes
        }
    }

    fn camera_on(layers: &[LayerId]) -> CameraRef {
        Arc::new(TestCamera {
            layers: layers.to_vec(),
            ..Default::default()
        })
    }

    #[test]
    fn push_creates_opaque_then_transparent_records() {
        let mut comp = LayerComposition::new("test");
        let layer = Layer::new("world").into_ref();
        let id = layer.read().id();
        comp.push(layer);

        assert_eq!(comp.sublayers().len(), 2);
        assert!(!comp.sublayers()[0].is_transparent());
        assert!(comp.sublayers()[1].is_transparent());
        assert_eq!(comp.opaque_index(id), Some(0));
        assert_eq!(comp.transparent_index(id), Some(1));
    }

    #[test]
    fn duplicate_push_is_noop() {
        let mut comp = LayerComposition::new("test");
        let layer = Layer::new("world").into_ref();
        comp.push(Arc::clone(&layer));
        comp.push(layer);
        assert_eq!(comp.sublayers().len(), 2);
    }

    #[test]
    fn remove_is_idempotent() {
        let mut comp = LayerComposition::new("test");
        let layer = Layer::new("world").into_ref();
        let id = layer.read().id();
        comp.push(Arc::clone(&layer));

        comp.remove(&layer);
        assert_eq!(comp.sublayers().len(), 0);
        assert_eq!(comp.opaque_index(id), None);

        comp.remove(&layer);
        assert_eq!(comp.sublayers().len(), 0);
    }

    #[test]
    fn partial_pushes_track_pair_presence() {
        let mut comp = LayerComposition::new("test");
        let layer = Layer::new("world").into_ref();

        comp.push_opaque(Arc::clone(&layer));
        comp.push_opaque(Arc::clone(&layer));
        assert_eq!(comp.sublayers().len(), 1);

        comp.push_transparent(Arc::clone(&layer));
        assert_eq!(comp.sublayers().len(), 2);

        comp.remove_transparent(&layer);
        assert_eq!(comp.sublayers().len(), 1);
        assert!(comp.contains_layer(layer.read().id()));
    }

    #[test]
    fn events_fire_on_membership_edges() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let added = Arc::new(AtomicUsize::new(0));
        let removed = Arc::new(AtomicUsize::new(0));

        let mut comp = LayerComposition::new("test");
        let added2 = Arc::clone(&added);
        comp.subscribe(CompositionEventKind::LayerAdded, move |_| {
            added2.fetch_add(1, Ordering::Relaxed);
        });
        let removed2 = Arc::clone(&removed);
        comp.subscribe(CompositionEventKind::LayerRemoved, move |_| {
            removed2.fetch_add(1, Ordering::Relaxed);
        });

        let layer = Layer::new("world").into_ref();
        comp.push_opaque(Arc::clone(&layer));
        comp.push_transparent(Arc::clone(&layer));
        assert_eq!(added.load(Ordering::Relaxed), 1);

        comp.remove_opaque(&layer);
        assert_eq!(removed.load(Ordering::Relaxed), 0);
        comp.remove_transparent(&layer);
        assert_eq!(removed.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn update_skips_when_nothing_changed() {
        let mut comp = LayerComposition::new("test");
        let layer = Layer::new("world").into_ref();
        let id = layer.read().id();
        let cam = camera_on(&[id]);
        layer.write().add_camera(&cam);
        comp.push(layer);

        comp.update();
        assert_eq!(comp.render_actions().len(), 2);

        // Nothing changed; the cached schedule must survive untouched.
        comp.update();
        assert_eq!(comp.render_actions().len(), 2);
        assert_eq!(comp.cameras().len(), 1);
    }

    #[test]
    fn cameras_sort_by_priority_with_stable_ties() {
        let mut comp = LayerComposition::new("test");
        let layer = Layer::new("world").into_ref();
        let id = layer.read().id();

        let low = Arc::new(TestCamera {
            layers: vec![id],
            priority: -1,
            ..Default::default()
        }) as CameraRef;
        let first_tie = camera_on(&[id]);
        let second_tie = camera_on(&[id]);

        {
            let mut l = layer.write();
            l.add_camera(&first_tie);
            l.add_camera(&second_tie);
            l.add_camera(&low);
        }
        comp.push(layer);
        comp.update();

        assert!(same_camera(&comp.cameras()[0], &low));
        assert!(same_camera(&comp.cameras()[1], &first_tie));
        assert!(same_camera(&comp.cameras()[2], &second_tie));
    }

    #[test]
    fn camera_matching_no_layers_emits_nothing() {
        let mut comp = LayerComposition::new("test");
        let layer = Layer::new("world").into_ref();
        let stranger = camera_on(&[LayerId(9999)]);
        layer.write().add_camera(&stranger);
        comp.push(layer);

        comp.update();
        assert!(comp.render_actions().is_empty());
    }

    #[test]
    fn custom_render_passes_emit_single_pass_through() {
        let mut comp = LayerComposition::new("test");
        let layer = Layer::new("world").into_ref();
        let id = layer.read().id();
        let cam = Arc::new(TestCamera {
            layers: vec![id],
            custom_passes: true,
            ..Default::default()
        }) as CameraRef;
        layer.write().add_camera(&cam);
        comp.push(layer);

        comp.update();
        assert_eq!(comp.render_actions().len(), 1);
        let action = &comp.render_actions()[0];
        assert!(action.use_camera_passes);
        assert_eq!(action.layer_id, None);
        assert!(action.first_camera_use && action.last_camera_use);
    }

    #[test]
    fn disabled_sublayer_and_disabled_layer_are_skipped() {
        let mut comp = LayerComposition::new("test");
        let layer = Layer::new("world").into_ref();
        let id = layer.read().id();
        let cam = camera_on(&[id]);
        layer.write().add_camera(&cam);
        comp.push(Arc::clone(&layer));

        comp.set_enabled(id, true, false);
        comp.update();
        assert_eq!(comp.render_actions().len(), 1);
        assert!(!comp.render_actions()[0].transparent);

        layer.write().set_enabled(false);
        comp.update();
        assert!(comp.render_actions().is_empty());
    }

    // ------------------------------------------------------------------
    // Target propagation state machine
    // ------------------------------------------------------------------

    fn action_for(camera: &CameraRef, layer_id: LayerId) -> RenderAction {
        RenderAction {
            camera: Arc::clone(camera),
            camera_index: 0,
            layer_id: Some(layer_id),
            sublayer_index: Some(0),
            transparent: false,
            layer_camera_slot: 0,
            render_target: None,
            clear_flags: ClearFlags::empty(),
            first_camera_use: false,
            last_camera_use: false,
            trigger_postprocess: false,
            use_camera_passes: false,
        }
    }

    #[test]
    fn propagation_assigns_bare_matching_action() {
        let from = camera_on(&[]);
        let action = action_for(&camera_on(&[]), LayerId(42));
        assert_eq!(propagation_step(&action, &from), Propagation::Assign);
    }

    #[test]
    fn propagation_skips_depth_prepass() {
        let from = camera_on(&[]);
        let mut action = action_for(&camera_on(&[]), LAYER_ID_DEPTH);
        assert_eq!(propagation_step(&action, &from), Propagation::Skip);

        // Even one that somehow carries a target is skipped, not a stop.
        action.render_target = Some(Arc::new(RenderTarget::new(4, 4)));
        assert_eq!(propagation_step(&action, &from), Propagation::Skip);
    }

    #[test]
    fn propagation_stops_at_existing_target() {
        let from = camera_on(&[]);
        let mut action = action_for(&camera_on(&[]), LayerId(42));
        action.render_target = Some(Arc::new(RenderTarget::new(4, 4)));
        assert_eq!(propagation_step(&action, &from), Propagation::Stop);
    }

    #[test]
    fn propagation_stops_on_viewport_mismatch() {
        let from = camera_on(&[]);
        let half = Arc::new(TestCamera {
            rect: Some(Rect::new(0.0, 0.0, 0.5, 1.0)),
            ..Default::default()
        }) as CameraRef;
        let action = action_for(&half, LayerId(42));
        assert_eq!(propagation_step(&action, &from), Propagation::Stop);
    }

    #[test]
    fn propagation_stops_at_camera_pass_through() {
        let from = camera_on(&[]);
        let mut action = action_for(&camera_on(&[]), LayerId(42));
        action.layer_id = None;
        action.use_camera_passes = true;
        assert_eq!(propagation_step(&action, &from), Propagation::Stop);
    }
}
