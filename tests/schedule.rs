//! End-to-end scheduling tests: composition update, action flags, target
//! propagation, graph compilation and grab allocation working together.

use std::sync::Arc;

use render_scheduler::gpu::{DummyDevice, GpuOp, Rect, RenderTarget};
use render_scheduler::graph::{FrameGraph, RenderActionPass};
use render_scheduler::layer::{Layer, LayerComposition, LayerId, LayerRef, LAYER_ID_DEPTH};
use render_scheduler::scene::{CameraRef, RenderCamera};
use render_scheduler::{ClearFlags, ColorGrabPass};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Default)]
struct TestCamera {
    layers: Vec<LayerId>,
    priority: i32,
    rect: Option<Rect>,
    target: Option<Arc<RenderTarget>>,
    boundary: Option<LayerId>,
    clear_color: bool,
    clear_depth: bool,
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

    fn clear_depth_buffer(&self) -> bool {
        self.clear_depth
    }
}

fn attach(layer: &LayerRef, camera: &CameraRef) {
    layer.write().add_camera(camera);
}

/// The canonical scenario: camera C on [A-opaque, A-transparent, B-opaque]
/// with C.layers = [A, B] yields exactly three actions in that order.
fn canonical_setup() -> (LayerComposition, LayerId, LayerId, CameraRef) {
    let a = Layer::new("a").into_ref();
    let b = Layer::new("b").into_ref();
    let (a_id, b_id) = (a.read().id(), b.read().id());

    let camera: CameraRef = Arc::new(TestCamera {
        layers: vec![a_id, b_id],
        ..Default::default()
    });
    attach(&a, &camera);
    attach(&b, &camera);

    let mut comp = LayerComposition::new("main");
    comp.push(Arc::clone(&a));
    comp.push_opaque(b);

    (comp, a_id, b_id, camera)
}

#[test]
fn composition_stays_consistent_across_edits() {
    let mut comp = LayerComposition::new("main");
    let a = Layer::new("a").into_ref();
    let b = Layer::new("b").into_ref();
    let (a_id, b_id) = (a.read().id(), b.read().id());

    comp.push(Arc::clone(&a));
    comp.push(Arc::clone(&b));
    assert_eq!(comp.sublayers().len(), 4);

    // Duplicate push leaves the composition unchanged.
    comp.push(Arc::clone(&a));
    assert_eq!(comp.sublayers().len(), 4);

    comp.remove(&a);
    assert_eq!(comp.sublayers().len(), 2);
    assert_eq!(comp.opaque_index(a_id), None);
    assert_eq!(comp.opaque_index(b_id), Some(0));
    assert_eq!(comp.transparent_index(b_id), Some(1));

    // Removal cleanup is idempotent.
    comp.remove(&a);
    assert_eq!(comp.sublayers().len(), 2);

    comp.insert(a, 0);
    assert_eq!(comp.opaque_index(a_id), Some(0));
    assert_eq!(comp.opaque_index(b_id), Some(2));
}

#[test]
fn canonical_scenario_emits_three_flagged_actions() {
    init_logging();
    let (mut comp, a_id, b_id, _camera) = canonical_setup();
    comp.update();

    let actions = comp.render_actions();
    assert_eq!(actions.len(), 3);

    assert_eq!(actions[0].layer_id, Some(a_id));
    assert!(!actions[0].transparent);
    assert_eq!(actions[1].layer_id, Some(a_id));
    assert!(actions[1].transparent);
    assert_eq!(actions[2].layer_id, Some(b_id));
    assert!(!actions[2].transparent);

    assert!(actions[0].first_camera_use);
    assert!(!actions[1].first_camera_use);
    assert!(!actions[0].last_camera_use);
    assert!(actions[2].last_camera_use);

    // No boundary configured: the final action triggers post effects.
    assert!(!actions[0].trigger_postprocess);
    assert!(!actions[1].trigger_postprocess);
    assert!(actions[2].trigger_postprocess);
}

#[test]
fn post_effects_boundary_flags_preceding_action() {
    let (mut comp, a_id, b_id, _camera) = {
        let a = Layer::new("a").into_ref();
        let b = Layer::new("b").into_ref();
        let (a_id, b_id) = (a.read().id(), b.read().id());

        let camera: CameraRef = Arc::new(TestCamera {
            layers: vec![a_id, b_id],
            boundary: Some(b_id),
            ..Default::default()
        });
        attach(&a, &camera);
        attach(&b, &camera);

        let mut comp = LayerComposition::new("main");
        comp.push(Arc::clone(&a));
        comp.push_opaque(b);
        (comp, a_id, b_id, camera)
    };
    comp.update();

    let actions = comp.render_actions();
    assert_eq!(actions.len(), 3);
    assert_eq!(actions[1].layer_id, Some(a_id));
    assert!(actions[1].transparent);

    // Only the action immediately before the boundary layer is flagged.
    let flagged: Vec<bool> = actions.iter().map(|a| a.trigger_postprocess).collect();
    assert_eq!(flagged, vec![false, true, false]);
    assert_eq!(actions[2].layer_id, Some(b_id));
}

#[test]
fn camera_clears_apply_to_first_target_use_only() {
    let a = Layer::new("a").into_ref();
    let b = Layer::new("b").into_ref();
    let (a_id, b_id) = (a.read().id(), b.read().id());
    b.write().set_clear_flags(ClearFlags::DEPTH);

    let camera: CameraRef = Arc::new(TestCamera {
        layers: vec![a_id, b_id],
        clear_color: true,
        clear_depth: true,
        ..Default::default()
    });
    attach(&a, &camera);
    attach(&b, &camera);

    let mut comp = LayerComposition::new("main");
    comp.push(Arc::clone(&a));
    comp.push(b);
    comp.update();

    let actions = comp.render_actions();
    assert_eq!(actions.len(), 4);

    // First use of the backbuffer gets the camera clears.
    assert_eq!(actions[0].clear_flags, ClearFlags::COLOR | ClearFlags::DEPTH);
    // Same target again: camera clears are not re-applied.
    assert_eq!(actions[1].clear_flags, ClearFlags::empty());
    // Layer-requested clears always apply.
    assert_eq!(actions[2].clear_flags, ClearFlags::DEPTH);
    assert_eq!(actions[3].clear_flags, ClearFlags::DEPTH);
}

#[test]
fn offscreen_camera_propagates_target_to_preceding_stack() {
    let world = Layer::new("world").into_ref();
    let effect = Layer::new("effect").into_ref();
    let (world_id, effect_id) = (world.read().id(), effect.read().id());

    let screen_cam: CameraRef = Arc::new(TestCamera {
        layers: vec![world_id],
        priority: 0,
        ..Default::default()
    });
    let target = Arc::new(RenderTarget::new(512, 512).with_depth_buffer());
    let offscreen_cam: CameraRef = Arc::new(TestCamera {
        layers: vec![effect_id],
        priority: 1,
        target: Some(Arc::clone(&target)),
        ..Default::default()
    });

    attach(&world, &screen_cam);
    attach(&effect, &offscreen_cam);

    let mut comp = LayerComposition::new("main");
    comp.push(Arc::clone(&world));
    comp.push(effect);
    comp.update();

    let actions = comp.render_actions();
    assert_eq!(actions.len(), 4);

    // The screen camera's actions inherited the offscreen target.
    for action in &actions[0..2] {
        assert!(action
            .render_target
            .as_ref()
            .is_some_and(|rt| Arc::ptr_eq(rt, &target)));
    }
    for action in &actions[2..4] {
        assert!(action
            .render_target
            .as_ref()
            .is_some_and(|rt| Arc::ptr_eq(rt, &target)));
    }
}

#[test]
fn propagation_skips_depth_prepass_and_stops_on_rect_mismatch() {
    let prepass = Layer::with_id("depth-prepass", LAYER_ID_DEPTH).into_ref();
    let world = Layer::new("world").into_ref();
    let effect = Layer::new("effect").into_ref();
    let (world_id, effect_id) = (world.read().id(), effect.read().id());

    let screen_cam: CameraRef = Arc::new(TestCamera {
        layers: vec![LAYER_ID_DEPTH, world_id],
        priority: 0,
        ..Default::default()
    });
    let target = Arc::new(RenderTarget::new(512, 512));
    let offscreen_cam: CameraRef = Arc::new(TestCamera {
        layers: vec![effect_id],
        priority: 1,
        target: Some(Arc::clone(&target)),
        ..Default::default()
    });

    attach(&prepass, &screen_cam);
    attach(&world, &screen_cam);
    attach(&effect, &offscreen_cam);

    let mut comp = LayerComposition::new("main");
    comp.push_opaque(Arc::clone(&prepass));
    comp.push(Arc::clone(&world));
    comp.push(effect);
    comp.update();

    let actions = comp.render_actions();
    assert_eq!(actions.len(), 5);

    // Depth prepass never receives a propagated target, but the walk
    // continues past it.
    assert_eq!(actions[0].layer_id, Some(LAYER_ID_DEPTH));
    assert!(actions[0].render_target.is_none());
    assert!(actions[1]
        .render_target
        .as_ref()
        .is_some_and(|rt| Arc::ptr_eq(rt, &target)));
    assert!(actions[2]
        .render_target
        .as_ref()
        .is_some_and(|rt| Arc::ptr_eq(rt, &target)));

    // A viewport mismatch ends the stack: nothing is propagated.
    let half_cam: CameraRef = Arc::new(TestCamera {
        layers: vec![world_id],
        priority: 0,
        rect: Some(Rect::new(0.0, 0.0, 0.5, 1.0)),
        ..Default::default()
    });
    world.write().clear_cameras();
    world.write().add_camera(&half_cam);
    comp.update();

    let actions = comp.render_actions();
    let world_action = actions
        .iter()
        .find(|a| a.layer_id == Some(world_id))
        .unwrap();
    assert!(world_action.render_target.is_none());
}

#[test]
fn layer_target_is_overridden_by_camera_target_except_depth() {
    let layer_target = Arc::new(RenderTarget::new(128, 128));
    let camera_target = Arc::new(RenderTarget::new(256, 256));

    let prepass = Layer::with_id("depth-prepass", LAYER_ID_DEPTH).into_ref();
    let world = Layer::new("world").into_ref();
    let world_id = world.read().id();
    world
        .write()
        .set_render_target(Some(Arc::clone(&layer_target)));

    let camera: CameraRef = Arc::new(TestCamera {
        layers: vec![LAYER_ID_DEPTH, world_id],
        target: Some(Arc::clone(&camera_target)),
        ..Default::default()
    });
    attach(&prepass, &camera);
    attach(&world, &camera);

    let mut comp = LayerComposition::new("main");
    comp.push_opaque(prepass);
    comp.push_opaque(world);
    comp.update();

    let actions = comp.render_actions();
    assert_eq!(actions.len(), 2);
    // The depth prepass keeps its own resolution of the target.
    assert!(actions[0].render_target.is_none());
    // The world layer's own target yields to the camera's.
    assert!(actions[1]
        .render_target
        .as_ref()
        .is_some_and(|rt| Arc::ptr_eq(rt, &camera_target)));
}

#[test]
fn priority_orders_cameras_before_sublayer_order() {
    let world = Layer::new("world").into_ref();
    let world_id = world.read().id();

    let late: CameraRef = Arc::new(TestCamera {
        layers: vec![world_id],
        priority: 10,
        ..Default::default()
    });
    let early: CameraRef = Arc::new(TestCamera {
        layers: vec![world_id],
        priority: -10,
        ..Default::default()
    });
    // Attach in the "wrong" order; priority must win.
    attach(&world, &late);
    attach(&world, &early);

    let mut comp = LayerComposition::new("main");
    comp.push(world);
    comp.update();

    let actions = comp.render_actions();
    assert_eq!(actions.len(), 4);
    assert_eq!(actions[0].camera_index, 0);
    assert!(actions[0].first_camera_use && actions[1].last_camera_use);
    assert!(actions[2].first_camera_use && actions[3].last_camera_use);
    // The early camera occupies slot 1 of the layer (attached second).
    assert_eq!(actions[0].layer_camera_slot, 1);
    assert_eq!(actions[2].layer_camera_slot, 0);
}

#[test]
fn schedule_renders_through_frame_graph() {
    let (mut comp, _a_id, _b_id, _camera) = canonical_setup();
    comp.update();

    let mut graph = FrameGraph::new();
    for (index, action) in comp.render_actions().iter().enumerate() {
        let pass = RenderActionPass::from_actions(
            format!("action{index}"),
            std::slice::from_ref(action),
            Box::new(|_, _| {}),
        );
        graph.add_render_pass(Box::new(pass));
    }
    graph.compile();

    let mut device = DummyDevice::new();
    graph.render(&mut device);

    let labels: Vec<String> = device
        .journal()
        .iter()
        .filter_map(|op| match op {
            GpuOp::BeginPass { label, .. } => label.clone(),
            _ => None,
        })
        .collect();
    assert_eq!(labels, vec!["action0", "action1", "action2"]);
}

#[test]
fn camera_detach_rebuilds_schedule_and_compacts_slots() {
    let world = Layer::new("world").into_ref();
    let world_id = world.read().id();

    let a: CameraRef = Arc::new(TestCamera {
        layers: vec![world_id],
        ..Default::default()
    });
    let b: CameraRef = Arc::new(TestCamera {
        layers: vec![world_id],
        ..Default::default()
    });
    attach(&world, &a);
    attach(&world, &b);

    let mut comp = LayerComposition::new("main");
    comp.push_opaque(Arc::clone(&world));
    comp.update();
    assert_eq!(comp.render_actions().len(), 2);
    assert_eq!(comp.render_actions()[1].layer_camera_slot, 1);

    // Detaching camera A dirties the layer; the next update re-derives
    // both the camera list and camera B's compacted slot.
    world.write().remove_camera(&a);
    comp.update();

    assert_eq!(comp.cameras().len(), 1);
    assert_eq!(comp.render_actions().len(), 1);
    assert_eq!(comp.render_actions()[0].layer_camera_slot, 0);
}

#[test]
fn grab_reallocation_follows_backbuffer() {
    init_logging();
    let mut device = DummyDevice::new();
    let mut grab = ColorGrabPass::new();

    // Two frames at the same size: one allocation.
    grab.frame_update(&mut device).unwrap();
    grab.frame_update(&mut device).unwrap();
    assert_eq!(device.created_texture_count(), 1);

    // A resize reallocates; the old texture is destroyed.
    device.set_backbuffer_size(1920, 1080);
    grab.frame_update(&mut device).unwrap();
    assert_eq!(device.created_texture_count(), 2);
    assert_eq!(device.alive_textures().len(), 1);

    grab.destroy(&mut device);
    assert!(device.alive_textures().is_empty());
}
