//! Benchmarks for the per-frame schedule rebuild.

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};

use render_scheduler::gpu::Rect;
use render_scheduler::layer::{Layer, LayerComposition, LayerId};
use render_scheduler::scene::{CameraRef, RenderCamera};

struct BenchCamera {
    layers: Vec<LayerId>,
    priority: i32,
}

impl RenderCamera for BenchCamera {
    fn layer_ids(&self) -> &[LayerId] {
        &self.layers
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn rect(&self) -> Rect {
        Rect::FULL
    }
}

fn build_composition(layer_count: usize, camera_count: usize) -> LayerComposition {
    let mut comp = LayerComposition::new("bench");
    let layers: Vec<_> = (0..layer_count)
        .map(|i| Layer::new(format!("layer{i}")).into_ref())
        .collect();
    let ids: Vec<LayerId> = layers.iter().map(|l| l.read().id()).collect();

    let cameras: Vec<CameraRef> = (0..camera_count)
        .map(|i| {
            Arc::new(BenchCamera {
                layers: ids.clone(),
                priority: i as i32,
            }) as CameraRef
        })
        .collect();

    for layer in &layers {
        for camera in &cameras {
            layer.write().add_camera(camera);
        }
        comp.push(Arc::clone(layer));
    }
    comp
}

fn bench_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("composition_update");

    for (layers, cameras) in [(16, 1), (32, 4), (64, 8)] {
        let mut comp = build_composition(layers, cameras);
        let first = comp.sublayers()[0].layer_id();
        group.bench_function(format!("{layers}_layers_{cameras}_cameras"), |b| {
            b.iter(|| {
                // Toggle a sublayer so every iteration rebuilds.
                comp.set_enabled(first, true, false);
                comp.set_enabled(first, true, true);
                comp.update();
                comp.render_actions().len()
            });
        });
    }

    group.finish();
}

fn bench_clean_update(c: &mut Criterion) {
    let mut comp = build_composition(32, 4);
    comp.update();

    // Nothing dirty: measures the per-frame polling overhead alone.
    c.bench_function("composition_update_clean", |b| {
        b.iter(|| {
            comp.update();
            comp.render_actions().len()
        });
    });
}

criterion_group!(benches, bench_update, bench_clean_update);
criterion_main!(benches);
