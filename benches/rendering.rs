/// Benchmark suite for the rendering pipeline
/// Full frames of the demo scene plus single-model and clear costs.
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec3;
use soft_renderer::rendering::{LambertShader, ShadingConfig};
use soft_renderer::{Camera, Mesh, Model, RenderConfig, Scene, SoftRenderer, TaskExecutor};
use soft_renderer::rendering::texture::checkerboard;
use std::sync::Arc;

fn renderer(hierarchical: bool, executor: &Arc<TaskExecutor>) -> SoftRenderer {
    let config = RenderConfig {
        width: 1280,
        height: 720,
        hierarchical_depth: hierarchical,
        ..RenderConfig::default()
    };
    SoftRenderer::new(config, Arc::clone(executor)).unwrap()
}

fn bench_demo_frame(c: &mut Criterion) {
    let executor = Arc::new(TaskExecutor::with_default_threads().unwrap());
    let scene = Scene::demo(1280.0 / 720.0);
    let mut group = c.benchmark_group("demo_frame");
    group.sample_size(20);

    for hierarchical in [false, true] {
        let renderer = renderer(hierarchical, &executor);
        let label = if hierarchical { "hierarchical" } else { "flat" };
        group.bench_with_input(BenchmarkId::from_parameter(label), &scene, |b, scene| {
            b.iter(|| {
                renderer.clear_frame_buffer();
                black_box(renderer.render_scene(scene, ShadingConfig::default()).unwrap())
            });
        });
    }
    group.finish();
}

fn bench_dense_sphere(c: &mut Criterion) {
    let executor = Arc::new(TaskExecutor::with_default_threads().unwrap());
    let renderer = renderer(false, &executor);
    let camera = Camera::default_view(1280.0 / 720.0).with_fov_degrees(30.0);
    let texture = Arc::new(checkerboard(64, 8, Vec3::ONE, Vec3::splat(0.3)));
    let model = Model::new(Arc::new(Mesh::uv_sphere(256, 128)), texture);
    let shader = LambertShader::new(&model, &camera, &[], ShadingConfig::default());

    c.bench_function("dense_sphere_65k_triangles", |b| {
        b.iter(|| {
            renderer.clear_frame_buffer();
            black_box(renderer.render(&shader, &model, camera.forward(), true).unwrap())
        });
    });
}

fn bench_frame_clear(c: &mut Criterion) {
    let executor = Arc::new(TaskExecutor::with_default_threads().unwrap());
    let renderer = renderer(true, &executor);
    c.bench_function("frame_clear_1280x720", |b| {
        b.iter(|| renderer.clear_frame_buffer());
    });
}

fn bench_presentation(c: &mut Criterion) {
    let executor = Arc::new(TaskExecutor::with_default_threads().unwrap());
    let renderer = renderer(false, &executor);
    renderer.clear_frame_buffer();
    let mut target = vec![0u32; 1280 * 720];
    c.bench_function("copy_to_softbuffer", |b| {
        b.iter(|| renderer.frame().copy_to_softbuffer(black_box(&mut target)));
    });
}

criterion_group!(
    benches,
    bench_demo_frame,
    bench_dense_sphere,
    bench_frame_clear,
    bench_presentation
);
criterion_main!(benches);
