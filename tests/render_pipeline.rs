//! End-to-end frames through the public renderer API.

use soft_renderer::rendering::{DepthTest, ShadingConfig};
use soft_renderer::{RenderConfig, Rgba, Scene, SoftRenderer, TaskExecutor};
use std::sync::Arc;

fn render_demo(config: RenderConfig, threads: usize) -> (SoftRenderer, Vec<u8>) {
    let scene = Scene::demo(config.aspect_ratio());
    let renderer = SoftRenderer::new(config, Arc::new(TaskExecutor::new(threads).unwrap())).unwrap();
    renderer.clear_frame_buffer();
    renderer.render_scene(&scene, ShadingConfig::default()).unwrap();
    let bytes = renderer.frame().to_rgba_bytes();
    (renderer, bytes)
}

fn config(hierarchical: bool) -> RenderConfig {
    RenderConfig {
        width: 96,
        height: 64,
        hierarchical_depth: hierarchical,
        ..RenderConfig::default()
    }
}

#[test]
fn depth_variants_produce_identical_frames_on_one_thread() {
    let (_, flat) = render_demo(config(false), 1);
    let (_, hier) = render_demo(config(true), 1);
    assert_eq!(flat.len(), 96 * 64 * 4);
    assert!(flat == hier, "flat and hierarchical frames differ");
}

#[test]
fn multi_threaded_frame_is_fully_covered() {
    let (renderer, bytes) = render_demo(config(true), 4);
    let opaque = bytes.chunks_exact(4).filter(|px| px[3] == 255).count();
    assert!(opaque * 100 >= 96 * 64 * 99, "only {opaque} opaque pixels");
    assert_eq!(renderer.frame().width(), 96);
}

#[test]
fn scene_geometry_lands_in_front_of_the_sky() {
    let (renderer, _) = render_demo(config(false), 2);
    // The demo looks at a sphere near the origin; the frame center is covered
    // by geometry, so its depth is nearer than the sky's far plane.
    let (cx, cy) = (renderer.width() / 2, renderer.height() / 2);
    assert!(!renderer.depth().visible(cx, cy, 0.999_9));
    assert_ne!(renderer.frame().read(cx, cy), Rgba::TRANSPARENT);
}

#[test]
fn gamma_brightens_the_frame() {
    let (_, linear) = render_demo(config(false), 1);
    let (_, corrected) = render_demo(
        RenderConfig {
            gamma: true,
            ..config(false)
        },
        1,
    );
    let sum = |bytes: &[u8]| -> u64 {
        bytes
            .chunks_exact(4)
            .map(|px| px[0] as u64 + px[1] as u64 + px[2] as u64)
            .sum()
    };
    assert!(sum(&corrected) > sum(&linear));
}

#[test]
fn clearing_resets_both_targets() {
    let (renderer, _) = render_demo(config(true), 2);
    renderer.clear_frame_buffer();
    assert!(renderer.frame().to_rgba_bytes().iter().all(|&b| b == 0));
    for y in 0..renderer.height() {
        for x in 0..renderer.width() {
            assert!(renderer.depth().visible(x, y, 1.0));
        }
    }
}
