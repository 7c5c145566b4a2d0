//! Flat and hierarchical depth buffers must agree pixel for pixel, and the
//! hierarchical coarse test must never reject a rectangle that still has a
//! passing pixel.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use soft_renderer::rendering::{DepthTest, FlatDepthBuffer, HierarchicalDepthBuffer, ScreenRect};
use soft_renderer::TaskExecutor;
use std::sync::Arc;

fn buffers(width: usize, height: usize) -> (FlatDepthBuffer, HierarchicalDepthBuffer) {
    let executor = Arc::new(TaskExecutor::new(2).unwrap());
    let flat = FlatDepthBuffer::new(width, height, Arc::clone(&executor));
    let hier = HierarchicalDepthBuffer::new(width, height, executor);
    flat.clear();
    hier.clear();
    (flat, hier)
}

fn random_rect(rng: &mut ChaCha8Rng, width: usize, height: usize) -> ScreenRect {
    let x0 = rng.gen_range(0..width);
    let y0 = rng.gen_range(0..height);
    let x1 = (x0 + rng.gen_range(0..6)).min(width - 1);
    let y1 = (y0 + rng.gen_range(0..6)).min(height - 1);
    ScreenRect::from_inclusive(x0, y0, x1, y1)
}

#[test]
fn random_sequences_agree_on_every_test() {
    for (seed, (width, height)) in [(1u64, (17, 9)), (2, (64, 64)), (3, (1, 33)), (4, (100, 3))] {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let (flat, hier) = buffers(width, height);

        for _ in 0..20_000 {
            let x = rng.gen_range(0..width);
            let y = rng.gen_range(0..height);
            let z = rng.gen_range(-0.1f32..1.1);

            let expected = flat.visible(x, y, z);
            assert_eq!(hier.visible(x, y, z), expected, "seed {seed}: ({x}, {y}) z={z}");
            if expected {
                flat.update(x, y, z);
                hier.update(x, y, z);
            }
        }

        for y in 0..height {
            for x in 0..width {
                assert_eq!(hier.node_depth(0, x, y), flat.depth_at(x, y));
            }
        }
    }
}

#[test]
fn coarse_rejection_is_conservative() {
    let (width, height) = (48, 40);
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let (flat, hier) = buffers(width, height);
    for y in 0..height {
        for x in 0..width {
            let z = rng.gen_range(0.0f32..1.0);
            flat.update(x, y, z);
            hier.update(x, y, z);
        }
    }

    let mut rejected = 0;
    for round in 0..4_000 {
        let x = rng.gen_range(0..width);
        let y = rng.gen_range(0..height);
        // Drift nearer over time so large regions eventually close.
        let z = rng.gen_range(0.0f32..1.0) * (1.0 - round as f32 / 8_000.0);
        if flat.visible(x, y, z) {
            flat.update(x, y, z);
            hier.update(x, y, z);
        }

        let rect = random_rect(&mut rng, width, height);
        let bound = rng.gen_range(0.0f32..1.0);
        if !hier.visible_rect(&rect, bound) {
            rejected += 1;
            for py in rect.min_y..rect.max_y {
                for px in rect.min_x..rect.max_x {
                    assert!(
                        !flat.visible(px, py, bound),
                        "rect {rect:?} rejected at z={bound} but ({px}, {py}) passes"
                    );
                }
            }
        }
    }
    assert!(rejected > 0, "sequence never exercised a rejection");
}

#[test]
fn aggregates_hold_the_farthest_child() {
    let (width, height) = (13, 11);
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let (_, hier) = buffers(width, height);

    for _ in 0..5_000 {
        let x = rng.gen_range(0..width);
        let y = rng.gen_range(0..height);
        let z = rng.gen_range(0.0f32..1.0);
        if hier.visible(x, y, z) {
            hier.update(x, y, z);
        }
    }

    for level in 1..hier.level_count() {
        let (w, h) = hier.level_size(level);
        let (cw, ch) = hier.level_size(level - 1);
        for y in 0..h {
            for x in 0..w {
                let expected = (0..2)
                    .flat_map(|dy| (0..2).map(move |dx| (2 * x + dx, 2 * y + dy)))
                    .filter(|&(cx, cy)| cx < cw && cy < ch)
                    .map(|(cx, cy)| hier.node_depth(level - 1, cx, cy))
                    .fold(f32::MIN, f32::max);
                assert_eq!(hier.node_depth(level, x, y), expected, "level {level} ({x}, {y})");
            }
        }
    }
}
