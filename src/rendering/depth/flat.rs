use super::{depth_in_range, AtomicDepth, DepthTest, UNOCCLUDED_DEPTH};
use crate::parallel::{parallel_for, TaskExecutor};
use std::sync::Arc;

/// One depth value per pixel, row-major.
pub struct FlatDepthBuffer {
    width: usize,
    height: usize,
    cells: Vec<AtomicDepth>,
    executor: Arc<TaskExecutor>,
}

impl FlatDepthBuffer {
    pub fn new(width: usize, height: usize, executor: Arc<TaskExecutor>) -> Self {
        let cells = (0..width * height).map(|_| AtomicDepth::default()).collect();
        Self {
            width,
            height,
            cells,
            executor,
        }
    }

    #[inline(always)]
    fn index(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.width && y < self.height);
        y * self.width + x
    }

    /// Stored depth at `(x, y)`.
    #[inline]
    pub fn depth_at(&self, x: usize, y: usize) -> f32 {
        self.cells[self.index(x, y)].load()
    }
}

impl DepthTest for FlatDepthBuffer {
    #[inline]
    fn width(&self) -> usize {
        self.width
    }

    #[inline]
    fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn visible(&self, x: usize, y: usize, z: f32) -> bool {
        depth_in_range(z) && z < self.depth_at(x, y)
    }

    #[inline]
    fn update(&self, x: usize, y: usize, z: f32) {
        self.cells[self.index(x, y)].store(z);
    }

    fn clear(&self) {
        let width = self.width;
        parallel_for(&self.executor, 0..self.height, None, |_, row| {
            for cell in &self.cells[row * width..(row + 1) * width] {
                cell.store(UNOCCLUDED_DEPTH);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::depth::ScreenRect;

    fn buffer(width: usize, height: usize) -> FlatDepthBuffer {
        FlatDepthBuffer::new(width, height, Arc::new(TaskExecutor::new(2).unwrap()))
    }

    #[test]
    fn two_by_two_scenario() {
        let depth = buffer(2, 2);
        depth.clear();
        depth.update(0, 0, 0.5);

        assert!(depth.visible(0, 0, 0.3));
        assert!(!depth.visible(0, 0, 0.6));
        assert!(depth.visible(1, 1, 0.9), "untouched cell stays open");
    }

    #[test]
    fn out_of_range_depth_is_never_visible() {
        let depth = buffer(4, 4);
        depth.clear();
        assert!(!depth.visible(1, 1, -0.01));
        assert!(!depth.visible(1, 1, 1.01));
        assert!(!depth.visible(1, 1, f32::NAN));
        assert!(depth.visible(1, 1, 0.0));
        assert!(depth.visible(1, 1, 1.0));
    }

    #[test]
    fn clear_reopens_every_cell() {
        let depth = buffer(7, 5);
        for y in 0..5 {
            for x in 0..7 {
                depth.update(x, y, 0.0);
            }
        }
        assert!(!depth.visible(6, 4, 0.5));

        depth.clear();
        for y in 0..5 {
            for x in 0..7 {
                assert_eq!(depth.depth_at(x, y), UNOCCLUDED_DEPTH);
                assert!(depth.visible(x, y, 0.999));
            }
        }
    }

    #[test]
    fn rect_test_is_always_conservative() {
        let depth = buffer(4, 4);
        for y in 0..4 {
            for x in 0..4 {
                depth.update(x, y, 0.0);
            }
        }
        assert!(depth.visible_rect(&ScreenRect::new(0, 0, 4, 4), 1.0));
    }
}
