/// Depth surfaces shared by every rasterizer worker.
///
/// Cells are relaxed atomics: workers update them without locks, and a
/// `visible` followed by `update` on the same pixel from two threads can
/// interleave. The last writer wins; nothing tears.
pub mod flat;
pub mod hierarchical;

pub use flat::FlatDepthBuffer;
pub use hierarchical::HierarchicalDepthBuffer;

use crate::error::{RenderError, RenderResult};
use crate::parallel::TaskExecutor;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Depth stored in a cleared cell: farther than anything a fragment can carry.
pub const UNOCCLUDED_DEPTH: f32 = f32::MAX;

/// `f32` depth cell with relaxed atomic access.
#[repr(transparent)]
pub struct AtomicDepth(AtomicU32);

impl AtomicDepth {
    #[inline]
    pub fn new(depth: f32) -> Self {
        Self(AtomicU32::new(depth.to_bits()))
    }

    #[inline(always)]
    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline(always)]
    pub fn store(&self, depth: f32) {
        self.0.store(depth.to_bits(), Ordering::Relaxed);
    }
}

impl Default for AtomicDepth {
    fn default() -> Self {
        Self::new(UNOCCLUDED_DEPTH)
    }
}

/// Half-open pixel rectangle `[min_x, max_x) × [min_y, max_y)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ScreenRect {
    pub min_x: usize,
    pub min_y: usize,
    pub max_x: usize,
    pub max_y: usize,
}

impl ScreenRect {
    #[inline]
    pub const fn new(min_x: usize, min_y: usize, max_x: usize, max_y: usize) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Rectangle covering the inclusive pixel range `[x0, x1] × [y0, y1]`.
    #[inline]
    pub const fn from_inclusive(x0: usize, y0: usize, x1: usize, y1: usize) -> Self {
        Self::new(x0, y0, x1 + 1, y1 + 1)
    }

    #[inline]
    pub fn contains(&self, other: &ScreenRect) -> bool {
        self.min_x <= other.min_x
            && self.min_y <= other.min_y
            && self.max_x >= other.max_x
            && self.max_y >= other.max_y
    }

    #[inline]
    pub fn union(&self, other: &ScreenRect) -> ScreenRect {
        ScreenRect::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.max_x.saturating_sub(self.min_x)
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.max_y.saturating_sub(self.min_y)
    }
}

/// Per-pixel visibility contract implemented by both depth buffers.
pub trait DepthTest: Send + Sync {
    fn width(&self) -> usize;

    fn height(&self) -> usize;

    /// True iff `z` lies in `[0, 1]` and is strictly nearer than the stored depth.
    fn visible(&self, x: usize, y: usize, z: f32) -> bool;

    /// Conservative whole-rectangle test: may say "visible" for a fully
    /// occluded rectangle, never "occluded" for a rectangle that could still
    /// pass `visible` with some `z >= z_lower_bound`.
    fn visible_rect(&self, _rect: &ScreenRect, _z_lower_bound: f32) -> bool {
        true
    }

    /// Record `z` at `(x, y)`. Only valid right after `visible` passed with the same `z`.
    fn update(&self, x: usize, y: usize, z: f32);

    /// Reset the whole surface to "nothing drawn yet".
    fn clear(&self);
}

#[inline(always)]
pub(crate) fn depth_in_range(z: f32) -> bool {
    (0.0..=1.0).contains(&z)
}

/// Which depth surface a frame buffer uses; fixed at startup.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthBufferKind {
    #[default]
    Flat,
    Hierarchical,
}

impl DepthBufferKind {
    pub fn from_hierarchical(hierarchical: bool) -> Self {
        if hierarchical {
            Self::Hierarchical
        } else {
            Self::Flat
        }
    }
}

/// Closed set of depth surfaces.
pub enum DepthBuffer {
    Flat(FlatDepthBuffer),
    Hierarchical(HierarchicalDepthBuffer),
}

impl DepthBuffer {
    pub fn new(
        kind: DepthBufferKind,
        width: usize,
        height: usize,
        executor: Arc<TaskExecutor>,
    ) -> RenderResult<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidDimensions { width, height });
        }
        Ok(match kind {
            DepthBufferKind::Flat => Self::Flat(FlatDepthBuffer::new(width, height, executor)),
            DepthBufferKind::Hierarchical => {
                Self::Hierarchical(HierarchicalDepthBuffer::new(width, height, executor))
            }
        })
    }

    pub fn kind(&self) -> DepthBufferKind {
        match self {
            Self::Flat(_) => DepthBufferKind::Flat,
            Self::Hierarchical(_) => DepthBufferKind::Hierarchical,
        }
    }

    #[inline(always)]
    fn surface(&self) -> &dyn DepthTest {
        match self {
            Self::Flat(buffer) => buffer,
            Self::Hierarchical(buffer) => buffer,
        }
    }
}

impl DepthTest for DepthBuffer {
    #[inline]
    fn width(&self) -> usize {
        self.surface().width()
    }

    #[inline]
    fn height(&self) -> usize {
        self.surface().height()
    }

    #[inline]
    fn visible(&self, x: usize, y: usize, z: f32) -> bool {
        match self {
            Self::Flat(buffer) => buffer.visible(x, y, z),
            Self::Hierarchical(buffer) => buffer.visible(x, y, z),
        }
    }

    #[inline]
    fn visible_rect(&self, rect: &ScreenRect, z_lower_bound: f32) -> bool {
        match self {
            Self::Flat(buffer) => buffer.visible_rect(rect, z_lower_bound),
            Self::Hierarchical(buffer) => buffer.visible_rect(rect, z_lower_bound),
        }
    }

    #[inline]
    fn update(&self, x: usize, y: usize, z: f32) {
        match self {
            Self::Flat(buffer) => buffer.update(x, y, z),
            Self::Hierarchical(buffer) => buffer.update(x, y, z),
        }
    }

    fn clear(&self) {
        self.surface().clear();
    }
}
