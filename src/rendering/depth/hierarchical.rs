/// Hierarchical depth buffer backed by a quad tree over the screen.
///
/// Key design principles:
/// 1. Leaves are pixels: level 0 holds exactly one node per pixel
/// 2. Each coarser level groups 2×2 nodes of the level below, rounding up on
///    odd sizes, until a single root covers the screen
/// 3. Internal nodes cache the FARTHEST depth written in their region, so a
///    node nearer than a primitive's nearest depth occludes that primitive
/// 4. Flat arena: nodes live in one `Vec`, level after level, row-major
///    within a level; links are indices and pixel lookup is direct indexing
///
/// Concurrent updates are an accepted race: two workers walking up through
/// the same ancestor can store their recomputed maxima in either order, so
/// an aggregate may end up nearer than one of its leaves until a later
/// update or `clear` rewrites it. The coarse test is only exact when updates
/// to overlapping regions do not interleave.
use super::{depth_in_range, AtomicDepth, DepthTest, ScreenRect, UNOCCLUDED_DEPTH};
use crate::parallel::{parallel_for, TaskExecutor};
use std::sync::Arc;

type NodeId = u32;

/// Child slots in (x, y) offset order: top-left, top-right, bottom-left, bottom-right.
const CHILD_OFFSETS: [(usize, usize); 4] = [(0, 0), (1, 0), (0, 1), (1, 1)];

struct QuadNode {
    rect: ScreenRect,
    children: [Option<NodeId>; 4],
    parent: Option<NodeId>,
    depth: AtomicDepth,
}

impl QuadNode {
    #[inline(always)]
    fn is_leaf(&self) -> bool {
        self.children[0].is_none()
    }
}

/// One level of the tree: a `width × height` grid of nodes starting at `first`.
#[derive(Copy, Clone, Debug)]
struct Level {
    first: usize,
    width: usize,
    height: usize,
}

pub struct HierarchicalDepthBuffer {
    width: usize,
    height: usize,
    nodes: Vec<QuadNode>,
    levels: Vec<Level>,
    root: NodeId,
    executor: Arc<TaskExecutor>,
}

impl HierarchicalDepthBuffer {
    /// Build the full tree for a `width × height` screen.
    pub fn new(width: usize, height: usize, executor: Arc<TaskExecutor>) -> Self {
        let (nodes, levels) = build_tree(width, height);
        let root = (nodes.len() - 1) as NodeId;
        tracing::debug!(
            width,
            height,
            levels = levels.len(),
            nodes = nodes.len(),
            "quad tree depth buffer built"
        );
        Self {
            width,
            height,
            nodes,
            levels,
            root,
            executor,
        }
    }

    /// Number of levels including the leaf level.
    #[inline]
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Aggregated depth of the root node.
    #[inline]
    pub fn root_depth(&self) -> f32 {
        self.nodes[self.root as usize].depth.load()
    }

    /// Grid size of `level` (0 = leaves).
    pub fn level_size(&self, level: usize) -> (usize, usize) {
        let l = self.levels[level];
        (l.width, l.height)
    }

    /// Aggregated depth of the node at `(x, y)` on `level`.
    pub fn node_depth(&self, level: usize, x: usize, y: usize) -> f32 {
        let l = self.levels[level];
        self.nodes[l.first + y * l.width + x].depth.load()
    }

    #[inline(always)]
    fn leaf_index(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.width && y < self.height);
        y * self.width + x
    }

    #[inline]
    fn max_of_children(&self, node: &QuadNode) -> f32 {
        node.children
            .iter()
            .flatten()
            .map(|&child| self.nodes[child as usize].depth.load())
            .fold(f32::NEG_INFINITY, f32::max)
    }
}

fn build_tree(width: usize, height: usize) -> (Vec<QuadNode>, Vec<Level>) {
    let mut nodes: Vec<QuadNode> = Vec::with_capacity(width * height * 4 / 3 + 4);
    let mut levels = Vec::new();

    let leaves = Level {
        first: 0,
        width,
        height,
    };
    for y in 0..height {
        for x in 0..width {
            nodes.push(QuadNode {
                rect: ScreenRect::new(x, y, x + 1, y + 1),
                children: [None; 4],
                parent: None,
                depth: AtomicDepth::default(),
            });
        }
    }
    levels.push(leaves);

    let mut below = leaves;
    let mut span = 1usize;
    while below.width > 1 || below.height > 1 {
        span *= 2;
        let level = Level {
            first: nodes.len(),
            width: below.width.div_ceil(2),
            height: below.height.div_ceil(2),
        };

        for y in 0..level.height {
            for x in 0..level.width {
                let id = nodes.len() as NodeId;
                let mut children = [None; 4];
                for (slot, (dx, dy)) in CHILD_OFFSETS.into_iter().enumerate() {
                    let (cx, cy) = (x * 2 + dx, y * 2 + dy);
                    if cx < below.width && cy < below.height {
                        let child = below.first + cy * below.width + cx;
                        nodes[child].parent = Some(id);
                        children[slot] = Some(child as NodeId);
                    }
                }
                nodes.push(QuadNode {
                    rect: ScreenRect::new(
                        x * span,
                        y * span,
                        ((x + 1) * span).min(width),
                        ((y + 1) * span).min(height),
                    ),
                    children,
                    parent: None,
                    depth: AtomicDepth::default(),
                });
            }
        }

        levels.push(level);
        below = level;
    }

    (nodes, levels)
}

impl DepthTest for HierarchicalDepthBuffer {
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
        depth_in_range(z) && z < self.nodes[self.leaf_index(x, y)].depth.load()
    }

    fn visible_rect(&self, rect: &ScreenRect, z_lower_bound: f32) -> bool {
        let mut node = &self.nodes[self.root as usize];
        if !node.rect.contains(rect) {
            return true;
        }

        while !node.is_leaf() {
            if node.depth.load() < z_lower_bound {
                // Everything under this node is nearer than the whole rect.
                return false;
            }
            let next = node
                .children
                .iter()
                .flatten()
                .map(|&child| &self.nodes[child as usize])
                .find(|child| child.rect.contains(rect));
            match next {
                Some(child) => node = child,
                // Straddles a split: per-pixel testing has to decide.
                None => return true,
            }
        }
        true
    }

    fn update(&self, x: usize, y: usize, z: f32) {
        let leaf = &self.nodes[self.leaf_index(x, y)];
        leaf.depth.store(z);

        let mut child_depth = z;
        let mut parent = leaf.parent;
        while let Some(id) = parent {
            let node = &self.nodes[id as usize];
            let current = node.depth.load();
            let next = if child_depth > current {
                child_depth
            } else {
                // A decrease needs the siblings to be looked at again.
                self.max_of_children(node)
            };
            if next == current {
                break;
            }
            node.depth.store(next);
            child_depth = next;
            parent = node.parent;
        }
    }

    fn clear(&self) {
        for level in &self.levels {
            let level = *level;
            parallel_for(&self.executor, 0..level.height, None, |_, row| {
                let start = level.first + row * level.width;
                for node in &self.nodes[start..start + level.width] {
                    node.depth.store(UNOCCLUDED_DEPTH);
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(width: usize, height: usize) -> HierarchicalDepthBuffer {
        HierarchicalDepthBuffer::new(width, height, Arc::new(TaskExecutor::new(2).unwrap()))
    }

    fn assert_aggregates_hold(depth: &HierarchicalDepthBuffer) {
        for node in depth.nodes.iter().filter(|n| !n.is_leaf()) {
            assert_eq!(
                node.depth.load(),
                depth.max_of_children(node),
                "aggregate mismatch for {:?}",
                node.rect
            );
        }
    }

    #[test]
    fn builds_levels_for_non_power_of_two() {
        let depth = buffer(5, 3);
        assert_eq!(depth.level_count(), 4);
        assert_eq!(depth.level_size(0), (5, 3));
        assert_eq!(depth.level_size(1), (3, 2));
        assert_eq!(depth.level_size(2), (2, 1));
        assert_eq!(depth.level_size(3), (1, 1));

        let root = &depth.nodes[depth.root as usize];
        assert_eq!(root.rect, ScreenRect::new(0, 0, 5, 3));
        assert!(root.parent.is_none());

        // Edge node on level 1 only has the children that exist.
        let edge = &depth.nodes[depth.levels[1].first + 2];
        assert_eq!(edge.rect, ScreenRect::new(4, 0, 5, 2));
        assert_eq!(edge.children.iter().flatten().count(), 2);
    }

    #[test]
    fn every_non_root_node_has_a_parent_covering_it() {
        let depth = buffer(6, 7);
        for (index, node) in depth.nodes.iter().enumerate() {
            if index == depth.root as usize {
                continue;
            }
            let parent = &depth.nodes[node.parent.expect("parent link") as usize];
            assert!(parent.rect.contains(&node.rect));
            assert!(parent.children.contains(&Some(index as NodeId)));
        }
    }

    #[test]
    fn single_pixel_tree_is_just_a_leaf() {
        let depth = buffer(1, 1);
        assert_eq!(depth.level_count(), 1);
        depth.update(0, 0, 0.1);
        assert!(!depth.visible(0, 0, 0.2));
        assert!(depth.visible_rect(&ScreenRect::new(0, 0, 1, 1), 0.9));
    }

    #[test]
    fn two_by_two_root_stays_at_sentinel() {
        let depth = buffer(2, 2);
        depth.clear();
        depth.update(0, 0, 0.4);

        assert_eq!(depth.node_depth(0, 0, 0), 0.4);
        assert_eq!(depth.node_depth(0, 1, 0), UNOCCLUDED_DEPTH);
        assert_eq!(depth.root_depth(), UNOCCLUDED_DEPTH);
        assert!(depth.visible_rect(&ScreenRect::new(0, 0, 2, 2), 0.9));
    }

    #[test]
    fn fully_covered_region_rejects_farther_rects() {
        let depth = buffer(4, 4);
        depth.clear();
        for y in 0..4 {
            for x in 0..4 {
                depth.update(x, y, 0.2);
            }
        }
        assert_eq!(depth.root_depth(), 0.2);

        let full = ScreenRect::new(0, 0, 4, 4);
        assert!(!depth.visible_rect(&full, 0.5));
        assert!(depth.visible_rect(&full, 0.1));
        assert!(depth.visible_rect(&full, 0.2), "equal depth is not strictly behind");
    }

    #[test]
    fn quadrant_rejection_descends_into_child() {
        let depth = buffer(4, 4);
        depth.clear();
        for y in 0..2 {
            for x in 0..2 {
                depth.update(x, y, 0.3);
            }
        }
        // Root still open because other quadrants are untouched.
        assert_eq!(depth.root_depth(), UNOCCLUDED_DEPTH);
        assert!(!depth.visible_rect(&ScreenRect::new(0, 0, 2, 2), 0.6));
        assert!(depth.visible_rect(&ScreenRect::new(2, 2, 4, 4), 0.6));
        // Straddling two quadrants falls back to per-pixel testing.
        assert!(depth.visible_rect(&ScreenRect::new(1, 0, 3, 2), 0.6));
    }

    #[test]
    fn rect_outside_root_is_visible() {
        let depth = buffer(4, 4);
        for y in 0..4 {
            for x in 0..4 {
                depth.update(x, y, 0.0);
            }
        }
        assert!(depth.visible_rect(&ScreenRect::new(0, 0, 5, 4), 0.9));
    }

    #[test]
    fn decreasing_a_leaf_recomputes_ancestors() {
        let depth = buffer(2, 2);
        depth.clear();
        for (x, y) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            depth.update(x, y, 0.8);
        }
        assert_eq!(depth.root_depth(), 0.8);

        depth.update(0, 0, 0.1);
        assert_eq!(depth.root_depth(), 0.8, "siblings still at 0.8");
        for (x, y) in [(1, 0), (0, 1), (1, 1)] {
            depth.update(x, y, 0.1);
        }
        assert_eq!(depth.root_depth(), 0.1);
        assert_aggregates_hold(&depth);
    }

    #[test]
    fn aggregates_hold_after_scattered_updates() {
        let depth = buffer(13, 9);
        depth.clear();
        let mut seed = 7u32;
        for _ in 0..2_000 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let x = (seed >> 8) as usize % 13;
            let y = (seed >> 16) as usize % 9;
            let z = ((seed >> 4) % 1000) as f32 / 1000.0;
            if depth.visible(x, y, z) {
                depth.update(x, y, z);
            }
        }
        assert_aggregates_hold(&depth);
    }

    #[test]
    fn clear_resets_every_level() {
        let depth = buffer(9, 5);
        for y in 0..5 {
            for x in 0..9 {
                depth.update(x, y, 0.25);
            }
        }
        assert_eq!(depth.root_depth(), 0.25);

        depth.clear();
        assert!(depth
            .nodes
            .iter()
            .all(|node| node.depth.load() == UNOCCLUDED_DEPTH));
        assert!(depth.visible(8, 4, 0.999));
    }
}
