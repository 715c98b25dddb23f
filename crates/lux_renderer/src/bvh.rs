//! Bounding Volume Hierarchy (BVH) acceleration structure.
//!
//! Nodes live in a flat arena and refer to their children by index. Leaves
//! own a contiguous range of primitive ids, so the tree never holds the
//! primitives themselves; queries are given the primitive slice the tree
//! was built over.

use crate::intersector::{Intersection, Intersector, Visitor};
use crate::primitive::{Primitive, PrimitiveId};
use lux_math::{Aabb, Interval, Ray, Vec3};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;

/// Maximum primitives per leaf node before splitting.
const LEAF_MAX_SIZE: usize = 4;

/// Nodes at this depth become leaves regardless of size.
const MAX_DEPTH: u32 = 64;

/// Traversal pushes at most one extra entry per level.
const STACK_SIZE: usize = MAX_DEPTH as usize + 2;

/// Bucket count for the binned SAH sweep.
const SAH_BINS: usize = 12;

/// Relative cost of visiting an interior node versus testing a primitive.
const TRAVERSAL_COST: f32 = 0.125;

/// How primitives are partitioned while building.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMethod {
    /// Split at the median centroid along the longest axis.
    Median,
    /// Binned surface area heuristic.
    #[default]
    Sah,
}

/// Errors raised while building or checking a BVH.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BuildError {
    #[error("primitive {primitive} has non-finite or empty bounds")]
    DegenerateBounds { primitive: PrimitiveId },

    #[error("BVH invariant violated: {0}")]
    Invariant(String),
}

/// A malformed tree found during traversal.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TraceError {
    #[error("BVH leaf references missing primitive {0}")]
    DanglingPrimitive(PrimitiveId),

    #[error("BVH references missing node {0}")]
    DanglingNode(u32),

    #[error("BVH leaf range {first}..{end} is outside the primitive order")]
    DanglingRange { first: u32, end: u32 },

    #[error("BVH traversal stack overflow")]
    StackOverflow,
}

/// Node payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind {
    /// Range `first..first + count` into the primitive order.
    Leaf { first: u32, count: u32 },
    /// Child node indices and the axis they were split on.
    Interior { left: u32, right: u32, axis: u8 },
}

/// A node in the BVH arena.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BvhNode {
    pub bbox: Aabb,
    /// Distance from the root; the root has depth 0
    pub depth: u32,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, Copy)]
struct BuildItem {
    id: PrimitiveId,
    bounds: Aabb,
    centroid: Vec3,
}

/// Summary statistics, logged after a build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BvhStats {
    pub nodes: usize,
    pub leaves: usize,
    pub max_depth: u32,
    pub max_leaf_size: usize,
}

/// A BVH over a fixed list of primitive bounds.
#[derive(Debug, Clone)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    order: Vec<PrimitiveId>,
    primitive_count: usize,
}

impl Bvh {
    /// Build a BVH from world-space bounds, indexed by primitive id.
    ///
    /// An empty list gives a single empty leaf.
    pub fn build(bounds: &[Aabb], method: SplitMethod) -> Result<Self, BuildError> {
        let start = Instant::now();
        let mut items = Vec::with_capacity(bounds.len());
        for (index, bbox) in bounds.iter().enumerate() {
            let id = PrimitiveId::new(index);
            if !bbox.is_finite() || bbox.is_empty() {
                return Err(BuildError::DegenerateBounds { primitive: id });
            }
            items.push(BuildItem {
                id,
                bounds: *bbox,
                centroid: bbox.centroid(),
            });
        }

        let mut bvh = Self {
            nodes: Vec::with_capacity(2 * items.len().max(1)),
            order: Vec::with_capacity(items.len()),
            primitive_count: items.len(),
        };

        if items.is_empty() {
            bvh.nodes.push(BvhNode {
                bbox: Aabb::EMPTY,
                depth: 0,
                kind: NodeKind::Leaf { first: 0, count: 0 },
            });
        } else {
            bvh.build_node(&mut items, 0, method);
        }

        let stats = bvh.stats();
        log::info!(
            "Built BVH ({:?}): {} primitives, {} nodes, {} leaves, depth {} in {:.2?}",
            method,
            bvh.primitive_count,
            stats.nodes,
            stats.leaves,
            stats.max_depth,
            start.elapsed()
        );

        Ok(bvh)
    }

    /// Recursive construction. Returns the index of the new node.
    fn build_node(&mut self, items: &mut [BuildItem], depth: u32, method: SplitMethod) -> u32 {
        let bbox = items
            .iter()
            .fold(Aabb::EMPTY, |acc, item| Aabb::surrounding(&acc, &item.bounds));

        let index = self.nodes.len() as u32;
        self.nodes.push(BvhNode {
            bbox,
            depth,
            kind: NodeKind::Leaf { first: 0, count: 0 },
        });

        // Create leaf for small sets
        if items.len() <= LEAF_MAX_SIZE || depth + 1 >= MAX_DEPTH {
            self.make_leaf(index, items);
            return index;
        }

        // Compute centroid bounds to choose split axis
        let centroid_bounds = items
            .iter()
            .fold(Aabb::EMPTY, |acc, item| acc.include_point(item.centroid));
        let axis = centroid_bounds.longest_axis();

        let split = match method {
            SplitMethod::Sah => sah_partition(items, &bbox, &centroid_bounds, axis),
            SplitMethod::Median => None,
        };
        let mid = split
            .filter(|&mid| mid > 0 && mid < items.len())
            .unwrap_or_else(|| median_partition(items, axis));

        let (left_items, right_items) = items.split_at_mut(mid);
        let left = self.build_node(left_items, depth + 1, method);
        let right = self.build_node(right_items, depth + 1, method);

        self.nodes[index as usize].kind = NodeKind::Interior {
            left,
            right,
            axis: axis as u8,
        };
        index
    }

    fn make_leaf(&mut self, index: u32, items: &[BuildItem]) {
        let first = self.order.len() as u32;
        self.order.extend(items.iter().map(|item| item.id));
        self.nodes[index as usize].kind = NodeKind::Leaf {
            first,
            count: items.len() as u32,
        };
    }

    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    pub fn root(&self) -> Option<&BvhNode> {
        self.nodes.first()
    }

    /// Bounds of everything in the tree.
    pub fn bounds(&self) -> Aabb {
        self.root().map_or(Aabb::EMPTY, |root| root.bbox)
    }

    pub fn primitive_count(&self) -> usize {
        self.primitive_count
    }

    /// Primitive ids referenced by a leaf.
    pub fn leaf_primitives(&self, node: &BvhNode) -> &[PrimitiveId] {
        match node.kind {
            NodeKind::Leaf { first, count } => self
                .order
                .get(first as usize..(first + count) as usize)
                .unwrap_or(&[]),
            NodeKind::Interior { .. } => &[],
        }
    }

    pub fn stats(&self) -> BvhStats {
        let mut stats = BvhStats {
            nodes: self.nodes.len(),
            ..BvhStats::default()
        };
        for node in &self.nodes {
            stats.max_depth = stats.max_depth.max(node.depth);
            if let NodeKind::Leaf { count, .. } = node.kind {
                stats.leaves += 1;
                stats.max_leaf_size = stats.max_leaf_size.max(count as usize);
            }
        }
        stats
    }

    /// Feed every primitive whose ancestors' boxes the ray crosses to `visitor`.
    ///
    /// The visitor's interval is re-read at every node, so a closest-hit
    /// query prunes more of the tree as its `t_max` shrinks. Children are
    /// visited near-first along the split axis.
    pub fn all_candidates<'s, V: Visitor<'s>>(
        &self,
        primitives: &'s [Primitive],
        visitor: &mut V,
    ) -> Result<(), TraceError> {
        if self.nodes.is_empty() {
            return Ok(());
        }

        let mut stack = [0u32; STACK_SIZE];
        let mut sp = 1;

        while sp > 0 {
            sp -= 1;
            let index = stack[sp];
            let node = self
                .nodes
                .get(index as usize)
                .ok_or(TraceError::DanglingNode(index))?;

            if !node.bbox.hit(visitor.ray(), visitor.interval()) {
                continue;
            }

            match node.kind {
                NodeKind::Leaf { first, count } => {
                    let end = first + count;
                    let ids = self
                        .order
                        .get(first as usize..end as usize)
                        .ok_or(TraceError::DanglingRange { first, end })?;
                    for &id in ids {
                        let primitive = primitives
                            .get(id.index())
                            .ok_or(TraceError::DanglingPrimitive(id))?;
                        visitor.visit(id, primitive);
                        if visitor.is_done() {
                            return Ok(());
                        }
                    }
                }
                NodeKind::Interior { left, right, axis } => {
                    if sp + 2 > STACK_SIZE {
                        return Err(TraceError::StackOverflow);
                    }
                    let (near, far) = if visitor.ray().direction[axis as usize] < 0.0 {
                        (right, left)
                    } else {
                        (left, right)
                    };
                    stack[sp] = far;
                    stack[sp + 1] = near;
                    sp += 2;
                }
            }
        }

        Ok(())
    }

    /// Closest hit within `ray_t`.
    pub fn closest_hit<'s>(
        &self,
        primitives: &'s [Primitive],
        ray: Ray,
        ray_t: Interval,
    ) -> Result<Option<Intersection<'s>>, TraceError> {
        let mut query = Intersector::new(ray, ray_t);
        self.all_candidates(primitives, &mut query)?;
        Ok(query.compute_intersection())
    }

    /// True if anything other than `ignore` is hit within `ray_t`.
    pub fn any_hit(
        &self,
        primitives: &[Primitive],
        ray: Ray,
        ray_t: Interval,
        ignore: Option<PrimitiveId>,
    ) -> Result<bool, TraceError> {
        let mut query = Intersector::any_hit(ray, ray_t);
        if let Some(id) = ignore {
            query = query.ignoring(id);
        }
        self.all_candidates(primitives, &mut query)?;
        Ok(query.found())
    }

    /// Check the structural invariants against the bounds the tree was built from.
    ///
    /// Every node is reachable exactly once from the root, child depths are
    /// one more than their parent's, each box contains its children's boxes
    /// and its primitives' bounds, and every primitive appears in exactly
    /// one leaf.
    pub fn validate(&self, bounds: &[Aabb]) -> Result<(), BuildError> {
        let fail = |msg: String| -> Result<(), BuildError> { Err(BuildError::Invariant(msg)) };

        if bounds.len() != self.primitive_count {
            return fail(format!(
                "built over {} primitives, checked against {}",
                self.primitive_count,
                bounds.len()
            ));
        }
        if self.nodes.is_empty() {
            return fail("tree has no root".to_string());
        }

        let mut reached = vec![false; self.nodes.len()];
        let mut references = vec![0u32; self.primitive_count];
        let mut stack: Vec<(u32, u32, Option<Aabb>)> = vec![(0, 0, None)];

        while let Some((index, depth, parent_box)) = stack.pop() {
            let Some(node) = self.nodes.get(index as usize) else {
                return fail(format!("node {index} is out of range"));
            };
            if std::mem::replace(&mut reached[index as usize], true) {
                return fail(format!("node {index} is reachable twice"));
            }
            if node.depth != depth {
                return fail(format!(
                    "node {index} has depth {}, expected {depth}",
                    node.depth
                ));
            }
            if let Some(parent) = parent_box {
                if !parent.contains_box(&node.bbox) {
                    return fail(format!("node {index} escapes its parent's box"));
                }
            }

            match node.kind {
                NodeKind::Leaf { first, count } => {
                    let Some(ids) = self.order.get(first as usize..(first + count) as usize) else {
                        return fail(format!("leaf {index} range is out of bounds"));
                    };
                    for id in ids {
                        let Some(prim_bounds) = bounds.get(id.index()) else {
                            return fail(format!("leaf {index} references missing primitive {id}"));
                        };
                        if !node.bbox.contains_box(prim_bounds) {
                            return fail(format!("leaf {index} does not contain primitive {id}"));
                        }
                        references[id.index()] += 1;
                    }
                }
                NodeKind::Interior { left, right, .. } => {
                    stack.push((left, depth + 1, Some(node.bbox)));
                    stack.push((right, depth + 1, Some(node.bbox)));
                }
            }
        }

        if let Some(orphan) = reached.iter().position(|r| !r) {
            return fail(format!("node {orphan} is unreachable"));
        }
        if let Some((index, count)) = references.iter().enumerate().find(|(_, c)| **c != 1) {
            return fail(format!("primitive #{index} is referenced {count} times"));
        }

        Ok(())
    }
}

/// Split at the median centroid. Returns the split index.
fn median_partition(items: &mut [BuildItem], axis: usize) -> usize {
    let mid = items.len() / 2;
    items.select_nth_unstable_by(mid, |a, b| a.centroid[axis].total_cmp(&b.centroid[axis]));
    mid
}

/// Binned SAH split along `axis`. Returns the split index, or `None` if the
/// centroids cannot be separated.
fn sah_partition(
    items: &mut [BuildItem],
    bbox: &Aabb,
    centroid_bounds: &Aabb,
    axis: usize,
) -> Option<usize> {
    let extent = centroid_bounds.axis_interval(axis);
    if extent.size() <= 0.0 {
        return None;
    }

    let bin_of = |item: &BuildItem| -> usize {
        let offset = (item.centroid[axis] - extent.min) / extent.size();
        ((offset * SAH_BINS as f32) as usize).min(SAH_BINS - 1)
    };

    let mut bin_bounds = [Aabb::EMPTY; SAH_BINS];
    let mut bin_counts = [0usize; SAH_BINS];
    for item in items.iter() {
        let b = bin_of(item);
        bin_bounds[b] = Aabb::surrounding(&bin_bounds[b], &item.bounds);
        bin_counts[b] += 1;
    }

    let parent_area = bbox.surface_area().max(f32::MIN_POSITIVE);
    let mut best: Option<(usize, f32)> = None;
    for split in 1..SAH_BINS {
        let (left_box, left_count) = merge_bins(&bin_bounds[..split], &bin_counts[..split]);
        let (right_box, right_count) = merge_bins(&bin_bounds[split..], &bin_counts[split..]);
        if left_count == 0 || right_count == 0 {
            continue;
        }
        let cost = TRAVERSAL_COST
            + (left_count as f32 * left_box.surface_area()
                + right_count as f32 * right_box.surface_area())
                / parent_area;
        if best.map_or(true, |(_, best_cost)| cost < best_cost) {
            best = Some((split, cost));
        }
    }

    let (split, _) = best?;

    // In-place partition by bin.
    let mut mid = 0;
    for i in 0..items.len() {
        if bin_of(&items[i]) < split {
            items.swap(i, mid);
            mid += 1;
        }
    }
    Some(mid)
}

fn merge_bins(bounds: &[Aabb], counts: &[usize]) -> (Aabb, usize) {
    bounds
        .iter()
        .zip(counts)
        .fold((Aabb::EMPTY, 0), |(bbox, n), (b, &c)| {
            (Aabb::surrounding(&bbox, b), n + c)
        })
}
