//! Bounding volume hierarchy over a triangle mesh.
//!
//! The tree is a binary AABB hierarchy built by median-splitting triangle
//! centroids along the longest axis. It serves purely as a pruning
//! accelerator: the verdict of an overlap query is decided by the exact
//! boundary-inclusive triangle test in [`crate::intersect`].
//!
//! # Lifecycle
//!
//! A BVH follows a strict begin / insert-all / finalize sequence:
//!
//! ```
//! use grasp_check::{Bvh, MeshModel, Triangle};
//!
//! let mesh = MeshModel::from_triangles([Triangle::from_coords(
//!     [0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0],
//! )]).unwrap();
//!
//! let mut bvh = Bvh::new();
//! bvh.push_mesh(&mesh).unwrap();
//! bvh.finalize().unwrap();
//! assert!(bvh.is_finalized());
//! ```
//!
//! Querying before `finalize`, inserting after it, or finalizing twice all
//! fail with `InvalidState`. The tree owns a copy of its triangles, so it
//! cannot dangle if the source mesh is dropped.

use nalgebra::{Isometry3, Point3, Vector3};
use tracing::debug;

use crate::error::{GraspError, GraspResult};
use crate::intersect::triangles_overlap;
use crate::types::{MeshModel, Triangle};

/// Maximum triangles per leaf node.
const MAX_LEAF_TRIS: usize = 4;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Aabb {
    /// An inverted box that unions to any other box.
    fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Create an AABB from a triangle.
    pub fn from_triangle(tri: &Triangle) -> Self {
        let min = Point3::new(
            tri.v0.x.min(tri.v1.x).min(tri.v2.x),
            tri.v0.y.min(tri.v1.y).min(tri.v2.y),
            tri.v0.z.min(tri.v1.z).min(tri.v2.z),
        );
        let max = Point3::new(
            tri.v0.x.max(tri.v1.x).max(tri.v2.x),
            tri.v0.y.max(tri.v1.y).max(tri.v2.y),
            tri.v0.z.max(tri.v1.z).max(tri.v2.z),
        );
        Self { min, max }
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &Aabb) -> Self {
        Self {
            min: Point3::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            max: Point3::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        }
    }

    /// Check if two AABBs overlap (boundary-inclusive).
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    #[inline]
    pub fn center(&self) -> Point3<f64> {
        Point3::from((self.min.coords + self.max.coords) * 0.5)
    }

    #[inline]
    pub fn half_extents(&self) -> Vector3<f64> {
        (self.max - self.min) * 0.5
    }

    /// Conservative AABB of this box mapped through a rigid transform.
    ///
    /// The rotated box is re-wrapped axis-aligned via the |R| method, so the
    /// result may be larger than the rotated box but never smaller.
    pub fn transformed(&self, transform: &Isometry3<f64>) -> Self {
        let center = transform.transform_point(&self.center());
        let abs_rot = transform.rotation.to_rotation_matrix().matrix().abs();
        let half = abs_rot * self.half_extents();
        Self {
            min: center - half,
            max: center + half,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuildState {
    Building,
    Finalized,
}

#[derive(Debug, Clone)]
struct BvhNode {
    aabb: Aabb,
    /// Leaf when `count > 0`: triangles `order[start..start + count]`.
    start: u32,
    count: u32,
    left: u32,
    right: u32,
}

impl BvhNode {
    #[inline]
    fn is_leaf(&self) -> bool {
        self.count > 0
    }
}

/// A queryable spatial index over one mesh's triangles.
///
/// Owns a copy of the geometry it indexes; read-only after [`Bvh::finalize`].
#[derive(Debug, Clone)]
pub struct Bvh {
    triangles: Vec<Triangle>,
    order: Vec<u32>,
    nodes: Vec<BvhNode>,
    state: BuildState,
}

impl Default for Bvh {
    fn default() -> Self {
        Self::new()
    }
}

impl Bvh {
    /// Begin an empty hierarchy in the building state.
    pub fn new() -> Self {
        Self {
            triangles: Vec::new(),
            order: Vec::new(),
            nodes: Vec::new(),
            state: BuildState::Building,
        }
    }

    /// Run the whole begin / insert / finalize sequence over one mesh.
    pub fn from_mesh(mesh: &MeshModel) -> GraspResult<Self> {
        let mut bvh = Self::new();
        bvh.push_mesh(mesh)?;
        bvh.finalize()?;
        Ok(bvh)
    }

    /// Copy all of a mesh's triangles into the hierarchy.
    ///
    /// Fails with `InvalidState` once the hierarchy has been finalized.
    pub fn push_mesh(&mut self, mesh: &MeshModel) -> GraspResult<()> {
        if self.state == BuildState::Finalized {
            return Err(GraspError::InvalidState {
                details: "cannot add geometry to a finalized BVH".to_string(),
            });
        }
        self.triangles.extend(mesh.triangles());
        Ok(())
    }

    /// Build the tree and switch to the queryable state.
    ///
    /// Fails with `InvalidState` on a second call and with `EmptyMesh` if no
    /// triangles were inserted.
    pub fn finalize(&mut self) -> GraspResult<()> {
        if self.state == BuildState::Finalized {
            return Err(GraspError::InvalidState {
                details: "BVH is already finalized".to_string(),
            });
        }
        if self.triangles.is_empty() {
            return Err(GraspError::EmptyMesh {
                details: "BVH finalized without any triangles".to_string(),
            });
        }

        let tri_aabbs: Vec<Aabb> = self.triangles.iter().map(Aabb::from_triangle).collect();
        let centroids: Vec<Point3<f64>> = self.triangles.iter().map(|t| t.centroid()).collect();

        self.order = (0..self.triangles.len() as u32).collect();
        self.nodes = Vec::with_capacity(2 * self.triangles.len());

        let mut order = std::mem::take(&mut self.order);
        build_node(&mut self.nodes, &tri_aabbs, &centroids, &mut order, 0);
        self.order = order;

        self.state = BuildState::Finalized;
        debug!(
            triangles = self.triangles.len(),
            nodes = self.nodes.len(),
            "BVH finalized"
        );
        Ok(())
    }

    /// Whether the hierarchy is finalized and queryable.
    #[inline]
    pub fn is_finalized(&self) -> bool {
        self.state == BuildState::Finalized
    }

    /// Number of indexed triangles.
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Bounding box of all indexed triangles (after finalize).
    pub fn bounds(&self) -> Option<Aabb> {
        if self.is_finalized() {
            self.nodes.first().map(|n| n.aabb)
        } else {
            None
        }
    }

    fn ensure_finalized(&self) -> GraspResult<()> {
        if self.is_finalized() {
            Ok(())
        } else {
            Err(GraspError::InvalidState {
                details: "BVH queried before finalize".to_string(),
            })
        }
    }

    fn leaf_triangles(&self, node: &BvhNode) -> impl Iterator<Item = &Triangle> {
        self.order[node.start as usize..(node.start + node.count) as usize]
            .iter()
            .map(|&i| &self.triangles[i as usize])
    }

    /// Exact overlap test between two placed hierarchies.
    ///
    /// `self` is placed at `self_pose` and `other` at `other_pose`; both must
    /// be finalized. Returns as soon as any triangle pair overlaps.
    pub fn overlaps(
        &self,
        self_pose: &Isometry3<f64>,
        other: &Bvh,
        other_pose: &Isometry3<f64>,
    ) -> GraspResult<bool> {
        self.ensure_finalized()?;
        other.ensure_finalized()?;

        // Map other's frame into self's frame once; all node and triangle
        // tests then happen in self-local coordinates.
        let rel = self_pose.inv_mul(other_pose);

        let mut stack: Vec<(u32, u32)> = vec![(0, 0)];
        while let Some((ai, bi)) = stack.pop() {
            let a = &self.nodes[ai as usize];
            let b = &other.nodes[bi as usize];

            if !a.aabb.overlaps(&b.aabb.transformed(&rel)) {
                continue;
            }

            match (a.is_leaf(), b.is_leaf()) {
                (true, true) => {
                    for ta in self.leaf_triangles(a) {
                        for tb in other.leaf_triangles(b) {
                            if triangles_overlap(ta, &tb.transformed(&rel)) {
                                return Ok(true);
                            }
                        }
                    }
                }
                (true, false) => {
                    stack.push((ai, b.left));
                    stack.push((ai, b.right));
                }
                (false, true) => {
                    stack.push((a.left, bi));
                    stack.push((a.right, bi));
                }
                (false, false) => {
                    // Descend the node with the larger extent.
                    let ea = a.aabb.half_extents().norm_squared();
                    let eb = b.aabb.half_extents().norm_squared();
                    if ea >= eb {
                        stack.push((a.left, bi));
                        stack.push((a.right, bi));
                    } else {
                        stack.push((ai, b.left));
                        stack.push((ai, b.right));
                    }
                }
            }
        }

        Ok(false)
    }
}

/// Recursively build the subtree over `order`, which holds triangle indices
/// occupying `offset..offset + order.len()` of the global ordering.
fn build_node(
    nodes: &mut Vec<BvhNode>,
    tri_aabbs: &[Aabb],
    centroids: &[Point3<f64>],
    order: &mut [u32],
    offset: u32,
) -> u32 {
    let mut aabb = Aabb::empty();
    for &t in order.iter() {
        aabb = aabb.union(&tri_aabbs[t as usize]);
    }

    let node_idx = nodes.len() as u32;
    nodes.push(BvhNode {
        aabb,
        start: offset,
        count: order.len() as u32,
        left: 0,
        right: 0,
    });

    if order.len() <= MAX_LEAF_TRIS {
        return node_idx;
    }

    // Split at the median centroid along the longest centroid axis.
    let mut cmin = Vector3::repeat(f64::INFINITY);
    let mut cmax = Vector3::repeat(f64::NEG_INFINITY);
    for &t in order.iter() {
        let c = centroids[t as usize].coords;
        cmin = cmin.inf(&c);
        cmax = cmax.sup(&c);
    }
    let extent = cmax - cmin;
    let axis = extent.imax();
    if extent[axis] <= 0.0 {
        // All centroids coincide; keep as an oversized leaf.
        return node_idx;
    }

    let mid = order.len() / 2;
    order.select_nth_unstable_by(mid, |&a, &b| {
        centroids[a as usize].coords[axis]
            .partial_cmp(&centroids[b as usize].coords[axis])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let (lo, hi) = order.split_at_mut(mid);
    let left = build_node(nodes, tri_aabbs, centroids, lo, offset);
    let right = build_node(nodes, tri_aabbs, centroids, hi, offset + mid as u32);

    let node = &mut nodes[node_idx as usize];
    node.count = 0;
    node.left = left;
    node.right = right;
    node_idx
}
