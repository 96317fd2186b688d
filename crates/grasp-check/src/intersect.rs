//! Exact triangle-triangle overlap testing.
//!
//! This is the narrow-phase leaf test under the BVH descent. The test is
//! boundary-inclusive: two triangles that merely touch at a vertex or along
//! an edge count as overlapping. There is no tolerance margin; a small
//! fixed epsilon is used only to classify degeneracy and coplanarity,
//! never to inflate or shrink the shapes.

use nalgebra::Vector3;

use crate::types::Triangle;

/// Squared-length threshold below which a cross product is treated as zero.
const DEGENERACY_EPS_SQ: f64 = 1e-24;

/// Test whether two triangles share any point in 3-space.
///
/// Separating-axis test over the two face normals, the nine edge-edge cross
/// products, and (for coplanar pairs) the in-plane edge perpendiculars.
/// Degenerate (zero-area) triangles never overlap.
pub fn triangles_overlap(t1: &Triangle, t2: &Triangle) -> bool {
    let n1 = t1.normal_unnormalized();
    let n2 = t2.normal_unnormalized();

    // Degenerate triangles don't intersect meaningfully.
    if n1.norm_squared() < DEGENERACY_EPS_SQ || n2.norm_squared() < DEGENERACY_EPS_SQ {
        return false;
    }

    // The face normals are always candidate separating axes. Testing them
    // first also rejects parallel triangles lying in distinct planes before
    // the coplanar branch is entered.
    if separated_by_axis(&n1, t1, t2) || separated_by_axis(&n2, t1, t2) {
        return false;
    }

    let edges1 = [t1.v1 - t1.v0, t1.v2 - t1.v1, t1.v0 - t1.v2];
    let edges2 = [t2.v1 - t2.v0, t2.v2 - t2.v1, t2.v0 - t2.v2];

    let cross_normals = n1.cross(&n2);
    let is_coplanar =
        cross_normals.norm_squared() < DEGENERACY_EPS_SQ * n1.norm_squared() * n2.norm_squared();

    if is_coplanar {
        // In-plane 2D SAT: the edge perpendiculars are the only remaining
        // candidate axes.
        for edge in edges1.iter().chain(edges2.iter()) {
            let axis = n1.cross(edge);
            if axis.norm_squared() > DEGENERACY_EPS_SQ && separated_by_axis(&axis, t1, t2) {
                return false;
            }
        }
        return true;
    }

    // Non-coplanar case: the nine edge-edge cross products.
    for e1 in &edges1 {
        for e2 in &edges2 {
            let axis = e1.cross(e2);
            if axis.norm_squared() > DEGENERACY_EPS_SQ && separated_by_axis(&axis, t1, t2) {
                return false;
            }
        }
    }

    // No separating axis found.
    true
}

/// Check if two triangles are strictly separated along a given axis.
///
/// Strict comparison keeps the overall test boundary-inclusive: projections
/// that merely touch do not separate.
fn separated_by_axis(axis: &Vector3<f64>, t1: &Triangle, t2: &Triangle) -> bool {
    let p1_0 = axis.dot(&t1.v0.coords);
    let p1_1 = axis.dot(&t1.v1.coords);
    let p1_2 = axis.dot(&t1.v2.coords);
    let min1 = p1_0.min(p1_1).min(p1_2);
    let max1 = p1_0.max(p1_1).max(p1_2);

    let p2_0 = axis.dot(&t2.v0.coords);
    let p2_1 = axis.dot(&t2.v1.coords);
    let p2_2 = axis.dot(&t2.v2.coords);
    let min2 = p2_0.min(p2_1).min(p2_2);
    let max2 = p2_0.max(p2_1).max(p2_2);

    max1 < min2 || max2 < min1
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn xy_triangle(x: f64, y: f64, size: f64) -> Triangle {
        Triangle::new(
            Point3::new(x, y, 0.0),
            Point3::new(x + size, y, 0.0),
            Point3::new(x + size / 2.0, y + size, 0.0),
        )
    }

    #[test]
    fn test_far_apart() {
        let t1 = xy_triangle(0.0, 0.0, 1.0);
        let t2 = xy_triangle(10.0, 10.0, 1.0);
        assert!(!triangles_overlap(&t1, &t2));
    }

    #[test]
    fn test_coplanar_disjoint() {
        let t1 = xy_triangle(0.0, 0.0, 1.0);
        let t2 = xy_triangle(2.0, 0.0, 1.0);
        assert!(!triangles_overlap(&t1, &t2));
    }

    #[test]
    fn test_coplanar_overlapping() {
        let t1 = xy_triangle(0.0, 0.0, 2.0);
        let t2 = xy_triangle(0.5, 0.5, 2.0);
        assert!(triangles_overlap(&t1, &t2));
    }

    #[test]
    fn test_parallel_offset_planes() {
        // Same footprint, different z planes: parallel but not coplanar.
        let t1 = xy_triangle(0.0, 0.0, 1.0);
        let mut t2 = t1;
        t2.v0.z = 0.5;
        t2.v1.z = 0.5;
        t2.v2.z = 0.5;
        assert!(!triangles_overlap(&t1, &t2));
    }

    #[test]
    fn test_perpendicular_crossing() {
        let t1 = Triangle::new(
            Point3::new(-1.0, -1.0, 0.0),
            Point3::new(1.0, -1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        let t2 = Triangle::new(
            Point3::new(-1.0, 0.0, -1.0),
            Point3::new(1.0, 0.0, -1.0),
            Point3::new(0.0, 0.0, 1.0),
        );
        assert!(triangles_overlap(&t1, &t2));
    }

    #[test]
    fn test_perpendicular_disjoint() {
        let t1 = Triangle::new(
            Point3::new(-1.0, -1.0, 0.0),
            Point3::new(1.0, -1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        let t2 = Triangle::new(
            Point3::new(-1.0, 5.0, -1.0),
            Point3::new(1.0, 5.0, -1.0),
            Point3::new(0.0, 5.0, 1.0),
        );
        assert!(!triangles_overlap(&t1, &t2));
    }

    #[test]
    fn test_shared_vertex_counts_as_overlap() {
        // Boundary-inclusive semantics: touching at a single point overlaps.
        let t1 = xy_triangle(0.0, 0.0, 1.0);
        let t2 = Triangle::new(
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(1.5, -1.0, 0.0),
        );
        assert!(triangles_overlap(&t1, &t2));
    }

    #[test]
    fn test_shared_edge_counts_as_overlap() {
        let t1 = Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
        );
        // Folded over the shared edge, out of plane.
        let t2 = Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 0.0, 1.0),
        );
        assert!(triangles_overlap(&t1, &t2));
    }

    #[test]
    fn test_degenerate_never_overlaps() {
        let degenerate = Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        );
        let t = xy_triangle(0.0, -0.5, 1.0);
        assert!(!triangles_overlap(&degenerate, &t));
        assert!(!triangles_overlap(&t, &degenerate));
    }
}
