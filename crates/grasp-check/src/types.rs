//! Core mesh data types.

use nalgebra::{Isometry3, Point3, Vector3};

use crate::error::{GraspError, GraspResult};

/// A triangle with concrete vertex positions.
///
/// Utility type for geometric calculations and the unit of input for
/// [`MeshModelBuilder`]. Winding is not semantically required by the
/// collision tests, but must be consistent for any normal computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub v0: Point3<f64>,
    pub v1: Point3<f64>,
    pub v2: Point3<f64>,
}

impl Triangle {
    /// Create a new triangle from three points.
    #[inline]
    pub fn new(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>) -> Self {
        Self { v0, v1, v2 }
    }

    /// Create a triangle from raw coordinates.
    #[inline]
    pub fn from_coords(v0: [f64; 3], v1: [f64; 3], v2: [f64; 3]) -> Self {
        Self::new(Point3::from(v0), Point3::from(v1), Point3::from(v2))
    }

    /// Compute the (unnormalized) face normal via cross product.
    /// The direction follows the right-hand rule with CCW winding.
    #[inline]
    pub fn normal_unnormalized(&self) -> Vector3<f64> {
        let e1 = self.v1 - self.v0;
        let e2 = self.v2 - self.v0;
        e1.cross(&e2)
    }

    /// Compute the unit face normal.
    /// Returns None for degenerate triangles (zero area).
    pub fn normal(&self) -> Option<Vector3<f64>> {
        let n = self.normal_unnormalized();
        let len_sq = n.norm_squared();
        if len_sq > f64::EPSILON {
            Some(n / len_sq.sqrt())
        } else {
            None
        }
    }

    /// Compute the area of the triangle.
    #[inline]
    pub fn area(&self) -> f64 {
        self.normal_unnormalized().norm() * 0.5
    }

    /// Compute the centroid (center of mass).
    #[inline]
    pub fn centroid(&self) -> Point3<f64> {
        Point3::new(
            (self.v0.x + self.v1.x + self.v2.x) / 3.0,
            (self.v0.y + self.v1.y + self.v2.y) / 3.0,
            (self.v0.z + self.v1.z + self.v2.z) / 3.0,
        )
    }

    /// Whether all nine coordinates are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.v0.coords.iter().all(|c| c.is_finite())
            && self.v1.coords.iter().all(|c| c.is_finite())
            && self.v2.coords.iter().all(|c| c.is_finite())
    }

    /// Scale all vertices uniformly around the origin.
    ///
    /// This is the explicit unit-normalization hook: a millimeter mesh is
    /// brought to meters with `scaled(1e-3)` at load time, never silently.
    #[inline]
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            v0: Point3::from(self.v0.coords * factor),
            v1: Point3::from(self.v1.coords * factor),
            v2: Point3::from(self.v2.coords * factor),
        }
    }

    /// Map all vertices through a rigid transform.
    #[inline]
    pub fn transformed(&self, transform: &Isometry3<f64>) -> Self {
        Self {
            v0: transform.transform_point(&self.v0),
            v1: transform.transform_point(&self.v1),
            v2: transform.transform_point(&self.v2),
        }
    }
}

/// Incremental builder for [`MeshModel`].
///
/// Deduplication-free: each pushed triangle appends its three positions to
/// the vertex buffer and one face record of the resulting indices. Input
/// validation happens once, in [`MeshModelBuilder::build`].
#[derive(Debug, Default)]
pub struct MeshModelBuilder {
    vertices: Vec<Point3<f64>>,
    faces: Vec<[u32; 3]>,
}

impl MeshModelBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder with capacity for `triangle_count` triangles.
    pub fn with_capacity(triangle_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(triangle_count * 3),
            faces: Vec::with_capacity(triangle_count),
        }
    }

    /// Append one triangle.
    pub fn push_triangle(&mut self, tri: Triangle) {
        let base = self.vertices.len() as u32;
        self.vertices.push(tri.v0);
        self.vertices.push(tri.v1);
        self.vertices.push(tri.v2);
        self.faces.push([base, base + 1, base + 2]);
    }

    /// Finalize into an immutable [`MeshModel`].
    ///
    /// Fails with [`GraspError::InvalidGeometry`] if any triangle carries a
    /// non-finite coordinate; bad input must be rejected here, not
    /// propagated into a BVH.
    pub fn build(self) -> GraspResult<MeshModel> {
        for (face_idx, face) in self.faces.iter().enumerate() {
            for &vi in face {
                let v = &self.vertices[vi as usize];
                if !(v.x.is_finite() && v.y.is_finite() && v.z.is_finite()) {
                    return Err(GraspError::InvalidGeometry {
                        details: format!(
                            "triangle {} has a non-finite coordinate ({}, {}, {})",
                            face_idx, v.x, v.y, v.z
                        ),
                    });
                }
            }
        }
        Ok(MeshModel {
            vertices: self.vertices,
            faces: self.faces,
        })
    }
}

/// An immutable indexed triangle mesh.
///
/// Built once via [`MeshModelBuilder`] (or the [`MeshModel::from_triangles`]
/// convenience) and never mutated afterwards. Every face index is in range
/// by construction.
#[derive(Debug, Clone)]
pub struct MeshModel {
    vertices: Vec<Point3<f64>>,
    faces: Vec<[u32; 3]>,
}

impl MeshModel {
    /// Build a model from a sequence of triangles.
    pub fn from_triangles<I>(triangles: I) -> GraspResult<Self>
    where
        I: IntoIterator<Item = Triangle>,
    {
        let iter = triangles.into_iter();
        let mut builder = MeshModelBuilder::with_capacity(iter.size_hint().0);
        for tri in iter {
            builder.push_triangle(tri);
        }
        builder.build()
    }

    /// Number of vertices in the mesh.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of faces (triangles) in the mesh.
    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh has no geometry.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Vertex positions.
    #[inline]
    pub fn vertices(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    /// Triangle faces as indices into the vertex array.
    #[inline]
    pub fn faces(&self) -> &[[u32; 3]] {
        &self.faces
    }

    /// Iterate over triangles, yielding [`Triangle`] structs with actual
    /// vertex data.
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.faces.iter().map(|&[i0, i1, i2]| Triangle {
            v0: self.vertices[i0 as usize],
            v1: self.vertices[i1 as usize],
            v2: self.vertices[i2 as usize],
        })
    }

    /// Get a specific triangle by face index.
    pub fn triangle(&self, face_idx: usize) -> Option<Triangle> {
        self.faces.get(face_idx).map(|&[i0, i1, i2]| Triangle {
            v0: self.vertices[i0 as usize],
            v1: self.vertices[i1 as usize],
            v2: self.vertices[i2 as usize],
        })
    }

    /// Compute the axis-aligned bounding box.
    /// Returns (min_corner, max_corner) or None if the mesh is empty.
    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        if self.vertices.is_empty() {
            return None;
        }

        let mut min = self.vertices[0];
        let mut max = self.vertices[0];

        for p in &self.vertices[1..] {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }

        Some((min, max))
    }

    /// Mean of all vertex positions, or the origin for an empty mesh.
    pub fn centroid(&self) -> Point3<f64> {
        if self.vertices.is_empty() {
            return Point3::origin();
        }
        let sum = self
            .vertices
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.coords);
        Point3::from(sum / self.vertices.len() as f64)
    }

    /// Largest vertex distance from the centroid.
    pub fn bounding_radius(&self) -> f64 {
        let c = self.centroid();
        self.vertices
            .iter()
            .map(|p| (p - c).norm())
            .fold(0.0, f64::max)
    }

    /// Total surface area of the mesh.
    pub fn surface_area(&self) -> f64 {
        self.triangles().map(|tri| tri.area()).sum()
    }

    /// Return a copy scaled uniformly around the origin.
    ///
    /// Unit conversion (e.g. millimeters to meters) must be applied as an
    /// explicit step like this one, never mixed silently between the object
    /// mesh and the gripper meshes.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            vertices: self
                .vertices
                .iter()
                .map(|p| Point3::from(p.coords * factor))
                .collect(),
            faces: self.faces.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_triangle() -> Triangle {
        Triangle::from_coords([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0])
    }

    #[test]
    fn test_triangle_normal_and_area() {
        let tri = unit_triangle();
        let n = tri.normal().unwrap();
        assert_relative_eq!(n, Vector3::z(), epsilon = 1e-12);
        assert_relative_eq!(tri.area(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_triangle_has_no_normal() {
        let tri = Triangle::from_coords([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]);
        assert!(tri.normal().is_none());
    }

    #[test]
    fn test_builder_appends_without_dedup() {
        let mut builder = MeshModelBuilder::new();
        builder.push_triangle(unit_triangle());
        builder.push_triangle(unit_triangle());
        let mesh = builder.build().unwrap();

        // Shared positions are not merged.
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.faces()[1], [3, 4, 5]);
    }

    #[test]
    fn test_builder_rejects_non_finite() {
        let mut builder = MeshModelBuilder::new();
        builder.push_triangle(unit_triangle());
        builder.push_triangle(Triangle::from_coords(
            [0.0, 0.0, 0.0],
            [f64::NAN, 0.0, 0.0],
            [0.0, 1.0, 0.0],
        ));

        let err = builder.build().unwrap_err();
        assert!(err.to_string().contains("triangle 1"));
    }

    #[test]
    fn test_bounds_and_centroid() {
        let mesh = MeshModel::from_triangles([Triangle::from_coords(
            [-1.0, -2.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 2.0, 4.0],
        )])
        .unwrap();

        let (min, max) = mesh.bounds().unwrap();
        assert_eq!(min, Point3::new(-1.0, -2.0, 0.0));
        assert_eq!(max, Point3::new(1.0, 2.0, 4.0));
        assert_relative_eq!(mesh.centroid().z, 4.0 / 3.0, epsilon = 1e-12);
        assert!(mesh.bounding_radius() > 0.0);
    }

    #[test]
    fn test_scaled_copies() {
        let mesh = MeshModel::from_triangles([unit_triangle()]).unwrap();
        let mm = mesh.scaled(1e-3);
        assert_relative_eq!(mm.vertices()[1].x, 1e-3, epsilon = 1e-15);
        // Original untouched.
        assert_relative_eq!(mesh.vertices()[1].x, 1.0, epsilon = 1e-15);
    }

    #[test]
    fn test_triangle_transformed() {
        let tri = unit_triangle();
        let shift = Isometry3::translation(0.0, 0.0, 2.0);
        let moved = tri.transformed(&shift);
        assert_relative_eq!(moved.v0.z, 2.0, epsilon = 1e-12);
        assert_relative_eq!(moved.centroid().z, 2.0, epsilon = 1e-12);
    }
}
