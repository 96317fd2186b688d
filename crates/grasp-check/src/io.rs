//! STL mesh loading.
//!
//! Loads a file into the raw triangle sequence that feeds
//! [`MeshModelBuilder`](crate::types::MeshModelBuilder). Positions are
//! returned in the file's native unit; the canonical unit for poses is
//! meters, so a millimeter STL must be loaded with an explicit scale of
//! `1e-3`. Scaling is never applied silently.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{GraspError, GraspResult};
use crate::types::{MeshModel, Triangle};

/// Load triangles from an STL file (binary or ASCII) in the file's native
/// unit.
pub fn load_stl(path: &Path) -> GraspResult<Vec<Triangle>> {
    load_stl_scaled(path, 1.0)
}

/// Load triangles from an STL file, multiplying every coordinate by
/// `scale`.
///
/// Use `scale = 1e-3` for meshes authored in millimeters.
pub fn load_stl_scaled(path: &Path, scale: f64) -> GraspResult<Vec<Triangle>> {
    let file = File::open(path).map_err(|e| GraspError::IoRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut reader = BufReader::new(file);

    let stl = stl_io::read_stl(&mut reader).map_err(|e| GraspError::ParseError {
        path: path.to_path_buf(),
        details: e.to_string(),
    })?;

    debug!(
        vertices = stl.vertices.len(),
        faces = stl.faces.len(),
        "STL parsed"
    );

    let mut triangles = Vec::with_capacity(stl.faces.len());
    for face in &stl.faces {
        let p = |i: usize| {
            // stl_io::Vertex is Vector<f32> with .0 being [f32; 3]
            let v = &stl.vertices[face.vertices[i]];
            [
                v[0] as f64 * scale,
                v[1] as f64 * scale,
                v[2] as f64 * scale,
            ]
        };
        triangles.push(Triangle::from_coords(p(0), p(1), p(2)));
    }

    if triangles.is_empty() {
        return Err(GraspError::EmptyMesh {
            details: format!("{} contains no triangles", path.display()),
        });
    }

    info!(
        path = %path.display(),
        triangles = triangles.len(),
        scale,
        "STL loaded"
    );

    Ok(triangles)
}

impl MeshModel {
    /// Load and validate a mesh model from an STL file.
    ///
    /// `scale` is the explicit unit-conversion multiplier (1.0 for a file
    /// already in meters).
    pub fn from_stl(path: &Path, scale: f64) -> GraspResult<Self> {
        Self::from_triangles(load_stl_scaled(path, scale)?)
    }
}
