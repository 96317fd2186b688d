//! Error types for the collision feasibility engine.
//!
//! All errors are local precondition violations detected at the boundary of
//! the call that would misuse them. A grasp-planning loop is expected to
//! skip the offending candidate pose rather than abort the whole batch;
//! there is no retry policy because every query is a pure deterministic
//! function of its inputs.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for feasibility-engine operations.
pub type GraspResult<T> = Result<T, GraspError>;

/// Errors that can occur while building geometry or evaluating feasibility.
#[derive(Debug, Error, Diagnostic)]
pub enum GraspError {
    /// Error reading a mesh file.
    #[error("failed to read mesh from {path}")]
    #[diagnostic(
        code(grasp::io::read),
        help("Check that the file exists and is readable.")
    )]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error parsing a mesh file.
    #[error("failed to parse mesh from {path}: {details}")]
    #[diagnostic(
        code(grasp::io::parse),
        help("The file may be corrupted or not an STL. Try re-exporting it from the original software.")
    )]
    ParseError { path: PathBuf, details: String },

    /// Mesh has no usable triangles.
    #[error("mesh is empty: {details}")]
    #[diagnostic(
        code(grasp::mesh::empty),
        help("The mesh must contain at least one triangle. Check that the file was exported correctly.")
    )]
    EmptyMesh { details: String },

    /// Non-finite or otherwise unusable input geometry.
    #[error("invalid geometry: {details}")]
    #[diagnostic(
        code(grasp::mesh::geometry),
        help("NaN or infinite coordinates must be rejected before they reach the BVH. Check the source mesh and any unit-scaling step.")
    )]
    InvalidGeometry { details: String },

    /// A BVH was used outside its begin/insert/finalize lifecycle.
    #[error("invalid BVH state: {details}")]
    #[diagnostic(
        code(grasp::bvh::state),
        help("A BVH must be finalized exactly once before it can answer overlap queries, and cannot accept geometry afterwards.")
    )]
    InvalidState { details: String },

    /// A feasibility query was issued against an unconfigured engine.
    #[error("collision checker not configured: {details}")]
    #[diagnostic(
        code(grasp::checker::unconfigured),
        help("Load a target mesh with set_target() and attach a gripper model with set_gripper() before querying feasibility.")
    )]
    NotConfigured { details: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraspError::NotConfigured {
            details: "no target mesh loaded".to_string(),
        };
        assert!(err.to_string().contains("not configured"));

        let err = GraspError::InvalidState {
            details: "queried before finalize".to_string(),
        };
        assert!(err.to_string().contains("invalid BVH state"));
    }

    #[test]
    fn test_errors_have_diagnostic_codes() {
        use miette::Diagnostic;

        let err = GraspError::InvalidGeometry {
            details: "triangle 3 has a NaN coordinate".to_string(),
        };
        assert!(err.code().is_some());
        assert!(err.help().is_some());
    }
}
