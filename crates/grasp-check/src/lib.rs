//! Collision feasibility engine for parallel-jaw grasp planning.
//!
//! Given a candidate 3D pose for a gripper modeled as three rigid
//! triangle-mesh parts (palm and two fingers) attached to one moving
//! reference frame, this crate decides whether the gripper would physically
//! intersect a target object's surface mesh. The test is the inner loop of
//! a grasp planner: thousands of candidate poses are evaluated per run, so
//! each query is a fast, synchronous BVH descent with exact
//! triangle-triangle tests at the leaves.
//!
//! # Units and coordinates
//!
//! **This library assumes meters.** Poses and meshes must share one
//! consistent unit; a millimeter STL is brought to meters with an explicit
//! scale of `1e-3` at load time ([`MeshModel::from_stl`]), never silently.
//!
//! The nominal palm frame is right-handed: +x is the approach direction,
//! z is the finger-separation axis, y runs across the finger width.
//!
//! # Quick start
//!
//! ```
//! use grasp_check::{
//!     CollisionChecker, GripperCalibration, GripperModel, GripperShape,
//!     MeshModel, Triangle,
//! };
//! use nalgebra::Isometry3;
//!
//! // A tiny target "object": one triangle at the origin.
//! let target = MeshModel::from_triangles([Triangle::from_coords(
//!     [-0.05, -0.05, 0.0], [0.05, -0.05, 0.0], [0.0, 0.05, 0.0],
//! )]).unwrap();
//!
//! // A gripper whose parts are flat plates authored in the palm frame.
//! let plate = MeshModel::from_triangles([Triangle::from_coords(
//!     [-0.01, -0.01, 0.0], [0.01, -0.01, 0.0], [0.0, 0.01, 0.0],
//! )]).unwrap();
//! let gripper = GripperModel::new(
//!     GripperShape::default(),
//!     GripperCalibration::identity(),
//!     plate.clone(), plate.clone(), plate,
//! ).unwrap();
//!
//! let mut checker = CollisionChecker::new();
//! checker.set_target(&target).unwrap();
//! checker.set_gripper(gripper);
//!
//! // A pose a meter away is trivially collision-free.
//! let far = Isometry3::translation(1.0, 0.0, 0.0);
//! assert!(checker.is_feasible(&far).unwrap());
//! ```
//!
//! # Concurrency
//!
//! Every query is pure with respect to engine state, so batches of poses
//! run lock-free across rayon workers via
//! [`CollisionChecker::check_batch`]. Changing the gripper opening width
//! produces a new immutable [`GripperModel`] snapshot
//! ([`GripperModel::with_width`]) instead of mutating shared state.
//!
//! # Error handling
//!
//! Operations return [`GraspResult<T>`], which is `Result<T, GraspError>`.
//! All errors are setup mistakes detected at the call boundary: non-finite
//! input geometry (`InvalidGeometry`), BVH lifecycle misuse
//! (`InvalidState`), or querying an engine with no target or gripper
//! (`NotConfigured`). A planning loop should skip the offending candidate
//! rather than abort the batch.

pub mod bvh;
pub mod collision;
pub mod error;
pub mod gripper;
pub mod intersect;
pub mod io;
pub mod types;

pub use bvh::{Aabb, Bvh};
pub use collision::{
    CheckerConfig, CollisionChecker, CollisionPolicy, FeasibilityReport, PartCollision,
};
pub use error::{GraspError, GraspResult};
pub use gripper::{
    ContactPlane, GripperCalibration, GripperModel, GripperPart, GripperShape, PartId, PlaneKind,
};
pub use intersect::triangles_overlap;
pub use io::{load_stl, load_stl_scaled};
pub use types::{MeshModel, MeshModelBuilder, Triangle};
