//! Collision feasibility queries between a gripper and a target mesh.
//!
//! The checker holds one target BVH (fixed at identity placement) and one
//! [`GripperModel`]. Each feasibility query is a pure function of the
//! candidate pose: the engine writes nothing shared, so independent poses
//! may be evaluated concurrently (see [`CollisionChecker::check_batch`]).

use nalgebra::Isometry3;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::bvh::Bvh;
use crate::error::{GraspError, GraspResult};
use crate::gripper::{GripperModel, PartId};
use crate::types::MeshModel;

/// Short-circuit discipline for a feasibility query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionPolicy {
    /// Stop at the first colliding part. Cheaper; the report names at most
    /// one part.
    #[default]
    StopAtFirstHit,
    /// Evaluate every configured part and report each collision. Useful for
    /// debugging and visualization.
    EvaluateAll,
}

/// Query configuration: which parts participate and how collisions
/// short-circuit.
///
/// The evaluated-part subset is explicit rather than an implicit loop
/// bound; a planner that ignores finger 2 configures `parts` accordingly.
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    pub parts: Vec<PartId>,
    pub policy: CollisionPolicy,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            parts: PartId::ALL.to_vec(),
            policy: CollisionPolicy::default(),
        }
    }
}

/// One detected collision: the offending part and its world transform at
/// the queried pose, kept for inspection and visualization.
#[derive(Debug, Clone)]
pub struct PartCollision {
    pub part: PartId,
    pub world_transform: Isometry3<f64>,
}

/// Outcome of one feasibility query.
#[derive(Debug, Clone)]
pub struct FeasibilityReport {
    /// True iff no evaluated part collided.
    pub feasible: bool,
    /// Collisions found, in part order. Under
    /// [`CollisionPolicy::StopAtFirstHit`] this holds at most one entry.
    pub collisions: Vec<PartCollision>,
    /// How many parts were actually evaluated before returning.
    pub parts_checked: usize,
}

impl std::fmt::Display for FeasibilityReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.feasible {
            write!(f, "feasible ({} part(s) clear)", self.parts_checked)
        } else {
            let parts: Vec<&str> = self.collisions.iter().map(|c| c.part.label()).collect();
            write!(f, "infeasible (collision in {})", parts.join(", "))
        }
    }
}

/// The collision query engine.
///
/// Stateless across queries apart from the target/gripper association.
/// Both must be set before the first query; an unconfigured engine fails
/// with `NotConfigured` rather than silently reporting "feasible".
#[derive(Debug, Default)]
pub struct CollisionChecker {
    target: Option<Bvh>,
    gripper: Option<GripperModel>,
    config: CheckerConfig,
}

impl CollisionChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CheckerConfig) -> Self {
        Self {
            target: None,
            gripper: None,
            config,
        }
    }

    /// Build and attach the target object's BVH.
    pub fn set_target(&mut self, mesh: &MeshModel) -> GraspResult<()> {
        let bvh = Bvh::from_mesh(mesh)?;
        info!(triangles = bvh.triangle_count(), "target mesh loaded");
        self.target = Some(bvh);
        Ok(())
    }

    /// Attach the gripper model snapshot used by subsequent queries.
    pub fn set_gripper(&mut self, gripper: GripperModel) {
        self.gripper = Some(gripper);
    }

    #[inline]
    pub fn target(&self) -> Option<&Bvh> {
        self.target.as_ref()
    }

    #[inline]
    pub fn gripper(&self) -> Option<&GripperModel> {
        self.gripper.as_ref()
    }

    /// The active query configuration (evaluated parts and short-circuit
    /// discipline).
    #[inline]
    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// Evaluate one candidate pose, returning the per-part diagnostic.
    ///
    /// For each configured part the part's BVH is placed at
    /// `pose * local[i]` and tested exactly against the target BVH at
    /// identity. The pose is feasible iff no evaluated part collides.
    pub fn check(&self, pose: &Isometry3<f64>) -> GraspResult<FeasibilityReport> {
        let target = self.target.as_ref().ok_or_else(|| GraspError::NotConfigured {
            details: "no target mesh loaded".to_string(),
        })?;
        let gripper = self.gripper.as_ref().ok_or_else(|| GraspError::NotConfigured {
            details: "no gripper model attached".to_string(),
        })?;

        let identity = Isometry3::identity();
        let mut collisions = Vec::new();
        let mut parts_checked = 0;

        for &part in &self.config.parts {
            parts_checked += 1;
            let world = gripper.world_transform(part, pose);
            if target.overlaps(&identity, gripper.part(part).bvh(), &world)? {
                debug!(part = part.label(), "gripper part collides with target");
                collisions.push(PartCollision {
                    part,
                    world_transform: world,
                });
                if self.config.policy == CollisionPolicy::StopAtFirstHit {
                    break;
                }
            }
        }

        Ok(FeasibilityReport {
            feasible: collisions.is_empty(),
            collisions,
            parts_checked,
        })
    }

    /// Boolean convenience over [`CollisionChecker::check`].
    pub fn is_feasible(&self, pose: &Isometry3<f64>) -> GraspResult<bool> {
        Ok(self.check(pose)?.feasible)
    }

    /// Evaluate a batch of candidate poses in parallel.
    ///
    /// Queries only read the immutable target BVH and gripper snapshot, so
    /// they run lock-free across rayon workers. Results are in input order.
    pub fn check_batch(&self, poses: &[Isometry3<f64>]) -> GraspResult<Vec<FeasibilityReport>> {
        poses.par_iter().map(|pose| self.check(pose)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gripper::{GripperCalibration, GripperShape};
    use crate::types::{MeshModel, Triangle};
    use nalgebra::Point3;

    fn cube_mesh(size: f64) -> MeshModel {
        let h = size / 2.0;
        let v = [
            Point3::new(-h, -h, -h),
            Point3::new(h, -h, -h),
            Point3::new(h, h, -h),
            Point3::new(-h, h, -h),
            Point3::new(-h, -h, h),
            Point3::new(h, -h, h),
            Point3::new(h, h, h),
            Point3::new(-h, h, h),
        ];
        let faces: [[usize; 3]; 12] = [
            [0, 2, 1],
            [0, 3, 2],
            [4, 5, 6],
            [4, 6, 7],
            [0, 1, 5],
            [0, 5, 4],
            [3, 7, 6],
            [3, 6, 2],
            [0, 4, 7],
            [0, 7, 3],
            [1, 2, 6],
            [1, 6, 5],
        ];
        MeshModel::from_triangles(
            faces
                .iter()
                .map(|&[a, b, c]| Triangle::new(v[a], v[b], v[c])),
        )
        .unwrap()
    }

    /// A gripper whose three parts are all copies of the same cube, with a
    /// no-op calibration: every part sits at the pose itself (plus the
    /// finger separation).
    fn cube_gripper(size: f64) -> GripperModel {
        GripperModel::new(
            GripperShape::default(),
            GripperCalibration::identity(),
            cube_mesh(size),
            cube_mesh(size),
            cube_mesh(size),
        )
        .unwrap()
    }

    fn configured_checker(config: CheckerConfig) -> CollisionChecker {
        let mut checker = CollisionChecker::with_config(config);
        checker.set_target(&cube_mesh(0.1)).unwrap();
        checker.set_gripper(cube_gripper(0.1));
        checker
    }

    #[test]
    fn test_unconfigured_checker_errors() {
        let checker = CollisionChecker::new();
        let err = checker.is_feasible(&Isometry3::identity()).unwrap_err();
        assert!(matches!(err, GraspError::NotConfigured { .. }));

        let mut target_only = CollisionChecker::new();
        target_only.set_target(&cube_mesh(0.1)).unwrap();
        let err = target_only.is_feasible(&Isometry3::identity()).unwrap_err();
        assert!(matches!(err, GraspError::NotConfigured { .. }));
    }

    #[test]
    fn test_far_pose_is_feasible() {
        let checker = configured_checker(CheckerConfig::default());
        let far = Isometry3::translation(1.0, 0.0, 0.0);
        assert!(checker.is_feasible(&far).unwrap());
    }

    #[test]
    fn test_forced_overlap_names_the_part() {
        let checker = configured_checker(CheckerConfig::default());
        let report = checker.check(&Isometry3::identity()).unwrap();
        assert!(!report.feasible);
        assert_eq!(report.collisions[0].part, PartId::Palm);
        assert_eq!(report.collisions[0].part.index(), 0);
    }

    #[test]
    fn test_policy_controls_short_circuit() {
        let first_hit = configured_checker(CheckerConfig {
            parts: PartId::ALL.to_vec(),
            policy: CollisionPolicy::StopAtFirstHit,
        });
        let report = first_hit.check(&Isometry3::identity()).unwrap();
        assert_eq!(report.collisions.len(), 1);
        assert_eq!(report.parts_checked, 1);

        // All three cube parts overlap the cube target at identity.
        let evaluate_all = configured_checker(CheckerConfig {
            parts: PartId::ALL.to_vec(),
            policy: CollisionPolicy::EvaluateAll,
        });
        let report = evaluate_all.check(&Isometry3::identity()).unwrap();
        assert_eq!(report.collisions.len(), 3);
        assert_eq!(report.parts_checked, 3);
    }

    #[test]
    fn test_part_subset_is_respected() {
        // Only the palm participates; finger collisions are invisible.
        let palm_only = configured_checker(CheckerConfig {
            parts: vec![PartId::Palm],
            policy: CollisionPolicy::EvaluateAll,
        });

        // Shift so the palm clears the target but the fingers would not:
        // fingers sit within ±(h + z2l/2) of the palm along z, far less
        // than the 0.1 cube size, so a pose that clears the palm by little
        // more than the finger separation still collides the fingers.
        let pose = Isometry3::translation(0.0, 0.0, 0.105);
        let report = palm_only.check(&pose).unwrap();
        assert!(report.feasible);
        assert_eq!(report.parts_checked, 1);

        let all_parts = configured_checker(CheckerConfig {
            parts: PartId::ALL.to_vec(),
            policy: CollisionPolicy::EvaluateAll,
        });
        let report = all_parts.check(&pose).unwrap();
        assert!(!report.feasible);
        assert!(report
            .collisions
            .iter()
            .all(|c| c.part != PartId::Palm));
    }

    #[test]
    fn test_determinism() {
        let checker = configured_checker(CheckerConfig::default());
        let pose = Isometry3::translation(0.08, 0.01, -0.02);
        let a = checker.is_feasible(&pose).unwrap();
        let b = checker.is_feasible(&pose).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_batch_matches_serial() {
        let checker = configured_checker(CheckerConfig::default());
        let poses: Vec<Isometry3<f64>> = (0..32)
            .map(|i| Isometry3::translation(i as f64 * 0.01, 0.0, 0.0))
            .collect();

        let batch = checker.check_batch(&poses).unwrap();
        assert_eq!(batch.len(), poses.len());
        for (pose, report) in poses.iter().zip(&batch) {
            assert_eq!(report.feasible, checker.is_feasible(pose).unwrap());
        }
        // Near poses collide, far poses clear.
        assert!(!batch.first().unwrap().feasible);
        assert!(batch.last().unwrap().feasible);
    }

    #[test]
    fn test_report_display() {
        let checker = configured_checker(CheckerConfig::default());
        let report = checker.check(&Isometry3::identity()).unwrap();
        assert!(report.to_string().contains("infeasible"));
        assert!(report.to_string().contains("palm"));

        let report = checker.check(&Isometry3::translation(1.0, 0.0, 0.0)).unwrap();
        assert!(report.to_string().contains("feasible"));
    }
}
