//! Gripper frame model: rigid transform chain and contact-plane queries.
//!
//! A parallel-jaw gripper is modeled as three rigid parts attached to one
//! moving reference frame: the palm (part 0) and two fingers (parts 1 and
//! 2). Given a world pose `P` of the reference frame, each part sits at
//! `P * local[i]` — pose on the left, always.
//!
//! The model is an immutable snapshot per opening width: changing the
//! opening produces a new [`GripperModel`] rather than mutating in place,
//! so concurrent feasibility queries never race a width change.

use std::f64::consts::FRAC_PI_2;
use std::fmt;

use nalgebra::{Isometry3, Matrix3, Point3, Rotation3, Translation3, UnitQuaternion, Vector3};
use tracing::info;

use crate::bvh::Bvh;
use crate::error::{GraspError, GraspResult};
use crate::types::MeshModel;

/// Identifier of one rigid gripper part.
///
/// Part 0 is always the palm/base; parts 1 and 2 are the two fingers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartId {
    Palm,
    Finger1,
    Finger2,
}

impl PartId {
    /// All parts, in index order.
    pub const ALL: [PartId; 3] = [PartId::Palm, PartId::Finger1, PartId::Finger2];

    /// Array index of this part (palm is 0).
    #[inline]
    pub fn index(self) -> usize {
        match self {
            PartId::Palm => 0,
            PartId::Finger1 => 1,
            PartId::Finger2 => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PartId::Palm => "palm",
            PartId::Finger1 => "finger1",
            PartId::Finger2 => "finger2",
        }
    }
}

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Static shape parameters of the gripper, in meters, measured from the
/// nominal palm frame.
///
/// The local axes are: +x the approach direction, z the finger-separation
/// axis, y across the finger width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GripperShape {
    /// Depth of the grasp volume (palm surface sits at x = -d).
    pub d: f64,
    /// Half-opening of the gripper at rest (finger contact planes at z = ±h).
    pub h: f64,
    /// Total length of the fingers along x.
    pub l: f64,
    /// Width of the palm block along x.
    pub x1l: f64,
    /// Height of the palm block along y.
    pub y1l: f64,
    /// Thickness of a finger plate along z.
    pub z2l: f64,
    /// Length of the mounting bar along x.
    pub x4l: f64,
    /// Width of the mounting bar along z.
    pub z4l: f64,
}

impl Default for GripperShape {
    /// Dimensions of the lab device these defaults were measured on. They
    /// are device-specific, not general-purpose values.
    fn default() -> Self {
        Self {
            d: 0.042,
            h: 0.0115,
            l: 0.112,
            x1l: 0.02,
            y1l: 0.025,
            z2l: 0.004,
            x4l: 0.06,
            z4l: 0.025,
        }
    }
}

/// Which contact plane to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneKind {
    Palm,
    Finger1,
    Finger2,
}

/// An oriented rectangular contact plane in world space: four corners plus
/// the outward unit normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPlane {
    pub corners: [Point3<f64>; 4],
    pub normal: Vector3<f64>,
}

impl GripperShape {
    fn plane(
        &self,
        pose: &Isometry3<f64>,
        local_corners: [Point3<f64>; 4],
        local_normal: Vector3<f64>,
    ) -> ContactPlane {
        ContactPlane {
            corners: local_corners.map(|c| pose.transform_point(&c)),
            // Translation does not affect normals.
            normal: pose.rotation * local_normal,
        }
    }

    /// Contact plane of the palm surface, facing the object along -x local.
    pub fn palm_plane(&self, pose: &Isometry3<f64>) -> ContactPlane {
        let hy = self.y1l / 2.0;
        self.plane(
            pose,
            [
                Point3::new(-self.d, -hy, -self.h),
                Point3::new(-self.d, -hy, self.h),
                Point3::new(-self.d, hy, -self.h),
                Point3::new(-self.d, hy, self.h),
            ],
            -Vector3::x(),
        )
    }

    /// Contact plane of finger 1, normal +z local.
    pub fn finger1_plane(&self, pose: &Isometry3<f64>) -> ContactPlane {
        let hy = self.y1l / 2.0;
        self.plane(
            pose,
            [
                Point3::new(-self.d, -hy, self.h),
                Point3::new(self.l - self.d, -hy, self.h),
                Point3::new(-self.d, hy, self.h),
                Point3::new(self.l - self.d, hy, self.h),
            ],
            Vector3::z(),
        )
    }

    /// Contact plane of finger 2, normal -z local.
    pub fn finger2_plane(&self, pose: &Isometry3<f64>) -> ContactPlane {
        let hy = self.y1l / 2.0;
        self.plane(
            pose,
            [
                Point3::new(-self.d, -hy, -self.h),
                Point3::new(self.l - self.d, -hy, -self.h),
                Point3::new(-self.d, hy, -self.h),
                Point3::new(self.l - self.d, hy, -self.h),
            ],
            -Vector3::z(),
        )
    }

    /// Dispatch a plane query by kind.
    pub fn contact_plane(&self, kind: PlaneKind, pose: &Isometry3<f64>) -> ContactPlane {
        match kind {
            PlaneKind::Palm => self.palm_plane(pose),
            PlaneKind::Finger1 => self.finger1_plane(pose),
            PlaneKind::Finger2 => self.finger2_plane(pose),
        }
    }

    /// The gripper approach axis (+x local) rotated into world space.
    #[inline]
    pub fn palm_normal(&self, pose: &Isometry3<f64>) -> Vector3<f64> {
        pose.rotation * Vector3::x()
    }

    /// The palm surface center (-d, 0, 0) mapped into world space.
    #[inline]
    pub fn palm_origin(&self, pose: &Isometry3<f64>) -> Point3<f64> {
        pose.transform_point(&Point3::new(-self.d, 0.0, 0.0))
    }
}

/// Device-specific mounting constants relating the palm mesh's authored
/// frame to the nominal palm frame.
///
/// These values are a calibration of one physical device: the actuator axis
/// pitch, the actuator-to-center offset, and the two mounting rotations.
/// They depend on how the part STLs were authored and must not be treated
/// as general defaults. The composition convention used by
/// [`GripperCalibration::reference_transform`] should be validated against
/// the real hardware before trusting absolute poses.
#[derive(Debug, Clone, PartialEq)]
pub struct GripperCalibration {
    /// Pitch of the actuator axis relative to the palm, radians about -y.
    pub actuator_pitch: f64,
    /// Translation from the actuator frame to the palm center, meters.
    pub actuator_offset: Vector3<f64>,
    /// Rotation of the mounting plate frame.
    pub mount_frame: Rotation3<f64>,
    /// Orientation of the base mesh's authored frame.
    pub base_frame: Rotation3<f64>,
    /// Finger mesh origin offset from the palm, along local x.
    pub finger_forward: f64,
    /// Finger mesh origin offset from the palm, along local y.
    pub finger_lateral: f64,
}

impl Default for GripperCalibration {
    fn default() -> Self {
        Self {
            actuator_pitch: 13.5_f64.to_radians(),
            actuator_offset: Vector3::new(0.0129, 0.0, 0.1132),
            mount_frame: Rotation3::from_matrix_unchecked(Matrix3::new(
                0.0, 0.0, 1.0, //
                -1.0, 0.0, 0.0, //
                0.0, -1.0, 0.0,
            )),
            base_frame: Rotation3::from_axis_angle(&Vector3::x_axis(), FRAC_PI_2)
                * Rotation3::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2),
            finger_forward: 0.05,
            finger_lateral: -0.0745,
        }
    }
}

impl GripperCalibration {
    /// A no-op calibration for rigs whose part meshes are authored directly
    /// in the nominal palm frame.
    pub fn identity() -> Self {
        Self {
            actuator_pitch: 0.0,
            actuator_offset: Vector3::zeros(),
            mount_frame: Rotation3::identity(),
            base_frame: Rotation3::identity(),
            finger_forward: 0.0,
            finger_lateral: 0.0,
        }
    }

    /// The palm's local transform: nominal palm frame to the authored frame
    /// of the base mesh.
    ///
    /// Composition convention: `mount * (base * actuator)^-1`. The order and
    /// the inverse follow the mechanical mounting of the device this was
    /// calibrated on.
    pub fn reference_transform(&self) -> Isometry3<f64> {
        let actuator_rot = Rotation3::from_axis_angle(&Vector3::y_axis(), -self.actuator_pitch);
        let actuator = Isometry3::from_parts(
            Translation3::from(self.actuator_offset),
            UnitQuaternion::from_rotation_matrix(&actuator_rot),
        );
        let base = Isometry3::from_parts(
            Translation3::identity(),
            UnitQuaternion::from_rotation_matrix(&self.base_frame),
        );
        let mount = Isometry3::from_parts(
            Translation3::identity(),
            UnitQuaternion::from_rotation_matrix(&self.mount_frame),
        );
        mount * (base * actuator).inverse()
    }
}

/// One rigid gripper part: its mesh, its BVH, and its local transform
/// relative to the nominal palm frame.
#[derive(Debug, Clone)]
pub struct GripperPart {
    mesh: MeshModel,
    bvh: Bvh,
    local: Isometry3<f64>,
}

impl GripperPart {
    fn new(mesh: MeshModel, local: Isometry3<f64>) -> GraspResult<Self> {
        let bvh = Bvh::from_mesh(&mesh)?;
        Ok(Self { mesh, bvh, local })
    }

    /// The part's mesh, for rendering by an external visualizer.
    #[inline]
    pub fn mesh(&self) -> &MeshModel {
        &self.mesh
    }

    #[inline]
    pub fn bvh(&self) -> &Bvh {
        &self.bvh
    }

    /// Local-to-reference transform.
    #[inline]
    pub fn local_transform(&self) -> &Isometry3<f64> {
        &self.local
    }
}

/// Immutable kinematic model of the three-part gripper at one opening width.
#[derive(Debug, Clone)]
pub struct GripperModel {
    shape: GripperShape,
    calibration: GripperCalibration,
    parts: [GripperPart; 3],
    opening: f64,
}

impl GripperModel {
    /// Build the model from its static geometry configuration.
    ///
    /// Meshes must already be in meters; apply [`MeshModel::scaled`] before
    /// calling if the files were authored in millimeters. The initial
    /// opening is the shape's rest half-opening `h`.
    pub fn new(
        shape: GripperShape,
        calibration: GripperCalibration,
        palm: MeshModel,
        finger1: MeshModel,
        finger2: MeshModel,
    ) -> GraspResult<Self> {
        let reference = calibration.reference_transform();
        let opening = shape.h;

        let parts = [
            GripperPart::new(palm, reference)?,
            GripperPart::new(
                finger1,
                finger_local(&reference, &calibration, &shape, opening, 1.0),
            )?,
            GripperPart::new(
                finger2,
                finger_local(&reference, &calibration, &shape, opening, -1.0),
            )?,
        ];

        info!(
            opening,
            palm_triangles = parts[0].mesh.face_count(),
            finger_triangles = parts[1].mesh.face_count() + parts[2].mesh.face_count(),
            "gripper model built"
        );

        Ok(Self {
            shape,
            calibration,
            parts,
            opening,
        })
    }

    /// Derive a new model for a different opening width.
    ///
    /// Pure and idempotent: only the finger local transforms change, by
    /// ±(opening + z2l/2) along the finger-separation axis. Calling twice
    /// with the same width yields identical transforms.
    pub fn with_width(&self, opening: f64) -> GraspResult<Self> {
        if !opening.is_finite() || opening < 0.0 {
            return Err(GraspError::InvalidGeometry {
                details: format!("opening width must be finite and non-negative, got {opening}"),
            });
        }

        let mut model = self.clone();
        let reference = model.parts[0].local;
        model.parts[1].local =
            finger_local(&reference, &self.calibration, &self.shape, opening, 1.0);
        model.parts[2].local =
            finger_local(&reference, &self.calibration, &self.shape, opening, -1.0);
        model.opening = opening;
        Ok(model)
    }

    /// Current opening half-width.
    #[inline]
    pub fn opening(&self) -> f64 {
        self.opening
    }

    #[inline]
    pub fn shape(&self) -> &GripperShape {
        &self.shape
    }

    #[inline]
    pub fn calibration(&self) -> &GripperCalibration {
        &self.calibration
    }

    #[inline]
    pub fn part(&self, part: PartId) -> &GripperPart {
        &self.parts[part.index()]
    }

    /// Local transform of one part relative to the nominal palm frame.
    #[inline]
    pub fn local_transform(&self, part: PartId) -> &Isometry3<f64> {
        &self.parts[part.index()].local
    }

    /// World transform of one part for a given palm-frame pose.
    ///
    /// Fixed composition: `world = pose * local`.
    #[inline]
    pub fn world_transform(&self, part: PartId, pose: &Isometry3<f64>) -> Isometry3<f64> {
        pose * self.parts[part.index()].local
    }
}

/// Finger local transform: the palm's local frame composed with a
/// translation mirrored in z by `side` (+1 for finger 1, -1 for finger 2).
fn finger_local(
    reference: &Isometry3<f64>,
    calibration: &GripperCalibration,
    shape: &GripperShape,
    opening: f64,
    side: f64,
) -> Isometry3<f64> {
    reference
        * Isometry3::from(Translation3::new(
            calibration.finger_forward,
            calibration.finger_lateral,
            side * (opening + shape.z2l / 2.0),
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Triangle;
    use approx::assert_relative_eq;

    fn plate_mesh() -> MeshModel {
        MeshModel::from_triangles([
            Triangle::from_coords([-0.01, -0.01, 0.0], [0.01, -0.01, 0.0], [0.01, 0.01, 0.0]),
            Triangle::from_coords([-0.01, -0.01, 0.0], [0.01, 0.01, 0.0], [-0.01, 0.01, 0.0]),
        ])
        .unwrap()
    }

    fn identity_model() -> GripperModel {
        GripperModel::new(
            GripperShape::default(),
            GripperCalibration::identity(),
            plate_mesh(),
            plate_mesh(),
            plate_mesh(),
        )
        .unwrap()
    }

    #[test]
    fn test_identity_calibration_reference_is_identity() {
        let t = GripperCalibration::identity().reference_transform();
        assert_relative_eq!(
            t.to_homogeneous(),
            Isometry3::identity().to_homogeneous(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_width_change_is_idempotent() {
        let model = identity_model();
        let a = model.with_width(0.03).unwrap();
        let b = a.with_width(0.03).unwrap();

        assert_eq!(
            a.local_transform(PartId::Finger1),
            b.local_transform(PartId::Finger1)
        );
        assert_eq!(
            a.local_transform(PartId::Finger2),
            b.local_transform(PartId::Finger2)
        );
        assert_eq!(a.opening(), b.opening());
    }

    #[test]
    fn test_width_change_is_symmetric() {
        let model = identity_model().with_width(0.02).unwrap();
        let z1 = model.local_transform(PartId::Finger1).translation.z;
        let z2 = model.local_transform(PartId::Finger2).translation.z;
        assert_relative_eq!(z1, -z2, epsilon = 1e-15);
        assert_relative_eq!(
            z1,
            0.02 + GripperShape::default().z2l / 2.0,
            epsilon = 1e-15
        );
        // Palm untouched.
        assert_eq!(
            model.local_transform(PartId::Palm),
            identity_model().local_transform(PartId::Palm)
        );
    }

    #[test]
    fn test_width_change_rejects_non_finite() {
        let model = identity_model();
        assert!(model.with_width(f64::NAN).is_err());
        assert!(model.with_width(-0.01).is_err());
    }

    #[test]
    fn test_world_transform_composes_pose_on_left() {
        let shape = GripperShape::default();
        let model = GripperModel::new(
            shape,
            GripperCalibration::default(),
            plate_mesh(),
            plate_mesh(),
            plate_mesh(),
        )
        .unwrap();

        let pose = Isometry3::new(
            Vector3::new(0.3, -0.1, 0.5),
            Vector3::new(0.2, 0.7, -0.4),
        );
        for part in PartId::ALL {
            let expected = pose * model.local_transform(part);
            assert_relative_eq!(
                model.world_transform(part, &pose).to_homogeneous(),
                expected.to_homogeneous(),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_palm_normal_is_approach_axis_at_identity() {
        let shape = GripperShape::default();
        let identity = Isometry3::identity();
        let n = shape.palm_normal(&identity);
        assert_relative_eq!(n, Vector3::x(), epsilon = 1e-15);
        assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-15);
    }

    #[test]
    fn test_finger_plane_normals_are_negations() {
        let shape = GripperShape::default();
        let identity = Isometry3::identity();
        let n1 = shape.finger1_plane(&identity).normal;
        let n2 = shape.finger2_plane(&identity).normal;
        assert_relative_eq!(n1, -n2, epsilon = 1e-15);
        assert_relative_eq!(n1, Vector3::z(), epsilon = 1e-15);
    }

    #[test]
    fn test_palm_plane_geometry_at_identity() {
        let shape = GripperShape::default();
        let identity = Isometry3::identity();
        let plane = shape.palm_plane(&identity);

        for corner in &plane.corners {
            assert_relative_eq!(corner.x, -shape.d, epsilon = 1e-15);
        }
        assert_relative_eq!(plane.normal, -Vector3::x(), epsilon = 1e-15);
        assert_relative_eq!(
            shape.palm_origin(&identity),
            Point3::new(-shape.d, 0.0, 0.0),
            epsilon = 1e-15
        );
    }

    #[test]
    fn test_plane_normal_ignores_translation() {
        let shape = GripperShape::default();
        let shifted = Isometry3::translation(1.0, 2.0, 3.0);
        let plane = shape.finger1_plane(&shifted);
        assert_relative_eq!(plane.normal, Vector3::z(), epsilon = 1e-15);
        // Corners do move.
        assert_relative_eq!(plane.corners[0].y, 2.0 - shape.y1l / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_contact_plane_dispatch() {
        let shape = GripperShape::default();
        let identity = Isometry3::identity();
        assert_eq!(
            shape.contact_plane(PlaneKind::Palm, &identity),
            shape.palm_plane(&identity)
        );
        assert_eq!(
            shape.contact_plane(PlaneKind::Finger1, &identity),
            shape.finger1_plane(&identity)
        );
        assert_eq!(
            shape.contact_plane(PlaneKind::Finger2, &identity),
            shape.finger2_plane(&identity)
        );
    }

    #[test]
    fn test_default_calibration_reference_transform_is_isometry() {
        let t = GripperCalibration::default().reference_transform();
        // Rotation block stays orthonormal under composition and inverse.
        let r = t.rotation.to_rotation_matrix();
        let should_be_identity = r.matrix() * r.matrix().transpose();
        assert_relative_eq!(should_be_identity, Matrix3::identity(), epsilon = 1e-12);
    }
}
