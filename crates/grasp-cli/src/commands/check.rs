//! grasp check command - evaluate candidate poses against an object mesh.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use grasp_check::{
    CheckerConfig, CollisionChecker, CollisionPolicy, GripperCalibration, GripperModel,
    GripperShape, MeshModel, PartId,
};
use nalgebra::{Isometry3, Vector3};

use crate::Cli;

pub struct CheckArgs {
    pub object: PathBuf,
    pub object_scale: f64,
    pub palm: PathBuf,
    pub finger1: PathBuf,
    pub finger2: PathBuf,
    pub mesh_scale: f64,
    pub width: Option<f64>,
    pub identity_calibration: bool,
    pub parts: String,
    pub evaluate_all: bool,
    pub poses: Vec<String>,
}

/// Parse "x,y,z,roll,pitch,yaw" into an isometry (meters / radians,
/// intrinsic roll-pitch-yaw).
fn parse_pose(spec: &str) -> Result<Isometry3<f64>> {
    let values: Vec<f64> = spec
        .split(',')
        .map(|s| s.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .with_context(|| format!("invalid pose component in {spec:?}"))?;
    if values.len() != 6 {
        bail!("pose {spec:?} must have exactly 6 components: x,y,z,roll,pitch,yaw");
    }
    let rotation =
        nalgebra::UnitQuaternion::from_euler_angles(values[3], values[4], values[5]);
    Ok(Isometry3::from_parts(
        nalgebra::Translation3::from(Vector3::new(values[0], values[1], values[2])),
        rotation,
    ))
}

fn parse_parts(spec: &str) -> Result<Vec<PartId>> {
    spec.split(',')
        .map(|s| match s.trim() {
            "palm" => Ok(PartId::Palm),
            "finger1" => Ok(PartId::Finger1),
            "finger2" => Ok(PartId::Finger2),
            other => bail!("unknown gripper part {other:?} (expected palm, finger1, finger2)"),
        })
        .collect()
}

pub fn run(args: &CheckArgs, cli: &Cli) -> Result<()> {
    let target = MeshModel::from_stl(&args.object, args.object_scale)
        .with_context(|| format!("Failed to load object mesh from {:?}", args.object))?;

    let load_part = |path: &PathBuf| {
        MeshModel::from_stl(path, args.mesh_scale)
            .with_context(|| format!("Failed to load gripper part mesh from {path:?}"))
    };
    let palm = load_part(&args.palm)?;
    let finger1 = load_part(&args.finger1)?;
    let finger2 = load_part(&args.finger2)?;

    let calibration = if args.identity_calibration {
        GripperCalibration::identity()
    } else {
        GripperCalibration::default()
    };

    let mut gripper =
        GripperModel::new(GripperShape::default(), calibration, palm, finger1, finger2)?;
    if let Some(width) = args.width {
        gripper = gripper.with_width(width)?;
    }

    let config = CheckerConfig {
        parts: parse_parts(&args.parts)?,
        policy: if args.evaluate_all {
            CollisionPolicy::EvaluateAll
        } else {
            CollisionPolicy::StopAtFirstHit
        },
    };

    let mut checker = CollisionChecker::with_config(config);
    checker.set_target(&target)?;
    checker.set_gripper(gripper);

    let poses: Vec<Isometry3<f64>> = args
        .poses
        .iter()
        .map(|spec| parse_pose(spec))
        .collect::<Result<_>>()?;

    let reports = checker.check_batch(&poses)?;

    let mut feasible_count = 0;
    for (spec, report) in args.poses.iter().zip(&reports) {
        if report.feasible {
            feasible_count += 1;
        }
        if !cli.quiet {
            let verdict = if report.feasible {
                "feasible".green().bold()
            } else {
                "collision".red().bold()
            };
            print!("  {} {}", spec.cyan(), verdict);
            if !report.feasible {
                let parts: Vec<String> = report
                    .collisions
                    .iter()
                    .map(|c| format!("{} (part {})", c.part, c.part.index()))
                    .collect();
                print!(" in {}", parts.join(", "));
            }
            println!();
        }
    }

    if !cli.quiet {
        println!(
            "{}: {}/{} pose(s) feasible",
            "Summary".bold(),
            feasible_count,
            reports.len()
        );
    }

    Ok(())
}
