//! grasp: command-line front end for the collision feasibility engine.
//!
//! Suitable for scripted batch checks and quick inspection of candidate
//! grasp poses against an object mesh.
//!
//! # Logging
//!
//! Set `RUST_LOG` or pass `-v` flags to control log output:
//! - `RUST_LOG=grasp_check=info` - Basic operation logging
//! - `RUST_LOG=grasp_check=debug` - Per-part collision verdicts
//!
//! # Example
//!
//! ```bash
//! grasp check --object object.stl --object-scale 0.001 \
//!     --palm palm.stl --finger1 left.stl --finger2 right.stl \
//!     --pose 0.1,0,0.05,0,1.57,0 --pose 0.2,0,0.05,0,1.57,0
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{check, info};

/// grasp - collision feasibility checks for parallel-jaw grasp candidates.
#[derive(Parser)]
#[command(name = "grasp")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Suppress all non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Increase output verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Display mesh statistics and information
    Info {
        /// Input mesh file (STL)
        input: PathBuf,

        /// Unit-conversion multiplier applied to every coordinate
        #[arg(long, default_value = "1.0")]
        scale: f64,
    },

    /// Evaluate grasp-pose feasibility against an object mesh
    Check {
        /// Target object mesh (STL)
        #[arg(long)]
        object: PathBuf,

        /// Unit-conversion multiplier for the object mesh
        #[arg(long, default_value = "1.0")]
        object_scale: f64,

        /// Palm/base part mesh (STL)
        #[arg(long)]
        palm: PathBuf,

        /// First finger part mesh (STL)
        #[arg(long)]
        finger1: PathBuf,

        /// Second finger part mesh (STL)
        #[arg(long)]
        finger2: PathBuf,

        /// Unit-conversion multiplier for the gripper part meshes
        #[arg(long, default_value = "1.0")]
        mesh_scale: f64,

        /// Gripper opening half-width in meters (defaults to the shape's
        /// rest half-opening)
        #[arg(long)]
        width: Option<f64>,

        /// Use the identity mounting calibration instead of the built-in
        /// device calibration
        #[arg(long)]
        identity_calibration: bool,

        /// Comma-separated parts to evaluate (palm, finger1, finger2)
        #[arg(long, default_value = "palm,finger1,finger2")]
        parts: String,

        /// Evaluate all configured parts instead of stopping at the first
        /// collision
        #[arg(long)]
        evaluate_all: bool,

        /// Candidate pose as x,y,z,roll,pitch,yaw (meters/radians); may be
        /// given multiple times
        #[arg(long, required = true)]
        pose: Vec<String>,
    },
}

fn init_logging(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("grasp_check=info"),
        2 => EnvFilter::new("grasp_check=debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Info { input, scale } => info::run(input, *scale, &cli),
        Commands::Check {
            object,
            object_scale,
            palm,
            finger1,
            finger2,
            mesh_scale,
            width,
            identity_calibration,
            parts,
            evaluate_all,
            pose,
        } => check::run(
            &check::CheckArgs {
                object: object.clone(),
                object_scale: *object_scale,
                palm: palm.clone(),
                finger1: finger1.clone(),
                finger2: finger2.clone(),
                mesh_scale: *mesh_scale,
                width: *width,
                identity_calibration: *identity_calibration,
                parts: parts.clone(),
                evaluate_all: *evaluate_all,
                poses: pose.clone(),
            },
            &cli,
        ),
    };

    if let Err(e) = &result {
        if !cli.quiet {
            if let Some(grasp_err) = e.downcast_ref::<grasp_check::GraspError>() {
                eprintln!("{}: {}", "Error".red().bold(), grasp_err);
            } else {
                eprintln!("{}: {}", "Error".red().bold(), e);
                for cause in e.chain().skip(1) {
                    eprintln!("  {}: {}", "Caused by".yellow(), cause);
                }
            }
        }
        std::process::exit(1);
    }

    Ok(())
}
