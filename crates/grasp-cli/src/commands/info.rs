//! grasp info command - display mesh statistics.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use grasp_check::MeshModel;

use crate::Cli;

pub fn run(input: &Path, scale: f64, cli: &Cli) -> Result<()> {
    let mesh = MeshModel::from_stl(input, scale)
        .with_context(|| format!("Failed to load mesh from {:?}", input))?;

    if cli.quiet {
        return Ok(());
    }

    println!("{}", "Mesh Information".bold().underline());
    println!("  {}: {}", "File".cyan(), input.display());
    println!("  {}: {}", "Vertices".cyan(), mesh.vertex_count());
    println!("  {}: {}", "Faces".cyan(), mesh.face_count());
    println!("  {}: {:.6} m^2", "Surface area".cyan(), mesh.surface_area());

    if let Some((min, max)) = mesh.bounds() {
        let dims = max - min;
        println!(
            "  {}: {:.4} x {:.4} x {:.4} m",
            "Dimensions".cyan(),
            dims.x,
            dims.y,
            dims.z
        );
        println!(
            "  {}: ({:.4}, {:.4}, {:.4})",
            "Min bounds".cyan(),
            min.x,
            min.y,
            min.z
        );
        println!(
            "  {}: ({:.4}, {:.4}, {:.4})",
            "Max bounds".cyan(),
            max.x,
            max.y,
            max.z
        );
        println!(
            "  {}: {:.4} m",
            "Bounding radius".cyan(),
            mesh.bounding_radius()
        );

        let max_dim = dims.x.max(dims.y).max(dims.z);
        if max_dim > 10.0 {
            println!(
                "  {}: largest dimension is {:.1} m - was this mesh authored in millimeters? Try --scale 0.001",
                "Warning".yellow(),
                max_dim
            );
        }
    }

    Ok(())
}
