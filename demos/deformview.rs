//! deformview: interactive viewer for meshes with scalar and vector fields
//!
//! Keys: T cycles the colouring field, G toggles glyphs, D steps the warp,
//! O steps the opacity, A records the deformation as a GIF, Q quits.

use anyhow::{Context, Result};
use clap::Parser;
use deformview_core::{PolyData, Transform3D, Transformable, Vector3f};
use deformview_visualization::{load_input, plot, MeshInput, ViewerConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "deformview")]
#[command(about = "Interactive viewer for deforming meshes (.vtk, .obj, .ply)")]
struct Cli {
    /// Primary mesh files; several are appended and coloured by input
    #[arg(required = true)]
    primary: Vec<PathBuf>,

    /// Secondary mesh files shown alongside for comparison
    #[arg(long, num_args = 1..)]
    secondary: Vec<PathBuf>,

    /// Opacity of the surfaces, in [0, 1]
    #[arg(long, default_value_t = 0.5)]
    opacity: f32,

    /// Rotate the secondary meshes about X by this many degrees; without
    /// --secondary, rotated copies of the primary meshes are shown instead
    #[arg(long)]
    rotate_x: Option<f32>,

    /// Directory receiving captured animations
    #[arg(long)]
    animation_dir: Option<PathBuf>,
}

fn rotated(input: MeshInput, degrees: f32) -> MeshInput {
    let transform = Transform3D::rotation_wxyz(degrees, Vector3f::x());
    let rotate = |mut mesh: PolyData| {
        mesh.transform(&transform);
        mesh
    };
    match input {
        MeshInput::Single(mesh) => MeshInput::Single(rotate(mesh)),
        MeshInput::List(meshes) => MeshInput::List(meshes.into_iter().map(rotate).collect()),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if !(0.0..=1.0).contains(&cli.opacity) {
        anyhow::bail!("--opacity must be within [0, 1], got {}", cli.opacity);
    }

    let primary = load_input(&cli.primary).context("failed to read primary meshes")?;
    let secondary = if !cli.secondary.is_empty() {
        let input = load_input(&cli.secondary).context("failed to read secondary meshes")?;
        Some(match cli.rotate_x {
            Some(degrees) => rotated(input, degrees),
            None => input,
        })
    } else {
        cli.rotate_x.map(|degrees| rotated(primary.clone(), degrees))
    };

    let mut config = ViewerConfig {
        opacity: cli.opacity,
        ..ViewerConfig::default()
    };
    if let Some(dir) = cli.animation_dir {
        config.animation_dir = dir;
    }

    tracing::info!("Press T, G, D, O, A or Q in the window");
    plot(primary, secondary, config)?;
    Ok(())
}
