//! Quadfield CLI - cross fields and seamless parametrizations.
//!
//! Usage: quadfield <COMMAND> [OPTIONS] <INPUT> [OUTPUT]
//!
//! Run `quadfield --help` for available commands.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand};
use nalgebra::Vector3;

use quadfield::algo::field::FrameField;
use quadfield::algo::nrosy::{nrosy, NRosyOptions, NRosyResult};
use quadfield::algo::parameterize::{miq_from_frame_field, MiqOptions};
use quadfield::io;
use quadfield::mesh::geometry::{double_areas, face_normals};
use quadfield::mesh::{TriMesh, TriangleAdjacency};

#[derive(Parser)]
#[command(name = "quadfield")]
#[command(author, version, about = "Cross field and seamless parametrization CLI", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display mesh information
    Info {
        /// Input mesh file
        input: PathBuf,
    },

    /// Interpolate an N-RoSy field from face constraints
    Nrosy {
        /// Input mesh file
        input: PathBuf,

        /// Hard constraint as `face,x,y,z` (repeatable; default: face 0 along its first edge)
        #[arg(long = "hard", value_parser = parse_constraint)]
        hard: Vec<(usize, Vector3<f64>)>,

        /// Rotational symmetry
        #[arg(short, long, default_value = "4")]
        n: usize,

        /// Write one field vector per face to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compute a seamless parametrization and save it as a textured OBJ
    Miq {
        /// Input mesh file
        input: PathBuf,

        /// Output OBJ file
        output: PathBuf,

        /// Per-face cross field direction file (default: interpolate one)
        #[arg(short, long, conflicts_with = "hard")]
        field: Option<PathBuf>,

        /// Hard constraint for the interpolated field as `face,x,y,z`
        #[arg(long = "hard", value_parser = parse_constraint)]
        hard: Vec<(usize, Vector3<f64>)>,

        /// Target edge length of the parametrization relative to the bounding box
        #[arg(short, long, default_value = "30")]
        gradient_size: f64,

        /// Number of stiffening iterations
        #[arg(short, long, default_value = "5")]
        iterations: usize,

        /// Round all integer variables at once
        #[arg(long)]
        direct_rounding: bool,
    },
}

fn parse_constraint(s: &str) -> Result<(usize, Vector3<f64>), String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        return Err(format!("expected face,x,y,z but got '{}'", s));
    }
    let face = parts[0]
        .parse()
        .map_err(|e| format!("invalid face '{}': {}", parts[0], e))?;
    let mut v = [0.0; 3];
    for (slot, part) in v.iter_mut().zip(&parts[1..]) {
        *slot = part
            .parse()
            .map_err(|e| format!("invalid component '{}': {}", part, e))?;
    }
    Ok((face, Vector3::new(v[0], v[1], v[2])))
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Info { input } => cmd_info(&input)?,

        Commands::Nrosy {
            input,
            hard,
            n,
            output,
        } => cmd_nrosy(&input, hard, n, output.as_deref())?,

        Commands::Miq {
            input,
            output,
            field,
            hard,
            gradient_size,
            iterations,
            direct_rounding,
        } => {
            let options = MiqOptions::default()
                .with_gradient_size(gradient_size)
                .with_iterations(iterations)
                .with_direct_rounding(direct_rounding);
            cmd_miq(&input, &output, field.as_deref(), hard, &options)?;
        }
    }

    Ok(())
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mesh: TriMesh = io::load(input)?;
    let adjacency = TriangleAdjacency::new(&mesh)?;

    println!("File: {}", input.display());
    println!("Vertices: {}", mesh.num_vertices());
    println!("Faces: {}", mesh.num_faces());

    let areas = double_areas(&mesh);
    let total_area: f64 = areas.iter().map(|a| 0.5 * a).sum();
    let min_area = areas.iter().cloned().fold(f64::INFINITY, f64::min) * 0.5;
    let max_area = areas.iter().cloned().fold(0.0_f64, f64::max) * 0.5;
    println!("Surface area: {:.6}", total_area);
    println!("Face area range: [{:.6}, {:.6}]", min_area, max_area);

    if let Some((min, max)) = mesh.bounding_box() {
        println!(
            "Bounding box: ({:.3}, {:.3}, {:.3}) to ({:.3}, {:.3}, {:.3})",
            min.x, min.y, min.z, max.x, max.y, max.z
        );
        println!("Diagonal: {:.6}", mesh.bounding_box_diagonal());
    }

    let (_, components) = adjacency.components();
    println!("Components: {}", components);

    let boundary = adjacency.boundary_vertices(mesh.faces(), mesh.num_vertices());
    let num_boundary = boundary.iter().filter(|&&b| b).count();
    if num_boundary == 0 {
        println!("Topology: Closed (no boundary)");
    } else {
        println!("Topology: Open ({} boundary vertices)", num_boundary);
    }

    let boundary_edges = (0..mesh.num_faces())
        .flat_map(|f| (0..3).map(move |k| (f, k)))
        .filter(|&(f, k)| adjacency.is_boundary_edge(f, k))
        .count();
    let num_edges = (3 * mesh.num_faces() + boundary_edges) / 2;
    let euler =
        mesh.num_referenced_vertices() as i64 - num_edges as i64 + mesh.num_faces() as i64;
    println!("Euler characteristic: {}", euler);

    Ok(())
}

fn interpolate(
    mesh: &TriMesh,
    mut hard: Vec<(usize, Vector3<f64>)>,
    n: usize,
) -> quadfield::Result<NRosyResult> {
    if hard.is_empty() {
        let [a, b, _] = mesh.face_positions(0);
        hard.push((0, b - a));
    }
    nrosy(mesh, &hard, &[], &NRosyOptions::default().with_n(n))
}

fn cmd_nrosy(
    input: &Path,
    hard: Vec<(usize, Vector3<f64>)>,
    n: usize,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mesh: TriMesh = io::load(input)?;
    println!("Loaded: {} vertices, {} faces", mesh.num_vertices(), mesh.num_faces());

    let start = Instant::now();
    let result = interpolate(&mesh, hard, n)?;
    let elapsed = start.elapsed();

    println!(
        "{}-RoSy field: {} singular vertices ({:.2?})",
        n,
        result.singular_vertices().count(),
        elapsed
    );
    for v in result.singular_vertices() {
        println!("  vertex {}: index {:+.3}", v, result.singularity_index[v]);
    }

    if let Some(output) = output {
        io::field::save_face_vectors(&result.field_per_face(), output)?;
        println!("Saved: {}", output.display());
    }

    Ok(())
}

fn cmd_miq(
    input: &Path,
    output: &Path,
    field: Option<&Path>,
    hard: Vec<(usize, Vector3<f64>)>,
    options: &MiqOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let mesh: TriMesh = io::load(input)?;
    println!("Loaded: {} vertices, {} faces", mesh.num_vertices(), mesh.num_faces());

    let start = Instant::now();
    let frame = match field {
        Some(path) => {
            let pd1 = io::field::load_face_vectors(path)?;
            if pd1.len() != mesh.num_faces() {
                return Err(format!(
                    "field has {} vectors but the mesh has {} faces",
                    pd1.len(),
                    mesh.num_faces()
                )
                .into());
            }
            let normals = face_normals(&mesh)?;
            let pd2 = normals.iter().zip(&pd1).map(|(n, d)| n.cross(d)).collect();
            FrameField { pd1, pd2 }
        }
        None => interpolate(&mesh, hard, 4)?.frame_field(),
    };

    let result = miq_from_frame_field(&mesh, &frame, options)?;
    let elapsed = start.elapsed();

    println!(
        "Parametrization: {} seam curves, {} flipped faces after {} solves ({:.2?})",
        result.num_curves, result.flipped_faces, result.iterations, elapsed
    );
    io::obj::save_with_uvs(&mesh, &result.cut, &result.uv, output)?;
    println!("Saved: {}", output.display());

    Ok(())
}
