//! Wavefront OBJ format support.
//!
//! Loading goes through `tobj` and merges all objects of the file into one
//! mesh. Saving is written by hand so that a seamless parametrization can be
//! stored as per-corner texture coordinates (`f v/vt`).

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use nalgebra::Point3;

use crate::algo::cut::CutMesh;
use crate::algo::parameterize::SeamlessUv;
use crate::error::{MeshError, Result};
use crate::mesh::TriMesh;

/// Load a triangle mesh from an OBJ file.
///
/// Polygons are fan-triangulated.
pub fn load<P: AsRef<Path>>(path: P) -> Result<TriMesh> {
    let path = path.as_ref();
    let options = tobj::LoadOptions {
        triangulate: true,
        ..Default::default()
    };
    let (models, _) = tobj::load_obj(path, &options).map_err(|e| MeshError::LoadError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut vertices = Vec::new();
    let mut faces = Vec::new();
    for model in models {
        let mesh = model.mesh;
        if mesh.positions.len() % 3 != 0 {
            return Err(MeshError::LoadError {
                path: path.to_path_buf(),
                message: format!("{} coordinates do not form points", mesh.positions.len()),
            });
        }
        let offset = vertices.len();
        vertices.extend(
            mesh.positions
                .chunks_exact(3)
                .map(|p| Point3::new(p[0], p[1], p[2])),
        );
        faces.extend(mesh.indices.chunks_exact(3).map(|t| {
            [
                offset + t[0] as usize,
                offset + t[1] as usize,
                offset + t[2] as usize,
            ]
        }));
    }

    if faces.is_empty() {
        return Err(MeshError::LoadError {
            path: path.to_path_buf(),
            message: "OBJ file contains no faces".to_string(),
        });
    }
    TriMesh::new(vertices, faces)
}

fn write_vertices<W: Write>(out: &mut W, vertices: &[Point3<f64>]) -> std::io::Result<()> {
    for p in vertices {
        writeln!(out, "v {} {} {}", p.x, p.y, p.z)?;
    }
    Ok(())
}

/// Save a mesh to an OBJ file.
pub fn save<P: AsRef<Path>>(mesh: &TriMesh, path: P) -> Result<()> {
    let mut out = BufWriter::new(File::create(path.as_ref())?);
    write_vertices(&mut out, mesh.vertices())?;
    for [a, b, c] in mesh.faces() {
        writeln!(out, "f {} {} {}", a + 1, b + 1, c + 1)?;
    }
    out.flush()?;
    Ok(())
}

/// Save a mesh with the seamless coordinates of its cut.
///
/// Positions are those of the uncut `mesh`; every face corner references
/// its position and its own texture coordinate, so seams stay closed in 3D
/// while the parametrization is discontinuous across them.
///
/// # Errors
///
/// Returns [`MeshError::InvalidInput`] if `cut` or `uv` do not match `mesh`.
pub fn save_with_uvs<P: AsRef<Path>>(
    mesh: &TriMesh,
    cut: &CutMesh,
    uv: &SeamlessUv,
    path: P,
) -> Result<()> {
    if cut.num_faces() != mesh.num_faces() || uv.faces().len() != mesh.num_faces() {
        return Err(MeshError::InvalidInput(format!(
            "mesh has {} faces, cut {} and parametrization {}",
            mesh.num_faces(),
            cut.num_faces(),
            uv.faces().len()
        )));
    }

    let mut out = BufWriter::new(File::create(path.as_ref())?);
    write_vertices(&mut out, mesh.vertices())?;
    for t in uv.coords() {
        writeln!(out, "vt {} {}", t.x, t.y)?;
    }
    for (face, tex) in cut.faces.iter().zip(uv.faces()) {
        let v = face.map(|c| cut.original_vertex[c] + 1);
        writeln!(
            out,
            "f {}/{} {}/{} {}/{}",
            v[0],
            tex[0] + 1,
            v[1],
            tex[1] + 1,
            v[2],
            tex[2] + 1
        )?;
    }
    out.flush()?;
    Ok(())
}
