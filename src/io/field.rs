//! Plain-text per-face vector fields.
//!
//! One face per line, three whitespace-separated components. Blank lines
//! and lines starting with `#` are ignored.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use nalgebra::Vector3;

use crate::error::{MeshError, Result};

/// Write one vector per face.
pub fn save_face_vectors<P: AsRef<Path>>(vectors: &[Vector3<f64>], path: P) -> Result<()> {
    let mut out = BufWriter::new(File::create(path.as_ref())?);
    for v in vectors {
        writeln!(out, "{} {} {}", v.x, v.y, v.z)?;
    }
    out.flush()?;
    Ok(())
}

/// Read a file written by [`save_face_vectors`].
pub fn load_face_vectors<P: AsRef<Path>>(path: P) -> Result<Vec<Vector3<f64>>> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let mut vectors = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let values: Vec<f64> = line
            .split_whitespace()
            .map(str::parse)
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| MeshError::LoadError {
                path: path.to_path_buf(),
                message: format!("line {}: {}", i + 1, e),
            })?;
        if values.len() != 3 {
            return Err(MeshError::LoadError {
                path: path.to_path_buf(),
                message: format!("line {}: expected 3 components, found {}", i + 1, values.len()),
            });
        }
        vectors.push(Vector3::new(values[0], values[1], values[2]));
    }
    Ok(vectors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::temp_path;

    #[test]
    fn test_comments_and_bad_lines() {
        let path = temp_path("field.txt");
        std::fs::write(&path, "# pd1\n1 0 0\n\n0 1 0.5\n").unwrap();
        let field = load_face_vectors(&path).unwrap();
        assert_eq!(field, vec![Vector3::x(), Vector3::new(0.0, 1.0, 0.5)]);

        save_face_vectors(&field, &path).unwrap();
        assert_eq!(load_face_vectors(&path).unwrap(), field);

        std::fs::write(&path, "1 0\n").unwrap();
        assert!(matches!(load_face_vectors(&path), Err(MeshError::LoadError { .. })));
        std::fs::write(&path, "1 0 x\n").unwrap();
        assert!(matches!(load_face_vectors(&path), Err(MeshError::LoadError { .. })));
        std::fs::remove_file(&path).ok();
    }
}
