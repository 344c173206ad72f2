//! Per-wedge texture coordinates.
//!
//! A seamless parametrization assigns coordinates to the vertices of the cut
//! mesh, so one original vertex on a seam carries several coordinates. The
//! faces of [`SeamlessUv`] index into its own coordinate array.

use nalgebra::Point2;

/// Texture coordinates of a cut mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct SeamlessUv {
    coords: Vec<Point2<f64>>,
    faces: Vec<[usize; 3]>,
}

impl SeamlessUv {
    /// Wrap per-cut-vertex coordinates and the faces indexing them.
    pub fn new(coords: Vec<Point2<f64>>, faces: Vec<[usize; 3]>) -> Self {
        Self { coords, faces }
    }

    /// Number of coordinates.
    #[inline]
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    /// Whether there are no coordinates.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Coordinates of cut vertex `i`.
    #[inline]
    pub fn get(&self, i: usize) -> Point2<f64> {
        self.coords[i]
    }

    /// Coordinates of every cut vertex.
    pub fn coords(&self) -> &[Point2<f64>] {
        &self.coords
    }

    /// Per-face texture coordinate indices.
    pub fn faces(&self) -> &[[usize; 3]] {
        &self.faces
    }

    /// Coordinates of the three corners of face `f`.
    pub fn face_uvs(&self, f: usize) -> [Point2<f64>; 3] {
        self.faces[f].map(|i| self.coords[i])
    }

    /// Twice the signed area of face `f` in the parameter domain.
    pub fn signed_double_area(&self, f: usize) -> f64 {
        let [a, b, c] = self.face_uvs(f);
        let e0 = b - a;
        let e1 = c - a;
        e0.x * e1.y - e0.y * e1.x
    }

    /// Whether face `f` is flipped (or collapsed) in the parameter domain.
    #[inline]
    pub fn is_flipped(&self, f: usize) -> bool {
        self.signed_double_area(f) <= 0.0
    }

    /// Number of flipped faces.
    pub fn num_flipped(&self) -> usize {
        (0..self.faces.len()).filter(|&f| self.is_flipped(f)).count()
    }

    /// Axis-aligned bounds of the coordinates, `None` when empty.
    pub fn bounding_box(&self) -> Option<(Point2<f64>, Point2<f64>)> {
        let first = *self.coords.first()?;
        Some(self.coords.iter().fold((first, first), |(min, max), uv| {
            (
                Point2::new(min.x.min(uv.x), min.y.min(uv.y)),
                Point2::new(max.x.max(uv.x), max.y.max(uv.y)),
            )
        }))
    }

    /// Scale every coordinate uniformly.
    ///
    /// Integer grid lines stay aligned with the seams only for integer
    /// factors.
    pub fn scale(&mut self, factor: f64) {
        for uv in &mut self.coords {
            uv.x *= factor;
            uv.y *= factor;
        }
    }

    /// Fit the coordinates into `[0, 1]` keeping the aspect ratio.
    pub fn normalize(&mut self) {
        if let Some((min, max)) = self.bounding_box() {
            let extent = (max.x - min.x).max(max.y - min.y);
            if extent > 1e-10 {
                for uv in &mut self.coords {
                    uv.x = (uv.x - min.x) / extent;
                    uv.y = (uv.y - min.y) / extent;
                }
            }
        }
    }

    /// Total unsigned area in the parameter domain.
    pub fn total_area(&self) -> f64 {
        (0..self.faces.len())
            .map(|f| 0.5 * self.signed_double_area(f).abs())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> SeamlessUv {
        SeamlessUv::new(
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(2.0, 0.0),
                Point2::new(0.0, 2.0),
                Point2::new(2.0, 2.0),
            ],
            vec![[0, 1, 2], [2, 1, 3]],
        )
    }

    #[test]
    fn test_orientation() {
        let mut uv = square();
        assert_eq!(uv.num_flipped(), 0);
        assert!((uv.signed_double_area(0) - 4.0).abs() < 1e-12);

        uv.coords[3] = Point2::new(-1.0, -1.0);
        assert!(uv.is_flipped(1));
        assert_eq!(uv.num_flipped(), 1);
    }

    #[test]
    fn test_collapsed_face_counts_as_flipped() {
        let uv = SeamlessUv::new(vec![Point2::origin(); 3], vec![[0, 1, 2]]);
        assert!(uv.is_flipped(0));
    }

    #[test]
    fn test_normalize_and_area() {
        let mut uv = square();
        assert!((uv.total_area() - 4.0).abs() < 1e-12);
        uv.normalize();
        let (min, max) = uv.bounding_box().unwrap();
        assert!(min.x.abs() < 1e-12 && min.y.abs() < 1e-12);
        assert!((max.x - 1.0).abs() < 1e-12 && (max.y - 1.0).abs() < 1e-12);
        assert!((uv.total_area() - 1.0).abs() < 1e-12);

        uv.scale(3.0);
        assert!((uv.get(3).x - 3.0).abs() < 1e-12);
    }
}
