//! Small meshes shared by the unit tests.

use std::f64::consts::PI;

use nalgebra::Point3;

use super::TriMesh;

pub fn single_triangle() -> TriMesh {
    TriMesh::new(
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ],
        vec![[0, 1, 2]],
    )
    .unwrap()
}

/// Unit square split along the 1-2 diagonal.
pub fn two_triangles() -> TriMesh {
    TriMesh::new(
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
        ],
        vec![[0, 1, 2], [2, 1, 3]],
    )
    .unwrap()
}

/// Flat `n` x `n` grid in the z = 0 plane, unit spacing.
pub fn grid(n: usize) -> TriMesh {
    let mut vertices = Vec::with_capacity((n + 1) * (n + 1));
    let mut faces = Vec::with_capacity(n * n * 2);

    for j in 0..=n {
        for i in 0..=n {
            vertices.push(Point3::new(i as f64, j as f64, 0.0));
        }
    }

    for j in 0..n {
        for i in 0..n {
            let v00 = j * (n + 1) + i;
            let v10 = v00 + 1;
            let v01 = v00 + (n + 1);
            let v11 = v01 + 1;

            faces.push([v00, v10, v11]);
            faces.push([v00, v11, v01]);
        }
    }

    TriMesh::new(vertices, faces).unwrap()
}

/// Closed fan of `n` triangles around vertex 0, lifted to a cone of height `h`.
pub fn fan(n: usize, h: f64) -> TriMesh {
    let mut vertices = vec![Point3::new(0.0, 0.0, h)];
    for i in 0..n {
        let t = 2.0 * PI * i as f64 / n as f64;
        vertices.push(Point3::new(t.cos(), t.sin(), 0.0));
    }
    let faces = (0..n).map(|i| [0, 1 + i, 1 + (i + 1) % n]).collect();
    TriMesh::new(vertices, faces).unwrap()
}

/// Unit cube, two triangles per side, outward normals.
pub fn cube() -> TriMesh {
    let vertices = (0..8)
        .map(|i| {
            Point3::new(
                (i & 1) as f64,
                ((i >> 1) & 1) as f64,
                ((i >> 2) & 1) as f64,
            )
        })
        .collect();
    let faces = vec![
        [0, 2, 3],
        [0, 3, 1], // z = 0
        [4, 5, 7],
        [4, 7, 6], // z = 1
        [0, 1, 5],
        [0, 5, 4], // y = 0
        [2, 6, 7],
        [2, 7, 3], // y = 1
        [0, 4, 6],
        [0, 6, 2], // x = 0
        [1, 3, 7],
        [1, 7, 5], // x = 1
    ];
    TriMesh::new(vertices, faces).unwrap()
}

pub fn octahedron() -> TriMesh {
    let vertices = vec![
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(-1.0, 0.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(0.0, -1.0, 0.0),
        Point3::new(0.0, 0.0, 1.0),
        Point3::new(0.0, 0.0, -1.0),
    ];
    let faces = vec![
        [0, 2, 4],
        [2, 1, 4],
        [1, 3, 4],
        [3, 0, 4],
        [2, 0, 5],
        [1, 2, 5],
        [3, 1, 5],
        [0, 3, 5],
    ];
    TriMesh::new(vertices, faces).unwrap()
}
