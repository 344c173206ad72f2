//! Benchmarks for the field and parametrization pipeline.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use quadfield::algo::cut::{cut_mesh, cut_mesh_from_singularities};
use quadfield::algo::field::{comb_cross_field, cross_field_mismatch};
use quadfield::prelude::*;

fn create_grid_mesh(n: usize) -> TriMesh {
    let mut vertices = Vec::with_capacity((n + 1) * (n + 1));
    let mut faces = Vec::with_capacity(n * n * 2);

    // Gently curved so the field is not trivially constant
    for j in 0..=n {
        for i in 0..=n {
            let (x, y) = (i as f64 / n as f64, j as f64 / n as f64);
            vertices.push(Point3::new(x, y, 0.2 * (x * x - y * y)));
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

fn bench_field(c: &mut Criterion) {
    let mut group = c.benchmark_group("field");
    for n in [16, 32] {
        let mesh = create_grid_mesh(n);
        let adjacency = TriangleAdjacency::new(&mesh).unwrap();
        let directions = vec![Vector3::new(1.0, 0.3, 0.0); mesh.num_faces()];

        group.bench_with_input(BenchmarkId::new("nrosy", n), &mesh, |b, mesh| {
            let hard = [(0, Vector3::x())];
            b.iter(|| nrosy(mesh, &hard, &[], &NRosyOptions::default()).unwrap())
        });

        group.bench_with_input(BenchmarkId::new("comb_and_cut", n), &mesh, |b, mesh| {
            b.iter(|| {
                let combed = comb_cross_field(mesh, &adjacency, &directions).unwrap();
                let mismatch = cross_field_mismatch(mesh, &adjacency, &combed, true).unwrap();
                let seams = cut_mesh_from_singularities(mesh, &adjacency, &mismatch).unwrap();
                cut_mesh(mesh, &adjacency, &seams).unwrap()
            })
        });
    }
    group.finish();
}

fn bench_miq(c: &mut Criterion) {
    let mut group = c.benchmark_group("miq");
    group.sample_size(10);
    for n in [8, 16] {
        let mesh = create_grid_mesh(n);
        let field = nrosy(&mesh, &[(0, Vector3::x())], &[], &NRosyOptions::default())
            .unwrap()
            .frame_field();
        let options = MiqOptions::default().with_iterations(2);

        group.bench_with_input(BenchmarkId::from_parameter(n), &mesh, |b, mesh| {
            b.iter(|| miq_from_frame_field(mesh, &field, &options).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_field, bench_miq);
criterion_main!(benches);
