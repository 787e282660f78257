//! Benchmarks for the frame transform and pose math

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use expression_bridge::{
    detector::{Category, DetectionResult},
    frame_transform::FrameTransform,
    name_mapper::MEDIAPIPE_TO_IFM,
    pose::{decompose_affine, matrix_from_rows, rotation_matrix_to_euler},
    tracking_data::TrackingData,
};
use nalgebra::Rotation3;

fn rotated_rows(roll: f64, pitch: f64, yaw: f64) -> [[f64; 4]; 4] {
    let rotation = Rotation3::from_euler_angles(roll, pitch, yaw);
    let mut rows = [[0.0; 4]; 4];
    for (r, row) in rows.iter_mut().enumerate().take(3) {
        for (c, value) in row.iter_mut().enumerate().take(3) {
            *value = rotation.matrix()[(r, c)];
        }
    }
    rows[0][3] = 2.5;
    rows[1][3] = -1.0;
    rows[2][3] = -40.0;
    rows[3][3] = 1.0;
    rows
}

/// Full 52-channel result with noisy scores
fn full_result(roll: f64, pitch: f64, yaw: f64) -> DetectionResult {
    DetectionResult {
        facial_transformation_matrixes: vec![rotated_rows(roll, pitch, yaw)],
        face_blendshapes: vec![MEDIAPIPE_TO_IFM
            .iter()
            .map(|(name, _)| Category::new(*name, rand::random::<f64>()))
            .collect()],
    }
}

fn benchmark_pose(c: &mut Criterion) {
    let mut group = c.benchmark_group("pose");
    let matrix = matrix_from_rows(&rotated_rows(0.1, -0.3, 0.2));

    group.bench_function("decompose_affine", |b| {
        b.iter(|| black_box(decompose_affine(black_box(&matrix))));
    });

    let parts = decompose_affine(&matrix).unwrap();
    group.bench_function("rotation_to_euler", |b| {
        b.iter(|| black_box(rotation_matrix_to_euler(black_box(&parts.rotation))));
    });

    group.finish();
}

fn benchmark_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_transform");
    let transform = FrameTransform::default();

    let results: Vec<DetectionResult> = (0..100)
        .map(|i| {
            let t = f64::from(i) * 0.1;
            full_result(0.2 * t.sin(), 0.3 * t.cos(), 0.1 * t.sin())
        })
        .collect();

    group.bench_with_input(BenchmarkId::new("single_frame", 52), &results[0], |b, result| {
        let mut data = TrackingData::new();
        b.iter(|| black_box(transform.apply(black_box(result), &mut data)));
    });

    group.bench_with_input(BenchmarkId::new("sequence_100", 52), &results, |b, results| {
        let mut data = TrackingData::new();
        b.iter(|| {
            for result in results {
                black_box(transform.apply(black_box(result), &mut data)).ok();
            }
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_pose, benchmark_transform);
criterion_main!(benches);
