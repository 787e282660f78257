//! Benchmarks for dispatching tracking data to the sinks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use expression_bridge::{
    calibration::{CalibrationSink, Calibrator},
    camera::Frame,
    detection_loop::Dispatcher,
    detector::{Category, Detection, DetectionResult},
    frame_transform::FrameTransform,
    name_mapper::MEDIAPIPE_TO_IFM,
    tracking_data::TrackingData,
    transport::{format_ifacialmocap, TransportSink},
    Result,
};

const IDENTITY: [[f64; 4]; 4] = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

struct NullTransport;

impl TransportSink for NullTransport {
    fn send(&mut self, data: &TrackingData) -> Result<()> {
        black_box(format_ifacialmocap(data));
        Ok(())
    }
}

fn noisy_result() -> DetectionResult {
    DetectionResult {
        facial_transformation_matrixes: vec![IDENTITY],
        face_blendshapes: vec![MEDIAPIPE_TO_IFM
            .iter()
            .map(|(name, _)| Category::new(*name, rand::random::<f64>()))
            .collect()],
    }
}

fn benchmark_wire_format(c: &mut Criterion) {
    let mut data = TrackingData::new();
    FrameTransform::default().apply(&noisy_result(), &mut data).unwrap();

    c.bench_function("format_ifacialmocap", |b| {
        b.iter(|| black_box(format_ifacialmocap(black_box(&data))));
    });
}

fn benchmark_calibration(c: &mut Criterion) {
    let mut data = TrackingData::new();
    FrameTransform::default().apply(&noisy_result(), &mut data).unwrap();

    let mut calibrator = Calibrator::new();
    calibrator.begin(1);
    calibrator.input_tracking(&data);

    c.bench_function("calibrated_input", |b| {
        b.iter(|| calibrator.input_tracking(black_box(&data)));
    });
}

fn benchmark_dispatch(c: &mut Criterion) {
    let mut dispatcher = Dispatcher::new(
        FrameTransform::default(),
        Box::new(Calibrator::new()),
        Box::new(NullTransport),
    );
    let result = noisy_result();
    let mut timestamp_ms = 0;

    c.bench_function("dispatch_detection", |b| {
        b.iter(|| {
            timestamp_ms += 1;
            let detection = Detection {
                result: result.clone(),
                image: Frame::new(1, 1),
                timestamp_ms,
            };
            black_box(dispatcher.handle(&detection))
        });
    });
}

criterion_group!(benches, benchmark_wire_format, benchmark_calibration, benchmark_dispatch);
criterion_main!(benches);
