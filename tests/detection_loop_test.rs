//! Tests for the capture, detect and dispatch loop


use expression_bridge::{
    calibration::Calibrator,
    detection_loop::{DetectionLoop, Dispatcher, ExitReason, LoopState, ShutdownSignal},
    detector::{DetectionResult, ReplayModel},
    frame_transform::FrameTransform,
};
use std::sync::atomic::Ordering;
use test_helpers::{face, FailingTransport, FixedModel, RecordingTransport, ScriptedCamera};

fn dispatcher(transport: RecordingTransport) -> Dispatcher {
    Dispatcher::new(FrameTransform::default(), Box::new(Calibrator::new()), Box::new(transport))
}

#[test]
fn test_end_of_stream_closes_and_flushes() {
    let (camera, released) = ScriptedCamera::new(5);
    let transport = RecordingTransport::default();
    let model = FixedModel(face(&[("jawOpen", 0.5)]));

    let summary = DetectionLoop::new(
        Box::new(camera),
        Box::new(model),
        dispatcher(transport.clone()),
        ShutdownSignal::new(),
    )
    .unwrap()
    .wait_for_detector(true)
    .run();

    assert_eq!(summary.exit_reason, ExitReason::EndOfStream);
    assert_eq!(summary.frames_captured, 5);
    assert_eq!(summary.submitted, 5);
    assert_eq!(summary.dropped, 0);
    assert_eq!(summary.dispatch.dispatched, 5);
    assert!(released.load(Ordering::SeqCst));

    let frames = transport.frames();
    assert_eq!(frames.len(), 5);
    assert!(frames.iter().all(|f| f.blendshape("jawOpen") == Some(50.0)));
}

#[test]
fn test_recorded_results_are_applied_in_order() {
    let results = vec![
        face(&[("jawOpen", 0.1)]),
        DetectionResult::default(),
        face(&[("jawOpen", 0.3)]),
    ];
    let (camera, _) = ScriptedCamera::new(3);
    let transport = RecordingTransport::default();

    let summary = DetectionLoop::new(
        Box::new(camera),
        Box::new(ReplayModel::new(results, false)),
        dispatcher(transport.clone()),
        ShutdownSignal::new(),
    )
    .unwrap()
    .wait_for_detector(true)
    .run();

    assert_eq!(summary.dispatch.no_face, 1);
    let scores: Vec<f64> = transport
        .frames()
        .iter()
        .filter_map(|f| f.blendshape("jawOpen"))
        .collect();
    assert_eq!(scores.len(), 2);
    assert!((scores[0] - 10.0).abs() < 1e-9);
    assert!((scores[1] - 30.0).abs() < 1e-9);
}

#[test]
fn test_read_failure_is_not_fatal() {
    let (camera, released) = ScriptedCamera::failing_after(2);
    let summary = DetectionLoop::new(
        Box::new(camera),
        Box::new(FixedModel(face(&[]))),
        dispatcher(RecordingTransport::default()),
        ShutdownSignal::new(),
    )
    .unwrap()
    .wait_for_detector(true)
    .run();

    assert_eq!(summary.exit_reason, ExitReason::ReadFailure);
    assert_eq!(summary.frames_captured, 2);
    assert!(released.load(Ordering::SeqCst));
}

#[test]
fn test_interrupt_moves_to_closing_from_any_state() {
    let shutdown = ShutdownSignal::new();
    let (camera, released) = ScriptedCamera::new(usize::MAX);
    let mut detection_loop = DetectionLoop::new(
        Box::new(camera),
        Box::new(FixedModel(face(&[("jawOpen", 0.2)]))),
        dispatcher(RecordingTransport::default()),
        shutdown.clone(),
    )
    .unwrap();

    assert_eq!(detection_loop.state(), LoopState::Idle);
    assert_eq!(detection_loop.step(), LoopState::CaptureFrame);
    let after_capture = detection_loop.step();
    assert!(matches!(after_capture, LoopState::AwaitDetection | LoopState::CaptureFrame));

    shutdown.request();
    assert_eq!(detection_loop.step(), LoopState::Closing);
    assert_eq!(detection_loop.step(), LoopState::Closing);
    assert!(released.load(Ordering::SeqCst));

    let summary = detection_loop.run();
    assert_eq!(summary.exit_reason, ExitReason::Interrupted);
}

#[test]
fn test_interrupt_before_start() {
    let shutdown = ShutdownSignal::new();
    shutdown.request();
    let (camera, _) = ScriptedCamera::new(10);

    let summary = DetectionLoop::new(
        Box::new(camera),
        Box::new(FixedModel(face(&[]))),
        dispatcher(RecordingTransport::default()),
        shutdown,
    )
    .unwrap()
    .run();

    assert_eq!(summary.exit_reason, ExitReason::Interrupted);
    assert_eq!(summary.frames_captured, 0);
}

#[test]
fn test_busy_detector_drops_frames_without_queueing() {
    let (camera, _) = ScriptedCamera::new(200);
    let summary = DetectionLoop::new(
        Box::new(camera),
        Box::new(FixedModel(face(&[("jawOpen", 0.5)]))),
        dispatcher(RecordingTransport::default()),
        ShutdownSignal::new(),
    )
    .unwrap()
    .run();

    assert_eq!(summary.frames_captured, 200);
    assert_eq!(summary.submitted + summary.dropped, 200);
    assert_eq!(summary.dispatch.received, summary.submitted);
}

#[test]
fn test_transport_failures_do_not_stop_the_loop() {
    let (camera, _) = ScriptedCamera::new(3);
    let dispatcher = Dispatcher::new(
        FrameTransform::default(),
        Box::new(Calibrator::new()),
        Box::new(FailingTransport),
    );

    let summary = DetectionLoop::new(
        Box::new(camera),
        Box::new(FixedModel(face(&[("jawOpen", 0.5)]))),
        dispatcher,
        ShutdownSignal::new(),
    )
    .unwrap()
    .wait_for_detector(true)
    .run();

    assert_eq!(summary.exit_reason, ExitReason::EndOfStream);
    assert_eq!(summary.dispatch.send_failures, 3);
}

#[test]
fn test_calibration_on_start_zeroes_neutral_pose() {
    let (camera, _) = ScriptedCamera::new(4);
    let transport = RecordingTransport::default();
    let mut calibrator = Calibrator::new();
    calibrator.begin(2);

    let dispatcher = Dispatcher::new(FrameTransform::default(), Box::new(calibrator), Box::new(transport.clone()));
    let summary = DetectionLoop::new(
        Box::new(camera),
        Box::new(FixedModel(face(&[("jawOpen", 0.2)]))),
        dispatcher,
        ShutdownSignal::new(),
    )
    .unwrap()
    .wait_for_detector(true)
    .run();

    assert_eq!(summary.dispatch.dispatched, 4);
    let frames = transport.frames();
    assert_eq!(frames.len(), 4);
    // A constant face is its own neutral pose
    assert_eq!(frames[3].blendshape("jawOpen"), Some(0.0));
}
