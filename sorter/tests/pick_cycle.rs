//! Pick cycles against scripted cameras and recording links.

use approx::assert_relative_eq;
use hardware::{RecordingConnector, ScriptedCamera};
use sorter::{
    ActuateStep, AfterPolls, CalibrationModel, CycleOutcome, CycleState, Orchestrator, Session,
    SorterConfig, SorterError,
};
use tempfile::TempDir;
use vision::{Frame, ImageSize, Point2D};

const OBJECT_CENTER: (f64, f64) = (324.5, 269.5);

fn fast_config() -> SorterConfig {
    let mut config = SorterConfig::default();
    config.link.reset_delay_s = 0.0;
    config.link.settle_s = 0.0;
    config.link.reconnect_backoff_s = 0.0;
    config.cycle.cooldown_s = 0.0;
    config.cycle.device_retry_s = 0.0;
    config
}

fn empty_tray() -> Frame {
    Frame::filled(ImageSize::from_width_height(640, 480), [90, 90, 90])
}

/// 40x40 light block well inside the default tray.
fn tray_with_object() -> Frame {
    let mut frame = empty_tray();
    frame.fill_rect(305, 250, 40, 40, [220, 220, 220]);
    frame
}

fn start(config: SorterConfig, camera: ScriptedCamera, link: &RecordingConnector) -> Orchestrator {
    let session = Session::start(config, Box::new(camera), Box::new(link.clone()), || true).unwrap();
    Orchestrator::new(session)
}

#[test]
fn one_shot_picks_the_object() {
    let link = RecordingConnector::new();
    let camera = ScriptedCamera::new()
        .then_frame(empty_tray())
        .then_frame(tray_with_object());
    let mut orchestrator = start(fast_config(), camera, &link);

    let outcome = orchestrator.run_one_shot();
    let CycleOutcome::Completed { target, plan } = outcome else {
        panic!("expected a completed cycle, got {outcome:?}");
    };

    assert_relative_eq!(target.x, OBJECT_CENTER.0, epsilon = 3.0);
    assert_relative_eq!(target.y, OBJECT_CENTER.1, epsilon = 3.0);
    assert!(plan.x_seconds >= 0.0 && plan.y_seconds >= 0.0);

    let model = CalibrationModel::fit(&fast_config().calibration).unwrap();
    assert_eq!(plan, model.plan(target));

    let lines = link.lines();
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[0], format!("XY F {:.2} {:.2}", plan.x_seconds, plan.y_seconds));
    assert_eq!(&lines[1..4], ["Z D 2.30", "C C", "Z U 3.10"]);
    assert_eq!(lines[4], format!("XY R {:.2} {:.2}", plan.x_seconds, plan.y_seconds));
    assert_eq!(lines[5], "C O");
    assert_eq!(orchestrator.state(), CycleState::Scan);
}

#[test]
fn per_axis_moves_when_configured() {
    let mut config = fast_config();
    config.cycle.combined_xy = false;
    let link = RecordingConnector::new();
    let camera = ScriptedCamera::new()
        .then_frame(empty_tray())
        .then_frame(tray_with_object());
    let mut orchestrator = start(config, camera, &link);

    assert!(orchestrator.run_one_shot().is_completed());
    let lines = link.lines();
    assert_eq!(lines.len(), 8);
    assert!(lines[0].starts_with("X F "));
    assert!(lines[1].starts_with("Y F "));
    assert!(lines[5].starts_with("Y R "));
    assert!(lines[6].starts_with("X R "));
}

#[test]
fn empty_tray_sends_nothing() {
    let link = RecordingConnector::new();
    let camera = ScriptedCamera::new().then_frame(empty_tray());
    let mut orchestrator = start(fast_config(), camera, &link);

    assert_eq!(orchestrator.run_one_shot(), CycleOutcome::NoDetection);
    assert!(link.lines().is_empty());
    assert_eq!(link.write_attempts(), 0);
    assert_eq!(orchestrator.state(), CycleState::Scan);
}

#[test]
fn small_change_is_not_an_object() {
    let mut live = empty_tray();
    live.fill_rect(320, 260, 4, 4, [220, 220, 220]);

    let link = RecordingConnector::new();
    let camera = ScriptedCamera::new().then_frame(empty_tray()).then_frame(live);
    let mut orchestrator = start(fast_config(), camera, &link);

    assert_eq!(orchestrator.run_one_shot(), CycleOutcome::NoDetection);
    assert!(link.lines().is_empty());
}

#[test]
fn camera_failure_sends_nothing() {
    let link = RecordingConnector::new();
    let camera = ScriptedCamera::new().then_frame(empty_tray()).then_failure();
    let mut orchestrator = start(fast_config(), camera, &link);

    let outcome = orchestrator.run_one_shot();
    assert!(matches!(outcome, CycleOutcome::DeviceUnavailable { .. }));
    assert!(link.lines().is_empty());
    assert_eq!(orchestrator.state(), CycleState::Scan);
}

#[test]
fn write_failure_abandons_cycle_after_one_reconnect() {
    // Write 0 is the move to the target, write 1 the descend
    let link = RecordingConnector::new().fail_write(1);
    let camera = ScriptedCamera::new()
        .then_frame(empty_tray())
        .then_frame(tray_with_object());
    let mut orchestrator = start(fast_config(), camera, &link);

    let outcome = orchestrator.run_one_shot();
    let CycleOutcome::CommunicationFailure {
        step, reconnected, ..
    } = outcome
    else {
        panic!("expected a communication failure, got {outcome:?}");
    };
    assert_eq!(step, ActuateStep::Descend);
    assert!(reconnected);

    let lines = link.lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("XY F "));
    assert_eq!(link.write_attempts(), 2);
    assert_eq!(link.open_count(), 2);
    assert!(link.is_open());
    assert_eq!(orchestrator.state(), CycleState::Scan);
}

#[test]
fn continuous_run_survives_failed_reconnect() {
    let link = RecordingConnector::new().fail_write(1);
    let camera = ScriptedCamera::new()
        .then_frame(empty_tray())
        .then_frame(tray_with_object());
    let mut orchestrator = start(fast_config(), camera, &link);
    // The session already holds its first link; only the reconnect fails
    link.fail_next_opens(1);

    let summary = orchestrator.run_continuous(&AfterPolls::new(3));

    // Cycle 1 fails mid-sequence and cannot reconnect. Cycle 2 finds the link
    // down, reconnects, and abandons. Cycle 3 picks.
    assert_eq!(summary.cycles, 3);
    assert_eq!(summary.communication_failures, 2);
    assert_eq!(summary.completed, 1);
    assert_eq!(link.lines().len(), 1 + 6);
    assert_eq!(link.open_count(), 2);
    assert!(link.is_open());
}

#[test]
fn continuous_run_survives_dropped_frame() {
    let link = RecordingConnector::new();
    let camera = ScriptedCamera::new()
        .then_frame(empty_tray())
        .then_failure()
        .then_frame(tray_with_object());
    let probe = camera.probe();
    let mut orchestrator = start(fast_config(), camera, &link);

    let summary = orchestrator.run_continuous(&AfterPolls::new(2));

    assert_eq!(summary.cycles, 2);
    assert_eq!(summary.device_failures, 1);
    assert_eq!(summary.completed, 1);
    assert_eq!(link.lines().len(), 6);
    assert_eq!(probe.reads(), 3);
    assert!(!probe.is_released());
    assert_eq!(orchestrator.state(), CycleState::Scan);
}

#[test]
fn cancelled_before_start_runs_no_cycles() {
    let link = RecordingConnector::new();
    let camera = ScriptedCamera::new()
        .then_frame(empty_tray())
        .then_frame(tray_with_object());
    let probe = camera.probe();
    let mut orchestrator = start(fast_config(), camera, &link);

    let summary = orchestrator.run_continuous(&AfterPolls::new(0));
    assert_eq!(summary.cycles, 0);
    assert_eq!(probe.reads(), 1);
    assert!(link.lines().is_empty());
}

#[test]
fn manual_lines_are_sent_verbatim() {
    let link = RecordingConnector::new();
    let mut orchestrator = start(fast_config(), ScriptedCamera::new().then_frame(empty_tray()), &link);

    orchestrator.send_manual("X F 1.00").unwrap();
    orchestrator.send_manual("home please").unwrap();
    assert_eq!(link.lines(), vec!["X F 1.00", "home please"]);
    assert_eq!(link.bytes(), b"X F 1.00\nhome please\n");
}

#[test]
fn ending_the_run_releases_hardware() {
    let link = RecordingConnector::new();
    let camera = ScriptedCamera::new()
        .then_frame(empty_tray())
        .then_frame(tray_with_object());
    let probe = camera.probe();
    let mut orchestrator = start(fast_config(), camera, &link);

    orchestrator.run_continuous(&AfterPolls::new(2));
    drop(orchestrator);

    assert!(probe.is_released());
    assert!(!link.is_open());
    assert_eq!(link.close_count(), link.open_count());
}

#[test]
fn invalid_tray_aborts_startup() {
    let mut config = fast_config();
    // Three of the corners lie on one line
    config.tray.corners = vec![
        Point2D::new(0.0, 0.0),
        Point2D::new(10.0, 0.0),
        Point2D::new(20.0, 0.0),
        Point2D::new(5.0, 5.0),
    ];
    let link = RecordingConnector::new();

    let err = Session::start(
        config,
        Box::new(ScriptedCamera::new().then_frame(empty_tray())),
        Box::new(link.clone()),
        || true,
    )
    .err()
    .unwrap();
    assert!(matches!(err, SorterError::GeometryInvalid(_)));
    assert_eq!(link.open_count(), 0);
}

#[test]
fn debug_images_are_written_for_detections() {
    let dir = TempDir::new().unwrap();
    let link = RecordingConnector::new();
    let camera = ScriptedCamera::new()
        .then_frame(empty_tray())
        .then_frame(tray_with_object());
    let mut orchestrator = start(fast_config(), camera, &link).with_debug_dir(dir.path().to_path_buf());

    assert!(orchestrator.run_one_shot().is_completed());
    assert!(dir.path().join("cycle_0001.png").exists());
}
