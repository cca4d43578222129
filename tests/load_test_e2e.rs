//! End-to-end runs of the controller against a scripted engine.

mod common;

use std::time::Duration;

use common::{
    scripted_config, RecordingDisplay, ScriptState, ScriptedEngine, COMPRESSION_SCRIPT,
    TENSION_SCRIPT,
};
use uniaxial::{
    ControllerState, LoadMode, LoadModes, LoadTest, SnapshotTag, TerminationReason,
};

#[test]
fn tension_failure_triggers_on_sixth_sample() {
    let dir = tempfile::tempdir().unwrap();
    let config = scripted_config(LoadModes::TENSION_ONLY, dir.path());
    let engine = ScriptedEngine::new(&TENSION_SCRIPT, &COMPRESSION_SCRIPT);

    let outcome = LoadTest::new(engine, &config).unwrap().run().unwrap();
    let summary = &outcome.summary;

    assert_eq!(summary.total_steps, 6);
    assert_eq!(summary.series.len(), 6);
    let stresses: Vec<f64> = summary.series.iter().map(|s| s.stress).collect();
    assert_eq!(stresses, TENSION_SCRIPT.to_vec());
}

#[test]
fn tension_only_terminates_with_extrema() {
    let dir = tempfile::tempdir().unwrap();
    let config = scripted_config(LoadModes::TENSION_ONLY, dir.path());
    let engine = ScriptedEngine::new(&TENSION_SCRIPT, &COMPRESSION_SCRIPT);

    let outcome = LoadTest::new(engine, &config).unwrap().run().unwrap();
    let summary = outcome.summary;

    assert_eq!(summary.reason, TerminationReason::Failure);
    assert_eq!(summary.final_mode, LoadMode::Tension);
    assert_eq!(summary.reversals, 0);
    assert_eq!(outcome.engine.restores, 0);

    let extrema = summary.extrema.unwrap();
    assert_eq!(extrema.max_stress, 3.0);
    assert_eq!(extrema.min_stress, 0.4);
    assert!((extrema.ratio - 0.4 / 3.0).abs() < 1e-12);
}

#[test]
fn tension_failure_reverses_into_compression() {
    let dir = tempfile::tempdir().unwrap();
    let config = scripted_config(LoadModes::BOTH, dir.path());
    let engine = ScriptedEngine::new(&TENSION_SCRIPT, &COMPRESSION_SCRIPT);

    let outcome = LoadTest::new(engine, &config).unwrap().run().unwrap();
    let summary = &outcome.summary;

    assert_eq!(summary.reason, TerminationReason::Failure);
    assert_eq!(summary.final_mode, LoadMode::Compression);
    assert_eq!(summary.reversals, 1);
    assert_eq!(outcome.engine.restores, 1);
    assert_eq!(summary.total_steps, 11);

    let samples = summary.series.to_vec();
    assert_eq!(samples.len(), TENSION_SCRIPT.len() + COMPRESSION_SCRIPT.len());

    // Tension history: reversed order, strain negated exactly once.
    let (tension, compression) = samples.split_at(TENSION_SCRIPT.len());
    let reversed: Vec<f64> = TENSION_SCRIPT.iter().rev().copied().collect();
    assert_eq!(tension.iter().map(|s| s.stress).collect::<Vec<_>>(), reversed);
    let strains: Vec<f64> = tension.iter().map(|s| s.strain).collect();
    assert_eq!(strains, vec![-6.0, -5.0, -4.0, -3.0, -2.0, -1.0]);

    // Compression restarted from the pristine state.
    assert_eq!(compression[0].iteration, 1);
    assert_eq!(compression[0].strain, -1.0);
    assert_eq!(
        compression.iter().map(|s| s.stress).collect::<Vec<_>>(),
        COMPRESSION_SCRIPT.to_vec()
    );

    let extrema = summary.extrema.unwrap();
    assert_eq!(extrema.max_stress, 3.0);
    assert_eq!(extrema.min_stress, -8.0);
}

#[test]
fn initial_snapshot_survives_reversal() {
    let dir = tempfile::tempdir().unwrap();
    let config = scripted_config(LoadModes::BOTH, dir.path());
    let engine = ScriptedEngine::new(&TENSION_SCRIPT, &COMPRESSION_SCRIPT);

    let outcome = LoadTest::new(engine, &config).unwrap().run().unwrap();

    let initial = outcome.snapshots.get(&SnapshotTag::initial()).unwrap();
    assert_eq!(*initial, ScriptState::default());
    assert!(outcome.engine.state.iteration > 0);
}

#[test]
fn compression_only_starts_in_compression() {
    let dir = tempfile::tempdir().unwrap();
    let config = scripted_config(LoadModes::COMPRESSION_ONLY, dir.path());
    let engine = ScriptedEngine::new(&TENSION_SCRIPT, &COMPRESSION_SCRIPT);

    let test = LoadTest::new(engine, &config).unwrap();
    assert_eq!(test.state(), ControllerState::Compression);
    assert!(test.phase().strain_rate < 0.0);

    let summary = test.run().unwrap().summary;
    assert_eq!(summary.final_mode, LoadMode::Compression);
    assert_eq!(summary.reversals, 0);
    assert_eq!(summary.total_steps, 5);
    assert_eq!(summary.extrema.unwrap().min_stress, -8.0);
}

#[test]
fn display_scale_follows_phase() {
    let dir = tempfile::tempdir().unwrap();
    let config = scripted_config(LoadModes::BOTH, dir.path());
    let engine = ScriptedEngine::new(&TENSION_SCRIPT, &COMPRESSION_SCRIPT);
    let display = RecordingDisplay::default();
    let scales = display.scales.clone();

    LoadTest::new(engine, &config)
        .unwrap()
        .with_display(display)
        .run()
        .unwrap();

    assert_eq!(*scales.lock().unwrap(), vec![1000.0, 100.0]);
}

#[test]
fn iteration_limit_terminates_orderly() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = scripted_config(LoadModes::BOTH, dir.path());
    config.max_iterations = Some(25);

    let outcome = LoadTest::new(ScriptedEngine::flat(), &config)
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(outcome.summary.reason, TerminationReason::IterationLimit);
    assert_eq!(outcome.summary.total_steps, 25);
    assert_eq!(outcome.summary.final_mode, LoadMode::Tension);
    assert!(outcome.summary.report.unwrap().is_ok());
}

#[test]
fn invalid_config_is_rejected_before_running() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = scripted_config(LoadModes::BOTH, dir.path());
    config.failure_threshold = 0.0;

    let err = LoadTest::new(ScriptedEngine::flat(), &config)
        .err()
        .unwrap();
    assert!(err.is_validation());
}

#[test]
fn engine_error_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = scripted_config(LoadModes::BOTH, dir.path());
    let engine = ScriptedEngine::flat().failing_at(3);

    let err = LoadTest::new(engine, &config).unwrap().run().err().unwrap();
    assert!(err.is_execution());
    assert!(err.to_string().contains("iteration 3"));
}

#[test]
fn stop_cancels_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = scripted_config(LoadModes::BOTH, dir.path());
    let engine = ScriptedEngine::flat().with_step_delay(Duration::from_millis(1));

    let handle = LoadTest::new(engine, &config).unwrap().start().unwrap();
    std::thread::sleep(Duration::from_millis(20));
    handle.stop().unwrap();

    let err = handle.join().err().unwrap();
    assert!(err.is_cancelled());
}

#[test]
fn pause_and_resume_from_the_handle() {
    let dir = tempfile::tempdir().unwrap();
    let config = scripted_config(LoadModes::BOTH, dir.path());
    let engine = ScriptedEngine::flat().with_step_delay(Duration::from_millis(1));

    let handle = LoadTest::new(engine, &config).unwrap().start().unwrap();
    assert!(handle.pause().unwrap());
    handle.wait_paused(Duration::from_secs(5)).unwrap();
    assert_eq!(handle.controller_state().unwrap(), ControllerState::Tension);
    assert!(handle.resume().unwrap());

    handle.stop().unwrap();
    assert!(handle.join().err().unwrap().is_cancelled());
}

#[test]
fn join_timeout_stops_a_run_that_never_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = scripted_config(LoadModes::BOTH, dir.path());
    let engine = ScriptedEngine::flat().with_step_delay(Duration::from_millis(1));

    let handle = LoadTest::new(engine, &config).unwrap().start().unwrap();
    let err = handle.join_timeout(Duration::from_millis(30)).err().unwrap();
    assert!(err.is_execution());
    assert!(err.to_string().contains("timed out"));
}
