//! Report artifacts produced at termination.

mod common;

use std::fs;

use common::{scripted_config, ScriptedEngine, COMPRESSION_SCRIPT, TENSION_SCRIPT};
use uniaxial::{
    Extrema, LoadModes, LoadTest, ReportArtifact, ReportError, ReportExporter, SeriesBuffer,
    TerminationReason,
};

#[test]
fn gnuplot_report_is_keyed_by_run_id() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = scripted_config(LoadModes::TENSION_ONLY, dir.path());
    config.description = Some("-dense".to_string());
    let engine = ScriptedEngine::new(&TENSION_SCRIPT, &COMPRESSION_SCRIPT);

    let summary = LoadTest::new(engine, &config).unwrap().run().unwrap().summary;
    assert_eq!(summary.run_id, "scripted-dense");
    assert_eq!(summary.title, "-dense");

    let artifact = summary.report.unwrap().unwrap();
    assert_eq!(artifact.data_path, dir.path().join("scripted-dense.data"));
    assert!(artifact.script_path.exists());

    let data = fs::read_to_string(&artifact.data_path).unwrap();
    assert!(data.contains("maxStress=3"));
    assert!(data.contains("minStress=0.4"));
    let rows: Vec<&str> = data.lines().filter(|l| !l.starts_with('#')).collect();
    assert_eq!(rows.len(), TENSION_SCRIPT.len());
    assert_eq!(rows[0].split('\t').count(), 7);

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&artifact.summary_path).unwrap()).unwrap();
    assert_eq!(json["max_stress"], 3.0);
    assert_eq!(json["samples"], 6);
}

#[test]
fn report_write_failure_does_not_fail_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, b"occupied").unwrap();
    let config = scripted_config(LoadModes::TENSION_ONLY, &blocker);
    let engine = ScriptedEngine::new(&TENSION_SCRIPT, &COMPRESSION_SCRIPT);

    let summary = LoadTest::new(engine, &config).unwrap().run().unwrap().summary;

    assert_eq!(summary.reason, TerminationReason::Failure);
    assert!(matches!(summary.report, Some(Err(ReportError::Io(_)))));
    let extrema = summary.extrema.unwrap();
    assert_eq!(extrema.max_stress, 3.0);
    assert_eq!(extrema.min_stress, 0.4);
}

struct Refusing;

impl ReportExporter for Refusing {
    fn export(
        &self,
        _run_id: &str,
        _title: &str,
        _series: &SeriesBuffer,
        _extrema: &Extrema,
    ) -> Result<ReportArtifact, ReportError> {
        Err(ReportError::Serialization {
            message: "refused".to_string(),
        })
    }
}

#[test]
fn custom_exporter_receives_the_final_series() {
    let dir = tempfile::tempdir().unwrap();
    let config = scripted_config(LoadModes::BOTH, dir.path());
    let engine = ScriptedEngine::new(&TENSION_SCRIPT, &COMPRESSION_SCRIPT);

    let summary = LoadTest::new(engine, &config)
        .unwrap()
        .with_exporter(Refusing)
        .run()
        .unwrap()
        .summary;

    assert_eq!(summary.reversals, 1);
    assert!(matches!(
        summary.report,
        Some(Err(ReportError::Serialization { .. }))
    ));
    assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
}
