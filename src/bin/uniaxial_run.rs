//! Uniaxial load-test runner.
//!
//! Drives the built-in synthetic specimen through a load test and prints the
//! run summary as JSON on stdout. Exit code 0 on orderly termination, 1 on
//! any error.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde_json::json;
use tracing::{error, info};

use uniaxial::observability::{init_logging, LogFormat};
use uniaxial::{
    LoadModes, LoadTest, LoadTestConfig, LoadTestResult, SpecimenParams, SyntheticSpecimen,
    ValidationError,
};

#[derive(Debug, Parser)]
#[command(name = "uniaxial-run", version, about = "Run a uniaxial tension/compression load test")]
struct Cli {
    /// JSON run configuration; unset fields take defaults.
    #[arg(long, env = "UNIAXIAL_CONFIG")]
    config: Option<PathBuf>,

    /// Run identifier.
    #[arg(long)]
    id: Option<String>,

    /// Description appended to the run id and used as the report title.
    #[arg(long)]
    description: Option<String>,

    /// Mode mask: 1 tension, 2 compression, 3 both.
    #[arg(long)]
    modes: Option<u8>,

    /// Directory receiving the report files.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Numeric parameter override, `name=value`; repeatable.
    #[arg(long = "param", value_name = "NAME=VALUE")]
    params: Vec<String>,

    /// JSON specimen parameters for the synthetic engine.
    #[arg(long)]
    specimen: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Human)]
    log_format: LogFormat,
}

fn parse_params(raw: &[String]) -> Result<BTreeMap<String, f64>, ValidationError> {
    raw.iter()
        .map(|pair| {
            let invalid = || ValidationError::InvalidConfig {
                reason: format!("expected NAME=VALUE, got '{pair}'"),
            };
            let (name, value) = pair.split_once('=').ok_or_else(invalid)?;
            let value: f64 = value.trim().parse().map_err(|_| invalid())?;
            Ok((name.trim().to_string(), value))
        })
        .collect()
}

fn build_config(cli: &Cli) -> LoadTestResult<LoadTestConfig> {
    let mut config = match &cli.config {
        Some(path) => LoadTestConfig::from_json_file(path)?,
        None => LoadTestConfig::default(),
    };
    if let Some(id) = &cli.id {
        config.run_id.clone_from(id);
    }
    if cli.description.is_some() {
        config.description.clone_from(&cli.description);
    }
    if let Some(mask) = cli.modes {
        config.modes = LoadModes::from_mask(mask)?;
    }
    if let Some(dir) = &cli.output_dir {
        config.output_dir.clone_from(dir);
    }
    let params = parse_params(&cli.params)?;
    Ok(config.with_params(&params)?)
}

fn load_specimen(cli: &Cli) -> LoadTestResult<SpecimenParams> {
    let Some(path) = &cli.specimen else {
        return Ok(SpecimenParams::default());
    };
    let text = std::fs::read_to_string(path).map_err(|e| ValidationError::InvalidConfig {
        reason: format!("cannot read {}: {e}", path.display()),
    })?;
    let params = serde_json::from_str(&text).map_err(|e| ValidationError::InvalidConfig {
        reason: format!("invalid specimen {}: {e}", path.display()),
    })?;
    Ok(params)
}

fn run(cli: &Cli) -> LoadTestResult<()> {
    let config = build_config(cli)?;
    let specimen = SyntheticSpecimen::new(load_specimen(cli)?);
    info!(run_id = %config.tagged_run_id(), modes = config.modes.mask(), "starting");

    let outcome = LoadTest::new(specimen, &config)?.run()?;
    let summary = &outcome.summary;
    let report = match &summary.report {
        Some(Ok(artifact)) => json!({ "script": artifact.script_path, "data": artifact.data_path }),
        Some(Err(err)) => json!({ "error": err.to_string() }),
        None => serde_json::Value::Null,
    };
    let doc = json!({
        "execution_id": summary.execution_id,
        "run_id": summary.run_id,
        "reason": summary.reason,
        "final_mode": summary.final_mode,
        "reversals": summary.reversals,
        "total_steps": summary.total_steps,
        "samples": summary.series.len(),
        "extrema": summary.extrema,
        "report": report,
    });
    println!("{doc:#}");
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "load test failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_param_pairs() {
        let raw = vec!["failure_threshold=0.4".to_string(), " max_samples = 10".to_string()];
        let params = parse_params(&raw).unwrap();
        assert_eq!(params.get("max_samples"), Some(&10.0));
        assert!(parse_params(&["oops".to_string()]).is_err());
    }

    #[test]
    fn cli_flags_override_defaults() {
        let cli = Cli::parse_from(["uniaxial-run", "--id", "s1", "--modes", "1", "--param", "max_samples=50"]);
        let config = build_config(&cli).unwrap();
        assert_eq!(config.run_id, "s1");
        assert_eq!(config.modes, LoadModes::TENSION_ONLY);
        assert_eq!(config.max_samples, 50);
    }
}
