//! Final report: strength extrema and the strain-stress curve artifact.
//!
//! The gnuplot exporter writes three files into its output directory:
//! - `<run_id>.data`: tab-separated columns `t i eps sigma sigma.25 sigma.50 sigma.75`
//!   in insertion order, preceded by `#` header lines carrying the extrema.
//! - `<run_id>.gnuplot`: a script plotting the stress columns against strain.
//! - `<run_id>.json`: the extrema as JSON for machine consumers.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::ReportError;
use crate::series::SeriesBuffer;

/// Column names, in file order.
pub const COLUMNS: [&str; 7] = ["t", "i", "eps", "sigma", "sigma.25", "sigma.50", "sigma.75"];

/// Strength summary of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extrema {
    /// Largest recorded stress (tensile strength `ft`).
    pub max_stress: f64,
    /// Smallest recorded stress (compressive strength `fc`).
    pub min_stress: f64,
    /// `|min_stress / max_stress|`; infinite when `max_stress` is zero.
    pub ratio: f64,
}

impl Extrema {
    /// Compute from the whole series; `None` when it is empty.
    #[must_use]
    pub fn from_series(series: &SeriesBuffer) -> Option<Self> {
        let max_stress = series.max_stress()?;
        let min_stress = series.min_stress()?;
        Some(Self {
            max_stress,
            min_stress,
            ratio: (min_stress / max_stress).abs(),
        })
    }
}

/// Locations written by an exporter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportArtifact {
    /// Tabular curve data.
    pub data_path: PathBuf,
    /// Plot script referencing `data_path`.
    pub script_path: PathBuf,
    /// JSON summary with the extrema.
    pub summary_path: PathBuf,
}

#[derive(Serialize)]
struct SummaryDoc<'a> {
    run_id: &'a str,
    title: &'a str,
    samples: usize,
    #[serde(flatten)]
    extrema: &'a Extrema,
}

/// Writes the final curve somewhere durable.
pub trait ReportExporter: Send {
    /// Persist `series` and `extrema` for `run_id`.
    fn export(
        &self,
        run_id: &str,
        title: &str,
        series: &SeriesBuffer,
        extrema: &Extrema,
    ) -> Result<ReportArtifact, ReportError>;
}

/// Gnuplot data + script exporter.
#[derive(Debug, Clone)]
pub struct GnuplotExporter {
    dir: PathBuf,
}

impl GnuplotExporter {
    /// Write reports into `dir` (created if missing).
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Output directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write_data(
        path: &Path,
        title: &str,
        series: &SeriesBuffer,
        extrema: &Extrema,
    ) -> Result<(), ReportError> {
        let mut w = BufWriter::new(File::create(path)?);
        writeln!(w, "# {title}")?;
        writeln!(w, "# generated {}", Utc::now().to_rfc3339())?;
        writeln!(
            w,
            "# maxStress={} minStress={} ratio={}",
            extrema.max_stress, extrema.min_stress, extrema.ratio
        )?;
        writeln!(w, "# {}", COLUMNS.join("\t"))?;
        for s in series {
            writeln!(
                w,
                "{}\t{}\t{}\t{}\t{}\t{}\t{}",
                s.time,
                s.iteration,
                s.strain,
                s.stress,
                s.section_stress[0],
                s.section_stress[1],
                s.section_stress[2]
            )?;
        }
        w.flush()?;
        Ok(())
    }

    fn write_script(path: &Path, data_file: &str, title: &str) -> Result<(), ReportError> {
        let mut w = BufWriter::new(File::create(path)?);
        let title = title.replace('"', "'");
        writeln!(w, "set title \"{title}\"")?;
        writeln!(w, "set xlabel 'eps'")?;
        writeln!(w, "set ylabel 'sigma'")?;
        writeln!(w, "set grid")?;
        let plots: Vec<String> = (4..=COLUMNS.len())
            .map(|col| {
                format!(
                    "\"{data_file}\" using 3:{col} title '{}' with lines",
                    COLUMNS[col - 1]
                )
            })
            .collect();
        writeln!(w, "plot {}", plots.join(", \\\n     "))?;
        w.flush()?;
        Ok(())
    }

    fn write_summary(path: &Path, doc: &SummaryDoc<'_>) -> Result<(), ReportError> {
        let mut w = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut w, doc).map_err(|e| ReportError::Serialization {
            message: e.to_string(),
        })?;
        w.flush()?;
        Ok(())
    }
}

impl ReportExporter for GnuplotExporter {
    fn export(
        &self,
        run_id: &str,
        title: &str,
        series: &SeriesBuffer,
        extrema: &Extrema,
    ) -> Result<ReportArtifact, ReportError> {
        fs::create_dir_all(&self.dir)?;
        let data_name = format!("{run_id}.data");
        let data_path = self.dir.join(&data_name);
        let script_path = self.dir.join(format!("{run_id}.gnuplot"));
        let summary_path = self.dir.join(format!("{run_id}.json"));

        Self::write_data(&data_path, title, series, extrema)?;
        Self::write_script(&script_path, &data_name, title)?;
        Self::write_summary(
            &summary_path,
            &SummaryDoc {
                run_id,
                title,
                samples: series.len(),
                extrema,
            },
        )?;

        Ok(ReportArtifact {
            data_path,
            script_path,
            summary_path,
        })
    }
}
