//! Output files for a report run

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::types::{Result, Summary};

/// File name of the optional CSV time series
pub const TIMESERIES_FILE: &str = "timeseries.csv";

/// Writes the raw response, the summary and optionally a CSV time series
pub struct ReportWriter {
    output_dir: PathBuf,
    raw_file: String,
    summary_file: String,
    csv: bool,
}

#[derive(Serialize)]
struct CsvRow<'a> {
    timestamp: i64,
    date: &'a str,
    jobs: f64,
    cpu_hours: f64,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>, raw_file: &str, summary_file: &str) -> Self {
        Self {
            output_dir: output_dir.into(),
            raw_file: raw_file.to_string(),
            summary_file: summary_file.to_string(),
            csv: false,
        }
    }

    /// Also write the time series as CSV
    pub fn with_csv(mut self, csv: bool) -> Self {
        self.csv = csv;
        self
    }

    pub fn raw_path(&self) -> PathBuf {
        self.output_dir.join(&self.raw_file)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.output_dir.join(&self.summary_file)
    }

    pub fn csv_path(&self) -> PathBuf {
        self.output_dir.join(TIMESERIES_FILE)
    }

    /// Write every output, returning the paths written.
    pub fn write_all(&self, raw: Option<&Value>, summary: &Summary) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.output_dir)?;

        let mut written = Vec::new();
        if let Some(raw) = raw {
            written.push(self.write_json(&self.raw_path(), raw)?);
        }
        written.push(self.write_json(&self.summary_path(), summary)?);
        if self.csv {
            written.push(self.write_csv(summary)?);
        }
        Ok(written)
    }

    fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<PathBuf> {
        let content = serde_json::to_string_pretty(value)?;
        fs::write(path, content)?;
        info!(path = %path.display(), "wrote file");
        Ok(path.to_path_buf())
    }

    fn write_csv(&self, summary: &Summary) -> Result<PathBuf> {
        let path = self.csv_path();
        let mut wtr = csv::Writer::from_path(&path)?;

        for point in &summary.points {
            wtr.serialize(CsvRow {
                timestamp: point.timestamp.timestamp_millis(),
                date: &point.date,
                jobs: point.jobs,
                cpu_hours: point.cpu_hours,
            })?;
        }
        wtr.flush()?;

        info!(path = %path.display(), rows = summary.points.len(), "wrote file");
        Ok(path)
    }
}
