//! One report run: query, search, reshape, write

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{error, info};

use crate::services::client::SearchBackend;
use crate::services::dates::ReportTimeZone;
use crate::services::query::QuerySpec;
use crate::services::reshape::Reshaper;
use crate::services::writer::ReportWriter;
use crate::types::{ReportError, Result, Summary};

/// What a finished run produced
#[derive(Debug)]
pub struct ReportOutcome {
    pub summary: Summary,
    pub written: Vec<PathBuf>,
}

/// Drives a single report against a search backend
pub struct ReportService<B: SearchBackend> {
    backend: B,
    writer: ReportWriter,
    tz: ReportTimeZone,
}

impl<B: SearchBackend> ReportService<B> {
    pub fn new(backend: B, writer: ReportWriter, tz: ReportTimeZone) -> Self {
        Self { backend, writer, tz }
    }

    /// Run the query and write raw response plus summary.
    ///
    /// A non-success answer from the service writes nothing.
    pub fn run(&self, query: &QuerySpec) -> Result<ReportOutcome> {
        let body = query.build()?;
        info!(
            target_url = %self.backend.describe(),
            start = %query.start,
            end = %query.end,
            interval = %query.interval,
            "running report"
        );

        let raw = match self.backend.search(&body)? {
            Some(raw) => raw,
            None => {
                error!("no data returned, skipping output");
                return Err(ReportError::RequestFailed(self.backend.describe()));
            }
        };

        let summary = Reshaper::reshape(&raw, query, self.tz)?;
        let written = self.writer.write_all(Some(&raw), &summary)?;

        Ok(ReportOutcome { summary, written })
    }
}

/// Read a raw response saved by a previous run.
pub fn load_raw(raw_path: &Path) -> Result<Value> {
    let content = fs::read_to_string(raw_path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Reshape a saved raw response without contacting the service.
pub fn summarize_file(
    raw_path: &Path,
    query: &QuerySpec,
    tz: ReportTimeZone,
    writer: Option<&ReportWriter>,
) -> Result<ReportOutcome> {
    summarize_value(&load_raw(raw_path)?, query, tz, writer)
}

/// Reshape an already loaded raw response, writing only the summary.
pub fn summarize_value(
    raw: &Value,
    query: &QuerySpec,
    tz: ReportTimeZone,
    writer: Option<&ReportWriter>,
) -> Result<ReportOutcome> {
    let summary = Reshaper::reshape(raw, query, tz)?;
    let written = match writer {
        Some(writer) => writer.write_all(None, &summary)?,
        None => Vec::new(),
    };

    Ok(ReportOutcome { summary, written })
}
