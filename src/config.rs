//! Configuration file handling
//!
//! Values are layered: built-in defaults, then the TOML config file, then
//! command-line flags (applied by the CLI).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::services::dates::ReportTimeZone;
use crate::services::query::TermFilter;
use crate::types::{ReportError, Result};

pub const DEFAULT_ENDPOINT: &str = "https://gracc.opensciencegrid.org/q";
pub const DEFAULT_INDEX: &str = "gracc.osg.summary";

/// Runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Base URL of the search service
    pub endpoint: String,
    pub index: String,
    pub timeout_secs: u64,
    pub time_field: String,
    pub jobs_field: String,
    pub cpu_hours_field: String,
    pub filters: Vec<TermFilter>,
    pub interval: String,
    pub offset: Option<String>,
    /// `utc`, `local` or a fixed offset like `+02:00`
    pub timezone: String,
    /// Length of the default window in days
    pub days: u32,
    pub output_dir: PathBuf,
    pub raw_file: String,
    pub summary_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            index: DEFAULT_INDEX.to_string(),
            timeout_secs: 60,
            time_field: "EndTime".to_string(),
            jobs_field: "Njobs".to_string(),
            cpu_hours_field: "CoreHours".to_string(),
            filters: vec![TermFilter::new("ResourceType", "Batch")],
            interval: "day".to_string(),
            offset: None,
            timezone: "utc".to_string(),
            days: 7,
            output_dir: PathBuf::from("."),
            raw_file: "raw_response.json".to_string(),
            summary_file: "summary.json".to_string(),
        }
    }
}

impl Config {
    /// Default config location (`<config dir>/jobhours/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "jobhours")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, the default location is
    /// used when present and built-in defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        match Self::default_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => {
                debug!("no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ReportError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)
            .map_err(|e| ReportError::Config(format!("{}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| ReportError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that would otherwise fail late.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(ReportError::Config("endpoint must not be empty".into()));
        }
        if self.index.trim().is_empty() {
            return Err(ReportError::Config("index must not be empty".into()));
        }
        if self.timeout_secs == 0 {
            return Err(ReportError::Config("timeout_secs must be positive".into()));
        }
        if self.days == 0 {
            return Err(ReportError::Config("days must be positive".into()));
        }
        self.time_zone()?;
        Ok(())
    }

    pub fn time_zone(&self) -> Result<ReportTimeZone> {
        self.timezone.parse()
    }
}
