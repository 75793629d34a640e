//! `jobhours report`, `query` and `summarize` subcommands

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::Args;
use tracing::info;

use crate::config::Config;
use crate::services::{
    default_window, load_raw, parse_date, summarize_value, HttpSearchClient, QuerySpec,
    ReportOutcome, ReportService, ReportTimeZone, ReportWriter, Reshaper,
};
use crate::types::{ReportError, Result};

/// Report window and histogram options
#[derive(Args, Debug, Default, Clone)]
pub struct WindowArgs {
    /// Window start (YYYY-MM-DD, YYYY-MM-DD HH:MM[:SS], RFC 3339 or epoch millis)
    #[arg(long)]
    pub start: Option<String>,

    /// Window end, exclusive (defaults to midnight today)
    #[arg(long)]
    pub end: Option<String>,

    /// Window length in days when --start is omitted
    #[arg(long)]
    pub days: Option<u32>,

    /// Histogram interval, sent as-is (e.g. day, week, 6h)
    #[arg(long)]
    pub interval: Option<String>,

    /// Histogram offset, sent as-is (e.g. +6h)
    #[arg(long, allow_hyphen_values = true)]
    pub offset: Option<String>,

    /// Time zone for dates: utc, local or an offset like +02:00
    #[arg(long, allow_hyphen_values = true)]
    pub timezone: Option<String>,
}

impl WindowArgs {
    /// Overlay flags onto the loaded config.
    pub fn apply(&self, config: &mut Config) {
        if let Some(days) = self.days {
            config.days = days;
        }
        if let Some(interval) = &self.interval {
            config.interval = interval.clone();
        }
        if let Some(offset) = &self.offset {
            config.offset = Some(offset.clone());
        }
        if let Some(tz) = &self.timezone {
            config.timezone = tz.clone();
        }
    }

    /// Resolve the window against `now` and build the query.
    pub fn query_spec(
        &self,
        config: &Config,
        now: DateTime<Utc>,
    ) -> Result<(QuerySpec, ReportTimeZone)> {
        config.validate()?;
        let tz = config.time_zone()?;

        let end = match &self.end {
            Some(end) => parse_date(end, tz)?,
            None => default_window(now, tz, config.days)?.1,
        };
        let start = match (&self.start, &self.end) {
            (Some(start), _) => parse_date(start, tz)?,
            (None, Some(_)) => end
                .checked_sub_signed(chrono::Duration::days(i64::from(config.days)))
                .ok_or_else(|| ReportError::InvalidDate {
                    input: format!("{} days before {}", config.days, end.to_rfc3339()),
                    reason: "date out of range".into(),
                })?,
            (None, None) => default_window(now, tz, config.days)?.0,
        };

        let spec = build_spec(config, tz, start, end)?;
        Ok((spec, tz))
    }

    /// True when neither end of the window was given on the command line.
    pub fn is_open(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

fn build_spec(
    config: &Config,
    tz: ReportTimeZone,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<QuerySpec> {
    let time_zone = match tz {
        ReportTimeZone::Utc => None,
        _ => Some(tz.query_offset(&start)),
    };

    let spec = QuerySpec {
        time_field: config.time_field.clone(),
        jobs_field: config.jobs_field.clone(),
        cpu_hours_field: config.cpu_hours_field.clone(),
        filters: config.filters.clone(),
        start,
        end,
        interval: config.interval.clone(),
        offset: config.offset.clone(),
        time_zone,
    };
    spec.validate()?;
    Ok(spec)
}

/// Query the index and write the raw response and summary
#[derive(Args, Debug, Default)]
pub struct ReportArgs {
    #[command(flatten)]
    pub window: WindowArgs,

    /// Search service base URL
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Index to query
    #[arg(long)]
    pub index: Option<String>,

    /// Directory for output files
    #[arg(long, short = 'o')]
    pub output_dir: Option<PathBuf>,

    /// Also write the time series as CSV
    #[arg(long)]
    pub csv: bool,

    /// Print the summary as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

impl ReportArgs {
    pub fn run(self, mut config: Config) -> Result<()> {
        self.window.apply(&mut config);
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(index) = &self.index {
            config.index = index.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }

        let (query, tz) = self.window.query_spec(&config, Utc::now())?;
        let client = HttpSearchClient::new(
            &config.endpoint,
            &config.index,
            Duration::from_secs(config.timeout_secs),
        )?;
        let writer = writer_for(&config).with_csv(self.csv);

        let outcome = ReportService::new(client, writer, tz).run(&query)?;
        print_outcome(&outcome, self.json)
    }
}

/// Print the request body that `report` would send
#[derive(Args, Debug, Default)]
pub struct QueryArgs {
    #[command(flatten)]
    pub window: WindowArgs,
}

impl QueryArgs {
    pub fn run(self, mut config: Config) -> Result<()> {
        self.window.apply(&mut config);
        let (query, _) = self.window.query_spec(&config, Utc::now())?;
        let body = query.build()?;
        println!("{}", serde_json::to_string_pretty(&body)?);
        Ok(())
    }
}

/// Reshape a saved raw response without contacting the service
#[derive(Args, Debug)]
pub struct SummarizeArgs {
    /// Raw response file written by a previous report
    #[arg(value_name = "RAW_FILE")]
    pub raw_file: PathBuf,

    #[command(flatten)]
    pub window: WindowArgs,

    /// Write the summary into this directory
    #[arg(long, short = 'o')]
    pub output_dir: Option<PathBuf>,

    /// Also write the time series as CSV (requires --output-dir)
    #[arg(long, requires = "output_dir")]
    pub csv: bool,

    /// Print the summary as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

impl SummarizeArgs {
    pub fn run(self, mut config: Config) -> Result<()> {
        self.window.apply(&mut config);
        let raw = load_raw(&self.raw_file)?;

        // Without explicit dates the window comes from the saved buckets
        let (query, tz) = if self.window.is_open() {
            config.validate()?;
            let tz = config.time_zone()?;
            let (start, end) = Reshaper::bucket_window(&raw, &config.time_field)?
                .ok_or_else(|| {
                    ReportError::Config(
                        "need two or more buckets to infer the window, pass --start and --end"
                            .into(),
                    )
                })?;
            (build_spec(&config, tz, start, end)?, tz)
        } else {
            self.window.query_spec(&config, Utc::now())?
        };

        let writer = self.output_dir.as_ref().map(|dir| {
            config.output_dir = dir.clone();
            writer_for(&config).with_csv(self.csv)
        });

        let outcome = summarize_value(&raw, &query, tz, writer.as_ref())?;
        print_outcome(&outcome, self.json)
    }
}

fn writer_for(config: &Config) -> ReportWriter {
    ReportWriter::new(&config.output_dir, &config.raw_file, &config.summary_file)
}

fn print_outcome(outcome: &ReportOutcome, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome.summary)?);
    } else {
        println!("{}", outcome.summary.headline());
    }
    if let Some(peak) = outcome.summary.peak() {
        info!(date = %peak.date, cpu_hours = peak.cpu_hours, "peak bucket");
    }
    info!(files = outcome.written.len(), "report complete");
    Ok(())
}
