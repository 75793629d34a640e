//! Report types for job/CPU-hour summaries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One histogram bucket after reshaping
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataPoint {
    /// Bucket start as returned by the service
    pub timestamp: DateTime<Utc>,
    /// Bucket start as `YYYY-MM-DD` in the report time zone
    pub date: String,
    pub jobs: f64,
    pub cpu_hours: f64,
}

/// Derived summary written next to the raw response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Summary {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub interval: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<String>,
    pub total_jobs: f64,
    pub total_cpu_hours: f64,
    pub bucket_count: usize,
    pub points: Vec<DataPoint>,
}

impl Summary {
    /// Build a summary by summing every point, keeping upstream order.
    pub fn from_points(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: &str,
        offset: Option<&str>,
        points: Vec<DataPoint>,
    ) -> Self {
        let total_jobs = points.iter().map(|p| p.jobs).sum();
        let total_cpu_hours = points.iter().map(|p| p.cpu_hours).sum();

        Self {
            start,
            end,
            interval: interval.to_string(),
            offset: offset.map(String::from),
            total_jobs,
            total_cpu_hours,
            bucket_count: points.len(),
            points,
        }
    }

    /// Bucket with the most CPU hours (first one wins on ties)
    pub fn peak(&self) -> Option<&DataPoint> {
        let mut peak: Option<&DataPoint> = None;
        for point in &self.points {
            match peak {
                Some(p) if point.cpu_hours <= p.cpu_hours => {}
                _ => peak = Some(point),
            }
        }
        peak
    }

    /// One-line human readable summary
    pub fn headline(&self) -> String {
        format!(
            "{} → {}: {:.0} jobs, {:.2} CPU hours over {} buckets",
            self.start.to_rfc3339(),
            self.end.to_rfc3339(),
            self.total_jobs,
            self.total_cpu_hours,
            self.bucket_count
        )
    }
}
