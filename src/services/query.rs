//! Aggregation query construction
//!
//! Produces a `_search` body that returns no hits, only a date histogram over
//! the report window with per-bucket sums of jobs and CPU hours.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::types::{ReportError, Result};

/// Exact-match filter applied to every document in the window
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TermFilter {
    pub field: String,
    pub value: Value,
}

impl TermFilter {
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    fn to_clause(&self) -> Value {
        let mut inner = Map::new();
        inner.insert(self.field.clone(), self.value.clone());
        json!({ "term": inner })
    }
}

/// Everything needed to build one aggregation request
#[derive(Debug, Clone)]
pub struct QuerySpec {
    pub time_field: String,
    pub jobs_field: String,
    pub cpu_hours_field: String,
    pub filters: Vec<TermFilter>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Histogram interval, passed through verbatim
    pub interval: String,
    /// Histogram offset, passed through verbatim
    pub offset: Option<String>,
    /// Offset string for bucket boundaries, e.g. `+02:00`
    pub time_zone: Option<String>,
}

impl QuerySpec {
    /// Reject empty or inverted windows.
    pub fn validate(&self) -> Result<()> {
        if self.start >= self.end {
            return Err(ReportError::InvalidWindow {
                start: self.start.to_rfc3339(),
                end: self.end.to_rfc3339(),
            });
        }
        Ok(())
    }

    /// Build the JSON request body.
    pub fn build(&self) -> Result<Value> {
        self.validate()?;

        let start_ms = self.start.timestamp_millis();
        let end_ms = self.end.timestamp_millis();

        let mut range = Map::new();
        range.insert(
            self.time_field.clone(),
            json!({ "gte": start_ms, "lt": end_ms, "format": "epoch_millis" }),
        );

        let mut filter = vec![json!({ "range": range })];
        filter.extend(self.filters.iter().map(TermFilter::to_clause));

        let mut histogram = Map::new();
        histogram.insert("field".into(), json!(self.time_field));
        histogram.insert("interval".into(), json!(self.interval));
        if let Some(offset) = &self.offset {
            histogram.insert("offset".into(), json!(offset));
        }
        if let Some(tz) = &self.time_zone {
            histogram.insert("time_zone".into(), json!(tz));
        }
        histogram.insert("min_doc_count".into(), json!(0));
        // last bucket starts before `end`, so the upper bound is exclusive
        histogram.insert(
            "extended_bounds".into(),
            json!({ "min": start_ms, "max": end_ms - 1 }),
        );

        let mut sums = Map::new();
        sums.insert(
            self.jobs_field.clone(),
            json!({ "sum": { "field": self.jobs_field } }),
        );
        sums.insert(
            self.cpu_hours_field.clone(),
            json!({ "sum": { "field": self.cpu_hours_field } }),
        );

        let mut aggs = Map::new();
        aggs.insert(
            self.time_field.clone(),
            json!({ "date_histogram": histogram, "aggs": sums }),
        );

        Ok(json!({
            "size": 0,
            "query": { "bool": { "filter": filter } },
            "aggs": aggs,
        }))
    }
}
