//! Fold a raw aggregation response into a summary

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::services::dates::{date_to_string, ReportTimeZone};
use crate::services::query::QuerySpec;
use crate::types::{DataPoint, ReportError, Result, Summary};

/// Reshapes histogram buckets into data points and totals
pub struct Reshaper;

impl Reshaper {
    /// Reshape `raw` using the field names and window of `query`.
    ///
    /// Bucket order is whatever the service returned.
    pub fn reshape(raw: &Value, query: &QuerySpec, tz: ReportTimeZone) -> Result<Summary> {
        let buckets = Self::buckets(raw, &query.time_field)?;

        let mut points = Vec::with_capacity(buckets.len());
        for (idx, bucket) in buckets.iter().enumerate() {
            points.push(Self::point(idx, bucket, query, tz)?);
        }

        debug!(buckets = points.len(), "reshaped aggregation response");

        Ok(Summary::from_points(
            query.start,
            query.end,
            &query.interval,
            query.offset.as_deref(),
            points,
        ))
    }

    /// Window covered by the buckets of a saved response.
    ///
    /// Runs from the earliest key to the latest key plus the narrowest gap
    /// between neighbouring keys. `None` when fewer than two distinct keys
    /// exist, since the bucket width is then unknown.
    pub fn bucket_window(
        raw: &Value,
        time_field: &str,
    ) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>> {
        let buckets = Self::buckets(raw, time_field)?;

        let mut keys = Vec::with_capacity(buckets.len());
        for (idx, bucket) in buckets.iter().enumerate() {
            keys.push(Self::key(idx, bucket)?);
        }
        keys.sort();
        keys.dedup();

        let width = keys.windows(2).map(|pair| pair[1] - pair[0]).min();
        let (Some(first), Some(last), Some(width)) = (keys.first(), keys.last(), width) else {
            return Ok(None);
        };

        let end = last.checked_add_signed(width).ok_or_else(|| {
            ReportError::Shape(format!("bucket key {} is out of range", last.timestamp_millis()))
        })?;
        Ok(Some((*first, end)))
    }

    /// Locate `aggregations.<time field>.buckets` and assert it is an array.
    fn buckets<'a>(raw: &'a Value, time_field: &str) -> Result<&'a Vec<Value>> {
        let path = format!("aggregations.{}.buckets", time_field);
        let buckets = raw
            .get("aggregations")
            .and_then(|aggs| aggs.get(time_field))
            .and_then(|hist| hist.get("buckets"))
            .ok_or_else(|| ReportError::Shape(format!("{} is missing", path)))?;

        buckets
            .as_array()
            .ok_or_else(|| ReportError::Shape(format!("{} is not an array", path)))
    }

    fn point(
        idx: usize,
        bucket: &Value,
        query: &QuerySpec,
        tz: ReportTimeZone,
    ) -> Result<DataPoint> {
        let timestamp = Self::key(idx, bucket)?;

        Ok(DataPoint {
            timestamp,
            date: date_to_string(&timestamp, tz),
            jobs: Self::sum_value(bucket, &query.jobs_field, idx),
            cpu_hours: Self::sum_value(bucket, &query.cpu_hours_field, idx),
        })
    }

    /// Bucket start from its epoch-millisecond `key`
    fn key(idx: usize, bucket: &Value) -> Result<DateTime<Utc>> {
        if !bucket.is_object() {
            return Err(ReportError::Shape(format!("bucket {} is not an object", idx)));
        }

        let key = bucket
            .get("key")
            .and_then(|k| k.as_i64().or_else(|| k.as_f64().map(|f| f as i64)))
            .ok_or_else(|| ReportError::Shape(format!("bucket {} has no numeric key", idx)))?;

        DateTime::<Utc>::from_timestamp_millis(key).ok_or_else(|| {
            ReportError::Shape(format!("bucket {} key {} is out of range", idx, key))
        })
    }

    /// `<field>.value` of a sum aggregation; absent or null counts as zero.
    fn sum_value(bucket: &Value, field: &str, idx: usize) -> f64 {
        match bucket.get(field).and_then(|agg| agg.get("value")) {
            None | Some(Value::Null) => 0.0,
            Some(value) => value.as_f64().unwrap_or_else(|| {
                warn!(bucket = idx, field, %value, "non-numeric sum, counting as zero");
                0.0
            }),
        }
    }
}
