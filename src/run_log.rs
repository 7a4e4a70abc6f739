//! # Run Log Reader and Writer
//!
//! Historical runs are stored as newline-delimited JSON in the format k6
//! writes with `--out json=...`. Three point metrics matter:
//!
//! - `http_reqs`: one point per request
//! - `http_req_duration`: the request latency in milliseconds
//! - `http_req_failed`: `1` for a failed request, `0` otherwise
//!
//! ```text
//! {"type":"Point","metric":"http_req_duration","data":{"time":"2026-01-02T16:43:18.512Z","value":12.4,"tags":{"expected_response":"true"}}}
//! ```
//!
//! Every other record (metric declarations, other metrics) is ignored, and
//! lines that do not parse are skipped without aborting the read. Duration
//! points tagged `expected_response: "false"` belong to failed requests and
//! are dropped, so failed requests never contribute latency.
//!
//! [`RunLogWriter`] emits the same three metrics for a live collection, so the
//! analyzer treats live runs and k6 runs alike.

use crate::collector::Collection;
use crate::error::Result;
use crate::metrics::{summarize, LatencySample, RunSummary};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

const METRIC_REQS: &str = "http_reqs";
const METRIC_DURATION: &str = "http_req_duration";
const METRIC_FAILED: &str = "http_req_failed";
const TAG_EXPECTED_RESPONSE: &str = "expected_response";

/// Window used when a log carries fewer than two distinct timestamps.
pub const FALLBACK_WALL_SECONDS: f64 = 1.0;

#[derive(Debug, Deserialize)]
struct LogRecord {
    #[serde(rename = "type")]
    kind: String,
    metric: String,
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct PointData {
    value: f64,
    #[serde(default)]
    time: Option<DateTime<Utc>>,
    #[serde(default)]
    tags: HashMap<String, serde_json::Value>,
}

impl PointData {
    fn marks_failed_request(&self) -> bool {
        matches!(
            self.tags.get(TAG_EXPECTED_RESPONSE),
            Some(serde_json::Value::String(s)) if s == "false"
        ) || matches!(
            self.tags.get(TAG_EXPECTED_RESPONSE),
            Some(serde_json::Value::Bool(false))
        )
    }
}

/// Counters accumulated from one run log
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunLogTally {
    /// `http_reqs` points seen. Informational; totals come from the samples.
    pub request_points: u64,
    pub failure_points: u64,
    pub latencies_ms: Vec<f64>,
    pub first_point: Option<DateTime<Utc>>,
    pub last_point: Option<DateTime<Utc>>,
}

impl RunLogTally {
    fn observe_time(&mut self, time: Option<DateTime<Utc>>) {
        if let Some(t) = time {
            self.first_point = Some(self.first_point.map_or(t, |f| f.min(t)));
            self.last_point = Some(self.last_point.map_or(t, |l| l.max(t)));
        }
    }

    /// Samples in the shape the aggregator expects: one success per timed
    /// latency, one failure per failed request.
    pub fn into_samples(self) -> Vec<LatencySample> {
        let failures = self.failure_points as usize;
        let mut samples: Vec<LatencySample> = self
            .latencies_ms
            .into_iter()
            .map(LatencySample::success)
            .collect();
        samples.extend(std::iter::repeat(LatencySample::failure(0.0)).take(failures));
        samples
    }

    /// Span between the earliest and latest point, in seconds.
    pub fn wall_seconds(&self) -> f64 {
        let span = match (self.first_point, self.last_point) {
            (Some(first), Some(last)) => (last - first)
                .to_std()
                .map(|d| d.as_secs_f64())
                .unwrap_or(0.0),
            _ => 0.0,
        };
        if span > 0.0 {
            span
        } else {
            FALLBACK_WALL_SECONDS
        }
    }
}

/// Tally a run log. Malformed lines are skipped; I/O errors are returned.
pub fn parse_run_log<R: BufRead>(reader: R) -> Result<RunLogTally> {
    let mut tally = RunLogTally::default();

    for (index, line) in reader.split(b'\n').enumerate() {
        let line = line?;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let record: LogRecord = match serde_json::from_slice(&line) {
            Ok(record) => record,
            Err(e) => {
                debug!("Skipping malformed line {}: {}", index + 1, e);
                continue;
            }
        };
        if record.kind != "Point" {
            continue;
        }

        let point: PointData = match serde_json::from_value(record.data) {
            Ok(point) => point,
            Err(e) => {
                debug!("Skipping point on line {}: {}", index + 1, e);
                continue;
            }
        };

        match record.metric.as_str() {
            METRIC_REQS => {
                tally.request_points += 1;
                tally.observe_time(point.time);
            }
            METRIC_DURATION => {
                tally.observe_time(point.time);
                if !point.marks_failed_request() {
                    tally.latencies_ms.push(point.value);
                }
            }
            METRIC_FAILED => {
                tally.observe_time(point.time);
                if point.value == 1.0 {
                    tally.failure_points += 1;
                }
            }
            _ => {}
        }
    }

    Ok(tally)
}

pub fn parse_run_log_file(path: &Path) -> Result<RunLogTally> {
    let file = File::open(path)?;
    parse_run_log(BufReader::new(file))
}

/// Summarize one run log file as the operation `operation_name`.
pub fn summarize_run_log(operation_name: &str, path: &Path) -> Result<RunSummary> {
    let tally = parse_run_log_file(path)?;
    if tally.request_points > 0 {
        let counted = tally.latencies_ms.len() as u64 + tally.failure_points;
        if counted != tally.request_points {
            debug!(
                "{}: {} request points but {} timed/failed requests",
                operation_name, tally.request_points, counted
            );
        }
    }
    let wall_seconds = tally.wall_seconds();
    summarize(operation_name, &tally.into_samples(), wall_seconds)
}

/// Writes a live collection as a k6-compatible run log.
pub struct RunLogWriter<W: Write> {
    writer: W,
    points: usize,
}

impl RunLogWriter<BufWriter<File>> {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> RunLogWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, points: 0 }
    }

    /// Write three points per sample of `collection`, tagged with `name`.
    pub fn write_collection(&mut self, name: &str, collection: &Collection) -> Result<()> {
        for timed in &collection.timed_samples {
            let offset = chrono::Duration::from_std(timed.completed_after)
                .unwrap_or_else(|_| chrono::Duration::zero());
            let time = (collection.started_at + offset).to_rfc3339_opts(SecondsFormat::Micros, true);
            let sample = timed.sample;
            let expected = if sample.failed { "false" } else { "true" };
            let tags = json!({ "name": name, "expected_response": expected });

            self.write_point(METRIC_REQS, &time, 1.0, &tags)?;
            self.write_point(METRIC_DURATION, &time, sample.elapsed_ms, &tags)?;
            let failed_value = if sample.failed { 1.0 } else { 0.0 };
            self.write_point(METRIC_FAILED, &time, failed_value, &tags)?;
        }
        Ok(())
    }

    fn write_point(
        &mut self,
        metric: &str,
        time: &str,
        value: f64,
        tags: &serde_json::Value,
    ) -> Result<()> {
        let record = json!({
            "type": "Point",
            "metric": metric,
            "data": { "time": time, "value": value, "tags": tags },
        });
        serde_json::to_writer(&mut self.writer, &record)?;
        self.writer.write_all(b"\n")?;
        self.points += 1;
        Ok(())
    }

    pub fn points_written(&self) -> usize {
        self.points
    }

    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::TimedSample;
    use std::io::Cursor;
    use std::time::Duration;

    fn point(metric: &str, second: u32, value: f64, expected: &str) -> String {
        format!(
            r#"{{"type":"Point","metric":"{}","data":{{"time":"2026-01-02T16:43:{:02}.000000Z","value":{},"tags":{{"expected_response":"{}","status":"200"}}}}}}"#,
            metric, second, value, expected
        )
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let mut lines = Vec::new();
        for (i, v) in [10.0, 20.0, 30.0, 40.0, 50.0].iter().enumerate() {
            lines.push(point(METRIC_DURATION, i as u32, *v, "true"));
            if i == 2 {
                lines.push("{not json at all".to_string());
            }
        }
        lines.push(r#"{"type":"Point","metric":"http_req_duration","data":{"time":"#.to_string());

        let tally = parse_run_log(Cursor::new(lines.join("\n"))).unwrap();
        assert_eq!(tally.latencies_ms, vec![10.0, 20.0, 30.0, 40.0, 50.0]);

        let wall = tally.wall_seconds();
        assert_eq!(wall, 4.0);
        let summary = summarize("foods-list", &tally.into_samples(), wall).unwrap();
        assert_eq!(summary.requests_total, 5);
        assert_eq!(summary.requests_success, 5);
        assert_eq!(summary.p50_ms, 30.0);
        assert_eq!(summary.error_rate, 0.0);
    }

    #[test]
    fn test_counts_requests_and_failures() {
        let log = [
            r#"{"type":"Metric","metric":"http_reqs","data":{"name":"http_reqs","type":"counter"}}"#.to_string(),
            point(METRIC_REQS, 0, 1.0, "true"),
            point(METRIC_DURATION, 0, 12.0, "true"),
            point(METRIC_FAILED, 0, 0.0, "true"),
            point(METRIC_REQS, 1, 1.0, "false"),
            point(METRIC_DURATION, 1, 900.0, "false"),
            point(METRIC_FAILED, 1, 1.0, "false"),
            point("http_req_waiting", 1, 5.0, "true"),
            String::new(),
        ]
        .join("\n");

        let tally = parse_run_log(Cursor::new(log)).unwrap();
        assert_eq!(tally.request_points, 2);
        assert_eq!(tally.failure_points, 1);
        assert_eq!(tally.latencies_ms, vec![12.0]);

        let summary = summarize("categories", &tally.into_samples(), 1.0).unwrap();
        assert_eq!(summary.requests_total, 2);
        assert_eq!(summary.requests_failed, 1);
        assert_eq!(summary.max_latency_ms, 12.0);
        assert_eq!(summary.error_rate, 0.5);
    }

    #[test]
    fn test_wall_seconds_fallback() {
        let tally = parse_run_log(Cursor::new(point(METRIC_DURATION, 3, 1.0, "true"))).unwrap();
        assert_eq!(tally.wall_seconds(), FALLBACK_WALL_SECONDS);
        assert_eq!(RunLogTally::default().wall_seconds(), FALLBACK_WALL_SECONDS);
    }

    #[test]
    fn test_sub_microsecond_span_is_positive() {
        let log = [
            r#"{"type":"Point","metric":"http_req_duration","data":{"time":"2026-01-02T16:43:18.000000100Z","value":3.0,"tags":{}}}"#,
            r#"{"type":"Point","metric":"http_req_duration","data":{"time":"2026-01-02T16:43:18.000000900Z","value":5.0,"tags":{}}}"#,
        ]
        .join("\n");

        let tally = parse_run_log(Cursor::new(log)).unwrap();
        assert!(tally.first_point < tally.last_point);
        let wall = tally.wall_seconds();
        assert!(wall > 0.0 && wall < 1e-6);

        let summary = summarize("categories", &tally.into_samples(), wall).unwrap();
        assert_eq!(summary.requests_success, 2);
    }

    #[test]
    fn test_latencies_survive_write_and_read_exactly() {
        let values = [10.000004113000001, 10.269649000000001, 0.1 + 0.2, 123.456789012345];
        let collection = Collection {
            started_at: "2026-01-02T16:43:18Z".parse().unwrap(),
            timed_samples: values
                .iter()
                .enumerate()
                .map(|(i, &v)| TimedSample {
                    sample: LatencySample::success(v),
                    completed_after: Duration::from_millis(i as u64 * 100),
                })
                .collect(),
            failures: 0,
            wall_seconds: 0.4,
            batches: 1,
            cancelled: false,
        };

        let mut writer = RunLogWriter::new(Vec::new());
        writer.write_collection("categories", &collection).unwrap();
        let tally = parse_run_log(Cursor::new(writer.finish().unwrap())).unwrap();

        let read: Vec<u64> = tally.latencies_ms.iter().map(|v| v.to_bits()).collect();
        let written: Vec<u64> = values.iter().map(|v| v.to_bits()).collect();
        assert_eq!(read, written);
    }

    #[test]
    fn test_invalid_utf8_line_skipped() {
        let mut bytes = point(METRIC_DURATION, 0, 7.0, "true").into_bytes();
        bytes.extend_from_slice(b"\n\xff\xfe garbage\n");
        let tally = parse_run_log(Cursor::new(bytes)).unwrap();
        assert_eq!(tally.latencies_ms, vec![7.0]);
    }

    #[test]
    fn test_written_log_is_readable() {
        let collection = Collection {
            started_at: "2026-01-02T16:43:18Z".parse().unwrap(),
            timed_samples: vec![
                TimedSample {
                    sample: LatencySample::success(8.0),
                    completed_after: Duration::from_millis(10),
                },
                TimedSample {
                    sample: LatencySample::failure(30.0),
                    completed_after: Duration::from_millis(35),
                },
                TimedSample {
                    sample: LatencySample::success(4.0),
                    completed_after: Duration::from_millis(2010),
                },
            ],
            failures: 1,
            wall_seconds: 2.1,
            batches: 2,
            cancelled: false,
        };

        let mut writer = RunLogWriter::new(Vec::new());
        writer.write_collection("categories", &collection).unwrap();
        assert_eq!(writer.points_written(), 9);
        let bytes = writer.finish().unwrap();

        let tally = parse_run_log(Cursor::new(bytes)).unwrap();
        assert_eq!(tally.request_points, 3);
        assert_eq!(tally.failure_points, 1);
        assert_eq!(tally.latencies_ms, vec![8.0, 4.0]);
        assert_eq!(tally.wall_seconds(), 2.0);
    }
}
