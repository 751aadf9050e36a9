// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Observation line recognition and decoding.
//!
//! The grammar is line-oriented:
//!
//! ```text
//! observation := ws* "PyTorchObserver" ws* json-object
//! json-object := { "type": str, "unit": str, "metric": str, "value": str | number, ... }
//! ```
//!
//! A line that does not start with the tag followed by `{` is not an
//! observation and is skipped. A line that does, but fails to decode, is
//! an error: bad measurements are never dropped silently.
//!
//! When the output contains a `Main runs.` line, observations before it
//! belong to warmup and are skipped, and scanning stops at the
//! `Main run finished.` line.

use crate::{MeasurementRecord, ParseError, RawRunOutput};
use serde_json::{Map, Value};
use std::iter::{Enumerate, FusedIterator};
use std::str::Lines;

/// Prefix of every observation line.
pub const OBSERVER_TAG: &str = "PyTorchObserver";

/// Line separating warmup observations from measured ones.
pub const MAIN_RUNS_MARKER: &str = "Main runs.";

const MAIN_RUN_FINISHED: &str = "Main run finished.";

/// Lazy iterator over the observations in one output.
///
/// Yields records in output order with ordinals 0, 1, 2, ... and stops
/// after the first error.
///
/// Construction makes one cheap scan of the text for the `Main runs.`
/// line, since warmup observations come before it. Observation lines are
/// then decoded one at a time as the iterator advances; nothing is
/// decoded ahead of the caller.
pub struct Observations<'a> {
    lines: Enumerate<Lines<'a>>,
    main_runs_at: Option<usize>,
    next_ordinal: usize,
    done: bool,
}

impl<'a> Observations<'a> {
    pub fn new(stdout: &'a str) -> Self {
        let main_runs_at = stdout
            .lines()
            .position(|l| l.trim_end_matches('\r').trim() == MAIN_RUNS_MARKER);
        Self {
            lines: stdout.lines().enumerate(),
            main_runs_at,
            next_ordinal: 0,
            done: false,
        }
    }
}

impl Iterator for Observations<'_> {
    type Item = Result<MeasurementRecord, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        for (idx, raw_line) in self.lines.by_ref() {
            let line = raw_line.trim_end_matches('\r');

            if let Some(marker) = self.main_runs_at {
                if idx <= marker {
                    continue;
                }
                if line.trim_start().starts_with(MAIN_RUN_FINISHED) {
                    break;
                }
            }

            let Some(body) = observation_body(line) else {
                continue;
            };

            let result = decode(body, idx + 1, line, self.next_ordinal);
            match &result {
                Ok(_) => self.next_ordinal += 1,
                Err(e) => {
                    tracing::debug!("stopping at rejected observation: {e}");
                    self.done = true;
                }
            }
            return Some(result);
        }

        self.done = true;
        None
    }
}

impl FusedIterator for Observations<'_> {}

/// Parses the observations in `raw`'s stdout.
///
/// Calling this again on the same output restarts from the beginning.
pub fn parse(raw: &RawRunOutput) -> Observations<'_> {
    Observations::new(raw.stdout())
}

/// Collects every observation, failing on the first rejected line.
///
/// Output without observations yields an empty vector.
pub fn parse_all(raw: &RawRunOutput) -> Result<Vec<MeasurementRecord>, ParseError> {
    parse(raw).collect()
}

fn observation_body(line: &str) -> Option<&str> {
    let body = line.trim_start().strip_prefix(OBSERVER_TAG)?.trim_start();
    body.starts_with('{').then_some(body)
}

fn decode(
    body: &str,
    line_no: usize,
    line: &str,
    ordinal: usize,
) -> Result<MeasurementRecord, ParseError> {
    let fields: Map<String, Value> =
        serde_json::from_str(body.trim_end()).map_err(|e| ParseError::Malformed {
            line_no,
            line: line.to_string(),
            detail: e.to_string(),
        })?;

    let text = |field: &'static str| match fields.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(ParseError::Malformed {
            line_no,
            line: line.to_string(),
            detail: format!("'{field}' is not a string: {other}"),
        }),
        None => Err(ParseError::MissingField {
            line_no,
            line: line.to_string(),
            field,
        }),
    };

    let kind = text("type")?;
    let unit = text("unit")?;
    let metric = text("metric")?;

    let raw_value = fields.get("value").ok_or_else(|| ParseError::MissingField {
        line_no,
        line: line.to_string(),
        field: "value",
    })?;
    let value = match raw_value {
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
    .filter(|v| v.is_finite())
    .ok_or_else(|| ParseError::InvalidValue {
        line_no,
        line: line.to_string(),
        value: match raw_value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
    })?;

    Ok(MeasurementRecord {
        kind,
        metric,
        unit,
        value,
        ordinal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(value: &str) -> String {
        format!(
            r#"PyTorchObserver {{"type": "NET", "unit": "us", "metric": "latency", "value": "{value}"}}"#
        )
    }

    fn output(lines: &[String]) -> RawRunOutput {
        RawRunOutput::from_stdout(lines.join("\n"))
    }

    #[test]
    fn test_three_latencies() {
        let raw = output(&[
            "Starting benchmark.".into(),
            "Running warmup runs.".into(),
            observation("599746"),
            observation("570505"),
            observation("583396"),
        ]);
        let records = parse_all(&raw).unwrap();
        assert_eq!(records.len(), 3);
        let values: Vec<f64> = records.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![599746.0, 570505.0, 583396.0]);
        let ordinals: Vec<usize> = records.iter().map(|r| r.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2]);
        assert_eq!(records[0].kind, "NET");
        assert_eq!(records[0].metric, "latency");
        assert_eq!(records[0].unit, "us");
    }

    #[test]
    fn test_non_data_lines_ignored() {
        let raw = output(&[
            "PyTorchObserver".into(),
            "PyTorchObserver: attached".into(),
            "  PyTorchObserver {\"type\": \"NET\", \"unit\": \"us\", \"metric\": \"latency\", \"value\": \"12\"}".into(),
            "Main run finished. Microseconds per iter: 12. Iters per second: 83333.3".into(),
        ]);
        let records = parse_all(&raw).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].value, 12.0);
    }

    #[test]
    fn test_empty_output_is_not_an_error() {
        assert!(parse_all(&RawRunOutput::default()).unwrap().is_empty());
        let raw = RawRunOutput::from_stdout("Starting benchmark.\nMain run finished.\n");
        assert!(parse_all(&raw).unwrap().is_empty());
    }

    #[test]
    fn test_warmup_observations_skipped() {
        let raw = output(&[
            "Starting benchmark.".into(),
            "Running warmup runs.".into(),
            observation("900000"),
            "Main runs.".into(),
            observation("100"),
            observation("200"),
            "Main run finished. Microseconds per iter: 150. Iters per second: 6666.67".into(),
            observation("999"),
        ]);
        let records = parse_all(&raw).unwrap();
        let values: Vec<f64> = records.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![100.0, 200.0]);
        assert_eq!(records[0].ordinal, 0);
    }

    #[test]
    fn test_crlf_stripped() {
        let raw = RawRunOutput::from_stdout(format!(
            "Main runs.\r\n{}\r\r\n{}\r\n",
            observation("1"),
            observation("2")
        ));
        let values: Vec<f64> = parse(&raw).map(|r| r.unwrap().value).collect();
        assert_eq!(values, vec![1.0, 2.0]);
    }

    #[test]
    fn test_scientific_notation_and_numeric_values() {
        let raw = output(&[
            observation("5.8e5"),
            observation(" 1.5E-3 "),
            r#"PyTorchObserver {"type": "NET", "unit": "us", "metric": "latency", "value": 42.5}"#.into(),
        ]);
        let values: Vec<f64> = parse(&raw).map(|r| r.unwrap().value).collect();
        assert_eq!(values, vec![580000.0, 0.0015, 42.5]);
    }

    #[test]
    fn test_value_roundtrip() {
        for v in [0.5, 599746.0, 1.25e-3, 123456789.125, 3.0e12] {
            for text in [format!("{v}"), format!("{v:e}")] {
                let raw = output(&[observation(&text)]);
                let parsed = parse_all(&raw).unwrap()[0].value;
                let back: f64 = parsed.to_string().parse().unwrap();
                assert!((back - v).abs() <= v.abs() * 1e-12, "{text} -> {back}");
            }
        }
    }

    #[test]
    fn test_missing_field() {
        let line = r#"PyTorchObserver {"type": "NET", "unit": "us", "value": "1"}"#;
        let raw = RawRunOutput::from_stdout(format!("Starting benchmark.\n{line}\n"));
        let err = parse_all(&raw).unwrap_err();
        assert_eq!(
            err,
            ParseError::MissingField {
                line_no: 2,
                line: line.to_string(),
                field: "metric",
            }
        );
        assert_eq!(err.line(), line);
    }

    #[test]
    fn test_missing_value() {
        let line = r#"PyTorchObserver {"type": "NET", "unit": "us", "metric": "latency"}"#;
        let err = parse_all(&RawRunOutput::from_stdout(line)).unwrap_err();
        assert!(matches!(err, ParseError::MissingField { field: "value", .. }));
    }

    #[test]
    fn test_unparseable_value() {
        for bad in ["fast", "", "NaN", "inf", "1,5"] {
            let raw = output(&[observation(bad)]);
            match parse_all(&raw) {
                Err(ParseError::InvalidValue { value, line_no, .. }) => {
                    assert_eq!(value, bad);
                    assert_eq!(line_no, 1);
                }
                other => panic!("'{bad}' gave {other:?}"),
            }
        }
    }

    #[test]
    fn test_malformed_object() {
        let raw = RawRunOutput::from_stdout(r#"PyTorchObserver {"type": "NET", "unit": "us""#);
        let err = parse_all(&raw).unwrap_err();
        assert!(matches!(err, ParseError::Malformed { line_no: 1, .. }));

        let raw = RawRunOutput::from_stdout(
            r#"PyTorchObserver {"type": 7, "unit": "us", "metric": "latency", "value": "1"}"#,
        );
        assert!(matches!(parse_all(&raw), Err(ParseError::Malformed { .. })));
    }

    #[test]
    fn test_fused_after_error() {
        let raw = output(&[observation("1"), observation("oops"), observation("3")]);
        let mut it = parse(&raw);
        assert!(it.next().unwrap().is_ok());
        assert!(it.next().unwrap().is_err());
        assert!(it.next().is_none());
        assert!(it.next().is_none());
    }

    #[test]
    fn test_marker_scan_decodes_nothing() {
        let raw = output(&[
            observation("oops"),
            MAIN_RUNS_MARKER.to_string(),
            observation("7"),
            observation("bad"),
        ]);
        let mut it = parse(&raw);
        // The warmup line is never decoded, and the later bad line only
        // surfaces once the iterator reaches it.
        assert_eq!(it.next().unwrap().unwrap().ordinal, 0);
        assert!(it.next().unwrap().is_err());
    }

    #[test]
    fn test_restartable() {
        let raw = output(&[observation("10"), observation("20")]);
        let first: Vec<_> = parse(&raw).collect();
        let second: Vec<_> = parse(&raw).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }
}
