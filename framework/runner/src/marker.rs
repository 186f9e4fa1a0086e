//! The marker protocol.
//!
//! Each phase boundary of a trial is reported as a line `<label>: <value>` on standard output. The
//! value is produced by `date` in the shell that runs the phase, and parsed back by the configured
//! [`MarkerFormat`].

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use snapshotter_bench_core::prelude::BenchError;
use snapshotter_bench_summary_model::{MarkerLabel, Markers, Timestamp};

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// How marker values are written and read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum MarkerFormat {
    /// Integer nanoseconds since the Unix epoch, `date +%s%N`.
    #[default]
    EpochNanos,
    /// Integer seconds since the Unix epoch, `date +%s`.
    EpochSeconds,
    /// ISO-8601 datetime with fractional seconds and offset, e.g.
    /// `2024-07-26T12:00:00.123456789+00:00`.
    Iso8601,
}

impl MarkerFormat {
    /// Convert a marker value to nanoseconds since the Unix epoch.
    pub fn parse(&self, value: &str) -> Result<Timestamp, String> {
        match self {
            MarkerFormat::EpochNanos => value.parse::<i64>().map_err(|e| e.to_string()),
            MarkerFormat::EpochSeconds => value
                .parse::<i64>()
                .map_err(|e| e.to_string())?
                .checked_mul(NANOS_PER_SECOND)
                .ok_or_else(|| "timestamp out of range".to_string()),
            MarkerFormat::Iso8601 => chrono::DateTime::parse_from_rfc3339(value)
                .map_err(|e| e.to_string())?
                .timestamp_nanos_opt()
                .ok_or_else(|| "timestamp out of range".to_string()),
        }
    }

    /// The shell command that prints the current time in this format.
    pub fn date_command(&self) -> &'static str {
        match self {
            MarkerFormat::EpochNanos => "date +%s%N",
            MarkerFormat::EpochSeconds => "date +%s",
            MarkerFormat::Iso8601 => "date +%Y-%m-%dT%H:%M:%S.%N%:z",
        }
    }

    /// A shell statement that prints the marker line for `label`.
    pub fn echo_marker(&self, label: MarkerLabel) -> String {
        format!("echo \"{label}: $({})\"", self.date_command())
    }

    pub fn name(&self) -> &'static str {
        match self {
            MarkerFormat::EpochNanos => "epoch nanoseconds",
            MarkerFormat::EpochSeconds => "epoch seconds",
            MarkerFormat::Iso8601 => "ISO-8601",
        }
    }
}

fn marker_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let labels = MarkerLabel::ALL.map(|label| label.as_str()).join("|");
        Regex::new(&format!(r"(?m)^[ \t]*({labels}):[ \t]*(\S+)[ \t]*\r?$"))
            .expect("marker pattern is valid")
    })
}

/// Find every marker in `output`.
///
/// When a label appears more than once the first occurrence wins, since a task could print text
/// that looks like a marker.
pub fn scan_markers(output: &str) -> BTreeMap<MarkerLabel, &str> {
    let mut found = BTreeMap::new();
    for captures in marker_pattern().captures_iter(output) {
        let (Some(label), Some(value)) = (captures.get(1), captures.get(2)) else {
            continue;
        };
        if let Ok(label) = label.as_str().parse::<MarkerLabel>() {
            found.entry(label).or_insert(value.as_str());
        }
    }
    found
}

/// Extract the trial markers from captured standard output.
///
/// Fails with [`BenchError::MissingMarker`] naming every required label that is absent, and with
/// [`BenchError::MarkerParse`] if a value cannot be read in `format`.
pub fn extract_markers(output: &str, format: MarkerFormat) -> Result<Markers, BenchError> {
    let found = scan_markers(output);

    let missing = MarkerLabel::ALL
        .into_iter()
        .filter(|label| label.is_required() && !found.contains_key(label))
        .map(|label| label.to_string())
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        return Err(BenchError::MissingMarker { labels: missing });
    }

    let timestamp = |label: MarkerLabel| -> Result<Option<Timestamp>, BenchError> {
        found
            .get(&label)
            .map(|value| {
                format.parse(value).map_err(|reason| BenchError::MarkerParse {
                    label: label.to_string(),
                    value: value.to_string(),
                    format: format.name().to_string(),
                    reason,
                })
            })
            .transpose()
    };
    let required = |label: MarkerLabel| -> Result<Timestamp, BenchError> {
        timestamp(label)?.ok_or_else(|| BenchError::MissingMarker {
            labels: vec![label.to_string()],
        })
    };

    Ok(Markers {
        benchmark_start: required(MarkerLabel::BenchmarkStart)?,
        pull_start: required(MarkerLabel::PullStart)?,
        pull_end: required(MarkerLabel::PullEnd)?,
        run_start: timestamp(MarkerLabel::RunStart)?,
        container_start: required(MarkerLabel::ContainerStart)?,
        container_end: required(MarkerLabel::ContainerEnd)?,
        run_end: required(MarkerLabel::RunEnd)?,
    })
}
