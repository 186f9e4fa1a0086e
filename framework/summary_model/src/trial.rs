use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use snapshotter_bench_core::prelude::BenchError;

/// Nanoseconds since the Unix epoch.
///
/// Every marker format is converted to this representation when it is parsed.
pub type Timestamp = i64;

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// The label of a marker line, `<label>: <value>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MarkerLabel {
    BenchmarkStart,
    PullStart,
    PullEnd,
    RunStart,
    ContainerStart,
    ContainerEnd,
    RunEnd,
}

impl MarkerLabel {
    /// All labels in the order they are emitted during a trial.
    pub const ALL: [MarkerLabel; 7] = [
        MarkerLabel::BenchmarkStart,
        MarkerLabel::PullStart,
        MarkerLabel::PullEnd,
        MarkerLabel::RunStart,
        MarkerLabel::ContainerStart,
        MarkerLabel::ContainerEnd,
        MarkerLabel::RunEnd,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MarkerLabel::BenchmarkStart => "benchmark_start",
            MarkerLabel::PullStart => "pull_start",
            MarkerLabel::PullEnd => "pull_end",
            MarkerLabel::RunStart => "run_start",
            MarkerLabel::ContainerStart => "container_start",
            MarkerLabel::ContainerEnd => "container_end",
            MarkerLabel::RunEnd => "run_end",
        }
    }

    /// Whether a trial is invalid without this marker.
    ///
    /// `run_start` is informational only, no duration is derived from it.
    pub fn is_required(&self) -> bool {
        !matches!(self, MarkerLabel::RunStart)
    }
}

impl FromStr for MarkerLabel {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MarkerLabel::ALL
            .into_iter()
            .find(|label| label.as_str() == s)
            .ok_or("Unknown marker label")
    }
}

impl fmt::Display for MarkerLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The raw timestamps captured for one trial.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Markers {
    pub benchmark_start: Timestamp,
    pub pull_start: Timestamp,
    pub pull_end: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_start: Option<Timestamp>,
    pub container_start: Timestamp,
    pub container_end: Timestamp,
    pub run_end: Timestamp,
}

/// The four durations derived from a trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DurationKind {
    /// `pull_end - pull_start`
    Pull,
    /// `container_start - pull_end`
    Creation,
    /// `container_end - container_start`
    Execution,
    /// `run_end - benchmark_start`
    Total,
}

impl DurationKind {
    pub const ALL: [DurationKind; 4] = [
        DurationKind::Pull,
        DurationKind::Creation,
        DurationKind::Execution,
        DurationKind::Total,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DurationKind::Pull => "pull_time",
            DurationKind::Creation => "creation_time",
            DurationKind::Execution => "execution_time",
            DurationKind::Total => "total_time",
        }
    }
}

impl fmt::Display for DurationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One measured execution of a benchmark case.
///
/// Can only be built from [`Markers`] that describe non-negative intervals, see
/// [`Trial::from_markers`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Trial {
    pub markers: Markers,
    /// Seconds spent pulling the image.
    pub pull_time: f64,
    /// Seconds between the end of the pull and the task starting inside the container.
    pub creation_time: f64,
    /// Seconds spent running the task inside the container.
    pub execution_time: f64,
    /// Seconds for the whole pull and run sequence.
    pub total_time: f64,
}

impl Trial {
    /// Derive the trial durations from captured markers.
    ///
    /// Fails with [`BenchError::InvalidTrial`] if any interval would be negative, which means the
    /// capture is malformed.
    pub fn from_markers(markers: Markers) -> Result<Self, BenchError> {
        let pull = interval("pull", markers.pull_start, markers.pull_end)?;
        let creation = interval("creation", markers.pull_end, markers.container_start)?;
        let execution = interval("execution", markers.container_start, markers.container_end)?;
        let total = interval("total", markers.benchmark_start, markers.run_end)?;

        Ok(Self {
            markers,
            pull_time: pull,
            creation_time: creation,
            execution_time: execution,
            total_time: total,
        })
    }

    pub fn duration(&self, kind: DurationKind) -> f64 {
        match kind {
            DurationKind::Pull => self.pull_time,
            DurationKind::Creation => self.creation_time,
            DurationKind::Execution => self.execution_time,
            DurationKind::Total => self.total_time,
        }
    }
}

fn interval(name: &'static str, start: Timestamp, end: Timestamp) -> Result<f64, BenchError> {
    if end < start {
        return Err(BenchError::InvalidTrial {
            interval: name,
            start,
            end,
        });
    }

    let nanos = end
        .checked_sub(start)
        .ok_or(BenchError::DurationOverflow {
            interval: name,
            start,
            end,
        })?;

    Ok(nanos as f64 / NANOS_PER_SECOND)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECOND: Timestamp = 1_000_000_000;

    fn markers() -> Markers {
        let t0 = 1_722_000_000 * SECOND;
        Markers {
            benchmark_start: t0,
            pull_start: t0 + SECOND / 10,
            pull_end: t0 + 3 * SECOND,
            run_start: Some(t0 + 3 * SECOND),
            container_start: t0 + 4 * SECOND,
            container_end: t0 + 6 * SECOND + SECOND / 2,
            run_end: t0 + 7 * SECOND,
        }
    }

    #[test]
    fn derives_durations_in_seconds() {
        let trial = Trial::from_markers(markers()).unwrap();

        assert!((trial.pull_time - 2.9).abs() < 1e-9);
        assert!((trial.creation_time - 1.0).abs() < 1e-9);
        assert!((trial.execution_time - 2.5).abs() < 1e-9);
        assert!((trial.total_time - 7.0).abs() < 1e-9);
    }

    #[test]
    fn equal_timestamps_give_zero_durations() {
        let t = 42 * SECOND;
        let trial = Trial::from_markers(Markers {
            benchmark_start: t,
            pull_start: t,
            pull_end: t,
            run_start: None,
            container_start: t,
            container_end: t,
            run_end: t,
        })
        .unwrap();

        for kind in DurationKind::ALL {
            assert_eq!(trial.duration(kind), 0.0);
        }
    }

    #[test]
    fn rejects_pull_ending_before_it_starts() {
        let mut m = markers();
        m.pull_end = m.pull_start - 1;

        let err = Trial::from_markers(m).unwrap_err();
        assert!(matches!(
            err,
            BenchError::InvalidTrial {
                interval: "pull",
                ..
            }
        ));
    }

    #[test]
    fn rejects_interval_too_long_to_measure() {
        let mut m = markers();
        m.benchmark_start = -9_000_000_000_000_000_000;
        m.run_end = 9_000_000_000_000_000_000;

        let err = Trial::from_markers(m).unwrap_err();
        assert!(matches!(
            err,
            BenchError::DurationOverflow {
                interval: "total",
                start: -9_000_000_000_000_000_000,
                end: 9_000_000_000_000_000_000,
            }
        ));
    }

    #[test]
    fn rejects_container_ending_before_it_starts() {
        let mut m = markers();
        m.container_end = m.container_start - SECOND;

        let err = Trial::from_markers(m).unwrap_err();
        assert!(matches!(
            err,
            BenchError::InvalidTrial {
                interval: "execution",
                ..
            }
        ));
    }

    #[test]
    fn rejects_container_starting_before_pull_ends() {
        let mut m = markers();
        m.container_start = m.pull_end - SECOND;

        let err = Trial::from_markers(m).unwrap_err();
        assert!(matches!(
            err,
            BenchError::InvalidTrial {
                interval: "creation",
                ..
            }
        ));
    }

    #[test]
    fn rejects_run_ending_before_benchmark_starts() {
        let mut m = markers();
        m.run_end = m.benchmark_start - 1;

        assert!(Trial::from_markers(m).is_err());
    }

    #[test]
    fn marker_labels_round_trip_through_strings() {
        for label in MarkerLabel::ALL {
            assert_eq!(MarkerLabel::from_str(label.as_str()), Ok(label));
        }
        assert_eq!(
            MarkerLabel::from_str("benchmark_end"),
            Err("Unknown marker label")
        );
    }

    #[test]
    fn only_run_start_is_optional() {
        let optional = MarkerLabel::ALL
            .into_iter()
            .filter(|label| !label.is_required())
            .collect::<Vec<_>>();
        assert_eq!(optional, vec![MarkerLabel::RunStart]);
    }
}
