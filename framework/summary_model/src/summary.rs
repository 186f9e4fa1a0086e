use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{BenchmarkCase, DurationKind};

/// Descriptive statistics for one duration series, in seconds.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct DurationStats {
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation. Reported as `0.0` for a single trial.
    pub stddev: f64,
}

/// Summary of all trials for one [`BenchmarkCase`].
///
/// Computed once after the last repetition of a case and not modified afterwards. Serialized as a
/// flat record with one numeric field per statistic, for example `pull_time_mean`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "FlatResultSummary", into = "FlatResultSummary")]
pub struct ResultSummary {
    pub image: String,
    pub snapshotter: String,
    pub task: String,
    /// The number of trials the statistics were computed over.
    pub repetitions: usize,
    pub pull_time: DurationStats,
    pub creation_time: DurationStats,
    pub execution_time: DurationStats,
    pub total_time: DurationStats,
}

impl ResultSummary {
    pub fn new(case: &BenchmarkCase, repetitions: usize) -> Self {
        Self {
            image: case.image.clone(),
            snapshotter: case.snapshotter.clone(),
            task: case.task.clone(),
            repetitions,
            pull_time: DurationStats::default(),
            creation_time: DurationStats::default(),
            execution_time: DurationStats::default(),
            total_time: DurationStats::default(),
        }
    }

    /// The case this summary was computed for.
    pub fn case(&self) -> BenchmarkCase {
        BenchmarkCase::new(
            self.image.clone(),
            self.snapshotter.clone(),
            self.task.clone(),
            self.repetitions,
        )
    }

    pub fn stats(&self, kind: DurationKind) -> &DurationStats {
        match kind {
            DurationKind::Pull => &self.pull_time,
            DurationKind::Creation => &self.creation_time,
            DurationKind::Execution => &self.execution_time,
            DurationKind::Total => &self.total_time,
        }
    }

    pub fn stats_mut(&mut self, kind: DurationKind) -> &mut DurationStats {
        match kind {
            DurationKind::Pull => &mut self.pull_time,
            DurationKind::Creation => &mut self.creation_time,
            DurationKind::Execution => &mut self.execution_time,
            DurationKind::Total => &mut self.total_time,
        }
    }

    /// The twelve statistics keyed by their serialized field name, e.g. `total_time_median`.
    pub fn metrics(&self) -> BTreeMap<String, f64> {
        DurationKind::ALL
            .into_iter()
            .flat_map(|kind| {
                let stats = self.stats(kind);
                [
                    (format!("{kind}_mean"), stats.mean),
                    (format!("{kind}_median"), stats.median),
                    (format!("{kind}_stddev"), stats.stddev),
                ]
            })
            .collect()
    }
}

#[derive(Serialize, Deserialize)]
struct FlatResultSummary {
    image: String,
    snapshotter: String,
    task: String,
    #[serde(default)]
    repetitions: usize,
    pull_time_mean: f64,
    pull_time_median: f64,
    pull_time_stddev: f64,
    creation_time_mean: f64,
    creation_time_median: f64,
    creation_time_stddev: f64,
    execution_time_mean: f64,
    execution_time_median: f64,
    execution_time_stddev: f64,
    total_time_mean: f64,
    total_time_median: f64,
    total_time_stddev: f64,
}

impl From<FlatResultSummary> for ResultSummary {
    fn from(flat: FlatResultSummary) -> Self {
        Self {
            image: flat.image,
            snapshotter: flat.snapshotter,
            task: flat.task,
            repetitions: flat.repetitions,
            pull_time: DurationStats {
                mean: flat.pull_time_mean,
                median: flat.pull_time_median,
                stddev: flat.pull_time_stddev,
            },
            creation_time: DurationStats {
                mean: flat.creation_time_mean,
                median: flat.creation_time_median,
                stddev: flat.creation_time_stddev,
            },
            execution_time: DurationStats {
                mean: flat.execution_time_mean,
                median: flat.execution_time_median,
                stddev: flat.execution_time_stddev,
            },
            total_time: DurationStats {
                mean: flat.total_time_mean,
                median: flat.total_time_median,
                stddev: flat.total_time_stddev,
            },
        }
    }
}

impl From<ResultSummary> for FlatResultSummary {
    fn from(summary: ResultSummary) -> Self {
        Self {
            image: summary.image,
            snapshotter: summary.snapshotter,
            task: summary.task,
            repetitions: summary.repetitions,
            pull_time_mean: summary.pull_time.mean,
            pull_time_median: summary.pull_time.median,
            pull_time_stddev: summary.pull_time.stddev,
            creation_time_mean: summary.creation_time.mean,
            creation_time_median: summary.creation_time.median,
            creation_time_stddev: summary.creation_time.stddev,
            execution_time_mean: summary.execution_time.mean,
            execution_time_median: summary.execution_time.median,
            execution_time_stddev: summary.execution_time.stddev,
            total_time_mean: summary.total_time.mean,
            total_time_median: summary.total_time.median,
            total_time_stddev: summary.total_time.stddev,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> ResultSummary {
        let case = BenchmarkCase::new("alpine:3.20", "cvmfs-snapshotter", "true", 5);
        let mut summary = ResultSummary::new(&case, 5);
        summary.execution_time = DurationStats {
            mean: 1.01,
            median: 1.0,
            stddev: 0.0758,
        };
        summary
    }

    #[test]
    fn serializes_as_flat_record() {
        let value = serde_json::to_value(summary()).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object.len(), 16);
        assert_eq!(object["image"], "alpine:3.20");
        assert_eq!(object["execution_time_mean"], 1.01);
        assert_eq!(object["execution_time_median"], 1.0);
        assert_eq!(object["pull_time_stddev"], 0.0);
        assert!(!object.contains_key("execution_time"));
    }

    #[test]
    fn reads_records_without_repetitions() {
        let json = r#"{
            "image": "alpine:3.20", "snapshotter": "overlayfs", "task": "true",
            "pull_time_mean": 1.0, "pull_time_median": 1.0, "pull_time_stddev": 0.0,
            "creation_time_mean": 2.0, "creation_time_median": 2.0, "creation_time_stddev": 0.0,
            "execution_time_mean": 3.0, "execution_time_median": 3.0, "execution_time_stddev": 0.0,
            "total_time_mean": 6.0, "total_time_median": 6.0, "total_time_stddev": 0.0
        }"#;

        let summary: ResultSummary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.repetitions, 0);
        assert_eq!(summary.creation_time.mean, 2.0);
        assert_eq!(summary.total_time.median, 6.0);
    }

    #[test]
    fn metrics_cover_every_statistic() {
        let metrics = summary().metrics();

        assert_eq!(metrics.len(), 12);
        assert_eq!(metrics["execution_time_mean"], 1.01);
        assert_eq!(metrics["execution_time_stddev"], 0.0758);
        assert_eq!(metrics["pull_time_median"], 0.0);
    }
}
