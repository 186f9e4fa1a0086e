use serde::{Deserialize, Serialize};
use sha3::Digest;

use crate::ResultSummary;

/// A single benchmark case: what to pull, how to mount it and what to run inside the container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BenchmarkCase {
    /// The image reference passed to `pull` and `run`.
    pub image: String,
    /// The snapshotter plugin name, e.g. `cvmfs-snapshotter`.
    pub snapshotter: String,
    /// The shell command run inside the container between the container markers.
    pub task: String,
    /// How many trials to run for this case.
    pub repetitions: usize,
}

impl BenchmarkCase {
    pub fn new(
        image: impl Into<String>,
        snapshotter: impl Into<String>,
        task: impl Into<String>,
        repetitions: usize,
    ) -> Self {
        Self {
            image: image.into(),
            snapshotter: snapshotter.into(),
            task: task.into(),
            repetitions,
        }
    }

    /// Compute a fingerprint for this case
    ///
    /// The fingerprint identifies the configuration that was measured so that results from
    /// different runs can be lined up. It uses the
    ///     - Image
    ///     - Snapshotter
    ///     - Task
    ///     - Repetitions
    ///
    /// The fingerprint is computed using [sha3::Sha3_256].
    pub fn fingerprint(&self) -> String {
        let mut hasher = sha3::Sha3_256::new();
        Digest::update(&mut hasher, self.image.as_bytes());
        Digest::update(&mut hasher, [0u8]);
        Digest::update(&mut hasher, self.snapshotter.as_bytes());
        Digest::update(&mut hasher, [0u8]);
        Digest::update(&mut hasher, self.task.as_bytes());
        Digest::update(&mut hasher, (self.repetitions as u64).to_le_bytes());

        format!("{:x}", hasher.finalize())
    }

    /// Whether a stored summary was produced by a case measuring the same thing.
    ///
    /// The repetition count is not compared so that a baseline taken with a different number of
    /// trials can still be used.
    pub fn describes(&self, summary: &ResultSummary) -> bool {
        self.image == summary.image
            && self.snapshotter == summary.snapshotter
            && self.task == summary.task
    }
}
