mod case;
mod summary;
mod trial;

use std::io::{BufRead, Read, Write};
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

pub use case::BenchmarkCase;
pub use summary::{DurationStats, ResultSummary};
pub use trial::{DurationKind, MarkerLabel, Markers, Timestamp, Trial};

/// Default name of the results file written at the end of a run.
pub const DEFAULT_RESULTS_FILE: &str = "ew_benchmark_results.json";

/// A single trial together with the case it belongs to.
///
/// This is the line format of the trials log, see [append_trial_record].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrialRecord {
    pub case: BenchmarkCase,
    /// The fingerprint of `case`, see [BenchmarkCase::fingerprint].
    pub fingerprint: String,
    /// 1-based index of the trial within its case.
    pub repetition: usize,
    pub trial: Trial,
}

impl TrialRecord {
    pub fn new(case: &BenchmarkCase, repetition: usize, trial: Trial) -> Self {
        Self {
            case: case.clone(),
            fingerprint: case.fingerprint(),
            repetition,
            trial,
        }
    }
}

/// Write result summaries to a file, replacing any existing content
///
/// The summaries are written as a pretty printed JSON array.
pub fn store_results(results: &[ResultSummary], path: &Path) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create results file '{}'", path.display()))?;
    store_results_to_writer(results, file)
}

/// Serialize result summaries to a writer
pub fn store_results_to_writer<W: Write>(results: &[ResultSummary], writer: W) -> anyhow::Result<()> {
    let mut writer = std::io::BufWriter::new(writer);
    serde_json::to_writer_pretty(&mut writer, results)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Load result summaries from a reader
pub fn load_results<R: Read>(reader: R) -> anyhow::Result<Vec<ResultSummary>> {
    let reader = std::io::BufReader::new(reader);
    let results: Vec<ResultSummary> = serde_json::from_reader(reader)?;
    Ok(results)
}

/// Load result summaries from a file written by [store_results]
pub fn load_results_from_file(path: &Path) -> anyhow::Result<Vec<ResultSummary>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open results file '{}'", path.display()))?;
    load_results(file).with_context(|| format!("Failed to parse results file '{}'", path.display()))
}

/// Append a trial record to a file
///
/// The record will be serialized to JSON and output as a single line followed by a newline. The
/// recommended file extension is `.jsonl`.
pub fn append_trial_record(record: &TrialRecord, path: &Path) -> anyhow::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .with_context(|| format!("Failed to open trials file '{}'", path.display()))?;
    serde_json::to_writer(&mut file, record)?;
    file.write_all(b"\n")?;
    Ok(())
}

/// Load trial records from a file
///
/// The file should contain one JSON object per line. This is the format produced by
/// [append_trial_record].
pub fn load_trial_records(path: &Path) -> anyhow::Result<Vec<TrialRecord>> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: TrialRecord = serde_json::from_str(&line)?;
        records.push(record);
    }
    Ok(records)
}
