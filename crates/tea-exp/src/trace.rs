//! Append-only optimization trace logs.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tea_core::errors::{ErrorInfo, TeaError};

/// One objective-function call, in call order.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationRecord {
    /// 1-based call number.
    pub iteration: usize,
    /// Objective value returned by the evaluation.
    pub objective: f64,
    /// Input vector the objective was called with.
    pub input_vector: Vec<f64>,
}

/// Evaluation log for one optimized output.
///
/// The optimizer itself is a closed box, so this log is the authoritative
/// diagnostic artifact: one line per objective call, flushed immediately so
/// an aborted search still leaves its completed evaluations on disk.
pub struct TraceLog {
    records: Vec<EvaluationRecord>,
    writer: Option<BufWriter<File>>,
}

impl TraceLog {
    /// Creates a log that mirrors every record to a text file.
    pub fn to_file(path: &Path) -> Result<Self, TeaError> {
        let file = File::create(path).map_err(|err| {
            TeaError::Serde(
                ErrorInfo::new("trace-create", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        Ok(Self {
            records: Vec::new(),
            writer: Some(BufWriter::new(file)),
        })
    }

    /// Creates an in-memory log without a file mirror.
    pub fn in_memory() -> Self {
        Self {
            records: Vec::new(),
            writer: None,
        }
    }

    /// Appends one evaluation, returning its 1-based iteration number.
    pub fn append(&mut self, objective: f64, input_vector: &[f64]) -> Result<usize, TeaError> {
        let iteration = self.records.len() + 1;
        if let Some(writer) = self.writer.as_mut() {
            let joined = input_vector
                .iter()
                .map(|v| format!("{v:e}"))
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(
                writer,
                "Function eval {iteration}: f = {objective:e} at x = [{joined}]"
            )
            .and_then(|_| writer.flush())
            .map_err(|err| TeaError::Serde(ErrorInfo::new("trace-write", err.to_string())))?;
        }
        self.records.push(EvaluationRecord {
            iteration,
            objective,
            input_vector: input_vector.to_vec(),
        });
        Ok(iteration)
    }

    /// Records appended so far, in call order.
    pub fn records(&self) -> &[EvaluationRecord] {
        &self.records
    }

    /// Number of recorded evaluations.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no evaluation has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
