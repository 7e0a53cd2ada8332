//! In-memory collaborator pair used by workspace tests and dry runs.
//!
//! The scripted Model keeps a node tree of stored text values and persists
//! snapshots as JSON dumps of that tree; the scripted Calculator loads such
//! dumps back and re-derives its cells through a caller-provided
//! recalculation closure. Call counts are recorded so tests can assert the
//! evaluation-count contracts of the sweep executor.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tea_core::errors::{ErrorInfo, TeaError};

use crate::expr::splice_expression_tail;
use crate::{Calculator, CellValue, Model};

/// Builds a `(sheet, cell)` key for scripted Calculator cells.
pub fn cell(sheet: &str, cell: &str) -> (String, String) {
    (sheet.to_string(), cell.to_string())
}

fn closed_error(which: &str) -> TeaError {
    TeaError::Collaborator(ErrorInfo::new(
        "session-closed",
        format!("{which} session is closed"),
    ))
}

/// Scripted stand-in for the external process-simulation session.
#[derive(Debug)]
pub struct ScriptedModel {
    archive: PathBuf,
    tree: BTreeMap<String, String>,
    runs: usize,
    snapshots_saved: usize,
    closed: bool,
    fail_next_run: bool,
}

impl ScriptedModel {
    /// Opens a scripted session over the given node tree.
    pub fn open(archive: impl Into<PathBuf>, nodes: &[(&str, &str)]) -> Self {
        Self {
            archive: archive.into(),
            tree: nodes
                .iter()
                .map(|(path, text)| (path.to_string(), text.to_string()))
                .collect(),
            runs: 0,
            snapshots_saved: 0,
            closed: false,
            fail_next_run: false,
        }
    }

    /// Number of completed simulation runs.
    pub fn runs(&self) -> usize {
        self.runs
    }

    /// Number of snapshots written.
    pub fn snapshots_saved(&self) -> usize {
        self.snapshots_saved
    }

    /// Whether the session has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Arms a one-shot failure for the next [`Model::run`] call.
    pub fn fail_next_run(&mut self) {
        self.fail_next_run = true;
    }

    /// Current stored text of a node, for assertions.
    pub fn node(&self, path: &str) -> Option<&str> {
        self.tree.get(path).map(String::as_str)
    }

    /// Writes the current tree to the archive path so calculator-only
    /// evaluations can load it like a real archive file.
    pub fn publish_archive(&self) -> Result<(), TeaError> {
        let json = serde_json::to_string_pretty(&self.tree).map_err(|err| {
            TeaError::Serde(ErrorInfo::new("archive-encode", err.to_string()))
        })?;
        fs::write(&self.archive, json).map_err(|err| {
            TeaError::Collaborator(
                ErrorInfo::new("archive-write", err.to_string())
                    .with_context("path", self.archive.display().to_string()),
            )
        })
    }

    fn node_mut(&mut self, path: &str) -> Result<&mut String, TeaError> {
        self.tree.get_mut(path).ok_or_else(|| {
            TeaError::Collaborator(
                ErrorInfo::new("node-not-found", "no node at tree path")
                    .with_context("path", path.to_string()),
            )
        })
    }
}

impl Model for ScriptedModel {
    fn archive_path(&self) -> &Path {
        &self.archive
    }

    fn set_value(&mut self, path: &str, value: f64) -> Result<(), TeaError> {
        if self.closed {
            return Err(closed_error("model"));
        }
        *self.node_mut(path)? = value.to_string();
        Ok(())
    }

    fn set_expression_tail(&mut self, path: &str, value: f64) -> Result<(), TeaError> {
        if self.closed {
            return Err(closed_error("model"));
        }
        let node = self.node_mut(path)?;
        let updated = splice_expression_tail(node, value)?;
        *node = updated;
        Ok(())
    }

    fn run(&mut self) -> Result<(), TeaError> {
        if self.closed {
            return Err(closed_error("model"));
        }
        if self.fail_next_run {
            self.fail_next_run = false;
            return Err(TeaError::Collaborator(ErrorInfo::new(
                "run-failed",
                "scripted model run failure",
            )));
        }
        self.runs += 1;
        Ok(())
    }

    fn save_snapshot(&mut self, path: &Path) -> Result<(), TeaError> {
        if self.closed {
            return Err(closed_error("model"));
        }
        let json = serde_json::to_string_pretty(&self.tree).map_err(|err| {
            TeaError::Serde(ErrorInfo::new("snapshot-encode", err.to_string()))
        })?;
        fs::write(path, json).map_err(|err| {
            TeaError::Collaborator(
                ErrorInfo::new("snapshot-write", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        self.snapshots_saved += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), TeaError> {
        self.closed = true;
        Ok(())
    }
}

/// Recalculation hook: derives cells from the loaded model snapshot view.
pub type RecalcFn = Box<dyn FnMut(&BTreeMap<String, f64>, &mut BTreeMap<(String, String), CellValue>)>;

/// Scripted stand-in for the external spreadsheet session.
pub struct ScriptedCalculator {
    cells: BTreeMap<(String, String), CellValue>,
    model_view: BTreeMap<String, f64>,
    recalc: Option<RecalcFn>,
    loaded: Vec<PathBuf>,
    recalcs: usize,
    macro_log: Vec<String>,
    closed: bool,
}

impl ScriptedCalculator {
    /// Opens a scripted workbook with the given initial cells.
    pub fn open(initial: &[((&str, &str), f64)]) -> Self {
        Self {
            cells: initial
                .iter()
                .map(|((sheet, cell_ref), value)| {
                    (cell(sheet, cell_ref), CellValue::Number(*value))
                })
                .collect(),
            model_view: BTreeMap::new(),
            recalc: None,
            loaded: Vec::new(),
            recalcs: 0,
            macro_log: Vec::new(),
            closed: false,
        }
    }

    /// Installs the recalculation closure invoked by [`Calculator::run_macro`].
    pub fn with_recalc(mut self, recalc: RecalcFn) -> Self {
        self.recalc = Some(recalc);
        self
    }

    /// Number of macro-triggered recalculations.
    pub fn recalcs(&self) -> usize {
        self.recalcs
    }

    /// Snapshot files loaded so far, in order.
    pub fn loaded(&self) -> &[PathBuf] {
        &self.loaded
    }

    /// Names of macros run so far, in order.
    pub fn macro_log(&self) -> &[String] {
        &self.macro_log
    }

    /// Whether the session has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Calculator for ScriptedCalculator {
    fn get_cell(&mut self, sheet: &str, cell_ref: &str) -> Result<CellValue, TeaError> {
        if self.closed {
            return Err(closed_error("calculator"));
        }
        self.cells
            .get(&cell(sheet, cell_ref))
            .cloned()
            .ok_or_else(|| {
                TeaError::Collaborator(
                    ErrorInfo::new("cell-not-found", "no such cell in workbook")
                        .with_context("location", format!("{sheet}!{cell_ref}")),
                )
            })
    }

    fn set_cell(&mut self, sheet: &str, cell_ref: &str, value: f64) -> Result<(), TeaError> {
        if self.closed {
            return Err(closed_error("calculator"));
        }
        self.cells
            .insert(cell(sheet, cell_ref), CellValue::Number(value));
        Ok(())
    }

    fn load_model_snapshot(&mut self, path: &Path) -> Result<(), TeaError> {
        if self.closed {
            return Err(closed_error("calculator"));
        }
        let contents = fs::read_to_string(path).map_err(|err| {
            TeaError::Collaborator(
                ErrorInfo::new("snapshot-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        let tree: BTreeMap<String, String> = serde_json::from_str(&contents).map_err(|err| {
            TeaError::Collaborator(
                ErrorInfo::new("snapshot-parse", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        self.model_view = numeric_view(&tree);
        self.loaded.push(path.to_path_buf());
        Ok(())
    }

    fn run_macro(&mut self, name: &str) -> Result<(), TeaError> {
        if self.closed {
            return Err(closed_error("calculator"));
        }
        self.macro_log.push(name.to_string());
        self.recalcs += 1;
        if let Some(recalc) = self.recalc.as_mut() {
            recalc(&self.model_view, &mut self.cells);
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), TeaError> {
        self.closed = true;
        Ok(())
    }
}

/// Numeric projection of a snapshot tree: plain numbers parse as-is,
/// expression nodes contribute the value after their last `=`.
fn numeric_view(tree: &BTreeMap<String, String>) -> BTreeMap<String, f64> {
    let mut view = BTreeMap::new();
    for (path, text) in tree {
        let tail = match text.rfind('=') {
            Some(pos) => &text[pos + 1..],
            None => text.as_str(),
        };
        if let Ok(value) = tail.trim().parse::<f64>() {
            view.insert(path.clone(), value);
        }
    }
    view
}
