//! Session contract for the two external collaborators driven by the TEA
//! engine: the process-simulation **Model** and the spreadsheet
//! **Calculator**.
//!
//! Both collaborators are slow, stateful, single-session applications living
//! outside this process. Every operation below blocks until the collaborator
//! returns and raises [`TeaError::Collaborator`] on any internal failure;
//! nothing here retries. Sessions are explicit handles passed into every
//! orchestration entry point, and [`session::run_with_sessions`] guarantees
//! `close` on success and on every error path.

use std::path::Path;

use tea_core::errors::{ErrorInfo, TeaError};

pub mod bridge;
pub mod expr;
pub mod scripted;
pub mod session;
pub mod snapshot;

pub use bridge::{BridgeCalculator, BridgeModel};
pub use expr::splice_expression_tail;
pub use scripted::{ScriptedCalculator, ScriptedModel};
pub use session::run_with_sessions;
pub use snapshot::SnapshotDir;

/// Value stored in a Calculator cell.
///
/// Workbook cells hold either numbers or text; output readouts coerce to
/// numbers and fail as a collaborator error when the text does not parse.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Numeric cell content.
    Number(f64),
    /// Textual cell content.
    Text(String),
}

impl CellValue {
    /// Coerces the cell content to a number.
    pub fn as_number(&self) -> Result<f64, TeaError> {
        match self {
            CellValue::Number(v) => Ok(*v),
            CellValue::Text(text) => text.trim().parse::<f64>().map_err(|_| {
                TeaError::Collaborator(
                    ErrorInfo::new("cell-not-numeric", "cell content is not a number")
                        .with_context("content", text.clone()),
                )
            }),
        }
    }
}

/// Stateful external process-simulation session.
///
/// A session is opened from an archive file and mutated in place by value
/// writes; [`Model::run`] re-initializes and executes the simulation, and
/// [`Model::save_snapshot`] persists the complete current state so the
/// Calculator can read it without touching the live session.
pub trait Model {
    /// Archive file the session was opened from. Calculator-only sweeps
    /// point the Calculator at this file instead of a fresh snapshot.
    fn archive_path(&self) -> &Path;

    /// Overwrites the value of a tree node.
    fn set_value(&mut self, path: &str, value: f64) -> Result<(), TeaError>;

    /// Splices `value` after the trailing `=` of the expression string
    /// stored at `path`, leaving the expression head untouched. The stored
    /// text must contain `=`; anything else is a collaborator error.
    fn set_expression_tail(&mut self, path: &str, value: f64) -> Result<(), TeaError>;

    /// Re-initializes and executes the simulation, blocking until the
    /// engine has fully settled.
    fn run(&mut self) -> Result<(), TeaError>;

    /// Writes the complete current session state to a new file at `path`.
    fn save_snapshot(&mut self, path: &Path) -> Result<(), TeaError>;

    /// Releases the external session.
    fn close(&mut self) -> Result<(), TeaError>;
}

/// Stateful external spreadsheet-calculation session.
pub trait Calculator {
    /// Reads a cell after recalculation.
    fn get_cell(&mut self, sheet: &str, cell: &str) -> Result<CellValue, TeaError>;

    /// Writes a numeric value into a cell.
    fn set_cell(&mut self, sheet: &str, cell: &str, value: f64) -> Result<(), TeaError>;

    /// Points the workbook at a Model snapshot file and triggers its
    /// internal data refresh.
    fn load_model_snapshot(&mut self, path: &Path) -> Result<(), TeaError>;

    /// Runs a named workbook macro.
    fn run_macro(&mut self, name: &str) -> Result<(), TeaError>;

    /// Releases the external session.
    fn close(&mut self) -> Result<(), TeaError>;
}
