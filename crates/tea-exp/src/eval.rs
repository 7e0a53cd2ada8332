//! Shared single-evaluation plumbing for sweeps and optimization.

use std::path::{Path, PathBuf};

use tea_core::errors::TeaError;
use tea_core::{OutputDescriptor, VariableDescriptor, VariableTarget};
use tea_model::{Calculator, Model, SnapshotDir};

/// Applies one value through the collaborator owning the variable.
pub(crate) fn apply_variable(
    model: &mut dyn Model,
    calculator: &mut dyn Calculator,
    descriptor: &VariableDescriptor,
    value: f64,
) -> Result<(), TeaError> {
    match &descriptor.target {
        VariableTarget::CalculatorCell { sheet, cell } => calculator.set_cell(sheet, cell, value),
        VariableTarget::ModelPath {
            path,
            expression_tail,
        } => {
            if *expression_tail {
                model.set_expression_tail(path, value)
            } else {
                model.set_value(path, value)
            }
        }
    }
}

/// One full Model evaluation: run, snapshot under a fresh counter-based
/// name, point the Calculator at the snapshot and recalculate.
pub(crate) fn evaluate_model(
    model: &mut dyn Model,
    calculator: &mut dyn Calculator,
    snapshots: &mut SnapshotDir,
    recalc_macro: &str,
) -> Result<PathBuf, TeaError> {
    model.run()?;
    let snapshot = snapshots.next_path()?;
    model.save_snapshot(&snapshot)?;
    calculator.load_model_snapshot(&snapshot)?;
    calculator.run_macro(recalc_macro)?;
    Ok(snapshot)
}

/// Calculator-only evaluation against an existing Model file.
pub(crate) fn refresh_calculator(
    calculator: &mut dyn Calculator,
    source: &Path,
    recalc_macro: &str,
) -> Result<(), TeaError> {
    calculator.load_model_snapshot(source)?;
    calculator.run_macro(recalc_macro)
}

/// Reads one declared output cell as a scalar.
pub(crate) fn read_output(
    calculator: &mut dyn Calculator,
    output: &OutputDescriptor,
) -> Result<f64, TeaError> {
    calculator.get_cell(&output.sheet, &output.cell)?.as_number()
}
