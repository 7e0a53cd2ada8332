//! Sweep executor: grid sweeps over 2-3 axes and index-synchronous batches.
//!
//! Evaluation order is fixed lexicographic in `(axis1, axis2, axis3)`; each
//! tensor cell is written exactly once and snapshot names reproduce across
//! runs with identical inputs. Which collaborator evaluates a combination
//! depends on where the swept variables live: calculator-only sweeps never
//! re-run the Model, model sweeps snapshot after every combination, and the
//! mixed 2-variable sweep keeps the Model variable on the outer loop so the
//! Model runs once per outer value only.

use tea_core::errors::{ErrorInfo, TeaError};
use tea_core::{OutputDescriptor, SampleSet};
use tea_model::{Calculator, Model, SnapshotDir};

use crate::eval::{apply_variable, evaluate_model, read_output, refresh_calculator};
use crate::tensor::{Axis, ResultTensor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GridKind {
    CalculatorOnly,
    ModelOnly,
    Mixed { model_axis: usize, calc_axis: usize },
}

fn classify(inputs: &[SampleSet]) -> Result<GridKind, TeaError> {
    if !(2..=3).contains(&inputs.len()) {
        return Err(TeaError::Config(
            ErrorInfo::new("sweep-axes", "only 2-3 input variables are acceptable")
                .with_context("axes", inputs.len().to_string()),
        ));
    }
    for set in inputs {
        if set.is_empty() {
            return Err(TeaError::Config(
                ErrorInfo::new("sweep-empty-axis", "swept axis has no sample values")
                    .with_context("input", set.descriptor.name.clone()),
            ));
        }
    }
    let model_axes: Vec<usize> = inputs
        .iter()
        .enumerate()
        .filter(|(_, set)| set.descriptor.is_model())
        .map(|(idx, _)| idx)
        .collect();
    match (inputs.len(), model_axes.len()) {
        (_, 0) => Ok(GridKind::CalculatorOnly),
        (n, m) if n == m => Ok(GridKind::ModelOnly),
        (2, 1) => Ok(GridKind::Mixed {
            model_axis: model_axes[0],
            calc_axis: 1 - model_axes[0],
        }),
        _ => Err(TeaError::Config(
            ErrorInfo::new(
                "sweep-mixed",
                "mixed sweeps support exactly one Model and one Calculator variable",
            )
            .with_context("axes", inputs.len().to_string())
            .with_context("model_axes", model_axes.len().to_string()),
        )),
    }
}

fn make_tensors(
    inputs: &[SampleSet],
    outputs: &[OutputDescriptor],
) -> Result<Vec<ResultTensor>, TeaError> {
    outputs
        .iter()
        .map(|output| {
            ResultTensor::from_axes(
                output.label(),
                inputs.iter().map(Axis::from_sample_set).collect(),
            )
        })
        .collect()
}

fn record(
    tensors: &mut [ResultTensor],
    calculator: &mut dyn Calculator,
    outputs: &[OutputDescriptor],
    index: &[usize],
) -> Result<(), TeaError> {
    for (tensor, output) in tensors.iter_mut().zip(outputs) {
        let value = read_output(calculator, output)?;
        tensor.set(index, value)?;
    }
    Ok(())
}

/// Runs a grid sweep over the Cartesian product of 2-3 input axes and
/// returns one complete [`ResultTensor`] per declared output.
pub fn run_grid(
    model: &mut dyn Model,
    calculator: &mut dyn Calculator,
    snapshots: &mut SnapshotDir,
    inputs: &[SampleSet],
    outputs: &[OutputDescriptor],
    recalc_macro: &str,
) -> Result<Vec<ResultTensor>, TeaError> {
    let kind = classify(inputs)?;
    match kind {
        GridKind::CalculatorOnly => {
            grid_calculator(model, calculator, inputs, outputs, recalc_macro)
        }
        GridKind::ModelOnly => {
            grid_model(model, calculator, snapshots, inputs, outputs, recalc_macro)
        }
        GridKind::Mixed {
            model_axis,
            calc_axis,
        } => {
            // The Model axis is the outer loop regardless of row order;
            // the tensors carry the axes in evaluation order.
            let ordered = [inputs[model_axis].clone(), inputs[calc_axis].clone()];
            grid_mixed(model, calculator, snapshots, &ordered, outputs, recalc_macro)
        }
    }
}

fn grid_calculator(
    model: &mut dyn Model,
    calculator: &mut dyn Calculator,
    inputs: &[SampleSet],
    outputs: &[OutputDescriptor],
    recalc_macro: &str,
) -> Result<Vec<ResultTensor>, TeaError> {
    let mut tensors = make_tensors(inputs, outputs)?;
    let archive = model.archive_path().to_path_buf();
    match inputs {
        [a1, a2] => {
            for (i1, v1) in a1.values.iter().enumerate() {
                apply_variable(model, calculator, &a1.descriptor, *v1)?;
                for (i2, v2) in a2.values.iter().enumerate() {
                    apply_variable(model, calculator, &a2.descriptor, *v2)?;
                    refresh_calculator(calculator, &archive, recalc_macro)?;
                    record(&mut tensors, calculator, outputs, &[i1, i2])?;
                }
            }
        }
        [a1, a2, a3] => {
            for (i1, v1) in a1.values.iter().enumerate() {
                apply_variable(model, calculator, &a1.descriptor, *v1)?;
                for (i2, v2) in a2.values.iter().enumerate() {
                    apply_variable(model, calculator, &a2.descriptor, *v2)?;
                    for (i3, v3) in a3.values.iter().enumerate() {
                        apply_variable(model, calculator, &a3.descriptor, *v3)?;
                        refresh_calculator(calculator, &archive, recalc_macro)?;
                        record(&mut tensors, calculator, outputs, &[i1, i2, i3])?;
                    }
                }
            }
        }
        other => {
            return Err(TeaError::Config(
                ErrorInfo::new("sweep-axes", "only 2-3 input variables are acceptable")
                    .with_context("axes", other.len().to_string()),
            ))
        }
    }
    Ok(tensors)
}

fn grid_model(
    model: &mut dyn Model,
    calculator: &mut dyn Calculator,
    snapshots: &mut SnapshotDir,
    inputs: &[SampleSet],
    outputs: &[OutputDescriptor],
    recalc_macro: &str,
) -> Result<Vec<ResultTensor>, TeaError> {
    let mut tensors = make_tensors(inputs, outputs)?;
    match inputs {
        [a1, a2] => {
            for (i1, v1) in a1.values.iter().enumerate() {
                apply_variable(model, calculator, &a1.descriptor, *v1)?;
                for (i2, v2) in a2.values.iter().enumerate() {
                    apply_variable(model, calculator, &a2.descriptor, *v2)?;
                    evaluate_model(model, calculator, snapshots, recalc_macro)?;
                    record(&mut tensors, calculator, outputs, &[i1, i2])?;
                }
            }
        }
        [a1, a2, a3] => {
            for (i1, v1) in a1.values.iter().enumerate() {
                apply_variable(model, calculator, &a1.descriptor, *v1)?;
                for (i2, v2) in a2.values.iter().enumerate() {
                    apply_variable(model, calculator, &a2.descriptor, *v2)?;
                    for (i3, v3) in a3.values.iter().enumerate() {
                        apply_variable(model, calculator, &a3.descriptor, *v3)?;
                        evaluate_model(model, calculator, snapshots, recalc_macro)?;
                        record(&mut tensors, calculator, outputs, &[i1, i2, i3])?;
                    }
                }
            }
        }
        other => {
            return Err(TeaError::Config(
                ErrorInfo::new("sweep-axes", "only 2-3 input variables are acceptable")
                    .with_context("axes", other.len().to_string()),
            ))
        }
    }
    Ok(tensors)
}

fn grid_mixed(
    model: &mut dyn Model,
    calculator: &mut dyn Calculator,
    snapshots: &mut SnapshotDir,
    ordered: &[SampleSet; 2],
    outputs: &[OutputDescriptor],
    recalc_macro: &str,
) -> Result<Vec<ResultTensor>, TeaError> {
    let mut tensors = make_tensors(ordered, outputs)?;
    let [model_set, calc_set] = ordered;
    for (i1, v1) in model_set.values.iter().enumerate() {
        apply_variable(model, calculator, &model_set.descriptor, *v1)?;
        // One Model run and one snapshot per outer value; the inner loop
        // re-reads the same snapshot.
        model.run()?;
        let snapshot = snapshots.next_path()?;
        model.save_snapshot(&snapshot)?;
        for (i2, v2) in calc_set.values.iter().enumerate() {
            apply_variable(model, calculator, &calc_set.descriptor, *v2)?;
            refresh_calculator(calculator, &snapshot, recalc_macro)?;
            record(&mut tensors, calculator, outputs, &[i1, i2])?;
        }
    }
    Ok(tensors)
}

/// One output column of a batch run.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchColumn {
    /// Output label in the `name (unit)` convention.
    pub label: String,
    /// One value per run, in run order.
    pub values: Vec<f64>,
}

/// Result of an index-synchronous batch evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    /// Number of evaluations performed.
    pub runs: usize,
    /// One column per declared output.
    pub columns: Vec<BatchColumn>,
}

/// Runs a batch: the `i`-th combination takes the `i`-th value from every
/// sample set (no cross product), producing one scalar per output per run.
///
/// A Model run (plus snapshot and Calculator reload) happens per combination
/// only when at least one variable is Model-bound; otherwise the Calculator
/// re-evaluates against the Model's archive file. Monte-Carlo subsampling
/// happens upstream (see [`crate::sample::subsample`]); here every sample
/// set must already hold one value per run.
pub fn run_batch(
    model: &mut dyn Model,
    calculator: &mut dyn Calculator,
    snapshots: &mut SnapshotDir,
    inputs: &[SampleSet],
    outputs: &[OutputDescriptor],
    recalc_macro: &str,
) -> Result<BatchResult, TeaError> {
    if inputs.is_empty() {
        return Err(TeaError::Config(ErrorInfo::new(
            "batch-inputs",
            "batch evaluation needs at least one input variable",
        )));
    }
    let runs = inputs[0].len();
    for set in inputs {
        if set.len() != runs {
            return Err(TeaError::Alignment(
                ErrorInfo::new("length-mismatch", "sample sets differ in length")
                    .with_context("input", set.descriptor.name.clone())
                    .with_context("len", set.len().to_string())
                    .with_context("expected", runs.to_string()),
            ));
        }
    }

    let uses_model = inputs.iter().any(|set| set.descriptor.is_model());
    let archive = model.archive_path().to_path_buf();
    let mut columns: Vec<BatchColumn> = outputs
        .iter()
        .map(|output| BatchColumn {
            label: output.label(),
            values: Vec::with_capacity(runs),
        })
        .collect();

    for run in 0..runs {
        for set in inputs {
            apply_variable(model, calculator, &set.descriptor, set.values[run])?;
        }
        if uses_model {
            evaluate_model(model, calculator, snapshots, recalc_macro)?;
        } else {
            refresh_calculator(calculator, &archive, recalc_macro)?;
        }
        for (column, output) in columns.iter_mut().zip(outputs) {
            column.values.push(read_output(calculator, output)?);
        }
    }
    tracing::info!(runs, outputs = outputs.len(), "batch evaluation complete");
    Ok(BatchResult { runs, columns })
}
