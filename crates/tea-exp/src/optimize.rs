//! Optimization driver: derivative-free bound-constrained search over full
//! Model evaluations.
//!
//! Each declared output gets an independent search. The objective applies
//! the input vector to the Model, runs it, snapshots under a fresh
//! counter-based name, reloads the Calculator and reads the output cell;
//! evaluations are therefore expensive and the solver works under a hard
//! call budget. Non-convergence within budget is a normal terminal state
//! reported through the best point found, never an error.

use std::path::Path;

use tea_core::errors::{ErrorInfo, TeaError};
use tea_core::{OutputDescriptor, RngHandle, VariableDescriptor, VariableTarget};
use tea_model::{Calculator, Model, SnapshotDir};

use crate::config::{BoundedInputRow, SolverSettings};
use crate::eval::{evaluate_model, read_output};
use crate::trace::TraceLog;

/// One optimization variable with its inclusive search bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundedVariable {
    /// Resolved Model variable the solver moves.
    pub descriptor: VariableDescriptor,
    /// Lower search bound.
    pub lb: f64,
    /// Upper search bound.
    pub ub: f64,
}

impl BoundedVariable {
    /// Resolves a configured row; optimization inputs must live in the Model.
    pub fn from_row(row: &BoundedInputRow) -> Result<Self, TeaError> {
        let descriptor = VariableDescriptor::resolve(&row.variable)?;
        if !descriptor.is_model() {
            return Err(TeaError::Config(
                ErrorInfo::new("optimize-input", "optimization inputs must be Model variables")
                    .with_context("input", descriptor.name.clone()),
            ));
        }
        let (lb, ub) = row.bounds()?;
        Ok(Self { descriptor, lb, ub })
    }
}

/// Best point found for one output.
#[derive(Debug, Clone, PartialEq)]
pub struct SolutionRecord {
    /// Output the search optimized.
    pub output: String,
    /// Objective value at the solution.
    pub objective: f64,
    /// Variable name to solution value, in declared input order.
    pub input_values: Vec<(String, f64)>,
}

/// A search that aborted on a collaborator failure.
#[derive(Debug)]
pub struct OptimizeFailure {
    /// Output whose search aborted.
    pub output: String,
    /// The propagated failure.
    pub error: TeaError,
}

/// Outcome of an optimization run across all declared outputs.
#[derive(Debug, Default)]
pub struct OptimizeReport {
    /// One solution per output whose search completed.
    pub solutions: Vec<SolutionRecord>,
    /// Searches aborted by collaborator failures; other outputs are
    /// unaffected.
    pub failures: Vec<OptimizeFailure>,
}

/// Optimizes every declared output independently.
///
/// Trace logs are written to `<out_dir>/<output>_opt.log`, one line per
/// objective call. The initial point of each search is drawn uniformly
/// inside the declared bounds from a per-output RNG substream.
#[allow(clippy::too_many_arguments)]
pub fn optimize(
    model: &mut dyn Model,
    calculator: &mut dyn Calculator,
    snapshots: &mut SnapshotDir,
    inputs: &[BoundedVariable],
    outputs: &[OutputDescriptor],
    recalc_macro: &str,
    settings: &SolverSettings,
    out_dir: &Path,
    master_seed: u64,
) -> Result<OptimizeReport, TeaError> {
    if inputs.is_empty() {
        return Err(TeaError::Config(ErrorInfo::new(
            "optimize-inputs",
            "no optimization variables declared",
        )));
    }
    let bounds: Vec<(f64, f64)> = inputs.iter().map(|var| (var.lb, var.ub)).collect();

    let mut report = OptimizeReport::default();
    for (index, output) in outputs.iter().enumerate() {
        let mut rng = RngHandle::substream(master_seed, index as u64);
        let x0: Vec<f64> = inputs
            .iter()
            .map(|var| rng.uniform_in(var.lb, var.ub))
            .collect();
        let trace_path = out_dir.join(format!("{}_opt.log", output.name));
        let mut trace = TraceLog::to_file(&trace_path)?;

        tracing::info!(output = %output.name, "optimization search started");
        let searched = {
            let mut objective = |x: &[f64]| -> Result<f64, TeaError> {
                for (var, value) in inputs.iter().zip(x) {
                    match &var.descriptor.target {
                        VariableTarget::ModelPath {
                            path,
                            expression_tail: true,
                        } => model.set_expression_tail(path, *value)?,
                        VariableTarget::ModelPath { path, .. } => model.set_value(path, *value)?,
                        VariableTarget::CalculatorCell { .. } => {
                            // Excluded by `BoundedVariable::from_row`.
                            return Err(TeaError::Config(ErrorInfo::new(
                                "optimize-input",
                                "optimization inputs must be Model variables",
                            )));
                        }
                    }
                }
                evaluate_model(model, calculator, snapshots, recalc_macro)?;
                let value = read_output(calculator, output)?;
                trace.append(value, x)?;
                Ok(value)
            };
            minimize_bounded(&mut objective, &x0, &bounds, settings)
        };
        match searched {
            Ok(minimum) => {
                tracing::info!(
                    output = %output.name,
                    objective = minimum.objective,
                    evaluations = minimum.evaluations,
                    converged = minimum.converged,
                    "optimization search finished"
                );
                report.solutions.push(SolutionRecord {
                    output: output.name.clone(),
                    objective: minimum.objective,
                    input_values: inputs
                        .iter()
                        .zip(&minimum.x)
                        .map(|(var, value)| (var.descriptor.name.clone(), *value))
                        .collect(),
                });
            }
            Err(error) => {
                tracing::warn!(output = %output.name, error = %error, "optimization search aborted");
                report.failures.push(OptimizeFailure {
                    output: output.name.clone(),
                    error,
                });
            }
        }
    }
    Ok(report)
}

/// Terminal state of one bounded search.
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    /// Best input vector found.
    pub x: Vec<f64>,
    /// Objective value at `x`.
    pub objective: f64,
    /// Objective calls spent.
    pub evaluations: usize,
    /// Whether the step-size tolerance was reached within budget.
    pub converged: bool,
}

const REFLECTION_COEF: f64 = 1.0;
const EXPANSION_COEF: f64 = 2.0;
const CONTRACTION_COEF: f64 = 0.5;
const SHRINK_COEF: f64 = 0.5;

struct ScaledObjective<'a> {
    f: &'a mut dyn FnMut(&[f64]) -> Result<f64, TeaError>,
    bounds: &'a [(f64, f64)],
    used: usize,
    cap: usize,
    best_u: Vec<f64>,
    best_f: f64,
}

impl<'a> ScaledObjective<'a> {
    fn unscale(&self, u: &[f64]) -> Vec<f64> {
        u.iter()
            .zip(self.bounds)
            .map(|(ui, (lb, ub))| lb + ui * (ub - lb))
            .collect()
    }

    /// Evaluates at scaled coordinates; `Ok(None)` signals an exhausted
    /// budget.
    fn eval(&mut self, u: &[f64]) -> Result<Option<f64>, TeaError> {
        if self.used >= self.cap {
            return Ok(None);
        }
        self.used += 1;
        let x = self.unscale(u);
        let value = (self.f)(&x)?;
        if value < self.best_f {
            self.best_f = value;
            self.best_u = u.to_vec();
        }
        Ok(Some(value))
    }
}

fn clamp_unit(u: &mut [f64]) {
    for v in u.iter_mut() {
        *v = v.clamp(0.0, 1.0);
    }
}

fn centroid_excluding_worst(simplex: &[(Vec<f64>, f64)]) -> Vec<f64> {
    let n = simplex[0].0.len();
    let mut center = vec![0.0; n];
    for (vertex, _) in simplex.iter().take(simplex.len() - 1) {
        for (acc, v) in center.iter_mut().zip(vertex) {
            *acc += v;
        }
    }
    let count = (simplex.len() - 1) as f64;
    for v in &mut center {
        *v /= count;
    }
    center
}

fn simplex_size(simplex: &[(Vec<f64>, f64)], centroid: &[f64]) -> f64 {
    simplex
        .iter()
        .map(|(vertex, _)| {
            vertex
                .iter()
                .zip(centroid)
                .map(|(a, b)| (a - b).powi(2))
                .sum::<f64>()
                .sqrt()
        })
        .fold(0.0_f64, f64::max)
}

fn move_point(from: &[f64], toward: &[f64], coef: f64) -> Vec<f64> {
    toward
        .iter()
        .zip(from)
        .map(|(c, p)| c + coef * (c - p))
        .collect()
}

/// Minimizes a black-box objective inside rectangular bounds.
///
/// A Nelder-Mead simplex runs in coordinates scaled to the unit cube so
/// variables with very different numeric ranges converge comparably. The
/// search stops when the simplex diameter drops below the absolute step
/// tolerance or the objective-call budget is exhausted; either way the best
/// evaluated point is returned.
pub fn minimize_bounded(
    f: &mut dyn FnMut(&[f64]) -> Result<f64, TeaError>,
    x0: &[f64],
    bounds: &[(f64, f64)],
    settings: &SolverSettings,
) -> Result<Minimum, TeaError> {
    let n = x0.len();
    if n == 0 || bounds.len() != n {
        return Err(TeaError::Config(
            ErrorInfo::new("solver-dimensions", "empty or mismatched search dimensions")
                .with_context("x0", n.to_string())
                .with_context("bounds", bounds.len().to_string()),
        ));
    }
    for (lb, ub) in bounds {
        if !(lb < ub) {
            return Err(TeaError::Config(
                ErrorInfo::new("solver-bounds", "bounds must satisfy lb < ub")
                    .with_context("lb", lb.to_string())
                    .with_context("ub", ub.to_string()),
            ));
        }
    }
    if settings.max_evaluations == 0 {
        return Err(TeaError::Config(ErrorInfo::new(
            "solver-budget",
            "objective evaluation budget must be positive",
        )));
    }

    let u0: Vec<f64> = x0
        .iter()
        .zip(bounds)
        .map(|(x, (lb, ub))| ((x - lb) / (ub - lb)).clamp(0.0, 1.0))
        .collect();
    let mut objective = ScaledObjective {
        f,
        bounds,
        used: 0,
        cap: settings.max_evaluations,
        best_u: u0.clone(),
        best_f: f64::INFINITY,
    };

    let mut converged = false;
    let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(n + 1);
    'search: {
        match objective.eval(&u0)? {
            Some(value) => simplex.push((u0.clone(), value)),
            None => break 'search,
        }
        for i in 0..n {
            let mut vertex = u0.clone();
            if vertex[i] + 0.1 <= 1.0 {
                vertex[i] += 0.1;
            } else {
                vertex[i] -= 0.1;
            }
            clamp_unit(&mut vertex);
            match objective.eval(&vertex)? {
                Some(value) => simplex.push((vertex, value)),
                None => break 'search,
            }
        }

        loop {
            simplex.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
            let cent = centroid_excluding_worst(&simplex);
            if simplex_size(&simplex, &cent) < settings.step_tolerance {
                converged = true;
                break;
            }

            let best = simplex[0].1;
            let second_worst = simplex[simplex.len() - 2].1;
            let worst = simplex[simplex.len() - 1].1;
            let worst_point = simplex[simplex.len() - 1].0.clone();
            let worst_idx = simplex.len() - 1;

            let mut reflected = move_point(&worst_point, &cent, REFLECTION_COEF);
            clamp_unit(&mut reflected);
            let Some(reflected_f) = objective.eval(&reflected)? else {
                break;
            };

            if reflected_f < best {
                let mut expanded = move_point(&worst_point, &cent, EXPANSION_COEF);
                clamp_unit(&mut expanded);
                let Some(expanded_f) = objective.eval(&expanded)? else {
                    break;
                };
                if expanded_f < reflected_f {
                    simplex[worst_idx] = (expanded, expanded_f);
                } else {
                    simplex[worst_idx] = (reflected, reflected_f);
                }
            } else if reflected_f < second_worst {
                simplex[worst_idx] = (reflected, reflected_f);
            } else {
                let contract_from = if reflected_f < worst {
                    &reflected
                } else {
                    &worst_point
                };
                let mut contracted: Vec<f64> = cent
                    .iter()
                    .zip(contract_from)
                    .map(|(c, p)| c + CONTRACTION_COEF * (p - c))
                    .collect();
                clamp_unit(&mut contracted);
                let Some(contracted_f) = objective.eval(&contracted)? else {
                    break;
                };
                if contracted_f < worst {
                    simplex[worst_idx] = (contracted, contracted_f);
                } else {
                    let best_point = simplex[0].0.clone();
                    let mut exhausted = false;
                    for vertex in simplex.iter_mut().skip(1) {
                        let mut shrunk: Vec<f64> = best_point
                            .iter()
                            .zip(&vertex.0)
                            .map(|(b, v)| b + SHRINK_COEF * (v - b))
                            .collect();
                        clamp_unit(&mut shrunk);
                        match objective.eval(&shrunk)? {
                            Some(value) => *vertex = (shrunk, value),
                            None => {
                                exhausted = true;
                                break;
                            }
                        }
                    }
                    if exhausted {
                        break;
                    }
                }
            }
        }
    }

    let best_x = objective.unscale(&objective.best_u);
    Ok(Minimum {
        x: best_x,
        objective: objective.best_f,
        evaluations: objective.used,
        converged,
    })
}
