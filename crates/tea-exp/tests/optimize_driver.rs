use std::fs;

use tea_core::{RawVariableRow, TeaError};
use tea_exp::config::{BoundedInputRow, SolverSettings};
use tea_exp::{minimize_bounded, optimize, BoundedVariable};
use tea_model::scripted::cell;
use tea_model::{CellValue, ScriptedCalculator, ScriptedModel, SnapshotDir};

fn bounded_row(input: &str, location: &str, range: &str) -> BoundedInputRow {
    BoundedInputRow {
        variable: RawVariableRow {
            input: input.to_string(),
            location: location.to_string(),
            fortran: None,
            unit: None,
        },
        range: range.to_string(),
    }
}

#[test]
fn quadratic_bowl_converges_inside_bounds() {
    let settings = SolverSettings {
        step_tolerance: 1e-6,
        max_evaluations: 400,
    };
    let mut calls = Vec::new();
    let mut objective = |x: &[f64]| -> Result<f64, TeaError> {
        let value = (x[0] - 0.3).powi(2) + (x[1] + 1.5).powi(2);
        calls.push(value);
        Ok(value)
    };
    let minimum = minimize_bounded(
        &mut objective,
        &[0.9, 0.9],
        &[(-1.0, 1.0), (-2.0, 2.0)],
        &settings,
    )
    .unwrap();

    assert!(minimum.evaluations <= settings.max_evaluations);
    assert_eq!(minimum.evaluations, calls.len());
    assert!((minimum.x[0] - 0.3).abs() < 1e-2);
    assert!((minimum.x[1] + 1.5).abs() < 1e-2);
    // The reported objective is the best of every recorded call.
    assert!(calls.iter().all(|&f| minimum.objective <= f));
}

#[test]
fn exhausted_budget_reports_best_found() {
    let settings = SolverSettings {
        step_tolerance: 1e-12,
        max_evaluations: 5,
    };
    let mut best_seen = f64::INFINITY;
    let mut objective = |x: &[f64]| -> Result<f64, TeaError> {
        let value = x[0].powi(2);
        best_seen = best_seen.min(value);
        Ok(value)
    };
    let minimum = minimize_bounded(&mut objective, &[7.0], &[(-10.0, 10.0)], &settings).unwrap();
    assert_eq!(minimum.evaluations, 5);
    assert!(!minimum.converged);
    assert_eq!(minimum.objective, best_seen);
}

#[test]
fn solver_rejects_degenerate_setups() {
    let settings = SolverSettings::default();
    let mut objective = |_: &[f64]| -> Result<f64, TeaError> { Ok(0.0) };
    assert!(minimize_bounded(&mut objective, &[], &[], &settings).is_err());
    assert!(minimize_bounded(&mut objective, &[0.0], &[(1.0, 1.0)], &settings).is_err());
}

#[test]
fn optimization_inputs_must_be_model_variables() {
    let err = BoundedVariable::from_row(&bounded_row("x", "OPEX!B2", "0,1")).unwrap_err();
    assert!(matches!(err, TeaError::Config(_)));
    let err = BoundedVariable::from_row(&bounded_row("x", "PATH", "1,0")).unwrap_err();
    assert_eq!(err.info().code, "range-order");
}

fn scripted_pair(tmp: &std::path::Path) -> (ScriptedModel, ScriptedCalculator) {
    let model = ScriptedModel::open(tmp.join("plant.bkp"), &[("X1", "0"), ("X2", "0")]);
    let calculator = ScriptedCalculator::open(&[]).with_recalc(Box::new(|view, cells| {
        // Convex objective with its minimum at (2, -1) inside the bounds.
        let value = (view["X1"] - 2.0).powi(2) + (view["X2"] + 1.0).powi(2) + 1.25;
        cells.insert(cell("DCFROR", "B36"), CellValue::Number(value));
    }));
    (model, calculator)
}

#[test]
fn driver_writes_traces_and_solutions() {
    let tmp = tempfile::tempdir().unwrap();
    let (mut model, mut calculator) = scripted_pair(tmp.path());
    let mut snapshots = SnapshotDir::new(tmp.path());

    let inputs = [
        BoundedVariable::from_row(&bounded_row("x1", "X1", "0,5")).unwrap(),
        BoundedVariable::from_row(&bounded_row("x2", "X2", "-3,3")).unwrap(),
    ];
    let outputs = [tea_core::OutputDescriptor::resolve("MFSP", "DCFROR!B36", Some("$/gal")).unwrap()];
    let settings = SolverSettings {
        step_tolerance: 1e-5,
        max_evaluations: 120,
    };

    let report = optimize(
        &mut model,
        &mut calculator,
        &mut snapshots,
        &inputs,
        &outputs,
        "solvedcfror",
        &settings,
        tmp.path(),
        2024,
    )
    .unwrap();

    assert!(report.failures.is_empty());
    let solution = &report.solutions[0];
    assert_eq!(solution.output, "MFSP");
    assert!((solution.input_values[0].1 - 2.0).abs() < 0.1);
    assert!((solution.input_values[1].1 + 1.0).abs() < 0.1);
    assert!(solution.objective >= 1.25);
    assert!(solution.objective < 1.5);

    // Trace log: one line per objective call, capped by the budget, and the
    // solution is at least as good as every recorded evaluation.
    let trace = fs::read_to_string(tmp.path().join("MFSP_opt.log")).unwrap();
    let lines: Vec<&str> = trace.lines().collect();
    assert!(!lines.is_empty());
    assert!(lines.len() <= settings.max_evaluations);
    for line in &lines {
        assert!(line.starts_with("Function eval "));
        let f: f64 = line
            .split("f = ")
            .nth(1)
            .and_then(|rest| rest.split(" at x").next())
            .unwrap()
            .parse()
            .unwrap();
        assert!(solution.objective <= f + 1e-12);
    }
    // Snapshot files accumulated, one per evaluation.
    assert_eq!(snapshots.count() as usize, lines.len());
}

#[test]
fn one_failed_search_leaves_other_outputs_untouched() {
    let tmp = tempfile::tempdir().unwrap();
    let (mut model, mut calculator) = scripted_pair(tmp.path());
    // The very first objective call of the first output fails; the second
    // output runs a fresh, unaffected search.
    model.fail_next_run();
    let mut snapshots = SnapshotDir::new(tmp.path());

    let inputs = [BoundedVariable::from_row(&bounded_row("x1", "X1", "0,5")).unwrap()];
    let outputs = [
        tea_core::OutputDescriptor::resolve("First", "DCFROR!B36", None).unwrap(),
        tea_core::OutputDescriptor::resolve("Second", "DCFROR!B36", None).unwrap(),
    ];
    let settings = SolverSettings {
        step_tolerance: 1e-4,
        max_evaluations: 60,
    };

    let report = optimize(
        &mut model,
        &mut calculator,
        &mut snapshots,
        &inputs,
        &outputs,
        "solvedcfror",
        &settings,
        tmp.path(),
        7,
    )
    .unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].output, "First");
    assert!(matches!(report.failures[0].error, TeaError::Collaborator(_)));
    assert_eq!(report.solutions.len(), 1);
    assert_eq!(report.solutions[0].output, "Second");
}
