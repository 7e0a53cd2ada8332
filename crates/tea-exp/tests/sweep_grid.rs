use std::cell::RefCell;
use std::rc::Rc;

use tea_core::{RawVariableRow, SampleSet, TeaError, VariableDescriptor};
use tea_exp::{run_batch, run_grid};
use tea_model::scripted::cell;
use tea_model::{CellValue, ScriptedCalculator, ScriptedModel, SnapshotDir};

fn set(input: &str, location: &str, values: &[f64]) -> SampleSet {
    let descriptor = VariableDescriptor::resolve(&RawVariableRow {
        input: input.to_string(),
        location: location.to_string(),
        fortran: None,
        unit: None,
    })
    .unwrap();
    SampleSet::new(descriptor, values.to_vec())
}

fn output(name: &str, location: &str) -> tea_core::OutputDescriptor {
    tea_core::OutputDescriptor::resolve(name, location, None).unwrap()
}

fn number(cells: &std::collections::BTreeMap<(String, String), CellValue>, sheet: &str, cell_ref: &str) -> f64 {
    match cells.get(&cell(sheet, cell_ref)) {
        Some(CellValue::Number(v)) => *v,
        other => panic!("cell {sheet}!{cell_ref} missing or non-numeric: {other:?}"),
    }
}

#[test]
fn calculator_grid_never_runs_the_model() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = tmp.path().join("plant.bkp");
    let model = ScriptedModel::open(&archive, &[]);
    model.publish_archive().unwrap();
    let mut model = model;

    let mut calculator =
        ScriptedCalculator::open(&[(("IN", "A1"), 0.0), (("IN", "A2"), 0.0)]).with_recalc(
            Box::new(|_, cells| {
                let v = 100.0 * number(cells, "IN", "A1") + number(cells, "IN", "A2");
                cells.insert(cell("OUT", "B1"), CellValue::Number(v));
            }),
        );

    let inputs = [
        set("Enzyme cost", "IN!A1", &[1.0, 2.0]),
        set("Feed cost", "IN!A2", &[10.0, 20.0, 30.0]),
    ];
    let outputs = [output("MFSP", "OUT!B1")];
    let mut snapshots = SnapshotDir::new(tmp.path());

    let tensors = run_grid(
        &mut model,
        &mut calculator,
        &mut snapshots,
        &inputs,
        &outputs,
        "solvedcfror",
    )
    .unwrap();

    assert_eq!(model.runs(), 0);
    assert_eq!(snapshots.count(), 0);
    assert_eq!(calculator.recalcs(), 6);

    let tensor = &tensors[0];
    assert!(tensor.is_complete());
    for (i1, v1) in [1.0, 2.0].iter().enumerate() {
        for (i2, v2) in [10.0, 20.0, 30.0].iter().enumerate() {
            assert_eq!(tensor.get(&[i1, i2]).unwrap(), Some(100.0 * v1 + v2));
        }
    }
}

#[test]
fn model_grid_2x2x2_evaluates_lexicographically() {
    let tmp = tempfile::tempdir().unwrap();
    let mut model = ScriptedModel::open(
        tmp.path().join("plant.bkp"),
        &[("P1", "0"), ("P2", "0"), ("P3", "0")],
    );

    let evaluations: Rc<RefCell<Vec<f64>>> = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&evaluations);
    let mut calculator = ScriptedCalculator::open(&[]).with_recalc(Box::new(move |view, cells| {
        let v = 100.0 * view["P1"] + 10.0 * view["P2"] + view["P3"];
        log.borrow_mut().push(v);
        cells.insert(cell("OUT", "B1"), CellValue::Number(v));
    }));

    let inputs = [
        set("p1", "P1", &[0.0, 1.0]),
        set("p2", "P2", &[0.0, 1.0]),
        set("p3", "P3", &[0.0, 1.0]),
    ];
    let outputs = [output("MFSP", "OUT!B1")];
    let mut snapshots = SnapshotDir::new(tmp.path());

    let tensors = run_grid(
        &mut model,
        &mut calculator,
        &mut snapshots,
        &inputs,
        &outputs,
        "solvedcfror",
    )
    .unwrap();

    // Exactly 8 combinations, one Model run and one snapshot each.
    assert_eq!(model.runs(), 8);
    assert_eq!(snapshots.count(), 8);
    assert_eq!(
        *evaluations.borrow(),
        vec![0.0, 1.0, 10.0, 11.0, 100.0, 101.0, 110.0, 111.0]
    );

    let tensor = &tensors[0];
    assert!(tensor.is_complete());
    for i1 in 0..2 {
        for i2 in 0..2 {
            for i3 in 0..2 {
                assert_eq!(
                    tensor.get(&[i1, i2, i3]).unwrap(),
                    Some((100 * i1 + 10 * i2 + i3) as f64)
                );
            }
        }
    }
}

#[test]
fn mixed_sweep_keeps_the_model_axis_outer() {
    let tmp = tempfile::tempdir().unwrap();
    let mut model = ScriptedModel::open(tmp.path().join("plant.bkp"), &[("M", "0")]);
    let mut calculator =
        ScriptedCalculator::open(&[(("IN", "C1"), 0.0)]).with_recalc(Box::new(|view, cells| {
            let v = 10.0 * view["M"] + number(cells, "IN", "C1");
            cells.insert(cell("OUT", "B1"), CellValue::Number(v));
        }));

    // Config order lists the Calculator variable first; the executor must
    // still sweep the Model variable on the outer loop.
    let inputs = [
        set("inner", "IN!C1", &[5.0, 6.0]),
        set("outer", "M", &[1.0, 2.0, 3.0]),
    ];
    let outputs = [output("MFSP", "OUT!B1")];
    let mut snapshots = SnapshotDir::new(tmp.path());

    let tensors = run_grid(
        &mut model,
        &mut calculator,
        &mut snapshots,
        &inputs,
        &outputs,
        "solvedcfror",
    )
    .unwrap();

    // m outer Model runs/snapshots, m*n Calculator re-evaluations.
    assert_eq!(model.runs(), 3);
    assert_eq!(snapshots.count(), 3);
    assert_eq!(calculator.recalcs(), 6);

    let tensor = &tensors[0];
    assert_eq!(tensor.axes()[0].label, "outer");
    assert_eq!(tensor.axes()[1].label, "inner");
    for (i1, m) in [1.0, 2.0, 3.0].iter().enumerate() {
        for (i2, c) in [5.0, 6.0].iter().enumerate() {
            assert_eq!(tensor.get(&[i1, i2]).unwrap(), Some(10.0 * m + c));
        }
    }
}

#[test]
fn axis_counts_outside_two_to_three_are_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let mut model = ScriptedModel::open(tmp.path().join("plant.bkp"), &[]);
    let mut calculator = ScriptedCalculator::open(&[]);
    let mut snapshots = SnapshotDir::new(tmp.path());
    let outputs = [output("MFSP", "OUT!B1")];

    let one = [set("a", "IN!A1", &[1.0])];
    let err = run_grid(
        &mut model,
        &mut calculator,
        &mut snapshots,
        &one,
        &outputs,
        "solvedcfror",
    )
    .unwrap_err();
    assert!(matches!(err, TeaError::Config(_)));
    assert!(err.to_string().contains("only 2-3 input variables"));

    let four = [
        set("a", "IN!A1", &[1.0]),
        set("b", "IN!A2", &[1.0]),
        set("c", "IN!A3", &[1.0]),
        set("d", "IN!A4", &[1.0]),
    ];
    let err = run_grid(
        &mut model,
        &mut calculator,
        &mut snapshots,
        &four,
        &outputs,
        "solvedcfror",
    )
    .unwrap_err();
    assert!(matches!(err, TeaError::Config(_)));
}

#[test]
fn batch_is_index_synchronous() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = tmp.path().join("plant.bkp");
    let model = ScriptedModel::open(&archive, &[]);
    model.publish_archive().unwrap();
    let mut model = model;

    let mut calculator =
        ScriptedCalculator::open(&[(("IN", "A1"), 0.0), (("IN", "A2"), 0.0)]).with_recalc(
            Box::new(|_, cells| {
                let v = number(cells, "IN", "A1") + number(cells, "IN", "A2");
                cells.insert(cell("OUT", "B1"), CellValue::Number(v));
            }),
        );

    let inputs = [
        set("a", "IN!A1", &[1.0, 2.0, 3.0]),
        set("b", "IN!A2", &[10.0, 20.0, 30.0]),
    ];
    let outputs = [output("Total", "OUT!B1")];
    let mut snapshots = SnapshotDir::new(tmp.path());

    let batch = run_batch(
        &mut model,
        &mut calculator,
        &mut snapshots,
        &inputs,
        &outputs,
        "solvedcfror",
    )
    .unwrap();

    // Three runs, not a 3x3 cross product.
    assert_eq!(batch.runs, 3);
    assert_eq!(batch.columns[0].values, vec![11.0, 22.0, 33.0]);
    assert_eq!(model.runs(), 0);
}

#[test]
fn batch_with_a_model_variable_runs_the_model_each_run() {
    let tmp = tempfile::tempdir().unwrap();
    let mut model = ScriptedModel::open(tmp.path().join("plant.bkp"), &[("M", "0")]);
    let mut calculator =
        ScriptedCalculator::open(&[(("IN", "C1"), 0.0)]).with_recalc(Box::new(|view, cells| {
            let v = view["M"] + number(cells, "IN", "C1");
            cells.insert(cell("OUT", "B1"), CellValue::Number(v));
        }));

    let inputs = [
        set("m", "M", &[1.0, 2.0]),
        set("c", "IN!C1", &[0.5, 0.25]),
    ];
    let outputs = [output("Total", "OUT!B1")];
    let mut snapshots = SnapshotDir::new(tmp.path());

    let batch = run_batch(
        &mut model,
        &mut calculator,
        &mut snapshots,
        &inputs,
        &outputs,
        "solvedcfror",
    )
    .unwrap();

    assert_eq!(batch.columns[0].values, vec![1.5, 2.25]);
    assert_eq!(model.runs(), 2);
    assert_eq!(snapshots.count(), 2);
}

#[test]
fn mismatched_batch_lengths_are_alignment_errors() {
    let tmp = tempfile::tempdir().unwrap();
    let mut model = ScriptedModel::open(tmp.path().join("plant.bkp"), &[]);
    let mut calculator = ScriptedCalculator::open(&[]);
    let mut snapshots = SnapshotDir::new(tmp.path());

    let inputs = [
        set("a", "IN!A1", &[1.0, 2.0, 3.0]),
        set("b", "IN!A2", &[10.0]),
    ];
    let outputs = [output("Total", "OUT!B1")];
    let err = run_batch(
        &mut model,
        &mut calculator,
        &mut snapshots,
        &inputs,
        &outputs,
        "solvedcfror",
    )
    .unwrap_err();
    assert!(matches!(err, TeaError::Alignment(_)));
}

#[test]
fn collaborator_failure_aborts_the_sweep() {
    let tmp = tempfile::tempdir().unwrap();
    let mut model = ScriptedModel::open(tmp.path().join("plant.bkp"), &[("M1", "0"), ("M2", "0")]);
    model.fail_next_run();
    let mut calculator = ScriptedCalculator::open(&[]);
    let mut snapshots = SnapshotDir::new(tmp.path());

    let inputs = [set("m1", "M1", &[1.0, 2.0]), set("m2", "M2", &[1.0, 2.0])];
    let outputs = [output("MFSP", "OUT!B1")];
    let err = run_grid(
        &mut model,
        &mut calculator,
        &mut snapshots,
        &inputs,
        &outputs,
        "solvedcfror",
    )
    .unwrap_err();
    assert!(matches!(err, TeaError::Collaborator(_)));
    assert_eq!(model.runs(), 0);
}
