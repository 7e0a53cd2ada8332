use tea_exp::table::{read_series_file, read_tensor, write_columns, write_tensor};
use tea_exp::{Axis, ResultTensor};

fn axis(label: &str, values: &[f64]) -> Axis {
    Axis {
        label: label.to_string(),
        values: values.to_vec(),
    }
}

#[test]
fn two_axis_table_round_trips() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("mfsp_response.tsv");

    let mut tensor = ResultTensor::from_axes(
        "MFSP ($/gal)".to_string(),
        vec![
            axis("Enzyme cost ($/kg)", &[3.87, 4.24, 4.61]),
            axis("Feed rate (t/d)", &[1800.0, 2000.0]),
        ],
    )
    .unwrap();
    for i1 in 0..3 {
        for i2 in 0..2 {
            tensor
                .set(&[i1, i2], 2.13 + 0.017 * i1 as f64 - 0.003 * i2 as f64)
                .unwrap();
        }
    }
    write_tensor(&path, &tensor).unwrap();

    let reloaded = read_tensor(&path, "MFSP ($/gal)").unwrap();
    assert_eq!(reloaded.axes()[0].label, "Enzyme cost ($/kg)");
    assert_eq!(reloaded.axes()[1].label, "Feed rate (t/d)");
    for i1 in 0..3 {
        for i2 in 0..2 {
            let original = tensor.get(&[i1, i2]).unwrap().unwrap();
            let restored = reloaded.get(&[i1, i2]).unwrap().unwrap();
            assert!((original - restored).abs() < 1e-9);
        }
    }
}

#[test]
fn three_axis_table_round_trips() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("mfsp_surface.tsv");

    let mut tensor = ResultTensor::from_axes(
        "MFSP ($/gal)".to_string(),
        vec![
            axis("a", &[0.1, 0.2]),
            axis("b", &[1.0, 2.0, 3.0]),
            axis("c", &[10.0, 20.0]),
        ],
    )
    .unwrap();
    for i1 in 0..2 {
        for i2 in 0..3 {
            for i3 in 0..2 {
                tensor
                    .set(&[i1, i2, i3], (i1 * 100 + i2 * 10 + i3) as f64 / 7.0)
                    .unwrap();
            }
        }
    }
    write_tensor(&path, &tensor).unwrap();

    let reloaded = read_tensor(&path, "MFSP ($/gal)").unwrap();
    assert_eq!(reloaded.axes()[1].values, vec![1.0, 2.0, 3.0]);
    assert_eq!(reloaded.axes()[2].values, vec![10.0, 20.0]);
    for i1 in 0..2 {
        for i2 in 0..3 {
            for i3 in 0..2 {
                let original = tensor.get(&[i1, i2, i3]).unwrap().unwrap();
                let restored = reloaded.get(&[i1, i2, i3]).unwrap().unwrap();
                assert!((original - restored).abs() < 1e-9);
            }
        }
    }
}

#[test]
fn incomplete_tensors_refuse_to_export() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("partial.tsv");
    let mut tensor = ResultTensor::from_axes(
        "y".to_string(),
        vec![axis("a", &[1.0, 2.0]), axis("b", &[1.0])],
    )
    .unwrap();
    tensor.set(&[0, 0], 1.0).unwrap();
    let err = write_tensor(&path, &tensor).unwrap_err();
    assert_eq!(err.info().code, "tensor-incomplete");
}

#[test]
fn column_tables_read_back_as_series() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("prices.tsv");
    let index = vec!["2020-01-06".to_string(), "2020-01-13".to_string()];
    write_columns(
        &path,
        "Time",
        &index,
        &[("market price ($/gal)".to_string(), vec![2.05, 1.98])],
    )
    .unwrap();

    let (labels, values) = read_series_file(&path).unwrap();
    assert_eq!(labels, index);
    assert_eq!(values, vec![2.05, 1.98]);
}

#[test]
fn mismatched_column_lengths_are_alignment_errors() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("bad.tsv");
    let err = write_columns(
        &path,
        "Run",
        &["1".to_string()],
        &[("y".to_string(), vec![1.0, 2.0])],
    )
    .unwrap_err();
    assert!(matches!(err, tea_core::TeaError::Alignment(_)));
}
