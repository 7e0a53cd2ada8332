//! Tab-delimited table I/O: result tensors, column tables and input series.

use std::path::Path;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use tea_core::errors::{ErrorInfo, TeaError};

use crate::tensor::{Axis, ResultTensor};

fn table_error(code: &str, path: &Path, err: impl ToString) -> TeaError {
    TeaError::Serde(
        ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()),
    )
}

fn fmt_value(value: f64) -> String {
    format!("{value}")
}

fn parse_value(path: &Path, token: &str) -> Result<f64, TeaError> {
    token.trim().parse::<f64>().map_err(|_| {
        TeaError::Serde(
            ErrorInfo::new("table-number", "non-numeric table entry")
                .with_context("path", path.display().to_string())
                .with_context("token", token.to_string()),
        )
    })
}

/// Writes a result tensor as a tab-delimited table.
///
/// Two-axis tensors are a plain row/column table whose corner cell holds the
/// comma-joined axis labels. Three-axis tensors add a second header row: the
/// second-axis value labels each block start and the third-axis values cycle
/// beneath it.
pub fn write_tensor(path: &Path, tensor: &ResultTensor) -> Result<(), TeaError> {
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .map_err(|err| table_error("table-open", path, err))?;

    match tensor {
        ResultTensor::TwoAxis { axes, .. } => {
            let mut header = vec![tensor.axis_header()];
            header.extend(axes[1].values.iter().copied().map(fmt_value));
            writer
                .write_record(&header)
                .map_err(|err| table_error("table-write", path, err))?;
            for (i1, v1) in axes[0].values.iter().enumerate() {
                let mut row = vec![fmt_value(*v1)];
                for i2 in 0..axes[1].values.len() {
                    row.push(cell_text(tensor, &[i1, i2])?);
                }
                writer
                    .write_record(&row)
                    .map_err(|err| table_error("table-write", path, err))?;
            }
        }
        ResultTensor::ThreeAxis { axes, .. } => {
            let n3 = axes[2].values.len();
            let mut upper = vec![tensor.axis_header()];
            let mut lower = vec![String::new()];
            for v2 in &axes[1].values {
                for (k, v3) in axes[2].values.iter().enumerate() {
                    upper.push(if k == 0 { fmt_value(*v2) } else { String::new() });
                    lower.push(fmt_value(*v3));
                }
            }
            writer
                .write_record(&upper)
                .map_err(|err| table_error("table-write", path, err))?;
            writer
                .write_record(&lower)
                .map_err(|err| table_error("table-write", path, err))?;
            for (i1, v1) in axes[0].values.iter().enumerate() {
                let mut row = vec![fmt_value(*v1)];
                for i2 in 0..axes[1].values.len() {
                    for i3 in 0..n3 {
                        row.push(cell_text(tensor, &[i1, i2, i3])?);
                    }
                }
                writer
                    .write_record(&row)
                    .map_err(|err| table_error("table-write", path, err))?;
            }
        }
    }
    writer
        .flush()
        .map_err(|err| table_error("table-flush", path, err))
}

fn cell_text(tensor: &ResultTensor, index: &[usize]) -> Result<String, TeaError> {
    let value = tensor.get(index)?.ok_or_else(|| {
        TeaError::Alignment(
            ErrorInfo::new("tensor-incomplete", "unwritten tensor cell during export")
                .with_context("index", format!("{index:?}")),
        )
    })?;
    Ok(fmt_value(value))
}

/// Reads a tensor table back, recovering axis labels from the corner header.
pub fn read_tensor(path: &Path, output: &str) -> Result<ResultTensor, TeaError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_path(path)
        .map_err(|err| table_error("table-open", path, err))?;
    let mut records: Vec<StringRecord> = Vec::new();
    for record in reader.records() {
        records.push(record.map_err(|err| table_error("table-read", path, err))?);
    }
    if records.len() < 2 {
        return Err(table_error("table-shape", path, "table has no data rows"));
    }

    let labels: Vec<String> = records[0]
        .get(0)
        .unwrap_or_default()
        .split(',')
        .map(str::to_string)
        .collect();
    let three_axis = records
        .get(1)
        .and_then(|record| record.get(0))
        .is_some_and(|corner| corner.trim().is_empty());

    if three_axis {
        read_three_axis(path, output, &labels, &records)
    } else {
        read_two_axis(path, output, &labels, &records)
    }
}

fn read_two_axis(
    path: &Path,
    output: &str,
    labels: &[String],
    records: &[StringRecord],
) -> Result<ResultTensor, TeaError> {
    if labels.len() != 2 {
        return Err(table_error("table-labels", path, "expected two axis labels"));
    }
    let axis2_values = records[0]
        .iter()
        .skip(1)
        .map(|token| parse_value(path, token))
        .collect::<Result<Vec<_>, _>>()?;
    let mut axis1_values = Vec::new();
    for record in &records[1..] {
        axis1_values.push(parse_value(path, record.get(0).unwrap_or_default())?);
    }
    let axes = vec![
        Axis {
            label: labels[0].clone(),
            values: axis1_values,
        },
        Axis {
            label: labels[1].clone(),
            values: axis2_values,
        },
    ];
    let mut tensor = ResultTensor::from_axes(output.to_string(), axes)?;
    for (i1, record) in records[1..].iter().enumerate() {
        for (i2, token) in record.iter().skip(1).enumerate() {
            tensor.set(&[i1, i2], parse_value(path, token)?)?;
        }
    }
    Ok(tensor)
}

fn read_three_axis(
    path: &Path,
    output: &str,
    labels: &[String],
    records: &[StringRecord],
) -> Result<ResultTensor, TeaError> {
    if labels.len() != 3 {
        return Err(table_error(
            "table-labels",
            path,
            "expected three axis labels",
        ));
    }
    let upper = &records[0];
    let lower = &records[1];
    if upper.len() != lower.len() {
        return Err(table_error("table-shape", path, "ragged header rows"));
    }
    // Block starts are the non-empty entries of the upper header row.
    let mut starts = Vec::new();
    for (pos, token) in upper.iter().enumerate().skip(1) {
        if !token.trim().is_empty() {
            starts.push(pos);
        }
    }
    if starts.is_empty() || starts[0] != 1 {
        return Err(table_error("table-shape", path, "missing column blocks"));
    }
    let n3 = starts
        .get(1)
        .map(|second| second - starts[0])
        .unwrap_or(upper.len() - 1);
    if (upper.len() - 1) % n3 != 0 || starts.len() != (upper.len() - 1) / n3 {
        return Err(table_error("table-shape", path, "uneven column blocks"));
    }
    let axis2_values = starts
        .iter()
        .map(|&pos| parse_value(path, upper.get(pos).unwrap_or_default()))
        .collect::<Result<Vec<_>, _>>()?;
    let axis3_values = lower
        .iter()
        .skip(1)
        .take(n3)
        .map(|token| parse_value(path, token))
        .collect::<Result<Vec<_>, _>>()?;
    let mut axis1_values = Vec::new();
    for record in &records[2..] {
        axis1_values.push(parse_value(path, record.get(0).unwrap_or_default())?);
    }
    let axes = vec![
        Axis {
            label: labels[0].clone(),
            values: axis1_values,
        },
        Axis {
            label: labels[1].clone(),
            values: axis2_values,
        },
        Axis {
            label: labels[2].clone(),
            values: axis3_values,
        },
    ];
    let mut tensor = ResultTensor::from_axes(output.to_string(), axes)?;
    for (i1, record) in records[2..].iter().enumerate() {
        for (flat, token) in record.iter().skip(1).enumerate() {
            let index = [i1, flat / n3, flat % n3];
            tensor.set(&index, parse_value(path, token)?)?;
        }
    }
    Ok(tensor)
}

/// Writes a labeled column table: corner header, one label column, one
/// column per `(label, values)` pair. Used for batch results, solution
/// tables and margin series.
pub fn write_columns(
    path: &Path,
    corner: &str,
    index: &[String],
    columns: &[(String, Vec<f64>)],
) -> Result<(), TeaError> {
    for (label, values) in columns {
        if values.len() != index.len() {
            return Err(TeaError::Alignment(
                ErrorInfo::new("column-length", "column length differs from index length")
                    .with_context("column", label.clone())
                    .with_context("column_len", values.len().to_string())
                    .with_context("index_len", index.len().to_string()),
            ));
        }
    }
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .map_err(|err| table_error("table-open", path, err))?;
    let mut header = vec![corner.to_string()];
    header.extend(columns.iter().map(|(label, _)| label.clone()));
    writer
        .write_record(&header)
        .map_err(|err| table_error("table-write", path, err))?;
    for (row, key) in index.iter().enumerate() {
        let mut record = vec![key.clone()];
        for (_, values) in columns {
            record.push(fmt_value(values[row]));
        }
        writer
            .write_record(&record)
            .map_err(|err| table_error("table-write", path, err))?;
    }
    writer
        .flush()
        .map_err(|err| table_error("table-flush", path, err))
}

/// Reads a two-column series file: header row, then `time label<TAB>value`.
pub fn read_series_file(path: &Path) -> Result<(Vec<String>, Vec<f64>), TeaError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_path(path)
        .map_err(|err| table_error("series-open", path, err))?;
    let mut index = Vec::new();
    let mut values = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| table_error("series-read", path, err))?;
        let label = record.get(0).unwrap_or_default().trim();
        let token = record.get(1).ok_or_else(|| {
            table_error("series-shape", path, "series row is missing its value column")
        })?;
        index.push(label.to_string());
        values.push(parse_value(path, token)?);
    }
    if values.is_empty() {
        return Err(table_error("series-empty", path, "series file has no rows"));
    }
    Ok((index, values))
}
