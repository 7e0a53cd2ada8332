//! Indexed result tensors for grid sweeps.

use tea_core::errors::{ErrorInfo, TeaError};
use tea_core::SampleSet;

/// One swept axis: its `name (unit)` label and ordered values.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    /// Label in the `name (unit)` convention.
    pub label: String,
    /// Ordered axis values; the tensor extent along this axis.
    pub values: Vec<f64>,
}

impl Axis {
    /// Builds the axis for a sample set.
    pub fn from_sample_set(set: &SampleSet) -> Self {
        Self {
            label: set.descriptor.label(),
            values: set.values.clone(),
        }
    }
}

/// Per-output result array addressed by the ordered tuple of axis indices.
///
/// The shape is resolved once at sweep setup: two axes form a plain
/// row/column table, three axes use a two-level column key (second and third
/// axis jointly). Cells are write-once; a grid evaluation at axis values
/// `(v1, v2, v3)` lands in cell `(i1, i2, i3)` and nowhere else.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultTensor {
    /// Row/column table over two axes.
    TwoAxis {
        /// Output label the tensor belongs to.
        output: String,
        /// Row and column axes.
        axes: [Axis; 2],
        /// Row-major cells, `None` until written.
        cells: Vec<Option<f64>>,
    },
    /// Three-axis tensor with a two-level column key.
    ThreeAxis {
        /// Output label the tensor belongs to.
        output: String,
        /// Outer, middle and inner axes.
        axes: [Axis; 3],
        /// Row-major cells, `None` until written.
        cells: Vec<Option<f64>>,
    },
}

impl ResultTensor {
    /// Builds an empty tensor over 2 or 3 axes; any other count is a
    /// configuration error.
    pub fn from_axes(output: String, axes: Vec<Axis>) -> Result<Self, TeaError> {
        match <[Axis; 2]>::try_from(axes) {
            Ok(axes) => {
                let len = axes[0].values.len() * axes[1].values.len();
                Ok(Self::TwoAxis {
                    output,
                    axes,
                    cells: vec![None; len],
                })
            }
            Err(axes) => match <[Axis; 3]>::try_from(axes) {
                Ok(axes) => {
                    let len =
                        axes[0].values.len() * axes[1].values.len() * axes[2].values.len();
                    Ok(Self::ThreeAxis {
                        output,
                        axes,
                        cells: vec![None; len],
                    })
                }
                Err(axes) => Err(TeaError::Config(
                    ErrorInfo::new("sweep-axes", "only 2-3 input variables are acceptable")
                        .with_context("axes", axes.len().to_string()),
                )),
            },
        }
    }

    /// Output label the tensor belongs to.
    pub fn output(&self) -> &str {
        match self {
            Self::TwoAxis { output, .. } | Self::ThreeAxis { output, .. } => output,
        }
    }

    /// Axes in index order.
    pub fn axes(&self) -> &[Axis] {
        match self {
            Self::TwoAxis { axes, .. } => axes,
            Self::ThreeAxis { axes, .. } => axes,
        }
    }

    /// Comma-joined axis labels, the table corner header.
    pub fn axis_header(&self) -> String {
        self.axes()
            .iter()
            .map(|axis| axis.label.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    fn flat_index(&self, index: &[usize]) -> Result<usize, TeaError> {
        let axes = self.axes();
        if index.len() != axes.len() {
            return Err(TeaError::Alignment(
                ErrorInfo::new("tensor-rank", "coordinate tuple does not match tensor rank")
                    .with_context("rank", axes.len().to_string())
                    .with_context("got", index.len().to_string()),
            ));
        }
        let mut flat = 0usize;
        for (axis, &i) in axes.iter().zip(index) {
            if i >= axis.values.len() {
                return Err(TeaError::Alignment(
                    ErrorInfo::new("tensor-bounds", "axis index out of bounds")
                        .with_context("axis", axis.label.clone())
                        .with_context("index", i.to_string())
                        .with_context("len", axis.values.len().to_string()),
                ));
            }
            flat = flat * axis.values.len() + i;
        }
        Ok(flat)
    }

    /// Writes one cell; each cell may be written exactly once.
    pub fn set(&mut self, index: &[usize], value: f64) -> Result<(), TeaError> {
        let flat = self.flat_index(index)?;
        let cells = match self {
            Self::TwoAxis { cells, .. } | Self::ThreeAxis { cells, .. } => cells,
        };
        if cells[flat].is_some() {
            return Err(TeaError::Alignment(
                ErrorInfo::new("tensor-rewrite", "tensor cell written twice")
                    .with_context("index", format!("{index:?}")),
            ));
        }
        cells[flat] = Some(value);
        Ok(())
    }

    /// Reads one cell, `None` while unwritten.
    pub fn get(&self, index: &[usize]) -> Result<Option<f64>, TeaError> {
        let flat = self.flat_index(index)?;
        let cells = match self {
            Self::TwoAxis { cells, .. } | Self::ThreeAxis { cells, .. } => cells,
        };
        Ok(cells[flat])
    }

    /// True once every cell has been written.
    pub fn is_complete(&self) -> bool {
        let cells = match self {
            Self::TwoAxis { cells, .. } | Self::ThreeAxis { cells, .. } => cells,
        };
        cells.iter().all(Option::is_some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(label: &str, values: &[f64]) -> Axis {
        Axis {
            label: label.to_string(),
            values: values.to_vec(),
        }
    }

    #[test]
    fn rejects_axis_counts_outside_two_to_three() {
        let one = ResultTensor::from_axes("y".into(), vec![axis("a", &[1.0])]);
        assert!(one.is_err());
        let four = ResultTensor::from_axes(
            "y".into(),
            vec![
                axis("a", &[1.0]),
                axis("b", &[1.0]),
                axis("c", &[1.0]),
                axis("d", &[1.0]),
            ],
        );
        assert!(four.is_err());
    }

    #[test]
    fn cells_are_write_once() {
        let mut tensor = ResultTensor::from_axes(
            "y".into(),
            vec![axis("a", &[1.0, 2.0]), axis("b", &[3.0, 4.0])],
        )
        .unwrap();
        tensor.set(&[0, 1], 7.0).unwrap();
        assert_eq!(tensor.get(&[0, 1]).unwrap(), Some(7.0));
        let err = tensor.set(&[0, 1], 8.0).unwrap_err();
        assert_eq!(err.info().code, "tensor-rewrite");
        assert!(!tensor.is_complete());
    }

    #[test]
    fn three_axis_indexing_is_row_major() {
        let mut tensor = ResultTensor::from_axes(
            "y".into(),
            vec![
                axis("a", &[0.0, 1.0]),
                axis("b", &[0.0, 1.0]),
                axis("c", &[0.0, 1.0]),
            ],
        )
        .unwrap();
        for i1 in 0..2 {
            for i2 in 0..2 {
                for i3 in 0..2 {
                    tensor
                        .set(&[i1, i2, i3], (100 * i1 + 10 * i2 + i3) as f64)
                        .unwrap();
                }
            }
        }
        assert!(tensor.is_complete());
        assert_eq!(tensor.get(&[1, 0, 1]).unwrap(), Some(101.0));
        assert_eq!(tensor.axis_header(), "a,b,c");
    }
}
