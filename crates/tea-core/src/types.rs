use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, TeaError};

/// Raw variable row as it appears in experiment configuration files.
///
/// `location` is either `"Sheet!Cell"` (a Calculator cell) or a tree path in
/// the Model (no `!`). The optional `fortran` flag marks Model variables
/// whose stored node text is an expression string; only the value after the
/// trailing `=` is replaced for those.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawVariableRow {
    /// Display name of the variable.
    pub input: String,
    /// `Sheet!Cell` reference or Model tree path.
    pub location: String,
    /// Expression-tail update flag for Model variables (defaults to false).
    #[serde(default)]
    pub fortran: Option<bool>,
    /// Engineering unit used in axis and column labels.
    #[serde(default)]
    pub unit: Option<String>,
}

/// Where a resolved variable lives and how it is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum VariableTarget {
    /// Cell in the Calculator workbook, split from a `Sheet!Cell` location.
    CalculatorCell {
        /// Worksheet name.
        sheet: String,
        /// Cell reference within the sheet, e.g. `B18`.
        cell: String,
    },
    /// Node path in the Model tree.
    ModelPath {
        /// Tree path of the node.
        path: String,
        /// When true the value is spliced after the trailing `=` of the
        /// stored expression instead of overwriting the whole node.
        expression_tail: bool,
    },
}

/// Normalized, immutable descriptor for one settable variable.
///
/// Produced once per run by [`VariableDescriptor::resolve`] and shared by
/// every sweep routine; resolution is pure, so resolving the same raw row
/// twice yields an equal descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableDescriptor {
    /// Display name of the variable.
    pub name: String,
    /// Resolved binding target.
    pub target: VariableTarget,
    /// Engineering unit; missing units normalize to the empty string so
    /// downstream label concatenation is total.
    pub unit: String,
}

impl VariableDescriptor {
    /// Resolves a raw configuration row into a binding descriptor.
    pub fn resolve(row: &RawVariableRow) -> Result<Self, TeaError> {
        let name = row.input.trim().to_string();
        if name.is_empty() {
            return Err(TeaError::Config(
                ErrorInfo::new("variable-name", "variable row has an empty name")
                    .with_context("location", row.location.clone()),
            ));
        }
        let location = row.location.trim();
        if location.is_empty() {
            return Err(TeaError::Config(
                ErrorInfo::new("variable-location", "variable row has an empty location")
                    .with_context("input", name),
            ));
        }
        let target = if let Some((sheet, cell)) = location.split_once('!') {
            if sheet.is_empty() || cell.is_empty() {
                return Err(TeaError::Config(
                    ErrorInfo::new("variable-cell", "malformed Sheet!Cell location")
                        .with_context("location", location.to_string()),
                ));
            }
            VariableTarget::CalculatorCell {
                sheet: sheet.to_string(),
                cell: cell.to_string(),
            }
        } else {
            VariableTarget::ModelPath {
                path: location.to_string(),
                expression_tail: row.fortran.unwrap_or(false),
            }
        };
        Ok(Self {
            name,
            target,
            unit: row.unit.clone().unwrap_or_default(),
        })
    }

    /// Returns true when the variable binds to a Model tree path.
    pub fn is_model(&self) -> bool {
        matches!(self.target, VariableTarget::ModelPath { .. })
    }

    /// Axis/column label in the `name (unit)` convention; unitless
    /// variables label as the bare name.
    pub fn label(&self) -> String {
        format_label(&self.name, &self.unit)
    }
}

/// Normalized descriptor for one readable output cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDescriptor {
    /// Display name of the output.
    pub name: String,
    /// Worksheet holding the output cell.
    pub sheet: String,
    /// Cell reference within the sheet.
    pub cell: String,
    /// Engineering unit; empty when the output is unitless.
    pub unit: String,
}

impl OutputDescriptor {
    /// Resolves an `Output`/`Sheet!Cell`/`Unit` triple into a descriptor.
    /// Output locations must always be Calculator cells.
    pub fn resolve(name: &str, location: &str, unit: Option<&str>) -> Result<Self, TeaError> {
        let location = location.trim();
        let Some((sheet, cell)) = location.split_once('!') else {
            return Err(TeaError::Config(
                ErrorInfo::new("output-location", "output location must be Sheet!Cell")
                    .with_context("output", name.to_string())
                    .with_context("location", location.to_string()),
            ));
        };
        if sheet.is_empty() || cell.is_empty() {
            return Err(TeaError::Config(
                ErrorInfo::new("output-cell", "malformed Sheet!Cell location")
                    .with_context("location", location.to_string()),
            ));
        }
        Ok(Self {
            name: name.trim().to_string(),
            sheet: sheet.to_string(),
            cell: cell.to_string(),
            unit: unit.unwrap_or_default().trim().to_string(),
        })
    }

    /// Column label in the `name (unit)` convention.
    pub fn label(&self) -> String {
        format_label(&self.name, &self.unit)
    }
}

/// One variable together with its generated or enumerated sample values.
///
/// Created once per run by the sampler and read-only afterwards. The value
/// count is the requested sample size (Monte-Carlo), the grid resolution
/// (response surfaces) or the historical series length (margin batches).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleSet {
    /// Variable the values bind to.
    pub descriptor: VariableDescriptor,
    /// Ordered sample values.
    pub values: Vec<f64>,
}

impl SampleSet {
    /// Creates a sample set over a resolved descriptor.
    pub fn new(descriptor: VariableDescriptor, values: Vec<f64>) -> Self {
        Self { descriptor, values }
    }

    /// Number of sample values held.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true when the set holds no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Formats a `name (unit)` label, omitting the parenthetical for empty units.
pub fn format_label(name: &str, unit: &str) -> String {
    if unit.is_empty() {
        name.to_string()
    } else {
        format!("{name} ({unit})")
    }
}
