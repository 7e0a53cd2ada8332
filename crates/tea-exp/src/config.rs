//! YAML-configurable experiment descriptions.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tea_core::errors::{ErrorInfo, TeaError};
use tea_core::{OutputDescriptor, RawVariableRow};

fn config_read_error(code: &str, path: &Path, err: impl ToString) -> TeaError {
    TeaError::Serde(
        ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()),
    )
}

fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, TeaError> {
    let contents =
        fs::read_to_string(path).map_err(|err| config_read_error("config-read", path, err))?;
    serde_yaml::from_str(&contents).map_err(|err| config_read_error("config-parse", path, err))
}

fn default_recalc_macro() -> String {
    "solvedcfror".to_string()
}

fn default_master_seed() -> u64 {
    0x7EA5_EED0_2020_0826_u64
}

/// Deterministic seeding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedPolicy {
    /// Master seed; every variable and every optimized output derives its
    /// own substream from it.
    #[serde(default = "default_master_seed")]
    pub master_seed: u64,
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self {
            master_seed: default_master_seed(),
        }
    }
}

/// How an input row obtains its sample values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SampleSource {
    /// Draw `size` values from a named distribution family.
    Distribution {
        /// Distribution family name (`uniform`, `linspace`, `normal`, ...).
        name: String,
        /// Family parameters, shape parameters first, then loc, then scale.
        #[serde(default)]
        parameters: Vec<f64>,
        /// Number of values to draw.
        size: usize,
    },
    /// Use a literal comma-separated enumeration verbatim.
    Values {
        /// Comma-separated numeric list, e.g. `"0.5, 0.6, 0.7"`.
        values: String,
    },
}

/// One swept or sampled input variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputRow {
    /// Name, location, expression flag and unit of the variable.
    #[serde(flatten)]
    pub variable: RawVariableRow,
    /// Sample generation strategy.
    pub samples: SampleSource,
}

/// One declared output readout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRow {
    /// Display name of the output.
    pub output: String,
    /// `Sheet!Cell` location of the readout.
    pub location: String,
    /// Engineering unit used in column labels.
    #[serde(default)]
    pub unit: Option<String>,
}

impl OutputRow {
    /// Resolves the row into an output descriptor.
    pub fn resolve(&self) -> Result<OutputDescriptor, TeaError> {
        OutputDescriptor::resolve(&self.output, &self.location, self.unit.as_deref())
    }
}

/// Configuration shared by sensitivity (batch) and response (grid) runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Input variables with their sample sources.
    pub inputs: Vec<InputRow>,
    /// Output readouts collected per evaluation.
    pub outputs: Vec<OutputRow>,
    /// Workbook macro that recomputes the Calculator after a reload.
    #[serde(default = "default_recalc_macro")]
    pub recalc_macro: String,
    /// Seeding policy for all stochastic draws.
    #[serde(default)]
    pub seed: SeedPolicy,
}

impl ExperimentConfig {
    /// Loads a configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self, TeaError> {
        load_yaml(path)
    }
}

/// One bounded input variable of an optimization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundedInputRow {
    /// Name, location, expression flag and unit of the variable.
    #[serde(flatten)]
    pub variable: RawVariableRow,
    /// Inclusive search range as `"lb,ub"`.
    pub range: String,
}

impl BoundedInputRow {
    /// Parses the `"lb,ub"` range string.
    pub fn bounds(&self) -> Result<(f64, f64), TeaError> {
        let malformed = || {
            TeaError::Config(
                ErrorInfo::new("range-parse", "range must be `lb,ub`")
                    .with_context("input", self.variable.input.clone())
                    .with_context("range", self.range.clone()),
            )
        };
        let (lb, ub) = self.range.split_once(',').ok_or_else(malformed)?;
        let lb: f64 = lb.trim().parse().map_err(|_| malformed())?;
        let ub: f64 = ub.trim().parse().map_err(|_| malformed())?;
        if !(lb < ub) {
            return Err(TeaError::Config(
                ErrorInfo::new("range-order", "range lower bound must be below upper bound")
                    .with_context("input", self.variable.input.clone())
                    .with_context("range", self.range.clone()),
            ));
        }
        Ok((lb, ub))
    }
}

fn default_step_tolerance() -> f64 {
    1e-3
}

fn default_max_evaluations() -> usize {
    100
}

/// Solver knobs for the derivative-free search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverSettings {
    /// Absolute step-convergence tolerance in scaled coordinates.
    #[serde(default = "default_step_tolerance")]
    pub step_tolerance: f64,
    /// Hard cap on objective evaluations per output.
    #[serde(default = "default_max_evaluations")]
    pub max_evaluations: usize,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            step_tolerance: default_step_tolerance(),
            max_evaluations: default_max_evaluations(),
        }
    }
}

/// Configuration of an optimization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeConfig {
    /// Bounded input variables (Model tree paths).
    pub inputs: Vec<BoundedInputRow>,
    /// Outputs optimized independently, one search each.
    pub outputs: Vec<OutputRow>,
    /// Workbook macro that recomputes the Calculator after a reload.
    #[serde(default = "default_recalc_macro")]
    pub recalc_macro: String,
    /// Solver knobs.
    #[serde(default)]
    pub solver: SolverSettings,
    /// Seeding policy for the initial search points.
    #[serde(default)]
    pub seed: SeedPolicy,
}

impl OptimizeConfig {
    /// Loads a configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self, TeaError> {
        load_yaml(path)
    }
}

/// Historical series bound to one input variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesInputRow {
    /// Display name of the variable.
    pub input: String,
    /// `Sheet!Cell` location the series values are written into.
    pub location: String,
    /// Tab-delimited two-column file: time label, value.
    pub series_file: PathBuf,
}

/// Administrative input that can be policy-disabled to an all-zero series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZeroableInputRow {
    /// Display name of the administrative input.
    pub input: String,
    /// `Sheet!Cell` location forced to zero when the policy disables it.
    pub location: String,
}

fn default_unit_scalar() -> f64 {
    1.0
}

/// Declared unit conversion for portfolio totals.
///
/// `total[t] = margin[t] * production[t] * unit_factor / periods_per_year`.
/// Declared explicitly per model instead of being inferred from output
/// display names.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConversionSpec {
    /// Number of price periods per production year (52 for weekly prices).
    #[serde(default = "default_unit_scalar")]
    pub periods_per_year: f64,
    /// Multiplicative unit conversion between margin and production bases.
    #[serde(default = "default_unit_scalar")]
    pub unit_factor: f64,
}

impl Default for ConversionSpec {
    fn default() -> Self {
        Self {
            periods_per_year: default_unit_scalar(),
            unit_factor: default_unit_scalar(),
        }
    }
}

/// One model scored by the margin aggregator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarginModelSpec {
    /// Portfolio-unique model name.
    pub name: String,
    /// Model archive opened for this entry.
    pub model_file: PathBuf,
    /// Calculator workbook opened for this entry.
    pub calculator_file: PathBuf,
    /// Workbook macro that recomputes the Calculator after a reload.
    #[serde(default = "default_recalc_macro")]
    pub recalc_macro: String,
    /// Historical input series applied per time step.
    pub inputs: Vec<SeriesInputRow>,
    /// Scored output (the model's cost/selling-price series).
    pub output: OutputRow,
    /// Production-volume output used for unit scaling.
    pub production: OutputRow,
    /// Tab-delimited market price series; its time index is the reference.
    pub market_price_file: PathBuf,
    /// Optional subtractive credit price series.
    #[serde(default)]
    pub credit_price_file: Option<PathBuf>,
    /// Declared unit conversion for the portfolio total.
    #[serde(default)]
    pub conversion: ConversionSpec,
    /// Capital-investment input zeroed when the policy excludes capital.
    #[serde(default)]
    pub capital: Option<ZeroableInputRow>,
    /// By-product credit input zeroed when the policy excludes credits.
    #[serde(default)]
    pub credits: Option<ZeroableInputRow>,
}

fn default_true() -> bool {
    true
}

/// Policy flags applied across every model of a margin run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MarginPolicy {
    /// Include capital investment in the scored output.
    #[serde(default = "default_true")]
    pub include_capital: bool,
    /// Include by-product credits in the scored output.
    #[serde(default = "default_true")]
    pub include_credits: bool,
}

impl Default for MarginPolicy {
    fn default() -> Self {
        Self {
            include_capital: true,
            include_credits: true,
        }
    }
}

/// Configuration of a margin aggregation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarginConfig {
    /// Scored models, aggregated into one portfolio total.
    pub models: Vec<MarginModelSpec>,
    /// Policy flags shared by all models.
    #[serde(default)]
    pub policy: MarginPolicy,
}

impl MarginConfig {
    /// Loads a configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self, TeaError> {
        load_yaml(path)
    }
}
