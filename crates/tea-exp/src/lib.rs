//! Experiment orchestration engine for techno-economic analysis runs.
//!
//! Coordinates expensive, stateful external evaluations: input sampling,
//! multi-dimensional sweep execution with indexed result tensors, a
//! derivative-free optimization driver over full Model evaluations, and
//! margin aggregation across historical price series. Everything is
//! single-threaded and strictly sequential; the external sessions are
//! injected handles and collaborator latency dominates every run.

pub mod config;
mod eval;
pub mod margin;
pub mod optimize;
pub mod sample;
pub mod sweep;
pub mod table;
pub mod tensor;
pub mod trace;

pub use config::{
    BoundedInputRow, ConversionSpec, ExperimentConfig, InputRow, MarginConfig, MarginModelSpec,
    MarginPolicy, OptimizeConfig, OutputRow, SampleSource, SeedPolicy, SeriesInputRow,
    SolverSettings, ZeroableInputRow,
};
pub use margin::{aggregate_margins, MarginSeries, PortfolioMargin, SessionFactory};
pub use optimize::{
    minimize_bounded, optimize, BoundedVariable, Minimum, OptimizeFailure, OptimizeReport,
    SolutionRecord,
};
pub use sample::{build_sample_sets, extract_values, generate, linspace, subsample, DistributionSpec};
pub use sweep::{run_batch, run_grid, BatchColumn, BatchResult};
pub use table::{read_series_file, read_tensor, write_columns, write_tensor};
pub use tensor::{Axis, ResultTensor};
pub use trace::{EvaluationRecord, TraceLog};
