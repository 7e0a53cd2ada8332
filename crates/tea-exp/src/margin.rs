//! Margin aggregation: score historical price series against each model and
//! roll per-model margins into a portfolio total.

use std::path::Path;

use tea_core::errors::{ErrorInfo, TeaError};
use tea_core::{OutputDescriptor, RawVariableRow, SampleSet, VariableDescriptor};
use tea_model::{run_with_sessions, Calculator, Model, SnapshotDir};

use crate::config::{MarginModelSpec, MarginPolicy};
use crate::sweep::run_batch;
use crate::table::read_series_file;

/// Session factory opening the Model/Calculator pair for one margin model.
pub type SessionFactory<'a> =
    dyn FnMut(&MarginModelSpec) -> Result<(Box<dyn Model>, Box<dyn Calculator>), TeaError> + 'a;

/// Scored series for one model, aligned to the shared time index.
#[derive(Debug, Clone, PartialEq)]
pub struct MarginSeries {
    /// Model name.
    pub model: String,
    /// Output display name (e.g. the minimum selling price).
    pub output: String,
    /// Output unit shared by price and margin columns.
    pub unit: String,
    /// Time labels, identical to the portfolio reference index.
    pub time_index: Vec<String>,
    /// Model output per time step, net of any credit price.
    pub model_output: Vec<f64>,
    /// Market price per time step.
    pub market_price: Vec<f64>,
    /// `market_price - model_output` per time step.
    pub margin: Vec<f64>,
    /// Scaled total margin contribution per time step.
    pub total: Vec<f64>,
}

/// Portfolio-wide total margin series per model.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioMargin {
    /// Shared time index (the market-price series' index).
    pub time_index: Vec<String>,
    /// Per-model scaled total margin series.
    pub totals: Vec<(String, Vec<f64>)>,
}

fn series_set(name: &str, location: &str, values: Vec<f64>) -> Result<SampleSet, TeaError> {
    let descriptor = VariableDescriptor::resolve(&RawVariableRow {
        input: name.to_string(),
        location: location.to_string(),
        fortran: None,
        unit: None,
    })?;
    Ok(SampleSet::new(descriptor, values))
}

fn check_series_len(
    model: &str,
    what: &str,
    len: usize,
    expected: usize,
) -> Result<(), TeaError> {
    if len != expected {
        return Err(TeaError::Alignment(
            ErrorInfo::new("length-mismatch", "series length differs from market price series")
                .with_context("model", model.to_string())
                .with_context("series", what.to_string())
                .with_context("len", len.to_string())
                .with_context("expected", expected.to_string()),
        ));
    }
    Ok(())
}

/// Scores every configured model and aggregates the portfolio total.
///
/// For each model the historical input series drive a batch evaluation that
/// yields the model output and its production-volume companion; the margin
/// is the market price minus the (credit-adjusted) output, and the total
/// contribution is `margin * production * unit_factor / periods_per_year`
/// with the conversion declared per model. The first model's market-price
/// index is the portfolio reference; any model whose index differs is an
/// alignment error.
pub fn aggregate_margins(
    specs: &[MarginModelSpec],
    policy: &MarginPolicy,
    out_dir: &Path,
    open_sessions: &mut SessionFactory<'_>,
) -> Result<(Vec<MarginSeries>, PortfolioMargin), TeaError> {
    if specs.is_empty() {
        return Err(TeaError::Config(ErrorInfo::new(
            "margin-models",
            "no margin models configured",
        )));
    }

    let mut reference_index: Option<Vec<String>> = None;
    let mut series = Vec::with_capacity(specs.len());
    let mut totals = Vec::with_capacity(specs.len());

    for spec in specs {
        let (market_index, market_price) = read_series_file(&spec.market_price_file)?;
        match &reference_index {
            None => reference_index = Some(market_index.clone()),
            Some(reference) => {
                if *reference != market_index {
                    return Err(TeaError::Alignment(
                        ErrorInfo::new(
                            "index-mismatch",
                            "market price index differs from the portfolio reference index",
                        )
                        .with_context("model", spec.name.clone()),
                    ));
                }
            }
        }
        let steps = market_price.len();

        let mut inputs = Vec::with_capacity(spec.inputs.len() + 2);
        for row in &spec.inputs {
            let (_, values) = read_series_file(&row.series_file)?;
            check_series_len(&spec.name, &row.input, values.len(), steps)?;
            inputs.push(series_set(&row.input, &row.location, values)?);
        }
        if !policy.include_capital {
            if let Some(capital) = &spec.capital {
                inputs.push(series_set(&capital.input, &capital.location, vec![0.0; steps])?);
            }
        }
        if !policy.include_credits {
            if let Some(credits) = &spec.credits {
                inputs.push(series_set(&credits.input, &credits.location, vec![0.0; steps])?);
            }
        }

        let output = OutputDescriptor::resolve(
            &spec.output.output,
            &spec.output.location,
            spec.output.unit.as_deref(),
        )?;
        let production = OutputDescriptor::resolve(
            &spec.production.output,
            &spec.production.location,
            spec.production.unit.as_deref(),
        )?;
        if spec.conversion.periods_per_year == 0.0 {
            return Err(TeaError::Config(
                ErrorInfo::new("conversion-periods", "periods_per_year must be non-zero")
                    .with_context("model", spec.name.clone()),
            ));
        }

        tracing::info!(model = %spec.name, steps, "margin batch started");
        let (mut model, mut calculator) = open_sessions(spec)?;
        let mut snapshots = SnapshotDir::new(&out_dir.join(&spec.name));
        let outputs = [output, production];
        let batch = run_with_sessions(model.as_mut(), calculator.as_mut(), |model, calculator| {
            run_batch(
                model,
                calculator,
                &mut snapshots,
                &inputs,
                &outputs,
                &spec.recalc_macro,
            )
        })?;

        let mut model_output = batch.columns[0].values.clone();
        let production_volume = batch.columns[1].values.clone();

        if let Some(credit_file) = &spec.credit_price_file {
            let (_, credit_price) = read_series_file(credit_file)?;
            check_series_len(&spec.name, "credit price", credit_price.len(), steps)?;
            for (value, credit) in model_output.iter_mut().zip(&credit_price) {
                *value -= credit;
            }
        }

        let margin: Vec<f64> = market_price
            .iter()
            .zip(&model_output)
            .map(|(price, cost)| price - cost)
            .collect();
        let scale = spec.conversion.unit_factor / spec.conversion.periods_per_year;
        let total: Vec<f64> = margin
            .iter()
            .zip(&production_volume)
            .map(|(m, p)| m * p * scale)
            .collect();

        totals.push((spec.name.clone(), total.clone()));
        series.push(MarginSeries {
            model: spec.name.clone(),
            output: spec.output.output.clone(),
            unit: spec.output.unit.clone().unwrap_or_default(),
            time_index: market_index,
            model_output,
            market_price,
            margin,
            total,
        });
    }

    let portfolio = PortfolioMargin {
        // `specs` is non-empty, so the reference index is always set here.
        time_index: reference_index.unwrap_or_default(),
        totals,
    };
    Ok((series, portfolio))
}
