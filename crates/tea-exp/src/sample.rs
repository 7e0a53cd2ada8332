//! Input sampling: declared distributions and literal enumerations.

use rand::Rng;
use rand_distr::Distribution as RandDistribution;
use statrs::distribution::ContinuousCDF;
use tea_core::errors::{ErrorInfo, TeaError};
use tea_core::{RngHandle, SampleSet, VariableDescriptor};

use crate::config::{InputRow, SampleSource};

/// Parsed distribution family with scipy-style `(shape.., loc, scale)`
/// parameterization for the shape families.
#[derive(Debug, Clone, PartialEq)]
pub enum DistributionSpec {
    /// I.i.d. uniform draws in `[lb, ub)`.
    Uniform { lb: f64, ub: f64 },
    /// Deterministic evenly spaced points inclusive of both ends.
    Linspace { lb: f64, ub: f64 },
    /// I.i.d. normal draws.
    Normal { mean: f64, sd: f64 },
    /// Alpha family with shape `a`.
    Alpha { a: f64, loc: f64, scale: f64 },
    /// Beta family with shapes `a`, `b`.
    Beta { a: f64, b: f64, loc: f64, scale: f64 },
    /// Triangular family with mode fraction `c` of the `[loc, loc+scale]` support.
    Triangular { c: f64, loc: f64, scale: f64 },
    /// Pareto family with shape `b`.
    Pareto { b: f64, loc: f64, scale: f64 },
}

fn param_count_error(name: &str, expected: usize, got: usize) -> TeaError {
    TeaError::Config(
        ErrorInfo::new("distribution-params", "wrong parameter count for distribution")
            .with_context("distribution", name.to_string())
            .with_context("expected", expected.to_string())
            .with_context("got", got.to_string()),
    )
}

fn expect_params(name: &str, params: &[f64], expected: usize) -> Result<(), TeaError> {
    if params.len() != expected {
        return Err(param_count_error(name, expected, params.len()));
    }
    Ok(())
}

impl DistributionSpec {
    /// Parses a distribution name and parameter list.
    pub fn parse(name: &str, params: &[f64]) -> Result<Self, TeaError> {
        match name {
            "uniform" => {
                expect_params(name, params, 2)?;
                ordered_bounds(name, params[0], params[1])?;
                Ok(Self::Uniform {
                    lb: params[0],
                    ub: params[1],
                })
            }
            "linspace" => {
                expect_params(name, params, 2)?;
                ordered_bounds(name, params[0], params[1])?;
                Ok(Self::Linspace {
                    lb: params[0],
                    ub: params[1],
                })
            }
            "normal" => {
                expect_params(name, params, 2)?;
                Ok(Self::Normal {
                    mean: params[0],
                    sd: params[1],
                })
            }
            "alpha" => {
                expect_params(name, params, 3)?;
                Ok(Self::Alpha {
                    a: params[0],
                    loc: params[1],
                    scale: params[2],
                })
            }
            "beta" => {
                expect_params(name, params, 4)?;
                Ok(Self::Beta {
                    a: params[0],
                    b: params[1],
                    loc: params[2],
                    scale: params[3],
                })
            }
            "triangular" => {
                expect_params(name, params, 3)?;
                Ok(Self::Triangular {
                    c: params[0],
                    loc: params[1],
                    scale: params[2],
                })
            }
            "pareto" => {
                expect_params(name, params, 3)?;
                Ok(Self::Pareto {
                    b: params[0],
                    loc: params[1],
                    scale: params[2],
                })
            }
            other => Err(TeaError::Config(
                ErrorInfo::new("distribution-unknown", "unsupported distribution name")
                    .with_context("distribution", other.to_string()),
            )),
        }
    }

    /// Draws `size` values from the family.
    pub fn generate(&self, size: usize, rng: &mut RngHandle) -> Result<Vec<f64>, TeaError> {
        match *self {
            Self::Uniform { lb, ub } => Ok((0..size).map(|_| rng.uniform_in(lb, ub)).collect()),
            Self::Linspace { lb, ub } => Ok(linspace(lb, ub, size)),
            Self::Normal { mean, sd } => {
                let dist = rand_distr::Normal::new(mean, sd)
                    .map_err(|err| family_error("normal", err))?;
                Ok((0..size).map(|_| dist.sample(rng.inner_mut())).collect())
            }
            Self::Alpha { a, loc, scale } => sample_alpha(a, loc, scale, size, rng),
            Self::Beta { a, b, loc, scale } => {
                let dist =
                    rand_distr::Beta::new(a, b).map_err(|err| family_error("beta", err))?;
                Ok((0..size)
                    .map(|_| loc + scale * dist.sample(rng.inner_mut()))
                    .collect())
            }
            Self::Triangular { c, loc, scale } => {
                let dist = rand_distr::Triangular::new(loc, loc + scale, loc + c * scale)
                    .map_err(|err| family_error("triangular", err))?;
                Ok((0..size).map(|_| dist.sample(rng.inner_mut())).collect())
            }
            Self::Pareto { b, loc, scale } => {
                let dist = rand_distr::Pareto::new(1.0, b)
                    .map_err(|err| family_error("pareto", err))?;
                Ok((0..size)
                    .map(|_| loc + scale * dist.sample(rng.inner_mut()))
                    .collect())
            }
        }
    }
}

fn ordered_bounds(name: &str, lb: f64, ub: f64) -> Result<(), TeaError> {
    if lb > ub {
        return Err(TeaError::Config(
            ErrorInfo::new("distribution-range", "lower bound exceeds upper bound")
                .with_context("distribution", name.to_string())
                .with_context("lb", lb.to_string())
                .with_context("ub", ub.to_string()),
        ));
    }
    Ok(())
}

fn family_error(name: &str, err: impl ToString) -> TeaError {
    TeaError::Config(
        ErrorInfo::new("distribution-family", err.to_string())
            .with_context("distribution", name.to_string()),
    )
}

/// `size` evenly spaced points over `[lb, ub]`, inclusive of both ends.
pub fn linspace(lb: f64, ub: f64, size: usize) -> Vec<f64> {
    match size {
        0 => Vec::new(),
        1 => vec![lb],
        n => {
            let step = (ub - lb) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { ub } else { lb + step * i as f64 })
                .collect()
        }
    }
}

/// Alpha-family draws by inverse transform: `F(x) = Phi(a - 1/x) / Phi(a)`
/// on `x > 0`, so `x = 1 / (a - Phi^-1(u * Phi(a)))`.
fn sample_alpha(
    a: f64,
    loc: f64,
    scale: f64,
    size: usize,
    rng: &mut RngHandle,
) -> Result<Vec<f64>, TeaError> {
    if !(a > 0.0) {
        return Err(TeaError::Config(
            ErrorInfo::new("distribution-family", "alpha shape must be positive")
                .with_context("a", a.to_string()),
        ));
    }
    let gauss = statrs::distribution::Normal::new(0.0, 1.0)
        .map_err(|err| family_error("alpha", err))?;
    let phi_a = gauss.cdf(a);
    let mut values = Vec::with_capacity(size);
    for _ in 0..size {
        // Keep u strictly inside (0, 1) so the quantile stays finite.
        let u: f64 = rng.inner_mut().gen_range(f64::EPSILON..1.0);
        let x = 1.0 / (a - gauss.inverse_cdf(u * phi_a));
        values.push(loc + scale * x);
    }
    Ok(values)
}

/// Generates `size` draws for a named distribution, the one-shot form of
/// [`DistributionSpec::parse`] + [`DistributionSpec::generate`].
pub fn generate(
    name: &str,
    size: usize,
    params: &[f64],
    rng: &mut RngHandle,
) -> Result<Vec<f64>, TeaError> {
    DistributionSpec::parse(name, params)?.generate(size, rng)
}

/// Parses a literal comma-separated numeric list into a fixed-order array.
pub fn extract_values(text: &str) -> Result<Vec<f64>, TeaError> {
    let mut values = Vec::new();
    for token in text.split(',') {
        let token = token.trim();
        if token.is_empty() {
            return Err(TeaError::Config(
                ErrorInfo::new("values-empty", "empty entry in value enumeration")
                    .with_context("values", text.to_string()),
            ));
        }
        let value = token.parse::<f64>().map_err(|_| {
            TeaError::Config(
                ErrorInfo::new("values-parse", "non-numeric entry in value enumeration")
                    .with_context("token", token.to_string()),
            )
        })?;
        values.push(value);
    }
    Ok(values)
}

/// Subsamples every set to `nruns` draws without replacement, in randomized
/// order. Used by Monte-Carlo batches whose generated pools are larger than
/// the requested run count.
pub fn subsample(
    sets: &[SampleSet],
    nruns: usize,
    rng: &mut RngHandle,
) -> Result<Vec<SampleSet>, TeaError> {
    use rand::seq::SliceRandom;

    sets.iter()
        .map(|set| {
            if nruns > set.len() {
                return Err(TeaError::Config(
                    ErrorInfo::new("batch-subsample", "nruns exceeds available sample values")
                        .with_context("input", set.descriptor.name.clone())
                        .with_context("nruns", nruns.to_string())
                        .with_context("available", set.len().to_string()),
                ));
            }
            let values = set
                .values
                .choose_multiple(rng.inner_mut(), nruns)
                .copied()
                .collect();
            Ok(SampleSet::new(set.descriptor.clone(), values))
        })
        .collect()
}

/// Builds one sample set per configured input row.
///
/// Each row draws from its own RNG substream derived from the master seed
/// and the row position, so adding or removing a row never shifts the draws
/// of its neighbours.
pub fn build_sample_sets(rows: &[InputRow], master_seed: u64) -> Result<Vec<SampleSet>, TeaError> {
    let mut sets = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let descriptor = VariableDescriptor::resolve(&row.variable)?;
        let values = match &row.samples {
            SampleSource::Distribution {
                name,
                parameters,
                size,
            } => {
                let mut rng = RngHandle::substream(master_seed, index as u64);
                generate(name, *size, parameters, &mut rng)?
            }
            SampleSource::Values { values } => extract_values(values)?,
        };
        tracing::debug!(
            input = %descriptor.name,
            count = values.len(),
            "sample set generated"
        );
        sets.push(SampleSet::new(descriptor, values));
    }
    Ok(sets)
}
