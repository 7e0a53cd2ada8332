use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Args;
use tea_core::errors::TeaError;
use tea_core::format_label;
use tea_exp::{aggregate_margins, table, MarginConfig};
use tea_model::{Calculator, Model};

use crate::commands::CollaboratorArgs;
use crate::manifest::RunManifest;

#[derive(Args, Debug)]
pub struct MarginArgs {
    /// YAML margin configuration listing the scored models.
    #[arg(long)]
    pub config: PathBuf,
    /// Output directory for per-model and portfolio tables.
    #[arg(long)]
    pub out: PathBuf,
    #[command(flatten)]
    pub collaborators: CollaboratorArgs,
}

pub fn run(args: &MarginArgs) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(&args.out)?;
    let config = MarginConfig::load(&args.config)?;

    let collaborators = args.collaborators.clone();
    let mut open_sessions = |spec: &tea_exp::MarginModelSpec| -> Result<
        (Box<dyn Model>, Box<dyn Calculator>),
        TeaError,
    > {
        let (model, calculator) = collaborators.open(&spec.model_file, &spec.calculator_file)?;
        Ok((Box::new(model), Box::new(calculator)))
    };
    let (series, portfolio) =
        aggregate_margins(&config.models, &config.policy, &args.out, &mut open_sessions)?;

    for entry in &series {
        let path = args.out.join(format!("{}_margin.tsv", entry.model));
        table::write_columns(
            &path,
            "Time",
            &entry.time_index,
            &[
                (
                    format_label(&entry.output, &entry.unit),
                    entry.model_output.clone(),
                ),
                (
                    format_label("market price", &entry.unit),
                    entry.market_price.clone(),
                ),
                (format_label("margin", &entry.unit), entry.margin.clone()),
            ],
        )?;
        tracing::info!(model = %entry.model, path = %path.display(), "margin table written");
    }

    let totals: Vec<(String, Vec<f64>)> = portfolio
        .totals
        .iter()
        .map(|(model, values)| (model.clone(), values.clone()))
        .collect();
    table::write_columns(
        &args.out.join("total_margin.tsv"),
        "Time",
        &portfolio.time_index,
        &totals,
    )?;

    RunManifest {
        command: "margin",
        master_seed: None,
        config: &config,
    }
    .write(&args.out)?;
    Ok(())
}
