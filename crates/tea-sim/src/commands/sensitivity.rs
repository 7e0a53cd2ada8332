use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Args;
use tea_core::RngHandle;
use tea_exp::{build_sample_sets, run_batch, subsample, table, ExperimentConfig};
use tea_model::{run_with_sessions, SnapshotDir};

use crate::commands::{CollaboratorArgs, SessionFileArgs};
use crate::manifest::RunManifest;

#[derive(Args, Debug)]
pub struct SensitivityArgs {
    /// YAML experiment configuration.
    #[arg(long)]
    pub config: PathBuf,
    /// Output directory for run artefacts.
    #[arg(long)]
    pub out: PathBuf,
    /// Subsample each input to this many runs (defaults to the full pools).
    #[arg(long)]
    pub nruns: Option<usize>,
    /// Override the master seed from the configuration.
    #[arg(long)]
    pub seed: Option<u64>,
    #[command(flatten)]
    pub files: SessionFileArgs,
    #[command(flatten)]
    pub collaborators: CollaboratorArgs,
}

pub fn run(args: &SensitivityArgs) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(&args.out)?;
    let config = ExperimentConfig::load(&args.config)?;
    let master_seed = args.seed.unwrap_or(config.seed.master_seed);

    let mut sets = build_sample_sets(&config.inputs, master_seed)?;
    if let Some(nruns) = args.nruns {
        let mut rng = RngHandle::substream(master_seed, u64::MAX);
        sets = subsample(&sets, nruns, &mut rng)?;
    }
    let outputs = config
        .outputs
        .iter()
        .map(|row| row.resolve())
        .collect::<Result<Vec<_>, _>>()?;

    let mut snapshots = SnapshotDir::new(&args.out);
    let (mut model, mut calculator) = args
        .collaborators
        .open(&args.files.model_file, &args.files.calc_file)?;
    let batch = run_with_sessions(&mut model, &mut calculator, |model, calculator| {
        run_batch(
            model,
            calculator,
            &mut snapshots,
            &sets,
            &outputs,
            &config.recalc_macro,
        )
    })?;

    let index: Vec<String> = (1..=batch.runs).map(|run| run.to_string()).collect();
    let columns: Vec<(String, Vec<f64>)> = batch
        .columns
        .iter()
        .map(|column| (column.label.clone(), column.values.clone()))
        .collect();
    table::write_columns(&args.out.join("mc_results.tsv"), "Run", &index, &columns)?;

    RunManifest {
        command: "sensitivity",
        master_seed: Some(master_seed),
        config: &config,
    }
    .write(&args.out)?;
    tracing::info!(runs = batch.runs, out = %args.out.display(), "sensitivity batch written");
    Ok(())
}
