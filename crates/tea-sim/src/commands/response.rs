use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Args;
use tea_exp::{build_sample_sets, run_grid, table, ExperimentConfig};
use tea_model::{run_with_sessions, SnapshotDir};

use crate::commands::{CollaboratorArgs, SessionFileArgs};
use crate::manifest::RunManifest;

#[derive(Args, Debug)]
pub struct ResponseArgs {
    /// YAML experiment configuration (2-3 input variables).
    #[arg(long)]
    pub config: PathBuf,
    /// Output directory for run artefacts.
    #[arg(long)]
    pub out: PathBuf,
    /// Override the master seed from the configuration.
    #[arg(long)]
    pub seed: Option<u64>,
    #[command(flatten)]
    pub files: SessionFileArgs,
    #[command(flatten)]
    pub collaborators: CollaboratorArgs,
}

pub fn run(args: &ResponseArgs) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(&args.out)?;
    let config = ExperimentConfig::load(&args.config)?;
    let master_seed = args.seed.unwrap_or(config.seed.master_seed);

    let sets = build_sample_sets(&config.inputs, master_seed)?;
    let outputs = config
        .outputs
        .iter()
        .map(|row| row.resolve())
        .collect::<Result<Vec<_>, _>>()?;

    let mut snapshots = SnapshotDir::new(&args.out);
    let (mut model, mut calculator) = args
        .collaborators
        .open(&args.files.model_file, &args.files.calc_file)?;
    let tensors = run_with_sessions(&mut model, &mut calculator, |model, calculator| {
        run_grid(
            model,
            calculator,
            &mut snapshots,
            &sets,
            &outputs,
            &config.recalc_macro,
        )
    })?;

    for (tensor, output) in tensors.iter().zip(&config.outputs) {
        let path = args.out.join(format!("{}_response.tsv", output.output));
        table::write_tensor(&path, tensor)?;
        tracing::info!(output = %output.output, path = %path.display(), "response surface written");
    }

    RunManifest {
        command: "response",
        master_seed: Some(master_seed),
        config: &config,
    }
    .write(&args.out)?;
    Ok(())
}
