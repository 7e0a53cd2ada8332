use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Args;
use tea_exp::{optimize, table, BoundedVariable, OptimizeConfig};
use tea_model::{run_with_sessions, SnapshotDir};

use crate::commands::{CollaboratorArgs, SessionFileArgs};
use crate::manifest::RunManifest;

#[derive(Args, Debug)]
pub struct OptimizeArgs {
    /// YAML optimization configuration.
    #[arg(long)]
    pub config: PathBuf,
    /// Output directory for solutions and trace logs.
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

pub fn run(args: &OptimizeArgs) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(&args.out)?;
    let config = OptimizeConfig::load(&args.config)?;
    let master_seed = args.seed.unwrap_or(config.seed.master_seed);

    let inputs = config
        .inputs
        .iter()
        .map(BoundedVariable::from_row)
        .collect::<Result<Vec<_>, _>>()?;
    let outputs = config
        .outputs
        .iter()
        .map(|row| row.resolve())
        .collect::<Result<Vec<_>, _>>()?;

    let mut snapshots = SnapshotDir::new(&args.out);
    let (mut model, mut calculator) = args
        .collaborators
        .open(&args.files.model_file, &args.files.calc_file)?;
    let out_dir = args.out.clone();
    let report = run_with_sessions(&mut model, &mut calculator, |model, calculator| {
        optimize(
            model,
            calculator,
            &mut snapshots,
            &inputs,
            &outputs,
            &config.recalc_macro,
            &config.solver,
            &out_dir,
            master_seed,
        )
    })?;

    if !report.solutions.is_empty() {
        let index: Vec<String> = report
            .solutions
            .iter()
            .map(|solution| solution.output.clone())
            .collect();
        let mut columns: Vec<(String, Vec<f64>)> = vec![(
            "Objective".to_string(),
            report.solutions.iter().map(|s| s.objective).collect(),
        )];
        for (position, input) in inputs.iter().enumerate() {
            columns.push((
                input.descriptor.name.clone(),
                report
                    .solutions
                    .iter()
                    .map(|solution| solution.input_values[position].1)
                    .collect(),
            ));
        }
        table::write_columns(&args.out.join("opt_results.tsv"), "Output", &index, &columns)?;
    }

    RunManifest {
        command: "optimize",
        master_seed: Some(master_seed),
        config: &config,
    }
    .write(&args.out)?;

    // Solved outputs stay on disk; an aborted search still fails the run.
    if let Some(failure) = report.failures.into_iter().next() {
        return Err(Box::new(failure.error));
    }
    Ok(())
}
