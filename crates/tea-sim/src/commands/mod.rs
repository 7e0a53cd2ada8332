use std::path::PathBuf;

use clap::Args;
use tea_core::errors::TeaError;
use tea_model::{BridgeCalculator, BridgeModel};

pub mod margin;
pub mod optimize;
pub mod response;
pub mod sensitivity;

/// Bridge adapter flags shared by every subcommand that opens sessions.
#[derive(Args, Debug, Clone)]
pub struct CollaboratorArgs {
    /// Model bridge adapter executable.
    #[arg(long = "model-cmd")]
    pub model_cmd: String,
    /// Extra arguments passed to the model adapter.
    #[arg(long = "model-arg", value_name = "ARG")]
    pub model_args: Vec<String>,
    /// Calculator bridge adapter executable.
    #[arg(long = "calc-cmd")]
    pub calc_cmd: String,
    /// Extra arguments passed to the calculator adapter.
    #[arg(long = "calc-arg", value_name = "ARG")]
    pub calc_args: Vec<String>,
}

impl CollaboratorArgs {
    /// Opens the Model and Calculator sessions through their adapters.
    pub fn open(
        &self,
        model_file: &std::path::Path,
        calculator_file: &std::path::Path,
    ) -> Result<(BridgeModel, BridgeCalculator), TeaError> {
        let model = BridgeModel::open(&self.model_cmd, &self.model_args, model_file)?;
        let calculator =
            BridgeCalculator::open(&self.calc_cmd, &self.calc_args, calculator_file)?;
        Ok((model, calculator))
    }
}

/// Session file flags for single-model subcommands.
#[derive(Args, Debug, Clone)]
pub struct SessionFileArgs {
    /// Model archive file opened by the model adapter.
    #[arg(long = "model-file")]
    pub model_file: PathBuf,
    /// Calculator workbook opened by the calculator adapter.
    #[arg(long = "calc-file")]
    pub calc_file: PathBuf,
}
