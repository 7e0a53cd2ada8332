use std::error::Error;
use std::fs;
use std::path::Path;

use serde::Serialize;

/// Reproducibility manifest written into every run directory.
#[derive(Debug, Serialize)]
pub struct RunManifest<C: Serialize> {
    /// Subcommand that produced the run.
    pub command: &'static str,
    /// Master seed in effect for the run; absent for deterministic runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master_seed: Option<u64>,
    /// Echo of the loaded configuration.
    pub config: C,
}

impl<C: Serialize> RunManifest<C> {
    pub fn write(&self, out_dir: &Path) -> Result<(), Box<dyn Error>> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(out_dir.join("manifest.json"), json)?;
        Ok(())
    }
}
