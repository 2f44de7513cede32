//! CLI commands module.

use anyhow::{Context, Result};
use clap::Subcommand;
use sensorasm_assembler::AssemblerConfig;
use std::fs;
use std::path::Path;

mod build;
mod check;
mod disasm;

#[derive(Subcommand)]
pub enum Commands {
    /// Compile a script into a firmware image
    Build(build::BuildArgs),
    /// Parse and link a script without writing output
    Check(check::CheckArgs),
    /// Print a listing of a binary image
    Disasm(disasm::DisasmArgs),
}

pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Build(args) => build::run(args),
        Commands::Check(args) => check::run(args),
        Commands::Disasm(args) => disasm::run(args),
    }
}

/// Load assembler limits from a JSON file, or the defaults.
///
/// Missing keys fall back to their default values.
fn load_config(path: Option<&Path>) -> Result<AssemblerConfig> {
    let Some(path) = path else {
        return Ok(AssemblerConfig::default());
    };

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: AssemblerConfig = serde_json::from_str(&contents)
        .with_context(|| format!("Invalid config file: {}", path.display()))?;
    config.validate().context("Invalid assembler limits")?;

    tracing::debug!(?config, "loaded config");
    Ok(config)
}

fn read_source(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read source file: {}", path.display()))
}
