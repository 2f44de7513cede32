//! Check command: parse and link a script, then print its symbols.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use sensorasm_assembler::Program;
use std::path::PathBuf;

#[derive(Args)]
pub struct CheckArgs {
    /// Path to script source file
    source: PathBuf,

    /// JSON file with assembler limits
    #[arg(short, long)]
    config: Option<PathBuf>,
}

pub fn run(args: CheckArgs) -> Result<()> {
    let config = super::load_config(args.config.as_deref())?;
    let source = super::read_source(&args.source)?;

    let program = check(&source, config)
        .with_context(|| format!("{} failed to check", args.source.display()))?;

    println!(
        "{}  {} is valid",
        "✓".green().bold(),
        args.source.display().to_string().bright_black()
    );
    println!();
    println!("  Instructions: {}", program.instructions().len());
    println!("  Functions:");
    for (index, func) in program.functions().iter().enumerate() {
        println!(
            "    {:3}  {:<20} {}..{}",
            index,
            func.name.bright_cyan(),
            func.start,
            func.end
        );
        for label in program.labels().iter().filter(|l| l.function == index) {
            println!("           {:<18} {}", label.name.bright_magenta(), label.index);
        }
    }

    Ok(())
}

fn check(source: &[u8], config: sensorasm_assembler::AssemblerConfig) -> Result<Program> {
    let mut program = Program::new(config)?;
    program.parse(source)?;
    program.link()?;
    Ok(program)
}
