//! Disasm command: print a listing of a binary image.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use sensorasm_assembler::{decode, Image};
use std::fs;
use std::path::PathBuf;

#[derive(Args)]
pub struct DisasmArgs {
    /// Path to a binary image produced by `build`
    image: PathBuf,
}

pub fn run(args: DisasmArgs) -> Result<()> {
    let bytes = fs::read(&args.image)
        .with_context(|| format!("Failed to read image file: {}", args.image.display()))?;
    let image = Image::from_bytes(&bytes).context("Failed to read image")?;

    for line in listing(&image)? {
        println!("{}", line);
    }
    Ok(())
}

fn listing(image: &Image) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    for (index, word) in image.instructions.iter().enumerate() {
        for func in image.functions.iter().filter(|f| f.start as usize == index) {
            lines.push(format!("{}:", func.name.bright_cyan()));
        }
        let decoded =
            decode(*word).with_context(|| format!("Failed to decode instruction {}", index))?;
        lines.push(format!(
            "  {:4}  {} {}  {}",
            index,
            format!("{:08x}", word.part1).bright_black(),
            format!("{:08x}", word.part2).bright_black(),
            decoded
        ));
    }
    Ok(lines)
}
