//! Build command: compile a script into an image file.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;
use sensorasm_assembler::{assemble_with_program, Image, Program};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Firmware byte layout
    Bin,
    /// Firmware byte layout as a hex string
    Hex,
    /// Instruction words and function table as JSON
    Json,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            OutputFormat::Bin => "bin",
            OutputFormat::Hex => "hex",
            OutputFormat::Json => "json",
        }
    }
}

#[derive(Args)]
pub struct BuildArgs {
    /// Path to script source file
    source: PathBuf,

    /// Output file (defaults to the source path with the format's extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "bin")]
    format: OutputFormat,

    /// JSON file with assembler limits
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print an annotated listing of the encoded instructions
    #[arg(long)]
    listing: bool,
}

pub fn run(args: BuildArgs) -> Result<()> {
    println!("{}", "Building script...".bold().cyan());
    println!();

    let config = super::load_config(args.config.as_deref())?;
    let source = super::read_source(&args.source)?;

    println!(
        "  Compiling: {}",
        args.source.display().to_string().bright_black()
    );

    let (program, image) = assemble_with_program(&source, &config)
        .with_context(|| format!("Failed to compile {}", args.source.display()))?;

    println!(
        "{}  Compiled {} instructions in {} functions",
        "✓".green().bold(),
        image.instructions.len(),
        image.functions.len()
    );

    if args.listing {
        println!();
        print_listing(&program, &image);
    }

    let output = args
        .output
        .unwrap_or_else(|| args.source.with_extension(args.format.extension()));
    let contents = render(&image, args.format)?;
    fs::write(&output, &contents)
        .with_context(|| format!("Failed to write output file: {}", output.display()))?;

    println!();
    println!(
        "  Wrote {} bytes to {}",
        contents.len(),
        output.display().to_string().bright_yellow()
    );

    Ok(())
}

fn render(image: &Image, format: OutputFormat) -> Result<Vec<u8>> {
    let contents = match format {
        OutputFormat::Bin => image.to_bytes(),
        OutputFormat::Hex => {
            let mut text = hex::encode(image.to_bytes());
            text.push('\n');
            text.into_bytes()
        }
        OutputFormat::Json => serde_json::to_vec_pretty(image)?,
    };
    Ok(contents)
}

fn print_listing(program: &Program, image: &Image) {
    for (index, (instruction, word)) in program
        .instructions()
        .iter()
        .zip(&image.instructions)
        .enumerate()
    {
        for func in program.functions().iter().filter(|f| f.start == index) {
            println!("{}:", func.name.bright_cyan());
        }
        for label in program
            .labels()
            .iter()
            .filter(|l| l.index == index && l.function == instruction.function)
        {
            println!("  {}:", label.name.bright_magenta());
        }
        println!(
            "  {:4}  {:08x} {:08x}  {:<28} {}",
            index,
            word.part1,
            word.part2,
            instruction.to_string(),
            format!("; line {}", instruction.line).bright_black()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    const SCRIPT: &str = "\
.function main
MOVW R0, $10
LOOP:
SUB R0, R0, $1
JNZ R0, @LOOP
.endfunction
";

    fn args(source: &Path, output: &Path, format: OutputFormat) -> BuildArgs {
        BuildArgs {
            source: source.to_path_buf(),
            output: Some(output.to_path_buf()),
            format,
            config: None,
            listing: true,
        }
    }

    #[test]
    fn test_build_binary() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("script.s");
        let output = dir.path().join("script.bin");
        fs::write(&source, SCRIPT).unwrap();

        run(args(&source, &output, OutputFormat::Bin)).unwrap();

        let image = Image::from_bytes(&fs::read(&output).unwrap()).unwrap();
        assert_eq!(image.instructions.len(), 3);
        assert_eq!(image.function("main"), Some(0));
    }

    #[test]
    fn test_build_hex_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("script.s");
        fs::write(&source, SCRIPT).unwrap();

        let hex_out = dir.path().join("script.hex");
        run(args(&source, &hex_out, OutputFormat::Hex)).unwrap();
        let text = fs::read_to_string(&hex_out).unwrap();
        let bytes = hex::decode(text.trim()).unwrap();
        assert_eq!(&bytes[..4], b"SCRP");

        let json_out = dir.path().join("script.json");
        run(args(&source, &json_out, OutputFormat::Json)).unwrap();
        let image: Image = serde_json::from_slice(&fs::read(&json_out).unwrap()).unwrap();
        assert_eq!(Image::from_bytes(&bytes).unwrap(), image);
    }

    #[test]
    fn test_build_with_config() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("script.s");
        let config = dir.path().join("limits.json");
        fs::write(&source, SCRIPT).unwrap();
        fs::write(&config, r#"{ "max_instructions": 2 }"#).unwrap();

        let mut build = args(&source, &dir.path().join("out.bin"), OutputFormat::Bin);
        build.config = Some(config);
        let err = run(build).unwrap_err();
        assert!(format!("{:#}", err).contains("instruction table is full"));
    }

    #[test]
    fn test_build_reports_line() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("bad.s");
        fs::write(&source, ".function main\nJMP @main\n.endfunction\n").unwrap();

        let err = run(args(&source, &dir.path().join("bad.bin"), OutputFormat::Bin)).unwrap_err();
        assert!(format!("{:#}", err).contains("line 2: unknown instruction: 'JMP'"));
    }
}
