// Licensed under the Apache-2.0 license

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use fields_packer::{AddressFormat, GeneratorConfig, StrategyKind};
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "fields-packer",
    author,
    version,
    about = "Generate C register unions and accessors from register sheets"
)]
struct Cli {
    /// Log level: off, error, warn, info, debug or trace
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LevelFilter,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate code for one register sheet.
    Generate(GenerateArgs),
    /// Generate one header from a TOML build description.
    Build(BuildArgs),
    /// Print the parsed registers of a sheet.
    Show(ShowArgs),
}

#[derive(Args, Debug)]
struct SheetArgs {
    /// Register sheet (CSV)
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// Group name
    #[arg(long, default_value = "Registers")]
    name: String,

    /// Group description
    #[arg(long)]
    description: Option<String>,

    /// Address format: raw, hex or device
    #[arg(long, value_name = "FORMAT", default_value = "raw")]
    address_format: AddressFormat,

    /// Name blocks after their address rows
    #[arg(long)]
    named: bool,
}

impl SheetArgs {
    fn config(&self) -> GeneratorConfig {
        let config = GeneratorConfig::new(&self.name)
            .with_address_format(self.address_format)
            .named(self.named);
        match &self.description {
            Some(description) => config.with_description(description),
            None => config,
        }
    }
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[command(flatten)]
    sheet: SheetArgs,

    /// Emission strategy: placeholder, raw, bus-map, bus, peripheral or accessor
    #[arg(short, long, value_name = "STRATEGY", default_value = "placeholder")]
    strategy: StrategyKind,

    /// Container width in bits
    #[arg(short, long, default_value_t = 16)]
    width: u32,

    /// C type of the bit fields (defaults to the strategy's type)
    #[arg(long, value_name = "TYPE")]
    field_type: Option<String>,

    /// Fail when fields overlap instead of warning
    #[arg(long)]
    reject_overlaps: bool,

    /// Output file; the code is printed when omitted
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Wrap the code in an include guard
    #[arg(long)]
    guard: bool,
}

impl GenerateArgs {
    fn config(&self) -> GeneratorConfig {
        let config = self
            .sheet
            .config()
            .with_strategy(self.strategy)
            .with_width(self.width)
            .reject_overlaps(self.reject_overlaps);
        match &self.field_type {
            Some(field_type) => config.with_field_type(field_type),
            None => config,
        }
    }
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// Build description (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Directory for the generated header (defaults to the build description's directory)
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ShowArgs {
    #[command(flatten)]
    sheet: SheetArgs,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    SimpleLogger::new().with_level(cli.log_level).init()?;

    match cli.cmd {
        Command::Generate(args) => commands::generate(
            &args.sheet.input,
            &args.config(),
            args.output.as_deref(),
            args.guard,
        ),
        Command::Build(args) => commands::build(&args.config, args.output_dir.as_deref()),
        Command::Show(args) => commands::show(&args.sheet.input, &args.sheet.config()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_generate_arguments() {
        let cli = Cli::parse_from([
            "fields-packer",
            "generate",
            "--input",
            "bus.csv",
            "--strategy",
            "bus-map",
            "--width",
            "32",
            "--address-format",
            "hex",
            "--named",
            "--guard",
        ]);
        let Command::Generate(args) = cli.cmd else {
            panic!("expected generate");
        };
        let config = args.config();
        assert_eq!(config.strategy, StrategyKind::BusMap);
        assert_eq!(config.width, 32);
        assert_eq!(config.address_format, AddressFormat::Hex);
        assert!(config.named);
        assert!(args.guard);
        assert_eq!(cli.log_level, LevelFilter::Warn);
    }

    #[test]
    fn test_unknown_strategy_is_rejected() {
        let result = Cli::try_parse_from([
            "fields-packer",
            "generate",
            "--input",
            "bus.csv",
            "--strategy",
            "fancy",
        ]);
        assert!(result.is_err());
    }
}
