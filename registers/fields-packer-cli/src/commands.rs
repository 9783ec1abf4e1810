// Licensed under the Apache-2.0 license

use anyhow::{Context, Result};
use fields_packer::driver;
use fields_packer::util::with_header_guard;
use fields_packer::{BuildConfig, GeneratorConfig};
use std::path::{Path, PathBuf};

/// Header name used for the include guard of `generate --guard`.
fn header_name(config: &GeneratorConfig, output: Option<&Path>) -> String {
    output
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("{}.h", config.name.to_lowercase()))
}

/// Generate the code of one register sheet.
pub fn render(
    input: &Path,
    config: &GeneratorConfig,
    output: Option<&Path>,
    guard: bool,
) -> Result<String> {
    let group = driver::parse_group_file(input, config)
        .with_context(|| format!("failed to parse {}", input.display()))?;
    let code = driver::generate_group(&group, config)
        .with_context(|| format!("failed to generate {}", group.name()))?;
    if guard {
        Ok(with_header_guard(&header_name(config, output), &code))
    } else {
        Ok(code)
    }
}

pub fn generate(
    input: &Path,
    config: &GeneratorConfig,
    output: Option<&Path>,
    guard: bool,
) -> Result<()> {
    println!("Generating {} from: {}", config.strategy, input.display());
    let code = render(input, config, output, guard)?;

    if let Some(output_path) = output {
        std::fs::write(output_path, &code)
            .with_context(|| format!("failed to write {}", output_path.display()))?;
        println!("Output written to: {}", output_path.display());
    } else {
        println!("\n--- Generated Code ---\n");
        println!("{}", code);
    }
    Ok(())
}

/// Run a build description and return the path of the written header.
pub fn build_header(config_path: &Path, output_dir: Option<&Path>) -> Result<PathBuf> {
    let config = BuildConfig::from_file(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    println!(
        "Generating {} sections from: {}",
        config.sections.len(),
        config_path.display()
    );

    let code = driver::build(&config)?;
    let dir = output_dir.unwrap_or(&config.base_dir);
    let output_path = dir.join(&config.output);
    std::fs::write(&output_path, code)
        .with_context(|| format!("failed to write {}", output_path.display()))?;
    Ok(output_path)
}

pub fn build(config_path: &Path, output_dir: Option<&Path>) -> Result<()> {
    let output_path = build_header(config_path, output_dir)?;
    println!("Output written to: {}", output_path.display());
    Ok(())
}

/// The parsed model tree of one register sheet.
pub fn describe(input: &Path, config: &GeneratorConfig) -> Result<String> {
    let group = driver::parse_group_file(input, config)
        .with_context(|| format!("failed to parse {}", input.display()))?;
    Ok(group.describe())
}

pub fn show(input: &Path, config: &GeneratorConfig) -> Result<()> {
    print!("{}", describe(input, config)?);
    Ok(())
}
