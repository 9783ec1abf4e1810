// Licensed under the Apache-2.0 license

//! Reading register sheets and generating headers from configuration.

use crate::config::{BuildConfig, GeneratorConfig};
use crate::csv::classify_rows;
use crate::error::{PackerError, PackerResult};
use crate::group::Group;
use crate::parser::Parser;
use crate::util::once_only_header;
use log::debug;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Parse a register sheet into a group.
pub fn parse_group<R: BufRead>(reader: R, config: &GeneratorConfig) -> PackerResult<Group> {
    config.validate()?;
    let classifier = config.classifier();
    let parser = Parser::new(config.group(), classify_rows(reader, &classifier))
        .with_block_creator(config.block_creator());
    if config.named {
        parser.with_registered_names().into_group()
    } else {
        parser.into_group()
    }
}

/// Parse a register sheet file into a group.
pub fn parse_group_file(path: &Path, config: &GeneratorConfig) -> PackerResult<Group> {
    let file = File::open(path).map_err(|source| PackerError::Input {
        path: path.to_path_buf(),
        source,
    })?;
    parse_group(BufReader::new(file), config)
}

/// Generate the code of an already parsed group.
///
/// Fails with [`PackerError::DuplicateBlockName`] before generating anything
/// if two blocks share a name.
pub fn generate_group(group: &Group, config: &GeneratorConfig) -> PackerResult<String> {
    group.check_duplicated_name()?;
    config
        .strategy
        .generate(group, config.packer(), config.field_type.as_deref())
}

/// Parse a register sheet and generate its code.
pub fn generate<R: BufRead>(reader: R, config: &GeneratorConfig) -> PackerResult<String> {
    let group = parse_group(reader, config)?;
    generate_group(&group, config)
}

/// Comment introducing a group in a combined header.
pub fn section_banner(group: &Group) -> String {
    format!("/*\n * {group}\n */")
}

/// Generate every section of `config` into one include-guarded header.
pub fn build(config: &BuildConfig) -> PackerResult<String> {
    config.validate()?;
    let (head, tail) = once_only_header(&config.output);

    let mut parts = vec![head];
    for section in &config.sections {
        let path = config.input_path(section);
        debug!("{}: reading {}", section.generator.name, path.display());
        let group = parse_group_file(&path, &section.generator)?;
        parts.push(section_banner(&group));
        parts.push(generate_group(&group, &section.generator)?);
    }
    parts.push(tail);
    Ok(parts.join("\n"))
}
