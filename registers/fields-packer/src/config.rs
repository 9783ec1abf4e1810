// Licensed under the Apache-2.0 license

//! Configuration for parsing and generating register groups.
//!
//! [`GeneratorConfig`] holds the settings of one group: how its register
//! sheet is read and which strategy renders it. [`BuildConfig`] is a TOML
//! document combining several groups into one header:
//!
//! ```toml
//! output = "reg_all.h"
//!
//! [[section]]
//! input = "bus-map.csv"
//! name = "BusMap"
//! description = "continuous registers"
//! strategy = "bus-map"
//! named = true
//!
//! [[section]]
//! input = "peripheral.csv"
//! name = "Peripheral"
//! strategy = "peripheral"
//! address_format = "device"
//! named = true
//! ```

use crate::block::BlockCreator;
use crate::codegen::StrategyKind;
use crate::csv::{AddressShape, DemoClassifier};
use crate::error::{PackerError, PackerResult};
use crate::field::MAX_FIELD_BIT;
use crate::group::Group;
use crate::layout::Packer;
use crate::policy::{DeviceAddress, HexAddress};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// How block addresses are rendered in comments and access code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AddressFormat {
    /// The address value as a decimal number.
    #[default]
    Raw,
    /// `0x0010`
    Hex,
    /// `Dev1, Addr(0020)`. Address rows must carry a device and an offset.
    Device,
}

impl AddressFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressFormat::Raw => "raw",
            AddressFormat::Hex => "hex",
            AddressFormat::Device => "device",
        }
    }
}

impl std::str::FromStr for AddressFormat {
    type Err = PackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(AddressFormat::Raw),
            "hex" => Ok(AddressFormat::Hex),
            "device" => Ok(AddressFormat::Device),
            _ => Err(PackerError::Config(format!(
                "unknown address format {s:?}, expected one of: raw, hex, device"
            ))),
        }
    }
}

/// Settings for one group.
///
/// # Example
///
/// ```
/// use fields_packer::config::{AddressFormat, GeneratorConfig};
/// use fields_packer::StrategyKind;
///
/// let config = GeneratorConfig::new("Bus")
///     .with_description("discontinuous registers")
///     .with_strategy(StrategyKind::Bus)
///     .with_address_format(AddressFormat::Hex)
///     .named(true);
/// assert_eq!(config.width, 16);
/// assert_eq!(config.group().to_string(), "Group Bus: discontinuous registers");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Group name, shown in the section banner.
    pub name: String,
    pub description: Option<String>,
    /// Container width in bits.
    pub width: u32,
    /// C type of the bit fields. `None` uses the strategy's own type.
    pub field_type: Option<String>,
    pub strategy: StrategyKind,
    pub address_format: AddressFormat,
    /// Name blocks after their address rows rather than their address.
    pub named: bool,
    /// Fail instead of warning when fields overlap.
    pub reject_overlaps: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            name: "Registers".to_string(),
            description: None,
            width: 16,
            field_type: None,
            strategy: StrategyKind::default(),
            address_format: AddressFormat::default(),
            named: false,
            reject_overlaps: false,
        }
    }
}

impl GeneratorConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    pub fn with_field_type(mut self, field_type: &str) -> Self {
        self.field_type = Some(field_type.to_string());
        self
    }

    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_address_format(mut self, format: AddressFormat) -> Self {
        self.address_format = format;
        self
    }

    pub fn named(mut self, named: bool) -> Self {
        self.named = named;
        self
    }

    pub fn reject_overlaps(mut self, reject: bool) -> Self {
        self.reject_overlaps = reject;
        self
    }

    /// Check the settings that cannot be expressed in the types.
    pub fn validate(&self) -> PackerResult<()> {
        if self.name.trim().is_empty() {
            return Err(PackerError::Config("group name is empty".to_string()));
        }
        if self.width == 0 || self.width > MAX_FIELD_BIT {
            return Err(PackerError::Config(format!(
                "group {}: width {} is not between 1 and {}",
                self.name, self.width, MAX_FIELD_BIT
            )));
        }
        if matches!(&self.field_type, Some(t) if t.trim().is_empty()) {
            return Err(PackerError::Config(format!(
                "group {}: field type is empty",
                self.name
            )));
        }
        Ok(())
    }

    /// An empty group carrying the name and description.
    pub fn group(&self) -> Group {
        let group = Group::new(&self.name);
        match &self.description {
            Some(description) => group.with_description(description),
            None => group,
        }
    }

    pub fn packer(&self) -> Packer {
        Packer::new(self.width).reject_overlaps(self.reject_overlaps)
    }

    pub fn block_creator(&self) -> BlockCreator {
        let creator = BlockCreator::new();
        match self.address_format {
            AddressFormat::Raw => creator,
            AddressFormat::Hex => creator.with_address_formatter(Arc::new(HexAddress::default())),
            AddressFormat::Device => creator.with_address_formatter(Arc::new(DeviceAddress)),
        }
    }

    pub fn classifier(&self) -> DemoClassifier {
        match self.address_format {
            AddressFormat::Device => DemoClassifier::new(AddressShape::Device),
            AddressFormat::Raw | AddressFormat::Hex => DemoClassifier::new(AddressShape::Scalar),
        }
    }
}

/// One `[[section]]` of a [`BuildConfig`].
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SectionConfig {
    /// Register sheet, relative to the configuration file.
    pub input: PathBuf,
    #[serde(flatten)]
    pub generator: GeneratorConfig,
}

/// Several groups generated into one include-guarded header.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct BuildConfig {
    /// Header file name, also used for the include guard.
    pub output: String,
    #[serde(rename = "section")]
    pub sections: Vec<SectionConfig>,
    /// Directory the section inputs are relative to.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl BuildConfig {
    /// Parse a configuration document. Inputs are relative to the current
    /// directory.
    pub fn from_toml_str(text: &str) -> PackerResult<Self> {
        let config: BuildConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration file. Inputs are relative to its directory.
    pub fn from_file(path: &Path) -> PackerResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| PackerError::Input {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&text)?;
        config.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(config)
    }

    pub fn validate(&self) -> PackerResult<()> {
        if self.output.trim().is_empty() {
            return Err(PackerError::Config("output name is empty".to_string()));
        }
        if self.sections.is_empty() {
            return Err(PackerError::Config(
                "at least one [[section]] is required".to_string(),
            ));
        }
        self.sections
            .iter()
            .try_for_each(|section| section.generator.validate())
    }

    /// Location of a section's register sheet.
    pub fn input_path(&self, section: &SectionConfig) -> PathBuf {
        self.base_dir.join(&section.input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUILD: &str = r#"
output = "reg_all.h"

[[section]]
input = "bus-map.csv"
name = "BusMap"
description = "continuous registers"
strategy = "bus-map"
named = true

[[section]]
input = "peripheral.csv"
name = "Peripheral"
strategy = "peripheral"
address_format = "device"
width = 32
field_type = "uint32_t"
"#;

    #[test]
    fn test_defaults() {
        let config = GeneratorConfig::default();
        assert_eq!(config.width, 16);
        assert_eq!(config.field_type, None);
        assert_eq!(config.strategy, StrategyKind::Placeholder);
        assert_eq!(config.address_format, AddressFormat::Raw);
        assert!(!config.named);
        assert!(!config.reject_overlaps);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = GeneratorConfig::new("Accessor")
            .with_width(32)
            .with_field_type("uint16_t")
            .with_strategy(StrategyKind::Accessor)
            .reject_overlaps(true);
        assert_eq!(config.packer(), Packer::new(32).reject_overlaps(true));
        assert_eq!(config.field_type.as_deref(), Some("uint16_t"));
        assert_eq!(config.group().to_string(), "Group Accessor");
    }

    #[test]
    fn test_invalid_settings() {
        assert!(GeneratorConfig::new("G").with_width(0).validate().is_err());
        assert!(GeneratorConfig::new("G").with_width(65).validate().is_err());
        assert!(GeneratorConfig::new("  ").validate().is_err());
        assert!(GeneratorConfig::new("G")
            .with_field_type("")
            .validate()
            .is_err());
    }

    #[test]
    fn test_address_format_policies() {
        let block = GeneratorConfig::new("G")
            .with_address_format(AddressFormat::Hex)
            .block_creator()
            .create("R", 0x10u64);
        assert_eq!(block.address().to_string(), "0x0010");

        let config = GeneratorConfig::new("G").with_address_format(AddressFormat::Device);
        assert_eq!(
            config.classifier(),
            DemoClassifier::new(AddressShape::Device)
        );
        assert_eq!("hex".parse::<AddressFormat>().unwrap(), AddressFormat::Hex);
        assert!("octal".parse::<AddressFormat>().is_err());
    }

    #[test]
    fn test_build_config() {
        let config = BuildConfig::from_toml_str(BUILD).unwrap();
        assert_eq!(config.output, "reg_all.h");
        assert_eq!(config.sections.len(), 2);

        let bus_map = &config.sections[0];
        assert_eq!(bus_map.input, PathBuf::from("bus-map.csv"));
        assert_eq!(bus_map.generator.strategy, StrategyKind::BusMap);
        assert_eq!(bus_map.generator.width, 16);
        assert!(bus_map.generator.named);

        let peripheral = &config.sections[1].generator;
        assert_eq!(peripheral.address_format, AddressFormat::Device);
        assert_eq!(peripheral.width, 32);
        assert_eq!(peripheral.description, None);
    }

    #[test]
    fn test_build_config_errors() {
        assert!(matches!(
            BuildConfig::from_toml_str("output = \"a.h\"\nsection = []\n"),
            Err(PackerError::Config(_))
        ));
        assert!(matches!(
            BuildConfig::from_toml_str(
                "output = \"a.h\"\n\
                 [[section]]\n\
                 input = \"a.csv\"\n\
                 strategy = \"fancy\"\n"
            ),
            Err(PackerError::Config(_))
        ));
        assert!(matches!(
            BuildConfig::from_toml_str("[[section]]\ninput = \"a.csv\"\n"),
            Err(PackerError::Config(_))
        ));
    }

    #[test]
    fn test_inputs_are_relative_to_config() {
        let dir = Path::new("demos");
        let config = BuildConfig {
            base_dir: dir.to_path_buf(),
            ..BuildConfig::from_toml_str(BUILD).unwrap()
        };
        assert_eq!(
            config.input_path(&config.sections[0]),
            Path::new("demos").join("bus-map.csv")
        );
    }
}
