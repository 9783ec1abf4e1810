// Licensed under the Apache-2.0 license

//! Error types for model construction, parsing and code generation.

use crate::field::Address;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while building a [`crate::Group`] or emitting code from it.
#[derive(Error, Debug)]
pub enum PackerError {
    /// A field was appended to a block whose membership policy rejects it.
    #[error(
        "field {field} at {field_address} does not belong to block {block}@({block_address})"
    )]
    MembershipRejected {
        block: String,
        block_address: Address,
        field: String,
        field_address: Address,
    },

    /// A group's membership policy rejected a block.
    #[error("group {group} rejected block {block}@({address})")]
    IllegalBlock {
        group: String,
        block: String,
        address: Address,
    },

    /// The same address was given a block name twice.
    #[error(
        "duplicated block address input: {address} (registered as {existing}, then {name})"
    )]
    DuplicateAddressName {
        address: Address,
        existing: String,
        name: String,
    },

    /// A field refers to an address that no address row named.
    #[error("no block name registered for address {address}")]
    UnresolvedBlockName { address: Address },

    /// The packed fields of a block do not fit the container.
    #[error("block {block} has too many bits: {bits} > {width}")]
    LayoutOverflow { block: String, bits: u32, width: u32 },

    /// Two or more blocks of a group resolve to the same name.
    #[error("duplicated block names: {}", format_duplicates(.duplicates))]
    DuplicateBlockName {
        /// Each colliding name with the addresses of every block using it.
        duplicates: Vec<(String, Vec<String>)>,
    },

    /// A field could not be constructed.
    #[error("invalid field {name:?}: {reason}")]
    InvalidField { name: String, reason: String },

    /// A field starts inside the range claimed by the previous slot.
    #[error("field {field} in block {block} overlaps bits claimed by {previous}")]
    OverlappingFields {
        block: String,
        field: String,
        previous: String,
    },

    /// A field row was seen before any address row.
    #[error("field {field} has no address (line {line})")]
    OrphanField { field: String, line: usize },

    /// An emission strategy cannot address a block with this address shape.
    #[error(
        "block {block} address {address} is not usable here, expected {expected}"
    )]
    UnsupportedAddress {
        block: String,
        address: Address,
        expected: &'static str,
    },

    /// A row could not be turned into an address or a bit range.
    #[error("line {line}: {reason}")]
    MalformedRow { line: usize, reason: String },

    /// A previous ingestion run on this parser failed.
    #[error("parser {group} already failed; its group is unavailable")]
    ParserFailed { group: String },

    /// An input file could not be opened or read.
    #[error("cannot read {}", path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A configuration document could not be read.
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for PackerError {
    fn from(err: toml::de::Error) -> Self {
        PackerError::Config(err.to_string())
    }
}

fn format_duplicates(duplicates: &[(String, Vec<String>)]) -> String {
    duplicates
        .iter()
        .map(|(name, addresses)| format!("{name} at [{}]", addresses.join(", ")))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for packer operations.
pub type PackerResult<T> = std::result::Result<T, PackerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_names_are_all_reported() {
        let err = PackerError::DuplicateBlockName {
            duplicates: vec![
                ("RegA".to_string(), vec!["16".to_string(), "32".to_string()]),
                ("RegB".to_string(), vec!["48".to_string(), "64".to_string()]),
            ],
        };
        assert_eq!(
            err.to_string(),
            "duplicated block names: RegA at [16, 32]; RegB at [48, 64]"
        );
    }

    #[test]
    fn test_overflow_message_names_block() {
        let err = PackerError::LayoutOverflow {
            block: "CTRL".to_string(),
            bits: 20,
            width: 16,
        };
        assert!(err.to_string().contains("CTRL"));
    }
}
