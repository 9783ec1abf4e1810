// Licensed under the Apache-2.0 license

//! Blocks: the fields that share one address.
//!
//! A [`Block`] becomes one generated container (one C union). It owns its
//! fields, refuses fields its membership policy rejects, and hands out sorted
//! snapshots on [`Block::dump`]. Blocks are usually made by a
//! [`BlockCreator`], which carries the policies shared by every block of a
//! group.

use crate::error::{PackerError, PackerResult};
use crate::field::{Address, Field};
use crate::policy::{SharedFormatter, SharedMembership, SharedSort};
use std::fmt::{self, Write};

/// A block address after the block's formatter has been applied.
///
/// Groups order blocks by this value. A group only uses one creator, so in
/// practice all of its blocks resolve to the same variant.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResolvedAddress {
    Raw(Address),
    Formatted(String),
}

impl fmt::Display for ResolvedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedAddress::Raw(address) => write!(f, "{address}"),
            ResolvedAddress::Formatted(s) => write!(f, "{s}"),
        }
    }
}

/// Ordered, owned collection of fields at one address.
#[derive(Clone)]
pub struct Block {
    name: String,
    address: Address,
    fields: Vec<Field>,
    checker: Option<SharedMembership<Block, Field>>,
    sort: Option<SharedSort<Field>>,
    formatter: Option<SharedFormatter>,
    reverse: bool,
}

impl Block {
    /// Create a block with the default policies: exact address membership,
    /// ascending shift order, raw address.
    pub fn new(name: &str, address: impl Into<Address>) -> Self {
        Self {
            name: name.trim().to_string(),
            address: address.into(),
            fields: Vec::new(),
            checker: None,
            sort: None,
            formatter: None,
            reverse: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The address exactly as given at construction.
    pub fn raw_address(&self) -> &Address {
        &self.address
    }

    /// The address seen by consumers: formatted if a formatter was injected,
    /// raw otherwise.
    pub fn address(&self) -> ResolvedAddress {
        match &self.formatter {
            Some(formatter) => ResolvedAddress::Formatted(formatter.format(&self.address)),
            None => ResolvedAddress::Raw(self.address.clone()),
        }
    }

    /// Whether `field` belongs to this block.
    ///
    /// The default policy compares the field's address with the raw block
    /// address, never the formatted one.
    pub fn check(&self, field: &Field) -> bool {
        match &self.checker {
            Some(checker) => checker.accepts(self, field),
            None => &self.address == field.address(),
        }
    }

    /// Append a field, failing with [`PackerError::MembershipRejected`] when
    /// [`Block::check`] refuses it.
    pub fn add_field(&mut self, field: Field) -> PackerResult<()> {
        if !self.check(&field) {
            return Err(PackerError::MembershipRejected {
                block: self.name.clone(),
                block_address: self.address.clone(),
                field: field.name().to_string(),
                field_address: field.address().clone(),
            });
        }
        self.fields.push(field);
        Ok(())
    }

    /// Sorted snapshot of the fields.
    ///
    /// Fields are ordered by shift (or the injected sort policy), descending
    /// when the block is reversed. The sort is stable, so fields with equal
    /// keys keep their insertion order and repeated dumps are identical.
    pub fn dump(&self) -> Vec<&Field> {
        let mut fields: Vec<&Field> = self.fields.iter().collect();
        fields.sort_by(|a, b| {
            let ord = match &self.sort {
                Some(sort) => sort.compare(a, b),
                None => a.shift().cmp(&b.shift()),
            };
            if self.reverse {
                ord.reverse()
            } else {
                ord
            }
        });
        fields
    }

    /// Number of fields added so far.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn is_reversed(&self) -> bool {
        self.reverse
    }

    /// Multi-line listing of the block and its sorted fields.
    pub fn describe(&self) -> String {
        let mut output = String::new();
        writeln!(output, "{self}").unwrap();
        for field in self.dump() {
            writeln!(output, "    {field}").unwrap();
        }
        output
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@({})", self.name, self.address)
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("fields", &self.fields)
            .field("reverse", &self.reverse)
            .finish_non_exhaustive()
    }
}

/// Factory for blocks sharing the same policies.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use fields_packer::{Address, BlockCreator, HexAddress};
///
/// let creator = BlockCreator::new().with_address_formatter(Arc::new(HexAddress::default()));
/// let block = creator.create("CONFIG0", Address::from(0x10u64));
/// assert_eq!(block.address().to_string(), "0x0010");
/// ```
#[derive(Clone, Default)]
pub struct BlockCreator {
    checker: Option<SharedMembership<Block, Field>>,
    sort: Option<SharedSort<Field>>,
    formatter: Option<SharedFormatter>,
    reverse: bool,
}

impl BlockCreator {
    /// A creator producing blocks with all default policies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the address-equality membership check.
    pub fn with_checker(mut self, checker: SharedMembership<Block, Field>) -> Self {
        self.checker = Some(checker);
        self
    }

    /// Replace the ascending-shift field order.
    pub fn with_sort(mut self, sort: SharedSort<Field>) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Format block addresses for display and group ordering.
    pub fn with_address_formatter(mut self, formatter: SharedFormatter) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Dump fields in descending order.
    pub fn reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    pub fn create(&self, name: &str, address: impl Into<Address>) -> Block {
        Block {
            checker: self.checker.clone(),
            sort: self.sort.clone(),
            formatter: self.formatter.clone(),
            reverse: self.reverse,
            ..Block::new(name, address)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{sort_by_key, HexAddress};
    use std::sync::Arc;

    fn field(name: &str, address: u64, bits: u32, shift: u32) -> Field {
        Field::new(name, address, bits, shift).unwrap()
    }

    fn names(block: &Block) -> Vec<&str> {
        block.dump().into_iter().map(|f| f.name()).collect()
    }

    #[test]
    fn test_default_membership_uses_raw_address() {
        let mut block = BlockCreator::new()
            .with_address_formatter(Arc::new(HexAddress::default()))
            .create(" CTRL ", 0x10u64);
        assert_eq!(block.name(), "CTRL");
        assert!(block.check(&field("a", 0x10, 1, 0)));
        assert!(!block.check(&field("b", 0x20, 1, 0)));

        block.add_field(field("a", 0x10, 1, 0)).unwrap();
        let err = block.add_field(field("b", 0x20, 1, 0)).unwrap_err();
        assert!(matches!(err, PackerError::MembershipRejected { .. }));
        assert_eq!(block.len(), 1);
    }

    #[test]
    fn test_dump_sorts_by_shift_and_is_idempotent() {
        let mut block = Block::new("R", 0u64);
        block.add_field(field("hi", 0, 4, 8)).unwrap();
        block.add_field(field("lo", 0, 4, 0)).unwrap();
        block.add_field(field("mid", 0, 4, 4)).unwrap();

        assert_eq!(names(&block), ["lo", "mid", "hi"]);
        assert_eq!(block.dump(), block.dump());
    }

    #[test]
    fn test_dump_is_stable_for_equal_keys() {
        let mut block = Block::new("R", 0u64);
        block.add_field(field("first", 0, 1, 2)).unwrap();
        block.add_field(field("second", 0, 1, 2)).unwrap();
        block.add_field(field("zero", 0, 1, 0)).unwrap();
        block.add_field(field("third", 0, 1, 2)).unwrap();

        assert_eq!(names(&block), ["zero", "first", "second", "third"]);
    }

    #[test]
    fn test_reverse_and_custom_sort() {
        let mut block = BlockCreator::new().reverse(true).create("R", 0u64);
        block.add_field(field("a", 0, 1, 0)).unwrap();
        block.add_field(field("b", 0, 1, 1)).unwrap();
        assert_eq!(names(&block), ["b", "a"]);

        let mut block = BlockCreator::new()
            .with_sort(Arc::new(sort_by_key(|f: &Field| f.name().to_string())))
            .create("R", 0u64);
        block.add_field(field("zeta", 0, 1, 0)).unwrap();
        block.add_field(field("alpha", 0, 1, 1)).unwrap();
        assert_eq!(names(&block), ["alpha", "zeta"]);
    }

    #[test]
    fn test_custom_checker() {
        let creator = BlockCreator::new().with_checker(Arc::new(|block: &Block, field: &Field| {
            block.raw_address().parts()[0] == field.address().parts()[0]
        }));
        let mut block = creator.create("DEV1", Address::from((1u64, 0x10u64)));
        let other_offset = Field::new("x", Address::from((1u64, 0x14u64)), 1, 0).unwrap();
        let other_device = Field::new("y", Address::from((2u64, 0x10u64)), 1, 0).unwrap();
        assert!(block.add_field(other_offset).is_ok());
        assert!(block.add_field(other_device).is_err());
    }

    #[test]
    fn test_address_resolution() {
        let raw = Block::new("R", 0x10u64);
        assert_eq!(raw.address(), ResolvedAddress::Raw(Address::Scalar(0x10)));
        assert_eq!(raw.to_string(), "R@(16)");

        let formatted = BlockCreator::new()
            .with_address_formatter(Arc::new(HexAddress::default()))
            .create("R", 0x10u64);
        assert_eq!(
            formatted.address(),
            ResolvedAddress::Formatted("0x0010".to_string())
        );
    }

    #[test]
    fn test_describe_lists_sorted_fields() {
        let mut block = Block::new("R", 1u64);
        block.add_field(field("b", 1, 2, 2)).unwrap();
        block.add_field(field("a", 1, 2, 0)).unwrap();
        assert_eq!(block.describe(), "R@(1)\n    a[1:0] @ 1\n    b[3:2] @ 1\n");
    }
}
