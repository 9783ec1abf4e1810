// Licensed under the Apache-2.0 license

//! Groups: blocks sharing one parsing and emission strategy.

use crate::block::Block;
use crate::error::{PackerError, PackerResult};
use crate::policy::{SharedMembership, SharedSort};
use std::collections::BTreeMap;
use std::fmt::{self, Write};

/// Ordered, owned collection of blocks.
///
/// Blocks are kept in insertion order internally; [`Group::dump`] returns them
/// ordered by resolved address unless a sort policy was injected.
#[derive(Clone)]
pub struct Group {
    name: String,
    description: Option<String>,
    blocks: Vec<Block>,
    checker: Option<SharedMembership<Group, Block>>,
    sort: Option<SharedSort<Block>>,
    reverse: bool,
}

impl Group {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            blocks: Vec::new(),
            checker: None,
            sort: None,
            reverse: false,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Only accept blocks the checker approves. By default every block is accepted.
    pub fn with_checker(mut self, checker: SharedMembership<Group, Block>) -> Self {
        self.checker = Some(checker);
        self
    }

    /// Replace the resolved-address block order.
    pub fn with_sort(mut self, sort: SharedSort<Block>) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Dump blocks in descending order.
    pub fn reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Append a block and return its insertion index.
    pub fn add_block(&mut self, block: Block) -> PackerResult<usize> {
        if let Some(checker) = &self.checker {
            if !checker.accepts(self, &block) {
                return Err(PackerError::IllegalBlock {
                    group: self.name.clone(),
                    block: block.name().to_string(),
                    address: block.raw_address().clone(),
                });
            }
        }
        self.blocks.push(block);
        Ok(self.blocks.len() - 1)
    }

    /// Blocks in insertion order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Block at an index returned by [`Group::add_block`].
    pub(crate) fn block_mut(&mut self, index: usize) -> &mut Block {
        &mut self.blocks[index]
    }

    /// Sorted snapshot of the blocks (stable).
    pub fn dump(&self) -> Vec<&Block> {
        let mut blocks: Vec<&Block> = self.blocks.iter().collect();
        blocks.sort_by(|a, b| {
            let ord = match &self.sort {
                Some(sort) => sort.compare(a, b),
                None => a.address().cmp(&b.address()),
            };
            if self.reverse {
                ord.reverse()
            } else {
                ord
            }
        });
        blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Fail if two blocks share a name.
    ///
    /// Every collision is reported, each with the resolved addresses of all
    /// blocks using the name, in dump order.
    pub fn check_duplicated_name(&self) -> PackerResult<()> {
        let mut by_name: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for block in self.dump() {
            by_name
                .entry(block.name())
                .or_default()
                .push(block.address().to_string());
        }

        let duplicates: Vec<(String, Vec<String>)> = by_name
            .into_iter()
            .filter(|(_, addresses)| addresses.len() > 1)
            .map(|(name, addresses)| (name.to_string(), addresses))
            .collect();

        if duplicates.is_empty() {
            Ok(())
        } else {
            Err(PackerError::DuplicateBlockName { duplicates })
        }
    }

    /// Multi-line listing of the group, its blocks and their fields.
    pub fn describe(&self) -> String {
        let mut output = String::new();
        writeln!(output, "{self}").unwrap();
        for block in self.dump() {
            for line in block.describe().lines() {
                writeln!(output, "  {line}").unwrap();
            }
        }
        output
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(description) => write!(f, "Group {}: {}", self.name, description),
            None => write!(f, "Group {}", self.name),
        }
    }
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("blocks", &self.blocks)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockCreator;
    use crate::field::Address;
    use crate::policy::HexAddress;
    use std::sync::Arc;

    fn names(group: &Group) -> Vec<&str> {
        group.dump().into_iter().map(|b| b.name()).collect()
    }

    #[test]
    fn test_dump_orders_by_address() {
        let mut group = Group::new("G");
        group.add_block(Block::new("C", 0x30u64)).unwrap();
        group.add_block(Block::new("A", 0x10u64)).unwrap();
        group.add_block(Block::new("B", 0x20u64)).unwrap();
        assert_eq!(names(&group), ["A", "B", "C"]);
        // Insertion order is untouched.
        assert_eq!(group.blocks()[0].name(), "C");
    }

    #[test]
    fn test_dump_orders_by_formatted_address() {
        let creator =
            BlockCreator::new().with_address_formatter(Arc::new(HexAddress::default()));
        let mut group = Group::new("G").reverse(true);
        group.add_block(creator.create("LOW", 0x2u64)).unwrap();
        group.add_block(creator.create("HIGH", 0xau64)).unwrap();
        assert_eq!(names(&group), ["HIGH", "LOW"]);
    }

    #[test]
    fn test_composite_addresses_order_by_parts() {
        let mut group = Group::new("G");
        group.add_block(Block::new("B", Address::from((1u64, 0u64)))).unwrap();
        group.add_block(Block::new("A", Address::from((0u64, 0x40u64)))).unwrap();
        group.add_block(Block::new("C", Address::from((1u64, 4u64)))).unwrap();
        assert_eq!(names(&group), ["A", "B", "C"]);
    }

    #[test]
    fn test_checker_rejects_block() {
        let mut group = Group::new("Small").with_checker(Arc::new(|group: &Group, _: &Block| {
            group.len() < 1
        }));
        assert_eq!(group.add_block(Block::new("A", 0u64)).unwrap(), 0);
        let err = group.add_block(Block::new("B", 4u64)).unwrap_err();
        assert!(matches!(err, PackerError::IllegalBlock { .. }));
    }

    #[test]
    fn test_duplicated_names_reported_together() {
        let mut group = Group::new("G");
        group.add_block(Block::new("RegA", 0x10u64)).unwrap();
        group.add_block(Block::new("RegA", 0x20u64)).unwrap();
        group.add_block(Block::new("RegB", 0x30u64)).unwrap();
        group.add_block(Block::new("RegC", 0x40u64)).unwrap();
        group.add_block(Block::new("RegC", 0x50u64)).unwrap();

        match group.check_duplicated_name() {
            Err(PackerError::DuplicateBlockName { duplicates }) => {
                assert_eq!(
                    duplicates,
                    vec![
                        ("RegA".to_string(), vec!["16".to_string(), "32".to_string()]),
                        ("RegC".to_string(), vec!["64".to_string(), "80".to_string()]),
                    ]
                );
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_unique_names_pass() {
        let mut group = Group::new("G");
        group.add_block(Block::new("RegA", 0x10u64)).unwrap();
        group.add_block(Block::new("RegB", 0x20u64)).unwrap();
        assert!(group.check_duplicated_name().is_ok());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Group::new("Bus").with_description("discontinuous registers").to_string(),
            "Group Bus: discontinuous registers"
        );
        assert_eq!(Group::new("Raw").to_string(), "Group Raw");
    }
}
