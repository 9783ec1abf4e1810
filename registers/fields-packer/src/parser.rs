// Licensed under the Apache-2.0 license

//! Incremental ingestion of classified rows into a [`Group`].
//!
//! The parser never looks at text. Rows arrive already classified (see
//! [`RowClassifier`]); the parser keeps the current address and a cursor on
//! the last block it touched. A field whose address the cursor block rejects
//! opens a new block, so block boundaries follow contiguous runs of equal
//! addresses in the input.
//!
//! ```
//! use fields_packer::{ClassifiedRow, Group, Parser};
//!
//! let rows = vec![
//!     Ok(ClassifiedRow::address(0x10u64, "RegA")),
//!     Ok(ClassifiedRow::field("x", 4, 0)),
//!     Ok(ClassifiedRow::field("y", 4, 4)),
//!     Ok(ClassifiedRow::address(0x20u64, "RegB")),
//!     Ok(ClassifiedRow::field("z", 1, 0)),
//! ];
//! let mut parser = Parser::new(Group::new("Demo"), rows).with_registered_names();
//! let group = parser.gen_group().unwrap();
//! let names: Vec<_> = group.dump().iter().map(|b| b.name().to_string()).collect();
//! assert_eq!(names, ["RegA", "RegB"]);
//! ```

use crate::block::BlockCreator;
use crate::error::{PackerError, PackerResult};
use crate::field::{Address, Field};
use crate::group::Group;
use log::{debug, trace};
use std::collections::HashMap;

/// One line of tabular input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    /// 1-based line number in the source.
    pub line: usize,
    pub cells: Vec<String>,
}

impl Row {
    pub fn new(line: usize, cells: Vec<String>) -> Self {
        Self { line, cells }
    }

    /// Text of one cell, or `""` past the end of the row.
    pub fn cell(&self, index: usize) -> &str {
        self.cells.get(index).map(String::as_str).unwrap_or("")
    }
}

/// The coarse kind of a row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowKind {
    Empty,
    Comment,
    Address,
    Field,
    Unknown,
}

/// A row after classification, carrying what the parser needs from it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClassifiedRow {
    Empty,
    Comment,
    /// Start of a register: every following field lives at `address`.
    Address { address: Address, name: String },
    /// One bit range at the current address.
    Field {
        name: String,
        bits: u32,
        shift: u32,
        source: String,
        line: usize,
    },
    Unknown,
}

impl ClassifiedRow {
    pub fn address(address: impl Into<Address>, name: &str) -> Self {
        ClassifiedRow::Address {
            address: address.into(),
            name: name.to_string(),
        }
    }

    pub fn field(name: &str, bits: u32, shift: u32) -> Self {
        ClassifiedRow::Field {
            name: name.to_string(),
            bits,
            shift,
            source: String::new(),
            line: 0,
        }
    }

    pub fn kind(&self) -> RowKind {
        match self {
            ClassifiedRow::Empty => RowKind::Empty,
            ClassifiedRow::Comment => RowKind::Comment,
            ClassifiedRow::Address { .. } => RowKind::Address,
            ClassifiedRow::Field { .. } => RowKind::Field,
            ClassifiedRow::Unknown => RowKind::Unknown,
        }
    }
}

/// Maps raw rows to [`ClassifiedRow`]s. Syntax is entirely up to the implementor.
pub trait RowClassifier {
    fn classify(&self, row: &Row) -> PackerResult<ClassifiedRow>;
}

impl<F> RowClassifier for F
where
    F: Fn(&Row) -> PackerResult<ClassifiedRow>,
{
    fn classify(&self, row: &Row) -> PackerResult<ClassifiedRow> {
        self(row)
    }
}

/// Whether [`Parser::gen_group`] has run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseState {
    NotStarted,
    Parsed,
    /// Ingestion failed; the partial group is never handed out.
    Failed,
}

/// How a newly opened block gets its name.
#[derive(Clone, Debug)]
enum BlockNaming {
    /// The address rendered with `Display`.
    ByAddress,
    /// Names registered by address rows.
    Registered(HashMap<Address, String>),
}

type RowStream<'a> = Box<dyn Iterator<Item = PackerResult<ClassifiedRow>> + 'a>;

/// Builds one [`Group`] from a stream of classified rows, once.
pub struct Parser<'a> {
    group: Group,
    creator: BlockCreator,
    naming: BlockNaming,
    address: Option<Address>,
    /// Insertion index of the last block a field went into.
    cursor: Option<usize>,
    rows: Option<RowStream<'a>>,
    state: ParseState,
}

impl<'a> Parser<'a> {
    pub fn new<I>(group: Group, rows: I) -> Self
    where
        I: IntoIterator<Item = PackerResult<ClassifiedRow>>,
        I::IntoIter: 'a,
    {
        Self {
            group,
            creator: BlockCreator::new(),
            naming: BlockNaming::ByAddress,
            address: None,
            cursor: None,
            rows: Some(Box::new(rows.into_iter())),
            state: ParseState::NotStarted,
        }
    }

    /// Use `creator` for every block this parser opens.
    pub fn with_block_creator(mut self, creator: BlockCreator) -> Self {
        self.creator = creator;
        self
    }

    /// Name blocks after their address rows instead of their address.
    ///
    /// Address rows then register a name for their address, and a field whose
    /// address was never registered fails with
    /// [`PackerError::UnresolvedBlockName`].
    pub fn with_registered_names(mut self) -> Self {
        self.naming = BlockNaming::Registered(HashMap::new());
        self
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Ingest every row and return the group.
    ///
    /// The first call consumes the row stream. Later calls return the same
    /// group without reading anything, or [`PackerError::ParserFailed`] if the
    /// first call failed.
    pub fn gen_group(&mut self) -> PackerResult<&Group> {
        match self.state {
            ParseState::Parsed => return Ok(&self.group),
            ParseState::Failed => {
                return Err(PackerError::ParserFailed {
                    group: self.group.name().to_string(),
                })
            }
            ParseState::NotStarted => {}
        }

        let rows = self.rows.take();
        let result = rows
            .into_iter()
            .flatten()
            .try_for_each(|row| self.ingest(row?));

        match result {
            Ok(()) => {
                self.state = ParseState::Parsed;
                debug!("{}: parsed {} blocks", self.group.name(), self.group.len());
                Ok(&self.group)
            }
            Err(err) => {
                self.state = ParseState::Failed;
                Err(err)
            }
        }
    }

    /// Run [`Parser::gen_group`] and take ownership of the result.
    pub fn into_group(mut self) -> PackerResult<Group> {
        self.gen_group()?;
        Ok(self.group)
    }

    /// Associate a block name with an address.
    ///
    /// Names are trimmed. An empty name still claims the address, but fields
    /// at that address stay unresolved.
    pub fn register_block_name(&mut self, address: Address, name: &str) -> PackerResult<()> {
        let BlockNaming::Registered(names) = &mut self.naming else {
            return Ok(());
        };
        let name = name.trim();
        if let Some(existing) = names.get(&address) {
            return Err(PackerError::DuplicateAddressName {
                address,
                existing: existing.clone(),
                name: name.to_string(),
            });
        }
        names.insert(address, name.to_string());
        Ok(())
    }

    fn find_block_name(&self, address: &Address) -> PackerResult<String> {
        match &self.naming {
            BlockNaming::ByAddress => Ok(address.to_string()),
            BlockNaming::Registered(names) => {
                names
                    .get(address)
                    .filter(|name| !name.is_empty())
                    .cloned()
                    .ok_or_else(|| PackerError::UnresolvedBlockName {
                        address: address.clone(),
                    })
            }
        }
    }

    /// Add a field, opening a new block when the last one rejects it.
    pub fn add_field(&mut self, field: Field) -> PackerResult<()> {
        if let Some(index) = self.cursor {
            let block = self.group.block_mut(index);
            if block.check(&field) {
                return block.add_field(field);
            }
        }

        let name = self.find_block_name(field.address())?;
        let block = self.creator.create(&name, field.address().clone());
        debug!("{}: new block {}", self.group.name(), block);
        let index = self.group.add_block(block)?;
        self.group.block_mut(index).add_field(field)?;
        self.cursor = Some(index);
        Ok(())
    }

    fn ingest(&mut self, row: ClassifiedRow) -> PackerResult<()> {
        match row {
            ClassifiedRow::Address { address, name } => {
                self.register_block_name(address.clone(), &name)?;
                self.address = Some(address);
            }
            ClassifiedRow::Field {
                name,
                bits,
                shift,
                source,
                line,
            } => {
                let Some(address) = self.address.clone() else {
                    return Err(PackerError::OrphanField { field: name, line });
                };
                let field = Field::new(&name, address, bits, shift)?.with_source(source);
                self.add_field(field)?;
            }
            other => trace!("{}: skipping {:?} row", self.group.name(), other.kind()),
        }
        Ok(())
    }
}
