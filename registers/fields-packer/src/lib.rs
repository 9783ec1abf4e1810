// Licensed under the Apache-2.0 license

//! Register field sheets to C bitfield unions and accessors.
//!
//! A register sheet lists registers (one address row each) followed by
//! their fields (one bit range each). This crate turns such a sheet into a
//! [`Group`] of [`Block`]s of [`Field`]s, packs every block into a
//! fixed-width container, and renders each block as a C union plus access
//! functions chosen by an [`EmissionStrategy`].
//!
//! ## Usage
//!
//! ```
//! use fields_packer::config::{AddressFormat, GeneratorConfig};
//! use fields_packer::{driver, StrategyKind};
//!
//! let sheet = "\
//! ,# addr=0x0010,CTRL,
//! ,[0],enable,
//! ,[7:4],mode,
//! ";
//! let config = GeneratorConfig::new("Bus")
//!     .with_strategy(StrategyKind::Bus)
//!     .with_address_format(AddressFormat::Hex)
//!     .named(true);
//! let code = driver::generate(sheet.as_bytes(), &config).unwrap();
//! assert!(code.contains("typedef union r_CTRL {"));
//! assert!(code.contains("static inline uint32_t __reg_read_CTRL(void)"));
//! ```
//!
//! ## Module Organization
//!
//! - [`field`], [`block`], [`group`]: the data model
//! - [`policy`]: membership, ordering and address formatting policies
//! - [`parser`]: building a group from classified rows
//! - [`layout`]: packing a block into a container
//! - [`codegen`]: emission strategies and the group generator
//! - [`csv`]: the register sheet reader and classifier
//! - [`config`], [`driver`]: configuration and the file level entry points
//! - [`util`]: include guard helpers

pub mod block;
pub mod codegen;
pub mod config;
pub mod csv;
pub mod driver;
pub mod error;
pub mod field;
pub mod group;
pub mod layout;
pub mod parser;
pub mod policy;
pub mod util;

pub use block::{Block, BlockCreator, ResolvedAddress};
pub use codegen::{
    AccessorUnion, BusMapUnion, BusUnion, CUnion, EmissionStrategy, Generator, PeripheralUnion,
    PlaceholderUnion, RawUnion, StrategyKind,
};
pub use config::{AddressFormat, BuildConfig, GeneratorConfig, SectionConfig};
pub use csv::{AddressShape, DemoClassifier};
pub use error::{PackerError, PackerResult};
pub use field::{Address, Field};
pub use group::Group;
pub use layout::{Layout, Packer, Slot, SlotKind};
pub use parser::{ClassifiedRow, ParseState, Parser, Row, RowClassifier, RowKind};
pub use policy::{AddressFormatter, DeviceAddress, HexAddress, MembershipPolicy, SortPolicy};
