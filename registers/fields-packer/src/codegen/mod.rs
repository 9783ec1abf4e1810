// Licensed under the Apache-2.0 license

//! C code generation for register groups.
//!
//! Every block of a group becomes one C union whose anonymous struct holds
//! the packed bit fields, followed by whatever access functions the
//! [`EmissionStrategy`] renders for it:
//!
//! ```text
//! /* block: CTRL(0x0010) */              <- comment
//! typedef union r_CTRL {                 <- structure
//! 	struct {
//! 		uint32_t enable:1;	/*[0]*/
//! 		uint32_t unused0:15;	/*[15:1]*/
//! 	};
//! 	uint32_t val;
//! } R_CTRL;
//! static inline void __reg_write_CTRL... <- setter
//! static inline uint32_t __reg_read_C... <- getter
//! ```
//!
//! The implementation is split across submodules:
//! - `strategies`: the concrete strategies shipped with the crate

mod strategies;

pub use strategies::{
    AccessorUnion, BusMapUnion, BusUnion, PeripheralUnion, PlaceholderUnion, RawUnion,
};

use crate::block::Block;
use crate::error::{PackerError, PackerResult};
use crate::group::Group;
use crate::layout::{Layout, Packer};
use log::{debug, warn};
use serde::Deserialize;
use std::fmt::{self, Write};
use std::str::FromStr;

/// Field type used when neither the strategy nor the caller picks one.
pub const DEFAULT_FIELD_TYPE: &str = "uint32_t";

/// One block on its way to becoming a C union.
///
/// Strategies receive this instead of the bare block so they can refer to
/// the union's type names and render its packed layout.
#[derive(Clone, Debug)]
pub struct CUnion<'a> {
    block: &'a Block,
    packer: Packer,
    field_type: &'a str,
}

impl<'a> CUnion<'a> {
    pub fn new(block: &'a Block, packer: Packer, field_type: &'a str) -> Self {
        Self {
            block,
            packer,
            field_type,
        }
    }

    pub fn block(&self) -> &'a Block {
        self.block
    }

    pub fn field_type(&self) -> &str {
        self.field_type
    }

    /// The typedef name, `R_NAME`.
    pub fn name(&self) -> String {
        format!("R_{}", self.block.name())
    }

    /// The union tag, `union r_NAME`.
    pub fn raw_name(&self) -> String {
        format!("union r_{}", self.block.name())
    }

    pub fn layout(&self) -> PackerResult<Layout<'a>> {
        self.packer.pack(self.block)
    }

    /// Render the typedef for the packed layout.
    pub fn typedef(&self) -> PackerResult<String> {
        let layout = self.layout()?;
        let c_type = self.field_type;

        let mut output = String::new();
        writeln!(output, "typedef {} {{", self.raw_name()).unwrap();
        writeln!(output, "\tstruct {{").unwrap();
        for slot in layout.slots.iter() {
            writeln!(
                output,
                "\t\t{c_type} {}:{};\t/*{}*/",
                slot.name(),
                slot.bits,
                slot.range()
            )
            .unwrap();
        }
        writeln!(output, "\t}};").unwrap();
        writeln!(output, "\t{c_type} val;").unwrap();
        write!(output, "}} {};", self.name()).unwrap();
        Ok(output)
    }
}

/// Renders the four parts of a block, plus text around the whole group.
///
/// Every method has a default, so a strategy only overrides what differs.
/// The default setter and getter are placeholder comments.
pub trait EmissionStrategy {
    /// C type of the union's bit fields and of its `val` member.
    fn field_type(&self) -> &str {
        DEFAULT_FIELD_TYPE
    }

    fn comment(&self, union: &CUnion<'_>) -> String {
        let block = union.block();
        format!("/* block: {}({}) */", block.name(), block.address())
    }

    fn structure(&self, union: &CUnion<'_>) -> PackerResult<String> {
        union.typedef()
    }

    fn setter(&self, _union: &CUnion<'_>) -> PackerResult<String> {
        Ok("/* NotImplemented Block Setter */".to_string())
    }

    fn getter(&self, _union: &CUnion<'_>) -> PackerResult<String> {
        Ok("/* NotImplemented Block Getter */".to_string())
    }

    /// Text emitted before the first union. Must end with a newline when
    /// not empty.
    fn preamble(&self, _group: &Group) -> String {
        String::new()
    }

    /// Text emitted after the last union.
    fn epilogue(&self, _unions: &[CUnion<'_>]) -> String {
        String::new()
    }

    /// Comment, structure, setter and getter joined by newlines.
    fn render_block(&self, union: &CUnion<'_>) -> PackerResult<String> {
        Ok([
            self.comment(union),
            self.structure(union)?,
            self.setter(union)?,
            self.getter(union)?,
        ]
        .join("\n"))
    }
}

/// Binds a group to one strategy.
pub struct Generator<'g, S> {
    group: &'g Group,
    strategy: S,
    packer: Packer,
    field_type: Option<String>,
}

impl<'g, S: EmissionStrategy> Generator<'g, S> {
    /// A generator packing into 16-bit containers with the strategy's
    /// field type.
    pub fn new(group: &'g Group, strategy: S) -> Self {
        Self {
            group,
            strategy,
            packer: Packer::new(16),
            field_type: None,
        }
    }

    pub fn with_packer(mut self, packer: Packer) -> Self {
        self.packer = packer;
        self
    }

    /// Override the strategy's field type.
    pub fn with_field_type(mut self, field_type: &str) -> Self {
        self.field_type = Some(field_type.to_string());
        self
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Generate the code for every block in group order.
    pub fn generate(&self) -> PackerResult<String> {
        let field_type = self
            .field_type
            .as_deref()
            .unwrap_or_else(|| self.strategy.field_type());

        let blocks = self.group.dump();
        for block in blocks.iter().filter(|block| block.is_empty()) {
            warn!("{}: block {} has no fields", self.group.name(), block);
        }
        let unions: Vec<CUnion> = blocks
            .into_iter()
            .map(|block| CUnion::new(block, self.packer, field_type))
            .collect();

        let mut output = self.strategy.preamble(self.group);
        let code = unions
            .iter()
            .map(|union| self.strategy.render_block(union))
            .collect::<PackerResult<Vec<_>>>()?;
        output.push_str(&code.join("\n"));

        let epilogue = self.strategy.epilogue(&unions);
        if !epilogue.is_empty() {
            output.push('\n');
            output.push_str(&epilogue);
        }

        debug!(
            "{}: generated {} unions of {} bits",
            self.group.name(),
            unions.len(),
            self.packer.width()
        );
        Ok(output)
    }
}

/// The strategies that can be selected by name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Unions with placeholder setter and getter comments.
    #[default]
    Placeholder,
    /// Unions only.
    Raw,
    /// Unions plus a `struct bus_map` laying them out back to back.
    BusMap,
    /// Volatile pointer access at the block address.
    Bus,
    /// Access through external `pread`/`pwrite` with a device number.
    Peripheral,
    /// Per-field `get_`/`set_` functions through external `reg_read`/`reg_write`.
    Accessor,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 6] = [
        StrategyKind::Placeholder,
        StrategyKind::Raw,
        StrategyKind::BusMap,
        StrategyKind::Bus,
        StrategyKind::Peripheral,
        StrategyKind::Accessor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Placeholder => "placeholder",
            StrategyKind::Raw => "raw",
            StrategyKind::BusMap => "bus-map",
            StrategyKind::Bus => "bus",
            StrategyKind::Peripheral => "peripheral",
            StrategyKind::Accessor => "accessor",
        }
    }

    /// Generate `group` with this strategy.
    pub fn generate(
        &self,
        group: &Group,
        packer: Packer,
        field_type: Option<&str>,
    ) -> PackerResult<String> {
        fn run<S: EmissionStrategy>(
            group: &Group,
            strategy: S,
            packer: Packer,
            field_type: Option<&str>,
        ) -> PackerResult<String> {
            let mut generator = Generator::new(group, strategy).with_packer(packer);
            if let Some(field_type) = field_type {
                generator = generator.with_field_type(field_type);
            }
            generator.generate()
        }

        match self {
            StrategyKind::Placeholder => run(group, PlaceholderUnion, packer, field_type),
            StrategyKind::Raw => run(group, RawUnion, packer, field_type),
            StrategyKind::BusMap => run(group, BusMapUnion, packer, field_type),
            StrategyKind::Bus => run(group, BusUnion, packer, field_type),
            StrategyKind::Peripheral => run(group, PeripheralUnion, packer, field_type),
            StrategyKind::Accessor => run(group, AccessorUnion, packer, field_type),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = PackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StrategyKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = StrategyKind::ALL.iter().map(|k| k.as_str()).collect();
                PackerError::Config(format!(
                    "unknown strategy {s:?}, expected one of: {}",
                    known.join(", ")
                ))
            })
    }
}
