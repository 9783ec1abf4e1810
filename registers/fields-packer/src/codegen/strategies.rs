// Licensed under the Apache-2.0 license

//! Emission strategies for the supported register access schemes.

use super::{CUnion, EmissionStrategy};
use crate::error::{PackerError, PackerResult};
use crate::group::Group;
use std::fmt::Write;

/// Unions with `NotImplemented` setter and getter comments.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlaceholderUnion;

impl EmissionStrategy for PlaceholderUnion {}

/// Unions without access functions.
#[derive(Clone, Copy, Debug, Default)]
pub struct RawUnion;

impl EmissionStrategy for RawUnion {
    fn setter(&self, _union: &CUnion<'_>) -> PackerResult<String> {
        Ok(String::new())
    }

    fn getter(&self, _union: &CUnion<'_>) -> PackerResult<String> {
        Ok(String::new())
    }
}

/// Contiguous registers: 16-bit unions collected into one `struct bus_map`
/// that can be overlaid on the register window.
#[derive(Clone, Copy, Debug, Default)]
pub struct BusMapUnion;

impl EmissionStrategy for BusMapUnion {
    fn field_type(&self) -> &str {
        "uint16_t"
    }

    fn setter(&self, union: &CUnion<'_>) -> PackerResult<String> {
        RawUnion.setter(union)
    }

    fn getter(&self, union: &CUnion<'_>) -> PackerResult<String> {
        RawUnion.getter(union)
    }

    fn epilogue(&self, unions: &[CUnion<'_>]) -> String {
        let mut output = String::new();
        writeln!(output, "struct bus_map {{").unwrap();
        for union in unions {
            let name = union.name();
            writeln!(output, "\t{} {};", name.to_uppercase(), name.to_lowercase()).unwrap();
        }
        write!(output, "}};").unwrap();
        output
    }
}

/// Memory mapped registers read and written through a volatile pointer at
/// the block address.
#[derive(Clone, Copy, Debug, Default)]
pub struct BusUnion;

impl EmissionStrategy for BusUnion {
    fn setter(&self, union: &CUnion<'_>) -> PackerResult<String> {
        let block = union.block();
        let mut output = String::new();
        writeln!(
            output,
            "static inline void __reg_write_{}(uint32_t val)",
            block.name()
        )
        .unwrap();
        writeln!(output, "{{").unwrap();
        writeln!(
            output,
            "\t*((volatile uint32_t *){}) = val;",
            block.address()
        )
        .unwrap();
        writeln!(output, "}}").unwrap();
        Ok(output)
    }

    fn getter(&self, union: &CUnion<'_>) -> PackerResult<String> {
        let block = union.block();
        let mut output = String::new();
        writeln!(
            output,
            "static inline uint32_t __reg_read_{}(void)",
            block.name()
        )
        .unwrap();
        writeln!(output, "{{").unwrap();
        writeln!(
            output,
            "\treturn *((volatile uint32_t *){});",
            block.address()
        )
        .unwrap();
        writeln!(output, "}}").unwrap();
        Ok(output)
    }
}

/// Registers behind a peripheral, accessed with external
/// `pwrite(dev, addr, val)` and `pread(dev, addr)`.
///
/// Blocks must have a `(device, offset)` address.
#[derive(Clone, Copy, Debug, Default)]
pub struct PeripheralUnion;

impl PeripheralUnion {
    fn device_address(union: &CUnion<'_>) -> PackerResult<(u64, u64)> {
        let block = union.block();
        match block.raw_address().parts() {
            [dev, addr] => Ok((*dev, *addr)),
            _ => Err(PackerError::UnsupportedAddress {
                block: block.name().to_string(),
                address: block.raw_address().clone(),
                expected: "a (device, offset) pair",
            }),
        }
    }
}

impl EmissionStrategy for PeripheralUnion {
    fn setter(&self, union: &CUnion<'_>) -> PackerResult<String> {
        let (dev, addr) = Self::device_address(union)?;
        let mut output = String::new();
        writeln!(
            output,
            "static inline void __reg_write_{}(uint32_t val)",
            union.block().name()
        )
        .unwrap();
        writeln!(output, "{{").unwrap();
        writeln!(output, "\tpwrite({dev}, {addr}, val);").unwrap();
        writeln!(output, "}}").unwrap();
        Ok(output)
    }

    fn getter(&self, union: &CUnion<'_>) -> PackerResult<String> {
        let (dev, addr) = Self::device_address(union)?;
        let mut output = String::new();
        writeln!(
            output,
            "static inline uint32_t __reg_read_{}(void)",
            union.block().name()
        )
        .unwrap();
        writeln!(output, "{{").unwrap();
        writeln!(output, "\treturn pread({dev}, {addr});").unwrap();
        writeln!(output, "}}").unwrap();
        Ok(output)
    }

    fn preamble(&self, _group: &Group) -> String {
        let mut output = String::new();
        writeln!(
            output,
            "extern void pwrite(uint16_t dev, uint16_t addr, uint32_t val);"
        )
        .unwrap();
        writeln!(
            output,
            "extern uint32_t pread(uint16_t dev, uint16_t addr);"
        )
        .unwrap();
        output
    }
}

/// One `get_FIELD`/`set_FIELD` pair per field, going through external
/// `reg_read(addr)` and `reg_write(addr, val)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct AccessorUnion;

impl AccessorUnion {
    fn accessors(union: &CUnion<'_>, render: impl Fn(&mut String, &str, &str, &str)) -> String {
        let block = union.block();
        let address = block.address().to_string();
        let name = union.name();
        block
            .dump()
            .into_iter()
            .map(|field| {
                let mut output = String::new();
                render(&mut output, field.name(), &name, &address);
                output
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl EmissionStrategy for AccessorUnion {
    fn setter(&self, union: &CUnion<'_>) -> PackerResult<String> {
        Ok(Self::accessors(union, |output, field, uname, addr| {
            writeln!(output).unwrap();
            writeln!(output, "static inline void set_{field}(uint32_t val)").unwrap();
            writeln!(output, "{{").unwrap();
            writeln!(output, "\t{uname} reg = ({uname})reg_read({addr});").unwrap();
            writeln!(output, "\treg.{field} = val;").unwrap();
            writeln!(output, "\treg_write({addr}, reg.val);").unwrap();
            writeln!(output, "}}").unwrap();
        }))
    }

    fn getter(&self, union: &CUnion<'_>) -> PackerResult<String> {
        Ok(Self::accessors(union, |output, field, uname, addr| {
            writeln!(output).unwrap();
            writeln!(output, "static inline uint32_t get_{field}(void)").unwrap();
            writeln!(output, "{{").unwrap();
            writeln!(output, "\t{uname} reg = ({uname})reg_read({addr});").unwrap();
            writeln!(output, "\treturn reg.{field};").unwrap();
            writeln!(output, "}}").unwrap();
        }))
    }

    fn preamble(&self, _group: &Group) -> String {
        let mut output = String::new();
        writeln!(output, "#include <stdint.h>").unwrap();
        writeln!(
            output,
            "extern void reg_write(uint16_t addr, uint32_t val);"
        )
        .unwrap();
        writeln!(output, "extern uint32_t reg_read(uint16_t addr);").unwrap();
        output
    }
}
