// Licensed under the Apache-2.0 license

//! Packing a block's fields into a fixed-width container.
//!
//! [`Packer::pack`] walks the fields of a block in dump order and produces a
//! sequence of [`Slot`]s: the real fields, plus `unusedN` fillers for every
//! gap and for the bits left over at the top of the container.
//!
//! ```text
//! width 16, fields x[3:0] and y[11:8]
//!
//! slot      x       unused0   y        unused1
//! bits   [3:0]     [7:4]    [11:8]   [15:12]
//! ```

use crate::block::Block;
use crate::error::{PackerError, PackerResult};
use crate::field::{bit_range, Field};
use log::{debug, warn};

/// What occupies a slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotKind<'a> {
    Field(&'a Field),
    /// Synthesized placeholder, numbered in order of appearance.
    Filler { index: usize },
}

/// One contiguous bit range of a packed container.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Slot<'a> {
    pub kind: SlotKind<'a>,
    pub shift: u32,
    pub bits: u32,
}

impl Slot<'_> {
    /// The field name, or `unusedN` for fillers.
    pub fn name(&self) -> String {
        match self.kind {
            SlotKind::Field(field) => field.name().to_string(),
            SlotKind::Filler { index } => format!("unused{index}"),
        }
    }

    pub fn range(&self) -> String {
        bit_range(self.bits, self.shift)
    }

    pub fn is_filler(&self) -> bool {
        matches!(self.kind, SlotKind::Filler { .. })
    }

    /// The packed field, `None` for fillers.
    pub fn field(&self) -> Option<&Field> {
        match self.kind {
            SlotKind::Field(field) => Some(field),
            SlotKind::Filler { .. } => None,
        }
    }
}

/// The packed layout of one block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layout<'a> {
    pub width: u32,
    pub slots: Vec<Slot<'a>>,
}

impl Layout<'_> {
    /// Sum of every slot's width.
    pub fn covered_bits(&self) -> u32 {
        self.slots.iter().map(|slot| slot.bits).sum()
    }

    pub fn fillers(&self) -> impl Iterator<Item = &Slot<'_>> {
        self.slots.iter().filter(|slot| slot.is_filler())
    }
}

/// Lays out blocks in a container of `width` bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Packer {
    width: u32,
    reject_overlaps: bool,
}

impl Packer {
    pub fn new(width: u32) -> Self {
        Self {
            width,
            reject_overlaps: false,
        }
    }

    /// Fail with [`PackerError::OverlappingFields`] instead of packing a
    /// field that starts below the end of the previous slot.
    pub fn reject_overlaps(mut self, reject: bool) -> Self {
        self.reject_overlaps = reject;
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    /// Pack `block`, filling gaps so the slots cover exactly `width` bits.
    ///
    /// A field starting below the previous slot's end gets no filler and is
    /// emitted as is; its bits still count toward the total. Fails with
    /// [`PackerError::LayoutOverflow`] when the total exceeds the width.
    pub fn pack<'a>(&self, block: &'a Block) -> PackerResult<Layout<'a>> {
        let mut slots = Vec::new();
        let mut total_bits: u32 = 0;
        let mut last_shift: u32 = 0;
        let mut unused = 0;
        let mut previous: Option<&Field> = None;

        for field in block.dump() {
            if field.shift() > last_shift {
                let bits = field.shift() - last_shift;
                slots.push(Slot {
                    kind: SlotKind::Filler { index: unused },
                    shift: last_shift,
                    bits,
                });
                unused += 1;
                total_bits += bits;
            } else if field.shift() < last_shift {
                let previous = previous.map(Field::name).unwrap_or_default().to_string();
                if self.reject_overlaps {
                    return Err(PackerError::OverlappingFields {
                        block: block.name().to_string(),
                        field: field.name().to_string(),
                        previous,
                    });
                }
                warn!(
                    "block {}: field {} overlaps {}",
                    block.name(),
                    field.name(),
                    previous
                );
            }

            slots.push(Slot {
                kind: SlotKind::Field(field),
                shift: field.shift(),
                bits: field.bits(),
            });
            total_bits += field.bits();
            last_shift = field.shift() + field.bits();
            previous = Some(field);
        }

        if total_bits > self.width {
            return Err(PackerError::LayoutOverflow {
                block: block.name().to_string(),
                bits: total_bits,
                width: self.width,
            });
        }
        if total_bits < self.width {
            slots.push(Slot {
                kind: SlotKind::Filler { index: unused },
                shift: last_shift,
                bits: self.width - total_bits,
            });
        }

        debug!(
            "block {}: packed {} slots into {} bits",
            block.name(),
            slots.len(),
            self.width
        );
        Ok(Layout {
            width: self.width,
            slots,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::LevelFilter;
    use simple_logger::SimpleLogger;

    fn block(fields: &[(&str, u32, u32)]) -> Block {
        let mut block = Block::new("R", 0x10u64);
        for (name, bits, shift) in fields {
            block
                .add_field(Field::new(name, 0x10u64, *bits, *shift).unwrap())
                .unwrap();
        }
        block
    }

    fn shape(layout: &Layout) -> Vec<(String, u32, u32)> {
        layout
            .slots
            .iter()
            .map(|slot| (slot.name(), slot.shift, slot.bits))
            .collect()
    }

    #[test]
    fn test_gaps_are_filled() {
        let block = block(&[("y", 4, 8), ("x", 4, 0)]);
        let layout = Packer::new(16).pack(&block).unwrap();
        assert_eq!(
            shape(&layout),
            [
                ("x".to_string(), 0, 4),
                ("unused0".to_string(), 4, 4),
                ("y".to_string(), 8, 4),
                ("unused1".to_string(), 12, 4),
            ]
        );
        assert_eq!(layout.covered_bits(), 16);
        assert_eq!(layout.fillers().count(), 2);
        assert_eq!(layout.slots[1].range(), "[7:4]");
    }

    #[test]
    fn test_empty_block_is_one_filler() {
        let block = block(&[]);
        let layout = Packer::new(16).pack(&block).unwrap();
        assert_eq!(shape(&layout), [("unused0".to_string(), 0, 16)]);
    }

    #[test]
    fn test_exact_fit_has_no_trailing_filler() {
        let block = block(&[("lo", 8, 0), ("hi", 8, 8)]);
        let layout = Packer::new(16).pack(&block).unwrap();
        assert_eq!(layout.slots.len(), 2);
        assert!(layout.fillers().next().is_none());
    }

    #[test]
    fn test_overflow() {
        let block = block(&[("lo", 16, 0), ("hi", 4, 16)]);
        match Packer::new(16).pack(&block) {
            Err(PackerError::LayoutOverflow { block, bits, width }) => {
                assert_eq!(block, "R");
                assert_eq!(bits, 20);
                assert_eq!(width, 16);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(Packer::new(32).pack(&block).is_ok());
    }

    #[test]
    fn test_same_shift_fields_are_packed_back_to_back() {
        let block = block(&[("a", 2, 0), ("b", 2, 0)]);
        let layout = Packer::new(8).pack(&block).unwrap();
        assert_eq!(
            shape(&layout),
            [
                ("a".to_string(), 0, 2),
                ("b".to_string(), 0, 2),
                ("unused0".to_string(), 2, 4),
            ]
        );
    }

    #[test]
    fn test_overlap_warns_by_default() {
        // The logger may already be installed by another test.
        let _ = SimpleLogger::new().with_level(LevelFilter::Warn).init();
        let block = block(&[("a", 4, 0), ("b", 2, 2)]);
        let layout = Packer::new(8).pack(&block).unwrap();
        assert_eq!(layout.slots[1].name(), "b");
        assert_eq!(layout.slots[1].shift, 2);
    }

    #[test]
    fn test_overlap_can_be_rejected() {
        let block = block(&[("a", 4, 0), ("b", 2, 2)]);
        let err = Packer::new(8).reject_overlaps(true).pack(&block).unwrap_err();
        match err {
            PackerError::OverlappingFields { field, previous, .. } => {
                assert_eq!(field, "b");
                assert_eq!(previous, "a");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_slot_field_access() {
        let block = block(&[("x", 1, 3)]);
        let layout = Packer::new(8).pack(&block).unwrap();
        assert!(layout.slots[0].field().is_none());
        assert_eq!(layout.slots[1].field().map(Field::name), Some("x"));
        assert_eq!(layout.slots[1].range(), "[3]");
        assert_eq!(layout.slots[2].range(), "[7:4]");
    }
}
