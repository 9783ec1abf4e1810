// Licensed under the Apache-2.0 license

//! Fields and the addresses they live at.
//!
//! A [`Field`] is one named bit range of one register. It is built once and
//! never changed afterwards; the derived [`Field::bitmask`] always agrees with
//! [`Field::bits`] and [`Field::shift`].

use crate::error::{PackerError, PackerResult};
use std::fmt;

/// Highest bit (exclusive) a field may reach. Masks are stored as `u64`.
pub const MAX_FIELD_BIT: u32 = 64;

/// Register address, either a single value or a multi-part key such as
/// `device + offset`.
///
/// Ordering compares scalars numerically and composites element by element.
/// A group never mixes the two shapes, but if it did every scalar would sort
/// before every composite.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Address {
    Scalar(u64),
    Composite(Vec<u64>),
}

impl Address {
    /// Returns the address as a slice of its parts.
    pub fn parts(&self) -> &[u64] {
        match self {
            Address::Scalar(value) => std::slice::from_ref(value),
            Address::Composite(parts) => parts,
        }
    }
}

impl From<u64> for Address {
    fn from(value: u64) -> Self {
        Address::Scalar(value)
    }
}

impl From<(u64, u64)> for Address {
    fn from((high, low): (u64, u64)) -> Self {
        Address::Composite(vec![high, low])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Scalar(value) => write!(f, "{value}"),
            Address::Composite(parts) => {
                write!(f, "(")?;
                for (i, part) in parts.iter().enumerate() {
                    if i != 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{part}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// One named bit range at one address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    name: String,
    address: Address,
    bits: u32,
    shift: u32,
    bitmask: u64,
    group: Option<String>,
    default: u64,
    source: Option<String>,
    extra: Option<String>,
}

impl Field {
    /// Creates a field covering `[shift, shift + bits)` at `address`.
    ///
    /// The name is trimmed. Fails when the trimmed name is empty, when `bits`
    /// is zero, or when the range does not fit a 64-bit mask. Container width
    /// is checked later, when the owning block is packed.
    pub fn new(
        name: &str,
        address: impl Into<Address>,
        bits: u32,
        shift: u32,
    ) -> PackerResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PackerError::InvalidField {
                name: name.to_string(),
                reason: "empty name".to_string(),
            });
        }
        if bits == 0 {
            return Err(PackerError::InvalidField {
                name: name.to_string(),
                reason: "a field needs at least one bit".to_string(),
            });
        }
        if !matches!(shift.checked_add(bits), Some(end) if end <= MAX_FIELD_BIT) {
            return Err(PackerError::InvalidField {
                name: name.to_string(),
                reason: format!(
                    "range {} ends beyond bit {}",
                    bit_range(bits, shift),
                    MAX_FIELD_BIT - 1
                ),
            });
        }

        Ok(Self {
            name: name.to_string(),
            address: address.into(),
            bits,
            shift,
            bitmask: bitmask(bits, shift),
            group: None,
            default: 0,
            source: None,
            extra: None,
        })
    }

    /// Set the group label. It is carried along but never interpreted.
    pub fn with_group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }

    /// Set the reset/default value.
    pub fn with_default(mut self, default: u64) -> Self {
        self.default = default;
        self
    }

    /// Record where this field came from (usually the raw input row).
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attach an opaque payload for custom emission strategies.
    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = Some(extra.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    pub fn shift(&self) -> u32 {
        self.shift
    }

    pub fn bitmask(&self) -> u64 {
        self.bitmask
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn default_value(&self) -> u64 {
        self.default
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn extra(&self) -> Option<&str> {
        self.extra.as_deref()
    }

    /// Human readable bit range, `[n]` or `[high:low]`.
    pub fn range(&self) -> String {
        bit_range(self.bits, self.shift)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{} @ {}", self.name, self.range(), self.address)
    }
}

/// Mask with `bits` ones starting at `shift`.
///
/// `shift + bits` must not exceed [`MAX_FIELD_BIT`].
pub fn bitmask(bits: u32, shift: u32) -> u64 {
    let ones = if bits >= MAX_FIELD_BIT {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    };
    ones << shift
}

/// Renders `[shift]` for single bits and `[shift+bits-1:shift]` otherwise.
pub fn bit_range(bits: u32, shift: u32) -> String {
    if bits == 1 {
        format!("[{shift}]")
    } else {
        format!("[{}:{}]", u64::from(shift) + u64::from(bits) - 1, shift)
    }
}
