// Licensed under the Apache-2.0 license

//! Pluggable policies injected into blocks and groups.
//!
//! Every policy is a small trait with a blanket implementation for plain
//! closures, so callers can pass either a named type or a lambda:
//!
//! ```
//! use std::sync::Arc;
//! use fields_packer::{Address, Block, BlockCreator, Field};
//!
//! let creator = BlockCreator::new()
//!     .with_checker(Arc::new(|block: &Block, field: &Field| {
//!         block.raw_address().parts()[0] == field.address().parts()[0]
//!     }))
//!     .with_address_formatter(Arc::new(|address: &Address| format!("@{address}")));
//! let block = creator.create("CTRL", Address::from((1u64, 0x10u64)));
//! assert_eq!(block.address().to_string(), "@(1, 16)");
//! ```

use crate::field::Address;
use std::cmp::Ordering;
use std::sync::Arc;

/// Decides whether `member` may be added to `container`.
pub trait MembershipPolicy<C: ?Sized, M: ?Sized> {
    fn accepts(&self, container: &C, member: &M) -> bool;
}

impl<C: ?Sized, M: ?Sized, F> MembershipPolicy<C, M> for F
where
    F: Fn(&C, &M) -> bool,
{
    fn accepts(&self, container: &C, member: &M) -> bool {
        self(container, member)
    }
}

/// Total order used when dumping a block's fields or a group's blocks.
pub trait SortPolicy<T: ?Sized> {
    fn compare(&self, a: &T, b: &T) -> Ordering;
}

impl<T: ?Sized, F> SortPolicy<T> for F
where
    F: Fn(&T, &T) -> Ordering,
{
    fn compare(&self, a: &T, b: &T) -> Ordering {
        self(a, b)
    }
}

/// Build a [`SortPolicy`] from a key extraction function.
pub fn sort_by_key<T: ?Sized, K: Ord>(key: impl Fn(&T) -> K) -> impl Fn(&T, &T) -> Ordering {
    move |a, b| key(a).cmp(&key(b))
}

/// Renders a raw block address for display and ordering.
pub trait AddressFormatter {
    fn format(&self, address: &Address) -> String;
}

impl<F> AddressFormatter for F
where
    F: Fn(&Address) -> String,
{
    fn format(&self, address: &Address) -> String {
        self(address)
    }
}

pub type SharedMembership<C, M> = Arc<dyn MembershipPolicy<C, M> + Send + Sync>;
pub type SharedSort<T> = Arc<dyn SortPolicy<T> + Send + Sync>;
pub type SharedFormatter = Arc<dyn AddressFormatter + Send + Sync>;

/// Formats the last address part as zero padded hex, e.g. `0x0010`.
#[derive(Clone, Copy, Debug)]
pub struct HexAddress {
    pub digits: usize,
}

impl Default for HexAddress {
    fn default() -> Self {
        Self { digits: 4 }
    }
}

impl AddressFormatter for HexAddress {
    fn format(&self, address: &Address) -> String {
        let value = address.parts().last().copied().unwrap_or_default();
        format!("0x{value:0width$x}", width = self.digits)
    }
}

/// Formats a `[device, offset]` address as `Dev1, Addr(0020)`.
///
/// Scalar addresses are shown as device 0.
#[derive(Clone, Copy, Debug, Default)]
pub struct DeviceAddress;

impl AddressFormatter for DeviceAddress {
    fn format(&self, address: &Address) -> String {
        let (dev, addr) = match address.parts() {
            [dev, addr, ..] => (*dev, *addr),
            [addr] => (0, *addr),
            [] => (0, 0),
        };
        format!("Dev{dev}, Addr({addr:04x})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_address() {
        assert_eq!(
            HexAddress::default().format(&Address::from(0x10u64)),
            "0x0010"
        );
        assert_eq!(
            HexAddress { digits: 8 }.format(&Address::from(0xbeefu64)),
            "0x0000beef"
        );
        assert_eq!(
            HexAddress::default().format(&Address::from(0x12345u64)),
            "0x12345"
        );
    }

    #[test]
    fn test_device_address() {
        assert_eq!(
            DeviceAddress.format(&Address::from((1u64, 0x20u64))),
            "Dev1, Addr(0020)"
        );
        assert_eq!(
            DeviceAddress.format(&Address::from(0x20u64)),
            "Dev0, Addr(0020)"
        );
    }

    #[test]
    fn test_sort_by_key() {
        let by_len = sort_by_key(|s: &&str| s.len());
        assert_eq!(by_len.compare(&"ab", &"abc"), Ordering::Less);
        assert_eq!(by_len.compare(&"ab", &"cd"), Ordering::Equal);
    }
}
