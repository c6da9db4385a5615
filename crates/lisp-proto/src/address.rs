//! Endpoint identifiers and the network prefixes used to index them.

use std::{
    fmt::{self, Display, Formatter},
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
};

use serde::{Deserialize, Serialize};

/// The 16-bit address-family indicator carried ahead of every address on the wire.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Afi {
    /// No address follows.
    Reserved = 0,
    /// A 4-byte IPv4 address follows.
    Ipv4 = 1,
    /// A 16-byte IPv6 address follows.
    Ipv6 = 2,
}

impl Afi {
    /// Converts a wire-format family indicator into its enum variant.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lisp_proto::address::Afi;
    /// assert_eq!(Afi::from_wire(1), Some(Afi::Ipv4));
    /// assert_eq!(Afi::from_wire(2), Some(Afi::Ipv6));
    /// assert_eq!(Afi::from_wire(3), None);
    /// ```
    pub fn from_wire(value: u16) -> Option<Self> {
        match value {
            0 => Some(Afi::Reserved),
            1 => Some(Afi::Ipv4),
            2 => Some(Afi::Ipv6),
            _ => None,
        }
    }

    /// The number of address bytes following this family indicator.
    pub const fn address_length(&self) -> usize {
        match self {
            Afi::Reserved => 0,
            Afi::Ipv4 => 4,
            Afi::Ipv6 => 16,
        }
    }
}

impl From<Afi> for u16 {
    fn from(value: Afi) -> Self {
        value as u16
    }
}

impl From<&IpAddr> for Afi {
    fn from(value: &IpAddr) -> Self {
        match value {
            IpAddr::V4(_) => Afi::Ipv4,
            IpAddr::V6(_) => Afi::Ipv6,
        }
    }
}

/// An endpoint identifier: the stable, logical address of an end host.
///
/// An EID survives mobility events unchanged; only the locators bound to it move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Eid(IpAddr);

impl Eid {
    /// IPv4 EIDs are grouped for tracking by their containing /24 network.
    pub const TRACKING_PREFIX_V4: u8 = 24;
    /// IPv6 EIDs are grouped for tracking by their containing /64 network.
    pub const TRACKING_PREFIX_V6: u8 = 64;

    /// Creates an EID for the given address.
    pub const fn new(address: IpAddr) -> Self {
        Self(address)
    }

    /// The address of this EID.
    pub const fn address(&self) -> IpAddr {
        self.0
    }

    /// The wire address family of this EID.
    pub fn afi(&self) -> Afi {
        Afi::from(&self.0)
    }

    /// The host prefix covering exactly this EID (/32 or /128).
    pub fn host_prefix(&self) -> EidPrefix {
        let length = match self.0 {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        EidPrefix::containing(self.0, length).expect("host prefix lengths are valid")
    }

    /// The prefix under which mapping updates for this EID are tracked.
    ///
    /// Grouping is by containing network prefix, computed with explicit mask
    /// arithmetic so that hosts with different final-octet widths (`.7`, `.42`,
    /// `.200`) all index the same prefix.
    pub fn tracking_key(&self) -> EidPrefix {
        let length = match self.0 {
            IpAddr::V4(_) => Self::TRACKING_PREFIX_V4,
            IpAddr::V6(_) => Self::TRACKING_PREFIX_V6,
        };
        EidPrefix::containing(self.0, length).expect("tracking prefix lengths are valid")
    }
}

impl From<IpAddr> for Eid {
    fn from(value: IpAddr) -> Self {
        Self(value)
    }
}

impl Display for Eid {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A masked network prefix identifying a block of EIDs.
///
/// The address stored here always has its host bits zeroed; construction through
/// [`containing`][Self::containing] is the only way to build one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EidPrefix {
    address: IpAddr,
    length: u8,
}

impl EidPrefix {
    /// The prefix of the given length containing the address.
    ///
    /// Host bits are cleared. Returns `None` if the length exceeds the address
    /// family's width (32 for IPv4, 128 for IPv6).
    pub fn containing(address: IpAddr, length: u8) -> Option<Self> {
        let address = match address {
            IpAddr::V4(v4) => {
                if length > 32 {
                    return None;
                }
                let mask = u32::MAX.checked_shl(u32::from(32 - length)).unwrap_or(0);
                IpAddr::V4(Ipv4Addr::from(u32::from(v4) & mask))
            }
            IpAddr::V6(v6) => {
                if length > 128 {
                    return None;
                }
                let mask = u128::MAX.checked_shl(u32::from(128 - length)).unwrap_or(0);
                IpAddr::V6(Ipv6Addr::from(u128::from(v6) & mask))
            }
        };
        Some(Self { address, length })
    }

    /// The network address of this prefix, with host bits zeroed.
    pub const fn address(&self) -> IpAddr {
        self.address
    }

    /// The prefix length in bits.
    pub const fn length(&self) -> u8 {
        self.length
    }

    /// The wire address family of this prefix.
    pub fn afi(&self) -> Afi {
        Afi::from(&self.address)
    }

    /// True if the given address falls within this prefix.
    pub fn contains(&self, address: IpAddr) -> bool {
        EidPrefix::containing(address, self.length) == Some(*self)
    }
}

impl Display for EidPrefix {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_utils::param_test;

    param_test! {
        masks_host_bits: [
            one_digit_host: ("10.0.0.7", 24, "10.0.0.0/24"),
            two_digit_host: ("10.0.0.42", 24, "10.0.0.0/24"),
            three_digit_host: ("10.0.0.200", 24, "10.0.0.0/24"),
            broadcast_host: ("10.0.0.255", 24, "10.0.0.0/24"),
            wider_mask: ("172.16.31.9", 16, "172.16.0.0/16"),
            full_host: ("192.0.2.1", 32, "192.0.2.1/32"),
            all_hosts: ("192.0.2.1", 0, "0.0.0.0/0"),
            v6_subnet: ("2001:db8:1:2:3:4:5:6", 64, "2001:db8:1:2::/64"),
        ]
    }
    fn masks_host_bits(address: &str, length: u8, expected: &str) {
        let prefix = EidPrefix::containing(address.parse().unwrap(), length)
            .expect("valid prefix length");
        assert_eq!(prefix.to_string(), expected);
    }

    #[test]
    fn rejects_overlong_prefixes() {
        assert_eq!(EidPrefix::containing("10.0.0.1".parse().unwrap(), 33), None);
        assert_eq!(EidPrefix::containing("2001:db8::1".parse().unwrap(), 129), None);
    }

    #[test]
    fn tracking_key_groups_by_subnet() {
        let a = Eid::new("10.0.0.7".parse().unwrap());
        let b = Eid::new("10.0.0.213".parse().unwrap());
        let c = Eid::new("10.0.1.7".parse().unwrap());

        assert_eq!(a.tracking_key(), b.tracking_key());
        assert_ne!(a.tracking_key(), c.tracking_key());
        assert_eq!(a.tracking_key().to_string(), "10.0.0.0/24");
    }

    #[test]
    fn prefix_containment() {
        let prefix = EidPrefix::containing("10.1.2.0".parse().unwrap(), 24).unwrap();

        assert!(prefix.contains("10.1.2.99".parse().unwrap()));
        assert!(!prefix.contains("10.1.3.99".parse().unwrap()));
        assert!(!prefix.contains("2001:db8::1".parse().unwrap()));
    }
}
