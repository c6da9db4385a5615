//! Representation, encoding, and decoding of EID-to-RLOC mapping records.
//!
//! A mapping record is the variable-length section embedded in map-reply,
//! map-register, and map-notify messages: the record's own metadata, the EID
//! prefix it binds, and one locator record per RLOC.

use std::net::IpAddr;

use bytes::{Buf, BufMut};

use crate::{
    address::{Afi, EidPrefix},
    locator::Rloc,
    mapping::{MappingEntry, MappingOrigin},
    wire_encoding::{self, WireDecode, WireEncode},
};

/// Errors raised when failing to decode a mapping or locator record.
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone, Copy)]
pub enum RecordDecodeError {
    /// The data is shorter than the record's fixed fields or declared addresses require.
    #[error("record is empty or was truncated")]
    TruncatedBuffer,
    /// The address-family indicator is unknown or carries no address.
    #[error("unknown or unsupported address family {0}")]
    InvalidAddressFamily(u16),
    /// The EID mask length exceeds the width of the address family.
    #[error("prefix length {0} is invalid for the address family")]
    InvalidPrefixLength(u8),
    /// The 3-bit action field holds a reserved value.
    #[error("reserved map-reply action {0}")]
    InvalidAction(u8),
}

/// The action a receiver takes for an EID covered by a negative record.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum MapReplyAction {
    /// Ordinary positive record; no special handling.
    #[default]
    NoAction = 0,
    /// Forward natively, outside any tunnel.
    NativelyForward = 1,
    /// Send a map-request for the EID.
    SendMapRequest = 2,
    /// Drop packets destined to the EID.
    Drop = 3,
}

impl MapReplyAction {
    /// Converts the 3-bit wire value into its action variant.
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(MapReplyAction::NoAction),
            1 => Some(MapReplyAction::NativelyForward),
            2 => Some(MapReplyAction::SendMapRequest),
            3 => Some(MapReplyAction::Drop),
            _ => None,
        }
    }
}

wire_encoding::bounded_uint! {
    /// The 12-bit version number of a mapping record.
    pub struct MapVersion(u16: 12);
}

/// A single locator record within a mapping record.
///
/// Wire layout (8 fixed bytes, then the AFI-sized address):
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |   Priority    |    Weight     |  M Priority   |   M Weight    |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |         Unused Flags    |L|p|R|           Loc-AFI             |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                            Locator                            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatorRecord {
    /// Unicast priority; lower values are preferred.
    pub priority: u8,
    /// Load-share ratio among locators of equal priority.
    pub weight: u8,
    /// Multicast priority.
    pub multicast_priority: u8,
    /// Multicast load-share ratio.
    pub multicast_weight: u8,
    /// L bit: the locator is local to the sender.
    pub local: bool,
    /// p bit: the locator is the target of an RLOC-probe.
    pub probed: bool,
    /// R bit: the locator is reachable.
    pub reachable: bool,
    /// The locator address.
    pub address: IpAddr,
}

impl LocatorRecord {
    /// The length of the fields ahead of the locator address in bytes.
    pub const FIXED_LENGTH: usize = 8;

    const FLAG_LOCAL: u16 = 0b100;
    const FLAG_PROBED: u16 = 0b010;
    const FLAG_REACHABLE: u16 = 0b001;
}

impl From<Rloc> for LocatorRecord {
    fn from(value: Rloc) -> Self {
        Self {
            priority: value.priority,
            weight: value.weight,
            multicast_priority: value.multicast_priority,
            multicast_weight: value.multicast_weight,
            local: value.local,
            probed: value.probed,
            reachable: value.reachable,
            address: value.address,
        }
    }
}

impl From<LocatorRecord> for Rloc {
    fn from(value: LocatorRecord) -> Self {
        Self {
            address: value.address,
            priority: value.priority,
            weight: value.weight,
            multicast_priority: value.multicast_priority,
            multicast_weight: value.multicast_weight,
            local: value.local,
            probed: value.probed,
            reachable: value.reachable,
        }
    }
}

impl WireEncode for LocatorRecord {
    fn encoded_length(&self) -> usize {
        Self::FIXED_LENGTH + Afi::from(&self.address).address_length()
    }

    fn encode_to_unchecked<T: BufMut>(&self, buffer: &mut T) {
        buffer.put_u8(self.priority);
        buffer.put_u8(self.weight);
        buffer.put_u8(self.multicast_priority);
        buffer.put_u8(self.multicast_weight);

        let mut flags = 0;
        if self.local {
            flags |= Self::FLAG_LOCAL;
        }
        if self.probed {
            flags |= Self::FLAG_PROBED;
        }
        if self.reachable {
            flags |= Self::FLAG_REACHABLE;
        }
        buffer.put_u16(flags); // 13 unused bits written as zero

        buffer.put_u16(Afi::from(&self.address).into());
        put_address(buffer, &self.address);
    }
}

impl<T: Buf> WireDecode<T> for LocatorRecord {
    type Error = RecordDecodeError;

    fn decode(data: &mut T) -> Result<Self, Self::Error> {
        if data.remaining() < Self::FIXED_LENGTH {
            return Err(RecordDecodeError::TruncatedBuffer);
        }

        let priority = data.get_u8();
        let weight = data.get_u8();
        let multicast_priority = data.get_u8();
        let multicast_weight = data.get_u8();
        let flags = data.get_u16();
        let address = get_address(data)?;

        Ok(Self {
            priority,
            weight,
            multicast_priority,
            multicast_weight,
            local: flags & Self::FLAG_LOCAL != 0,
            probed: flags & Self::FLAG_PROBED != 0,
            reachable: flags & Self::FLAG_REACHABLE != 0,
            address,
        })
    }
}

/// A mapping record: one EID prefix and the locator set bound to it.
///
/// Wire layout (12 fixed bytes, then the EID address, then the locator records):
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                          Record TTL                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// | Locator Count | EID mask-len  | ACT |A|      Reserved         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// | Rsvd  |  Map-Version Number   |       EID-Prefix-AFI          |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                          EID-Prefix                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingRecord {
    /// Record time-to-live in minutes.
    pub ttl: u32,
    /// The EID prefix this record binds.
    pub eid_prefix: EidPrefix,
    /// The receiver action for a negative record.
    pub action: MapReplyAction,
    /// A bit: the sender is authoritative for the EID.
    pub authoritative: bool,
    /// The record's map-version number.
    pub version: MapVersion,
    /// The locator set; empty for a negative record.
    pub locators: Vec<LocatorRecord>,
}

impl MappingRecord {
    /// The length of the fields ahead of the EID address in bytes.
    pub const FIXED_LENGTH: usize = 12;

    /// Builds the record announcing a mapping entry.
    pub fn from_entry(entry: &MappingEntry) -> Self {
        Self {
            ttl: entry.ttl,
            eid_prefix: entry.eid_prefix,
            action: MapReplyAction::NoAction,
            authoritative: entry.origin == MappingOrigin::Database,
            version: MapVersion::default(),
            locators: entry.locators.iter().copied().map(Into::into).collect(),
        }
    }

    /// Converts the record into a mapping entry with the given origin.
    pub fn to_entry(&self, origin: MappingOrigin) -> MappingEntry {
        MappingEntry {
            eid_prefix: self.eid_prefix,
            locators: self.locators.iter().copied().map(Into::into).collect(),
            origin,
            ttl: self.ttl,
        }
    }

    /// True if the record withdraws the mapping rather than announcing locators.
    pub fn is_negative(&self) -> bool {
        self.locators.is_empty()
    }
}

impl WireEncode for MappingRecord {
    fn encoded_length(&self) -> usize {
        Self::FIXED_LENGTH
            + self.eid_prefix.afi().address_length()
            + self
                .locators
                .iter()
                .map(WireEncode::encoded_length)
                .sum::<usize>()
    }

    fn encode_to_unchecked<T: BufMut>(&self, buffer: &mut T) {
        debug_assert!(self.locators.len() <= usize::from(u8::MAX));

        buffer.put_u32(self.ttl);
        buffer.put_u8(self.locators.len() as u8);
        buffer.put_u8(self.eid_prefix.length());
        buffer.put_u16(u16::from(self.action as u8) << 13 | u16::from(self.authoritative) << 12);
        buffer.put_u16(self.version.get());
        buffer.put_u16(self.eid_prefix.afi().into());
        put_address(buffer, &self.eid_prefix.address());

        for locator in &self.locators {
            locator.encode_to_unchecked(buffer);
        }
    }
}

impl<T: Buf> WireDecode<T> for MappingRecord {
    type Error = RecordDecodeError;

    fn decode(data: &mut T) -> Result<Self, Self::Error> {
        if data.remaining() < Self::FIXED_LENGTH {
            return Err(RecordDecodeError::TruncatedBuffer);
        }

        let ttl = data.get_u32();
        let locator_count = data.get_u8();
        let mask_length = data.get_u8();

        let action_field = data.get_u16();
        let action = MapReplyAction::from_bits((action_field >> 13) as u8)
            .ok_or(RecordDecodeError::InvalidAction((action_field >> 13) as u8))?;
        let authoritative = action_field & 0x1000 != 0;

        let version = MapVersion::new_unchecked(data.get_u16() & 0x0fff);

        let address = get_address(data)?;
        let eid_prefix = EidPrefix::containing(address, mask_length)
            .ok_or(RecordDecodeError::InvalidPrefixLength(mask_length))?;

        let mut locators = Vec::with_capacity(usize::from(locator_count));
        for _ in 0..locator_count {
            locators.push(LocatorRecord::decode(data)?);
        }

        Ok(Self {
            ttl,
            eid_prefix,
            action,
            authoritative,
            version,
            locators,
        })
    }
}

/// Writes the address bytes, without the leading AFI.
fn put_address<T: BufMut>(buffer: &mut T, address: &IpAddr) {
    match address {
        IpAddr::V4(v4) => buffer.put_slice(&v4.octets()),
        IpAddr::V6(v6) => buffer.put_slice(&v6.octets()),
    }
}

/// Reads an AFI-tagged address: the 16-bit family indicator followed by the
/// address bytes it declares.
fn get_address<T: Buf>(data: &mut T) -> Result<IpAddr, RecordDecodeError> {
    let afi = data.get_u16();
    let afi = match Afi::from_wire(afi) {
        Some(Afi::Reserved) | None => return Err(RecordDecodeError::InvalidAddressFamily(afi)),
        Some(afi) => afi,
    };

    if data.remaining() < afi.address_length() {
        return Err(RecordDecodeError::TruncatedBuffer);
    }

    Ok(match afi {
        Afi::Ipv4 => IpAddr::V4(data.get_u32().into()),
        Afi::Ipv6 => IpAddr::V6(data.get_u128().into()),
        Afi::Reserved => unreachable!(),
    })
}
