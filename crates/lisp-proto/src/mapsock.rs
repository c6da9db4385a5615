//! The internal mapping-update notification header.
//!
//! When the data plane changes an EID's locator bindings, it announces the
//! change to control-plane listeners over an internal "mapping socket". Every
//! such announcement starts with the fixed 15-byte header defined here.

use bytes::{Buf, BufMut};

use crate::{
    control::DecodeError,
    utils::encoded_type,
    wire_encoding::{WireDecode, WireEncode},
};

encoded_type! {
    /// The operation a mapping-update announcement describes.
    pub enum UpdateType (u16) {
        /// A mapping was added or superseded.
        Add = 1,
        /// A mapping was withdrawn.
        Delete = 2,
        /// A mapping was looked up.
        Get = 3;
        /// An operation this library does not recognise.
        Other = _,
    }
}

/// Flag bits carried in a mapping-update header.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpdateFlags(u32);

impl UpdateFlags {
    /// No locator is currently bound for the EID ("negative" mapping).
    pub const NEGATIVE: Self = Self(0x0000_0001);

    /// No flags set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// The raw 32-bit flag word.
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Reconstructs flags from a raw flag word, preserving unknown bits.
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// True if every bit of `other` is set in `self`.
    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for UpdateFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// The fixed-size header of a mapping-update announcement.
///
/// Wire layout, 15 bytes with all multi-byte fields big-endian:
///
/// ```text
/// byte  0        | version
/// bytes 1..=2    | message type
/// bytes 3..=6    | flags
/// bytes 7..=8    | address family
/// bytes 9..=10   | protocol version
/// bytes 11..=14  | locator count
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappingUpdateHeader {
    /// Version of the mapping-socket layout.
    pub version: u8,
    /// The announced operation.
    pub message_type: UpdateType,
    /// Flag bits; see [`UpdateFlags::NEGATIVE`].
    pub flags: UpdateFlags,
    /// The wire address family of the EID the announcement concerns.
    pub family: u16,
    /// Version of the protocol emitting the announcement.
    pub protocol_version: u16,
    /// Number of locators bound after the operation.
    pub locator_count: u32,
}

impl MappingUpdateHeader {
    /// The length of an encoded header in bytes, for all field combinations.
    pub const LENGTH: usize = 15;

    /// The current mapping-socket layout version.
    pub const VERSION: u8 = 1;

    /// True if the announcement reports that no locator is bound.
    pub fn is_negative(&self) -> bool {
        self.flags.contains(UpdateFlags::NEGATIVE)
    }
}

impl WireEncode for MappingUpdateHeader {
    fn encoded_length(&self) -> usize {
        Self::LENGTH
    }

    fn encode_to_unchecked<T: BufMut>(&self, buffer: &mut T) {
        buffer.put_u8(self.version);
        buffer.put_u16(self.message_type.into());
        buffer.put_u32(self.flags.bits());
        buffer.put_u16(self.family);
        buffer.put_u16(self.protocol_version);
        buffer.put_u32(self.locator_count);
    }
}

impl<T: Buf> WireDecode<T> for MappingUpdateHeader {
    type Error = DecodeError;

    fn decode(data: &mut T) -> Result<Self, Self::Error> {
        if data.remaining() < Self::LENGTH {
            return Err(DecodeError::TruncatedBuffer);
        }

        Ok(Self {
            version: data.get_u8(),
            message_type: data.get_u16().into(),
            flags: UpdateFlags::from_bits(data.get_u32()),
            family: data.get_u16(),
            protocol_version: data.get_u16(),
            locator_count: data.get_u32(),
        })
    }
}
