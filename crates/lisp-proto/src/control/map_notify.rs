//! Format, encoding, and decoding of map-notify messages.

use bytes::{Buf, BufMut, Bytes};

use super::{DecodeError, MessageType};
use crate::{
    record::MappingRecord,
    wire_encoding::{WireDecode, WireEncode},
};

/// A map-notify message: the mapping system's push of an updated mapping.
///
/// Wire layout ahead of the embedded records:
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |Type=4 |            Reserved               |  Record Count     |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                             Nonce . . .                       |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                         . . . Nonce                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |            Key ID             |  Authentication Data Length   |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ~                     Authentication Data                       ~
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// The authentication-data-length field always equals the byte length of the
/// authentication data actually written. In this implementation the data is a
/// fixed placeholder, not a MAC computed from a key; verification belongs to
/// the key owner, which treats the field as opaque bytes either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapNotify {
    /// Echo of the nonce from the triggering map-register, or fresh for
    /// unsolicited notifies.
    pub nonce: u64,
    /// Identifier of the key that would authenticate this message.
    pub key_id: u16,
    /// Opaque authentication data.
    pub auth_data: Bytes,
    /// The mapping records being pushed.
    pub records: Vec<MappingRecord>,
}

impl MapNotify {
    /// The length of the fixed fields ahead of the authentication data in bytes.
    pub const FIXED_LENGTH: usize = 16;

    /// The placeholder written in place of a computed authentication MAC.
    pub const AUTH_DATA_PLACEHOLDER: [u8; 4] = [0; 4];

    /// Creates a message carrying the given records, with placeholder
    /// authentication data.
    pub fn new(nonce: u64, key_id: u16, records: Vec<MappingRecord>) -> Self {
        Self {
            nonce,
            key_id,
            auth_data: Bytes::from_static(&Self::AUTH_DATA_PLACEHOLDER),
            records,
        }
    }
}

impl WireEncode for MapNotify {
    fn encoded_length(&self) -> usize {
        Self::FIXED_LENGTH
            + self.auth_data.len()
            + self
                .records
                .iter()
                .map(WireEncode::encoded_length)
                .sum::<usize>()
    }

    fn encode_to_unchecked<T: BufMut>(&self, buffer: &mut T) {
        debug_assert!(self.records.len() <= usize::from(u8::MAX));
        debug_assert!(self.auth_data.len() <= usize::from(u16::MAX));

        buffer.put_u8(u8::from(MessageType::MapNotify) << 4);
        buffer.put_u16(0); // reserved
        buffer.put_u8(self.records.len() as u8);
        buffer.put_u64(self.nonce);
        buffer.put_u16(self.key_id);
        buffer.put_u16(self.auth_data.len() as u16);
        buffer.put_slice(&self.auth_data);

        for record in &self.records {
            record.encode_to_unchecked(buffer);
        }
    }
}

impl<T: Buf> WireDecode<T> for MapNotify {
    type Error = DecodeError;

    fn decode(data: &mut T) -> Result<Self, Self::Error> {
        if data.remaining() < Self::FIXED_LENGTH {
            return Err(DecodeError::TruncatedBuffer);
        }

        let lead = data.get_u8();
        if MessageType::from_nibble(lead >> 4) != Some(MessageType::MapNotify) {
            return Err(DecodeError::MessageTypeMismatch {
                expected: MessageType::MapNotify,
                actual: lead >> 4,
            });
        }
        data.advance(2); // reserved

        let record_count = data.get_u8();
        let nonce = data.get_u64();
        let key_id = data.get_u16();

        let auth_length = usize::from(data.get_u16());
        if auth_length > data.remaining() {
            return Err(DecodeError::InconsistentLength {
                declared: auth_length,
                available: data.remaining(),
            });
        }
        let auth_data = data.copy_to_bytes(auth_length);

        let mut records = Vec::with_capacity(usize::from(record_count));
        for _ in 0..record_count {
            records.push(MappingRecord::decode(data)?);
        }

        Ok(Self {
            nonce,
            key_id,
            auth_data,
            records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::record::{LocatorRecord, MapReplyAction, MapVersion, RecordDecodeError};

    fn base_message() -> (Vec<u8>, MapNotify) {
        #[rustfmt::skip]
        let data = vec![
            // type nibble, reserved, one record
            0x40, 0x00, 0x00, 0x01,
            // nonce
            0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08,
            // key id, auth data length, placeholder auth data
            0x00, 0x07, 0x00, 0x04,
            0x00, 0x00, 0x00, 0x00,
            // record: TTL 1440, one locator, 10.1.2.0/24, authoritative
            0x00, 0x00, 0x05, 0xa0,
            0x01, 0x18, 0x10, 0x00,
            0x00, 0x00, 0x00, 0x01,
            10, 1, 2, 0,
            // locator 192.0.2.1
            0x01, 0x64, 0xff, 0x00,
            0x00, 0x01, 0x00, 0x01,
            192, 0, 2, 1,
        ];
        let message = MapNotify::new(
            0x0102030405060708,
            7,
            vec![MappingRecord {
                ttl: 1440,
                eid_prefix: crate::address::EidPrefix::containing("10.1.2.0".parse().unwrap(), 24)
                    .unwrap(),
                action: MapReplyAction::NoAction,
                authoritative: true,
                version: MapVersion::default(),
                locators: vec![LocatorRecord {
                    priority: 1,
                    weight: 100,
                    multicast_priority: 255,
                    multicast_weight: 0,
                    local: false,
                    probed: false,
                    reachable: true,
                    address: "192.0.2.1".parse().unwrap(),
                }],
            }],
        );
        (data, message)
    }

    mod encode {
        use super::*;

        #[test]
        fn byte_exact() {
            let (expected, message) = base_message();

            assert_eq!(message.encoded_length(), expected.len());
            assert_eq!(message.encode_to_bytes().as_ref(), expected.as_slice());
        }

        #[test]
        fn auth_length_matches_auth_data() {
            let (_, message) = base_message();
            let encoded = message.encode_to_bytes();

            let declared = u16::from_be_bytes([encoded[14], encoded[15]]);
            assert_eq!(usize::from(declared), message.auth_data.len());
        }
    }

    mod decode {
        use super::*;

        #[test]
        fn round_trips() {
            let (data, expected) = base_message();

            let decoded =
                MapNotify::decode(&mut data.as_slice()).expect("must successfully decode");
            assert_eq!(decoded, expected);
        }

        #[test]
        fn truncated_fixed_fields() {
            let (data, _) = base_message();

            assert_eq!(
                MapNotify::decode(&mut &data[..15]).expect_err("must fail to decode"),
                DecodeError::TruncatedBuffer
            );
        }

        #[test]
        fn wrong_type_nibble() {
            let (mut data, _) = base_message();
            data[0] = 0x30;

            assert_eq!(
                MapNotify::decode(&mut data.as_slice()).expect_err("must fail to decode"),
                DecodeError::MessageTypeMismatch {
                    expected: MessageType::MapNotify,
                    actual: 3
                }
            );
        }

        #[test]
        fn auth_length_beyond_buffer() {
            let data: Vec<u8> = base_message().0[..16]
                .iter()
                .copied()
                .chain([0u8; 2])
                .collect();
            let mut data = data;
            data[15] = 0x04; // declares 4 bytes, only 2 remain

            assert_eq!(
                MapNotify::decode(&mut data.as_slice()).expect_err("must fail to decode"),
                DecodeError::InconsistentLength {
                    declared: 4,
                    available: 2
                }
            );
        }

        #[test]
        fn record_count_beyond_records() {
            let (mut data, _) = base_message();
            data[3] = 2; // only one record present

            assert_eq!(
                MapNotify::decode(&mut data.as_slice()).expect_err("must fail to decode"),
                DecodeError::RecordDecodeError(RecordDecodeError::TruncatedBuffer)
            );
        }

        #[test]
        fn nonzero_auth_data_preserved() {
            let (mut data, _) = base_message();
            data[16..20].copy_from_slice(&[0xca, 0xfe, 0xba, 0xbe]);

            let decoded =
                MapNotify::decode(&mut data.as_slice()).expect("must successfully decode");
            assert_eq!(decoded.auth_data.as_ref(), &[0xca, 0xfe, 0xba, 0xbe]);
            assert_eq!(decoded.encode_to_bytes().as_ref(), data.as_slice());
        }
    }
}
