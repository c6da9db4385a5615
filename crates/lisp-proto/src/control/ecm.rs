//! The fixed-size encapsulated-control-message header.

use bytes::{Buf, BufMut};

use super::{DecodeError, MessageType};
use crate::wire_encoding::{WireDecode, WireEncode};

/// The 4-byte header prepended to a control message tunnelled through the
/// mapping system.
///
/// Wire layout:
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |Type=8 |S|R|N|             Reserved                            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// The reserved bits are written as zero and round-trip as zero.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EcmHeader {
    /// S bit: the encapsulated payload carries security material.
    pub security: bool,
    /// R bit: the message is a response relayed on behalf of another node.
    pub response: bool,
    /// N bit: a nonce is present in the encapsulated message.
    pub nonce_present: bool,
}

impl EcmHeader {
    /// The length of an encoded header in bytes, for all flag combinations.
    pub const LENGTH: usize = 4;

    const FLAG_SECURITY: u8 = 1 << 3;
    const FLAG_RESPONSE: u8 = 1 << 2;
    const FLAG_NONCE: u8 = 1 << 1;
}

impl WireEncode for EcmHeader {
    fn encoded_length(&self) -> usize {
        Self::LENGTH
    }

    fn encode_to_unchecked<T: BufMut>(&self, buffer: &mut T) {
        let mut lead = u8::from(MessageType::EncapsulatedControl) << 4;
        if self.security {
            lead |= Self::FLAG_SECURITY;
        }
        if self.response {
            lead |= Self::FLAG_RESPONSE;
        }
        if self.nonce_present {
            lead |= Self::FLAG_NONCE;
        }

        buffer.put_u8(lead);
        buffer.put_bytes(0, 3);
    }
}

impl<T: Buf> WireDecode<T> for EcmHeader {
    type Error = DecodeError;

    fn decode(data: &mut T) -> Result<Self, Self::Error> {
        if data.remaining() < Self::LENGTH {
            return Err(DecodeError::TruncatedBuffer);
        }

        let lead = data.get_u8();
        if MessageType::from_nibble(lead >> 4) != Some(MessageType::EncapsulatedControl) {
            return Err(DecodeError::MessageTypeMismatch {
                expected: MessageType::EncapsulatedControl,
                actual: lead >> 4,
            });
        }
        data.advance(3); // reserved

        Ok(Self {
            security: lead & Self::FLAG_SECURITY != 0,
            response: lead & Self::FLAG_RESPONSE != 0,
            nonce_present: lead & Self::FLAG_NONCE != 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_utils::param_test;

    param_test! {
        encodes_to_four_bytes: [
            no_flags: (false, false, false, [0x80, 0, 0, 0]),
            security: (true, false, false, [0x88, 0, 0, 0]),
            response: (false, true, false, [0x84, 0, 0, 0]),
            nonce: (false, false, true, [0x82, 0, 0, 0]),
            all_flags: (true, true, true, [0x8e, 0, 0, 0]),
        ]
    }
    fn encodes_to_four_bytes(security: bool, response: bool, nonce_present: bool, expected: [u8; 4]) {
        let header = EcmHeader {
            security,
            response,
            nonce_present,
        };

        assert_eq!(header.encoded_length(), EcmHeader::LENGTH);
        assert_eq!(header.encode_to_bytes().as_ref(), expected);
    }

    #[test]
    fn round_trip() {
        let header = EcmHeader {
            security: false,
            response: true,
            nonce_present: true,
        };

        let mut encoded = header.encode_to_bytes();
        assert_eq!(EcmHeader::decode(&mut encoded), Ok(header));
    }

    #[test]
    fn truncated() {
        assert_eq!(
            EcmHeader::decode(&mut [0x80u8, 0, 0].as_slice()),
            Err(DecodeError::TruncatedBuffer)
        );
    }

    #[test]
    fn wrong_type_nibble() {
        assert_eq!(
            EcmHeader::decode(&mut [0x40u8, 0, 0, 0].as_slice()),
            Err(DecodeError::MessageTypeMismatch {
                expected: MessageType::EncapsulatedControl,
                actual: 4
            })
        );
    }

    #[test]
    fn reserved_bits_round_trip_as_zero() {
        // set the trailing reserved bytes and the lowest bit of the lead byte
        let mut data: &[u8] = &[0x81, 0xaa, 0xbb, 0xcc];

        let header = EcmHeader::decode(&mut data).unwrap();
        assert_eq!(header.encode_to_bytes().as_ref(), [0x80, 0, 0, 0]);
    }

    #[test]
    fn leaves_trailing_bytes() {
        let mut data: &[u8] = &[0x80, 0, 0, 0, 0xde, 0xad];

        EcmHeader::decode(&mut data).expect("must successfully decode");
        assert_eq!(data, &[0xde, 0xad]);
    }
}
