//! Types, encoding, and decoding of LISP control-plane messages.
//!
//! Control messages share a common leading byte: a 4-bit type tag in the high
//! nibble followed by message-specific flag bits. This module covers the
//! map-notify message and the encapsulated-control-message header; the mapping
//! records they embed live in [`crate::record`].

mod ecm;
pub use ecm::EcmHeader;

mod error;
pub use error::DecodeError;

mod map_notify;
pub use map_notify::MapNotify;

/// The 4-bit type tag carried in the first byte of every control message.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// A request for the mapping of an EID.
    MapRequest = 1,
    /// The mapping-system answer to a map-request.
    MapReply = 2,
    /// A registration of a mapping with a map-server.
    MapRegister = 3,
    /// A map-server's push of a (possibly updated) mapping.
    MapNotify = 4,
    /// A control message encapsulated for transport through the mapping system.
    EncapsulatedControl = 8,
}

impl MessageType {
    /// Converts a 4-bit type nibble into its message type.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lisp_proto::control::MessageType;
    /// assert_eq!(MessageType::from_nibble(4), Some(MessageType::MapNotify));
    /// assert_eq!(MessageType::from_nibble(5), None);
    /// ```
    pub fn from_nibble(nibble: u8) -> Option<Self> {
        match nibble {
            1 => Some(MessageType::MapRequest),
            2 => Some(MessageType::MapReply),
            3 => Some(MessageType::MapRegister),
            4 => Some(MessageType::MapNotify),
            8 => Some(MessageType::EncapsulatedControl),
            _ => None,
        }
    }
}

impl From<MessageType> for u8 {
    fn from(value: MessageType) -> Self {
        value as u8
    }
}
