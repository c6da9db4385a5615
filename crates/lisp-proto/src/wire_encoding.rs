//! Traits for bit-exact encoding and decoding of LISP wire structures.

use bytes::{BufMut, Bytes, BytesMut};

/// Raised if the buffer does not have sufficient capacity for encoding a wire structure.
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone, Copy, Default)]
#[error("the provided buffer did not have sufficient size")]
pub struct InadequateBufferSize;

/// A trait for types encodable to the LISP wire format.
pub trait WireEncode {
    /// The number of bytes written when encoding this object.
    fn encoded_length(&self) -> usize;

    /// Encodes the object to the buffer without checking the buffer's capacity.
    ///
    /// Implementations write exactly [`encoded_length`][Self::encoded_length] bytes.
    fn encode_to_unchecked<T: BufMut>(&self, buffer: &mut T);

    /// Encodes the object to the provided buffer.
    ///
    /// Errs if the buffer cannot hold at least [`encoded_length`][Self::encoded_length]
    /// further bytes.
    fn encode_to<T: BufMut>(&self, buffer: &mut T) -> Result<(), InadequateBufferSize> {
        if buffer.remaining_mut() < self.encoded_length() {
            return Err(InadequateBufferSize);
        }
        self.encode_to_unchecked(buffer);
        Ok(())
    }

    /// Encodes the object to a freshly allocated [`Bytes`].
    fn encode_to_bytes(&self) -> Bytes {
        let mut buffer = BytesMut::with_capacity(self.encoded_length());
        self.encode_to_unchecked(&mut buffer); // BytesMut grows as needed
        buffer.freeze()
    }
}

/// A trait for types decodable from a wire format, such as a [`bytes::Buf`].
///
/// On success, the buffer is advanced by exactly the number of bytes comprising
/// the decoded object; any trailing data is left for the next layer.
pub trait WireDecode<T>: Sized {
    /// The error type returned on a failed decode.
    type Error;

    /// Decodes an object from the provided data.
    ///
    /// Bytes may be consumed regardless of whether or not decoding fails; callers
    /// receiving an error should discard the buffer.
    fn decode(data: &mut T) -> Result<Self, Self::Error>;
}

macro_rules! bounded_uint {
    (
        $(#[$outer:meta])*
        pub struct $name:ident($type:ty : $bits:literal);
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash, Default)]
        pub struct $name($type);

        impl $name {
            /// The number of bits useable for an instance of this type.
            pub const BITS: u32 = $bits;

            /// The maximum possible value for an instance of this type.
            pub const MAX: Self = Self((1 << $bits) - 1);

            /// Create a new instance if the value is at most `Self::MAX.get()`.
            pub const fn new(value: $type) -> Option<Self> {
                if value <= Self::MAX.0 {
                    Some(Self(value))
                } else {
                    None
                }
            }

            /// Create a new instance with the provided value.
            ///
            /// # Safety
            ///
            /// The value should be at most `Self::MAX.get()`.
            pub const fn new_unchecked(value: $type) -> Self {
                debug_assert!(value <= Self::MAX.0);
                Self(value)
            }

            /// Get the value of this instance as its underlying type.
            #[inline]
            pub const fn get(&self) -> $type {
                self.0
            }
        }
    };
}
pub(crate) use bounded_uint;
