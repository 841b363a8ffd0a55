//! Shared type definitions: actor addresses and the messages they exchange.

use std::any::Any;
use std::fmt::{self, Debug, Display, Formatter};

/// 64-bit address of an actor.
///
/// Zero is reserved: it is never a valid actor address and marks messages
/// posted from outside any actor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(u64);

impl Address {
    /// The reserved zero address.
    pub const NONE: Address = Address(0);

    /// Wraps a raw address.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns true for every address except [`Address::NONE`].
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl From<u64> for Address {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Address> for u64 {
    fn from(value: Address) -> Self {
        value.0
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Largest payload that fits in [`Payload::Inline`].
pub const INLINE_CAPACITY: usize = 8;

/// Content carried by a [`Message`].
pub enum Payload {
    /// No content; the message kind says it all.
    Empty,
    /// A single 64-bit value.
    Scalar(u64),
    /// Up to [`INLINE_CAPACITY`] bytes stored inside the message.
    Inline {
        /// Backing storage; only the first `len` bytes are meaningful.
        bytes: [u8; INLINE_CAPACITY],
        /// Number of valid bytes.
        len: u8,
    },
    /// Out-of-band bytes allocated together with the message.
    Extra(Box<[u8]>),
    /// Owning handle to arbitrary data. Dropped with the message.
    Boxed(Box<dyn Any + Send>),
}

impl Debug for Payload {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Empty => f.write_str("Empty"),
            Payload::Scalar(value) => f.debug_tuple("Scalar").field(value).finish(),
            Payload::Inline { bytes, len } => f
                .debug_tuple("Inline")
                .field(&&bytes[..usize::from(*len)])
                .finish(),
            Payload::Extra(bytes) => f.debug_tuple("Extra").field(&bytes.len()).finish(),
            Payload::Boxed(_) => f.write_str("Boxed(..)"),
        }
    }
}

/// A unit of application data moved from one actor to another.
///
/// Sending consumes the message; whoever pops it owns it and releases it
/// (and its payload) by dropping it.
#[derive(Debug)]
pub struct Message {
    kind: u32,
    from: Address,
    payload: Payload,
}

impl Message {
    /// Creates an empty message of the given kind.
    ///
    /// Kind zero is reserved; such a message can be built but not sent.
    pub fn new(kind: u32) -> Self {
        Self {
            kind,
            from: Address::NONE,
            payload: Payload::Empty,
        }
    }

    /// Creates a message carrying `extra` zeroed bytes of out-of-band storage.
    ///
    /// # Panics
    /// Panics if `extra` is zero; use [`Message::new`] for empty messages.
    pub fn with_extra(kind: u32, extra: usize) -> Self {
        assert!(extra > 0, "extra allocation must be nonzero");
        Self::new(kind).with_payload(Payload::Extra(vec![0; extra].into_boxed_slice()))
    }

    /// Creates a message carrying a single scalar.
    pub fn scalar(kind: u32, value: u64) -> Self {
        Self::new(kind).with_payload(Payload::Scalar(value))
    }

    /// Creates a message carrying up to [`INLINE_CAPACITY`] bytes inline.
    ///
    /// # Panics
    /// Panics if `data` is longer than [`INLINE_CAPACITY`].
    pub fn inline(kind: u32, data: &[u8]) -> Self {
        assert!(
            data.len() <= INLINE_CAPACITY,
            "inline payload holds at most {INLINE_CAPACITY} bytes, got {}",
            data.len()
        );
        let mut bytes = [0; INLINE_CAPACITY];
        bytes[..data.len()].copy_from_slice(data);
        Self::new(kind).with_payload(Payload::Inline {
            bytes,
            len: data.len() as u8,
        })
    }

    /// Creates a message owning `value`.
    pub fn boxed<T: Any + Send>(kind: u32, value: T) -> Self {
        Self::new(kind).with_payload(Payload::Boxed(Box::new(value)))
    }

    /// Replaces the payload.
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Returns the application-defined message kind.
    pub fn kind(&self) -> u32 {
        self.kind
    }

    /// Sets the message kind, e.g. before forwarding a received message.
    pub fn set_kind(&mut self, kind: u32) {
        self.kind = kind;
    }

    /// Returns the address of the actor that sent the message.
    ///
    /// [`Address::NONE`] for messages that were never sent or were posted
    /// from outside any actor.
    pub fn from(&self) -> Address {
        self.from
    }

    pub(crate) fn stamp(&mut self, from: Address) {
        self.from = from;
    }

    /// Returns the payload.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Returns the payload mutably.
    pub fn payload_mut(&mut self) -> &mut Payload {
        &mut self.payload
    }

    /// Consumes the message, returning its payload.
    pub fn into_payload(self) -> Payload {
        self.payload
    }

    /// Returns the scalar payload, if that is what the message carries.
    pub fn as_scalar(&self) -> Option<u64> {
        match self.payload {
            Payload::Scalar(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the byte payload for inline and extra messages.
    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.payload {
            Payload::Inline { bytes, len } => Some(&bytes[..usize::from(*len)]),
            Payload::Extra(bytes) => Some(&bytes[..]),
            _ => None,
        }
    }

    /// Returns the extra bytes mutably, for filling in before sending.
    pub fn extra_mut(&mut self) -> Option<&mut [u8]> {
        match &mut self.payload {
            Payload::Extra(bytes) => Some(&mut bytes[..]),
            _ => None,
        }
    }

    /// Borrows a boxed payload as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match &self.payload {
            Payload::Boxed(value) => value.downcast_ref(),
            _ => None,
        }
    }

    /// Takes a boxed payload out as `T`, giving the message back on mismatch.
    pub fn downcast<T: Any>(self) -> Result<Box<T>, Self> {
        let Self {
            kind,
            from,
            payload,
        } = self;
        let payload = match payload {
            Payload::Boxed(value) => match value.downcast::<T>() {
                Ok(value) => return Ok(value),
                Err(value) => Payload::Boxed(value),
            },
            payload => payload,
        };
        Err(Self {
            kind,
            from,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_payload_keeps_only_written_bytes() {
        let msg = Message::inline(3, b"abc");
        assert_eq!(msg.bytes(), Some(&b"abc"[..]));
        assert_eq!(msg.as_scalar(), None);
    }

    #[test]
    fn extra_payload_is_zeroed_and_writable() {
        let mut msg = Message::with_extra(1, 4);
        assert_eq!(msg.bytes(), Some(&[0u8; 4][..]));
        msg.extra_mut().unwrap()[2] = 7;
        assert_eq!(msg.bytes(), Some(&[0, 0, 7, 0][..]));
    }

    #[test]
    fn downcast_mismatch_returns_message() {
        let msg = Message::boxed(9, String::from("hello"));
        let msg = msg.downcast::<u32>().unwrap_err();
        assert_eq!(msg.kind(), 9);
        assert_eq!(*msg.downcast::<String>().unwrap(), "hello");
    }

    #[test]
    fn fresh_messages_have_no_sender() {
        assert_eq!(Message::new(1).from(), Address::NONE);
        assert!(!Address::NONE.is_valid());
        assert!(Address::new(5).is_valid());
    }
}
