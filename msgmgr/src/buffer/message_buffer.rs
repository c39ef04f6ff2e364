// Layer 1: Standard library imports
use std::fmt;

// Layer 2: Third-party crate imports
use bytes::{BufMut, BytesMut};
use tracing::{error, trace};

// Layer 3: Internal module imports
use crate::address::{
    MailboxAddress, MailboxAddressType, MailboxLocationType, RedundantRole,
};

/// Hard cap on a serialized message, and the default buffer capacity.
///
/// A frame that would exceed this length is a post-time error; receivers
/// reject frames claiming more.
pub const MAX_MESSAGE_LENGTH: usize = 4096;

/// Bounded serialization buffer with insert and extract cursors.
///
/// Overflowing an insertion or underflowing an extraction logs at ERROR and
/// becomes a no-op; extraction underflow additionally latches the
/// [`underflowed`](MessageBuffer::underflowed) flag so deserializers can
/// reject truncated frames after the fact.
///
/// # Example
///
/// ```rust
/// use msgmgr::buffer::MessageBuffer;
///
/// let mut buffer = MessageBuffer::new(64, true);
/// buffer.insert(&42u32);
/// buffer.insert(&"abc".to_string());
///
/// assert_eq!(buffer.extract::<u32>(), 42);
/// assert_eq!(buffer.extract::<String>(), "abc");
/// assert!(buffer.is_drained());
/// ```
pub struct MessageBuffer {
    data: BytesMut,
    extract_pos: usize,
    max_len: usize,
    network_conversion: bool,
    underflowed: bool,
}

impl MessageBuffer {
    /// Create an empty buffer with the given capacity cap.
    ///
    /// `network_conversion` should be true whenever the buffer's bytes will
    /// cross the network stack, and false for shared-memory transport.
    pub fn new(capacity: usize, network_conversion: bool) -> Self {
        let max_len = capacity.min(MAX_MESSAGE_LENGTH);
        Self {
            data: BytesMut::with_capacity(max_len),
            extract_pos: 0,
            max_len,
            network_conversion,
            underflowed: false,
        }
    }

    /// Buffer over received frame bytes, positioned for extraction.
    pub fn from_bytes(bytes: &[u8], network_conversion: bool) -> Self {
        let mut buffer = Self::new(bytes.len().max(1), network_conversion);
        buffer.assign(bytes);
        buffer
    }

    /// Copy `bytes` into the buffer, replacing current contents and
    /// resetting both cursors. Oversized input logs and is ignored.
    pub fn assign(&mut self, bytes: &[u8]) {
        if bytes.len() > self.max_len {
            error!(
                len = bytes.len(),
                max = self.max_len,
                "assign exceeds buffer capacity"
            );
            return;
        }
        self.data.clear();
        self.data.extend_from_slice(bytes);
        self.extract_pos = 0;
        self.underflowed = false;
    }

    /// Reset to an empty buffer with a (possibly new) capacity cap.
    pub fn assign_empty(&mut self, capacity: usize) {
        self.max_len = capacity.min(MAX_MESSAGE_LENGTH);
        self.clear();
    }

    /// Drop all contents and reset both cursors.
    pub fn clear(&mut self) {
        self.data.clear();
        self.extract_pos = 0;
        self.underflowed = false;
    }

    /// The serialized contents written so far.
    pub fn raw(&self) -> &[u8] {
        &self.data
    }

    /// Number of bytes written.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Capacity cap for this buffer.
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Bytes still available for extraction.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.extract_pos
    }

    /// True once the extract cursor has consumed every written byte.
    pub fn is_drained(&self) -> bool {
        self.extract_pos == self.data.len()
    }

    /// True if any extraction ran past the written contents.
    pub fn underflowed(&self) -> bool {
        self.underflowed
    }

    /// Switch host/network byte-order conversion on or off.
    pub fn set_network_conversion(&mut self, enabled: bool) {
        self.network_conversion = enabled;
    }

    /// Current byte-order conversion mode.
    pub fn network_conversion(&self) -> bool {
        self.network_conversion
    }

    /// Typed insertion; advances the insert cursor by the marshaled width.
    pub fn insert<V: BufferValue>(&mut self, value: &V) -> &mut Self {
        V::insert_into(self, value);
        self
    }

    /// Typed extraction; advances the extract cursor by the marshaled
    /// width. Underflow yields the type's default value.
    pub fn extract<V: BufferValue>(&mut self) -> V {
        V::extract_from(self)
    }

    fn has_room(&mut self, width: usize) -> bool {
        if self.data.len() + width > self.max_len {
            error!(
                want = width,
                used = self.data.len(),
                max = self.max_len,
                "insertion would exceed buffer capacity"
            );
            false
        } else {
            true
        }
    }

    fn take(&mut self, width: usize) -> Option<&[u8]> {
        if self.extract_pos + width > self.data.len() {
            error!(
                want = width,
                remaining = self.data.len() - self.extract_pos,
                "buffer contents exhausted prematurely"
            );
            self.underflowed = true;
            return None;
        }
        let start = self.extract_pos;
        self.extract_pos += width;
        Some(&self.data[start..self.extract_pos])
    }

    fn put_u16_conv(&mut self, value: u16) {
        if self.network_conversion {
            self.data.put_u16(value);
        } else {
            self.data.put_u16_ne(value);
        }
    }

    fn put_u32_conv(&mut self, value: u32) {
        if self.network_conversion {
            self.data.put_u32(value);
        } else {
            self.data.put_u32_ne(value);
        }
    }

    fn get_u16_conv(&mut self) -> Option<u16> {
        let conv = self.network_conversion;
        self.take(2).map(|b| {
            let raw = [b[0], b[1]];
            if conv {
                u16::from_be_bytes(raw)
            } else {
                u16::from_ne_bytes(raw)
            }
        })
    }

    fn get_u32_conv(&mut self) -> Option<u32> {
        let conv = self.network_conversion;
        self.take(4).map(|b| {
            let raw = [b[0], b[1], b[2], b[3]];
            if conv {
                u32::from_be_bytes(raw)
            } else {
                u32::from_ne_bytes(raw)
            }
        })
    }
}

impl Default for MessageBuffer {
    fn default() -> Self {
        Self::new(MAX_MESSAGE_LENGTH, true)
    }
}

impl crate::opm::Poolable for MessageBuffer {
    /// Returning a buffer to its pool empties it and restores the default
    /// network-conversion mode.
    fn clean(&mut self) {
        self.clear();
        self.network_conversion = true;
    }
}

impl fmt::Debug for MessageBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageBuffer")
            .field("len", &self.data.len())
            .field("extract_pos", &self.extract_pos)
            .field("max_len", &self.max_len)
            .field("network_conversion", &self.network_conversion)
            .finish()
    }
}

/// Values that can be marshaled into and out of a [`MessageBuffer`].
///
/// Implemented for the fixed-width integers, `bool`, length-prefixed
/// `String`, and [`MailboxAddress`]. Each implementation advances the
/// cursors by the exact marshaled width.
pub trait BufferValue: Sized {
    fn insert_into(buffer: &mut MessageBuffer, value: &Self);
    fn extract_from(buffer: &mut MessageBuffer) -> Self;
}

impl BufferValue for u8 {
    fn insert_into(buffer: &mut MessageBuffer, value: &Self) {
        if buffer.has_room(1) {
            buffer.data.put_u8(*value);
        }
    }

    fn extract_from(buffer: &mut MessageBuffer) -> Self {
        buffer.take(1).map(|b| b[0]).unwrap_or_default()
    }
}

impl BufferValue for bool {
    fn insert_into(buffer: &mut MessageBuffer, value: &Self) {
        u8::insert_into(buffer, &u8::from(*value));
    }

    fn extract_from(buffer: &mut MessageBuffer) -> Self {
        u8::extract_from(buffer) != 0
    }
}

impl BufferValue for u16 {
    fn insert_into(buffer: &mut MessageBuffer, value: &Self) {
        if buffer.has_room(2) {
            buffer.put_u16_conv(*value);
        }
    }

    fn extract_from(buffer: &mut MessageBuffer) -> Self {
        buffer.get_u16_conv().unwrap_or_default()
    }
}

impl BufferValue for u32 {
    fn insert_into(buffer: &mut MessageBuffer, value: &Self) {
        if buffer.has_room(4) {
            buffer.put_u32_conv(*value);
        }
    }

    fn extract_from(buffer: &mut MessageBuffer) -> Self {
        buffer.get_u32_conv().unwrap_or_default()
    }
}

impl BufferValue for i32 {
    fn insert_into(buffer: &mut MessageBuffer, value: &Self) {
        u32::insert_into(buffer, &(*value as u32));
    }

    fn extract_from(buffer: &mut MessageBuffer) -> Self {
        u32::extract_from(buffer) as i32
    }
}

impl BufferValue for String {
    /// One-byte length prefix followed by the bytes verbatim (no byte-order
    /// conversion applies to strings).
    fn insert_into(buffer: &mut MessageBuffer, value: &Self) {
        let bytes = value.as_bytes();
        if bytes.len() > u8::MAX as usize {
            error!(len = bytes.len(), "string too long for 1-byte length prefix");
            return;
        }
        if buffer.has_room(1 + bytes.len()) {
            buffer.data.put_u8(bytes.len() as u8);
            buffer.data.extend_from_slice(bytes);
        }
    }

    fn extract_from(buffer: &mut MessageBuffer) -> Self {
        let len = u8::extract_from(buffer) as usize;
        buffer
            .take(len)
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .unwrap_or_default()
    }
}

impl BufferValue for MailboxAddress {
    /// Serialized form depends on the location type and is preceded by a
    /// 2-byte total-size field covering everything after that field.
    ///
    /// - Local: `{location, name}`
    /// - Distributed / Group / SharedMemory:
    ///   `{location, name, neid, address type, shelf, slot, role, "ip:port"}`
    fn insert_into(buffer: &mut MessageBuffer, value: &Self) {
        let remote = matches!(
            value.location_type,
            MailboxLocationType::Distributed
                | MailboxLocationType::Group
                | MailboxLocationType::LocalSharedMemory
        );
        if !remote {
            // Local addresses carry no transport coordinates; the receiving
            // side cannot reply to them.
            trace!(address = %value, "local type mailbox address serialized");
        }

        let name_bytes = value.mailbox_name.as_bytes();
        let inet = value.inet_address.to_string();
        let mut total: usize = 4 + 1 + name_bytes.len();
        if remote {
            total += 1 + value.neid.len(); // neid
            total += 4 + 4 + 4 + 4; // address type, shelf, slot, role
            total += 1 + inet.len(); // "ip:port"
        }
        if name_bytes.len() > u8::MAX as usize
            || value.neid.len() > u8::MAX as usize
            || total > u16::MAX as usize
        {
            error!(address = %value, "mailbox address too large to serialize");
            return;
        }
        if !buffer.has_room(2 + total) {
            return;
        }

        buffer.put_u16_conv(total as u16);
        buffer.put_u32_conv(value.location_type.wire_value());
        String::insert_into(buffer, &value.mailbox_name);
        if remote {
            String::insert_into(buffer, &value.neid);
            buffer.put_u32_conv(value.address_type.wire_value());
            buffer.put_u32_conv(value.shelf_number);
            buffer.put_u32_conv(value.slot_number);
            buffer.put_u32_conv(value.redundant_role.wire_value());
            String::insert_into(buffer, &inet);
        }
    }

    fn extract_from(buffer: &mut MessageBuffer) -> Self {
        let mut address = MailboxAddress::default();

        // The leading total-size field bounds everything that follows.
        let Some(block_len) = buffer.get_u16_conv() else {
            return address;
        };
        if buffer.remaining() < block_len as usize {
            error!(
                block_len,
                remaining = buffer.remaining(),
                "mailbox address block exceeds buffer contents"
            );
            buffer.underflowed = true;
            return address;
        }

        let raw_location = buffer.get_u32_conv().unwrap_or_default();
        let Some(location) = MailboxLocationType::from_wire(raw_location) else {
            error!(raw_location, "invalid mailbox location type on the wire");
            buffer.underflowed = true;
            return address;
        };
        address.location_type = location;
        address.mailbox_name = String::extract_from(buffer);

        if matches!(
            location,
            MailboxLocationType::Distributed
                | MailboxLocationType::Group
                | MailboxLocationType::LocalSharedMemory
        ) {
            address.neid = String::extract_from(buffer);
            let raw_type = buffer.get_u32_conv().unwrap_or_default();
            address.address_type =
                MailboxAddressType::from_wire(raw_type).unwrap_or_default();
            address.shelf_number = buffer.get_u32_conv().unwrap_or_default();
            address.slot_number = buffer.get_u32_conv().unwrap_or_default();
            let raw_role = buffer.get_u32_conv().unwrap_or_default();
            address.redundant_role = RedundantRole::from_wire(raw_role).unwrap_or_default();
            let inet = String::extract_from(buffer);
            match inet.parse() {
                Ok(parsed) => address.inet_address = parsed,
                Err(_) => {
                    error!(inet, "unparseable inet address on the wire");
                    buffer.underflowed = true;
                }
            }
        }

        address
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn integer_round_trip_network_order() {
        let mut buffer = MessageBuffer::new(64, true);
        buffer.insert(&0xDEAD_BEEFu32).insert(&0xCAFEu16).insert(&7u8);

        // Network order means big-endian on the wire.
        assert_eq!(&buffer.raw()[..4], &[0xDE, 0xAD, 0xBE, 0xEF]);

        assert_eq!(buffer.extract::<u32>(), 0xDEAD_BEEF);
        assert_eq!(buffer.extract::<u16>(), 0xCAFE);
        assert_eq!(buffer.extract::<u8>(), 7);
        assert!(buffer.is_drained());
        assert!(!buffer.underflowed());
    }

    #[test]
    fn integer_round_trip_host_order() {
        let mut buffer = MessageBuffer::new(64, false);
        buffer.insert(&0x1234_5678u32);
        assert_eq!(buffer.extract::<u32>(), 0x1234_5678);
    }

    #[test]
    fn signed_and_bool_round_trip() {
        let mut buffer = MessageBuffer::new(64, true);
        buffer.insert(&-42i32).insert(&true).insert(&false);

        assert_eq!(buffer.extract::<i32>(), -42);
        assert!(buffer.extract::<bool>());
        assert!(!buffer.extract::<bool>());
    }

    #[test]
    fn string_round_trip() {
        let mut buffer = MessageBuffer::new(64, true);
        buffer.insert(&"hello".to_string()).insert(&String::new());

        assert_eq!(buffer.extract::<String>(), "hello");
        assert_eq!(buffer.extract::<String>(), "");
    }

    #[test]
    fn overflow_is_a_no_op() {
        let mut buffer = MessageBuffer::new(4, true);
        buffer.insert(&1u32);
        buffer.insert(&2u32); // no room left
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.extract::<u32>(), 1);
        assert!(buffer.is_drained());
    }

    #[test]
    fn underflow_latches_flag_and_yields_default() {
        let mut buffer = MessageBuffer::new(16, true);
        buffer.insert(&9u16);
        let _ = buffer.extract::<u16>();
        assert_eq!(buffer.extract::<u32>(), 0);
        assert!(buffer.underflowed());
    }

    #[test]
    fn local_address_round_trip() {
        use crate::address::MailboxLocationType;

        let addr = MailboxAddress::local("EventRouter");
        let mut buffer = MessageBuffer::new(256, true);
        buffer.insert(&addr);

        let out = buffer.extract::<MailboxAddress>();
        assert_eq!(out.location_type, MailboxLocationType::Local);
        assert_eq!(out.mailbox_name, "EventRouter");
        assert!(buffer.is_drained());
    }

    #[test]
    fn distributed_address_round_trip_all_fields() {
        use crate::address::{MailboxAddressType, RedundantRole};

        let mut addr = MailboxAddress::distributed(
            "FaultManager",
            "127.0.0.1:12776".parse().unwrap(),
        )
        .with_neid("NE-04");
        addr.address_type = MailboxAddressType::Logical;
        addr.shelf_number = 2;
        addr.slot_number = 11;
        addr.redundant_role = RedundantRole::Active;

        let mut buffer = MessageBuffer::new(256, true);
        buffer.insert(&addr);
        let out = buffer.extract::<MailboxAddress>();

        assert_eq!(out, addr);
        assert!(buffer.is_drained());
        assert!(!buffer.underflowed());
    }

    #[test]
    fn truncated_address_block_is_rejected() {
        let addr = MailboxAddress::distributed(
            "FaultManager",
            "127.0.0.1:12776".parse().unwrap(),
        );
        let mut buffer = MessageBuffer::new(256, true);
        buffer.insert(&addr);

        // Chop off the tail of the serialized block.
        let truncated: Vec<u8> = buffer.raw()[..buffer.len() - 4].to_vec();
        let mut short = MessageBuffer::from_bytes(&truncated, true);
        let _ = short.extract::<MailboxAddress>();
        assert!(short.underflowed());
    }

    #[test]
    fn assign_resets_cursors() {
        let mut buffer = MessageBuffer::new(64, true);
        buffer.insert(&5u32);
        let copy: Vec<u8> = buffer.raw().to_vec();

        let mut other = MessageBuffer::new(64, true);
        other.insert(&77u32);
        other.assign(&copy);
        assert_eq!(other.extract::<u32>(), 5);
    }

    #[test]
    fn assign_empty_changes_capacity() {
        let mut buffer = MessageBuffer::new(64, true);
        buffer.insert(&5u32);
        buffer.assign_empty(2);
        assert!(buffer.is_empty());
        buffer.insert(&5u32); // does not fit anymore
        assert!(buffer.is_empty());
    }

    #[test]
    fn capacity_capped_at_max_message_length() {
        let buffer = MessageBuffer::new(1 << 20, true);
        assert_eq!(buffer.max_len(), MAX_MESSAGE_LENGTH);
    }
}
