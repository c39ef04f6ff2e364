//! Length-prefixed serialization primitive for wire messages.
//!
//! [`MessageBuffer`] owns a bounded byte buffer and two cursors (insert and
//! extract). Typed values go in and come out through the [`BufferValue`]
//! trait; multi-byte integers are converted to network byte order when the
//! buffer's conversion flag is on (distributed and group transports) and
//! left in host order when it is off (shared-memory transport).

pub mod message_buffer;

pub use message_buffer::{BufferValue, MessageBuffer, MAX_MESSAGE_LENGTH};
