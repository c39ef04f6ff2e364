//! Proxy mailboxes: the sending side of remote communication.
//!
//! A proxy represents one remote mailbox. Posting serializes the message
//! through a [`MessageBuffer`] (reserved from the shared buffer pool when
//! one is available, heap-allocated otherwise), frames it, and writes to
//! the transport. The distributed proxy keeps one lazily-established TCP
//! connection and rebuilds it exactly once on a write failure; the group
//! proxy is stateless and sends one datagram per post with no retry.

pub mod distributed;
pub mod group;

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use bytes::BytesMut;
use tokio_util::codec::Encoder;

// Layer 3: Internal module imports
use crate::buffer::MessageBuffer;
use crate::error::MsgMgrError;
use crate::factory::serialize_for_wire;
use crate::message::Message;
use crate::opm::{Opm, MESSAGE_BUFFER_POOL_ID};
use crate::transport::FrameCodec;

pub use distributed::DistributedMailboxProxy;
pub use group::GroupMailboxProxy;

/// Serialize `message` into a complete wire frame (length prefix
/// included). Falls back to a heap buffer when the shared pool is
/// exhausted or absent.
pub(crate) fn serialize_frame(
    message: &dyn Message,
    opm: &Opm,
) -> Result<BytesMut, MsgMgrError> {
    let mut pooled = opm.reserve::<MessageBuffer>(MESSAGE_BUFFER_POOL_ID);
    let mut heap: Option<MessageBuffer> = None;
    let buffer: &mut MessageBuffer = match pooled.as_deref_mut() {
        Some(buffer) => {
            buffer.clear();
            buffer.set_network_conversion(true);
            buffer
        }
        None => heap.get_or_insert_with(MessageBuffer::default),
    };

    serialize_for_wire(message, buffer)?;

    let mut frame = BytesMut::with_capacity(2 + buffer.len());
    FrameCodec::new()
        .encode(buffer.raw(), &mut frame)
        .map_err(|err| MsgMgrError::WireFraming {
            reason: format!("message {} does not fit a frame: {err}", message.message_id()),
        })?;
    Ok(frame)
}
