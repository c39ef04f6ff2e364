// Layer 1: Standard library imports
use std::any::Any;
use std::fmt::Debug;

// Layer 2: Third-party crate imports
use tracing::error;

// Layer 3: Internal module imports
use super::ids::MessageId;
use crate::address::MailboxAddress;
use crate::buffer::MessageBuffer;
use crate::error::MsgMgrError;

/// Polymorphic message carried through mailboxes.
///
/// Four kinds of messages exist, distinguished by two independent axes:
///
/// - **Reusable or not**: a reusable message survives handler invocation
///   (the dispatcher drops only its own reference); the creator keeps a
///   clone of the `Arc` and may post it again.
/// - **Pooled or not**: a message whose payload was reserved from an object
///   pool returns there automatically when its last reference drops.
///
/// Only messages that cross a distributed or group transport need a wire
/// form: they override [`Message::serialize`] and register a matching
/// deserializer with the message factory. The framework writes the common
/// header (message id, source address, version) before calling
/// `serialize`, and strips it again before calling the deserializer.
///
/// # Example
///
/// ```rust
/// use std::any::Any;
///
/// use msgmgr::address::MailboxAddress;
/// use msgmgr::message::{Message, MessageId};
///
/// #[derive(Debug)]
/// struct HeartbeatMessage {
///     source: MailboxAddress,
/// }
///
/// impl Message for HeartbeatMessage {
///     fn message_id(&self) -> MessageId {
///         msgmgr::message::ids::PROCMGR_HEART_BEAT_MSG_ID
///     }
///
///     fn source_address(&self) -> &MailboxAddress {
///         &self.source
///     }
///
///     fn version(&self) -> u32 {
///         1
///     }
///
///     fn as_any(&self) -> &dyn Any {
///         self
///     }
/// }
/// ```
pub trait Message: Debug + Send + Sync + 'static {
    /// Unique message identifier; registered in [`crate::message::ids`].
    fn message_id(&self) -> MessageId;

    /// Source mailbox address of the application that sent the message.
    fn source_address(&self) -> &MailboxAddress;

    /// Version number of the message's wire layout.
    fn version(&self) -> u32;

    /// Queueing priority. Default 0; greater values preempt queued messages
    /// of lower priority (FIFO is preserved within one priority level).
    fn priority(&self) -> u32 {
        0
    }

    /// Whether the framework should leave the message intact after its
    /// handler completes, so it can be posted again.
    fn is_reusable(&self) -> bool {
        false
    }

    /// Application-specific context identifying the source. Usage is up to
    /// the application; serialized only by messages that choose to.
    fn source_context_id(&self) -> u32 {
        0
    }

    /// Application-specific context identifying the destination.
    fn destination_context_id(&self) -> u32 {
        0
    }

    /// Serialize the message-specific fields into `buffer`.
    ///
    /// Only needed for messages posted through distributed or group
    /// proxies. The default implementation flags the programming error of
    /// posting a local-only message to a remote transport.
    fn serialize(&self, buffer: &mut MessageBuffer) -> Result<(), MsgMgrError> {
        let _ = buffer;
        error!(id = %self.message_id(), "message has no wire form");
        Err(MsgMgrError::WireFraming {
            reason: format!("message {} has no wire form", self.message_id()),
        })
    }

    /// Downcast support for handlers.
    fn as_any(&self) -> &dyn Any;
}
