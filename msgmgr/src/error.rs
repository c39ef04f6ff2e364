//! Unified error taxonomy for the messaging framework.
//!
//! Every fallible framework operation surfaces one of these variants; no
//! panics cross framework boundaries. Transport and framing failures carry
//! enough context to be actionable in logs without holding on to the
//! offending bytes.

// Layer 1: Standard library imports
use std::io;

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::address::MailboxAddress;
use crate::message::MessageId;

/// Framework-wide error type.
///
/// # Example
///
/// ```rust
/// use msgmgr::error::MsgMgrError;
///
/// let err = MsgMgrError::QueueFull { capacity: 1000 };
/// assert!(err.to_string().contains("1000"));
/// ```
#[derive(Debug, Error)]
pub enum MsgMgrError {
    /// No mailbox (or proxy) exists for the requested address.
    #[error("no mailbox found for address {0}")]
    LookupMiss(MailboxAddress),

    /// An identical local registration already exists (mailbox name or
    /// pool id).
    #[error("duplicate registration for '{name}'")]
    DuplicateRegistration { name: String },

    /// The bounded mailbox queue rejected a post.
    #[error("mailbox queue is full (high-water mark: {capacity})")]
    QueueFull { capacity: usize },

    /// Incoming bytes do not form a valid frame, or an outgoing message
    /// does not fit in a frame.
    #[error("wire framing error: {reason}")]
    WireFraming { reason: String },

    /// A well-formed frame carried a message id with no registered
    /// deserializer.
    #[error("no deserializer registered for message id {0}")]
    UnknownMessageId(MessageId),

    /// A proxy write or connection failed after the rebuild-and-retry
    /// attempt; the unsent message remains owned by the caller.
    #[error("transport down for {address}: {source}")]
    TransportDown {
        address: MailboxAddress,
        #[source]
        source: io::Error,
    },

    /// Post attempted on a mailbox that is not in the Activated state.
    #[error("mailbox '{name}' is not activated")]
    InactiveMailbox { name: String },

    /// The mailbox cannot accept another timer.
    #[error("active timer limit reached ({limit})")]
    TimerResourceExhausted { limit: usize },

    /// An object pool is exhausted and its growth policy forbids growing.
    #[error("object pool '{pool}' exhausted")]
    PoolExhausted { pool: String },

    /// A configuration value failed validation at assembly time.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },
}
