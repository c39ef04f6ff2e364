//! One-stop imports for applications built on the messaging framework.
//!
//! ```rust
//! use msgmgr::prelude::*;
//! ```

pub use crate::address::{
    MailboxAddress, MailboxAddressType, MailboxLocationType, RedundantRole,
};
pub use crate::buffer::{BufferValue, MessageBuffer, MAX_MESSAGE_LENGTH};
pub use crate::discovery::{DiscoveryManager, DiscoveryMessage, DiscoveryOperation};
pub use crate::error::MsgMgrError;
pub use crate::factory::{MessageFactory, WireHeader};
pub use crate::mailbox::{
    handler, GroupOptions, MailboxHandle, MailboxOwnerHandle, MailboxState, MessageHandler,
    MessageSender,
};
pub use crate::message::{BaseTimerMessage, Message, MessageId, TimerId, TimerMessage};
pub use crate::opm::{GrowthPolicy, ObjectPool, Opm, Poolable, Pooled};
pub use crate::processor::MailboxProcessor;
pub use crate::system::{MessagingSystem, SystemConfig};
