//! # msgmgr - Mailbox Messaging Framework
//!
//! Messaging substrate for a distributed platform services layer: every
//! process in the platform (fault pipelines, process supervisors,
//! EMS-facing agents) communicates by creating mailboxes, binding message
//! handlers, and posting or scheduling messages.
//!
//! One mailbox abstraction spans three transports with shared semantics:
//!
//! - **Local**: threads in one process exchange messages by pointer
//!   (`Arc<dyn Message>`); nothing is copied or serialized.
//! - **Distributed**: point-to-point TCP with length-prefixed frames,
//!   serialization through [`buffer::MessageBuffer`], and reconstruction
//!   via the [`factory::MessageFactory`].
//! - **Group**: IP multicast (or broadcast) datagrams for fan-out, one
//!   frame per datagram.
//!
//! Whatever the transport, received messages land on the same
//! priority-ordered queue and are dispatched by a
//! [`processor::MailboxProcessor`] through the mailbox's handler table.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use msgmgr::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), MsgMgrError> {
//!     let system = MessagingSystem::new(SystemConfig::default()).await?;
//!
//!     // 1. Create a mailbox and bind a handler.
//!     let mailbox = system.create_local_mailbox(MailboxAddress::local("EventRouter"))?;
//!     mailbox.add_handler(MY_EVENT_MSG_ID, handler(|message| async move {
//!         tracing::info!(?message, "event received");
//!         Ok(())
//!     }));
//!     mailbox.activate().await?;
//!
//!     // 2. Post from anywhere through the lookup service.
//!     let sender = system.find(&MailboxAddress::local("EventRouter"))?;
//!     sender.post(Arc::new(my_event())).await?;
//!
//!     // 3. Dispatch.
//!     MailboxProcessor::new(&mailbox).process().await;
//!     Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`address`] - Mailbox identity, ordering, filter matching, well-known
//!   names and ports
//! - [`buffer`] - Length-prefixed serialization with byte-order handling
//! - [`message`] - Message trait, id space, timer messages
//! - [`factory`] - Id to deserializer registry (bytes to typed messages)
//! - [`opm`] - Pre-allocated object pools for hot-path reuse
//! - [`mailbox`] - Queue, handlers, timers, lifecycle, transport reactors
//! - [`transport`] - Wire frame codec shared by both remote transports
//! - [`proxy`] - Sending-side stubs with connection pooling and retry
//! - [`lookup`] - Address to mailbox-or-proxy resolution (MLS)
//! - [`discovery`] - Fleet-wide gossip of remote mailbox registrations
//! - [`processor`] - Dispatch loop (single- or multi-worker)
//! - [`system`] - Configuration and the per-universe assembly object
//!
//! # Concurrency Model
//!
//! Every distributed or group mailbox owns a reactor task for its
//! socket(s); timer expirations run on per-timer tasks; dispatch loops
//! block on the queue; proxy writes run on the caller's task. All
//! cross-thread communication flows through mailbox queues; the only
//! shared mutable state is the lookup/discovery registries and the pool
//! manager, each behind its own short-lived lock, taken in the order
//! OPM, proxy registry, local registry, discovery registries, mailbox
//! queue. Process shutdown is a cancellation token that reactor and
//! dispatch loops observe between iterations; in-flight handlers finish.

pub mod address;
pub mod buffer;
pub mod discovery;
pub mod error;
pub mod factory;
pub mod lookup;
pub mod mailbox;
pub mod message;
pub mod opm;
pub mod prelude;
pub mod processor;
pub mod proxy;
pub mod system;
pub mod transport;

// Re-export commonly used types
pub use address::{MailboxAddress, MailboxAddressType, MailboxLocationType, RedundantRole};
pub use buffer::{BufferValue, MessageBuffer, MAX_MESSAGE_LENGTH};
pub use discovery::{DiscoveryManager, DiscoveryMessage, DiscoveryOperation};
pub use error::MsgMgrError;
pub use factory::{MessageFactory, WireHeader};
pub use lookup::MailboxLookupService;
pub use mailbox::{
    handler, GroupOptions, MailboxHandle, MailboxOwnerHandle, MailboxState, MessageHandler,
    MessageSender,
};
pub use message::{BaseTimerMessage, Message, MessageId, TimerId, TimerMessage};
pub use opm::{GrowthPolicy, ObjectPool, Opm, Poolable, Pooled};
pub use processor::MailboxProcessor;
pub use proxy::{DistributedMailboxProxy, GroupMailboxProxy};
pub use system::{MessagingSystem, SystemConfig};
