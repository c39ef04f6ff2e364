//! Mailboxes: priority queue, handler dispatch, timers, and lifecycle.
//!
//! Every mailbox, whatever its transport, funnels into the same
//! [`MailboxCore`]: a priority-ordered queue of `Arc<dyn Message>`, a
//! handler table keyed by message id, a bounded timer scheduler, and a
//! reference-counted lifecycle (Constructed → Activated → Deactivated →
//! Destroyed). Distributed and group mailboxes add a reactor task that
//! decodes frames off the network and posts the reconstructed messages
//! onto that queue.
//!
//! Applications hold [`MailboxOwnerHandle`] (activate, deactivate, bind
//! handlers, schedule timers) or plain [`MailboxHandle`]s (post only);
//! each handle holds one reference, and the mailbox deregisters and
//! destroys itself when the last one is released.

pub mod core;
pub mod distributed;
pub mod group;
pub mod handle;
pub mod metrics;
pub mod queue;
pub mod traits;

pub use self::core::{MailboxCore, MailboxState};
pub use group::GroupOptions;
pub use handle::{MailboxHandle, MailboxOwnerHandle};
pub use metrics::MailboxMetrics;
pub use queue::PriorityQueue;
pub use traits::{handler, HandlerFuture, MessageHandler, MessageSender};
