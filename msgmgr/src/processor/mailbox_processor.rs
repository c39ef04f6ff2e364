// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use futures::future::join_all;
use tracing::warn;

// Layer 3: Internal module imports
use crate::mailbox::{MailboxCore, MailboxOwnerHandle};

/// Dispatcher that drains a mailbox's queue and invokes the handlers bound
/// in its handler table.
///
/// The loop blocks on the queue, looks up the handler for each dequeued
/// message's id, invokes it, then drops its reference to the message.
/// Dropping is what "consuming" means here: a pooled payload returns to
/// its pool with the last reference, and a reusable message survives
/// through the clone its creator kept. Messages with no bound handler are
/// logged at WARNING and consumed.
///
/// The loop exits when the mailbox leaves the Activated state (or the
/// process-wide shutdown fires); in-flight handlers complete first.
///
/// # Example
///
/// ```rust,ignore
/// let mailbox = system.create_local_mailbox(address)?;
/// mailbox.add_handler(MY_MSG_ID, handler(|msg| async move { /* ... */ Ok(()) }));
/// mailbox.activate().await?;
///
/// MailboxProcessor::new(&mailbox).process().await;
/// ```
pub struct MailboxProcessor {
    core: Arc<MailboxCore>,
}

impl MailboxProcessor {
    /// Processor over the given mailbox. Only an owner handle grants
    /// dequeue rights.
    pub fn new(mailbox: &MailboxOwnerHandle) -> Self {
        Self {
            core: mailbox.core_arc(),
        }
    }

    /// Single-consumer dispatch loop. Returns when the mailbox deactivates.
    pub async fn process(&self) {
        Self::worker(Arc::clone(&self.core)).await;
    }

    /// Spawn `workers` concurrent dispatch loops over the same queue and
    /// wait for all of them.
    ///
    /// Handlers are invoked concurrently across workers; the framework
    /// does not serialize them, so every bound handler must be
    /// thread-safe.
    pub async fn process_concurrent(&self, workers: usize) {
        let tasks: Vec<_> = (0..workers.max(1))
            .map(|_| tokio::spawn(Self::worker(Arc::clone(&self.core))))
            .collect();
        join_all(tasks).await;
    }

    async fn worker(core: Arc<MailboxCore>) {
        while let Some(message) = core.dequeue().await {
            let id = message.message_id();
            match core.handler_for(id) {
                Some(handler) => {
                    if let Err(err) = handler(Arc::clone(&message)).await {
                        warn!(mailbox = core.name(), %id, %err, "message handler failed");
                    }
                }
                None => {
                    warn!(mailbox = core.name(), %id, "no handler bound for message id");
                }
            }
            drop(message);
        }
    }
}

impl std::fmt::Debug for MailboxProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailboxProcessor")
            .field("mailbox", &self.core.name())
            .finish()
    }
}
