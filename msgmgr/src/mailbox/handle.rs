// Layer 1: Standard library imports
use std::fmt;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use tracing::{error, warn};

// Layer 3: Internal module imports
use super::core::{MailboxCore, MailboxState};
use super::distributed::DistributedMailbox;
use super::group::GroupMailbox;
use super::metrics::MailboxMetrics;
use super::traits::{MessageHandler, MessageSender};
use crate::address::MailboxAddress;
use crate::error::MsgMgrError;
use crate::message::{Message, MessageId, TimerId, TimerMessage};

/// Transport-specific half of a mailbox, driven by the owner handle during
/// activation.
pub(crate) enum MailboxBacking {
    /// In-process only; nothing to bind.
    Local,
    /// TCP listener reactor.
    Distributed(DistributedMailbox),
    /// Multicast/broadcast datagram reactor.
    Group(GroupMailbox),
}

impl fmt::Debug for MailboxBacking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "Local"),
            Self::Distributed(_) => write!(f, "Distributed"),
            Self::Group(_) => write!(f, "Group"),
        }
    }
}

/// Post-only sender for an in-process mailbox.
#[derive(Debug, Clone)]
pub(crate) struct LocalSender {
    core: Arc<MailboxCore>,
}

#[async_trait]
impl MessageSender for LocalSender {
    async fn post(&self, message: Arc<dyn Message>) -> Result<(), MsgMgrError> {
        // Local delivery is pointer passing; no serialization, no blocking.
        self.core.post(message)
    }

    fn target_address(&self) -> &MailboxAddress {
        self.core.address()
    }
}

/// Non-owner handle to a mailbox: post access only.
///
/// Each handle holds one reference on a local mailbox; cloning acquires
/// another. Handles to remote mailboxes wrap a proxy and do not
/// participate in the target's reference count (the proxy lives in the
/// lookup service's registry). Dropping a handle releases its reference;
/// [`MailboxHandle::release`] does so explicitly.
pub struct MailboxHandle {
    sender: Arc<dyn MessageSender>,
    core: Option<Arc<MailboxCore>>,
}

impl MailboxHandle {
    /// Handle over an in-process mailbox. The caller must already have
    /// acquired the reference this handle represents.
    pub(crate) fn for_local(core: Arc<MailboxCore>) -> Self {
        Self {
            sender: Arc::new(LocalSender {
                core: Arc::clone(&core),
            }),
            core: Some(core),
        }
    }

    /// Handle over an outbound proxy.
    pub(crate) fn for_proxy(sender: Arc<dyn MessageSender>) -> Self {
        Self { sender, core: None }
    }

    /// Post a message. For local targets this enqueues and returns; for
    /// proxies it serializes and writes to the transport, which may block
    /// for the duration of the write.
    pub async fn post(&self, message: Arc<dyn Message>) -> Result<(), MsgMgrError> {
        self.sender.post(message).await
    }

    /// Address this handle delivers to.
    pub fn target_address(&self) -> &MailboxAddress {
        self.sender.target_address()
    }

    /// Explicitly release this handle's reference.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if let Some(core) = self.core.take() {
            core.release_ref();
        }
    }

    /// Whether two handles deliver to the very same mailbox or proxy
    /// instance (identity, not address equality).
    pub(crate) fn same_target(&self, other: &Self) -> bool {
        match (&self.core, &other.core) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => Arc::ptr_eq(&self.sender, &other.sender),
            _ => false,
        }
    }
}

impl Clone for MailboxHandle {
    /// Cloning acquires another reference on a local mailbox.
    fn clone(&self) -> Self {
        if let Some(core) = &self.core {
            core.acquire_ref();
        }
        Self {
            sender: Arc::clone(&self.sender),
            core: self.core.clone(),
        }
    }
}

impl Drop for MailboxHandle {
    fn drop(&mut self) {
        self.release_inner();
    }
}

impl fmt::Debug for MailboxHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailboxHandle")
            .field("target", self.sender.target_address())
            .field("local", &self.core.is_some())
            .finish()
    }
}

/// Distinguished owner handle created together with its mailbox.
///
/// Only the owner may activate and deactivate, bind handlers, and schedule
/// timers; everyone else posts through [`MailboxHandle`]s obtained from
/// [`MailboxOwnerHandle::acquire`] or the lookup service. The owner holds
/// one reference like any other handle; when the last reference goes the
/// mailbox deactivates, deregisters, and is destroyed.
pub struct MailboxOwnerHandle {
    core: Option<Arc<MailboxCore>>,
    backing: MailboxBacking,
}

impl MailboxOwnerHandle {
    pub(crate) fn new(core: Arc<MailboxCore>, backing: MailboxBacking) -> Self {
        Self {
            core: Some(core),
            backing,
        }
    }

    fn core(&self) -> &Arc<MailboxCore> {
        match &self.core {
            Some(core) => core,
            None => unreachable!("owner handle used after release"),
        }
    }

    pub(crate) fn core_arc(&self) -> Arc<MailboxCore> {
        Arc::clone(self.core())
    }

    /// Activate the mailbox: bind its transport (for distributed and group
    /// mailboxes), start accepting posts, and register with the lookup
    /// service.
    pub async fn activate(&self) -> Result<(), MsgMgrError> {
        let core = self.core();
        match core.state() {
            MailboxState::Constructed => {}
            MailboxState::Activated => {
                warn!(mailbox = core.name(), "activate on an already activated mailbox");
                return Ok(());
            }
            _ => {
                return Err(MsgMgrError::InactiveMailbox {
                    name: core.name().to_string(),
                });
            }
        }

        // Accept posts before the reactor can deliver the first frame.
        if !core.transition(MailboxState::Constructed, MailboxState::Activated) {
            return Err(MsgMgrError::InactiveMailbox {
                name: core.name().to_string(),
            });
        }

        let bound = match &self.backing {
            MailboxBacking::Local => Ok(()),
            MailboxBacking::Distributed(distributed) => distributed.bind_and_spawn(core).await,
            MailboxBacking::Group(group) => group.bind_and_spawn(core).await,
        };
        if let Err(err) = bound {
            core.transition(MailboxState::Activated, MailboxState::Constructed);
            return Err(err);
        }

        if let Some(lookup) = core.lookup() {
            if let Err(err) = lookup.register_core(core) {
                error!(mailbox = core.name(), %err, "registration failed; mailbox deactivated");
                core.deactivate_internal();
                return Err(err);
            }
        }
        Ok(())
    }

    /// Deactivate: cease posts, discard pending timers, stop the reactor,
    /// and deregister from the lookup service.
    pub fn deactivate(&self) {
        let core = self.core();
        core.deactivate_internal();
        if let Some(lookup) = core.lookup() {
            lookup.deregister_core(core);
        }
    }

    /// Post to this mailbox. Never blocks.
    pub fn post(&self, message: Arc<dyn Message>) -> Result<(), MsgMgrError> {
        self.core().post(message)
    }

    /// Bind `handler` to `id` in this mailbox's handler table.
    pub fn add_handler(&self, id: MessageId, handler: MessageHandler) {
        self.core().add_handler(id, handler);
    }

    /// Arm a timer on this mailbox. See [`MailboxCore::schedule_timer`].
    pub fn schedule_timer(&self, timer: Arc<dyn TimerMessage>) -> Result<TimerId, MsgMgrError> {
        self.core().schedule_timer(timer)
    }

    /// Cancel a pending timer expiration.
    pub fn cancel_timer(&self, id: TimerId) -> bool {
        self.core().cancel_timer(id)
    }

    /// Acquire a post-only handle (takes one more reference).
    pub fn acquire(&self) -> MailboxHandle {
        let core = self.core();
        core.acquire_ref();
        MailboxHandle::for_local(Arc::clone(core))
    }

    /// This mailbox's address.
    pub fn address(&self) -> &MailboxAddress {
        self.core().address()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> MailboxState {
        self.core().state()
    }

    /// Per-mailbox counters.
    pub fn metrics(&self) -> &MailboxMetrics {
        self.core().metrics()
    }

    /// Current reference count (owner plus acquired handles).
    pub fn ref_count(&self) -> usize {
        self.core().ref_count()
    }

    /// Number of timers currently armed.
    pub fn active_timer_count(&self) -> usize {
        self.core().active_timer_count()
    }

    pub fn debug_level(&self) -> i32 {
        self.core().debug_level()
    }

    pub fn set_debug_level(&self, level: i32) {
        self.core().set_debug_level(level);
    }

    /// Explicitly release the owner's reference. If this was the last
    /// handle the mailbox deactivates, deregisters, and is destroyed.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if let Some(core) = self.core.take() {
            core.release_ref();
        }
    }
}

impl Drop for MailboxOwnerHandle {
    fn drop(&mut self) {
        self.release_inner();
    }
}

impl fmt::Debug for MailboxOwnerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailboxOwnerHandle")
            .field("core", &self.core)
            .field("backing", &self.backing)
            .finish()
    }
}
