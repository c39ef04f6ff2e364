// Layer 1: Standard library imports
use std::sync::atomic::{AtomicI32, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

// Layer 2: Third-party crate imports
use chrono::Utc;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

// Layer 3: Internal module imports
use super::metrics::MailboxMetrics;
use super::queue::PriorityQueue;
use super::traits::MessageHandler;
use crate::address::MailboxAddress;
use crate::error::MsgMgrError;
use crate::lookup::MailboxLookupService;
use crate::message::{Message, MessageId, TimerId, TimerMessage};

/// Lifecycle state of a mailbox.
///
/// Transitions: Constructed → (activate, owner only) → Activated →
/// (deactivate) → Deactivated → (last release) → Destroyed. Posts are
/// rejected in every state but Activated. There is no re-activation edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MailboxState {
    Constructed = 0,
    Activated = 1,
    Deactivated = 2,
    Destroyed = 3,
}

impl MailboxState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Constructed,
            1 => Self::Activated,
            2 => Self::Deactivated,
            _ => Self::Destroyed,
        }
    }
}

/// Shared substance of every mailbox: the queue, the handler table, the
/// timer scheduler, and the reference-counted lifecycle.
///
/// Application code never touches this directly; it goes through
/// [`super::MailboxOwnerHandle`] and [`super::MailboxHandle`].
pub struct MailboxCore {
    address: MailboxAddress,
    queue: PriorityQueue,
    handlers: DashMap<MessageId, MessageHandler>,
    state: AtomicU8,
    ref_count: AtomicUsize,
    metrics: MailboxMetrics,
    active_timers: AtomicUsize,
    max_active_timers: usize,
    timers: DashMap<TimerId, CancellationToken>,
    reactor: CancellationToken,
    debug_level: AtomicI32,
    lookup: Weak<MailboxLookupService>,
}

impl MailboxCore {
    pub(crate) fn new(
        address: MailboxAddress,
        queue_high_water: usize,
        max_active_timers: usize,
        lookup: Weak<MailboxLookupService>,
        shutdown: &CancellationToken,
    ) -> Arc<Self> {
        Arc::new(Self {
            address,
            queue: PriorityQueue::new(queue_high_water),
            handlers: DashMap::new(),
            state: AtomicU8::new(MailboxState::Constructed as u8),
            // The creating owner handle holds the first reference.
            ref_count: AtomicUsize::new(1),
            metrics: MailboxMetrics::new(),
            active_timers: AtomicUsize::new(0),
            max_active_timers,
            timers: DashMap::new(),
            reactor: shutdown.child_token(),
            debug_level: AtomicI32::new(0),
            lookup,
        })
    }

    /// The mailbox's stable address.
    pub fn address(&self) -> &MailboxAddress {
        &self.address
    }

    /// The mailbox's name (shorthand for the address field).
    pub fn name(&self) -> &str {
        &self.address.mailbox_name
    }

    /// Current lifecycle state.
    pub fn state(&self) -> MailboxState {
        MailboxState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn transition(&self, from: MailboxState, to: MailboxState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Per-mailbox counters.
    pub fn metrics(&self) -> &MailboxMetrics {
        &self.metrics
    }

    /// Debug verbosity knob carried for tooling; not interpreted by the
    /// framework itself.
    pub fn debug_level(&self) -> i32 {
        self.debug_level.load(Ordering::Relaxed)
    }

    pub fn set_debug_level(&self, level: i32) {
        self.debug_level.store(level, Ordering::Relaxed);
    }

    /// Enqueue a message. Never blocks; fails with `InactiveMailbox` before
    /// activation or after deactivation and with `QueueFull` past the
    /// high-water mark.
    pub fn post(&self, message: Arc<dyn Message>) -> Result<(), MsgMgrError> {
        if self.state() != MailboxState::Activated {
            self.metrics.record_dropped();
            return Err(MsgMgrError::InactiveMailbox {
                name: self.name().to_string(),
            });
        }
        match self.queue.push(message) {
            Ok(()) => {
                self.metrics.record_sent();
                Ok(())
            }
            Err(err) => {
                self.metrics.record_dropped();
                Err(err)
            }
        }
    }

    /// Blocking dequeue. Returns `None` once the mailbox leaves the
    /// Activated state (or the process-wide shutdown fires), which is the
    /// dispatcher's signal to exit.
    pub async fn dequeue(&self) -> Option<Arc<dyn Message>> {
        loop {
            if self.state() != MailboxState::Activated || self.reactor.is_cancelled() {
                return None;
            }
            let notified = self.queue.notified();
            if let Some(message) = self.queue.try_pop() {
                self.metrics.record_received();
                return Some(message);
            }
            tokio::select! {
                () = notified => {}
                () = self.reactor.cancelled() => return None,
            }
        }
    }

    /// Bind `handler` to `id`. A duplicate bind overwrites the previous
    /// handler (logged).
    pub fn add_handler(&self, id: MessageId, handler: MessageHandler) {
        if self.handlers.insert(id, handler).is_some() {
            warn!(mailbox = self.name(), %id, "handler overwritten for message id");
        }
    }

    pub(crate) fn handler_for(&self, id: MessageId) -> Option<MessageHandler> {
        self.handlers.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Number of timers currently armed.
    pub fn active_timer_count(&self) -> usize {
        self.active_timers.load(Ordering::Relaxed)
    }

    /// Arm `timer` on this mailbox's reactor.
    ///
    /// On expiration the framework stamps the actual wall-clock time and
    /// posts the timer message onto the ordinary queue; recurring timers
    /// re-arm themselves on their restart interval. The returned id works
    /// with [`MailboxCore::cancel_timer`].
    pub fn schedule_timer(
        self: &Arc<Self>,
        timer: Arc<dyn TimerMessage>,
    ) -> Result<TimerId, MsgMgrError> {
        if self.state() != MailboxState::Activated {
            return Err(MsgMgrError::InactiveMailbox {
                name: self.name().to_string(),
            });
        }

        let armed = self.active_timers.fetch_add(1, Ordering::AcqRel);
        if armed >= self.max_active_timers {
            self.active_timers.fetch_sub(1, Ordering::AcqRel);
            return Err(MsgMgrError::TimerResourceExhausted {
                limit: self.max_active_timers,
            });
        }

        let id = TimerId::new();
        let token = self.reactor.child_token();
        self.timers.insert(id, token.clone());

        let core = Arc::clone(self);
        tokio::spawn(async move {
            let mut delay = timer.timeout();
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    () = tokio::time::sleep(delay) => {}
                }

                timer.set_expiration_time(Utc::now());
                let message: Arc<dyn Message> = Arc::clone(&timer) as Arc<dyn Message>;
                if let Err(err) = core.post(message) {
                    warn!(mailbox = core.name(), %id, %err, "timer expiration post failed");
                    break;
                }
                trace!(mailbox = core.name(), %id, "timer fired");

                match timer.restart_interval() {
                    Some(interval) => delay = interval,
                    None => break,
                }
            }
            core.timers.remove(&id);
            core.active_timers.fetch_sub(1, Ordering::AcqRel);
        });

        Ok(id)
    }

    /// Cancel a pending timer expiration. A timer message already posted to
    /// the queue is still delivered; only the not-yet-fired expiration (and
    /// any future recurrences) are removed. Returns false for unknown ids.
    pub fn cancel_timer(&self, id: TimerId) -> bool {
        match self.timers.remove(&id) {
            Some((_, token)) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub(crate) fn cancel_all_timers(&self) {
        for entry in self.timers.iter() {
            entry.value().cancel();
        }
    }

    /// Pending queue depth.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn reactor_token(&self) -> CancellationToken {
        self.reactor.clone()
    }

    /// Take one more reference (a new handle).
    pub(crate) fn acquire_ref(&self) -> usize {
        self.ref_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Current reference count.
    pub fn ref_count(&self) -> usize {
        self.ref_count.load(Ordering::Acquire)
    }

    /// Drop one reference; on the last one the mailbox deactivates,
    /// deregisters from the lookup service, and is destroyed.
    pub(crate) fn release_ref(self: &Arc<Self>) {
        let remaining = self.ref_count.fetch_sub(1, Ordering::AcqRel) - 1;
        if remaining == 0 {
            self.deactivate_internal();
            if let Some(lookup) = self.lookup.upgrade() {
                lookup.deregister_core(self);
            }
            self.state
                .store(MailboxState::Destroyed as u8, Ordering::Release);
            debug!(mailbox = self.name(), "mailbox destroyed on final release");
        }
    }

    /// Stop accepting posts, discard pending timers, stop the reactor, and
    /// wake every blocked consumer.
    pub(crate) fn deactivate_internal(&self) {
        if self.transition(MailboxState::Activated, MailboxState::Deactivated) {
            self.reactor.cancel();
            self.cancel_all_timers();
            self.queue.notify_waiters();
            debug!(mailbox = self.name(), "mailbox deactivated");
        }
    }

    pub(crate) fn lookup(&self) -> Option<Arc<MailboxLookupService>> {
        self.lookup.upgrade()
    }
}

impl std::fmt::Debug for MailboxCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailboxCore")
            .field("address", &self.address)
            .field("state", &self.state())
            .field("ref_count", &self.ref_count())
            .field("queue_len", &self.queue_len())
            .field("active_timers", &self.active_timer_count())
            .finish()
    }
}
