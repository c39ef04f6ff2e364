// Layer 1: Standard library imports
use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use parking_lot::Mutex;
use tokio::sync::futures::Notified;
use tokio::sync::Notify;

// Layer 3: Internal module imports
use crate::error::MsgMgrError;
use crate::message::Message;

struct QueueEntry {
    priority: u32,
    sequence: u64,
    message: Arc<dyn Message>,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    /// Max-heap order: higher priority first, FIFO within one priority.
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

struct QueueInner {
    heap: BinaryHeap<QueueEntry>,
    next_sequence: u64,
}

/// Message queue ordered by (priority descending, enqueue order ascending).
///
/// Pushes never block: once the high-water mark is reached they fail with
/// [`MsgMgrError::QueueFull`] and the caller decides what to do. Consumers
/// pair [`PriorityQueue::try_pop`] with [`PriorityQueue::notified`] to
/// block when empty; each successful push wakes one waiter.
///
/// # Example
///
/// ```rust
/// # use std::any::Any;
/// # use std::sync::Arc;
/// # use msgmgr::address::MailboxAddress;
/// # use msgmgr::mailbox::PriorityQueue;
/// # use msgmgr::message::{Message, MessageId};
/// # #[derive(Debug)]
/// # struct Note { source: MailboxAddress, priority: u32 }
/// # impl Message for Note {
/// #     fn message_id(&self) -> MessageId { MessageId::new(0x0005) }
/// #     fn source_address(&self) -> &MailboxAddress { &self.source }
/// #     fn version(&self) -> u32 { 1 }
/// #     fn priority(&self) -> u32 { self.priority }
/// #     fn as_any(&self) -> &dyn Any { self }
/// # }
/// let queue = PriorityQueue::new(16);
/// let source = MailboxAddress::local("test");
/// queue.push(Arc::new(Note { source: source.clone(), priority: 0 })).unwrap();
/// queue.push(Arc::new(Note { source, priority: 5 })).unwrap();
///
/// // The priority-5 message overtakes the earlier priority-0 one.
/// assert_eq!(queue.try_pop().unwrap().priority(), 5);
/// ```
pub struct PriorityQueue {
    inner: Mutex<QueueInner>,
    notify: Notify,
    high_water: usize,
}

impl PriorityQueue {
    /// Create a queue that rejects posts beyond `high_water` pending
    /// messages.
    pub fn new(high_water: usize) -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                heap: BinaryHeap::new(),
                next_sequence: 0,
            }),
            notify: Notify::new(),
            high_water,
        }
    }

    /// Enqueue a message at its own priority. Never blocks.
    pub fn push(&self, message: Arc<dyn Message>) -> Result<(), MsgMgrError> {
        {
            let mut inner = self.inner.lock();
            if inner.heap.len() >= self.high_water {
                return Err(MsgMgrError::QueueFull {
                    capacity: self.high_water,
                });
            }
            let sequence = inner.next_sequence;
            inner.next_sequence += 1;
            inner.heap.push(QueueEntry {
                priority: message.priority(),
                sequence,
                message,
            });
        }
        self.notify.notify_one();
        Ok(())
    }

    /// Dequeue the highest-priority message, if any.
    pub fn try_pop(&self) -> Option<Arc<dyn Message>> {
        self.inner.lock().heap.pop().map(|entry| entry.message)
    }

    /// Future that resolves when a push (or a wake-all) happens. Create it
    /// *before* the empty check to avoid missed wakeups.
    pub fn notified(&self) -> Notified<'_> {
        self.notify.notified()
    }

    /// Wake every waiting consumer (used on deactivation and shutdown).
    pub fn notify_waiters(&self) {
        self.notify.notify_waiters();
    }

    /// Pending message count.
    pub fn len(&self) -> usize {
        self.inner.lock().heap.len()
    }

    /// True when no messages are pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured high-water mark.
    pub fn high_water(&self) -> usize {
        self.high_water
    }
}

impl std::fmt::Debug for PriorityQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriorityQueue")
            .field("len", &self.len())
            .field("high_water", &self.high_water)
            .finish()
    }
}
