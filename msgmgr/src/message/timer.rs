// Layer 1: Standard library imports
use std::any::Any;
use std::fmt::{self, Display};
use std::time::Duration;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

// Layer 3: Internal module imports
use super::ids::{MessageId, MSGMGR_BASE_TIMER_ID};
use super::traits::Message;
use crate::address::MailboxAddress;

/// Handle returned by `schedule_timer`, usable with `cancel_timer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(Uuid);

impl TimerId {
    /// Generate a fresh timer id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TimerId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message delivered by the mailbox's timer machinery.
///
/// When the timeout elapses, the framework stamps the *actual* wall-clock
/// expiration time and posts the timer message onto the owning mailbox's
/// ordinary queue, so delivery honors priority and handler binding and the
/// handler can measure queue latency from the stamp.
///
/// A timer with a restart interval is automatically rescheduled after each
/// expiration and is implicitly reusable: implementations must return
/// `true` from [`Message::is_reusable`] when
/// [`TimerMessage::restart_interval`] is `Some`, and the application keeps
/// its own `Arc` clone for the timer's lifetime.
///
/// Implementors embed a [`TimerState`] to satisfy the expiration-stamp
/// accessors; see [`BaseTimerMessage`] for the parameterless concrete form.
pub trait TimerMessage: Message {
    /// Interval after which the timer expires.
    fn timeout(&self) -> Duration;

    /// Interval after which the timer is automatically rescheduled, if any.
    fn restart_interval(&self) -> Option<Duration>;

    /// Stamp the actual expiration time. Called by the framework at fire
    /// time; applications should not call this.
    fn set_expiration_time(&self, at: DateTime<Utc>);

    /// The actual time the timer last expired, once it has fired.
    fn expiration_time(&self) -> Option<DateTime<Utc>>;
}

/// Shared expiration-stamp storage for [`TimerMessage`] implementations.
#[derive(Debug, Default)]
pub struct TimerState {
    expiration: RwLock<Option<DateTime<Utc>>>,
}

impl TimerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_expiration(&self, at: DateTime<Utc>) {
        *self.expiration.write() = Some(at);
    }

    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        *self.expiration.read()
    }
}

/// Concrete timer message for applications that need an expiration without
/// any accompanying parameters.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// use msgmgr::address::MailboxAddress;
/// use msgmgr::message::{BaseTimerMessage, TimerMessage};
///
/// let timer = Arc::new(BaseTimerMessage::new(
///     MailboxAddress::local("poller"),
///     1,
///     Duration::from_secs(5),
///     Some(Duration::from_secs(30)),
/// ));
/// assert_eq!(timer.timeout(), Duration::from_secs(5));
/// assert!(timer.expiration_time().is_none()); // not fired yet
/// ```
#[derive(Debug)]
pub struct BaseTimerMessage {
    source_address: MailboxAddress,
    version: u32,
    timeout: Duration,
    restart_interval: Option<Duration>,
    state: TimerState,
}

impl BaseTimerMessage {
    /// Create a timer. A `Some` restart interval makes it periodically
    /// recurring (and therefore reusable) without re-posting.
    pub fn new(
        source_address: MailboxAddress,
        version: u32,
        timeout: Duration,
        restart_interval: Option<Duration>,
    ) -> Self {
        Self {
            source_address,
            version,
            timeout,
            restart_interval,
            state: TimerState::new(),
        }
    }
}

impl Message for BaseTimerMessage {
    fn message_id(&self) -> MessageId {
        MSGMGR_BASE_TIMER_ID
    }

    fn source_address(&self) -> &MailboxAddress {
        &self.source_address
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn is_reusable(&self) -> bool {
        self.restart_interval.is_some()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl TimerMessage for BaseTimerMessage {
    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn restart_interval(&self) -> Option<Duration> {
        self.restart_interval
    }

    fn set_expiration_time(&self, at: DateTime<Utc>) {
        self.state.set_expiration(at);
    }

    fn expiration_time(&self) -> Option<DateTime<Utc>> {
        self.state.expiration()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_shot() -> BaseTimerMessage {
        BaseTimerMessage::new(
            MailboxAddress::local("test"),
            1,
            Duration::from_millis(50),
            None,
        )
    }

    #[test]
    fn one_shot_timer_is_not_reusable() {
        assert!(!one_shot().is_reusable());
    }

    #[test]
    fn recurring_timer_is_implicitly_reusable() {
        let timer = BaseTimerMessage::new(
            MailboxAddress::local("test"),
            1,
            Duration::from_millis(50),
            Some(Duration::from_millis(100)),
        );
        assert!(timer.is_reusable());
        assert_eq!(timer.restart_interval(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn expiration_stamp_round_trip() {
        let timer = one_shot();
        assert!(timer.expiration_time().is_none());

        let now = Utc::now();
        timer.set_expiration_time(now);
        assert_eq!(timer.expiration_time(), Some(now));
    }

    #[test]
    fn timer_ids_are_unique() {
        assert_ne!(TimerId::new(), TimerId::new());
    }

    #[test]
    fn base_timer_uses_reserved_id() {
        assert_eq!(one_shot().message_id(), MSGMGR_BASE_TIMER_ID);
    }
}
