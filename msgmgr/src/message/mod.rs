//! Message model: ids, the polymorphic message trait, and timer messages.
//!
//! Messages travel through the framework as `Arc<dyn Message>`. The
//! dispatcher consumes a message by dropping its reference once the handler
//! returns, so a reusable message simply survives through the clone its
//! creator kept, and a pooled payload returns to its pool when the last
//! reference drops.

pub mod ids;
pub mod timer;
pub mod traits;

pub use ids::{MessageId, MESSAGE_MODULE_MASK, MESSAGE_SUB_ID_MASK};
pub use timer::{BaseTimerMessage, TimerId, TimerMessage, TimerState};
pub use traits::Message;
