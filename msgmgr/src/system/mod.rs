//! System assembly: configuration and the explicitly constructed
//! messaging universe.
//!
//! There are no process-wide singletons. A [`MessagingSystem`] owns its
//! own pool registry, message factory, lookup service, and (optionally) a
//! discovery manager, so several isolated universes can coexist in one
//! process, which is exactly what the integration tests do.

pub mod config;
pub mod messaging_system;

pub use config::{
    SystemConfig, DEFAULT_BUFFER_POOL_CAPACITY, DEFAULT_MAX_ACTIVE_TIMERS,
    DEFAULT_QUEUE_HIGH_WATER,
};
pub use messaging_system::MessagingSystem;
