//! Object Pool Manager: pre-allocated, reusable object pools.
//!
//! Hot-path objects (message buffers, pooled message payloads) are reserved
//! from homogeneous pools instead of being allocated per use. A reserved
//! object travels inside a [`Pooled`] guard that cleans it and returns it
//! to its pool when dropped, so the dispatcher never needs to know whether
//! a message payload was pooled.
//!
//! An exhausted pool either grows (policy [`GrowthPolicy::Grow`]) or hands
//! back `None`, in which case callers fall back to heap allocation.

pub mod pool;
pub mod registry;

pub use pool::{GrowthPolicy, ObjectPool, Poolable, Pooled};
pub use registry::Opm;

/// Pool id for the shared wire-serialization buffer pool.
pub const MESSAGE_BUFFER_POOL_ID: &str = "msgmgr.message-buffer";
