// Layer 1: Standard library imports
use std::any::Any;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use dashmap::DashMap;
use tracing::{debug, warn};

// Layer 3: Internal module imports
use super::pool::{GrowthPolicy, ObjectPool, Poolable, Pooled};
use crate::error::MsgMgrError;

/// Process-wide registry of object pools, keyed by pool id.
///
/// Explicitly constructed and handed to the framework entry points, so
/// tests can run an isolated pool universe. Pools are heterogeneous; the
/// registry stores them type-erased and hands back typed clones.
///
/// # Example
///
/// ```rust
/// use msgmgr::opm::{GrowthPolicy, Opm, Poolable};
///
/// struct Scratch(Vec<u8>);
/// impl Poolable for Scratch {
///     fn clean(&mut self) {
///         self.0.clear();
///     }
/// }
///
/// let opm = Opm::new();
/// opm.create_pool("scratch", 4, GrowthPolicy::Fixed, || Scratch(Vec::new()))
///     .unwrap();
///
/// let obj = opm.reserve::<Scratch>("scratch").unwrap();
/// drop(obj);
/// ```
#[derive(Debug, Default)]
pub struct Opm {
    pools: DashMap<String, Box<dyn Any + Send + Sync>>,
}

impl Opm {
    /// Create an empty pool registry.
    pub fn new() -> Self {
        Self {
            pools: DashMap::new(),
        }
    }

    /// Create and register a pool under `pool_id`.
    ///
    /// # Errors
    ///
    /// `DuplicateRegistration` if a pool already exists under that id.
    pub fn create_pool<T: Poolable>(
        &self,
        pool_id: &str,
        initial_capacity: usize,
        policy: GrowthPolicy,
        initializer: impl Fn() -> T + Send + Sync + 'static,
    ) -> Result<ObjectPool<T>, MsgMgrError> {
        if self.pools.contains_key(pool_id) {
            warn!(pool = pool_id, "pool already registered");
            return Err(MsgMgrError::DuplicateRegistration {
                name: pool_id.to_string(),
            });
        }

        let pool = ObjectPool::new(pool_id, initial_capacity, policy, initializer);
        self.pools
            .insert(pool_id.to_string(), Box::new(pool.clone()));
        debug!(pool = pool_id, "pool registered");
        Ok(pool)
    }

    /// Look up a pool by id and element type.
    ///
    /// Returns `None` when the id is unknown or registered for a different
    /// element type.
    pub fn pool<T: Poolable>(&self, pool_id: &str) -> Option<ObjectPool<T>> {
        let entry = self.pools.get(pool_id)?;
        match entry.value().downcast_ref::<ObjectPool<T>>() {
            Some(pool) => Some(pool.clone()),
            None => {
                warn!(pool = pool_id, "pool registered with a different element type");
                None
            }
        }
    }

    /// Reserve an object from the named pool.
    ///
    /// `None` when the pool is missing, holds a different type, or is
    /// exhausted under a fixed policy; callers fall back to the heap.
    pub fn reserve<T: Poolable>(&self, pool_id: &str) -> Option<Pooled<T>> {
        self.pool::<T>(pool_id)?.reserve()
    }

    /// Number of registered pools.
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Shared, cheaply clonable handle.
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Scratch(Vec<u8>);

    impl Poolable for Scratch {
        fn clean(&mut self) {
            self.0.clear();
        }
    }

    #[derive(Debug)]
    struct Other(u64);

    impl Poolable for Other {
        fn clean(&mut self) {
            self.0 = 0;
        }
    }

    #[test]
    fn create_and_reserve() {
        let opm = Opm::new();
        opm.create_pool("scratch", 2, GrowthPolicy::Fixed, || Scratch(Vec::new()))
            .unwrap();

        assert_eq!(opm.pool_count(), 1);
        assert!(opm.reserve::<Scratch>("scratch").is_some());
    }

    #[test]
    fn duplicate_pool_id_rejected() {
        let opm = Opm::new();
        opm.create_pool("scratch", 1, GrowthPolicy::Fixed, || Scratch(Vec::new()))
            .unwrap();

        let result =
            opm.create_pool("scratch", 1, GrowthPolicy::Fixed, || Scratch(Vec::new()));
        assert!(matches!(
            result,
            Err(MsgMgrError::DuplicateRegistration { .. })
        ));
    }

    #[test]
    fn wrong_type_lookup_is_none() {
        let opm = Opm::new();
        opm.create_pool("scratch", 1, GrowthPolicy::Fixed, || Scratch(Vec::new()))
            .unwrap();

        assert!(opm.pool::<Other>("scratch").is_none());
        assert!(opm.reserve::<Other>("scratch").is_none());
    }

    #[test]
    fn unknown_pool_is_none() {
        let opm = Opm::new();
        assert!(opm.reserve::<Scratch>("missing").is_none());
    }
}
