// Layer 1: Standard library imports
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

// Layer 2: Third-party crate imports
use parking_lot::Mutex;
use tracing::{debug, error};

// Layer 3: Internal module imports
// (none)

/// Implemented by types that can live in an object pool.
///
/// `clean` is invoked when the object returns to its pool and must restore
/// it to a reusable state.
pub trait Poolable: Send + 'static {
    fn clean(&mut self);
}

/// What an exhausted pool does on the next reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthPolicy {
    /// Never allocate beyond the initial capacity; `reserve` returns `None`
    /// and the caller falls back to the heap.
    Fixed,
    /// Allocate a fresh object on demand; it joins the pool on release.
    Grow,
}

struct PoolInner<T: Poolable> {
    label: String,
    policy: GrowthPolicy,
    free: Mutex<Vec<Box<T>>>,
    initializer: Box<dyn Fn() -> T + Send + Sync>,
    created: AtomicUsize,
    outstanding: AtomicUsize,
}

/// Homogeneous pool of reusable objects.
///
/// Cheap to clone; all clones share the same storage.
///
/// # Example
///
/// ```rust
/// use msgmgr::opm::{GrowthPolicy, ObjectPool, Poolable};
///
/// struct Scratch(Vec<u8>);
///
/// impl Poolable for Scratch {
///     fn clean(&mut self) {
///         self.0.clear();
///     }
/// }
///
/// let pool = ObjectPool::new("scratch", 2, GrowthPolicy::Fixed, || Scratch(Vec::new()));
/// let mut obj = pool.reserve().unwrap();
/// obj.0.extend_from_slice(b"work");
/// drop(obj); // cleaned and returned
/// assert_eq!(pool.outstanding(), 0);
/// ```
pub struct ObjectPool<T: Poolable> {
    inner: Arc<PoolInner<T>>,
}

impl<T: Poolable> ObjectPool<T> {
    /// Create a pool and pre-allocate `initial_capacity` objects.
    pub fn new(
        label: impl Into<String>,
        initial_capacity: usize,
        policy: GrowthPolicy,
        initializer: impl Fn() -> T + Send + Sync + 'static,
    ) -> Self {
        let label = label.into();
        let free: Vec<Box<T>> = (0..initial_capacity).map(|_| Box::new(initializer())).collect();
        debug!(pool = %label, capacity = initial_capacity, ?policy, "object pool created");
        Self {
            inner: Arc::new(PoolInner {
                label,
                policy,
                free: Mutex::new(free),
                initializer: Box::new(initializer),
                created: AtomicUsize::new(initial_capacity),
                outstanding: AtomicUsize::new(0),
            }),
        }
    }

    /// Reserve an object.
    ///
    /// Returns `None` when the pool is exhausted and the policy is
    /// [`GrowthPolicy::Fixed`]; the caller is expected to fall back to heap
    /// allocation for that use.
    pub fn reserve(&self) -> Option<Pooled<T>> {
        let object = {
            let mut free = self.inner.free.lock();
            free.pop()
        };

        let object = match object {
            Some(object) => object,
            None => match self.inner.policy {
                GrowthPolicy::Grow => {
                    self.inner.created.fetch_add(1, Ordering::Relaxed);
                    debug!(pool = %self.inner.label, "pool grown by one object");
                    Box::new((self.inner.initializer)())
                }
                GrowthPolicy::Fixed => {
                    debug!(pool = %self.inner.label, "pool exhausted");
                    return None;
                }
            },
        };

        self.inner.outstanding.fetch_add(1, Ordering::Relaxed);
        Some(Pooled {
            object: Some(object),
            pool: Arc::downgrade(&self.inner),
        })
    }

    /// Pool label (its registry id).
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Total objects this pool has ever allocated.
    pub fn created(&self) -> usize {
        self.inner.created.load(Ordering::Relaxed)
    }

    /// Objects currently reserved out of the pool.
    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.load(Ordering::Relaxed)
    }

    /// Objects currently available for reservation.
    pub fn available(&self) -> usize {
        self.inner.free.lock().len()
    }

    /// Whether `guard` was reserved from this pool.
    pub fn owns(&self, guard: &Pooled<T>) -> bool {
        guard
            .pool
            .upgrade()
            .is_some_and(|inner| Arc::ptr_eq(&inner, &self.inner))
    }
}

impl<T: Poolable> Clone for ObjectPool<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Poolable> fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectPool")
            .field("label", &self.inner.label)
            .field("policy", &self.inner.policy)
            .field("created", &self.created())
            .field("outstanding", &self.outstanding())
            .finish()
    }
}

/// RAII guard around a pooled object.
///
/// Dereferences to the object; on drop the object is cleaned and returned
/// to its pool (or simply freed if the pool is already gone). Releasing to
/// the wrong pool is impossible by construction; the internal bookkeeping
/// is still checked and any inconsistency is logged rather than escalated.
pub struct Pooled<T: Poolable> {
    object: Option<Box<T>>,
    pool: Weak<PoolInner<T>>,
}

impl<T: Poolable> Deref for Pooled<T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Invariant: `object` is Some until drop.
        match &self.object {
            Some(object) => object,
            None => unreachable!("pooled object accessed after release"),
        }
    }
}

impl<T: Poolable> DerefMut for Pooled<T> {
    fn deref_mut(&mut self) -> &mut T {
        match &mut self.object {
            Some(object) => object,
            None => unreachable!("pooled object accessed after release"),
        }
    }
}

impl<T: Poolable> Drop for Pooled<T> {
    fn drop(&mut self) {
        let Some(mut object) = self.object.take() else {
            return;
        };
        object.clean();

        if let Some(inner) = self.pool.upgrade() {
            inner.outstanding.fetch_sub(1, Ordering::Relaxed);
            let mut free = inner.free.lock();
            if free.len() >= inner.created.load(Ordering::Relaxed) {
                // More releases than reservations would mean a foreign
                // object; diagnose instead of corrupting the free list.
                error!(pool = %inner.label, "release exceeds pool bookkeeping; dropping object");
                return;
            }
            free.push(object);
        }
        // Pool gone: the object is simply freed.
    }
}

impl<T: Poolable + fmt::Debug> fmt::Debug for Pooled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pooled").field(&self.object).finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Counter {
        value: u32,
    }

    impl Poolable for Counter {
        fn clean(&mut self) {
            self.value = 0;
        }
    }

    fn fixed_pool(capacity: usize) -> ObjectPool<Counter> {
        ObjectPool::new("counters", capacity, GrowthPolicy::Fixed, || Counter { value: 0 })
    }

    #[test]
    fn reserve_and_release_round_trip() {
        let pool = fixed_pool(2);
        assert_eq!(pool.available(), 2);

        let mut a = pool.reserve().unwrap();
        a.value = 99;
        assert_eq!(pool.outstanding(), 1);
        assert_eq!(pool.available(), 1);

        drop(a);
        assert_eq!(pool.outstanding(), 0);
        assert_eq!(pool.available(), 2);

        // The returned object was cleaned.
        let b = pool.reserve().unwrap();
        assert_eq!(b.value, 0);
    }

    #[test]
    fn fixed_pool_exhausts() {
        let pool = fixed_pool(1);
        let held = pool.reserve().unwrap();
        assert!(pool.reserve().is_none());
        drop(held);
        assert!(pool.reserve().is_some());
    }

    #[test]
    fn growing_pool_allocates_on_demand() {
        let pool =
            ObjectPool::new("growing", 1, GrowthPolicy::Grow, || Counter { value: 0 });
        let _a = pool.reserve().unwrap();
        let _b = pool.reserve().unwrap();
        assert_eq!(pool.created(), 2);
        assert_eq!(pool.outstanding(), 2);
    }

    #[test]
    fn grown_objects_join_the_pool_on_release() {
        let pool =
            ObjectPool::new("growing", 0, GrowthPolicy::Grow, || Counter { value: 0 });
        let a = pool.reserve().unwrap();
        drop(a);
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn release_after_pool_dropped_is_harmless() {
        let pool = fixed_pool(1);
        let guard = pool.reserve().unwrap();
        drop(pool);
        drop(guard); // pool storage is gone; object is freed
    }

    #[test]
    fn ownership_check() {
        let pool_a = fixed_pool(1);
        let pool_b = fixed_pool(1);
        let guard = pool_a.reserve().unwrap();
        assert!(pool_a.owns(&guard));
        assert!(!pool_b.owns(&guard));
    }
}
