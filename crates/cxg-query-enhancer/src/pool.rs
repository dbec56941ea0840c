//! Per-worker resource pool.
//!
//! Each slot holds one resource (typically an ontology client). A task
//! checks a slot out for its duration and the guard hands it back on drop,
//! so no two tasks ever share a resource concurrently.

use std::ops::Deref;

use cxg_ontology::{OntologyExpander, OntologyResult, OntologyTerm};
use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::error::{EnhancerError, EnhancerResult};

/// Fixed-size pool of resources, checked out one task at a time.
#[derive(Debug)]
pub struct ResourcePool<T> {
    slots: Vec<Mutex<T>>,
    free: Mutex<Vec<usize>>,
    released: Condvar,
}

impl<T> ResourcePool<T> {
    /// Creates a pool owning `resources`.
    ///
    /// # Errors
    ///
    /// Returns an error if `resources` is empty.
    pub fn new(resources: Vec<T>) -> EnhancerResult<Self> {
        if resources.is_empty() {
            return Err(EnhancerError::ThreadPool(
                "resource pool needs at least one slot".to_string(),
            ));
        }
        let free = (0..resources.len()).rev().collect();
        Ok(Self {
            slots: resources.into_iter().map(Mutex::new).collect(),
            free: Mutex::new(free),
            released: Condvar::new(),
        })
    }

    /// Creates a pool of `size` resources built by `make`.
    pub fn from_fn<F, E>(size: usize, mut make: F) -> EnhancerResult<Self>
    where
        F: FnMut(usize) -> Result<T, E>,
        E: Into<EnhancerError>,
    {
        let resources = (0..size)
            .map(|slot| make(slot).map_err(Into::into))
            .collect::<EnhancerResult<Vec<T>>>()?;
        Self::new(resources)
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots not checked out.
    pub fn available(&self) -> usize {
        self.free.lock().len()
    }

    /// Checks out a resource, blocking until one is free.
    pub fn checkout(&self) -> PoolGuard<'_, T> {
        let mut free = self.free.lock();
        let slot = loop {
            if let Some(slot) = free.pop() {
                break slot;
            }
            self.released.wait(&mut free);
        };
        drop(free);

        PoolGuard {
            pool: self,
            slot,
            resource: self.slots[slot].lock(),
        }
    }

    fn release(&self, slot: usize) {
        self.free.lock().push(slot);
        self.released.notify_one();
    }
}

/// A checked-out resource. Returned to the pool on drop.
pub struct PoolGuard<'a, T> {
    pool: &'a ResourcePool<T>,
    slot: usize,
    resource: MutexGuard<'a, T>,
}

impl<T> PoolGuard<'_, T> {
    /// Index of the checked-out slot.
    pub fn slot(&self) -> usize {
        self.slot
    }
}

impl<T> Deref for PoolGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.resource
    }
}

impl<T> Drop for PoolGuard<'_, T> {
    fn drop(&mut self) {
        self.pool.release(self.slot);
    }
}

/// An [`OntologyExpander`] that runs each expansion on a pooled expander.
#[derive(Debug)]
pub struct PooledExpander<E> {
    pool: ResourcePool<E>,
}

impl<E> PooledExpander<E> {
    /// Wraps a pool of expanders.
    pub fn new(pool: ResourcePool<E>) -> Self {
        Self { pool }
    }

    /// Returns the underlying pool.
    pub fn pool(&self) -> &ResourcePool<E> {
        &self.pool
    }
}

impl<E: OntologyExpander> OntologyExpander for PooledExpander<E> {
    fn expand(
        &self,
        term: &str,
        category: &str,
        organism: Option<&str>,
    ) -> OntologyResult<Vec<OntologyTerm>> {
        let expander = self.pool.checkout();
        expander.expand(term, category, organism)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_empty_pool_rejected() {
        let err = ResourcePool::<u32>::new(Vec::new()).unwrap_err();
        assert!(matches!(err, EnhancerError::ThreadPool(_)));
    }

    #[test]
    fn test_checkout_and_release() {
        let pool = ResourcePool::new(vec!["a", "b"]).unwrap();
        assert_eq!(pool.capacity(), 2);
        {
            let first = pool.checkout();
            let second = pool.checkout();
            assert_ne!(first.slot(), second.slot());
            assert_eq!(pool.available(), 0);
        }
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn test_from_fn_propagates_error() {
        let result = ResourcePool::<u32>::from_fn(3, |slot| {
            if slot == 1 {
                Err(EnhancerError::Census("no client".to_string()))
            } else {
                Ok(slot as u32)
            }
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_concurrency_bounded_by_capacity() {
        let pool = Arc::new(ResourcePool::new(vec![(), ()]).unwrap());
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = Arc::clone(&pool);
                let active = Arc::clone(&active);
                let peak = Arc::clone(&peak);
                thread::spawn(move || {
                    let _slot = pool.checkout();
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(5));
                    active.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(pool.available(), 2);
    }

    /// Expander that reports which slot served it.
    struct SlotExpander(usize);

    impl OntologyExpander for SlotExpander {
        fn expand(
            &self,
            term: &str,
            _category: &str,
            _organism: Option<&str>,
        ) -> OntologyResult<Vec<OntologyTerm>> {
            Ok(vec![OntologyTerm::new(term, format!("slot {}", self.0))])
        }
    }

    #[test]
    fn test_pooled_expander() {
        let pool =
            ResourcePool::from_fn(3, |slot| Ok::<_, EnhancerError>(SlotExpander(slot))).unwrap();
        let expander = PooledExpander::new(pool);

        let terms = expander.expand("CL:0000540", "cell_type", None).unwrap();
        assert_eq!(terms[0].id, "CL:0000540");
        assert!(terms[0].label.starts_with("slot "));
        assert_eq!(expander.pool().available(), 3);
    }
}
