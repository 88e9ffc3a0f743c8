//! Memory pools.
//!
//! DDD distinguishes two allocator families: persistent memory that lives as
//! long as the context (message-type registrations), and temporary memory
//! scoped to one communication phase (message buffers, Notify scratch).
//! Pools only do the accounting; the bytes themselves are ordinary vectors.
//! A [`Lease`] returns its reservation to the pool when dropped.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

/// Allocator family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemClass {
    /// Lives until the owning context is dropped.
    Persistent,
    /// Released at the end of a communication phase, or earlier.
    Temporary,
}

impl MemClass {
    fn slot(self) -> usize {
        match self {
            MemClass::Persistent => 0,
            MemClass::Temporary => 1,
        }
    }
}

/// Allocator contract: reserve and release byte counts per family.
///
/// Implementations must be thread-safe (Send + Sync).
pub trait MemoryPool: Send + Sync + fmt::Debug {
    /// Try to reserve `bytes`. Returns false if the pool is exhausted.
    fn try_reserve(&self, class: MemClass, bytes: usize) -> bool;

    /// Return `bytes` previously reserved with [`try_reserve`](Self::try_reserve).
    fn release(&self, class: MemClass, bytes: usize);

    /// Bytes currently reserved in a family.
    fn in_use(&self, class: MemClass) -> usize;
}

/// A reservation held against a pool.
#[derive(Debug)]
pub struct Lease {
    pool: Arc<dyn MemoryPool>,
    class: MemClass,
    bytes: usize,
}

impl Lease {
    /// Reserve `bytes` from `pool`, or `None` if the pool is exhausted.
    pub fn acquire(pool: &Arc<dyn MemoryPool>, class: MemClass, bytes: usize) -> Option<Self> {
        if pool.try_reserve(class, bytes) {
            Some(Self {
                pool: Arc::clone(pool),
                class,
                bytes,
            })
        } else {
            None
        }
    }

    /// Reserve `bytes` and hand back a zeroed buffer of that length.
    pub fn buffer(
        pool: &Arc<dyn MemoryPool>,
        class: MemClass,
        bytes: usize,
    ) -> Option<(Self, Vec<u8>)> {
        Self::acquire(pool, class, bytes).map(|lease| (lease, vec![0u8; bytes]))
    }

    pub fn bytes(&self) -> usize {
        self.bytes
    }

}

impl Drop for Lease {
    fn drop(&mut self) {
        self.pool.release(self.class, self.bytes);
    }
}

/// Unbounded pool that only keeps usage counters.
#[derive(Debug, Default)]
pub struct HeapPool {
    used: Mutex<[usize; 2]>,
}

impl HeapPool {
    pub fn new() -> Arc<dyn MemoryPool> {
        Arc::new(Self::default())
    }
}

impl MemoryPool for HeapPool {
    fn try_reserve(&self, class: MemClass, bytes: usize) -> bool {
        let mut used = self.used.lock().unwrap_or_else(PoisonError::into_inner);
        used[class.slot()] += bytes;
        true
    }

    fn release(&self, class: MemClass, bytes: usize) {
        let mut used = self.used.lock().unwrap_or_else(PoisonError::into_inner);
        used[class.slot()] = used[class.slot()].saturating_sub(bytes);
    }

    fn in_use(&self, class: MemClass) -> usize {
        self.used.lock().unwrap_or_else(PoisonError::into_inner)[class.slot()]
    }
}

/// Pool with a fixed byte budget per family.
///
/// Used to put LowComm under memory pressure deterministically.
#[derive(Debug)]
pub struct BudgetPool {
    limits: [usize; 2],
    used: Mutex<[usize; 2]>,
}

impl BudgetPool {
    /// Create a pool with the given persistent and temporary budgets.
    pub fn new(persistent: usize, temporary: usize) -> Arc<Self> {
        Arc::new(Self {
            limits: [persistent, temporary],
            used: Mutex::new([0, 0]),
        })
    }
}

impl MemoryPool for BudgetPool {
    fn try_reserve(&self, class: MemClass, bytes: usize) -> bool {
        let mut used = self.used.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = class.slot();
        match used[slot].checked_add(bytes) {
            Some(total) if total <= self.limits[slot] => {
                used[slot] = total;
                true
            }
            _ => {
                tracing::trace!(?class, bytes, in_use = used[slot], "pool exhausted");
                false
            }
        }
    }

    fn release(&self, class: MemClass, bytes: usize) {
        let mut used = self.used.lock().unwrap_or_else(PoisonError::into_inner);
        used[class.slot()] = used[class.slot()].saturating_sub(bytes);
    }

    fn in_use(&self, class: MemClass) -> usize {
        self.used.lock().unwrap_or_else(PoisonError::into_inner)[class.slot()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lease_releases_on_drop() {
        let budget = BudgetPool::new(0, 100);
        let pool: Arc<dyn MemoryPool> = budget.clone();

        let lease = Lease::acquire(&pool, MemClass::Temporary, 60).unwrap();
        assert_eq!(pool.in_use(MemClass::Temporary), 60);
        assert!(Lease::acquire(&pool, MemClass::Temporary, 50).is_none());

        drop(lease);
        assert_eq!(pool.in_use(MemClass::Temporary), 0);
        assert!(Lease::acquire(&pool, MemClass::Temporary, 50).is_some());
    }

    #[test]
    fn test_budget_families_are_independent() {
        let pool: Arc<dyn MemoryPool> = BudgetPool::new(10, 0);
        assert!(Lease::acquire(&pool, MemClass::Temporary, 1).is_none());
        assert!(Lease::acquire(&pool, MemClass::Persistent, 10).is_some());
    }

    #[test]
    fn test_heap_pool_counts() {
        let pool = HeapPool::new();
        let (lease, buf) = Lease::buffer(&pool, MemClass::Temporary, 32).unwrap();
        assert_eq!(buf.len(), 32);
        assert_eq!(lease.bytes(), 32);
        assert_eq!(pool.in_use(MemClass::Temporary), 32);
        drop(lease);
        assert_eq!(pool.in_use(MemClass::Temporary), 0);
    }
}
