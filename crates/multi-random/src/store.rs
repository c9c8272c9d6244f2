//! Process-wide pool state.
//!
//! A [PoolStore] maps a [Fingerprint] to the state every instance with that
//! fingerprint shares: the pool itself, the refill flag, the outcome of the
//! last refill, and the handle to the pool's keeper. Instances never hold a
//! private copy of a pool; they hold an `Arc` to their entry and do all of
//! their reads and writes through it.
//!
//! Entries are created on first use and live as long as their store. The
//! [global][PoolStore::global] store lives for the life of the process; tests
//! and embedders that want isolation can create their own.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_skiplist::SkipMap;
use once_cell::sync::{Lazy, OnceCell};

use crate::config::PoolOptions;
use crate::hash::Fingerprint;
use crate::keeper::KeeperHandle;
use crate::pool::Pool;

macro_rules! no_poison {
    ($guard:expr) => {
        $guard.expect("pool lock was poisoned: this is a bug in multi-random")
    };
}

/// Keyed storage for shared pools.
#[derive(Debug, Default)]
pub struct PoolStore {
    entries: SkipMap<Fingerprint, Arc<PoolEntry>>,
}

static GLOBAL: Lazy<PoolStore> = Lazy::new(PoolStore::new);

impl PoolStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide store. Entries in this store are never removed.
    pub fn global() -> &'static PoolStore {
        &GLOBAL
    }

    /// Get the entry for a fingerprint, creating it if it doesn't exist.
    ///
    /// The pool parameters of a new entry come from `options`. An existing
    /// entry keeps the parameters it was created with.
    pub(crate) fn entry(&self, fingerprint: &Fingerprint, options: &PoolOptions) -> Arc<PoolEntry> {
        let entry = self.entries.get_or_insert_with(fingerprint.clone(), || {
            tracing::debug!(%fingerprint, "creating pool");
            Arc::new(PoolEntry::new(fingerprint.clone(), options))
        });
        Arc::clone(entry.value())
    }

    /// The number of values pooled for a fingerprint, or `None` if there is
    /// no pool for it.
    pub fn pool_len(&self, fingerprint: &Fingerprint) -> Option<usize> {
        self.entries
            .get(fingerprint)
            .map(|entry| entry.value().pool_len())
    }

    /// A copy of the pool for a fingerprint, or `None` if there is no pool
    /// for it.
    pub fn snapshot(&self, fingerprint: &Fingerprint) -> Option<Pool> {
        self.entries
            .get(fingerprint)
            .map(|entry| entry.value().with_pool(|pool| pool.clone()))
    }

    /// The fingerprints of every pool in this store.
    pub fn fingerprints(&self) -> Vec<Fingerprint> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The refill state of a single pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum RefillState {
    /// No refill has been attempted yet.
    Uninitialized = 0,
    /// A refill is in flight.
    InFlight = 1,
    /// The last refill finished.
    Idle = 2,
}

impl RefillState {
    fn from_u8(n: u8) -> Self {
        match n {
            0 => RefillState::Uninitialized,
            1 => RefillState::InFlight,
            _ => RefillState::Idle,
        }
    }
}

/// The state shared by every instance with the same fingerprint.
#[derive(Debug)]
pub(crate) struct PoolEntry {
    fingerprint: Fingerprint,
    pool: Mutex<Pool>,
    refill: AtomicU8,
    unavailable: AtomicBool,
    keeper: OnceCell<KeeperHandle>,
}

impl PoolEntry {
    fn new(fingerprint: Fingerprint, options: &PoolOptions) -> Self {
        Self {
            fingerprint,
            pool: Mutex::new(Pool::new(options.pool_size, options.buff_percent)),
            refill: AtomicU8::new(RefillState::Uninitialized as u8),
            unavailable: AtomicBool::new(false),
            keeper: OnceCell::new(),
        }
    }

    pub(crate) fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub(crate) fn pool_len(&self) -> usize {
        no_poison!(self.pool.lock()).len()
    }

    pub(crate) fn is_poor(&self) -> bool {
        no_poison!(self.pool.lock()).is_poor()
    }

    /// Take a value from the pool if it isn't poor.
    pub(crate) fn pop_unless_poor(&self) -> Option<f64> {
        let mut pool = no_poison!(self.pool.lock());
        if pool.is_poor() {
            return None;
        }
        pool.pop()
    }

    /// Append a batch of freshly fetched values, returning the number of
    /// values added and the new pool length.
    pub(crate) fn append(&self, batch: Vec<f64>) -> (usize, usize) {
        let mut pool = no_poison!(self.pool.lock());
        let added = pool.extend(batch);
        (added, pool.len())
    }

    pub(crate) fn with_pool<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut Pool) -> T,
    {
        f(&mut no_poison!(self.pool.lock()))
    }

    pub(crate) fn refill_state(&self) -> RefillState {
        RefillState::from_u8(self.refill.load(Ordering::Acquire))
    }

    /// Returns `true` if there's no refill in flight for this pool.
    pub(crate) fn is_ready(&self) -> bool {
        self.refill_state() != RefillState::InFlight
    }

    /// Try to mark a refill as in flight. Returns `false` without changing
    /// anything if a refill is already in flight.
    pub(crate) fn try_start_refill(&self) -> bool {
        self.refill
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |state| {
                (state != RefillState::InFlight as u8).then_some(RefillState::InFlight as u8)
            })
            .is_ok()
    }

    pub(crate) fn finish_refill(&self) {
        self.refill
            .store(RefillState::Idle as u8, Ordering::Release);
    }

    pub(crate) fn is_unavailable(&self) -> bool {
        self.unavailable.load(Ordering::Acquire)
    }

    pub(crate) fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Release);
    }

    pub(crate) fn keeper(&self) -> &OnceCell<KeeperHandle> {
        &self.keeper
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;

    fn options(pool_size: usize, buff_percent: f64) -> PoolOptions {
        PoolOptions {
            pool_size,
            buff_percent,
            keeper_interval: None,
            timeout: Duration::from_secs(1),
            block_size: None,
        }
    }

    #[test]
    fn test_entry_is_shared() {
        let store = PoolStore::new();
        let fp = Fingerprint::new("test", "shared");

        let a = store.entry(&fp, &options(10, 0.5));
        let b = store.entry(&fp, &options(10, 0.5));
        assert!(Arc::ptr_eq(&a, &b));

        a.append(vec![0.5; 8]);
        assert_eq!(b.pool_len(), 8);
        assert_eq!(store.pool_len(&fp), Some(8));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_first_entry_wins() {
        let store = PoolStore::new();
        let fp = Fingerprint::new("test", "first");

        store.entry(&fp, &options(10, 0.5));
        let second = store.entry(&fp, &options(1000, 1.0));

        second.with_pool(|pool| {
            assert_eq!(pool.capacity(), 10);
            assert_eq!(pool.buff_percent(), 0.5);
        });
    }

    #[test]
    fn test_stores_are_isolated() {
        let a = PoolStore::new();
        let b = PoolStore::new();
        let fp = Fingerprint::new("test", "isolated");

        a.entry(&fp, &options(4, 0.5)).append(vec![0.1; 3]);

        assert_eq!(a.pool_len(&fp), Some(3));
        let snapshot = a.snapshot(&fp).unwrap();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.capacity(), 4);
        assert!(b.snapshot(&fp).is_none());
        assert_eq!(b.pool_len(&fp), None);
        assert!(b.is_empty());
    }

    #[test]
    fn test_pop_unless_poor() {
        let store = PoolStore::new();
        let entry = store.entry(&Fingerprint::new("test", "pop"), &options(4, 0.5));

        entry.append(vec![0.1, 0.2, 0.3]);
        assert_eq!(entry.pop_unless_poor(), Some(0.3));
        // two values left, at the watermark
        assert_eq!(entry.pop_unless_poor(), None);
        assert_eq!(entry.pool_len(), 2);
    }

    #[test]
    fn test_refill_flag() {
        let store = PoolStore::new();
        let entry = store.entry(&Fingerprint::new("test", "flag"), &options(4, 0.5));

        assert_eq!(entry.refill_state(), RefillState::Uninitialized);
        assert!(entry.is_ready());

        assert!(entry.try_start_refill());
        assert_eq!(entry.refill_state(), RefillState::InFlight);
        assert!(!entry.is_ready());
        assert!(!entry.try_start_refill(), "a second refill should be skipped");

        entry.finish_refill();
        assert_eq!(entry.refill_state(), RefillState::Idle);
        assert!(entry.try_start_refill());
    }

    #[test]
    fn test_refill_flag_single_winner() {
        let store = PoolStore::new();
        let entry = store.entry(&Fingerprint::new("test", "race"), &options(4, 0.5));

        let winners: usize = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| entry.try_start_refill() as usize))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });

        assert_eq!(winners, 1);
    }
}
