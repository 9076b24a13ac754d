//! Bounded, insertion-ordered record of notifications already sent.
//!
//! The store is shared by every request in the process. All state lives
//! behind a single mutex so the lookup, the in-flight reservation, the insert
//! and the eviction scan are each one critical section.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::domain::NotificationKey;

pub const DEFAULT_MAX_ENTRIES: usize = 100;

#[derive(Debug, Clone, Copy)]
struct Entry {
    notified: bool,
    seq: u64,
    inserted_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<NotificationKey, Entry>,
    /// Insertion sequence -> key; the first entry is the oldest.
    order: BTreeMap<u64, NotificationKey>,
    in_flight: HashSet<NotificationKey>,
    next_seq: u64,
}

impl Inner {
    fn is_notified(&self, key: &NotificationKey) -> bool {
        self.entries.get(key).is_some_and(|entry| entry.notified)
    }

    fn insert(&mut self, key: NotificationKey, max_entries: usize) {
        let seq = self.next_seq;
        self.next_seq += 1;

        let entry = Entry {
            notified: true,
            seq,
            inserted_at: Utc::now(),
        };

        if let Some(previous) = self.entries.insert(key.clone(), entry) {
            self.order.remove(&previous.seq);
        }
        self.order.insert(seq, key);

        if self.entries.len() > max_entries
            && let Some((_, oldest)) = self.order.pop_first()
            && let Some(evicted) = self.entries.remove(&oldest)
        {
            info!(
                key = %oldest,
                inserted_at = %evicted.inserted_at,
                "Evicted oldest notification record"
            );
        }
    }
}

#[derive(Debug)]
pub struct DedupStore {
    inner: Mutex<Inner>,
    max_entries: usize,
}

impl Default for DedupStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl DedupStore {
    /// Creates an empty store. A capacity of zero is raised to one.
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            max_entries: max_entries.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Every mutation leaves `Inner` consistent before it can panic.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub const fn max_entries(&self) -> usize {
        self.max_entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pure lookup.
    #[must_use]
    pub fn already_notified(&self, key: &NotificationKey) -> bool {
        self.lock().is_notified(key)
    }

    /// Records `key` as notified, refreshing its position if it was already
    /// present, then evicts the oldest entry if the store is over capacity.
    pub fn mark_notified(&self, key: NotificationKey) {
        self.lock().insert(key, self.max_entries);
    }

    /// Reserves `key` for one request.
    ///
    /// Returns `None` when the key was already notified or another request
    /// holds a reservation for it. The reservation is released when the
    /// returned claim is dropped without [`DedupClaim::commit`].
    #[must_use]
    pub fn try_claim(self: &Arc<Self>, key: NotificationKey) -> Option<DedupClaim> {
        let mut inner = self.lock();
        if inner.is_notified(&key) || !inner.in_flight.insert(key.clone()) {
            return None;
        }
        drop(inner);

        Some(DedupClaim {
            store: Arc::clone(self),
            key,
            committed: false,
        })
    }
}

/// An in-flight reservation on a [`NotificationKey`].
#[derive(Debug)]
pub struct DedupClaim {
    store: Arc<DedupStore>,
    key: NotificationKey,
    committed: bool,
}

impl DedupClaim {
    /// Marks the key as notified and releases the reservation atomically.
    pub fn commit(mut self) {
        let mut inner = self.store.lock();
        inner.in_flight.remove(&self.key);
        inner.insert(self.key.clone(), self.store.max_entries);
        self.committed = true;
    }
}

impl Drop for DedupClaim {
    fn drop(&mut self) {
        if !self.committed {
            self.store.lock().in_flight.remove(&self.key);
            debug!(key = %self.key, "Released notification claim without recording");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ItemType;
    use std::sync::Barrier;
    use std::thread;

    fn key(name: &str) -> NotificationKey {
        NotificationKey::new(ItemType::Movie, name, Some(2021))
    }

    #[test]
    fn mark_then_lookup() {
        let store = DedupStore::new(10);
        assert!(!store.already_notified(&key("Dune")));

        store.mark_notified(key("Dune"));
        assert!(store.already_notified(&key("Dune")));
        assert!(!store.already_notified(&key("Arrival")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn eviction_keeps_bound_and_drops_oldest() {
        let max = 5;
        let extra = 3;
        let store = DedupStore::new(max);

        for i in 0..max + extra {
            store.mark_notified(key(&format!("movie-{i}")));
            assert!(store.len() <= max);
        }

        assert_eq!(store.len(), max);
        for i in 0..extra {
            assert!(!store.already_notified(&key(&format!("movie-{i}"))));
        }
        for i in extra..max + extra {
            assert!(store.already_notified(&key(&format!("movie-{i}"))));
        }
    }

    #[test]
    fn default_capacity_is_one_hundred() {
        let store = DedupStore::default();
        for i in 0..101 {
            store.mark_notified(key(&format!("movie-{i}")));
        }
        assert_eq!(store.max_entries(), 100);
        assert_eq!(store.len(), 100);
        assert!(!store.already_notified(&key("movie-0")));
    }

    #[test]
    fn overwrite_refreshes_insertion_order() {
        let store = DedupStore::new(2);
        store.mark_notified(key("a"));
        store.mark_notified(key("b"));
        store.mark_notified(key("a"));
        store.mark_notified(key("c"));

        assert!(store.already_notified(&key("a")));
        assert!(!store.already_notified(&key("b")));
        assert!(store.already_notified(&key("c")));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let store = DedupStore::new(0);
        store.mark_notified(key("a"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn claim_blocks_concurrent_duplicate() {
        let store = Arc::new(DedupStore::new(10));
        let first = store.try_claim(key("Dune")).expect("first claim");
        assert!(store.try_claim(key("Dune")).is_none());
        assert!(!store.already_notified(&key("Dune")));

        first.commit();
        assert!(store.already_notified(&key("Dune")));
        assert!(store.try_claim(key("Dune")).is_none());
    }

    #[test]
    fn dropped_claim_allows_retry() {
        let store = Arc::new(DedupStore::new(10));
        let claim = store.try_claim(key("Dune")).expect("claim");
        drop(claim);

        assert!(!store.already_notified(&key("Dune")));
        assert!(store.try_claim(key("Dune")).is_some());
    }

    #[test]
    fn only_one_thread_wins_a_claim() {
        let store = Arc::new(DedupStore::new(10));
        let threads = 8;
        let barrier = Arc::new(Barrier::new(threads));

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    match store.try_claim(key("Dune")) {
                        Some(claim) => {
                            claim.commit();
                            1
                        }
                        None => 0,
                    }
                })
            })
            .collect();

        let winners: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(winners, 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn concurrent_marks_keep_size_accounting() {
        let store = Arc::new(DedupStore::new(50));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..100 {
                        store.mark_notified(key(&format!("t{t}-{i}")));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 50);
        let inner = store.lock();
        assert_eq!(inner.order.len(), inner.entries.len());
    }
}
