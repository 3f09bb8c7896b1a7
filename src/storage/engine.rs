//! Triple-Index Storage Engine
//!
//! This module implements the core storage engine for lexkv: a single-owner,
//! in-process key-value store with per-key TTL and lexicographic range scans.
//!
//! ## Design Decisions
//!
//! 1. **Three coordinated indices**: one primary hash index for O(1) point
//!    lookups, one ordered key index for range scans, one ordered expiry
//!    index so the next entry eligible for expiry is always at the front.
//! 2. **Lazy Expiry**: reads treat an expired entry as absent but never
//!    remove it; reaping happens only through [`remove_one_expired_entry`].
//! 3. **Shared key storage**: keys are `bytes::Bytes`, so the secondary
//!    indices hold reference-counted views of the primary index's key
//!    buffer instead of independent copies.
//! 4. **No internal locking**: the engine is exclusively owned by one
//!    logical caller. Shared use goes through an external lock (see the
//!    [`expiry`](crate::storage::expiry) sweeper for the canonical setup).
//!
//! ## Index Topology
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        StorageEngine                            │
//! │                                                                 │
//! │  primary: HashMap<Bytes, Record>                                │
//! │     key ──> { value, expiry: Option<TtlHandle> }                │
//! │                              │                                  │
//! │                              │ TtlHandle = (expires_at, seq)    │
//! │                              ▼                                  │
//! │  ttl: BTreeMap<TtlHandle, Bytes>      (earliest deadline first) │
//! │                                                                 │
//! │  sorted: BTreeSet<Bytes>              (lexicographic order)     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every mutating call updates all three indices before returning; the
//! indices never disagree at a public-call boundary. A record's `TtlHandle`
//! addresses its expiry-index entry exactly and stays valid no matter what
//! happens to other keys.
//!
//! [`remove_one_expired_entry`]: StorageEngine::remove_one_expired_entry

use bytes::Bytes;
use std::collections::{hash_map, BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;
use std::time::{Duration, Instant};

use crate::clock::{Clock, MonotonicClock};

/// Locates a record's entry in the expiry index.
///
/// Ordered by expiry time, then by insertion sequence; the sequence number
/// keeps entries with identical expiry instants distinct, which gives the
/// expiry index multi-map semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct TtlHandle {
    at: Instant,
    seq: u64,
}

/// A stored value plus its position in the expiry index.
///
/// `expiry` is `Some` if and only if the record has an entry in the expiry
/// index; the handle is consumed exactly once, when this record is removed.
#[derive(Debug)]
struct Record {
    value: Bytes,
    expiry: Option<TtlHandle>,
}

impl Record {
    #[inline]
    fn is_expired(&self, now: Instant) -> bool {
        self.expiry.map(|handle| handle.at <= now).unwrap_or(false)
    }
}

/// The storage engine: a key-value store with per-key TTL and ordered
/// range enumeration.
///
/// Optimized for read-heavy workloads: `get` is O(1) average, range scans
/// are O(log N + k), and mutations are O(log N) in the ordered indices.
///
/// The engine is generic over its time source so tests can control time
/// deterministically; production code uses the default [`MonotonicClock`].
///
/// # TTL Semantics
///
/// A TTL of `Duration::ZERO` means the entry never expires. Any other TTL
/// makes the entry invisible to reads from `now + ttl` onward (the exact
/// deadline counts as expired). Expired entries stay in memory until
/// reaped via [`remove_one_expired_entry`](Self::remove_one_expired_entry)
/// or overwritten/removed explicitly.
///
/// # Example
///
/// ```
/// use lexkv::StorageEngine;
/// use bytes::Bytes;
/// use std::time::Duration;
///
/// let mut engine = StorageEngine::new();
///
/// // Set a key that never expires
/// engine.set(Bytes::from("name"), Bytes::from("Ariz"), Duration::ZERO);
/// assert_eq!(engine.get(b"name"), Some(Bytes::from("Ariz")));
///
/// // Set a key with a 60 second TTL
/// engine.set(Bytes::from("session"), Bytes::from("abc123"), Duration::from_secs(60));
///
/// // Enumerate keys in lexicographic order
/// let entries = engine.get_many_sorted(b"", 10);
/// assert_eq!(entries[0].0, Bytes::from("name"));
/// ```
pub struct StorageEngine<C = MonotonicClock> {
    clock: C,

    /// Primary index: owns the canonical key and value storage.
    primary: HashMap<Bytes, Record>,

    /// Lexicographic key index; holds shared views of the primary keys.
    sorted: BTreeSet<Bytes>,

    /// Expiry index, earliest deadline first; one entry per record with a
    /// finite TTL.
    ttl: BTreeMap<TtlHandle, Bytes>,

    /// Tie-breaker for records expiring at the same instant.
    ttl_seq: u64,
}

impl<C> std::fmt::Debug for StorageEngine<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEngine")
            .field("keys", &self.primary.len())
            .field("with_ttl", &self.ttl.len())
            .finish()
    }
}

impl StorageEngine<MonotonicClock> {
    /// Creates an empty engine backed by the system monotonic clock.
    pub fn new() -> Self {
        Self::with_clock(MonotonicClock)
    }
}

impl Default for StorageEngine<MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> StorageEngine<C> {
    /// Creates an empty engine with a caller-supplied time source.
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            primary: HashMap::new(),
            sorted: BTreeSet::new(),
            ttl: BTreeMap::new(),
            ttl_seq: 0,
        }
    }

    /// Builds a fully-indexed engine from a sequence of
    /// `(key, value, ttl)` triples.
    ///
    /// All TTLs are interpreted relative to a single `now` sampled once at
    /// construction start, not per entry. Later duplicates overwrite
    /// earlier ones, since construction is defined as repeated
    /// [`set`](Self::set). The primary index is pre-sized from the
    /// iterator's size hint to avoid incremental rehashing on large loads.
    ///
    /// # Example
    ///
    /// ```
    /// use lexkv::{MonotonicClock, StorageEngine};
    /// use bytes::Bytes;
    /// use std::time::Duration;
    ///
    /// let engine = StorageEngine::from_entries(
    ///     vec![
    ///         (Bytes::from("user:1"), Bytes::from("alice"), Duration::ZERO),
    ///         (Bytes::from("session:1"), Bytes::from("tok"), Duration::from_secs(60)),
    ///     ],
    ///     MonotonicClock,
    /// );
    /// assert_eq!(engine.len(), 2);
    /// ```
    pub fn from_entries<I>(entries: I, clock: C) -> Self
    where
        I: IntoIterator<Item = (Bytes, Bytes, Duration)>,
    {
        let entries = entries.into_iter();

        let mut engine = Self {
            clock,
            primary: HashMap::with_capacity(entries.size_hint().0),
            sorted: BTreeSet::new(),
            ttl: BTreeMap::new(),
            ttl_seq: 0,
        };

        let now = engine.clock.now();
        for (key, value, ttl) in entries {
            engine.set_at(key, value, ttl, now);
        }

        engine
    }

    /// Assigns `value` to `key`, unconditionally resetting the TTL.
    ///
    /// The previous expiry is discarded even when the new TTL is
    /// `Duration::ZERO` (never expires): after this call the entry's
    /// lifetime depends only on the `ttl` given here. For an existing key
    /// the sorted-index entry is untouched; only the expiry-index entry is
    /// replaced.
    pub fn set(&mut self, key: Bytes, value: Bytes, ttl: Duration) {
        let now = self.clock.now();
        self.set_at(key, value, ttl, now);
    }

    fn set_at(&mut self, key: Bytes, value: Bytes, ttl: Duration, now: Instant) {
        // A deadline past the monotonic horizon is indistinguishable from
        // never expiring, so overflow saturates to None.
        let expires_at = if ttl.is_zero() {
            None
        } else {
            now.checked_add(ttl)
        };

        match self.primary.entry(key) {
            hash_map::Entry::Occupied(mut slot) => {
                let key = slot.key().clone();
                let record = slot.get_mut();
                record.value = value;

                if let Some(stale) = record.expiry.take() {
                    self.ttl.remove(&stale);
                }
                if let Some(at) = expires_at {
                    self.ttl_seq += 1;
                    let handle = TtlHandle {
                        at,
                        seq: self.ttl_seq,
                    };
                    record.expiry = Some(handle);
                    self.ttl.insert(handle, key);
                }
            }
            hash_map::Entry::Vacant(slot) => {
                let key = slot.key().clone();
                let mut expiry = None;

                if let Some(at) = expires_at {
                    self.ttl_seq += 1;
                    let handle = TtlHandle {
                        at,
                        seq: self.ttl_seq,
                    };
                    self.ttl.insert(handle, key.clone());
                    expiry = Some(handle);
                }
                self.sorted.insert(key);
                slot.insert(Record { value, expiry });
            }
        }
    }

    /// Deletes the entry for `key` if present.
    ///
    /// Expiry is not consulted: an expired-but-unreaped entry still counts
    /// as present and is deleted like any other.
    ///
    /// # Returns
    ///
    /// Returns `true` if an entry was deleted, `false` if the key was
    /// absent.
    pub fn remove(&mut self, key: &[u8]) -> bool {
        self.evict(key).is_some()
    }

    /// Gets the value for `key`.
    ///
    /// Returns `None` if the key is absent or its expiry has passed.
    /// Expired entries are *not* removed here; reads are non-mutating and
    /// reaping is the exclusive job of
    /// [`remove_one_expired_entry`](Self::remove_one_expired_entry).
    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        let record = self.primary.get(key)?;
        if record.is_expired(self.clock.now()) {
            return None;
        }
        Some(record.value.clone())
    }

    /// Checks whether `key` is present and not expired.
    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.primary
            .get(key)
            .map(|record| !record.is_expired(self.clock.now()))
            .unwrap_or(false)
    }

    /// Returns up to `count` entries in non-decreasing lexicographic key
    /// order, starting at the first key that is `>= key`.
    ///
    /// The lower bound is inclusive: a stored key equal to `key` is
    /// returned first if it is not expired. Expired entries are skipped
    /// without being counted or removed; the scan continues until `count`
    /// live entries are collected or the sorted index is exhausted.
    pub fn get_many_sorted(&self, key: &[u8], count: usize) -> Vec<(Bytes, Bytes)> {
        let now = self.clock.now();
        let mut result = Vec::with_capacity(count.min(self.primary.len()));

        for stored in self
            .sorted
            .range::<[u8], _>((Bound::Included(key), Bound::Unbounded))
        {
            if result.len() == count {
                break;
            }
            let record = &self.primary[stored];
            if !record.is_expired(now) {
                result.push((stored.clone(), record.value.clone()));
            }
        }

        result
    }

    /// Removes and returns one entry whose expiry has passed: the one with
    /// the earliest deadline currently stored.
    ///
    /// # Returns
    ///
    /// The removed `(key, value)` pair, or `None` if no entry has expired
    /// as of the call's sampled time (in which case nothing is mutated).
    /// When several entries are simultaneously expired, which one is
    /// removed is unspecified; callers must not depend on the order.
    pub fn remove_one_expired_entry(&mut self) -> Option<(Bytes, Bytes)> {
        let (handle, key) = self.ttl.first_key_value()?;
        if handle.at > self.clock.now() {
            return None;
        }

        let key = key.clone();
        let (key, record) = self.evict(&key)?;
        Some((key, record.value))
    }

    /// Returns the number of records physically stored.
    ///
    /// Expired-but-unreaped entries are included: they still own storage
    /// and still count as present for [`remove`](Self::remove).
    pub fn len(&self) -> usize {
        self.primary.len()
    }

    /// Returns `true` if no records are stored.
    pub fn is_empty(&self) -> bool {
        self.primary.is_empty()
    }

    /// Drops every record from all three indices.
    pub fn clear(&mut self) {
        self.primary.clear();
        self.sorted.clear();
        self.ttl.clear();
    }

    /// Erases `key` from all three indices, consuming its handles.
    ///
    /// The expiry handle is used exactly once here; after the primary
    /// record is gone nothing can dereference it again.
    fn evict(&mut self, key: &[u8]) -> Option<(Bytes, Record)> {
        let (key, record) = self.primary.remove_entry(key)?;
        self.sorted.remove(&key);
        if let Some(handle) = record.expiry {
            self.ttl.remove(&handle);
        }
        Some((key, record))
    }

    /// Verifies that the three indices agree. Development aid: an index
    /// mismatch is a defect, never a runtime condition.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        assert_eq!(
            self.primary.len(),
            self.sorted.len(),
            "every primary record must have exactly one sorted-index entry"
        );
        for key in &self.sorted {
            assert!(
                self.primary.contains_key(key),
                "sorted-index entry without a primary record"
            );
        }

        let with_ttl = self
            .primary
            .values()
            .filter(|record| record.expiry.is_some())
            .count();
        assert_eq!(
            with_ttl,
            self.ttl.len(),
            "a record has an expiry-index entry iff its expiry is set"
        );
        for (handle, key) in &self.ttl {
            let record = self
                .primary
                .get(key)
                .expect("expiry-index entry without a primary record");
            assert_eq!(
                record.expiry,
                Some(*handle),
                "stored expiry handle must locate this record's expiry-index entry"
            );
        }
    }
}
