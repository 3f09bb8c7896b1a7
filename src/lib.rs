//! # lexkv - An Embeddable In-Memory Key-Value Store
//!
//! lexkv is an in-process key-value store with per-key expiration (TTL) and
//! ordered range enumeration, written in Rust. It is a library core, not a
//! network service: callers link against it directly and issue synchronous
//! calls.
//!
//! ## Features
//!
//! - **Three coordinated indices**: O(1)-average point reads, O(log N)
//!   point mutations, O(log N + k) lexicographic range scans
//! - **TTL Support**: per-key expiry with lazy reads and explicit reaping
//! - **Pluggable Time**: a [`Clock`] abstraction with a manual test clock
//!   for fully deterministic expiry tests
//! - **Optional Active Expiry**: a background Tokio sweeper that drains
//!   expired entries through an external lock
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                             lexkv                                 │
//! │                                                                   │
//! │   ┌──────────┐         ┌──────────────────────────────────────┐   │
//! │   │  Clock   │────────>│            StorageEngine             │   │
//! │   │ (trait)  │   now   │  ┌─────────┐ ┌────────┐ ┌─────────┐  │   │
//! │   └──────────┘         │  │ primary │ │ sorted │ │   ttl   │  │   │
//! │                        │  │ HashMap │ │ BTree  │ │  BTree  │  │   │
//! │                        │  └─────────┘ └────────┘ └─────────┘  │   │
//! │                        └──────────────────────────────────────┘   │
//! │                                          ▲                        │
//! │                                          │ Arc<Mutex<_>>          │
//! │                        ┌─────────────────┴───────────────────┐    │
//! │                        │           ExpirySweeper             │    │
//! │                        │       (background Tokio task)       │    │
//! │                        └─────────────────────────────────────┘    │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use lexkv::StorageEngine;
//! use bytes::Bytes;
//! use std::time::Duration;
//!
//! let mut engine = StorageEngine::new();
//!
//! // A key that never expires (TTL of zero)
//! engine.set(Bytes::from("name"), Bytes::from("Ariz"), Duration::ZERO);
//!
//! // A key that expires in an hour
//! engine.set(
//!     Bytes::from("session"),
//!     Bytes::from("abc123"),
//!     Duration::from_secs(3600),
//! );
//!
//! assert_eq!(engine.get(b"name"), Some(Bytes::from("Ariz")));
//!
//! // Range scan: up to 10 entries starting at the first key >= "m"
//! let entries = engine.get_many_sorted(b"m", 10);
//! assert_eq!(entries.len(), 2);
//!
//! // Explicitly reap one expired entry (none yet)
//! assert_eq!(engine.remove_one_expired_entry(), None);
//! ```
//!
//! ## Module Overview
//!
//! - [`clock`]: the pluggable time source and its two implementations
//! - [`storage`]: the triple-index engine and the background expiry sweeper
//!
//! ## Design Highlights
//!
//! ### Lazy + Optional Active Expiry
//!
//! Reads treat an entry whose deadline has passed as absent but never
//! delete it, which keeps `get` non-mutating and O(1) average. Physical
//! removal happens only through
//! [`remove_one_expired_entry`](StorageEngine::remove_one_expired_entry) —
//! called by the embedding application, or driven by an [`ExpirySweeper`]
//! for callers that want memory reclaimed in the background.
//!
//! ### Shared Key Storage
//!
//! Keys are `bytes::Bytes`. The sorted and expiry indices hold clones that
//! share the primary index's allocation, so a key's bytes exist once no
//! matter how many indices reference it.
//!
//! ### Single-Owner Concurrency Model
//!
//! The engine performs no internal locking; it is built for one logical
//! caller at a time. Shared setups wrap it in a lock — even reads must
//! hold it, since another caller's `set` may rebalance index nodes a
//! concurrent scan is touching.

pub mod clock;
pub mod storage;

// Re-export commonly used types for convenience
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use storage::{start_expiry_sweeper, ExpiryConfig, ExpirySweeper, StorageEngine, SweeperError};

/// Version of lexkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
