//! Storage Module
//!
//! This module provides the core storage functionality for lexkv: the
//! triple-index engine and the optional background expiry sweeper.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      StorageEngine                          │
//! │   ┌──────────────┐  ┌──────────────┐  ┌──────────────┐      │
//! │   │   primary    │  │    sorted    │  │     ttl      │      │
//! │   │   HashMap    │  │   BTreeSet   │  │   BTreeMap   │      │
//! │   └──────────────┘  └──────────────┘  └──────────────┘      │
//! └─────────────────────────────────────────────────────────────┘
//!                             ▲
//!                             │ Arc<Mutex<_>>
//!               ┌─────────────┴─────────────┐
//!               │       ExpirySweeper       │
//!               │  (background Tokio task)  │
//!               └───────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use lexkv::StorageEngine;
//! use bytes::Bytes;
//! use std::time::Duration;
//!
//! let mut engine = StorageEngine::new();
//!
//! engine.set(Bytes::from("name"), Bytes::from("Ariz"), Duration::ZERO);
//! assert_eq!(engine.get(b"name"), Some(Bytes::from("Ariz")));
//!
//! // Set with TTL
//! engine.set(
//!     Bytes::from("session"),
//!     Bytes::from("token123"),
//!     Duration::from_secs(3600),
//! );
//! ```

pub mod engine;
pub mod expiry;

#[cfg(test)]
mod proptests;

// Re-export commonly used types
pub use engine::StorageEngine;
pub use expiry::{start_expiry_sweeper, ExpiryConfig, ExpirySweeper, SweeperError};
