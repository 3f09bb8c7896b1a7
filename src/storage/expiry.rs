//! Background Expiry Sweeper
//!
//! The storage engine is purely lazy about expiry: reads hide expired
//! entries but never delete them, and
//! [`remove_one_expired_entry`](crate::StorageEngine::remove_one_expired_entry)
//! is the only reaping primitive. An entry that expires and is never read
//! again would otherwise stay in memory for the lifetime of the store.
//!
//! This module provides the optional driver for "active expiry": a Tokio
//! task that periodically takes the external lock around the engine and
//! drains a batch of expired entries. Embedding it is a choice, not a
//! requirement; callers with their own event loop can call the reaping
//! primitive themselves on whatever cadence suits them.
//!
//! ## Locking
//!
//! The engine has no internal synchronization, so the sweeper operates on
//! `Arc<Mutex<StorageEngine>>` — the one-exclusive-caller-at-a-time
//! discipline the engine requires, made explicit. The lock is held only for
//! the duration of one reaping batch, never across an await point.
//!
//! ## Adaptive Frequency
//!
//! A tick that fills its whole batch suggests a backlog: the interval is
//! halved (down to a floor). A tick that reaps nothing doubles the interval
//! (up to a ceiling). Anything in between resets to the base interval.

use crate::clock::Clock;
use crate::storage::StorageEngine;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, trace};

/// Configuration for the expiry sweeper.
#[derive(Debug, Clone)]
pub struct ExpiryConfig {
    /// Base interval between sweeps (default: 100ms)
    pub base_interval: Duration,

    /// Minimum interval between sweeps (default: 10ms)
    pub min_interval: Duration,

    /// Maximum interval between sweeps (default: 1s)
    pub max_interval: Duration,

    /// Maximum number of entries reaped per tick (default: 64).
    /// Bounds how long the engine lock is held in one sweep.
    pub max_batch: usize,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_millis(100),
            min_interval: Duration::from_millis(10),
            max_interval: Duration::from_secs(1),
            max_batch: 64,
        }
    }
}

/// Error returned when the sweeper cannot be started.
#[derive(Debug, Error)]
pub enum SweeperError {
    /// The sweeper spawns a background task and therefore needs a running
    /// Tokio runtime on the calling thread.
    #[error("expiry sweeper requires a running tokio runtime")]
    NoRuntime,
}

/// A handle to the running expiry sweeper.
///
/// When this handle is dropped, the sweeper task is stopped.
///
/// # Example
///
/// ```
/// use lexkv::{ExpiryConfig, ExpirySweeper, StorageEngine};
/// use std::sync::{Arc, Mutex};
///
/// #[tokio::main]
/// async fn main() {
///     let engine = Arc::new(Mutex::new(StorageEngine::new()));
///     let sweeper = ExpirySweeper::start(Arc::clone(&engine), ExpiryConfig::default())
///         .expect("runtime is available");
///
///     // Sweeper reaps expired entries in the background...
///
///     // Dropping the handle stops it
///     drop(sweeper);
/// }
/// ```
#[derive(Debug)]
pub struct ExpirySweeper {
    /// Sender to signal shutdown
    shutdown_tx: watch::Sender<bool>,
}

impl ExpirySweeper {
    /// Starts the expiry sweeper as a background task.
    ///
    /// # Arguments
    ///
    /// * `engine` - The shared, externally locked storage engine to sweep
    /// * `config` - Configuration for the sweeper
    ///
    /// # Returns
    ///
    /// A handle that stops the sweeper when dropped, or
    /// [`SweeperError::NoRuntime`] when called outside a Tokio runtime.
    pub fn start<C>(
        engine: Arc<Mutex<StorageEngine<C>>>,
        config: ExpiryConfig,
    ) -> Result<Self, SweeperError>
    where
        C: Clock + Send + 'static,
    {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(SweeperError::NoRuntime);
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(sweeper_loop(engine, config, shutdown_rx));

        info!("background expiry sweeper started");

        Ok(Self { shutdown_tx })
    }

    /// Stops the expiry sweeper.
    ///
    /// This is called automatically when the handle is dropped.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
        info!("background expiry sweeper stopped");
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The main sweeper loop.
async fn sweeper_loop<C>(
    engine: Arc<Mutex<StorageEngine<C>>>,
    config: ExpiryConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) where
    C: Clock + Send + 'static,
{
    let mut current_interval = config.base_interval;

    loop {
        // Wait for the interval or shutdown signal
        tokio::select! {
            _ = tokio::time::sleep(current_interval) => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("expiry sweeper received shutdown signal");
                    return;
                }
            }
        }

        // Reap up to one batch; the lock is released before sleeping again
        let (reaped, keys_remaining) = {
            let mut engine = engine.lock().unwrap();
            let mut reaped = 0usize;
            while reaped < config.max_batch {
                match engine.remove_one_expired_entry() {
                    Some((key, _value)) => {
                        trace!(key = ?key, "reaped expired entry");
                        reaped += 1;
                    }
                    None => break,
                }
            }
            (reaped, engine.len())
        };

        // Adjust interval based on how full the batch was
        if reaped == config.max_batch {
            current_interval = (current_interval / 2).max(config.min_interval);
            debug!(
                reaped,
                new_interval_ms = current_interval.as_millis() as u64,
                "full reaping batch, speeding up sweeper"
            );
        } else if reaped == 0 {
            current_interval = (current_interval * 2).min(config.max_interval);
            trace!(
                new_interval_ms = current_interval.as_millis() as u64,
                "nothing to reap, slowing down sweeper"
            );
        } else {
            current_interval = config.base_interval;
            debug!(reaped, keys_remaining, "expired entries reaped");
        }
    }
}

/// Starts the expiry sweeper with default configuration.
///
/// This is a convenience function for simple use cases.
pub fn start_expiry_sweeper<C>(
    engine: Arc<Mutex<StorageEngine<C>>>,
) -> Result<ExpirySweeper, SweeperError>
where
    C: Clock + Send + 'static,
{
    ExpirySweeper::start(engine, ExpiryConfig::default())
}
