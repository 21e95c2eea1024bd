//! # Guarded cell
//!
//! A value behind a lock with a fixed acquisition policy. Every access copies
//! the value in or out while the lock is held and releases it before
//! returning, so no caller can keep a reference into the cell across another
//! blocking call.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::warn;
use parking_lot::Mutex;
use std::time::Duration;
use thiserror::Error;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Default wait applied to cold path records.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A value that can only be accessed through bounded (or explicitly
/// unbounded) lock acquisitions.
#[derive(Debug)]
pub struct Guarded<T> {
    name: &'static str,
    policy: AccessPolicy,
    value: Mutex<T>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// How long an accessor is allowed to wait for the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPolicy {
    /// Wait at most the given duration.
    Bounded(Duration),

    /// Wait for as long as it takes. Only for records which are never touched
    /// from a time critical activity.
    Unbounded,
}

/// Errors raised while accessing a guarded value.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    #[error("The {record} record is unavailable, lock not acquired in time")]
    Unavailable { record: &'static str },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<T> Guarded<T> {
    /// Create a new cell with the default bounded wait.
    pub fn new(name: &'static str, value: T) -> Self {
        Self::with_policy(name, AccessPolicy::Bounded(DEFAULT_LOCK_TIMEOUT), value)
    }

    /// Create a new cell which waits indefinitely for the lock.
    pub fn unbounded(name: &'static str, value: T) -> Self {
        Self::with_policy(name, AccessPolicy::Unbounded, value)
    }

    pub fn with_policy(name: &'static str, policy: AccessPolicy, value: T) -> Self {
        Self {
            name,
            policy,
            value: Mutex::new(value),
        }
    }

    pub fn policy(&self) -> AccessPolicy {
        self.policy
    }

    /// Replace the value.
    pub fn set(&self, value: T) -> Result<(), StoreError> {
        self.modify(|v| *v = value)
    }

    /// Run `f` on the value while holding the lock.
    ///
    /// The closure receives a mutable borrow that cannot outlive the call, so
    /// the lock is always released before this function returns.
    pub fn modify<R, F>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut T) -> R,
    {
        let mut guard = match self.policy {
            AccessPolicy::Bounded(timeout) => match self.value.try_lock_for(timeout) {
                Some(g) => g,
                None => {
                    warn!("Timed out after {:?} waiting for the {} record", timeout, self.name);
                    return Err(StoreError::Unavailable { record: self.name });
                }
            },
            AccessPolicy::Unbounded => self.value.lock(),
        };

        Ok(f(&mut guard))
    }
}

impl<T: Clone> Guarded<T> {
    /// Get a copy of the value.
    pub fn get(&self) -> Result<T, StoreError> {
        self.modify(|v| v.clone())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::{mpsc, Arc};
    use std::thread;

    #[test]
    fn test_copy_in_copy_out() {
        let cell = Guarded::new("test", 1u32);
        cell.set(5).unwrap();
        assert_eq!(cell.get().unwrap(), 5);
        assert_eq!(cell.modify(|v| { *v += 1; *v }).unwrap(), 6);
    }

    #[test]
    fn test_bounded_wait_times_out() {
        let cell = Arc::new(Guarded::with_policy(
            "held",
            AccessPolicy::Bounded(Duration::from_millis(10)),
            0u32,
        ));

        let (locked_tx, locked_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let holder = {
            let cell = cell.clone();
            thread::spawn(move || {
                cell.modify(|_| {
                    locked_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                })
                .unwrap();
            })
        };

        locked_rx.recv().unwrap();
        assert_eq!(cell.get(), Err(StoreError::Unavailable { record: "held" }));

        release_tx.send(()).unwrap();
        holder.join().unwrap();
        assert_eq!(cell.get(), Ok(0));
    }
}
