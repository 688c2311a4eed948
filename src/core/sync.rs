//! Synchronization utilities for robust mutex handling
//!
//! Mutex poisoning is converted into a domain error rather than propagated
//! as a panic, so a panicking resolver on one thread does not take down
//! every other caller of the same queue.

use std::sync::LockResult;

/// Handle poisoned mutex cases with consistent error handling
///
/// Converts a poisoned lock result into an application-specific error using
/// the provided error constructor.
///
/// # Examples
/// ```
/// use std::sync::Mutex;
/// use jobqueue::core::sync::handle_mutex_poison;
/// use jobqueue::queue::QueueError;
///
/// let mutex = Mutex::new(42);
/// let guard = handle_mutex_poison(
///     mutex.lock(),
///     |message| QueueError::LockPoisoned { message }
/// ).unwrap();
/// assert_eq!(*guard, 42);
/// ```
pub fn handle_mutex_poison<T, E>(
    result: LockResult<T>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<T, E> {
    result.map_err(|poison_err| {
        error_constructor(format!(
            "Internal synchronisation error (mutex poisoned). This indicates a panic occurred while holding a lock. PoisonError: {:?}",
            poison_err
        ))
    })
}

/// Recover the guard from a poisoned lock
///
/// Used on teardown paths (drop, destroy, session end) where the protected
/// state must still be released after a panic elsewhere.
pub fn recover_poison<T>(result: LockResult<T>) -> T {
    match result {
        Ok(guard) => guard,
        Err(poison_err) => {
            log::warn!("Recovering state from poisoned lock during teardown");
            poison_err.into_inner()
        }
    }
}
