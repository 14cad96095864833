use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

/// Locks ignoring poisoning; accumulator state stays usable even if a
/// producer panicked mid-send.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
