//! Ordered observer sets shared by status listeners and event handlers.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::error;

/// Observers in registration order, each under a caller-assigned id.
pub(crate) struct Observers<T: ?Sized> {
    entries: Vec<(u64, Arc<T>)>,
}

impl<T: ?Sized> Observers<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, id: u64, observer: Arc<T>) {
        self.entries.push((id, observer));
    }

    pub(crate) fn remove(&mut self, id: u64) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    /// Copy of the current observers, so they can run without the lock held.
    pub(crate) fn snapshot(&self) -> Vec<Arc<T>> {
        self.entries.iter().map(|(_, observer)| Arc::clone(observer)).collect()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: ?Sized> Default for Observers<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Run one observer callback. A panic is logged and contained so the
/// remaining observers still run.
pub(crate) fn invoke_isolated(label: &str, callback: impl FnOnce()) -> bool {
    match catch_unwind(AssertUnwindSafe(callback)) {
        Ok(()) => true,
        Err(panic) => {
            error!("{label} panicked: {}", panic_message(panic.as_ref()));
            false
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Observer callbacks never run under these locks, so a poisoned lock only
/// means a panic elsewhere; the data is still consistent.
pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
