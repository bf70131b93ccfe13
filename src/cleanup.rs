//! # LIFO cleanup stack with an exactly-once unwind guarantee.
//!
//! [`CleanupStack`] is the process-wide registry of release actions for a
//! supervision run. Each initialization stage registers its own teardown
//! immediately after the stage succeeds, *before* the next stage runs, so
//! a failure in stage N still releases everything stages 1..N acquired.
//!
//! ## Rules
//! - Registration never discards a previously registered action.
//! - [`CleanupStack::unwind`] executes actions latest-registered first.
//! - A second `unwind()` performs no side effects (atomic guard).
//!
//! ## Example
//! ```
//! use procvisor::CleanupStack;
//!
//! let stack = CleanupStack::new();
//! stack.register(|| println!("released first resource"));
//! stack.register(|| println!("released second resource"));
//! // Prints "second" then "first".
//! stack.unwind();
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// A release action registered with the stack.
type Action = Box<dyn FnOnce() + Send + 'static>;

/// Ordered, idempotent, exactly-once teardown registry.
///
/// Interior-mutable so initializers can register teardowns through a shared
/// reference while the supervisor keeps ownership of the stack itself.
#[derive(Default)]
pub struct CleanupStack {
    actions: Mutex<Vec<Action>>,
    unwound: AtomicBool,
}

impl CleanupStack {
    /// Creates an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `action` to run before every previously registered action.
    ///
    /// Actions registered after this one run before it (LIFO). Registering
    /// after [`unwind`](CleanupStack::unwind) has fired is a silent no-op:
    /// the run is already past `Stopped` and nothing would ever invoke the
    /// action.
    pub fn register(&self, action: impl FnOnce() + Send + 'static) {
        if self.unwound.load(Ordering::Acquire) {
            return;
        }
        // Lock poisoning only happens if an action-registering thread
        // panicked; propagating the panic is the right outcome here.
        let mut actions = self.actions.lock().unwrap();
        actions.push(Box::new(action));
    }

    /// Runs every registered action exactly once, latest-registered first.
    ///
    /// Subsequent calls do nothing.
    pub fn unwind(&self) {
        if self.unwound.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut actions = std::mem::take(&mut *self.actions.lock().unwrap());
        while let Some(action) = actions.pop() {
            action();
        }
    }

    /// Number of actions currently registered and not yet unwound.
    pub fn len(&self) -> usize {
        self.actions.lock().unwrap().len()
    }

    /// Returns `true` if no actions are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for CleanupStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanupStack")
            .field("pending", &self.len())
            .field("unwound", &self.unwound.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn unwind_runs_in_reverse_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let stack = CleanupStack::new();
        for i in 1..=4 {
            let order = Arc::clone(&order);
            stack.register(move || order.lock().unwrap().push(i));
        }

        stack.unwind();
        assert_eq!(*order.lock().unwrap(), vec![4, 3, 2, 1]);
    }

    #[test]
    fn second_unwind_has_no_side_effects() {
        let calls = Arc::new(AtomicUsize::new(0));
        let stack = CleanupStack::new();
        {
            let calls = Arc::clone(&calls);
            stack.register(move || {
                calls.fetch_add(1, Ordering::SeqCst);
            });
        }

        stack.unwind();
        stack.unwind();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn register_after_unwind_is_dropped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let stack = CleanupStack::new();
        stack.unwind();
        {
            let calls = Arc::clone(&calls);
            stack.register(move || {
                calls.fetch_add(1, Ordering::SeqCst);
            });
        }

        stack.unwind();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(stack.is_empty());
    }

    #[test]
    fn registration_never_discards_earlier_actions() {
        let stack = CleanupStack::new();
        stack.register(|| {});
        stack.register(|| {});
        stack.register(|| {});
        assert_eq!(stack.len(), 3);
    }
}
