//! New-block and fork handler traits + registry.
//!
//! Handlers are registered before the tracker starts polling and are invoked
//! serially from the poll task after each successful repair. They are
//! infallible from the tracker's viewpoint and must not block the task for
//! long.

use std::collections::HashMap;
use std::sync::Arc;

/// Trait for consumers that want to hear about every newly observed block.
///
/// During a catch-up run the tracker passes the post-repair tip hash for each
/// intermediate block, not that block's own hash. Consumers must not assume
/// per-block hash accuracy here; the window itself is the source of truth.
pub trait NewLatestHandler: Send + Sync {
    fn on_new_latest(&self, block_number: i64, tip_hash: &str);

    /// Stable identifier for this handler; later registrations under the same
    /// descriptor replace earlier ones.
    fn descriptor(&self) -> &str;
}

/// Trait for consumers that want to hear about detected forks.
pub trait ForkHandler: Send + Sync {
    fn on_fork(&self, block_number: i64);

    fn descriptor(&self) -> &str;
}

/// Registry of new-block and fork handlers, keyed by descriptor.
#[derive(Default)]
pub struct HandlerRegistry {
    new_latest: HashMap<String, Arc<dyn NewLatestHandler>>,
    fork: HashMap<String, Arc<dyn ForkHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new-block handler under its descriptor.
    pub fn on_new_latest(&mut self, handler: Arc<dyn NewLatestHandler>) {
        self.new_latest
            .insert(handler.descriptor().to_string(), handler);
    }

    /// Register a fork handler under its descriptor.
    pub fn on_fork(&mut self, handler: Arc<dyn ForkHandler>) {
        self.fork.insert(handler.descriptor().to_string(), handler);
    }

    pub fn is_empty(&self) -> bool {
        self.new_latest.is_empty() && self.fork.is_empty()
    }

    /// Dispatch one newly observed block to all new-block handlers.
    pub fn dispatch_new_latest(&self, block_number: i64, tip_hash: &str) {
        for handler in self.new_latest.values() {
            handler.on_new_latest(block_number, tip_hash);
        }
    }

    /// Dispatch a detected fork to all fork handlers.
    pub fn dispatch_fork(&self, block_number: i64) {
        for handler in self.fork.values() {
            handler.on_fork(block_number);
        }
    }
}

// ─── Closure adapters ─────────────────────────────────────────────────────────

/// Adapter turning a closure into a [`NewLatestHandler`].
pub struct NewLatestFn<F> {
    descriptor: String,
    f: F,
}

impl<F: Fn(i64, &str) + Send + Sync> NewLatestFn<F> {
    pub fn new(descriptor: impl Into<String>, f: F) -> Arc<Self> {
        Arc::new(Self {
            descriptor: descriptor.into(),
            f,
        })
    }
}

impl<F: Fn(i64, &str) + Send + Sync> NewLatestHandler for NewLatestFn<F> {
    fn on_new_latest(&self, block_number: i64, tip_hash: &str) {
        (self.f)(block_number, tip_hash)
    }

    fn descriptor(&self) -> &str {
        &self.descriptor
    }
}

/// Adapter turning a closure into a [`ForkHandler`].
pub struct ForkFn<F> {
    descriptor: String,
    f: F,
}

impl<F: Fn(i64) + Send + Sync> ForkFn<F> {
    pub fn new(descriptor: impl Into<String>, f: F) -> Arc<Self> {
        Arc::new(Self {
            descriptor: descriptor.into(),
            f,
        })
    }
}

impl<F: Fn(i64) + Send + Sync> ForkHandler for ForkFn<F> {
    fn on_fork(&self, block_number: i64) {
        (self.f)(block_number)
    }

    fn descriptor(&self) -> &str {
        &self.descriptor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn dispatch_reaches_registered_handler() {
        let count = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&count);
        let mut registry = HandlerRegistry::new();
        registry.on_new_latest(NewLatestFn::new("counter", move |_, _| {
            seen.fetch_add(1, Ordering::Relaxed);
        }));

        registry.dispatch_new_latest(101, "h101");
        registry.dispatch_new_latest(102, "h102");
        registry.dispatch_fork(102); // no fork handler registered

        assert_eq!(count.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn same_descriptor_replaces() {
        let first = Arc::new(AtomicU32::new(0));
        let second = Arc::new(AtomicU32::new(0));
        let mut registry = HandlerRegistry::new();

        let seen = Arc::clone(&first);
        registry.on_fork(ForkFn::new("rewards", move |_| {
            seen.fetch_add(1, Ordering::Relaxed);
        }));
        let seen = Arc::clone(&second);
        registry.on_fork(ForkFn::new("rewards", move |_| {
            seen.fetch_add(1, Ordering::Relaxed);
        }));

        registry.dispatch_fork(104);
        assert_eq!(first.load(Ordering::Relaxed), 0);
        assert_eq!(second.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn empty_registry() {
        let registry = HandlerRegistry::new();
        assert!(registry.is_empty());
        // Dispatching with no handlers is a no-op.
        registry.dispatch_new_latest(1, "h1");
        registry.dispatch_fork(1);
    }
}
