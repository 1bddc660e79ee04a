// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Capability contract for anything a wait set can block on.

use crate::context::Context;
use crate::rt::WaitsetSignal;
use parking_lot::Mutex;
use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

/// Payload returned by [`Waitable::take_data`].
pub type WaitableData = Box<dyn Any + Send>;

/// Waitable entity.
///
/// A wait set attaches one [`WaitsetSignal`] per entity while it is part of
/// the descriptor set. Implementations call `signal()` on every attached
/// hook when they become ready so a blocked wait wakes up.
pub trait Waitable: Send + Sync {
    /// Unique identifier (used for duplicate detection and lookups).
    fn waitable_id(&self) -> u64;

    /// Context the entity was created in.
    fn context(&self) -> &Arc<Context>;

    /// Register a waitset signal so this entity can wake blocked waiters.
    fn add_waitset_signal(&self, signal: &Arc<dyn WaitsetSignal>);

    /// Remove a previously registered waitset signal.
    fn remove_waitset_signal(&self, signal_id: u64);

    /// Readiness probe evaluated by the wait set while waiting.
    ///
    /// Edge-triggered kinds (guard conditions) consume their trigger here.
    fn poll_ready(&self) -> bool;

    /// Earliest instant at which the entity becomes ready on its own.
    fn next_deadline(&self) -> Option<Instant> {
        None
    }

    /// Extra data associated with a ready entity.
    fn take_data(&self) -> Option<WaitableData> {
        None
    }

    /// Downcast support.
    fn as_any(&self) -> &dyn Any;
}

/// Allocate a process-unique waitable id.
pub(crate) fn next_waitable_id() -> u64 {
    static NEXT_ID: AtomicU64 = AtomicU64::new(1);
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

struct WaitsetHook {
    id: u64,
    signal: Weak<dyn WaitsetSignal>,
}

/// Weak waitset hooks kept by an entity.
#[derive(Default)]
pub(crate) struct SignalHooks {
    hooks: Mutex<Vec<WaitsetHook>>,
}

impl SignalHooks {
    pub(crate) fn add(&self, signal: &Arc<dyn WaitsetSignal>) {
        let mut hooks = self.hooks.lock();
        hooks.retain(|hook| hook.signal.strong_count() > 0);
        hooks.push(WaitsetHook {
            id: signal.id(),
            signal: Arc::downgrade(signal),
        });
    }

    pub(crate) fn remove(&self, signal_id: u64) {
        self.hooks.lock().retain(|hook| hook.id != signal_id);
    }

    /// Signal every live hook, dropping dead ones.
    pub(crate) fn notify(&self) {
        self.hooks.lock().retain(|hook| {
            if let Some(signal) = hook.signal.upgrade() {
                signal.signal();
                true
            } else {
                false
            }
        });
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.hooks.lock().len()
    }
}
