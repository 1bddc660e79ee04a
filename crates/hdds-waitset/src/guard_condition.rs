// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! GuardCondition - application-triggered waitable.
//!
//! `trigger()` may be called from any thread. The trigger is sticky until a
//! wait observes it, so a trigger that lands between two waits is reported by
//! the next one.

use crate::context::Context;
use crate::rt::WaitsetSignal;
use crate::waitable::{next_waitable_id, SignalHooks, Waitable};
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Manually triggered condition.
pub struct GuardCondition {
    id: u64,
    context: Arc<Context>,
    triggered: AtomicBool,
    hooks: SignalHooks,
}

impl GuardCondition {
    /// Create a guard condition in the default context.
    #[must_use]
    pub fn new() -> Self {
        Self::with_context(Context::default_context())
    }

    /// Create a guard condition bound to `context`.
    #[must_use]
    pub fn with_context(context: Arc<Context>) -> Self {
        Self {
            id: next_waitable_id(),
            context,
            triggered: AtomicBool::new(false),
            hooks: SignalHooks::default(),
        }
    }

    /// Signal the condition and wake every wait set it is attached to.
    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::Release);
        self.hooks.notify();
    }

    /// Peek at the pending trigger without consuming it.
    #[must_use]
    pub fn has_triggered(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[cfg(test)]
    pub(crate) fn hook_count(&self) -> usize {
        self.hooks.len()
    }
}

impl Waitable for GuardCondition {
    fn waitable_id(&self) -> u64 {
        self.id
    }

    fn context(&self) -> &Arc<Context> {
        &self.context
    }

    fn add_waitset_signal(&self, signal: &Arc<dyn WaitsetSignal>) {
        self.hooks.add(signal);
        if self.has_triggered() {
            signal.signal();
        }
    }

    fn remove_waitset_signal(&self, signal_id: u64) {
        self.hooks.remove(signal_id);
    }

    fn poll_ready(&self) -> bool {
        self.triggered.swap(false, Ordering::AcqRel)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Default for GuardCondition {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GuardCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardCondition")
            .field("id", &self.id)
            .field("context", &self.context.id())
            .field("triggered", &self.has_triggered())
            .finish()
    }
}
