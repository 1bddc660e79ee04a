// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Execution context shared by wait sets and the entities they wait on.
//!
//! A context carries the [`ContextOptions`] used to size waitset drivers and
//! a shutdown flag. Entities remember the context they were created in, and a
//! wait set refuses entities from a different one.

use crate::config::ContextOptions;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

static GLOBAL_DEFAULT_CONTEXT: OnceLock<Arc<Context>> = OnceLock::new();

/// Execution context.
#[derive(Debug)]
pub struct Context {
    id: u64,
    options: ContextOptions,
    shut_down: AtomicBool,
}

impl Context {
    /// Create a new context.
    pub fn new(options: ContextOptions) -> Arc<Self> {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        log::debug!(
            "[context] created id={} name='{}' max_slots={}",
            id,
            options.name,
            options.max_slots
        );

        Arc::new(Self {
            id,
            options,
            shut_down: AtomicBool::new(false),
        })
    }

    /// Process-wide default context (created on first use from the environment).
    pub fn default_context() -> Arc<Self> {
        GLOBAL_DEFAULT_CONTEXT
            .get_or_init(|| Self::new(ContextOptions::from_env()))
            .clone()
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn options(&self) -> &ContextOptions {
        &self.options
    }

    /// `false` once [`Context::shutdown`] has been called.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.shut_down.load(Ordering::Acquire)
    }

    /// Invalidate the context. New wait sets can no longer be created in it.
    pub fn shutdown(&self) {
        if !self.shut_down.swap(true, Ordering::AcqRel) {
            log::debug!("[context] shutdown id={} name='{}'", self.id, self.options.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_context_is_shared() {
        let a = Context::default_context();
        let b = Context::default_context();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.is_valid());
    }

    #[test]
    fn shutdown_invalidates() {
        let ctx = Context::new(ContextOptions::named("shutdown_test"));
        assert!(ctx.is_valid());
        ctx.shutdown();
        ctx.shutdown();
        assert!(!ctx.is_valid());
    }

    #[test]
    fn ids_are_unique() {
        let a = Context::new(ContextOptions::default());
        let b = Context::new(ContextOptions::default());
        assert_ne!(a.id(), b.id());
    }
}
