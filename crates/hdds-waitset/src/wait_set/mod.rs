// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! WaitSet - block on guard conditions, timers and custom waitables.
//!
//! [`WaitSetTemplate`] statically composes a storage policy and a
//! synchronization policy; the common combinations have aliases:
//!
//! | Alias | Storage | Synchronization |
//! |---|---|---|
//! | [`WaitSet`] | [`DynamicStorage`] | [`SequentialSynchronization`] |
//! | [`StaticWaitSet`] | [`StaticStorage`] | [`SequentialSynchronization`] |
//! | [`ThreadSafeWaitSet`] | [`DynamicStorage`] | [`ThreadSafeSynchronization`] |
//!
//! # Example
//!
//! ```rust
//! use hdds_waitset::{Duration, GuardCondition, WaitResultKind, WaitSet};
//! use std::sync::Arc;
//!
//! let gc = Arc::new(GuardCondition::new());
//! let wait_set = WaitSet::new(vec![gc.clone()])?;
//!
//! gc.trigger();
//! let result = wait_set.wait(Duration::from_millis(100))?;
//! assert_eq!(result.kind(), WaitResultKind::Ready);
//! assert!(result.is_guard_condition_ready(&gc)?);
//! # Ok::<(), hdds_waitset::Error>(())
//! ```

use crate::context::Context;
use crate::descriptor::{DescriptorSet, WaitStatus};
use crate::duration::Duration;
use crate::error::{Error, Result};
use crate::guard_condition::GuardCondition;
use crate::storage::{DynamicStorage, InitialEntities, MutableStorage, StaticStorage, StoragePolicy};
use crate::sync::{SequentialSynchronization, SynchronizationPolicy, ThreadSafeSynchronization};
use crate::wait_result::WaitResult;
use crate::waitable::Waitable;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Growable, single-threaded wait set.
pub type WaitSet = WaitSetTemplate<DynamicStorage, SequentialSynchronization>;

/// Fixed-composition, single-threaded wait set.
pub type StaticWaitSet = WaitSetTemplate<StaticStorage, SequentialSynchronization>;

/// Growable wait set whose membership may change while another thread waits.
pub type ThreadSafeWaitSet = WaitSetTemplate<DynamicStorage, ThreadSafeSynchronization>;

/// Wait set composed of storage policy `S` and synchronization policy `Y`.
pub struct WaitSetTemplate<S: StoragePolicy, Y: SynchronizationPolicy> {
    storage: Y::Cell<S>,
    sync: Y,
    context: Arc<Context>,
    /// A wait result currently holds the storage.
    holding: AtomicBool,
}

/// Ownership held over the storage's entities for as long as it lives.
pub(crate) struct OwnershipScope<'a, S: StoragePolicy + 'a, Y: SynchronizationPolicy> {
    pub(crate) guard: Y::Guard<'a, S>,
}

impl<'a, S: StoragePolicy + 'a, Y: SynchronizationPolicy> OwnershipScope<'a, S, Y> {
    fn new(mut guard: Y::Guard<'a, S>) -> Self {
        guard.acquire_ownerships();
        Self { guard }
    }
}

impl<'a, S: StoragePolicy + 'a, Y: SynchronizationPolicy> Drop for OwnershipScope<'a, S, Y> {
    fn drop(&mut self) {
        self.guard.release_ownerships();
    }
}

impl<S: StoragePolicy, Y: SynchronizationPolicy> WaitSetTemplate<S, Y> {
    /// Create a wait set in the default context.
    pub fn new(guard_conditions: Vec<Arc<GuardCondition>>) -> Result<Self> {
        Self::with_context(guard_conditions, Some(Context::default_context()))
    }

    /// Create a wait set bound to `context`.
    ///
    /// Fails with [`Error::InvalidArgument`] when `context` is `None` or has
    /// been shut down.
    pub fn with_context(
        guard_conditions: Vec<Arc<GuardCondition>>,
        context: Option<Arc<Context>>,
    ) -> Result<Self> {
        Self::with_entities(guard_conditions, Vec::new(), context)
    }

    /// Create a wait set holding guard conditions and other waitables.
    pub fn with_entities(
        guard_conditions: Vec<Arc<GuardCondition>>,
        waitables: Vec<Arc<dyn Waitable>>,
        context: Option<Arc<Context>>,
    ) -> Result<Self> {
        let context = context.ok_or(Error::InvalidArgument("context is null"))?;
        if !context.is_valid() {
            return Err(Error::InvalidArgument("context has been shut down"));
        }

        let sync = Y::new(&context);
        let storage = S::new(
            InitialEntities {
                guard_conditions,
                waitables,
                extra_guard_conditions: sync.extra_guard_conditions(),
            },
            &context,
        )?;
        log::debug!("[waitset] created in context {}", context.id());

        Ok(Self {
            storage: Y::new_cell(storage),
            sync,
            context,
            holding: AtomicBool::new(false),
        })
    }

    /// Block until at least one entity is ready or `timeout` elapses.
    ///
    /// - `timeout > 0`: wait at most that long.
    /// - `timeout == 0`: poll once without blocking.
    /// - `timeout < 0`: wait indefinitely; never returns Timeout.
    ///
    /// Returns Empty without blocking when there is nothing to wait on. The
    /// outcomes stay valid until the returned [`WaitResult`] is dropped.
    pub fn wait(&self, timeout: Duration) -> Result<WaitResult<'_, S, Y>> {
        let mut scope = OwnershipScope::<S, Y>::new(self.sync.lock(&self.storage)?);
        let status = self.sync.sync_wait(&mut scope.guard, timeout)?;
        log::trace!("[waitset] wait({}) -> {:?}", timeout, status);

        match status {
            WaitStatus::Ready => WaitResult::ready(self, scope),
            WaitStatus::Timeout => Ok(WaitResult::timeout()),
            WaitStatus::Empty => Ok(WaitResult::empty()),
        }
    }

    /// Read-only access to the descriptor set.
    ///
    /// Its contents are rewritten by every wait; do not rely on them across
    /// calls.
    pub fn with_raw_descriptor_set<R>(&self, f: impl FnOnce(&DescriptorSet) -> R) -> Result<R> {
        self.sync
            .sync_access(&self.storage, |storage| Ok(f(storage.descriptor_set())))
    }

    /// Number of live entities.
    pub fn size(&self) -> Result<usize> {
        self.sync.sync_access(&self.storage, |storage| {
            Ok(storage.guard_conditions().len() + storage.waitables().len())
        })
    }

    /// Live guard conditions, in insertion order.
    pub fn guard_conditions(&self) -> Result<Vec<Arc<GuardCondition>>> {
        self.sync
            .sync_access(&self.storage, |storage| Ok(storage.guard_conditions()))
    }

    /// Live waitables other than guard conditions, in insertion order.
    pub fn waitables(&self) -> Result<Vec<Arc<dyn Waitable>>> {
        self.sync
            .sync_access(&self.storage, |storage| Ok(storage.waitables()))
    }

    #[must_use]
    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    /// Mark the storage as held by a wait result.
    pub(crate) fn wait_result_acquire(&self) -> Result<()> {
        if self.holding.swap(true, Ordering::AcqRel) {
            return Err(Error::AlreadyHolding);
        }
        self.sync.sync_wait_result_acquire();
        Ok(())
    }

    /// Undo [`Self::wait_result_acquire`].
    pub(crate) fn wait_result_release(&self) -> Result<()> {
        if !self.holding.swap(false, Ordering::AcqRel) {
            return Err(Error::NotHolding);
        }
        self.sync.sync_wait_result_release();
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn sync(&self) -> &Y {
        &self.sync
    }
}

impl<S: MutableStorage, Y: SynchronizationPolicy> WaitSetTemplate<S, Y> {
    /// Add a guard condition.
    ///
    /// Fails with [`Error::DuplicateEntity`] if it is already present and
    /// [`Error::InvalidArgument`] if it belongs to another context.
    pub fn add_guard_condition(&self, guard_condition: &Arc<GuardCondition>) -> Result<()> {
        self.sync.sync_add(&self.storage, |storage| {
            storage.add_guard_condition(Arc::clone(guard_condition))
        })?;
        log::debug!("[waitset] added guard condition {}", guard_condition.id());
        Ok(())
    }

    /// Remove a guard condition; [`Error::NotFound`] if it is absent.
    pub fn remove_guard_condition(&self, guard_condition: &Arc<GuardCondition>) -> Result<()> {
        self.sync.sync_remove(&self.storage, |storage| {
            storage.remove_guard_condition(guard_condition)
        })?;
        log::debug!("[waitset] removed guard condition {}", guard_condition.id());
        Ok(())
    }

    pub fn add_waitable(&self, waitable: &Arc<dyn Waitable>) -> Result<()> {
        self.sync
            .sync_add(&self.storage, |storage| storage.add_waitable(Arc::clone(waitable)))?;
        log::debug!("[waitset] added waitable {}", waitable.waitable_id());
        Ok(())
    }

    pub fn remove_waitable(&self, waitable: &Arc<dyn Waitable>) -> Result<()> {
        self.sync
            .sync_remove(&self.storage, |storage| storage.remove_waitable(waitable))?;
        log::debug!("[waitset] removed waitable {}", waitable.waitable_id());
        Ok(())
    }

    /// Drop entities destroyed by their owner since they were added.
    pub fn prune_deleted_entities(&self) -> Result<()> {
        self.sync
            .sync_prune(&self.storage, MutableStorage::prune_deleted_entities)
    }
}
