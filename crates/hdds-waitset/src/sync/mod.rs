// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Synchronization policies - the concurrency discipline around storage.
//!
//! A policy picks the cell the storage lives in and wraps every mutating or
//! blocking storage operation:
//!
//! - [`SequentialSynchronization`]: `RefCell`, no locking. The wait set is
//!   `!Sync`, and touching the storage while a wait result holds it fails
//!   with [`Error::StorageBusy`](crate::Error::StorageBusy).
//! - [`ThreadSafeSynchronization`]: storage mutex plus an interrupt guard
//!   condition, so add/remove from another thread preempts a blocked wait.

mod sequential;
mod thread_safe;

pub use sequential::SequentialSynchronization;
pub use thread_safe::ThreadSafeSynchronization;

use crate::context::Context;
use crate::descriptor::WaitStatus;
use crate::duration::Duration;
use crate::error::Result;
use crate::guard_condition::GuardCondition;
use crate::storage::StoragePolicy;
use std::ops::DerefMut;
use std::sync::Arc;

/// Concurrency discipline for a wait set.
pub trait SynchronizationPolicy: Sized + Send {
    /// Cell holding the storage.
    type Cell<S: StoragePolicy>;

    /// Exclusive access to the storage inside its cell.
    type Guard<'a, S: StoragePolicy + 'a>: DerefMut<Target = S>;

    fn new(context: &Arc<Context>) -> Self;

    /// Guard conditions the policy needs in every descriptor set.
    fn extra_guard_conditions(&self) -> Vec<Arc<GuardCondition>>;

    fn new_cell<S: StoragePolicy>(storage: S) -> Self::Cell<S>;

    /// Take exclusive access to the storage for a wait.
    fn lock<'a, S: StoragePolicy + 'a>(&self, cell: &'a Self::Cell<S>)
        -> Result<Self::Guard<'a, S>>;

    /// Run `f` on the storage, preempting a blocked wait if needed.
    fn sync_access<S, R, F>(&self, cell: &Self::Cell<S>, f: F) -> Result<R>
    where
        S: StoragePolicy,
        F: FnOnce(&mut S) -> Result<R>;

    fn sync_add<S, F>(&self, cell: &Self::Cell<S>, commit: F) -> Result<()>
    where
        S: StoragePolicy,
        F: FnOnce(&mut S) -> Result<()>,
    {
        self.sync_access(cell, commit)
    }

    fn sync_remove<S, F>(&self, cell: &Self::Cell<S>, commit: F) -> Result<()>
    where
        S: StoragePolicy,
        F: FnOnce(&mut S) -> Result<()>,
    {
        self.sync_access(cell, commit)
    }

    fn sync_prune<S, F>(&self, cell: &Self::Cell<S>, commit: F) -> Result<()>
    where
        S: StoragePolicy,
        F: FnOnce(&mut S),
    {
        self.sync_access(cell, |storage| {
            commit(storage);
            Ok(())
        })
    }

    /// Rebuild and block until readiness, timeout or an empty set.
    fn sync_wait<'a, S: StoragePolicy + 'a>(
        &self,
        guard: &mut Self::Guard<'a, S>,
        timeout: Duration,
    ) -> Result<WaitStatus>;

    /// Called when a wait result starts holding the storage.
    fn sync_wait_result_acquire(&self);

    /// Called when a wait result stops holding the storage.
    fn sync_wait_result_release(&self);
}

/// Rebuild, then run one multiplexed wait unless there is nothing to wait on.
pub(crate) fn wait_once<S: StoragePolicy>(storage: &mut S, timeout: Duration) -> Result<WaitStatus> {
    storage.rebuild_descriptor_set()?;
    if storage.descriptor_set().is_empty() {
        return Ok(WaitStatus::Empty);
    }
    storage.descriptor_set_mut().wait(timeout)
}
