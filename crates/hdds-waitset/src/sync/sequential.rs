// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::{wait_once, SynchronizationPolicy};
use crate::context::Context;
use crate::descriptor::WaitStatus;
use crate::duration::Duration;
use crate::error::{Error, Result};
use crate::guard_condition::GuardCondition;
use crate::storage::StoragePolicy;
use std::cell::{RefCell, RefMut};
use std::sync::Arc;

/// No locking, no interruption.
///
/// Single-threaded use only; the `RefCell` makes the wait set `!Sync`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SequentialSynchronization;

impl SynchronizationPolicy for SequentialSynchronization {
    type Cell<S: StoragePolicy> = RefCell<S>;
    type Guard<'a, S: StoragePolicy + 'a> = RefMut<'a, S>;

    fn new(_context: &Arc<Context>) -> Self {
        Self
    }

    fn extra_guard_conditions(&self) -> Vec<Arc<GuardCondition>> {
        Vec::new()
    }

    fn new_cell<S: StoragePolicy>(storage: S) -> RefCell<S> {
        RefCell::new(storage)
    }

    fn lock<'a, S: StoragePolicy + 'a>(&self, cell: &'a RefCell<S>) -> Result<RefMut<'a, S>> {
        cell.try_borrow_mut().map_err(|_| Error::StorageBusy)
    }

    fn sync_access<S, R, F>(&self, cell: &RefCell<S>, f: F) -> Result<R>
    where
        S: StoragePolicy,
        F: FnOnce(&mut S) -> Result<R>,
    {
        let mut storage = self.lock(cell)?;
        f(&mut *storage)
    }

    fn sync_wait<'a, S: StoragePolicy + 'a>(
        &self,
        guard: &mut RefMut<'a, S>,
        timeout: Duration,
    ) -> Result<WaitStatus> {
        wait_once(&mut **guard, timeout)
    }

    fn sync_wait_result_acquire(&self) {}

    fn sync_wait_result_release(&self) {}
}
