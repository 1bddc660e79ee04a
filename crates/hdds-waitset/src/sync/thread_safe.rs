// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Thread-safe synchronization with wait interruption.
//!
//! The storage lives in a mutex that a waiter holds for the whole wait. A
//! mutator first registers itself as pending; if a waiter is blocked it
//! triggers the interrupt guard condition, which sits in every descriptor
//! set as an extra slot. The woken waiter sees only the interrupt, hands the
//! storage lock over fairly, parks until the mutations registered so far have
//! finished, re-locks, rebuilds and waits again with what is left of its
//! budget. The budget runs from a deadline fixed on entry, so time spent
//! servicing mutations is charged to the wait.
//!
//! Lock order: `state` is never held while blocking on the storage mutex.

use super::SynchronizationPolicy;
use crate::context::Context;
use crate::descriptor::WaitStatus;
use crate::duration::Duration;
use crate::error::{Error, Result};
use crate::guard_condition::GuardCondition;
use crate::storage::StoragePolicy;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Instant;

#[derive(Default)]
struct SyncState {
    /// Mutators registered so far.
    started_mutations: u64,
    /// Mutators finished so far.
    finished_mutations: u64,
    /// A waiter is blocked in the multiplexed wait.
    waiting: bool,
    /// Thread holding the storage through a wait result.
    result_holder: Option<ThreadId>,
}

/// Mutex-guarded storage with interruptible waits.
pub struct ThreadSafeSynchronization {
    interrupt: Arc<GuardCondition>,
    state: Mutex<SyncState>,
    mutations_done: Condvar,
}

/// Pending mutation registration; finishing it wakes parked waiters.
struct PendingMutation<'a> {
    sync: &'a ThreadSafeSynchronization,
}

impl Drop for PendingMutation<'_> {
    fn drop(&mut self) {
        self.sync.state.lock().finished_mutations += 1;
        self.sync.mutations_done.notify_all();
    }
}

impl SyncState {
    fn has_pending(&self) -> bool {
        self.started_mutations > self.finished_mutations
    }
}

impl ThreadSafeSynchronization {
    fn check_not_holding(state: &SyncState) -> Result<()> {
        if state.result_holder == Some(thread::current().id()) {
            return Err(Error::StorageBusy);
        }
        Ok(())
    }

    fn begin_mutation(&self) -> Result<PendingMutation<'_>> {
        let interrupt_waiter = {
            let mut state = self.state.lock();
            Self::check_not_holding(&state)?;
            state.started_mutations += 1;
            state.waiting
        };
        if interrupt_waiter {
            log::debug!("[waitset] interrupting blocked wait for pending mutation");
            self.interrupt.trigger();
        }
        Ok(PendingMutation { sync: self })
    }

    /// Park with the storage unlocked until every mutation registered so far
    /// has finished. Later arrivals do not extend the pause.
    fn service_mutations<S>(&self, guard: &mut MutexGuard<'_, S>) {
        MutexGuard::unlocked_fair(guard, || {
            let mut state = self.state.lock();
            let target = state.started_mutations;
            while state.finished_mutations < target {
                self.mutations_done.wait(&mut state);
            }
        });
    }

    fn has_pending(&self) -> bool {
        self.state.lock().has_pending()
    }

    #[cfg(test)]
    pub(crate) fn interrupt(&self) -> &Arc<GuardCondition> {
        &self.interrupt
    }
}

impl SynchronizationPolicy for ThreadSafeSynchronization {
    type Cell<S: StoragePolicy> = Mutex<S>;
    type Guard<'a, S: StoragePolicy + 'a> = MutexGuard<'a, S>;

    fn new(context: &Arc<Context>) -> Self {
        Self {
            interrupt: Arc::new(GuardCondition::with_context(Arc::clone(context))),
            state: Mutex::new(SyncState::default()),
            mutations_done: Condvar::new(),
        }
    }

    fn extra_guard_conditions(&self) -> Vec<Arc<GuardCondition>> {
        vec![Arc::clone(&self.interrupt)]
    }

    fn new_cell<S: StoragePolicy>(storage: S) -> Mutex<S> {
        Mutex::new(storage)
    }

    fn lock<'a, S: StoragePolicy + 'a>(&self, cell: &'a Mutex<S>) -> Result<MutexGuard<'a, S>> {
        Self::check_not_holding(&self.state.lock())?;
        Ok(cell.lock())
    }

    fn sync_access<S, R, F>(&self, cell: &Mutex<S>, f: F) -> Result<R>
    where
        S: StoragePolicy,
        F: FnOnce(&mut S) -> Result<R>,
    {
        let _pending = self.begin_mutation()?;
        let mut storage = cell.lock();
        f(&mut *storage)
    }

    fn sync_wait<'a, S: StoragePolicy + 'a>(
        &self,
        guard: &mut MutexGuard<'a, S>,
        timeout: Duration,
    ) -> Result<WaitStatus> {
        let deadline = timeout.deadline_from(Instant::now());
        let mut interruptions = 0u32;

        loop {
            if self.has_pending() {
                self.service_mutations(guard);
            }

            guard.rebuild_descriptor_set()?;
            if guard.descriptor_set().is_empty() {
                return Ok(WaitStatus::Empty);
            }

            let remaining = Duration::remaining_until(deadline, Instant::now());
            // with mutations queued, poll without blocking and go service them;
            // once the budget is spent, the poll is final
            let deferred = {
                let mut state = self.state.lock();
                let deferred = state.has_pending() && !remaining.is_zero();
                state.waiting = !deferred;
                deferred
            };
            let budget = if deferred { Duration::ZERO } else { remaining };
            let status = guard.descriptor_set_mut().wait(budget);
            if !deferred {
                self.state.lock().waiting = false;
            }

            match status? {
                WaitStatus::Ready if guard.descriptor_set().ready_entity_count() > 0 => {
                    if interruptions > 0 {
                        log::trace!("[waitset] ready after {} interruption(s)", interruptions);
                    }
                    return Ok(WaitStatus::Ready);
                }
                // only the interrupt fired
                WaitStatus::Ready => interruptions += 1,
                WaitStatus::Timeout if deferred => interruptions += 1,
                WaitStatus::Timeout => return Ok(WaitStatus::Timeout),
                WaitStatus::Empty => return Ok(WaitStatus::Empty),
            }
        }
    }

    fn sync_wait_result_acquire(&self) {
        self.state.lock().result_holder = Some(thread::current().id());
    }

    fn sync_wait_result_release(&self) {
        self.state.lock().result_holder = None;
    }
}
