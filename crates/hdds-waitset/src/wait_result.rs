// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! WaitResult - scoped view of what a wait found ready.
//!
//! A Ready result keeps the wait set's storage locked (or borrowed) and its
//! entities owned until it is dropped, so outcomes cannot be invalidated by a
//! concurrent mutation while they are inspected.

use crate::descriptor::SlotKind;
use crate::error::{Error, Result};
use crate::guard_condition::GuardCondition;
use crate::storage::StoragePolicy;
use crate::sync::SynchronizationPolicy;
use crate::wait_set::{OwnershipScope, WaitSetTemplate};
use crate::waitable::{Waitable, WaitableData};
use std::fmt;
use std::sync::Arc;

/// Outcome of a wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaitResultKind {
    /// At least one entity is ready.
    Ready,
    /// The timeout elapsed with nothing ready.
    Timeout,
    /// There was nothing to wait on.
    Empty,
}

struct ReadyState<'a, S: StoragePolicy + 'a, Y: SynchronizationPolicy> {
    wait_set: &'a WaitSetTemplate<S, Y>,
    scope: OwnershipScope<'a, S, Y>,
}

/// Result of [`WaitSetTemplate::wait`].
pub struct WaitResult<'a, S: StoragePolicy + 'a, Y: SynchronizationPolicy> {
    kind: WaitResultKind,
    ready: Option<ReadyState<'a, S, Y>>,
}

impl<'a, S: StoragePolicy + 'a, Y: SynchronizationPolicy> WaitResult<'a, S, Y> {
    pub(crate) fn ready(
        wait_set: &'a WaitSetTemplate<S, Y>,
        scope: OwnershipScope<'a, S, Y>,
    ) -> Result<Self> {
        wait_set.wait_result_acquire()?;
        Ok(Self {
            kind: WaitResultKind::Ready,
            ready: Some(ReadyState { wait_set, scope }),
        })
    }

    pub(crate) fn timeout() -> Self {
        Self {
            kind: WaitResultKind::Timeout,
            ready: None,
        }
    }

    pub(crate) fn empty() -> Self {
        Self {
            kind: WaitResultKind::Empty,
            ready: None,
        }
    }

    #[must_use]
    pub fn kind(&self) -> WaitResultKind {
        self.kind
    }

    /// Wait set that produced this result (Ready only).
    pub fn wait_set(&self) -> Result<&'a WaitSetTemplate<S, Y>> {
        self.state().map(|state| state.wait_set)
    }

    /// `true` if `guard_condition` was triggered.
    ///
    /// [`Error::NotFound`] if it was not part of the wait.
    pub fn is_guard_condition_ready(&self, guard_condition: &Arc<GuardCondition>) -> Result<bool> {
        self.is_ready_in(SlotKind::GuardCondition, guard_condition.id())
    }

    /// `true` if `waitable` was ready.
    pub fn is_waitable_ready(&self, waitable: &Arc<dyn Waitable>) -> Result<bool> {
        self.is_ready_in(SlotKind::Waitable, waitable.waitable_id())
    }

    /// Triggered guard conditions, in slot order.
    pub fn ready_guard_conditions(&self) -> Result<Vec<Arc<GuardCondition>>> {
        let state = self.state()?;
        let set = state.scope.guard.descriptor_set();
        Ok(state
            .scope
            .guard
            .guard_conditions()
            .into_iter()
            .filter(|gc| {
                set.index_of(SlotKind::GuardCondition, gc.id())
                    .is_some_and(|index| set.is_ready(SlotKind::GuardCondition, index))
            })
            .collect())
    }

    /// Ready waitables, in slot order.
    pub fn ready_waitables(&self) -> Result<Vec<Arc<dyn Waitable>>> {
        let set = self.state()?.scope.guard.descriptor_set();
        Ok((0..set.len(SlotKind::Waitable))
            .filter(|index| set.is_ready(SlotKind::Waitable, *index))
            .filter_map(|index| set.entity(SlotKind::Waitable, index))
            .collect())
    }

    /// Take the extra data of a ready waitable (e.g. a timer's
    /// [`TimerInfo`](crate::TimerInfo)); `None` when not ready or the kind
    /// carries no data.
    pub fn take_data(&self, waitable: &Arc<dyn Waitable>) -> Result<Option<WaitableData>> {
        if self.is_waitable_ready(waitable)? {
            Ok(waitable.take_data())
        } else {
            Ok(None)
        }
    }

    /// Number of ready entities.
    pub fn ready_count(&self) -> Result<usize> {
        Ok(self.state()?.scope.guard.descriptor_set().ready_entity_count())
    }

    fn state(&self) -> Result<&ReadyState<'a, S, Y>> {
        self.ready.as_ref().ok_or(Error::NotReady(self.kind))
    }

    fn is_ready_in(&self, kind: SlotKind, id: u64) -> Result<bool> {
        let set = self.state()?.scope.guard.descriptor_set();
        let index = set.index_of(kind, id).ok_or(Error::NotFound(id))?;
        Ok(set.is_ready(kind, index))
    }
}

impl<'a, S: StoragePolicy + 'a, Y: SynchronizationPolicy> Drop for WaitResult<'a, S, Y> {
    fn drop(&mut self) {
        if let Some(state) = &self.ready {
            if let Err(err) = state.wait_set.wait_result_release() {
                log::error!("[waitset] releasing wait result failed: {}", err);
            }
        }
    }
}

impl<'a, S: StoragePolicy + 'a, Y: SynchronizationPolicy> fmt::Debug for WaitResult<'a, S, Y> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("WaitResult");
        out.field("kind", &self.kind);
        if let Some(state) = &self.ready {
            out.field("ready_count", &state.scope.guard.descriptor_set().ready_entity_count());
        }
        out.finish()
    }
}
