// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Descriptor set - the flattened view a wait blocks on.
//!
//! Storage policies rebuild this from their slots whenever membership
//! changes. Each descriptor owns one [`WaitsetDriver`] slot whose signal is
//! attached to the entity, and keeps only a weak back-reference: ownership
//! during a wait is the storage policy's job.
//!
//! [`DescriptorSet::wait`] is the multiplexed wait: probe every descriptor,
//! and if nothing is ready block on the driver until a signal, the nearest
//! timer deadline or the caller's timeout, then probe again.

use crate::duration::Duration;
use crate::error::Result;
use crate::rt::{DriverWake, WaitsetDriver, WaitsetSignal};
use crate::waitable::Waitable;
use std::sync::{Arc, Weak};
use std::time::Instant;

/// Entity categories held by a wait set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    /// User guard conditions.
    GuardCondition,
    /// Any other [`Waitable`] (timers, custom kinds).
    Waitable,
    /// Guard conditions contributed by the synchronization policy.
    Extra,
}

impl SlotKind {
    const ALL: [SlotKind; 3] = [SlotKind::GuardCondition, SlotKind::Waitable, SlotKind::Extra];

    fn index(self) -> usize {
        match self {
            SlotKind::GuardCondition => 0,
            SlotKind::Waitable => 1,
            SlotKind::Extra => 2,
        }
    }
}

/// Raw outcome of a multiplexed wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    /// At least one descriptor is ready.
    Ready,
    /// The timeout elapsed.
    Timeout,
    /// There was nothing to wait on.
    Empty,
}

struct Descriptor {
    id: u64,
    entity: Weak<dyn Waitable>,
    slot_index: usize,
    slot_id: u64,
    signal: Arc<dyn WaitsetSignal>,
}

#[derive(Default)]
struct SlotDescriptors {
    entries: Vec<Descriptor>,
    ready: Vec<bool>,
}

/// Flattened descriptor set handed to the blocking driver.
pub struct DescriptorSet {
    driver: WaitsetDriver,
    slots: [SlotDescriptors; 3],
}

impl DescriptorSet {
    /// Create an empty set with a driver of `max_slots` capacity.
    pub fn new(max_slots: usize) -> Result<Self> {
        Ok(Self {
            driver: WaitsetDriver::new(max_slots)?,
            slots: Default::default(),
        })
    }

    /// Append a descriptor for `entity` to `kind`.
    pub fn add(&mut self, kind: SlotKind, entity: &Arc<dyn Waitable>) -> Result<()> {
        let registration = self.driver.register_slot()?;
        let signal = registration.signal();
        entity.add_waitset_signal(&signal);

        let slot = &mut self.slots[kind.index()];
        slot.entries.push(Descriptor {
            id: entity.waitable_id(),
            entity: Arc::downgrade(entity),
            slot_index: registration.slot_index(),
            slot_id: registration.slot_id(),
            signal,
        });
        slot.ready.push(false);
        Ok(())
    }

    /// Detach every descriptor and release its driver slot.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            for descriptor in slot.entries.drain(..) {
                if let Some(entity) = descriptor.entity.upgrade() {
                    entity.remove_waitset_signal(descriptor.signal.id());
                }
                self.driver
                    .unregister_slot(descriptor.slot_index, descriptor.slot_id);
            }
            slot.ready.clear();
        }
    }

    /// Forget the outcomes of the previous wait.
    pub fn reset_ready(&mut self) {
        for slot in &mut self.slots {
            slot.ready.fill(false);
        }
    }

    /// Number of descriptors in `kind`.
    #[must_use]
    pub fn len(&self, kind: SlotKind) -> usize {
        self.slots[kind.index()].entries.len()
    }

    /// Number of user descriptors (everything but [`SlotKind::Extra`]).
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.len(SlotKind::GuardCondition) + self.len(SlotKind::Waitable)
    }

    /// `true` when there is no user descriptor to wait on.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entity_count() == 0
    }

    /// Outcome of the last wait for `index` in `kind`.
    #[must_use]
    pub fn is_ready(&self, kind: SlotKind, index: usize) -> bool {
        self.slots[kind.index()]
            .ready
            .get(index)
            .copied()
            .unwrap_or(false)
    }

    /// Number of ready user descriptors after the last wait.
    #[must_use]
    pub fn ready_entity_count(&self) -> usize {
        [SlotKind::GuardCondition, SlotKind::Waitable]
            .iter()
            .map(|kind| self.slots[kind.index()].ready.iter().filter(|r| **r).count())
            .sum()
    }

    /// Position of the entity with `id` in `kind`.
    #[must_use]
    pub fn index_of(&self, kind: SlotKind, id: u64) -> Option<usize> {
        self.slots[kind.index()]
            .entries
            .iter()
            .position(|descriptor| descriptor.id == id)
    }

    /// Entity at `index` in `kind`, if still alive.
    #[must_use]
    pub fn entity(&self, kind: SlotKind, index: usize) -> Option<Arc<dyn Waitable>> {
        self.slots[kind.index()]
            .entries
            .get(index)
            .and_then(|descriptor| descriptor.entity.upgrade())
    }

    /// Driver capacity.
    #[must_use]
    pub fn max_slots(&self) -> usize {
        self.driver.max_slots()
    }

    /// Block until a descriptor is ready or `timeout` elapses.
    ///
    /// `timeout < 0` waits forever, `== 0` probes once.
    pub fn wait(&mut self, timeout: Duration) -> Result<WaitStatus> {
        if self.slots.iter().all(|slot| slot.entries.is_empty()) {
            return Ok(WaitStatus::Empty);
        }

        let deadline = timeout.deadline_from(Instant::now());
        loop {
            if self.probe() {
                return Ok(WaitStatus::Ready);
            }

            let now = Instant::now();
            if deadline.is_some_and(|deadline| now >= deadline) {
                return Ok(WaitStatus::Timeout);
            }

            let mut budget = deadline.map(|deadline| deadline - now);
            if let Some(timer_deadline) = self.next_deadline() {
                let until_timer = timer_deadline.saturating_duration_since(now);
                budget = Some(budget.map_or(until_timer, |b| b.min(until_timer)));
            }

            match self.driver.wait(budget)? {
                DriverWake::Signalled(slots) => {
                    log::trace!("[waitset] driver woke, {} slot(s) signalled", slots.len());
                }
                DriverWake::TimedOut => {}
            }
        }
    }

    /// Evaluate every descriptor; returns `true` if any is ready.
    fn probe(&mut self) -> bool {
        let mut any_ready = false;
        for slot in &mut self.slots {
            for (descriptor, ready) in slot.entries.iter().zip(slot.ready.iter_mut()) {
                *ready = descriptor
                    .entity
                    .upgrade()
                    .is_some_and(|entity| entity.poll_ready());
                any_ready |= *ready;
            }
        }
        any_ready
    }

    fn next_deadline(&self) -> Option<Instant> {
        SlotKind::ALL
            .iter()
            .flat_map(|kind| self.slots[kind.index()].entries.iter())
            .filter_map(|descriptor| descriptor.entity.upgrade())
            .filter_map(|entity| entity.next_deadline())
            .min()
    }
}

impl Drop for DescriptorSet {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard_condition::GuardCondition;
    use crate::timer::Timer;
    use std::thread;

    fn gc() -> Arc<dyn Waitable> {
        Arc::new(GuardCondition::new())
    }

    #[test]
    fn empty_set_never_blocks() {
        let mut set = DescriptorSet::new(8).expect("set");
        let start = Instant::now();
        assert_eq!(set.wait(Duration::INFINITE).expect("wait"), WaitStatus::Empty);
        assert!(start.elapsed() < std::time::Duration::from_millis(50));
    }

    #[test]
    fn ready_flags_follow_slot_order() {
        let mut set = DescriptorSet::new(8).expect("set");
        let a = gc();
        let b = gc();
        set.add(SlotKind::GuardCondition, &a).expect("a");
        set.add(SlotKind::GuardCondition, &b).expect("b");

        b.as_any()
            .downcast_ref::<GuardCondition>()
            .expect("guard")
            .trigger();

        assert_eq!(set.wait(Duration::ZERO).expect("wait"), WaitStatus::Ready);
        assert!(!set.is_ready(SlotKind::GuardCondition, 0));
        assert!(set.is_ready(SlotKind::GuardCondition, 1));
        assert_eq!(set.ready_entity_count(), 1);
        assert_eq!(set.index_of(SlotKind::GuardCondition, b.waitable_id()), Some(1));

        set.reset_ready();
        assert_eq!(set.ready_entity_count(), 0);
    }

    #[test]
    fn zero_timeout_reports_timeout() {
        let mut set = DescriptorSet::new(8).expect("set");
        set.add(SlotKind::GuardCondition, &gc()).expect("add");
        assert_eq!(set.wait(Duration::ZERO).expect("wait"), WaitStatus::Timeout);
    }

    #[test]
    fn clear_releases_driver_slots_and_hooks() {
        let mut set = DescriptorSet::new(2).expect("set");
        let guard = Arc::new(GuardCondition::new());
        let entity: Arc<dyn Waitable> = guard.clone();
        set.add(SlotKind::GuardCondition, &entity).expect("add");
        set.add(SlotKind::Extra, &gc()).expect("extra");
        assert_eq!(guard.hook_count(), 1);

        set.clear();
        assert_eq!(guard.hook_count(), 0);
        assert_eq!(set.len(SlotKind::GuardCondition), 0);
        // both slots are free again
        set.add(SlotKind::GuardCondition, &entity).expect("re-add");
        set.add(SlotKind::Waitable, &gc()).expect("second");
    }

    #[test]
    fn timer_deadline_bounds_blocking() {
        let mut set = DescriptorSet::new(8).expect("set");
        let timer: Arc<dyn Waitable> =
            Arc::new(Timer::new(std::time::Duration::from_millis(20)).expect("timer"));
        set.add(SlotKind::Waitable, &timer).expect("add");

        let start = Instant::now();
        assert_eq!(set.wait(Duration::INFINITE).expect("wait"), WaitStatus::Ready);
        assert!(start.elapsed() >= std::time::Duration::from_millis(15));
        assert!(set.is_ready(SlotKind::Waitable, 0));
    }

    #[test]
    fn trigger_from_other_thread_wakes_indefinite_wait() {
        let mut set = DescriptorSet::new(8).expect("set");
        let guard = Arc::new(GuardCondition::new());
        let entity: Arc<dyn Waitable> = guard.clone();
        set.add(SlotKind::GuardCondition, &entity).expect("add");

        let trigger = thread::spawn(move || {
            thread::sleep(std::time::Duration::from_millis(20));
            guard.trigger();
        });

        assert_eq!(set.wait(Duration::INFINITE).expect("wait"), WaitStatus::Ready);
        assert!(set.is_ready(SlotKind::GuardCondition, 0));
        trigger.join().expect("join");
    }
}
