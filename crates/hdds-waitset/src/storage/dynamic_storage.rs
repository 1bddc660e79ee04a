// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::{check_context, InitialEntities, MutableStorage, StoragePolicy};
use crate::context::Context;
use crate::descriptor::{DescriptorSet, SlotKind};
use crate::error::{Error, Result};
use crate::guard_condition::GuardCondition;
use crate::waitable::Waitable;
use std::sync::{Arc, Weak};

/// Non-owning handle plus the id captured when it was added.
struct WeakEntry<T: ?Sized> {
    id: u64,
    handle: Weak<T>,
}

impl<T: ?Sized> WeakEntry<T> {
    fn is_alive(&self) -> bool {
        self.handle.strong_count() > 0
    }
}

/// Growable storage with weak handles.
///
/// Entities may be destroyed by their owner at any time; dead handles are
/// skipped at rebuild and dropped on prune. While ownership is acquired the
/// storage holds strong references so nothing is destroyed mid-wait.
pub struct DynamicStorage {
    guard_conditions: Vec<WeakEntry<GuardCondition>>,
    waitables: Vec<WeakEntry<dyn Waitable>>,
    extra_guard_conditions: Vec<Arc<GuardCondition>>,
    context: Arc<Context>,
    descriptor_set: DescriptorSet,
    /// Strong references held while `ownership_count > 0`.
    held: Vec<(SlotKind, Arc<dyn Waitable>)>,
    ownership_count: usize,
    needs_rebuild: bool,
    needs_pruning: bool,
}

impl DynamicStorage {
    fn contains(&self, kind: SlotKind, id: u64) -> bool {
        match kind {
            SlotKind::GuardCondition => self.guard_conditions.iter().any(|e| e.id == id),
            SlotKind::Waitable => self.waitables.iter().any(|e| e.id == id),
            SlotKind::Extra => self
                .extra_guard_conditions
                .iter()
                .any(|gc| gc.id() == id),
        }
    }

    fn hold_if_acquired(&mut self, kind: SlotKind, entity: Arc<dyn Waitable>) {
        if self.ownership_count > 0 {
            self.held.push((kind, entity));
        }
    }

    fn unhold(&mut self, kind: SlotKind, id: u64) {
        self.held
            .retain(|(held_kind, entity)| *held_kind != kind || entity.waitable_id() != id);
    }

    fn insert_guard_condition(&mut self, gc: Arc<GuardCondition>) -> Result<()> {
        check_context(gc.as_ref(), &self.context)?;
        if self.contains(SlotKind::GuardCondition, gc.id()) {
            return Err(Error::DuplicateEntity(gc.id()));
        }
        self.guard_conditions.push(WeakEntry {
            id: gc.id(),
            handle: Arc::downgrade(&gc),
        });
        self.hold_if_acquired(SlotKind::GuardCondition, gc);
        self.needs_rebuild = true;
        Ok(())
    }

    fn insert_waitable(&mut self, waitable: Arc<dyn Waitable>) -> Result<()> {
        check_context(waitable.as_ref(), &self.context)?;
        let id = waitable.waitable_id();
        if self.contains(SlotKind::Waitable, id) {
            return Err(Error::DuplicateEntity(id));
        }
        self.waitables.push(WeakEntry {
            id,
            handle: Arc::downgrade(&waitable),
        });
        self.hold_if_acquired(SlotKind::Waitable, waitable);
        self.needs_rebuild = true;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn ownership_count(&self) -> usize {
        self.ownership_count
    }

    #[cfg(test)]
    pub(crate) fn held_count(&self) -> usize {
        self.held.len()
    }

    #[cfg(test)]
    pub(crate) fn handle_count(&self) -> usize {
        self.guard_conditions.len() + self.waitables.len()
    }
}

impl StoragePolicy for DynamicStorage {
    fn new(entities: InitialEntities, context: &Arc<Context>) -> Result<Self> {
        let mut storage = Self {
            guard_conditions: Vec::with_capacity(entities.guard_conditions.len()),
            waitables: Vec::with_capacity(entities.waitables.len()),
            extra_guard_conditions: entities.extra_guard_conditions,
            context: Arc::clone(context),
            descriptor_set: DescriptorSet::new(context.options().max_slots)?,
            held: Vec::new(),
            ownership_count: 0,
            needs_rebuild: true,
            needs_pruning: false,
        };
        for gc in entities.guard_conditions {
            storage.insert_guard_condition(gc)?;
        }
        for waitable in entities.waitables {
            storage.insert_waitable(waitable)?;
        }
        Ok(storage)
    }

    fn rebuild_descriptor_set(&mut self) -> Result<()> {
        if self.needs_pruning {
            self.prune_deleted_entities();
            self.needs_pruning = false;
        }
        if !self.needs_rebuild {
            self.descriptor_set.reset_ready();
            return Ok(());
        }

        self.descriptor_set.clear();
        for gc in &self.extra_guard_conditions {
            let entity: Arc<dyn Waitable> = gc.clone();
            self.descriptor_set.add(SlotKind::Extra, &entity)?;
        }
        for entry in &self.guard_conditions {
            if let Some(gc) = entry.handle.upgrade() {
                let entity: Arc<dyn Waitable> = gc;
                self.descriptor_set.add(SlotKind::GuardCondition, &entity)?;
            } else {
                self.needs_pruning = true;
            }
        }
        for entry in &self.waitables {
            if let Some(waitable) = entry.handle.upgrade() {
                self.descriptor_set.add(SlotKind::Waitable, &waitable)?;
            } else {
                self.needs_pruning = true;
            }
        }
        self.needs_rebuild = false;
        log::debug!(
            "[waitset] dynamic descriptor set rebuilt ({} entities)",
            self.descriptor_set.entity_count()
        );
        Ok(())
    }

    fn acquire_ownerships(&mut self) {
        self.ownership_count += 1;
        if self.ownership_count > 1 {
            return;
        }

        let mut held = Vec::with_capacity(self.guard_conditions.len() + self.waitables.len());
        for entry in &self.guard_conditions {
            match entry.handle.upgrade() {
                Some(gc) => held.push((SlotKind::GuardCondition, gc as Arc<dyn Waitable>)),
                None => self.needs_pruning = true,
            }
        }
        for entry in &self.waitables {
            match entry.handle.upgrade() {
                Some(waitable) => held.push((SlotKind::Waitable, waitable)),
                None => self.needs_pruning = true,
            }
        }
        self.held = held;
    }

    fn release_ownerships(&mut self) {
        if self.ownership_count == 0 {
            log::warn!("[waitset] release_ownerships() without matching acquire");
            return;
        }
        self.ownership_count -= 1;
        if self.ownership_count == 0 {
            self.held.clear();
        }
    }

    fn descriptor_set(&self) -> &DescriptorSet {
        &self.descriptor_set
    }

    fn descriptor_set_mut(&mut self) -> &mut DescriptorSet {
        &mut self.descriptor_set
    }

    fn guard_conditions(&self) -> Vec<Arc<GuardCondition>> {
        self.guard_conditions
            .iter()
            .filter_map(|entry| entry.handle.upgrade())
            .collect()
    }

    fn waitables(&self) -> Vec<Arc<dyn Waitable>> {
        self.waitables
            .iter()
            .filter_map(|entry| entry.handle.upgrade())
            .collect()
    }
}

impl MutableStorage for DynamicStorage {
    fn add_guard_condition(&mut self, guard_condition: Arc<GuardCondition>) -> Result<()> {
        self.insert_guard_condition(guard_condition)
    }

    fn remove_guard_condition(&mut self, guard_condition: &Arc<GuardCondition>) -> Result<()> {
        let id = guard_condition.id();
        let position = self
            .guard_conditions
            .iter()
            .position(|entry| entry.id == id)
            .ok_or(Error::NotFound(id))?;
        self.guard_conditions.remove(position);
        self.unhold(SlotKind::GuardCondition, id);
        self.needs_rebuild = true;
        Ok(())
    }

    fn add_waitable(&mut self, waitable: Arc<dyn Waitable>) -> Result<()> {
        self.insert_waitable(waitable)
    }

    fn remove_waitable(&mut self, waitable: &Arc<dyn Waitable>) -> Result<()> {
        let id = waitable.waitable_id();
        let position = self
            .waitables
            .iter()
            .position(|entry| entry.id == id)
            .ok_or(Error::NotFound(id))?;
        self.waitables.remove(position);
        self.unhold(SlotKind::Waitable, id);
        self.needs_rebuild = true;
        Ok(())
    }

    fn prune_deleted_entities(&mut self) {
        let before = self.guard_conditions.len() + self.waitables.len();
        self.guard_conditions.retain(WeakEntry::is_alive);
        self.waitables.retain(WeakEntry::is_alive);
        let pruned = before - (self.guard_conditions.len() + self.waitables.len());
        if pruned > 0 {
            log::debug!("[waitset] pruned {} deleted entities", pruned);
            self.needs_rebuild = true;
        }
    }
}
