// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::{check_context, InitialEntities, StoragePolicy};
use crate::context::Context;
use crate::descriptor::{DescriptorSet, SlotKind};
use crate::error::{Error, Result};
use crate::guard_condition::GuardCondition;
use crate::waitable::Waitable;
use std::collections::HashSet;
use std::sync::Arc;

/// Fixed composition with strong handles held for the storage's lifetime.
///
/// Ownership acquire/release are no-ops and the descriptor set is built on
/// the first wait only.
pub struct StaticStorage {
    guard_conditions: Vec<Arc<GuardCondition>>,
    waitables: Vec<Arc<dyn Waitable>>,
    extra_guard_conditions: Vec<Arc<GuardCondition>>,
    descriptor_set: DescriptorSet,
    built: bool,
}

impl StoragePolicy for StaticStorage {
    fn new(entities: InitialEntities, context: &Arc<Context>) -> Result<Self> {
        let mut seen = HashSet::new();
        for gc in &entities.guard_conditions {
            check_context(gc.as_ref(), context)?;
            if !seen.insert(gc.id()) {
                return Err(Error::DuplicateEntity(gc.id()));
            }
        }
        seen.clear();
        for waitable in &entities.waitables {
            check_context(waitable.as_ref(), context)?;
            if !seen.insert(waitable.waitable_id()) {
                return Err(Error::DuplicateEntity(waitable.waitable_id()));
            }
        }

        Ok(Self {
            descriptor_set: DescriptorSet::new(context.options().max_slots)?,
            guard_conditions: entities.guard_conditions,
            waitables: entities.waitables,
            extra_guard_conditions: entities.extra_guard_conditions,
            built: false,
        })
    }

    fn rebuild_descriptor_set(&mut self) -> Result<()> {
        if self.built {
            self.descriptor_set.reset_ready();
            return Ok(());
        }

        self.descriptor_set.clear();
        for gc in &self.extra_guard_conditions {
            let entity: Arc<dyn Waitable> = gc.clone();
            self.descriptor_set.add(SlotKind::Extra, &entity)?;
        }
        for gc in &self.guard_conditions {
            let entity: Arc<dyn Waitable> = gc.clone();
            self.descriptor_set.add(SlotKind::GuardCondition, &entity)?;
        }
        for waitable in &self.waitables {
            self.descriptor_set.add(SlotKind::Waitable, waitable)?;
        }
        self.built = true;
        log::debug!(
            "[waitset] static descriptor set built ({} entities)",
            self.descriptor_set.entity_count()
        );
        Ok(())
    }

    fn acquire_ownerships(&mut self) {}

    fn release_ownerships(&mut self) {}

    fn descriptor_set(&self) -> &DescriptorSet {
        &self.descriptor_set
    }

    fn descriptor_set_mut(&mut self) -> &mut DescriptorSet {
        &mut self.descriptor_set
    }

    fn guard_conditions(&self) -> Vec<Arc<GuardCondition>> {
        self.guard_conditions.clone()
    }

    fn waitables(&self) -> Vec<Arc<dyn Waitable>> {
        self.waitables.clone()
    }
}
