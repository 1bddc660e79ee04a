// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Storage policies - how a wait set holds its entities.
//!
//! - [`StaticStorage`]: composition fixed at construction, strong handles,
//!   no add/remove, descriptor set built once.
//! - [`DynamicStorage`]: weak handles, add/remove/prune at any time,
//!   descriptor set rebuilt lazily after membership changes.

mod dynamic_storage;
mod static_storage;

pub use dynamic_storage::DynamicStorage;
pub use static_storage::StaticStorage;

use crate::context::Context;
use crate::descriptor::DescriptorSet;
use crate::error::{Error, Result};
use crate::guard_condition::GuardCondition;
use crate::waitable::Waitable;
use std::sync::Arc;

/// Entities handed to a storage policy at construction.
#[derive(Default)]
pub struct InitialEntities {
    pub guard_conditions: Vec<Arc<GuardCondition>>,
    pub waitables: Vec<Arc<dyn Waitable>>,
    /// Guard conditions contributed by the synchronization policy.
    pub extra_guard_conditions: Vec<Arc<GuardCondition>>,
}

/// Operations every storage policy provides.
pub trait StoragePolicy: Send + Sized {
    /// Build the storage; fails on duplicates or foreign-context entities.
    fn new(entities: InitialEntities, context: &Arc<Context>) -> Result<Self>;

    /// Bring the descriptor set in line with the slots and clear the
    /// previous outcomes. Idempotent.
    fn rebuild_descriptor_set(&mut self) -> Result<()>;

    /// Hold ownership of every entity until the matching release.
    fn acquire_ownerships(&mut self);

    /// Undo one [`StoragePolicy::acquire_ownerships`].
    fn release_ownerships(&mut self);

    fn descriptor_set(&self) -> &DescriptorSet;

    fn descriptor_set_mut(&mut self) -> &mut DescriptorSet;

    /// Live guard conditions, in slot order.
    fn guard_conditions(&self) -> Vec<Arc<GuardCondition>>;

    /// Live waitables, in slot order.
    fn waitables(&self) -> Vec<Arc<dyn Waitable>>;
}

/// Storage policies that allow membership changes after construction.
pub trait MutableStorage: StoragePolicy {
    fn add_guard_condition(&mut self, guard_condition: Arc<GuardCondition>) -> Result<()>;

    fn remove_guard_condition(&mut self, guard_condition: &Arc<GuardCondition>) -> Result<()>;

    fn add_waitable(&mut self, waitable: Arc<dyn Waitable>) -> Result<()>;

    fn remove_waitable(&mut self, waitable: &Arc<dyn Waitable>) -> Result<()>;

    /// Drop handles whose entity has been destroyed.
    fn prune_deleted_entities(&mut self);
}

/// Reject entities created in another context.
pub(crate) fn check_context(entity: &dyn Waitable, context: &Arc<Context>) -> Result<()> {
    if Arc::ptr_eq(entity.context(), context) {
        Ok(())
    } else {
        log::debug!(
            "[waitset] entity {} belongs to context {}, wait set uses {}",
            entity.waitable_id(),
            entity.context().id(),
            context.id()
        );
        Err(Error::InvalidArgument("entity belongs to a different context"))
    }
}

#[cfg(test)]
mod tests;
