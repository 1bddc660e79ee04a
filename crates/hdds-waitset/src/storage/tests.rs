// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::*;
use crate::config::ContextOptions;
use crate::descriptor::SlotKind;
use crate::duration::Duration;
use crate::timer::Timer;

fn gcs(n: usize) -> Vec<Arc<GuardCondition>> {
    (0..n).map(|_| Arc::new(GuardCondition::new())).collect()
}

fn dynamic(initial: Vec<Arc<GuardCondition>>) -> DynamicStorage {
    DynamicStorage::new(
        InitialEntities {
            guard_conditions: initial,
            ..Default::default()
        },
        &Context::default_context(),
    )
    .expect("storage")
}

#[test]
fn dynamic_add_then_remove_restores_contents() {
    let kept = gcs(2);
    let mut storage = dynamic(kept.clone());
    let extra = Arc::new(GuardCondition::new());

    storage.add_guard_condition(extra.clone()).expect("add");
    assert_eq!(storage.guard_conditions().len(), 3);
    storage.remove_guard_condition(&extra).expect("remove");

    let ids: Vec<u64> = storage.guard_conditions().iter().map(|gc| gc.id()).collect();
    let expected: Vec<u64> = kept.iter().map(|gc| gc.id()).collect();
    assert_eq!(ids, expected);
}

#[test]
fn dynamic_duplicate_and_missing_are_faults() {
    let gc = Arc::new(GuardCondition::new());
    let mut storage = dynamic(vec![gc.clone()]);

    assert!(matches!(
        storage.add_guard_condition(gc.clone()),
        Err(Error::DuplicateEntity(id)) if id == gc.id()
    ));

    let stranger = Arc::new(GuardCondition::new());
    assert!(matches!(
        storage.remove_guard_condition(&stranger),
        Err(Error::NotFound(id)) if id == stranger.id()
    ));
}

#[test]
fn dynamic_rejects_duplicates_at_construction() {
    let gc = Arc::new(GuardCondition::new());
    let result = DynamicStorage::new(
        InitialEntities {
            guard_conditions: vec![gc.clone(), gc],
            ..Default::default()
        },
        &Context::default_context(),
    );
    assert!(matches!(result, Err(Error::DuplicateEntity(_))));
}

#[test]
fn foreign_context_is_rejected() {
    let other = Context::new(ContextOptions::named("other"));
    let foreign = Arc::new(GuardCondition::with_context(other));
    let mut storage = dynamic(Vec::new());
    assert!(matches!(
        storage.add_guard_condition(foreign.clone()),
        Err(Error::InvalidArgument(_))
    ));

    let result = StaticStorage::new(
        InitialEntities {
            guard_conditions: vec![foreign],
            ..Default::default()
        },
        &Context::default_context(),
    );
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
}

#[test]
fn dynamic_add_n_remove_m_prune_leaves_n_minus_m() {
    let all = gcs(10);
    let mut storage = dynamic(Vec::new());
    for gc in &all {
        storage.add_guard_condition(gc.clone()).expect("add");
    }
    for gc in &all[..4] {
        storage.remove_guard_condition(gc).expect("remove");
    }
    storage.prune_deleted_entities();
    assert_eq!(storage.guard_conditions().len(), 6);
    assert_eq!(storage.handle_count(), 6);
}

#[test]
fn destroyed_entity_is_skipped_then_pruned() {
    let keep = Arc::new(GuardCondition::new());
    let doomed = Arc::new(GuardCondition::new());
    let mut storage = dynamic(vec![keep.clone(), doomed.clone()]);
    drop(doomed);

    assert_eq!(storage.guard_conditions().len(), 1);
    assert_eq!(storage.handle_count(), 2, "dead handle kept until prune");

    storage.rebuild_descriptor_set().expect("rebuild");
    assert_eq!(storage.descriptor_set().len(SlotKind::GuardCondition), 1);

    // next rebuild prunes what the previous one found dead
    storage.rebuild_descriptor_set().expect("rebuild");
    assert_eq!(storage.handle_count(), 1);
}

#[test]
fn ownership_is_counted_and_keeps_entities_alive() {
    let gc = Arc::new(GuardCondition::new());
    let mut storage = dynamic(vec![gc.clone()]);

    storage.acquire_ownerships();
    storage.acquire_ownerships();
    assert_eq!(storage.ownership_count(), 2);
    assert_eq!(storage.held_count(), 1);

    let weak = Arc::downgrade(&gc);
    drop(gc);
    assert!(weak.upgrade().is_some(), "held while acquired");

    storage.release_ownerships();
    assert!(weak.upgrade().is_some());
    storage.release_ownerships();
    assert_eq!(storage.held_count(), 0);
    assert!(weak.upgrade().is_none());

    // unbalanced release is tolerated
    storage.release_ownerships();
    assert_eq!(storage.ownership_count(), 0);
}

#[test]
fn mutations_while_acquired_update_held_set() {
    let mut storage = dynamic(Vec::new());
    storage.acquire_ownerships();

    let gc = Arc::new(GuardCondition::new());
    storage.add_guard_condition(gc.clone()).expect("add");
    assert_eq!(storage.held_count(), 1);

    storage.remove_guard_condition(&gc).expect("remove");
    assert_eq!(storage.held_count(), 0);
    storage.release_ownerships();
}

#[test]
fn removal_from_one_slot_keeps_hold_in_other_slot() {
    let mut storage = dynamic(Vec::new());
    storage.acquire_ownerships();

    let gc = Arc::new(GuardCondition::new());
    let weak = Arc::downgrade(&gc);
    storage.add_guard_condition(gc.clone()).expect("add as guard condition");
    storage
        .add_waitable(gc.clone() as Arc<dyn Waitable>)
        .expect("add as waitable");
    assert_eq!(storage.held_count(), 2);

    storage.remove_guard_condition(&gc).expect("remove");
    assert_eq!(storage.held_count(), 1);

    drop(gc);
    assert!(weak.upgrade().is_some(), "waitable slot still holds it");

    storage.release_ownerships();
    assert!(weak.upgrade().is_none());
}

#[test]
fn rebuild_is_lazy_until_membership_changes() {
    let gc = Arc::new(GuardCondition::new());
    let mut storage = dynamic(vec![gc.clone()]);
    storage.rebuild_descriptor_set().expect("rebuild");

    gc.trigger();
    assert_eq!(
        storage.descriptor_set_mut().wait(Duration::ZERO).expect("wait"),
        crate::descriptor::WaitStatus::Ready
    );
    assert_eq!(storage.descriptor_set().ready_entity_count(), 1);

    // no membership change: ready flags reset, descriptors kept
    storage.rebuild_descriptor_set().expect("rebuild");
    assert_eq!(storage.descriptor_set().ready_entity_count(), 0);
    assert_eq!(storage.descriptor_set().len(SlotKind::GuardCondition), 1);

    let timer: Arc<dyn Waitable> =
        Arc::new(Timer::new(std::time::Duration::from_secs(1)).expect("timer"));
    storage.add_waitable(timer.clone()).expect("add timer");
    storage.rebuild_descriptor_set().expect("rebuild");
    assert_eq!(storage.descriptor_set().len(SlotKind::Waitable), 1);
    assert_eq!(storage.waitables().len(), 1);

    storage.remove_waitable(&timer).expect("remove timer");
    assert!(matches!(
        storage.remove_waitable(&timer),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn extras_are_not_counted_as_entities() {
    let extra = Arc::new(GuardCondition::new());
    let mut storage = DynamicStorage::new(
        InitialEntities {
            extra_guard_conditions: vec![extra],
            ..Default::default()
        },
        &Context::default_context(),
    )
    .expect("storage");
    storage.rebuild_descriptor_set().expect("rebuild");
    assert_eq!(storage.descriptor_set().len(SlotKind::Extra), 1);
    assert!(storage.descriptor_set().is_empty());
}

#[test]
fn static_builds_once_and_holds_strong_handles() {
    let gc = Arc::new(GuardCondition::new());
    let weak = Arc::downgrade(&gc);
    let mut storage = StaticStorage::new(
        InitialEntities {
            guard_conditions: vec![gc],
            ..Default::default()
        },
        &Context::default_context(),
    )
    .expect("storage");

    assert!(weak.upgrade().is_some(), "static storage owns its entities");
    storage.rebuild_descriptor_set().expect("build");
    storage.rebuild_descriptor_set().expect("reuse");
    assert_eq!(storage.descriptor_set().len(SlotKind::GuardCondition), 1);
    assert_eq!(storage.guard_conditions().len(), 1);

    let dup = Arc::new(GuardCondition::new());
    let result = StaticStorage::new(
        InitialEntities {
            guard_conditions: vec![dup.clone(), dup],
            ..Default::default()
        },
        &Context::default_context(),
    );
    assert!(matches!(result, Err(Error::DuplicateEntity(_))));
}
