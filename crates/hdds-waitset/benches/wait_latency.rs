// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::missing_panics_doc)] // Tests/examples panic on failure
#![allow(clippy::semicolon_if_nothing_returned)] // Benchmark code formatting

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hdds_waitset::{Duration, GuardCondition, StaticWaitSet, ThreadSafeWaitSet, WaitSet};
use std::sync::Arc;

fn guard_conditions(count: usize) -> Vec<Arc<GuardCondition>> {
    (0..count).map(|_| Arc::new(GuardCondition::new())).collect()
}

// ============================================================================
// Poll (timeout == 0) Benchmarks
// ============================================================================

/// Benchmark: non-blocking poll, nothing ready
/// Target: < 2 us for 16 entities
fn bench_poll_idle(c: &mut Criterion) {
    let mut group = c.benchmark_group("poll_idle");
    for count in [1usize, 16, 128] {
        let members = guard_conditions(count);

        let dynamic = WaitSet::new(members.clone()).expect("wait set");
        group.bench_with_input(BenchmarkId::new("dynamic", count), &count, |b, _| {
            b.iter(|| black_box(dynamic.wait(Duration::ZERO).expect("wait").kind()))
        });

        let fixed = StaticWaitSet::new(members.clone()).expect("wait set");
        group.bench_with_input(BenchmarkId::new("static", count), &count, |b, _| {
            b.iter(|| black_box(fixed.wait(Duration::ZERO).expect("wait").kind()))
        });

        let thread_safe = ThreadSafeWaitSet::new(members.clone()).expect("wait set");
        group.bench_with_input(BenchmarkId::new("thread_safe", count), &count, |b, _| {
            b.iter(|| black_box(thread_safe.wait(Duration::ZERO).expect("wait").kind()))
        });
    }
    group.finish();
}

/// Benchmark: trigger + wait round trip on a single thread
/// Target: < 5 us
fn bench_trigger_then_wait(c: &mut Criterion) {
    let gc = Arc::new(GuardCondition::new());
    let wait_set = WaitSet::new(vec![gc.clone()]).expect("wait set");

    c.bench_function("trigger_then_wait", |b| {
        b.iter(|| {
            gc.trigger();
            let result = wait_set.wait(Duration::INFINITE).expect("wait");
            black_box(result.ready_count().expect("ready"));
        })
    });
}

// ============================================================================
// Membership Benchmarks
// ============================================================================

/// Benchmark: add + remove + rebuild on the next poll
fn bench_add_remove_rebuild(c: &mut Criterion) {
    let members = guard_conditions(32);
    let churn = Arc::new(GuardCondition::new());
    let wait_set = WaitSet::new(members.clone()).expect("wait set");

    c.bench_function("add_remove_rebuild_32", |b| {
        b.iter(|| {
            wait_set.add_guard_condition(&churn).expect("add");
            wait_set.remove_guard_condition(&churn).expect("remove");
            black_box(wait_set.wait(Duration::ZERO).expect("wait").kind());
        })
    });
}

criterion_group!(
    benches,
    bench_poll_idle,
    bench_trigger_then_wait,
    bench_add_remove_rebuild
);
criterion_main!(benches);
