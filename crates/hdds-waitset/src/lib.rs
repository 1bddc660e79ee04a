// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # hdds-waitset - policy-based wait set
//!
//! Block on a heterogeneous set of waitable entities (guard conditions,
//! timers, anything implementing [`Waitable`]) and find out which are ready,
//! with an optional timeout.
//!
//! ## Quick Start
//!
//! ```rust
//! use hdds_waitset::{Duration, GuardCondition, ThreadSafeWaitSet, WaitResultKind};
//! use std::sync::Arc;
//! use std::thread;
//!
//! fn main() -> hdds_waitset::Result<()> {
//!     let stop = Arc::new(GuardCondition::new());
//!     let wait_set = ThreadSafeWaitSet::new(vec![stop.clone()])?;
//!
//!     let trigger = thread::spawn(move || stop.trigger());
//!     let result = wait_set.wait(Duration::INFINITE)?;
//!     assert_eq!(result.kind(), WaitResultKind::Ready);
//!     trigger.join().ok();
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------+
//! |  WaitSetTemplate<S, Y>            WaitResult (scoped outcomes) |
//! +-------------------------------+-------------------------------+
//! |  StoragePolicy (S)            |  SynchronizationPolicy (Y)    |
//! |  StaticStorage | Dynamic...   |  Sequential | ThreadSafe      |
//! +-------------------------------+-------------------------------+
//! |  DescriptorSet -> rt::WaitsetDriver (eventfd + poll / Event)  |
//! +---------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`WaitSet`] | Growable, single-threaded |
//! | [`StaticWaitSet`] | Fixed composition, built once |
//! | [`ThreadSafeWaitSet`] | Membership may change while another thread waits |
//! | [`GuardCondition`] | Manually triggered waitable |
//! | [`Timer`] | Periodic waitable carrying [`TimerInfo`] |
//! | [`Duration`] | Signed nanosecond timeout, overflow-checked |
//!
//! ## Logging
//!
//! The crate logs through the `log` facade; [`logging`] installs an
//! `env_logger` backend (`HDDS_LOG_LEVEL` or `RUST_LOG`).

pub mod config;
pub mod context;
pub mod descriptor;
pub mod duration;
pub mod error;
pub mod guard_condition;
pub mod logging;
pub mod rt;
pub mod storage;
pub mod sync;
pub mod timer;
pub mod wait_result;
pub mod wait_set;
pub mod waitable;

pub use config::ContextOptions;
pub use context::Context;
pub use descriptor::{DescriptorSet, SlotKind};
pub use duration::Duration;
pub use error::{Error, Result};
pub use guard_condition::GuardCondition;
pub use storage::{DynamicStorage, MutableStorage, StaticStorage, StoragePolicy};
pub use sync::{SequentialSynchronization, SynchronizationPolicy, ThreadSafeSynchronization};
pub use timer::{Timer, TimerInfo};
pub use wait_result::{WaitResult, WaitResultKind};
pub use wait_set::{StaticWaitSet, ThreadSafeWaitSet, WaitSet, WaitSetTemplate};
pub use waitable::{Waitable, WaitableData};
