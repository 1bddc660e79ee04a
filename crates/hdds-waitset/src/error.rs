// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error type shared by every wait set operation.
//!
//! Each usage fault has its own variant so callers can tell a duplicate add
//! from a missing remove or an arithmetic overflow without string matching.

use crate::wait_result::WaitResultKind;
use thiserror::Error;

/// Errors returned by wait set, storage and duration operations.
#[derive(Debug, Error)]
pub enum Error {
    // ========================================================================
    // Usage faults
    // ========================================================================
    /// An argument was rejected (missing context, foreign context, ...).
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// The entity is already part of the wait set.
    #[error("Entity {0} has already been added to the wait set")]
    DuplicateEntity(u64),
    /// The entity is not part of the wait set.
    #[error("Entity {0} is not part of the wait set")]
    NotFound(u64),
    /// `wait_result_acquire()` called twice without a release.
    #[error("wait_result_acquire() called while already holding")]
    AlreadyHolding,
    /// `wait_result_release()` called without a prior acquire.
    #[error("wait_result_release() called while not holding")]
    NotHolding,
    /// Outcome inspection on a wait result that is not `Ready`.
    #[error("Wait result is {0:?}, outcomes are only available on Ready")]
    NotReady(WaitResultKind),
    /// The storage is held by an outstanding wait result on this thread.
    #[error("Wait set storage is held by an outstanding wait result")]
    StorageBusy,

    // ========================================================================
    // Arithmetic faults
    // ========================================================================
    /// Duration arithmetic exceeded `i64::MAX` nanoseconds.
    #[error("Duration overflow: {0}")]
    Overflow(&'static str),
    /// Duration arithmetic went below `i64::MIN` nanoseconds.
    #[error("Duration underflow: {0}")]
    Underflow(&'static str),
    /// Scaling by NaN or infinity.
    #[error("Abnormal scale factor: {0}")]
    NonFiniteScale(f64),

    // ========================================================================
    // Environment faults
    // ========================================================================
    /// The waitset driver has no free slot left.
    #[error("Waitset capacity exceeded (max {0})")]
    CapacityExceeded(usize),
    /// I/O error surfaced by the blocking driver.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
