// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Blocking runtime primitive behind every wait set.
//!
//! `WaitsetDriver` multiplexes many entity notifications onto a single
//! eventfd (or Windows event) so one thread can block on all of them with a
//! timeout.

mod bitmap;
mod driver;

pub use driver::{DriverWake, WaitsetDriver, WaitsetRegistration, WaitsetSignal};
