// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wait set configuration - constants and environment overrides.
//!
//! # Environment
//!
//! - `HDDS_WAITSET_MAX_SLOTS`: driver capacity per wait set (default: 2048)
//! - `HDDS_LOG_LEVEL`: default log filter used by [`crate::logging::init_from_env`]
//!
//! ```bash
//! export HDDS_WAITSET_MAX_SLOTS=256
//! export HDDS_LOG_LEVEL=debug
//! ```

use std::env;

/// Default maximum number of driver slots per wait set.
///
/// Each attached entity (and the thread-safe interrupt guard) consumes one.
pub const WAITSET_DEFAULT_MAX_SLOTS: usize = 2048;

/// Driver capacity override.
pub const ENV_WAITSET_MAX_SLOTS: &str = "HDDS_WAITSET_MAX_SLOTS";
/// Default log level when `RUST_LOG` is unset.
pub const ENV_LOG_LEVEL: &str = "HDDS_LOG_LEVEL";

/// Name given to the process-wide default context.
pub const DEFAULT_CONTEXT_NAME: &str = "hdds_default_context";

/// Options carried by a [`crate::Context`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextOptions {
    /// Human readable context name (used in logs).
    pub name: String,
    /// Driver capacity for every wait set created in this context.
    pub max_slots: usize,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            name: DEFAULT_CONTEXT_NAME.to_string(),
            max_slots: WAITSET_DEFAULT_MAX_SLOTS,
        }
    }
}

impl ContextOptions {
    /// Options with a custom name and default limits.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Override the driver capacity.
    #[must_use]
    pub fn with_max_slots(mut self, max_slots: usize) -> Self {
        self.max_slots = max_slots;
        self
    }

    /// Defaults overridden by the `HDDS_WAITSET_*` environment variables.
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Ok(raw) = env::var(ENV_WAITSET_MAX_SLOTS) {
            options.max_slots = parse_max_slots(&raw);
        }
        options
    }
}

/// Parse a slot capacity, falling back to the default on bad input.
fn parse_max_slots(raw: &str) -> usize {
    match raw.trim().parse::<usize>() {
        Ok(0) => {
            log::warn!(
                "[config] {}=0 is invalid, using default {}",
                ENV_WAITSET_MAX_SLOTS,
                WAITSET_DEFAULT_MAX_SLOTS
            );
            WAITSET_DEFAULT_MAX_SLOTS
        }
        Ok(slots) => slots,
        Err(err) => {
            log::warn!(
                "[config] invalid {}='{}' ({}), using default {}",
                ENV_WAITSET_MAX_SLOTS,
                raw,
                err,
                WAITSET_DEFAULT_MAX_SLOTS
            );
            WAITSET_DEFAULT_MAX_SLOTS
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_slot_count() {
        assert_eq!(parse_max_slots("64"), 64);
        assert_eq!(parse_max_slots("  128 "), 128);
    }

    #[test]
    fn parse_invalid_slot_count_falls_back() {
        assert_eq!(parse_max_slots("0"), WAITSET_DEFAULT_MAX_SLOTS);
        assert_eq!(parse_max_slots("-3"), WAITSET_DEFAULT_MAX_SLOTS);
        assert_eq!(parse_max_slots("lots"), WAITSET_DEFAULT_MAX_SLOTS);
    }

    #[test]
    fn builder_helpers() {
        let options = ContextOptions::named("unit").with_max_slots(4);
        assert_eq!(options.name, "unit");
        assert_eq!(options.max_slots, 4);
        assert_eq!(ContextOptions::default().max_slots, WAITSET_DEFAULT_MAX_SLOTS);
    }
}
