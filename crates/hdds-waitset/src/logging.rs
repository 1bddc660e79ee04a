// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Logging initialization.
//!
//! The crate itself only talks to the `log` facade. These helpers install an
//! `env_logger` backend for binaries and tests that want console output.

use crate::config::ENV_LOG_LEVEL;

/// Install a console logger at `level`.
///
/// Returns `false` if a logger was already installed.
pub fn init(level: log::LevelFilter) -> bool {
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp_millis()
        .try_init()
        .is_ok()
}

/// Install a console logger honouring `RUST_LOG`, then `HDDS_LOG_LEVEL`,
/// then `default_level`.
pub fn init_from_env(default_level: log::LevelFilter) -> bool {
    let fallback = fallback_filter(std::env::var(ENV_LOG_LEVEL).ok(), default_level);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(fallback))
        .format_timestamp_millis()
        .try_init()
        .is_ok()
}

fn fallback_filter(configured: Option<String>, default_level: log::LevelFilter) -> String {
    match configured {
        Some(filter) if !filter.trim().is_empty() => filter,
        _ => default_level.to_string(),
    }
}

/// Install a console logger with an explicit filter (e.g. `"hdds_waitset=debug"`).
pub fn init_with_filter(filter: &str) -> bool {
    env_logger::Builder::new()
        .parse_filters(filter)
        .format_timestamp_millis()
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::LevelFilter;

    #[test]
    fn fallback_prefers_configured_level() {
        assert_eq!(
            fallback_filter(Some("debug".into()), LevelFilter::Warn),
            "debug"
        );
        assert_eq!(
            fallback_filter(Some("hdds_waitset=trace".into()), LevelFilter::Warn),
            "hdds_waitset=trace"
        );
    }

    #[test]
    fn fallback_uses_default_when_unset_or_blank() {
        assert_eq!(fallback_filter(None, LevelFilter::Info), "INFO");
        assert_eq!(fallback_filter(Some("  ".into()), LevelFilter::Error), "ERROR");
    }

    #[test]
    fn second_install_is_refused() {
        // the first call may lose to a logger installed by another test
        let _ = init_with_filter("hdds_waitset=warn");
        assert!(!init(LevelFilter::Debug));
        assert!(!init_from_env(LevelFilter::Info));
    }
}
