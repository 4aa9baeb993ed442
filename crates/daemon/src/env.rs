// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment overrides for timing knobs.
//!
//! Production uses the defaults; tests shrink the intervals to keep the
//! specs fast.

use std::time::Duration;

fn ms_from_env(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Queue poll interval (default 2s, `ENGRAMD_POLL_MS`).
pub(crate) fn poll_interval() -> Duration {
    ms_from_env("ENGRAMD_POLL_MS").unwrap_or(Duration::from_secs(2))
}

/// Heartbeat interval (default 30s, `ENGRAMD_HEARTBEAT_MS`).
pub(crate) fn heartbeat_interval() -> Duration {
    ms_from_env("ENGRAMD_HEARTBEAT_MS").unwrap_or(Duration::from_secs(30))
}

/// Compactor check interval (default 30s, `ENGRAMD_COMPACT_MS`).
pub(crate) fn compact_interval() -> Duration {
    ms_from_env("ENGRAMD_COMPACT_MS").unwrap_or(Duration::from_secs(30))
}

/// Hard teardown ceiling (default 5s, `ENGRAMD_SHUTDOWN_GRACE_MS`).
pub(crate) fn shutdown_grace() -> Duration {
    ms_from_env("ENGRAMD_SHUTDOWN_GRACE_MS").unwrap_or(Duration::from_secs(5))
}

/// Per-call agent timeout (default 180s, `ENGRAMD_AGENT_TIMEOUT_MS`).
pub(crate) fn agent_timeout() -> Duration {
    ms_from_env("ENGRAMD_AGENT_TIMEOUT_MS").unwrap_or(Duration::from_secs(180))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn defaults_apply_without_env() {
        std::env::remove_var("ENGRAMD_POLL_MS");
        assert_eq!(poll_interval(), Duration::from_secs(2));
        assert_eq!(heartbeat_interval(), Duration::from_secs(30));
        assert_eq!(compact_interval(), Duration::from_secs(30));
        assert_eq!(shutdown_grace(), Duration::from_secs(5));
    }

    #[test]
    #[serial]
    fn env_overrides_parse_millis() {
        std::env::set_var("ENGRAMD_POLL_MS", "25");
        assert_eq!(poll_interval(), Duration::from_millis(25));
        std::env::remove_var("ENGRAMD_POLL_MS");
    }

    #[test]
    #[serial]
    fn garbage_values_fall_back_to_default() {
        std::env::set_var("ENGRAMD_POLL_MS", "soon");
        assert_eq!(poll_interval(), Duration::from_secs(2));
        std::env::remove_var("ENGRAMD_POLL_MS");
    }
}
