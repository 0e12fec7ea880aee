/*
 * This file is part of hal-xadc.
 *
 * Copyright (C) 2025 hal-xadc contributors
 *
 * hal-xadc is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * hal-xadc is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with hal-xadc. If not, see <https://www.gnu.org/licenses/>.
 */

use std::io::IsTerminal;
use std::path::Path;

use tracing_subscriber::EnvFilter;

use crate::constants::{env, paths};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LogSink {
    Journald,
    Stderr,
}

/// Filter directive for a `-v` count. `HAL_XADC_LOG` wins when set.
pub fn level_for_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

pub fn filter_directive(verbose: u8) -> String {
    std::env::var(env::LOG_FILTER)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| level_for_verbosity(verbose).to_string())
}

/// Journald when its socket exists, stderr otherwise.
pub fn preferred_sink(journald_socket: &Path) -> LogSink {
    if journald_socket.exists() {
        LogSink::Journald
    } else {
        LogSink::Stderr
    }
}

/// Install the global subscriber: journald on systemd hosts, stderr otherwise.
///
/// Returns the sink actually in use. Calling it twice is harmless; the second
/// subscriber is dropped.
pub fn init_logging(verbose: u8) -> LogSink {
    let directive = filter_directive(verbose);

    if preferred_sink(Path::new(paths::JOURNALD_SOCKET)) == LogSink::Journald {
        match tracing_journald::layer() {
            Ok(journald_layer) => {
                use tracing_subscriber::prelude::*;
                let _ = tracing_subscriber::registry()
                    .with(journald_layer)
                    .with(EnvFilter::new(&directive))
                    .try_init();
                return LogSink::Journald;
            }
            Err(e) => {
                eprintln!("Failed to create journald layer: {}, falling back to stderr", e);
            }
        }
    }

    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::new(&directive))
        .try_init();
    LogSink::Stderr
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_level_for_verbosity() {
        assert_eq!(level_for_verbosity(0), "warn");
        assert_eq!(level_for_verbosity(1), "info");
        assert_eq!(level_for_verbosity(2), "debug");
        assert_eq!(level_for_verbosity(9), "trace");
    }

    #[test]
    fn test_preferred_sink() {
        let dir = tempfile::TempDir::new().unwrap();
        let socket = dir.path().join("socket");
        assert_eq!(preferred_sink(&socket), LogSink::Stderr);
        std::fs::write(&socket, "").unwrap();
        assert_eq!(preferred_sink(&socket), LogSink::Journald);
    }

    #[test]
    #[serial]
    fn test_env_override() {
        std::env::set_var(env::LOG_FILTER, "hal_xadc=trace");
        assert_eq!(filter_directive(0), "hal_xadc=trace");
        std::env::set_var(env::LOG_FILTER, "  ");
        assert_eq!(filter_directive(1), "info");
        std::env::remove_var(env::LOG_FILTER);
        assert_eq!(filter_directive(2), "debug");
    }
}
