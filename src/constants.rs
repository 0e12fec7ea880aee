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

//! Constants and configuration defaults for hal-xadc
//!
//! Paths, sampler defaults and the physical constants of the divider live here
//! so the other modules never carry bare numbers.

/// System paths
pub mod paths {
    /// IIO device directory exposing the XADC raw-value files
    pub const IIO_DEVICE_DIR: &str = "/sys/bus/iio/devices/iio:device0/";

    /// Directory searched for thermistor table files (`<name>.txt`)
    pub const THERMISTOR_DIR: &str = "/usr/share/hal-xadc/thermistors";

    /// Suffix of IIO raw-value files
    pub const RAW_SUFFIX: &str = "_raw";

    /// Extension of thermistor table files
    pub const TABLE_EXTENSION: &str = "txt";

    /// Systemd journal socket; journald logging is used when it exists
    pub const JOURNALD_SOCKET: &str = "/run/systemd/journal/socket";
}

/// Sampler defaults
pub mod sampler {
    /// Seconds between sampling ticks
    pub const DEFAULT_INTERVAL_SECS: f64 = 0.05;

    /// Moving-average window length
    pub const DEFAULT_FILTER_SIZE: usize = 10;

    /// Largest accepted moving-average window
    pub const MAX_FILTER_SIZE: usize = 10_000;

    /// Default baseboard name
    pub const DEFAULT_BASEBOARD: &str = "Replicookie";

    /// Curve name that disables temperature conversion
    pub const NO_CURVE: &str = "none";

    /// Process-wide status pins
    pub const ERROR_PIN: &str = "error";
    pub const NO_ERROR_PIN: &str = "no-error";
    pub const WATCHDOG_PIN: &str = "watchdog";

    /// Per-channel pin suffixes
    pub const RAW_PIN_SUFFIX: &str = "raw";
    pub const VALUE_PIN_SUFFIX: &str = "value";
}

/// Voltage divider constants
pub mod divider {
    /// ADC full scale (12 bit)
    pub const ADC_FULL_SCALE: f64 = 4096.0;

    /// Default pull-up resistance in ohms
    pub const DEFAULT_R_PU: f64 = 2000.0;

    /// Pull-down resistance of the Replicookie divider in ohms
    pub const REPLICOOKIE_R_PD: f64 = 2000.0;

    /// Floor for the pull-up current in amperes.
    ///
    /// Keeps noisy or saturated readings from dividing by zero or going
    /// negative. The value carries over from the board bring-up scripts and
    /// has no derivation of its own; treat it as a tuning choice.
    pub const MIN_PULLUP_CURRENT: f64 = 0.000_001;
}

/// Thermistor constants
pub mod thermistor {
    /// 0 °C in kelvin
    pub const KELVIN_OFFSET: f64 = 273.15;

    /// Reference temperature of beta models (25 °C) in kelvin
    pub const T25_KELVIN: f64 = 298.15;

    /// Smallest resistance fed into the beta equation, in ohms
    pub const MIN_RESISTANCE: f64 = 1.0;
}

/// Environment variables
pub mod env {
    /// Log filter override (same syntax as RUST_LOG)
    pub const LOG_FILTER: &str = "HAL_XADC_LOG";
}
