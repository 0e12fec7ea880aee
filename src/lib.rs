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

//! hal-xadc - XADC thermistor sampler for a HAL-style signal bus
//!
//! Reads raw ADC values from Linux IIO sysfs files, smooths them with a moving
//! average, converts them to temperatures through a voltage divider and a
//! thermistor curve, and publishes the results as pins.

pub mod adc;
pub mod config;
pub mod constants;
pub mod divider;
pub mod filter;
pub mod hal;
pub mod logger;
pub mod sampler;
pub mod thermistor;

pub use hx_error::{HalXadcError, Result};

#[cfg(test)]
pub mod test_utils;
