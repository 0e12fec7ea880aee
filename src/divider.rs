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

//! Baseboard voltage dividers
//!
//! On the Replicookie board the thermistor sits in a divider fed from the ADC
//! reference. The ADC reads the thermistor voltage `V_T` as a fraction of full
//! scale; all thermistor current flows through the pull-up, so
//!
//! ```text
//! V_T  = raw / 4096
//! I_PU = max((1 - V_T) / R_PU, I_MIN)
//! R_T  = V_T / I_PU - R_PD
//! ```

use std::fmt;
use std::str::FromStr;

use hx_error::HalXadcError;
use serde::{Deserialize, Serialize};

use crate::constants::divider as div;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Baseboard {
    Replicookie,
}

impl Baseboard {
    pub const ALL: &'static [Baseboard] = &[Baseboard::Replicookie];

    pub fn name(&self) -> &'static str {
        match self {
            Baseboard::Replicookie => "Replicookie",
        }
    }

    pub fn valid_names() -> String {
        Self::ALL.iter().map(|b| b.name()).collect::<Vec<_>>().join(", ")
    }

    /// Thermistor resistance in ohms for a filtered raw ADC value.
    pub fn resistance(&self, raw: f64, r_pu: f64) -> f64 {
        match self {
            Baseboard::Replicookie => {
                let v_t = raw / div::ADC_FULL_SCALE;
                let i_pu = pullup_current(v_t, r_pu);
                v_t / i_pu - div::REPLICOOKIE_R_PD
            }
        }
    }
}

/// Pull-up current for a normalised thermistor voltage, clamped to a positive floor.
pub fn pullup_current(v_t: f64, r_pu: f64) -> f64 {
    let i = (1.0 - v_t) / r_pu;
    // NaN from a broken reading also lands on the floor
    if i.is_nan() {
        return div::MIN_PULLUP_CURRENT;
    }
    i.max(div::MIN_PULLUP_CURRENT)
}

impl FromStr for Baseboard {
    type Err = HalXadcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|b| b.name() == s)
            .ok_or_else(|| HalXadcError::UnknownBaseboard {
                name: s.to_string(),
                valid: Self::valid_names(),
            })
    }
}

impl fmt::Display for Baseboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_baseboard() {
        assert_eq!("Replicookie".parse::<Baseboard>().unwrap(), Baseboard::Replicookie);
        let err = "CRAMPS".parse::<Baseboard>().unwrap_err();
        assert!(matches!(err, HalXadcError::UnknownBaseboard { .. }));
        assert!(err.to_string().contains("Replicookie"));
    }

    #[test]
    fn test_midscale_resistance() {
        // V_T = 0.5, I = 0.5 / 2000, R = 0.5 / 0.00025 - 2000 = 0
        let r = Baseboard::Replicookie.resistance(2048.0, 2000.0);
        assert!(r.abs() < 1e-9, "r = {}", r);
    }

    #[test]
    fn test_quarter_scale_resistance() {
        // V_T = 0.25, I = 0.75 / 2000, R = 0.25 * 2000 / 0.75 - 2000
        let r = Baseboard::Replicookie.resistance(1024.0, 2000.0);
        let expected = 0.25 * 2000.0 / 0.75 - 2000.0;
        assert!((r - expected).abs() < 1e-9);
    }

    #[test]
    fn test_saturated_input_hits_current_floor() {
        let r = Baseboard::Replicookie.resistance(4096.0, 2000.0);
        assert!(r.is_finite());
        assert!((r - 998_000.0).abs() < 1e-6, "r = {}", r);
    }

    #[test]
    fn test_over_range_input_stays_on_floor() {
        // Noise above full scale would give a negative current without the clamp
        let i = pullup_current(1.2, 2000.0);
        assert_eq!(i, div::MIN_PULLUP_CURRENT);
        assert!(Baseboard::Replicookie.resistance(5000.0, 2000.0).is_finite());
    }

    #[test]
    fn test_current_always_positive() {
        for raw in [0.0, 1.0, 2047.0, 4095.0, 4096.0, 1e9, f64::NAN] {
            let i = pullup_current(raw / div::ADC_FULL_SCALE, 2000.0);
            assert!(i > 0.0, "raw {} gave {}", raw, i);
        }
    }

    #[test]
    fn test_pullup_value_is_honoured() {
        let a = Baseboard::Replicookie.resistance(1024.0, 2000.0);
        let b = Baseboard::Replicookie.resistance(1024.0, 4700.0);
        assert!(b > a);
    }
}
