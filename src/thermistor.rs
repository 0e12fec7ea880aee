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

//! Thermistor resistance -> temperature curves
//!
//! Built-in models use the beta equation. Any other name is looked up as a
//! `<name>.txt` table of `temperature resistance` rows in the thermistor
//! directory and interpolated linearly.

use std::fs;
use std::path::{Path, PathBuf};

use hx_error::{HalXadcError, Result};
use serde::{Deserialize, Serialize};

use crate::constants::{paths, thermistor as th};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TablePoint {
    pub temp_c: f64,
    pub ohms: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CurveKind {
    /// `1/T = 1/T25 + ln(R/R25) / beta`
    Beta { r25: f64, beta: f64 },
    /// Points sorted by ascending resistance
    Table(Vec<TablePoint>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ThermistorCurve {
    name: String,
    kind: CurveKind,
}

/// (name, R25 in ohms, beta)
const BUILTIN_MODELS: &[(&str, f64, f64)] = &[
    ("epcos_B57560G1104", 100_000.0, 4092.0),
    ("semitec_103GT_2", 10_000.0, 3435.0),
    ("semitec_104GT_2", 100_000.0, 4267.0),
    ("honeywell_100k_135_104LAG_J01", 100_000.0, 3974.0),
    ("ntc_10k_3950", 10_000.0, 3950.0),
];

pub fn builtin_names() -> impl Iterator<Item = &'static str> {
    BUILTIN_MODELS.iter().map(|(name, _, _)| *name)
}

pub fn table_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.{}", name, paths::TABLE_EXTENSION))
}

impl ThermistorCurve {
    pub fn beta(name: impl Into<String>, r25: f64, beta: f64) -> Self {
        Self { name: name.into(), kind: CurveKind::Beta { r25, beta } }
    }

    /// Build a table curve; points may come in any order.
    pub fn table(name: impl Into<String>, mut points: Vec<TablePoint>) -> std::result::Result<Self, String> {
        validate_table(&points)?;
        points.sort_by(|a, b| a.ohms.total_cmp(&b.ohms));
        Ok(Self { name: name.into(), kind: CurveKind::Table(points) })
    }

    /// Resolve a thermistor by name: built-in model first, then `<dir>/<name>.txt`.
    pub fn load(name: &str, dir: &Path) -> Result<Self> {
        if let Some((n, r25, beta)) = BUILTIN_MODELS.iter().find(|(n, _, _)| *n == name) {
            return Ok(Self::beta(*n, *r25, *beta));
        }
        if !is_safe_name(name) {
            return Err(HalXadcError::UnknownThermistor {
                name: name.to_string(),
                path: dir.to_path_buf(),
            });
        }
        let path = table_path(dir, name);
        let data = match fs::read_to_string(&path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(HalXadcError::UnknownThermistor { name: name.to_string(), path });
            }
            Err(source) => return Err(HalXadcError::FileRead { path, source }),
        };
        let points = parse_table(&data)
            .map_err(|reason| HalXadcError::InvalidThermistorTable { path: path.clone(), reason })?;
        Self::table(name, points)
            .map_err(|reason| HalXadcError::InvalidThermistorTable { path, reason })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &CurveKind {
        &self.kind
    }

    /// Temperature in °C for a resistance in ohms.
    pub fn r2t(&self, ohms: f64) -> f64 {
        match &self.kind {
            CurveKind::Beta { r25, beta } => {
                let r = if ohms.is_nan() { th::MIN_RESISTANCE } else { ohms.max(th::MIN_RESISTANCE) };
                let inv_t = 1.0 / th::T25_KELVIN + (r / r25).ln() / beta;
                1.0 / inv_t - th::KELVIN_OFFSET
            }
            CurveKind::Table(points) => interp_temperature(points, ohms),
        }
    }
}

/// Round to one decimal place, the resolution published on the value pin.
pub fn round_tenth(temp_c: f64) -> f64 {
    (temp_c * 10.0).round() / 10.0
}

fn is_safe_name(s: &str) -> bool {
    if s.is_empty() || s.len() > 128 { return false; }
    s.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')) && !s.contains("..")
}

pub fn parse_table(data: &str) -> std::result::Result<Vec<TablePoint>, String> {
    let mut points = Vec::new();
    for (lineno, line) in data.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') { continue; }
        let fields: Vec<&str> = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|f| !f.is_empty())
            .collect();
        if fields.len() != 2 {
            return Err(format!("line {}: expected 'temperature resistance'", lineno + 1));
        }
        let temp_c = fields[0]
            .parse::<f64>()
            .map_err(|_| format!("line {}: bad temperature {:?}", lineno + 1, fields[0]))?;
        let ohms = fields[1]
            .parse::<f64>()
            .map_err(|_| format!("line {}: bad resistance {:?}", lineno + 1, fields[1]))?;
        points.push(TablePoint { temp_c, ohms });
    }
    Ok(points)
}

fn validate_table(points: &[TablePoint]) -> std::result::Result<(), String> {
    if points.len() < 2 { return Err("table must have at least two points".into()); }
    if points.len() > 4096 { return Err("too many table points (max 4096)".into()); }
    for p in points {
        if !p.temp_c.is_finite() || !p.ohms.is_finite() { return Err("table values must be finite".into()); }
        if p.ohms <= 0.0 { return Err("resistance must be positive".into()); }
    }
    // resistance must be strictly monotonic in temperature (either direction)
    let mut by_temp: Vec<&TablePoint> = points.iter().collect();
    by_temp.sort_by(|a, b| a.temp_c.total_cmp(&b.temp_c));
    let rising = by_temp[1].ohms > by_temp[0].ohms;
    for w in by_temp.windows(2) {
        if w[0].temp_c == w[1].temp_c { return Err("duplicate temperature".into()); }
        let ok = if rising { w[1].ohms > w[0].ohms } else { w[1].ohms < w[0].ohms };
        if !ok { return Err("resistance must be strictly monotonic in temperature".into()); }
    }
    Ok(())
}

/// Linear interpolation over points sorted by resistance, clamped at both ends.
pub fn interp_temperature(points: &[TablePoint], ohms: f64) -> f64 {
    if points.is_empty() { return f64::NAN; }
    let first = &points[0];
    let last = &points[points.len() - 1];
    if ohms.is_nan() || ohms <= first.ohms { return first.temp_c; }
    if ohms >= last.ohms { return last.temp_c; }
    for w in points.windows(2) {
        let a = &w[0];
        let b = &w[1];
        if ohms >= a.ohms && ohms <= b.ohms {
            let t = (ohms - a.ohms) / (b.ohms - a.ohms);
            return a.temp_c + t * (b.temp_c - a.temp_c);
        }
    }
    last.temp_c
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_test_table() -> Vec<TablePoint> {
        vec![
            TablePoint { temp_c: 0.0, ohms: 32_650.0 },
            TablePoint { temp_c: 25.0, ohms: 10_000.0 },
            TablePoint { temp_c: 50.0, ohms: 3_603.0 },
            TablePoint { temp_c: 100.0, ohms: 678.0 },
        ]
    }

    #[test]
    fn test_beta_at_reference_point() {
        let c = ThermistorCurve::load("semitec_103GT_2", Path::new("/nonexistent")).unwrap();
        assert!((c.r2t(10_000.0) - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_beta_is_ntc() {
        let c = ThermistorCurve::load("epcos_B57560G1104", Path::new("/nonexistent")).unwrap();
        let hot = c.r2t(1_000.0);
        let warm = c.r2t(100_000.0);
        let cold = c.r2t(300_000.0);
        assert!(hot > warm && warm > cold);
        assert!((warm - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_beta_non_positive_resistance_is_finite() {
        let c = ThermistorCurve::beta("t", 10_000.0, 3950.0);
        assert!(c.r2t(-1333.0).is_finite());
        assert_eq!(c.r2t(-1333.0), c.r2t(0.0));
        assert!(c.r2t(f64::NAN).is_finite());
    }

    #[test]
    fn test_table_interpolation() {
        let c = ThermistorCurve::table("t", create_test_table()).unwrap();
        assert_eq!(c.r2t(10_000.0), 25.0);
        // halfway between 3603 and 10000 ohms
        let mid = (3_603.0 + 10_000.0) / 2.0;
        assert!((c.r2t(mid) - 37.5).abs() < 1e-9);
    }

    #[test]
    fn test_table_clamps_out_of_range() {
        let c = ThermistorCurve::table("t", create_test_table()).unwrap();
        assert_eq!(c.r2t(100.0), 100.0);
        assert_eq!(c.r2t(1e9), 0.0);
        assert_eq!(c.r2t(-5.0), 100.0);
    }

    #[test]
    fn test_table_validation() {
        assert!(ThermistorCurve::table("t", vec![TablePoint { temp_c: 0.0, ohms: 1.0 }]).is_err());
        let non_monotonic = vec![
            TablePoint { temp_c: 0.0, ohms: 100.0 },
            TablePoint { temp_c: 10.0, ohms: 50.0 },
            TablePoint { temp_c: 20.0, ohms: 70.0 },
        ];
        assert!(ThermistorCurve::table("t", non_monotonic).is_err());
        let negative = vec![
            TablePoint { temp_c: 0.0, ohms: -1.0 },
            TablePoint { temp_c: 10.0, ohms: 50.0 },
        ];
        assert!(ThermistorCurve::table("t", negative).is_err());
    }

    #[test]
    fn test_parse_table_formats() {
        let data = "# temp ohms\n0 32650\n25,10000\n\n 50\t3603 \n";
        let pts = parse_table(data).unwrap();
        assert_eq!(pts.len(), 3);
        assert_eq!(pts[1], TablePoint { temp_c: 25.0, ohms: 10_000.0 });
        assert!(parse_table("0 1 2\n").is_err());
        assert!(parse_table("abc 1\n").is_err());
    }

    #[test]
    fn test_load_table_file() {
        let dir = TempDir::new().unwrap();
        let mut f = fs::File::create(table_path(dir.path(), "custom_ntc")).unwrap();
        writeln!(f, "0 32650").unwrap();
        writeln!(f, "25 10000").unwrap();
        writeln!(f, "100 678").unwrap();
        drop(f);

        let c = ThermistorCurve::load("custom_ntc", dir.path()).unwrap();
        assert_eq!(c.name(), "custom_ntc");
        assert!(matches!(c.kind(), CurveKind::Table(p) if p.len() == 3));
        assert_eq!(c.r2t(10_000.0), 25.0);
    }

    #[test]
    fn test_load_unknown_thermistor() {
        let dir = TempDir::new().unwrap();
        let err = ThermistorCurve::load("nope", dir.path()).unwrap_err();
        assert!(matches!(err, HalXadcError::UnknownThermistor { .. }));
        let err = ThermistorCurve::load("../etc/passwd", dir.path()).unwrap_err();
        assert!(matches!(err, HalXadcError::UnknownThermistor { .. }));
    }

    #[test]
    fn test_load_invalid_table_file() {
        let dir = TempDir::new().unwrap();
        fs::write(table_path(dir.path(), "bad"), "0 100\n").unwrap();
        let err = ThermistorCurve::load("bad", dir.path()).unwrap_err();
        assert!(matches!(err, HalXadcError::InvalidThermistorTable { .. }));
    }

    #[test]
    fn test_round_tenth() {
        assert_eq!(round_tenth(21.349), 21.3);
        assert_eq!(round_tenth(21.35), 21.4);
        assert_eq!(round_tenth(-3.26), -3.3);
    }

    #[test]
    fn test_builtin_names_resolve() {
        for name in builtin_names() {
            let c = ThermistorCurve::load(name, Path::new("/nonexistent")).unwrap();
            assert_eq!(c.name(), name);
        }
    }
}
