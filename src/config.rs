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

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use hx_error::{HalXadcError, Result};
use serde::{Deserialize, Serialize};

use crate::constants::{paths, sampler as defaults, divider};
use crate::divider::Baseboard;

/// HAL component to read ADC values and convert to temperature
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "hal_xadc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "HAL component to read ADC values and convert to temperature")]
pub struct Cli {
    /// HAL component name
    #[arg(short, long, required_unless_present = "config")]
    pub name: Option<String>,

    /// ADC update interval in seconds [default: 0.05]
    #[arg(short, long)]
    pub interval: Option<f64>,

    /// Comma separated list of channels and thermistors to use,
    /// e.g. 01:semitec_103GT_2,02:epcos_B57560G1104 (`none` publishes raw only)
    #[arg(short, long, required_unless_present = "config")]
    pub channels: Option<String>,

    /// Size of the low pass filter to use [default: 10]
    #[arg(short, long = "filter_size")]
    pub filter_size: Option<usize>,

    /// Type of baseboard used [default: Replicookie]
    #[arg(short, long)]
    pub baseboard: Option<String>,

    /// Divider pull-up resistor value in ohms [default: 2000]
    #[arg(short, long = "r_pu")]
    pub r_pu: Option<f64>,

    /// IIO device directory holding the raw-value files
    #[arg(long = "device_dir")]
    pub device_dir: Option<PathBuf>,

    /// Directory searched for thermistor table files (<name>.txt)
    #[arg(long = "thermistor_dir")]
    pub thermistor_dir: Option<PathBuf>,

    /// Write a JSON snapshot of all pins to this file after every tick
    #[arg(long = "status_file")]
    pub status_file: Option<PathBuf>,

    /// JSON configuration file; command line flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// On-disk configuration; every field is optional and overridden by the CLI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub interval: Option<f64>,
    #[serde(default)]
    pub channels: Option<String>,
    #[serde(default)]
    pub filter_size: Option<usize>,
    #[serde(default)]
    pub baseboard: Option<String>,
    #[serde(default)]
    pub r_pu: Option<f64>,
    #[serde(default)]
    pub device_dir: Option<PathBuf>,
    #[serde(default)]
    pub thermistor_dir: Option<PathBuf>,
    #[serde(default)]
    pub status_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSpec {
    pub id: String,
    /// `None` when the entry names the `none` curve
    pub curve: Option<String>,
}

/// Validated sampler configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerConfig {
    pub name: String,
    pub interval: Duration,
    pub channels: Vec<ChannelSpec>,
    pub filter_size: usize,
    pub baseboard: Baseboard,
    pub r_pu: f64,
    pub device_dir: PathBuf,
    pub thermistor_dir: PathBuf,
    pub status_file: Option<PathBuf>,
}

pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    let data = fs::read_to_string(path)
        .map_err(|source| HalXadcError::FileRead { path: path.to_path_buf(), source })?;
    Ok(serde_json::from_str(&data)?)
}

fn is_safe_label(s: &str) -> bool {
    if s.is_empty() || s.len() > 64 { return false; }
    s.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Parse `id:curve[,id:curve...]`.
pub fn parse_channels(list: &str) -> Result<Vec<ChannelSpec>> {
    let mut out: Vec<ChannelSpec> = Vec::new();
    if list.trim().is_empty() {
        return Err(HalXadcError::MissingConfig("channels".into()));
    }
    for entry in list.split(',') {
        let entry = entry.trim();
        let (id, curve) = entry
            .split_once(':')
            .ok_or_else(|| HalXadcError::invalid_channel(entry, "expected 'channel:thermistor'"))?;
        let id = id.trim();
        let curve = curve.trim();
        if id.is_empty() {
            return Err(HalXadcError::EmptyChannelId);
        }
        if !is_safe_label(id) {
            return Err(HalXadcError::invalid_channel(entry, "invalid characters in channel id"));
        }
        if curve.is_empty() {
            return Err(HalXadcError::invalid_channel(entry, "empty thermistor name"));
        }
        if out.iter().any(|c| c.id == id) {
            return Err(HalXadcError::invalid_channel(entry, "channel listed twice"));
        }
        out.push(ChannelSpec {
            id: id.to_string(),
            curve: (curve != defaults::NO_CURVE).then(|| curve.to_string()),
        });
    }
    Ok(out)
}

impl SamplerConfig {
    /// Merge CLI over file config over defaults, then validate.
    pub fn resolve(cli: &Cli, file: Option<&FileConfig>) -> Result<Self> {
        let empty = FileConfig::default();
        let file = file.unwrap_or(&empty);

        let name = cli
            .name
            .clone()
            .or_else(|| file.name.clone())
            .ok_or_else(|| HalXadcError::MissingConfig("name".into()))?;
        if name.trim().is_empty() || name.chars().any(|c| c.is_whitespace()) {
            return Err(HalXadcError::invalid_config("name", "must be a non-empty word"));
        }

        let interval_secs = cli.interval.or(file.interval).unwrap_or(defaults::DEFAULT_INTERVAL_SECS);
        if !interval_secs.is_finite() || interval_secs <= 0.0 {
            return Err(HalXadcError::invalid_config("interval", format!("{} is not a positive number of seconds", interval_secs)));
        }
        let interval = Duration::try_from_secs_f64(interval_secs)
            .map_err(|e| HalXadcError::invalid_config("interval", e.to_string()))?;

        let channels_raw = cli
            .channels
            .clone()
            .or_else(|| file.channels.clone())
            .ok_or_else(|| HalXadcError::MissingConfig("channels".into()))?;
        let channels = parse_channels(&channels_raw)?;

        let filter_size = cli.filter_size.or(file.filter_size).unwrap_or(defaults::DEFAULT_FILTER_SIZE);
        if filter_size == 0 || filter_size > defaults::MAX_FILTER_SIZE {
            return Err(HalXadcError::invalid_config(
                "filter_size",
                format!("{} not in 1..={}", filter_size, defaults::MAX_FILTER_SIZE),
            ));
        }

        let baseboard: Baseboard = cli
            .baseboard
            .as_deref()
            .or(file.baseboard.as_deref())
            .unwrap_or(defaults::DEFAULT_BASEBOARD)
            .parse()?;

        let r_pu = cli.r_pu.or(file.r_pu).unwrap_or(divider::DEFAULT_R_PU);
        if !r_pu.is_finite() || r_pu <= 0.0 {
            return Err(HalXadcError::invalid_config("r_pu", format!("{} is not a positive resistance", r_pu)));
        }

        let device_dir = cli
            .device_dir
            .clone()
            .or_else(|| file.device_dir.clone())
            .unwrap_or_else(|| PathBuf::from(paths::IIO_DEVICE_DIR));
        let thermistor_dir = cli
            .thermistor_dir
            .clone()
            .or_else(|| file.thermistor_dir.clone())
            .unwrap_or_else(|| PathBuf::from(paths::THERMISTOR_DIR));
        let status_file = cli.status_file.clone().or_else(|| file.status_file.clone());

        Ok(Self {
            name,
            interval,
            channels,
            filter_size,
            baseboard,
            r_pu,
            device_dir,
            thermistor_dir,
            status_file,
        })
    }

    /// Load the optional config file named by the CLI and resolve.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let file = match &cli.config {
            Some(p) => Some(load_file_config(p)?),
            None => None,
        };
        Self::resolve(cli, file.as_ref())
    }
}
