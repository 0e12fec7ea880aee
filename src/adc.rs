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
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use hx_error::{HalXadcError, Result};
use tracing::debug;

use crate::constants::paths;

/// Glob-style pattern shown in diagnostics for a channel id.
pub fn raw_pattern(channel_id: &str) -> String {
    format!("*{}{}", channel_id, paths::RAW_SUFFIX)
}

/// Find the single raw-value file for a channel id (`*<id>_raw`) in the IIO directory.
///
/// Zero matches and more than one match are both errors; the sampler needs an
/// unambiguous source for every pin it publishes.
pub fn resolve_raw_path(device_dir: &Path, channel_id: &str) -> Result<PathBuf> {
    if channel_id.is_empty() {
        return Err(HalXadcError::EmptyChannelId);
    }
    let pattern = raw_pattern(channel_id);
    let suffix = format!("{}{}", channel_id, paths::RAW_SUFFIX);

    let entries = match fs::read_dir(device_dir) {
        Ok(it) => it,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(HalXadcError::ChannelNotFound { dir: device_dir.to_path_buf(), pattern });
        }
        Err(source) => return Err(HalXadcError::FileRead { path: device_dir.to_path_buf(), source }),
    };

    let mut matches: Vec<PathBuf> = Vec::new();
    for ent in entries.flatten() {
        let fname = ent.file_name();
        let fname = fname.to_string_lossy();
        if !fname.ends_with(&suffix) { continue; }
        let path = ent.path();
        // sysfs attributes are regular files; skip directories that happen to match
        if path.is_dir() { continue; }
        matches.push(path);
    }
    matches.sort();

    match matches.len() {
        0 => Err(HalXadcError::ChannelNotFound { dir: device_dir.to_path_buf(), pattern }),
        1 => {
            let path = matches.remove(0);
            debug!("channel {} -> {}", channel_id, path.display());
            Ok(path)
        }
        _ => Err(HalXadcError::AmbiguousChannel { pattern, matches }),
    }
}

/// Check that a resolved raw-value file can be opened for reading.
pub fn check_readable(path: &Path) -> Result<()> {
    fs::File::open(path)
        .map(|_| ())
        .map_err(|source| HalXadcError::ChannelUnreadable { path: path.to_path_buf(), source })
}

/// Read the first line of a raw-value file and parse it as a float.
pub fn read_raw(path: &Path) -> Result<f64> {
    let file = fs::File::open(path)
        .map_err(|source| HalXadcError::FileRead { path: path.to_path_buf(), source })?;
    let mut line = String::new();
    BufReader::new(file)
        .read_line(&mut line)
        .map_err(|source| HalXadcError::FileRead { path: path.to_path_buf(), source })?;
    parse_sample(line.trim()).ok_or_else(|| HalXadcError::InvalidSample {
        path: path.to_path_buf(),
        value: line.trim().to_string(),
    })
}

fn parse_sample(s: &str) -> Option<f64> {
    let v = s.parse::<f64>().ok()?;
    v.is_finite().then_some(v)
}

/// Raw-value attributes present in an IIO directory, sorted by name.
pub fn list_raw_inputs(device_dir: &Path) -> Vec<String> {
    let mut out: Vec<String> = fs::read_dir(device_dir)
        .map(|entries| {
            entries
                .flatten()
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .filter(|n| n.ends_with(paths::RAW_SUFFIX))
                .collect()
        })
        .unwrap_or_default();
    out.sort();
    out
}
