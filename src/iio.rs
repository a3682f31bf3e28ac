/*
 * This file is part of mlxtemp.
 *
 * Copyright (C) 2025 mlxtemp contributors
 *
 * mlxtemp is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * mlxtemp is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with mlxtemp. If not, see <https://www.gnu.org/licenses/>.
 */

//! IIO sysfs device location and channel reads.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;

use crate::conversion::iio_to_celsius;
use crate::error::{Result, SensorError};
use crate::logger;
use crate::source::Channel;
use crate::sysfs::{read_attribute, read_float, read_int, ParsePolicy};

const DEVICE_PREFIX: &str = "iio:device";

/// Attribute paths of one IIO device, resolved once and never re-discovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IioDevice {
    dir: PathBuf,
    object_raw: PathBuf,
    ambient_raw: PathBuf,
    scale: PathBuf,
    offset: PathBuf,
}

impl IioDevice {
    /// Use `dir` as-is, without checking what it contains.
    pub fn at<P: Into<PathBuf>>(dir: P) -> Self {
        let dir = dir.into();
        Self {
            object_raw: dir.join("in_temp_object_raw"),
            ambient_raw: dir.join("in_temp_ambient_raw"),
            scale: dir.join("in_temp_scale"),
            offset: dir.join("in_temp_offset"),
            dir,
        }
    }

    /// Use a fixed device directory after checking its `name` attribute.
    pub fn open_static<P: Into<PathBuf>>(dir: P, driver: &str) -> Result<Self> {
        let dir = dir.into();
        let name_path = dir.join("name");
        let name = read_attribute(&name_path).map_err(|_| SensorError::SensorNotFound {
            root: dir.clone(),
            driver: driver.to_string(),
        })?;
        if name != driver {
            return Err(SensorError::UnexpectedName { path: name_path, found: name });
        }
        logger::log_event("sensor_found", json!({ "path": dir.display().to_string(), "mode": "static" }));
        Ok(Self::at(dir))
    }

    /// Scan `root` for an `iio:deviceN` entry whose `name` equals `driver`.
    ///
    /// Candidates are visited in ascending N; the first match wins. Entries
    /// with other names, or whose `name` cannot be read, are skipped.
    pub fn discover<P: AsRef<Path>>(root: P, driver: &str) -> Result<Self> {
        let root = root.as_ref();
        let not_found = || SensorError::SensorNotFound { root: root.to_path_buf(), driver: driver.to_string() };

        let entries = fs::read_dir(root).map_err(|_| not_found())?;
        let mut candidates: Vec<(usize, PathBuf)> = entries
            .flatten()
            .filter_map(|ent| {
                let fname = ent.file_name();
                let idx = device_index(&fname.to_string_lossy())?;
                Some((idx, ent.path()))
            })
            .collect();
        candidates.sort_by_key(|(idx, _)| *idx);

        for (_, dir) in candidates {
            if let Ok(name) = read_attribute(dir.join("name")) {
                if name == driver {
                    logger::log_event(
                        "sensor_found",
                        json!({ "path": dir.display().to_string(), "mode": "scan" }),
                    );
                    return Ok(Self::at(dir));
                }
            }
        }
        Err(not_found())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn raw_path(&self, channel: Channel) -> &Path {
        match channel {
            Channel::Object => &self.object_raw,
            Channel::Ambient => &self.ambient_raw,
        }
    }

    /// Read raw, scale and offset for `channel` and convert to Celsius.
    /// Scale and offset are shared by both channels and read fresh every time.
    pub fn read_celsius(&self, channel: Channel, policy: ParsePolicy) -> Result<f64> {
        let raw = read_int(self.raw_path(channel), policy)?;
        let scale = read_float(&self.scale, policy)?;
        let offset = read_float(&self.offset, policy)?;
        Ok(iio_to_celsius(raw as f64, offset, scale))
    }
}

/// `iio:device3` -> 3. Anything else (triggers, buffers, `iio:device`) -> None.
pub fn device_index(fname: &str) -> Option<usize> {
    let digits = fname.strip_prefix(DEVICE_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
