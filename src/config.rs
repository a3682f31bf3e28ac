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

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::sysfs::ParsePolicy;

pub const I2C_BUS: u32 = 2;
pub const SENSOR_ADDR: u16 = 0x5a;
pub const TEMP_AMBIENT_REG: u8 = 0x06;
pub const TEMP_OBJECT_REG: u8 = 0x07;

pub const IIO_ROOT: &str = "/sys/bus/iio/devices";
pub const IIO_STATIC_DEVICE: &str = "iio:device1";
pub const DRIVER_NAME: &str = "mlx90614";

/// Shown when the IIO device is missing.
pub const MODULE_HINT: &str = "Make sure the module is loaded: insmod /oem/usr/ko/mlx90614.ko";

pub const POLL_INTERVAL_SECS: u64 = 2;

/// Write the JSON event log (see `logger`). Off unless rebuilt with this set.
pub const EVENT_LOG_ENABLED: bool = false;

/// Where to find the sensor. Every field comes from a compiled constant;
/// tests build their own instances pointing at temporary trees.
#[derive(Debug, Clone, Serialize)]
pub struct SensorConfig {
    pub i2c_bus: u32,
    pub slave_address: u16,
    pub ambient_register: u8,
    pub object_register: u8,
    pub iio_root: PathBuf,
    pub iio_static_device: String,
    pub driver_name: String,
    pub parse_policy: ParsePolicy,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            i2c_bus: I2C_BUS,
            slave_address: SENSOR_ADDR,
            ambient_register: TEMP_AMBIENT_REG,
            object_register: TEMP_OBJECT_REG,
            iio_root: PathBuf::from(IIO_ROOT),
            iio_static_device: IIO_STATIC_DEVICE.to_string(),
            driver_name: DRIVER_NAME.to_string(),
            parse_policy: ParsePolicy::default(),
        }
    }
}

impl SensorConfig {
    pub fn iio_static_path(&self) -> PathBuf {
        self.iio_root.join(&self.iio_static_device)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PollConfig {
    #[serde(serialize_with = "serialize_secs")]
    pub interval: Duration,
    /// Decimal places in console output.
    pub precision: usize,
}

impl PollConfig {
    /// Register backend output, one decimal place.
    pub fn register() -> Self {
        Self { interval: Duration::from_secs(POLL_INTERVAL_SECS), precision: 1 }
    }

    /// Sysfs backend output, two decimal places.
    pub fn sysfs() -> Self {
        Self { interval: Duration::from_secs(POLL_INTERVAL_SECS), precision: 2 }
    }
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}
