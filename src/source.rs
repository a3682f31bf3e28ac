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

//! The temperature-source capability and its two backends.

use std::fmt;

use serde::Serialize;

use crate::config::SensorConfig;
use crate::conversion::{is_plausible, register_to_celsius};
use crate::error::{Result, SensorError};
use crate::i2c::{I2cDevice, SmbusWordRead};
use crate::iio::IioDevice;
use crate::sysfs::ParsePolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Ambient,
    Object,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Ambient => write!(f, "Ambient"),
            Channel::Object => write!(f, "Object"),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait TemperatureSource {
    fn read_ambient(&self) -> Result<f64>;
    fn read_object(&self) -> Result<f64>;
}

/// Outcome of one channel read. Never stored past the report that prints it.
#[derive(Debug)]
pub struct TemperatureReading {
    pub channel: Channel,
    pub outcome: Result<f64>,
}

impl TemperatureReading {
    pub fn take<S: TemperatureSource + ?Sized>(source: &S, channel: Channel) -> Self {
        let outcome = match channel {
            Channel::Ambient => source.read_ambient(),
            Channel::Object => source.read_object(),
        };
        Self { channel, outcome }
    }

    pub fn celsius(&self) -> Option<f64> {
        self.outcome.as_ref().ok().copied()
    }

    pub fn error(&self) -> Option<&SensorError> {
        self.outcome.as_ref().err()
    }

    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    /// False for failed reads and for values outside the sensor's range.
    pub fn is_plausible(&self) -> bool {
        self.celsius().map(is_plausible).unwrap_or(false)
    }
}

/// SMBus register backend. Owns the bus handle; dropping the source closes it.
pub struct RegisterSource<D: SmbusWordRead = I2cDevice> {
    device: D,
    ambient_register: u8,
    object_register: u8,
}

impl<D: SmbusWordRead> RegisterSource<D> {
    pub fn new(device: D, ambient_register: u8, object_register: u8) -> Self {
        Self { device, ambient_register, object_register }
    }

    pub fn with_config(device: D, cfg: &SensorConfig) -> Self {
        Self::new(device, cfg.ambient_register, cfg.object_register)
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    fn read_register(&self, register: u8) -> Result<f64> {
        self.device.read_word_data(register).map(register_to_celsius)
    }
}

impl RegisterSource<I2cDevice> {
    /// Open the configured bus and bind the sensor address.
    pub fn open(cfg: &SensorConfig) -> Result<Self> {
        let device = I2cDevice::open_bus(cfg.i2c_bus, cfg.slave_address)?;
        Ok(Self::with_config(device, cfg))
    }
}

impl<D: SmbusWordRead> TemperatureSource for RegisterSource<D> {
    fn read_ambient(&self) -> Result<f64> {
        self.read_register(self.ambient_register)
    }

    fn read_object(&self) -> Result<f64> {
        self.read_register(self.object_register)
    }
}

/// IIO sysfs backend. Holds only resolved paths; every read reopens the files.
#[derive(Debug, Clone)]
pub struct SysfsSource {
    device: IioDevice,
    policy: ParsePolicy,
}

impl SysfsSource {
    pub fn new(device: IioDevice, policy: ParsePolicy) -> Self {
        Self { device, policy }
    }

    /// Fixed device directory, verified by its `name` attribute.
    pub fn open_static(cfg: &SensorConfig) -> Result<Self> {
        let device = IioDevice::open_static(cfg.iio_static_path(), &cfg.driver_name)?;
        Ok(Self::new(device, cfg.parse_policy))
    }

    /// Device directory found by scanning the IIO root.
    pub fn discover(cfg: &SensorConfig) -> Result<Self> {
        let device = IioDevice::discover(&cfg.iio_root, &cfg.driver_name)?;
        Ok(Self::new(device, cfg.parse_policy))
    }

    pub fn device(&self) -> &IioDevice {
        &self.device
    }
}

impl TemperatureSource for SysfsSource {
    fn read_ambient(&self) -> Result<f64> {
        self.device.read_celsius(Channel::Ambient, self.policy)
    }

    fn read_object(&self) -> Result<f64> {
        self.device.read_celsius(Channel::Object, self.policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i2c::MockSmbusWordRead;
    use crate::test_utils::{create_iio_device, create_iio_root, write_calibration};
    use mockall::predicate::eq;
    use std::fs;
    use std::io;

    #[test]
    fn test_register_source_uses_channel_registers() {
        let mut dev = MockSmbusWordRead::new();
        dev.expect_read_word_data().with(eq(0x06)).times(1).returning(|_| Ok(14657));
        dev.expect_read_word_data().with(eq(0x07)).times(1).returning(|_| Ok(15000));

        let source = RegisterSource::with_config(dev, &SensorConfig::default());
        assert!((source.read_ambient().unwrap() - 19.99).abs() < 1e-9);
        assert!((source.read_object().unwrap() - 26.85).abs() < 1e-9);
    }

    #[test]
    fn test_register_source_propagates_io_failure() {
        let mut dev = MockSmbusWordRead::new();
        dev.expect_read_word_data().with(eq(0x07)).returning(|register| {
            Err(SensorError::IoFailed { register, source: io::Error::from_raw_os_error(libc::EREMOTEIO) })
        });

        let source = RegisterSource::new(dev, 0x06, 0x07);
        match source.read_object() {
            Err(SensorError::IoFailed { register, .. }) => assert_eq!(register, 0x07),
            other => panic!("Expected IoFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_register_source_open_missing_bus() {
        let cfg = SensorConfig { i2c_bus: 250, ..SensorConfig::default() };
        assert!(matches!(RegisterSource::open(&cfg), Err(SensorError::BusNotFound(_))));
    }

    #[test]
    fn test_sysfs_source_reads_both_channels() {
        let root = create_iio_root();
        let dir = create_iio_device(root.path(), "iio:device3", "mlx90614");
        write_calibration(&dir, "20", "-13657.5");
        fs::write(dir.join("in_temp_object_raw"), "15000\n").unwrap();
        fs::write(dir.join("in_temp_ambient_raw"), "14657\n").unwrap();

        let cfg = SensorConfig { iio_root: root.path().to_path_buf(), ..SensorConfig::default() };
        let source = SysfsSource::discover(&cfg).unwrap();
        assert_eq!(source.device().dir(), dir.as_path());
        assert!((source.read_object().unwrap() - register_to_celsius(15000)).abs() < 1e-9);
        assert!((source.read_ambient().unwrap() - register_to_celsius(14657)).abs() < 1e-9);
    }

    #[test]
    fn test_sysfs_source_open_static() {
        let root = create_iio_root();
        create_iio_device(root.path(), "iio:device1", "mlx90614");
        let cfg = SensorConfig { iio_root: root.path().to_path_buf(), ..SensorConfig::default() };
        assert!(SysfsSource::open_static(&cfg).is_ok());

        let cfg = SensorConfig { iio_static_device: "iio:device4".to_string(), ..cfg };
        assert!(matches!(SysfsSource::open_static(&cfg), Err(SensorError::SensorNotFound { .. })));
    }

    #[test]
    fn test_reading_take() {
        let mut source = MockTemperatureSource::new();
        source.expect_read_object().returning(|| Ok(21.5));
        source
            .expect_read_ambient()
            .returning(|| Err(SensorError::AttributeMissing("in_temp_scale".into())));

        let object = TemperatureReading::take(&source, Channel::Object);
        assert_eq!(object.channel, Channel::Object);
        assert_eq!(object.celsius(), Some(21.5));
        assert!(object.is_plausible());

        let ambient = TemperatureReading::take(&source, Channel::Ambient);
        assert!(!ambient.is_ok());
        assert!(!ambient.is_plausible());
        assert!(matches!(ambient.error(), Some(SensorError::AttributeMissing(_))));
    }

    #[test]
    fn test_channel_display_and_serialize() {
        assert_eq!(Channel::Object.to_string(), "Object");
        assert_eq!(Channel::Ambient.to_string(), "Ambient");
        assert_eq!(serde_json::to_value(Channel::Ambient).unwrap(), "ambient");
    }
}
