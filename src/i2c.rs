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

//! Raw I2C access through the Linux i2c-dev interface.
//!
//! The bus node is opened once, bound to the sensor's slave address and kept
//! for the process lifetime. Reads are single SMBus "read word data"
//! transactions issued with the `I2C_SMBUS` ioctl.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use crate::error::{Result, SensorError};

// <linux/i2c-dev.h>
const I2C_SLAVE: u32 = 0x0703;
const I2C_SMBUS: u32 = 0x0720;
// <linux/i2c.h>
const I2C_SMBUS_READ: u8 = 1;
const I2C_SMBUS_WORD_DATA: u32 = 3;
const I2C_SMBUS_BLOCK_MAX: usize = 32;

#[repr(C)]
#[allow(dead_code)]
union I2cSmbusData {
    byte: u8,
    word: u16,
    block: [u8; I2C_SMBUS_BLOCK_MAX + 2],
}

#[repr(C)]
struct I2cSmbusIoctlData {
    read_write: u8,
    command: u8,
    size: u32,
    data: *mut I2cSmbusData,
}

/// Anything that can perform an SMBus word read against a bound device.
#[cfg_attr(test, mockall::automock)]
pub trait SmbusWordRead {
    /// The returned word is already in host order.
    fn read_word_data(&self, register: u8) -> Result<u16>;
}

/// An open i2c-dev node bound to one slave address. Closed on drop.
#[derive(Debug)]
pub struct I2cDevice {
    file: File,
    path: PathBuf,
    address: u16,
}

impl I2cDevice {
    pub fn open_bus(bus: u32, address: u16) -> Result<Self> {
        Self::open(format!("/dev/i2c-{}", bus), address)
    }

    pub fn open<P: AsRef<Path>>(path: P, address: u16) -> Result<Self> {
        let path = path.as_ref();
        // Checked up front so a missing bus is not confused with a permission problem
        if !path.exists() {
            return Err(SensorError::BusNotFound(path.to_path_buf()));
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| SensorError::OpenFailed { path: path.to_path_buf(), source })?;

        let rc = unsafe { libc::ioctl(file.as_raw_fd(), I2C_SLAVE as _, address as libc::c_ulong) };
        if rc < 0 {
            return Err(SensorError::AddressBindFailed {
                address,
                source: io::Error::last_os_error(),
            });
        }

        Ok(Self { file, path: path.to_path_buf(), address })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn address(&self) -> u16 {
        self.address
    }
}

impl SmbusWordRead for I2cDevice {
    fn read_word_data(&self, register: u8) -> Result<u16> {
        let mut data = I2cSmbusData { block: [0; I2C_SMBUS_BLOCK_MAX + 2] };
        let mut args = I2cSmbusIoctlData {
            read_write: I2C_SMBUS_READ,
            command: register,
            size: I2C_SMBUS_WORD_DATA,
            data: &mut data,
        };

        let rc = unsafe { libc::ioctl(self.file.as_raw_fd(), I2C_SMBUS as _, &mut args as *mut I2cSmbusIoctlData) };
        if rc < 0 {
            return Err(SensorError::IoFailed { register, source: io::Error::last_os_error() });
        }
        // The kernel fills `word` for WORD_DATA transfers
        Ok(unsafe { data.word })
    }
}
