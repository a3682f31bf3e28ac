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

//! Error types shared by both acquisition backends.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SensorError>;

#[derive(Error, Debug)]
pub enum SensorError {
    // ============================================================================
    // Startup (discovery) failures
    // ============================================================================
    #[error("I2C bus {0} not found")]
    BusNotFound(PathBuf),

    #[error("Cannot open {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Cannot set slave address 0x{address:02x}: {source}")]
    AddressBindFailed {
        address: u16,
        source: io::Error,
    },

    #[error("{driver} sensor not found under {root}")]
    SensorNotFound {
        root: PathBuf,
        driver: String,
    },

    #[error("Unexpected sensor name at {path}: {found}")]
    UnexpectedName {
        path: PathBuf,
        found: String,
    },

    // ============================================================================
    // Per-read failures
    // ============================================================================
    #[error("SMBus word read of register 0x{register:02x} failed: {source}")]
    IoFailed {
        register: u8,
        source: io::Error,
    },

    #[error("Cannot read {0}")]
    AttributeMissing(PathBuf),

    #[error("Cannot parse {value:?} from {path}")]
    ParseFailed {
        path: PathBuf,
        value: String,
    },
}

impl SensorError {
    /// True for errors that can only happen while locating or opening the
    /// sensor. These end the process; everything else is reported per channel.
    pub fn is_startup_failure(&self) -> bool {
        matches!(
            self,
            SensorError::BusNotFound(_)
                | SensorError::OpenFailed { .. }
                | SensorError::AddressBindFailed { .. }
                | SensorError::SensorNotFound { .. }
                | SensorError::UnexpectedName { .. }
        )
    }
}
