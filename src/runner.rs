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

//! Startup sequence shared by the binaries: locate the sensor, then poll forever.

use std::io::{self, Write};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;

use crate::config::{PollConfig, SensorConfig, EVENT_LOG_ENABLED, MODULE_HINT};
use crate::error::SensorError;
use crate::logger;
use crate::poller::Poller;
use crate::source::{RegisterSource, SysfsSource, TemperatureSource};
use crate::system;

pub const BANNER: &str = "MLX90614 Temperature Reader (Ctrl+C to exit)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// SMBus word reads on `/dev/i2c-N`.
    Register,
    /// IIO attributes at a fixed device directory.
    SysfsStatic,
    /// IIO attributes at a directory found by scanning the IIO root.
    SysfsScan,
}

impl Backend {
    pub fn poll_config(self) -> PollConfig {
        match self {
            Backend::Register => PollConfig::register(),
            Backend::SysfsStatic | Backend::SysfsScan => PollConfig::sysfs(),
        }
    }

    fn modules(self) -> &'static [&'static str] {
        match self {
            Backend::Register => system::I2C_MODULES,
            Backend::SysfsStatic | Backend::SysfsScan => system::IIO_MODULES,
        }
    }
}

/// Open the backend and describe where the sensor was found.
pub fn open_source(backend: Backend, cfg: &SensorConfig) -> crate::error::Result<(Box<dyn TemperatureSource>, String)> {
    match backend {
        Backend::Register => {
            let source = RegisterSource::open(cfg)?;
            let location = format!("{} address 0x{:02x}", source.device().path().display(), source.device().address());
            Ok((Box::new(source), location))
        }
        Backend::SysfsStatic => {
            let source = SysfsSource::open_static(cfg)?;
            let location = source.device().dir().display().to_string();
            Ok((Box::new(source), location))
        }
        Backend::SysfsScan => {
            let source = SysfsSource::discover(cfg)?;
            let location = source.device().dir().display().to_string();
            Ok((Box::new(source), location))
        }
    }
}

/// Extra line printed after a startup failure, if any applies.
pub fn startup_hint(backend: Backend, err: &SensorError) -> Option<&'static str> {
    match (backend, err) {
        (Backend::SysfsStatic | Backend::SysfsScan, SensorError::SensorNotFound { .. }) => Some(MODULE_HINT),
        (Backend::Register, SensorError::BusNotFound(_)) => Some("Make sure the i2c-dev module is loaded: modprobe i2c-dev"),
        (Backend::Register, SensorError::OpenFailed { .. }) => Some("Run as root or add the user to the i2c group"),
        _ => None,
    }
}

/// Line printed once the backend is ready. Binding an I2C address does not
/// prove anything answers there, so the register backend only claims the bus.
pub fn ready_banner(backend: Backend, location: &str) -> String {
    match backend {
        Backend::Register => format!("✓ Opened {}", location),
        Backend::SysfsStatic | Backend::SysfsScan => format!("✓ MLX90614 sensor found at {}", location),
    }
}

/// Print why the backend could not be opened. Locating failures get the `✗`
/// line and a hint; anything else is printed as a plain error.
fn report_open_error<W: Write>(backend: Backend, err: &SensorError, out: &mut W) -> io::Result<()> {
    if err.is_startup_failure() {
        writeln!(out, "✗ {}", err)?;
        if let Some(hint) = startup_hint(backend, err) {
            writeln!(out, "{}", hint)?;
        }
        logger::log_event("sensor_not_found", json!({ "backend": backend, "error": err.to_string() }));
    } else {
        writeln!(out, "Error: {}", err)?;
        logger::log_event("startup_error", json!({ "backend": backend, "error": err.to_string() }));
    }
    out.flush()
}

pub fn run(backend: Backend) -> Result<()> {
    if EVENT_LOG_ENABLED {
        logger::init_logging();
    }
    system::load_modules(backend.modules());

    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_with(backend, &SensorConfig::default(), backend.poll_config(), &mut out)
}

/// Print the banner, open the backend and poll. Returns early with an error,
/// before any reading, if the sensor cannot be located.
pub fn run_with<W: Write>(backend: Backend, cfg: &SensorConfig, poll: PollConfig, out: &mut W) -> Result<()> {
    logger::log_event("startup", json!({ "backend": backend, "sensor": cfg, "poll": poll }));

    writeln!(out, "{}", BANNER)?;
    writeln!(out, "{}", "=".repeat(45))?;

    let (source, location) = match open_source(backend, cfg) {
        Ok(found) => found,
        Err(err) => {
            report_open_error(backend, &err, out)?;
            return Err(err).context("sensor startup failed");
        }
    };
    writeln!(out, "{}", ready_banner(backend, &location))?;
    writeln!(out)?;

    Poller::new(poll).run(source.as_ref(), out).context("writing readings")?;
    Ok(())
}
