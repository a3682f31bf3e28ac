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

//! mlxtemp - MLX90614 infrared thermometer reader for Linux
//!
//! The sensor is reached either as a raw I2C device (SMBus word reads of the
//! ambient and object registers) or through the kernel IIO driver's sysfs
//! attributes. Both backends implement [`source::TemperatureSource`] and are
//! driven by the same [`poller::Poller`].

pub mod config;
pub mod conversion;
pub mod error;
pub mod i2c;
pub mod iio;
pub mod logger;
pub mod poller;
pub mod runner;
pub mod source;
pub mod sysfs;
pub mod system;

#[cfg(test)]
pub mod test_utils;
