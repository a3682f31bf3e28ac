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

//! Raw count to Celsius conversion for both backends.
//!
//! The register backend uses the sensor's fixed linear encoding (0.02 K per
//! count from absolute zero). The IIO backend applies the kernel's generic
//! `(raw + offset) * scale` convention, where the product is in millidegrees.

/// Kelvin per register count.
pub const REGISTER_SCALE: f64 = 0.02;
/// Kelvin at 0 °C.
pub const KELVIN_OFFSET: f64 = 273.15;

/// Measurement range of the MLX90614 family. Values outside are reported but
/// flagged as suspect.
pub const PLAUSIBLE_MIN_C: f64 = -70.0;
pub const PLAUSIBLE_MAX_C: f64 = 380.0;

pub fn register_to_celsius(raw: u16) -> f64 {
    (raw as f64) * REGISTER_SCALE - KELVIN_OFFSET
}

pub fn iio_to_celsius(raw: f64, offset: f64, scale: f64) -> f64 {
    (raw + offset) * scale / 1000.0
}

pub fn is_plausible(celsius: f64) -> bool {
    celsius.is_finite() && (PLAUSIBLE_MIN_C..=PLAUSIBLE_MAX_C).contains(&celsius)
}
