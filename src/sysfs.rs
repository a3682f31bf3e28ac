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

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Serialize;

use crate::error::{Result, SensorError};

/// How malformed numeric attribute text is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParsePolicy {
    /// Reject anything that is not a complete number.
    #[default]
    Strict,
    /// Parse the longest numeric prefix, or zero if there is none.
    Lenient,
}

/// Read the first line of a sysfs attribute, without its newline.
///
/// A file that cannot be opened or read, and a file with nothing to read, are
/// reported as [`SensorError::AttributeMissing`]. A line that is not UTF-8 was
/// read but is unusable, so it is a [`SensorError::ParseFailed`].
pub fn read_attribute<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|_| SensorError::AttributeMissing(path.to_path_buf()))?;
    let mut bytes = Vec::new();
    match BufReader::new(file).read_until(b'\n', &mut bytes) {
        Ok(n) if n > 0 => {}
        _ => return Err(SensorError::AttributeMissing(path.to_path_buf())),
    }
    if bytes.last() == Some(&b'\n') {
        bytes.pop();
    }
    String::from_utf8(bytes).map_err(|e| SensorError::ParseFailed {
        path: path.to_path_buf(),
        value: String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}

pub fn parse_int(path: &Path, text: &str, policy: ParsePolicy) -> Result<i64> {
    let trimmed = text.trim();
    match policy {
        ParsePolicy::Strict => trimmed.parse::<i64>().map_err(|_| parse_failed(path, text)),
        ParsePolicy::Lenient => Ok(numeric_prefix(trimmed, false).parse::<i64>().unwrap_or(0)),
    }
}

pub fn parse_float(path: &Path, text: &str, policy: ParsePolicy) -> Result<f64> {
    let trimmed = text.trim();
    match policy {
        ParsePolicy::Strict => match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(parse_failed(path, text)),
        },
        ParsePolicy::Lenient => Ok(numeric_prefix(trimmed, true).parse::<f64>().unwrap_or(0.0)),
    }
}

pub fn read_int<P: AsRef<Path>>(path: P, policy: ParsePolicy) -> Result<i64> {
    let path = path.as_ref();
    parse_int(path, &read_attribute(path)?, policy)
}

pub fn read_float<P: AsRef<Path>>(path: P, policy: ParsePolicy) -> Result<f64> {
    let path = path.as_ref();
    parse_float(path, &read_attribute(path)?, policy)
}

fn parse_failed(path: &Path, text: &str) -> SensorError {
    SensorError::ParseFailed { path: path.to_path_buf(), value: text.to_string() }
}

// Longest prefix of `s` shaped like [+-]digits[.digits][e[+-]digits].
fn numeric_prefix(s: &str, allow_fraction: bool) -> &str {
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut seen_digit = end > digits_start;
    if allow_fraction {
        if end < bytes.len() && bytes[end] == b'.' {
            let mut frac_end = end + 1;
            while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
                frac_end += 1;
            }
            if seen_digit || frac_end > end + 1 {
                seen_digit = true;
                end = frac_end;
            }
        }
        if seen_digit && end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
            let mut exp_end = end + 1;
            if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
                exp_end += 1;
            }
            let exp_digits = exp_end;
            while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
                exp_end += 1;
            }
            if exp_end > exp_digits {
                end = exp_end;
            }
        }
    }
    if seen_digit { &s[..end] } else { "" }
}
