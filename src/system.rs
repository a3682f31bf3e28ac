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

use std::fs;
use std::process::Command;

use serde_json::json;

use crate::logger;

/// Kernel modules the register backend needs.
pub const I2C_MODULES: &[&str] = &["i2c_dev"];
/// Kernel modules the IIO backend needs.
pub const IIO_MODULES: &[&str] = &["mlx90614"];

/// Best-effort `modprobe -q` for each module not already loaded.
/// Returns how many modules are loaded afterwards.
pub fn load_modules(modules: &[&str]) -> usize {
    let loaded = fs::read_to_string("/proc/modules").unwrap_or_default();
    let mut ok = 0;
    for module in modules {
        if module_listed(&loaded, module) {
            ok += 1;
            continue;
        }
        let success = Command::new("modprobe")
            .args(["-q", *module])
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false);
        logger::log_event("modprobe", json!({ "module": module, "success": success }));
        if success {
            ok += 1;
        }
    }
    ok
}

/// Whether `/proc/modules` content lists `module`. Dashes and underscores
/// are interchangeable in module names.
pub fn module_listed(proc_modules: &str, module: &str) -> bool {
    let want = module.replace('-', "_");
    proc_modules
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .any(|name| name.replace('-', "_") == want)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROC_MODULES: &str = "\
mlx90614 16384 0 - Live 0x0000000000000000
i2c_dev 24576 2 - Live 0x0000000000000000
industrialio 90112 1 mlx90614, Live 0x0000000000000000
";

    #[test]
    fn test_module_listed() {
        assert!(module_listed(PROC_MODULES, "mlx90614"));
        assert!(module_listed(PROC_MODULES, "i2c_dev"));
        assert!(module_listed(PROC_MODULES, "i2c-dev"));
        assert!(!module_listed(PROC_MODULES, "i2c"));
        assert!(!module_listed(PROC_MODULES, "bmp280"));
        assert!(!module_listed("", "mlx90614"));
    }

    #[test]
    fn test_load_modules_empty() {
        assert_eq!(load_modules(&[]), 0);
    }
}
