//! Fake IIO sysfs trees for unit tests.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

pub fn create_iio_root() -> TempDir {
    TempDir::new().unwrap()
}

/// Create `root/<entry>` with a `name` attribute, as the kernel would.
pub fn create_iio_device(root: &Path, entry: &str, name: &str) -> PathBuf {
    let dir = root.join(entry);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("name"), format!("{}\n", name)).unwrap();
    dir
}

pub fn write_calibration(dir: &Path, scale: &str, offset: &str) {
    fs::write(dir.join("in_temp_scale"), format!("{}\n", scale)).unwrap();
    fs::write(dir.join("in_temp_offset"), format!("{}\n", offset)).unwrap();
}
