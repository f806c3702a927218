//! BeagleLogic configuration

use std::path::{Path, PathBuf};

use crate::types::{DEFAULT_DEVICE_PATH, DEFAULT_SYSFS_DIR};

/// Attribute file names under the sysfs directory
pub mod attr {
    pub const BUFUNITSIZE: &str = "bufunitsize";
    pub const MEMALLOC: &str = "memalloc";
    pub const STATE: &str = "state";
    pub const BUFFERS: &str = "buffers";
    pub const LASTERROR: &str = "lasterror";
}

/// Configuration for the BeagleLogic backend
#[derive(Debug, Clone)]
pub struct BeagleLogicConfig {
    /// Directory holding the sysfs attributes
    pub sysfs_dir: PathBuf,

    /// Device node receiving waveform data
    pub device_path: PathBuf,
}

impl Default for BeagleLogicConfig {
    fn default() -> Self {
        Self {
            sysfs_dir: PathBuf::from(DEFAULT_SYSFS_DIR),
            device_path: PathBuf::from(DEFAULT_DEVICE_PATH),
        }
    }
}

impl BeagleLogicConfig {
    /// Path of a named attribute
    pub fn attribute_path(&self, name: &str) -> PathBuf {
        self.sysfs_dir.join(name)
    }

    /// Whether the sysfs directory and device node both exist
    pub fn paths_exist(&self) -> bool {
        self.sysfs_dir.is_dir() && self.device_path.exists()
    }

    /// Builder: set the sysfs directory
    pub fn sysfs_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.sysfs_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Builder: set the device node
    pub fn device_path(mut self, path: impl AsRef<Path>) -> Self {
        self.device_path = path.as_ref().to_path_buf();
        self
    }
}
