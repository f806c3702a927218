//! Sysfs attribute access for the BeagleLogic driver

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{DriverError, DriverResult};

/// A single driver attribute file
#[derive(Debug, Clone)]
pub struct SysfsAttribute {
    path: PathBuf,
}

impl SysfsAttribute {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a decimal value.
    ///
    /// The file is opened without `O_CREAT`: a missing attribute means the
    /// driver is not loaded, which must not be papered over by creating a
    /// regular file. The handle is closed when this returns.
    pub fn write_u32(&self, value: u32) -> DriverResult<()> {
        let text = value.to_string();

        let mut file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|e| DriverError::attribute_write(self.path.clone(), text.clone(), e))?;

        // sysfs store handlers see the whole buffer in one call
        file.write_all(text.as_bytes())
            .map_err(|e| DriverError::attribute_write(self.path.clone(), text.clone(), e))?;

        tracing::debug!(path = %self.path.display(), value, "Wrote attribute");
        Ok(())
    }

    /// Read the raw attribute text
    pub fn read_string(&self) -> DriverResult<String> {
        std::fs::read_to_string(&self.path).map_err(|source| DriverError::AttributeRead {
            path: self.path.clone(),
            source,
        })
    }

    /// Read a decimal value
    pub fn read_u32(&self) -> DriverResult<u32> {
        let content = self.read_string()?;
        content
            .trim()
            .parse()
            .map_err(|_| DriverError::AttributeParse {
                path: self.path.clone(),
                content,
            })
    }

    /// Read a decimal value that the driver may print as signed
    pub fn read_i32(&self) -> DriverResult<i32> {
        let content = self.read_string()?;
        content
            .trim()
            .parse()
            .map_err(|_| DriverError::AttributeParse {
                path: self.path.clone(),
                content,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bufunitsize");
        std::fs::write(&path, "640000\n").unwrap();

        let attr = SysfsAttribute::new(&path);
        attr.write_u32(128).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "128");
        assert_eq!(attr.read_u32().unwrap(), 128);
    }

    #[test]
    fn test_write_missing_attribute_fails() {
        let dir = TempDir::new().unwrap();
        let attr = SysfsAttribute::new(dir.path().join("memalloc"));

        let err = attr.write_u32(1024).unwrap_err();
        assert!(matches!(err, DriverError::AttributeWrite { ref value, .. } if value == "1024"));
        assert!(!attr.path().exists());
    }

    #[test]
    fn test_read_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memalloc");
        std::fs::write(&path, "lots\n").unwrap();

        let err = SysfsAttribute::new(&path).read_u32().unwrap_err();
        assert!(matches!(err, DriverError::AttributeParse { .. }));
    }

    #[test]
    fn test_read_signed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lasterror");
        std::fs::write(&path, "-5\n").unwrap();

        assert_eq!(SysfsAttribute::new(&path).read_i32().unwrap(), -5);
    }
}
