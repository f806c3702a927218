//! Driver error types

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for driver operations
pub type DriverResult<T> = Result<T, DriverError>;

/// Errors that can occur while talking to the waveform generator driver
#[derive(Error, Debug)]
pub enum DriverError {
    /// Driver not loaded or its files are missing
    #[error("BeagleLogic device not found: {0}")]
    DeviceNotFound(String),

    /// The driver refuses to open the device node while no buffers are allocated
    #[error("Device {0} has no transmit buffers allocated (memalloc is 0)")]
    NoBuffersAllocated(String),

    /// Failed to open the device node
    #[error("Failed to open device {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing a sysfs attribute failed
    #[error("Failed to write '{value}' to {path}: {source}")]
    AttributeWrite {
        path: PathBuf,
        value: String,
        #[source]
        source: io::Error,
    },

    /// Reading a sysfs attribute failed
    #[error("Failed to read {path}: {source}")]
    AttributeRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Attribute content could not be parsed
    #[error("Unexpected content in {path}: {content:?}")]
    AttributeParse { path: PathBuf, content: String },

    /// A control command was rejected
    #[error("ioctl {command} failed: {reason}")]
    Ioctl { command: &'static str, reason: String },

    /// Writing waveform data to the device node failed
    #[error("Device write failed after {written} of {expected} bytes: {source}")]
    WriteFailed {
        written: usize,
        expected: usize,
        #[source]
        source: io::Error,
    },

    /// The driver stopped accepting data before the whole blob was written
    #[error("Short write: driver accepted {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    /// Releasing the device node failed
    #[error("Failed to close device: {0}")]
    CloseFailed(String),

    /// Buffer unit size rejected
    #[error("Invalid buffer unit size {size}: must be at least {min} bytes")]
    InvalidBufferUnitSize { size: u32, min: u32 },

    /// Requested allocation exceeds what the driver can map
    #[error("Allocation of {requested} bytes exceeds driver limit of {limit} bytes")]
    AllocationTooLarge { requested: u32, limit: u64 },

    /// The driver reports a different allocation than the request implies
    #[error(
        "Allocation mismatch: requested {requested} bytes, expected the driver to report \
         {expected}, it reports {reported}"
    )]
    AllocationMismatch {
        requested: u32,
        expected: u64,
        reported: u32,
    },

    /// Driver is in a state that does not allow the operation
    #[error("Device busy: {0}")]
    Busy(String),

    /// Permission denied on sysfs or the device node
    #[error("Permission denied: {0}. Try running as root or add user to appropriate group.")]
    PermissionDenied(String),
}

impl DriverError {
    /// Map an attribute write failure, singling out permission problems
    pub(crate) fn attribute_write(path: PathBuf, value: String, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::PermissionDenied {
            DriverError::PermissionDenied(path.display().to_string())
        } else {
            DriverError::AttributeWrite { path, value, source }
        }
    }

    /// Map a device open failure, singling out permission problems and the
    /// `ENOMEM` the driver returns when nothing is allocated
    pub(crate) fn open_failed(path: PathBuf, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::OutOfMemory => {
                DriverError::NoBuffersAllocated(path.display().to_string())
            }
            io::ErrorKind::PermissionDenied => {
                DriverError::PermissionDenied(path.display().to_string())
            }
            io::ErrorKind::NotFound => DriverError::DeviceNotFound(path.display().to_string()),
            _ => DriverError::OpenFailed { path, source },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_mapping() {
        let err = DriverError::attribute_write(
            PathBuf::from("/sys/x/memalloc"),
            "12".to_string(),
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        assert!(matches!(err, DriverError::PermissionDenied(ref p) if p == "/sys/x/memalloc"));
    }

    #[test]
    fn test_missing_device_maps_to_not_found() {
        let err = DriverError::open_failed(
            PathBuf::from("/dev/beaglelogic"),
            io::Error::from(io::ErrorKind::NotFound),
        );
        assert!(matches!(err, DriverError::DeviceNotFound(ref p) if p == "/dev/beaglelogic"));
    }

    #[test]
    fn test_open_without_buffers() {
        let err = DriverError::open_failed(
            PathBuf::from("/dev/beaglelogic"),
            io::Error::from(io::ErrorKind::OutOfMemory),
        );
        assert!(matches!(err, DriverError::NoBuffersAllocated(ref p) if p == "/dev/beaglelogic"));
    }

    #[test]
    fn test_short_write_message() {
        let err = DriverError::ShortWrite { written: 10, expected: 20 };
        assert_eq!(err.to_string(), "Short write: driver accepted 10 of 20 bytes");
    }
}
