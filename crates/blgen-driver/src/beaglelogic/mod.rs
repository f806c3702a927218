//! BeagleLogic waveform generator backend
//!
//! Drives the BeagleLogic kernel module, adapted for output: the PRU reads
//! waveform data out of driver-managed DMA buffers and clocks it onto the
//! parallel output pins.
//!
//! # Requirements
//!
//! - Linux on a BeagleBone with the `beaglelogic` module loaded
//! - Write access to the sysfs attributes and `/dev/beaglelogic`
//! - An external sample clock, switched on and off by the operator
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     userspace                            │
//! │   sysfs: bufunitsize, memalloc     /dev/beaglelogic      │
//! │          state, buffers            write() + ioctl()     │
//! └──────────────┬───────────────────────────┬───────────────┘
//!                │                           │
//!                ▼                           ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │  beaglelogic.ko: buffer allocation, DMA mapping, PRU cmd │
//! └──────────────────────────────┬───────────────────────────┘
//!                                ▼
//!                       PRU0 → output pins
//! ```

mod config;
mod device;
mod sysfs;

pub use config::{attr, BeagleLogicConfig};
pub use device::DeviceNode;
pub use sysfs::SysfsAttribute;

use crate::error::{DriverError, DriverResult};
use crate::traits::WaveformDriver;
use crate::types::{
    align_bufunit_size, BufferDescriptor, DriverBackend, DriverInfo, DriverStatus,
    MAX_BUFFERS, MIN_BUFUNIT_SIZE,
};

/// BeagleLogic kernel driver
pub struct BeagleLogicDriver {
    config: BeagleLogicConfig,
}

impl BeagleLogicDriver {
    /// Create with specific configuration
    pub fn new(config: BeagleLogicConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BeagleLogicConfig {
        &self.config
    }

    fn attribute(&self, name: &str) -> SysfsAttribute {
        SysfsAttribute::new(self.config.attribute_path(name))
    }

    /// Largest allocation `memalloc` accepts with the current unit size
    fn allocation_limit(&self) -> DriverResult<u64> {
        Ok(u64::from(self.bufunit_size()?) * u64::from(MAX_BUFFERS))
    }
}

impl WaveformDriver for BeagleLogicDriver {
    type Channel = DeviceNode;

    fn info(&self) -> DriverInfo {
        DriverInfo {
            backend: DriverBackend::BeagleLogic,
            device_path: self.config.device_path.clone(),
            sysfs_dir: self.config.sysfs_dir.clone(),
        }
    }

    fn is_available(&self) -> bool {
        self.config.paths_exist()
    }

    fn set_bufunit_size(&mut self, bytes: u32) -> DriverResult<()> {
        if bytes < MIN_BUFUNIT_SIZE {
            return Err(DriverError::InvalidBufferUnitSize {
                size: bytes,
                min: MIN_BUFUNIT_SIZE,
            });
        }
        let aligned = align_bufunit_size(bytes);
        if aligned != bytes {
            tracing::warn!(requested = bytes, aligned, "Driver will round buffer unit size up");
        }

        self.attribute(attr::BUFUNITSIZE)
            .write_u32(bytes)
            .map_err(|e| {
                if is_einval(&e) {
                    DriverError::InvalidBufferUnitSize {
                        size: bytes,
                        min: MIN_BUFUNIT_SIZE,
                    }
                } else {
                    e
                }
            })?;

        tracing::debug!(bufunitsize = bytes, "Wrote bufunitsize");
        Ok(())
    }

    fn bufunit_size(&self) -> DriverResult<u32> {
        self.attribute(attr::BUFUNITSIZE).read_u32()
    }

    fn allocate(&mut self, bytes: u32) -> DriverResult<()> {
        if let Err(err) = self.attribute(attr::MEMALLOC).write_u32(bytes) {
            if !is_einval(&err) {
                return Err(err);
            }
            return Err(DriverError::AllocationTooLarge {
                requested: bytes,
                limit: self.allocation_limit()?,
            });
        }

        tracing::debug!(memalloc = bytes, "Wrote memalloc");
        Ok(())
    }

    fn allocated_bytes(&self) -> DriverResult<u32> {
        self.attribute(attr::MEMALLOC).read_u32()
    }

    fn status(&self) -> DriverResult<DriverStatus> {
        let attr = self.attribute(attr::STATE);
        let content = attr.read_string()?;
        DriverStatus::parse(&content).ok_or_else(|| DriverError::AttributeParse {
            path: attr.path().to_path_buf(),
            content,
        })
    }

    fn buffers(&self) -> DriverResult<Vec<BufferDescriptor>> {
        let attr = self.attribute(attr::BUFFERS);
        let content = attr.read_string()?;
        BufferDescriptor::parse_list(&content).ok_or_else(|| DriverError::AttributeParse {
            path: attr.path().to_path_buf(),
            content,
        })
    }

    fn last_error(&self) -> DriverResult<i32> {
        self.attribute(attr::LASTERROR).read_i32()
    }

    fn open_channel(&mut self) -> DriverResult<DeviceNode> {
        DeviceNode::open(&self.config.device_path)
    }
}

/// The driver answers out-of-range attribute values with `EINVAL`
fn is_einval(err: &DriverError) -> bool {
    matches!(
        err,
        DriverError::AttributeWrite { source, .. } if source.raw_os_error() == Some(libc::EINVAL)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::TransmitChannel;
    use crate::types::DriverState;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Lay out a fake sysfs directory and device file
    fn fake_driver(dir: &TempDir) -> BeagleLogicDriver {
        let sysfs = dir.path().join("beaglelogic");
        std::fs::create_dir(&sysfs).unwrap();
        std::fs::write(sysfs.join(attr::BUFUNITSIZE), "640000\n").unwrap();
        std::fs::write(sysfs.join(attr::MEMALLOC), "0\n").unwrap();
        std::fs::write(sysfs.join(attr::STATE), "--1\n").unwrap();
        std::fs::write(sysfs.join(attr::BUFFERS), "8f400000,640000\n8f49c400,220\n").unwrap();
        std::fs::write(sysfs.join(attr::LASTERROR), "0\n").unwrap();

        let dev = dir.path().join("dev-beaglelogic");
        std::fs::write(&dev, b"").unwrap();

        BeagleLogicDriver::new(BeagleLogicConfig::default().sysfs_dir(&sysfs).device_path(&dev))
    }

    #[test]
    fn test_configure_writes_attributes() {
        let dir = TempDir::new().unwrap();
        let mut driver = fake_driver(&dir);
        assert!(driver.is_available());

        driver.set_bufunit_size(640_000).unwrap();
        driver.allocate(1500).unwrap();

        assert_eq!(driver.bufunit_size().unwrap(), 640_000);
        assert_eq!(driver.allocated_bytes().unwrap(), 1500);
        let memalloc_path = driver.config().attribute_path(attr::MEMALLOC);
        assert_eq!(std::fs::read_to_string(memalloc_path).unwrap(), "1500");
    }

    #[test]
    fn test_small_bufunit_rejected_before_write() {
        let dir = TempDir::new().unwrap();
        let mut driver = fake_driver(&dir);

        let err = driver.set_bufunit_size(32).unwrap_err();
        assert!(matches!(err, DriverError::InvalidBufferUnitSize { size: 32, min: 64 }));
        assert_eq!(driver.bufunit_size().unwrap(), 640_000);
    }

    #[test]
    fn test_status_and_buffers() {
        let dir = TempDir::new().unwrap();
        let driver = fake_driver(&dir);

        assert_eq!(driver.status().unwrap(), DriverStatus::Idle(DriverState::Initialized));
        let buffers = driver.buffers().unwrap();
        assert_eq!(buffers.len(), 2);
        assert_eq!(buffers.iter().map(|b| b.size).sum::<u32>(), 640_220);
        assert_eq!(driver.last_error().unwrap(), 0);
    }

    #[test]
    fn test_einval_detection() {
        let rejected = DriverError::AttributeWrite {
            path: PathBuf::from("memalloc"),
            value: "99999999".to_string(),
            source: std::io::Error::from_raw_os_error(libc::EINVAL),
        };
        assert!(is_einval(&rejected));

        let denied = DriverError::AttributeWrite {
            path: PathBuf::from("memalloc"),
            value: "1".to_string(),
            source: std::io::Error::from_raw_os_error(libc::EIO),
        };
        assert!(!is_einval(&denied));
    }

    #[test]
    fn test_allocation_limit_needs_unit_size() {
        let dir = TempDir::new().unwrap();
        let driver = fake_driver(&dir);
        assert_eq!(driver.allocation_limit().unwrap(), 640_000 * 128);

        std::fs::remove_file(driver.config().attribute_path(attr::BUFUNITSIZE)).unwrap();
        assert!(matches!(
            driver.allocation_limit(),
            Err(DriverError::AttributeRead { .. })
        ));
    }

    #[test]
    fn test_missing_driver() {
        let dir = TempDir::new().unwrap();
        let mut driver = BeagleLogicDriver::new(
            BeagleLogicConfig::default()
                .sysfs_dir(dir.path().join("nope"))
                .device_path(dir.path().join("nope-dev")),
        );

        assert!(!driver.is_available());
        assert!(driver.set_bufunit_size(640_000).is_err());
        assert!(matches!(driver.open_channel().unwrap_err(), DriverError::DeviceNotFound(_)));
    }

    #[test]
    fn test_channel_writes_device_file() {
        let dir = TempDir::new().unwrap();
        let mut driver = fake_driver(&dir);

        let mut channel = driver.open_channel().unwrap();
        assert_eq!(channel.write_waveform(&[0xAA; 256]).unwrap(), 256);
        channel.close().unwrap();

        assert_eq!(std::fs::read(&driver.config().device_path).unwrap(), vec![0xAA; 256]);
    }
}
