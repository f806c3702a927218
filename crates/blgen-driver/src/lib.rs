//! BeagleLogic waveform generator driver layer
//!
//! This crate talks to the BeagleLogic kernel module, converted from a logic
//! analyzer into a parallel digital waveform generator. It supports:
//!
//! - **BeagleLogic** (primary target): sysfs attributes, `/dev/beaglelogic`
//!   writes and the start ioctl (Linux only)
//! - **Simulation**: a software model of the driver's buffer handling
//!
//! # Feature Flags
//!
//! - `sim` (default): Software simulation backend
//! - `beaglelogic` (default): Kernel driver backend (requires Linux)
//!
//! # Example
//!
//! ```rust,no_run
//! use blgen_driver::{SimulatedDriver, TransmitChannel, WaveformDriver};
//!
//! let mut driver = SimulatedDriver::new();
//! driver.allocate(1024).unwrap();
//!
//! let mut channel = driver.open_channel().unwrap();
//! channel.write_waveform(&[0u8; 1024]).unwrap();
//! channel.start().unwrap();
//! channel.close().unwrap();
//! ```

pub mod commands;
pub mod error;
pub mod traits;
pub mod types;

#[cfg(feature = "sim")]
pub mod sim;

#[cfg(all(feature = "beaglelogic", target_os = "linux"))]
pub mod beaglelogic;

// Re-export main types
pub use commands::{IoctlCommand, IOCTL_BL_START};
pub use error::{DriverError, DriverResult};
pub use traits::{TransmitChannel, WaveformDriver};
pub use types::{
    buffer_layout, reported_allocation, BufferDescriptor, DriverBackend, DriverInfo, DriverState,
    DriverStatus, BUFUNIT_ALIGN, DEFAULT_BUFUNIT_SIZE, DEFAULT_DEVICE_PATH, DEFAULT_SYSFS_DIR,
    MAX_BUFFERS, MIN_BUFUNIT_SIZE,
};

#[cfg(feature = "sim")]
pub use sim::{SimEvent, SimulatedChannel, SimulatedDriver};

#[cfg(all(feature = "beaglelogic", target_os = "linux"))]
pub use beaglelogic::{BeagleLogicConfig, BeagleLogicDriver, DeviceNode};
