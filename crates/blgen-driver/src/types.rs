//! Driver types and data structures

use std::fmt;
use std::path::PathBuf;

/// Default location of the driver's sysfs attributes
pub const DEFAULT_SYSFS_DIR: &str = "/sys/devices/virtual/misc/beaglelogic";

/// Default device node
pub const DEFAULT_DEVICE_PATH: &str = "/dev/beaglelogic";

/// Buffer unit size the driver starts with after probe
pub const DEFAULT_BUFUNIT_SIZE: u32 = 640_000;

/// Smallest buffer unit size the driver accepts
pub const MIN_BUFUNIT_SIZE: u32 = 64;

/// The PRU moves data in 64 byte blocks; unit sizes are rounded up to this
pub const BUFUNIT_ALIGN: u32 = 64;

/// Scatter-gather entries the PRU firmware supports, i.e. the most buffers
/// one allocation can be split into
pub const MAX_BUFFERS: u32 = 128;

/// Round a requested buffer unit size the same way the driver does
pub fn align_bufunit_size(size: u32) -> u32 {
    size.div_ceil(BUFUNIT_ALIGN) * BUFUNIT_ALIGN
}

/// Split a total allocation into per-buffer sizes.
///
/// All buffers are `unit` bytes except the last one, which holds the
/// remainder padded up to a multiple of 64 (the PRU would otherwise copy
/// past the end of the waveform). A zero-byte allocation yields no buffers.
pub fn buffer_layout(total: u32, unit: u32) -> Vec<u32> {
    if total == 0 || unit == 0 {
        return Vec::new();
    }
    let count = total.div_ceil(unit);
    (0..count)
        .map(|i| {
            if i + 1 == count {
                (total - i * unit).div_ceil(BUFUNIT_ALIGN) * BUFUNIT_ALIGN
            } else {
                unit
            }
        })
        .collect()
}

/// Bytes the `memalloc` attribute reports after allocating `total` bytes
/// with the given unit size
pub fn reported_allocation(total: u32, unit: u32) -> u64 {
    buffer_layout(total, unit).iter().map(|&size| u64::from(size)).sum()
}

/// Driver backend identifier
#[derive(Debug, Clone, PartialEq)]
pub enum DriverBackend {
    /// BeagleLogic kernel module on a BeagleBone (PRU subsystem)
    BeagleLogic,

    /// Software model of the driver (no hardware)
    Simulated,
}

impl DriverBackend {
    /// Get a human-readable name
    pub fn name(&self) -> &str {
        match self {
            DriverBackend::BeagleLogic => "BeagleLogic",
            DriverBackend::Simulated => "Simulated",
        }
    }
}

/// Information about the driver instance
#[derive(Debug, Clone)]
pub struct DriverInfo {
    /// Backend type
    pub backend: DriverBackend,

    /// Device node used for data transfer
    pub device_path: PathBuf,

    /// Directory holding the sysfs attributes
    pub sysfs_dir: PathBuf,
}

/// Driver states, numbered as in the kernel module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Powered off (at module start)
    Disabled,
    /// Powered on
    Initialized,
    /// Buffers allocated
    MemAllocd,
    /// All buffers mapped and configuration done
    Armed,
    /// Waveform being generated
    Running,
    /// Stop requested
    RequestStop,
    /// Buffer overrun or firmware error
    Error,
}

impl DriverState {
    /// Convert from the kernel's numeric state
    pub fn from_raw(value: u32) -> Option<Self> {
        match value {
            0 => Some(DriverState::Disabled),
            1 => Some(DriverState::Initialized),
            2 => Some(DriverState::MemAllocd),
            3 => Some(DriverState::Armed),
            4 => Some(DriverState::Running),
            5 => Some(DriverState::RequestStop),
            6 => Some(DriverState::Error),
            _ => None,
        }
    }

    /// Numeric state as used by the kernel
    pub fn as_raw(self) -> u32 {
        match self {
            DriverState::Disabled => 0,
            DriverState::Initialized => 1,
            DriverState::MemAllocd => 2,
            DriverState::Armed => 3,
            DriverState::Running => 4,
            DriverState::RequestStop => 5,
            DriverState::Error => 6,
        }
    }
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DriverState::Disabled => "disabled",
            DriverState::Initialized => "initialized",
            DriverState::MemAllocd => "memory allocated",
            DriverState::Armed => "armed",
            DriverState::Running => "running",
            DriverState::RequestStop => "stop requested",
            DriverState::Error => "error",
        };
        f.write_str(name)
    }
}

/// Status reported by the `state` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverStatus {
    /// Not generating; carries the driver state
    Idle(DriverState),

    /// Generating; carries the index of the buffer being played
    Running { buffer: u32 },
}

impl DriverStatus {
    /// Parse the text of the `state` attribute.
    ///
    /// While running the driver prints the current buffer index. Otherwise it
    /// prints the state prefixed by one or more `-` signs (the kernel formats
    /// a negated unsigned value, so `--1` is common).
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let digits = text.trim_start_matches('-');
        let value: u32 = digits.parse().ok()?;
        if digits.len() == text.len() {
            Some(DriverStatus::Running { buffer: value })
        } else {
            DriverState::from_raw(value).map(DriverStatus::Idle)
        }
    }

    /// Driver state implied by this status
    pub fn state(&self) -> DriverState {
        match self {
            DriverStatus::Idle(state) => *state,
            DriverStatus::Running { .. } => DriverState::Running,
        }
    }
}

impl fmt::Display for DriverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverStatus::Idle(state) => write!(f, "{}", state),
            DriverStatus::Running { buffer } => write!(f, "running (buffer {})", buffer),
        }
    }
}

/// One driver-managed transmit buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDescriptor {
    /// Physical (DMA) address
    pub phys_addr: u32,

    /// Size in bytes
    pub size: u32,
}

impl BufferDescriptor {
    /// Parse a single `buffers` line of the form `8f400000,640000`
    pub fn parse_line(line: &str) -> Option<Self> {
        let (addr, size) = line.trim().split_once(',')?;
        Some(Self {
            phys_addr: u32::from_str_radix(addr.trim(), 16).ok()?,
            size: size.trim().parse().ok()?,
        })
    }

    /// Parse the whole `buffers` attribute, skipping blank lines
    pub fn parse_list(text: &str) -> Option<Vec<Self>> {
        text.lines()
            .filter(|l| !l.trim().is_empty())
            .map(Self::parse_line)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_bufunit_size() {
        assert_eq!(align_bufunit_size(64), 64);
        assert_eq!(align_bufunit_size(65), 128);
        assert_eq!(align_bufunit_size(640_000), 640_000);
        assert_eq!(align_bufunit_size(1000), 1024);
    }

    #[test]
    fn test_buffer_layout() {
        assert_eq!(buffer_layout(0, 640), Vec::<u32>::new());
        assert_eq!(buffer_layout(128, 640), vec![128]);
        assert_eq!(buffer_layout(640, 640), vec![640]);
        assert_eq!(buffer_layout(1280, 640), vec![640, 640]);
    }

    #[test]
    fn test_last_buffer_padded() {
        assert_eq!(buffer_layout(100, 640), vec![128]);
        assert_eq!(buffer_layout(100, 64), vec![64, 64]);
        assert_eq!(buffer_layout(1500, 640), vec![640, 640, 256]);
        assert_eq!(buffer_layout(1, 640_000), vec![64]);
    }

    #[test]
    fn test_reported_allocation() {
        assert_eq!(reported_allocation(0, 640_000), 0);
        assert_eq!(reported_allocation(100, 640_000), 128);
        assert_eq!(reported_allocation(100, 64), 128);
        assert_eq!(reported_allocation(1500, 640), 1536);
        assert_eq!(reported_allocation(4096, 640_000), 4096);
    }

    #[test]
    fn test_state_roundtrip_raw() {
        for raw in 0..7 {
            assert_eq!(DriverState::from_raw(raw).unwrap().as_raw(), raw);
        }
        assert_eq!(DriverState::from_raw(7), None);
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(
            DriverStatus::parse("--1\n"),
            Some(DriverStatus::Idle(DriverState::Initialized))
        );
        assert_eq!(
            DriverStatus::parse("-3"),
            Some(DriverStatus::Idle(DriverState::Armed))
        );
        assert_eq!(
            DriverStatus::parse("2\n"),
            Some(DriverStatus::Running { buffer: 2 })
        );
        assert_eq!(DriverStatus::parse(""), None);
        assert_eq!(DriverStatus::parse("-9"), None);
        assert_eq!(DriverStatus::parse("abc"), None);
    }

    #[test]
    fn test_parse_buffers() {
        let text = "8f400000,640000\n8f49c400,220\n";
        let buffers = BufferDescriptor::parse_list(text).unwrap();
        assert_eq!(buffers.len(), 2);
        assert_eq!(buffers[0].phys_addr, 0x8f40_0000);
        assert_eq!(buffers[1].size, 220);

        assert_eq!(BufferDescriptor::parse_list("").unwrap(), vec![]);
        assert!(BufferDescriptor::parse_list("zz,1").is_none());
    }
}
