//! Waveform driver trait definitions

use crate::error::DriverResult;
use crate::types::{BufferDescriptor, DriverInfo, DriverStatus};

/// Trait for a waveform generator driver
///
/// The driver is configured through small integer attributes and receives
/// waveform data through a separate transmit channel (the device node).
///
/// # Example
///
/// ```rust,no_run
/// use blgen_driver::{SimulatedDriver, TransmitChannel, WaveformDriver};
///
/// let mut driver = SimulatedDriver::new();
/// let waveform = vec![0u8; 4096];
///
/// driver.set_bufunit_size(640_000).unwrap();
/// driver.allocate(waveform.len() as u32).unwrap();
///
/// let mut channel = driver.open_channel().unwrap();
/// channel.write_waveform(&waveform).unwrap();
/// channel.start().unwrap();
/// channel.close().unwrap();
/// ```
pub trait WaveformDriver {
    /// Handle used to stream waveform data into the driver
    type Channel: TransmitChannel;

    // =========================================================================
    // Device Information
    // =========================================================================

    /// Get information about the driver instance
    fn info(&self) -> DriverInfo;

    /// Check if the driver is loaded and reachable
    fn is_available(&self) -> bool;

    // =========================================================================
    // Configuration Attributes
    // =========================================================================

    /// Set the size of one allocation unit in bytes
    ///
    /// The driver rounds the value up to a multiple of 64 and frees any
    /// previously allocated buffers.
    fn set_bufunit_size(&mut self, bytes: u32) -> DriverResult<()>;

    /// Read back the current allocation unit size
    fn bufunit_size(&self) -> DriverResult<u32>;

    /// Allocate and map transmit buffers totalling `bytes`
    fn allocate(&mut self, bytes: u32) -> DriverResult<()>;

    /// Total number of bytes the driver currently has allocated
    fn allocated_bytes(&self) -> DriverResult<u32>;

    /// Current driver status
    fn status(&self) -> DriverResult<DriverStatus>;

    /// Layout of the allocated transmit buffers
    fn buffers(&self) -> DriverResult<Vec<BufferDescriptor>>;

    /// Last error code recorded by the driver (0 when none)
    ///
    /// On hardware this blocks while generation is running.
    fn last_error(&self) -> DriverResult<i32>;

    // =========================================================================
    // Data Transfer
    // =========================================================================

    /// Open the transmit channel
    fn open_channel(&mut self) -> DriverResult<Self::Channel>;
}

/// An open, write-only data path into the driver
pub trait TransmitChannel {
    /// Copy the complete waveform into driver memory
    ///
    /// The driver may accept fewer bytes per call than offered; implementations
    /// keep writing until everything is consumed.
    ///
    /// # Returns
    /// Number of bytes written (always `data.len()` on success)
    fn write_waveform(&mut self, data: &[u8]) -> DriverResult<usize>;

    /// Issue the start command to begin waveform generation
    fn start(&mut self) -> DriverResult<()>;

    /// Release the channel.
    ///
    /// On the hardware backend this blocks until the driver has finished
    /// playing back the loaded waveform.
    fn close(self) -> DriverResult<()>
    where
        Self: Sized;
}
