//! Simulated BeagleLogic backend for development and testing
//!
//! This module models the kernel driver's buffer handling closely enough to
//! exercise the full generation flow without a BeagleBone:
//! - buffer unit sizes are validated and rounded up to 64 bytes
//! - allocations are split into unit-sized buffers, bounded by the firmware's
//!   scatter-gather limit, with the last buffer padded to 64 bytes
//! - the device cannot be opened while nothing is allocated
//! - writes are accepted at most one buffer remainder at a time
//! - closing a started channel "plays back" the loaded buffers, padding
//!   included, and leaves the driver initialized

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{DriverError, DriverResult};
use crate::traits::{TransmitChannel, WaveformDriver};
use crate::types::{
    align_bufunit_size, buffer_layout, BufferDescriptor, DriverBackend, DriverInfo, DriverState,
    DriverStatus, DEFAULT_BUFUNIT_SIZE, MAX_BUFFERS, MIN_BUFUNIT_SIZE,
};

/// Base of the simulated DMA region reported by `buffers()`
const SIM_PHYS_BASE: u32 = 0x8f40_0000;

/// Operations observed by the simulated driver, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimEvent {
    SetBufunitSize(u32),
    Allocate(u32),
    Open,
    Write { offered: usize, accepted: usize },
    Start,
    Close,
}

struct SimState {
    bufunit_size: u32,
    max_buffers: u32,
    buffers: Vec<Vec<u8>>,
    state: DriverState,
    open: bool,
    /// Index of the buffer being filled and the position inside it
    reader: (usize, usize),
    journal: Vec<SimEvent>,
    played: Vec<u8>,
    fail_open: bool,
    misreport_allocation: Option<u32>,
}

impl SimState {
    fn allocated(&self) -> u32 {
        self.buffers.iter().map(|b| b.len() as u32).sum()
    }

    /// Copy as much of `data` as fits in the current buffer
    fn write_chunk(&mut self, data: &[u8]) -> usize {
        let (index, pos) = self.reader;
        let Some(buffer) = self.buffers.get_mut(index) else {
            return 0;
        };

        let count = (buffer.len() - pos).min(data.len());
        buffer[pos..pos + count].copy_from_slice(&data[..count]);

        if pos + count == buffer.len() {
            self.reader = (index + 1, 0);
        } else {
            self.reader = (index, pos + count);
        }
        count
    }
}

/// Simulated driver for development without hardware
///
/// Clones share the same underlying state, so a test can keep a handle for
/// inspection while a session owns the driver.
#[derive(Clone)]
pub struct SimulatedDriver {
    inner: Arc<Mutex<SimState>>,
}

impl Default for SimulatedDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedDriver {
    /// Create a new simulated driver in the state the module is in after probe
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SimState {
                bufunit_size: DEFAULT_BUFUNIT_SIZE,
                max_buffers: MAX_BUFFERS,
                buffers: Vec::new(),
                state: DriverState::Initialized,
                open: false,
                reader: (0, 0),
                journal: Vec::new(),
                played: Vec::new(),
                fail_open: false,
                misreport_allocation: None,
            })),
        }
    }

    /// Limit the number of buffers an allocation may use
    pub fn with_max_buffers(self, max_buffers: u32) -> Self {
        self.state().max_buffers = max_buffers;
        self
    }

    /// Make `open_channel` fail as if the device node were missing
    pub fn fail_open(self) -> Self {
        self.state().fail_open = true;
        self
    }

    /// Make `allocated_bytes` report a fixed value regardless of allocation
    pub fn misreport_allocation(self, bytes: u32) -> Self {
        self.state().misreport_allocation = Some(bytes);
        self
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every operation seen so far
    pub fn journal(&self) -> Vec<SimEvent> {
        self.state().journal.clone()
    }

    /// Bytes clocked out by the last completed generation
    pub fn played(&self) -> Vec<u8> {
        self.state().played.clone()
    }

    /// Current driver state
    pub fn driver_state(&self) -> DriverState {
        self.state().state
    }
}

impl WaveformDriver for SimulatedDriver {
    type Channel = SimulatedChannel;

    fn info(&self) -> DriverInfo {
        DriverInfo {
            backend: DriverBackend::Simulated,
            device_path: PathBuf::from("sim://beaglelogic"),
            sysfs_dir: PathBuf::from("sim://sysfs"),
        }
    }

    fn is_available(&self) -> bool {
        true
    }

    fn set_bufunit_size(&mut self, bytes: u32) -> DriverResult<()> {
        let mut state = self.state();
        state.journal.push(SimEvent::SetBufunitSize(bytes));

        if bytes < MIN_BUFUNIT_SIZE {
            return Err(DriverError::InvalidBufferUnitSize {
                size: bytes,
                min: MIN_BUFUNIT_SIZE,
            });
        }

        // Changing the unit size frees previously allocated buffers
        state.bufunit_size = align_bufunit_size(bytes);
        state.buffers.clear();
        state.state = DriverState::Initialized;
        Ok(())
    }

    fn bufunit_size(&self) -> DriverResult<u32> {
        Ok(self.state().bufunit_size)
    }

    fn allocate(&mut self, bytes: u32) -> DriverResult<()> {
        let mut state = self.state();
        state.journal.push(SimEvent::Allocate(bytes));

        if state.open {
            return Err(DriverError::Busy("device is open".to_string()));
        }

        let limit = u64::from(state.max_buffers) * u64::from(state.bufunit_size);
        if u64::from(bytes) > limit {
            return Err(DriverError::AllocationTooLarge {
                requested: bytes,
                limit,
            });
        }

        state.buffers = buffer_layout(bytes, state.bufunit_size)
            .into_iter()
            .map(|size| vec![0u8; size as usize])
            .collect();
        state.reader = (0, 0);
        state.state = if state.buffers.is_empty() {
            DriverState::Initialized
        } else {
            DriverState::Armed
        };

        tracing::debug!(bytes, buffers = state.buffers.len(), "Simulated allocation");
        Ok(())
    }

    fn allocated_bytes(&self) -> DriverResult<u32> {
        let state = self.state();
        Ok(state.misreport_allocation.unwrap_or_else(|| state.allocated()))
    }

    fn status(&self) -> DriverResult<DriverStatus> {
        let state = self.state();
        Ok(match state.state {
            DriverState::Running => DriverStatus::Running {
                buffer: state.reader.0 as u32,
            },
            other => DriverStatus::Idle(other),
        })
    }

    fn buffers(&self) -> DriverResult<Vec<BufferDescriptor>> {
        let state = self.state();
        let mut addr = SIM_PHYS_BASE;
        let descriptors = state
            .buffers
            .iter()
            .map(|b| {
                let desc = BufferDescriptor {
                    phys_addr: addr,
                    size: b.len() as u32,
                };
                addr = addr.wrapping_add(b.len() as u32);
                desc
            })
            .collect();
        Ok(descriptors)
    }

    fn last_error(&self) -> DriverResult<i32> {
        Ok(0)
    }

    fn open_channel(&mut self) -> DriverResult<SimulatedChannel> {
        let mut state = self.state();
        if state.fail_open {
            return Err(DriverError::DeviceNotFound("sim://beaglelogic".to_string()));
        }
        if state.buffers.is_empty() {
            return Err(DriverError::NoBuffersAllocated("sim://beaglelogic".to_string()));
        }
        if state.open {
            return Err(DriverError::Busy("device already open".to_string()));
        }

        state.open = true;
        state.reader = (0, 0);
        state.journal.push(SimEvent::Open);

        Ok(SimulatedChannel {
            inner: Arc::clone(&self.inner),
        })
    }
}

/// Transmit channel of the simulated driver
pub struct SimulatedChannel {
    inner: Arc<Mutex<SimState>>,
}

impl SimulatedChannel {
    fn state(&self) -> MutexGuard<'_, SimState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TransmitChannel for SimulatedChannel {
    fn write_waveform(&mut self, data: &[u8]) -> DriverResult<usize> {
        let mut state = self.state();
        if state.state == DriverState::Error {
            return Err(DriverError::Busy("driver in error state".to_string()));
        }

        let expected = data.len();
        let mut written = 0;
        while written < expected {
            let accepted = state.write_chunk(&data[written..]);
            state.journal.push(SimEvent::Write {
                offered: expected - written,
                accepted,
            });
            if accepted == 0 {
                return Err(DriverError::ShortWrite { written, expected });
            }
            written += accepted;
        }

        Ok(written)
    }

    fn start(&mut self) -> DriverResult<()> {
        let mut state = self.state();
        if state.state == DriverState::Running {
            return Err(DriverError::Busy("generation already started".to_string()));
        }

        state.journal.push(SimEvent::Start);
        state.reader = (0, 0);
        state.state = DriverState::Running;
        Ok(())
    }

    fn close(self) -> DriverResult<()> {
        let mut state = self.state();
        state.journal.push(SimEvent::Close);

        // Playback ends with every buffer unmapped
        if state.state == DriverState::Running {
            let played: Vec<u8> = state.buffers.concat();
            state.played = played;
            state.state = DriverState::Initialized;
        }
        state.open = false;
        Ok(())
    }
}

impl Drop for SimulatedChannel {
    fn drop(&mut self) {
        // An unclosed channel still releases the device
        self.state().open = false;
    }
}
