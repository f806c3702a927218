//! Waveform generation session
//!
//! A session drives one generation run end to end:
//!
//! ```text
//! Idle ──set bufunit──▶ Configured ──load──▶ Loaded ──allocate──▶ Allocated
//!                                                                     │
//!        ┌──────────────────────open + write──────────────────────────┘
//!        ▼
//! Transmitting ──start──▶ Started ──[enable clock]──close──▶ Done ──[disable clock]
//! ```
//!
//! Closing the device blocks until the driver has played the whole buffer,
//! so the disable prompt is only shown once playback is over.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use blgen_driver::{
    reported_allocation, DriverError, TransmitChannel, WaveformDriver, MIN_BUFUNIT_SIZE,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::GenerationConfig;
use crate::operator::{Operator, OperatorPrompt};
use crate::waveform::{Waveform, WaveformError};

/// Errors that end a generation run
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    #[error(transparent)]
    Waveform(#[from] WaveformError),

    #[error("Waveform {0} is empty")]
    EmptyWaveform(PathBuf),

    #[error("Invalid generation options: {0}")]
    InvalidOptions(String),

    #[error("Operator prompt failed: {0}")]
    Prompt(#[source] std::io::Error),
}

/// Progress of a session through the generation flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionState {
    Idle,
    Configured,
    Loaded,
    Allocated,
    Transmitting,
    Started,
    Done,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Configured => "configured",
            SessionState::Loaded => "loaded",
            SessionState::Allocated => "allocated",
            SessionState::Transmitting => "transmitting",
            SessionState::Started => "started",
            SessionState::Done => "done",
        };
        f.write_str(name)
    }
}

/// Per-run settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOptions {
    /// Requested allocation unit size in bytes
    pub bufunit_size: u32,
    /// Read the allocation back and fail if it differs from the blob length
    pub verify_allocation: bool,
    /// Refuse zero-length waveforms
    pub reject_empty: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            bufunit_size: blgen_driver::DEFAULT_BUFUNIT_SIZE,
            verify_allocation: false,
            reject_empty: false,
        }
    }
}

impl From<&GenerationConfig> for GenerationOptions {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            bufunit_size: config.bufunit_size,
            verify_allocation: config.verify_allocation,
            reject_empty: config.reject_empty,
        }
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationReport {
    pub bytes_written: usize,
    /// Unit size the driver settled on after rounding
    pub bufunit_size: u32,
    pub elapsed: Duration,
    /// Whether the allocation was read back and matched
    pub verified: bool,
}

/// One generation run against a driver
pub struct GenerationSession<D: WaveformDriver, O: Operator> {
    driver: D,
    operator: O,
    options: GenerationOptions,
    state: SessionState,
}

impl<D: WaveformDriver, O: Operator> GenerationSession<D, O> {
    pub fn new(driver: D, operator: O, options: GenerationOptions) -> Self {
        Self {
            driver,
            operator,
            options,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn operator(&self) -> &O {
        &self.operator
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    fn advance(&mut self, next: SessionState) {
        debug!(from = %self.state, to = %next, "Session transition");
        self.state = next;
    }

    fn check_options(&self) -> Result<(), SessionError> {
        if self.options.bufunit_size < MIN_BUFUNIT_SIZE {
            return Err(SessionError::InvalidOptions(format!(
                "buffer unit size {} is below the minimum of {}",
                self.options.bufunit_size, MIN_BUFUNIT_SIZE
            )));
        }
        Ok(())
    }

    fn configure(&mut self) -> Result<u32, SessionError> {
        self.check_options()?;
        self.driver.set_bufunit_size(self.options.bufunit_size)?;
        let bufunit_size = self.driver.bufunit_size()?;
        info!(
            requested = self.options.bufunit_size,
            bufunit_size, "Buffer unit size configured"
        );
        self.advance(SessionState::Configured);
        Ok(bufunit_size)
    }

    fn check_empty(&self, waveform: &Waveform) -> Result<(), SessionError> {
        if !waveform.is_empty() {
            return Ok(());
        }
        if self.options.reject_empty {
            return Err(SessionError::EmptyWaveform(waveform.source().to_path_buf()));
        }
        warn!(
            path = %waveform.source().display(),
            "Waveform is empty; the driver will refuse to open the device"
        );
        Ok(())
    }

    /// Load `path` and generate it
    ///
    /// The buffer unit size is configured before the file is read.
    pub fn run_file(&mut self, path: impl AsRef<Path>) -> Result<GenerationReport, SessionError> {
        let started = Instant::now();
        let bufunit_size = self.configure()?;

        let waveform = Waveform::load(path)?;
        self.check_empty(&waveform)?;
        self.advance(SessionState::Loaded);

        self.transmit(&waveform, bufunit_size, started)
    }

    /// Generate a waveform that is already in memory
    pub fn run(&mut self, waveform: &Waveform) -> Result<GenerationReport, SessionError> {
        let started = Instant::now();
        self.check_empty(waveform)?;

        let bufunit_size = self.configure()?;
        self.advance(SessionState::Loaded);

        self.transmit(waveform, bufunit_size, started)
    }

    /// Compare `memalloc` with what the driver reports for `size` bytes:
    /// the last buffer is padded to 64 bytes
    fn verify_allocation(&self, size: u32, bufunit_size: u32) -> Result<(), SessionError> {
        let expected = reported_allocation(size, bufunit_size);
        let reported = self.driver.allocated_bytes()?;
        if u64::from(reported) != expected {
            return Err(DriverError::AllocationMismatch {
                requested: size,
                expected,
                reported,
            }
            .into());
        }
        debug!(requested = size, reported, "Allocation verified");
        Ok(())
    }

    fn transmit(
        &mut self,
        waveform: &Waveform,
        bufunit_size: u32,
        started: Instant,
    ) -> Result<GenerationReport, SessionError> {
        let size = waveform.allocation_size()?;
        self.driver.allocate(size)?;

        // memalloc cannot be read back while nothing is allocated
        let verified = if self.options.verify_allocation && size > 0 {
            self.verify_allocation(size, bufunit_size)?;
            true
        } else {
            false
        };
        info!(bytes = size, "Transmit buffers allocated");
        self.advance(SessionState::Allocated);

        // Dropping the channel on an error path releases the device
        let mut channel = self.driver.open_channel()?;
        self.advance(SessionState::Transmitting);

        let bytes_written = channel.write_waveform(waveform.as_bytes())?;
        info!(bytes = bytes_written, "Waveform written to device");

        channel.start()?;
        self.advance(SessionState::Started);

        self.operator
            .prompt(OperatorPrompt::EnableClock)
            .map_err(SessionError::Prompt)?;

        info!("Waiting for playback to finish");
        channel.close()?;
        self.advance(SessionState::Done);

        self.operator
            .prompt(OperatorPrompt::DisableClock)
            .map_err(SessionError::Prompt)?;

        let elapsed = started.elapsed();
        info!(bytes = bytes_written, ?elapsed, "Generation complete");

        Ok(GenerationReport {
            bytes_written,
            bufunit_size,
            elapsed,
            verified,
        })
    }
}
