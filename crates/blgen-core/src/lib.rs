//! # BeagleLogic Waveform Generator
//!
//! This crate plays a precomputed, pre-multiplexed binary waveform through the
//! BeagleLogic kernel driver, turning a BeagleBone into a parallel digital
//! pattern generator clocked from an external source.
//!
//! ## Overview
//!
//! - **Waveform**: load an opaque blob and derive its allocation size
//! - **Session**: configure the driver, allocate, write, start and wait
//! - **Operator**: the two manual clock prompts
//! - **Config / Observe**: YAML configuration and `tracing` setup
//!
//! ## Generation Flow
//!
//! ```text
//! bufunitsize ← unit size → load PRUdata.bin → memalloc ← len
//!     → write /dev/beaglelogic → START → "Enable External Clock now."
//!     → close (blocks during playback) → "Disable External Clock now."
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use blgen_core::{ConsoleOperator, GenerationOptions, GenerationSession};
//! use blgen_driver::SimulatedDriver;
//!
//! let mut session = GenerationSession::new(
//!     SimulatedDriver::new(),
//!     ConsoleOperator::new(),
//!     GenerationOptions::default(),
//! );
//! let report = session.run_file("PRUdata.bin").unwrap();
//! println!("{} bytes played", report.bytes_written);
//! ```

pub mod config;
pub mod observe;
pub mod operator;
pub mod session;
pub mod waveform;

pub use config::{BlgenConfig, Backend, ConfigError, DriverConfig, GenerationConfig};
pub use operator::{ConsoleOperator, Operator, OperatorPrompt, ScriptedOperator};
pub use session::{
    GenerationOptions, GenerationReport, GenerationSession, SessionError, SessionState,
};
pub use waveform::{Waveform, WaveformError};
