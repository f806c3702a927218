//! blgen: play a pre-multiplexed waveform through BeagleLogic
//!
//! ```text
//! blgen                       # PRUdata.bin with default settings
//! blgen run --waveform burst.bin --bufunit-size 65536 --verify
//! blgen run --simulate        # no hardware needed
//! blgen status
//! blgen codes
//! blgen config > blgen.yaml
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use blgen_core::config::{Backend, BlgenConfig, DriverConfig};
use blgen_core::observe::{init_logging, LogFormat};
use blgen_core::{ConsoleOperator, GenerationOptions, GenerationReport, GenerationSession};
use blgen_driver::{DriverStatus, IoctlCommand, SimulatedDriver, WaveformDriver, IOCTL_BL_START};

#[derive(Parser, Debug)]
#[command(name = "blgen", author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (default: search path)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Generation profile from the configuration file
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Increase log verbosity (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log output format
    #[arg(long, value_enum, global = true)]
    log_format: Option<LogFormatArg>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormatArg {
    Json,
    Pretty,
    Compact,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Json => LogFormat::Json,
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Compact => LogFormat::Compact,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the waveform and start generation (default)
    Run(RunArgs),
    /// Show the driver's buffer configuration and state
    Status {
        /// Query the simulated backend
        #[arg(long, default_value_t = false)]
        simulate: bool,
    },
    /// List the driver's ioctl commands and their encoded values
    Codes,
    /// Print an example configuration file
    Config,
}

#[derive(clap::Args, Debug, Default)]
struct RunArgs {
    /// Waveform file
    #[arg(long, short)]
    waveform: Option<PathBuf>,

    /// Allocation unit size in bytes
    #[arg(long)]
    bufunit_size: Option<u32>,

    /// Use the simulated backend
    #[arg(long, default_value_t = false)]
    simulate: bool,

    /// Read the allocation back before writing
    #[arg(long, default_value_t = false)]
    verify: bool,

    /// Wait for Enter at each clock prompt
    #[arg(long, default_value_t = false)]
    confirm: bool,

    /// Fail on an empty waveform file
    #[arg(long, default_value_t = false)]
    reject_empty: bool,
}

fn load_config(cli: &Cli) -> Result<BlgenConfig> {
    let mut config = match &cli.config {
        Some(path) => BlgenConfig::load_from(path)?,
        None => BlgenConfig::load()?,
    };
    if let Some(name) = &cli.profile {
        config = config.with_profile(name)?;
    }

    config.logging.level = config.logging.level.more_verbose(cli.verbose);
    if let Some(format) = cli.log_format {
        config.logging.format = format.into();
    }
    Ok(config)
}

fn apply_run_args(config: &mut BlgenConfig, args: &RunArgs) {
    let generation = &mut config.generation;
    if let Some(waveform) = &args.waveform {
        generation.waveform = waveform.clone();
    }
    if let Some(size) = args.bufunit_size {
        generation.bufunit_size = size;
    }
    generation.verify_allocation |= args.verify;
    generation.confirm_prompts |= args.confirm;
    generation.reject_empty |= args.reject_empty;
    if args.simulate {
        config.driver.backend = Backend::Simulator;
    }
}

fn generate<D: WaveformDriver>(driver: D, config: &BlgenConfig) -> Result<GenerationReport> {
    let info = driver.info();
    tracing::info!(
        backend = info.backend.name(),
        device = %info.device_path.display(),
        "Using driver"
    );

    let operator = ConsoleOperator::new().with_confirmation(config.generation.confirm_prompts);
    let options = GenerationOptions::from(&config.generation);
    let mut session = GenerationSession::new(driver, operator, options);

    let waveform = &config.generation.waveform;
    let result = session.run_file(waveform);
    result.with_context(|| {
        format!(
            "generation of {} stopped in state '{}'",
            waveform.display(),
            session.state()
        )
    })
}

#[cfg(target_os = "linux")]
fn hardware_driver(config: &DriverConfig) -> Result<blgen_driver::BeagleLogicDriver> {
    let driver = blgen_driver::BeagleLogicDriver::new(
        blgen_driver::BeagleLogicConfig::default()
            .sysfs_dir(&config.sysfs_dir)
            .device_path(&config.device_path),
    );
    if !driver.is_available() {
        tracing::warn!(
            sysfs = %config.sysfs_dir.display(),
            "BeagleLogic driver not found; is the module loaded?"
        );
    }
    Ok(driver)
}

#[cfg(not(target_os = "linux"))]
fn hardware_driver(_config: &DriverConfig) -> Result<SimulatedDriver> {
    bail!("the BeagleLogic backend is only available on Linux; use --simulate")
}

fn cmd_run(mut config: BlgenConfig, args: &RunArgs) -> Result<()> {
    apply_run_args(&mut config, args);
    config.validate()?;

    let report = match config.driver.backend {
        Backend::BeagleLogic => generate(hardware_driver(&config.driver)?, &config)?,
        Backend::Simulator => generate(SimulatedDriver::new(), &config)?,
    };

    tracing::info!(
        bytes = report.bytes_written,
        bufunit_size = report.bufunit_size,
        verified = report.verified,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "Done"
    );
    Ok(())
}

fn print_status<D: WaveformDriver>(driver: &D) -> Result<()> {
    let info = driver.info();
    println!("Backend:       {}", info.backend.name());
    println!("Device:        {}", info.device_path.display());
    println!("Sysfs:         {}", info.sysfs_dir.display());

    if !driver.is_available() {
        bail!("driver is not available at {}", info.sysfs_dir.display());
    }

    println!("Buffer unit:   {} bytes", driver.bufunit_size()?);
    println!("Allocated:     {} bytes", driver.allocated_bytes()?);
    let status = driver.status()?;
    println!("State:         {}", status);
    // lasterror blocks until generation ends
    if !matches!(status, DriverStatus::Running { .. }) {
        println!("Last error:    {}", driver.last_error()?);
    }

    let buffers = driver.buffers()?;
    println!("Buffers:       {}", buffers.len());
    for (index, buffer) in buffers.iter().enumerate() {
        println!("  [{:3}] {:#010x} {:>8} bytes", index, buffer.phys_addr, buffer.size);
    }
    Ok(())
}

fn cmd_status(config: &BlgenConfig, simulate: bool) -> Result<()> {
    if simulate || config.driver.backend == Backend::Simulator {
        return print_status(&SimulatedDriver::new());
    }
    print_status(&hardware_driver(&config.driver)?)
}

fn cmd_codes() {
    println!("{:<18} {:>4}  {:>10}", "COMMAND", "NR", "CODE");
    for command in IoctlCommand::ALL {
        println!(
            "{:<18} {:#04x}  {:#010x}",
            command.name(),
            command.number(),
            command.code()
        );
    }
    println!();
    println!("Start generation: {:#06x}", IOCTL_BL_START);
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Command::Config) = cli.command {
        print!("{}", BlgenConfig::example_yaml());
        return Ok(());
    }

    let config = load_config(&cli)?;
    init_logging(&config.logging);

    match &cli.command {
        None => cmd_run(config, &RunArgs::default()),
        Some(Command::Run(args)) => cmd_run(config, args),
        Some(Command::Status { simulate }) => cmd_status(&config, *simulate),
        Some(Command::Codes) => {
            cmd_codes();
            Ok(())
        }
        Some(Command::Config) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_run() {
        let cli = Cli::try_parse_from(["blgen"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_run_overrides() {
        let cli = Cli::try_parse_from([
            "blgen",
            "-vv",
            "run",
            "--waveform",
            "burst.bin",
            "--bufunit-size",
            "4096",
            "--simulate",
            "--verify",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);

        let Some(Command::Run(args)) = &cli.command else {
            panic!("expected run subcommand");
        };

        let mut config = BlgenConfig::default();
        apply_run_args(&mut config, args);
        assert_eq!(config.generation.waveform, PathBuf::from("burst.bin"));
        assert_eq!(config.generation.bufunit_size, 4096);
        assert!(config.generation.verify_allocation);
        assert!(!config.generation.reject_empty);
        assert_eq!(config.driver.backend, Backend::Simulator);
    }

    #[test]
    fn test_flags_do_not_clear_config() {
        let mut config = BlgenConfig::default();
        config.generation.verify_allocation = true;
        apply_run_args(&mut config, &RunArgs::default());
        assert!(config.generation.verify_allocation);
        assert_eq!(config.driver.backend, Backend::BeagleLogic);
    }

    #[test]
    fn test_status_on_simulator() {
        let mut driver = SimulatedDriver::new();
        driver.allocate(100).unwrap();
        assert_eq!(driver.last_error().unwrap(), 0);
        print_status(&driver).unwrap();
    }

    #[test]
    fn test_log_format_arg() {
        let cli = Cli::try_parse_from(["blgen", "--log-format", "json", "codes"]).unwrap();
        assert!(matches!(cli.log_format, Some(LogFormatArg::Json)));
        assert!(matches!(cli.command, Some(Command::Codes)));
    }
}
