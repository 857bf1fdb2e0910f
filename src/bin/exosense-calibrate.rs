use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{info, warn};

use exosense_calibrate::calibration::{CalibrationProcedure, CalibrationReport, CpuLoad};
use exosense_calibrate::clock::SystemClock;
use exosense_calibrate::device::{
    DeviceInterface, Feedback, LedState, SysfsDevice, BEEP_DONE, BEEP_START,
};
use exosense_calibrate::error::{log_calibration_error, log_device_error};
use exosense_calibrate::persistence::{
    CalibrationSink, DeviceParams, ModprobeConf, NoService, ServiceAction, ServiceTrigger,
    Systemctl,
};
use exosense_calibrate::simulate::{BoardModel, SimulatedBoard};
use exosense_calibrate::{init_logging, AppConfig, CalibrationResult, ThermalSampler};

#[derive(Parser, Debug)]
#[command(
    name = "exosense-calibrate",
    about = "Thermal compensation calibration for the Exo Sense Pi temperature sensor"
)]
struct Cli {
    /// JSON configuration file (defaults to /etc/exosense-calibrate/config.json)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Where the calibration result is stored
    #[arg(long, value_enum, default_value_t = Target::Modprobe)]
    target: Target,
    /// Driver configuration selector stored along with M and B
    #[arg(long)]
    selector: Option<u8>,
    /// Pre-computed slope (×1000); skips calibration
    #[arg(long, requires = "b", allow_negative_numbers = true)]
    m: Option<i32>,
    /// Pre-computed intercept (×1000); skips calibration
    #[arg(long, requires = "m", allow_negative_numbers = true)]
    b: Option<i32>,
    /// Override the sysfs class directory
    #[arg(long)]
    sysfs_dir: Option<PathBuf>,
    /// Override the modprobe options file
    #[arg(long)]
    modprobe_conf: Option<PathBuf>,
    /// Do not touch the service manager after persisting
    #[arg(long, default_value_t = false)]
    no_service: bool,
    /// Run against a simulated board instead of the driver
    #[arg(long, default_value_t = false)]
    simulate: bool,
    /// Seed of the simulated board
    #[arg(long, default_value_t = 1)]
    seed: u64,
    /// Print the calibration report as JSON on stdout
    #[arg(long, default_value_t = false)]
    json: bool,
    /// Enable debug logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Target {
    /// Kernel module options file, then disable the one-shot unit
    Modprobe,
    /// Direct driver write, then enable the parameterized unit instance
    Device,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::load(),
    };
    if let Some(dir) = &cli.sysfs_dir {
        config.device.sysfs_dir = dir.clone();
    }
    if let Some(path) = &cli.modprobe_conf {
        config.persistence.modprobe_conf = path.clone();
    }

    info!("Exo Sense Pi calibration - v{}", env!("CARGO_PKG_VERSION"));

    let board = cli
        .simulate
        .then(|| SimulatedBoard::new(BoardModel::default(), config.device.clone(), cli.seed));
    let device: Box<dyn DeviceInterface> = match &board {
        Some(board) => Box::new(board.device()),
        None => Box::new(SysfsDevice::new(&config.device.sysfs_dir)),
    };
    let feedback = Feedback::new(device.as_ref(), &config.device);

    let outcome = execute(&cli, &config, device.as_ref(), &feedback, board.as_ref());
    if outcome.is_err() {
        feedback.led_best_effort(LedState::Off);
    }
    feedback.beep_best_effort(BEEP_DONE);
    outcome
}

fn execute(
    cli: &Cli,
    config: &AppConfig,
    device: &dyn DeviceInterface,
    feedback: &Feedback<'_>,
    board: Option<&SimulatedBoard>,
) -> Result<()> {
    feedback
        .led(LedState::Off)
        .and_then(|()| feedback.beep(BEEP_START))
        .map_err(|err| {
            log_device_error(&err, "startup");
            err
        })
        .context("device interface not available. Is the kernel module enabled?")?;

    let sink: Box<dyn CalibrationSink + '_> = match cli.target {
        Target::Modprobe => Box::new(ModprobeConf::new(
            &config.persistence.modprobe_conf,
            config.persistence.module.clone(),
        )),
        Target::Device => Box::new(DeviceParams::new(
            device,
            config.persistence.device_attribute.clone(),
        )),
    };

    let (result, report) = match (cli.m, cli.b) {
        (Some(m), Some(b)) => {
            info!("Using provided calibration params M={} B={}", m, b);
            (CalibrationResult::from_coefficients(m, b), None)
        }
        _ => {
            sink.prepare().context("clearing previous calibration")?;
            let report = calibrate(config, device, feedback, board)?;
            (report.result, Some(report))
        }
    };
    let result = result.with_selector(cli.selector);

    sink.persist(&result)
        .with_context(|| format!("persisting to {}", sink.describe()))?;
    info!("Calibration params set: {} ({})", result, sink.describe());
    match report.filter(|_| cli.json) {
        Some(report) => println!("{}", serde_json::to_string_pretty(&report)?),
        None => println!("Calibration params set: {}", result),
    }

    let service: Box<dyn ServiceTrigger> = if cli.no_service || board.is_some() {
        Box::new(NoService)
    } else {
        Box::new(Systemctl::new(match cli.target {
            Target::Modprobe => ServiceAction::Disable {
                unit: config.persistence.unit.clone(),
            },
            Target::Device => ServiceAction::EnableInstance {
                template: config.persistence.template.clone(),
            },
        }))
    };
    if let Err(err) = service.trigger(&result) {
        warn!("Calibration stored but service update failed: {}", err);
    }

    feedback
        .led(LedState::On)
        .context("setting status LED after calibration")?;
    Ok(())
}

fn calibrate(
    config: &AppConfig,
    device: &dyn DeviceInterface,
    feedback: &Feedback<'_>,
    board: Option<&SimulatedBoard>,
) -> Result<CalibrationReport> {
    let mut sampler = ThermalSampler::new(device, &config.device, &config.sampler);

    let outcome = match board {
        Some(board) => {
            let clock = board.clock();
            let mut load = board.load();
            CalibrationProcedure::new(config, &clock, feedback).run(&mut sampler, &mut load)
        }
        None => {
            let clock = SystemClock;
            let mut load = CpuLoad::new(config.load.worker_count());
            CalibrationProcedure::new(config, &clock, feedback).run(&mut sampler, &mut load)
        }
    };

    outcome
        .map_err(|err| {
            log_calibration_error(&err, "calibrate");
            err
        })
        .context("calibration failed")
}
